mod client;
pub mod sigv4;

use std::fmt;

pub use client::{AwsCallError, AwsJsonClient};
pub use sigv4::{SignedHeaders, SigningParams, sign_request, uri_encode};

/// Signing name shared by the Bedrock runtime and agent runtime APIs.
pub const BEDROCK_SIGNING_SERVICE: &str = "bedrock";

#[derive(Clone)]
pub struct AwsCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}
