//! AWS Signature Version 4 request signing.
//!
//! Only the header-based flavour is implemented: the caller signs a request
//! once, then attaches `x-amz-date`, `authorization` and (for temporary
//! credentials) `x-amz-security-token` to the outgoing request.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use url::Url;

use super::AwsCredentials;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

pub const AMZ_DATE_HEADER: &str = "x-amz-date";
pub const SECURITY_TOKEN_HEADER: &str = "x-amz-security-token";

#[derive(Debug, Clone, Copy)]
pub struct SigningParams<'a> {
    pub credentials: &'a AwsCredentials,
    pub region: &'a str,
    pub service: &'a str,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct SignedHeaders {
    pub amz_date: String,
    pub authorization: String,
    pub security_token: Option<String>,
}

/// Signs `method url` with the given extra `headers` and `body`.
///
/// `headers` must contain every header the caller will send that should be
/// covered by the signature (typically `content-type`). `host` and
/// `x-amz-date` are always signed and must not be passed in.
pub fn sign_request(
    method: &str,
    url: &Url,
    headers: &[(&str, &str)],
    body: &[u8],
    params: SigningParams<'_>,
) -> SignedHeaders {
    let amz_date = params.timestamp.format("%Y%m%dT%H%M%SZ").to_string();
    let date_stamp = params.timestamp.format("%Y%m%d").to_string();

    let mut canonical_headers = headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), normalize_header_value(value)))
        .collect::<Vec<_>>();
    canonical_headers.push(("host".to_string(), host_header(url)));
    canonical_headers.push((AMZ_DATE_HEADER.to_string(), amz_date.clone()));
    if let Some(token) = params.credentials.session_token.as_deref() {
        canonical_headers.push((SECURITY_TOKEN_HEADER.to_string(), token.to_string()));
    }
    canonical_headers.sort();

    let canonical = canonical_request(method, url, &canonical_headers, body);
    let scope = format!(
        "{date_stamp}/{}/{}/aws4_request",
        params.region, params.service
    );
    let string_to_sign = format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        to_lower_hex(&Sha256::digest(canonical.request.as_bytes()))
    );

    let key = signing_key(
        &params.credentials.secret_access_key,
        &date_stamp,
        params.region,
        params.service,
    );
    let signature = to_lower_hex(&hmac_sha256(&key, string_to_sign.as_bytes()));

    SignedHeaders {
        amz_date,
        authorization: format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={}, Signature={signature}",
            params.credentials.access_key_id, canonical.signed_headers
        ),
        security_token: params.credentials.session_token.clone(),
    }
}

pub(crate) struct CanonicalRequest {
    pub(crate) request: String,
    pub(crate) signed_headers: String,
}

/// `headers` must already be lowercased and sorted by name.
pub(crate) fn canonical_request(
    method: &str,
    url: &Url,
    headers: &[(String, String)],
    body: &[u8],
) -> CanonicalRequest {
    let mut request = String::new();
    request.push_str(method);
    request.push('\n');
    request.push_str(&canonical_uri(url));
    request.push('\n');
    request.push_str(&canonical_query(url));
    request.push('\n');
    for (name, value) in headers {
        request.push_str(name);
        request.push(':');
        request.push_str(value);
        request.push('\n');
    }
    request.push('\n');

    let signed_headers = headers
        .iter()
        .map(|(name, _)| name.as_str())
        .collect::<Vec<_>>()
        .join(";");
    request.push_str(&signed_headers);
    request.push('\n');
    request.push_str(&to_lower_hex(&Sha256::digest(body)));

    CanonicalRequest {
        request,
        signed_headers,
    }
}

pub(crate) fn signing_key(secret: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date_stamp.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// Percent-encodes everything except RFC 3986 unreserved characters.
pub fn uri_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            other => {
                let _ = write!(encoded, "%{other:02X}");
            }
        }
    }
    encoded
}

// Non-S3 services expect every path segment encoded a second time.
fn canonical_uri(url: &Url) -> String {
    let path = url.path();
    if path.is_empty() || path == "/" {
        return "/".to_string();
    }

    path.split('/')
        .map(uri_encode)
        .collect::<Vec<_>>()
        .join("/")
}

fn canonical_query(url: &Url) -> String {
    let mut pairs = url
        .query_pairs()
        .map(|(key, value)| (uri_encode(&key), uri_encode(&value)))
        .collect::<Vec<_>>();
    pairs.sort();

    pairs
        .into_iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&")
}

fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    }
}

fn normalize_header_value(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts keys of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

fn to_lower_hex(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}
