pub mod bedrock;
pub mod gateway;
pub mod prompts;

pub use bedrock::{BedrockRuntimeConfig, BedrockRuntimeGateway, build_invoke_body};
pub use gateway::{
    DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, InferenceError, InferenceFuture, InferenceGateway,
    InferenceRequest,
};
pub use prompts::{RAG_SYSTEM_PROMPT, build_context_block, build_rag_user_prompt};
