use crate::models::RetrievalResult;

pub const RAG_SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on the provided context.\n\
Use the retrieved documents to provide accurate and informative answers.\n\
If the information is not available in the context, say so clearly.";

/// Joins retrieved documents into one context block, each followed by a blank line.
pub fn build_context_block(documents: &[RetrievalResult]) -> String {
    documents
        .iter()
        .map(|document| format!("Document: {}\n\n", document.content))
        .collect()
}

pub fn build_rag_user_prompt(context_block: &str, query: &str) -> String {
    format!(
        "Context from knowledge base:\n{context_block}\n\nQuestion: {query}\n\n\
         Please provide a comprehensive answer based on the context provided."
    )
}
