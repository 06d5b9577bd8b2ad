//! Default values for configuration

/// Default sitemap URL, overridable via SITEMAP_URL
pub fn default_sitemap_url() -> String {
    std::env::var("SITEMAP_URL").unwrap_or_default()
}

/// Default Qdrant gRPC URL for local development (port 6334, not 6333 REST)
pub fn default_qdrant_url() -> String {
    std::env::var("QDRANT_URL").unwrap_or_else(|_| "http://127.0.0.1:6334".to_string())
}

/// Default environment variable name for the Qdrant API key
pub fn default_qdrant_api_key_env() -> String {
    "QDRANT_API_KEY".to_string()
}

/// Default collection name
pub fn default_collection_name() -> String {
    "sitesage_pages".to_string()
}

/// Default embedding dimension (must match the collection)
pub fn default_embedding_dimension() -> usize {
    1024
}

/// Default document-side embedding provider
pub fn default_document_provider() -> String {
    "cohere".to_string()
}

/// Default document-side embedding model
pub fn default_document_model() -> String {
    "embed-english-v3.0".to_string()
}

/// Default Cohere API base URL
pub fn default_cohere_api_base() -> String {
    "https://api.cohere.com".to_string()
}

/// Default environment variable name for the Cohere API key
pub fn default_cohere_api_key_env() -> String {
    "COHERE_API_KEY".to_string()
}

/// Default query-side embedding provider
pub fn default_query_provider() -> String {
    "openai".to_string()
}

/// Default query-side embedding model
pub fn default_query_model() -> String {
    "text-embedding-3-small".to_string()
}

/// Default OpenAI API base URL
pub fn default_openai_api_base() -> String {
    "https://api.openai.com".to_string()
}

/// Default environment variable name for the OpenAI API key
pub fn default_openai_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

/// Default maximum characters per chunk
pub fn default_chunk_max_chars() -> usize {
    1200
}

/// Default page fetch timeout in seconds
pub fn default_fetch_timeout() -> u64 {
    15
}

/// Default sitemap fetch timeout in seconds
pub fn default_sitemap_timeout() -> u64 {
    10
}

/// Default maximum extracted characters per page
pub fn default_max_page_chars() -> usize {
    50_000
}

/// Default user agent
pub fn default_user_agent() -> String {
    format!("sitesage/{} (Site Indexer)", env!("CARGO_PKG_VERSION"))
}

/// Default number of query results
pub fn default_query_k() -> usize {
    5
}

/// Default answer generation model
pub fn default_answer_model() -> String {
    "gpt-4o-mini".to_string()
}

/// Default instructions prepended to every answer request
pub fn default_answer_instructions() -> String {
    "You are an expert assistant for the indexed website. Answer questions \
     accurately using only the provided context. If the answer is not in the \
     context, say you don't know. Be helpful, concise, and friendly."
        .to_string()
}

/// Default environment variable name for the metadata database URL
pub fn default_metadata_database_url_env() -> String {
    "METADATA_DATABASE_URL".to_string()
}
