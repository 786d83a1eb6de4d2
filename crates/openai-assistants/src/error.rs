//! Tipos de erro para o crate openai-assistants

use thiserror::Error;

/// Erros do cliente OpenAI
#[derive(Debug, Error)]
pub enum OpenAiError {
    /// Erro de requisição HTTP
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Erro da API OpenAI (status code não-2xx)
    #[error("OpenAI API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// API key inválida ou sem acesso ao recurso
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Erro de parsing JSON
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Assistant/vector store não encontrado
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Erro de configuração
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Tipo Result padrão para o crate
pub type Result<T> = std::result::Result<T, OpenAiError>;
