//! Tipos de erro para o crate whatsapp-cloud

use thiserror::Error;

/// Erros do cliente WhatsApp Cloud
#[derive(Debug, Error)]
pub enum WhatsAppCloudError {
    /// Erro de requisição HTTP
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Erro da Graph API (status code não-2xx)
    #[error("WhatsApp Cloud API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Credenciais inválidas (token expirado ou phone number id errado)
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Erro de parsing JSON
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Erro de configuração
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Erro de validação
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Tipo Result padrão para o crate
pub type Result<T> = std::result::Result<T, WhatsAppCloudError>;
