//! Tipos de erro para o crate disparaja

use thiserror::Error;

/// Erros do cliente Dispara-Já
#[derive(Debug, Error)]
pub enum DisparaJaError {
    /// Erro de requisição HTTP
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Erro da API Dispara-Já (status code não-2xx)
    #[error("Dispara-Já API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Erro de autenticação (token inválido ou expirado)
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Erro de parsing JSON
    #[error("JSON parsing failed: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Instância não encontrada
    #[error("Instance not found: {0}")]
    NotFound(String),

    /// Erro de configuração
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Erro de validação
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Tipo Result padrão para o crate
pub type Result<T> = std::result::Result<T, DisparaJaError>;
