use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    DatabaseError(sqlx::Error),
    JsonError(serde_json::Error),
    HttpError(reqwest::Error),
    OpenAiApi(String),
    ChannelApi(String),
    MailError(String),
    ConfigError(String),
    InternalError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::DatabaseError(err) => write!(f, "Database error: {}", err),
            AppError::JsonError(err) => write!(f, "JSON error: {}", err),
            AppError::HttpError(err) => write!(f, "HTTP error: {}", err),
            AppError::OpenAiApi(msg) => write!(f, "OpenAI API error: {}", msg),
            AppError::ChannelApi(msg) => write!(f, "Channel API error: {}", msg),
            AppError::MailError(msg) => write!(f, "Mail error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AppError::NotFound("Registro não encontrado".to_string()),
            other => AppError::DatabaseError(other),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::JsonError(err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::HttpError(err)
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::InternalError(format!("bcrypt: {}", err))
    }
}

impl From<disparaja::DisparaJaError> for AppError {
    fn from(err: disparaja::DisparaJaError) -> Self {
        AppError::ChannelApi(err.to_string())
    }
}

impl From<whatsapp_cloud::WhatsAppCloudError> for AppError {
    fn from(err: whatsapp_cloud::WhatsAppCloudError) -> Self {
        AppError::ChannelApi(err.to_string())
    }
}

impl From<openai_assistants::OpenAiError> for AppError {
    fn from(err: openai_assistants::OpenAiError) -> Self {
        AppError::OpenAiApi(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Causas internas só vão para o log; o corpo devolve mensagem genérica
        let (status, error_message) = match self {
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::JsonError(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            AppError::DatabaseError(err) => {
                tracing::error!("Database error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, "Erro interno do servidor".to_string())
            }
            AppError::HttpError(err) => {
                tracing::error!("Upstream HTTP error: {}", err);
                (StatusCode::BAD_GATEWAY, "Falha ao contatar serviço externo".to_string())
            }
            AppError::OpenAiApi(msg) => {
                tracing::error!("OpenAI API error: {}", msg);
                (StatusCode::BAD_GATEWAY, "Falha na integração com a OpenAI".to_string())
            }
            AppError::ChannelApi(msg) => {
                tracing::error!("Channel API error: {}", msg);
                (StatusCode::BAD_GATEWAY, "Falha na integração com o canal".to_string())
            }
            AppError::MailError(msg) => {
                tracing::error!("Mail error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Erro interno do servidor".to_string())
            }
            AppError::ConfigError(msg) => {
                tracing::error!("Configuration error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Erro interno do servidor".to_string())
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Erro interno do servidor".to_string())
            }
        };

        let body = json!({
            "error": error_message,
            "status": status.as_u16()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_channel_error_display() {
        let err = AppError::ChannelApi("instância offline".to_string());
        assert_eq!(err.to_string(), "Channel API error: instância offline");
    }
}
