/// Middleware de autenticação para endpoints administrativos
///
/// Valida que a requisição contém um API key válido no header X-Admin-Key.
/// Protege endpoints operacionais (ex.: /admin/db-check) de acesso não
/// autorizado em produção.

use axum::{
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Middleware que requer API key para acesso aos endpoints /admin/*
///
/// # Configuração
///
/// Configure a variável de ambiente `ADMIN_API_KEY`:
/// ```bash
/// export ADMIN_API_KEY="your-secure-random-key-here"
/// ```
///
/// # Respostas
///
/// - **200 OK**: Key válido, continua para o handler
/// - **401 Unauthorized**: Key ausente ou inválido
/// - **503 Service Unavailable**: Key não configurado em produção
pub async fn require_admin_key(
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, Response> {
    let provided_key = headers
        .get("X-Admin-Key")
        .and_then(|v| v.to_str().ok());

    let expected_key = std::env::var("ADMIN_API_KEY").ok();

    let is_production = std::env::var("RUN_MODE")
        .unwrap_or_else(|_| "development".to_string())
        == "production";

    match (expected_key, provided_key, is_production) {
        // Key configurado e correto
        (Some(expected), Some(provided), _) if expected == provided => {
            tracing::debug!("Admin access granted");
            Ok(next.run(request).await)
        }

        // Key configurado mas incorreto/ausente
        (Some(_), provided, _) => {
            tracing::warn!(
                "Admin access denied - Invalid or missing X-Admin-Key: {:?}",
                provided.map(|_| "<redacted>")
            );
            Err(unauthorized_response())
        }

        // Key não configurado em DESENVOLVIMENTO - permite com warning
        (None, _, false) => {
            tracing::warn!(
                "ADMIN_API_KEY not configured - Allowing access in development mode. \
                 Configure ADMIN_API_KEY in production!"
            );
            Ok(next.run(request).await)
        }

        // Key não configurado em PRODUÇÃO - bloqueia
        (None, _, true) => {
            tracing::error!("ADMIN_API_KEY not configured in production! Blocking admin access.");
            Err(service_unavailable_response())
        }
    }
}

fn unauthorized_response() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "Unauthorized",
            "message": "Missing or invalid X-Admin-Key header"
        })),
    )
        .into_response()
}

fn service_unavailable_response() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "error": "Service Unavailable",
            "message": "ADMIN_API_KEY not configured on server"
        })),
    )
        .into_response()
}
