//! Endpoints operacionais protegidos por X-Admin-Key

use axum::{extract::State, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::utils::AppError;
use crate::AppState;

/// GET /admin/db-check — contagens por tabela para diagnóstico rápido
pub async fn check_database(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    let workspaces: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM workspaces")
        .fetch_one(&state.db)
        .await?;
    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&state.db)
        .await?;
    let leads: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leads")
        .fetch_one(&state.db)
        .await?;
    let conversations: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conversations")
        .fetch_one(&state.db)
        .await?;
    let agents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM agents")
        .fetch_one(&state.db)
        .await?;
    let disparaja: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM disparaja_connections")
        .fetch_one(&state.db)
        .await?;
    let whatsapp: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM whatsapp_cloud_connections")
        .fetch_one(&state.db)
        .await?;
    let pending_tokens: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM action_tokens WHERE expires_at > now()")
            .fetch_one(&state.db)
            .await?;

    Ok(Json(json!({
        "database": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "summary": {
            "workspaces": workspaces,
            "users": users,
            "leads": leads,
            "conversations": conversations,
            "agents": agents,
            "disparaja_connections": disparaja,
            "whatsapp_cloud_connections": whatsapp,
            "pending_action_tokens": pending_tokens
        }
    })))
}
