use axum::{extract::State, http::StatusCode, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::utils::logging::*;
use crate::AppState;

pub async fn health_check() -> Json<Value> {
    log_health_check();

    Json(json!({
        "status": "healthy",
        "service": "zapcrm-backend",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn ready_check(State(state): State<Arc<AppState>>) -> Result<Json<Value>, StatusCode> {
    // Testa a conexão com o banco
    let database_status = match sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
    {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    let overall_ready = database_status == "connected";

    let response = json!({
        "ready": overall_ready,
        "service": "zapcrm-backend",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "dependencies": {
            "database": {
                "status": database_status
            }
        }
    });

    if overall_ready {
        Ok(Json(response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

pub async fn status_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    let mail_configured = state.settings.mail.enabled;

    Json(json!({
        "service": "zapcrm-backend",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string()),
        "integrations": {
            "mail": { "enabled": mail_configured },
            "database": { "max_connections": state.settings.database.max_connections }
        }
    }))
}
