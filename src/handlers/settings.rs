//! Configurações do workspace (tabela `system_configs`)

use axum::{extract::State, response::Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::middleware::RequestContext;
use crate::services::openai::{set_workspace_openai_key, workspace_openai_key};
use crate::utils::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SetOpenAiKeyBody {
    pub api_key: String,
}

/// GET /api/settings — nunca devolve o valor da key, só a presença
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> Result<Json<Value>, AppError> {
    ctx.require("settings.view")?;

    let key = workspace_openai_key(&state.db, ctx.workspace_id).await?;

    Ok(Json(json!({
        "openai_api_key_configured": key.is_some()
    })))
}

/// PUT /api/settings/openai-key
pub async fn put_openai_key(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Json(body): Json<SetOpenAiKeyBody>,
) -> Result<Json<Value>, AppError> {
    ctx.require("settings.update")?;

    let api_key = body.api_key.trim().to_string();
    if api_key.is_empty() {
        return Err(AppError::ValidationError("api_key obrigatória".to_string()));
    }

    set_workspace_openai_key(&state.db, ctx.workspace_id, &api_key).await?;

    Ok(Json(json!({ "message": "API key da OpenAI atualizada" })))
}
