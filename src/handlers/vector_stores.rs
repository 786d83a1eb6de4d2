//! Vector stores (base de conhecimento) dos agentes
//!
//! Todas as operações exigem `openai_api_key` configurada no workspace; sem
//! key a rota responde 400 explicando a pendência.

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::middleware::RequestContext;
use crate::models::VectorStoreRecord;
use crate::services::openai::vector_store_manager_for;
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;
use openai_assistants::VectorStoreManager;

#[derive(Debug, Deserialize)]
pub struct CreateVectorStoreBody {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AddFileBody {
    /// File id da Files API da OpenAI (upload feito pelo frontend)
    pub file_id: String,
}

async fn require_manager(state: &AppState, ctx: &RequestContext) -> AppResult<VectorStoreManager> {
    vector_store_manager_for(&state.db, ctx.workspace_id)
        .await?
        .ok_or_else(|| {
            AppError::ValidationError(
                "Configure a API key da OpenAI do workspace antes de usar vector stores".to_string(),
            )
        })
}

async fn fetch_workspace_store(
    state: &AppState,
    ctx: &RequestContext,
    id: Uuid,
) -> AppResult<VectorStoreRecord> {
    let store: Option<VectorStoreRecord> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, agent_id, openai_vector_store_id, name, created_at
        FROM vector_stores
        WHERE id = $1 AND workspace_id = $2
        "#,
    )
    .bind(id)
    .bind(ctx.workspace_id)
    .fetch_optional(&state.db)
    .await?;

    store.ok_or_else(|| AppError::NotFound("Vector store não encontrado".to_string()))
}

/// GET /api/agents/:agent_id/vector-stores
pub async fn list_agent_vector_stores(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(agent_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ctx.require("vector_stores.view")?;

    let agent_owned: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM agents WHERE id = $1 AND workspace_id = $2)",
    )
    .bind(agent_id)
    .bind(ctx.workspace_id)
    .fetch_one(&state.db)
    .await?;
    if !agent_owned {
        return Err(AppError::NotFound("Agente não encontrado".to_string()));
    }

    let stores: Vec<VectorStoreRecord> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, agent_id, openai_vector_store_id, name, created_at
        FROM vector_stores
        WHERE workspace_id = $1 AND agent_id = $2
        ORDER BY created_at
        "#,
    )
    .bind(ctx.workspace_id)
    .bind(agent_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "vector_stores": stores, "count": stores.len() })))
}

/// POST /api/agents/:agent_id/vector-stores
pub async fn create_vector_store(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(agent_id): Path<Uuid>,
    Json(body): Json<CreateVectorStoreBody>,
) -> Result<Json<Value>, AppError> {
    log_request_received("/api/agents/:agent_id/vector-stores", "POST");
    ctx.require("vector_stores.create")?;

    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::ValidationError("Nome obrigatório".to_string()));
    }

    let agent_owned: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM agents WHERE id = $1 AND workspace_id = $2)",
    )
    .bind(agent_id)
    .bind(ctx.workspace_id)
    .fetch_one(&state.db)
    .await?;
    if !agent_owned {
        return Err(AppError::NotFound("Agente não encontrado".to_string()));
    }

    let manager = require_manager(&state, &ctx).await?;

    let mut tx = state.db.begin().await?;

    let remote = manager.create(&name).await?;

    let store_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO vector_stores (workspace_id, agent_id, openai_vector_store_id, name)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(ctx.workspace_id)
    .bind(agent_id)
    .bind(&remote.id)
    .bind(&name)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Json(json!({
        "id": store_id,
        "openai_vector_store_id": remote.id,
        "message": "Vector store criado"
    })))
}

/// DELETE /api/vector-stores/:id
pub async fn delete_vector_store(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ctx.require("vector_stores.delete")?;

    let store = fetch_workspace_store(&state, &ctx, id).await?;
    let manager = require_manager(&state, &ctx).await?;

    match manager.delete(&store.openai_vector_store_id).await {
        Ok(()) => {}
        Err(openai_assistants::OpenAiError::NotFound(_)) => {
            log_warning(&format!(
                "Vector store {} já não existia na OpenAI",
                store.openai_vector_store_id
            ));
        }
        Err(e) => return Err(e.into()),
    }

    sqlx::query("DELETE FROM vector_stores WHERE id = $1 AND workspace_id = $2")
        .bind(id)
        .bind(ctx.workspace_id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({ "message": "Vector store excluído" })))
}

/// POST /api/vector-stores/:id/files
pub async fn add_vector_store_file(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<AddFileBody>,
) -> Result<Json<Value>, AppError> {
    ctx.require("vector_stores.update")?;

    let file_id = body.file_id.trim().to_string();
    if file_id.is_empty() {
        return Err(AppError::ValidationError("file_id obrigatório".to_string()));
    }

    let store = fetch_workspace_store(&state, &ctx, id).await?;
    let manager = require_manager(&state, &ctx).await?;

    let file = manager.add_file(&store.openai_vector_store_id, &file_id).await?;

    Ok(Json(json!({ "file": file, "message": "Arquivo anexado" })))
}

/// GET /api/vector-stores/:id/files
pub async fn list_vector_store_files(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ctx.require("vector_stores.view")?;

    let store = fetch_workspace_store(&state, &ctx, id).await?;
    let manager = require_manager(&state, &ctx).await?;

    let files = manager.list_files(&store.openai_vector_store_id).await?;

    Ok(Json(json!({ "files": files, "count": files.len() })))
}

/// DELETE /api/vector-stores/:id/files/:file_id
pub async fn delete_vector_store_file(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path((id, file_id)): Path<(Uuid, String)>,
) -> Result<Json<Value>, AppError> {
    ctx.require("vector_stores.update")?;

    let store = fetch_workspace_store(&state, &ctx, id).await?;
    let manager = require_manager(&state, &ctx).await?;

    manager.delete_file(&store.openai_vector_store_id, &file_id).await?;

    Ok(Json(json!({ "message": "Arquivo removido" })))
}
