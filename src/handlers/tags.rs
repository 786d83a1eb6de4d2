//! Tags do workspace

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::middleware::RequestContext;
use crate::models::Tag;
use crate::utils::AppError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTagBody {
    pub name: String,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTagBody {
    pub name: Option<String>,
    pub color: Option<String>,
}

/// GET /api/tags
pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> Result<Json<Value>, AppError> {
    ctx.require("tags.view")?;

    let tags: Vec<Tag> = sqlx::query_as(
        "SELECT id, workspace_id, name, color, created_at FROM tags WHERE workspace_id = $1 ORDER BY name",
    )
    .bind(ctx.workspace_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "tags": tags, "count": tags.len() })))
}

/// POST /api/tags — nome duplicado no workspace responde 409
pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Json(body): Json<CreateTagBody>,
) -> Result<Json<Value>, AppError> {
    ctx.require("tags.create")?;

    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::ValidationError("Nome obrigatório".to_string()));
    }

    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM tags WHERE workspace_id = $1 AND name = $2)",
    )
    .bind(ctx.workspace_id)
    .bind(&name)
    .fetch_one(&state.db)
    .await?;
    if taken {
        return Err(AppError::Conflict("Já existe uma tag com este nome".to_string()));
    }

    let color = body.color.unwrap_or_else(|| "#999999".to_string());

    let tag_id: Uuid = sqlx::query_scalar(
        "INSERT INTO tags (workspace_id, name, color) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(ctx.workspace_id)
    .bind(&name)
    .bind(&color)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({ "id": tag_id, "message": "Tag criada" })))
}

/// PATCH /api/tags/:id
pub async fn update_tag(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTagBody>,
) -> Result<Json<Value>, AppError> {
    ctx.require("tags.update")?;

    let tag: Option<Tag> = sqlx::query_as(
        "SELECT id, workspace_id, name, color, created_at FROM tags WHERE id = $1 AND workspace_id = $2",
    )
    .bind(id)
    .bind(ctx.workspace_id)
    .fetch_optional(&state.db)
    .await?;
    let tag = tag.ok_or_else(|| AppError::NotFound("Tag não encontrada".to_string()))?;

    let name = body
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or(tag.name.clone());
    let color = body.color.unwrap_or(tag.color);

    if name != tag.name {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM tags WHERE workspace_id = $1 AND name = $2 AND id <> $3)",
        )
        .bind(ctx.workspace_id)
        .bind(&name)
        .bind(id)
        .fetch_one(&state.db)
        .await?;
        if taken {
            return Err(AppError::Conflict("Já existe uma tag com este nome".to_string()));
        }
    }

    sqlx::query("UPDATE tags SET name = $1, color = $2 WHERE id = $3 AND workspace_id = $4")
        .bind(&name)
        .bind(&color)
        .bind(id)
        .bind(ctx.workspace_id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({ "message": "Tag atualizada" })))
}

/// DELETE /api/tags/:id
pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ctx.require("tags.delete")?;

    let deleted = sqlx::query("DELETE FROM tags WHERE id = $1 AND workspace_id = $2")
        .bind(id)
        .bind(ctx.workspace_id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Tag não encontrada".to_string()));
    }

    Ok(Json(json!({ "message": "Tag excluída" })))
}
