//! Grupos de permissões (workspace-local) e catálogo global

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::middleware::RequestContext;
use crate::models::{Permission, PermissionGroup, ResolvedGroupItem};
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateGroupBody {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateGroupBody {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct GroupItemBody {
    /// Chave do catálogo, ex.: `leads.delete`
    pub key: String,
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
pub struct PutItemsBody {
    pub items: Vec<GroupItemBody>,
}

async fn fetch_workspace_group(
    state: &AppState,
    ctx: &RequestContext,
    id: Uuid,
) -> AppResult<PermissionGroup> {
    let group: Option<PermissionGroup> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, name, is_default, is_custom, created_at
        FROM permission_groups
        WHERE id = $1 AND workspace_id = $2
        "#,
    )
    .bind(id)
    .bind(ctx.workspace_id)
    .fetch_optional(&state.db)
    .await?;

    group.ok_or_else(|| AppError::NotFound("Grupo de permissões não encontrado".to_string()))
}

/// GET /api/permissions — catálogo global, somente leitura
pub async fn list_permissions(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> Result<Json<Value>, AppError> {
    ctx.require("permission_groups.view")?;

    let permissions: Vec<Permission> = sqlx::query_as(
        "SELECT id, key, category, subcategory, default_value FROM permissions ORDER BY key",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "permissions": permissions })))
}

/// GET /api/permission-groups
pub async fn list_groups(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> Result<Json<Value>, AppError> {
    ctx.require("permission_groups.view")?;

    let groups: Vec<PermissionGroup> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, name, is_default, is_custom, created_at
        FROM permission_groups
        WHERE workspace_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(ctx.workspace_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "groups": groups })))
}

/// GET /api/permission-groups/:id — grupo com itens resolvidos
pub async fn get_group(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ctx.require("permission_groups.view")?;

    let group = fetch_workspace_group(&state, &ctx, id).await?;

    let items: Vec<ResolvedGroupItem> = sqlx::query_as(
        r#"
        SELECT p.key, pgi.enabled
        FROM permission_group_items pgi
        JOIN permissions p ON p.id = pgi.permission_id
        WHERE pgi.group_id = $1
        ORDER BY p.key
        "#,
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "group": group, "items": items })))
}

/// POST /api/permission-groups
pub async fn create_group(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Json(body): Json<CreateGroupBody>,
) -> Result<Json<Value>, AppError> {
    log_request_received("/api/permission-groups", "POST");
    ctx.require("permission_groups.create")?;

    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::ValidationError("Nome obrigatório".to_string()));
    }

    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM permission_groups WHERE workspace_id = $1 AND name = $2)",
    )
    .bind(ctx.workspace_id)
    .bind(&name)
    .fetch_one(&state.db)
    .await?;
    if taken {
        return Err(AppError::Conflict("Já existe um grupo com este nome".to_string()));
    }

    let group_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO permission_groups (workspace_id, name, is_default, is_custom)
        VALUES ($1, $2, FALSE, TRUE)
        RETURNING id
        "#,
    )
    .bind(ctx.workspace_id)
    .bind(&name)
    .fetch_one(&state.db)
    .await?;

    log_info(&format!("Grupo de permissões criado: {} ({})", name, group_id));

    Ok(Json(json!({ "id": group_id, "message": "Grupo criado" })))
}

/// PATCH /api/permission-groups/:id
pub async fn update_group(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateGroupBody>,
) -> Result<Json<Value>, AppError> {
    ctx.require("permission_groups.update")?;

    let group = fetch_workspace_group(&state, &ctx, id).await?;
    if group.is_default {
        return Err(AppError::ValidationError(
            "O grupo padrão não pode ser renomeado".to_string(),
        ));
    }

    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::ValidationError("Nome obrigatório".to_string()));
    }

    sqlx::query("UPDATE permission_groups SET name = $1 WHERE id = $2 AND workspace_id = $3")
        .bind(&name)
        .bind(id)
        .bind(ctx.workspace_id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({ "message": "Grupo atualizado" })))
}

/// PUT /api/permission-groups/:id/items
///
/// Substituição integral dos itens em uma transação (delete + insert).
/// Chaves fora do catálogo são recusadas.
pub async fn put_group_items(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<PutItemsBody>,
) -> Result<Json<Value>, AppError> {
    ctx.require("permission_groups.update")?;

    let group = fetch_workspace_group(&state, &ctx, id).await?;
    if !group.is_custom {
        return Err(AppError::ValidationError(
            "Somente grupos customizados têm itens editáveis".to_string(),
        ));
    }

    let mut tx = state.db.begin().await?;

    sqlx::query("DELETE FROM permission_group_items WHERE group_id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    for item in &body.items {
        let permission_id: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM permissions WHERE key = $1")
                .bind(&item.key)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(permission_id) = permission_id else {
            return Err(AppError::ValidationError(format!(
                "Permissão desconhecida: {}",
                item.key
            )));
        };

        sqlx::query(
            r#"
            INSERT INTO permission_group_items (group_id, permission_id, enabled)
            VALUES ($1, $2, $3)
            ON CONFLICT (group_id, permission_id) DO UPDATE SET enabled = EXCLUDED.enabled
            "#,
        )
        .bind(id)
        .bind(permission_id)
        .bind(item.enabled)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;

    Ok(Json(json!({
        "message": "Itens atualizados",
        "count": body.items.len()
    })))
}

/// DELETE /api/permission-groups/:id
///
/// Usuários apontando para o grupo voltam a `permission_group_id = NULL`
/// (FK com SET NULL); os itens caem em cascata.
pub async fn delete_group(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ctx.require("permission_groups.delete")?;

    let group = fetch_workspace_group(&state, &ctx, id).await?;
    if group.is_default {
        return Err(AppError::ValidationError(
            "O grupo padrão não pode ser excluído".to_string(),
        ));
    }

    sqlx::query("DELETE FROM permission_groups WHERE id = $1 AND workspace_id = $2")
        .bind(id)
        .bind(ctx.workspace_id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({ "message": "Grupo excluído" })))
}
