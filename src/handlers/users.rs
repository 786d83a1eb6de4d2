//! Gestão de usuários do workspace

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::middleware::RequestContext;
use crate::models::{User, UserProfile};
use crate::utils::logging::*;
use crate::utils::{is_valid_email, normalize_email, AppError, AppResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: String,
    pub permission_group_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserBody {
    pub name: Option<String>,
    pub role: Option<String>,
    pub permission_group_id: Option<Uuid>,
    /// Remove o grupo atual quando `true`
    #[serde(default)]
    pub clear_permission_group: bool,
    /// Override bruto (resource -> action -> boolean); `{}` limpa o override
    pub permissions: Option<Value>,
}

async fn fetch_workspace_user(state: &AppState, ctx: &RequestContext, id: Uuid) -> AppResult<User> {
    // Checagem de posse: id de outro workspace responde 404, nunca 403
    let user: Option<User> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, email, name, password_hash, role, status,
               permissions, permission_group_id, created_at, updated_at
        FROM users
        WHERE id = $1 AND workspace_id = $2
        "#,
    )
    .bind(id)
    .bind(ctx.workspace_id)
    .fetch_optional(&state.db)
    .await?;

    user.ok_or_else(|| AppError::NotFound("Usuário não encontrado".to_string()))
}

async fn ensure_group_in_workspace(
    state: &AppState,
    ctx: &RequestContext,
    group_id: Uuid,
) -> AppResult<()> {
    let owned: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM permission_groups WHERE id = $1 AND workspace_id = $2)",
    )
    .bind(group_id)
    .bind(ctx.workspace_id)
    .fetch_one(&state.db)
    .await?;
    if owned {
        Ok(())
    } else {
        Err(AppError::NotFound("Grupo de permissões não encontrado".to_string()))
    }
}

/// GET /api/users — listagem do workspace do chamador
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> Result<Json<Value>, AppError> {
    ctx.require("users.view")?;

    let users: Vec<UserProfile> = sqlx::query_as(
        r#"
        SELECT id, email, name, role, status, permission_group_id, created_at
        FROM users
        WHERE workspace_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(ctx.workspace_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "users": users, "count": users.len() })))
}

/// POST /api/users — criação direta por owner/admin (nasce `active`)
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Json(body): Json<CreateUserBody>,
) -> Result<Json<Value>, AppError> {
    log_request_received("/api/users", "POST");
    ctx.require("users.create")?;

    let email = normalize_email(&body.email);
    if !is_valid_email(&email) {
        return Err(AppError::ValidationError("E-mail inválido".to_string()));
    }
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::ValidationError("Nome obrigatório".to_string()));
    }
    if body.role != "admin" && body.role != "user" {
        return Err(AppError::ValidationError("Perfil deve ser admin ou user".to_string()));
    }
    if let Some(group_id) = body.permission_group_id {
        ensure_group_in_workspace(&state, &ctx, group_id).await?;
    }

    let taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(&email)
        .fetch_one(&state.db)
        .await?;
    if taken {
        return Err(AppError::Conflict("E-mail já cadastrado".to_string()));
    }

    let password_hash = hash_password(&body.password)?;

    let user_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO users (workspace_id, email, name, password_hash, role, status, permission_group_id)
        VALUES ($1, $2, $3, $4, $5, 'active', $6)
        RETURNING id
        "#,
    )
    .bind(ctx.workspace_id)
    .bind(&email)
    .bind(&name)
    .bind(&password_hash)
    .bind(&body.role)
    .bind(body.permission_group_id)
    .fetch_one(&state.db)
    .await?;

    log_info(&format!("Usuário criado: {} ({})", email, user_id));

    Ok(Json(json!({ "id": user_id, "message": "Usuário criado" })))
}

/// PATCH /api/users/:id
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateUserBody>,
) -> Result<Json<Value>, AppError> {
    log_request_received("/api/users/:id", "PATCH");
    ctx.require("users.update")?;

    let target = fetch_workspace_user(&state, &ctx, id).await?;

    if let Some(ref role) = body.role {
        if role != "owner" && role != "admin" && role != "user" {
            return Err(AppError::ValidationError("Perfil inválido".to_string()));
        }
        // Ninguém muda o próprio perfil; mexer em owner (ou promover a owner)
        // é privilégio de owner
        if target.id == ctx.user_id {
            return Err(AppError::Forbidden("Não é possível alterar o próprio perfil".to_string()));
        }
        if (target.role == "owner" || role == "owner") && ctx.role != "owner" {
            return Err(AppError::Forbidden(
                "Somente o owner altera perfis de owner".to_string(),
            ));
        }
    }

    if let Some(group_id) = body.permission_group_id {
        ensure_group_in_workspace(&state, &ctx, group_id).await?;
    }

    let name = body
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or(target.name);
    let role = body.role.unwrap_or(target.role);
    let permission_group_id = if body.clear_permission_group {
        None
    } else {
        body.permission_group_id.or(target.permission_group_id)
    };
    let permissions = match body.permissions {
        Some(value) if value == Value::Object(Default::default()) => None,
        Some(value) => Some(value),
        None => target.permissions,
    };

    sqlx::query(
        r#"
        UPDATE users
        SET name = $1, role = $2, permission_group_id = $3, permissions = $4, updated_at = now()
        WHERE id = $5 AND workspace_id = $6
        "#,
    )
    .bind(&name)
    .bind(&role)
    .bind(permission_group_id)
    .bind(&permissions)
    .bind(id)
    .bind(ctx.workspace_id)
    .execute(&state.db)
    .await?;

    Ok(Json(json!({ "message": "Usuário atualizado" })))
}

/// DELETE /api/users/:id
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    log_request_received("/api/users/:id", "DELETE");
    ctx.require("users.delete")?;

    let target = fetch_workspace_user(&state, &ctx, id).await?;

    if target.id == ctx.user_id {
        return Err(AppError::Forbidden("Não é possível excluir a própria conta".to_string()));
    }

    // O workspace nunca fica sem owner
    if target.role == "owner" {
        let owners: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE workspace_id = $1 AND role = 'owner'",
        )
        .bind(ctx.workspace_id)
        .fetch_one(&state.db)
        .await?;
        if owners <= 1 {
            return Err(AppError::Conflict(
                "Não é possível excluir o último owner do workspace".to_string(),
            ));
        }
        if ctx.role != "owner" {
            return Err(AppError::Forbidden("Somente o owner exclui outro owner".to_string()));
        }
    }

    sqlx::query("DELETE FROM users WHERE id = $1 AND workspace_id = $2")
        .bind(id)
        .bind(ctx.workspace_id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({ "message": "Usuário excluído" })))
}
