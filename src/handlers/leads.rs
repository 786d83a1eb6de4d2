//! CRM: leads e vínculo com tags
//!
//! Toda query filtra por `workspace_id`; mutações re-verificam a posse da
//! linha (read-then-check-then-write) e posse ausente responde 404.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::middleware::RequestContext;
use crate::models::{Lead, Tag};
use crate::utils::logging::*;
use crate::utils::{normalize_phone, AppError, AppResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateLeadBody {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub stage: Option<String>,
    pub source: Option<String>,
    pub assigned_user_id: Option<Uuid>,
    pub custom_fields: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLeadBody {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub source: Option<String>,
    pub assigned_user_id: Option<Uuid>,
    pub custom_fields: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStageBody {
    pub stage: String,
}

#[derive(Debug, Deserialize)]
pub struct ListLeadsQuery {
    pub stage: Option<String>,
    pub search: Option<String>,
}

async fn fetch_workspace_lead(state: &AppState, ctx: &RequestContext, id: Uuid) -> AppResult<Lead> {
    let lead: Option<Lead> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, name, phone, email, stage, source,
               assigned_user_id, custom_fields, created_at, updated_at
        FROM leads
        WHERE id = $1 AND workspace_id = $2
        "#,
    )
    .bind(id)
    .bind(ctx.workspace_id)
    .fetch_optional(&state.db)
    .await?;

    lead.ok_or_else(|| AppError::NotFound("Lead não encontrado".to_string()))
}

/// GET /api/leads
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Query(query): Query<ListLeadsQuery>,
) -> Result<Json<Value>, AppError> {
    ctx.require("leads.view")?;

    let search = query.search.map(|s| format!("%{}%", s.trim()));

    let leads: Vec<Lead> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, name, phone, email, stage, source,
               assigned_user_id, custom_fields, created_at, updated_at
        FROM leads
        WHERE workspace_id = $1
          AND ($2::text IS NULL OR stage = $2)
          AND ($3::text IS NULL OR name ILIKE $3 OR email ILIKE $3 OR phone ILIKE $3)
        ORDER BY updated_at DESC
        "#,
    )
    .bind(ctx.workspace_id)
    .bind(query.stage)
    .bind(search)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "leads": leads, "count": leads.len() })))
}

/// GET /api/leads/:id — lead com as tags vinculadas
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ctx.require("leads.view")?;

    let lead = fetch_workspace_lead(&state, &ctx, id).await?;

    let tags: Vec<Tag> = sqlx::query_as(
        r#"
        SELECT t.id, t.workspace_id, t.name, t.color, t.created_at
        FROM tags t
        JOIN lead_tags lt ON lt.tag_id = t.id
        WHERE lt.lead_id = $1
        ORDER BY t.name
        "#,
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "lead": lead, "tags": tags })))
}

/// POST /api/leads
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Json(body): Json<CreateLeadBody>,
) -> Result<Json<Value>, AppError> {
    log_request_received("/api/leads", "POST");
    ctx.require("leads.create")?;

    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::ValidationError("Nome obrigatório".to_string()));
    }

    // Responsável, se informado, precisa ser do mesmo workspace
    if let Some(user_id) = body.assigned_user_id {
        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND workspace_id = $2)",
        )
        .bind(user_id)
        .bind(ctx.workspace_id)
        .fetch_one(&state.db)
        .await?;
        if !owned {
            return Err(AppError::NotFound("Usuário responsável não encontrado".to_string()));
        }
    }

    let phone = body.phone.map(|p| normalize_phone(&p)).filter(|p| !p.is_empty());
    let stage = body.stage.unwrap_or_else(|| "novo".to_string());

    let lead_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO leads (workspace_id, name, phone, email, stage, source, assigned_user_id, custom_fields)
        VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, '{}'::jsonb))
        RETURNING id
        "#,
    )
    .bind(ctx.workspace_id)
    .bind(&name)
    .bind(&phone)
    .bind(&body.email)
    .bind(&stage)
    .bind(&body.source)
    .bind(body.assigned_user_id)
    .bind(&body.custom_fields)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({ "id": lead_id, "message": "Lead criado" })))
}

/// PATCH /api/leads/:id
pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateLeadBody>,
) -> Result<Json<Value>, AppError> {
    ctx.require("leads.update")?;

    let lead = fetch_workspace_lead(&state, &ctx, id).await?;

    if let Some(user_id) = body.assigned_user_id {
        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = $1 AND workspace_id = $2)",
        )
        .bind(user_id)
        .bind(ctx.workspace_id)
        .fetch_one(&state.db)
        .await?;
        if !owned {
            return Err(AppError::NotFound("Usuário responsável não encontrado".to_string()));
        }
    }

    let name = body
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or(lead.name);
    let phone = body
        .phone
        .map(|p| normalize_phone(&p))
        .filter(|p| !p.is_empty())
        .or(lead.phone);
    let email = body.email.or(lead.email);
    let source = body.source.or(lead.source);
    let assigned = body.assigned_user_id.or(lead.assigned_user_id);
    let custom_fields = body.custom_fields.unwrap_or(lead.custom_fields);

    sqlx::query(
        r#"
        UPDATE leads
        SET name = $1, phone = $2, email = $3, source = $4,
            assigned_user_id = $5, custom_fields = $6, updated_at = now()
        WHERE id = $7 AND workspace_id = $8
        "#,
    )
    .bind(&name)
    .bind(&phone)
    .bind(&email)
    .bind(&source)
    .bind(assigned)
    .bind(&custom_fields)
    .bind(id)
    .bind(ctx.workspace_id)
    .execute(&state.db)
    .await?;

    Ok(Json(json!({ "message": "Lead atualizado" })))
}

/// PATCH /api/leads/:id/stage
///
/// Mudança de estágio e carimbo nas conversas do lead na MESMA transação.
pub async fn update_lead_stage(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStageBody>,
) -> Result<Json<Value>, AppError> {
    ctx.require("leads.update")?;

    let stage = body.stage.trim().to_string();
    if stage.is_empty() {
        return Err(AppError::ValidationError("Estágio obrigatório".to_string()));
    }

    let mut tx = state.db.begin().await?;

    let updated = sqlx::query(
        "UPDATE leads SET stage = $1, updated_at = now() WHERE id = $2 AND workspace_id = $3",
    )
    .bind(&stage)
    .bind(id)
    .bind(ctx.workspace_id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("Lead não encontrado".to_string()));
    }

    sqlx::query(
        "UPDATE conversations SET last_message_at = now() WHERE lead_id = $1 AND workspace_id = $2",
    )
    .bind(id)
    .bind(ctx.workspace_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    log_info(&format!("Lead {} movido para estágio '{}'", id, stage));

    Ok(Json(json!({ "message": "Estágio atualizado", "stage": stage })))
}

/// DELETE /api/leads/:id
pub async fn delete_lead(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ctx.require("leads.delete")?;

    let deleted = sqlx::query("DELETE FROM leads WHERE id = $1 AND workspace_id = $2")
        .bind(id)
        .bind(ctx.workspace_id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Lead não encontrado".to_string()));
    }

    Ok(Json(json!({ "message": "Lead excluído" })))
}

/// POST /api/leads/:id/tags/:tag_id — as duas pontas são verificadas
pub async fn add_lead_tag(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path((id, tag_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    ctx.require("leads.update")?;

    fetch_workspace_lead(&state, &ctx, id).await?;

    let tag_owned: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM tags WHERE id = $1 AND workspace_id = $2)",
    )
    .bind(tag_id)
    .bind(ctx.workspace_id)
    .fetch_one(&state.db)
    .await?;
    if !tag_owned {
        return Err(AppError::NotFound("Tag não encontrada".to_string()));
    }

    sqlx::query(
        "INSERT INTO lead_tags (lead_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(id)
    .bind(tag_id)
    .execute(&state.db)
    .await?;

    Ok(Json(json!({ "message": "Tag vinculada" })))
}

/// DELETE /api/leads/:id/tags/:tag_id
pub async fn remove_lead_tag(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path((id, tag_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    ctx.require("leads.update")?;

    fetch_workspace_lead(&state, &ctx, id).await?;

    sqlx::query("DELETE FROM lead_tags WHERE lead_id = $1 AND tag_id = $2")
        .bind(id)
        .bind(tag_id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({ "message": "Tag desvinculada" })))
}
