//! Definições de campos de contato por workspace (tabela `contact_fields`)

use axum::{
    extract::{Path, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::middleware::RequestContext;
use crate::models::ContactField;
use crate::utils::AppError;
use crate::AppState;

const FIELD_TYPES: &[&str] = &["text", "number", "date", "select", "boolean"];

#[derive(Debug, Deserialize)]
pub struct CreateContactFieldBody {
    pub name: String,
    pub field_type: String,
    #[serde(default)]
    pub required: bool,
    pub options: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateContactFieldBody {
    pub name: Option<String>,
    pub field_type: Option<String>,
    pub required: Option<bool>,
    pub options: Option<Value>,
}

fn validate_field_type(field_type: &str) -> Result<(), AppError> {
    if FIELD_TYPES.contains(&field_type) {
        Ok(())
    } else {
        Err(AppError::ValidationError(format!(
            "Tipo de campo inválido: {}",
            field_type
        )))
    }
}

/// GET /api/contact-fields
pub async fn list_contact_fields(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> Result<Json<Value>, AppError> {
    ctx.require("contact_fields.view")?;

    let fields: Vec<ContactField> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, name, field_type, required, options, created_at
        FROM contact_fields
        WHERE workspace_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(ctx.workspace_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "fields": fields, "count": fields.len() })))
}

/// POST /api/contact-fields
pub async fn create_contact_field(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Json(body): Json<CreateContactFieldBody>,
) -> Result<Json<Value>, AppError> {
    ctx.require("contact_fields.create")?;

    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::ValidationError("Nome obrigatório".to_string()));
    }
    validate_field_type(&body.field_type)?;

    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM contact_fields WHERE workspace_id = $1 AND name = $2)",
    )
    .bind(ctx.workspace_id)
    .bind(&name)
    .fetch_one(&state.db)
    .await?;
    if taken {
        return Err(AppError::Conflict("Já existe um campo com este nome".to_string()));
    }

    let field_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO contact_fields (workspace_id, name, field_type, required, options)
        VALUES ($1, $2, $3, $4, COALESCE($5, '[]'::jsonb))
        RETURNING id
        "#,
    )
    .bind(ctx.workspace_id)
    .bind(&name)
    .bind(&body.field_type)
    .bind(body.required)
    .bind(&body.options)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({ "id": field_id, "message": "Campo criado" })))
}

/// PATCH /api/contact-fields/:id
pub async fn update_contact_field(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateContactFieldBody>,
) -> Result<Json<Value>, AppError> {
    ctx.require("contact_fields.update")?;

    let field: Option<ContactField> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, name, field_type, required, options, created_at
        FROM contact_fields
        WHERE id = $1 AND workspace_id = $2
        "#,
    )
    .bind(id)
    .bind(ctx.workspace_id)
    .fetch_optional(&state.db)
    .await?;
    let field = field.ok_or_else(|| AppError::NotFound("Campo não encontrado".to_string()))?;

    if let Some(ref field_type) = body.field_type {
        validate_field_type(field_type)?;
    }

    let name = body
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or(field.name);
    let field_type = body.field_type.unwrap_or(field.field_type);
    let required = body.required.unwrap_or(field.required);
    let options = body.options.unwrap_or(field.options);

    sqlx::query(
        r#"
        UPDATE contact_fields
        SET name = $1, field_type = $2, required = $3, options = $4
        WHERE id = $5 AND workspace_id = $6
        "#,
    )
    .bind(&name)
    .bind(&field_type)
    .bind(required)
    .bind(&options)
    .bind(id)
    .bind(ctx.workspace_id)
    .execute(&state.db)
    .await?;

    Ok(Json(json!({ "message": "Campo atualizado" })))
}

/// DELETE /api/contact-fields/:id
pub async fn delete_contact_field(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ctx.require("contact_fields.delete")?;

    let deleted = sqlx::query("DELETE FROM contact_fields WHERE id = $1 AND workspace_id = $2")
        .bind(id)
        .bind(ctx.workspace_id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Campo não encontrado".to_string()));
    }

    Ok(Json(json!({ "message": "Campo excluído" })))
}
