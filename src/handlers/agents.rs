//! Agentes de IA e espelhamento na OpenAI
//!
//! Com `openai_api_key` configurada no workspace, criação/atualização/exclusão
//! são espelhadas na Assistants API. A linha local só é confirmada depois do
//! espelho remoto aceitar (a transação segura o insert até a resposta).

use axum::{
    extract::{Path, State},
    response::Json,
};
use openai_assistants::AssistantParams;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::middleware::RequestContext;
use crate::models::Agent;
use crate::services::openai::assistant_manager_for;
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateAgentBody {
    pub name: String,
    pub instructions: String,
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAgentBody {
    pub name: Option<String>,
    pub instructions: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub active: Option<bool>,
}

async fn fetch_workspace_agent(state: &AppState, ctx: &RequestContext, id: Uuid) -> AppResult<Agent> {
    let agent: Option<Agent> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, name, instructions, model, temperature,
               openai_assistant_id, active, created_at, updated_at
        FROM agents
        WHERE id = $1 AND workspace_id = $2
        "#,
    )
    .bind(id)
    .bind(ctx.workspace_id)
    .fetch_optional(&state.db)
    .await?;

    agent.ok_or_else(|| AppError::NotFound("Agente não encontrado".to_string()))
}

fn validate_temperature(temperature: f32) -> Result<(), AppError> {
    if (0.0..=2.0).contains(&temperature) {
        Ok(())
    } else {
        Err(AppError::ValidationError(
            "Temperatura deve estar entre 0.0 e 2.0".to_string(),
        ))
    }
}

/// GET /api/agents
pub async fn list_agents(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> Result<Json<Value>, AppError> {
    ctx.require("agents.view")?;

    let agents: Vec<Agent> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, name, instructions, model, temperature,
               openai_assistant_id, active, created_at, updated_at
        FROM agents
        WHERE workspace_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(ctx.workspace_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "agents": agents, "count": agents.len() })))
}

/// GET /api/agents/:id
pub async fn get_agent(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ctx.require("agents.view")?;
    let agent = fetch_workspace_agent(&state, &ctx, id).await?;
    Ok(Json(json!({ "agent": agent })))
}

/// POST /api/agents
pub async fn create_agent(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Json(body): Json<CreateAgentBody>,
) -> Result<Json<Value>, AppError> {
    log_request_received("/api/agents", "POST");
    ctx.require("agents.create")?;

    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::ValidationError("Nome obrigatório".to_string()));
    }
    let model = body.model.unwrap_or_else(|| "gpt-4o-mini".to_string());
    let temperature = body.temperature.unwrap_or(0.3);
    validate_temperature(temperature)?;

    let mut tx = state.db.begin().await?;

    let agent_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO agents (workspace_id, name, instructions, model, temperature)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(ctx.workspace_id)
    .bind(&name)
    .bind(&body.instructions)
    .bind(&model)
    .bind(temperature)
    .fetch_one(&mut *tx)
    .await?;

    // Espelho remoto: falha aqui desfaz o insert local (rollback no drop)
    let mut openai_assistant_id: Option<String> = None;
    if let Some(manager) = assistant_manager_for(&state.db, ctx.workspace_id).await? {
        let params = AssistantParams {
            name: name.clone(),
            instructions: body.instructions.clone(),
            model: model.clone(),
            temperature,
            vector_store_id: None,
        };
        let assistant = manager.create(&params).await?;

        sqlx::query("UPDATE agents SET openai_assistant_id = $1 WHERE id = $2")
            .bind(&assistant.id)
            .bind(agent_id)
            .execute(&mut *tx)
            .await?;

        openai_assistant_id = Some(assistant.id);
    }

    tx.commit().await?;

    log_info(&format!("Agente criado: {} ({})", name, agent_id));

    Ok(Json(json!({
        "id": agent_id,
        "openai_assistant_id": openai_assistant_id,
        "message": "Agente criado"
    })))
}

/// PATCH /api/agents/:id
pub async fn update_agent(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateAgentBody>,
) -> Result<Json<Value>, AppError> {
    ctx.require("agents.update")?;

    let agent = fetch_workspace_agent(&state, &ctx, id).await?;

    let name = body
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or(agent.name);
    let instructions = body.instructions.unwrap_or(agent.instructions);
    let model = body.model.unwrap_or(agent.model);
    let temperature = body.temperature.unwrap_or(agent.temperature);
    validate_temperature(temperature)?;
    let active = body.active.unwrap_or(agent.active);

    let mut tx = state.db.begin().await?;

    sqlx::query(
        r#"
        UPDATE agents
        SET name = $1, instructions = $2, model = $3, temperature = $4,
            active = $5, updated_at = now()
        WHERE id = $6 AND workspace_id = $7
        "#,
    )
    .bind(&name)
    .bind(&instructions)
    .bind(&model)
    .bind(temperature)
    .bind(active)
    .bind(id)
    .bind(ctx.workspace_id)
    .execute(&mut *tx)
    .await?;

    if let Some(manager) = assistant_manager_for(&state.db, ctx.workspace_id).await? {
        let params = AssistantParams {
            name: name.clone(),
            instructions: instructions.clone(),
            model: model.clone(),
            temperature,
            vector_store_id: None,
        };

        match agent.openai_assistant_id {
            Some(ref assistant_id) => {
                manager.update(assistant_id, &params).await?;
            }
            None => {
                // Agente criado antes da key ser configurada ganha espelho agora
                let assistant = manager.create(&params).await?;
                sqlx::query("UPDATE agents SET openai_assistant_id = $1 WHERE id = $2")
                    .bind(&assistant.id)
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
            }
        }
    }

    tx.commit().await?;

    Ok(Json(json!({ "message": "Agente atualizado" })))
}

/// DELETE /api/agents/:id
pub async fn delete_agent(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ctx.require("agents.delete")?;

    let agent = fetch_workspace_agent(&state, &ctx, id).await?;

    // Espelho remoto primeiro; assistant já removido lá não bloqueia a limpeza
    if let Some(ref assistant_id) = agent.openai_assistant_id {
        if let Some(manager) = assistant_manager_for(&state.db, ctx.workspace_id).await? {
            match manager.delete(assistant_id).await {
                Ok(()) => {}
                Err(openai_assistants::OpenAiError::NotFound(_)) => {
                    log_warning(&format!(
                        "Assistant {} já não existia na OpenAI",
                        assistant_id
                    ));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    sqlx::query("DELETE FROM agents WHERE id = $1 AND workspace_id = $2")
        .bind(id)
        .bind(ctx.workspace_id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({ "message": "Agente excluído" })))
}
