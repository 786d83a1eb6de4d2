//! Conversas e mensagens
//!
//! O envio de mensagem grava localmente SOMENTE depois do provedor aceitar;
//! falha do provedor responde 502 sem efeito local.

use axum::{
    extract::{Path, Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::middleware::RequestContext;
use crate::models::{Conversation, DisparaJaConnection, Lead, Message, WhatsAppCloudConnection};
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListConversationsQuery {
    pub lead_id: Option<Uuid>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateConversationBody {
    pub lead_id: Uuid,
    pub channel: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateConversationBody {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageBody {
    pub content: String,
}

async fn fetch_workspace_conversation(
    state: &AppState,
    ctx: &RequestContext,
    id: Uuid,
) -> AppResult<Conversation> {
    let conversation: Option<Conversation> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, lead_id, channel, status, last_message_at, created_at
        FROM conversations
        WHERE id = $1 AND workspace_id = $2
        "#,
    )
    .bind(id)
    .bind(ctx.workspace_id)
    .fetch_optional(&state.db)
    .await?;

    conversation.ok_or_else(|| AppError::NotFound("Conversa não encontrada".to_string()))
}

/// GET /api/conversations
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Query(query): Query<ListConversationsQuery>,
) -> Result<Json<Value>, AppError> {
    ctx.require("conversations.view")?;

    let conversations: Vec<Conversation> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, lead_id, channel, status, last_message_at, created_at
        FROM conversations
        WHERE workspace_id = $1
          AND ($2::uuid IS NULL OR lead_id = $2)
          AND ($3::text IS NULL OR status = $3)
        ORDER BY last_message_at DESC NULLS LAST, created_at DESC
        "#,
    )
    .bind(ctx.workspace_id)
    .bind(query.lead_id)
    .bind(query.status)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "conversations": conversations, "count": conversations.len() })))
}

/// POST /api/conversations
pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Json(body): Json<CreateConversationBody>,
) -> Result<Json<Value>, AppError> {
    ctx.require("conversations.create")?;

    if body.channel != "disparaja" && body.channel != "whatsapp_cloud" {
        return Err(AppError::ValidationError("Canal inválido".to_string()));
    }

    let lead_owned: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM leads WHERE id = $1 AND workspace_id = $2)",
    )
    .bind(body.lead_id)
    .bind(ctx.workspace_id)
    .fetch_one(&state.db)
    .await?;
    if !lead_owned {
        return Err(AppError::NotFound("Lead não encontrado".to_string()));
    }

    let conversation_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO conversations (workspace_id, lead_id, channel)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(ctx.workspace_id)
    .bind(body.lead_id)
    .bind(&body.channel)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({ "id": conversation_id, "message": "Conversa criada" })))
}

/// PATCH /api/conversations/:id — abre/encerra
pub async fn update_conversation(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateConversationBody>,
) -> Result<Json<Value>, AppError> {
    ctx.require("conversations.update")?;

    if body.status != "open" && body.status != "closed" {
        return Err(AppError::ValidationError("Status inválido".to_string()));
    }

    let updated = sqlx::query(
        "UPDATE conversations SET status = $1 WHERE id = $2 AND workspace_id = $3",
    )
    .bind(&body.status)
    .bind(id)
    .bind(ctx.workspace_id)
    .execute(&state.db)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("Conversa não encontrada".to_string()));
    }

    Ok(Json(json!({ "message": "Conversa atualizada" })))
}

/// GET /api/conversations/:id/messages
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ctx.require("conversations.view")?;

    fetch_workspace_conversation(&state, &ctx, id).await?;

    let messages: Vec<Message> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, conversation_id, direction, content, created_at
        FROM messages
        WHERE conversation_id = $1 AND workspace_id = $2
        ORDER BY created_at
        "#,
    )
    .bind(id)
    .bind(ctx.workspace_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "messages": messages, "count": messages.len() })))
}

/// POST /api/conversations/:id/messages — envio outbound pelo canal da conversa
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<SendMessageBody>,
) -> Result<Json<Value>, AppError> {
    log_request_received("/api/conversations/:id/messages", "POST");
    ctx.require("conversations.update")?;

    let content = body.content.trim().to_string();
    if content.is_empty() {
        return Err(AppError::ValidationError("Mensagem vazia".to_string()));
    }

    let conversation = fetch_workspace_conversation(&state, &ctx, id).await?;
    if conversation.status != "open" {
        return Err(AppError::ValidationError("Conversa encerrada".to_string()));
    }

    let lead: Lead = sqlx::query_as(
        r#"
        SELECT id, workspace_id, name, phone, email, stage, source,
               assigned_user_id, custom_fields, created_at, updated_at
        FROM leads
        WHERE id = $1 AND workspace_id = $2
        "#,
    )
    .bind(conversation.lead_id)
    .bind(ctx.workspace_id)
    .fetch_one(&state.db)
    .await?;

    let phone = lead
        .phone
        .ok_or_else(|| AppError::ValidationError("Lead sem telefone cadastrado".to_string()))?;

    // Despacho pelo canal da conversa; erro do provedor vira 502
    match conversation.channel.as_str() {
        "disparaja" => {
            let connection: Option<DisparaJaConnection> = sqlx::query_as(
                r#"
                SELECT id, workspace_id, agent_id, instance_id, api_token,
                       phone_number, status, created_at, updated_at
                FROM disparaja_connections
                WHERE workspace_id = $1 AND status = 'connected'
                ORDER BY updated_at DESC
                LIMIT 1
                "#,
            )
            .bind(ctx.workspace_id)
            .fetch_optional(&state.db)
            .await?;

            let connection = connection.ok_or_else(|| {
                AppError::ValidationError("Nenhuma conexão Dispara-Já conectada".to_string())
            })?;

            let client = disparaja::DisparaJaClient::new(connection.api_token.clone())?;
            let manager = disparaja::MessageManager::new(client);
            manager.send_text(&connection.instance_id, &phone, &content).await?;
        }
        "whatsapp_cloud" => {
            let connection: Option<WhatsAppCloudConnection> = sqlx::query_as(
                r#"
                SELECT id, workspace_id, agent_id, phone_number_id, business_account_id,
                       access_token, status, created_at, updated_at
                FROM whatsapp_cloud_connections
                WHERE workspace_id = $1 AND status = 'connected'
                ORDER BY updated_at DESC
                LIMIT 1
                "#,
            )
            .bind(ctx.workspace_id)
            .fetch_optional(&state.db)
            .await?;

            let connection = connection.ok_or_else(|| {
                AppError::ValidationError("Nenhuma conexão WhatsApp Cloud ativa".to_string())
            })?;

            let client = whatsapp_cloud::WhatsAppCloudClient::new(connection.access_token.clone())?;
            client.send_text(&connection.phone_number_id, &phone, &content).await?;
        }
        other => {
            return Err(AppError::ValidationError(format!("Canal inválido: {}", other)));
        }
    }

    // Registro local só depois do provedor aceitar
    let mut tx = state.db.begin().await?;

    let message_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO messages (workspace_id, conversation_id, direction, content)
        VALUES ($1, $2, 'outbound', $3)
        RETURNING id
        "#,
    )
    .bind(ctx.workspace_id)
    .bind(id)
    .bind(&content)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE conversations SET last_message_at = now() WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    Ok(Json(json!({ "id": message_id, "message": "Mensagem enviada" })))
}
