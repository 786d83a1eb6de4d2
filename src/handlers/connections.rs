//! Conexões de canal: Dispara-Já e WhatsApp Cloud
//!
//! As credenciais são validadas no provedor ANTES de persistir. O connect do
//! Dispara-Já é find-or-create atômico por `(workspace_id, instance_id)`
//! (upsert), e a ingestão de logs verifica a assinatura HMAC da instância.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::middleware::RequestContext;
use crate::models::{DisparaJaConnection, DisparaJaLog, WhatsAppCloudConnection};
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;
use disparaja::{DisparaJaClient, InstanceManager, WebhookEvent};
use whatsapp_cloud::WhatsAppCloudClient;

#[derive(Debug, Deserialize)]
pub struct ConnectDisparaJaBody {
    pub instance_id: String,
    pub api_token: String,
    pub agent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct ConnectWhatsAppCloudBody {
    pub phone_number_id: String,
    pub business_account_id: String,
    pub access_token: String,
    pub agent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    pub status: String,
}

async fn ensure_agent_in_workspace(
    state: &AppState,
    ctx: &RequestContext,
    agent_id: Uuid,
) -> AppResult<()> {
    let owned: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM agents WHERE id = $1 AND workspace_id = $2)",
    )
    .bind(agent_id)
    .bind(ctx.workspace_id)
    .fetch_one(&state.db)
    .await?;
    if owned {
        Ok(())
    } else {
        Err(AppError::NotFound("Agente não encontrado".to_string()))
    }
}

async fn fetch_workspace_disparaja(
    state: &AppState,
    ctx: &RequestContext,
    id: Uuid,
) -> AppResult<DisparaJaConnection> {
    let connection: Option<DisparaJaConnection> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, agent_id, instance_id, api_token,
               phone_number, status, created_at, updated_at
        FROM disparaja_connections
        WHERE id = $1 AND workspace_id = $2
        "#,
    )
    .bind(id)
    .bind(ctx.workspace_id)
    .fetch_optional(&state.db)
    .await?;

    connection.ok_or_else(|| AppError::NotFound("Conexão não encontrada".to_string()))
}

// ---------------------------------------------------------------------------
// Dispara-Já
// ---------------------------------------------------------------------------

/// POST /api/connections/disparaja — find-or-create atômico
pub async fn connect_disparaja(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Json(body): Json<ConnectDisparaJaBody>,
) -> Result<Json<Value>, AppError> {
    log_request_received("/api/connections/disparaja", "POST");
    ctx.require("connections.create")?;

    let instance_id = body.instance_id.trim().to_string();
    if instance_id.is_empty() || body.api_token.trim().is_empty() {
        return Err(AppError::ValidationError(
            "instance_id e api_token são obrigatórios".to_string(),
        ));
    }
    if let Some(agent_id) = body.agent_id {
        ensure_agent_in_workspace(&state, &ctx, agent_id).await?;
    }

    // Credenciais validadas no provedor antes de tocar o banco
    let client = DisparaJaClient::new(body.api_token.trim())?;
    let manager = InstanceManager::new(client);
    let instance = manager.get_instance(&instance_id).await?;

    let connection_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO disparaja_connections
            (workspace_id, agent_id, instance_id, api_token, phone_number, status)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (workspace_id, instance_id) DO UPDATE
            SET api_token = EXCLUDED.api_token,
                agent_id = EXCLUDED.agent_id,
                phone_number = EXCLUDED.phone_number,
                status = EXCLUDED.status,
                updated_at = now()
        RETURNING id
        "#,
    )
    .bind(ctx.workspace_id)
    .bind(body.agent_id)
    .bind(&instance_id)
    .bind(body.api_token.trim())
    .bind(&instance.phone_number)
    .bind(instance.status.as_str())
    .fetch_one(&state.db)
    .await?;

    log_channel_event("disparaja", &instance_id, "connected-or-updated");

    Ok(Json(json!({
        "id": connection_id,
        "status": instance.status.as_str(),
        "phone_number": instance.phone_number,
        "message": "Conexão registrada"
    })))
}

/// GET /api/connections/disparaja
pub async fn list_disparaja_connections(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> Result<Json<Value>, AppError> {
    ctx.require("connections.view")?;

    let connections: Vec<DisparaJaConnection> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, agent_id, instance_id, api_token,
               phone_number, status, created_at, updated_at
        FROM disparaja_connections
        WHERE workspace_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(ctx.workspace_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "connections": connections, "count": connections.len() })))
}

/// PATCH /api/connections/disparaja/:id/status
pub async fn update_disparaja_status(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<Value>, AppError> {
    ctx.require("connections.update")?;

    if !["pending", "connected", "disconnected"].contains(&body.status.as_str()) {
        return Err(AppError::ValidationError("Status inválido".to_string()));
    }

    let updated = sqlx::query(
        r#"
        UPDATE disparaja_connections
        SET status = $1, updated_at = now()
        WHERE id = $2 AND workspace_id = $3
        "#,
    )
    .bind(&body.status)
    .bind(id)
    .bind(ctx.workspace_id)
    .execute(&state.db)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("Conexão não encontrada".to_string()));
    }

    Ok(Json(json!({ "message": "Status atualizado", "status": body.status })))
}

/// GET /api/connections/disparaja/:id/qrcode — QR de pareamento (base64)
pub async fn disparaja_qrcode(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ctx.require("connections.view")?;

    let connection = fetch_workspace_disparaja(&state, &ctx, id).await?;

    let client = DisparaJaClient::new(connection.api_token.clone())?;
    let manager = InstanceManager::new(client);
    let qr = manager.get_qrcode(&connection.instance_id).await?;

    Ok(Json(json!({
        "instance_id": connection.instance_id,
        "qrcode_base64": qr.qrcode_base64,
        "expires_in": qr.expires_in
    })))
}

/// GET /api/connections/disparaja/:id/logs
pub async fn list_disparaja_logs(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ctx.require("connections.view")?;

    fetch_workspace_disparaja(&state, &ctx, id).await?;

    let logs: Vec<DisparaJaLog> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, connection_id, event, payload, created_at
        FROM disparaja_logs
        WHERE connection_id = $1 AND workspace_id = $2
        ORDER BY created_at DESC
        LIMIT 200
        "#,
    )
    .bind(id)
    .bind(ctx.workspace_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "logs": logs, "count": logs.len() })))
}

/// DELETE /api/connections/disparaja/:id
pub async fn delete_disparaja_connection(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ctx.require("connections.delete")?;

    let deleted = sqlx::query(
        "DELETE FROM disparaja_connections WHERE id = $1 AND workspace_id = $2",
    )
    .bind(id)
    .bind(ctx.workspace_id)
    .execute(&state.db)
    .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Conexão não encontrada".to_string()));
    }

    Ok(Json(json!({ "message": "Conexão removida" })))
}

/// POST /webhooks/disparaja — ingestão de eventos do provedor (público)
///
/// Sem contexto de sessão: a conexão é localizada pelo `instance_id` do
/// payload e a assinatura HMAC é verificada com o token DAQUELA instância.
/// Log e eventual mudança de status entram na mesma transação.
pub async fn ingest_disparaja_log(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    log_request_received("/webhooks/disparaja", "POST");

    let signature = headers
        .get("X-DisparaJa-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::ValidationError("Header X-DisparaJa-Signature ausente".to_string())
        })?;

    let event: WebhookEvent = serde_json::from_slice(&body)
        .map_err(|e| AppError::ValidationError(format!("Payload inválido: {}", e)))?;

    // `instance_id` só é único por workspace; dentre as candidatas, vale a
    // conexão cujo token valida a assinatura
    let candidates: Vec<DisparaJaConnection> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, agent_id, instance_id, api_token,
               phone_number, status, created_at, updated_at
        FROM disparaja_connections
        WHERE instance_id = $1
        "#,
    )
    .bind(&event.instance_id)
    .fetch_all(&state.db)
    .await?;

    // Instância desconhecida e assinatura ruim respondem igual (404 genérico)
    let connection = candidates
        .into_iter()
        .find(|c| WebhookEvent::verify_signature(signature, &c.api_token, &body))
        .ok_or_else(|| {
            log_warning(&format!(
                "Webhook Dispara-Já recusado (instância {}): assinatura inválida ou desconhecida",
                event.instance_id
            ));
            AppError::NotFound("Conexão não encontrada".to_string())
        })?;

    let payload: Value = serde_json::from_slice(&body)?;

    let mut tx = state.db.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO disparaja_logs (workspace_id, connection_id, event, payload)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(connection.workspace_id)
    .bind(connection.id)
    .bind(&event.event)
    .bind(&payload)
    .execute(&mut *tx)
    .await?;

    if event.is_connection_update() {
        if let Some(ref status) = event.status {
            if ["connected", "disconnected"].contains(&status.as_str()) {
                sqlx::query(
                    r#"
                    UPDATE disparaja_connections
                    SET status = $1, phone_number = COALESCE($2, phone_number), updated_at = now()
                    WHERE id = $3
                    "#,
                )
                .bind(status)
                .bind(&event.phone_number)
                .bind(connection.id)
                .execute(&mut *tx)
                .await?;
            }
        }
    }

    tx.commit().await?;

    log_channel_event("disparaja", &event.instance_id, &event.event);

    Ok(Json(json!({ "message": "Evento registrado" })))
}

// ---------------------------------------------------------------------------
// WhatsApp Cloud
// ---------------------------------------------------------------------------

/// POST /api/connections/whatsapp-cloud
pub async fn connect_whatsapp_cloud(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Json(body): Json<ConnectWhatsAppCloudBody>,
) -> Result<Json<Value>, AppError> {
    log_request_received("/api/connections/whatsapp-cloud", "POST");
    ctx.require("connections.create")?;

    let phone_number_id = body.phone_number_id.trim().to_string();
    if phone_number_id.is_empty()
        || body.business_account_id.trim().is_empty()
        || body.access_token.trim().is_empty()
    {
        return Err(AppError::ValidationError(
            "phone_number_id, business_account_id e access_token são obrigatórios".to_string(),
        ));
    }
    if let Some(agent_id) = body.agent_id {
        ensure_agent_in_workspace(&state, &ctx, agent_id).await?;
    }

    // Token expirado/phone id alheio falham aqui, antes de persistir
    let client = WhatsAppCloudClient::new(body.access_token.trim())?;
    let info = client.get_phone_number(&phone_number_id).await?;

    let connection_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO whatsapp_cloud_connections
            (workspace_id, agent_id, phone_number_id, business_account_id, access_token, status)
        VALUES ($1, $2, $3, $4, $5, 'connected')
        ON CONFLICT (workspace_id, phone_number_id) DO UPDATE
            SET access_token = EXCLUDED.access_token,
                business_account_id = EXCLUDED.business_account_id,
                agent_id = EXCLUDED.agent_id,
                status = 'connected',
                updated_at = now()
        RETURNING id
        "#,
    )
    .bind(ctx.workspace_id)
    .bind(body.agent_id)
    .bind(&phone_number_id)
    .bind(body.business_account_id.trim())
    .bind(body.access_token.trim())
    .fetch_one(&state.db)
    .await?;

    log_channel_event("whatsapp_cloud", &phone_number_id, "connected-or-updated");

    Ok(Json(json!({
        "id": connection_id,
        "verified_name": info.verified_name,
        "display_phone_number": info.display_phone_number,
        "message": "Conexão registrada"
    })))
}

/// GET /api/connections/whatsapp-cloud
pub async fn list_whatsapp_cloud_connections(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> Result<Json<Value>, AppError> {
    ctx.require("connections.view")?;

    let connections: Vec<WhatsAppCloudConnection> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, agent_id, phone_number_id, business_account_id,
               access_token, status, created_at, updated_at
        FROM whatsapp_cloud_connections
        WHERE workspace_id = $1
        ORDER BY created_at
        "#,
    )
    .bind(ctx.workspace_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "connections": connections, "count": connections.len() })))
}

/// PATCH /api/connections/whatsapp-cloud/:id/status
pub async fn update_whatsapp_cloud_status(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<Value>, AppError> {
    ctx.require("connections.update")?;

    if !["connected", "disconnected"].contains(&body.status.as_str()) {
        return Err(AppError::ValidationError("Status inválido".to_string()));
    }

    let updated = sqlx::query(
        r#"
        UPDATE whatsapp_cloud_connections
        SET status = $1, updated_at = now()
        WHERE id = $2 AND workspace_id = $3
        "#,
    )
    .bind(&body.status)
    .bind(id)
    .bind(ctx.workspace_id)
    .execute(&state.db)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::NotFound("Conexão não encontrada".to_string()));
    }

    Ok(Json(json!({ "message": "Status atualizado", "status": body.status })))
}

/// DELETE /api/connections/whatsapp-cloud/:id
pub async fn delete_whatsapp_cloud_connection(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    ctx.require("connections.delete")?;

    let deleted = sqlx::query(
        "DELETE FROM whatsapp_cloud_connections WHERE id = $1 AND workspace_id = $2",
    )
    .bind(id)
    .bind(ctx.workspace_id)
    .execute(&state.db)
    .await?;

    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound("Conexão não encontrada".to_string()));
    }

    Ok(Json(json!({ "message": "Conexão removida" })))
}
