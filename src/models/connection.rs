use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Conexão com uma instância do Dispara-Já
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DisparaJaConnection {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub instance_id: String,
    /// Token da instância; assina os webhooks de log e nunca sai em respostas
    #[serde(skip_serializing)]
    pub api_token: String,
    pub phone_number: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Evento de webhook ingerido do Dispara-Já
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DisparaJaLog {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub connection_id: Uuid,
    pub event: String,
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

/// Conexão com um número da WhatsApp Cloud API
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WhatsAppCloudConnection {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub phone_number_id: String,
    pub business_account_id: String,
    #[serde(skip_serializing)]
    pub access_token: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
