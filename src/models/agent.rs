use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Agente de IA configurado no workspace
///
/// `openai_assistant_id` fica preenchido quando o workspace tem uma API key
/// configurada e o espelhamento para a OpenAI foi feito.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Agent {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub instructions: String,
    pub model: String,
    pub temperature: f32,
    pub openai_assistant_id: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Vector store local, espelho de um vector store na OpenAI
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VectorStoreRecord {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub agent_id: Option<Uuid>,
    pub openai_vector_store_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
