use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Fronteira de tenant: todo dado de negócio carrega `workspace_id`
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub subdomain: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
