use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Entrada do catálogo global de permissões
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: Uuid,
    /// Chave em dot-path, ex.: `leads.create`
    pub key: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub default_value: bool,
}

/// Grupo de permissões local ao workspace
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PermissionGroup {
    pub id: Uuid,
    pub workspace_id: Uuid,
    pub name: String,
    pub is_default: bool,
    pub is_custom: bool,
    pub created_at: DateTime<Utc>,
}

/// Item de grupo: ACL efetiva de um grupo customizado
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PermissionGroupItem {
    pub id: Uuid,
    pub group_id: Uuid,
    pub permission_id: Uuid,
    pub enabled: bool,
}

/// Item de grupo já resolvido para a chave do catálogo (join)
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct ResolvedGroupItem {
    pub key: String,
    pub enabled: bool,
}
