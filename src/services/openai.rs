//! Fábrica de clientes OpenAI por workspace
//!
//! A API key é dinâmica: vive na tabela `system_configs` sob a chave
//! `openai_api_key`, nunca em variável de ambiente. Sem key configurada o
//! workspace opera somente local (agentes sem espelho remoto).

use crate::utils::AppResult;
use openai_assistants::{AssistantManager, OpenAiClient, VectorStoreManager};
use sqlx::PgPool;
use uuid::Uuid;

pub const OPENAI_API_KEY_CONFIG: &str = "openai_api_key";

/// Lê a API key da OpenAI do workspace, se configurada
pub async fn workspace_openai_key(pool: &PgPool, workspace_id: Uuid) -> AppResult<Option<String>> {
    let key: Option<String> = sqlx::query_scalar(
        "SELECT value FROM system_configs WHERE workspace_id = $1 AND key = $2",
    )
    .bind(workspace_id)
    .bind(OPENAI_API_KEY_CONFIG)
    .fetch_optional(pool)
    .await?;

    Ok(key.filter(|k| !k.trim().is_empty()))
}

/// Grava/substitui a API key do workspace
pub async fn set_workspace_openai_key(
    pool: &PgPool,
    workspace_id: Uuid,
    value: &str,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO system_configs (workspace_id, key, value)
        VALUES ($1, $2, $3)
        ON CONFLICT (workspace_id, key) DO UPDATE SET value = EXCLUDED.value
        "#,
    )
    .bind(workspace_id)
    .bind(OPENAI_API_KEY_CONFIG)
    .bind(value)
    .execute(pool)
    .await?;
    Ok(())
}

/// AssistantManager do workspace; `None` quando não há key configurada
pub async fn assistant_manager_for(
    pool: &PgPool,
    workspace_id: Uuid,
) -> AppResult<Option<AssistantManager>> {
    match workspace_openai_key(pool, workspace_id).await? {
        Some(key) => {
            let client = OpenAiClient::new(key)?;
            Ok(Some(AssistantManager::new(client)))
        }
        None => Ok(None),
    }
}

/// VectorStoreManager do workspace; `None` quando não há key configurada
pub async fn vector_store_manager_for(
    pool: &PgPool,
    workspace_id: Uuid,
) -> AppResult<Option<VectorStoreManager>> {
    match workspace_openai_key(pool, workspace_id).await? {
        Some(key) => {
            let client = OpenAiClient::new(key)?;
            Ok(Some(VectorStoreManager::new(client)))
        }
        None => Ok(None),
    }
}
