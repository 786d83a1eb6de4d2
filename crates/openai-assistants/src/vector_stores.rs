//! Vector stores e arquivos (base de conhecimento dos assistants)

use crate::client::OpenAiClient;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Vector store como devolvido pela OpenAI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStore {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Arquivo anexado a um vector store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreFile {
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    data: Vec<T>,
}

/// Gerenciador de vector stores
#[derive(Clone)]
pub struct VectorStoreManager {
    client: OpenAiClient,
}

impl VectorStoreManager {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }

    /// Cria um vector store
    pub async fn create(&self, name: &str) -> Result<VectorStore> {
        let body = json!({ "name": name });
        let store: VectorStore = self.client.post_json("/vector_stores", &body).await?;

        tracing::info!("Vector store criado na OpenAI: {}", store.id);

        Ok(store)
    }

    /// Consulta um vector store
    pub async fn get(&self, vector_store_id: &str) -> Result<VectorStore> {
        self.client
            .get_json(&format!("/vector_stores/{}", vector_store_id))
            .await
    }

    /// Exclui um vector store
    pub async fn delete(&self, vector_store_id: &str) -> Result<()> {
        self.client
            .delete(&format!("/vector_stores/{}", vector_store_id))
            .await
    }

    /// Anexa um arquivo já enviado (file id da Files API) ao vector store
    pub async fn add_file(&self, vector_store_id: &str, file_id: &str) -> Result<VectorStoreFile> {
        let body = json!({ "file_id": file_id });
        self.client
            .post_json(&format!("/vector_stores/{}/files", vector_store_id), &body)
            .await
    }

    /// Lista os arquivos do vector store
    pub async fn list_files(&self, vector_store_id: &str) -> Result<Vec<VectorStoreFile>> {
        let response: ListResponse<VectorStoreFile> = self
            .client
            .get_json(&format!("/vector_stores/{}/files", vector_store_id))
            .await?;
        Ok(response.data)
    }

    /// Remove um arquivo do vector store
    pub async fn delete_file(&self, vector_store_id: &str, file_id: &str) -> Result<()> {
        self.client
            .delete(&format!("/vector_stores/{}/files/{}", vector_store_id, file_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_create_and_list_files() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/vector_stores");
            then.status(200).json_body(serde_json::json!({
                "id": "vs_1",
                "name": "Base FAQ",
                "status": "completed"
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/vector_stores/vs_1/files");
            then.status(200).json_body(serde_json::json!({
                "data": [
                    { "id": "file-a", "status": "completed" },
                    { "id": "file-b", "status": "in_progress" }
                ]
            }));
        });

        let client = OpenAiClient::with_base_url("sk-test", server.base_url()).unwrap();
        let manager = VectorStoreManager::new(client);

        let store = manager.create("Base FAQ").await.unwrap();
        assert_eq!(store.id, "vs_1");

        let files = manager.list_files("vs_1").await.unwrap();
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].id, "file-a");
    }
}
