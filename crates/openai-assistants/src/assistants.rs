//! Assistants API — espelho remoto dos agentes configurados por workspace

use crate::client::OpenAiClient;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Assistant como devolvido pela OpenAI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assistant {
    pub id: String,
    pub model: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// Parâmetros de criação/atualização de um assistant
#[derive(Debug, Clone)]
pub struct AssistantParams {
    pub name: String,
    pub instructions: String,
    pub model: String,
    pub temperature: f32,
    /// Vector store a acoplar via file_search (opcional)
    pub vector_store_id: Option<String>,
}

/// Gerenciador de assistants
#[derive(Clone)]
pub struct AssistantManager {
    client: OpenAiClient,
}

impl AssistantManager {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }

    fn build_body(params: &AssistantParams) -> serde_json::Value {
        let mut body = json!({
            "name": params.name,
            "instructions": params.instructions,
            "model": params.model,
            "temperature": params.temperature,
        });

        if let Some(ref vs_id) = params.vector_store_id {
            body["tools"] = json!([{ "type": "file_search" }]);
            body["tool_resources"] = json!({
                "file_search": { "vector_store_ids": [vs_id] }
            });
        }

        body
    }

    /// Cria um assistant
    pub async fn create(&self, params: &AssistantParams) -> Result<Assistant> {
        let body = Self::build_body(params);
        let assistant: Assistant = self.client.post_json("/assistants", &body).await?;

        tracing::info!("Assistant criado na OpenAI: {}", assistant.id);

        Ok(assistant)
    }

    /// Atualiza um assistant existente
    pub async fn update(&self, assistant_id: &str, params: &AssistantParams) -> Result<Assistant> {
        let body = Self::build_body(params);
        self.client
            .post_json(&format!("/assistants/{}", assistant_id), &body)
            .await
    }

    /// Consulta um assistant
    pub async fn get(&self, assistant_id: &str) -> Result<Assistant> {
        self.client
            .get_json(&format!("/assistants/{}", assistant_id))
            .await
    }

    /// Exclui um assistant
    pub async fn delete(&self, assistant_id: &str) -> Result<()> {
        self.client
            .delete(&format!("/assistants/{}", assistant_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn params() -> AssistantParams {
        AssistantParams {
            name: "Atendente Comercial".to_string(),
            instructions: "Você é um atendente educado.".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            vector_store_id: None,
        }
    }

    #[test]
    fn test_build_body_without_vector_store() {
        let body = AssistantManager::build_body(&params());
        assert_eq!(body["model"], "gpt-4o-mini");
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn test_build_body_with_vector_store() {
        let mut p = params();
        p.vector_store_id = Some("vs_123".to_string());
        let body = AssistantManager::build_body(&p);
        assert_eq!(body["tools"][0]["type"], "file_search");
        assert_eq!(
            body["tool_resources"]["file_search"]["vector_store_ids"][0],
            "vs_123"
        );
    }

    #[tokio::test]
    async fn test_create_assistant() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/assistants")
                .header("OpenAI-Beta", "assistants=v2");
            then.status(200).json_body(serde_json::json!({
                "id": "asst_abc",
                "model": "gpt-4o-mini",
                "name": "Atendente Comercial",
                "temperature": 0.3
            }));
        });

        let client = OpenAiClient::with_base_url("sk-test", server.base_url()).unwrap();
        let manager = AssistantManager::new(client);

        let assistant = manager.create(&params()).await.unwrap();
        mock.assert();
        assert_eq!(assistant.id, "asst_abc");
    }
}
