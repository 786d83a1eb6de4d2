//! Cliente HTTP para a OpenAI API
//!
//! Todos os endpoints de Assistants v2 exigem o header `OpenAI-Beta:
//! assistants=v2` além do Bearer token.

use crate::error::{OpenAiError, Result};
use reqwest::{Client as HttpClient, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Cliente para a OpenAI API
#[derive(Clone)]
pub struct OpenAiClient {
    http_client: HttpClient,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    /// Cria um novo cliente
    ///
    /// # Timeouts
    ///
    /// - Total: 60s (criação de vector store pode demorar)
    /// - Connect: 5s
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| OpenAiError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Cria um cliente apontando para outra URL base (testes)
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let mut client = Self::new(api_key)?;
        client.base_url = base_url.into();
        Ok(client)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);

        tracing::debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
            .send()
            .await?;

        let response = self.handle_response(response).await?;
        let json = response.json().await?;
        Ok(json)
    }

    pub(crate) async fn post_json<T: DeserializeOwned>(&self, endpoint: &str, body: &Value) -> Result<T> {
        let url = format!("{}{}", self.base_url, endpoint);

        tracing::debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let response = self.handle_response(response).await?;
        let json = response.json().await?;
        Ok(json)
    }

    pub(crate) async fn delete(&self, endpoint: &str) -> Result<()> {
        let url = format!("{}{}", self.base_url, endpoint);

        tracing::debug!("DELETE {}", url);

        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
            .send()
            .await?;

        self.handle_response(response).await?;
        Ok(())
    }

    /// Processa a resposta HTTP e trata erros
    async fn handle_response(&self, response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let status_code = status.as_u16();
        let error_body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

        tracing::error!("OpenAI API error ({}): {}", status_code, error_body);

        // OpenAI devolve { "error": { "message": ..., "type": ... } }
        let message = serde_json::from_str::<Value>(&error_body)
            .ok()
            .and_then(|json| {
                json.get("error")
                    .and_then(|e| e.get("message"))
                    .and_then(|m| m.as_str())
                    .map(|s| s.to_string())
            })
            .unwrap_or(error_body);

        match status_code {
            401 => Err(OpenAiError::AuthError(message)),
            404 => Err(OpenAiError::NotFound(message)),
            _ => Err(OpenAiError::ApiError {
                status: status_code,
                message,
            }),
        }
    }

    /// Obtém a URL base
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OpenAiClient::new("sk-test").unwrap();
        assert_eq!(client.base_url(), "https://api.openai.com/v1");
    }
}
