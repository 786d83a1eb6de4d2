//! Cliente HTTP para a API do Dispara-Já

use crate::error::{DisparaJaError, Result};
use reqwest::{Client as HttpClient, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.disparaja.com.br/v1";

/// Cliente para interagir com a API do Dispara-Já
///
/// Autenticação via token de conta (`Authorization: Bearer <token>`); cada
/// instância de WhatsApp criada recebe um token próprio usado na assinatura
/// dos webhooks de eventos.
#[derive(Clone)]
pub struct DisparaJaClient {
    http_client: HttpClient,
    api_token: String,
    base_url: String,
}

impl DisparaJaClient {
    /// Cria um novo cliente Dispara-Já
    ///
    /// # Timeouts
    ///
    /// - Total: 30s
    /// - Connect: 5s
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| DisparaJaError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_token: api_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Cria um cliente apontando para outra URL base (homologação, testes)
    pub fn with_base_url(api_token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let mut client = Self::new(api_token)?;
        client.base_url = base_url.into();
        Ok(client)
    }

    /// Executa uma requisição GET
    pub(crate) async fn get(&self, endpoint: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url, endpoint);

        tracing::debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Content-Type", "application/json")
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Executa uma requisição GET e parseia JSON
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let response = self.get(endpoint).await?;
        let json = response.json().await?;
        Ok(json)
    }

    /// Executa uma requisição POST
    pub(crate) async fn post(&self, endpoint: &str, body: &Value) -> Result<Response> {
        let url = format!("{}{}", self.base_url, endpoint);

        tracing::debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Executa uma requisição POST e parseia JSON
    pub(crate) async fn post_json<T: DeserializeOwned>(&self, endpoint: &str, body: &Value) -> Result<T> {
        let response = self.post(endpoint, body).await?;
        let json = response.json().await?;
        Ok(json)
    }

    /// Executa uma requisição DELETE
    pub(crate) async fn delete(&self, endpoint: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url, endpoint);

        tracing::debug!("DELETE {}", url);

        let response = self
            .http_client
            .delete(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Content-Type", "application/json")
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// Processa a resposta HTTP e trata erros
    async fn handle_response(&self, response: Response) -> Result<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let status_code = status.as_u16();
        let error_body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

        tracing::error!("Dispara-Já API error ({}): {}", status_code, error_body);

        // Tentar extrair mensagem de erro do JSON
        let message = if let Ok(json) = serde_json::from_str::<Value>(&error_body) {
            json.get("erro")
                .or_else(|| json.get("error"))
                .or_else(|| json.get("message"))
                .and_then(|v| v.as_str())
                .unwrap_or(&error_body)
                .to_string()
        } else {
            error_body
        };

        match status_code {
            401 | 403 => Err(DisparaJaError::AuthError(message)),
            404 => Err(DisparaJaError::NotFound(message)),
            _ => Err(DisparaJaError::ApiError {
                status: status_code,
                message,
            }),
        }
    }

    /// Obtém o token de autenticação
    pub fn token(&self) -> &str {
        &self.api_token
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
        let client = DisparaJaClient::new("test-token").unwrap();
        assert_eq!(client.token(), "test-token");
        assert_eq!(client.base_url(), "https://api.disparaja.com.br/v1");
    }

    #[test]
    fn test_client_with_base_url() {
        let client = DisparaJaClient::with_base_url("test-token", "http://localhost:9999").unwrap();
        assert_eq!(client.base_url(), "http://localhost:9999");
    }
}
