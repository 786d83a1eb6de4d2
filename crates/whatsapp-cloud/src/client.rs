//! Cliente HTTP para a Graph API da Meta (WhatsApp Cloud)

use crate::error::{Result, WhatsAppCloudError};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://graph.facebook.com/v19.0";

/// Informações de um número registrado na Cloud API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneNumberInfo {
    pub id: String,
    #[serde(default)]
    pub verified_name: Option<String>,
    #[serde(default)]
    pub display_phone_number: Option<String>,
    #[serde(default)]
    pub quality_rating: Option<String>,
}

/// Confirmação de envio de mensagem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentMessage {
    pub message_id: String,
    pub to: String,
}

/// Cliente da WhatsApp Cloud API
///
/// Cada cliente é construído com as credenciais de UM número (o access token
/// da Graph API é escopado por conta de negócio).
#[derive(Clone)]
pub struct WhatsAppCloudClient {
    http_client: HttpClient,
    access_token: String,
    base_url: String,
}

impl WhatsAppCloudClient {
    /// Cria um novo cliente
    ///
    /// # Timeouts
    ///
    /// - Total: 30s
    /// - Connect: 5s
    pub fn new(access_token: impl Into<String>) -> Result<Self> {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| WhatsAppCloudError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            access_token: access_token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Cria um cliente apontando para outra URL base (testes)
    pub fn with_base_url(access_token: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let mut client = Self::new(access_token)?;
        client.base_url = base_url.into();
        Ok(client)
    }

    /// Valida as credenciais consultando os metadados do número
    ///
    /// Usado antes de persistir uma conexão: um token expirado ou um phone
    /// number id de outra conta falham aqui com `AuthError`.
    pub async fn get_phone_number(&self, phone_number_id: &str) -> Result<PhoneNumberInfo> {
        let url = format!(
            "{}/{}?fields=verified_name,display_phone_number,quality_rating",
            self.base_url, phone_number_id
        );

        tracing::debug!("GET {}", url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        let response = self.handle_response(response).await?;
        let info = response.json().await?;
        Ok(info)
    }

    /// Envia uma mensagem de texto
    pub async fn send_text(&self, phone_number_id: &str, to: &str, body: &str) -> Result<SentMessage> {
        if body.trim().is_empty() {
            return Err(WhatsAppCloudError::ValidationError("Mensagem vazia".to_string()));
        }

        let url = format!("{}/{}/messages", self.base_url, phone_number_id);
        let payload = json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": to,
            "type": "text",
            "text": { "body": body },
        });

        tracing::debug!("POST {}", url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&payload)
            .send()
            .await?;

        let response = self.handle_response(response).await?;
        let value: Value = response.json().await?;

        let message_id = value
            .get("messages")
            .and_then(|m| m.get(0))
            .and_then(|m| m.get("id"))
            .and_then(|id| id.as_str())
            .ok_or_else(|| WhatsAppCloudError::ApiError {
                status: 200,
                message: "Resposta sem id de mensagem".to_string(),
            })?
            .to_string();

        Ok(SentMessage {
            message_id,
            to: to.to_string(),
        })
    }

    async fn handle_response(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let status_code = status.as_u16();
        let error_body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());

        tracing::error!("WhatsApp Cloud API error ({}): {}", status_code, error_body);

        // Graph API devolve { "error": { "message": ..., "code": ... } }
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
            401 | 403 => Err(WhatsAppCloudError::AuthError(message)),
            _ => Err(WhatsAppCloudError::ApiError {
                status: status_code,
                message,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_get_phone_number() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/123456");
            then.status(200).json_body(serde_json::json!({
                "id": "123456",
                "verified_name": "ZapCRM Atendimento",
                "display_phone_number": "+55 11 99999-8888"
            }));
        });

        let client = WhatsAppCloudClient::with_base_url("token", server.base_url()).unwrap();
        let info = client.get_phone_number("123456").await.unwrap();
        assert_eq!(info.verified_name.as_deref(), Some("ZapCRM Atendimento"));
    }

    #[tokio::test]
    async fn test_invalid_token_maps_to_auth_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/123456");
            then.status(401).json_body(serde_json::json!({
                "error": { "message": "Invalid OAuth access token", "code": 190 }
            }));
        });

        let client = WhatsAppCloudClient::with_base_url("expirado", server.base_url()).unwrap();
        let err = client.get_phone_number("123456").await.unwrap_err();
        assert!(matches!(err, WhatsAppCloudError::AuthError(_)));
    }

    #[tokio::test]
    async fn test_send_text() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/123456/messages");
            then.status(200).json_body(serde_json::json!({
                "messaging_product": "whatsapp",
                "messages": [{ "id": "wamid.XYZ" }]
            }));
        });

        let client = WhatsAppCloudClient::with_base_url("token", server.base_url()).unwrap();
        let sent = client.send_text("123456", "5511988887777", "Olá!").await.unwrap();
        assert_eq!(sent.message_id, "wamid.XYZ");
    }
}
