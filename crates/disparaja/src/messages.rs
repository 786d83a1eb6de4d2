//! Envio de mensagens através de uma instância conectada

use crate::client::DisparaJaClient;
use crate::error::{DisparaJaError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Confirmação de envio devolvida pelo provedor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentMessage {
    pub message_id: String,
    pub instance_id: String,
    pub phone: String,
    #[serde(default)]
    pub queued: bool,
}

/// Gerenciador de mensagens
#[derive(Clone)]
pub struct MessageManager {
    client: DisparaJaClient,
}

impl MessageManager {
    pub fn new(client: DisparaJaClient) -> Self {
        Self { client }
    }

    /// Envia uma mensagem de texto para um número
    ///
    /// O número deve conter apenas dígitos (DDI + DDD + número); qualquer
    /// outro caractere é removido antes do envio.
    pub async fn send_text(&self, instance_id: &str, phone: &str, message: &str) -> Result<SentMessage> {
        let clean_phone: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        if clean_phone.len() < 10 {
            return Err(DisparaJaError::ValidationError(format!(
                "Número de telefone inválido: {}",
                phone
            )));
        }
        if message.trim().is_empty() {
            return Err(DisparaJaError::ValidationError(
                "Mensagem vazia".to_string(),
            ));
        }

        let body = json!({
            "instance_id": instance_id,
            "phone": clean_phone,
            "message": message,
        });

        let sent: SentMessage = self.client.post_json("/messages", &body).await?;

        tracing::info!(
            "Mensagem enviada via Dispara-Já: {} (instância {})",
            sent.message_id,
            sent.instance_id
        );

        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_send_text_cleans_phone() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/messages")
                .json_body_partial(r#"{ "phone": "5511999998888" }"#);
            then.status(200).json_body(serde_json::json!({
                "message_id": "msg-1",
                "instance_id": "inst-123",
                "phone": "5511999998888",
                "queued": true
            }));
        });

        let client = DisparaJaClient::with_base_url("acct-token", server.base_url()).unwrap();
        let manager = MessageManager::new(client);

        let sent = manager
            .send_text("inst-123", "+55 (11) 99999-8888", "Olá!")
            .await
            .unwrap();
        mock.assert();
        assert!(sent.queued);
    }

    #[tokio::test]
    async fn test_send_text_rejects_empty_message() {
        let client = DisparaJaClient::with_base_url("acct-token", "http://localhost:1").unwrap();
        let manager = MessageManager::new(client);

        let err = manager
            .send_text("inst-123", "5511999998888", "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, DisparaJaError::ValidationError(_)));
    }
}
