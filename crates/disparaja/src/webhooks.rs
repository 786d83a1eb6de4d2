//! Webhooks de eventos do Dispara-Já
//!
//! O provedor envia eventos HTTP assinados com o token da instância no header
//! `X-DisparaJa-Signature` (HMAC-SHA256 em hex sobre o body raw). Eventos
//! conhecidos:
//!
//! - `connection.update` — aparelho conectou/desconectou (campo `status`)
//! - `qrcode.updated` — novo QR code disponível
//! - `message.received` — mensagem recebida pelo aparelho

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Evento recebido via webhook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub instance_id: String,
    pub event: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl WebhookEvent {
    /// Verifica a assinatura HMAC de um webhook recebido
    ///
    /// # Argumentos
    ///
    /// * `signature` - Valor do header `X-DisparaJa-Signature` (hex)
    /// * `secret` - Token da instância (`api_token`)
    /// * `body` - Body raw da requisição (bytes)
    ///
    /// # Retorna
    ///
    /// `true` se assinatura é válida, `false` caso contrário
    pub fn verify_signature(signature: &str, secret: &str, body: &[u8]) -> bool {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        type HmacSha256 = Hmac<Sha256>;

        let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
            Ok(m) => m,
            Err(_) => return false,
        };

        mac.update(body);

        let Ok(provided) = hex::decode(signature.trim()) else {
            return false;
        };

        // Comparação constant-time para prevenir timing attacks
        mac.verify_slice(&provided).is_ok()
    }

    /// Indica se o evento altera o estado da conexão
    pub fn is_connection_update(&self) -> bool {
        self.event == "connection.update"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        use hmac::{Hmac, Mac};
        use sha2::Sha256;
        type HmacSha256 = Hmac<Sha256>;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn test_verify_signature() {
        let secret = "inst-secret";
        let body = br#"{"instance_id":"inst-123","event":"connection.update","status":"connected"}"#;

        let valid = sign(secret, body);
        assert!(WebhookEvent::verify_signature(&valid, secret, body));
        assert!(!WebhookEvent::verify_signature(&valid, "outro-secret", body));
        assert!(!WebhookEvent::verify_signature("deadbeef", secret, body));
        assert!(!WebhookEvent::verify_signature("não-hex", secret, body));
    }

    #[test]
    fn test_event_parsing() {
        let body = r#"{
            "instance_id": "inst-123",
            "event": "connection.update",
            "status": "connected",
            "phone_number": "5511999998888",
            "timestamp": "2025-06-01T12:00:00Z"
        }"#;

        let event: WebhookEvent = serde_json::from_str(body).unwrap();
        assert!(event.is_connection_update());
        assert_eq!(event.status.as_deref(), Some("connected"));
    }

    #[test]
    fn test_event_with_extra_data() {
        let body = r#"{"instance_id":"i","event":"message.received","data":{"from":"5511988887777","text":"oi"}}"#;
        let event: WebhookEvent = serde_json::from_str(body).unwrap();
        assert!(!event.is_connection_update());
        assert_eq!(event.data.unwrap()["text"], "oi");
    }
}
