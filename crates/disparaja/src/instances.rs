//! Gerenciamento de instâncias de WhatsApp no Dispara-Já
//!
//! Uma instância representa um aparelho pareado via QR code. O ciclo de vida
//! observável pela API:
//!
//! 1. `create_instance` cria a instância (`status = "pending"`)
//! 2. `get_qrcode` devolve o QR code em base64 para pareamento
//! 3. Após o pareamento o provedor emite o webhook `connection.update` e o
//!    status passa a `connected`, com o número do aparelho preenchido

use crate::client::DisparaJaClient;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Status de uma instância, como reportado pelo provedor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceStatus {
    Pending,
    Connected,
    Disconnected,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstanceStatus::Pending => "pending",
            InstanceStatus::Connected => "connected",
            InstanceStatus::Disconnected => "disconnected",
        }
    }
}

/// Instância de WhatsApp registrada no Dispara-Já
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub instance_id: String,
    pub name: String,
    /// Token próprio da instância; assina os webhooks de eventos
    pub api_token: String,
    pub status: InstanceStatus,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// QR code de pareamento (PNG em base64)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrCode {
    pub instance_id: String,
    pub qrcode_base64: String,
    /// Validade do QR em segundos; após expirar é preciso gerar outro
    #[serde(default)]
    pub expires_in: Option<u64>,
}

/// Gerenciador de instâncias
#[derive(Clone)]
pub struct InstanceManager {
    client: DisparaJaClient,
}

impl InstanceManager {
    pub fn new(client: DisparaJaClient) -> Self {
        Self { client }
    }

    /// Cria um InstanceManager a partir de um token (conveniência)
    pub fn from_token(api_token: String) -> Result<Self> {
        let client = DisparaJaClient::new(api_token)?;
        Ok(Self::new(client))
    }

    /// Cria uma nova instância
    pub async fn create_instance(&self, name: &str) -> Result<Instance> {
        let body = json!({ "name": name });
        let instance: Instance = self.client.post_json("/instances", &body).await?;

        tracing::info!(
            "Instância Dispara-Já criada: {} ({})",
            instance.instance_id,
            instance.name
        );

        Ok(instance)
    }

    /// Consulta uma instância existente
    pub async fn get_instance(&self, instance_id: &str) -> Result<Instance> {
        self.client
            .get_json(&format!("/instances/{}", urlencoding::encode(instance_id)))
            .await
    }

    /// Gera o QR code de pareamento da instância
    pub async fn get_qrcode(&self, instance_id: &str) -> Result<QrCode> {
        self.client
            .get_json(&format!("/instances/{}/qrcode", urlencoding::encode(instance_id)))
            .await
    }

    /// Desconecta (logout) a instância sem removê-la
    pub async fn disconnect(&self, instance_id: &str) -> Result<()> {
        self.client
            .post(
                &format!("/instances/{}/logout", urlencoding::encode(instance_id)),
                &json!({}),
            )
            .await?;
        Ok(())
    }

    /// Remove a instância do provedor
    pub async fn delete_instance(&self, instance_id: &str) -> Result<()> {
        self.client
            .delete(&format!("/instances/{}", urlencoding::encode(instance_id)))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_create_instance() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/instances")
                .header("Authorization", "Bearer acct-token");
            then.status(201).json_body(serde_json::json!({
                "instance_id": "inst-123",
                "name": "atendimento-01",
                "api_token": "inst-secret",
                "status": "pending"
            }));
        });

        let client = DisparaJaClient::with_base_url("acct-token", server.base_url()).unwrap();
        let manager = InstanceManager::new(client);

        let instance = manager.create_instance("atendimento-01").await.unwrap();
        mock.assert();
        assert_eq!(instance.instance_id, "inst-123");
        assert_eq!(instance.status, InstanceStatus::Pending);
        assert!(instance.phone_number.is_none());
    }

    #[tokio::test]
    async fn test_get_qrcode() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/instances/inst-123/qrcode");
            then.status(200).json_body(serde_json::json!({
                "instance_id": "inst-123",
                "qrcode_base64": "iVBORw0KGgo=",
                "expires_in": 60
            }));
        });

        let client = DisparaJaClient::with_base_url("acct-token", server.base_url()).unwrap();
        let manager = InstanceManager::new(client);

        let qr = manager.get_qrcode("inst-123").await.unwrap();
        assert_eq!(qr.qrcode_base64, "iVBORw0KGgo=");
        assert_eq!(qr.expires_in, Some(60));
    }

    #[tokio::test]
    async fn test_instance_not_found() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/instances/nao-existe");
            then.status(404)
                .json_body(serde_json::json!({ "erro": "instância não encontrada" }));
        });

        let client = DisparaJaClient::with_base_url("acct-token", server.base_url()).unwrap();
        let manager = InstanceManager::new(client);

        let err = manager.get_instance("nao-existe").await.unwrap_err();
        assert!(matches!(err, crate::DisparaJaError::NotFound(_)));
    }
}
