//! Cliente da API Dispara-Já
//!
//! Este crate fornece uma interface tipo-segura para o provedor Dispara-Já,
//! que expõe instâncias de WhatsApp via API HTTP:
//!
//! - Criação e consulta de instâncias (`instances`)
//! - Geração de QR code para pareamento do aparelho
//! - Envio de mensagens de texto
//! - Verificação de assinatura dos webhooks de eventos (`webhooks`)
//!
//! # Exemplo Básico
//!
//! ```rust,ignore
//! use disparaja::{DisparaJaClient, instances::InstanceManager};
//!
//! #[tokio::main]
//! async fn main() -> disparaja::Result<()> {
//!     let api_token = std::env::var("DISPARAJA_API_TOKEN")
//!         .expect("DISPARAJA_API_TOKEN não configurado");
//!
//!     let client = DisparaJaClient::new(api_token)?;
//!     let manager = InstanceManager::new(client);
//!
//!     let instance = manager.create_instance("atendimento-01").await?;
//!     let qr = manager.get_qrcode(&instance.instance_id).await?;
//!     println!("QR base64: {} bytes", qr.qrcode_base64.len());
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod error;
pub mod instances;
pub mod messages;
pub mod webhooks;

pub use client::DisparaJaClient;
pub use error::{DisparaJaError, Result};
pub use instances::{Instance, InstanceManager, InstanceStatus, QrCode};
pub use messages::{MessageManager, SentMessage};
pub use webhooks::WebhookEvent;
