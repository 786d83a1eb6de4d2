//! Cliente da WhatsApp Cloud API (Graph API da Meta)
//!
//! Cobre o subconjunto usado pelo backend:
//!
//! - Validação de credenciais de um número (phone number id + access token)
//! - Envio de mensagens de texto
//!
//! O access token é por número/conta de negócio; cada conexão de workspace
//! carrega as suas próprias credenciais.

pub mod client;
pub mod error;

pub use client::{PhoneNumberInfo, SentMessage, WhatsAppCloudClient};
pub use error::{Result, WhatsAppCloudError};
