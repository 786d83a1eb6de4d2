//! Cliente da OpenAI Assistants API (v2)
//!
//! Este crate cobre o subconjunto usado pelo backend para espelhar agentes
//! configurados por workspace:
//!
//! - Assistants: criar, atualizar, excluir (`assistants`)
//! - Vector stores: criar, listar, excluir (`vector_stores`)
//! - Arquivos de vector store: anexar, listar, remover
//!
//! A API key é POR WORKSPACE (lida da tabela `system_configs` pelo chamador),
//! então o cliente é construído por requisição, nunca cacheado globalmente.

pub mod assistants;
pub mod client;
pub mod error;
pub mod vector_stores;

pub use assistants::{Assistant, AssistantManager, AssistantParams};
pub use client::OpenAiClient;
pub use error::{OpenAiError, Result};
pub use vector_stores::{VectorStore, VectorStoreFile, VectorStoreManager};
