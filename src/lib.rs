// Biblioteca do backend ZapCRM
// Expõe módulos para uso em testes e binários

pub mod auth;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use sqlx::PgPool;

// AppState é definido aqui para ser compartilhado
#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub db: PgPool,
    pub mail: services::MailService,
}
