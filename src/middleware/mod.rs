/// Middleware layer para o Axum router
///
/// - Resolução de contexto de workspace/usuário (extractor `RequestContext`)
/// - Autenticação de endpoints administrativos (X-Admin-Key)

pub mod admin_auth;
pub mod auth_context;

pub use admin_auth::require_admin_key;
pub use auth_context::RequestContext;
