//! Autenticação: senhas, sessões e tokens de uso único
//!
//! - `password`: hash/verificação bcrypt
//! - `session`: sessões opacas com hash SHA-256 em repouso
//! - `tokens`: tokens de ação (verificação de e-mail, reset, convite)

pub mod password;
pub mod session;
pub mod tokens;

pub use password::{hash_password, verify_password};
pub use session::{sign_gateway_pair, verify_gateway_pair, SessionService};
pub use tokens::{generate_token, token_hash, ActionTokenRow, TokenKind, TokenService};
