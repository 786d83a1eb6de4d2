//! Tokens de ação de uso único (verificação de e-mail, reset de senha, convite)
//!
//! O valor bruto nunca é persistido: a tabela `action_tokens` guarda apenas o
//! SHA-256 em hex. Como o hash é determinístico, a validação faz lookup direto
//! por `token_hash` — sem varredura dos tokens pendentes. Consumo é one-shot:
//! a linha é deletada na mesma transação que aplica o efeito (status/senha).

use crate::utils::{AppError, AppResult};
use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Tipos de token; gravado na coluna `kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    EmailVerification,
    PasswordReset,
    Invitation,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::EmailVerification => "email_verification",
            TokenKind::PasswordReset => "password_reset",
            TokenKind::Invitation => "invitation",
        }
    }
}

/// Linha de `action_tokens` devolvida no consumo
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ActionTokenRow {
    pub id: Uuid,
    pub kind: String,
    pub email: String,
    pub user_id: Option<Uuid>,
    pub workspace_id: Option<Uuid>,
    pub role: Option<String>,
    pub permission_group_id: Option<Uuid>,
    pub expires_at: DateTime<Utc>,
}

/// Gera um token opaco com 256 bits de aleatoriedade
pub fn generate_token() -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

/// SHA-256 em hex do valor bruto
pub fn token_hash(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(digest)
}

/// Operações de emissão/consumo sobre `action_tokens`
pub struct TokenService;

impl TokenService {
    /// Emite um token e devolve o valor bruto (único momento em que existe)
    #[allow(clippy::too_many_arguments)]
    pub async fn issue(
        pool: &PgPool,
        kind: TokenKind,
        email: &str,
        user_id: Option<Uuid>,
        workspace_id: Option<Uuid>,
        role: Option<&str>,
        permission_group_id: Option<Uuid>,
        ttl: Duration,
    ) -> AppResult<String> {
        let token = generate_token();
        let expires_at = Utc::now() + ttl;

        // Tokens anteriores do mesmo tipo/e-mail são invalidados na emissão
        sqlx::query("DELETE FROM action_tokens WHERE kind = $1 AND email = $2")
            .bind(kind.as_str())
            .bind(email)
            .execute(pool)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO action_tokens
                (token_hash, kind, email, user_id, workspace_id, role, permission_group_id, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(token_hash(&token))
        .bind(kind.as_str())
        .bind(email)
        .bind(user_id)
        .bind(workspace_id)
        .bind(role)
        .bind(permission_group_id)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(token)
    }

    /// Consome um token dentro da transação do chamador.
    ///
    /// A linha é deletada aqui; se a transação der rollback o token volta a
    /// valer, então o efeito (ativação, troca de senha) PRECISA estar na mesma
    /// transação. Expirado, inexistente ou já consumido produzem o mesmo erro
    /// genérico (anti-enumeração).
    pub async fn consume(
        tx: &mut Transaction<'_, Postgres>,
        kind: TokenKind,
        token: &str,
    ) -> AppResult<ActionTokenRow> {
        let row: Option<ActionTokenRow> = sqlx::query_as(
            r#"
            DELETE FROM action_tokens
            WHERE token_hash = $1 AND kind = $2 AND expires_at > now()
            RETURNING id, kind, email, user_id, workspace_id, role, permission_group_id, expires_at
            "#,
        )
        .bind(token_hash(token))
        .bind(kind.as_str())
        .fetch_optional(&mut **tx)
        .await?;

        row.ok_or_else(|| AppError::ValidationError("Token inválido ou expirado".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_is_random_and_long() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_token_hash_is_deterministic() {
        let token = "abc123";
        assert_eq!(token_hash(token), token_hash(token));
        assert_ne!(token_hash(token), token_hash("abc124"));
        assert_eq!(token_hash(token).len(), 64);
    }

    #[test]
    fn test_kind_round_trip() {
        assert_eq!(TokenKind::EmailVerification.as_str(), "email_verification");
        assert_eq!(TokenKind::PasswordReset.as_str(), "password_reset");
        assert_eq!(TokenKind::Invitation.as_str(), "invitation");
    }
}
