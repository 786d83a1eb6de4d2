//! Sessões opacas
//!
//! O token de sessão é aleatório e só existe no cliente; `auth_sessions`
//! guarda o SHA-256. Sessões expiradas são removidas de forma preguiçosa no
//! momento da resolução.

use crate::auth::tokens::{generate_token, token_hash};
use crate::utils::AppResult;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Sessão resolvida (join implícito com o usuário é feito no resolver de
/// contexto; aqui só a linha da sessão)
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub workspace_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

pub struct SessionService;

impl SessionService {
    /// Cria uma sessão e devolve o token opaco
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        workspace_id: Uuid,
        ttl_hours: i64,
    ) -> AppResult<String> {
        let token = generate_token();
        let expires_at = Utc::now() + Duration::hours(ttl_hours);

        sqlx::query(
            r#"
            INSERT INTO auth_sessions (token_hash, user_id, workspace_id, expires_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(token_hash(&token))
        .bind(user_id)
        .bind(workspace_id)
        .bind(expires_at)
        .execute(pool)
        .await?;

        Ok(token)
    }

    /// Resolve um token para a sessão; expiradas são apagadas e não resolvem
    pub async fn resolve(pool: &PgPool, token: &str) -> AppResult<Option<SessionRow>> {
        let hash = token_hash(token);

        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, workspace_id, expires_at
            FROM auth_sessions
            WHERE token_hash = $1
            "#,
        )
        .bind(&hash)
        .fetch_optional(pool)
        .await?;

        match row {
            Some(session) if session.expires_at > Utc::now() => Ok(Some(session)),
            Some(_) => {
                // Limpeza preguiçosa da sessão expirada
                sqlx::query("DELETE FROM auth_sessions WHERE token_hash = $1")
                    .bind(&hash)
                    .execute(pool)
                    .await?;
                Ok(None)
            }
            None => Ok(None),
        }
    }

    /// Encerra a sessão do token apresentado (logout)
    pub async fn revoke(pool: &PgPool, token: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE token_hash = $1")
            .bind(token_hash(token))
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Revoga todas as sessões do usuário (troca de senha)
    pub async fn revoke_all_for_user(
        tx: &mut Transaction<'_, Postgres>,
        user_id: Uuid,
    ) -> AppResult<()> {
        sqlx::query("DELETE FROM auth_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

/// Assina o par `workspace_id.user_id` repassado por um gateway confiável.
/// Headers sem esta assinatura são recusados pelo resolvedor de contexto.
pub fn sign_gateway_pair(secret: &str, workspace_id: &str, user_id: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(format!("{}.{}", workspace_id, user_id).as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Verifica a assinatura do par de headers do gateway
pub fn verify_gateway_pair(secret: &str, workspace_id: &str, user_id: &str, signature: &str) -> bool {
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(format!("{}.{}", workspace_id, user_id).as_bytes());

    let Ok(provided) = hex::decode(signature.trim()) else {
        return false;
    };
    mac.verify_slice(&provided).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_pair_round_trip() {
        let sig = sign_gateway_pair("segredo", "ws-1", "user-1").unwrap();
        assert!(verify_gateway_pair("segredo", "ws-1", "user-1", &sig));
        // Qualquer componente alterado invalida
        assert!(!verify_gateway_pair("segredo", "ws-2", "user-1", &sig));
        assert!(!verify_gateway_pair("segredo", "ws-1", "user-2", &sig));
        assert!(!verify_gateway_pair("outro", "ws-1", "user-1", &sig));
        assert!(!verify_gateway_pair("segredo", "ws-1", "user-1", "zz-não-hex"));
    }
}
