//! Resolvedor de contexto de requisição
//!
//! Produz `{ workspace_id, user_id }` (mais perfil e mapa efetivo de
//! permissões) ou falha fechado com 401. Ordem de resolução:
//!
//! 1. `Authorization: Bearer <token>` — sessão opaca
//! 2. Cookie `session=<token>`
//! 3. Par `x-workspace-id`/`x-user-id` APENAS quando acompanhado de
//!    `x-gateway-signature` (HMAC do gateway); headers sem assinatura são
//!    recusados, nunca confiados às cegas
//!
//! Nenhum handler enxerga workspace id nulo: a ausência de contexto é erro.

use crate::auth::session::SessionService;
use crate::auth::verify_gateway_pair;
use crate::models::{ResolvedGroupItem, User};
use crate::services::permissions::{effective_permissions, is_allowed};
use crate::utils::{AppError, AppResult};
use crate::AppState;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

/// Contexto autenticado disponível para todos os handlers de recurso
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub workspace_id: Uuid,
    pub user_id: Uuid,
    pub role: String,
    pub permissions: Value,
}

impl RequestContext {
    /// Nega com 403 quando a chave não está concedida (bypass auditado para
    /// owner/admin acontece dentro de `is_allowed`)
    pub fn require(&self, key: &str) -> AppResult<()> {
        if is_allowed(&self.user_id.to_string(), &self.role, &self.permissions, key) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("Sem permissão: {}", key)))
        }
    }
}

fn bearer_token(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn cookie_token(parts: &Parts) -> Option<String> {
    let cookies = parts.headers.get("cookie")?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        if name == "session" && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

fn header_value(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

async fn load_active_user(
    state: &AppState,
    user_id: Uuid,
    workspace_id: Uuid,
) -> AppResult<Option<User>> {
    let user: Option<User> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, email, name, password_hash, role, status,
               permissions, permission_group_id, created_at, updated_at
        FROM users
        WHERE id = $1 AND workspace_id = $2 AND status = 'active'
        "#,
    )
    .bind(user_id)
    .bind(workspace_id)
    .fetch_optional(&state.db)
    .await?;
    Ok(user)
}

async fn group_items(state: &AppState, group_id: Uuid) -> AppResult<Vec<ResolvedGroupItem>> {
    let items: Vec<ResolvedGroupItem> = sqlx::query_as(
        r#"
        SELECT p.key, pgi.enabled
        FROM permission_group_items pgi
        JOIN permissions p ON p.id = pgi.permission_id
        WHERE pgi.group_id = $1
        "#,
    )
    .bind(group_id)
    .fetch_all(&state.db)
    .await?;
    Ok(items)
}

async fn context_from_user(state: &AppState, user: User) -> AppResult<RequestContext> {
    let items = match user.permission_group_id {
        Some(group_id) => group_items(state, group_id).await?,
        None => Vec::new(),
    };

    let permissions = effective_permissions(&user.role, &items, user.permissions.as_ref());

    Ok(RequestContext {
        workspace_id: user.workspace_id,
        user_id: user.id,
        role: user.role,
        permissions,
    })
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        // 1/2: sessão via Bearer ou cookie
        if let Some(token) = bearer_token(parts).or_else(|| cookie_token(parts)) {
            let session = SessionService::resolve(&state.db, &token)
                .await?
                .ok_or_else(|| AppError::Unauthorized("Sessão inválida ou expirada".to_string()))?;

            let user = load_active_user(state, session.user_id, session.workspace_id)
                .await?
                .ok_or_else(|| AppError::Unauthorized("Sessão inválida ou expirada".to_string()))?;

            return context_from_user(state, user).await;
        }

        // 3: par assinado pelo gateway
        let ws_header = header_value(parts, "x-workspace-id");
        let user_header = header_value(parts, "x-user-id");
        let signature = header_value(parts, "x-gateway-signature");

        if let (Some(ws), Some(uid), Some(sig)) = (ws_header, user_header, signature) {
            if !verify_gateway_pair(&state.settings.auth.session_secret, &ws, &uid, &sig) {
                tracing::warn!("Par de headers do gateway com assinatura inválida");
                return Err(AppError::Unauthorized(
                    "Assinatura de gateway inválida".to_string(),
                ));
            }

            let workspace_id = Uuid::parse_str(&ws)
                .map_err(|_| AppError::Unauthorized("Contexto de workspace inválido".to_string()))?;
            let user_id = Uuid::parse_str(&uid)
                .map_err(|_| AppError::Unauthorized("Contexto de workspace inválido".to_string()))?;

            let user = load_active_user(state, user_id, workspace_id)
                .await?
                .ok_or_else(|| AppError::Unauthorized("Contexto de workspace inválido".to_string()))?;

            return context_from_user(state, user).await;
        }

        // Falha fechada: sem sessão e sem par assinado não há contexto
        Err(AppError::Unauthorized(
            "Contexto de workspace ausente".to_string(),
        ))
    }
}
