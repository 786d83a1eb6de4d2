//! Fluxos de autenticação: cadastro, login, verificação de e-mail, reset de
//! senha e convites
//!
//! Disciplina anti-enumeração: pedidos de reset/verificação respondem sempre
//! com o mesmo corpo, exista ou não o e-mail; tokens inválidos/expirados/já
//! consumidos produzem um único erro genérico.

use axum::{extract::State, http::HeaderMap, response::Json};
use chrono::Duration;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::password::{hash_password, verify_password};
use crate::auth::session::SessionService;
use crate::auth::tokens::{TokenKind, TokenService};
use crate::middleware::RequestContext;
use crate::models::User;
use crate::services::mail::{invitation_email, password_reset_email, verification_email};
use crate::utils::logging::*;
use crate::utils::{is_valid_email, normalize_email, validate_subdomain, AppError, AppResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub workspace_name: String,
    pub subdomain: String,
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenBody {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordBody {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordBody {
    pub token: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct InviteBody {
    pub email: String,
    pub role: String,
    pub permission_group_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct AcceptInvitationBody {
    pub token: String,
    pub name: String,
    pub password: String,
}

async fn find_user_by_email(state: &AppState, email: &str) -> AppResult<Option<User>> {
    let user: Option<User> = sqlx::query_as(
        r#"
        SELECT id, workspace_id, email, name, password_hash, role, status,
               permissions, permission_group_id, created_at, updated_at
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email)
    .fetch_optional(&state.db)
    .await?;
    Ok(user)
}

/// POST /api/auth/register
///
/// Workspace + usuário owner nascem juntos, na mesma transação, com o grupo
/// de permissões padrão do workspace. O owner fica `pending` até verificar o
/// e-mail.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterBody>,
) -> Result<Json<Value>, AppError> {
    log_request_received("/api/auth/register", "POST");

    let email = normalize_email(&body.email);
    if !is_valid_email(&email) {
        return Err(AppError::ValidationError("E-mail inválido".to_string()));
    }
    let workspace_name = body.workspace_name.trim().to_string();
    if workspace_name.is_empty() {
        return Err(AppError::ValidationError("Nome do workspace obrigatório".to_string()));
    }
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::ValidationError("Nome obrigatório".to_string()));
    }
    let subdomain = validate_subdomain(&body.subdomain)
        .map_err(|msg| AppError::ValidationError(msg.to_string()))?;
    let password_hash = hash_password(&body.password)?;

    // Duplicatas respondem 409 antes de abrir a transação
    let email_taken: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(&email)
        .fetch_one(&state.db)
        .await?;
    if email_taken {
        return Err(AppError::Conflict("E-mail já cadastrado".to_string()));
    }
    let subdomain_taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM workspaces WHERE subdomain = $1)")
            .bind(&subdomain)
            .fetch_one(&state.db)
            .await?;
    if subdomain_taken {
        return Err(AppError::Conflict("Subdomínio já em uso".to_string()));
    }

    let mut tx = state.db.begin().await?;

    let workspace_id: Uuid = sqlx::query_scalar(
        "INSERT INTO workspaces (name, subdomain) VALUES ($1, $2) RETURNING id",
    )
    .bind(&workspace_name)
    .bind(&subdomain)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO permission_groups (workspace_id, name, is_default, is_custom)
        VALUES ($1, 'Padrão', TRUE, FALSE)
        "#,
    )
    .bind(workspace_id)
    .execute(&mut *tx)
    .await?;

    let user_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO users (workspace_id, email, name, password_hash, role, status)
        VALUES ($1, $2, $3, $4, 'owner', 'pending')
        RETURNING id
        "#,
    )
    .bind(workspace_id)
    .bind(&email)
    .bind(&name)
    .bind(&password_hash)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    log_info(&format!(
        "Workspace criado: {} ({}) com owner {}",
        workspace_name, workspace_id, email
    ));

    let token = TokenService::issue(
        &state.db,
        TokenKind::EmailVerification,
        &email,
        Some(user_id),
        Some(workspace_id),
        None,
        None,
        Duration::hours(state.settings.auth.verification_ttl_hours),
    )
    .await?;

    let (subject, html) = verification_email(state.mail.app_base_url(), &name, &token);
    state.mail.send_best_effort(&email, &subject, &html).await;

    Ok(Json(json!({
        "message": "Cadastro realizado. Verifique seu e-mail para ativar a conta.",
        "workspace_id": workspace_id,
        "user_id": user_id
    })))
}

/// POST /api/auth/verify-email
///
/// One-shot: consumo do token e ativação do usuário na mesma transação.
pub async fn verify_email(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TokenBody>,
) -> Result<Json<Value>, AppError> {
    log_request_received("/api/auth/verify-email", "POST");

    let mut tx = state.db.begin().await?;

    let token = TokenService::consume(&mut tx, TokenKind::EmailVerification, &body.token).await?;

    let user_id = token
        .user_id
        .ok_or_else(|| AppError::ValidationError("Token inválido ou expirado".to_string()))?;

    let updated = sqlx::query("UPDATE users SET status = 'active', updated_at = now() WHERE id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::ValidationError("Token inválido ou expirado".to_string()));
    }

    tx.commit().await?;

    Ok(Json(json!({ "message": "E-mail verificado. Sua conta está ativa." })))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginBody>,
) -> Result<Json<Value>, AppError> {
    log_request_received("/api/auth/login", "POST");

    let email = normalize_email(&body.email);

    // E-mail desconhecido e senha errada produzem o MESMO corpo
    let invalid = || AppError::Unauthorized("Credenciais inválidas".to_string());

    let user = find_user_by_email(&state, &email).await?.ok_or_else(invalid)?;

    if !verify_password(&body.password, &user.password_hash) {
        return Err(invalid());
    }

    if user.status != "active" {
        return Err(AppError::Unauthorized("E-mail não verificado".to_string()));
    }

    let token = SessionService::create(
        &state.db,
        user.id,
        user.workspace_id,
        state.settings.auth.session_ttl_hours,
    )
    .await?;

    log_info(&format!("Login: {} (workspace {})", user.email, user.workspace_id));

    Ok(Json(json!({
        "token": token,
        "user": {
            "id": user.id,
            "name": user.name,
            "email": user.email,
            "role": user.role,
            "workspace_id": user.workspace_id
        }
    })))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    log_request_received("/api/auth/logout", "POST");

    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string())
        .ok_or_else(|| AppError::Unauthorized("Sessão ausente".to_string()))?;

    SessionService::revoke(&state.db, &token).await?;

    Ok(Json(json!({ "message": "Sessão encerrada" })))
}

/// POST /api/auth/forgot-password
///
/// Sempre responde 200 com o mesmo corpo, exista ou não o e-mail.
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ForgotPasswordBody>,
) -> Result<Json<Value>, AppError> {
    log_request_received("/api/auth/forgot-password", "POST");

    let email = normalize_email(&body.email);
    let generic = Json(json!({
        "message": "Se o e-mail estiver cadastrado, enviaremos as instruções de redefinição."
    }));

    let Some(user) = find_user_by_email(&state, &email).await? else {
        return Ok(generic);
    };
    if user.status != "active" {
        return Ok(generic);
    }

    let token = TokenService::issue(
        &state.db,
        TokenKind::PasswordReset,
        &email,
        Some(user.id),
        Some(user.workspace_id),
        None,
        None,
        Duration::minutes(state.settings.auth.reset_ttl_minutes),
    )
    .await?;

    let (subject, html) = password_reset_email(state.mail.app_base_url(), &token);
    state.mail.send_best_effort(&email, &subject, &html).await;

    Ok(generic)
}

/// POST /api/auth/reset-password
///
/// Consumo do token, troca de senha e revogação de todas as sessões do
/// usuário acontecem em uma única transação.
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ResetPasswordBody>,
) -> Result<Json<Value>, AppError> {
    log_request_received("/api/auth/reset-password", "POST");

    let password_hash = hash_password(&body.password)?;

    let mut tx = state.db.begin().await?;

    let token = TokenService::consume(&mut tx, TokenKind::PasswordReset, &body.token).await?;

    let user_id = token
        .user_id
        .ok_or_else(|| AppError::ValidationError("Token inválido ou expirado".to_string()))?;

    sqlx::query("UPDATE users SET password_hash = $1, updated_at = now() WHERE id = $2")
        .bind(&password_hash)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    SessionService::revoke_all_for_user(&mut tx, user_id).await?;

    tx.commit().await?;

    Ok(Json(json!({ "message": "Senha redefinida. Faça login novamente." })))
}

/// POST /api/auth/invitations
///
/// Cria o usuário `pending` e emite o token de convite. Requer
/// `users.create`; convites nunca concedem o perfil owner.
pub async fn invite_user(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Json(body): Json<InviteBody>,
) -> Result<Json<Value>, AppError> {
    log_request_received("/api/auth/invitations", "POST");
    ctx.require("users.create")?;

    let email = normalize_email(&body.email);
    if !is_valid_email(&email) {
        return Err(AppError::ValidationError("E-mail inválido".to_string()));
    }
    if body.role != "admin" && body.role != "user" {
        return Err(AppError::ValidationError(
            "Perfil deve ser admin ou user".to_string(),
        ));
    }

    if find_user_by_email(&state, &email).await?.is_some() {
        return Err(AppError::Conflict("E-mail já cadastrado".to_string()));
    }

    // Grupo, se informado, precisa pertencer ao workspace do convite
    if let Some(group_id) = body.permission_group_id {
        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM permission_groups WHERE id = $1 AND workspace_id = $2)",
        )
        .bind(group_id)
        .bind(ctx.workspace_id)
        .fetch_one(&state.db)
        .await?;
        if !owned {
            return Err(AppError::NotFound("Grupo de permissões não encontrado".to_string()));
        }
    }

    // Senha provisória impossível de usar: o convite define a senha real
    let placeholder_hash = hash_password(&crate::auth::generate_token())?;

    let user_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO users (workspace_id, email, name, password_hash, role, status, permission_group_id)
        VALUES ($1, $2, '', $3, $4, 'pending', $5)
        RETURNING id
        "#,
    )
    .bind(ctx.workspace_id)
    .bind(&email)
    .bind(&placeholder_hash)
    .bind(&body.role)
    .bind(body.permission_group_id)
    .fetch_one(&state.db)
    .await?;

    let token = TokenService::issue(
        &state.db,
        TokenKind::Invitation,
        &email,
        Some(user_id),
        Some(ctx.workspace_id),
        Some(&body.role),
        body.permission_group_id,
        Duration::days(state.settings.auth.invitation_ttl_days),
    )
    .await?;

    let workspace_name: String = sqlx::query_scalar("SELECT name FROM workspaces WHERE id = $1")
        .bind(ctx.workspace_id)
        .fetch_one(&state.db)
        .await?;

    let (subject, html) = invitation_email(state.mail.app_base_url(), &workspace_name, &token);
    state.mail.send_best_effort(&email, &subject, &html).await;

    Ok(Json(json!({
        "message": "Convite enviado",
        "user_id": user_id
    })))
}

/// POST /api/auth/invitations/accept
pub async fn accept_invitation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AcceptInvitationBody>,
) -> Result<Json<Value>, AppError> {
    log_request_received("/api/auth/invitations/accept", "POST");

    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::ValidationError("Nome obrigatório".to_string()));
    }
    let password_hash = hash_password(&body.password)?;

    let mut tx = state.db.begin().await?;

    let token = TokenService::consume(&mut tx, TokenKind::Invitation, &body.token).await?;

    let (user_id, workspace_id) = match (token.user_id, token.workspace_id) {
        (Some(u), Some(w)) => (u, w),
        _ => return Err(AppError::ValidationError("Token inválido ou expirado".to_string())),
    };

    let updated = sqlx::query(
        r#"
        UPDATE users
        SET name = $1, password_hash = $2, status = 'active', updated_at = now()
        WHERE id = $3 AND workspace_id = $4 AND status = 'pending'
        "#,
    )
    .bind(&name)
    .bind(&password_hash)
    .bind(user_id)
    .bind(workspace_id)
    .execute(&mut *tx)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(AppError::ValidationError("Token inválido ou expirado".to_string()));
    }

    tx.commit().await?;

    // Sessão já aberta para o convidado entrar direto
    let session = SessionService::create(
        &state.db,
        user_id,
        workspace_id,
        state.settings.auth.session_ttl_hours,
    )
    .await?;

    Ok(Json(json!({
        "message": "Convite aceito",
        "token": session,
        "user_id": user_id,
        "workspace_id": workspace_id
    })))
}

/// GET /api/me — perfil e mapa efetivo de permissões do chamador
pub async fn me(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
) -> Result<Json<Value>, AppError> {
    let user: User = sqlx::query_as(
        r#"
        SELECT id, workspace_id, email, name, password_hash, role, status,
               permissions, permission_group_id, created_at, updated_at
        FROM users
        WHERE id = $1 AND workspace_id = $2
        "#,
    )
    .bind(ctx.user_id)
    .bind(ctx.workspace_id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({
        "user": {
            "id": user.id,
            "name": user.name,
            "email": user.email,
            "role": user.role,
            "status": user.status,
            "workspace_id": user.workspace_id,
            "permission_group_id": user.permission_group_id
        },
        "permissions": ctx.permissions
    })))
}
