/// Main Application: backend multi-tenant do ZapCRM
///
/// Arquitetura:
/// - API JSON resource-oriented sob /api/...
/// - Todo handler de recurso resolve o contexto {workspace_id, user_id} via
///   extractor (sessão ou par de headers assinado pelo gateway)
/// - Permissões: defaults por perfil + grupo customizado + override por
///   usuário; bypass de owner/admin é explícito e auditado
/// - Webhooks do Dispara-Já entram por /webhooks/disparaja com assinatura
///   HMAC da instância

use axum::{
    middleware,
    routing::{delete, get, patch, post, put},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use zapcrm_backend::{
    config::Settings,
    handlers::{
        admin, agents, auth, connections, contact_fields, conversations, health, leads,
        permission_groups, settings as settings_handlers, tags, users, vector_stores,
    },
    middleware as app_middleware,
    services::MailService,
    utils::logging::*,
    utils::AppError,
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Carregar variáveis de ambiente do arquivo .env (se existir)
    if dotenvy::dotenv().is_err() {
        // Em produção não existe .env - variáveis vêm do ambiente
        tracing::debug!("Arquivo .env não encontrado - usando variáveis de ambiente do sistema");
    }

    // Inicializar tracing
    tracing_subscriber::fmt::init();

    // Carregar configurações
    let settings = Settings::new()
        .map_err(|e| AppError::ConfigError(format!("Failed to load settings: {}", e)))?;

    log_config_loaded(&std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string()));

    // Pool de conexões injetado no AppState (nunca global)
    let db = PgPoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    // Migrações embutidas aplicadas no boot
    sqlx::migrate!("./migrations").run(&db).await?;
    log_info("✅ Migrações aplicadas");

    let mail = MailService::new(settings.mail.clone())?;
    if settings.mail.enabled {
        log_info("📧 MailService habilitado");
    } else {
        log_warning("⚠️  MailService desabilitado (mail.enabled = false) - e-mails só aparecem no log");
    }

    // Inicializar estado da aplicação
    let app_state = Arc::new(AppState {
        settings: settings.clone(),
        db,
        mail,
    });

    // Rotas públicas (health checks, auth e webhooks com validação própria)
    let mut app = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/status", get(health::status_check))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/verify-email", post(auth::verify_email))
        .route("/api/auth/forgot-password", post(auth::forgot_password))
        .route("/api/auth/reset-password", post(auth::reset_password))
        .route("/api/auth/invitations/accept", post(auth::accept_invitation))
        .route("/webhooks/disparaja", post(connections::ingest_disparaja_log))
        .with_state(app_state.clone());

    // Rotas de recurso: o extractor RequestContext exige contexto válido
    let api_routes = Router::new()
        .route("/api/me", get(auth::me))
        .route("/api/auth/invitations", post(auth::invite_user))
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route(
            "/api/users/:id",
            patch(users::update_user).delete(users::delete_user),
        )
        .route("/api/permissions", get(permission_groups::list_permissions))
        .route(
            "/api/permission-groups",
            get(permission_groups::list_groups).post(permission_groups::create_group),
        )
        .route(
            "/api/permission-groups/:id",
            get(permission_groups::get_group)
                .patch(permission_groups::update_group)
                .delete(permission_groups::delete_group),
        )
        .route(
            "/api/permission-groups/:id/items",
            put(permission_groups::put_group_items),
        )
        .route("/api/leads", get(leads::list_leads).post(leads::create_lead))
        .route(
            "/api/leads/:id",
            get(leads::get_lead)
                .patch(leads::update_lead)
                .delete(leads::delete_lead),
        )
        .route("/api/leads/:id/stage", patch(leads::update_lead_stage))
        .route(
            "/api/leads/:id/tags/:tag_id",
            post(leads::add_lead_tag).delete(leads::remove_lead_tag),
        )
        .route("/api/tags", get(tags::list_tags).post(tags::create_tag))
        .route("/api/tags/:id", patch(tags::update_tag).delete(tags::delete_tag))
        .route(
            "/api/conversations",
            get(conversations::list_conversations).post(conversations::create_conversation),
        )
        .route(
            "/api/conversations/:id",
            patch(conversations::update_conversation),
        )
        .route(
            "/api/conversations/:id/messages",
            get(conversations::list_messages).post(conversations::send_message),
        )
        .route(
            "/api/contact-fields",
            get(contact_fields::list_contact_fields).post(contact_fields::create_contact_field),
        )
        .route(
            "/api/contact-fields/:id",
            patch(contact_fields::update_contact_field)
                .delete(contact_fields::delete_contact_field),
        )
        .route("/api/agents", get(agents::list_agents).post(agents::create_agent))
        .route(
            "/api/agents/:id",
            get(agents::get_agent)
                .patch(agents::update_agent)
                .delete(agents::delete_agent),
        )
        .route(
            "/api/agents/:agent_id/vector-stores",
            get(vector_stores::list_agent_vector_stores).post(vector_stores::create_vector_store),
        )
        .route(
            "/api/vector-stores/:id",
            delete(vector_stores::delete_vector_store),
        )
        .route(
            "/api/vector-stores/:id/files",
            get(vector_stores::list_vector_store_files).post(vector_stores::add_vector_store_file),
        )
        .route(
            "/api/vector-stores/:id/files/:file_id",
            delete(vector_stores::delete_vector_store_file),
        )
        .route(
            "/api/connections/disparaja",
            get(connections::list_disparaja_connections).post(connections::connect_disparaja),
        )
        .route(
            "/api/connections/disparaja/:id",
            delete(connections::delete_disparaja_connection),
        )
        .route(
            "/api/connections/disparaja/:id/status",
            patch(connections::update_disparaja_status),
        )
        .route(
            "/api/connections/disparaja/:id/qrcode",
            get(connections::disparaja_qrcode),
        )
        .route(
            "/api/connections/disparaja/:id/logs",
            get(connections::list_disparaja_logs),
        )
        .route(
            "/api/connections/whatsapp-cloud",
            get(connections::list_whatsapp_cloud_connections)
                .post(connections::connect_whatsapp_cloud),
        )
        .route(
            "/api/connections/whatsapp-cloud/:id",
            delete(connections::delete_whatsapp_cloud_connection),
        )
        .route(
            "/api/connections/whatsapp-cloud/:id/status",
            patch(connections::update_whatsapp_cloud_status),
        )
        .route("/api/settings", get(settings_handlers::get_settings))
        .route(
            "/api/settings/openai-key",
            put(settings_handlers::put_openai_key),
        )
        .with_state(app_state.clone());

    app = app.merge(api_routes);

    // Rotas administrativas protegidas com API key
    let admin_routes = Router::new()
        .route("/admin/db-check", get(admin::check_database))
        .layer(middleware::from_fn(app_middleware::require_admin_key))
        .with_state(app_state);

    app = app
        .merge(admin_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    // Iniciar servidor; PORT do ambiente tem precedência (Cloud Run)
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(settings.server.port);
    let listener = TcpListener::bind(format!("{}:{}", settings.server.host, port)).await?;

    log_server_startup(port);
    log_server_ready(port);

    // Graceful shutdown com signal handling
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log_info("🛑 Server shut down gracefully");
    Ok(())
}

/// Signal handler para graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log_info("🛑 Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            log_info("🛑 Received SIGTERM, shutting down gracefully...");
        }
    }
}
