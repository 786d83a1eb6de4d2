use tracing::{debug, error, info, warn};

pub fn log_request_received(endpoint: &str, method: &str) {
    info!("Request received: {} {}", method, endpoint);
}

pub fn log_request_processed(endpoint: &str, status: u16, duration_ms: u64) {
    info!("Request processed: {} - Status: {} - Duration: {}ms",
          endpoint, status, duration_ms);
}

pub fn log_config_loaded(env: &str) {
    info!("Configuration loaded successfully for environment: {}", env);
}

pub fn log_server_startup(port: u16) {
    info!("🚀 ZapCRM backend server starting on port {}", port);
}

pub fn log_server_ready(port: u16) {
    info!("✅ Server ready and listening on http://0.0.0.0:{}", port);
}

pub fn log_health_check() {
    debug!("Health check requested");
}

/// Auditoria do bypass de owner/admin: toda checagem respondida pelo
/// curto-circuito de superusuário gera um evento nomeando usuário e chave.
pub fn log_superuser_bypass(user_id: &str, role: &str, permission_key: &str) {
    info!(
        "Superuser bypass: user={} role={} key={}",
        user_id, role, permission_key
    );
}

pub fn log_permission_denied(user_id: &str, permission_key: &str) {
    warn!("Permission denied: user={} key={}", user_id, permission_key);
}

pub fn log_validation_error(field: &str, message: &str) {
    warn!("Validation error: {} - {}", field, message);
}

pub fn log_mail_sent(to: &str, subject: &str) {
    info!("📧 Mail sent: to={} subject={}", to, subject);
}

pub fn log_mail_error(to: &str, error: &str) {
    error!("Mail delivery failed: to={} error={}", to, error);
}

pub fn log_channel_event(provider: &str, instance: &str, event: &str) {
    info!("Channel event: provider={} instance={} event={}", provider, instance, event);
}

pub fn log_info(message: &str) {
    info!("{}", message);
}

pub fn log_error(message: &str) {
    error!("{}", message);
}

pub fn log_warning(message: &str) {
    warn!("{}", message);
}
