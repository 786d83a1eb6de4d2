//! Envio de e-mails transacionais via provedor HTTP
//!
//! O envio é melhor-esforço nos fluxos de resposta genérica (reset de
//! senha): falha de entrega é logada, nunca propagada ao cliente.

use crate::config::settings::MailSettings;
use crate::utils::logging::{log_mail_error, log_mail_sent};
use crate::utils::{AppError, AppResult};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

#[derive(Clone)]
pub struct MailService {
    client: Client,
    settings: MailSettings,
}

impl MailService {
    pub fn new(settings: MailSettings) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to create mail HTTP client: {}", e)))?;

        Ok(Self { client, settings })
    }

    pub fn app_base_url(&self) -> &str {
        &self.settings.app_base_url
    }

    /// Envia um e-mail; com `mail.enabled = false` apenas loga (modo dev)
    pub async fn send(&self, to: &str, subject: &str, html: &str) -> AppResult<()> {
        if !self.settings.enabled {
            tracing::info!("Mail disabled - would send to={} subject={}", to, subject);
            return Ok(());
        }

        let api_url = self.settings.api_url.as_ref().ok_or_else(|| {
            AppError::ConfigError("mail.api_url não configurado com mail.enabled=true".to_string())
        })?;
        let api_token = self.settings.api_token.as_ref().ok_or_else(|| {
            AppError::ConfigError("mail.api_token não configurado com mail.enabled=true".to_string())
        })?;

        let body = json!({
            "from": {
                "address": self.settings.from_address,
                "name": self.settings.from_name,
            },
            "to": [{ "address": to }],
            "subject": subject,
            "html": html,
        });

        let response = self
            .client
            .post(format!("{}/send", api_url.trim_end_matches('/')))
            .bearer_auth(api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::MailError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::MailError(format!(
                "provider status {}: {}",
                status, text
            )));
        }

        log_mail_sent(to, subject);
        Ok(())
    }

    /// Envio melhor-esforço: falha vira log, nunca erro do handler
    pub async fn send_best_effort(&self, to: &str, subject: &str, html: &str) {
        if let Err(e) = self.send(to, subject, html).await {
            log_mail_error(to, &e.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// Templates (corpo simples; sem engine de template por decisão de escopo)
// ---------------------------------------------------------------------------

pub fn verification_email(base_url: &str, name: &str, token: &str) -> (String, String) {
    let link = format!("{}/verificar-email?token={}", base_url, token);
    let subject = "Confirme seu e-mail no ZapCRM".to_string();
    let html = format!(
        "<p>Olá, {}!</p>\
         <p>Confirme seu e-mail para ativar sua conta no ZapCRM:</p>\
         <p><a href=\"{}\">Confirmar e-mail</a></p>\
         <p>O link expira em 24 horas.</p>",
        name, link
    );
    (subject, html)
}

pub fn password_reset_email(base_url: &str, token: &str) -> (String, String) {
    let link = format!("{}/redefinir-senha?token={}", base_url, token);
    let subject = "Redefinição de senha - ZapCRM".to_string();
    let html = format!(
        "<p>Recebemos um pedido para redefinir sua senha.</p>\
         <p><a href=\"{}\">Redefinir senha</a></p>\
         <p>Se você não pediu a redefinição, ignore este e-mail.</p>",
        link
    );
    (subject, html)
}

pub fn invitation_email(base_url: &str, workspace_name: &str, token: &str) -> (String, String) {
    let link = format!("{}/aceitar-convite?token={}", base_url, token);
    let subject = format!("Convite para o workspace {} no ZapCRM", workspace_name);
    let html = format!(
        "<p>Você foi convidado para o workspace <strong>{}</strong>.</p>\
         <p><a href=\"{}\">Aceitar convite</a></p>\
         <p>O convite expira em 7 dias.</p>",
        workspace_name, link
    );
    (subject, html)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(enabled: bool, api_url: Option<String>) -> MailSettings {
        MailSettings {
            enabled,
            api_url,
            api_token: Some("mail-token".to_string()),
            from_address: "nao-responda@zapcrm.com.br".to_string(),
            from_name: "ZapCRM".to_string(),
            app_base_url: "https://app.zapcrm.com.br".to_string(),
        }
    }

    #[tokio::test]
    async fn test_disabled_mail_is_noop() {
        let service = MailService::new(settings(false, None)).unwrap();
        service.send("ana@empresa.com.br", "Teste", "<p>oi</p>").await.unwrap();
    }

    #[tokio::test]
    async fn test_send_posts_to_provider() {
        let server = httpmock::MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(httpmock::Method::POST)
                .path("/send")
                .header("authorization", "Bearer mail-token");
            then.status(200).json_body(serde_json::json!({ "id": "mail-1" }));
        });

        let service = MailService::new(settings(true, Some(server.base_url()))).unwrap();
        service.send("ana@empresa.com.br", "Teste", "<p>oi</p>").await.unwrap();
        mock.assert();
    }

    #[test]
    fn test_templates_embed_token_link() {
        let (subject, html) = verification_email("https://app.zapcrm.com.br", "Ana", "tok123");
        assert!(subject.contains("ZapCRM"));
        assert!(html.contains("verificar-email?token=tok123"));

        let (_, html) = invitation_email("https://app.zapcrm.com.br", "Acme", "tok456");
        assert!(html.contains("aceitar-convite?token=tok456"));
    }
}
