//! Outgoing email through an HTTP email API.
//!
//! Messages are POSTed as JSON with a bearer API key. When no API URL is
//! configured the mailer is disabled: sends are logged and succeed without
//! touching the network, which keeps local development self-contained.

use std::time::Duration;

use serde::Serialize;

use crate::{config::Config, error::AppError};

/// A single outgoing message.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EmailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Email API client shared by all handlers.
#[derive(Debug, Clone)]
pub struct Mailer {
    client: reqwest::Client,
    api_url: Option<String>,
    api_key: Option<String>,
    from: String,
}

impl Mailer {
    pub fn new(api_url: Option<String>, api_key: Option<String>, from: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            client,
            api_url: api_url.filter(|u| !u.is_empty()),
            api_key,
            from,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.email_api_url.clone(),
            config.email_api_key.clone(),
            config.email_from.clone(),
        )
    }

    /// A mailer that never sends.
    #[cfg(test)]
    pub fn disabled() -> Self {
        Self::new(None, None, "ClubFlow <noreply@clubflow.app>".to_string())
    }

    pub fn is_enabled(&self) -> bool {
        self.api_url.is_some()
    }

    pub fn sender(&self) -> &str {
        &self.from
    }

    /// Deliver a message.
    ///
    /// # Errors
    ///
    /// `AppError::Email` when the request fails or the API answers with a
    /// non-success status.
    pub async fn send(&self, message: &EmailMessage) -> Result<(), AppError> {
        let Some(url) = &self.api_url else {
            tracing::info!(to = %message.to, subject = %message.subject, "Email delivery disabled, skipping");
            return Ok(());
        };

        let mut request = self.client.post(url).json(message);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::Email(format!("Request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Email(format!(
                "Email API returned {status}: {body}"
            )));
        }

        tracing::info!(to = %message.to, subject = %message.subject, "Email sent");
        Ok(())
    }

    /// Send in the background, logging failures.
    ///
    /// The caller's operation never fails because of email delivery.
    pub fn send_in_background(&self, message: EmailMessage) {
        if !self.is_enabled() {
            tracing::info!(to = %message.to, subject = %message.subject, "Email delivery disabled, skipping");
            return;
        }

        let mailer = self.clone();
        tokio::spawn(async move {
            if let Err(e) = mailer.send(&message).await {
                tracing::error!(to = %message.to, error = %e, "Failed to send email");
            }
        });
    }
}

/// Render the invitation email.
pub fn invitation_email(
    from: &str,
    to: &str,
    club_name: &str,
    inviter: &str,
    role: &str,
    accept_url: &str,
) -> EmailMessage {
    let subject = format!("You're invited to join {club_name}");
    let text = format!(
        "{inviter} has invited you to join {club_name} as {role}.\n\n\
         Accept the invitation: {accept_url}\n"
    );
    let html = format!(
        "<p><strong>{inviter}</strong> has invited you to join <strong>{club_name}</strong> as {role}.</p>\
         <p><a href=\"{accept_url}\">Accept the invitation</a></p>"
    );

    EmailMessage {
        from: from.to_string(),
        to: to.to_string(),
        subject,
        html,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn message() -> EmailMessage {
        invitation_email(
            "ClubFlow <noreply@clubflow.app>",
            "coach@example.com",
            "Riverside Rowing",
            "Jo",
            "coach",
            "http://localhost:5173/invite/abc",
        )
    }

    #[test]
    fn invitation_mentions_club_role_and_link() {
        let message = message();
        assert_eq!(message.subject, "You're invited to join Riverside Rowing");
        assert!(message.text.contains("as coach"));
        assert!(message.text.contains("http://localhost:5173/invite/abc"));
        assert!(message.html.contains("href=\"http://localhost:5173/invite/abc\""));
    }

    #[tokio::test]
    async fn disabled_mailer_succeeds_without_sending() {
        let mailer = Mailer::disabled();
        assert!(!mailer.is_enabled());
        assert!(mailer.send(&message()).await.is_ok());
    }

    #[test]
    fn background_send_is_skipped_when_disabled() {
        // No runtime here: spawning would panic
        Mailer::disabled().send_in_background(message());
    }

    #[tokio::test]
    async fn posts_message_with_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(serde_json::json!({
                "to": "coach@example.com",
                "subject": "You're invited to join Riverside Rowing"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = Mailer::new(
            Some(format!("{}/send", server.uri())),
            Some("test-key".to_string()),
            "ClubFlow <noreply@clubflow.app>".to_string(),
        );

        mailer.send(&message()).await.unwrap();
    }

    #[tokio::test]
    async fn api_errors_become_email_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad recipient"))
            .mount(&server)
            .await;

        let mailer = Mailer::new(Some(server.uri()), None, "noreply@example.com".to_string());

        match mailer.send(&message()).await {
            Err(AppError::Email(msg)) => assert!(msg.contains("bad recipient")),
            other => panic!("expected email error, got {other:?}"),
        }
    }

    #[test]
    fn empty_url_disables_the_mailer() {
        let mailer = Mailer::new(Some(String::new()), None, "x@example.com".to_string());
        assert!(!mailer.is_enabled());
    }
}
