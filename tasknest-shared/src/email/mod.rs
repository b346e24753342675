//! Account notification emails
//!
//! A welcome email goes out on signup and a cancellation email when an
//! account is deleted. Delivery is best effort: [`Notifier`] logs send
//! failures and never returns them, so a mail outage cannot fail a signup or
//! a deletion.
//!
//! - [`SendGridMailer`] delivers through the SendGrid v3 HTTP API
//! - [`LogMailer`] only logs, used when no API key is configured

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const SENDGRID_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// Error type for email delivery
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// Request never completed
    #[error("Email transport error: {0}")]
    Transport(String),

    /// Provider answered with a non-success status
    #[error("Email provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Plain-text email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub text: String,
}

/// Outbound email transport
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError>;
}

/// Sends mail through SendGrid
#[derive(Clone)]
pub struct SendGridMailer {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl std::fmt::Debug for SendGridMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendGridMailer")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl SendGridMailer {
    pub fn new(api_key: impl Into<String>) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| MailError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            endpoint: SENDGRID_ENDPOINT.to_string(),
        })
    }

    /// Points the mailer at another URL, e.g. a local mock server
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn payload(message: &EmailMessage) -> serde_json::Value {
        json!({
            "personalizations": [{ "to": [{ "email": message.to }] }],
            "from": { "email": message.from },
            "subject": message.subject,
            "content": [{ "type": "text/plain", "value": message.text }],
        })
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&Self::payload(&message))
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(MailError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

/// Logs messages instead of sending them
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            "Email delivery disabled, message not sent"
        );
        Ok(())
    }
}

/// Composes and sends the account lifecycle emails
#[derive(Clone)]
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    from: String,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>, from: impl Into<String>) -> Self {
        Self {
            mailer,
            from: from.into(),
        }
    }

    pub fn welcome_message(&self, email: &str, name: &str) -> EmailMessage {
        EmailMessage {
            to: email.to_string(),
            from: self.from.clone(),
            subject: "Thanks for joining in!".to_string(),
            text: format!(
                "Welcome to the app, {}. Let me know how you get along with the app.",
                name
            ),
        }
    }

    pub fn cancelation_message(&self, email: &str, name: &str) -> EmailMessage {
        EmailMessage {
            to: email.to_string(),
            from: self.from.clone(),
            subject: "Sorry to see you go!".to_string(),
            text: format!("Goodbye, {}. I hope to see you back sometime soon.", name),
        }
    }

    pub async fn send_welcome(&self, email: &str, name: &str) {
        self.deliver(self.welcome_message(email, name)).await;
    }

    pub async fn send_cancelation(&self, email: &str, name: &str) {
        self.deliver(self.cancelation_message(email, name)).await;
    }

    async fn deliver(&self, message: EmailMessage) {
        let to = message.to.clone();
        if let Err(e) = self.mailer.send(message).await {
            warn!(to = %to, error = %e, "Failed to send email");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::State,
        http::{header, HeaderMap, StatusCode},
        routing::post,
        Json, Router,
    };
    use tokio::sync::Mutex;

    type Captured = Arc<Mutex<Option<(String, serde_json::Value)>>>;

    async fn mock_send(
        State(captured): State<Captured>,
        headers: HeaderMap,
        Json(body): Json<serde_json::Value>,
    ) -> (StatusCode, &'static str) {
        let auth = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let accepted = auth == "Bearer SG.good";
        *captured.lock().await = Some((auth, body));

        if accepted {
            (StatusCode::ACCEPTED, "")
        } else {
            (StatusCode::UNAUTHORIZED, "bad key")
        }
    }

    /// Serves a stand-in for the SendGrid endpoint, returns its URL
    async fn mock_sendgrid(captured: Captured) -> String {
        let app = Router::new()
            .route("/v3/mail/send", post(mock_send))
            .with_state(captured);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/v3/mail/send", addr)
    }

    fn hello() -> EmailMessage {
        EmailMessage {
            to: "mike@example.com".to_string(),
            from: "noreply@tasknest.dev".to_string(),
            subject: "Thanks for joining in!".to_string(),
            text: "Welcome to the app, Mike.".to_string(),
        }
    }

    #[derive(Default)]
    struct Recording {
        sent: Mutex<Vec<EmailMessage>>,
    }

    #[async_trait]
    impl Mailer for Recording {
        async fn send(&self, message: EmailMessage) -> Result<(), MailError> {
            self.sent.lock().await.push(message);
            Ok(())
        }
    }

    struct Failing;

    #[async_trait]
    impl Mailer for Failing {
        async fn send(&self, _message: EmailMessage) -> Result<(), MailError> {
            Err(MailError::Rejected {
                status: 401,
                body: "bad key".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_welcome_and_cancelation() {
        let recording = Arc::new(Recording::default());
        let notifier = Notifier::new(recording.clone(), "noreply@tasknest.dev");

        notifier.send_welcome("mike@example.com", "Mike").await;
        notifier.send_cancelation("mike@example.com", "Mike").await;

        let sent = recording.sent.lock().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].to, "mike@example.com");
        assert_eq!(sent[0].from, "noreply@tasknest.dev");
        assert!(sent[0].text.contains("Mike"));
        assert_eq!(sent[1].subject, "Sorry to see you go!");
    }

    #[tokio::test]
    async fn test_send_failure_is_swallowed() {
        let notifier = Notifier::new(Arc::new(Failing), "noreply@tasknest.dev");
        notifier.send_welcome("mike@example.com", "Mike").await;
    }

    #[test]
    fn test_sendgrid_payload() {
        let message = EmailMessage {
            to: "a@example.com".to_string(),
            from: "b@example.com".to_string(),
            subject: "Hi".to_string(),
            text: "Body".to_string(),
        };
        let payload = SendGridMailer::payload(&message);

        assert_eq!(payload["personalizations"][0]["to"][0]["email"], "a@example.com");
        assert_eq!(payload["from"]["email"], "b@example.com");
        assert_eq!(payload["content"][0]["type"], "text/plain");
        assert_eq!(payload["content"][0]["value"], "Body");
    }

    #[tokio::test]
    async fn test_sendgrid_delivers_with_bearer_key() {
        let captured = Captured::default();
        let endpoint = mock_sendgrid(captured.clone()).await;
        let mailer = SendGridMailer::new("SG.good").unwrap().with_endpoint(endpoint);

        mailer.send(hello()).await.unwrap();

        let (auth, body) = captured.lock().await.take().unwrap();
        assert_eq!(auth, "Bearer SG.good");
        assert_eq!(body["personalizations"][0]["to"][0]["email"], "mike@example.com");
        assert_eq!(body["from"]["email"], "noreply@tasknest.dev");
        assert_eq!(body["subject"], "Thanks for joining in!");
    }

    #[tokio::test]
    async fn test_sendgrid_rejection_carries_status() {
        let captured = Captured::default();
        let endpoint = mock_sendgrid(captured.clone()).await;
        let mailer = SendGridMailer::new("SG.revoked").unwrap().with_endpoint(endpoint);

        let result = mailer.send(hello()).await;

        match result {
            Err(MailError::Rejected { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
        assert!(captured.lock().await.is_some());
    }

    #[tokio::test]
    async fn test_sendgrid_unreachable_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let mailer = SendGridMailer::new("SG.good")
            .unwrap()
            .with_endpoint(format!("http://{}/v3/mail/send", addr));

        assert!(matches!(mailer.send(hello()).await, Err(MailError::Transport(_))));
    }

    #[test]
    fn test_sendgrid_debug_hides_key() {
        let mailer = SendGridMailer::new("SG.secret").unwrap();
        assert!(!format!("{:?}", mailer).contains("SG.secret"));
    }
}
