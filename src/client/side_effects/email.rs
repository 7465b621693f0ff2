use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::client::provider::EmailService;
use crate::client::supabase::error_from_response;
use crate::shared::error::ServiceError;

#[derive(Debug, Serialize)]
struct WelcomeEmailRequest<'a> {
    template: &'static str,
    email: &'a str,
    name: &'a str,
}

/// Posts welcome emails to an HTTP mail endpoint
#[derive(Debug, Clone)]
pub struct HttpEmailService {
    http: Client,
    url: String,
}

impl HttpEmailService {
    pub fn new(http: Client, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl EmailService for HttpEmailService {
    async fn send_welcome_email(&self, email: &str, name: &str) -> Result<(), ServiceError> {
        tracing::debug!("Sending welcome email to {}", email);
        let response = self
            .http
            .post(&self.url)
            .json(&WelcomeEmailRequest {
                template: "welcome",
                email,
                name,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(())
    }
}

/// Used when no mail endpoint is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledEmail;

#[async_trait]
impl EmailService for DisabledEmail {
    async fn send_welcome_email(&self, _email: &str, _name: &str) -> Result<(), ServiceError> {
        Err(ServiceError::Disabled { service: "email" })
    }
}
