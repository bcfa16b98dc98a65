//! Production server setup code

use crate::{
    settings,
    setups::{NotificationSink, ServerSetup, SystemClock},
    store::PgStore,
};
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use mailgun_rs::{EmailAddress, Mailgun, MailgunRegion, Message};
use reqwest::header;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Serialize;
use std::time::Duration;

/// Production implementation of `ServerSetup`.
/// Actually calls out to the mail and SMS services configured in `settings.toml`.
#[derive(Clone, Debug, Default)]
pub struct ProdSetup;

impl ServerSetup for ProdSetup {
    type Store = PgStore;
    type Notifier = GatewayNotifier;
    type Clock = SystemClock;
}

/// Sends emails through Mailgun and text messages through an HTTP SMS gateway
#[derive(Clone, Debug)]
pub struct GatewayNotifier {
    mailgun: settings::Mailgun,
    sms: settings::Sms,
    client: ClientWithMiddleware,
}

#[derive(Debug, Serialize)]
struct SmsPayload<'a> {
    sender_id: &'a str,
    to: &'a str,
    message: &'a str,
}

impl GatewayNotifier {
    /// Create a new notifier. The SMS client retries transient failures.
    pub fn new(mailgun: settings::Mailgun, sms: settings::Sms) -> Result<Self> {
        let options = &sms.http_client;
        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(
                Duration::from_millis(options.retry_options.bounds_low_ms),
                Duration::from_millis(options.retry_options.bounds_high_ms),
            )
            .build_with_max_retries(options.retry_options.count.into());

        let inner = reqwest::Client::builder()
            .pool_idle_timeout(options.pool_idle_timeout())
            .timeout(Duration::from_millis(options.timeout_ms))
            .build()
            .context("Failed to build the SMS gateway client")?;

        let client = ClientBuilder::new(inner)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            mailgun,
            sms,
            client,
        })
    }

    fn sender(&self) -> EmailAddress {
        EmailAddress::name_address(&self.mailgun.from_name, &self.mailgun.from_address)
    }

    fn message(&self, to: &str, subject: &str, body: &str) -> Message {
        Message {
            to: vec![EmailAddress::address(to)],
            subject: subject.to_string(),
            text: body.to_string(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl NotificationSink for GatewayNotifier {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        tracing::debug!(to, subject, "Sending email");

        let client = Mailgun {
            message: self.message(to, subject, body),
            api_key: self.mailgun.api_key.clone(),
            domain: self.mailgun.domain.clone(),
        };

        client.async_send(MailgunRegion::US, &self.sender()).await?;

        Ok(())
    }

    async fn send_sms(&self, phone_number: &str, message: &str) -> Result<()> {
        tracing::debug!(to = phone_number, "Sending text message");

        let payload = serde_json::to_vec(&SmsPayload {
            sender_id: &self.sms.sender_id,
            to: phone_number,
            message,
        })?;

        self.client
            .post(&self.sms.endpoint)
            .bearer_auth(&self.sms.api_token)
            .header(header::CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}
