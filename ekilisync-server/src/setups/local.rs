//! Server setup for local development & easier integration testing

use anyhow::Result;
use async_trait::async_trait;

use super::{NotificationSink, ServerSetup, SystemClock};
use crate::store::PgStore;

/// Implementation of `ServerSetup` for local environments.
/// Talks to a local Postgres, but never to mail or SMS providers.
#[derive(Debug, Clone)]
pub struct LocalSetup;

impl ServerSetup for LocalSetup {
    type Store = PgStore;
    type Notifier = LogNotifier;
    type Clock = SystemClock;
}

/// A `NotificationSink` that doesn't actually send anything,
/// but instead logs messages via tracing, so codes can be picked
/// up from the console.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationSink for LogNotifier {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        tracing::info!(to, subject, body, "email (not sent)");
        Ok(())
    }

    async fn send_sms(&self, phone_number: &str, message: &str) -> Result<()> {
        tracing::info!(to = phone_number, message, "text message (not sent)");
        Ok(())
    }
}
