//! This abstracts ekilisync server side-effects into "setups".
//!
//! This module defines the traits, submodules define test, local & production
//! collections of implementations.
use crate::store::Store;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};

pub mod local;
pub mod prod;
#[cfg(test)]
pub mod test;

/// This trait groups type parameters to the server's `AppState` struct.
///
/// It captures the setup of the server, distinguishing between e.g.
/// unit testing & production setups.
pub trait ServerSetup: Clone + Send + Sync + 'static {
    /// Where offices, identities, passcodes, tokens and attendance live
    type Store: Store;
    /// Which implementation to use to send emails and text messages
    type Notifier: NotificationSink;
    /// Where "now" comes from
    type Clock: Clock;
}

/// The service that delivers notifications to identities.
///
/// Both operations may fail, callers decide whether that matters.
#[async_trait]
pub trait NotificationSink: Clone + Send + Sync + 'static {
    /// Send an email
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<()>;

    /// Send a text message
    async fn send_sms(&self, phone_number: &str, message: &str) -> Result<()>;
}

/// Source of the current time, in UTC.
pub trait Clock: Clone + Send + Sync + 'static {
    /// The current UTC time
    fn now(&self) -> NaiveDateTime;
}

/// [Clock] reading the system time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}
