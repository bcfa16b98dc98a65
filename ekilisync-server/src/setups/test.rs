//! Test server setup code

use crate::{
    setups::{Clock, NotificationSink, ServerSetup},
    test_utils::memory_store::MemoryStore,
};
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

#[derive(Clone, Debug, Default)]
pub struct TestSetup;

impl ServerSetup for TestSetup {
    type Store = MemoryStore;
    type Notifier = TestNotifier;
    type Clock = TestClock;
}

/// An email captured by [TestNotifier]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// A text message captured by [TestNotifier]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentSms {
    pub to: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct TestNotifier {
    emails: Arc<Mutex<Vec<SentEmail>>>,
    sms: Arc<Mutex<Vec<SentSms>>>,
    fail_email: Arc<AtomicBool>,
    fail_sms: Arc<AtomicBool>,
}

impl TestNotifier {
    pub fn emails(&self) -> Vec<SentEmail> {
        self.emails.lock().clone()
    }

    pub fn sms(&self) -> Vec<SentSms> {
        self.sms.lock().clone()
    }

    /// The body of the last email sent to `to`
    pub fn last_email_to(&self, to: &str) -> Option<String> {
        self.emails
            .lock()
            .iter()
            .rev()
            .find(|email| email.to == to)
            .map(|email| email.body.clone())
    }

    /// Make every following email fail
    pub fn fail_emails(&self, fail: bool) {
        self.fail_email.store(fail, Ordering::SeqCst);
    }

    /// Make every following text message fail
    pub fn fail_sms(&self, fail: bool) {
        self.fail_sms.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationSink for TestNotifier {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<()> {
        if self.fail_email.load(Ordering::SeqCst) {
            bail!("mail provider unavailable");
        }
        self.emails.lock().push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    async fn send_sms(&self, phone_number: &str, message: &str) -> Result<()> {
        if self.fail_sms.load(Ordering::SeqCst) {
            bail!("sms gateway unavailable");
        }
        self.sms.lock().push(SentSms {
            to: phone_number.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }
}

/// A [Clock] that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct TestClock {
    now: Arc<Mutex<NaiveDateTime>>,
}

impl Default for TestClock {
    fn default() -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 3, 4)
            .and_then(|date| date.and_hms_opt(8, 0, 0))
            .unwrap_or_default();
        Self::at(start)
    }
}

impl TestClock {
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock()
    }
}
