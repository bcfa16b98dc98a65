//! Best-effort email and SMS fan-out

use crate::{app_state::AppState, models::Identity, setups::NotificationSink, setups::ServerSetup};
use ekilisync_core::common::{DeliveryReport, DeliveryStatus};
use std::{future::Future, time::Duration};

/// Delivers a message to an identity over every channel it has.
///
/// Delivery never fails as a whole: each channel reports whether it went
/// out, failures are logged and counted.
pub struct Dispatcher<'a, S: ServerSetup> {
    notifier: &'a S::Notifier,
    timeout: Duration,
}

impl<S: ServerSetup> std::fmt::Debug for Dispatcher<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl<'a, S: ServerSetup> Dispatcher<'a, S> {
    /// Dispatcher using the state's notifier and dispatch timeout
    pub fn new(state: &'a AppState<S>) -> Self {
        Self {
            notifier: &state.notifier,
            timeout: state.notification_settings.dispatch_timeout(),
        }
    }

    /// Send `body` by email and, if the identity has a phone number, by SMS.
    /// Both channels are attempted concurrently.
    pub async fn deliver(&self, identity: &Identity, subject: &str, body: &str) -> DeliveryReport {
        let email = self.attempt(
            "email",
            &identity.email,
            self.notifier.send_email(&identity.email, subject, body),
        );

        let sms = async {
            match identity.phone_number.as_deref() {
                Some(phone_number) => {
                    self.attempt("sms", phone_number, self.notifier.send_sms(phone_number, body))
                        .await
                }
                None => DeliveryStatus::Skipped,
            }
        };

        let (email, sms) = tokio::join!(email, sms);

        DeliveryReport { email, sms }
    }

    async fn attempt(
        &self,
        channel: &'static str,
        recipient: &str,
        send: impl Future<Output = anyhow::Result<()>>,
    ) -> DeliveryStatus {
        let err = match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(())) => return DeliveryStatus::Sent,
            Ok(Err(err)) => err,
            Err(elapsed) => elapsed.into(),
        };

        tracing::warn!(channel, recipient, ?err, "Notification delivery failed");
        metrics::increment_counter!(crate::metrics::NOTIFICATIONS_FAILED_TOTAL, "channel" => channel);

        DeliveryStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::NewIdentity, test_utils::test_context::TestContext};
    use ekilisync_core::identity::Role;
    use uuid::Uuid;

    fn identity(phone_number: Option<&str>) -> Identity {
        NewIdentity::new(
            Uuid::new_v4(),
            "Jane".to_string(),
            "jane@x.com".to_string(),
            phone_number.map(ToString::to_string),
            Role::Employee,
            Default::default(),
        )
        .into_identity()
    }

    #[test_log::test(tokio::test)]
    async fn test_deliver_uses_both_channels() {
        let ctx = TestContext::new();
        let report = ctx
            .app_state()
            .notifications()
            .deliver(&identity(Some("+15550100")), "Hi", "Hello there")
            .await;

        assert_eq!(report.email, DeliveryStatus::Sent);
        assert_eq!(report.sms, DeliveryStatus::Sent);
        assert_eq!(ctx.notifier().emails()[0].subject, "Hi");
        assert_eq!(ctx.notifier().sms()[0].to, "+15550100");
    }

    #[test_log::test(tokio::test)]
    async fn test_deliver_skips_sms_without_phone_number() {
        let ctx = TestContext::new();
        let report = ctx
            .app_state()
            .notifications()
            .deliver(&identity(None), "Hi", "Hello there")
            .await;

        assert_eq!(report.email, DeliveryStatus::Sent);
        assert_eq!(report.sms, DeliveryStatus::Skipped);
        assert!(ctx.notifier().sms().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_channel_does_not_affect_the_other() {
        let ctx = TestContext::new();
        ctx.notifier().fail_emails(true);

        let report = ctx
            .app_state()
            .notifications()
            .deliver(&identity(Some("+15550100")), "Hi", "Hello there")
            .await;

        assert_eq!(report.email, DeliveryStatus::Failed);
        assert_eq!(report.sms, DeliveryStatus::Sent);
    }
}
