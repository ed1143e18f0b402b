//! Outbound notifications. The auth services depend only on the send
//! contract; delivery mechanics live behind it.

pub mod template;

mod http;
pub use http::HttpMailer;

use async_trait::async_trait;

use crate::auth::errors::AuthError;

/// What is being delivered; only OTP codes leave the system today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Otp,
}

impl NotificationKind {
    pub fn subject(&self) -> &'static str {
        match self {
            NotificationKind::Otp => "Your verification code",
        }
    }
}

/// Delivery contract for one rendered message to one address.
///
/// A delivery failure surfaces as `AuthError::Notification` and fails the
/// request; callers do not roll back OTP state that was persisted before the
/// send.
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send(&self, kind: NotificationKind, to: &str, html_body: &str) -> Result<(), AuthError>;
}

/// Test doubles for the gateway
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    /// Records deliveries instead of performing them.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<(NotificationKind, String, String)>>,
    }

    impl RecordingMailer {
        pub fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }

        /// Body of the most recent delivery to `addr`, if any.
        pub fn last_body_to(&self, addr: &str) -> Option<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|(_, to, _)| to == addr)
                .map(|(_, _, body)| body.clone())
        }
    }

    #[async_trait]
    impl NotificationGateway for RecordingMailer {
        async fn send(
            &self,
            kind: NotificationKind,
            to: &str,
            html_body: &str,
        ) -> Result<(), AuthError> {
            self.sent
                .lock()
                .unwrap()
                .push((kind, to.to_string(), html_body.to_string()));
            Ok(())
        }
    }

    /// Always fails, for exercising delivery-failure paths.
    #[derive(Default)]
    pub struct FailingMailer;

    #[async_trait]
    impl NotificationGateway for FailingMailer {
        async fn send(&self, _: NotificationKind, _: &str, _: &str) -> Result<(), AuthError> {
            Err(AuthError::Notification("delivery refused".into()))
        }
    }
}
