use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// How long a freshly issued passcode stays valid, in seconds.
pub const OTP_VALIDITY_SECS: i64 = 5 * 60;

/// A one-time passcode and its expiry, carried as one value so neither half
/// can be stored without the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtpChallenge {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

impl OtpChallenge {
    /// Issue a fresh 6-digit challenge expiring five minutes from now.
    pub fn issue() -> Self {
        let code = rand::thread_rng().gen_range(100_000..=999_999).to_string();
        Self {
            code,
            expires_at: Utc::now() + Duration::seconds(OTP_VALIDITY_SECS),
        }
    }

    pub fn code_matches(&self, code: &str) -> bool {
        self.code == code
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}
