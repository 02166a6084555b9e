//! Anonymous identifiers for respondents.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::survey::*;

const RANDOM_PART_LEN: usize = 9;

/// Who is answering, as far as tracking is concerned.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub user_id: String,
    pub session_start: DateTime<Utc>,
}

impl UserIdentity {
    pub fn new(now: DateTime<Utc>) -> UserIdentity {
        UserIdentity {
            user_id: generate_user_id(now),
            session_start: now,
        }
    }
}

/// An identifier of the form `user_<milliseconds>_<9 random characters>`.
pub fn generate_user_id(now: DateTime<Utc>) -> String {
    let random: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(RANDOM_PART_LEN)
        .collect();
    format!("user_{}_{}", now.timestamp_millis(), random)
}

/// A session ends after `timeout_hours`, or when the (UTC) day changes.
pub fn is_new_session(last_start: &DateTime<Utc>, now: &DateTime<Utc>, timeout_hours: i64) -> bool {
    *now - *last_start > Duration::hours(timeout_hours)
        || last_start.date_naive() != now.date_naive()
}

/// Keeps the stored identity if its session is still running, otherwise starts
/// a new one.
pub fn resolve(
    stored: Option<UserIdentity>,
    now: DateTime<Utc>,
    timeout_hours: i64,
) -> UserIdentity {
    match stored {
        Some(identity) if !is_new_session(&identity.session_start, &now, timeout_hours) => {
            debug!("resolve: continuing session of {}", identity.user_id);
            identity
        }
        _ => {
            let identity = UserIdentity::new(now);
            info!("New session for user {}", identity.user_id);
            identity
        }
    }
}
