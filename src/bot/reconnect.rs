//! What to do after the connection closes.

use std::time::Duration;

use crate::protocol::LastDisconnect;

const LOGGED_OUT: u16 = 401;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Another session took over the stream.
    Conflict,
    /// Credentials were revoked; pairing is required again.
    LoggedOut,
    Abnormal,
}

impl CloseReason {
    pub fn classify(last: Option<&LastDisconnect>) -> Self {
        let Some(last) = last else {
            return Self::Abnormal;
        };
        let error = last.error.as_deref().unwrap_or("").to_lowercase();

        if last.status_code == Some(LOGGED_OUT) || error.contains("logged out") {
            Self::LoggedOut
        } else if error.contains("conflict") || error.contains("stream errored") {
            Self::Conflict
        } else {
            Self::Abnormal
        }
    }

    /// Delay before the next connect; `None` means stop.
    pub fn retry_after(self) -> Option<Duration> {
        match self {
            Self::Conflict => Some(Duration::from_secs(3)),
            Self::Abnormal => Some(Duration::from_secs(5)),
            Self::LoggedOut => None,
        }
    }
}
