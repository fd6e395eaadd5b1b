use std::fmt::Display;

use serde::{Deserialize, Deserializer, Serialize};

/// Why server forced the session to log out
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LogoutReason {
    /// same account logged in on another device
    NewDeviceLogin,
    /// session reached its lifetime
    SessionExpired,
    /// an administrator ended the session
    AdminLogout,
    /// reason this client does not know, kept verbatim
    Other(String),
}

impl LogoutReason {
    /// wire value
    pub fn as_str(&self) -> &str {
        match self {
            Self::NewDeviceLogin => "new-device-login",
            Self::SessionExpired => "session-expired",
            Self::AdminLogout => "admin-logout",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for LogoutReason {
    fn from(s: String) -> Self {
        match s.as_str() {
            "new-device-login" => Self::NewDeviceLogin,
            "session-expired" => Self::SessionExpired,
            "admin-logout" => Self::AdminLogout,
            _ => Self::Other(s),
        }
    }
}

impl From<LogoutReason> for String {
    fn from(reason: LogoutReason) -> Self {
        match reason {
            LogoutReason::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl Display for LogoutReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read an optional reason, any non string value counts as absent
pub(super) fn lenient<'de, D>(deserializer: D) -> Result<Option<LogoutReason>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(Some(s.into())),
        other => {
            log::debug!("Ignore non string logout reason {}", other);
            Ok(None)
        }
    }
}
