//! Redacted credential values.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// A wrapper around `SecretString` for database passwords.
///
/// Redacts the value in `Debug`, `Display` and `Serialize` output so that
/// connection parameters can be logged safely.
#[derive(Clone)]
pub struct SensitiveString(SecretString);

impl SensitiveString {
    /// Create a new sensitive string from any string-like value
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::new(value.into().into_boxed_str()))
    }

    /// Expose the secret value.
    ///
    /// Use sparingly - only when handing credentials to a driver.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Default for SensitiveString {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl PartialEq for SensitiveString {
    fn eq(&self, other: &Self) -> bool {
        self.expose_secret() == other.expose_secret()
    }
}

impl Eq for SensitiveString {}

impl std::fmt::Debug for SensitiveString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl std::fmt::Display for SensitiveString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl From<String> for SensitiveString {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for SensitiveString {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Serialize as redacted to prevent accidental exposure in config dumps/logs
impl Serialize for SensitiveString {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***REDACTED***")
    }
}

impl<'de> Deserialize<'de> for SensitiveString {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Ok(Self::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensitive_string_redacted() {
        let secret = SensitiveString::new("hunter2");
        assert_eq!(format!("{:?}", secret), "[REDACTED]");
        assert_eq!(format!("{}", secret), "[REDACTED]");
        assert_eq!(secret.expose_secret(), "hunter2");
    }

    #[test]
    fn test_sensitive_string_serde() {
        let secret: SensitiveString = serde_json::from_str("\"hunter2\"").unwrap();
        assert_eq!(secret.expose_secret(), "hunter2");

        let serialized = serde_json::to_string(&secret).unwrap();
        assert!(!serialized.contains("hunter2"));
    }

    #[test]
    fn test_sensitive_string_equality() {
        assert_eq!(SensitiveString::from("a"), SensitiveString::from("a"));
        assert_ne!(SensitiveString::from("a"), SensitiveString::from("b"));
        assert_eq!(SensitiveString::default().expose_secret(), "");
    }
}
