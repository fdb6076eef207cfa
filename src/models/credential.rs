use std::fmt;

/// An upstream API key. Never serialized and never printed in full; it only
/// leaves the process inside an outbound `Authorization` header.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Blank keys count as missing.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        let trimmed = key.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Parses an `Authorization: Bearer <key>` header value.
    pub fn from_bearer(header: &str) -> Option<Self> {
        header
            .strip_prefix("Bearer ")
            .and_then(|key| Self::new(key))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }

    /// Short fingerprint that is safe to log.
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(5).collect();
        format!("{}…({} chars)", prefix, self.0.chars().count())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential({})", self.redacted())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_key_is_missing() {
        assert!(Credential::new("  ").is_none());
        assert_eq!(Credential::new(" sk-1 ").unwrap().expose(), "sk-1");
    }

    #[test]
    fn test_from_bearer() {
        assert_eq!(
            Credential::from_bearer("Bearer sk-or-abc").unwrap().expose(),
            "sk-or-abc"
        );
        assert!(Credential::from_bearer("sk-or-abc").is_none());
        assert!(Credential::from_bearer("Bearer ").is_none());
    }

    #[test]
    fn test_debug_does_not_leak_key() {
        let credential = Credential::new("sk-or-v1-secretsecret").unwrap();
        let printed = format!("{:?}", credential);
        assert!(!printed.contains("secretsecret"));
        assert!(printed.contains("sk-or"));
    }
}
