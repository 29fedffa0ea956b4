//! API keys for the external services.
//!
//! Each key remembers which service it belongs to, so it can show up in
//! Debug output and logs as `ApiKey(serper, [REDACTED])` without leaking.

use std::fmt;

use secrecy::{ExposeSecret, SecretBox};

use crate::error::KeyError;

pub struct ApiKey {
    service: &'static str,
    secret: SecretBox<str>,
}

impl ApiKey {
    pub fn new(service: &'static str, key: impl Into<String>) -> Self {
        Self {
            service,
            secret: SecretBox::new(key.into().into_boxed_str()),
        }
    }

    /// Key read from configuration variable `var`. Surrounding whitespace
    /// (common in hand-edited `.env` files) is dropped; a blank key is an
    /// error.
    pub fn required(
        service: &'static str,
        var: &str,
        value: Option<String>,
    ) -> Result<Self, KeyError> {
        let value = value.ok_or_else(|| KeyError::Missing {
            var: var.to_string(),
        })?;

        let key = value.trim();
        if key.is_empty() {
            return Err(KeyError::Blank {
                var: var.to_string(),
            });
        }
        Ok(Self::new(service, key))
    }

    pub fn service(&self) -> &'static str {
        self.service
    }

    /// Raw key, for request headers only.
    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }
}

impl Clone for ApiKey {
    fn clone(&self) -> Self {
        Self::new(self.service, self.expose())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({}, [REDACTED])", self.service)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_names_service_only() {
        let key = ApiKey::new("firecrawl", "fc-super-secret-key");
        let debug = format!("{:?}", key);
        assert_eq!(debug, "ApiKey(firecrawl, [REDACTED])");

        let nested = format!("{:?}", Some(key.clone()));
        assert!(!nested.contains("fc-super"));
    }

    #[test]
    fn test_required_trims_value() {
        let key = ApiKey::required("serper", "SERPER_API_KEY", Some(" b9719d\n".into())).unwrap();
        assert_eq!(key.expose(), "b9719d");
        assert_eq!(key.service(), "serper");
    }

    #[test]
    fn test_required_rejects_missing_and_blank() {
        let missing = ApiKey::required("serper", "SERPER_API_KEY", None).unwrap_err();
        assert_eq!(missing.to_string(), "SERPER_API_KEY must be set");

        let blank = ApiKey::required("serper", "SERPER_API_KEY", Some("  ".into())).unwrap_err();
        assert!(matches!(blank, KeyError::Blank { .. }));
    }
}
