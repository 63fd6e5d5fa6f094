use thiserror::Error;

/// Proof that the caller presented the management code. Only
/// [`AccessGate::authorize`] can produce one, and every mutating service
/// call takes it as a parameter.
#[derive(Debug)]
pub struct AccessGrant {
    _private: (),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessDenied {
    #[error("A security code is required to perform this action.")]
    Missing,
    #[error("The security code you entered is invalid. Please try again.")]
    Invalid,
}

/// Checks a presented code against the configured management secret.
#[derive(Clone)]
pub struct AccessGate {
    secret: Option<String>,
}

impl AccessGate {
    /// With no secret configured every code is rejected.
    pub fn new(secret: Option<String>) -> Self {
        let secret = secret.filter(|s| !s.is_empty());
        if secret.is_none() {
            log::warn!("No management secret configured; all mutating requests will be denied");
        }
        Self { secret }
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    pub fn authorize(&self, presented: Option<&str>) -> Result<AccessGrant, AccessDenied> {
        let presented = presented.ok_or(AccessDenied::Missing)?;
        match &self.secret {
            Some(secret) if constant_time_eq(secret.as_bytes(), presented.as_bytes()) => {
                Ok(AccessGrant { _private: () })
            }
            _ => Err(AccessDenied::Invalid),
        }
    }
}

impl std::fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessGate")
            .field("configured", &self.is_configured())
            .finish()
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
pub(crate) fn test_grant() -> AccessGrant {
    AccessGrant { _private: () }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_code_is_distinguished_from_wrong_code() {
        let gate = AccessGate::new(Some("rack-42".into()));

        assert_eq!(gate.authorize(None).unwrap_err(), AccessDenied::Missing);
        assert_eq!(gate.authorize(Some("rack-41")).unwrap_err(), AccessDenied::Invalid);
        assert_eq!(gate.authorize(Some("")).unwrap_err(), AccessDenied::Invalid);
        assert!(gate.authorize(Some("rack-42")).is_ok());
    }

    #[test]
    fn unconfigured_gate_denies_everything() {
        let gate = AccessGate::new(Some(String::new()));

        assert!(!gate.is_configured());
        assert_eq!(gate.authorize(Some("")).unwrap_err(), AccessDenied::Invalid);
        assert_eq!(gate.authorize(Some("anything")).unwrap_err(), AccessDenied::Invalid);
    }
}
