// ABOUTME: Compliance checks consulted before any message leaves for a carrier
// ABOUTME: Content policy and do-not-disturb lookups are injected; AllowAll is the permissive default

/// Outcome of a content policy check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyVerdict {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl PolicyVerdict {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Decides whether message text may be sent.
pub trait ContentPolicy: Send + Sync {
    fn check(&self, content: &str) -> PolicyVerdict;
}

/// Subscribers who opted out of messages.
pub trait DndRegistry: Send + Sync {
    /// `msisdn` is in international form.
    fn is_blocked(&self, msisdn: &str) -> bool;
}

/// Permits everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl ContentPolicy for AllowAll {
    fn check(&self, _content: &str) -> PolicyVerdict {
        PolicyVerdict::allow()
    }
}

impl DndRegistry for AllowAll {
    fn is_blocked(&self, _msisdn: &str) -> bool {
        false
    }
}
