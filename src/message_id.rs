use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Generates gateway message identifiers of the form `ID<unix millis><nnn>`.
///
/// The three-digit suffix is a rolling counter, so ids are unique as long as
/// fewer than a thousand are minted in the same millisecond. Ids stay well
/// under the 64-octet message_id limit.
#[derive(Debug, Default)]
pub struct MessageIdGenerator {
    counter: AtomicU32,
}

impl MessageIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let suffix = self.counter.fetch_add(1, Ordering::Relaxed) % 1000;
        format!("ID{millis}{suffix:03}")
    }
}
