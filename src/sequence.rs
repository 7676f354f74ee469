/// Largest sequence number handed out before wrapping back to 1.
pub const MAX_SEQUENCE_NUMBER: u32 = 0x7FFF_FFFF;

/// Allocates request sequence numbers for one connection.
///
/// Values run 1..=0x7FFFFFFF and wrap. A value still in flight is skipped,
/// so a wrapped counter never collides with a pending request.
#[derive(Debug, Default)]
pub struct SequenceCounter {
    last: u32,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next sequence number for which `in_flight` is false.
    ///
    /// Callers bound the number of in-flight requests far below the
    /// sequence space, so the scan terminates.
    pub fn next(&mut self, in_flight: impl Fn(u32) -> bool) -> u32 {
        loop {
            self.last = if self.last >= MAX_SEQUENCE_NUMBER {
                1
            } else {
                self.last + 1
            };
            if !in_flight(self.last) {
                return self.last;
            }
        }
    }
}
