//! Identifier generation
//!
//! Conversation keys and message ids are built from a prefix and the
//! current unix time in milliseconds. A plain timestamp collides when two
//! ids are minted in the same millisecond, so each generator remembers the
//! last millisecond it used and appends a sequence number for repeats.
//! Generators are injected where ids are needed instead of living in
//! process-wide state.

use std::sync::Mutex;

/// Source of unique string identifiers
pub trait IdGenerator: Send + Sync {
    /// Produce the next id for the given wall-clock time
    fn next_id(&self, now_ms: i64) -> String;
}

/// How the sequence component is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceStyle {
    /// `<prefix>_<ms>` for the first id of a millisecond,
    /// `<prefix>_<ms>_<n>` for the following ones
    OnCollision,
    /// Always `<prefix>_<ms>_<n>` with a counter that never resets
    Always,
}

#[derive(Debug, Default)]
struct GeneratorState {
    last_ms: i64,
    seq_in_ms: u64,
    total: u64,
}

/// Timestamp-based generator with a disambiguating sequence
///
/// # Examples
///
/// ```
/// use chatkeep::ids::{IdGenerator, TimestampIdGenerator};
///
/// let ids = TimestampIdGenerator::conversations();
/// assert_eq!(ids.next_id(1_700_000_000_000), "CONV_1700000000000");
/// assert_eq!(ids.next_id(1_700_000_000_000), "CONV_1700000000000_1");
/// assert_eq!(ids.next_id(1_700_000_000_001), "CONV_1700000000001");
/// ```
#[derive(Debug)]
pub struct TimestampIdGenerator {
    prefix: String,
    style: SequenceStyle,
    state: Mutex<GeneratorState>,
}

impl TimestampIdGenerator {
    /// Create a generator with an explicit prefix and sequence style
    pub fn new(prefix: impl Into<String>, style: SequenceStyle) -> Self {
        Self {
            prefix: prefix.into(),
            style,
            state: Mutex::new(GeneratorState::default()),
        }
    }

    /// Generator for conversation record keys (`CONV_<ms>`)
    pub fn conversations() -> Self {
        Self::new("CONV", SequenceStyle::OnCollision)
    }

    /// Generator for chat message ids (`msg_<ms>_<n>`)
    pub fn messages() -> Self {
        Self::new("msg", SequenceStyle::Always)
    }

    /// The prefix every generated id starts with
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl IdGenerator for TimestampIdGenerator {
    fn next_id(&self, now_ms: i64) -> String {
        let mut state = match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        // A clock that steps backwards reuses the last millisecond so the
        // sequence keeps ids distinct.
        let ms = now_ms.max(state.last_ms);
        if ms == state.last_ms && state.total > 0 {
            state.seq_in_ms += 1;
        } else {
            state.last_ms = ms;
            state.seq_in_ms = 0;
        }
        state.total += 1;

        match self.style {
            SequenceStyle::OnCollision if state.seq_in_ms == 0 => {
                format!("{}_{}", self.prefix, ms)
            }
            SequenceStyle::OnCollision => format!("{}_{}_{}", self.prefix, ms, state.seq_in_ms),
            SequenceStyle::Always => format!("{}_{}_{}", self.prefix, ms, state.total),
        }
    }
}

/// Current unix time in milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
