//! Time-ordered 64-bit identifiers.
//!
//! Layout, from the most significant bit down:
//!
//! ```text
//! ┌───┬──────────────────────┬───────────┬────────────┐
//! │ 0 │ ms since epoch       │ worker id │ sequence   │
//! └───┴──────────────────────┴───────────┴────────────┘
//!       63 - worker - seq      worker      seq bits
//! ```
//!
//! With the defaults (10 worker bits, 12 sequence bits) that leaves 41 bits of
//! milliseconds, roughly 69 years past the epoch.
//!
//! The generator state (last timestamp and sequence) is packed into one
//! `AtomicU64` and advanced with a compare-and-swap loop, so a single instance
//! can be shared by every adapter task without a lock.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use super::error::{SnowflakeError, SnowflakeResult};

/// 2024-01-01T00:00:00Z in milliseconds.
pub const DEFAULT_EPOCH: u64 = 1_704_067_200_000;

const MAX_NON_TIME_BITS: u8 = 22;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

static GLOBAL: OnceLock<Snowflake> = OnceLock::new();

/// Generator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnowflakeOptions {
    /// Custom epoch in ms since the Unix epoch.
    pub epoch: u64,
    /// Worker id stamped into every identifier.
    pub worker_id: u64,
    /// Width of the worker id field.
    pub worker_id_bits: u8,
    /// Width of the per-millisecond sequence field.
    pub sequence_bits: u8,
    /// Wait for the next millisecond instead of wrapping the sequence.
    pub safe: bool,
}

impl Default for SnowflakeOptions {
    fn default() -> Self {
        Self {
            epoch: DEFAULT_EPOCH,
            worker_id: 1,
            worker_id_bits: 10,
            sequence_bits: 12,
            safe: true,
        }
    }
}

impl SnowflakeOptions {
    /// Checks the bit budget and the worker id range.
    pub fn validate(&self) -> SnowflakeResult<()> {
        if self.worker_id_bits as u16 + self.sequence_bits as u16 > MAX_NON_TIME_BITS as u16 {
            return Err(SnowflakeError::BitBudget {
                worker_bits: self.worker_id_bits,
                sequence_bits: self.sequence_bits,
            });
        }
        let max = (1u64 << self.worker_id_bits) - 1;
        if self.worker_id > max {
            return Err(SnowflakeError::WorkerIdOutOfRange {
                worker_id: self.worker_id,
                max,
            });
        }
        Ok(())
    }
}

/// Fields recovered from an identifier by [`Snowflake::decompose`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnowflakeParts {
    /// Absolute timestamp in ms since the Unix epoch.
    pub timestamp: u64,
    pub worker_id: u64,
    pub sequence: u64,
}

/// A thread-safe snowflake generator.
#[derive(Debug)]
pub struct Snowflake {
    epoch: u64,
    worker_id: u64,
    worker_shift: u8,
    time_shift: u8,
    sequence_bits: u8,
    sequence_mask: u64,
    safe: bool,
    /// `(elapsed_ms << sequence_bits) | sequence` of the last issued id.
    state: AtomicU64,
}

impl Snowflake {
    /// Creates a generator after validating `options`.
    pub fn new(options: SnowflakeOptions) -> SnowflakeResult<Self> {
        options.validate()?;
        Ok(Self::from_valid(options))
    }

    fn from_valid(options: SnowflakeOptions) -> Self {
        Self {
            epoch: options.epoch,
            worker_id: options.worker_id,
            worker_shift: options.sequence_bits,
            time_shift: options.sequence_bits + options.worker_id_bits,
            sequence_bits: options.sequence_bits,
            sequence_mask: (1u64 << options.sequence_bits) - 1,
            safe: options.safe,
            state: AtomicU64::new(0),
        }
    }

    /// Returns the next identifier, honoring the configured mode.
    pub fn next_id(&self) -> u64 {
        self.generate(self.safe)
    }

    /// Returns the next identifier without waiting on sequence overflow.
    ///
    /// Within one millisecond the sequence wraps to zero after exhausting its
    /// range, so ids may repeat under extreme load. Use only where uniqueness
    /// is best-effort.
    pub fn next_id_unsafe(&self) -> u64 {
        self.generate(false)
    }

    /// Returns the next identifier encoded in lowercase base 36.
    pub fn next_base36(&self) -> String {
        to_base36(self.next_id())
    }

    /// Splits an identifier into its timestamp, worker and sequence fields.
    pub fn decompose(&self, id: u64) -> SnowflakeParts {
        let worker_mask = (1u64 << (self.time_shift - self.worker_shift)) - 1;
        SnowflakeParts {
            timestamp: (id >> self.time_shift) + self.epoch,
            worker_id: (id >> self.worker_shift) & worker_mask,
            sequence: id & self.sequence_mask,
        }
    }

    fn generate(&self, wait_on_overflow: bool) -> u64 {
        loop {
            let current = self.state.load(Ordering::Acquire);
            let last_ts = current >> self.sequence_bits;
            let last_seq = current & self.sequence_mask;

            // A clock that moves backwards keeps reusing the last timestamp.
            let now = self.elapsed_millis().max(last_ts);

            let (ts, seq) = if now > last_ts {
                (now, 0)
            } else if last_seq < self.sequence_mask {
                (last_ts, last_seq + 1)
            } else if wait_on_overflow {
                std::hint::spin_loop();
                continue;
            } else {
                (last_ts, 0)
            };

            let next = (ts << self.sequence_bits) | seq;
            if self
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return (ts << self.time_shift) | (self.worker_id << self.worker_shift) | seq;
            }
        }
    }

    fn elapsed_millis(&self) -> u64 {
        current_millis().saturating_sub(self.epoch)
    }
}

/// Returns the process-wide generator, creating it with defaults on first use.
pub fn global() -> &'static Snowflake {
    GLOBAL.get_or_init(|| Snowflake::from_valid(SnowflakeOptions::default()))
}

/// Installs the process-wide generator.
///
/// Must run before the first call to [`global`]; otherwise
/// [`SnowflakeError::AlreadyInstalled`] is returned and the existing generator
/// stays in place.
pub fn install(options: SnowflakeOptions) -> SnowflakeResult<()> {
    let generator = Snowflake::new(options)?;
    GLOBAL
        .set(generator)
        .map_err(|_| SnowflakeError::AlreadyInstalled)
}

/// Milliseconds since the Unix epoch.
pub fn current_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Encodes `value` in lowercase base 36.
pub fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::with_capacity(13);
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}
