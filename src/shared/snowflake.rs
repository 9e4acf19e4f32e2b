//! Snowflake ID Generator
//!
//! Twitter-style distributed unique ID generation for message rows.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Discord epoch (2015-01-01T00:00:00.000Z)
pub const DEFAULT_EPOCH: u64 = 1420070400000;

const MACHINE_BITS: u64 = 10;
const SEQUENCE_BITS: u64 = 12;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

/// Snowflake ID generator
///
/// Layout: 41 bits of milliseconds since `epoch`, 10 bits of machine id,
/// 12 bits of per-millisecond sequence.
pub struct SnowflakeGenerator {
    machine_id: u64,
    epoch: u64,
    /// Packed `(timestamp << SEQUENCE_BITS) | sequence` of the last id issued.
    state: AtomicU64,
}

impl SnowflakeGenerator {
    pub fn new(machine_id: u16, epoch: u64) -> Self {
        Self {
            machine_id: u64::from(machine_id) & ((1 << MACHINE_BITS) - 1),
            epoch,
            state: AtomicU64::new(0),
        }
    }

    /// Generate a new snowflake ID
    pub fn generate(&self) -> i64 {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let now = self.elapsed_millis();
            let last_ts = current >> SEQUENCE_BITS;
            let last_seq = current & SEQUENCE_MASK;

            let next = if now > last_ts {
                now << SEQUENCE_BITS
            } else if last_seq < SEQUENCE_MASK {
                current + 1
            } else {
                // Sequence exhausted for this millisecond; borrow the next one.
                (last_ts + 1) << SEQUENCE_BITS
            };

            match self
                .state
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => {
                    let ts = next >> SEQUENCE_BITS;
                    let seq = next & SEQUENCE_MASK;
                    let id = (ts << (MACHINE_BITS + SEQUENCE_BITS))
                        | (self.machine_id << SEQUENCE_BITS)
                        | seq;
                    return id as i64;
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Milliseconds since the configured epoch at which `id` was issued.
    pub fn timestamp_of(&self, id: i64) -> u64 {
        ((id as u64) >> (MACHINE_BITS + SEQUENCE_BITS)) + self.epoch
    }

    fn elapsed_millis(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(self.epoch);
        now.saturating_sub(self.epoch)
    }
}
