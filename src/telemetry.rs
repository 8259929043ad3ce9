// SPDX-License-Identifier: Apache-2.0
//! Telemetry sink for JSONL event logging, enabled via the `telemetry`
//! feature. Manually formats JSON to avoid a non-deterministic
//! `serde_json` dependency, following `warp-core::telemetry`'s approach.
#![allow(clippy::print_stdout)]

use crate::ident::Hash;

#[inline]
fn short_hash(hash: &Hash) -> String {
    let mut short = [0u8; 8];
    short.copy_from_slice(&hash[0..8]);
    hex::encode(short)
}

#[cfg(feature = "telemetry")]
fn ts_micros() -> u128 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros()
}

/// A sink for per-tick telemetry events. Implementations must be cheap to
/// call from the scheduler's single-threaded phases (Resource
/// distribution, Resolve, Post); Plan/Execute never emit telemetry
/// directly since they run across worker threads.
pub trait TelemetrySink: Send + Sync {
    /// Emitted once a tick's change-set digest is known.
    fn tick_completed(&self, tick: u64, change_set_digest: &Hash, organism_count: usize);

    /// Emitted once per conflict loser.
    fn conflict_lost(&self, tick: u64, organism_id: u64, coord_debug: &str);

    /// Emitted once per organism death.
    fn organism_died(&self, tick: u64, organism_id: u64, cause: &str);
}

/// Discards every event. The default when the `telemetry` feature is off
/// or no sink is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullTelemetrySink;

impl TelemetrySink for NullTelemetrySink {
    fn tick_completed(&self, _tick: u64, _change_set_digest: &Hash, _organism_count: usize) {}
    fn conflict_lost(&self, _tick: u64, _organism_id: u64, _coord_debug: &str) {}
    fn organism_died(&self, _tick: u64, _organism_id: u64, _cause: &str) {}
}

/// Writes one JSON object per line to stdout. Best-effort: I/O errors are
/// ignored and timestamps fall back to 0 on clock errors.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonlStdoutSink;

impl TelemetrySink for JsonlStdoutSink {
    fn tick_completed(&self, tick: u64, change_set_digest: &Hash, organism_count: usize) {
        #[cfg(feature = "telemetry")]
        {
            use std::io::Write as _;
            let mut out = std::io::stdout().lock();
            let _ = write!(
                out,
                r#"{{"timestamp_micros":{},"event":"tick_completed","tick":{},"change_set_digest":"{}","organism_count":{}}}"#,
                ts_micros(),
                tick,
                short_hash(change_set_digest),
                organism_count
            );
            let _ = out.write_all(b"\n");
        }
        #[cfg(not(feature = "telemetry"))]
        {
            let _ = (tick, change_set_digest, organism_count);
        }
    }

    fn conflict_lost(&self, tick: u64, organism_id: u64, coord_debug: &str) {
        #[cfg(feature = "telemetry")]
        {
            use std::io::Write as _;
            let mut out = std::io::stdout().lock();
            let _ = write!(
                out,
                r#"{{"timestamp_micros":{},"event":"conflict_lost","tick":{},"organism_id":{},"coord":"{}"}}"#,
                ts_micros(),
                tick,
                organism_id,
                coord_debug
            );
            let _ = out.write_all(b"\n");
        }
        #[cfg(not(feature = "telemetry"))]
        {
            let _ = (tick, organism_id, coord_debug);
        }
    }

    fn organism_died(&self, tick: u64, organism_id: u64, cause: &str) {
        #[cfg(feature = "telemetry")]
        {
            use std::io::Write as _;
            let mut out = std::io::stdout().lock();
            let _ = write!(
                out,
                r#"{{"timestamp_micros":{},"event":"organism_died","tick":{},"organism_id":{},"cause":"{}"}}"#,
                ts_micros(),
                tick,
                organism_id,
                cause
            );
            let _ = out.write_all(b"\n");
        }
        #[cfg(not(feature = "telemetry"))]
        {
            let _ = (tick, organism_id, cause);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_hash_is_sixteen_hex_chars() {
        let hash = [7u8; 32];
        assert_eq!(short_hash(&hash).len(), 16);
    }

    #[test]
    fn null_sink_accepts_every_event() {
        let sink = NullTelemetrySink;
        sink.tick_completed(0, &[0u8; 32], 0);
        sink.conflict_lost(0, 1, "debug");
        sink.organism_died(0, 1, "thermodynamic");
    }
}
