// SPDX-License-Identifier: Apache-2.0
//! Per-tick receipts: the per-organism outcome of a tick's Plan/Resolve/
//! Execute pass (spec §4.5, §8 — "exactly one instruction outcome or
//! conflict-loss per organism per tick").
//!
//! Grounded on `warp-core::receipt::TickReceipt` (canonical digest over
//! ordered entries, digest excludes anything that would make commit
//! hashes unstable across diagnostic improvements).

use crate::ident::{hash_receipt, Hash, OrganismId};

/// A single organism's outcome for one tick, in ascending-`organism_id`
/// order (spec §4.5's Resolve ordering).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReceiptEntry {
    /// The organism this entry describes.
    pub organism_id: OrganismId,
    /// What happened to it this tick.
    pub disposition: TickReceiptDisposition,
}

/// Outcome of one organism's tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickReceiptDisposition {
    /// The organism's Intent won conflict resolution (or needed none) and
    /// was executed.
    Executed,
    /// The organism's Intent lost conflict resolution; it did not mutate
    /// the World this tick.
    ConflictLost,
    /// The instruction itself failed validation (spec §7); the error
    /// penalty was charged and no other effect applied.
    InstructionFailed,
    /// The organism was already dead at the start of this tick and was
    /// skipped.
    Skipped,
    /// The organism's thermodynamic invariant was violated at the end of
    /// this tick and it was finalized as dead in Post.
    Died,
}

/// The full outcome record for one tick (spec §4.7's "per-organism
/// deltas" is carried by [`crate::change_set::ChangeSet`]; this receipt
/// is the narrower accept/reject/die ledger used by `§8`'s invariant
/// checks).
#[derive(Debug, Clone)]
pub struct TickReceipt {
    tick: u64,
    entries: Vec<TickReceiptEntry>,
    digest: Hash,
}

impl TickReceipt {
    /// Builds a receipt from this tick's entries, already in
    /// ascending-`organism_id` order.
    #[must_use]
    pub fn new(tick: u64, entries: Vec<TickReceiptEntry>) -> Self {
        let digest = compute_tick_receipt_digest(tick, &entries);
        Self {
            tick,
            entries,
            digest,
        }
    }

    /// The tick this receipt describes.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Entries in ascending-`organism_id` order.
    #[must_use]
    pub fn entries(&self) -> &[TickReceiptEntry] {
        &self.entries
    }

    /// Canonical digest of this tick's outcomes, stable across runs given
    /// the same tick and entries (spec §4.5's determinism contract).
    #[must_use]
    pub fn digest(&self) -> Hash {
        self.digest
    }
}

fn compute_tick_receipt_digest(tick: u64, entries: &[TickReceiptEntry]) -> Hash {
    let mut body = Vec::with_capacity(entries.len() * 9);
    body.extend_from_slice(&(entries.len() as u64).to_le_bytes());
    for entry in entries {
        body.extend_from_slice(&entry.organism_id.0.to_le_bytes());
        let code: u8 = match entry.disposition {
            TickReceiptDisposition::Executed => 1,
            TickReceiptDisposition::ConflictLost => 2,
            TickReceiptDisposition::InstructionFailed => 3,
            TickReceiptDisposition::Skipped => 4,
            TickReceiptDisposition::Died => 5,
        };
        body.push(code);
    }
    hash_receipt(tick, &body)
}
