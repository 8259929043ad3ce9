// SPDX-License-Identifier: Apache-2.0
//! Per-tick change-set emission (spec §4.7): accumulates cell and
//! organism deltas during Execute/Post, then finalizes into the value
//! handed to an external consumer. Grounded on
//! `warp-core::tick_delta::TickDelta`'s accumulate-then-finalize shape.

use crate::coord::Coord;
use crate::ident::{hash_change_set, Hash, OrganismId};
use crate::molecule::{Marker, Molecule};

/// A single cell's before/after state for one tick (spec §4.7: "coord,
/// old, new, ownerDelta, markerDelta").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellDelta {
    /// Coordinate that changed.
    pub coord: Coord,
    /// Molecule before this tick.
    pub old_molecule: Molecule,
    /// Molecule after this tick.
    pub new_molecule: Molecule,
    /// Owner before this tick.
    pub old_owner: OrganismId,
    /// Owner after this tick.
    pub new_owner: OrganismId,
    /// Marker before this tick.
    pub old_marker: Marker,
    /// Marker after this tick.
    pub new_marker: Marker,
}

/// Per-organism change for one tick: either a full snapshot (newborn) or
/// a delta against the previous tick's state (survivor), or a death
/// marker (spec §4.7).
#[derive(Clone, Debug)]
pub enum OrganismDelta {
    /// A newly-forked organism; the change-set carries its full state
    /// since there is no previous tick to diff against.
    Born {
        /// The new organism's id.
        organism_id: OrganismId,
        /// Parent that forked it.
        parent_id: OrganismId,
        /// Starting position.
        ip: Coord,
        /// Starting energy.
        energy: u32,
    },
    /// A survivor's register/stack/energy/entropy deltas (spec §4.7:
    /// "register/stack/energy deltas for survivors"). Carried as a full
    /// post-tick snapshot of the mutable fields rather than a field-level
    /// diff, since VM state has no natural sparse representation; the
    /// emitter's replay guarantee only requires that applying this value
    /// reproduce the organism's new state exactly.
    Survived {
        /// The organism this delta describes.
        organism_id: OrganismId,
        /// Position after this tick.
        ip: Coord,
        /// Energy register after this tick.
        energy: u32,
        /// Entropy register after this tick.
        entropy: u32,
    },
    /// A death marker (spec §4.7).
    Died {
        /// The organism that died this tick.
        organism_id: OrganismId,
    },
}

/// Everything needed to resume the master RNG stream deterministically
/// from the end of this tick (spec §4.5, §4.7 `rngCheckpoint`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RngCheckpoint {
    /// The master generator's two-word state after this tick.
    pub state: [u64; 2],
}

/// Accumulates cell and organism deltas during Execute/Post, then
/// finalizes into a [`ChangeSet`] (spec §4.7). A fresh accumulator is
/// created at the start of each tick.
#[derive(Debug, Default)]
pub struct ChangeSetBuilder {
    cell_deltas: Vec<CellDelta>,
    organism_deltas: Vec<OrganismDelta>,
}

impl ChangeSetBuilder {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one cell's before/after state.
    pub fn record_cell(&mut self, delta: CellDelta) {
        self.cell_deltas.push(delta);
    }

    /// Records one organism's tick outcome.
    pub fn record_organism(&mut self, delta: OrganismDelta) {
        self.organism_deltas.push(delta);
    }

    /// Finalizes into the emitted [`ChangeSet`], computing its digest.
    #[must_use]
    pub fn finish(self, tick: u64, rng_checkpoint: RngCheckpoint) -> ChangeSet {
        let digest = compute_change_set_digest(tick, &self.cell_deltas, &self.organism_deltas);
        ChangeSet {
            tick,
            cell_deltas: self.cell_deltas,
            organism_deltas: self.organism_deltas,
            rng_checkpoint,
            digest,
        }
    }
}

/// The finalized, emitted output of one tick (spec §4.7): "consumed by
/// external persistence; no persistence logic belongs to the core."
#[derive(Debug)]
pub struct ChangeSet {
    tick: u64,
    cell_deltas: Vec<CellDelta>,
    organism_deltas: Vec<OrganismDelta>,
    rng_checkpoint: RngCheckpoint,
    digest: Hash,
}

impl ChangeSet {
    /// The tick this change-set describes.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Per-cell deltas, in the order they were recorded (ascending
    /// flat-index order, per the scheduler's Post-phase walk).
    #[must_use]
    pub fn cell_deltas(&self) -> &[CellDelta] {
        &self.cell_deltas
    }

    /// Per-organism deltas.
    #[must_use]
    pub fn organism_deltas(&self) -> &[OrganismDelta] {
        &self.organism_deltas
    }

    /// Enough RNG state to resume the master stream exactly where this
    /// tick left it.
    #[must_use]
    pub fn rng_checkpoint(&self) -> RngCheckpoint {
        self.rng_checkpoint
    }

    /// Canonical digest over this tick's content (spec §4.7's replay
    /// guarantee: "the delta plus the previous world state reproduces the
    /// new world state exactly" — the digest lets a consumer verify it
    /// received the same bytes the scheduler produced).
    #[must_use]
    pub fn digest(&self) -> Hash {
        self.digest
    }
}

fn compute_change_set_digest(
    tick: u64,
    cell_deltas: &[CellDelta],
    organism_deltas: &[OrganismDelta],
) -> Hash {
    let mut body = Vec::new();
    body.extend_from_slice(&(cell_deltas.len() as u64).to_le_bytes());
    for delta in cell_deltas {
        for axis in &delta.coord.0 {
            body.extend_from_slice(&axis.to_le_bytes());
        }
        body.extend_from_slice(&delta.old_molecule.value.to_le_bytes());
        body.extend_from_slice(&delta.new_molecule.value.to_le_bytes());
        body.extend_from_slice(&delta.old_owner.0.to_le_bytes());
        body.extend_from_slice(&delta.new_owner.0.to_le_bytes());
    }
    body.extend_from_slice(&(organism_deltas.len() as u64).to_le_bytes());
    for delta in organism_deltas {
        match delta {
            OrganismDelta::Born { organism_id, .. } => {
                body.push(1);
                body.extend_from_slice(&organism_id.0.to_le_bytes());
            }
            OrganismDelta::Survived {
                organism_id,
                energy,
                entropy,
                ..
            } => {
                body.push(2);
                body.extend_from_slice(&organism_id.0.to_le_bytes());
                body.extend_from_slice(&energy.to_le_bytes());
                body.extend_from_slice(&entropy.to_le_bytes());
            }
            OrganismDelta::Died { organism_id } => {
                body.push(3);
                body.extend_from_slice(&organism_id.0.to_le_bytes());
            }
        }
    }
    hash_change_set(tick, &body)
}
