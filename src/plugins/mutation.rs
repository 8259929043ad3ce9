// SPDX-License-Identifier: Apache-2.0
//! Mutation operator: invoked inside FORK before a child's genome is
//! materialized (spec §4.6). Four built-in kinds — gene insertion,
//! substitution, deletion, duplication — plus a namespace-rewriting step
//! that XORs a per-newborn mask into every label pattern to prevent
//! cross-organism label collisions while preserving internal Hamming
//! distances (XOR is distance-preserving).

use rustc_hash::FxHashMap;

use crate::fuzzy::LabelAnchor;
use crate::molecule::Molecule;
use crate::program_artifact::{NamedLabel, Placement};
use crate::rng::Prng;

/// One of the four built-in gene-level mutation kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Inserts a new, randomly-valued placement at a random offset.
    Insertion,
    /// Replaces one placement's molecule value with a new random value.
    Substitution,
    /// Removes one placement.
    Deletion,
    /// Duplicates a contiguous run of placements, appended at the end.
    Duplication,
}

/// Transforms a parent genome region before a forked child inherits it.
pub trait MutationOperator: Send + Sync {
    /// Produces the child's placements from the parent's, via zero or more
    /// mutation events drawn from `rng`.
    fn mutate(&self, parent_region: &[Placement], rng: &mut Prng) -> Vec<Placement>;
}

/// Applies no mutation; the child's genome is an exact copy.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullMutationOperator;

impl MutationOperator for NullMutationOperator {
    fn mutate(&self, parent_region: &[Placement], _rng: &mut Prng) -> Vec<Placement> {
        parent_region.to_vec()
    }
}

/// Applies each of the four built-in kinds independently at
/// `rate_per_kind`, keyed by [`MutationKind`] in an [`FxHashMap`] so a
/// caller can tune rates per kind without growing the struct's field
/// list.
#[derive(Clone, Debug)]
pub struct DefaultMutationOperator {
    /// Per-kind mutation probability in `[0.0, 1.0]`, applied once per
    /// fork event (not per placement).
    pub rate_per_kind: FxHashMap<MutationKind, f32>,
}

impl DefaultMutationOperator {
    /// Builds an operator with all four kinds at the same rate.
    #[must_use]
    pub fn uniform(rate: f32) -> Self {
        let mut rate_per_kind = FxHashMap::default();
        for kind in [
            MutationKind::Insertion,
            MutationKind::Substitution,
            MutationKind::Deletion,
            MutationKind::Duplication,
        ] {
            rate_per_kind.insert(kind, rate);
        }
        Self { rate_per_kind }
    }

    fn roll(&self, kind: MutationKind, rng: &mut Prng) -> bool {
        let rate = self.rate_per_kind.get(&kind).copied().unwrap_or(0.0);
        rng.next_f32() < rate
    }
}

impl MutationOperator for DefaultMutationOperator {
    fn mutate(&self, parent_region: &[Placement], rng: &mut Prng) -> Vec<Placement> {
        let mut region = parent_region.to_vec();
        if region.is_empty() {
            return region;
        }
        if self.roll(MutationKind::Substitution, rng) {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let index = rng.next_int(0, region.len() as i64 - 1) as usize;
            let delta = rng.next_int(-8, 8);
            region[index].molecule = Molecule {
                ty: region[index].molecule.ty,
                value: region[index].molecule.value.wrapping_add(delta),
            };
        }
        if self.roll(MutationKind::Insertion, rng) {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let index = rng.next_int(0, region.len() as i64) as usize;
            let template = region[index.min(region.len() - 1)].clone();
            region.insert(index.min(region.len()), template);
        }
        if region.len() > 1 && self.roll(MutationKind::Deletion, rng) {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let index = rng.next_int(0, region.len() as i64 - 1) as usize;
            region.remove(index);
        }
        if self.roll(MutationKind::Duplication, rng) {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let run_len = rng.next_int(1, region.len() as i64).min(region.len() as i64) as usize;
            let duplicated: Vec<_> = region[..run_len].to_vec();
            region.extend(duplicated);
        }
        region
    }
}

/// XORs `mask` into every anchor's `bit_pattern` and every placement's
/// encoded label references would live, in this codebase, inside
/// `labels`. Since XOR is its own inverse and distance-preserving
/// (`hamming(a^m, b^m) == hamming(a, b)`), internal jump topology survives
/// unchanged while colliding with a parent's or sibling's labels becomes
/// exceedingly unlikely.
pub fn rewrite_namespace(labels: &mut [NamedLabel], mask: u64) {
    for label in labels {
        for anchor in &mut label.anchors {
            anchor.bit_pattern ^= mask;
        }
    }
}

/// Derives a newborn's namespace mask deterministically from the tick's
/// RNG substream, so namespace rewriting participates in the same
/// replay-from-seed determinism as every other stochastic decision.
#[must_use]
pub fn derive_namespace_mask(rng: &mut Prng) -> u64 {
    rng.next_u64()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Coord;
    use crate::ident::OrganismId;

    fn placement(value: i64) -> Placement {
        Placement {
            coord: Coord(vec![0]),
            molecule: Molecule::code(value),
        }
    }

    #[test]
    fn null_operator_copies_exactly() {
        let region = vec![placement(1), placement(2)];
        let mut rng = Prng::from_seed_u64(1);
        let copy = NullMutationOperator.mutate(&region, &mut rng);
        assert_eq!(copy, region);
    }

    #[test]
    fn namespace_rewrite_is_its_own_inverse() {
        let mut labels = vec![NamedLabel {
            name: "loop".to_string(),
            anchors: vec![LabelAnchor {
                coord: Coord(vec![0]),
                bit_pattern: 0xABCD,
                namespace_mask: u64::MAX,
                owner: OrganismId(1),
            }],
        }];
        let original = labels[0].anchors[0].bit_pattern;
        rewrite_namespace(&mut labels, 0x1234);
        assert_ne!(labels[0].anchors[0].bit_pattern, original);
        rewrite_namespace(&mut labels, 0x1234);
        assert_eq!(labels[0].anchors[0].bit_pattern, original);
    }

    #[test]
    fn default_operator_never_empties_a_nonempty_region() {
        let region = vec![placement(1), placement(2), placement(3)];
        let operator = DefaultMutationOperator::uniform(1.0);
        let mut rng = Prng::from_seed_u64(7);
        let mutated = operator.mutate(&region, &mut rng);
        assert!(!mutated.is_empty());
    }
}
