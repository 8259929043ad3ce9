// SPDX-License-Identifier: Apache-2.0
//! Fuzzy label resolution: Hamming-distance jump targets with stochastic
//! tie-breaking (spec §4.4).

use crate::coord::Coord;
use crate::ident::OrganismId;
use crate::rng::Prng;
use crate::world::Ownership;

/// One entry in the [`crate::program_artifact::ProgramArtifact`]'s label
/// anchor table: a named jump target plus the fuzzy-match metadata the
/// resolver needs.
#[derive(Clone, Debug)]
pub struct LabelAnchor {
    /// World coordinate this anchor resolves to.
    pub coord: Coord,
    /// The anchor's bit pattern, compared against the requested pattern
    /// under `namespace_mask`.
    pub bit_pattern: u64,
    /// Per-label namespace mask (applied to both `bit_pattern` and the
    /// query pattern before computing Hamming distance).
    pub namespace_mask: u64,
    /// Owner of the anchor's cell, used to detect foreign-anchor jumps.
    pub owner: OrganismId,
}

/// Why a fuzzy resolution failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoMatch;

/// Computes the weight used in stochastic tie-breaking for a candidate at
/// Hamming distance `d` within `tolerance` (spec §4.4: `tolerance - d + 1`,
/// fixed per the Open Question resolution recorded in DESIGN.md). Weight is
/// always `>= 1` for any `d <= tolerance`.
#[must_use]
pub fn tie_break_weight(tolerance: u32, distance: u32) -> u32 {
    debug_assert!(distance <= tolerance);
    tolerance - distance + 1
}

/// Result of a successful resolution: the chosen coordinate plus whether
/// the winning anchor is foreign-owned (so the caller can apply the
/// policy's foreign-jump penalty, spec §4.4).
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The coordinate the jump should target.
    pub coord: Coord,
    /// Ownership of the winning anchor, relative to the jumping organism.
    pub ownership: Ownership,
}

/// Resolves `pattern` against `anchors` within `tolerance`, breaking ties
/// stochastically using `rng` (spec §4.4).
///
/// `namespace_mask` is applied to `pattern` before comparison; each
/// anchor's own `namespace_mask` is applied to its own `bit_pattern`. In
/// practice callers pass the already-XORed query pattern and each anchor
/// carries its own per-label mask, matching how label patterns are
/// rewritten at birth (spec §4.6 namespace-rewriting).
pub fn resolve(
    pattern: u64,
    anchors: &[LabelAnchor],
    tolerance: u32,
    jumper: OrganismId,
    rng: &mut Prng,
) -> Result<Resolution, NoMatch> {
    let mut candidates: Vec<(usize, u32)> = Vec::new();
    for (index, anchor) in anchors.iter().enumerate() {
        let masked_pattern = pattern & anchor.namespace_mask;
        let masked_anchor = anchor.bit_pattern & anchor.namespace_mask;
        let distance = (masked_pattern ^ masked_anchor).count_ones();
        if distance <= tolerance {
            candidates.push((index, distance));
        }
    }
    if candidates.is_empty() {
        return Err(NoMatch);
    }
    let weights: Vec<u32> = candidates
        .iter()
        .map(|&(_, d)| tie_break_weight(tolerance, d))
        .collect();
    let chosen = match rng.weighted_choice(&weights) {
        Some(index) => index,
        // Every candidate has distance <= tolerance, so tie_break_weight
        // gives each a weight of at least 1; the total can't be zero.
        None => unreachable!("candidate weights summed to zero"),
    };
    let anchor = &anchors[candidates[chosen].0];
    let ownership = if anchor.owner.is_unowned() {
        Ownership::Unowned
    } else if anchor.owner == jumper {
        Ownership::Itself
    } else {
        Ownership::Foreign
    };
    Ok(Resolution {
        coord: anchor.coord.clone(),
        ownership,
    })
}
