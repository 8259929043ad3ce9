// SPDX-License-Identifier: Apache-2.0
//! Control flow: fuzzy-label jumps, CALL/RET (spec §4.2).

use crate::coord::Coord;
use crate::error::InstructionFailure;
use crate::footprint::Footprint;
use crate::fuzzy::{self, LabelAnchor};
use crate::ident::OrganismId;
use crate::isa::{Intent, RegisterEffect};
use crate::rng::Prng;

/// Plans `JMPI`/`JMPR`/`JMPS`: resolve `pattern` via the fuzzy label
/// resolver and, on success, set `ip` to the resolved coordinate instead
/// of the normal sequential advance.
///
/// Returns the resolved ownership alongside the Intent so the caller can
/// apply the policy's foreign-jump penalty (spec §4.4).
pub fn plan_jump(
    pattern: u64,
    anchors: &[LabelAnchor],
    tolerance: u32,
    jumper: OrganismId,
    rng: &mut Prng,
    fallthrough_advance: Coord,
) -> Result<(Intent, crate::world::Ownership), InstructionFailure> {
    let resolution = fuzzy::resolve(pattern, anchors, tolerance, jumper, rng)
        .map_err(|_| InstructionFailure::NoFuzzyMatch)?;
    let intent = Intent {
        footprint: Footprint::empty(),
        energy_delta: 0,
        entropy_delta: 0,
        effect: crate::isa::Effect::None,
        register_effect: None,
        ip_advance: resolution.coord.sub(&fallthrough_advance),
    };
    Ok((intent, resolution.ownership))
}

/// Plans `CALL`: push a return address and the current proc-regs, then
/// jump to `target` (resolved the same way as `plan_jump`).
pub fn plan_call(target: Coord, return_ip: Coord, ip_after_call: Coord) -> Intent {
    Intent {
        footprint: Footprint::empty(),
        energy_delta: 0,
        entropy_delta: 0,
        effect: crate::isa::Effect::None,
        register_effect: Some(RegisterEffect::PushCall { return_ip }),
        ip_advance: target.sub(&ip_after_call),
    }
}

/// Plans `RET`: pop the call stack, restoring proc-regs and `ip`.
#[must_use]
pub fn plan_ret() -> Intent {
    Intent {
        footprint: Footprint::empty(),
        energy_delta: 0,
        entropy_delta: 0,
        effect: crate::isa::Effect::None,
        register_effect: Some(RegisterEffect::PopCall),
        ip_advance: Coord(vec![]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(coord: i64) -> LabelAnchor {
        LabelAnchor {
            coord: Coord(vec![coord]),
            bit_pattern: 0,
            namespace_mask: u64::MAX,
            owner: OrganismId(0),
        }
    }

    #[test]
    fn jump_fails_with_no_fuzzy_match_on_empty_anchors() {
        let mut rng = Prng::from_seed_u64(1);
        let result = plan_jump(0, &[], 0, OrganismId(1), &mut rng, Coord(vec![1]));
        assert!(matches!(result, Err(InstructionFailure::NoFuzzyMatch)));
    }

    #[test]
    fn jump_resolves_to_anchor_coordinate() {
        let anchors = vec![anchor(5)];
        let mut rng = Prng::from_seed_u64(1);
        let (intent, ownership) =
            plan_jump(0, &anchors, 0, OrganismId(1), &mut rng, Coord(vec![1])).unwrap();
        assert_eq!(intent.ip_advance, Coord(vec![4]));
        assert_eq!(ownership, crate::world::Ownership::Unowned);
    }
}
