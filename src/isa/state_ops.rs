// SPDX-License-Identifier: Apache-2.0
//! State-query and miscellaneous VM-only instructions: `NOP`, `SYNC`,
//! `TURN`, `POS`/`DIFF`/`NRG`/`NTR`/`GDV`/`RAND`, `SMR` (spec §4.2). None
//! of these touch the World, so their footprints are always empty.

use crate::coord::Coord;
use crate::error::InstructionFailure;
use crate::footprint::Footprint;
use crate::ident::OrganismId;
use crate::isa::{Effect, Intent, RegisterEffect, StateQueryOp};
use crate::molecule::{Marker, Molecule};
use crate::organism::RegisterValue;
use crate::rng::Prng;

/// `NOP`: does nothing but advance `ip`.
#[must_use]
pub fn plan_nop(ip_advance: Coord) -> Intent {
    Intent {
        footprint: Footprint::empty(),
        energy_delta: 0,
        entropy_delta: 0,
        effect: Effect::None,
        register_effect: None,
        ip_advance,
    }
}

/// `SYNC`: sets the active DP to the current `ip`.
#[must_use]
pub fn plan_sync(ip: Coord, ip_advance: Coord) -> Intent {
    Intent {
        footprint: Footprint::empty(),
        energy_delta: 0,
        entropy_delta: 0,
        effect: Effect::None,
        register_effect: Some(RegisterEffect::SetActiveDp { coord: ip }),
        ip_advance,
    }
}

/// `TURN`: sets the direction vector; fails if `new_dv` is not a unit
/// vector.
pub fn plan_turn(new_dv: Coord, ip_advance: Coord) -> Result<Intent, InstructionFailure> {
    if !new_dv.is_unit() {
        return Err(InstructionFailure::NonUnitVector);
    }
    Ok(Intent {
        footprint: Footprint::empty(),
        energy_delta: 0,
        entropy_delta: 0,
        effect: Effect::None,
        register_effect: Some(RegisterEffect::SetDv { dv: new_dv }),
        ip_advance,
    })
}

/// `SMR`: sets the marker register.
#[must_use]
pub fn plan_set_marker(marker: Marker, ip_advance: Coord) -> Intent {
    Intent {
        footprint: Footprint::empty(),
        energy_delta: 0,
        entropy_delta: 0,
        effect: Effect::None,
        register_effect: Some(RegisterEffect::SetMarkerReg { marker }),
        ip_advance,
    }
}

/// Evaluates a state-query op to the scalar/vector it produces. `RAND`
/// draws from a fresh per-call substream so that two `RAND` instructions
/// in the same tick never collide (spec §4.4's substream discipline).
pub fn evaluate(
    op: StateQueryOp,
    ip: &Coord,
    active_dp: &Coord,
    dv: &Coord,
    energy: u32,
    entropy: u32,
    organism: OrganismId,
    tick: u64,
    call_site: u32,
    base_rng: &Prng,
) -> RegisterValue {
    match op {
        StateQueryOp::Position => RegisterValue::Vector(ip.clone()),
        StateQueryOp::Diff => RegisterValue::Vector(active_dp.sub(ip)),
        StateQueryOp::Energy => RegisterValue::Scalar(Molecule::data(i64::from(energy))),
        StateQueryOp::Entropy => RegisterValue::Scalar(Molecule::data(i64::from(entropy))),
        StateQueryOp::Gdv => RegisterValue::Vector(dv.clone()),
        StateQueryOp::Rand => {
            let mut sub = base_rng.substream(tick, organism, call_site);
            RegisterValue::Scalar(Molecule::data(sub.next_u64() as i64))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_rejects_non_unit_vector() {
        let result = plan_turn(Coord(vec![1, 1]), Coord(vec![1, 0]));
        assert!(matches!(result, Err(InstructionFailure::NonUnitVector)));
    }

    #[test]
    fn rand_is_deterministic_for_same_inputs() {
        let rng = Prng::from_seed_u64(42);
        let a = evaluate(
            StateQueryOp::Rand,
            &Coord(vec![0, 0]),
            &Coord(vec![0, 0]),
            &Coord(vec![1, 0]),
            0,
            0,
            OrganismId(1),
            7,
            3,
            &rng,
        );
        let b = evaluate(
            StateQueryOp::Rand,
            &Coord(vec![0, 0]),
            &Coord(vec![0, 0]),
            &Coord(vec![1, 0]),
            0,
            0,
            OrganismId(1),
            7,
            3,
            &rng,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn diff_reports_dp_minus_ip() {
        let value = evaluate(
            StateQueryOp::Diff,
            &Coord(vec![1, 1]),
            &Coord(vec![3, 1]),
            &Coord(vec![1, 0]),
            0,
            0,
            OrganismId(1),
            0,
            0,
            &Prng::from_seed_u64(1),
        );
        assert_eq!(value, RegisterValue::Vector(Coord(vec![2, 0])));
    }
}
