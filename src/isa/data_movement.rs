// SPDX-License-Identifier: Apache-2.0
//! Pure register/stack operations: no World access (spec §4.2).

use crate::error::InstructionFailure;
use crate::footprint::Footprint;
use crate::isa::{Effect, Intent, RegisterEffect, StackOnlyOp};
use crate::molecule::Molecule;
use crate::organism::RegisterValue;

/// Plans `SETI`/`SETR`/`SETV`: load `value` into data register `index`.
pub fn plan_set(index: usize, value: RegisterValue, ip_advance: crate::coord::Coord) -> Intent {
    Intent {
        footprint: Footprint::empty(),
        energy_delta: 0,
        entropy_delta: 0,
        effect: Effect::None,
        register_effect: Some(RegisterEffect::SetDataReg { index, value }),
        ip_advance,
    }
}

/// Plans `PUSH`/`PUSI`/`PUSV`: push `value` onto the data stack.
pub fn plan_push(value: RegisterValue, ip_advance: crate::coord::Coord) -> Intent {
    Intent {
        footprint: Footprint::empty(),
        energy_delta: 0,
        entropy_delta: 0,
        effect: Effect::None,
        register_effect: Some(RegisterEffect::PushData { value }),
        ip_advance,
    }
}

/// Plans `POP`: pop the data stack into data register `index`.
pub fn plan_pop(index: usize, ip_advance: crate::coord::Coord) -> Intent {
    Intent {
        footprint: Footprint::empty(),
        energy_delta: 0,
        entropy_delta: 0,
        effect: Effect::None,
        register_effect: Some(RegisterEffect::PopIntoDataReg { index }),
        ip_advance,
    }
}

/// Plans a no-operand stack op (`DUP`/`SWAP`/`DROP`/`ROT`).
pub fn plan_stack_only(op: StackOnlyOp, ip_advance: crate::coord::Coord) -> Intent {
    Intent {
        footprint: Footprint::empty(),
        energy_delta: 0,
        entropy_delta: 0,
        effect: Effect::None,
        register_effect: Some(RegisterEffect::StackOnly(op)),
        ip_advance,
    }
}

/// Applies a `RegisterEffect` produced by this module's `plan_*` functions
/// to `organism`'s register/stack state. Called immediately after a
/// successful Plan (these never touch the World, so need no Resolve-phase
/// arbitration).
pub fn apply(
    organism: &mut crate::organism::Organism,
    effect: &RegisterEffect,
) -> Result<(), InstructionFailure> {
    match effect {
        RegisterEffect::SetDataReg { index, value } => {
            organism.data_regs[*index] = value.clone();
            Ok(())
        }
        RegisterEffect::SetLocReg { index, value } => {
            organism.loc_regs[*index] = value.clone();
            Ok(())
        }
        RegisterEffect::PushData { value } => organism.data_stack.push(value.clone()),
        RegisterEffect::PopIntoDataReg { index } => {
            let value = organism.data_stack.pop()?;
            organism.data_regs[*index] = value;
            Ok(())
        }
        RegisterEffect::StackOnly(op) => match op {
            StackOnlyOp::Dup => organism.data_stack.dup(),
            StackOnlyOp::Swap => organism.data_stack.swap_top(),
            StackOnlyOp::Drop => organism.data_stack.pop().map(|_| ()),
            StackOnlyOp::Rot => organism.data_stack.rotate_top3(),
        },
        RegisterEffect::SetActiveDp { coord } => {
            let active = organism.active_dp;
            organism.dp_set[active] = coord.clone();
            Ok(())
        }
        RegisterEffect::SetDv { dv } => {
            if !dv.is_unit() {
                return Err(InstructionFailure::NonUnitVector);
            }
            organism.dv = dv.clone();
            Ok(())
        }
        RegisterEffect::SetMarkerReg { marker } => {
            organism.marker_reg = *marker;
            Ok(())
        }
        RegisterEffect::PushCall { return_ip } => {
            organism.call_stack.push(crate::organism::CallFrame {
                return_ip: return_ip.clone(),
                saved_proc_regs: organism.proc_regs.clone(),
            })
        }
        RegisterEffect::PopCall => {
            let frame = organism.call_stack.pop()?;
            organism.proc_regs = frame.saved_proc_regs;
            organism.ip = frame.return_ip;
            Ok(())
        }
        RegisterEffect::PushLocation => {
            let dp = organism.active_dp_coord().clone();
            organism.location_stack.push(dp)
        }
        RegisterEffect::PopLocation => {
            let coord = organism.location_stack.pop()?;
            let active = organism.active_dp;
            organism.dp_set[active] = coord;
            Ok(())
        }
        RegisterEffect::SkipNext => {
            organism.ip = organism.ip.add(&organism.dv).add(&organism.dv);
            Ok(())
        }
    }
}

/// Convenience for tests/callers constructing a scalar register value.
#[must_use]
pub fn scalar(value: i64) -> RegisterValue {
    RegisterValue::Scalar(Molecule::data(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Coord;
    use crate::error::StackKind;
    use crate::ident::OrganismId;
    use crate::organism::{Organism, OrganismLimits};

    fn limits() -> OrganismLimits {
        OrganismLimits {
            max_energy: 100,
            max_entropy: 100,
            data_stack_size: 4,
            call_stack_size: 4,
            location_stack_size: 4,
            dp_count: 1,
        }
    }

    fn organism() -> Organism {
        Organism::genesis(
            OrganismId(1),
            Coord(vec![0, 0]),
            Coord(vec![1, 0]),
            10,
            0,
            &limits(),
        )
    }

    #[test]
    fn set_then_push_then_pop_round_trips() {
        let mut o = organism();
        let intent = plan_set(0, scalar(42), Coord(vec![0, 0]));
        apply(&mut o, intent.register_effect.as_ref().unwrap()).unwrap();
        assert_eq!(o.data_regs[0], scalar(42));

        let intent = plan_push(scalar(7), Coord(vec![0, 0]));
        apply(&mut o, intent.register_effect.as_ref().unwrap()).unwrap();
        assert_eq!(o.data_stack.len(), 1);

        let intent = plan_pop(1, Coord(vec![0, 0]));
        apply(&mut o, intent.register_effect.as_ref().unwrap()).unwrap();
        assert_eq!(o.data_regs[1], scalar(7));
        assert!(o.data_stack.is_empty());
    }

    #[test]
    fn pop_on_empty_stack_fails_with_underflow() {
        let mut o = organism();
        let intent = plan_pop(0, Coord(vec![0, 0]));
        let err = apply(&mut o, intent.register_effect.as_ref().unwrap()).unwrap_err();
        assert!(matches!(
            err,
            InstructionFailure::StackFault {
                stack: StackKind::Data,
                ..
            }
        ));
    }

    #[test]
    fn dup_swap_rot_behave_as_expected() {
        let mut o = organism();
        for v in [1, 2, 3] {
            o.data_stack.push(scalar(v)).unwrap();
        }
        apply(
            &mut o,
            &RegisterEffect::StackOnly(StackOnlyOp::Rot),
        )
        .unwrap();
        assert_eq!(o.data_stack.pop().unwrap(), scalar(1));
        assert_eq!(o.data_stack.pop().unwrap(), scalar(3));
        assert_eq!(o.data_stack.pop().unwrap(), scalar(2));
    }
}
