// SPDX-License-Identifier: Apache-2.0
//! Conditional skip instructions: predicates on a neighbor cell relative
//! to the active DP (spec §4.2 `IFM`/`IFP`/`IFF`/`IFV` and negations).

use crate::coord::Coord;
use crate::error::InstructionFailure;
use crate::ident::OrganismId;
use crate::isa::ConditionalOp;
use crate::world::{Ownership, World};

/// Evaluates a conditional predicate against the neighbor at
/// `dp + unit_vector`, returning whether the (possibly negated) condition
/// holds. The caller skips the next instruction when this returns `false`.
pub fn evaluate(
    op: ConditionalOp,
    negate: bool,
    world: &World,
    dp: &Coord,
    unit_vector: &Coord,
    organism: OrganismId,
    compare_value: i64,
) -> Result<bool, InstructionFailure> {
    if !unit_vector.is_unit() {
        return Err(InstructionFailure::NonUnitVector);
    }
    let target = dp.add(unit_vector);
    let cell = world.cell_at(&target)?;
    let raw = match op {
        ConditionalOp::MarkerEquals => i64::from(cell.marker.get()) == compare_value,
        ConditionalOp::Passable => {
            cell.is_empty_cell() || cell.owner_id == organism
        }
        ConditionalOp::Foreign => {
            matches!(
                world.classify_ownership(&target, organism)?,
                Ownership::Foreign
            )
        }
        ConditionalOp::ValueEquals => cell.molecule.value == compare_value,
    };
    Ok(if negate { !raw } else { raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Topology;
    use crate::molecule::{Marker, Molecule};

    fn world() -> World {
        World::new(Topology {
            shape: vec![4, 4],
            toroidal: vec![true, true],
        })
    }

    #[test]
    fn marker_equals_matches_exact_value() {
        let mut w = world();
        w.write_empty(
            &Coord(vec![1, 0]),
            Molecule::structure(1),
            OrganismId(1),
            Marker::new(5),
        )
        .unwrap()
        .unwrap();
        let result = evaluate(
            ConditionalOp::MarkerEquals,
            false,
            &w,
            &Coord(vec![0, 0]),
            &Coord(vec![1, 0]),
            OrganismId(1),
            5,
        )
        .unwrap();
        assert!(result);
    }

    #[test]
    fn negated_predicate_inverts_result() {
        let w = world();
        let result = evaluate(
            ConditionalOp::Passable,
            true,
            &w,
            &Coord(vec![0, 0]),
            &Coord(vec![1, 0]),
            OrganismId(1),
            0,
        )
        .unwrap();
        assert!(!result, "empty cell is passable, negated should be false");
    }

    #[test]
    fn non_unit_vector_fails() {
        let w = world();
        let result = evaluate(
            ConditionalOp::Passable,
            false,
            &w,
            &Coord(vec![0, 0]),
            &Coord(vec![1, 1]),
            OrganismId(1),
            0,
        );
        assert!(matches!(result, Err(InstructionFailure::NonUnitVector)));
    }
}
