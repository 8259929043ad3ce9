// SPDX-License-Identifier: Apache-2.0
//! `SPNP`/`SNT*`: axis-aligned neighbor scan producing a bitmask (spec
//! §4.2). Bit `2d` is set if the neighbor at `+1` along axis `d` matches
//! the predicate; bit `2d+1` for `-1`. Rejects topologies whose dimension
//! count would overflow the bitmask (spec §6's `NeighborScanBitsExceeded`).

use crate::coord::Coord;
use crate::error::{ConfigurationError, InstructionFailure};
use crate::ident::OrganismId;
use crate::isa::NeighborPredicate;
use crate::world::{Ownership, World};

/// Maximum dimensions representable in a single `u64` neighbor bitmask
/// (two bits per axis).
pub const MAX_SCANNABLE_DIMENSIONS: usize = 32;

/// Validates that `dimensions` fits the neighbor-scan bitmask width,
/// per spec §6.
pub fn check_dimension_bound(dimensions: usize) -> Result<(), ConfigurationError> {
    if dimensions > MAX_SCANNABLE_DIMENSIONS {
        return Err(ConfigurationError::NeighborScanBitsExceeded {
            dimensions,
            value_bits: 64,
        });
    }
    Ok(())
}

fn predicate_holds(
    predicate: NeighborPredicate,
    world: &World,
    coord: &Coord,
    organism: OrganismId,
) -> Result<bool, InstructionFailure> {
    let cell = world.cell_at(coord)?;
    Ok(match predicate {
        NeighborPredicate::Passable => world.is_passable(coord, organism)?,
        NeighborPredicate::Foreign => matches!(
            world.classify_ownership(coord, organism)?,
            Ownership::Foreign
        ),
        NeighborPredicate::HasType(ty) => !cell.is_empty_cell() && cell.molecule.ty == ty,
    })
}

/// Scans all `2 * dimensions` axis-aligned neighbors of `center` and
/// returns the bitmask of which satisfy `predicate`.
pub fn scan(
    predicate: NeighborPredicate,
    world: &World,
    center: &Coord,
    organism: OrganismId,
) -> Result<u64, InstructionFailure> {
    let dimensions = center.dimensions();
    let mut bits = 0u64;
    for axis in 0..dimensions {
        let mut plus = vec![0i64; dimensions];
        plus[axis] = 1;
        let mut minus = vec![0i64; dimensions];
        minus[axis] = -1;
        if predicate_holds(predicate, world, &center.add(&Coord(plus)), organism)? {
            bits |= 1 << (2 * axis);
        }
        if predicate_holds(predicate, world, &center.add(&Coord(minus)), organism)? {
            bits |= 1 << (2 * axis + 1);
        }
    }
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Topology;
    use crate::molecule::{Marker, Molecule, MoleculeType};

    fn world() -> World {
        World::new(Topology {
            shape: vec![4, 4],
            toroidal: vec![true, true],
        })
    }

    #[test]
    fn scan_passable_all_empty_sets_every_bit() {
        let w = world();
        let bits = scan(
            NeighborPredicate::Passable,
            &w,
            &Coord(vec![1, 1]),
            OrganismId(1),
        )
        .unwrap();
        assert_eq!(bits, 0b1111);
    }

    #[test]
    fn scan_has_type_detects_matching_neighbor() {
        let mut w = world();
        w.write_empty(
            &Coord(vec![2, 1]),
            Molecule::energy(5),
            OrganismId(0),
            Marker::ZERO,
        )
        .unwrap()
        .unwrap();
        let bits = scan(
            NeighborPredicate::HasType(MoleculeType::Energy),
            &w,
            &Coord(vec![1, 1]),
            OrganismId(1),
        )
        .unwrap();
        assert_eq!(bits & 0b0001, 0b0001);
    }

    #[test]
    fn dimension_bound_rejects_excessive_dimensions() {
        assert!(check_dimension_bound(33).is_err());
        assert!(check_dimension_bound(32).is_ok());
    }
}
