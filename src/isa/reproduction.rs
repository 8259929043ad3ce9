// SPDX-License-Identifier: Apache-2.0
//! `FORK`/`FRKI`/`FRKS`: reproduction (spec §4.2). A fork spawns a child
//! organism at `DP + delta`, transfers the requested energy, and — if the
//! target cell carries a marker matching the parent's marker register —
//! transfers ownership of that cell's structure to the child rather than
//! requiring it to be empty.

use crate::coord::Coord;
use crate::error::InstructionFailure;
use crate::footprint::{CoordSet, Footprint};
use crate::ident::OrganismId;
use crate::isa::{Effect, Intent};
use crate::world::World;

/// Plans a fork attempt. `requested_energy` must not exceed the parent's
/// current energy register; the target cell (`dp + delta`) must be
/// passable for the parent.
pub fn plan_fork(
    world: &World,
    dp: &Coord,
    delta: &Coord,
    requested_energy: u32,
    available_energy: u32,
    child_dv: Coord,
    owner: OrganismId,
) -> Result<Intent, InstructionFailure> {
    if requested_energy > available_energy {
        return Err(InstructionFailure::ForkEnergyExceedsAvailable {
            requested: requested_energy,
            available: available_energy,
        });
    }
    let child_dp = dp.add(delta);
    if !world.is_passable(&child_dp, owner)? {
        return Err(InstructionFailure::ForkNotPassable);
    }
    let mut write = CoordSet::new();
    write.insert(child_dp.clone());
    Ok(Intent {
        footprint: Footprint {
            read: CoordSet::new(),
            write,
        },
        energy_delta: -i64::from(requested_energy),
        entropy_delta: 0,
        effect: Effect::Fork {
            child_dp,
            energy: requested_energy,
            child_dv,
        },
        register_effect: None,
        ip_advance: Coord::zero(dp.dimensions()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Topology;

    fn world() -> World {
        World::new(Topology {
            shape: vec![4, 4],
            toroidal: vec![true, true],
        })
    }

    #[test]
    fn fork_fails_when_requested_energy_exceeds_available() {
        let w = world();
        let result = plan_fork(
            &w,
            &Coord(vec![0, 0]),
            &Coord(vec![1, 0]),
            50,
            10,
            Coord(vec![1, 0]),
            OrganismId(1),
        );
        assert!(matches!(
            result,
            Err(InstructionFailure::ForkEnergyExceedsAvailable { .. })
        ));
    }

    #[test]
    fn fork_fails_when_target_not_passable() {
        use crate::molecule::{Marker, Molecule};
        let mut w = world();
        w.write_empty(
            &Coord(vec![1, 0]),
            Molecule::structure(1),
            OrganismId(9),
            Marker::ZERO,
        )
        .unwrap()
        .unwrap();
        let result = plan_fork(
            &w,
            &Coord(vec![0, 0]),
            &Coord(vec![1, 0]),
            10,
            50,
            Coord(vec![1, 0]),
            OrganismId(1),
        );
        assert!(matches!(result, Err(InstructionFailure::ForkNotPassable)));
    }

    #[test]
    fn fork_succeeds_into_passable_cell() {
        let w = world();
        let intent = plan_fork(
            &w,
            &Coord(vec![0, 0]),
            &Coord(vec![1, 0]),
            10,
            50,
            Coord(vec![1, 0]),
            OrganismId(1),
        )
        .unwrap();
        assert_eq!(intent.energy_delta, -10);
        assert!(matches!(intent.effect, Effect::Fork { energy: 10, .. }));
    }
}
