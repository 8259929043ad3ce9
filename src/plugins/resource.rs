// SPDX-License-Identifier: Apache-2.0
//! Resource distribution: `(world, tick, rng) -> list of cell mutations`
//! (spec §4.6). Runs before organisms plan, against a consistent pre-tick
//! World.

use crate::plugins::CellMutation;
use crate::rng::Prng;
use crate::world::World;

/// Adds or removes `ENERGY` or other molecules ahead of each tick's Plan
/// phase.
pub trait ResourceDistributor: Send + Sync {
    /// Proposes the mutations to apply before Plan runs.
    fn distribute(&self, world: &World, tick: u64, rng: &mut Prng) -> Vec<CellMutation>;
}

/// Distributes nothing. The default when no resource model is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullResourceDistributor;

impl ResourceDistributor for NullResourceDistributor {
    fn distribute(&self, _world: &World, _tick: u64, _rng: &mut Prng) -> Vec<CellMutation> {
        Vec::new()
    }
}

/// Seeds a fixed number of `ENERGY` molecules per tick at uniformly
/// random empty coordinates, each worth `energy_per_unit`.
#[derive(Clone, Debug)]
pub struct UniformEnergyRain {
    /// Number of energy units to seed per tick.
    pub units_per_tick: u32,
    /// Value of each seeded `ENERGY` molecule.
    pub energy_per_unit: i64,
    /// Maximum attempts to find an empty cell per unit before giving up on
    /// that unit (dense worlds may have few empty cells left).
    pub max_attempts_per_unit: u32,
}

impl ResourceDistributor for UniformEnergyRain {
    fn distribute(&self, world: &World, _tick: u64, rng: &mut Prng) -> Vec<CellMutation> {
        use crate::coord::Coord;
        use crate::ident::OrganismId;
        use crate::molecule::{Marker, Molecule};

        let shape = &world.topology().shape;
        let mut mutations = Vec::with_capacity(self.units_per_tick as usize);
        for _ in 0..self.units_per_tick {
            for _ in 0..self.max_attempts_per_unit.max(1) {
                let coord = Coord(
                    shape
                        .iter()
                        .map(|&axis_len| rng.next_int(0, i64::from(axis_len) - 1))
                        .collect(),
                );
                if let Ok(cell) = world.cell_at(&coord) {
                    if cell.is_empty_cell() {
                        mutations.push(CellMutation {
                            coord,
                            molecule: Molecule::energy(self.energy_per_unit),
                            owner_id: OrganismId::UNOWNED,
                            marker: Marker::ZERO,
                        });
                        break;
                    }
                }
            }
        }
        mutations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::Topology;

    #[test]
    fn null_distributor_proposes_nothing() {
        let world = World::new(Topology {
            shape: vec![4, 4],
            toroidal: vec![true, true],
        });
        let mut rng = Prng::from_seed_u64(1);
        assert!(NullResourceDistributor
            .distribute(&world, 0, &mut rng)
            .is_empty());
    }

    #[test]
    fn uniform_rain_seeds_requested_unit_count() {
        let world = World::new(Topology {
            shape: vec![8, 8],
            toroidal: vec![true, true],
        });
        let mut rng = Prng::from_seed_u64(1);
        let plugin = UniformEnergyRain {
            units_per_tick: 5,
            energy_per_unit: 10,
            max_attempts_per_unit: 20,
        };
        let mutations = plugin.distribute(&world, 0, &mut rng);
        assert_eq!(mutations.len(), 5);
    }
}
