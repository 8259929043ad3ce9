// SPDX-License-Identifier: Apache-2.0
//! Death/recycling: `(corpse, rng) -> list of cell mutations` (spec
//! §4.6). Maps a dead organism's owned cells back into the World once the
//! scheduler's Post phase finalizes its death.

use crate::coord::Coord;
use crate::ident::OrganismId;
use crate::molecule::{Marker, Molecule};
use crate::plugins::CellMutation;
use crate::rng::Prng;

/// A dead organism's relevant state for recycling: its id and the
/// coordinates it owned at time of death. The scheduler collects these
/// from the World rather than the `Organism` struct, since ownership is
/// authoritative on cells, not on the organism record.
#[derive(Clone, Debug)]
pub struct Corpse {
    /// The dead organism's id.
    pub organism_id: OrganismId,
    /// Cells it owned, with their stored molecule, at time of death.
    pub owned_cells: Vec<(Coord, Molecule)>,
}

/// Converts a corpse's owned cells into World mutations.
pub trait DeathRecycler: Send + Sync {
    /// Proposes the mutations to apply once `corpse`'s death is finalized.
    fn recycle(&self, corpse: &Corpse, rng: &mut Prng) -> Vec<CellMutation>;
}

/// Converts every owned cell to `ENERGY` worth `conversion_permille` of
/// the original molecule's value (or `conversion_permille` of 1 for
/// non-`Energy`/zero-value cells, so structure still yields something),
/// clearing ownership and marker (spec §4.5: "convert each owned cell to
/// ENERGY proportional to some policy, clear ownership").
#[derive(Clone, Debug)]
pub struct DefaultDeathRecycler {
    /// Fraction (in permille) of each cell's value converted to energy.
    pub conversion_permille: u32,
}

impl Default for DefaultDeathRecycler {
    fn default() -> Self {
        Self {
            conversion_permille: 500,
        }
    }
}

impl DeathRecycler for DefaultDeathRecycler {
    fn recycle(&self, corpse: &Corpse, _rng: &mut Prng) -> Vec<CellMutation> {
        corpse
            .owned_cells
            .iter()
            .map(|(coord, molecule)| {
                let base = molecule.value.unsigned_abs().max(1);
                let converted = (base * u64::from(self.conversion_permille)) / 1000;
                #[allow(clippy::cast_possible_wrap)]
                let energy_value = converted as i64;
                CellMutation {
                    coord: coord.clone(),
                    molecule: Molecule::energy(energy_value),
                    owner_id: OrganismId::UNOWNED,
                    marker: Marker::ZERO,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_recycler_converts_every_owned_cell() {
        let corpse = Corpse {
            organism_id: OrganismId(1),
            owned_cells: vec![
                (Coord(vec![0, 0]), Molecule::structure(100)),
                (Coord(vec![1, 0]), Molecule::data(40)),
            ],
        };
        let mut rng = Prng::from_seed_u64(1);
        let recycler = DefaultDeathRecycler::default();
        let mutations = recycler.recycle(&corpse, &mut rng);
        assert_eq!(mutations.len(), 2);
        assert_eq!(mutations[0].molecule.value, 50);
        assert_eq!(mutations[0].owner_id, OrganismId::UNOWNED);
    }
}
