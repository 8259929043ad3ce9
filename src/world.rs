// SPDX-License-Identifier: Apache-2.0
//! The n-dimensional world: a flat, cache-local grid of molecules plus
//! ownership and marker metadata (spec §3, §4.1).

use crate::coord::{Coord, Topology};
use crate::error::InstructionFailure;
use crate::ident::OrganismId;
use crate::molecule::{Marker, Molecule};

/// Ownership classification of a cell relative to an acting organism
/// (spec §4.1).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Ownership {
    /// Unowned (`ownerId == 0`).
    Unowned,
    /// Owned by the acting organism.
    Itself,
    /// Owned by a different organism. The parent's cells are Foreign to a
    /// newly-forked child (spec §4.1).
    Foreign,
}

/// A single world cell: molecule, owner, and marker.
///
/// Invariant (spec §4.1): a cell never holds a non-zero marker with
/// `owner_id == OrganismId::UNOWNED`. Maintained by every World mutator in
/// this module; never constructed directly by instruction code.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Cell {
    /// The stored molecule.
    pub molecule: Molecule,
    /// Owning organism, or [`OrganismId::UNOWNED`].
    pub owner_id: OrganismId,
    /// 4-bit marker tag.
    pub marker: Marker,
}

impl Cell {
    /// The canonical empty, unowned cell.
    pub const EMPTY: Cell = Cell {
        molecule: Molecule::EMPTY,
        owner_id: OrganismId::UNOWNED,
        marker: Marker::ZERO,
    };

    /// Whether this cell is empty (no molecule, no owner, no marker).
    #[must_use]
    pub fn is_empty_cell(&self) -> bool {
        self.molecule.is_empty_value() && self.owner_id.is_unowned()
    }
}

/// Error returned when a World operation's precondition fails. These map
/// 1:1 onto spec §4.1's named failure cases; instruction semantics convert
/// them into [`InstructionFailure`] at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorldOpError {
    /// `writeEmpty` target was already occupied.
    Occupied,
    /// `consume` target was already empty.
    Empty,
}

/// The n-dimensional grid of [`Cell`]s plus its topology.
///
/// Storage is a single flat `Vec<Cell>` indexed in row-major order by
/// [`Topology::flat_index`] — the "cache-local: flat contiguous array"
/// requirement of spec §3.
#[derive(Clone, Debug)]
pub struct World {
    topology: Topology,
    cells: Vec<Cell>,
}

impl World {
    /// Creates an empty world of the given topology.
    #[must_use]
    pub fn new(topology: Topology) -> Self {
        let count = topology.cell_count();
        Self {
            cells: vec![Cell::EMPTY; count],
            topology,
        }
    }

    /// The world's topology.
    #[must_use]
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Reads the molecule at `coord` in constant time (spec §4.1 `at`).
    pub fn at(&self, coord: &Coord) -> Result<Molecule, InstructionFailure> {
        Ok(self.cell_at(coord)?.molecule)
    }

    /// Reads the full cell (molecule + ownership + marker) at `coord`.
    pub fn cell_at(&self, coord: &Coord) -> Result<Cell, InstructionFailure> {
        let normalized = self.topology.normalize(coord)?;
        Ok(self.cells[self.topology.flat_index(&normalized)])
    }

    /// Writes `molecule` into an empty cell with the given owner and
    /// marker. Fails with [`WorldOpError::Occupied`] if the cell is not
    /// empty (spec §4.1 `writeEmpty`).
    ///
    /// # Errors
    /// Returns [`InstructionFailure::OutOfRange`] if `coord` is out of
    /// range on a non-toroidal axis, wrapped by the caller as needed.
    pub fn write_empty(
        &mut self,
        coord: &Coord,
        molecule: Molecule,
        owner_id: OrganismId,
        marker: Marker,
    ) -> Result<Result<(), WorldOpError>, InstructionFailure> {
        let normalized = self.topology.normalize(coord)?;
        let index = self.topology.flat_index(&normalized);
        if !self.cells[index].is_empty_cell() {
            return Ok(Err(WorldOpError::Occupied));
        }
        self.cells[index] = Cell {
            molecule,
            owner_id,
            marker,
        };
        Ok(Ok(()))
    }

    /// Consumes the molecule at `coord`, resetting the cell to empty and
    /// clearing ownership. Fails with [`WorldOpError::Empty`] if already
    /// empty (spec §4.1 `consume`). `by_owner` is accepted for symmetry
    /// with the spec's signature but does not gate the operation itself —
    /// callers are responsible for ownership checks before consuming.
    pub fn consume(
        &mut self,
        coord: &Coord,
        _by_owner: OrganismId,
    ) -> Result<Result<Molecule, WorldOpError>, InstructionFailure> {
        let normalized = self.topology.normalize(coord)?;
        let index = self.topology.flat_index(&normalized);
        if self.cells[index].is_empty_cell() {
            return Ok(Err(WorldOpError::Empty));
        }
        let molecule = self.cells[index].molecule;
        self.cells[index] = Cell::EMPTY;
        Ok(Ok(molecule))
    }

    /// Atomic consume-then-write (spec §4.1 `swap`): returns the molecule
    /// previously at `coord` and replaces it with `molecule` under the
    /// given owner/marker, even if the cell was occupied.
    pub fn swap(
        &mut self,
        coord: &Coord,
        molecule: Molecule,
        owner_id: OrganismId,
        marker: Marker,
    ) -> Result<Molecule, InstructionFailure> {
        let normalized = self.topology.normalize(coord)?;
        let index = self.topology.flat_index(&normalized);
        let previous = self.cells[index].molecule;
        self.cells[index] = Cell {
            molecule,
            owner_id,
            marker,
        };
        Ok(previous)
    }

    /// Whether `coord` is passable by `by_owner`: empty, or owned by
    /// `by_owner` itself (spec §4.1 `isPassable`).
    pub fn is_passable(
        &self,
        coord: &Coord,
        by_owner: OrganismId,
    ) -> Result<bool, InstructionFailure> {
        let cell = self.cell_at(coord)?;
        Ok(cell.is_empty_cell() || cell.owner_id == by_owner)
    }

    /// Classifies `coord`'s ownership relative to `by_owner` (spec §4.1
    /// `classifyOwnership`).
    pub fn classify_ownership(
        &self,
        coord: &Coord,
        by_owner: OrganismId,
    ) -> Result<Ownership, InstructionFailure> {
        let cell = self.cell_at(coord)?;
        Ok(if cell.owner_id.is_unowned() {
            Ownership::Unowned
        } else if cell.owner_id == by_owner {
            Ownership::Itself
        } else {
            Ownership::Foreign
        })
    }

    /// Directly sets a cell, bypassing occupancy checks. Used by Post-phase
    /// bookkeeping (FORK ownership transfer, death recycling, resource
    /// distribution) which operate under scheduler control rather than
    /// through an organism's intent.
    pub fn force_set(&mut self, coord: &Coord, cell: Cell) -> Result<Cell, InstructionFailure> {
        let normalized = self.topology.normalize(coord)?;
        let index = self.topology.flat_index(&normalized);
        let previous = self.cells[index];
        self.cells[index] = cell;
        Ok(previous)
    }

    /// Iterates every `(coordinate, cell)` pair in ascending row-major
    /// order. Used by the death/recycling and resource-distribution
    /// plugins, and by change-set diffing.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Cell)> {
        self.cells.iter().enumerate()
    }

    /// Total number of cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether the world has zero cells. Only possible for a
    /// zero-dimensional shape, which [`crate::config::WorldConfig`]
    /// rejects at validation time.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_world() -> World {
        World::new(Topology {
            shape: vec![4, 4],
            toroidal: vec![true, true],
        })
    }

    #[test]
    fn write_empty_then_consume_round_trips() {
        let mut world = small_world();
        let coord = Coord(vec![1, 0]);
        world
            .write_empty(&coord, Molecule::energy(25), OrganismId(0), Marker::ZERO)
            .unwrap()
            .unwrap();
        assert!(!world.cell_at(&coord).unwrap().is_empty_cell());
        let consumed = world.consume(&coord, OrganismId(1)).unwrap().unwrap();
        assert_eq!(consumed, Molecule::energy(25));
        assert!(world.cell_at(&coord).unwrap().is_empty_cell());
    }

    #[test]
    fn write_empty_rejects_occupied_cell() {
        let mut world = small_world();
        let coord = Coord(vec![0, 0]);
        world
            .write_empty(&coord, Molecule::structure(1), OrganismId(1), Marker::ZERO)
            .unwrap()
            .unwrap();
        let result = world
            .write_empty(&coord, Molecule::structure(2), OrganismId(2), Marker::ZERO)
            .unwrap();
        assert_eq!(result, Err(WorldOpError::Occupied));
    }

    #[test]
    fn classify_ownership_distinguishes_self_foreign_unowned() {
        let mut world = small_world();
        let coord = Coord(vec![2, 2]);
        world
            .write_empty(&coord, Molecule::structure(1), OrganismId(1), Marker::ZERO)
            .unwrap()
            .unwrap();
        assert_eq!(
            world.classify_ownership(&coord, OrganismId(1)).unwrap(),
            Ownership::Itself
        );
        assert_eq!(
            world.classify_ownership(&coord, OrganismId(2)).unwrap(),
            Ownership::Foreign
        );
        assert_eq!(
            world
                .classify_ownership(&Coord(vec![0, 0]), OrganismId(1))
                .unwrap(),
            Ownership::Unowned
        );
    }

    #[test]
    fn is_passable_true_for_empty_and_self() {
        let mut world = small_world();
        let coord = Coord(vec![3, 3]);
        assert!(world.is_passable(&coord, OrganismId(1)).unwrap());
        world
            .write_empty(&coord, Molecule::structure(1), OrganismId(1), Marker::ZERO)
            .unwrap()
            .unwrap();
        assert!(world.is_passable(&coord, OrganismId(1)).unwrap());
        assert!(!world.is_passable(&coord, OrganismId(2)).unwrap());
    }
}
