// SPDX-License-Identifier: Apache-2.0
//! World-adjacent instructions: PEEK/SCAN/POKE/PPK/SEEK. All must use a
//! unit vector relative to the active DP — adjacent cells only (spec
//! §4.2).

use crate::coord::Coord;
use crate::error::InstructionFailure;
use crate::footprint::{CoordSet, Footprint};
use crate::ident::OrganismId;
use crate::isa::{Effect, Intent, RegisterEffect};
use crate::molecule::{Marker, Molecule, MoleculeType};
use crate::organism::RegisterValue;
use crate::world::World;

fn require_unit(unit_vector: &Coord) -> Result<(), InstructionFailure> {
    if unit_vector.is_unit() {
        Ok(())
    } else {
        Err(InstructionFailure::NonUnitVector)
    }
}

/// Plans `PEEK`/`PEKI`/`PEKS`: consume the adjacent molecule. If it is
/// `ENERGY`, its value is carried as `energy_delta` (spec §4.2) so it is
/// credited only if this Intent wins conflict resolution, exactly like
/// any other Intent-declared charge — a losing PEEK must not create
/// energy that its `Consume` never actually commits.
pub fn plan_peek(
    world: &World,
    dp: &Coord,
    unit_vector: &Coord,
    data_reg_index: usize,
) -> Result<Intent, InstructionFailure> {
    require_unit(unit_vector)?;
    let target = dp.add(unit_vector);
    let cell = world.cell_at(&target)?;
    if cell.is_empty_cell() {
        return Err(InstructionFailure::PeekEmpty);
    }
    let mut write = CoordSet::new();
    write.insert(target.clone());
    let energy_delta = if cell.molecule.ty == MoleculeType::Energy {
        cell.molecule.value
    } else {
        0
    };
    Ok(Intent {
        footprint: Footprint {
            read: CoordSet::new(),
            write,
        },
        energy_delta,
        entropy_delta: 0,
        effect: Effect::Consume { coord: target },
        register_effect: Some(RegisterEffect::SetDataReg {
            index: data_reg_index,
            value: RegisterValue::Scalar(cell.molecule),
        }),
        ip_advance: Coord::zero(dp.dimensions()),
    })
}

/// Plans `SCAN`/`SCNI`/`SCNS`: non-destructive read of the adjacent cell.
pub fn plan_scan(
    world: &World,
    dp: &Coord,
    unit_vector: &Coord,
    data_reg_index: usize,
) -> Result<Intent, InstructionFailure> {
    require_unit(unit_vector)?;
    let target = dp.add(unit_vector);
    let molecule = world.at(&target)?;
    let mut read = CoordSet::new();
    read.insert(target);
    Ok(Intent {
        footprint: Footprint {
            read,
            write: CoordSet::new(),
        },
        energy_delta: 0,
        entropy_delta: 0,
        effect: Effect::None,
        register_effect: Some(RegisterEffect::SetDataReg {
            index: data_reg_index,
            value: RegisterValue::Scalar(molecule),
        }),
        ip_advance: Coord::zero(dp.dimensions()),
    })
}

/// Plans `POKE`/`POKI`/`POKS`: write `source` into an empty adjacent cell
/// with the organism's current marker register embedded, owned by self.
pub fn plan_poke(
    world: &World,
    dp: &Coord,
    unit_vector: &Coord,
    source: Molecule,
    marker: Marker,
) -> Result<Intent, InstructionFailure> {
    require_unit(unit_vector)?;
    let target = dp.add(unit_vector);
    let cell = world.cell_at(&target)?;
    if !cell.is_empty_cell() {
        return Err(InstructionFailure::PokeOccupied);
    }
    let mut write = CoordSet::new();
    write.insert(target.clone());
    Ok(Intent {
        footprint: Footprint {
            read: CoordSet::new(),
            write,
        },
        energy_delta: 0,
        entropy_delta: 0,
        effect: Effect::WriteOwned {
            coord: target,
            molecule: source,
            marker,
        },
        register_effect: None,
        ip_advance: Coord::zero(dp.dimensions()),
    })
}

/// Plans `PPK*`: atomic consume-and-write (swap). Unlike `PEEK`, this
/// succeeds regardless of whether the target cell was occupied.
pub fn plan_peek_poke(
    world: &World,
    dp: &Coord,
    unit_vector: &Coord,
    source: Molecule,
    marker: Marker,
    data_reg_index: usize,
) -> Result<Intent, InstructionFailure> {
    require_unit(unit_vector)?;
    let target = dp.add(unit_vector);
    let previous = world.at(&target)?;
    let mut write = CoordSet::new();
    write.insert(target.clone());
    Ok(Intent {
        footprint: Footprint {
            read: CoordSet::new(),
            write,
        },
        energy_delta: 0,
        entropy_delta: 0,
        effect: Effect::Swap {
            coord: target,
            molecule: source,
            marker,
        },
        register_effect: Some(RegisterEffect::SetDataReg {
            index: data_reg_index,
            value: RegisterValue::Scalar(previous),
        }),
        ip_advance: Coord::zero(dp.dimensions()),
    })
}

/// Plans `SEEK`: move the active DP by `unit_vector`, iff the target is
/// passable (empty or self-owned).
pub fn plan_seek(
    world: &World,
    dp: &Coord,
    unit_vector: &Coord,
    owner: OrganismId,
) -> Result<Intent, InstructionFailure> {
    require_unit(unit_vector)?;
    let target = dp.add(unit_vector);
    if !world.is_passable(&target, owner)? {
        return Err(InstructionFailure::ForkNotPassable);
    }
    Ok(Intent {
        footprint: Footprint::empty(),
        energy_delta: 0,
        entropy_delta: 0,
        effect: Effect::None,
        register_effect: Some(RegisterEffect::SetActiveDp { coord: target }),
        ip_advance: Coord::zero(dp.dimensions()),
    })
}
