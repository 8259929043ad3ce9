// SPDX-License-Identifier: Apache-2.0
//! The `Molecule` record: a fixed-width typed integer stored in one world
//! cell (spec §3).

use bytemuck::{Pod, Zeroable};

/// Runtime molecule type. The compiler's internal `LABEL`/`LABELREF`/
/// `REGISTER` pseudo-types never reach the World at runtime (spec §3) and
/// so are not represented here.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum MoleculeType {
    /// Executable opcode; value `0` is NOP and doubles as "empty".
    #[default]
    Code = 0,
    /// Opaque data argument.
    Data = 1,
    /// Fungible resource; PEEK adds its value to the organism's energy.
    Energy = 2,
    /// Opaque structural payload (no special runtime handling).
    Structure = 3,
}

impl MoleculeType {
    /// Decodes a raw type tag, returning `None` for any value outside the
    /// four runtime types.
    #[must_use]
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Code),
            1 => Some(Self::Data),
            2 => Some(Self::Energy),
            3 => Some(Self::Structure),
            _ => None,
        }
    }
}

/// A typed, signed-integer molecule. `value`'s meaning depends on `ty`
/// (spec §3): opcode id for `Code`, resource amount for `Energy`, argument
/// for `Data`, opaque payload for `Structure`.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Molecule {
    /// Runtime type tag.
    pub ty: MoleculeType,
    /// Signed payload, interpreted per `ty`.
    pub value: i64,
}

impl Molecule {
    /// The canonical empty cell value: `CODE, value=0`.
    pub const EMPTY: Molecule = Molecule {
        ty: MoleculeType::Code,
        value: 0,
    };

    /// Whether this molecule is the canonical empty value.
    #[must_use]
    pub fn is_empty_value(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Convenience constructor for an `ENERGY` molecule.
    #[must_use]
    pub const fn energy(amount: i64) -> Self {
        Self {
            ty: MoleculeType::Energy,
            value: amount,
        }
    }

    /// Convenience constructor for a `STRUCTURE` molecule.
    #[must_use]
    pub const fn structure(value: i64) -> Self {
        Self {
            ty: MoleculeType::Structure,
            value,
        }
    }

    /// Convenience constructor for a `DATA` molecule.
    #[must_use]
    pub const fn data(value: i64) -> Self {
        Self {
            ty: MoleculeType::Data,
            value,
        }
    }

    /// Convenience constructor for a `CODE` molecule (opcode id).
    #[must_use]
    pub const fn code(opcode: i64) -> Self {
        Self {
            ty: MoleculeType::Code,
            value: opcode,
        }
    }
}

/// A 4-bit marker tag, writable only by the owning organism via `POKE`
/// (spec §3). Values outside `0..=15` are rejected by [`Marker::new`].
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Marker(u8);

impl Marker {
    /// The zero marker, used on unowned and freshly-transferred cells.
    pub const ZERO: Marker = Marker(0);

    /// Constructs a marker, masking to the low 4 bits.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        Marker(value & 0x0F)
    }

    /// The underlying 4-bit value.
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

/// Bit-packed on-disk/in-memory representation of a `(Molecule, Marker)`
/// pair, used when a cache-local flat array representation is required
/// (spec §3's "cache-local: flat contiguous array").
///
/// Layout: bits 0-3 marker, bits 4-5 type tag, bits 6-63 sign-extended
/// value (58 bits, generous for any configured `valueBits ≤ 58`).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Pod, Zeroable)]
#[repr(C)]
pub struct PackedCell {
    bits: u64,
}

impl PackedCell {
    /// Packs a molecule, marker, and owner-is-set flag into one 64-bit
    /// word. The owner id itself lives in a parallel array ([`crate::
    /// world::World`]); only whether it is zero is folded in here as a
    /// cheap invariant check aid.
    #[must_use]
    pub fn pack(molecule: Molecule, marker: Marker) -> Self {
        let value_bits = (molecule.value as u64) & ((1u64 << 58) - 1);
        let ty_bits = (molecule.ty as u64) & 0b11;
        let bits = u64::from(marker.get()) | (ty_bits << 4) | (value_bits << 6);
        PackedCell { bits }
    }

    /// Unpacks back into a `(Molecule, Marker)` pair.
    #[must_use]
    pub fn unpack(self) -> (Molecule, Marker) {
        let marker = Marker::new((self.bits & 0x0F) as u8);
        let ty_tag = ((self.bits >> 4) & 0b11) as u8;
        let ty = MoleculeType::from_tag(ty_tag).unwrap_or_default();
        let raw_value = self.bits >> 6;
        // Sign-extend from 58 bits.
        let value = (((raw_value << 6) as i64) >> 6) as i64;
        (Molecule { ty, value }, marker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_round_trips_positive_and_negative_values() {
        for value in [0i64, 1, -1, 12345, -12345, i64::from(i32::MAX), -(1i64 << 57)] {
            for ty in [
                MoleculeType::Code,
                MoleculeType::Data,
                MoleculeType::Energy,
                MoleculeType::Structure,
            ] {
                let packed = PackedCell::pack(Molecule { ty, value }, Marker::new(7));
                let (mol, marker) = packed.unpack();
                assert_eq!(mol.ty, ty);
                assert_eq!(mol.value, value, "value round-trip for {value}");
                assert_eq!(marker.get(), 7);
            }
        }
    }

    #[test]
    fn marker_masks_to_four_bits() {
        assert_eq!(Marker::new(255).get(), 15);
        assert_eq!(Marker::ZERO.get(), 0);
    }

    #[test]
    fn empty_is_code_zero() {
        assert!(Molecule::EMPTY.is_empty_value());
        assert!(Molecule::code(0).is_empty_value());
        assert!(!Molecule::code(1).is_empty_value());
    }
}
