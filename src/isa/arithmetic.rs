// SPDX-License-Identifier: Apache-2.0
//! Arithmetic, bitwise, shift/rotate, population-count, and bit-scan
//! families (spec §4.2). All operate on scalar values and preserve
//! molecule type; division or modulo by zero fails.

use crate::error::InstructionFailure;
use crate::isa::{ArithmeticOp, BitScanOp};
use crate::molecule::Molecule;

/// Applies a binary arithmetic/bitwise/shift/rotate operator to two
/// scalar operands, preserving `lhs`'s molecule type (spec §4.2).
pub fn apply_binary(
    op: ArithmeticOp,
    lhs: Molecule,
    rhs: Molecule,
) -> Result<Molecule, InstructionFailure> {
    let a = lhs.value;
    let b = rhs.value;
    let result = match op {
        ArithmeticOp::Add => a.wrapping_add(b),
        ArithmeticOp::Sub => a.wrapping_sub(b),
        ArithmeticOp::Mul => a.wrapping_mul(b),
        ArithmeticOp::Div => {
            if b == 0 {
                return Err(InstructionFailure::DivideByZero);
            }
            a.wrapping_div(b)
        }
        ArithmeticOp::Mod => {
            if b == 0 {
                return Err(InstructionFailure::DivideByZero);
            }
            a.wrapping_rem(b)
        }
        ArithmeticOp::And => a & b,
        ArithmeticOp::Or => a | b,
        ArithmeticOp::Xor => a ^ b,
        ArithmeticOp::Shl => a.wrapping_shl((b & 63) as u32),
        ArithmeticOp::Shr => a.wrapping_shr((b & 63) as u32),
        ArithmeticOp::RotL => (a as u64).rotate_left((b & 63) as u32) as i64,
        ArithmeticOp::RotR => (a as u64).rotate_right((b & 63) as u32) as i64,
    };
    Ok(Molecule {
        ty: lhs.ty,
        value: result,
    })
}

/// Applies a population-count / bit-scan operator to one scalar operand.
pub fn apply_bit_scan(op: BitScanOp, operand: Molecule) -> Molecule {
    let bits = operand.value as u64;
    let result = match op {
        BitScanOp::PopCount => i64::from(bits.count_ones()),
        BitScanOp::BitScanForward => bits
            .trailing_zeros()
            .min(63)
            .into(),
        BitScanOp::BitScanReverse => {
            if bits == 0 {
                -1
            } else {
                i64::from(63 - bits.leading_zeros())
            }
        }
    };
    Molecule {
        ty: operand.ty,
        value: result,
    }
}
