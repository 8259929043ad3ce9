// SPDX-License-Identifier: Apache-2.0
//! Error taxonomy for the core (spec §7).
//!
//! `InstructionFailure` and `ConfigurationError` are the only error types
//! that escape into a `Result`. `ConflictLoss` and `ThermodynamicDeath` are
//! expected outcomes, not errors — they are recorded as data on
//! [`crate::receipt::TickReceipt`] and [`crate::organism::Organism`]
//! respectively, never returned as `Err`.

use thiserror::Error;

/// Per-instruction failure. Always recoverable: the scheduler charges
/// `errorPenaltyCost`, leaves the World unchanged, and advances `ip`
/// normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InstructionFailure {
    /// A unit vector was required but the supplied vector had zero or more
    /// than one nonzero component.
    #[error("expected a unit vector, got a non-unit vector")]
    NonUnitVector,
    /// An axis went out of range on a non-toroidal topology.
    #[error("coordinate out of range on non-toroidal axis {axis}")]
    OutOfRange {
        /// Offending axis index.
        axis: usize,
    },
    /// Division or modulo by zero.
    #[error("division or modulo by zero")]
    DivideByZero,
    /// A stack operation underflowed or overflowed its configured bound.
    #[error("stack {stack:?} {kind:?}")]
    StackFault {
        /// Which stack faulted.
        stack: StackKind,
        /// Underflow or overflow.
        kind: StackFaultKind,
    },
    /// A scalar was required where a vector (or vice versa) was supplied.
    #[error("molecule type mismatch: expected {expected:?}")]
    TypeMismatch {
        /// The shape the instruction required.
        expected: OperandExpectation,
    },
    /// `PEEK` targeted an empty cell.
    #[error("peek of empty cell")]
    PeekEmpty,
    /// `POKE` targeted an occupied cell.
    #[error("poke into occupied cell")]
    PokeOccupied,
    /// `FORK` targeted a non-passable cell.
    #[error("fork into non-passable cell")]
    ForkNotPassable,
    /// `FORK` requested more energy than the parent has.
    #[error("fork transfer energy {requested} exceeds available {available}")]
    ForkEnergyExceedsAvailable {
        /// Energy the instruction requested to transfer.
        requested: u32,
        /// Energy actually available on the parent.
        available: u32,
    },
    /// A jump's fuzzy-label resolution found no candidate anchor.
    #[error("jump found no fuzzy label match")]
    NoFuzzyMatch,
    /// `FORK` would exceed the configured `maxOrganisms` limit.
    ///
    /// Per spec §7, resource exhaustion on FORK is reported through the
    /// ordinary `InstructionFailure` channel, not a separate error path.
    #[error("organism population limit reached")]
    MaxOrganismsReached,
    /// The molecule at `ip` was not of type CODE.
    #[error("fetched molecule is not CODE")]
    NotExecutable,
    /// The opcode value did not decode to any known instruction.
    #[error("unknown opcode {0}")]
    UnknownOpcode(i64),
}

/// Which stack an instruction was manipulating when it faulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackKind {
    /// The general-purpose data stack.
    Data,
    /// The call stack (return addresses + saved proc-regs).
    Call,
    /// The location stack (visited DP coordinates).
    Location,
}

/// Underflow vs overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackFaultKind {
    /// Pop/peek on an empty stack.
    Underflow,
    /// Push past the configured bound.
    Overflow,
}

/// What shape an operand was expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandExpectation {
    /// A scalar molecule value.
    Scalar,
    /// A vector value.
    Vector,
}

/// Boot-time configuration failure. Fatal to the process; detected before
/// the first tick runs.
#[derive(Debug, Clone, Error)]
pub enum ConfigurationError {
    /// World shape has zero dimensions, or an axis length of zero.
    #[error("invalid world shape: {0}")]
    InvalidWorldShape(String),
    /// A plugin id referenced in configuration has no registered
    /// implementation.
    #[error("unknown plugin id: {0}")]
    UnknownPluginId(String),
    /// Molecule type-bits + value-bits do not fit the configured word
    /// width.
    #[error("inconsistent molecule bit widths: type_bits={type_bits} value_bits={value_bits} word_bits={word_bits}")]
    InconsistentMoleculeBitWidths {
        /// Configured type-tag bit width.
        type_bits: u32,
        /// Configured value bit width.
        value_bits: u32,
        /// Total word width molecules are packed into.
        word_bits: u32,
    },
    /// Neighbor-scan instructions were configured for a dimensionality `n`
    /// where `2n` exceeds the scalar value-bit width.
    #[error("neighbor scan requires 2*{dimensions} bits, only {value_bits} available")]
    NeighborScanBitsExceeded {
        /// World dimensionality.
        dimensions: usize,
        /// Configured scalar value-bit width.
        value_bits: u32,
    },
}

/// Errors returned by the public engine API (construction and tick
/// driving), distinct from the per-instruction/per-tick outcomes above.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration failed validation at boot.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// Caller referenced an organism id that does not exist (or has already
    /// died and been recycled).
    #[error("unknown organism id {0}")]
    UnknownOrganism(u64),
    /// A plugin of the same id was registered twice in the same registry.
    #[error("duplicate plugin registration: {0}")]
    DuplicatePlugin(String),
}
