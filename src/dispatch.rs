// SPDX-License-Identifier: Apache-2.0
//! Fetch/decode/plan: turns the `CODE` molecule at an organism's `ip`
//! into a decoded [`Opcode`] and then into an [`Intent`], resolving
//! operands per their [`OperandShape`] (spec §4.2).
//!
//! Each instruction occupies `1 + operand_cells` consecutive program
//! cells along `dv`: the opcode cell itself, then zero or one operand
//! cell depending on shape (`Register`/`Immediate` each consume one
//! adjacent `DATA` cell; `Stack` consumes none, popping instead). Binary
//! arithmetic/vector ops read their left-hand operand from data register
//! 0 and write the result back there — an explicit accumulator
//! convention, documented as an Open Question resolution in
//! `DESIGN.md`, since the distilled specification left the exact
//! operand-count for two-operand families unstated.

use crate::coord::Coord;
use crate::error::InstructionFailure;
use crate::fuzzy::LabelAnchor;
use crate::ident::OrganismId;
use crate::isa::{
    arithmetic, conditionals, control_flow, data_movement, location_ops, neighbor_scans,
    reproduction, state_ops, vector_ops, world_interaction, ArithmeticOp, BitScanOp,
    ConditionalOp, Effect, Intent, LocationOp, NeighborPredicate, Opcode, OperandShape,
    RegisterEffect, StateQueryOp, StackOnlyOp, VectorOp,
};
use crate::molecule::{Marker, Molecule, MoleculeType};
use crate::organism::{Organism, RegisterValue};
use crate::program_artifact::ProgramArtifact;
use crate::rng::Prng;
use crate::world::World;

/// Everything Plan needs beyond the acting organism and the world itself.
pub struct PlanContext<'a> {
    /// Current tick, for RNG substream derivation.
    pub tick: u64,
    /// Fuzzy-jump Hamming tolerance.
    pub jump_tolerance: u32,
    /// The program's label anchor table.
    pub anchors: &'a [LabelAnchor],
    /// The scheduler's master RNG, used to derive per-call substreams.
    pub master_rng: &'a Prng,
}

fn shape_index(shape: OperandShape) -> i64 {
    match shape {
        OperandShape::Register => 0,
        OperandShape::Immediate => 1,
        OperandShape::Stack => 2,
    }
}

fn shape_from_index(index: i64) -> Result<OperandShape, InstructionFailure> {
    match index {
        0 => Ok(OperandShape::Register),
        1 => Ok(OperandShape::Immediate),
        2 => Ok(OperandShape::Stack),
        _ => Err(InstructionFailure::UnknownOpcode(index)),
    }
}

fn operand_cells(shape: OperandShape) -> usize {
    match shape {
        OperandShape::Register | OperandShape::Immediate => 1,
        OperandShape::Stack => 0,
    }
}

/// Resolves a scalar operand per `shape`, reading from the adjacent
/// program cell (`Register`/`Immediate`) or popping the data stack.
fn resolve_scalar(
    organism: &mut Organism,
    world: &World,
    shape: OperandShape,
    operand_site: &Coord,
) -> Result<i64, InstructionFailure> {
    match shape {
        OperandShape::Register => {
            let index_cell = world.at(operand_site)?;
            let index = (index_cell.value.unsigned_abs() as usize) % organism.data_regs.len();
            organism.data_regs[index].as_scalar().map(|m| m.value)
        }
        OperandShape::Immediate => Ok(world.at(operand_site)?.value),
        OperandShape::Stack => organism.data_stack.pop()?.as_scalar().map(|m| m.value),
    }
}

/// Resolves a `usize` index operand (e.g. the destination register for
/// `PEEK`/`SCAN`/`PPK*`), reusing [`resolve_scalar`] and clamping into
/// `0..8`.
fn resolve_index(
    organism: &mut Organism,
    world: &World,
    shape: OperandShape,
    operand_site: &Coord,
) -> Result<usize, InstructionFailure> {
    let raw = resolve_scalar(organism, world, shape, operand_site)?;
    Ok((raw.unsigned_abs() as usize) % organism.data_regs.len())
}

/// Reads the acting organism's marker register, used by `POKE`/`PPK*`.
fn acting_marker(organism: &Organism) -> Marker {
    organism.marker_reg
}

/// Advances `ip` sequentially by `(1 + operand_cells) * dv`, the default
/// advance for every non-jumping instruction.
fn sequential_advance(dv: &Coord, operand_cell_count: usize) -> Coord {
    let mut advance = dv.clone();
    for _ in 0..operand_cell_count {
        advance = advance.add(dv);
    }
    advance
}

/// Fetches the opcode at `organism.ip`, decodes it, resolves operands,
/// and returns the resulting Intent. Any [`InstructionFailure`] here is
/// recoverable: the scheduler charges the error penalty and advances
/// `ip` by one cell.
pub fn plan(
    organism: &mut Organism,
    world: &World,
    program: &ProgramArtifact,
    ctx: &PlanContext,
) -> Result<Intent, InstructionFailure> {
    let fetched = world.at(&organism.ip)?;
    if fetched.ty != MoleculeType::Code {
        return Err(InstructionFailure::NotExecutable);
    }
    let opcode = decode_opcode(fetched.value)?;
    let operand_site = organism.ip.add(&organism.dv);
    let dp = organism.active_dp_coord().clone();
    let dv = organism.dv.clone();

    match opcode {
        Opcode::Nop => Ok(state_ops::plan_nop(sequential_advance(&dv, 0))),
        Opcode::Sync => Ok(state_ops::plan_sync(
            organism.ip.clone(),
            sequential_advance(&dv, 0),
        )),
        Opcode::Pop => {
            let index = resolve_index(organism, world, OperandShape::Immediate, &operand_site)?;
            Ok(data_movement::plan_pop(index, sequential_advance(&dv, 1)))
        }
        Opcode::Dup => Ok(data_movement::plan_stack_only(
            StackOnlyOp::Dup,
            sequential_advance(&dv, 0),
        )),
        Opcode::Swap => Ok(data_movement::plan_stack_only(
            StackOnlyOp::Swap,
            sequential_advance(&dv, 0),
        )),
        Opcode::Drop => Ok(data_movement::plan_stack_only(
            StackOnlyOp::Drop,
            sequential_advance(&dv, 0),
        )),
        Opcode::Rot => Ok(data_movement::plan_stack_only(
            StackOnlyOp::Rot,
            sequential_advance(&dv, 0),
        )),
        Opcode::Ret => Ok(control_flow::plan_ret()),

        Opcode::Set(shape) => {
            let value = resolve_scalar(organism, world, shape, &operand_site)?;
            Ok(data_movement::plan_set(
                0,
                RegisterValue::Scalar(Molecule::data(value)),
                sequential_advance(&dv, operand_cells(shape)),
            ))
        }
        Opcode::Push(shape) => {
            let value = resolve_scalar(organism, world, shape, &operand_site)?;
            Ok(data_movement::plan_push(
                RegisterValue::Scalar(Molecule::data(value)),
                sequential_advance(&dv, operand_cells(shape)),
            ))
        }

        Opcode::Arithmetic(op, shape) => {
            let rhs = resolve_scalar(organism, world, shape, &operand_site)?;
            let lhs = organism.data_regs[0].as_scalar()?;
            let result = arithmetic::apply_binary(op, lhs, Molecule::data(rhs))?;
            Ok(data_movement::plan_set(
                0,
                RegisterValue::Scalar(result),
                sequential_advance(&dv, operand_cells(shape)),
            ))
        }
        Opcode::BitScan(op, shape) => {
            let value = resolve_scalar(organism, world, shape, &operand_site)?;
            let result = arithmetic::apply_bit_scan(op, Molecule::data(value));
            Ok(data_movement::plan_set(
                0,
                RegisterValue::Scalar(result),
                sequential_advance(&dv, operand_cells(shape)),
            ))
        }
        Opcode::Vector(op, shape) => plan_vector(organism, world, op, shape, &operand_site, &dv),

        Opcode::Jump(shape) => {
            let pattern = resolve_scalar(organism, world, shape, &operand_site)? as u64;
            let (mut intent, _ownership) = control_flow::plan_jump(
                pattern,
                ctx.anchors,
                ctx.jump_tolerance,
                organism.id,
                &mut ctx.master_rng.substream(ctx.tick, organism.id, fetched.value as u32),
                organism.ip.clone(),
            )?;
            // The resolved anchor is recorded as a read so the scheduler can
            // classify its ownership for the foreign-jump cost penalty
            // without re-running fuzzy resolution.
            let target = organism.ip.add(&intent.ip_advance);
            intent.footprint.read.insert(target);
            Ok(intent)
        }
        Opcode::Call(shape) => {
            let pattern = resolve_scalar(organism, world, shape, &operand_site)? as u64;
            let advance = sequential_advance(&dv, operand_cells(shape));
            let fallthrough = organism.ip.add(&advance);
            let (jump_intent, _) = control_flow::plan_jump(
                pattern,
                ctx.anchors,
                ctx.jump_tolerance,
                organism.id,
                &mut ctx.master_rng.substream(ctx.tick, organism.id, fetched.value as u32),
                organism.ip.clone(),
            )?;
            let target = organism.ip.add(&jump_intent.ip_advance);
            Ok(control_flow::plan_call(target, fallthrough, organism.ip.clone()))
        }

        Opcode::Conditional(op, negate) => {
            let compare = organism.data_regs[0].as_scalar()?.value;
            let holds = conditionals::evaluate(op, negate, world, &dp, &dv, organism.id, compare)?;
            if holds {
                Ok(Intent {
                    footprint: crate::footprint::Footprint::empty(),
                    energy_delta: 0,
                    entropy_delta: 0,
                    effect: Effect::None,
                    register_effect: None,
                    ip_advance: sequential_advance(&dv, 0),
                })
            } else {
                Ok(Intent {
                    footprint: crate::footprint::Footprint::empty(),
                    energy_delta: 0,
                    entropy_delta: 0,
                    effect: Effect::None,
                    register_effect: Some(RegisterEffect::SkipNext),
                    ip_advance: sequential_advance(&dv, 0),
                })
            }
        }

        Opcode::Peek(shape) => {
            let index = resolve_index(organism, world, shape, &operand_site)?;
            let mut intent = world_interaction::plan_peek(world, &dp, &dv, index)?;
            intent.ip_advance = sequential_advance(&dv, operand_cells(shape));
            Ok(intent)
        }
        Opcode::Scan(shape) => {
            let index = resolve_index(organism, world, shape, &operand_site)?;
            let mut intent = world_interaction::plan_scan(world, &dp, &dv, index)?;
            intent.ip_advance = sequential_advance(&dv, operand_cells(shape));
            Ok(intent)
        }
        Opcode::Poke(shape) => {
            let value = resolve_scalar(organism, world, shape, &operand_site)?;
            let mut intent = world_interaction::plan_poke(
                world,
                &dp,
                &dv,
                Molecule::structure(value),
                acting_marker(organism),
            )?;
            intent.ip_advance = sequential_advance(&dv, operand_cells(shape));
            Ok(intent)
        }
        Opcode::PeekPoke(shape) => {
            let value = resolve_scalar(organism, world, shape, &operand_site)?;
            let mut intent = world_interaction::plan_peek_poke(
                world,
                &dp,
                &dv,
                Molecule::structure(value),
                acting_marker(organism),
                0,
            )?;
            intent.ip_advance = sequential_advance(&dv, operand_cells(shape));
            Ok(intent)
        }
        Opcode::Seek(shape) => {
            let _ = shape;
            let mut intent = world_interaction::plan_seek(world, &dp, &dv, organism.id)?;
            intent.ip_advance = sequential_advance(&dv, 0);
            Ok(intent)
        }

        Opcode::Location(op, shape) => {
            plan_location(organism, world, op, shape, &operand_site, &dv)
        }

        Opcode::Turn(shape) => {
            let raw = resolve_scalar(organism, world, shape, &operand_site)?;
            let new_dv = axis_unit_vector(organism.dv.dimensions(), raw);
            state_ops::plan_turn(new_dv, sequential_advance(&dv, operand_cells(shape)))
        }
        Opcode::StateQuery(op) => {
            let value = state_ops::evaluate(
                op,
                &organism.ip,
                &dp,
                &organism.dv,
                organism.energy,
                organism.entropy,
                organism.id,
                ctx.tick,
                fetched.value as u32,
                ctx.master_rng,
            );
            Ok(data_movement::plan_set(0, value, sequential_advance(&dv, 0)))
        }
        Opcode::SetMarker(shape) => {
            let raw = resolve_scalar(organism, world, shape, &operand_site)?;
            Ok(state_ops::plan_set_marker(
                Marker::new(raw as u8),
                sequential_advance(&dv, operand_cells(shape)),
            ))
        }

        Opcode::Fork(shape) => {
            let requested = resolve_scalar(organism, world, shape, &operand_site)?.max(0) as u32;
            let mut intent = reproduction::plan_fork(
                world,
                &dp,
                &dv,
                requested,
                organism.energy,
                organism.dv.clone(),
                organism.id,
            )?;
            intent.ip_advance = sequential_advance(&dv, operand_cells(shape));
            Ok(intent)
        }

        Opcode::NeighborScan(predicate) => {
            let bits = neighbor_scans::scan(predicate, world, &dp, organism.id)?;
            Ok(data_movement::plan_set(
                0,
                RegisterValue::Scalar(Molecule::data(bits as i64)),
                sequential_advance(&dv, 0),
            ))
        }
    }
}

fn axis_unit_vector(dimensions: usize, raw: i64) -> Coord {
    let axis = (raw.unsigned_abs() as usize / 2) % dimensions.max(1);
    let sign: i64 = if raw % 2 == 0 { 1 } else { -1 };
    let mut components = vec![0i64; dimensions];
    if dimensions > 0 {
        components[axis] = sign;
    }
    Coord(components)
}

fn plan_vector(
    organism: &mut Organism,
    world: &World,
    op: VectorOp,
    shape: OperandShape,
    operand_site: &Coord,
    dv: &Coord,
) -> Result<Intent, InstructionFailure> {
    let lhs = organism.data_regs[0].as_vector()?.clone();
    let advance = sequential_advance(dv, operand_cells(shape));
    let result_vector = match op {
        VectorOp::Add | VectorOp::Sub | VectorOp::Dot | VectorOp::Cross2d => {
            let rhs = resolve_vector_operand(organism, world, shape, operand_site, lhs.dimensions())?;
            match op {
                VectorOp::Add => RegisterValue::Vector(vector_ops::add(&lhs, &rhs)),
                VectorOp::Sub => RegisterValue::Vector(vector_ops::sub(&lhs, &rhs)),
                VectorOp::Dot => {
                    RegisterValue::Scalar(Molecule::data(vector_ops::dot(&lhs, &rhs)))
                }
                VectorOp::Cross2d => {
                    RegisterValue::Scalar(Molecule::data(vector_ops::cross_2d(&lhs, &rhs)?))
                }
                _ => unreachable!(),
            }
        }
        VectorOp::Get => {
            let axis = resolve_scalar(organism, world, shape, operand_site)?.unsigned_abs() as usize;
            RegisterValue::Scalar(Molecule::data(vector_ops::get_component(&lhs, axis)?))
        }
        VectorOp::Set => {
            let value = resolve_scalar(organism, world, shape, operand_site)?;
            RegisterValue::Vector(vector_ops::set_component(&lhs, 0, value)?)
        }
        VectorOp::Build => {
            let value = resolve_scalar(organism, world, shape, operand_site)?;
            RegisterValue::Vector(vector_ops::build(&[value]))
        }
        VectorOp::BitsToVector => {
            let bits = resolve_scalar(organism, world, shape, operand_site)?;
            RegisterValue::Vector(vector_ops::bits_to_vector(bits as u64, lhs.dimensions()))
        }
        VectorOp::VectorToBits => {
            RegisterValue::Scalar(Molecule::data(vector_ops::vector_to_bits(&lhs) as i64))
        }
        VectorOp::RotateClockwise => RegisterValue::Vector(vector_ops::rotate_90(&lhs, true)?),
        VectorOp::RotateCounterClockwise => {
            RegisterValue::Vector(vector_ops::rotate_90(&lhs, false)?)
        }
    };
    Ok(data_movement::plan_set(0, result_vector, advance))
}

fn resolve_vector_operand(
    organism: &mut Organism,
    world: &World,
    shape: OperandShape,
    operand_site: &Coord,
    dimensions: usize,
) -> Result<Coord, InstructionFailure> {
    match shape {
        OperandShape::Register => {
            let index = resolve_index(organism, world, OperandShape::Immediate, operand_site)?;
            organism.data_regs[index].as_vector().map(Clone::clone)
        }
        OperandShape::Immediate => {
            let raw = world.at(operand_site)?.value;
            Ok(axis_unit_vector(dimensions, raw))
        }
        OperandShape::Stack => match organism.data_stack.pop()? {
            RegisterValue::Vector(v) => Ok(v),
            RegisterValue::Scalar(_) => Err(InstructionFailure::TypeMismatch {
                expected: crate::error::OperandExpectation::Vector,
            }),
        },
    }
}

fn plan_location(
    organism: &mut Organism,
    world: &World,
    op: LocationOp,
    shape: OperandShape,
    operand_site: &Coord,
    dv: &Coord,
) -> Result<Intent, InstructionFailure> {
    let advance = sequential_advance(dv, operand_cells(shape));
    match op {
        LocationOp::PushLocation => Ok(location_ops::plan_push_location(advance)),
        LocationOp::PopLocation => Ok(location_ops::plan_pop_location(advance)),
        LocationOp::JumpStackLocation => {
            let target = organism.location_stack.pop()?;
            Ok(location_ops::plan_jump_to_location(&target, &organism.ip))
        }
        LocationOp::JumpRegisterLocation => {
            let index = resolve_index(organism, world, shape, operand_site)? % organism.loc_regs.len();
            let target = organism.loc_regs[index].clone();
            Ok(location_ops::plan_jump_to_location(&target, &organism.ip))
        }
    }
}

const ARITH_OPS: [ArithmeticOp; 12] = [
    ArithmeticOp::Add,
    ArithmeticOp::Sub,
    ArithmeticOp::Mul,
    ArithmeticOp::Div,
    ArithmeticOp::Mod,
    ArithmeticOp::And,
    ArithmeticOp::Or,
    ArithmeticOp::Xor,
    ArithmeticOp::Shl,
    ArithmeticOp::Shr,
    ArithmeticOp::RotL,
    ArithmeticOp::RotR,
];

const BITSCAN_OPS: [BitScanOp; 3] = [
    BitScanOp::PopCount,
    BitScanOp::BitScanForward,
    BitScanOp::BitScanReverse,
];

const VECTOR_OPS: [VectorOp; 11] = [
    VectorOp::Add,
    VectorOp::Sub,
    VectorOp::Dot,
    VectorOp::Cross2d,
    VectorOp::Get,
    VectorOp::Set,
    VectorOp::Build,
    VectorOp::BitsToVector,
    VectorOp::VectorToBits,
    VectorOp::RotateClockwise,
    VectorOp::RotateCounterClockwise,
];

const CONDITIONAL_OPS: [ConditionalOp; 4] = [
    ConditionalOp::MarkerEquals,
    ConditionalOp::Passable,
    ConditionalOp::Foreign,
    ConditionalOp::ValueEquals,
];

const LOCATION_OPS: [LocationOp; 4] = [
    LocationOp::PushLocation,
    LocationOp::PopLocation,
    LocationOp::JumpStackLocation,
    LocationOp::JumpRegisterLocation,
];

const STATE_QUERY_OPS: [StateQueryOp; 6] = [
    StateQueryOp::Position,
    StateQueryOp::Diff,
    StateQueryOp::Energy,
    StateQueryOp::Entropy,
    StateQueryOp::Gdv,
    StateQueryOp::Rand,
];

const BASE_ARITH: i64 = 1_000;
const BASE_BITSCAN: i64 = 2_000;
const BASE_VECTOR: i64 = 3_000;
const BASE_SET: i64 = 4_000;
const BASE_PUSH: i64 = 4_100;
const BASE_JUMP: i64 = 4_200;
const BASE_CALL: i64 = 4_300;
const BASE_CONDITIONAL: i64 = 4_400;
const BASE_PEEK: i64 = 5_000;
const BASE_SCAN: i64 = 5_100;
const BASE_POKE: i64 = 5_200;
const BASE_PEEKPOKE: i64 = 5_300;
const BASE_SEEK: i64 = 5_400;
const BASE_LOCATION: i64 = 6_000;
const BASE_TURN: i64 = 7_000;
const BASE_STATE_QUERY: i64 = 7_100;
const BASE_SET_MARKER: i64 = 7_200;
const BASE_FORK: i64 = 7_300;
const BASE_NEIGHBOR_PASSABLE: i64 = 7_400;
const BASE_NEIGHBOR_FOREIGN: i64 = 7_401;
const BASE_NEIGHBOR_HAS_TYPE: i64 = 7_410;

/// Decodes a raw `CODE` molecule value into an [`Opcode`]. Encoding is an
/// internal concern of this runtime (no external assembler format is in
/// scope) — see `DESIGN.md`.
pub fn decode_opcode(code: i64) -> Result<Opcode, InstructionFailure> {
    Ok(match code {
        0 => Opcode::Nop,
        1 => Opcode::Sync,
        2 => Opcode::Pop,
        3 => Opcode::Dup,
        4 => Opcode::Swap,
        5 => Opcode::Drop,
        6 => Opcode::Rot,
        7 => Opcode::Ret,
        BASE_SET..=BASE_PUSH if code < BASE_PUSH => {
            Opcode::Set(shape_from_index(code - BASE_SET)?)
        }
        BASE_PUSH..=BASE_JUMP if code < BASE_JUMP => {
            Opcode::Push(shape_from_index(code - BASE_PUSH)?)
        }
        BASE_JUMP..=BASE_CALL if code < BASE_CALL => {
            Opcode::Jump(shape_from_index(code - BASE_JUMP)?)
        }
        BASE_CALL..=BASE_CONDITIONAL if code < BASE_CONDITIONAL => {
            Opcode::Call(shape_from_index(code - BASE_CALL)?)
        }
        BASE_CONDITIONAL..=BASE_PEEK if code < BASE_PEEK => {
            let offset = code - BASE_CONDITIONAL;
            let op = *CONDITIONAL_OPS
                .get((offset / 2) as usize)
                .ok_or(InstructionFailure::UnknownOpcode(code))?;
            Opcode::Conditional(op, offset % 2 == 1)
        }
        BASE_PEEK..=BASE_SCAN if code < BASE_SCAN => Opcode::Peek(shape_from_index(code - BASE_PEEK)?),
        BASE_SCAN..=BASE_POKE if code < BASE_POKE => Opcode::Scan(shape_from_index(code - BASE_SCAN)?),
        BASE_POKE..=BASE_PEEKPOKE if code < BASE_PEEKPOKE => {
            Opcode::Poke(shape_from_index(code - BASE_POKE)?)
        }
        BASE_PEEKPOKE..=BASE_SEEK if code < BASE_SEEK => {
            Opcode::PeekPoke(shape_from_index(code - BASE_PEEKPOKE)?)
        }
        BASE_SEEK..=BASE_LOCATION if code < BASE_LOCATION => {
            Opcode::Seek(shape_from_index(code - BASE_SEEK)?)
        }
        BASE_LOCATION..=BASE_TURN if code < BASE_TURN => {
            let offset = code - BASE_LOCATION;
            let op = *LOCATION_OPS
                .get((offset / 3) as usize)
                .ok_or(InstructionFailure::UnknownOpcode(code))?;
            Opcode::Location(op, shape_from_index(offset % 3)?)
        }
        BASE_TURN..=BASE_STATE_QUERY if code < BASE_STATE_QUERY => {
            Opcode::Turn(shape_from_index(code - BASE_TURN)?)
        }
        BASE_STATE_QUERY..=BASE_SET_MARKER if code < BASE_SET_MARKER => {
            let op = *STATE_QUERY_OPS
                .get((code - BASE_STATE_QUERY) as usize)
                .ok_or(InstructionFailure::UnknownOpcode(code))?;
            Opcode::StateQuery(op)
        }
        BASE_SET_MARKER..=BASE_FORK if code < BASE_FORK => {
            Opcode::SetMarker(shape_from_index(code - BASE_SET_MARKER)?)
        }
        BASE_FORK..=BASE_NEIGHBOR_PASSABLE if code < BASE_NEIGHBOR_PASSABLE => {
            Opcode::Fork(shape_from_index(code - BASE_FORK)?)
        }
        c if c == BASE_NEIGHBOR_PASSABLE => Opcode::NeighborScan(NeighborPredicate::Passable),
        c if c == BASE_NEIGHBOR_FOREIGN => Opcode::NeighborScan(NeighborPredicate::Foreign),
        BASE_NEIGHBOR_HAS_TYPE..=9_000 => {
            let tag = (code - BASE_NEIGHBOR_HAS_TYPE) as u8;
            let ty = MoleculeType::from_tag(tag).ok_or(InstructionFailure::UnknownOpcode(code))?;
            Opcode::NeighborScan(NeighborPredicate::HasType(ty))
        }
        BASE_ARITH..=BASE_BITSCAN if code < BASE_BITSCAN => {
            let offset = code - BASE_ARITH;
            let op = *ARITH_OPS
                .get((offset / 3) as usize)
                .ok_or(InstructionFailure::UnknownOpcode(code))?;
            Opcode::Arithmetic(op, shape_from_index(offset % 3)?)
        }
        BASE_BITSCAN..=BASE_VECTOR if code < BASE_VECTOR => {
            let offset = code - BASE_BITSCAN;
            let op = *BITSCAN_OPS
                .get((offset / 3) as usize)
                .ok_or(InstructionFailure::UnknownOpcode(code))?;
            Opcode::BitScan(op, shape_from_index(offset % 3)?)
        }
        BASE_VECTOR..=BASE_SET if code < BASE_SET => {
            let offset = code - BASE_VECTOR;
            let op = *VECTOR_OPS
                .get((offset / 3) as usize)
                .ok_or(InstructionFailure::UnknownOpcode(code))?;
            Opcode::Vector(op, shape_from_index(offset % 3)?)
        }
        _ => return Err(InstructionFailure::UnknownOpcode(code)),
    })
}
