// SPDX-License-Identifier: Apache-2.0
//! Thermodynamic cost policy: `cost(instr, operands, context) -> (ΔE, ΔS)`
//! (spec §4.3). Pluggable via a trait, grounded on
//! `warp-core::rule::ConflictPolicy`'s enum-plus-config approach to
//! swappable tick behavior.

use crate::isa::Opcode;
use crate::molecule::MoleculeType;
use crate::world::Ownership;

/// Everything a policy needs to price one instruction. Built by the
/// scheduler from the decoded opcode and the cell(s) it touched during
/// Plan.
#[derive(Clone, Copy, Debug)]
pub struct CostContext {
    /// The instruction being priced.
    pub opcode: Opcode,
    /// Ownership of the cell the instruction targeted, if any (PEEK/POKE/
    /// PPK/neighbor-scans/conditionals all target exactly one cell).
    pub target_ownership: Option<Ownership>,
    /// Molecule type written or consumed, if any.
    pub molecule_type: Option<MoleculeType>,
    /// The organism's energy register at the time of charge, for
    /// permille-proportional costs.
    pub current_energy: u32,
    /// The organism's entropy register, for permille-proportional costs.
    pub current_entropy: u32,
    /// Whether this instruction lost conflict resolution. The policy
    /// itself ignores this; the scheduler consults
    /// `SchedulerConfig::conflict_loser_charges_cost` before charging a
    /// conflict loser at all.
    pub lost_conflict: bool,
}

/// A priced instruction outcome: energy and entropy deltas to apply.
/// Positive `entropy` means entropy production; negative means
/// dissipation (e.g. POKE).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Charge {
    /// Energy delta (typically negative: a cost).
    pub energy: i64,
    /// Entropy delta (positive: production; negative: dissipation).
    pub entropy: i64,
}

impl Charge {
    /// The zero charge.
    pub const ZERO: Charge = Charge {
        energy: 0,
        entropy: 0,
    };
}

/// The thermodynamic policy contract (spec §4.3).
pub trait ThermodynamicPolicy: Send + Sync {
    /// Prices one instruction.
    fn cost(&self, ctx: &CostContext) -> Charge;

    /// Cost charged for an invalid operation (spec §7): "charges the
    /// configured `errorPenaltyCost` and produces no other effects."
    fn error_penalty(&self) -> Charge;
}

// Whether a conflict loser still pays its instruction's cost is a
// scheduler-level flag (`SchedulerConfig::conflict_loser_charges_cost`,
// spec §6's `conflictLoserChargesCost`), not a policy concern — see the
// Open Question resolution in `DESIGN.md`.

/// Permille helper: `value * permille / 1000`, rounding toward zero.
fn permille(value: u32, permille: u32) -> i64 {
    (i64::from(value) * i64::from(permille)) / 1000
}

/// The default policy: fixed base costs per instruction family, with
/// ownership-dependent PEEK/POKE pricing and permille-proportional
/// dissipation for POKE (spec §4.3).
#[derive(Clone, Debug)]
pub struct DefaultPolicy {
    /// Base energy cost charged for every executed instruction.
    pub base_instruction_cost: u32,
    /// Base entropy produced by every executed instruction.
    pub base_entropy_production: u32,
    /// PEEK base cost when the target cell is self-owned.
    pub peek_cost_self: u32,
    /// PEEK base cost when the target cell is foreign-owned.
    pub peek_cost_foreign: u32,
    /// PEEK base cost when the target cell is unowned.
    pub peek_cost_unowned: u32,
    /// POKE base cost, keyed loosely by whether the written molecule is
    /// `Structure` (replication-relevant) versus any other type.
    pub poke_cost_structure: u32,
    /// POKE base cost for non-structure molecules.
    pub poke_cost_other: u32,
    /// Entropy dissipated (negative ΔS) by every POKE, in permille of the
    /// organism's current entropy register.
    pub poke_dissipation_permille: u32,
    /// Extra energy cost for jumps resolving to a foreign-owned anchor
    /// (spec §4.4).
    pub foreign_jump_penalty: u32,
    /// Charge applied to any instruction that fails validation (spec §7).
    pub error_penalty_cost: u32,
}

impl Default for DefaultPolicy {
    fn default() -> Self {
        Self {
            base_instruction_cost: 1,
            base_entropy_production: 1,
            peek_cost_self: 1,
            peek_cost_foreign: 3,
            peek_cost_unowned: 2,
            poke_cost_structure: 5,
            poke_cost_other: 2,
            poke_dissipation_permille: 50,
            foreign_jump_penalty: 2,
            error_penalty_cost: 4,
        }
    }
}

impl ThermodynamicPolicy for DefaultPolicy {
    fn cost(&self, ctx: &CostContext) -> Charge {
        let base = Charge {
            energy: -i64::from(self.base_instruction_cost),
            entropy: i64::from(self.base_entropy_production),
        };
        let specific = match ctx.opcode {
            Opcode::Peek(_) => {
                let cost = match ctx.target_ownership {
                    Some(Ownership::Itself) => self.peek_cost_self,
                    Some(Ownership::Foreign) => self.peek_cost_foreign,
                    _ => self.peek_cost_unowned,
                };
                Charge {
                    energy: -i64::from(cost),
                    entropy: 0,
                }
            }
            Opcode::Poke(_) | Opcode::PeekPoke(_) => {
                let base_cost = match ctx.molecule_type {
                    Some(MoleculeType::Structure) => self.poke_cost_structure,
                    _ => self.poke_cost_other,
                };
                Charge {
                    energy: -i64::from(base_cost),
                    entropy: -permille(ctx.current_entropy, self.poke_dissipation_permille),
                }
            }
            Opcode::Jump(_) if ctx.target_ownership == Some(Ownership::Foreign) => Charge {
                energy: -i64::from(self.foreign_jump_penalty),
                entropy: 0,
            },
            _ => Charge::ZERO,
        };
        Charge {
            energy: base.energy + specific.energy,
            entropy: base.entropy + specific.entropy,
        }
    }

    fn error_penalty(&self) -> Charge {
        Charge {
            energy: -i64::from(self.error_penalty_cost),
            entropy: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::isa::OperandShape;

    fn ctx(opcode: Opcode, ownership: Option<Ownership>) -> CostContext {
        CostContext {
            opcode,
            target_ownership: ownership,
            molecule_type: None,
            current_energy: 100,
            current_entropy: 100,
            lost_conflict: false,
        }
    }

    #[test]
    fn peek_cost_varies_by_ownership() {
        let policy = DefaultPolicy::default();
        let self_cost = policy.cost(&ctx(Opcode::Peek(OperandShape::Register), Some(Ownership::Itself)));
        let foreign_cost = policy.cost(&ctx(
            Opcode::Peek(OperandShape::Register),
            Some(Ownership::Foreign),
        ));
        assert!(foreign_cost.energy < self_cost.energy);
    }

    #[test]
    fn poke_dissipates_entropy_proportionally() {
        let policy = DefaultPolicy::default();
        let mut context = ctx(Opcode::Poke(OperandShape::Register), None);
        context.current_entropy = 200;
        let charge = policy.cost(&context);
        assert!(charge.entropy < 0);
    }

    #[test]
    fn error_penalty_is_energy_only() {
        let policy = DefaultPolicy::default();
        let charge = policy.error_penalty();
        assert_eq!(charge.entropy, 0);
        assert!(charge.energy < 0);
    }
}
