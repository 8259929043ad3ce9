// SPDX-License-Identifier: Apache-2.0
//! The tick driver: Resource-distribution, Plan, Resolve, Execute, Post
//! (spec §4.5). Owns the `World`, the live organism population, the
//! master RNG, and the configured plugins/policy/telemetry; [`TickScheduler::tick`]
//! is the only entry point a caller needs to advance the simulation by one
//! tick.
//!
//! Plan runs across worker threads (`std::thread::scope`, grounded on
//! `warp-core::boaw::exec::execute_parallel_sharded`): each organism's
//! instruction only reads shared state (`World`, `ProgramArtifact`, label
//! anchors) and mutates its own VM slot, so disjoint `&mut [Organism]`
//! chunks need no synchronization. Execute is sequential — it is the only
//! phase that mutates the shared `World`, and this crate forbids `unsafe`,
//! so there is no sound way to shard concurrent `&mut World` access.
//! Resolve admits winning Intents in ascending `organism_id` order,
//! grounded on `warp-core::tick::LegacyScheduler::reserve`'s footprint
//! admission loop.

use std::thread;

use rustc_hash::FxHashMap;

use crate::change_set::{ChangeSet, ChangeSetBuilder, OrganismDelta, RngCheckpoint};
use crate::config::{default_worker_count, Config};
use crate::coord::Coord;
use crate::dispatch::{self, PlanContext};
use crate::fuzzy::LabelAnchor;
use crate::ident::{OrganismId, OrganismIdSource};
use crate::isa::{Effect, Intent, Opcode, RegisterEffect};
use crate::molecule::Molecule;
use crate::organism::Organism;
use crate::plugins::death::Corpse;
use crate::plugins::interception::{self, InterceptionContext};
use crate::plugins::mutation;
use crate::plugins::{CellMutation, PluginRegistry};
use crate::policy::{CostContext, ThermodynamicPolicy};
use crate::program_artifact::{Placement, ProgramArtifact};
use crate::receipt::{TickReceipt, TickReceiptDisposition, TickReceiptEntry};
use crate::rng::Prng;
use crate::telemetry::TelemetrySink;
use crate::world::{Cell, Ownership, World};

const RESOURCE_CALL_SITE: u32 = 0xF000_0001;
const INTERCEPTION_CALL_SITE: u32 = 0xF000_0002;
const MUTATION_CALL_SITE: u32 = 0xF000_0003;
const DEATH_CALL_SITE: u32 = 0xF000_0004;

/// One organism to seed at genesis. The scheduler mints its id internally
/// (via [`OrganismIdSource`]) rather than accepting a pre-assigned one, so
/// callers describe intent, not identity.
#[derive(Clone, Debug)]
pub struct GenesisOrganism {
    /// Starting instruction pointer.
    pub ip: Coord,
    /// Starting direction vector.
    pub dv: Coord,
    /// Starting energy register.
    pub energy: u32,
}

/// Owns the world, the organism population, and everything a tick needs
/// to run deterministically (spec §4.5).
pub struct TickScheduler {
    world: World,
    organisms: Vec<Organism>,
    program: ProgramArtifact,
    anchors: Vec<LabelAnchor>,
    plugins: PluginRegistry,
    policy: Box<dyn ThermodynamicPolicy>,
    telemetry: Box<dyn TelemetrySink>,
    config: Config,
    id_source: OrganismIdSource,
    master_rng: Prng,
    tick: u64,
    last_receipt: Option<TickReceipt>,
}

impl TickScheduler {
    /// Validates `config`, seeds `program`'s placements into `world`, and
    /// mints ids for `genesis_organisms` in order.
    ///
    /// # Errors
    /// Returns the first [`crate::error::ConfigurationError`] encountered,
    /// including a placement collision between two program placements.
    pub fn new(
        config: Config,
        program: ProgramArtifact,
        mut world: World,
        genesis_organisms: Vec<GenesisOrganism>,
        plugins: PluginRegistry,
        policy: Box<dyn ThermodynamicPolicy>,
        telemetry: Box<dyn TelemetrySink>,
    ) -> Result<Self, crate::error::ConfigurationError> {
        config.validate()?;

        for placement in &program.placements {
            let outcome = world
                .write_empty(
                    &placement.coord,
                    placement.molecule,
                    OrganismId::UNOWNED,
                    crate::molecule::Marker::ZERO,
                )
                .map_err(|_| {
                    crate::error::ConfigurationError::InvalidWorldShape(format!(
                        "program placement at {:?} is out of range",
                        placement.coord
                    ))
                })?;
            if outcome.is_err() {
                return Err(crate::error::ConfigurationError::InvalidWorldShape(format!(
                    "program placement collision at {:?}",
                    placement.coord
                )));
            }
        }

        let mut id_source = OrganismIdSource::new();
        let organisms = genesis_organisms
            .into_iter()
            .map(|spec| {
                Organism::genesis(
                    id_source.next(),
                    spec.ip,
                    spec.dv,
                    spec.energy,
                    0,
                    &config.organism_limits,
                )
            })
            .collect();

        let anchors = program.all_anchors();
        let master_rng = Prng::from_seed_u64(config.seed);

        Ok(Self {
            world,
            organisms,
            program,
            anchors,
            plugins,
            policy,
            telemetry,
            config,
            id_source,
            master_rng,
            tick: 0,
            last_receipt: None,
        })
    }

    /// Current tick counter (the tick [`TickScheduler::tick`] will run
    /// next).
    #[must_use]
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// The world, read-only.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// The live organism population, read-only.
    #[must_use]
    pub fn organisms(&self) -> &[Organism] {
        &self.organisms
    }

    /// The previous tick's receipt, if at least one tick has run.
    #[must_use]
    pub fn last_receipt(&self) -> Option<&TickReceipt> {
        self.last_receipt.as_ref()
    }

    fn alive_organism_count(&self) -> usize {
        self.organisms.iter().filter(|o| !o.is_dead).count()
    }

    /// Runs one full Plan/Resolve/Execute/Post pass and returns the
    /// resulting change-set (spec §4.5, §4.7).
    pub fn tick(&mut self) -> ChangeSet {
        let tick = self.tick;
        let mut builder = ChangeSetBuilder::new();

        self.run_resource_distribution(&mut builder, tick);

        let mut planned = self.run_plan_phase(tick);
        planned.sort_by_key(|p| p.organism_id);
        let decisions = Self::run_resolve_phase(&planned);
        let entries = self.run_execute_phase(&mut builder, tick, &planned, &decisions);
        self.run_post_phase(&mut builder, tick);

        self.last_receipt = Some(TickReceipt::new(tick, entries));

        let checkpoint = RngCheckpoint {
            state: self.master_rng.state(),
        };
        let change_set = builder.finish(tick, checkpoint);
        self.telemetry
            .tick_completed(tick, &change_set.digest(), self.alive_organism_count());
        self.tick += 1;
        change_set
    }

    fn run_resource_distribution(&mut self, builder: &mut ChangeSetBuilder, tick: u64) {
        let mut rng = self
            .master_rng
            .substream(tick, OrganismId::UNOWNED, RESOURCE_CALL_SITE);
        let mutations = self
            .plugins
            .resource_distributor
            .distribute(&self.world, tick, &mut rng);
        for mutation in mutations {
            self.apply_cell_mutation(builder, mutation);
        }
    }

    fn run_plan_phase(&mut self, tick: u64) -> Vec<PlannedOrganism> {
        let worker_count = self
            .config
            .scheduler
            .worker_count
            .unwrap_or_else(default_worker_count)
            .max(1);
        let organism_count = self.organisms.len();
        let chunk_size = organism_count.div_ceil(worker_count).max(1);

        let policy: &dyn ThermodynamicPolicy = self.policy.as_ref();
        let ctx = PlanWorkerContext {
            world: &self.world,
            program: &self.program,
            anchors: self.anchors.as_slice(),
            master_rng: &self.master_rng,
            tick,
            jump_tolerance: self.config.scheduler.jump_tolerance,
            policy,
            max_energy: self.config.organism_limits.max_energy,
        };

        let chunked: Vec<Vec<PlannedOrganism>> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .organisms
                .chunks_mut(chunk_size)
                .enumerate()
                .map(|(chunk_index, chunk)| {
                    let base_index = chunk_index * chunk_size;
                    scope.spawn(move || {
                        chunk
                            .iter_mut()
                            .enumerate()
                            .map(|(offset, organism)| {
                                let organism_id = organism.id;
                                let outcome = plan_one(organism, &ctx);
                                PlannedOrganism {
                                    index: base_index + offset,
                                    organism_id,
                                    outcome,
                                }
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().unwrap_or_else(|_| Vec::new()))
                .collect()
        });

        chunked.into_iter().flatten().collect()
    }

    fn run_resolve_phase(planned: &[PlannedOrganism]) -> FxHashMap<usize, ResolveDecision> {
        let mut ready: Vec<&PlannedOrganism> = planned
            .iter()
            .filter(|p| matches!(p.outcome, PlanOutcome::Ready { .. }))
            .collect();
        ready.sort_by_key(|p| p.organism_id);

        let mut committed = crate::footprint::Footprint::empty();
        let mut decisions = FxHashMap::default();
        for candidate in ready {
            let footprint = match &candidate.outcome {
                PlanOutcome::Ready { intent, .. } => &intent.footprint,
                PlanOutcome::Skipped | PlanOutcome::Failed => continue,
            };
            if committed.independent(footprint) {
                for coord in footprint.read.iter() {
                    committed.read.insert(coord.clone());
                }
                for coord in footprint.write.iter() {
                    committed.write.insert(coord.clone());
                }
                decisions.insert(candidate.index, ResolveDecision::Win);
            } else {
                decisions.insert(candidate.index, ResolveDecision::Loss);
            }
        }
        decisions
    }

    fn run_execute_phase(
        &mut self,
        builder: &mut ChangeSetBuilder,
        tick: u64,
        planned: &[PlannedOrganism],
        decisions: &FxHashMap<usize, ResolveDecision>,
    ) -> Vec<TickReceiptEntry> {
        let max_energy = self.config.organism_limits.max_energy;
        let mut entries = Vec::with_capacity(planned.len());

        for entry in planned {
            match &entry.outcome {
                PlanOutcome::Skipped => {
                    entries.push(TickReceiptEntry {
                        organism_id: entry.organism_id,
                        disposition: TickReceiptDisposition::Skipped,
                    });
                }
                PlanOutcome::Failed => {
                    entries.push(TickReceiptEntry {
                        organism_id: entry.organism_id,
                        disposition: TickReceiptDisposition::InstructionFailed,
                    });
                }
                PlanOutcome::Ready { intent, cost_ctx } => {
                    let decision = decisions
                        .get(&entry.index)
                        .copied()
                        .unwrap_or(ResolveDecision::Loss);
                    match decision {
                        ResolveDecision::Win => {
                            let disposition = self.execute_win(
                                builder,
                                tick,
                                entry.organism_id,
                                entry.index,
                                intent,
                                cost_ctx,
                                max_energy,
                            );
                            entries.push(TickReceiptEntry {
                                organism_id: entry.organism_id,
                                disposition,
                            });
                        }
                        ResolveDecision::Loss => {
                            if self.config.scheduler.conflict_loser_charges_cost {
                                let mut ctx = *cost_ctx;
                                ctx.lost_conflict = true;
                                let charge = self.policy.cost(&ctx);
                                self.organisms[entry.index]
                                    .apply_charge(charge.energy, charge.entropy, max_energy);
                            }
                            self.telemetry
                                .conflict_lost(tick, entry.organism_id.0, "conflict");
                            entries.push(TickReceiptEntry {
                                organism_id: entry.organism_id,
                                disposition: TickReceiptDisposition::ConflictLost,
                            });
                        }
                    }
                }
            }
        }
        entries
    }

    #[allow(clippy::too_many_arguments)]
    fn execute_win(
        &mut self,
        builder: &mut ChangeSetBuilder,
        tick: u64,
        organism_id: OrganismId,
        index: usize,
        intent: &Intent,
        cost_ctx: &CostContext,
        max_energy: u32,
    ) -> TickReceiptDisposition {
        let is_fork = matches!(intent.effect, Effect::Fork { .. });
        if is_fork && self.alive_organism_count() >= self.config.scheduler.max_organisms as usize {
            let charge = self.policy.error_penalty();
            self.organisms[index].apply_charge(charge.energy, charge.entropy, max_energy);
            return TickReceiptDisposition::InstructionFailed;
        }

        if let Some(register_effect) = &intent.register_effect {
            if crate::isa::data_movement::apply(&mut self.organisms[index], register_effect).is_err() {
                let charge = self.policy.error_penalty();
                self.organisms[index].apply_charge(charge.energy, charge.entropy, max_energy);
                return TickReceiptDisposition::InstructionFailed;
            }
        }

        self.organisms[index].apply_charge(intent.energy_delta, intent.entropy_delta, max_energy);
        let charge = self.policy.cost(cost_ctx);
        self.organisms[index].apply_charge(charge.energy, charge.entropy, max_energy);

        let intercept_ctx = InterceptionContext { tick, organism_id };
        let mut rng = self
            .master_rng
            .substream(tick, organism_id, INTERCEPTION_CALL_SITE);
        let effect = interception::run_chain(
            &self.plugins.instruction_interceptors,
            &intercept_ctx,
            intent.effect.clone(),
            &mut rng,
        );
        if let Some(effect) = effect {
            self.commit_effect(builder, tick, organism_id, effect);
        }
        TickReceiptDisposition::Executed
    }

    fn commit_effect(
        &mut self,
        builder: &mut ChangeSetBuilder,
        tick: u64,
        organism_id: OrganismId,
        effect: Effect,
    ) {
        match effect {
            Effect::None => {}
            Effect::Consume { coord } => {
                if let Ok(before) = self.world.cell_at(&coord) {
                    if let Ok(Ok(_)) = self.world.consume(&coord, organism_id) {
                        builder.record_cell(crate::change_set::CellDelta {
                            coord,
                            old_molecule: before.molecule,
                            new_molecule: Molecule::EMPTY,
                            old_owner: before.owner_id,
                            new_owner: OrganismId::UNOWNED,
                            old_marker: before.marker,
                            new_marker: crate::molecule::Marker::ZERO,
                        });
                    }
                }
            }
            Effect::WriteOwned {
                coord,
                molecule,
                marker,
            } => {
                if let Ok(before) = self.world.cell_at(&coord) {
                    let wrote = self
                        .world
                        .write_empty(&coord, molecule, organism_id, marker)
                        .map(|r| r.is_ok())
                        .unwrap_or(false);
                    if wrote {
                        builder.record_cell(crate::change_set::CellDelta {
                            coord,
                            old_molecule: before.molecule,
                            new_molecule: molecule,
                            old_owner: before.owner_id,
                            new_owner: organism_id,
                            old_marker: before.marker,
                            new_marker: marker,
                        });
                    }
                }
            }
            Effect::Swap {
                coord,
                molecule,
                marker,
            } => {
                if let Ok(before) = self.world.cell_at(&coord) {
                    if self.world.swap(&coord, molecule, organism_id, marker).is_ok() {
                        builder.record_cell(crate::change_set::CellDelta {
                            coord,
                            old_molecule: before.molecule,
                            new_molecule: molecule,
                            old_owner: before.owner_id,
                            new_owner: organism_id,
                            old_marker: before.marker,
                            new_marker: marker,
                        });
                    }
                }
            }
            Effect::Fork {
                child_dp,
                energy,
                child_dv,
            } => {
                self.commit_fork(builder, tick, organism_id, child_dp, energy, child_dv);
            }
        }
    }

    /// Spawns `parent_id`'s child and transfers ownership of every cell
    /// the parent owns carrying its current marker, in place (spec §4.2:
    /// a pure ownership/marker flip at the same coordinates, not a
    /// spatial relocation). Cells the mutation operator's output drops
    /// (its list shortens) are released to empty rather than transferred;
    /// any growth in the mutated list beyond the transferred count has no
    /// in-place target and is dropped.
    fn commit_fork(
        &mut self,
        builder: &mut ChangeSetBuilder,
        tick: u64,
        parent_id: OrganismId,
        child_dp: Coord,
        energy: u32,
        child_dv: Coord,
    ) {
        let Some(parent_marker) = self
            .organisms
            .iter()
            .find(|o| o.id == parent_id)
            .map(|o| o.marker_reg)
        else {
            return;
        };

        let child_id = self.id_source.next();
        let child = Organism::genesis(
            child_id,
            child_dp.clone(),
            child_dv,
            energy,
            tick,
            &self.config.organism_limits,
        );

        let transferred: Vec<(Coord, Molecule)> = self
            .world
            .iter()
            .filter(|(_, cell)| cell.owner_id == parent_id && cell.marker == parent_marker)
            .map(|(index, cell)| (self.world.topology().coord_at(index), cell.molecule))
            .collect();

        if !transferred.is_empty() {
            let placements: Vec<Placement> = transferred
                .iter()
                .map(|(coord, molecule)| Placement {
                    coord: coord.clone(),
                    molecule: *molecule,
                })
                .collect();
            let mut mutation_rng = self.master_rng.substream(tick, child_id, MUTATION_CALL_SITE);
            let mutated = self.plugins.mutation_operator.mutate(&placements, &mut mutation_rng);
            let mask = mutation::derive_namespace_mask(&mut mutation_rng);

            let mut rewritten_anchors = Vec::new();
            for (position, (coord, _)) in transferred.iter().enumerate() {
                let new_cell = match mutated.get(position) {
                    Some(placement) => Cell {
                        molecule: placement.molecule,
                        owner_id: child_id,
                        marker: crate::molecule::Marker::ZERO,
                    },
                    None => Cell::EMPTY,
                };
                if let Ok(previous) = self.world.force_set(coord, new_cell) {
                    builder.record_cell(crate::change_set::CellDelta {
                        coord: coord.clone(),
                        old_molecule: previous.molecule,
                        new_molecule: new_cell.molecule,
                        old_owner: previous.owner_id,
                        new_owner: new_cell.owner_id,
                        old_marker: previous.marker,
                        new_marker: new_cell.marker,
                    });
                }
                if mutated.get(position).is_some() {
                    for anchor in &self.anchors {
                        if anchor.coord == *coord && anchor.owner == parent_id {
                            rewritten_anchors.push(LabelAnchor {
                                coord: coord.clone(),
                                bit_pattern: anchor.bit_pattern ^ mask,
                                namespace_mask: anchor.namespace_mask,
                                owner: child_id,
                            });
                        }
                    }
                }
            }
            self.anchors.extend(rewritten_anchors);
        }

        self.organisms.push(child);
        builder.record_organism(OrganismDelta::Born {
            organism_id: child_id,
            parent_id,
            ip: child_dp,
            energy,
        });
    }

    fn apply_cell_mutation(&mut self, builder: &mut ChangeSetBuilder, mutation: CellMutation) {
        let new_cell = Cell {
            molecule: mutation.molecule,
            owner_id: mutation.owner_id,
            marker: mutation.marker,
        };
        if let Ok(previous) = self.world.force_set(&mutation.coord, new_cell) {
            builder.record_cell(crate::change_set::CellDelta {
                coord: mutation.coord,
                old_molecule: previous.molecule,
                new_molecule: new_cell.molecule,
                old_owner: previous.owner_id,
                new_owner: new_cell.owner_id,
                old_marker: previous.marker,
                new_marker: new_cell.marker,
            });
        }
    }

    fn run_post_phase(&mut self, builder: &mut ChangeSetBuilder, tick: u64) {
        let max_entropy = self.config.organism_limits.max_entropy;
        let mut newly_dead = Vec::new();
        for organism in &mut self.organisms {
            if organism.is_dead {
                continue;
            }
            if organism.should_die(max_entropy) {
                organism.is_dead = true;
                newly_dead.push(organism.id);
            }
        }

        for organism_id in newly_dead {
            builder.record_organism(OrganismDelta::Died { organism_id });
            self.telemetry
                .organism_died(tick, organism_id.0, "thermodynamic");

            let owned_cells: Vec<(Coord, Molecule)> = self
                .world
                .iter()
                .filter(|(_, cell)| cell.owner_id == organism_id)
                .map(|(index, cell)| (self.world.topology().coord_at(index), cell.molecule))
                .collect();
            if owned_cells.is_empty() {
                continue;
            }
            let corpse = Corpse {
                organism_id,
                owned_cells,
            };
            let mut rng = self.master_rng.substream(tick, organism_id, DEATH_CALL_SITE);
            let mutations = self.plugins.death_recycler.recycle(&corpse, &mut rng);
            for mutation in mutations {
                self.apply_cell_mutation(builder, mutation);
            }
        }

        for organism in &self.organisms {
            if organism.is_dead || organism.birth_tick == tick {
                continue;
            }
            builder.record_organism(OrganismDelta::Survived {
                organism_id: organism.id,
                ip: organism.ip.clone(),
                energy: organism.energy,
                entropy: organism.entropy,
            });
        }
    }
}

/// Shared, read-only inputs every Plan-phase worker needs. `Copy` so each
/// spawned chunk can hold its own copy without fighting over a shared
/// reference's lifetime.
#[derive(Clone, Copy)]
struct PlanWorkerContext<'a> {
    world: &'a World,
    program: &'a ProgramArtifact,
    anchors: &'a [LabelAnchor],
    master_rng: &'a Prng,
    tick: u64,
    jump_tolerance: u32,
    policy: &'a dyn ThermodynamicPolicy,
    max_energy: u32,
}

struct PlannedOrganism {
    index: usize,
    organism_id: OrganismId,
    outcome: PlanOutcome,
}

enum PlanOutcome {
    /// The organism was already dead at the start of this tick.
    Skipped,
    /// Fetch, decode, or operand resolution failed.
    Failed,
    /// An Intent was produced and is ready for Resolve.
    Ready { intent: Intent, cost_ctx: CostContext },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ResolveDecision {
    Win,
    Loss,
}

/// Plans one organism's instruction: fetch/decode/resolve-operands,
/// advances `ip`, and prices the resulting Intent. Never mutates the
/// organism's registers/stacks — the Intent's `register_effect` is only
/// applied in `execute_win`, once Resolve has confirmed this organism
/// won, so a conflict loser never observes any state change. Runs inside
/// a Plan-phase worker thread against an immutable
/// `World`/`ProgramArtifact`/anchor table.
fn plan_one(organism: &mut Organism, ctx: &PlanWorkerContext) -> PlanOutcome {
    if organism.is_dead {
        return PlanOutcome::Skipped;
    }

    let plan_ctx = PlanContext {
        tick: ctx.tick,
        jump_tolerance: ctx.jump_tolerance,
        anchors: ctx.anchors,
        master_rng: ctx.master_rng,
    };
    let original_ip = organism.ip.clone();
    let dv = organism.dv.clone();

    let intent = match dispatch::plan(organism, ctx.world, ctx.program, &plan_ctx) {
        Ok(intent) => intent,
        Err(_failure) => return fail_plan(organism, &original_ip, &dv, ctx),
    };

    let opcode = match ctx
        .world
        .at(&original_ip)
        .and_then(|molecule| dispatch::decode_opcode(molecule.value))
    {
        Ok(opcode) => opcode,
        Err(_) => return fail_plan(organism, &original_ip, &dv, ctx),
    };

    let skip_ip_advance = matches!(
        intent.register_effect,
        Some(RegisterEffect::PopCall) | Some(RegisterEffect::SkipNext)
    );
    if !skip_ip_advance {
        organism.ip = organism.ip.add(&intent.ip_advance);
    }

    let target_ownership = target_ownership_for(&intent, opcode, ctx.world, organism.id);
    let molecule_type = molecule_type_for(&intent.effect);

    let cost_ctx = CostContext {
        opcode,
        target_ownership,
        molecule_type,
        current_energy: organism.energy,
        current_entropy: organism.entropy,
        lost_conflict: false,
    };

    PlanOutcome::Ready { intent, cost_ctx }
}

fn fail_plan(organism: &mut Organism, original_ip: &Coord, dv: &Coord, ctx: &PlanWorkerContext) -> PlanOutcome {
    let charge = ctx.policy.error_penalty();
    organism.apply_charge(charge.energy, charge.entropy, ctx.max_energy);
    organism.ip = original_ip.add(dv);
    PlanOutcome::Failed
}

/// Derives [`CostContext::target_ownership`] from the Intent's own
/// footprint: a single-write footprint targets that cell; a `Jump` with a
/// single-coordinate read footprint targets its resolved anchor (spec
/// §4.4's foreign-jump penalty). Any other shape has no single target.
fn target_ownership_for(
    intent: &Intent,
    opcode: Opcode,
    world: &World,
    organism_id: OrganismId,
) -> Option<Ownership> {
    if intent.footprint.write.len() == 1 {
        let coord = intent.footprint.write.iter().next()?;
        return world.classify_ownership(coord, organism_id).ok();
    }
    if matches!(opcode, Opcode::Jump(_)) && intent.footprint.read.len() == 1 {
        let coord = intent.footprint.read.iter().next()?;
        return world.classify_ownership(coord, organism_id).ok();
    }
    None
}

/// Derives [`CostContext::molecule_type`] from the Intent's effect: the
/// molecule a `WriteOwned`/`Swap` is about to write. Other effects have
/// no molecule type to price against.
fn molecule_type_for(effect: &Effect) -> Option<crate::molecule::MoleculeType> {
    match effect {
        Effect::WriteOwned { molecule, .. } | Effect::Swap { molecule, .. } => Some(molecule.ty),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PluginSelection, SchedulerConfig, WorldConfig};
    use crate::coord::Topology;
    use crate::isa::Opcode as IsaOpcode;
    use crate::isa::OperandShape;
    use crate::molecule::Marker;
    use crate::organism::OrganismLimits;
    use crate::policy::Charge;
    use crate::telemetry::NullTelemetrySink;

    /// A fixed-charge policy reproducing the PEEK energy-arithmetic
    /// scenario's numbers exactly: every instruction costs 1 energy, every
    /// error costs 4.
    #[derive(Clone, Copy, Debug)]
    struct FixedCostPolicy;

    impl ThermodynamicPolicy for FixedCostPolicy {
        fn cost(&self, _ctx: &CostContext) -> Charge {
            Charge {
                energy: -1,
                entropy: 0,
            }
        }

        fn error_penalty(&self) -> Charge {
            Charge {
                energy: -4,
                entropy: 0,
            }
        }
    }

    fn limits() -> OrganismLimits {
        OrganismLimits {
            max_energy: 1000,
            max_entropy: 100,
            data_stack_size: 8,
            call_stack_size: 8,
            location_stack_size: 8,
            dp_count: 1,
        }
    }

    fn base_config() -> Config {
        Config {
            world: WorldConfig {
                shape: vec![16, 16],
                toroidal: vec![true, true],
                type_bits: 2,
                value_bits: 58,
                word_bits: 64,
            },
            organism_limits: limits(),
            scheduler: SchedulerConfig {
                worker_count: Some(1),
                ..SchedulerConfig::default()
            },
            plugins: PluginSelection::default(),
            seed: 7,
        }
    }

    fn scheduler_with(
        genesis: Vec<GenesisOrganism>,
        placements: Vec<Placement>,
        policy: Box<dyn ThermodynamicPolicy>,
    ) -> TickScheduler {
        let program = ProgramArtifact {
            placements,
            labels: vec![],
            source_map: None,
        };
        let world = World::new(Topology {
            shape: vec![16, 16],
            toroidal: vec![true, true],
        });
        TickScheduler::new(
            base_config(),
            program,
            world,
            genesis,
            PluginRegistry::default(),
            policy,
            Box::new(NullTelemetrySink),
        )
        .unwrap()
    }

    /// PEEK (stack-operand form) targets `dp + dv`. With `dp == ip` at
    /// genesis, the opcode cell is `ip`, the target is `ip + dv`; using
    /// the stack operand shape avoids also consuming `ip + dv` as an
    /// operand-immediate cell, so PEEK's target cell is the only cell
    /// touched besides the opcode itself.
    fn peek_stack_opcode() -> i64 {
        5000 + shape_index(OperandShape::Stack)
    }

    fn shape_index(shape: OperandShape) -> i64 {
        match shape {
            OperandShape::Register => 0,
            OperandShape::Immediate => 1,
            OperandShape::Stack => 2,
        }
    }

    #[test]
    fn peek_energy_arithmetic_matches_fixed_policy() {
        let ip = Coord(vec![0, 0]);
        let dv = Coord(vec![1, 0]);
        let target = ip.add(&dv);
        let placements = vec![
            Placement {
                coord: ip.clone(),
                molecule: Molecule::code(peek_stack_opcode()),
            },
            Placement {
                coord: target,
                molecule: Molecule::energy(25),
            },
        ];
        let genesis = vec![GenesisOrganism {
            ip,
            dv,
            energy: 50,
        }];
        let mut scheduler = scheduler_with(genesis, placements, Box::new(FixedCostPolicy));
        // PEEK pops its destination register index from the data stack;
        // pre-load it so Plan's operand resolution succeeds.
        scheduler.organisms[0]
            .data_stack
            .push(crate::organism::RegisterValue::Scalar(Molecule::data(0)))
            .unwrap();

        scheduler.tick();

        let organism = &scheduler.organisms()[0];
        // 50 (start) + 25 (PEEK energy gain) - 1 (FixedCostPolicy charge) = 74.
        assert_eq!(organism.energy, 74);
    }

    /// Two organisms both target the same POKE cell via a stack operand;
    /// the lower-id organism must win (ascending admission order, spec
    /// §4.5) and the higher-id organism must lose the conflict.
    #[test]
    fn ascending_organism_id_wins_write_conflict() {
        // Both organisms' POKE targets resolve to the same cell, (1, 0):
        // A sits at (0,0) moving +x, B sits at (2,0) moving -x.
        let ip_a = Coord(vec![0, 0]);
        let ip_b = Coord(vec![2, 0]);
        let dv_a = Coord(vec![1, 0]);
        let dv_b = Coord(vec![-1, 0]);
        let poke_opcode = 5200 + shape_index(OperandShape::Stack);
        let placements = vec![
            Placement {
                coord: ip_a.clone(),
                molecule: Molecule::code(poke_opcode),
            },
            Placement {
                coord: ip_b.clone(),
                molecule: Molecule::code(poke_opcode),
            },
        ];
        let genesis = vec![
            GenesisOrganism {
                ip: ip_a,
                dv: dv_a,
                energy: 100,
            },
            GenesisOrganism {
                ip: ip_b,
                dv: dv_b,
                energy: 100,
            },
        ];
        let mut scheduler = scheduler_with(genesis, placements, Box::new(FixedCostPolicy));
        for organism in &mut scheduler.organisms {
            organism
                .data_stack
                .push(crate::organism::RegisterValue::Scalar(Molecule::data(7)))
                .unwrap();
        }

        scheduler.tick();

        let receipt = scheduler.last_receipt().unwrap();
        let entries = receipt.entries();
        assert_eq!(entries[0].disposition, TickReceiptDisposition::Executed);
        assert_eq!(entries[1].disposition, TickReceiptDisposition::ConflictLost);
    }

    #[test]
    fn dead_organism_is_skipped() {
        let ip = Coord(vec![0, 0]);
        let dv = Coord(vec![1, 0]);
        let placements = vec![Placement {
            coord: ip.clone(),
            molecule: Molecule::code(0),
        }];
        let genesis = vec![GenesisOrganism {
            ip,
            dv,
            energy: 10,
        }];
        let mut scheduler = scheduler_with(genesis, placements, Box::new(FixedCostPolicy));
        scheduler.organisms[0].is_dead = true;

        scheduler.tick();

        let receipt = scheduler.last_receipt().unwrap();
        assert_eq!(receipt.entries()[0].disposition, TickReceiptDisposition::Skipped);
    }

    #[test]
    fn thermodynamic_death_recycles_owned_cells() {
        let ip = Coord(vec![0, 0]);
        let dv = Coord(vec![1, 0]);
        let placements = vec![Placement {
            coord: ip.clone(),
            molecule: Molecule::code(0),
        }];
        let genesis = vec![GenesisOrganism {
            ip: ip.clone(),
            dv,
            energy: 0,
        }];
        let mut scheduler = scheduler_with(genesis, placements, Box::new(FixedCostPolicy));
        scheduler
            .world
            .force_set(
                &ip,
                Cell {
                    molecule: Molecule::structure(10),
                    owner_id: scheduler.organisms[0].id,
                    marker: Marker::new(3),
                },
            )
            .unwrap();

        scheduler.tick();

        assert!(scheduler.organisms()[0].is_dead);
        let cell = scheduler.world().cell_at(&ip).unwrap();
        assert_eq!(cell.owner_id, OrganismId::UNOWNED);
        assert_eq!(cell.molecule.ty, crate::molecule::MoleculeType::Energy);
    }

    #[test]
    fn fork_transfers_marked_cells_in_place() {
        let parent_ip = Coord(vec![0, 0]);
        let dv = Coord(vec![1, 0]);
        let fork_opcode = 7300 + shape_index(OperandShape::Stack);
        let placements = vec![Placement {
            coord: parent_ip.clone(),
            molecule: Molecule::code(fork_opcode),
        }];
        let genesis = vec![GenesisOrganism {
            ip: parent_ip.clone(),
            dv,
            energy: 50,
        }];
        let mut scheduler = scheduler_with(genesis, placements, Box::new(FixedCostPolicy));
        let parent_id = scheduler.organisms[0].id;
        scheduler.organisms[0].marker_reg = Marker::new(5);
        scheduler.organisms[0]
            .data_stack
            .push(crate::organism::RegisterValue::Scalar(Molecule::data(0)))
            .unwrap();
        let marked_coord = Coord(vec![5, 5]);
        scheduler
            .world
            .force_set(
                &marked_coord,
                Cell {
                    molecule: Molecule::structure(9),
                    owner_id: parent_id,
                    marker: Marker::new(5),
                },
            )
            .unwrap();

        scheduler.tick();

        let cell = scheduler.world().cell_at(&marked_coord).unwrap();
        assert_ne!(cell.owner_id, parent_id);
        assert!(!cell.owner_id.is_unowned());
        assert_eq!(cell.marker, Marker::ZERO);
        assert_eq!(scheduler.organisms().len(), 2);
    }

    #[test]
    fn target_ownership_for_single_write_footprint() {
        let world = World::new(Topology {
            shape: vec![4, 4],
            toroidal: vec![true, true],
        });
        let mut write = crate::footprint::CoordSet::new();
        write.insert(Coord(vec![1, 1]));
        let intent = Intent {
            footprint: crate::footprint::Footprint {
                read: crate::footprint::CoordSet::new(),
                write,
            },
            energy_delta: 0,
            entropy_delta: 0,
            effect: Effect::None,
            register_effect: None,
            ip_advance: Coord(vec![1, 0]),
        };
        let ownership = target_ownership_for(
            &intent,
            IsaOpcode::Poke(OperandShape::Stack),
            &world,
            OrganismId(1),
        );
        assert_eq!(ownership, Some(Ownership::Unowned));
    }
}
