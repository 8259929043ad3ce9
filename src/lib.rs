// SPDX-License-Identifier: Apache-2.0
//! Evochora core: a deterministic, n-dimensional artificial-life runtime.
//!
//! This crate is the simulation engine only: an n-dimensional [`World`] of
//! typed molecules, an organism VM ([`Organism`]) executing a fixed
//! instruction set ([`isa`]), and a [`TickScheduler`] driving the
//! Plan/Resolve/Execute/Post tick cycle (spec §4.5) to a fully
//! reproducible [`ChangeSet`] per tick. It does not compile source
//! programs (that produces the [`ProgramArtifact`] this crate consumes)
//! and does not persist or visualize state beyond the change-set/receipt
//! types it emits.
//!
//! Determinism rests on three things holding simultaneously: every
//! stochastic draw goes through [`rng::Prng::substream`] keyed on
//! `(tick, organism, call_site)`, Resolve always admits conflicting writes
//! in ascending [`ident::OrganismId`] order, and Execute is single-threaded
//! so no two Intents can interleave their World mutations.

pub mod change_set;
pub mod config;
pub mod coord;
pub mod dispatch;
pub mod error;
pub mod footprint;
pub mod fuzzy;
pub mod ident;
pub mod isa;
pub mod molecule;
pub mod organism;
pub mod plugins;
pub mod policy;
pub mod program_artifact;
pub mod receipt;
pub mod rng;
pub mod scheduler;
pub mod telemetry;
pub mod world;

pub use change_set::{CellDelta, ChangeSet, ChangeSetBuilder, OrganismDelta, RngCheckpoint};
pub use config::{Config, PluginSelection, SchedulerConfig, WorldConfig};
pub use coord::{Coord, Topology};
pub use error::{ConfigurationError, EngineError, InstructionFailure};
pub use fuzzy::LabelAnchor;
pub use ident::OrganismId;
pub use molecule::{Marker, Molecule, MoleculeType};
pub use organism::{Organism, OrganismLimits};
pub use policy::{Charge, CostContext, DefaultPolicy, ThermodynamicPolicy};
pub use program_artifact::{NamedLabel, Placement, ProgramArtifact, SourceMapEntry};
pub use receipt::{TickReceipt, TickReceiptDisposition, TickReceiptEntry};
pub use rng::Prng;
pub use scheduler::{GenesisOrganism, TickScheduler};
pub use world::{Cell, Ownership, World};
