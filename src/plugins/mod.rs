// SPDX-License-Identifier: Apache-2.0
//! Pluggable collaborators the scheduler consults each tick: resource
//! distribution, mutation, death/recycling, instruction interception
//! (spec §4.6). All are pure functions of their declared inputs plus a
//! sub-stream of the master RNG.
//!
//! Registered the way `warp-core::EngineBuilder` registers boxed,
//! named collaborators at construction time rather than via a generic
//! plugin-loading mechanism.

pub mod death;
pub mod interception;
pub mod mutation;
pub mod resource;

use crate::coord::Coord;
use crate::ident::OrganismId;
use crate::molecule::{Marker, Molecule};

/// A single cell mutation proposed by a plugin, applied by the scheduler
/// via [`crate::world::World::force_set`] during Resource-distribution or
/// Post (spec §4.6/§4.7).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellMutation {
    /// Target coordinate.
    pub coord: Coord,
    /// Molecule to place (may be [`Molecule::EMPTY`] to clear the cell).
    pub molecule: Molecule,
    /// New owner, or [`OrganismId::UNOWNED`] to clear ownership.
    pub owner_id: OrganismId,
    /// New marker.
    pub marker: Marker,
}

/// An owned registry of boxed plugin trait objects, built once at engine
/// construction (spec §4.6). Missing slots fall back to no-op defaults so
/// the scheduler never needs to special-case an absent plugin.
pub struct PluginRegistry {
    /// Resource distribution plugin.
    pub resource_distributor: Box<dyn resource::ResourceDistributor>,
    /// Mutation operator, invoked before a forked child's genome is
    /// materialized.
    pub mutation_operator: Box<dyn mutation::MutationOperator>,
    /// Death/recycling plugin.
    pub death_recycler: Box<dyn death::DeathRecycler>,
    /// Ordered instruction-interception chain.
    pub instruction_interceptors: Vec<Box<dyn interception::InstructionInterceptor>>,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self {
            resource_distributor: Box::new(resource::NullResourceDistributor),
            mutation_operator: Box::new(mutation::NullMutationOperator),
            death_recycler: Box::new(death::DefaultDeathRecycler::default()),
            instruction_interceptors: Vec::new(),
        }
    }
}
