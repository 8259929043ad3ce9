// SPDX-License-Identifier: Apache-2.0
//! Validated configuration: world shape/bit-widths, organism limits,
//! scheduler knobs, and named plugin selection (spec §6). Construction
//! fails closed — invalid configuration never reaches the scheduler.

use crate::error::ConfigurationError;
use crate::isa::neighbor_scans;
use crate::organism::OrganismLimits;

/// World shape and per-axis topology, plus the configured molecule
/// bit-widths (spec §3: `typeBits`, `valueBits`, packed into `wordBits`).
#[derive(Clone, Debug)]
pub struct WorldConfig {
    /// Axis lengths.
    pub shape: Vec<u32>,
    /// Per-axis toroidal flag.
    pub toroidal: Vec<bool>,
    /// Bits reserved for the molecule type tag.
    pub type_bits: u8,
    /// Bits reserved for the molecule value.
    pub value_bits: u8,
    /// Total bits per stored word (must be `>= type_bits + value_bits`).
    pub word_bits: u8,
}

impl WorldConfig {
    /// Validates shape consistency, bit-width consistency, and the
    /// neighbor-scan bitmask bound (spec §6).
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.shape.is_empty() || self.shape.iter().any(|&len| len == 0) {
            return Err(ConfigurationError::InvalidWorldShape(format!(
                "shape must be non-empty with every axis length > 0, got {:?}",
                self.shape
            )));
        }
        if self.toroidal.len() != self.shape.len() {
            return Err(ConfigurationError::InvalidWorldShape(format!(
                "toroidal flags ({}) must match shape dimensions ({})",
                self.toroidal.len(),
                self.shape.len()
            )));
        }
        if u16::from(self.type_bits) + u16::from(self.value_bits) > u16::from(self.word_bits) {
            return Err(ConfigurationError::InconsistentMoleculeBitWidths {
                type_bits: u32::from(self.type_bits),
                value_bits: u32::from(self.value_bits),
                word_bits: u32::from(self.word_bits),
            });
        }
        neighbor_scans::check_dimension_bound(self.shape.len())?;
        Ok(())
    }

    /// Number of world dimensions.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.shape.len()
    }
}

/// Scheduler-level knobs (spec §4.5, §6).
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Whether an Intent that lost conflict resolution still pays its
    /// instruction's energy/entropy charge (spec §6
    /// `conflictLoserChargesCost`; see the Open Question resolution in
    /// `DESIGN.md`).
    pub conflict_loser_charges_cost: bool,
    /// Worker thread count for Plan/Execute. `None` defers to
    /// [`default_worker_count`].
    pub worker_count: Option<usize>,
    /// Hard cap on live organism count; FORK fails past this bound.
    pub max_organisms: u32,
    /// Hamming-distance tolerance passed to every fuzzy-label resolution
    /// this tick (spec §4.4). A single scheduler-wide value, not a
    /// per-instruction operand.
    pub jump_tolerance: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            conflict_loser_charges_cost: false,
            worker_count: None,
            max_organisms: 100_000,
            jump_tolerance: 0,
        }
    }
}

/// Reads the `EVOCHORA_WORKERS` environment variable, falling back to
/// `std::thread::available_parallelism()` (or `1` if that query fails) —
/// grounded on `warp-core::boaw::default_worker_count`'s `ECHO_WORKERS`
/// pattern.
#[must_use]
pub fn default_worker_count() -> usize {
    std::env::var("EVOCHORA_WORKERS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|&count| count > 0)
        .unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        })
}

/// Identifies which built-in plugin implementation to install for a given
/// registry slot, resolved against a fixed set of known ids (spec §4.6:
/// plugins are configured, not dynamically loaded).
#[derive(Clone, Debug)]
pub struct PluginSelection {
    /// Resource distributor id: `"null"` or `"uniform_energy_rain"`.
    pub resource_distributor_id: String,
    /// Mutation operator id: `"null"` or `"default"`.
    pub mutation_operator_id: String,
    /// Death recycler id: `"default"`.
    pub death_recycler_id: String,
}

impl Default for PluginSelection {
    fn default() -> Self {
        Self {
            resource_distributor_id: "null".to_string(),
            mutation_operator_id: "null".to_string(),
            death_recycler_id: "default".to_string(),
        }
    }
}

impl PluginSelection {
    /// Validates every id against the known set, without constructing the
    /// plugins themselves (that happens in
    /// [`crate::plugins::PluginRegistry`]'s builder).
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        const RESOURCE_IDS: &[&str] = &["null", "uniform_energy_rain"];
        const MUTATION_IDS: &[&str] = &["null", "default"];
        const DEATH_IDS: &[&str] = &["default"];

        if !RESOURCE_IDS.contains(&self.resource_distributor_id.as_str()) {
            return Err(ConfigurationError::UnknownPluginId(
                self.resource_distributor_id.clone(),
            ));
        }
        if !MUTATION_IDS.contains(&self.mutation_operator_id.as_str()) {
            return Err(ConfigurationError::UnknownPluginId(
                self.mutation_operator_id.clone(),
            ));
        }
        if !DEATH_IDS.contains(&self.death_recycler_id.as_str()) {
            return Err(ConfigurationError::UnknownPluginId(
                self.death_recycler_id.clone(),
            ));
        }
        Ok(())
    }
}

/// Top-level, validated engine configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// World shape/topology/bit-widths.
    pub world: WorldConfig,
    /// Per-organism resource limits.
    pub organism_limits: OrganismLimits,
    /// Scheduler knobs.
    pub scheduler: SchedulerConfig,
    /// Plugin selection.
    pub plugins: PluginSelection,
    /// Master RNG seed (spec §4.5: "the scheduler owns a single seeded
    /// RNG").
    pub seed: u64,
}

impl Config {
    /// Validates every sub-configuration, failing on the first error
    /// encountered (world shape, then bit-widths, then plugin ids).
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.world.validate()?;
        self.plugins.validate()?;
        Ok(())
    }
}
