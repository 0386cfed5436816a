//! Errors raised at construction boundaries.
//!
//! Physics solvers and evolutionary operators never fail once a [`crate::world::WorldState`] or
//! [`crate::evolver::Evolver`] has been constructed successfully; every fallible operation lives
//! here.

use miette::Diagnostic;
use thiserror::Error;

/// An [`crate::evolver::EvolutionConfig`] is internally inconsistent.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// `MinSpeciesCount` exceeds `SpeciesCount`.
    #[error("min species count ({min}) exceeds species count ({max})")]
    #[diagnostic(code(xpbd_evo_kernel::config::min_species_count))]
    MinSpeciesCountExceedsSpeciesCount {
        /// Configured `MinSpeciesCount`.
        min: usize,
        /// Configured `SpeciesCount`.
        max: usize,
    },

    /// `IndividualsPerSpecies` is zero, so no population could ever exist.
    #[error("individuals per species must be at least 1")]
    #[diagnostic(code(xpbd_evo_kernel::config::zero_individuals))]
    ZeroIndividualsPerSpecies,

    /// `SpeciesCount` is zero.
    #[error("species count must be at least 1")]
    #[diagnostic(code(xpbd_evo_kernel::config::zero_species))]
    ZeroSpeciesCount,

    /// `TournamentSize` is zero.
    #[error("tournament size must be at least 1")]
    #[diagnostic(code(xpbd_evo_kernel::config::zero_tournament_size))]
    ZeroTournamentSize,

    /// `ParentPoolPercentage` outside of `(0, 1]`.
    #[error("parent pool percentage ({value}) must be within (0, 1]")]
    #[diagnostic(code(xpbd_evo_kernel::config::bad_parent_pool_percentage))]
    BadParentPoolPercentage {
        /// The offending value.
        value: f64,
    },
}

/// Building an [`crate::topology::ExecutableTopology`] from a [`crate::genome::SpeciesDef`] failed.
#[derive(Debug, Error, Diagnostic)]
pub enum TopologyError {
    /// The genome's active links contain a cycle, so no topological order exists.
    #[error("genome link graph contains a cycle ({cycle_length} node(s) never resolved)")]
    #[diagnostic(
        code(xpbd_evo_kernel::topology::cycle_detected),
        help("links must only go from a lower row id to a higher one")
    )]
    CycleDetected {
        /// Number of nodes that could not be placed in the topological order.
        cycle_length: usize,
    },

    /// A node's active in-degree exceeds its layer's `maxInDegree`.
    #[error("node {node_id} has in-degree {actual}, exceeding max in-degree {max}")]
    #[diagnostic(code(xpbd_evo_kernel::topology::max_in_degree_exceeded))]
    MaxInDegreeExceeded {
        /// Offending node id.
        node_id: usize,
        /// Actual in-degree.
        actual: usize,
        /// Configured bound.
        max: usize,
    },
}
