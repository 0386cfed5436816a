//! Symbolic network model: immutable topology defs, frozen-per-species subsets, and mutable
//! per-individual parameters.

pub mod def;
pub mod individual;
pub mod species;
pub mod structural;

pub use def::{Activation, BiasDef, GenomeBuilder, GenomeDef, LayerDef, LinkDef, NodeDef, WeightDef};
pub use individual::{Individual, MutationRates, WeightInitialization};
pub use species::SpeciesDef;
pub use structural::{EdgeMutationConfig, WeakEdgePruning};
