//! Per-individual mutable parameters: weights, biases, activation choices, and link on/off state.
//!
//! A species fixes *which* links/weights/nodes exist; an [`Individual`] fixes their *values*.
//! Mutation never changes a species's topology except through the explicit edge-structural
//! operators, which are applied to a clone of the parent's [`SpeciesDef`] when reseeding, not to
//! an existing species in place.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use super::def::{Activation, GenomeDef};
use super::species::SpeciesDef;

/// Per-weight value, keyed by `WeightDef::id`.
pub type WeightId = usize;
/// Per-bias value, keyed by `BiasDef::id`.
pub type BiasId = usize;
/// Per-node activation choice, keyed by `NodeDef::id`.
pub type NodeId = usize;
/// Per-link on/off flag, keyed by `LinkDef::id`.
pub type LinkId = usize;

/// How fresh weights are sampled by [`Individual::random`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeightInitialization {
    /// Uniform in `[-bound, bound]` with `bound = sqrt(6 / (fan_in + fan_out))`, fan-in/fan-out
    /// taken from the link's endpoints' actual active degree in the species (not the base
    /// genome), so a pruned or reseeded topology still gets a bound sized to what's really
    /// connected.
    GlorotUniform,
}

/// Probabilities and magnitudes governing parameter-level mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MutationRates {
    pub weight_jitter: f64,
    pub weight_jitter_stddev: f64,
    pub weight_reset: f64,
    pub weight_l1_shrink: f64,
    pub weight_l1_shrink_factor: f64,
    pub activation_swap: f64,
    pub bias_jitter: f64,
    pub bias_jitter_stddev: f64,
    pub node_param_jitter: f64,
}

impl Default for MutationRates {
    fn default() -> Self {
        Self {
            weight_jitter: 0.1,
            weight_jitter_stddev: 0.1,
            weight_reset: 0.01,
            weight_l1_shrink: 0.01,
            weight_l1_shrink_factor: 0.9,
            activation_swap: 0.01,
            bias_jitter: 0.1,
            bias_jitter_stddev: 0.1,
            node_param_jitter: 0.01,
        }
    }
}

/// One genome instance: a value for every active weight/bias/link/node the individual's species
/// defines, plus fitness bookkeeping.
#[derive(Debug, Clone)]
pub struct Individual {
    pub weights: HashMap<WeightId, f64>,
    pub biases: HashMap<BiasId, f64>,
    pub activations: HashMap<NodeId, Activation>,
    pub links: HashMap<LinkId, bool>,
    pub fitness: Option<f64>,
}

impl Individual {
    /// Build a fresh individual for `species`, sampling every weight per `initialization` (bound
    /// derived from the weight's own link's actual fan-in/fan-out within `species`), biases
    /// uniformly in `[-1, 1]`, and each node's activation uniformly from its allowed set.
    pub fn random(
        genome: &GenomeDef,
        species: &SpeciesDef,
        initialization: WeightInitialization,
        rng: &mut fastrand::Rng,
    ) -> Self {
        let mut weights = HashMap::new();
        for &weight_id in species.active_weights() {
            let link = genome.link(genome.weight(weight_id).link_id);
            let bound = match initialization {
                WeightInitialization::GlorotUniform => {
                    let fan_in = species.in_degree(link.target_node_index, genome).max(1);
                    let fan_out = species.out_degree(link.source_node_index, genome).max(1);
                    (6.0 / (fan_in + fan_out) as f64).sqrt()
                }
            };
            weights.insert(weight_id, (rng.f64() * 2.0 - 1.0) * bound);
        }

        let mut biases = HashMap::new();
        for bias in genome.biases() {
            biases.insert(bias.id, rng.f64() * 2.0 - 1.0);
        }

        let mut activations = HashMap::new();
        for node in genome.nodes() {
            let choice = node.allowed_activations[rng.usize(..node.allowed_activations.len())];
            activations.insert(node.id, choice);
        }

        let mut links = HashMap::new();
        for link in genome.links() {
            links.insert(link.id, species.is_link_active(link.id));
        }

        Self {
            weights,
            biases,
            activations,
            links,
            fitness: None,
        }
    }

    /// Apply every parameter-level mutation operator once, each gated by its own probability in
    /// `rates`. Structural (edge) mutation is not part of this pass; see [`crate::evolver`].
    pub fn mutate(&mut self, genome: &GenomeDef, rates: &MutationRates, rng: &mut fastrand::Rng) {
        for (&id, value) in self.weights.iter_mut() {
            if rng.f64() < rates.weight_reset {
                *value = rng.f64() * 2.0 - 1.0;
                continue;
            }
            if rng.f64() < rates.weight_l1_shrink {
                *value *= rates.weight_l1_shrink_factor;
            }
            if rng.f64() < rates.weight_jitter {
                *value += gaussian(rng) * rates.weight_jitter_stddev * value.abs();
            }
            let _ = id;
        }

        for value in self.biases.values_mut() {
            if rng.f64() < rates.bias_jitter {
                *value += gaussian(rng) * rates.bias_jitter_stddev;
            }
        }

        for node in genome.nodes() {
            if node.is_fixed() {
                continue;
            }
            if rng.f64() < rates.activation_swap {
                if let Some(choice) = self.activations.get_mut(&node.id) {
                    *choice = node.allowed_activations[rng.usize(..node.allowed_activations.len())];
                }
            }
        }

        if rates.node_param_jitter > 0.0 && rng.f64() < rates.node_param_jitter {
            // Reserved for per-node continuous parameters beyond activation choice; this kernel's
            // node defs carry none yet, so the rate exists but has nothing further to perturb.
        }
    }

    /// A deep copy suitable as reproduction offspring before mutation.
    pub fn clone_for_reproduction(&self) -> Self {
        self.clone()
    }
}

/// Sample a standard-normal value from two uniform draws via the Box-Muller transform.
pub(crate) fn gaussian(rng: &mut fastrand::Rng) -> f64 {
    let u1 = rng.f64().max(f64::EPSILON);
    let u2 = rng.f64();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::def::{GenomeBuilder, LayerDef};

    fn genome_and_species() -> (GenomeDef, SpeciesDef) {
        let genome = GenomeBuilder::new()
            .add_layer(LayerDef::fixed(0, 2, Activation::Linear))
            .add_layer(LayerDef::variable(0, 2, &[Activation::Relu, Activation::Tanh]))
            .build();
        let species = SpeciesDef::from_genome(&genome);
        (genome, species)
    }

    #[test]
    fn random_individual_has_a_value_for_every_active_weight() {
        let (genome, species) = genome_and_species();
        let mut rng = fastrand::Rng::with_seed(42);
        let individual = Individual::random(&genome, &species, WeightInitialization::GlorotUniform, &mut rng);
        assert_eq!(individual.weights.len(), species.active_weights().len());
        assert_eq!(individual.biases.len(), genome.biases().len());
        assert_eq!(individual.activations.len(), genome.nodes().len());
    }

    #[test]
    fn glorot_uniform_weights_stay_within_the_fan_in_fan_out_bound() {
        let (genome, species) = genome_and_species();
        let mut rng = fastrand::Rng::with_seed(3);
        let individual = Individual::random(&genome, &species, WeightInitialization::GlorotUniform, &mut rng);

        for (&weight_id, &value) in individual.weights.iter() {
            let link = genome.link(genome.weight(weight_id).link_id);
            let fan_in = species.in_degree(link.target_node_index, &genome).max(1);
            let fan_out = species.out_degree(link.source_node_index, &genome).max(1);
            let bound = (6.0 / (fan_in + fan_out) as f64).sqrt();
            assert!(value.abs() <= bound + 1e-12, "value={value} bound={bound}");
        }
    }

    #[test]
    fn fixed_nodes_never_change_activation_under_mutation() {
        let (genome, species) = genome_and_species();
        let mut rng = fastrand::Rng::with_seed(7);
        let mut individual = Individual::random(&genome, &species, WeightInitialization::GlorotUniform, &mut rng);
        let rates = MutationRates {
            activation_swap: 1.0,
            weight_jitter: 0.0,
            weight_reset: 0.0,
            weight_l1_shrink: 0.0,
            bias_jitter: 0.0,
            node_param_jitter: 0.0,
            ..MutationRates::default()
        };

        for _ in 0..20 {
            individual.mutate(&genome, &rates, &mut rng);
        }

        for node in genome.layer_nodes(0) {
            assert_eq!(individual.activations[&node.id], Activation::Linear);
        }
    }

    #[test]
    fn gaussian_samples_are_finite_and_vary() {
        let mut rng = fastrand::Rng::with_seed(1);
        let samples: Vec<f64> = (0..100).map(|_| gaussian(&mut rng)).collect();
        assert!(samples.iter().all(|s| s.is_finite()));
        assert!(samples.iter().any(|&s| s != samples[0]));
    }
}
