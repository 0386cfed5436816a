//! Edge-structural mutation operators over a [`SpeciesDef`]'s active-link subset.
//!
//! The base [`GenomeDef`] link set is fixed; these operators only toggle which of its links (and
//! therefore which weights) are active for a species. A new species is always derived from an
//! existing one by applying one or more of these to a clone, never by inventing nodes or links
//! outside the base definition.

use super::def::GenomeDef;
use super::species::SpeciesDef;

/// Configuration for the five structural operators plus post-hoc weak-edge pruning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeMutationConfig {
    pub edge_add: f64,
    pub edge_delete_random: f64,
    pub edge_split: f64,
    pub edge_redirect: f64,
    pub edge_swap: f64,
    pub weak_edge_pruning: WeakEdgePruning,
}

impl Default for EdgeMutationConfig {
    fn default() -> Self {
        Self {
            edge_add: 0.05,
            edge_delete_random: 0.05,
            edge_split: 0.02,
            edge_redirect: 0.02,
            edge_swap: 0.02,
            weak_edge_pruning: WeakEdgePruning::default(),
        }
    }
}

/// Removes links whose weight magnitude has decayed below `threshold`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeakEdgePruning {
    pub enabled: bool,
    pub threshold: f64,
    pub base_rate: f64,
    pub on_birth: bool,
    pub during_evolution: bool,
}

impl Default for WeakEdgePruning {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0.01,
            base_rate: 0.02,
            on_birth: false,
            during_evolution: true,
        }
    }
}

/// Apply each structural operator to `species` at most once, independently gated by
/// `config`'s per-operator probability.
pub fn mutate_topology(
    species: &mut SpeciesDef,
    genome: &GenomeDef,
    config: &EdgeMutationConfig,
    rng: &mut fastrand::Rng,
) {
    if rng.f64() < config.edge_add {
        edge_add(species, genome, rng);
    }
    if rng.f64() < config.edge_delete_random {
        edge_delete_random(species, genome, rng);
    }
    if rng.f64() < config.edge_split {
        edge_split(species, genome, rng);
    }
    if rng.f64() < config.edge_redirect {
        edge_redirect(species, genome, rng);
    }
    if rng.f64() < config.edge_swap {
        edge_swap(species, genome, rng);
    }
}

fn inactive_links(species: &SpeciesDef, genome: &GenomeDef) -> Vec<usize> {
    genome
        .links()
        .iter()
        .map(|l| l.id)
        .filter(|id| !species.is_link_active(*id))
        .collect()
}

fn active_links(species: &SpeciesDef, genome: &GenomeDef) -> Vec<usize> {
    genome.links().iter().map(|l| l.id).filter(|id| species.is_link_active(*id)).collect()
}

/// Activate a random currently-inactive link that still respects its target's `maxInDegree`.
pub fn edge_add(species: &mut SpeciesDef, genome: &GenomeDef, rng: &mut fastrand::Rng) {
    let candidates: Vec<usize> = inactive_links(species, genome)
        .into_iter()
        .filter(|id| species.respects_max_in_degree(*id, genome))
        .collect();
    if let Some(&link_id) = pick(&candidates, rng) {
        species.add_link(link_id, genome);
    }
}

/// Deactivate a random currently-active link.
pub fn edge_delete_random(species: &mut SpeciesDef, genome: &GenomeDef, rng: &mut fastrand::Rng) {
    let candidates = active_links(species, genome);
    if let Some(&link_id) = pick(&candidates, rng) {
        species.remove_link(link_id, genome);
    }
}

/// Approximate NEAT's node-insertion split within a fixed node set: replace one active link
/// `source -> target` with a pair `source -> mid` and `mid -> target` already present in the base
/// genome, if such a pair of currently-inactive links exists. No-op otherwise.
pub fn edge_split(species: &mut SpeciesDef, genome: &GenomeDef, rng: &mut fastrand::Rng) {
    let active = active_links(species, genome);
    let Some(&link_id) = pick(&active, rng) else { return };
    let link = *genome.link(link_id);

    let candidate_pairs: Vec<(usize, usize)> = genome
        .links()
        .iter()
        .filter(|a| a.source_node_index == link.source_node_index && !species.is_link_active(a.id))
        .flat_map(|a| {
            genome
                .links()
                .iter()
                .filter(move |b| b.source_node_index == a.target_node_index && b.target_node_index == link.target_node_index)
                .filter(|b| !species.is_link_active(b.id))
                .map(move |b| (a.id, b.id))
        })
        .collect();

    if let Some(&(first, second)) = pick(&candidate_pairs, rng) {
        if species.respects_max_in_degree(first, genome) && species.respects_max_in_degree(second, genome) {
            species.remove_link(link_id, genome);
            species.add_link(first, genome);
            species.add_link(second, genome);
        }
    }
}

/// Deactivate a random active link and activate a different inactive link feeding the same
/// target node, preserving the target's role while changing its source.
pub fn edge_redirect(species: &mut SpeciesDef, genome: &GenomeDef, rng: &mut fastrand::Rng) {
    let active = active_links(species, genome);
    let Some(&link_id) = pick(&active, rng) else { return };
    let link = *genome.link(link_id);

    let alternatives: Vec<usize> = genome
        .links()
        .iter()
        .filter(|l| l.target_node_index == link.target_node_index && l.id != link_id && !species.is_link_active(l.id))
        .map(|l| l.id)
        .collect();

    if let Some(&replacement) = pick(&alternatives, rng) {
        species.remove_link(link_id, genome);
        if species.respects_max_in_degree(replacement, genome) {
            species.add_link(replacement, genome);
        } else {
            species.add_link(link_id, genome);
        }
    }
}

/// Swap the active/inactive state of one active and one inactive link feeding the same target
/// node.
pub fn edge_swap(species: &mut SpeciesDef, genome: &GenomeDef, rng: &mut fastrand::Rng) {
    let active = active_links(species, genome);
    let Some(&link_id) = pick(&active, rng) else { return };
    let link = *genome.link(link_id);

    let candidates: Vec<usize> = genome
        .links()
        .iter()
        .filter(|l| l.target_node_index == link.target_node_index && !species.is_link_active(l.id))
        .map(|l| l.id)
        .collect();

    if let Some(&other) = pick(&candidates, rng) {
        species.remove_link(link_id, genome);
        species.add_link(other, genome);
    }
}

/// Deactivate every active link whose individual weight magnitude is below `pruning.threshold`,
/// gated by `pruning.base_rate`.
pub fn weak_edge_prune(
    species: &mut SpeciesDef,
    genome: &GenomeDef,
    weights: &hashbrown::HashMap<usize, f64>,
    pruning: &WeakEdgePruning,
    rng: &mut fastrand::Rng,
) {
    if !pruning.enabled || rng.f64() >= pruning.base_rate {
        return;
    }
    let weak: Vec<usize> = genome
        .weights()
        .iter()
        .filter(|w| species.is_link_active(w.link_id))
        .filter(|w| weights.get(&w.id).copied().unwrap_or(0.0).abs() < pruning.threshold)
        .map(|w| w.link_id)
        .collect();
    for link_id in weak {
        species.remove_link(link_id, genome);
    }
}

fn pick<'a, T>(items: &'a [T], rng: &mut fastrand::Rng) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        Some(&items[rng.usize(..items.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::def::{Activation, GenomeBuilder, LayerDef};

    fn chain_genome() -> GenomeDef {
        GenomeBuilder::new()
            .add_layer(LayerDef::fixed(0, 2, Activation::Linear))
            .add_layer(LayerDef::fixed(0, 2, Activation::Relu))
            .add_layer(LayerDef::fixed(0, 1, Activation::Linear))
            .build()
    }

    #[test]
    fn edge_delete_then_add_round_trips_active_count() {
        let genome = chain_genome();
        let mut species = SpeciesDef::from_genome(&genome);
        let before = species.active_links().len();

        let mut rng = fastrand::Rng::with_seed(3);
        edge_delete_random(&mut species, &genome, &mut rng);
        assert_eq!(species.active_links().len(), before - 1);

        edge_add(&mut species, &genome, &mut rng);
        assert_eq!(species.active_links().len(), before);
    }

    #[test]
    fn edge_add_never_exceeds_max_in_degree() {
        let genome = GenomeBuilder::new()
            .add_layer(LayerDef::fixed(0, 3, Activation::Linear))
            .add_layer(LayerDef::fixed(0, 1, Activation::Relu).with_max_in_degree(2))
            .build();
        let mut species = SpeciesDef::from_genome(&genome);
        let target = genome.layer_nodes(1)[0].id;
        for link in genome.links() {
            species.remove_link(link.id, &genome);
        }

        let mut rng = fastrand::Rng::with_seed(11);
        for _ in 0..20 {
            edge_add(&mut species, &genome, &mut rng);
        }

        assert!(species.in_degree(target, &genome) <= 2);
    }
}
