//! Frozen-topology subset view of a [`GenomeDef`].
//!
//! A species starts with every link (and its weight) active and can only ever remove links —
//! topology only gets sparser within a species's lifetime. New species are derived from a parent
//! individual via structural mutation of a cloned link set.

use hashbrown::HashSet;

use super::def::GenomeDef;

/// A subset of a [`GenomeDef`]'s links (and the weights that go with them). Two individuals in
/// the same species always share the same active-link set.
#[derive(Debug, Clone)]
pub struct SpeciesDef {
    active_links: HashSet<usize>,
    active_weights: HashSet<usize>,
}

impl SpeciesDef {
    /// A species with every link in `genome` active.
    pub fn from_genome(genome: &GenomeDef) -> Self {
        let active_links = genome.links().iter().map(|l| l.id).collect();
        let active_weights = genome.weights().iter().map(|w| w.id).collect();
        Self {
            active_links,
            active_weights,
        }
    }

    pub fn active_links(&self) -> &HashSet<usize> {
        &self.active_links
    }

    pub fn active_weights(&self) -> &HashSet<usize> {
        &self.active_weights
    }

    pub fn is_link_active(&self, link_id: usize) -> bool {
        self.active_links.contains(&link_id)
    }

    /// Deactivate `link_id` and its associated weight (looked up via `genome`). No-op if the
    /// link is already inactive.
    pub fn remove_link(&mut self, link_id: usize, genome: &GenomeDef) {
        if self.active_links.remove(&link_id) {
            for weight in genome.weights() {
                if weight.link_id == link_id {
                    self.active_weights.remove(&weight.id);
                }
            }
        }
    }

    /// Reactivate a previously-removed link (used by `EdgeAdd`/`EdgeRedirect` mutations that
    /// repurpose an existing base-definition edge).
    pub fn add_link(&mut self, link_id: usize, genome: &GenomeDef) {
        if self.active_links.insert(link_id) {
            for weight in genome.weights() {
                if weight.link_id == link_id {
                    self.active_weights.insert(weight.id);
                }
            }
        }
    }

    /// Active incoming link count for `node_id`.
    pub fn in_degree(&self, node_id: usize, genome: &GenomeDef) -> usize {
        genome
            .links()
            .iter()
            .filter(|l| l.target_node_index == node_id && self.active_links.contains(&l.id))
            .count()
    }

    /// Active outgoing link count for `node_id`, the fan-out half of a Glorot bound.
    pub fn out_degree(&self, node_id: usize, genome: &GenomeDef) -> usize {
        genome
            .links()
            .iter()
            .filter(|l| l.source_node_index == node_id && self.active_links.contains(&l.id))
            .count()
    }

    /// Whether `node_id`'s in-degree would stay within its layer's `max_in_degree` if `link_id`
    /// were additionally active.
    pub fn respects_max_in_degree(&self, link_id: usize, genome: &GenomeDef) -> bool {
        let link = genome.link(link_id);
        let node = genome.node(link.target_node_index);
        let layer = &genome.layers()[node.row_id];
        match layer.max_in_degree {
            Some(max) => self.in_degree(link.target_node_index, genome) < max || self.is_link_active(link_id),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::def::{Activation, GenomeBuilder, LayerDef};
    use super::*;

    fn small_genome() -> GenomeDef {
        GenomeBuilder::new()
            .add_layer(LayerDef::fixed(0, 2, Activation::Linear))
            .add_layer(LayerDef::fixed(0, 2, Activation::Relu))
            .build()
    }

    #[test]
    fn fresh_species_has_every_base_link_active() {
        let genome = small_genome();
        let species = SpeciesDef::from_genome(&genome);
        assert_eq!(species.active_links().len(), genome.links().len());
        assert_eq!(species.active_weights().len(), genome.weights().len());
    }

    #[test]
    fn removing_a_link_also_removes_its_weight() {
        let genome = small_genome();
        let mut species = SpeciesDef::from_genome(&genome);
        let link_id = genome.links()[0].id;
        let weight_id = genome
            .weights()
            .iter()
            .find(|w| w.link_id == link_id)
            .unwrap()
            .id;

        species.remove_link(link_id, &genome);

        assert!(!species.is_link_active(link_id));
        assert!(!species.active_weights().contains(&weight_id));
    }

    #[test]
    fn max_in_degree_is_respected_after_pruning() {
        let genome = GenomeBuilder::new()
            .add_layer(LayerDef::fixed(0, 2, Activation::Linear))
            .add_layer(LayerDef::fixed(0, 2, Activation::Relu).with_max_in_degree(1))
            .build();
        let mut species = SpeciesDef::from_genome(&genome);

        let target = genome.layer_nodes(1)[0].id;
        let incoming: Vec<usize> = genome
            .links()
            .iter()
            .filter(|l| l.target_node_index == target)
            .map(|l| l.id)
            .collect();
        assert_eq!(incoming.len(), 2);

        species.remove_link(incoming[0], &genome);
        assert!(species.respects_max_in_degree(incoming[1], &genome));
    }
}
