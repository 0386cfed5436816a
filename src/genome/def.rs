//! Immutable symbolic network description.
//!
//! A [`GenomeDef`] is an arena: every [`NodeDef`], [`BiasDef`], [`LinkDef`], and [`WeightDef`] is
//! allocated once, by id, and never mutated or removed. [`crate::genome::species::SpeciesDef`] and
//! [`crate::genome::individual::Individual`] hold integer ids into this arena, never references,
//! so a `GenomeDef` can outlive any number of species and individuals built from it.

use smallvec::SmallVec;

/// One of the eight activation functions a node may be assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Activation {
    Linear,
    Tanh,
    Sigmoid,
    Relu,
    LeakyRelu,
    Elu,
    Swish,
    Gaussian,
}

impl Activation {
    /// Apply this activation to `x`.
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Linear => x,
            Activation::Tanh => x.tanh(),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Relu => x.max(0.0),
            Activation::LeakyRelu => {
                if x >= 0.0 {
                    x
                } else {
                    0.01 * x
                }
            }
            Activation::Elu => {
                if x >= 0.0 {
                    x
                } else {
                    x.exp() - 1.0
                }
            }
            Activation::Swish => x / (1.0 + (-x).exp()),
            Activation::Gaussian => (-x * x).exp(),
        }
    }
}

/// Immutable node descriptor. `row_id`/`col_id` place it within [`GenomeDef`]'s layer-major
/// node numbering; `col_id` is the node's index within its row.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDef {
    pub id: usize,
    pub row_id: usize,
    pub col_id: usize,
    /// Activations this node may take. A single-element set is a fixed-activation node; the
    /// layer it belongs to need not be consulted to know this.
    pub allowed_activations: SmallVec<[Activation; 8]>,
}

impl NodeDef {
    /// Whether this node's activation is fixed (exactly one allowed choice).
    pub fn is_fixed(&self) -> bool {
        self.allowed_activations.len() == 1
    }
}

/// One bias per node, 1:1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiasDef {
    pub id: usize,
    pub node_def_id: usize,
}

/// A directed edge; always points from a strictly lower row to a strictly higher one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkDef {
    pub id: usize,
    pub source_node_index: usize,
    pub target_node_index: usize,
}

/// One weight per link in the base definition, resolved back to its link via
/// [`GenomeDef::link`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightDef {
    pub id: usize,
    pub link_id: usize,
}

/// Describes one row of nodes before they are materialized into [`NodeDef`]s.
#[derive(Debug, Clone)]
pub struct LayerDef {
    pub row_id: usize,
    pub node_count: usize,
    pub allowed_activations: SmallVec<[Activation; 8]>,
    pub max_in_degree: Option<usize>,
}

impl LayerDef {
    /// A row whose nodes may each independently settle on any of `activations`.
    pub fn variable(row_id: usize, node_count: usize, activations: &[Activation]) -> Self {
        Self {
            row_id,
            node_count,
            allowed_activations: activations.iter().copied().collect(),
            max_in_degree: None,
        }
    }

    /// A row whose nodes are all pinned to a single activation.
    pub fn fixed(row_id: usize, node_count: usize, activation: Activation) -> Self {
        Self {
            row_id,
            node_count,
            allowed_activations: SmallVec::from_buf([activation]),
            max_in_degree: None,
        }
    }

    /// Bound the number of active incoming links any node in this row may have.
    pub fn with_max_in_degree(mut self, max: usize) -> Self {
        self.max_in_degree = Some(max);
        self
    }
}

/// The immutable symbolic network: an ordered stack of layers, fully connected layer-to-layer,
/// with node defs numbered in layer-major column order.
#[derive(Debug, Clone)]
pub struct GenomeDef {
    layers: Vec<LayerDef>,
    nodes: Vec<NodeDef>,
    biases: Vec<BiasDef>,
    links: Vec<LinkDef>,
    weights: Vec<WeightDef>,
    /// Index into `nodes` where each layer's nodes start, parallel to `layers`.
    layer_starts: Vec<usize>,
}

/// Incrementally builds a [`GenomeDef`] by appending fully-connected layers.
#[derive(Debug, Clone, Default)]
pub struct GenomeBuilder {
    layers: Vec<LayerDef>,
}

impl GenomeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer. Rows are numbered in append order starting at 0.
    pub fn add_layer(mut self, mut layer: LayerDef) -> Self {
        layer.row_id = self.layers.len();
        self.layers.push(layer);
        self
    }

    /// Materialize node/bias/link/weight defs for every layer, connecting each layer fully to the
    /// next.
    pub fn build(self) -> GenomeDef {
        let mut nodes = Vec::new();
        let mut biases = Vec::new();
        let mut layer_starts = Vec::with_capacity(self.layers.len());

        for layer in &self.layers {
            layer_starts.push(nodes.len());
            for col in 0..layer.node_count {
                let node_id = nodes.len();
                nodes.push(NodeDef {
                    id: node_id,
                    row_id: layer.row_id,
                    col_id: col,
                    allowed_activations: layer.allowed_activations.clone(),
                });
                biases.push(BiasDef {
                    id: biases.len(),
                    node_def_id: node_id,
                });
            }
        }

        let mut links = Vec::new();
        let mut weights = Vec::new();
        for pair in self.layers.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let prev_start = layer_starts[prev.row_id];
            let next_start = layer_starts[next.row_id];
            for s in 0..prev.node_count {
                for t in 0..next.node_count {
                    let link_id = links.len();
                    links.push(LinkDef {
                        id: link_id,
                        source_node_index: prev_start + s,
                        target_node_index: next_start + t,
                    });
                    weights.push(WeightDef {
                        id: weights.len(),
                        link_id,
                    });
                }
            }
        }

        GenomeDef {
            layers: self.layers,
            nodes,
            biases,
            links,
            weights,
            layer_starts,
        }
    }
}

impl GenomeDef {
    pub fn layers(&self) -> &[LayerDef] {
        &self.layers
    }

    pub fn nodes(&self) -> &[NodeDef] {
        &self.nodes
    }

    pub fn node(&self, id: usize) -> &NodeDef {
        &self.nodes[id]
    }

    pub fn biases(&self) -> &[BiasDef] {
        &self.biases
    }

    pub fn links(&self) -> &[LinkDef] {
        &self.links
    }

    pub fn link(&self, id: usize) -> &LinkDef {
        &self.links[id]
    }

    pub fn weights(&self) -> &[WeightDef] {
        &self.weights
    }

    pub fn weight(&self, id: usize) -> &WeightDef {
        &self.weights[id]
    }

    /// The node ids belonging to `row_id`, in column order.
    pub fn layer_nodes(&self, row_id: usize) -> &[NodeDef] {
        let start = self.layer_starts[row_id];
        let count = self.layers[row_id].node_count;
        &self.nodes[start..start + count]
    }

    /// First layer's node ids, the network's inputs, in column order.
    pub fn input_node_ids(&self) -> Vec<usize> {
        self.layer_nodes(0).iter().map(|n| n.id).collect()
    }

    /// Last layer's node ids, the network's outputs, in column order.
    pub fn output_node_ids(&self) -> Vec<usize> {
        let last_row = self.layers.len() - 1;
        self.layer_nodes(last_row).iter().map(|n| n.id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_hidden_one() -> GenomeDef {
        GenomeBuilder::new()
            .add_layer(LayerDef::fixed(0, 2, Activation::Linear))
            .add_layer(LayerDef::fixed(0, 2, Activation::Relu))
            .add_layer(LayerDef::fixed(0, 1, Activation::Linear))
            .build()
    }

    #[test]
    fn nodes_are_numbered_in_layer_major_order() {
        let genome = two_hidden_one();
        let ids: Vec<usize> = genome.nodes().iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(genome.input_node_ids(), vec![0, 1]);
        assert_eq!(genome.output_node_ids(), vec![4]);
    }

    #[test]
    fn every_adjacent_layer_pair_is_fully_connected() {
        let genome = two_hidden_one();
        // 2x2 between layer 0/1, 2x1 between layer 1/2.
        assert_eq!(genome.links().len(), 4 + 2);
        assert_eq!(genome.weights().len(), genome.links().len());
    }

    #[test]
    fn fixed_layer_nodes_have_single_element_allowed_set() {
        let genome = two_hidden_one();
        for node in genome.layer_nodes(1) {
            assert!(node.is_fixed());
            assert_eq!(node.allowed_activations[0], Activation::Relu);
        }
    }

    #[test]
    fn every_weight_resolves_back_to_a_link_in_the_same_genome() {
        let genome = two_hidden_one();
        for weight in genome.weights() {
            let link = genome.link(weight.link_id);
            assert!(link.source_node_index < link.target_node_index);
        }
    }
}
