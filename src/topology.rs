//! Compiled flat network layout and batched forward-pass evaluator.
//!
//! [`ExecutableTopology`] flattens a [`SpeciesDef`] (which nodes/links/weights are active) into
//! stride-regular arrays indexed as `node * maxInDegree + k`, the shape a GPU kernel would expect.
//! [`ExecutableBatch`] then runs the forward pass over `batchSize` independent parameter sets at
//! once, each individual contributing its own weights/biases/activations row.

use crate::error::TopologyError;
use crate::genome::def::{Activation, GenomeDef};
use crate::genome::individual::Individual;
use crate::genome::species::SpeciesDef;

/// Sentinel value for an absent connection/bias slot in the flat arrays.
const ABSENT: i64 = -1;

/// A genome's active topology, flattened for batched/GPU-style execution.
#[derive(Debug, Clone)]
pub struct ExecutableTopology {
    pub num_nodes: usize,
    pub num_weights: usize,
    pub num_biases: usize,
    pub num_inputs: usize,
    pub num_outputs: usize,
    pub max_in_degree: usize,
    pub node_in_degrees: Vec<usize>,
    pub connection_sources: Vec<i64>,
    pub connection_weight_ids: Vec<i64>,
    pub node_bias_ids: Vec<i64>,
    pub execution_order: Vec<usize>,
}

impl ExecutableTopology {
    /// Compile `species`'s active subset of `genome` into a flat executable layout.
    ///
    /// Fails iff the active link set contains a cycle (the spec's topological-order algorithm
    /// assumes a DAG).
    pub fn compile(genome: &GenomeDef, species: &SpeciesDef) -> Result<Self, TopologyError> {
        let num_nodes = genome.nodes().len();

        let mut incoming: Vec<Vec<(usize, usize)>> = vec![Vec::new(); num_nodes];
        let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); num_nodes];
        for link in genome.links() {
            if !species.is_link_active(link.id) {
                continue;
            }
            let weight_id = genome
                .weights()
                .iter()
                .find(|w| w.link_id == link.id)
                .expect("every link has a weight in the base genome")
                .id;
            incoming[link.target_node_index].push((link.source_node_index, weight_id));
            outgoing[link.source_node_index].push(link.target_node_index);
        }

        let max_in_degree = incoming.iter().map(|v| v.len()).max().unwrap_or(0);
        let node_in_degrees: Vec<usize> = incoming.iter().map(|v| v.len()).collect();

        for (node_id, &actual) in node_in_degrees.iter().enumerate() {
            let node_def = genome.node(node_id);
            if let Some(max) = genome.layers()[node_def.row_id].max_in_degree {
                if actual > max {
                    return Err(TopologyError::MaxInDegreeExceeded { node_id, actual, max });
                }
            }
        }

        let mut connection_sources = vec![ABSENT; num_nodes * max_in_degree.max(1)];
        let mut connection_weight_ids = vec![ABSENT; num_nodes * max_in_degree.max(1)];
        for (node, conns) in incoming.iter().enumerate() {
            for (k, &(src, weight_id)) in conns.iter().enumerate() {
                connection_sources[node * max_in_degree + k] = src as i64;
                connection_weight_ids[node * max_in_degree + k] = weight_id as i64;
            }
        }

        let node_bias_ids: Vec<i64> = genome
            .nodes()
            .iter()
            .map(|n| {
                genome
                    .biases()
                    .iter()
                    .find(|b| b.node_def_id == n.id)
                    .map(|b| b.id as i64)
                    .unwrap_or(ABSENT)
            })
            .collect();

        let execution_order = topological_order(&outgoing, num_nodes)?;

        Ok(Self {
            num_nodes,
            num_weights: genome.weights().len(),
            num_biases: genome.biases().len(),
            num_inputs: genome.input_node_ids().len(),
            num_outputs: genome.output_node_ids().len(),
            max_in_degree,
            node_in_degrees,
            connection_sources,
            connection_weight_ids,
            node_bias_ids,
            execution_order,
        })
    }
}

/// Depth-first post-order traversal over every node (following outgoing edges), reversed into a
/// topological order. A node still mid-traversal when revisited indicates a cycle.
fn topological_order(outgoing: &[Vec<usize>], num_nodes: usize) -> Result<Vec<usize>, TopologyError> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Unvisited,
        InProgress,
        Done,
    }

    let mut state = vec![State::Unvisited; num_nodes];
    let mut order = Vec::with_capacity(num_nodes);

    for start in 0..num_nodes {
        if state[start] != State::Unvisited {
            continue;
        }
        let mut stack = vec![(start, 0usize)];
        state[start] = State::InProgress;

        while let Some(&mut (node, ref mut next_child)) = stack.last_mut() {
            if *next_child < outgoing[node].len() {
                let child = outgoing[node][*next_child];
                *next_child += 1;
                match state[child] {
                    State::Unvisited => {
                        state[child] = State::InProgress;
                        stack.push((child, 0));
                    }
                    State::InProgress => {
                        return Err(TopologyError::CycleDetected {
                            cycle_length: stack.len(),
                        });
                    }
                    State::Done => {}
                }
            } else {
                state[node] = State::Done;
                order.push(node);
                stack.pop();
            }
        }
    }

    order.reverse();
    Ok(order)
}

/// Batched forward-pass buffers: `batchSize` independent parameter sets sharing one
/// [`ExecutableTopology`].
#[derive(Debug, Clone)]
pub struct ExecutableBatch {
    pub batch_size: usize,
    pub weights: Vec<f64>,
    pub biases: Vec<f64>,
    pub activations: Vec<Activation>,
    pub node_values: Vec<f64>,
}

impl ExecutableBatch {
    /// Allocate zeroed buffers sized for `batch_size` individuals under `topology`.
    pub fn new(topology: &ExecutableTopology, batch_size: usize) -> Self {
        Self {
            batch_size,
            weights: vec![0.0; batch_size * topology.num_weights],
            biases: vec![0.0; batch_size * topology.num_biases],
            activations: vec![Activation::Linear; batch_size * topology.num_nodes],
            node_values: vec![0.0; batch_size * topology.num_nodes],
        }
    }

    /// Copy one individual's weights/biases/activations into batch row `batch_idx`.
    pub fn load_individual(&mut self, topology: &ExecutableTopology, batch_idx: usize, individual: &Individual) {
        let weight_base = batch_idx * topology.num_weights;
        for (&weight_id, &value) in individual.weights.iter() {
            self.weights[weight_base + weight_id] = value;
        }
        let bias_base = batch_idx * topology.num_biases;
        for (&bias_id, &value) in individual.biases.iter() {
            self.biases[bias_base + bias_id] = value;
        }
        let node_base = batch_idx * topology.num_nodes;
        for (&node_id, &activation) in individual.activations.iter() {
            self.activations[node_base + node_id] = activation;
        }
    }

    /// Run the forward pass for every batch row. `inputs` is `batch_size * topology.num_inputs`,
    /// row-major. Outputs become the last `topology.num_outputs` slots of each row's node values;
    /// read them with [`ExecutableBatch::outputs`].
    pub fn forward(&mut self, topology: &ExecutableTopology, inputs: &[f64]) {
        puffin::profile_function!();
        debug_assert_eq!(inputs.len(), self.batch_size * topology.num_inputs);

        for b in 0..self.batch_size {
            let node_base = b * topology.num_nodes;
            let weight_base = b * topology.num_weights;
            let bias_base = b * topology.num_biases;
            let input_base = b * topology.num_inputs;

            for i in 0..topology.num_inputs {
                self.node_values[node_base + i] = inputs[input_base + i];
            }

            for &node in &topology.execution_order {
                if node < topology.num_inputs {
                    continue;
                }

                let degree = topology.node_in_degrees[node];
                let mut sum = 0.0;
                for k in 0..degree {
                    let slot = node * topology.max_in_degree + k;
                    let src = topology.connection_sources[slot] as usize;
                    let weight_id = topology.connection_weight_ids[slot] as usize;
                    sum += self.node_values[node_base + src] * self.weights[weight_base + weight_id];
                }
                let bias_id = topology.node_bias_ids[node];
                if bias_id >= 0 {
                    sum += self.biases[bias_base + bias_id as usize];
                }

                let activation = self.activations[node_base + node];
                self.node_values[node_base + node] = activation.apply(sum);
            }
        }
    }

    /// The last `topology.num_outputs` node values for batch row `batch_idx`.
    pub fn outputs<'a>(&'a self, topology: &ExecutableTopology, batch_idx: usize) -> &'a [f64] {
        let node_base = batch_idx * topology.num_nodes;
        let start = node_base + topology.num_nodes - topology.num_outputs;
        &self.node_values[start..node_base + topology.num_nodes]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::def::{GenomeBuilder, LayerDef};
    use hashbrown::HashMap;

    fn two_in_two_hidden_one_out() -> GenomeDef {
        GenomeBuilder::new()
            .add_layer(LayerDef::fixed(0, 2, Activation::Linear))
            .add_layer(LayerDef::fixed(0, 2, Activation::Relu))
            .add_layer(LayerDef::fixed(0, 1, Activation::Linear))
            .build()
    }

    #[test]
    fn execution_order_visits_every_node_with_sources_before_targets() {
        let genome = two_in_two_hidden_one_out();
        let species = SpeciesDef::from_genome(&genome);
        let topology = ExecutableTopology::compile(&genome, &species).unwrap();

        assert_eq!(topology.execution_order.len(), genome.nodes().len());

        let position: HashMap<usize, usize> = topology
            .execution_order
            .iter()
            .enumerate()
            .map(|(pos, &node)| (node, pos))
            .collect();
        for link in genome.links() {
            if species.is_link_active(link.id) {
                assert!(position[&link.source_node_index] < position[&link.target_node_index]);
            }
        }
    }

    #[test]
    fn weighted_one_input_output_network_with_unit_weights_sums_relu_of_inputs() {
        let genome = two_in_two_hidden_one_out();
        let species = SpeciesDef::from_genome(&genome);
        let topology = ExecutableTopology::compile(&genome, &species).unwrap();

        let mut individual = Individual {
            weights: HashMap::new(),
            biases: HashMap::new(),
            activations: HashMap::new(),
            links: HashMap::new(),
            fitness: None,
        };
        for weight in genome.weights() {
            individual.weights.insert(weight.id, 1.0);
        }
        for bias in genome.biases() {
            individual.biases.insert(bias.id, 0.0);
        }
        individual.activations.insert(0, Activation::Linear);
        individual.activations.insert(1, Activation::Linear);
        individual.activations.insert(2, Activation::Relu);
        individual.activations.insert(3, Activation::Relu);
        individual.activations.insert(4, Activation::Linear);

        let mut batch = ExecutableBatch::new(&topology, 1);
        batch.load_individual(&topology, 0, &individual);
        batch.forward(&topology, &[1.0, -1.0]);

        let outputs = batch.outputs(&topology, 0);
        assert_eq!(outputs.len(), 1);
        assert!((outputs[0] - 2.0).abs() < 1e-9, "outputs={outputs:?}");
    }

    #[test]
    fn well_formed_base_genome_always_compiles() {
        let genome = two_in_two_hidden_one_out();
        let mut species = SpeciesDef::from_genome(&genome);
        assert!(ExecutableTopology::compile(&genome, &species).is_ok());
        species.remove_link(0, &genome);
        assert!(ExecutableTopology::compile(&genome, &species).is_ok());
    }

    #[test]
    fn topological_order_rejects_a_cycle() {
        // 0 -> 1 -> 2 -> 0, a cycle the builder itself can never produce (links only go forward
        // by row); exercised directly against the traversal this module compiles into.
        let outgoing = vec![vec![1], vec![2], vec![0]];
        let result = topological_order(&outgoing, 3);
        assert!(matches!(result, Err(TopologyError::CycleDetected { .. })));
    }

    #[test]
    fn topological_order_on_a_dag_puts_sources_before_targets() {
        let outgoing = vec![vec![1, 2], vec![2], vec![]];
        let order = topological_order(&outgoing, 3).unwrap();
        let pos = |n: usize| order.iter().position(|&x| x == n).unwrap();
        assert!(pos(0) < pos(1));
        assert!(pos(1) < pos(2));
    }

    #[test]
    fn compile_rejects_a_node_whose_in_degree_exceeds_its_layer_max() {
        let genome = GenomeBuilder::new()
            .add_layer(LayerDef::fixed(0, 3, Activation::Linear))
            .add_layer(LayerDef::fixed(0, 1, Activation::Relu).with_max_in_degree(2))
            .build();
        let species = SpeciesDef::from_genome(&genome);

        let result = ExecutableTopology::compile(&genome, &species);
        assert!(matches!(
            result,
            Err(TopologyError::MaxInDegreeExceeded { actual: 3, max: 2, .. })
        ));
    }
}
