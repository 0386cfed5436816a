//! Population lifecycle: evaluation bookkeeping, selection, culling, and reseeding.
//!
//! Mirrors [`crate::genome::structural`]'s "mutate a clone, never the original" discipline one
//! level up: a generation step never mutates a surviving species' [`SpeciesDef`] in place, it
//! either clones individuals within it (reproduction) or clones a donor species wholesale
//! (reseed). Evolutionary operations never fail; degenerate configs are clamped at construction
//! per the spec's error-handling design.

use hashbrown::HashSet;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::fitness::{aggregate, FitnessAggregation};
use crate::genome::def::GenomeDef;
use crate::genome::individual::{Individual, MutationRates, WeightInitialization};
use crate::genome::species::SpeciesDef;
use crate::genome::structural::{mutate_topology, weak_edge_prune, EdgeMutationConfig};

/// Tunables for [`Evolver::step_generation`]. Ranges in the doc comments are the values observed
/// across tuned configurations; nothing here enforces them beyond [`EvolutionConfig::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Species created by [`Evolver::initialize_population`]. Typical range 8-27.
    pub species_count: usize,
    /// Floor below which culling stops removing species. Typical range 4-8.
    pub min_species_count: usize,
    /// Individuals per species. Typical range 88-100.
    pub individuals_per_species: usize,
    /// Individuals copied unchanged each generation, best-fitness-first.
    pub elites: usize,
    /// Sample size drawn per tournament-selection parent pick.
    pub tournament_size: usize,
    /// Fraction (by fitness rank) of a species eligible to be sampled as a tournament parent.
    pub parent_pool_percentage: f64,
    /// Generations a species is exempt from culling after creation.
    pub grace_generations: u32,
    /// Stagnation (generations since last best-fitness improvement) that makes a species cullable.
    pub stagnation_threshold: u32,
    /// Fitness-variance floor below which a species is cullable.
    pub species_diversity_threshold: f64,
    /// Fraction of the best cross-species median fitness below which a species is cullable.
    pub relative_performance_threshold: f64,
    /// Seeds averaged (or CVaR'd) per individual by the external evaluator.
    pub seeds_per_individual: usize,
    /// How per-seed samples combine into one fitness value.
    pub fitness_aggregation: FitnessAggregation,
    /// How fresh weights are sampled when a species is (re)populated.
    pub weight_initialization: WeightInitialization,
    /// Per-parameter mutation probabilities/magnitudes.
    pub mutation_rates: MutationRates,
    /// Per-generation structural (edge) mutation probabilities.
    pub edge_mutations: EdgeMutationConfig,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            species_count: 16,
            min_species_count: 4,
            individuals_per_species: 96,
            elites: 4,
            tournament_size: 8,
            parent_pool_percentage: 0.75,
            grace_generations: 2,
            stagnation_threshold: 10,
            species_diversity_threshold: 0.1,
            relative_performance_threshold: 0.6,
            seeds_per_individual: 5,
            fitness_aggregation: FitnessAggregation::Mean,
            weight_initialization: WeightInitialization::GlorotUniform,
            mutation_rates: MutationRates::default(),
            edge_mutations: EdgeMutationConfig::default(),
        }
    }
}

impl EvolutionConfig {
    /// Reject internally-inconsistent configuration. Called by [`Evolver::new`]; not by
    /// individual field setters, since this struct is built field-by-field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.species_count == 0 {
            return Err(ConfigError::ZeroSpeciesCount);
        }
        if self.individuals_per_species == 0 {
            return Err(ConfigError::ZeroIndividualsPerSpecies);
        }
        if self.min_species_count > self.species_count {
            return Err(ConfigError::MinSpeciesCountExceedsSpeciesCount {
                min: self.min_species_count,
                max: self.species_count,
            });
        }
        if self.tournament_size == 0 {
            return Err(ConfigError::ZeroTournamentSize);
        }
        if !(self.parent_pool_percentage > 0.0 && self.parent_pool_percentage <= 1.0) {
            return Err(ConfigError::BadParentPoolPercentage {
                value: self.parent_pool_percentage,
            });
        }
        Ok(())
    }

    /// `elites`, clamped so at least one offspring slot remains per species.
    fn effective_elites(&self, population_size: usize) -> usize {
        let clamped = self.elites.min(population_size.saturating_sub(1));
        if clamped < self.elites {
            log::warn!(
                "elites ({}) clamped to {clamped} to leave at least one offspring slot in a species of {population_size}",
                self.elites
            );
        }
        clamped
    }
}

/// A species' individuals plus its frozen topology and culling-related bookkeeping.
#[derive(Debug, Clone)]
pub struct Species {
    pub def: SpeciesDef,
    pub individuals: Vec<Individual>,
    /// Generations since this species was (re)created.
    pub age: u32,
    /// Generations since this species' best fitness last improved.
    pub stagnation: u32,
    /// Best fitness ever observed in this species, `-inf` until an individual has one.
    pub best_fitness: f64,
}

/// A population: one shared [`GenomeDef`] and every species evolving over it.
#[derive(Debug, Clone)]
pub struct Population {
    pub genome: GenomeDef,
    pub species: Vec<Species>,
}

/// Per-species fitness summary for one generation, used for culling and reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeciesStatistics {
    pub best: f64,
    pub median: f64,
    pub variance: f64,
    pub age: u32,
    pub stagnation: u32,
}

/// Population-wide statistics returned by [`Evolver::statistics`].
#[derive(Debug, Clone, PartialEq)]
pub struct Statistics {
    pub best_fitness: f64,
    pub mean_fitness: f64,
    pub per_species: Vec<SpeciesStatistics>,
}

/// Owns the RNG and config driving population lifecycle operations. Physics and evaluation are
/// external to this type; it only consumes fitness values already written into
/// [`Individual::fitness`].
pub struct Evolver {
    config: EvolutionConfig,
    rng: fastrand::Rng,
}

impl Evolver {
    /// Build an evolver over `config`, seeded for determinism. Rejects an inconsistent config;
    /// see [`EvolutionConfig::validate`].
    pub fn new(config: EvolutionConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            rng: fastrand::Rng::with_seed(seed),
        })
    }

    pub fn config(&self) -> &EvolutionConfig {
        &self.config
    }

    /// Combine one individual's seed-replicated fitness samples per `config.fitness_aggregation`.
    pub fn aggregate_fitness(&self, samples: &[f64]) -> f64 {
        aggregate(samples, self.config.fitness_aggregation)
    }

    /// Build `species_count` species over `genome`, each with the full link set active and
    /// `individuals_per_species` randomly-initialized individuals.
    pub fn initialize_population(&mut self, genome: GenomeDef) -> Population {
        let mut species = Vec::with_capacity(self.config.species_count);
        for _ in 0..self.config.species_count {
            let def = SpeciesDef::from_genome(&genome);
            let individuals = (0..self.config.individuals_per_species)
                .map(|_| Individual::random(&genome, &def, self.config.weight_initialization, &mut self.rng))
                .collect();
            species.push(Species {
                def,
                individuals,
                age: 0,
                stagnation: 0,
                best_fitness: f64::NEG_INFINITY,
            });
        }
        Population { genome, species }
    }

    /// Advance one generation: refresh stagnation bookkeeping, cull weak species (never below
    /// `MinSpeciesCount`), reproduce survivors (elitism + tournament selection), and reseed
    /// culled slots from the strongest surviving species.
    ///
    /// Requires every individual's `fitness` to already be set by the caller's evaluator; an
    /// individual left at `None` is treated as worse than any scored individual.
    pub fn step_generation(&mut self, population: &mut Population) {
        puffin::profile_function!();

        if population.species.is_empty() {
            return;
        }

        let stats: Vec<SpeciesStatistics> = population
            .species
            .iter()
            .map(|s| species_stats(s))
            .collect();
        for (species, stat) in population.species.iter_mut().zip(stats.iter()) {
            if stat.best > species.best_fitness {
                species.best_fitness = stat.best;
                species.stagnation = 0;
            } else {
                species.stagnation += 1;
            }
        }

        let best_median = stats.iter().map(|s| s.median).fold(f64::NEG_INFINITY, f64::max);
        let culled = self.select_cull_set(population, &stats, best_median);

        for (idx, species) in population.species.iter_mut().enumerate() {
            if culled.contains(&idx) {
                continue;
            }
            self.reproduce(&population.genome, species);
        }

        if !culled.is_empty() {
            let donor_idx = population
                .species
                .iter()
                .enumerate()
                .filter(|(idx, _)| !culled.contains(idx))
                .max_by(|(_, a), (_, b)| {
                    best_fitness_of(a).partial_cmp(&best_fitness_of(b)).unwrap()
                })
                .map(|(idx, _)| idx);

            if let Some(donor_idx) = donor_idx {
                let donor = population.species[donor_idx].clone();
                for &idx in &culled {
                    population.species[idx] = self.reseed(&population.genome, &donor);
                }
            }
        }

        for species in population.species.iter_mut() {
            species.age += 1;
        }
    }

    /// Indices eligible for culling this generation, bounded so the population never drops below
    /// `MinSpeciesCount`.
    fn select_cull_set(
        &self,
        population: &Population,
        stats: &[SpeciesStatistics],
        best_median: f64,
    ) -> HashSet<usize> {
        let cfg = &self.config;
        let eligible: Vec<usize> = (0..population.species.len())
            .filter(|&idx| {
                let s = &population.species[idx];
                let stat = &stats[idx];
                s.age > cfg.grace_generations
                    && (stat.stagnation >= cfg.stagnation_threshold
                        || stat.variance < cfg.species_diversity_threshold
                        || stat.median < cfg.relative_performance_threshold * best_median)
            })
            .sorted_by(|&a, &b| stats[a].median.partial_cmp(&stats[b].median).unwrap())
            .collect();

        let max_cullable = population.species.len().saturating_sub(cfg.min_species_count);
        eligible.into_iter().take(max_cullable).collect()
    }

    /// Replace a species' individuals with elites plus tournament-selected, mutated offspring.
    fn reproduce(&mut self, genome: &GenomeDef, species: &mut Species) {
        let pop_size = species.individuals.len();
        if pop_size == 0 {
            return;
        }
        let elites = self.config.effective_elites(pop_size);

        let ranked: Vec<usize> = (0..pop_size)
            .sorted_by(|&a, &b| {
                fitness_of(&species.individuals[b])
                    .partial_cmp(&fitness_of(&species.individuals[a]))
                    .unwrap()
            })
            .collect();

        let pool_size = ((ranked.len() as f64 * self.config.parent_pool_percentage).ceil() as usize)
            .max(1)
            .min(ranked.len());
        let pool = &ranked[..pool_size];

        let mut next = Vec::with_capacity(pop_size);
        for &idx in ranked.iter().take(elites) {
            next.push(species.individuals[idx].clone_for_reproduction());
        }
        while next.len() < pop_size {
            let tournament_size = self.config.tournament_size.min(pool.len());
            let mut best_idx = pool[self.rng.usize(..pool.len())];
            for _ in 1..tournament_size {
                let candidate = pool[self.rng.usize(..pool.len())];
                if fitness_of(&species.individuals[candidate]) > fitness_of(&species.individuals[best_idx]) {
                    best_idx = candidate;
                }
            }
            let mut offspring = species.individuals[best_idx].clone_for_reproduction();
            offspring.fitness = None;
            // fresh clone still carries the parent's weight/bias/activation values; mutate below.
            next.push(offspring);
        }

        for individual in next.iter_mut().skip(elites) {
            individual.mutate(genome, &self.config.mutation_rates, &mut self.rng);
        }

        species.individuals = next;
    }

    /// Build a freshly-mutated species derived from `donor`: clone its topology, apply structural
    /// mutation, then populate with mutated clones of its strongest individual.
    fn reseed(&mut self, genome: &GenomeDef, donor: &Species) -> Species {
        let mut def = donor.def.clone();
        mutate_topology(&mut def, genome, &self.config.edge_mutations, &mut self.rng);

        let parent = donor
            .individuals
            .iter()
            .max_by(|a, b| fitness_of(a).partial_cmp(&fitness_of(b)).unwrap())
            .cloned()
            .unwrap_or_else(|| Individual::random(genome, &def, self.config.weight_initialization, &mut self.rng));

        if self.config.edge_mutations.weak_edge_pruning.enabled
            && self.config.edge_mutations.weak_edge_pruning.on_birth
        {
            weak_edge_prune(
                &mut def,
                genome,
                &parent.weights,
                &self.config.edge_mutations.weak_edge_pruning,
                &mut self.rng,
            );
        }

        let individuals = (0..self.config.individuals_per_species)
            .map(|_| {
                let mut child = Individual::random(genome, &def, self.config.weight_initialization, &mut self.rng);
                inherit_matching_params(&mut child, &parent);
                child.mutate(genome, &self.config.mutation_rates, &mut self.rng);
                child.fitness = None;
                child
            })
            .collect();

        Species {
            def,
            individuals,
            age: 0,
            stagnation: 0,
            best_fitness: f64::NEG_INFINITY,
        }
    }

    /// Summary statistics over the whole population and each of its species.
    pub fn statistics(&self, population: &Population) -> Statistics {
        let per_species: Vec<SpeciesStatistics> = population.species.iter().map(species_stats).collect();
        let best_fitness = per_species.iter().map(|s| s.best).fold(f64::NEG_INFINITY, f64::max);
        let all_fitness: Vec<f64> = population
            .species
            .iter()
            .flat_map(|s| s.individuals.iter().filter_map(|i| i.fitness))
            .collect();
        let mean_fitness = if all_fitness.is_empty() {
            f64::NEG_INFINITY
        } else {
            all_fitness.iter().sum::<f64>() / all_fitness.len() as f64
        };
        Statistics {
            best_fitness,
            mean_fitness,
            per_species,
        }
    }
}

fn fitness_of(individual: &Individual) -> f64 {
    individual.fitness.unwrap_or(f64::NEG_INFINITY)
}

fn best_fitness_of(species: &Species) -> f64 {
    species
        .individuals
        .iter()
        .map(fitness_of)
        .fold(f64::NEG_INFINITY, f64::max)
}

fn species_stats(species: &Species) -> SpeciesStatistics {
    let mut values: Vec<f64> = species.individuals.iter().filter_map(|i| i.fitness).collect();
    if values.is_empty() {
        return SpeciesStatistics {
            best: f64::NEG_INFINITY,
            median: f64::NEG_INFINITY,
            variance: 0.0,
            age: species.age,
            stagnation: species.stagnation,
        };
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let best = values[values.len() - 1];
    let median = values[values.len() / 2];
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    SpeciesStatistics {
        best,
        median,
        variance,
        age: species.age,
        stagnation: species.stagnation,
    }
}

/// Copy `parent`'s values into `child` wherever `child` already has a slot for that id (i.e. the
/// id survived whatever structural mutation produced `child`'s species).
fn inherit_matching_params(child: &mut Individual, parent: &Individual) {
    for (id, value) in child.weights.iter_mut() {
        if let Some(&parent_value) = parent.weights.get(id) {
            *value = parent_value;
        }
    }
    for (id, value) in child.biases.iter_mut() {
        if let Some(&parent_value) = parent.biases.get(id) {
            *value = parent_value;
        }
    }
    for (id, activation) in child.activations.iter_mut() {
        if let Some(&parent_activation) = parent.activations.get(id) {
            *activation = parent_activation;
        }
    }
}
