//! 2-D XPBD physics and fixed-topology neuroevolution research kernel.
//!
//! Two independent cores share this crate:
//!
//! - Physics ([`world`], [`integrator`], [`solver`], [`collision`], [`stepper`], [`vecmath`],
//!   [`gpu`]): a fixed-timestep Extended Position-Based Dynamics simulator over particles and
//!   rigid bodies. Call [`stepper::Stepper::step`] once per frame.
//! - Neuroevolution ([`genome`], [`topology`], [`fitness`], [`evolver`]): a layered DAG network
//!   representation with species-shared topology, compiled into a flat executable layout and
//!   evolved generation over generation by [`evolver::Evolver`].
//!
//! Task environments, CLI parsing, configuration loading, and rendering are out of scope; this
//! crate only ever consumes fitness values and produces control signals.

pub mod collision;
pub mod error;
pub mod evolver;
pub mod fitness;
pub mod genome;
pub mod gpu;
pub mod integrator;
pub mod logging;
pub mod solver;
pub mod stepper;
pub mod topology;
pub mod vecmath;
pub mod world;
