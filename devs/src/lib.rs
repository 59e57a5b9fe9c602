//! # Overview
//! "Devs" provides a discrete event simulation engine built on the Discrete
//! Event System Specification formalism.
//!
//! This repository contains:
//!
//! * A simulation coordinator and its event scheduler, implementing the
//! DEVS execution algorithm: confluent transition resolution, same-instant
//! request draining, and deterministic event ordering.
//! * A structural model graph, with coupled models, port couplings, and
//! transitive connection resolution for event routing.
//! * Dynamic structure support, so executive models can create and delete
//! models while the simulation runs.
//! * An observation subsystem of timed, event, and finish views, writing
//! traces through local or distant stream writers.
//! * Pre-built atomic dynamics, for quickly assembling simulations of
//! dynamic systems from common modular components.
pub mod graph;
pub mod models;
pub mod project;
pub mod simulator;
pub mod utils;

pub use crate::utils::errors::SimulationError;
