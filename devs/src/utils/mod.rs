//! The utilities module provides general capabilities that span the graph,
//! models, project, and simulator modules.  Today this is the simulation
//! error taxonomy.

pub mod errors;
