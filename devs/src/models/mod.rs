//! The models module defines what an atomic model is: the `Dynamics`
//! behavioral surface, the wrapper and factory machinery used to build
//! models from project descriptors, and a small set of prebuilt dynamics
//! for easy reuse in simulation products and projects.

use rand::distributions::Distribution;
use rand_distr::Exp;
use serde::{Deserialize, Serialize};

use crate::simulator::{Services, Time};
use crate::utils::errors::{ModelError, SimulationError};

pub mod accumulator;
pub mod model;
pub mod pulse_generator;
pub mod queue;

pub mod model_factory;
pub mod model_repr;
pub mod model_trait;

pub use self::accumulator::Accumulator;
pub use self::model::AtomicModel;
pub use self::model_factory::{create, register, DynamicsConstructor, ModelFactory};
pub use self::model_repr::{AtomicRepr, CoupledRepr, ModelRepr};
pub use self::model_trait::{
    Dynamics, DynamicsClone, Reportable, ReportableDynamics, SerializableDynamics,
};
pub use self::pulse_generator::PulseGenerator;
pub use self::queue::Queue;

/// The resolution of a confluent transition: which path the model runs when
/// an internal and at least one external event collide at the same instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Disposition {
    Internal,
    External,
}

/// A configurable delay, used by the prebuilt dynamics for interarrival and
/// service times.  A constant delay gives non-stochastic behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum RandomDelay {
    Constant { value: f64 },
    Exponential { mean: f64 },
}

impl RandomDelay {
    pub fn draw(&self, services: &mut Services) -> Result<Time, SimulationError> {
        match self {
            RandomDelay::Constant { value } => Ok(Time::new(*value)),
            RandomDelay::Exponential { mean } => {
                let distribution =
                    Exp::new(1.0 / mean).map_err(|_| ModelError::InvalidConfiguration)?;
                let rng = services.global_rng();
                let mut rng = rng.borrow_mut();
                Ok(Time::new(distribution.sample(&mut *rng)))
            }
        }
    }
}
