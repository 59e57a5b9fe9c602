use std::cell::RefCell;
use std::rc::Rc;

use rand_core::SeedableRng;

use super::executive::{Directive, Executive};
use super::time::Time;

pub trait SimulationRng: std::fmt::Debug + rand_core::RngCore {}
impl<T: std::fmt::Debug + rand_core::RngCore> SimulationRng for T {}
pub type DynRng = Rc<RefCell<dyn SimulationRng>>;

pub(crate) fn default_rng() -> DynRng {
    Rc::new(RefCell::new(rand_pcg::Pcg64Mcg::new(42)))
}

pub(crate) fn seeded_rng(seed: u64) -> DynRng {
    Rc::new(RefCell::new(rand_pcg::Pcg64Mcg::seed_from_u64(seed)))
}

pub fn dyn_rng<Rng: SimulationRng + 'static>(rng: Rng) -> DynRng {
    Rc::new(RefCell::new(rng))
}

/// The coordinator provides a uniform random number generator, the
/// simulation clock, and the executive surface to models during the
/// execution of a simulation.  `Services` is the only channel from a model
/// back into the engine; there is no process-wide state.
pub struct Services {
    pub(crate) global_rng: DynRng,
    pub(crate) global_time: Time,
    executive: Executive,
}

impl Services {
    pub(crate) fn new(global_rng: DynRng, begin: Time) -> Self {
        Self {
            global_rng,
            global_time: begin,
            executive: Executive::default(),
        }
    }

    pub fn global_rng(&self) -> DynRng {
        self.global_rng.clone()
    }

    pub fn global_time(&self) -> Time {
        self.global_time
    }

    pub(crate) fn set_global_time(&mut self, time: Time) {
        self.global_time = time;
    }

    /// The dynamic structure surface, for executive models.
    pub fn executive(&mut self) -> &mut Executive {
        &mut self.executive
    }

    pub(crate) fn take_directives(&mut self) -> Vec<Directive> {
        self.executive.take()
    }
}
