//! The simulator module provides the mechanics to orchestrate atomic models
//! via discrete event simulation.  The specific formalism for simulation
//! execution is the Discrete Event System Specification: every model is
//! wrapped in a `Simulator` holding its local clock, the `EventTable` keeps
//! the pending events in time order, and the `Coordinator` drains one
//! complete time instant per `run` call - transitions first, observations
//! after.
//!
//! The driver contract is four calls: build a `Coordinator` from a project
//! descriptor, peek `next_time`, `run` single instants (or `run_until` a
//! horizon), and `finish` to flush the observation views.

pub mod atomic;
pub mod coordinator;
pub mod event;
pub mod event_table;
pub mod executive;
pub mod services;
pub mod stream;
pub mod time;
pub mod view;

pub use self::atomic::{Simulator, SimulatorId};
pub use self::coordinator::{Config, Coordinator};
pub use self::event::{
    AttributeMap, CompleteEventBagModel, EventBagModel, ExternalEvent, InternalEvent,
    ObservationEvent, OutputMessage, RequestEvent,
};
pub use self::event_table::EventTable;
pub use self::executive::Executive;
pub use self::services::{dyn_rng, DynRng, Services, SimulationRng};
pub use self::stream::{LocalStreamWriter, NetStreamWriter, ObservationRecord, StreamWriter};
pub use self::time::Time;
pub use self::view::{View, ViewKind};
