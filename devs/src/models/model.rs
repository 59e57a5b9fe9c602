use super::model_trait::{
    Dynamics, Reportable, ReportableDynamics, SerializableDynamics,
};
use super::Disposition;
use crate::simulator::{
    ExternalEvent, InternalEvent, ObservationEvent, OutputMessage, RequestEvent, Services, Time,
};
use crate::utils::errors::SimulationError;

/// `AtomicModel` wraps a boxed dynamics value and the structural name it
/// was instantiated under.  The simulator requires every model to carry its
/// name for traces and view records.
#[derive(Clone)]
pub struct AtomicModel {
    name: String,
    inner: Box<dyn ReportableDynamics>,
}

impl AtomicModel {
    pub fn new(name: String, inner: Box<dyn ReportableDynamics>) -> Self {
        Self { name, inner }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Value dump of the wrapped dynamics, for snapshots and debugging.
    pub fn state(&self) -> serde_yaml::Value {
        self.inner.serialize()
    }
}

impl SerializableDynamics for AtomicModel {
    fn get_type(&self) -> &'static str {
        self.inner.get_type()
    }

    fn serialize(&self) -> serde_yaml::Value {
        self.inner.serialize()
    }
}

impl Dynamics for AtomicModel {
    fn init(&mut self, time: Time, services: &mut Services) -> Result<Time, SimulationError> {
        self.inner.init(time, services)
    }

    fn output(
        &mut self,
        time: Time,
        services: &mut Services,
    ) -> Result<Vec<OutputMessage>, SimulationError> {
        self.inner.output(time, services)
    }

    fn internal(&mut self, time: Time, services: &mut Services) -> Result<Time, SimulationError> {
        self.inner.internal(time, services)
    }

    fn external(
        &mut self,
        events: &[ExternalEvent],
        time: Time,
        services: &mut Services,
    ) -> Result<Time, SimulationError> {
        self.inner.external(events, time, services)
    }

    fn confluent(&mut self, internal: &InternalEvent, externals: &[ExternalEvent]) -> Disposition {
        self.inner.confluent(internal, externals)
    }

    fn request(
        &mut self,
        event: &RequestEvent,
        time: Time,
        services: &mut Services,
    ) -> Result<Vec<OutputMessage>, SimulationError> {
        self.inner.request(event, time, services)
    }

    fn observation(&self, event: &ObservationEvent) -> Result<serde_yaml::Value, SimulationError> {
        self.inner.observation(event)
    }

    fn finish(&mut self, time: Time) {
        self.inner.finish(time);
    }
}

impl Reportable for AtomicModel {
    fn status(&self) -> String {
        self.inner.status()
    }
}

impl ReportableDynamics for AtomicModel {}
