use super::Disposition;
use crate::simulator::{
    ExternalEvent, InternalEvent, ObservationEvent, OutputMessage, RequestEvent, Services, Time,
};
use crate::utils::errors::SimulationError;

pub trait DynamicsClone {
    fn clone_box(&self) -> Box<dyn ReportableDynamics>;
}

impl<T> DynamicsClone for T
where
    T: 'static + ReportableDynamics + Clone,
{
    fn clone_box(&self) -> Box<dyn ReportableDynamics> {
        Box::new(self.clone())
    }
}

impl Clone for Box<dyn ReportableDynamics> {
    fn clone(&self) -> Box<dyn ReportableDynamics> {
        self.clone_box()
    }
}

pub trait SerializableDynamics {
    fn get_type(&self) -> &'static str {
        "Dynamics"
    }
    fn serialize(&self) -> serde_yaml::Value {
        serde_yaml::Value::Null
    }
}

/// The `Dynamics` trait is the behavioral surface every atomic model
/// implements.  The simulator calls `init` once, then alternates between
/// `output`+`internal` at self-scheduled instants and `external` when
/// routed events arrive; `confluent` breaks the tie when both collide at
/// the same instant.  Each transition returns the model's next time
/// advance, measured from the current time; `Time::INFINITY` passivates
/// the model.
///
/// `request` answers a synchronous query within the instant, and
/// `observation` is a pure read of the current state on behalf of a view.
/// Both have passive defaults, as does `confluent` (external-first, the
/// conventional tie-break) and the end-of-run `finish` hook.
pub trait Dynamics: DynamicsClone + SerializableDynamics {
    fn init(&mut self, time: Time, services: &mut Services) -> Result<Time, SimulationError>;

    fn output(
        &mut self,
        time: Time,
        services: &mut Services,
    ) -> Result<Vec<OutputMessage>, SimulationError>;

    fn internal(&mut self, time: Time, services: &mut Services) -> Result<Time, SimulationError>;

    fn external(
        &mut self,
        events: &[ExternalEvent],
        time: Time,
        services: &mut Services,
    ) -> Result<Time, SimulationError>;

    fn confluent(&mut self, internal: &InternalEvent, externals: &[ExternalEvent]) -> Disposition {
        let _ = (internal, externals);
        Disposition::External
    }

    fn request(
        &mut self,
        event: &RequestEvent,
        time: Time,
        services: &mut Services,
    ) -> Result<Vec<OutputMessage>, SimulationError> {
        let _ = (event, time, services);
        Ok(Vec::new())
    }

    fn observation(&self, event: &ObservationEvent) -> Result<serde_yaml::Value, SimulationError> {
        let _ = event;
        Ok(serde_yaml::Value::Null)
    }

    fn finish(&mut self, time: Time) {
        let _ = time;
    }
}

/// The status method of `Reportable` provides improved simulation
/// reasoning, reporting, and debugging, but does not impact simulation
/// execution or results.
pub trait Reportable {
    fn status(&self) -> String;
}

/// A `ReportableDynamics` has the behavioral surface of trait `Dynamics`
/// and the status reporting of trait `Reportable`.
pub trait ReportableDynamics: Dynamics + Reportable {}
