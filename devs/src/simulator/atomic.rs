use super::event::{ExternalEvent, InternalEvent, ObservationEvent, OutputMessage, RequestEvent};
use super::services::Services;
use super::time::Time;
use crate::graph::NodeId;
use crate::models::{AtomicModel, Disposition, Dynamics, Reportable};
use crate::utils::errors::{InvalidStateError, ModelError, SimulationError};

/// Handle of one simulator in the coordinator's table.  Handles are
/// allocated in registration order and never reused within a run, so they
/// double as the documented same-instant tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimulatorId(pub(crate) usize);

/// A `Simulator` wraps exactly one atomic model: it keeps the model's local
/// clock (last transition time `tL`, next internal time `tN`), forwards the
/// DEVS callbacks, and remembers the structural node used for connection
/// resolution.  The wrapped model is dropped early by `clear` during
/// two-phase deletion; the shell lingers on the pending list until the
/// current bag has fully drained.
pub struct Simulator {
    id: SimulatorId,
    node: NodeId,
    name: String,
    model: Option<AtomicModel>,
    tl: Time,
    tn: Time,
}

impl Simulator {
    pub(crate) fn new(id: SimulatorId, node: NodeId, name: String, model: AtomicModel) -> Self {
        Self {
            id,
            node,
            name,
            model: Some(model),
            tl: Time::ZERO,
            tn: Time::INFINITY,
        }
    }

    pub fn id(&self) -> SimulatorId {
        self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The full structural name, used in traces and view records.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tl(&self) -> Time {
        self.tl
    }

    pub fn tn(&self) -> Time {
        self.tn
    }

    pub fn is_cleared(&self) -> bool {
        self.model.is_none()
    }

    pub fn status(&self) -> String {
        match &self.model {
            Some(model) => model.status(),
            None => String::from("cleared"),
        }
    }

    pub fn state(&self) -> serde_yaml::Value {
        match &self.model {
            Some(model) => model.state(),
            None => serde_yaml::Value::Null,
        }
    }

    fn model_mut(&mut self) -> Result<&mut AtomicModel, SimulationError> {
        self.model
            .as_mut()
            .ok_or_else(|| InvalidStateError::SimulatorCleared(self.name.clone()).into())
    }

    /// Applies a transition's time advance to the local clock and converts
    /// it into the next internal event, if any.
    fn apply_advance(
        &mut self,
        time: Time,
        advance: Time,
    ) -> Result<Option<InternalEvent>, SimulationError> {
        if advance < Time::ZERO {
            return Err(ModelError::NegativeTimeAdvance.into());
        }
        self.tl = time;
        self.tn = time + advance;
        if self.tn.is_finite() {
            Ok(Some(InternalEvent {
                time: self.tn,
                target: self.id,
            }))
        } else {
            Ok(None)
        }
    }

    pub(crate) fn init(
        &mut self,
        time: Time,
        services: &mut Services,
    ) -> Result<Option<InternalEvent>, SimulationError> {
        let advance = self.model_mut()?.init(time, services)?;
        log::trace!("init {} ta={}", self.name, advance);
        self.apply_advance(time, advance)
    }

    pub(crate) fn output(
        &mut self,
        time: Time,
        services: &mut Services,
    ) -> Result<Vec<OutputMessage>, SimulationError> {
        self.model_mut()?.output(time, services)
    }

    pub(crate) fn internal_transition(
        &mut self,
        time: Time,
        services: &mut Services,
    ) -> Result<Option<InternalEvent>, SimulationError> {
        let advance = self.model_mut()?.internal(time, services)?;
        log::trace!("internal {} at {} ta={}", self.name, time, advance);
        self.apply_advance(time, advance)
    }

    pub(crate) fn external_transition(
        &mut self,
        events: &[ExternalEvent],
        time: Time,
        services: &mut Services,
    ) -> Result<Option<InternalEvent>, SimulationError> {
        let advance = self.model_mut()?.external(events, time, services)?;
        log::trace!(
            "external {} at {} ({} events) ta={}",
            self.name,
            time,
            events.len(),
            advance
        );
        self.apply_advance(time, advance)
    }

    pub(crate) fn confluent_transitions(
        &mut self,
        internal: &InternalEvent,
        externals: &[ExternalEvent],
    ) -> Result<Disposition, SimulationError> {
        Ok(self.model_mut()?.confluent(internal, externals))
    }

    pub(crate) fn request(
        &mut self,
        event: &RequestEvent,
        time: Time,
        services: &mut Services,
    ) -> Result<Vec<OutputMessage>, SimulationError> {
        self.model_mut()?.request(event, time, services)
    }

    pub(crate) fn observation(
        &self,
        event: &ObservationEvent,
    ) -> Result<serde_yaml::Value, SimulationError> {
        match &self.model {
            Some(model) => model.observation(event),
            None => Err(InvalidStateError::SimulatorCleared(self.name.clone()).into()),
        }
    }

    pub(crate) fn finish(&mut self, time: Time) {
        if let Some(model) = &mut self.model {
            model.finish(time);
        }
    }

    /// Drops the wrapped model, breaking every reference it holds, while
    /// the shell stays on the pending-deletion list until the bag in
    /// flight has drained.
    pub(crate) fn clear(&mut self) {
        self.model = None;
    }
}
