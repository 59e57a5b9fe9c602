//! The event family of the simulation core.  Events are tagged variants
//! rather than a class hierarchy: each kind is a plain struct, and the
//! per-simulator bag groups the kinds that may collide at one instant.

use std::collections::BTreeMap;

use super::atomic::SimulatorId;
use super::time::Time;

/// Opaque attribute payload of an external or request event, keyed by
/// attribute name.  A `BTreeMap` keeps iteration deterministic.
pub type AttributeMap = BTreeMap<String, serde_yaml::Value>;

/// A self-scheduled event: the target simulator's next internal transition.
#[derive(Debug, Clone)]
pub struct InternalEvent {
    pub time: Time,
    pub target: SimulatorId,
}

/// A message travelling between two simulators, already resolved to its
/// destination port by routing.
#[derive(Debug, Clone)]
pub struct ExternalEvent {
    pub time: Time,
    pub source: SimulatorId,
    pub target: SimulatorId,
    pub port_name: String,
    pub attributes: AttributeMap,
}

/// Like an external event, but the destination must answer synchronously
/// within the same time instant.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    pub time: Time,
    pub source: SimulatorId,
    pub target: SimulatorId,
    pub port_name: String,
    pub attributes: AttributeMap,
}

/// A read of one observed port, on behalf of a named view.
#[derive(Debug, Clone)]
pub struct ObservationEvent {
    pub time: Time,
    pub target: SimulatorId,
    pub port_name: String,
    pub view_name: String,
}

/// What a model emits from `output` or `request`: a message on one of its
/// own output ports, not yet routed through the connection graph.  A
/// request-flagged message becomes a [`RequestEvent`] at each destination.
#[derive(Debug, Clone)]
pub struct OutputMessage {
    pub port_name: String,
    pub attributes: AttributeMap,
    pub request: bool,
}

impl OutputMessage {
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            attributes: AttributeMap::new(),
            request: false,
        }
    }

    pub fn request(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            attributes: AttributeMap::new(),
            request: true,
        }
    }

    pub fn with_attribute(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_yaml::Value>,
    ) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

/// Every event addressed to one simulator at one time instant: at most one
/// internal event, any number of externals, any number of requests.  An
/// empty bag is the terminal condition of the drain loop.
#[derive(Debug, Default)]
pub struct EventBagModel {
    internal: Option<InternalEvent>,
    externals: Vec<ExternalEvent>,
    requests: Vec<RequestEvent>,
}

impl EventBagModel {
    pub fn is_empty(&self) -> bool {
        self.internal.is_none() && self.externals.is_empty() && self.requests.is_empty()
    }

    pub fn has_internal(&self) -> bool {
        self.internal.is_some()
    }

    pub fn has_externals(&self) -> bool {
        !self.externals.is_empty()
    }

    pub fn has_requests(&self) -> bool {
        !self.requests.is_empty()
    }

    pub fn set_internal(&mut self, event: InternalEvent) {
        self.internal = Some(event);
    }

    pub fn push_external(&mut self, event: ExternalEvent) {
        self.externals.push(event);
    }

    pub fn push_request(&mut self, event: RequestEvent) {
        self.requests.push(event);
    }

    pub fn internal(&self) -> Option<&InternalEvent> {
        self.internal.as_ref()
    }

    pub fn externals(&self) -> &[ExternalEvent] {
        &self.externals
    }

    pub fn take_internal(&mut self) -> Option<InternalEvent> {
        self.internal.take()
    }

    pub fn take_externals(&mut self) -> Vec<ExternalEvent> {
        std::mem::take(&mut self.externals)
    }

    pub fn take_requests(&mut self) -> Vec<RequestEvent> {
        std::mem::take(&mut self.requests)
    }

    pub fn discard_externals(&mut self) {
        self.externals.clear();
    }
}

/// All per-simulator bags whose scheduled time equals the event table's
/// minimum, plus the time-equal observation queue.  Bags drain in simulator
/// registration order; routing during the drain may refill any bag, so the
/// drain re-scans from the front until every bag is empty.
#[derive(Debug)]
pub struct CompleteEventBagModel {
    time: Time,
    bags: BTreeMap<SimulatorId, EventBagModel>,
    observations: Vec<ObservationEvent>,
}

impl CompleteEventBagModel {
    pub fn empty() -> Self {
        Self {
            time: Time::INFINITY,
            bags: BTreeMap::new(),
            observations: Vec::new(),
        }
    }

    pub(crate) fn new(
        time: Time,
        bags: BTreeMap<SimulatorId, EventBagModel>,
        observations: Vec<ObservationEvent>,
    ) -> Self {
        Self {
            time,
            bags,
            observations,
        }
    }

    pub fn time(&self) -> Time {
        self.time
    }

    pub fn is_empty(&self) -> bool {
        self.bags.values().all(EventBagModel::is_empty) && self.observations.is_empty()
    }

    /// The first simulator, in registration order, with a non-empty bag.
    pub fn next_bag(&self) -> Option<SimulatorId> {
        self.bags
            .iter()
            .find(|(_, bag)| !bag.is_empty())
            .map(|(id, _)| *id)
    }

    pub fn bag_mut(&mut self, simulator: SimulatorId) -> &mut EventBagModel {
        self.bags.entry(simulator).or_default()
    }

    /// Routing targets the in-flight bag when the event lands on the instant
    /// being drained.
    pub fn put_external(&mut self, event: ExternalEvent) {
        self.bag_mut(event.target).push_external(event);
    }

    pub fn put_request(&mut self, event: RequestEvent) {
        self.bag_mut(event.target).push_request(event);
    }

    pub fn take_observations(&mut self) -> Vec<ObservationEvent> {
        std::mem::take(&mut self.observations)
    }

    /// Drops every event mentioning `simulator`, as part of dynamic model
    /// deletion while this bag is being drained.
    pub fn delete_events_for(&mut self, simulator: SimulatorId) {
        self.bags.remove(&simulator);
        for bag in self.bags.values_mut() {
            bag.externals
                .retain(|e| e.source != simulator && e.target != simulator);
            bag.requests
                .retain(|e| e.source != simulator && e.target != simulator);
        }
        self.observations.retain(|e| e.target != simulator);
    }
}
