//! Views are named observation sinks.  A timed view self-schedules at a
//! fixed period, an event view fires at every transition of a subscribed
//! simulator, and a finish view fires once at the end of the run.  Each
//! view writes through its own stream writer; a writer failure costs the
//! record, never the run.

use serde::{Deserialize, Serialize};

use super::atomic::SimulatorId;
use super::event::ObservationEvent;
use super::stream::{ObservationRecord, StreamWriter};
use super::time::Time;

/// The firing policy of a view.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ViewKind {
    Timed { period: Time },
    Event,
    Finish,
}

pub struct View {
    name: String,
    kind: ViewKind,
    // Ordered: finish observations replay subscriptions in the order they
    // were attached.
    subscriptions: Vec<(SimulatorId, String)>,
    stream: Box<dyn StreamWriter>,
    io_failures: usize,
}

impl View {
    pub fn new(name: String, kind: ViewKind, stream: Box<dyn StreamWriter>) -> Self {
        Self {
            name,
            kind,
            subscriptions: Vec::new(),
            stream,
            io_failures: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn is_timed(&self) -> bool {
        matches!(self.kind, ViewKind::Timed { .. })
    }

    pub fn is_event(&self) -> bool {
        matches!(self.kind, ViewKind::Event)
    }

    pub fn is_finish(&self) -> bool {
        matches!(self.kind, ViewKind::Finish)
    }

    pub fn subscriptions(&self) -> &[(SimulatorId, String)] {
        &self.subscriptions
    }

    /// How many records the stream writer has failed to persist.
    pub fn io_failures(&self) -> usize {
        self.io_failures
    }

    /// Attaches `(simulator, port)`.  A timed view answers with its first
    /// observation event, at the current time.
    pub fn subscribe(
        &mut self,
        simulator: SimulatorId,
        port: &str,
        time: Time,
    ) -> Option<ObservationEvent> {
        let subscription = (simulator, port.to_string());
        if self.subscriptions.contains(&subscription) {
            return None;
        }
        self.subscriptions.push(subscription);
        match self.kind {
            ViewKind::Timed { .. } => Some(ObservationEvent {
                time,
                target: simulator,
                port_name: port.to_string(),
                view_name: self.name.clone(),
            }),
            ViewKind::Event | ViewKind::Finish => None,
        }
    }

    /// Detaches every subscription of `simulator`; part of dynamic model
    /// deletion.
    pub fn unsubscribe_model(&mut self, simulator: SimulatorId) {
        self.subscriptions.retain(|(id, _)| *id != simulator);
    }

    pub fn observes(&self, simulator: SimulatorId) -> bool {
        self.subscriptions.iter().any(|(id, _)| *id == simulator)
    }

    pub fn ports_of(&self, simulator: SimulatorId) -> Vec<String> {
        self.subscriptions
            .iter()
            .filter(|(id, _)| *id == simulator)
            .map(|(_, port)| port.clone())
            .collect()
    }

    /// Hands one observed value to the stream writer.  A timed view answers
    /// with its next tick, one period later.
    pub fn process(
        &mut self,
        event: &ObservationEvent,
        model: &str,
        value: serde_yaml::Value,
    ) -> Option<ObservationEvent> {
        let record = ObservationRecord {
            time: event.time,
            model: model.to_string(),
            port: event.port_name.clone(),
            view: self.name.clone(),
            value,
        };
        if let Err(error) = self.stream.process(&record) {
            self.io_failures += 1;
            log::warn!("view {} dropped a record: {}", self.name, error);
        }
        match self.kind {
            ViewKind::Timed { period } => Some(ObservationEvent {
                time: event.time + period,
                target: event.target,
                port_name: event.port_name.clone(),
                view_name: self.name.clone(),
            }),
            ViewKind::Event | ViewKind::Finish => None,
        }
    }

    /// Closes the stream writer.
    pub fn finish(&mut self, time: Time) {
        if let Err(error) = self.stream.close(time) {
            log::warn!("view {} failed to close its stream: {}", self.name, error);
        }
    }
}
