use serde::{Deserialize, Serialize};

use super::model_trait::{Reportable, ReportableDynamics, SerializableDynamics};
use super::{Dynamics, RandomDelay};
use crate::simulator::{
    ExternalEvent, ObservationEvent, OutputMessage, Services, Time,
};
use crate::utils::errors::{ModelError, SimulationError, StructuralError};

use devs_derive::SerializableDynamics;

/// The pulse generator emits a job on every internal transition, with a
/// configurable interarrival delay.  It receives no messages and runs
/// through perpetuity; its `count` port observes how many jobs have been
/// emitted so far.
#[derive(Debug, Clone, Serialize, Deserialize, SerializableDynamics)]
#[serde(rename_all = "camelCase")]
pub struct PulseGenerator {
    interarrival: RandomDelay,
    #[serde(default)]
    ports_out: PortsOut,
    #[serde(default)]
    state: State,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortsOut {
    job: String,
}

impl Default for PortsOut {
    fn default() -> Self {
        Self {
            job: String::from("job"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct State {
    count: u64,
}

impl PulseGenerator {
    pub fn new(interarrival: RandomDelay, job_port: impl Into<String>) -> Self {
        Self {
            interarrival,
            ports_out: PortsOut {
                job: job_port.into(),
            },
            state: State::default(),
        }
    }
}

impl Dynamics for PulseGenerator {
    fn init(&mut self, _time: Time, services: &mut Services) -> Result<Time, SimulationError> {
        self.interarrival.draw(services)
    }

    fn output(
        &mut self,
        _time: Time,
        _services: &mut Services,
    ) -> Result<Vec<OutputMessage>, SimulationError> {
        Ok(vec![OutputMessage::new(self.ports_out.job.clone())
            .with_attribute("job", self.state.count)])
    }

    fn internal(&mut self, _time: Time, services: &mut Services) -> Result<Time, SimulationError> {
        self.state.count += 1;
        self.interarrival.draw(services)
    }

    fn external(
        &mut self,
        events: &[ExternalEvent],
        _time: Time,
        _services: &mut Services,
    ) -> Result<Time, SimulationError> {
        let port = events
            .first()
            .map(|event| event.port_name.clone())
            .unwrap_or_default();
        Err(ModelError::UnexpectedMessage(port).into())
    }

    fn observation(&self, event: &ObservationEvent) -> Result<serde_yaml::Value, SimulationError> {
        match event.port_name.as_str() {
            "count" => Ok(serde_yaml::Value::from(self.state.count)),
            _ => Err(StructuralError::UnknownPort {
                model: self.get_type().to_string(),
                port: event.port_name.clone(),
            }
            .into()),
        }
    }
}

impl Reportable for PulseGenerator {
    fn status(&self) -> String {
        format!["Generated {} jobs", self.state.count]
    }
}

impl ReportableDynamics for PulseGenerator {}
