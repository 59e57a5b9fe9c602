use serde::{Deserialize, Serialize};

use super::model_trait::{Reportable, ReportableDynamics, SerializableDynamics};
use super::Dynamics;
use crate::simulator::{
    ExternalEvent, ObservationEvent, OutputMessage, RequestEvent, Services, Time,
};
use crate::utils::errors::{ModelError, SimulationError, StructuralError};

use devs_derive::SerializableDynamics;

/// A passive terminal store.  It counts and retains everything arriving on
/// its store port, never self-schedules, and answers synchronous requests
/// with its current tally on the response port.
#[derive(Debug, Clone, Serialize, Deserialize, SerializableDynamics)]
#[serde(rename_all = "camelCase")]
pub struct Accumulator {
    #[serde(default)]
    ports_in: PortsIn,
    #[serde(default)]
    ports_out: PortsOut,
    #[serde(default)]
    state: State,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortsIn {
    store: String,
}

impl Default for PortsIn {
    fn default() -> Self {
        Self {
            store: String::from("store"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortsOut {
    response: String,
}

impl Default for PortsOut {
    fn default() -> Self {
        Self {
            response: String::from("response"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct State {
    count: u64,
    last: serde_yaml::Value,
}

impl Accumulator {
    pub fn new(store_port: impl Into<String>, response_port: impl Into<String>) -> Self {
        Self {
            ports_in: PortsIn {
                store: store_port.into(),
            },
            ports_out: PortsOut {
                response: response_port.into(),
            },
            state: State::default(),
        }
    }
}

impl Dynamics for Accumulator {
    fn init(&mut self, _time: Time, _services: &mut Services) -> Result<Time, SimulationError> {
        Ok(Time::INFINITY)
    }

    fn output(
        &mut self,
        _time: Time,
        _services: &mut Services,
    ) -> Result<Vec<OutputMessage>, SimulationError> {
        Ok(Vec::new())
    }

    fn internal(&mut self, _time: Time, _services: &mut Services) -> Result<Time, SimulationError> {
        Ok(Time::INFINITY)
    }

    fn external(
        &mut self,
        events: &[ExternalEvent],
        _time: Time,
        _services: &mut Services,
    ) -> Result<Time, SimulationError> {
        for event in events {
            if event.port_name != self.ports_in.store {
                return Err(ModelError::UnexpectedMessage(event.port_name.clone()).into());
            }
            self.state.count += 1;
            self.state.last = event
                .attributes
                .get("job")
                .cloned()
                .unwrap_or(serde_yaml::Value::Null);
        }
        Ok(Time::INFINITY)
    }

    fn request(
        &mut self,
        _event: &RequestEvent,
        _time: Time,
        _services: &mut Services,
    ) -> Result<Vec<OutputMessage>, SimulationError> {
        Ok(vec![OutputMessage::new(self.ports_out.response.clone())
            .with_attribute("count", self.state.count)
            .with_attribute("last", self.state.last.clone())])
    }

    fn observation(&self, event: &ObservationEvent) -> Result<serde_yaml::Value, SimulationError> {
        match event.port_name.as_str() {
            "count" => Ok(serde_yaml::Value::from(self.state.count)),
            "last" => Ok(self.state.last.clone()),
            _ => Err(StructuralError::UnknownPort {
                model: self.get_type().to_string(),
                port: event.port_name.clone(),
            }
            .into()),
        }
    }
}

impl Reportable for Accumulator {
    fn status(&self) -> String {
        format!["Holding {} jobs", self.state.count]
    }
}

impl ReportableDynamics for Accumulator {}
