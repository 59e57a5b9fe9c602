use serde::{Deserialize, Serialize};

use super::model_trait::{Reportable, ReportableDynamics, SerializableDynamics};
use super::{Dynamics, RandomDelay};
use crate::simulator::{
    ExternalEvent, ObservationEvent, OutputMessage, Services, Time,
};
use crate::utils::errors::{ModelError, SimulationError, StructuralError};

use devs_derive::SerializableDynamics;

/// A FIFO single-server station.  Jobs arrive on the input port, wait in an
/// optionally bounded queue, are served for a drawn service time, and leave
/// on the output port.  Arrivals beyond the queue capacity are dropped and
/// counted.
#[derive(Debug, Clone, Serialize, Deserialize, SerializableDynamics)]
#[serde(rename_all = "camelCase")]
pub struct Queue {
    service_time: RandomDelay,
    #[serde(default)]
    queue_capacity: Option<usize>,
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
    job: String,
}

impl Default for PortsIn {
    fn default() -> Self {
        Self {
            job: String::from("job"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PortsOut {
    job: String,
}

impl Default for PortsOut {
    fn default() -> Self {
        Self {
            job: String::from("processed"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct State {
    queue: Vec<serde_yaml::Value>,
    next_completion: Option<Time>,
    dropped: u64,
}

impl Queue {
    pub fn new(
        service_time: RandomDelay,
        queue_capacity: Option<usize>,
        job_port: impl Into<String>,
        processed_port: impl Into<String>,
    ) -> Self {
        Self {
            service_time,
            queue_capacity,
            ports_in: PortsIn {
                job: job_port.into(),
            },
            ports_out: PortsOut {
                job: processed_port.into(),
            },
            state: State::default(),
        }
    }

    fn start_service(
        &mut self,
        time: Time,
        services: &mut Services,
    ) -> Result<Time, SimulationError> {
        let advance = self.service_time.draw(services)?;
        self.state.next_completion = Some(time + advance);
        Ok(advance)
    }
}

impl Dynamics for Queue {
    fn init(&mut self, _time: Time, _services: &mut Services) -> Result<Time, SimulationError> {
        Ok(Time::INFINITY)
    }

    fn output(
        &mut self,
        _time: Time,
        _services: &mut Services,
    ) -> Result<Vec<OutputMessage>, SimulationError> {
        match self.state.queue.first() {
            Some(job) => Ok(vec![OutputMessage::new(self.ports_out.job.clone())
                .with_attribute("job", job.clone())]),
            None => Err(ModelError::InvalidModelState.into()),
        }
    }

    fn internal(&mut self, time: Time, services: &mut Services) -> Result<Time, SimulationError> {
        if self.state.queue.is_empty() {
            return Err(ModelError::InvalidModelState.into());
        }
        self.state.queue.remove(0);
        if self.state.queue.is_empty() {
            self.state.next_completion = None;
            Ok(Time::INFINITY)
        } else {
            self.start_service(time, services)
        }
    }

    fn external(
        &mut self,
        events: &[ExternalEvent],
        time: Time,
        services: &mut Services,
    ) -> Result<Time, SimulationError> {
        for event in events {
            if event.port_name != self.ports_in.job {
                return Err(ModelError::UnexpectedMessage(event.port_name.clone()).into());
            }
            let at_capacity = self
                .queue_capacity
                .map_or(false, |capacity| self.state.queue.len() >= capacity);
            if at_capacity {
                self.state.dropped += 1;
                continue;
            }
            let job = event
                .attributes
                .get("job")
                .cloned()
                .unwrap_or(serde_yaml::Value::Null);
            self.state.queue.push(job);
        }
        match self.state.next_completion {
            // Busy: the running service keeps its completion instant.
            Some(completion) => Ok(completion - time),
            None if self.state.queue.is_empty() => Ok(Time::INFINITY),
            None => self.start_service(time, services),
        }
    }

    fn observation(&self, event: &ObservationEvent) -> Result<serde_yaml::Value, SimulationError> {
        match event.port_name.as_str() {
            "queue-length" => Ok(serde_yaml::Value::from(self.state.queue.len() as u64)),
            "dropped" => Ok(serde_yaml::Value::from(self.state.dropped)),
            _ => Err(StructuralError::UnknownPort {
                model: self.get_type().to_string(),
                port: event.port_name.clone(),
            }
            .into()),
        }
    }
}

impl Reportable for Queue {
    fn status(&self) -> String {
        match self.state.next_completion {
            Some(_) => format!["Serving ({} queued)", self.state.queue.len()],
            None => String::from("Idle"),
        }
    }
}

impl ReportableDynamics for Queue {}
