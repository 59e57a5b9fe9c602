use serde::{Deserialize, Serialize};

use devs::graph::InternalCoupling;
use devs::models::{
    register, AtomicRepr, CoupledRepr, Dynamics, ModelRepr, Reportable, ReportableDynamics,
    SerializableDynamics,
};
use devs::project::{Condition, Dynamic, Experiment, Project};
use devs::simulator::{
    Config, Coordinator, ExternalEvent, OutputMessage, Services, Time,
};
use devs::SimulationError;

use devs_derive::SerializableDynamics;

fn experiment(name: &str) -> Experiment {
    Experiment {
        name: name.to_string(),
        begin: Time::ZERO,
        duration: None,
        seed: None,
    }
}

fn constant_delay(value: f64) -> Condition {
    Condition {
        name: format!("delay-{value}"),
        values: [(
            "interarrival".to_string(),
            serde_yaml::from_str(&format!("{{ type: constant, value: {value} }}")).unwrap(),
        )]
        .into_iter()
        .collect(),
    }
}

fn atomic(name: &str, dynamics: &str, conditions: &[&str]) -> ModelRepr {
    ModelRepr::Atomic(AtomicRepr {
        name: name.to_string(),
        dynamics: dynamics.to_string(),
        conditions: conditions.iter().map(|c| c.to_string()).collect(),
        observable: None,
    })
}

fn coupled(name: &str, components: Vec<ModelRepr>, couplings: Vec<InternalCoupling>) -> ModelRepr {
    ModelRepr::Coupled(CoupledRepr {
        name: name.to_string(),
        components,
        internal_couplings: couplings,
        external_input_couplings: Vec::new(),
        external_output_couplings: Vec::new(),
    })
}

fn connect(source: &str, source_port: &str, target: &str, target_port: &str) -> InternalCoupling {
    InternalCoupling {
        source_id: source.to_string(),
        target_id: target.to_string(),
        source_port: source_port.to_string(),
        target_port: target_port.to_string(),
    }
}

fn bare_project(name: &str, model: ModelRepr) -> Project {
    Project {
        experiment: experiment(name),
        dynamics: Vec::new(),
        conditions: Vec::new(),
        observables: Vec::new(),
        outputs: Vec::new(),
        views: Vec::new(),
        classes: Vec::new(),
        model,
    }
}

#[test]
fn self_scheduling_model_advances_one_unit_per_step() -> Result<(), SimulationError> {
    let mut project = bare_project("cadence", atomic("gen", "PulseGenerator", &["delay-1"]));
    project.dynamics.push(Dynamic::of("PulseGenerator"));
    project.conditions.push(constant_delay(1.0));

    let mut simulation = Coordinator::new(&project, Config::default())?;
    let mut previous = Time::ZERO;
    for step in 1..=10 {
        let next = simulation.next_time();
        assert_eq!(next, Time::new(step as f64));
        assert!(next >= previous);
        previous = next;
        simulation.run()?;
        // The pending internal event always matches the simulator clock.
        let simulator = simulation.simulator("gen").unwrap();
        assert_eq!(simulator.tn(), Time::new(step as f64 + 1.0));
        assert_eq!(simulator.tl(), Time::new(step as f64));
    }
    assert_eq!(simulation.next_time(), Time::new(11.0));
    assert_eq!(simulation.status("gen")?, "Generated 10 jobs");
    Ok(())
}

#[test]
fn outputs_reach_destinations_at_the_emission_time() -> Result<(), SimulationError> {
    let model = coupled(
        "root",
        vec![
            atomic("gen", "PulseGenerator", &["delay-1"]),
            atomic("acc", "Accumulator", &[]),
        ],
        vec![connect("gen", "job", "acc", "store")],
    );
    let mut project = bare_project("routing", model);
    project.dynamics.push(Dynamic::of("PulseGenerator"));
    project.dynamics.push(Dynamic::of("Accumulator"));
    project.conditions.push(constant_delay(1.0));

    let mut simulation = Coordinator::new(&project, Config::default())?;
    for _ in 0..3 {
        simulation.run()?;
    }
    // Jobs 0, 1, 2 arrived within the instants they were emitted.
    let state = simulation.model_state("root.acc")?;
    assert_eq!(state["state"]["count"], serde_yaml::Value::from(3u64));
    assert_eq!(state["state"]["last"], serde_yaml::Value::from(2u64));
    assert_eq!(simulation.current_time(), Time::new(3.0));
    Ok(())
}

/// Records every transition it experiences; self-schedules once at its
/// configured horizon.  The default confluent disposition applies.
#[derive(Debug, Clone, Default, Serialize, Deserialize, SerializableDynamics)]
#[serde(default)]
struct Sampler {
    horizon: Option<f64>,
    internal_ran: bool,
    external_times: Vec<f64>,
    external_ports: Vec<String>,
}

impl Dynamics for Sampler {
    fn init(&mut self, _time: Time, _services: &mut Services) -> Result<Time, SimulationError> {
        Ok(self.horizon.map_or(Time::INFINITY, Time::new))
    }

    fn output(
        &mut self,
        _time: Time,
        _services: &mut Services,
    ) -> Result<Vec<OutputMessage>, SimulationError> {
        Ok(Vec::new())
    }

    fn internal(&mut self, _time: Time, _services: &mut Services) -> Result<Time, SimulationError> {
        self.internal_ran = true;
        Ok(Time::INFINITY)
    }

    fn external(
        &mut self,
        events: &[ExternalEvent],
        time: Time,
        _services: &mut Services,
    ) -> Result<Time, SimulationError> {
        for event in events {
            self.external_times.push(time.as_f64());
            self.external_ports.push(event.port_name.clone());
        }
        Ok(Time::new(3.0))
    }
}

impl Reportable for Sampler {
    fn status(&self) -> String {
        format!["Sampled {} events", self.external_times.len()]
    }
}

impl ReportableDynamics for Sampler {}

#[test]
fn confluent_collision_runs_the_external_path() -> Result<(), SimulationError> {
    register("Sampler", Sampler::from_value);

    let model = coupled(
        "root",
        vec![
            atomic("gen", "PulseGenerator", &["delay-5"]),
            atomic("sampler", "Sampler", &["horizon"]),
        ],
        vec![connect("gen", "job", "sampler", "in")],
    );
    let mut project = bare_project("confluence", model);
    project.dynamics.push(Dynamic::of("PulseGenerator"));
    project.dynamics.push(Dynamic::of("Sampler"));
    project.conditions.push(constant_delay(5.0));
    project.conditions.push(Condition {
        name: "horizon".to_string(),
        values: [("horizon".to_string(), serde_yaml::Value::from(5.0))]
            .into_iter()
            .collect(),
    });

    let mut simulation = Coordinator::new(&project, Config::default())?;
    // Both the sampler's internal and the generator's pulse land at t=5.
    assert_eq!(simulation.next_time(), Time::new(5.0));
    simulation.run()?;

    let state = simulation.model_state("root.sampler")?;
    assert_eq!(state["internal_ran"], serde_yaml::Value::from(false));
    assert_eq!(
        state["external_times"],
        serde_yaml::from_str::<serde_yaml::Value>("[5.0]").unwrap()
    );
    // The new time advance is measured from the collision instant.
    assert_eq!(
        simulation.simulator("root.sampler").unwrap().tn(),
        Time::new(8.0)
    );
    Ok(())
}

/// Issues one synchronous request at its horizon and records the reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize, SerializableDynamics)]
struct Prober {
    horizon: f64,
    received: Option<u64>,
    received_at: Option<f64>,
}

impl Dynamics for Prober {
    fn init(&mut self, _time: Time, _services: &mut Services) -> Result<Time, SimulationError> {
        Ok(Time::new(self.horizon))
    }

    fn output(
        &mut self,
        _time: Time,
        _services: &mut Services,
    ) -> Result<Vec<OutputMessage>, SimulationError> {
        Ok(vec![OutputMessage::request("query")])
    }

    fn internal(&mut self, _time: Time, _services: &mut Services) -> Result<Time, SimulationError> {
        Ok(Time::INFINITY)
    }

    fn external(
        &mut self,
        events: &[ExternalEvent],
        time: Time,
        _services: &mut Services,
    ) -> Result<Time, SimulationError> {
        for event in events {
            self.received = event.attributes.get("value").and_then(|v| v.as_u64());
            self.received_at = Some(time.as_f64());
        }
        Ok(Time::INFINITY)
    }
}

impl Reportable for Prober {
    fn status(&self) -> String {
        String::from("Probing")
    }
}

impl ReportableDynamics for Prober {}

/// Answers every request with a constant value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, SerializableDynamics)]
struct Responder {
    answer: u64,
}

impl Dynamics for Responder {
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
        _events: &[ExternalEvent],
        _time: Time,
        _services: &mut Services,
    ) -> Result<Time, SimulationError> {
        Ok(Time::INFINITY)
    }

    fn request(
        &mut self,
        _event: &devs::simulator::RequestEvent,
        _time: Time,
        _services: &mut Services,
    ) -> Result<Vec<OutputMessage>, SimulationError> {
        Ok(vec![
            OutputMessage::new("value").with_attribute("value", self.answer)
        ])
    }
}

impl Reportable for Responder {
    fn status(&self) -> String {
        String::from("Waiting for requests")
    }
}

impl ReportableDynamics for Responder {}

#[test]
fn requests_are_answered_within_the_instant() -> Result<(), SimulationError> {
    register("Prober", Prober::from_value);
    register("Responder", Responder::from_value);

    let model = coupled(
        "root",
        vec![
            atomic("prober", "Prober", &["ask-at-7"]),
            atomic("responder", "Responder", &["answer-42"]),
        ],
        vec![
            connect("prober", "query", "responder", "ask"),
            connect("responder", "value", "prober", "response"),
        ],
    );
    let mut project = bare_project("request-reply", model);
    project.dynamics.push(Dynamic::of("Prober"));
    project.dynamics.push(Dynamic::of("Responder"));
    project.conditions.push(Condition {
        name: "ask-at-7".to_string(),
        values: [("horizon".to_string(), serde_yaml::Value::from(7.0))]
            .into_iter()
            .collect(),
    });
    project.conditions.push(Condition {
        name: "answer-42".to_string(),
        values: [("answer".to_string(), serde_yaml::Value::from(42u64))]
            .into_iter()
            .collect(),
    });

    let mut simulation = Coordinator::new(&project, Config::default())?;
    assert_eq!(simulation.next_time(), Time::new(7.0));
    simulation.run()?;

    // The reply crossed two couplings without the instant advancing.
    let state = simulation.model_state("root.prober")?;
    assert_eq!(state["received"], serde_yaml::Value::from(42u64));
    assert_eq!(state["received_at"], serde_yaml::Value::from(7.0));
    assert_eq!(simulation.current_time(), Time::new(7.0));
    assert_eq!(simulation.next_time(), Time::INFINITY);
    Ok(())
}

#[test]
fn same_instant_bags_drain_in_registration_order() -> Result<(), SimulationError> {
    register("Sampler", Sampler::from_value);

    let model = coupled(
        "root",
        vec![
            atomic("first", "PulseGenerator", &["delay-1"]),
            atomic("second", "PulseGenerator", &["delay-1"]),
            atomic("recorder", "Sampler", &[]),
        ],
        vec![
            connect("first", "job", "recorder", "a"),
            connect("second", "job", "recorder", "b"),
        ],
    );
    let mut project = bare_project("ordering", model);
    project.dynamics.push(Dynamic::of("PulseGenerator"));
    project.dynamics.push(Dynamic::of("Sampler"));
    project.conditions.push(constant_delay(1.0));

    let mut simulation = Coordinator::new(&project, Config::default())?;
    simulation.run()?;

    // Both pulses of t=1 arrive in one bag, ordered by their sources'
    // registration order.
    let state = simulation.model_state("root.recorder")?;
    assert_eq!(
        state["external_ports"],
        serde_yaml::from_str::<serde_yaml::Value>("[a, b]").unwrap()
    );
    Ok(())
}

#[test]
fn project_descriptors_deserialize_and_run() -> Result<(), SimulationError> {
    let descriptor = r#"
experiment:
  name: parsed
  begin: 0.0
  seed: 11
dynamics:
  - name: PulseGenerator
    plugin: PulseGenerator
conditions:
  - name: unit
    values:
      interarrival: { type: constant, value: 1.0 }
model:
  type: Atomic
  name: gen
  dynamics: PulseGenerator
  conditions: [unit]
"#;
    let project: Project = serde_yaml::from_str(descriptor).unwrap();
    let mut simulation = Coordinator::new(&project, Config::default())?;
    simulation.run()?;
    simulation.run()?;
    let state = simulation.model_state("gen")?;
    assert_eq!(state["state"]["count"], serde_yaml::Value::from(2u64));
    Ok(())
}

#[test]
fn seeded_runs_are_reproducible() -> Result<(), SimulationError> {
    let mut project = bare_project("seeded", atomic("gen", "PulseGenerator", &["poisson"]));
    project.dynamics.push(Dynamic::of("PulseGenerator"));
    project.conditions.push(Condition {
        name: "poisson".to_string(),
        values: [(
            "interarrival".to_string(),
            serde_yaml::from_str("{ type: exponential, mean: 2.0 }").unwrap(),
        )]
        .into_iter()
        .collect(),
    });
    project.experiment.seed = Some(7);

    let schedule = |project: &Project| -> Result<Vec<f64>, SimulationError> {
        let mut simulation = Coordinator::new(project, Config::default())?;
        let mut times = Vec::new();
        for _ in 0..5 {
            times.push(simulation.next_time().as_f64());
            simulation.run()?;
        }
        Ok(times)
    };

    let first = schedule(&project)?;
    let second = schedule(&project)?;
    assert_eq!(first, second);
    assert!(first.windows(2).all(|pair| pair[0] <= pair[1]));
    assert!(first[0] > 0.0);
    Ok(())
}

#[test]
fn jobs_flow_through_a_served_queue() -> Result<(), SimulationError> {
    let model = coupled(
        "root",
        vec![
            atomic("gen", "PulseGenerator", &["delay-1"]),
            atomic("station", "Queue", &["service"]),
            atomic("acc", "Accumulator", &[]),
        ],
        vec![
            connect("gen", "job", "station", "job"),
            connect("station", "processed", "acc", "store"),
        ],
    );
    let mut project = bare_project("pipeline", model);
    project.dynamics.push(Dynamic::of("PulseGenerator"));
    project.dynamics.push(Dynamic::of("Queue"));
    project.dynamics.push(Dynamic::of("Accumulator"));
    project.conditions.push(constant_delay(1.0));
    project.conditions.push(Condition {
        name: "service".to_string(),
        values: [(
            "serviceTime".to_string(),
            serde_yaml::from_str("{ type: constant, value: 0.5 }").unwrap(),
        )]
        .into_iter()
        .collect(),
    });

    let mut simulation = Coordinator::new(&project, Config::default())?;
    // Arrivals at 1, 2, 3; each serves for 0.5; departures at 1.5, 2.5, 3.5.
    simulation.run_until(Time::new(3.75))?;

    let state = simulation.model_state("root.acc")?;
    assert_eq!(state["state"]["count"], serde_yaml::Value::from(3u64));
    assert_eq!(state["state"]["last"], serde_yaml::Value::from(2u64));
    assert_eq!(simulation.status("root.station")?, "Idle");
    assert_eq!(simulation.current_time(), Time::new(3.5));
    Ok(())
}

#[test]
fn confluent_replay_flag_reruns_externals_after_the_internal() -> Result<(), SimulationError> {
    register("Sampler", Sampler::from_value);

    let model = coupled(
        "root",
        vec![
            atomic("gen", "PulseGenerator", &["delay-5"]),
            atomic("sampler", "InternalFirstSampler", &["horizon"]),
        ],
        vec![connect("gen", "job", "sampler", "in")],
    );

    // A sampler variant whose confluent disposition prefers the internal
    // path.
    #[derive(Debug, Clone, Default, Serialize, Deserialize, SerializableDynamics)]
    #[serde(default)]
    struct InternalFirstSampler {
        inner: Sampler,
    }

    impl Dynamics for InternalFirstSampler {
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

        fn confluent(
            &mut self,
            _internal: &devs::simulator::InternalEvent,
            _externals: &[ExternalEvent],
        ) -> devs::models::Disposition {
            devs::models::Disposition::Internal
        }
    }

    impl Reportable for InternalFirstSampler {
        fn status(&self) -> String {
            self.inner.status()
        }
    }

    impl ReportableDynamics for InternalFirstSampler {}

    register("InternalFirstSampler", InternalFirstSampler::from_value);

    let mut project = bare_project("replay", model);
    project.dynamics.push(Dynamic::of("PulseGenerator"));
    project.dynamics.push(Dynamic::of("InternalFirstSampler"));
    project.conditions.push(constant_delay(5.0));
    project.conditions.push(Condition {
        name: "horizon".to_string(),
        values: [(
            "inner".to_string(),
            serde_yaml::from_str("{ horizon: 5.0 }").unwrap(),
        )]
        .into_iter()
        .collect(),
    });

    // Default policy: the colliding externals are dropped.
    let mut dropped = Coordinator::new(&project, Config::default())?;
    dropped.run()?;
    let state = dropped.model_state("root.sampler")?;
    assert_eq!(state["inner"]["internal_ran"], serde_yaml::Value::from(true));
    assert_eq!(
        state["inner"]["external_times"],
        serde_yaml::from_str::<serde_yaml::Value>("[]").unwrap()
    );

    // Replay policy: the externals re-fire through the external path within
    // the same instant.
    let config = Config {
        confluent_replay_externals: true,
    };
    let mut replayed = Coordinator::new(&project, config)?;
    replayed.run()?;
    let state = replayed.model_state("root.sampler")?;
    assert_eq!(state["inner"]["internal_ran"], serde_yaml::Value::from(true));
    assert_eq!(
        state["inner"]["external_times"],
        serde_yaml::from_str::<serde_yaml::Value>("[5.0]").unwrap()
    );
    Ok(())
}
