//! The coordinator is the top-level executor of a simulation.  It owns the
//! simulator table, the event table, the views, and the model factory, and
//! implements the simulation loop: pop the earliest complete bag, resolve
//! each simulator's confluent situation, run its transition, route its
//! outputs through the connection graph, and drive the observation
//! subsystem.  Dynamic structure edits queued by executive models are
//! applied between bag entries, and deleted simulators are destroyed in two
//! phases so the bag in flight never dereferences a dangling handle.

use std::collections::{BTreeMap, HashMap};

use super::atomic::{Simulator, SimulatorId};
use super::event::{
    CompleteEventBagModel, ExternalEvent, ObservationEvent, OutputMessage, RequestEvent,
};
use super::event_table::EventTable;
use super::executive::Directive;
use super::services::{default_rng, seeded_rng, Services};
use super::stream::{LocalStreamWriter, NetStreamWriter, StreamWriter};
use super::time::Time;
use super::view::View;
use crate::graph::{ModelGraph, NodeId};
use crate::models::{AtomicRepr, Disposition, ModelFactory, ModelRepr};
use crate::project::{OutputFormat, Project};
use crate::utils::errors::{InvalidStateError, SimulationError, StructuralError};

/// Coordinator tunables.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// When a confluent transition selects the internal path, the pending
    /// external events are dropped by default.  With this flag set they are
    /// re-dispatched through the external path within the same instant
    /// instead.  This is a known semantic point of the formalism's
    /// implementations; both behaviors are deterministic.
    pub confluent_replay_externals: bool,
}

pub struct Coordinator {
    config: Config,
    graph: ModelGraph,
    factory: ModelFactory,
    // Registration-ordered slab; slots are never reused, so a SimulatorId
    // stays unambiguous for the whole run.
    simulators: Vec<Option<Simulator>>,
    node_index: HashMap<NodeId, SimulatorId>,
    event_table: EventTable,
    views: BTreeMap<String, View>,
    services: Services,
    current_time: Time,
    horizon: Option<Time>,
    pending_deletion: Vec<Simulator>,
}

impl Coordinator {
    /// Builds the views, instantiates a simulator for every atomic model of
    /// the initial graph, runs their `init`, and schedules their first
    /// internal events.
    pub fn new(project: &Project, config: Config) -> Result<Self, SimulationError> {
        let graph = ModelGraph::from_repr(&project.model)?;
        let factory = ModelFactory::new(project)?;
        let rng = match project.experiment.seed {
            Some(seed) => seeded_rng(seed),
            None => default_rng(),
        };
        let begin = project.experiment.begin;
        let mut coordinator = Self {
            config,
            graph,
            factory,
            simulators: Vec::new(),
            node_index: HashMap::new(),
            event_table: EventTable::new(),
            views: BTreeMap::new(),
            services: Services::new(rng, begin),
            current_time: begin,
            horizon: project
                .experiment
                .duration
                .map(|duration| begin + duration),
            pending_deletion: Vec::new(),
        };
        coordinator.build_views(project)?;
        for node in coordinator.graph.atomic_leaves() {
            coordinator.create_simulator(node)?;
        }
        // Models may queue executive work from init.
        let mut no_bag = CompleteEventBagModel::empty();
        coordinator.apply_directives(&mut no_bag)?;
        Ok(coordinator)
    }

    fn build_views(&mut self, project: &Project) -> Result<(), SimulationError> {
        for view_config in &project.views {
            let output = project
                .outputs
                .iter()
                .find(|output| output.name == view_config.output)
                .ok_or_else(|| StructuralError::UnknownOutput {
                    view: view_config.name.clone(),
                    output: view_config.output.clone(),
                })?;
            let mut stream: Box<dyn StreamWriter> = match output.format {
                OutputFormat::Local => Box::new(LocalStreamWriter::new()),
                OutputFormat::Distant => Box::new(NetStreamWriter::new()),
            };
            let file = format!("{}_{}", project.experiment.name, view_config.name);
            stream.open(
                &output.plugin,
                &output.location,
                &file,
                &output.data,
                self.current_time,
            )?;
            self.add_view(View::new(
                view_config.name.clone(),
                view_config.kind,
                stream,
            ));
        }
        Ok(())
    }

    /// Registers a view under its name.  A second view with the same name
    /// is ignored.
    pub fn add_view(&mut self, view: View) {
        self.views.entry(view.name().to_string()).or_insert(view);
    }

    /// Attaches a model port to a named view; the driver-facing counterpart
    /// of the executive `subscribe`.
    pub fn subscribe(
        &mut self,
        model: &str,
        port: &str,
        view: &str,
    ) -> Result<(), SimulationError> {
        let node = self
            .graph
            .resolve_path(model)
            .ok_or_else(|| StructuralError::UnknownModel(model.to_string()))?;
        let simulator = *self
            .node_index
            .get(&node)
            .ok_or(InvalidStateError::EventSchedulingError)?;
        self.subscribe_port(simulator, port, view)
    }

    fn subscribe_port(
        &mut self,
        simulator: SimulatorId,
        port: &str,
        view_name: &str,
    ) -> Result<(), SimulationError> {
        let time = self.current_time;
        let view = self
            .views
            .get_mut(view_name)
            .ok_or_else(|| StructuralError::UnknownView(view_name.to_string()))?;
        if let Some(event) = view.subscribe(simulator, port, time) {
            self.event_table.put_observation(event);
        }
        Ok(())
    }

    fn create_simulator(&mut self, node: NodeId) -> Result<SimulatorId, SimulationError> {
        let name = self.graph.full_name(node);
        let atomic = self
            .graph
            .node(node)
            .and_then(|n| n.atomic())
            .cloned()
            .ok_or_else(|| StructuralError::UnknownModel(name.clone()))?;
        let model = self.factory.build(&name, &atomic)?;
        let id = SimulatorId(self.simulators.len());
        let mut simulator = Simulator::new(id, node, name, model);
        let first_internal = simulator.init(self.current_time, &mut self.services)?;
        self.simulators.push(Some(simulator));
        self.node_index.insert(node, id);
        if let Some(event) = first_internal {
            self.event_table.put_internal(event);
        }
        if let Some(observable_name) = &atomic.observable {
            let observable = self.factory.observable(observable_name)?.clone();
            for (port, view_names) in &observable.ports {
                for view_name in view_names {
                    self.subscribe_port(id, port, view_name)?;
                }
            }
        }
        Ok(id)
    }

    /// The earliest scheduled event time; `Time::INFINITY` when the table
    /// has drained.
    pub fn next_time(&self) -> Time {
        self.event_table.top_time()
    }

    pub fn current_time(&self) -> Time {
        self.current_time
    }

    pub fn simulator(&self, model: &str) -> Option<&Simulator> {
        let node = self.graph.resolve_path(model)?;
        let id = self.node_index.get(&node)?;
        self.simulators.get(id.0).and_then(Option::as_ref)
    }

    pub fn status(&self, model: &str) -> Result<String, SimulationError> {
        self.simulator(model)
            .map(Simulator::status)
            .ok_or_else(|| StructuralError::UnknownModel(model.to_string()).into())
    }

    pub fn model_state(&self, model: &str) -> Result<serde_yaml::Value, SimulationError> {
        self.simulator(model)
            .map(Simulator::state)
            .ok_or_else(|| StructuralError::UnknownModel(model.to_string()).into())
    }

    pub fn view(&self, name: &str) -> Option<&View> {
        self.views.get(name)
    }

    fn is_gone(&self, simulator: SimulatorId) -> bool {
        self.simulators
            .get(simulator.0)
            .map_or(true, Option::is_none)
    }

    /// Advances the simulation by one time instant: drains the earliest
    /// complete bag, then the pending deletions that existed before the
    /// bag, then the instant's observations.  An empty table makes the step
    /// a no-op.
    pub fn run(&mut self) -> Result<(), SimulationError> {
        let old_to_delete = self.pending_deletion.len();

        let mut bags = self.event_table.pop_bag();
        if !bags.is_empty() {
            debug_assert!(bags.time() >= self.current_time);
            self.current_time = bags.time();
            self.services.set_global_time(bags.time());
            log::trace!("step at {}", bags.time());
        }

        while let Some(simulator) = bags.next_bag() {
            if self.is_gone(simulator) {
                bags.delete_events_for(simulator);
                continue;
            }
            let (has_internal, has_externals) = {
                let bag = bags.bag_mut(simulator);
                (bag.has_internal(), bag.has_externals())
            };
            if has_internal && has_externals {
                match self.confluent_disposition(simulator, &mut bags)? {
                    Disposition::Internal => {
                        if !self.config.confluent_replay_externals {
                            bags.bag_mut(simulator).discard_externals();
                        }
                        self.process_internal(simulator, &mut bags)?;
                    }
                    Disposition::External => self.process_externals(simulator, &mut bags)?,
                }
            } else if has_internal {
                self.process_internal(simulator, &mut bags)?;
            } else if has_externals {
                self.process_externals(simulator, &mut bags)?;
            } else {
                self.process_requests(simulator, &mut bags)?;
            }
        }

        if old_to_delete > 0 {
            log::debug!("destroying {} deleted simulators", old_to_delete);
            self.pending_deletion.drain(..old_to_delete);
        }

        self.process_observation_events(&mut bags)?;
        Ok(())
    }

    /// Runs `run` until the next scheduled instant would pass `end`, and
    /// returns the reached time.
    pub fn run_until(&mut self, end: Time) -> Result<Time, SimulationError> {
        loop {
            let next = self.next_time();
            if next.is_infinite() || next > end {
                break;
            }
            self.run()?;
        }
        Ok(self.current_time)
    }

    /// Runs until the experiment's declared horizon (`begin + duration`),
    /// or until the event table drains when no duration was declared.
    pub fn run_to_horizon(&mut self) -> Result<Time, SimulationError> {
        match self.horizon {
            Some(end) => self.run_until(end),
            None => self.run_until(Time::INFINITY),
        }
    }

    /// Terminates the run: every surviving model's `finish` hook, one
    /// observation per finish-view subscription, then every view's stream
    /// is closed.
    pub fn finish(&mut self) -> Result<(), SimulationError> {
        let time = self.current_time;
        for simulator in self.simulators.iter_mut().flatten() {
            simulator.finish(time);
        }

        let finish_jobs: Vec<(String, SimulatorId, String)> = self
            .views
            .values()
            .filter(|view| view.is_finish())
            .flat_map(|view| {
                view.subscriptions()
                    .iter()
                    .map(|(simulator, port)| {
                        (view.name().to_string(), *simulator, port.clone())
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        for (view_name, simulator_id, port) in finish_jobs {
            let Some(simulator) = self
                .simulators
                .get(simulator_id.0)
                .and_then(Option::as_ref)
            else {
                continue;
            };
            let event = ObservationEvent {
                time,
                target: simulator_id,
                port_name: port,
                view_name: view_name.clone(),
            };
            // Flushing the surviving views outranks propagating a late
            // observation failure.
            let value = match simulator.observation(&event) {
                Ok(value) => value,
                Err(error) => {
                    log::warn!("final observation of {} failed: {}", simulator.name(), error);
                    continue;
                }
            };
            let model_name = simulator.name().to_string();
            if let Some(view) = self.views.get_mut(&view_name) {
                view.process(&event, &model_name, value);
            }
        }

        for view in self.views.values_mut() {
            view.finish(time);
        }
        Ok(())
    }

    fn confluent_disposition(
        &mut self,
        simulator_id: SimulatorId,
        bags: &mut CompleteEventBagModel,
    ) -> Result<Disposition, SimulationError> {
        let (internal, externals) = {
            let bag = bags.bag_mut(simulator_id);
            (
                bag.internal().cloned().expect("confluent requires internal"),
                bag.externals().to_vec(),
            )
        };
        let simulator = self.simulators[simulator_id.0]
            .as_mut()
            .ok_or(InvalidStateError::EventSchedulingError)?;
        simulator.confluent_transitions(&internal, &externals)
    }

    /// The internal path: `output`, routing, `internal`, reschedule, event
    /// views.
    fn process_internal(
        &mut self,
        simulator_id: SimulatorId,
        bags: &mut CompleteEventBagModel,
    ) -> Result<(), SimulationError> {
        let internal = bags
            .bag_mut(simulator_id)
            .take_internal()
            .expect("internal path requires a pending internal event");
        let time = self.current_time;

        let messages = {
            let simulator = self.simulators[simulator_id.0]
                .as_mut()
                .ok_or(InvalidStateError::EventSchedulingError)?;
            debug_assert_eq!(internal.time, simulator.tn());
            simulator.output(time, &mut self.services)?
        };
        self.dispatch_outputs(simulator_id, messages, bags)?;

        let next = {
            let simulator = self.simulators[simulator_id.0]
                .as_mut()
                .ok_or(InvalidStateError::EventSchedulingError)?;
            simulator.internal_transition(time, &mut self.services)?
        };
        if let Some(event) = next {
            self.event_table.put_internal(event);
        }

        self.notify_event_views(simulator_id)?;
        self.apply_directives(bags)
    }

    /// The external path: `external`, reschedule, event views.  Any stale
    /// internal event left in the bag by a confluent-external resolution is
    /// discarded; the transition computes the model's new schedule.
    fn process_externals(
        &mut self,
        simulator_id: SimulatorId,
        bags: &mut CompleteEventBagModel,
    ) -> Result<(), SimulationError> {
        let (externals, _stale_internal) = {
            let bag = bags.bag_mut(simulator_id);
            (bag.take_externals(), bag.take_internal())
        };
        let time = self.current_time;

        let next = {
            let simulator = self.simulators[simulator_id.0]
                .as_mut()
                .ok_or(InvalidStateError::EventSchedulingError)?;
            simulator.external_transition(&externals, time, &mut self.services)?
        };
        if let Some(event) = next {
            self.event_table.put_internal(event);
        }

        self.notify_event_views(simulator_id)?;
        self.apply_directives(bags)
    }

    /// The request path: each request is answered synchronously and its
    /// replies are routed within the current instant, so same-instant
    /// couplings close transitively before time advances.
    fn process_requests(
        &mut self,
        simulator_id: SimulatorId,
        bags: &mut CompleteEventBagModel,
    ) -> Result<(), SimulationError> {
        let requests = bags.bag_mut(simulator_id).take_requests();
        let time = self.current_time;
        for request in requests {
            if self.is_gone(simulator_id) {
                break;
            }
            let replies = {
                let simulator = self.simulators[simulator_id.0]
                    .as_mut()
                    .ok_or(InvalidStateError::EventSchedulingError)?;
                simulator.request(&request, time, &mut self.services)?
            };
            self.dispatch_outputs(simulator_id, replies, bags)?;
            self.apply_directives(bags)?;
        }
        Ok(())
    }

    /// Routes outgoing messages through the connection graph: one fresh
    /// event per resolved destination, inserted at the current time.  An
    /// event landing on the instant being drained joins the in-flight bag.
    fn dispatch_outputs(
        &mut self,
        source: SimulatorId,
        messages: Vec<OutputMessage>,
        bags: &mut CompleteEventBagModel,
    ) -> Result<(), SimulationError> {
        if messages.is_empty() {
            return Ok(());
        }
        let source_node = self.simulators[source.0]
            .as_ref()
            .ok_or(InvalidStateError::EventSchedulingError)?
            .node();
        let time = self.current_time;
        for message in messages {
            let targets = self.graph.target_ports(source_node, &message.port_name);
            for (node, port) in targets {
                let Some(&target) = self.node_index.get(&node) else {
                    log::warn!(
                        "dropping event to unbound model {}",
                        self.graph.full_name(node)
                    );
                    continue;
                };
                if self.is_gone(target) {
                    continue;
                }
                if message.request {
                    let event = RequestEvent {
                        time,
                        source,
                        target,
                        port_name: port,
                        attributes: message.attributes.clone(),
                    };
                    if bags.time() == time {
                        bags.put_request(event);
                    } else {
                        self.event_table.put_request(event);
                    }
                } else {
                    let event = ExternalEvent {
                        time,
                        source,
                        target,
                        port_name: port,
                        attributes: message.attributes.clone(),
                    };
                    if bags.time() == time {
                        bags.put_external(event);
                    } else {
                        self.event_table.put_external(event);
                    }
                }
            }
        }
        Ok(())
    }

    /// Every event view subscribed to this simulator observes it now, at
    /// the transition's time.
    fn notify_event_views(&mut self, simulator_id: SimulatorId) -> Result<(), SimulationError> {
        let Some(simulator) = self
            .simulators
            .get(simulator_id.0)
            .and_then(Option::as_ref)
        else {
            return Ok(());
        };
        let model_name = simulator.name().to_string();
        let time = self.current_time;
        for view in self.views.values_mut() {
            if !view.is_event() || !view.observes(simulator_id) {
                continue;
            }
            for port in view.ports_of(simulator_id) {
                let event = ObservationEvent {
                    time,
                    target: simulator_id,
                    port_name: port,
                    view_name: view.name().to_string(),
                };
                let value = simulator.observation(&event)?;
                view.process(&event, &model_name, value);
            }
        }
        Ok(())
    }

    /// Observations run after the instant's transitions; a timed view's
    /// follow-up tick goes back into the event table.
    fn process_observation_events(
        &mut self,
        bags: &mut CompleteEventBagModel,
    ) -> Result<(), SimulationError> {
        for event in bags.take_observations() {
            let Some(simulator) = self
                .simulators
                .get(event.target.0)
                .and_then(Option::as_ref)
            else {
                continue;
            };
            let value = simulator.observation(&event)?;
            let model_name = simulator.name().to_string();
            let view = self
                .views
                .get_mut(&event.view_name)
                .ok_or_else(|| StructuralError::UnknownView(event.view_name.clone()))?;
            if let Some(followup) = view.process(&event, &model_name, value) {
                self.event_table.put_observation(followup);
            }
        }
        Ok(())
    }

    /// Applies queued executive directives until the queue is quiet; a
    /// created model's `init` may queue more.  Invalid-state rejections are
    /// logged and skipped, everything else aborts the run.
    fn apply_directives(
        &mut self,
        bags: &mut CompleteEventBagModel,
    ) -> Result<(), SimulationError> {
        loop {
            let directives = self.services.take_directives();
            if directives.is_empty() {
                return Ok(());
            }
            for directive in directives {
                if let Err(error) = self.apply_directive(directive, bags) {
                    if error.is_fatal() {
                        return Err(error);
                    }
                    log::warn!("executive directive rejected: {}", error);
                }
            }
        }
    }

    fn apply_directive(
        &mut self,
        directive: Directive,
        bags: &mut CompleteEventBagModel,
    ) -> Result<(), SimulationError> {
        match directive {
            Directive::AddDynamic(dynamic) => self.factory.add_dynamic(dynamic),
            Directive::AddCondition(condition) => self.factory.add_condition(condition),
            Directive::AddObservable(observable) => self.factory.add_observable(observable),
            Directive::CreateModel {
                parent,
                name,
                dynamics,
                conditions,
                observable,
            } => {
                log::debug!("executive creates {}.{}", parent, name);
                let parent_id = self
                    .graph
                    .resolve_path(&parent)
                    .ok_or_else(|| StructuralError::UnknownModel(parent.clone()))?;
                let repr = ModelRepr::Atomic(AtomicRepr {
                    name,
                    dynamics,
                    conditions,
                    observable,
                });
                let added = self.graph.add_child_from_repr(parent_id, &repr)?;
                for node in added {
                    self.create_simulator(node)?;
                }
                Ok(())
            }
            Directive::CreateModelFromClass {
                class_name,
                parent,
                name,
            } => {
                log::debug!("executive clones class {} as {}.{}", class_name, parent, name);
                let parent_id = self
                    .graph
                    .resolve_path(&parent)
                    .ok_or_else(|| StructuralError::UnknownModel(parent.clone()))?;
                let repr = self.factory.class(&class_name)?.renamed(&name);
                let added = self.graph.add_child_from_repr(parent_id, &repr)?;
                for node in added {
                    self.create_simulator(node)?;
                }
                Ok(())
            }
            Directive::DeleteModel { parent, name } => {
                log::debug!("executive deletes {}.{}", parent, name);
                let parent_id = self
                    .graph
                    .resolve_path(&parent)
                    .ok_or_else(|| StructuralError::UnknownModel(parent.clone()))?;
                let node = self.graph.find_child(parent_id, &name).ok_or_else(|| {
                    StructuralError::UnknownModel(format!("{parent}.{name}"))
                })?;
                self.delete_node(node, bags);
                Ok(())
            }
            Directive::Subscribe { model, port, view } => {
                if !self.views.contains_key(&view) {
                    return Err(StructuralError::UnknownView(view).into());
                }
                let node = self
                    .graph
                    .resolve_path(&model)
                    .ok_or_else(|| StructuralError::UnknownModel(model.clone()))?;
                let simulator = *self
                    .node_index
                    .get(&node)
                    .ok_or(InvalidStateError::EventSchedulingError)?;
                self.subscribe_port(simulator, &port, &view)
            }
        }
    }

    /// Two-phase deletion, phase one.  Atomic descendants go first, then
    /// the structural teardown removes every coupling touching the deleted
    /// boundary.
    fn delete_node(&mut self, node: NodeId, bags: &mut CompleteEventBagModel) {
        for atomic in self.graph.atomic_descendants(node) {
            self.delete_atomic(atomic, bags);
        }
        self.graph.remove_node(node);
    }

    fn delete_atomic(&mut self, node: NodeId, bags: &mut CompleteEventBagModel) {
        let Some(id) = self.node_index.remove(&node) else {
            return;
        };
        for view in self.views.values_mut() {
            view.unsubscribe_model(id);
        }
        self.event_table.delete_events_for(id);
        bags.delete_events_for(id);
        if let Some(mut simulator) = self.simulators[id.0].take() {
            simulator.clear();
            log::debug!("model {} queued for deletion", simulator.name());
            self.pending_deletion.push(simulator);
        }
    }
}
