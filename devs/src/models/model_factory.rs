use std::collections::HashMap;
use std::sync::Mutex;

use lazy_static::lazy_static;

use super::model_trait::ReportableDynamics;
use super::AtomicModel;
use crate::graph::AtomicNode;
use crate::models::ModelRepr;
use crate::project::{Condition, Dynamic, Observable, Project};
use crate::utils::errors::{SimulationError, StructuralError};

pub type DynamicsConstructor = fn(serde_yaml::Value) -> Option<Box<dyn ReportableDynamics>>;

lazy_static! {
    static ref CONSTRUCTORS: Mutex<HashMap<&'static str, DynamicsConstructor>> = {
        let mut m = HashMap::new();
        m.insert(
            "Accumulator",
            super::Accumulator::from_value as DynamicsConstructor,
        );
        m.insert(
            "PulseGenerator",
            super::PulseGenerator::from_value as DynamicsConstructor,
        );
        m.insert("Queue", super::Queue::from_value as DynamicsConstructor);
        Mutex::new(m)
    };
}

/// Registers a dynamics plugin under its type name, making it available to
/// every subsequently-built model factory.
pub fn register(dynamics_type: &'static str, constructor: DynamicsConstructor) {
    CONSTRUCTORS
        .lock()
        .unwrap()
        .insert(dynamics_type, constructor);
}

/// Instantiates a registered plugin from the value map of its merged
/// conditions.
pub fn create(
    dynamics_type: &str,
    values: serde_yaml::Value,
) -> Result<Option<Box<dyn ReportableDynamics>>, SimulationError> {
    match CONSTRUCTORS.lock().unwrap().get(dynamics_type) {
        Some(constructor) => Ok(constructor(values)),
        None => Err(StructuralError::UnknownDynamics(dynamics_type.to_string()).into()),
    }
}

/// The model factory owns the reusable templates of a running experiment:
/// dynamics declarations, conditions (init value sets), observables (port
/// to view subscriptions), and classes (sub-graph templates).  Executive
/// models extend these collections mid-run.
#[derive(Default)]
pub struct ModelFactory {
    dynamics: HashMap<String, Dynamic>,
    conditions: HashMap<String, Condition>,
    observables: HashMap<String, Observable>,
    classes: HashMap<String, ModelRepr>,
}

impl ModelFactory {
    pub fn new(project: &Project) -> Result<Self, SimulationError> {
        let mut factory = ModelFactory::default();
        for dynamic in &project.dynamics {
            factory.add_dynamic(dynamic.clone())?;
        }
        for condition in &project.conditions {
            factory.add_condition(condition.clone())?;
        }
        for observable in &project.observables {
            factory.add_observable(observable.clone())?;
        }
        for class in &project.classes {
            factory.add_class(class.name.clone(), class.model.clone())?;
        }
        Ok(factory)
    }

    pub fn add_dynamic(&mut self, dynamic: Dynamic) -> Result<(), SimulationError> {
        if self.dynamics.contains_key(&dynamic.name) {
            return Err(StructuralError::DuplicateRegistration(dynamic.name).into());
        }
        self.dynamics.insert(dynamic.name.clone(), dynamic);
        Ok(())
    }

    pub fn add_condition(&mut self, condition: Condition) -> Result<(), SimulationError> {
        if self.conditions.contains_key(&condition.name) {
            return Err(StructuralError::DuplicateRegistration(condition.name).into());
        }
        self.conditions.insert(condition.name.clone(), condition);
        Ok(())
    }

    pub fn add_observable(&mut self, observable: Observable) -> Result<(), SimulationError> {
        if self.observables.contains_key(&observable.name) {
            return Err(StructuralError::DuplicateRegistration(observable.name).into());
        }
        self.observables
            .insert(observable.name.clone(), observable);
        Ok(())
    }

    pub fn add_class(&mut self, name: String, model: ModelRepr) -> Result<(), SimulationError> {
        if self.classes.contains_key(&name) {
            return Err(StructuralError::DuplicateRegistration(name).into());
        }
        self.classes.insert(name, model);
        Ok(())
    }

    pub fn observable(&self, name: &str) -> Result<&Observable, SimulationError> {
        self.observables
            .get(name)
            .ok_or_else(|| StructuralError::UnknownObservable(name.to_string()).into())
    }

    pub fn class(&self, name: &str) -> Result<&ModelRepr, SimulationError> {
        self.classes
            .get(name)
            .ok_or_else(|| StructuralError::UnknownClass(name.to_string()).into())
    }

    /// Merges the named conditions, in declaration order, into the single
    /// value map handed to the dynamics constructor.
    fn condition_values(&self, conditions: &[String]) -> Result<serde_yaml::Value, SimulationError> {
        let mut merged = serde_yaml::Mapping::new();
        for name in conditions {
            let condition = self
                .conditions
                .get(name)
                .ok_or_else(|| StructuralError::UnknownCondition(name.to_string()))?;
            for (key, value) in &condition.values {
                merged.insert(
                    serde_yaml::Value::String(key.clone()),
                    value.clone(),
                );
            }
        }
        Ok(serde_yaml::Value::Mapping(merged))
    }

    /// Builds the atomic model for one structural node: plugin lookup,
    /// condition merge, construction.
    pub fn build(&self, name: &str, node: &AtomicNode) -> Result<AtomicModel, SimulationError> {
        let dynamic = self
            .dynamics
            .get(&node.dynamics)
            .ok_or_else(|| StructuralError::UnknownDynamics(node.dynamics.clone()))?;
        let values = self.condition_values(&node.conditions)?;
        let inner = create(&dynamic.plugin, values)?.ok_or_else(|| {
            SimulationError::from(StructuralError::BadConditions {
                model: name.to_string(),
                plugin: dynamic.plugin.clone(),
            })
        })?;
        Ok(AtomicModel::new(name.to_string(), inner))
    }
}
