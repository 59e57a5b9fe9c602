//! The project module defines the descriptor consumed by the coordinator:
//! the experiment frame, the model graph, the dynamics/condition/observable
//! declarations, and the view and output configurations.  The descriptor is
//! plain serde data; parsing a concrete on-disk format into it is the
//! host's concern.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::ModelRepr;
use crate::simulator::{Time, ViewKind};

/// A complete simulation project: everything `Coordinator::new` needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub experiment: Experiment,
    #[serde(default)]
    pub dynamics: Vec<Dynamic>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub observables: Vec<Observable>,
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,
    #[serde(default)]
    pub views: Vec<ViewConfig>,
    #[serde(default)]
    pub classes: Vec<Class>,
    pub model: ModelRepr,
}

/// The experiment frame: run name (prefixes view trace files), initial
/// time, optional horizon, and the RNG seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    pub name: String,
    #[serde(default)]
    pub begin: Time,
    #[serde(default)]
    pub duration: Option<Time>,
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Declares a dynamics plugin under an experiment-local name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dynamic {
    pub name: String,
    pub plugin: String,
}

impl Dynamic {
    /// A declaration whose local name and plugin name coincide.
    pub fn of(plugin: impl Into<String>) -> Self {
        let plugin = plugin.into();
        Self {
            name: plugin.clone(),
            plugin,
        }
    }
}

/// A named set of init values, merged into the value map handed to the
/// dynamics constructor of every model referencing it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub name: String,
    #[serde(default)]
    pub values: BTreeMap<String, serde_yaml::Value>,
}

/// Declares which ports of a model are observable, and which views each
/// port feeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observable {
    pub name: String,
    #[serde(default)]
    pub ports: BTreeMap<String, Vec<String>>,
}

/// Where a view writes: a local file or a distant socket, plus the plugin
/// name and free-form data forwarded to the stream writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputConfig {
    pub name: String,
    pub format: OutputFormat,
    pub plugin: String,
    pub location: String,
    #[serde(default)]
    pub data: serde_yaml::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputFormat {
    Local,
    Distant,
}

/// A named observation sink with its firing policy and output target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewConfig {
    pub name: String,
    pub kind: ViewKind,
    pub output: String,
}

/// A reusable sub-graph template, instantiated by executive models through
/// `create_model_from_class`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub name: String,
    pub model: ModelRepr,
}
