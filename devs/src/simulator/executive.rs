//! The executive surface: the subset of the coordinator exposed to running
//! atomic models so they may mutate the graph during their own transitions.
//! Calls queue directives; the coordinator applies them as soon as the
//! pushing callback returns, before the next bag entry is drained, so a
//! directive can never destabilize the transition that issued it.

use crate::models::ModelRepr;
use crate::project::{Condition, Dynamic, Observable};

#[derive(Debug, Clone)]
pub(crate) enum Directive {
    AddDynamic(Dynamic),
    AddCondition(Condition),
    AddObservable(Observable),
    CreateModel {
        parent: String,
        name: String,
        dynamics: String,
        conditions: Vec<String>,
        observable: Option<String>,
    },
    CreateModelFromClass {
        class_name: String,
        parent: String,
        name: String,
    },
    DeleteModel {
        parent: String,
        name: String,
    },
    Subscribe {
        model: String,
        port: String,
        view: String,
    },
}

/// Queued dynamic structure edits.  Obtained through
/// [`Services::executive`](crate::simulator::Services::executive).
#[derive(Debug, Default)]
pub struct Executive {
    directives: Vec<Directive>,
}

impl Executive {
    /// Registers a reusable dynamics declaration.
    pub fn add_dynamic(&mut self, dynamic: Dynamic) {
        self.directives.push(Directive::AddDynamic(dynamic));
    }

    /// Registers a reusable condition (init value set).
    pub fn add_condition(&mut self, condition: Condition) {
        self.directives.push(Directive::AddCondition(condition));
    }

    /// Registers a reusable observable declaration.
    pub fn add_observable(&mut self, observable: Observable) {
        self.directives.push(Directive::AddObservable(observable));
    }

    /// Instantiates a new atomic model under `parent`; its `init` runs and
    /// its first internal event is scheduled before the next bag entry.
    pub fn create_model(
        &mut self,
        parent: impl Into<String>,
        name: impl Into<String>,
        dynamics: impl Into<String>,
        conditions: Vec<String>,
        observable: Option<String>,
    ) {
        self.directives.push(Directive::CreateModel {
            parent: parent.into(),
            name: name.into(),
            dynamics: dynamics.into(),
            conditions,
            observable,
        });
    }

    /// Clones a pre-registered class sub-graph under `parent`.
    pub fn create_model_from_class(
        &mut self,
        class_name: impl Into<String>,
        parent: impl Into<String>,
        name: impl Into<String>,
    ) {
        self.directives.push(Directive::CreateModelFromClass {
            class_name: class_name.into(),
            parent: parent.into(),
            name: name.into(),
        });
    }

    /// Initiates the two-phase deletion of a child of `parent`.
    pub fn delete_model(&mut self, parent: impl Into<String>, name: impl Into<String>) {
        self.directives.push(Directive::DeleteModel {
            parent: parent.into(),
            name: name.into(),
        });
    }

    /// Attaches an existing model port to a named view.
    pub fn subscribe(
        &mut self,
        model: impl Into<String>,
        port: impl Into<String>,
        view: impl Into<String>,
    ) {
        self.directives.push(Directive::Subscribe {
            model: model.into(),
            port: port.into(),
            view: view.into(),
        });
    }

    pub(crate) fn take(&mut self) -> Vec<Directive> {
        std::mem::take(&mut self.directives)
    }
}
