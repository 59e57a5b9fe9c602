use thiserror::Error;

/// `SimulationError` enumerates all possible errors returned by devs.  The
/// four groups carry different fatality: structural and model failures abort
/// the run, invalid-state reports leave the engine consistent, and stream
/// writer failures only cost the affected record.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// Represents a defect in the simulated structure itself
    #[error(transparent)]
    Structural(#[from] StructuralError),

    /// Represents a violated precondition of a dynamic structure call
    #[error(transparent)]
    InvalidState(#[from] InvalidStateError),

    /// Represents a failure raised by an atomic model callback
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Transparent I/O errors, raised by stream writers
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SimulationError {
    /// A fatal error aborts the run; the others are handled locally.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SimulationError::Structural(_) | SimulationError::Model(_)
        )
    }
}

/// Structural errors are fatal at the relevant call.
#[derive(Error, Debug)]
pub enum StructuralError {
    /// Represents an operation requested on a model that does not exist
    #[error("the model '{0}' cannot be found in the simulation")]
    UnknownModel(String),

    /// Represents an operation requested on a model port that does not exist
    #[error("the model '{model}' has no port named '{port}'")]
    UnknownPort { model: String, port: String },

    /// Represents an operation requested on a view that does not exist
    #[error("the view '{0}' is unknown to the coordinator")]
    UnknownView(String),

    /// Represents a dynamics plugin missing from the constructor registry
    #[error("the dynamics plugin '{0}' is not registered")]
    UnknownDynamics(String),

    /// Represents a reference to an experiment condition that does not exist
    #[error("the condition '{0}' is not declared")]
    UnknownCondition(String),

    /// Represents a reference to an observable that does not exist
    #[error("the observable '{0}' is not declared")]
    UnknownObservable(String),

    /// Represents a reference to a class that does not exist
    #[error("the class '{0}' is not declared")]
    UnknownClass(String),

    /// Represents a view referencing an output that does not exist
    #[error("the output '{output}' does not exist for view '{view}'")]
    UnknownOutput { view: String, output: String },

    /// Represents a second registration under an already-used name
    #[error("'{0}' is already registered")]
    DuplicateRegistration(String),

    /// Represents a dynamics constructor rejecting its condition values
    #[error("the dynamics plugin '{plugin}' rejected the conditions of model '{model}'")]
    BadConditions { model: String, plugin: String },
}

/// Invalid-state errors report a violated precondition of an executive call;
/// the engine remains consistent and the run continues.
#[derive(Error, Debug)]
pub enum InvalidStateError {
    /// Represents a creation colliding with an existing sibling
    #[error("a model named '{name}' already exists under '{parent}'")]
    ModelExists { parent: String, name: String },

    /// Represents an operation on a simulator already scheduled for deletion
    #[error("the simulator of model '{0}' is already cleared")]
    SimulatorCleared(String),

    /// Represents an event addressed to a simulator that is gone
    #[error("an event was scheduled to a simulator that no longer exists")]
    EventSchedulingError,
}

/// Model errors propagate an atomic model's callback failure; fatal.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Represents a message arriving on a port the model does not handle
    #[error("a message arrived on an unhandled port '{0}'")]
    UnexpectedMessage(String),

    /// Represents an invalid model state
    #[error("an invalid model state was encountered")]
    InvalidModelState,

    /// Represents an invalid model configuration encountered during simulation
    #[error("an invalid model configuration was encountered during simulation")]
    InvalidConfiguration,

    /// Represents a negative time advance returned by a transition
    #[error("a transition returned a negative time advance")]
    NegativeTimeAdvance,
}
