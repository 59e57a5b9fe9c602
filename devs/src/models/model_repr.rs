use serde::{Deserialize, Serialize};

use crate::graph::{ExternalInputCoupling, ExternalOutputCoupling, InternalCoupling};

/// The recursive description of a model sub-tree, as read from the project
/// descriptor or from a class template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ModelRepr {
    Atomic(AtomicRepr),
    Coupled(CoupledRepr),
}

impl ModelRepr {
    pub fn name(&self) -> &str {
        match self {
            ModelRepr::Atomic(atomic) => &atomic.name,
            ModelRepr::Coupled(coupled) => &coupled.name,
        }
    }

    /// Renamed copy, used when instantiating a class template under a new
    /// model name.
    pub fn renamed(&self, name: &str) -> ModelRepr {
        let mut repr = self.clone();
        match &mut repr {
            ModelRepr::Atomic(atomic) => atomic.name = name.to_string(),
            ModelRepr::Coupled(coupled) => coupled.name = name.to_string(),
        }
        repr
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomicRepr {
    pub name: String,
    pub dynamics: String,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default)]
    pub observable: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoupledRepr {
    pub name: String,
    #[serde(default)]
    pub components: Vec<ModelRepr>,
    #[serde(default)]
    pub internal_couplings: Vec<InternalCoupling>,
    #[serde(default)]
    pub external_input_couplings: Vec<ExternalInputCoupling>,
    #[serde(default)]
    pub external_output_couplings: Vec<ExternalOutputCoupling>,
}
