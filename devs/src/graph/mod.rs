//! The graph module holds the structural side of a simulation: the tree of
//! named atomic and coupled models, the couplings between their ports, and
//! the transitive target resolution used to route events.  Structural nodes
//! are owned by the arena; simulators and views reference them through
//! plain [`NodeId`] handles.

use serde::{Deserialize, Serialize};

use crate::models::ModelRepr;
use crate::utils::errors::{InvalidStateError, SimulationError, StructuralError};

/// Handle of one structural node.  Handles are never reused within a run,
/// so a stale handle can be detected instead of resolving to a new model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

/// A coupling between two children of the same coupled model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalCoupling {
    #[serde(rename = "sourceID")]
    pub source_id: String,
    #[serde(rename = "targetID")]
    pub target_id: String,
    pub source_port: String,
    pub target_port: String,
}

/// A coupling from a coupled model's input port down to one of its children.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalInputCoupling {
    #[serde(rename = "targetID")]
    pub target_id: String,
    pub source_port: String,
    pub target_port: String,
}

/// A coupling from a child up to one of the coupled model's output ports.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalOutputCoupling {
    #[serde(rename = "sourceID")]
    pub source_id: String,
    pub source_port: String,
    pub target_port: String,
}

/// The structural description of one atomic model: which dynamics plugin
/// drives it, which conditions seed it, and which observable exposes it.
#[derive(Debug, Clone)]
pub struct AtomicNode {
    pub dynamics: String,
    pub conditions: Vec<String>,
    pub observable: Option<String>,
}

#[derive(Debug, Default)]
pub struct CoupledNode {
    children: Vec<NodeId>,
    internal_couplings: Vec<InternalCoupling>,
    external_input_couplings: Vec<ExternalInputCoupling>,
    external_output_couplings: Vec<ExternalOutputCoupling>,
}

#[derive(Debug)]
enum NodeKind {
    Atomic(AtomicNode),
    Coupled(CoupledNode),
}

#[derive(Debug)]
pub struct Node {
    name: String,
    parent: Option<NodeId>,
    kind: NodeKind,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self.kind, NodeKind::Atomic(_))
    }

    pub fn is_coupled(&self) -> bool {
        matches!(self.kind, NodeKind::Coupled(_))
    }

    pub fn atomic(&self) -> Option<&AtomicNode> {
        match &self.kind {
            NodeKind::Atomic(atomic) => Some(atomic),
            NodeKind::Coupled(_) => None,
        }
    }
}

/// The arena of structural nodes.  Deleted slots stay vacant so that every
/// [`NodeId`] handed out during a run stays unambiguous.
#[derive(Debug)]
pub struct ModelGraph {
    nodes: Vec<Option<Node>>,
    root: NodeId,
}

impl ModelGraph {
    /// Builds the arena from a recursive model description.
    pub fn from_repr(repr: &ModelRepr) -> Result<Self, SimulationError> {
        let mut graph = ModelGraph {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        let root = graph.insert_repr(None, repr)?;
        graph.root = root;
        Ok(graph)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn name(&self, id: NodeId) -> &str {
        self.node(id).map_or("<deleted>", Node::name)
    }

    /// Dotted path from the root, used for trace records and diagnostics.
    pub fn full_name(&self, id: NodeId) -> String {
        let mut segments = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            match self.node(current) {
                Some(node) => {
                    segments.push(node.name.clone());
                    cursor = node.parent;
                }
                None => break,
            }
        }
        segments.reverse();
        segments.join(".")
    }

    /// Every atomic leaf, in declaration order.  This order defines
    /// simulator registration order and therefore the same-instant
    /// tie-break of the event table.
    pub fn atomic_leaves(&self) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        self.collect_atomics(self.root, &mut leaves);
        leaves
    }

    pub fn atomic_descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        self.collect_atomics(id, &mut leaves);
        leaves
    }

    fn collect_atomics(&self, id: NodeId, out: &mut Vec<NodeId>) {
        match self.node(id).map(|node| &node.kind) {
            Some(NodeKind::Atomic(_)) => out.push(id),
            Some(NodeKind::Coupled(coupled)) => {
                for child in &coupled.children {
                    self.collect_atomics(*child, out);
                }
            }
            None => {}
        }
    }

    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        match self.node(parent).map(|node| &node.kind) {
            Some(NodeKind::Coupled(coupled)) => coupled
                .children
                .iter()
                .copied()
                .find(|child| self.name(*child) == name),
            _ => None,
        }
    }

    /// Resolves a dotted path from the root; a single bare name falls back
    /// to a depth-first search of the whole tree.
    pub fn resolve_path(&self, path: &str) -> Option<NodeId> {
        let mut segments = path.split('.');
        let first = segments.next()?;
        if self.name(self.root) == first {
            let mut cursor = self.root;
            for segment in segments {
                cursor = self.find_child(cursor, segment)?;
            }
            return Some(cursor);
        }
        if path.contains('.') {
            return None;
        }
        self.search_by_name(self.root, first)
    }

    fn search_by_name(&self, from: NodeId, name: &str) -> Option<NodeId> {
        if self.name(from) == name {
            return Some(from);
        }
        if let Some(NodeKind::Coupled(coupled)) = self.node(from).map(|node| &node.kind) {
            for child in &coupled.children {
                if let Some(found) = self.search_by_name(*child, name) {
                    return Some(found);
                }
            }
        }
        None
    }

    fn insert_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(node));
        id
    }

    fn insert_repr(
        &mut self,
        parent: Option<NodeId>,
        repr: &ModelRepr,
    ) -> Result<NodeId, SimulationError> {
        match repr {
            ModelRepr::Atomic(atomic) => Ok(self.insert_node(Node {
                name: atomic.name.clone(),
                parent,
                kind: NodeKind::Atomic(AtomicNode {
                    dynamics: atomic.dynamics.clone(),
                    conditions: atomic.conditions.clone(),
                    observable: atomic.observable.clone(),
                }),
            })),
            ModelRepr::Coupled(coupled) => {
                let id = self.insert_node(Node {
                    name: coupled.name.clone(),
                    parent,
                    kind: NodeKind::Coupled(CoupledNode {
                        children: Vec::new(),
                        internal_couplings: coupled.internal_couplings.clone(),
                        external_input_couplings: coupled.external_input_couplings.clone(),
                        external_output_couplings: coupled.external_output_couplings.clone(),
                    }),
                });
                for component in &coupled.components {
                    let child = self.insert_repr(Some(id), component)?;
                    match &mut self.nodes[id.0].as_mut().expect("fresh node").kind {
                        NodeKind::Coupled(node) => node.children.push(child),
                        NodeKind::Atomic(_) => unreachable!("inserted as coupled"),
                    }
                }
                Ok(id)
            }
        }
    }

    /// Grafts a described sub-model under `parent`, returning every atomic
    /// leaf of the graft in declaration order.
    pub fn add_child_from_repr(
        &mut self,
        parent: NodeId,
        repr: &ModelRepr,
    ) -> Result<Vec<NodeId>, SimulationError> {
        let name = repr.name();
        match self.node(parent) {
            Some(node) if node.is_coupled() => {}
            Some(node) => {
                return Err(StructuralError::UnknownModel(node.name.clone()).into());
            }
            None => return Err(InvalidStateError::EventSchedulingError.into()),
        }
        if self.find_child(parent, name).is_some() {
            return Err(InvalidStateError::ModelExists {
                parent: self.full_name(parent),
                name: name.to_string(),
            }
            .into());
        }
        let child = self.insert_repr(Some(parent), repr)?;
        match &mut self.nodes[parent.0].as_mut().expect("checked above").kind {
            NodeKind::Coupled(node) => node.children.push(child),
            NodeKind::Atomic(_) => unreachable!("checked above"),
        }
        Ok(self.atomic_descendants(child))
    }

    /// Removes a node and its descendants, and every coupling in the parent
    /// that touches the removed boundary.
    pub fn remove_node(&mut self, id: NodeId) {
        let (name, parent) = match self.node(id) {
            Some(node) => (node.name.clone(), node.parent),
            None => return,
        };
        if let Some(NodeKind::Coupled(coupled)) =
            self.nodes[id.0].as_ref().map(|node| &node.kind)
        {
            for child in coupled.children.clone() {
                self.remove_subtree(child);
            }
        }
        self.nodes[id.0] = None;
        if let Some(parent_id) = parent {
            if let Some(NodeKind::Coupled(coupled)) =
                self.nodes[parent_id.0].as_mut().map(|node| &mut node.kind)
            {
                coupled.children.retain(|child| *child != id);
                coupled
                    .internal_couplings
                    .retain(|c| c.source_id != name && c.target_id != name);
                coupled
                    .external_input_couplings
                    .retain(|c| c.target_id != name);
                coupled
                    .external_output_couplings
                    .retain(|c| c.source_id != name);
            }
        }
    }

    fn remove_subtree(&mut self, id: NodeId) {
        if let Some(NodeKind::Coupled(coupled)) =
            self.nodes[id.0].as_ref().map(|node| &node.kind)
        {
            for child in coupled.children.clone() {
                self.remove_subtree(child);
            }
        }
        self.nodes[id.0] = None;
    }

    /// Resolves the atomic `(model, port)` destinations reachable from one
    /// output port, walking internal couplings across, input couplings down,
    /// and output couplings up, until only atomic targets remain.
    pub fn target_ports(&self, source: NodeId, port: &str) -> Vec<(NodeId, String)> {
        let mut targets = Vec::new();
        self.resolve_up(source, port, &mut targets);
        targets
    }

    fn resolve_up(&self, child: NodeId, port: &str, out: &mut Vec<(NodeId, String)>) {
        let Some(parent_id) = self.node(child).and_then(Node::parent) else {
            return;
        };
        let child_name = self.name(child).to_string();
        let Some(NodeKind::Coupled(parent)) = self.node(parent_id).map(|node| &node.kind) else {
            return;
        };
        for coupling in &parent.internal_couplings {
            if coupling.source_id == child_name && coupling.source_port == port {
                if let Some(target) = self.find_child(parent_id, &coupling.target_id) {
                    self.resolve_down(target, &coupling.target_port, out);
                }
            }
        }
        for coupling in &parent.external_output_couplings {
            if coupling.source_id == child_name && coupling.source_port == port {
                self.resolve_up(parent_id, &coupling.target_port, out);
            }
        }
    }

    fn resolve_down(&self, node: NodeId, port: &str, out: &mut Vec<(NodeId, String)>) {
        match self.node(node).map(|n| &n.kind) {
            Some(NodeKind::Atomic(_)) => out.push((node, port.to_string())),
            Some(NodeKind::Coupled(coupled)) => {
                for coupling in &coupled.external_input_couplings {
                    if coupling.source_port == port {
                        if let Some(target) = self.find_child(node, &coupling.target_id) {
                            self.resolve_down(target, &coupling.target_port, out);
                        }
                    }
                }
            }
            None => {}
        }
    }
}
