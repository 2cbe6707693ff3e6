// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure containing nodes, connectors, variables and subgraphs.

use crate::connector::{Connector, ConnectorId, Endpoint};
use crate::error::GraphError;
use crate::geometry::Point;
use crate::node::{Node, NodeId};
use crate::registry::{NodeHooks, SharedRegistry};
use crate::serialized::{SerializedGraph, SerializedSubgraph, SerializedVariable};
use crate::slot::{SlotDirection, SlotVerdict};
use crate::variable::{Variable, VariableScope};
use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Graph-level notifications
pub trait GraphListener: Send + Sync {
    /// A node was added and received its id
    fn on_node_added(&self, _node: &Node) {}
    /// A node is about to be removed; its connectors still exist
    fn on_node_removing(&self, _node: &Node) {}
    /// A connector was added
    fn on_connector_added(&self, _connector: &Connector) {}
    /// A connector was removed
    fn on_connector_removed(&self, _connector: &Connector) {}
}

/// Result of a successful connect
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectOutcome {
    /// Id of the new connector
    pub id: ConnectorId,
    /// `Add` or `Replace`
    pub verdict: SlotVerdict,
    /// Connectors removed to make room
    pub replaced: Vec<Connector>,
}

/// A node taken out of a graph along with the connectors that touched it
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedNode {
    /// The node, still carrying its id
    pub node: Node,
    /// Connectors removed with it
    pub connectors: Vec<Connector>,
}

/// A node graph
pub struct Graph {
    name: String,
    registry: SharedRegistry,
    nodes: IndexMap<NodeId, Node>,
    connectors: IndexMap<ConnectorId, Connector>,
    local_vars: IndexMap<String, Variable>,
    inputs: IndexMap<String, Variable>,
    outputs: IndexMap<String, Variable>,
    subgraphs: IndexMap<String, Graph>,
    next_unique_id: u64,
    listener: Option<Arc<dyn GraphListener>>,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("name", &self.name)
            .field("nodes", &self.nodes.len())
            .field("connectors", &self.connectors.len())
            .field("subgraphs", &self.subgraphs.keys().collect::<Vec<_>>())
            .field("next_unique_id", &self.next_unique_id)
            .finish_non_exhaustive()
    }
}

impl Graph {
    /// Create an empty graph using `registry` for node construction
    pub fn new(registry: SharedRegistry) -> Self {
        Self::named("main", registry)
    }

    /// Create an empty named graph
    pub fn named(name: impl Into<String>, registry: SharedRegistry) -> Self {
        Self {
            name: name.into(),
            registry,
            nodes: IndexMap::new(),
            connectors: IndexMap::new(),
            local_vars: IndexMap::new(),
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
            subgraphs: IndexMap::new(),
            next_unique_id: 1,
            listener: None,
        }
    }

    /// Graph name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The registry nodes are built from
    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Install graph-level notifications
    pub fn set_listener(&mut self, listener: Option<Arc<dyn GraphListener>>) {
        self.listener = listener;
    }

    fn allocate_id(&mut self) -> u64 {
        let id = self.next_unique_id;
        self.next_unique_id += 1;
        id
    }

    fn id_in_use(&self, id: u64) -> bool {
        self.nodes.contains_key(&NodeId(id)) || self.connectors.contains_key(&ConnectorId(id))
    }

    fn hooks_for(&self, node: NodeId) -> Option<Arc<dyn NodeHooks>> {
        let node_type = &self.nodes.get(&node)?.node_type;
        self.registry.read().hooks(node_type)
    }

    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Add a detached node, assigning it a fresh id
    pub fn add_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        if !self.registry.read().contains(&node.node_type) {
            tracing::warn!("Refusing to add node of unregistered type {}", node.node_type);
            return Err(GraphError::UnknownType(node.node_type));
        }
        let id = NodeId(self.allocate_id());
        self.insert_node(node, id);
        Ok(id)
    }

    /// Re-insert a previously removed node under its original id
    pub fn restore_node(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let id = node.id.ok_or(GraphError::MissingId)?;
        if self.id_in_use(id.0) {
            return Err(GraphError::IdInUse(id.0));
        }
        self.next_unique_id = self.next_unique_id.max(id.0 + 1);
        self.insert_node(node, id);
        Ok(id)
    }

    fn insert_node(&mut self, mut node: Node, id: NodeId) {
        node.id = Some(id);
        node.strip_connections();
        self.nodes.insert(id, node);

        if let Some(hooks) = self.hooks_for(id) {
            if let Some(node) = self.nodes.get_mut(&id) {
                hooks.on_added(node);
            }
        }
        if let (Some(listener), Some(node)) = (&self.listener, self.nodes.get(&id)) {
            listener.on_node_added(node);
        }
    }

    /// Remove a node and every connector touching it
    pub fn remove_node(&mut self, node_id: NodeId) -> Option<RemovedNode> {
        let node = self.nodes.get(&node_id)?;
        if let Some(listener) = &self.listener {
            listener.on_node_removing(node);
        }

        let touching: Vec<ConnectorId> = self
            .connectors
            .iter()
            .filter(|(_, c)| c.involves_node(node_id))
            .map(|(id, _)| *id)
            .collect();
        let connectors = touching
            .into_iter()
            .filter_map(|id| self.remove_connector(id))
            .collect();

        let hooks = self.hooks_for(node_id);
        let mut node = self.nodes.shift_remove(&node_id)?;
        if let Some(hooks) = hooks {
            hooks.on_removed(&mut node);
        }
        Some(RemovedNode { node, connectors })
    }

    /// Get a node
    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes.get(&node_id)
    }

    /// Get a mutable node
    pub fn node_mut(&mut self, node_id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&node_id)
    }

    /// Whether the node is in this graph
    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All node ids in insertion order
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Move a node
    pub fn set_node_position(&mut self, node_id: NodeId, position: Point) -> Result<(), GraphError> {
        let node = self
            .nodes
            .get_mut(&node_id)
            .ok_or(GraphError::NodeNotFound(node_id))?;
        node.position = position;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Connectors
    // ------------------------------------------------------------------

    /// Connect two slots given in either order
    pub fn connect(&mut self, a: Endpoint, b: Endpoint) -> Result<ConnectOutcome, GraphError> {
        self.insert_connector(Connector::new(a, b), None)
    }

    /// Add a connector under a fresh id; endpoints are normalized to out → in
    pub fn add_connector(&mut self, connector: Connector) -> Result<ConnectOutcome, GraphError> {
        self.insert_connector(connector, None)
    }

    /// Re-insert a previously removed connector under its original id
    pub fn restore_connector(&mut self, connector: Connector) -> Result<ConnectOutcome, GraphError> {
        let id = connector.id.ok_or(GraphError::MissingId)?;
        self.insert_connector(connector, Some(id.0))
    }

    fn insert_connector(
        &mut self,
        mut connector: Connector,
        restore_id: Option<u64>,
    ) -> Result<ConnectOutcome, GraphError> {
        let out_node = self
            .nodes
            .get(&connector.out.node)
            .ok_or(GraphError::NodeNotFound(connector.out.node))?;
        let in_node = self
            .nodes
            .get(&connector.input.node)
            .ok_or(GraphError::NodeNotFound(connector.input.node))?;
        for (node, endpoint) in [(out_node, &connector.out), (in_node, &connector.input)] {
            if node.slot(&endpoint.slot).is_none() {
                return Err(GraphError::SlotNotFound {
                    node: endpoint.node,
                    slot: endpoint.slot.clone(),
                });
            }
        }

        let (out_node, in_node) = if out_node.slot_direction(&connector.out.slot) == Some(SlotDirection::In) {
            std::mem::swap(&mut connector.out, &mut connector.input);
            (in_node, out_node)
        } else {
            (out_node, in_node)
        };

        let check = out_node.check_connection(&connector.out.slot, in_node, &connector.input.slot);
        if check.verdict == SlotVerdict::Reject {
            tracing::warn!("Cannot connect {:?} to {:?}: {}", connector.out, connector.input, check.reason);
            return Err(GraphError::Incompatible(check.reason));
        }
        if let Some(id) = restore_id {
            if self.id_in_use(id) {
                return Err(GraphError::IdInUse(id));
            }
        }

        let mut replaced = Vec::new();
        if check.verdict == SlotVerdict::Replace {
            for endpoint in [connector.out.clone(), connector.input.clone()] {
                let at_limit = self
                    .nodes
                    .get(&endpoint.node)
                    .and_then(|n| n.slot(&endpoint.slot))
                    .is_some_and(|s| s.is_at_limit());
                if !at_limit {
                    continue;
                }
                let oldest = self
                    .connectors
                    .values()
                    .find(|c| c.involves(&endpoint))
                    .and_then(|c| c.id);
                if let Some(removed) = oldest.and_then(|id| self.remove_connector(id)) {
                    replaced.push(removed);
                }
            }
        }

        let id = match restore_id {
            Some(id) => {
                self.next_unique_id = self.next_unique_id.max(id + 1);
                ConnectorId(id)
            }
            None => ConnectorId(self.allocate_id()),
        };
        connector.id = Some(id);

        for endpoint in [&connector.out, &connector.input] {
            if let Some(slot) = self
                .nodes
                .get_mut(&endpoint.node)
                .and_then(|n| n.slot_mut(&endpoint.slot))
            {
                slot.add_connection();
            }
        }
        self.notify_connection(&connector, true);
        if let Some(listener) = &self.listener {
            listener.on_connector_added(&connector);
        }
        self.connectors.insert(id, connector);

        Ok(ConnectOutcome {
            id,
            verdict: check.verdict,
            replaced,
        })
    }

    fn notify_connection(&mut self, connector: &Connector, added: bool) {
        for endpoint in [&connector.out, &connector.input] {
            let Some(hooks) = self.hooks_for(endpoint.node) else {
                continue;
            };
            if let Some(node) = self.nodes.get_mut(&endpoint.node) {
                if added {
                    hooks.on_connection_added(node, &endpoint.slot, connector);
                } else {
                    hooks.on_connection_broken(node, &endpoint.slot, connector);
                }
            }
        }
    }

    /// Remove a connector, releasing both slots
    pub fn remove_connector(&mut self, connector_id: ConnectorId) -> Option<Connector> {
        let connector = self.connectors.shift_remove(&connector_id)?;
        for endpoint in [&connector.out, &connector.input] {
            if let Some(slot) = self
                .nodes
                .get_mut(&endpoint.node)
                .and_then(|n| n.slot_mut(&endpoint.slot))
            {
                slot.break_connection();
            }
        }
        self.notify_connection(&connector, false);
        if let Some(listener) = &self.listener {
            listener.on_connector_removed(&connector);
        }
        Some(connector)
    }

    /// Get a connector
    pub fn connector(&self, connector_id: ConnectorId) -> Option<&Connector> {
        self.connectors.get(&connector_id)
    }

    /// Get a mutable connector
    pub fn connector_mut(&mut self, connector_id: ConnectorId) -> Option<&mut Connector> {
        self.connectors.get_mut(&connector_id)
    }

    /// All connectors in insertion order
    pub fn connectors(&self) -> impl Iterator<Item = &Connector> {
        self.connectors.values()
    }

    /// Number of connectors
    pub fn connector_count(&self) -> usize {
        self.connectors.len()
    }

    /// Connectors touching a node
    pub fn connectors_of_node(&self, node_id: NodeId) -> impl Iterator<Item = &Connector> {
        self.connectors.values().filter(move |c| c.involves_node(node_id))
    }

    /// Connectors touching any of the given nodes
    pub fn connectors_of_nodes<'a>(&'a self, node_ids: &'a [NodeId]) -> impl Iterator<Item = &'a Connector> {
        self.connectors
            .values()
            .filter(move |c| node_ids.iter().any(|id| c.involves_node(*id)))
    }

    /// Connectors attached to one slot
    pub fn connectors_of_slot<'a>(&'a self, endpoint: &'a Endpoint) -> impl Iterator<Item = &'a Connector> {
        self.connectors.values().filter(move |c| c.involves(endpoint))
    }

    /// Connectors leaving a node's outputs
    pub fn out_connectors(&self, node_id: NodeId) -> impl Iterator<Item = &Connector> {
        self.connectors.values().filter(move |c| c.out.node == node_id)
    }

    /// Connector linking two slots, in either order
    pub fn find_connector(&self, a: &Endpoint, b: &Endpoint) -> Option<&Connector> {
        self.connectors.values().find(|c| c.links(a, b))
    }

    // ------------------------------------------------------------------
    // Variables
    // ------------------------------------------------------------------

    fn scope(&self, scope: VariableScope) -> &IndexMap<String, Variable> {
        match scope {
            VariableScope::Input => &self.inputs,
            VariableScope::Output => &self.outputs,
            VariableScope::Local => &self.local_vars,
        }
    }

    fn scope_mut(&mut self, scope: VariableScope) -> &mut IndexMap<String, Variable> {
        match scope {
            VariableScope::Input => &mut self.inputs,
            VariableScope::Output => &mut self.outputs,
            VariableScope::Local => &mut self.local_vars,
        }
    }

    /// Whether any input, output or local variable uses `name`
    pub fn is_variable_name_taken(&self, name: &str) -> bool {
        self.inputs.contains_key(name)
            || self.outputs.contains_key(name)
            || self.local_vars.contains_key(name)
    }

    fn check_variable_name(&self, name: &str) -> Result<(), GraphError> {
        if self.is_variable_name_taken(name) {
            tracing::warn!("Variable name {name} is already used");
            return Err(GraphError::DuplicateName(name.to_string()));
        }
        Ok(())
    }

    /// Add a variable to a scope
    pub fn add_variable(&mut self, scope: VariableScope, variable: Variable) -> Result<(), GraphError> {
        self.check_variable_name(&variable.name)?;
        self.scope_mut(scope).insert(variable.name.clone(), variable);
        Ok(())
    }

    /// Add a graph input
    pub fn add_input(&mut self, name: impl Into<String>, var_type: impl Into<String>, value: Value) -> Result<(), GraphError> {
        self.add_variable(VariableScope::Input, Variable::new(name, var_type, value))
    }

    /// Add a graph output
    pub fn add_output(&mut self, name: impl Into<String>, var_type: impl Into<String>, value: Value) -> Result<(), GraphError> {
        self.add_variable(VariableScope::Output, Variable::new(name, var_type, value))
    }

    /// Add a local variable
    pub fn add_local_var(&mut self, name: impl Into<String>, var_type: impl Into<String>, value: Value) -> Result<(), GraphError> {
        self.add_variable(VariableScope::Local, Variable::new(name, var_type, value))
    }

    /// Rename a variable, keeping its position in the scope
    pub fn rename_variable(&mut self, scope: VariableScope, old: &str, new: &str) -> Result<(), GraphError> {
        if !self.scope(scope).contains_key(old) {
            return Err(GraphError::VariableNotFound(old.to_string()));
        }
        if old == new {
            return Ok(());
        }
        self.check_variable_name(new)?;

        let map = self.scope_mut(scope);
        *map = map
            .drain(..)
            .map(|(name, mut variable)| {
                if name == old {
                    variable.name = new.to_string();
                    (new.to_string(), variable)
                } else {
                    (name, variable)
                }
            })
            .collect();
        Ok(())
    }

    /// Change a variable's type
    pub fn retype_variable(&mut self, scope: VariableScope, name: &str, var_type: impl Into<String>) -> Result<(), GraphError> {
        let variable = self
            .scope_mut(scope)
            .get_mut(name)
            .ok_or_else(|| GraphError::VariableNotFound(name.to_string()))?;
        variable.var_type = var_type.into();
        Ok(())
    }

    /// Change a variable's value
    pub fn set_variable_value(&mut self, scope: VariableScope, name: &str, value: Value) -> Result<(), GraphError> {
        let variable = self
            .scope_mut(scope)
            .get_mut(name)
            .ok_or_else(|| GraphError::VariableNotFound(name.to_string()))?;
        variable.value = value;
        Ok(())
    }

    /// Remove a variable
    pub fn remove_variable(&mut self, scope: VariableScope, name: &str) -> Option<Variable> {
        self.scope_mut(scope).shift_remove(name)
    }

    /// Get a variable
    pub fn variable(&self, scope: VariableScope, name: &str) -> Option<&Variable> {
        self.scope(scope).get(name)
    }

    /// Variables of a scope in insertion order
    pub fn variables(&self, scope: VariableScope) -> impl Iterator<Item = &Variable> {
        self.scope(scope).values()
    }

    // ------------------------------------------------------------------
    // Subgraphs
    // ------------------------------------------------------------------

    /// Create an owned child graph
    pub fn add_subgraph(&mut self, name: impl Into<String>) -> Result<&mut Graph, GraphError> {
        let name = name.into();
        if self.subgraphs.contains_key(&name) {
            return Err(GraphError::DuplicateSubgraph(name));
        }
        let child = Graph::named(name.clone(), Arc::clone(&self.registry));
        Ok(self.subgraphs.entry(name).or_insert(child))
    }

    /// Get a child graph
    pub fn subgraph(&self, name: &str) -> Option<&Graph> {
        self.subgraphs.get(name)
    }

    /// Get a mutable child graph
    pub fn subgraph_mut(&mut self, name: &str) -> Option<&mut Graph> {
        self.subgraphs.get_mut(name)
    }

    /// Remove a child graph
    pub fn remove_subgraph(&mut self, name: &str) -> Option<Graph> {
        self.subgraphs.shift_remove(name)
    }

    /// Child graphs in insertion order
    pub fn subgraphs(&self) -> impl Iterator<Item = &Graph> {
        self.subgraphs.values()
    }

    // ------------------------------------------------------------------
    // Lifecycle and serialization
    // ------------------------------------------------------------------

    /// Remove everything, running each node's removal hook
    pub fn clear(&mut self) {
        let node_ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        for id in node_ids {
            let hooks = self.hooks_for(id);
            if let (Some(hooks), Some(node)) = (hooks, self.nodes.get_mut(&id)) {
                hooks.on_removed(node);
            }
        }
        self.nodes.clear();
        self.connectors.clear();
        self.local_vars.clear();
        self.inputs.clear();
        self.outputs.clear();
        self.subgraphs.clear();
        self.next_unique_id = 1;
    }

    /// Serialize the whole graph
    pub fn serialize(&self) -> SerializedGraph {
        let nodes = {
            let registry = self.registry.read();
            self.nodes.values().map(|n| registry.serialize_node(n)).collect()
        };
        SerializedGraph {
            nodes,
            connectors: self.connectors.values().map(Connector::to_serialized).collect(),
            local_vars: self.local_vars.values().map(SerializedVariable::from).collect(),
            inputs: self.inputs.values().map(SerializedVariable::from).collect(),
            outputs: self.outputs.values().map(SerializedVariable::from).collect(),
            subgraphs: self
                .subgraphs
                .values()
                .map(|g| SerializedSubgraph {
                    name: g.name.clone(),
                    graph: g.serialize(),
                })
                .collect(),
        }
    }

    /// Replace the content with serialized data. Nodes come first, then
    /// connectors, variables and subgraphs. Unknown node types and dangling
    /// connectors are skipped with a warning.
    pub fn configure(&mut self, data: &SerializedGraph) -> Result<(), GraphError> {
        self.clear();

        for entry in &data.nodes {
            let created = {
                let registry = self.registry.read();
                registry.create(&entry.node_type).map(|mut node| {
                    registry.configure_node(&mut node, entry);
                    node
                })
            };
            let Some(mut node) = created else {
                tracing::warn!("Skipping node of unknown type {}", entry.node_type);
                continue;
            };
            let result = match entry.id {
                Some(id) => {
                    node.id = Some(NodeId(id));
                    self.restore_node(node)
                }
                None => self.add_node(node),
            };
            if let Err(err) = result {
                tracing::warn!("Skipping node {:?}: {err}", entry.id);
            }
        }

        for entry in &data.connectors {
            if let Err(err) = self.restore_connector(Connector::from_serialized(entry)) {
                tracing::warn!("Skipping connector {}: {err}", entry.0);
            }
        }

        for entry in &data.nodes {
            let Some(node) = entry.id.and_then(|id| self.nodes.get(&NodeId(id))) else {
                continue;
            };
            for slot in node.slots() {
                if let Some(stored) = entry.connections.count_for(node, &slot.name) {
                    if stored != slot.connections {
                        tracing::warn!(
                            "Node {} slot {} stored {stored} connections, rebuilt {}",
                            node.id.map_or(0, |id| id.0),
                            slot.name,
                            slot.connections
                        );
                    }
                }
            }
        }

        let scopes = [
            (VariableScope::Input, &data.inputs),
            (VariableScope::Output, &data.outputs),
            (VariableScope::Local, &data.local_vars),
        ];
        for (scope, variables) in scopes {
            for entry in variables {
                if let Err(err) = self.add_variable(scope, Variable::from(entry)) {
                    tracing::warn!("Skipping variable {}: {err}", entry.0);
                }
            }
        }

        for entry in &data.subgraphs {
            match self.add_subgraph(entry.name.clone()) {
                Ok(child) => child.configure(&entry.graph)?,
                Err(err) => tracing::warn!("Skipping subgraph: {err}"),
            }
        }
        Ok(())
    }

    /// Serialize to a JSON string
    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string(&self.serialize())?)
    }

    /// Configure from a JSON string
    pub fn configure_from_json(&mut self, json: &str) -> Result<(), GraphError> {
        let data: SerializedGraph = serde_json::from_str(json)?;
        self.configure(&data)
    }
}
