// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node type descriptors and the registry that instantiates them.

use crate::connector::Connector;
use crate::error::RegistryError;
use crate::geometry::Size;
use crate::node::{Node, NodeKind};
use crate::serialized::SerializedNode;
use crate::slot::{NodeSlot, SlotCategory, SlotDecl, SlotDirection, EXEC_TYPE};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Registry shared between graphs, subgraphs and scenes
pub type SharedRegistry = Arc<RwLock<TypeRegistry>>;

static DEFAULT_REGISTRY: Lazy<SharedRegistry> =
    Lazy::new(|| crate::library::create_builtin_registry().into_shared());

/// Process-wide registry preloaded with the built-in library.
///
/// Prefer constructing a registry explicitly; this one exists for hosts that
/// only need the built-in types.
pub fn default_registry() -> SharedRegistry {
    Arc::clone(&DEFAULT_REGISTRY)
}

/// Lifecycle hooks a node type may provide. Every method defaults to a no-op.
pub trait NodeHooks: Send + Sync {
    /// After the registry built a fresh node
    fn on_created(&self, _node: &mut Node) {}
    /// After the node received its id in a graph
    fn on_added(&self, _node: &mut Node) {}
    /// Before the node leaves its graph
    fn on_removed(&self, _node: &mut Node) {}
    /// After the node joined the selection
    fn on_selected(&self, _node: &mut Node) {}
    /// After the node left the selection
    fn on_deselected(&self, _node: &mut Node) {}
    /// After a connector was attached to `slot`
    fn on_connection_added(&self, _node: &mut Node, _slot: &str, _connector: &Connector) {}
    /// After a connector was detached from `slot`
    fn on_connection_broken(&self, _node: &mut Node, _slot: &str, _connector: &Connector) {}
    /// Extend the serialized form
    fn serialize(&self, _node: &Node, _data: &mut SerializedNode) {}
    /// Read back what [`NodeHooks::serialize`] wrote
    fn configure(&self, _node: &mut Node, _data: &SerializedNode) {}
}

/// Per-type rendering overrides, merged into the style sheet by the editor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Appearance {
    /// Draw the title bar
    pub title_bar: bool,
    /// Large text drawn in the body, e.g. an operator symbol
    pub central_text: Option<String>,
    /// Body fill override (RGBA)
    pub body_color: Option<[u8; 4]>,
    /// Title bar fill override (RGBA)
    pub title_bar_color: Option<[u8; 4]>,
    /// Border override (RGBA)
    pub border_color: Option<[u8; 4]>,
}

impl Default for Appearance {
    fn default() -> Self {
        Self {
            title_bar: true,
            central_text: None,
            body_color: None,
            title_bar_color: None,
            border_color: None,
        }
    }
}

/// Blueprint for a node type
#[derive(Clone)]
pub struct TypeDescriptor {
    /// Dotted type path, e.g. `Image.Read`
    pub type_name: String,
    /// Display title
    pub title: String,
    /// Regular or comment
    pub kind: NodeKind,
    /// Input slots
    pub inputs: Vec<SlotDecl>,
    /// Output slots
    pub outputs: Vec<SlotDecl>,
    /// Initial size of resizable types
    pub default_size: Option<Size>,
    /// Rendering overrides
    pub appearance: Appearance,
    /// Initial per-node properties
    pub properties: Map<String, Value>,
    /// Optional lifecycle hooks
    pub hooks: Option<Arc<dyn NodeHooks>>,
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("type_name", &self.type_name)
            .field("title", &self.title)
            .field("kind", &self.kind)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("default_size", &self.default_size)
            .field("appearance", &self.appearance)
            .field("hooks", &self.hooks.is_some())
            .finish_non_exhaustive()
    }
}

impl TypeDescriptor {
    /// Create a descriptor with no slots
    pub fn new(type_name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            title: title.into(),
            kind: NodeKind::Regular,
            inputs: Vec::new(),
            outputs: Vec::new(),
            default_size: None,
            appearance: Appearance::default(),
            properties: Map::new(),
            hooks: None,
        }
    }

    /// Add an input slot
    pub fn with_input(mut self, slot: SlotDecl) -> Self {
        self.inputs.push(slot);
        self
    }

    /// Add an output slot
    pub fn with_output(mut self, slot: SlotDecl) -> Self {
        self.outputs.push(slot);
        self
    }

    /// Make this a resizable comment type
    pub fn comment(mut self, default_size: Size) -> Self {
        self.kind = NodeKind::Comment;
        self.default_size = Some(default_size);
        self
    }

    /// Set the rendering overrides
    pub fn with_appearance(mut self, appearance: Appearance) -> Self {
        self.appearance = appearance;
        self
    }

    /// Set an initial property
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Attach lifecycle hooks
    pub fn with_hooks(mut self, hooks: Arc<dyn NodeHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    fn validate(&self) -> Result<(), RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidDescriptor {
            type_name: self.type_name.clone(),
            reason: reason.to_string(),
        };

        if self.type_name.is_empty() || self.type_name.split('.').any(str::is_empty) {
            return Err(invalid("type name must be a non-empty dotted path"));
        }
        if self.inputs.is_empty()
            && self.outputs.is_empty()
            && self.hooks.is_none()
            && self.kind == NodeKind::Regular
        {
            return Err(invalid("declares neither slots nor hooks"));
        }

        let mut names = HashSet::new();
        for slot in self.inputs.iter().chain(self.outputs.iter()) {
            if !names.insert(slot.name.as_str()) {
                return Err(invalid(&format!("duplicate slot name '{}'", slot.name)));
            }
            if slot.category == SlotCategory::Exec && slot.data_type != EXEC_TYPE {
                return Err(invalid(&format!("exec slot '{}' has a data type", slot.name)));
            }
        }
        Ok(())
    }

    fn instantiate(&self) -> Node {
        let mut node = Node::new(self.type_name.clone(), self.title.clone());
        node.kind = self.kind;
        node.size = self.default_size;
        node.properties = self.properties.clone();
        for decl in &self.inputs {
            node.inputs
                .insert(decl.name.clone(), NodeSlot::from_decl(decl, SlotDirection::In));
        }
        for decl in &self.outputs {
            node.outputs
                .insert(decl.name.clone(), NodeSlot::from_decl(decl, SlotDirection::Out));
        }
        node
    }
}

/// Nested category tree built from dotted type names
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategoryTree {
    /// Full type name when this entry is a registered type
    pub type_name: Option<String>,
    /// Child segments in registration order
    pub children: IndexMap<String, CategoryTree>,
}

impl CategoryTree {
    fn insert(&mut self, type_name: &str) {
        let mut entry = self;
        for segment in type_name.split('.') {
            entry = entry.children.entry(segment.to_string()).or_default();
        }
        entry.type_name = Some(type_name.to_string());
    }

    /// Look up a dotted path
    pub fn get(&self, path: &str) -> Option<&CategoryTree> {
        path.split('.')
            .try_fold(self, |entry, segment| entry.children.get(segment))
    }

    /// Number of registered types below this entry, itself included
    pub fn type_count(&self) -> usize {
        usize::from(self.type_name.is_some())
            + self.children.values().map(CategoryTree::type_count).sum::<usize>()
    }
}

/// Registry of node types
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: IndexMap<String, TypeDescriptor>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap into a [`SharedRegistry`]
    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    /// Register a type; an existing type of the same name is overwritten
    pub fn register(&mut self, descriptor: TypeDescriptor) -> Result<(), RegistryError> {
        if let Err(err) = descriptor.validate() {
            tracing::warn!("{err}");
            return Err(err);
        }
        if self.types.contains_key(&descriptor.type_name) {
            tracing::warn!("Overwriting node type {}", descriptor.type_name);
        }
        self.types.insert(descriptor.type_name.clone(), descriptor);
        Ok(())
    }

    /// Remove a type
    pub fn unregister(&mut self, type_name: &str) -> Option<TypeDescriptor> {
        self.types.shift_remove(type_name)
    }

    /// Remove every type
    pub fn clear(&mut self) {
        self.types.clear();
    }

    /// Get a descriptor
    pub fn get(&self, type_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(type_name)
    }

    /// Whether the type is registered
    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no type is registered
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All descriptors in registration order
    pub fn types(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    /// Hooks of a type
    pub fn hooks(&self, type_name: &str) -> Option<Arc<dyn NodeHooks>> {
        self.types.get(type_name).and_then(|d| d.hooks.clone())
    }

    /// Build a detached node of the given type
    pub fn create(&self, type_name: &str) -> Option<Node> {
        let Some(descriptor) = self.types.get(type_name) else {
            tracing::warn!("Node type {type_name} is not registered");
            return None;
        };
        let mut node = descriptor.instantiate();
        if let Some(hooks) = &descriptor.hooks {
            hooks.on_created(&mut node);
        }
        Some(node)
    }

    /// Serialize a node, letting its type extend the result
    pub fn serialize_node(&self, node: &Node) -> SerializedNode {
        let mut data = node.to_serialized();
        if let Some(hooks) = self.hooks(&node.node_type) {
            hooks.serialize(node, &mut data);
        }
        data
    }

    /// Apply serialized fields to a node, letting its type read extensions
    pub fn configure_node(&self, node: &mut Node, data: &SerializedNode) {
        node.apply_serialized(data);
        if let Some(hooks) = self.hooks(&node.node_type) {
            hooks.configure(node, data);
        }
    }

    /// Copy a node into a fresh detached node without id or connections
    pub fn clone_node(&self, node: &Node) -> Option<Node> {
        let data = self.serialize_node(node);
        let mut copy = self.create(&node.node_type)?;
        self.configure_node(&mut copy, &data);
        copy.id = None;
        copy.strip_connections();
        Some(copy)
    }

    /// Type names containing `needle`, ignoring case
    pub fn list_by_name_substring(&self, needle: &str) -> Vec<&str> {
        let needle = needle.to_lowercase();
        self.types
            .keys()
            .filter(|name| name.to_lowercase().contains(&needle))
            .map(String::as_str)
            .collect()
    }

    /// Category tree of every registered type
    pub fn category_tree(&self) -> CategoryTree {
        let mut tree = CategoryTree::default();
        for name in self.types.keys() {
            tree.insert(name);
        }
        tree
    }

    /// Category tree restricted to types with at least one slot that could
    /// connect to `slot`. Used by search menus opened from a dragged slot.
    pub fn category_tree_filtered(&self, slot: &NodeSlot) -> CategoryTree {
        let mut tree = CategoryTree::default();
        for descriptor in self.types.values() {
            let candidate = descriptor.instantiate();
            if candidate
                .slots()
                .any(|other| slot.check_connection(other).is_allowed())
            {
                tree.insert(&descriptor.type_name);
            }
        }
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    fn add_type() -> TypeDescriptor {
        TypeDescriptor::new("Math.Add", "Add")
            .with_input(SlotDecl::data("a", "number"))
            .with_input(SlotDecl::data("b", "number"))
            .with_output(SlotDecl::data("sum", "number"))
    }

    #[test]
    fn test_register_and_create() {
        let mut registry = TypeRegistry::new();
        registry.register(add_type()).unwrap();

        let node = registry.create("Math.Add").unwrap();
        assert!(node.id.is_none());
        assert_eq!(node.inputs.len(), 2);
        assert_eq!(node.outputs.len(), 1);
        assert!(registry.create("Math.Missing").is_none());
    }

    #[test]
    fn test_invalid_descriptors_are_rejected() {
        let mut registry = TypeRegistry::new();
        assert!(registry.register(TypeDescriptor::new("Empty", "Empty")).is_err());
        assert!(registry
            .register(TypeDescriptor::new("Bad..Name", "x").with_input(SlotDecl::exec("in")))
            .is_err());
        let duplicate = TypeDescriptor::new("Dup", "Dup")
            .with_input(SlotDecl::data("x", "number"))
            .with_output(SlotDecl::data("x", "number"));
        assert!(registry.register(duplicate).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reregistration_overwrites() {
        let mut registry = TypeRegistry::new();
        registry.register(add_type()).unwrap();
        registry
            .register(TypeDescriptor::new("Math.Add", "Plus").with_input(SlotDecl::exec("in")))
            .unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("Math.Add").unwrap().title, "Plus");
    }

    #[test]
    fn test_clone_strips_identity() {
        let mut registry = TypeRegistry::new();
        registry.register(add_type()).unwrap();

        let mut node = registry.create("Math.Add").unwrap().with_position(3.0, 4.0);
        node.id = Some(crate::node::NodeId(5));
        node.properties.insert("label".into(), Value::from("x"));
        if let Some(slot) = node.slot_mut("sum") {
            slot.add_connection();
        }

        let copy = registry.clone_node(&node).unwrap();
        assert!(copy.id.is_none());
        assert_eq!(copy.position, node.position);
        assert_eq!(copy.properties["label"], "x");
        assert!(copy.slots().all(|s| s.connections == 0));
    }

    #[test]
    fn test_category_tree_and_search() {
        let mut registry = TypeRegistry::new();
        registry.register(add_type()).unwrap();
        registry
            .register(TypeDescriptor::new("Math.Trig.Sin", "Sin").with_input(SlotDecl::data("x", "number")))
            .unwrap();
        registry
            .register(TypeDescriptor::new("Image.Show", "Show").with_input(SlotDecl::exec("in_exec")))
            .unwrap();

        let tree = registry.category_tree();
        assert_eq!(tree.type_count(), 3);
        assert_eq!(
            tree.get("Math.Trig.Sin").and_then(|t| t.type_name.as_deref()),
            Some("Math.Trig.Sin")
        );
        assert!(tree.get("Math").unwrap().type_name.is_none());

        assert_eq!(registry.list_by_name_substring("math"), vec!["Math.Add", "Math.Trig.Sin"]);
    }

    #[test]
    fn test_filtered_category_tree() {
        let mut registry = TypeRegistry::new();
        registry.register(add_type()).unwrap();
        registry
            .register(TypeDescriptor::new("Image.Show", "Show").with_input(SlotDecl::exec("in_exec")))
            .unwrap();

        let dragged = NodeSlot::from_decl(&SlotDecl::data("value", "number"), SlotDirection::Out);
        let tree = registry.category_tree_filtered(&dragged);
        assert!(tree.get("Math.Add").is_some());
        assert!(tree.get("Image").is_none());
    }

    struct CountingHooks(Mutex<Vec<&'static str>>);

    impl NodeHooks for CountingHooks {
        fn on_created(&self, node: &mut Node) {
            self.0.lock().push("created");
            node.properties.insert("created".into(), Value::Bool(true));
        }

        fn serialize(&self, _node: &Node, data: &mut SerializedNode) {
            data.properties.insert("extra".into(), Value::from(1));
        }
    }

    #[test]
    fn test_hooks_run_on_create_and_serialize() {
        let hooks = Arc::new(CountingHooks(Mutex::new(Vec::new())));
        let mut registry = TypeRegistry::new();
        registry
            .register(TypeDescriptor::new("Custom.Hooked", "Hooked").with_hooks(hooks.clone()))
            .unwrap();

        let node = registry.create("Custom.Hooked").unwrap();
        assert_eq!(node.properties["created"], true);
        let data = registry.serialize_node(&node);
        assert_eq!(data.properties["extra"], 1);
        assert_eq!(*hooks.0.lock(), vec!["created"]);
    }
}
