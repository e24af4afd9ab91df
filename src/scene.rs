use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::runtime::Runtime;
use crate::value::{AttrValue, Color, ResolvedStyle};

/// Identity of a node in the scene arena. Ids are arena indices, allocated
/// monotonically and never reused: detached nodes stay in the arena, they are
/// just unreachable from the document root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Box,
    Text,
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) kind: NodeKind,
    pub(crate) text: String,
    pub(crate) attrs: HashMap<String, AttrValue>,
}

#[derive(Debug, Clone)]
pub(crate) struct SceneGraph {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
}

impl SceneGraph {
    pub(crate) fn new() -> Self {
        let mut graph = Self {
            nodes: Vec::new(),
            root: NodeId(0),
        };
        let root = graph.create_node(NodeKind::Box);
        graph.root = root;
        // The document root carries the light-gray canvas background.
        graph.nodes[root.0]
            .attrs
            .insert("backgroundColor".to_string(), AttrValue::from("#F0F0F0"));
        graph
    }

    pub(crate) fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
            text: String::new(),
            attrs: HashMap::new(),
        });
        id
    }

    pub(crate) fn create_text_node(&mut self, text: &str) -> NodeId {
        let id = self.create_node(NodeKind::Text);
        self.nodes[id.0].text = text.to_string();
        id
    }

    pub(crate) fn ensure_node(&self, node: NodeId) -> Result<()> {
        if node.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(Error::UnknownNode(node))
        }
    }

    pub(crate) fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|node| node.parent)
    }

    pub(crate) fn children(&self, node: NodeId) -> &[NodeId] {
        self.nodes
            .get(node.0)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    pub(crate) fn is_attached(&self, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == self.root {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    /// All checks run before any mutation so a failed append leaves the tree
    /// untouched. Appending a node that already has a parent detaches it
    /// first; no dual-parent state is ever observable.
    pub(crate) fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.ensure_node(parent)?;
        self.ensure_node(child)?;
        if child == self.root {
            return Err(Error::Cycle { parent, child });
        }
        self.ensure_no_cycle(parent, child)?;
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
        Ok(())
    }

    pub(crate) fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<()> {
        self.ensure_node(parent)?;
        self.ensure_node(child)?;
        self.ensure_node(reference)?;
        if child == self.root {
            return Err(Error::Cycle { parent, child });
        }
        if self.parent(reference) != Some(parent) {
            return Err(Error::NotAChild {
                parent,
                child: reference,
            });
        }
        if child == reference {
            return Ok(());
        }
        self.ensure_no_cycle(parent, child)?;
        self.detach(child);
        let Some(index) = self.nodes[parent.0]
            .children
            .iter()
            .position(|id| *id == reference)
        else {
            return Err(Error::NotAChild {
                parent,
                child: reference,
            });
        };
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.insert(index, child);
        Ok(())
    }

    /// Detaches `child` from `parent`. Descendants are kept as an orphaned
    /// subtree; nothing is destroyed.
    pub(crate) fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.ensure_node(parent)?;
        self.ensure_node(child)?;
        if self.parent(child) != Some(parent) {
            return Err(Error::NotAChild { parent, child });
        }
        self.nodes[parent.0].children.retain(|id| *id != child);
        self.nodes[child.0].parent = None;
        Ok(())
    }

    pub(crate) fn set_attr(&mut self, node: NodeId, name: &str, value: AttrValue) -> Result<()> {
        self.ensure_node(node)?;
        self.nodes[node.0].attrs.insert(name.to_string(), value);
        Ok(())
    }

    pub(crate) fn attr(&self, node: NodeId, name: &str) -> Option<&AttrValue> {
        self.nodes.get(node.0).and_then(|node| node.attrs.get(name))
    }

    pub(crate) fn set_text(&mut self, node: NodeId, text: &str) -> Result<()> {
        self.ensure_node(node)?;
        if self.nodes[node.0].kind != NodeKind::Text {
            return Err(Error::TypeMismatch {
                node,
                expected: "text node".to_string(),
                actual: "box node".to_string(),
            });
        }
        self.nodes[node.0].text = text.to_string();
        Ok(())
    }

    pub(crate) fn style(&self, node: NodeId) -> ResolvedStyle {
        let node = &self.nodes[node.0];
        ResolvedStyle::resolve(node.kind, &node.attrs)
    }

    // Cycle check: child must not be an ancestor of parent (parent == child
    // included, since the walk starts at parent).
    fn ensure_no_cycle(&self, parent: NodeId, child: NodeId) -> Result<()> {
        let mut cursor = Some(parent);
        while let Some(node) = cursor {
            if node == child {
                return Err(Error::Cycle { parent, child });
            }
            cursor = self.parent(node);
        }
        Ok(())
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(old_parent) = self.parent(child) {
            self.nodes[old_parent.0].children.retain(|id| *id != child);
            self.nodes[child.0].parent = None;
        }
    }
}

impl Runtime {
    /// The distinguished document root. Always present, never destroyed,
    /// never a child of anything.
    pub fn root(&self) -> NodeId {
        self.scene.root
    }

    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let id = self.scene.create_node(kind);
        self.mark_layout_dirty();
        id
    }

    pub fn create_text_node(&mut self, text: &str) -> NodeId {
        let id = self.scene.create_text_node(text);
        self.mark_layout_dirty();
        id
    }

    /// Appends `child` as the last child of `parent`. A child that already
    /// has a parent is silently detached from it first. Fails with
    /// [`Error::Cycle`] when `child` is `parent` or one of its ancestors, and
    /// leaves the tree unchanged in that case.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.scene.append_child(parent, child)?;
        self.mark_layout_dirty();
        Ok(())
    }

    /// Inserts `child` directly before `reference` in `parent`'s child list,
    /// with the same detach/cycle rules as [`Runtime::append_child`].
    pub fn insert_before(
        &mut self,
        parent: NodeId,
        child: NodeId,
        reference: NodeId,
    ) -> Result<()> {
        self.scene.insert_before(parent, child, reference)?;
        self.mark_layout_dirty();
        Ok(())
    }

    /// Detaches `child` from `parent`. The detached subtree stays alive and
    /// can be re-appended later; it simply stops being reachable from the
    /// root (and therefore stops participating in layout).
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.scene.remove_child(parent, child)?;
        self.mark_layout_dirty();
        Ok(())
    }

    /// Overwrites the attribute unconditionally. Unrecognized names are
    /// stored opaquely; layout only reads the names it knows.
    pub fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: impl Into<AttrValue>,
    ) -> Result<()> {
        self.scene.set_attr(node, name, value.into())?;
        self.mark_layout_dirty();
        Ok(())
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&AttrValue> {
        self.scene.attr(node, name)
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) -> Result<()> {
        self.scene.set_text(node, text)?;
        self.mark_layout_dirty();
        Ok(())
    }

    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.scene.nodes.get(node.0).map(|node| node.text.as_str())
    }

    pub fn node_kind(&self, node: NodeId) -> Option<NodeKind> {
        self.scene.nodes.get(node.0).map(|node| node.kind)
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.scene.parent(node)
    }

    /// Total number of nodes ever created in this runtime, root included.
    pub fn node_count(&self) -> usize {
        self.scene.nodes.len()
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.scene.children(node).to_vec()
    }

    /// True when the node is reachable from the document root, i.e. it will
    /// be considered by the next layout pass.
    pub fn is_attached(&self, node: NodeId) -> bool {
        self.scene.ensure_node(node).is_ok() && self.scene.is_attached(node)
    }

    pub fn background_color(&self, node: NodeId) -> Option<Color> {
        self.scene.ensure_node(node).ok()?;
        Some(self.scene.style(node).background)
    }
}
