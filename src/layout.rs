use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::events::Event;
use crate::runtime::Runtime;
use crate::scene::{NodeId, NodeKind, SceneGraph};
use crate::value::{FlexDirection, JustifyContent, SizeValue};

/// Absolute geometry of a node, root at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.x + self.width && y >= self.y && y <= self.y + self.height
    }
}

#[derive(Debug)]
pub(crate) struct LayoutState {
    pub(crate) geometry: HashMap<NodeId, Rect>,
    pub(crate) dirty: bool,
    pub(crate) viewport_width: f64,
    pub(crate) viewport_height: f64,
}

impl Default for LayoutState {
    fn default() -> Self {
        Self {
            geometry: HashMap::new(),
            dirty: true,
            viewport_width: 1000.0,
            viewport_height: 600.0,
        }
    }
}

impl Runtime {
    pub(crate) fn mark_layout_dirty(&mut self) {
        self.layout.dirty = true;
    }

    pub fn viewport(&self) -> (f64, f64) {
        (self.layout.viewport_width, self.layout.viewport_height)
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) -> Result<()> {
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "set_viewport requires positive finite dimensions, got {width}x{height}"
            )));
        }
        self.layout.viewport_width = width;
        self.layout.viewport_height = height;
        self.mark_layout_dirty();
        Ok(())
    }

    /// Recomputes geometry for every node reachable from the document root.
    /// Pure in the tree state: the same tree always yields the same geometry,
    /// and a clean tree is a no-op, so repeated calls never drift.
    pub fn update_layout(&mut self) {
        if !self.layout.dirty {
            self.trace_layout_line("[layout] update skipped (clean)".into());
            return;
        }
        self.force_layout();
    }

    /// Recomputes even when the tree is clean.
    pub fn force_layout(&mut self) {
        let geometry = compute_layout(
            &self.scene,
            self.layout.viewport_width,
            self.layout.viewport_height,
        );
        self.trace_layout_line(format!(
            "[layout] update nodes={} viewport={}x{}",
            geometry.len(),
            self.layout.viewport_width,
            self.layout.viewport_height
        ));
        self.layout.geometry = geometry;
        self.layout.dirty = false;
    }

    /// Geometry from the last layout pass. `None` for nodes that were not
    /// reachable from the root when it ran.
    pub fn layout_of(&self, node: NodeId) -> Option<Rect> {
        self.layout.geometry.get(&node).copied()
    }

    /// Deepest box node containing the point, per the last layout pass. Text
    /// nodes are transparent to hits.
    pub fn node_at(&self, x: f64, y: f64) -> Option<NodeId> {
        self.hit_test(self.scene.root, x, y)
    }

    /// Hit-tests the point and dispatches a `"click"` to the node found.
    pub fn click_at(&mut self, x: f64, y: f64) -> Result<Option<Event>> {
        let Some(target) = self.node_at(x, y) else {
            return Ok(None);
        };
        self.dispatch_event(target, "click").map(Some)
    }

    fn hit_test(&self, node: NodeId, x: f64, y: f64) -> Option<NodeId> {
        if self.scene.nodes[node.0].kind == NodeKind::Text {
            return None;
        }
        let rect = self.layout.geometry.get(&node)?;
        if !rect.contains(x, y) {
            return None;
        }
        for child in self.scene.children(node) {
            if let Some(found) = self.hit_test(*child, x, y) {
                return Some(found);
            }
        }
        Some(node)
    }
}

pub(crate) fn compute_layout(
    scene: &SceneGraph,
    viewport_width: f64,
    viewport_height: f64,
) -> HashMap<NodeId, Rect> {
    let mut geometry = HashMap::new();
    let root_rect = Rect {
        x: 0.0,
        y: 0.0,
        width: viewport_width,
        height: viewport_height,
    };
    layout_subtree(scene, scene.root, root_rect, &mut geometry);
    geometry
}

struct ChildSlot {
    margin: f64,
    // Main-axis content size; `None` means the child flexes.
    fixed_main: Option<f64>,
    flex: f64,
    fixed_cross: Option<f64>,
    content_main: f64,
}

fn layout_subtree(
    scene: &SceneGraph,
    node: NodeId,
    rect: Rect,
    geometry: &mut HashMap<NodeId, Rect>,
) {
    geometry.insert(node, rect);
    let children = scene.children(node);
    if children.is_empty() {
        return;
    }

    let style = scene.style(node);
    let (main, cross) = match style.direction {
        FlexDirection::Row => (rect.width, rect.height),
        FlexDirection::Column => (rect.height, rect.width),
    };

    let mut slots = Vec::with_capacity(children.len());
    for child in children {
        let child_style = scene.style(*child);
        let (main_size, cross_size) = match style.direction {
            FlexDirection::Row => (child_style.width, child_style.height),
            FlexDirection::Column => (child_style.height, child_style.width),
        };
        slots.push(ChildSlot {
            margin: child_style.margin,
            fixed_main: resolve_size(main_size, main),
            flex: child_style.flex,
            fixed_cross: resolve_size(cross_size, cross),
            content_main: 0.0,
        });
    }

    // Fixed children keep their size; flexible ones share the remaining main
    // axis in proportion to their flex weight. Margins sit outside content.
    let reserved: f64 = slots
        .iter()
        .map(|slot| slot.fixed_main.unwrap_or(0.0) + 2.0 * slot.margin)
        .sum();
    let free = (main - reserved).max(0.0);
    let total_flex: f64 = slots
        .iter()
        .filter(|slot| slot.fixed_main.is_none())
        .map(|slot| slot.flex)
        .sum();

    for slot in &mut slots {
        slot.content_main = match slot.fixed_main {
            Some(fixed) => fixed,
            None if total_flex > 0.0 => free * slot.flex / total_flex,
            None => 0.0,
        };
    }

    let used: f64 = slots
        .iter()
        .map(|slot| slot.content_main + 2.0 * slot.margin)
        .sum();
    let leftover = (main - used).max(0.0);
    let count = slots.len() as f64;
    let (lead, gap) = match style.justify {
        JustifyContent::FlexStart => (0.0, 0.0),
        JustifyContent::Center => (leftover / 2.0, 0.0),
        JustifyContent::FlexEnd => (leftover, 0.0),
        JustifyContent::SpaceBetween if slots.len() > 1 => (0.0, leftover / (count - 1.0)),
        JustifyContent::SpaceBetween => (0.0, 0.0),
        JustifyContent::SpaceAround => (leftover / count / 2.0, leftover / count),
    };

    let mut cursor = lead;
    for (child, slot) in children.iter().zip(&slots) {
        let content_cross = slot
            .fixed_cross
            .unwrap_or_else(|| (cross - 2.0 * slot.margin).max(0.0));
        let child_rect = match style.direction {
            FlexDirection::Row => Rect {
                x: rect.x + cursor + slot.margin,
                y: rect.y + slot.margin,
                width: slot.content_main,
                height: content_cross,
            },
            FlexDirection::Column => Rect {
                x: rect.x + slot.margin,
                y: rect.y + cursor + slot.margin,
                width: content_cross,
                height: slot.content_main,
            },
        };
        layout_subtree(scene, *child, child_rect, geometry);
        cursor += slot.content_main + 2.0 * slot.margin + gap;
    }
}

fn resolve_size(size: SizeValue, basis: f64) -> Option<f64> {
    match size {
        SizeValue::Px(value) => Some(value.max(0.0)),
        SizeValue::Percent(percent) => Some((basis * percent / 100.0).max(0.0)),
        SizeValue::Auto => None,
    }
}
