use std::collections::HashMap;

use crate::scene::NodeKind;

/// Attribute value stored on a scene node. Unknown attribute names keep
/// whatever value the caller supplied; layout only interprets the names it
/// recognizes.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Number(f64),
    Token(String),
    Size(SizeValue),
}

impl AttrValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            Self::Token(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_size(&self) -> Option<SizeValue> {
        match self {
            Self::Size(value) => Some(*value),
            // Bare numbers are accepted wherever a size is expected.
            Self::Number(value) => Some(SizeValue::Px(*value)),
            Self::Token(_) => None,
        }
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Token(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Token(value)
    }
}

impl From<SizeValue> for AttrValue {
    fn from(value: SizeValue) -> Self {
        Self::Size(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizeValue {
    Px(f64),
    Percent(f64),
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Self = Self::new(255, 255, 255, 0);
    pub const WHITE: Self = Self::new(255, 255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Parses `#RRGGBB` and `#RGB` tokens; anything else yields black, the
    /// same fallback the renderer side has always assumed.
    pub fn parse(token: &str) -> Self {
        let Some(hex) = token.strip_prefix('#') else {
            return Self::BLACK;
        };
        let Ok(rgb) = u32::from_str_radix(hex, 16) else {
            return Self::BLACK;
        };
        match hex.len() {
            6 => Self::new(
                ((rgb >> 16) & 0xFF) as u8,
                ((rgb >> 8) & 0xFF) as u8,
                (rgb & 0xFF) as u8,
                255,
            ),
            3 => Self::new(
                (((rgb >> 8) & 0xF) * 17) as u8,
                (((rgb >> 4) & 0xF) * 17) as u8,
                ((rgb & 0xF) * 17) as u8,
                255,
            ),
            _ => Self::BLACK,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlexDirection {
    #[default]
    Row,
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JustifyContent {
    #[default]
    FlexStart,
    Center,
    FlexEnd,
    SpaceBetween,
    SpaceAround,
}

/// Style snapshot a node presents to the layout pass and to a host renderer.
/// Derived deterministically from the attribute map on every resolve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ResolvedStyle {
    pub(crate) flex: f64,
    pub(crate) margin: f64,
    pub(crate) direction: FlexDirection,
    pub(crate) justify: JustifyContent,
    pub(crate) width: SizeValue,
    pub(crate) height: SizeValue,
    pub(crate) background: Color,
    pub(crate) border: Color,
}

impl ResolvedStyle {
    fn defaults_for(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Box => Self {
                flex: 1.0,
                margin: 0.0,
                direction: FlexDirection::Row,
                justify: JustifyContent::FlexStart,
                width: SizeValue::Auto,
                height: SizeValue::Auto,
                background: Color::WHITE,
                border: Color::BLACK,
            },
            NodeKind::Text => Self {
                flex: 1.0,
                margin: 0.0,
                direction: FlexDirection::Row,
                justify: JustifyContent::FlexStart,
                width: SizeValue::Auto,
                height: SizeValue::Auto,
                background: Color::TRANSPARENT,
                border: Color::WHITE,
            },
        }
    }

    pub(crate) fn resolve(kind: NodeKind, attrs: &HashMap<String, AttrValue>) -> Self {
        let mut style = Self::defaults_for(kind);
        if let Some(flex) = attrs.get("flex").and_then(AttrValue::as_number) {
            style.flex = flex.max(0.0);
        }
        if let Some(margin) = attrs.get("margin").and_then(AttrValue::as_number) {
            style.margin = margin.max(0.0);
        }
        if let Some(direction) = attrs.get("flexDirection").and_then(AttrValue::as_token) {
            match direction {
                "row" => style.direction = FlexDirection::Row,
                "column" => style.direction = FlexDirection::Column,
                _ => {}
            }
        }
        if let Some(justify) = attrs.get("justifyContent").and_then(AttrValue::as_token) {
            match justify {
                "flex-start" => style.justify = JustifyContent::FlexStart,
                "center" => style.justify = JustifyContent::Center,
                "flex-end" => style.justify = JustifyContent::FlexEnd,
                "space-between" => style.justify = JustifyContent::SpaceBetween,
                "space-around" => style.justify = JustifyContent::SpaceAround,
                _ => {}
            }
        }
        if let Some(width) = attrs.get("width").and_then(AttrValue::as_size) {
            style.width = width;
        }
        if let Some(height) = attrs.get("height").and_then(AttrValue::as_size) {
            style.height = height;
        }
        if let Some(token) = attrs.get("backgroundColor").and_then(AttrValue::as_token) {
            style.background = Color::parse(token);
        }
        if let Some(token) = attrs.get("borderColor").and_then(AttrValue::as_token) {
            style.border = Color::parse(token);
        }
        style
    }
}
