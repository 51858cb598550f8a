use std::collections::BTreeMap;
use std::fmt;

use serde::de::Error as _;

use crate::foundation::core::Edge;
use crate::foundation::error::{KineticError, KineticResult};
use crate::style::transform::TransformRule;

/// Property map used for inline styles, computed reads, and keyframes.
pub type StyleMap = BTreeMap<String, CssValue>;

/// A single CSS value in the subset this toolkit manipulates.
#[derive(Clone, Debug, PartialEq)]
pub enum CssValue {
    /// Pixel length, e.g. `10px`.
    Px(f64),
    /// Unitless number.
    Number(f64),
    /// Percentage, stored as the percent figure (`50` for `50%`).
    Percent(f64),
    /// Any other serialized value (`auto`, `none`, colors, ...).
    Keyword(String),
    /// Structured `transform` value.
    Transform(TransformRule),
    /// Space-joined list form accepted by shorthand properties.
    List(Vec<CssValue>),
    /// Per-edge object form accepted by shorthand properties.
    Sides(SideValues),
}

/// The object-of-sides input shape for `inset`/`margin`/`padding`.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SideValues {
    /// Top edge value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<Box<CssValue>>,
    /// Right edge value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<Box<CssValue>>,
    /// Bottom edge value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<Box<CssValue>>,
    /// Left edge value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<Box<CssValue>>,
}

impl SideValues {
    fn get(&self, edge: Edge) -> Option<&CssValue> {
        match edge {
            Edge::Top => self.top.as_deref(),
            Edge::Right => self.right.as_deref(),
            Edge::Bottom => self.bottom.as_deref(),
            Edge::Left => self.left.as_deref(),
        }
    }
}

/// Properties that take a default `px` unit when written as a bare number.
pub const AUTO_PX: &[&str] = &[
    "width",
    "height",
    "top",
    "left",
    "right",
    "bottom",
    "padding",
    "padding-top",
    "padding-left",
    "padding-right",
    "padding-bottom",
    "margin",
    "margin-top",
    "margin-left",
    "margin-right",
    "margin-bottom",
    "border-width",
    "border-top-width",
    "border-left-width",
    "border-right-width",
    "border-bottom-width",
    "outline-width",
    "outline-top-width",
    "outline-left-width",
    "outline-right-width",
    "outline-bottom-width",
];

/// Shorthand properties destructured from object/list form into the native
/// space-separated form.
pub const DESTRUCTURABLE: &[&str] = &["inset", "margin", "padding"];

/// Whether `prop` takes a default pixel unit.
pub fn is_auto_px(prop: &str) -> bool {
    AUTO_PX.contains(&prop)
}

/// Normalize a property name: camelCase becomes kebab-case, lowercased.
pub fn normalize_prop(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

impl CssValue {
    /// Parse a serialized value into its structured form.
    pub fn parse(input: &str) -> Self {
        let s = input.trim();
        if let Some(px) = s.strip_suffix("px") {
            if let Ok(v) = px.trim().parse::<f64>() {
                return Self::Px(v);
            }
        }
        if let Some(pct) = s.strip_suffix('%') {
            if let Ok(v) = pct.trim().parse::<f64>() {
                return Self::Percent(v);
            }
        }
        if let Ok(v) = s.parse::<f64>() {
            return Self::Number(v);
        }
        Self::Keyword(s.to_owned())
    }

    /// Numeric magnitude with `parseFloat` semantics: pixel and unitless
    /// values yield their figure, keywords yield a leading-number parse.
    pub fn to_f64_lossy(&self) -> Option<f64> {
        match self {
            Self::Px(v) | Self::Number(v) | Self::Percent(v) => Some(*v),
            Self::Keyword(s) => {
                let s = s.trim();
                let end = s
                    .char_indices()
                    .take_while(|(i, c)| {
                        c.is_ascii_digit()
                            || *c == '.'
                            || (*i == 0 && (*c == '-' || *c == '+'))
                    })
                    .map(|(i, c)| i + c.len_utf8())
                    .last()?;
                s[..end].parse::<f64>().ok()
            }
            Self::Transform(_) | Self::List(_) | Self::Sides(_) => None,
        }
    }

    /// Whether this is the `auto` keyword.
    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Keyword(k) if k == "auto")
    }

    /// Interpret a JSON value (fixture/keyframe input) as a CSS value.
    pub fn from_json(v: &serde_json::Value) -> KineticResult<Self> {
        match v {
            serde_json::Value::Number(n) => Ok(Self::Number(n.as_f64().unwrap_or(0.0))),
            serde_json::Value::String(s) => Ok(Self::parse(s)),
            serde_json::Value::Array(items) => Ok(Self::List(
                items
                    .iter()
                    .map(Self::from_json)
                    .collect::<KineticResult<Vec<_>>>()?,
            )),
            serde_json::Value::Object(map) => {
                const TRANSFORM_KEYS: &[&str] = &["translate", "scale", "rotate", "skew"];
                const SIDE_KEYS: &[&str] = &["top", "right", "bottom", "left"];
                if map.keys().all(|k| TRANSFORM_KEYS.contains(&k.as_str())) && !map.is_empty() {
                    let rule: TransformRule = serde_json::from_value(v.clone())
                        .map_err(|e| KineticError::style(e.to_string()))?;
                    return Ok(Self::Transform(rule));
                }
                if map.keys().all(|k| SIDE_KEYS.contains(&k.as_str())) {
                    let sides: SideValues = serde_json::from_value(v.clone())
                        .map_err(|e| KineticError::style(e.to_string()))?;
                    return Ok(Self::Sides(sides));
                }
                Err(KineticError::style(format!(
                    "object value matches neither a transform nor a sides shape: {v}"
                )))
            }
            other => Err(KineticError::style(format!("unsupported CSS value: {other}"))),
        }
    }
}

impl fmt::Display for CssValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Px(v) => write!(f, "{v}px"),
            Self::Number(v) => write!(f, "{v}"),
            Self::Percent(v) => write!(f, "{v}%"),
            Self::Keyword(s) => write!(f, "{s}"),
            Self::Transform(rule) => write!(f, "{rule}"),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(" "))
            }
            Self::Sides(sides) => {
                let parts: Vec<String> = Edge::shorthand_order()
                    .iter()
                    .filter_map(|e| sides.get(*e))
                    .map(|v| v.to_string())
                    .collect();
                write!(f, "{}", parts.join(" "))
            }
        }
    }
}

impl serde::Serialize for CssValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Number(v) => serializer.serialize_f64(*v),
            Self::Transform(rule) => rule.serialize(serializer),
            Self::List(items) => items.serialize(serializer),
            Self::Sides(sides) => sides.serialize(serializer),
            other => serializer.collect_str(other),
        }
    }
}

impl<'de> serde::Deserialize<'de> for CssValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = serde_json::Value::deserialize(deserializer)?;
        Self::from_json(&v).map_err(D::Error::custom)
    }
}

impl From<f64> for CssValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<&str> for CssValue {
    fn from(v: &str) -> Self {
        Self::parse(v)
    }
}

impl From<TransformRule> for CssValue {
    fn from(rule: TransformRule) -> Self {
        Self::Transform(rule)
    }
}

/// Apply the default-px rule: a bare number on an allowlisted length
/// property becomes a pixel length.
pub fn autopx(prop: &str, value: CssValue) -> CssValue {
    match value {
        CssValue::Number(v) if is_auto_px(prop) => CssValue::Px(v),
        other => other,
    }
}

/// Destructure a shorthand's object/list form into its native
/// space-separated form. Non-shorthand properties pass through.
pub fn destructure_shorthand(prop: &str, value: CssValue) -> CssValue {
    if !DESTRUCTURABLE.contains(&prop) {
        return value;
    }
    let to_part = |v: &CssValue| match v {
        CssValue::Number(n) => CssValue::Px(*n),
        other => other.clone(),
    };
    match value {
        CssValue::Sides(sides) => {
            let parts: Vec<CssValue> = Edge::shorthand_order()
                .iter()
                .filter_map(|e| sides.get(*e))
                .map(to_part)
                .collect();
            CssValue::Keyword(
                parts
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(" "),
            )
        }
        CssValue::List(items) => CssValue::Keyword(
            items
                .iter()
                .map(|v| to_part(v).to_string())
                .collect::<Vec<_>>()
                .join(" "),
        ),
        other => other,
    }
}
