use crate::foundation::error::{KineticError, KineticResult};
use crate::host::selector::Selector;
use crate::style::value::{CssValue, StyleMap, normalize_prop};

/// One stylesheet: an ordered list of rules, matching declaration order.
#[derive(Clone, Debug, Default)]
pub struct Stylesheet {
    /// Rules in declaration order.
    pub rules: Vec<SheetRule>,
}

impl Stylesheet {
    /// Append a style rule parsed from a selector and a declaration block.
    pub fn style(mut self, selector: &str, declarations: &str) -> KineticResult<Self> {
        self.rules.push(SheetRule::Style(StyleRule {
            selector: Selector::parse(selector)?,
            declarations: parse_declarations(declarations),
        }));
        Ok(self)
    }

    /// Append a keyframes rule.
    pub fn keyframes(mut self, name: &str, stops: Vec<KeyframeStop>) -> Self {
        self.rules.push(SheetRule::Keyframes(KeyframesRule {
            name: name.to_owned(),
            stops,
        }));
        self
    }
}

/// A single rule in a stylesheet.
#[derive(Clone, Debug)]
pub enum SheetRule {
    /// Selector + declaration block.
    Style(StyleRule),
    /// Named `@keyframes` block.
    Keyframes(KeyframesRule),
}

/// Selector + declarations.
#[derive(Clone, Debug)]
pub struct StyleRule {
    /// The rule's compound selector.
    pub selector: Selector,
    /// Declared properties.
    pub declarations: StyleMap,
}

/// A named `@keyframes` rule.
#[derive(Clone, Debug)]
pub struct KeyframesRule {
    /// Animation name.
    pub name: String,
    /// Stops in source order.
    pub stops: Vec<KeyframeStop>,
}

/// One stop of a keyframes rule: `from`, `to`, or percentage key(s) plus a
/// declaration block. A stop may carry several keys (`0%, 100% { ... }`).
#[derive(Clone, Debug)]
pub struct KeyframeStop {
    /// Offset keys for this stop.
    pub keys: Vec<KeyText>,
    /// Declared properties at these offsets.
    pub declarations: StyleMap,
}

impl KeyframeStop {
    /// Build a stop from a key-list text (`"from"`, `"0%, 100%"`) and a
    /// declaration block.
    pub fn parse(keys: &str, declarations: &str) -> KineticResult<Self> {
        let keys = keys
            .split(',')
            .map(|k| KeyText::parse(k.trim()))
            .collect::<KineticResult<Vec<_>>>()?;
        Ok(Self {
            keys,
            declarations: parse_declarations(declarations),
        })
    }
}

/// A keyframe offset key.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum KeyText {
    /// `from` (offset 0).
    From,
    /// `to` (offset 1).
    To,
    /// Percentage key.
    Percent(f64),
}

impl KeyText {
    /// Parse `from` / `to` / `N%`.
    pub fn parse(input: &str) -> KineticResult<Self> {
        match input {
            "from" => Ok(Self::From),
            "to" => Ok(Self::To),
            other => other
                .strip_suffix('%')
                .and_then(|n| n.trim().parse::<f64>().ok())
                .map(Self::Percent)
                .ok_or_else(|| {
                    KineticError::host(format!("bad keyframe key \"{other}\""))
                }),
        }
    }

    /// The key's offset in `[0, 1]`.
    pub fn offset(self) -> f64 {
        match self {
            Self::From => 0.0,
            Self::To => 1.0,
            Self::Percent(p) => p / 100.0,
        }
    }
}

/// Parse a declaration block (`"width: 10px; color: red"`) into a map.
///
/// Malformed fragments are skipped, matching how a stylesheet parser drops
/// declarations it cannot understand.
pub fn parse_declarations(css: &str) -> StyleMap {
    let mut map = StyleMap::new();
    for decl in css.split(';') {
        let Some((name, value)) = decl.split_once(':') else {
            continue;
        };
        let name = normalize_prop(name.trim());
        if name.is_empty() {
            continue;
        }
        let value = if name == "transform" {
            match crate::style::transform::TransformRule::parse(value.trim()) {
                Ok(rule) => CssValue::Transform(rule),
                Err(_) => continue,
            }
        } else {
            CssValue::parse(value)
        };
        map.insert(name, value);
    }
    map
}

/// Serialize a declaration map back into `name: value; ...` form.
pub fn serialize_declarations(map: &StyleMap) -> String {
    map.iter()
        .map(|(name, value)| format!("{name}: {value}"))
        .collect::<Vec<_>>()
        .join("; ")
}
