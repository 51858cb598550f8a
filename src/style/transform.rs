use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::foundation::error::{KineticError, KineticResult};

/// Structured form of a CSS `transform` value.
///
/// Components are optional so that a rule only round-trips the functions it
/// actually declared; an absent component behaves as identity.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TransformRule {
    /// `translate(x, y)` in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translate: Option<[f64; 2]>,
    /// `scale(x, y)` factors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<[f64; 2]>,
    /// `rotate(deg)`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotate: Option<f64>,
    /// `skew(x, y)` in degrees.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skew: Option<[f64; 2]>,
}

fn fn_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\w+)\((.+?)\)").expect("transform function pattern"))
}

fn split_args(args: &str) -> Vec<f64> {
    args.split(',')
        .map(|a| {
            let a = a.trim();
            let a = a
                .strip_suffix("px")
                .or_else(|| a.strip_suffix("deg"))
                .unwrap_or(a);
            a.trim().parse::<f64>().unwrap_or(0.0)
        })
        .collect()
}

impl TransformRule {
    /// The identity transform (every component absent).
    pub fn identity() -> Self {
        Self::default()
    }

    /// Translate components, defaulting to zero when absent.
    pub fn translate_or_zero(&self) -> [f64; 2] {
        self.translate.unwrap_or([0.0, 0.0])
    }

    /// Parse a serialized transform list.
    ///
    /// Recognizes `none`, `translate[X|Y]`, `scale[X|Y]`, `rotate`, `skew`
    /// and `matrix` (translate and scale are recovered from the matrix).
    pub fn parse(input: &str) -> KineticResult<Self> {
        let input = input.trim();
        if input.is_empty() || input == "none" {
            return Ok(Self::identity());
        }
        let mut rule = Self::identity();
        let mut matched = false;
        for caps in fn_pattern().captures_iter(input) {
            matched = true;
            let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let args = split_args(caps.get(2).map(|m| m.as_str()).unwrap_or_default());
            let arg = |i: usize| args.get(i).copied().unwrap_or(0.0);
            match name {
                "translate" => {
                    rule.translate = Some([arg(0), if args.len() > 1 { arg(1) } else { 0.0 }]);
                }
                "translateX" | "translatex" => {
                    let [_, y] = rule.translate_or_zero();
                    rule.translate = Some([arg(0), y]);
                }
                "translateY" | "translatey" => {
                    let [x, _] = rule.translate_or_zero();
                    rule.translate = Some([x, arg(0)]);
                }
                "scale" => {
                    let sx = arg(0);
                    let sy = if args.len() > 1 { arg(1) } else { sx };
                    rule.scale = Some([sx, sy]);
                }
                "scaleX" | "scalex" => {
                    let [_, y] = rule.scale.unwrap_or([1.0, 1.0]);
                    rule.scale = Some([arg(0), y]);
                }
                "scaleY" | "scaley" => {
                    let [x, _] = rule.scale.unwrap_or([1.0, 1.0]);
                    rule.scale = Some([x, arg(0)]);
                }
                "rotate" => rule.rotate = Some(arg(0)),
                "skew" => {
                    rule.skew = Some([arg(0), if args.len() > 1 { arg(1) } else { 0.0 }]);
                }
                "matrix" if args.len() == 6 => {
                    rule.translate = Some([arg(4), arg(5)]);
                    rule.scale = Some([arg(0), arg(3)]);
                }
                other => {
                    return Err(KineticError::style(format!(
                        "unsupported transform function \"{other}\""
                    )));
                }
            }
        }
        if !matched {
            return Err(KineticError::style(format!(
                "unparseable transform value \"{input}\""
            )));
        }
        Ok(rule)
    }

    /// Component-wise interpolation, treating absent components as identity.
    pub fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        fn pair(a: Option<[f64; 2]>, b: Option<[f64; 2]>, id: [f64; 2], t: f64) -> Option<[f64; 2]> {
            if a.is_none() && b.is_none() {
                return None;
            }
            let a = a.unwrap_or(id);
            let b = b.unwrap_or(id);
            Some([a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t])
        }

        let rotate = match (a.rotate, b.rotate) {
            (None, None) => None,
            (ra, rb) => {
                let ra = ra.unwrap_or(0.0);
                let rb = rb.unwrap_or(0.0);
                Some(ra + (rb - ra) * t)
            }
        };
        Self {
            translate: pair(a.translate, b.translate, [0.0, 0.0], t),
            scale: pair(a.scale, b.scale, [1.0, 1.0], t),
            rotate,
            skew: pair(a.skew, b.skew, [0.0, 0.0], t),
        }
    }
}

impl fmt::Display for TransformRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some([x, y]) = self.translate {
            parts.push(format!("translate({x}px, {y}px)"));
        }
        if let Some([x, y]) = self.scale {
            parts.push(format!("scale({x}, {y})"));
        }
        if let Some(deg) = self.rotate {
            parts.push(format!("rotate({deg}deg)"));
        }
        if let Some([x, y]) = self.skew {
            parts.push(format!("skew({x}deg, {y}deg)"));
        }
        if parts.is_empty() {
            return write!(f, "none");
        }
        write!(f, "{}", parts.join(" "))
    }
}
