use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::foundation::error::{KineticError, KineticResult};

/// Position variant for the `steps()` easing function.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepPosition {
    /// Jump at the start of each interval.
    Start,
    /// Jump at the end of each interval.
    End,
}

/// Easing functions used to map normalized animation progress.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Ease {
    /// Linear interpolation.
    Linear,
    /// CSS `ease`.
    Ease,
    /// CSS `ease-in`.
    EaseIn,
    /// CSS `ease-out`.
    EaseOut,
    /// CSS `ease-in-out`.
    EaseInOut,
    /// Arbitrary `cubic-bezier(x1, y1, x2, y2)` curve.
    CubicBezier(f64, f64, f64, f64),
    /// `steps(n, start|end)`.
    Steps(u32, StepPosition),
}

impl Default for Ease {
    fn default() -> Self {
        Self::Linear
    }
}

fn bezier_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^cubic-bezier\(\s*([^,]+),\s*([^,]+),\s*([^,]+),\s*([^)]+)\)$")
            .expect("cubic-bezier pattern")
    })
}

fn steps_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^steps\(\s*([0-9]+)\s*(?:,\s*(start|end)\s*)?\)$").expect("steps pattern")
    })
}

/// Evaluate a cubic-bezier curve at input progress `t`.
///
/// Control points follow CSS `cubic-bezier(x1, y1, x2, y2)`; the parametric
/// `s` with `bezier_x(s) == t` is found by Newton–Raphson with a bisection
/// fallback.
fn cubic_bezier(t: f64, x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    if t <= 0.0 {
        return 0.0;
    }
    if t >= 1.0 {
        return 1.0;
    }
    let curve = |a: f64, b: f64, s: f64| {
        // One-dimensional bezier with P0=0, P3=1.
        3.0 * a * s * (1.0 - s) * (1.0 - s) + 3.0 * b * s * s * (1.0 - s) + s * s * s
    };
    let curve_dx = |a: f64, b: f64, s: f64| {
        3.0 * a * (1.0 - s) * (1.0 - 3.0 * s) + 3.0 * b * s * (2.0 - 3.0 * s) + 3.0 * s * s
    };

    let mut s = t;
    for _ in 0..8 {
        let x = curve(x1, x2, s) - t;
        if x.abs() < 1e-7 {
            return curve(y1, y2, s);
        }
        let dx = curve_dx(x1, x2, s);
        if dx.abs() < 1e-7 {
            break;
        }
        s -= x / dx;
    }

    // Newton failed to converge; bisect.
    let (mut lo, mut hi) = (0.0f64, 1.0f64);
    s = t;
    while hi - lo > 1e-7 {
        if curve(x1, x2, s) < t {
            lo = s;
        } else {
            hi = s;
        }
        s = (lo + hi) / 2.0;
    }
    curve(y1, y2, s)
}

impl Ease {
    /// Apply this easing function to normalized progress `t` in `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::Ease => cubic_bezier(t, 0.25, 0.1, 0.25, 1.0),
            Self::EaseIn => cubic_bezier(t, 0.42, 0.0, 1.0, 1.0),
            Self::EaseOut => cubic_bezier(t, 0.0, 0.0, 0.58, 1.0),
            Self::EaseInOut => cubic_bezier(t, 0.42, 0.0, 0.58, 1.0),
            Self::CubicBezier(x1, y1, x2, y2) => cubic_bezier(t, x1, y1, x2, y2),
            Self::Steps(n, position) => {
                if n == 0 {
                    return t;
                }
                let n = f64::from(n);
                let stepped = match position {
                    StepPosition::Start => (t * n).ceil(),
                    StepPosition::End => (t * n).floor(),
                };
                (stepped / n).clamp(0.0, 1.0)
            }
        }
    }

    /// Parse a CSS easing value.
    pub fn parse(input: &str) -> KineticResult<Self> {
        let s = input.trim();
        match s {
            "linear" => return Ok(Self::Linear),
            "ease" => return Ok(Self::Ease),
            "ease-in" => return Ok(Self::EaseIn),
            "ease-out" => return Ok(Self::EaseOut),
            "ease-in-out" => return Ok(Self::EaseInOut),
            "step-start" => return Ok(Self::Steps(1, StepPosition::Start)),
            "step-end" => return Ok(Self::Steps(1, StepPosition::End)),
            _ => {}
        }
        if let Some(caps) = bezier_pattern().captures(s) {
            let mut nums = [0.0f64; 4];
            for (slot, cap) in nums.iter_mut().zip(caps.iter().skip(1)) {
                *slot = cap
                    .and_then(|m| m.as_str().trim().parse::<f64>().ok())
                    .ok_or_else(|| {
                        KineticError::animation(format!("bad cubic-bezier value \"{s}\""))
                    })?;
            }
            return Ok(Self::CubicBezier(nums[0], nums[1], nums[2], nums[3]));
        }
        if let Some(caps) = steps_pattern().captures(s) {
            let n = caps
                .get(1)
                .and_then(|m| m.as_str().parse::<u32>().ok())
                .ok_or_else(|| KineticError::animation(format!("bad steps value \"{s}\"")))?;
            let position = match caps.get(2).map(|m| m.as_str()) {
                Some("start") => StepPosition::Start,
                _ => StepPosition::End,
            };
            return Ok(Self::Steps(n, position));
        }
        Err(KineticError::animation(format!(
            "unrecognized easing \"{s}\""
        )))
    }
}

impl fmt::Display for Ease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linear => write!(f, "linear"),
            Self::Ease => write!(f, "ease"),
            Self::EaseIn => write!(f, "ease-in"),
            Self::EaseOut => write!(f, "ease-out"),
            Self::EaseInOut => write!(f, "ease-in-out"),
            Self::CubicBezier(x1, y1, x2, y2) => {
                write!(f, "cubic-bezier({x1}, {y1}, {x2}, {y2})")
            }
            Self::Steps(n, StepPosition::Start) => write!(f, "steps({n}, start)"),
            Self::Steps(n, StepPosition::End) => write!(f, "steps({n}, end)"),
        }
    }
}

impl serde::Serialize for Ease {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for Ease {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
