use std::sync::OnceLock;

use regex::Regex;
use smallvec::SmallVec;

use crate::foundation::error::{KineticError, KineticResult};

/// Alignment keyword of a placement directive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlacementKeyword {
    /// Fully outside the reference, beyond its leading edge.
    Before,
    /// Fully outside the reference, beyond its trailing edge.
    After,
    /// Flush with the reference's leading edge.
    Start,
    /// Flush with the reference's trailing edge.
    End,
    /// Centers aligned.
    Center,
}

/// A signed numeric or percentage modifier.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Predicate {
    /// Signed magnitude (the percent figure for percentage predicates).
    pub value: f64,
    /// Whether the magnitude is a percentage of the reference length.
    pub percent: bool,
}

/// A parsed placement directive: one optional keyword plus zero or more
/// signed modifiers. A missing keyword means center alignment.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Placement {
    /// Alignment keyword, if present.
    pub keyword: Option<PlacementKeyword>,
    /// Modifiers in source order.
    pub predicates: SmallVec<[Predicate; 2]>,
}

fn keyword_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(before|after|start|end|center)").expect("keyword pattern"))
}

fn modifier_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[-+][0-9]+(?:\.[0-9]+)?(%)?").expect("modifier pattern"))
}

/// Parse a directive such as `"end-20%"`, `"before+10"`, or `"center"`.
///
/// The first keyword occurrence wins; every signed modifier is collected.
pub fn parse_placement(expr: &str) -> Placement {
    let keyword = keyword_pattern()
        .find(expr)
        .map(|m| match m.as_str() {
            "before" => PlacementKeyword::Before,
            "after" => PlacementKeyword::After,
            "start" => PlacementKeyword::Start,
            "end" => PlacementKeyword::End,
            _ => PlacementKeyword::Center,
        });
    let predicates = modifier_pattern()
        .captures_iter(expr)
        .filter_map(|caps| {
            let m = caps.get(0)?;
            let percent = caps.get(1).is_some();
            let digits = m.as_str().trim_end_matches('%');
            digits.parse::<f64>().ok().map(|value| Predicate { value, percent })
        })
        .collect();
    Placement {
        keyword,
        predicates,
    }
}

/// Sum a directive's modifiers, resolving percentages against
/// `reference_length`.
pub fn eval_predicates(predicates: &[Predicate], reference_length: f64) -> f64 {
    predicates.iter().fold(0.0, |total, p| {
        total
            + if p.percent {
                p.value / 100.0 * reference_length
            } else {
                p.value
            }
    })
}

/// Parse a directive, rejecting expressions that carry neither a keyword
/// nor a modifier but are non-empty (a typo rather than a default).
pub fn parse_placement_strict(expr: &str) -> KineticResult<Placement> {
    let placement = parse_placement(expr);
    if !expr.trim().is_empty() && placement.keyword.is_none() && placement.predicates.is_empty() {
        return Err(KineticError::geometry(format!(
            "unrecognized placement directive \"{expr}\""
        )));
    }
    Ok(placement)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keyword_and_modifiers() {
        let p = parse_placement("end-20%+5");
        assert_eq!(p.keyword, Some(PlacementKeyword::End));
        assert_eq!(
            p.predicates.as_slice(),
            &[
                Predicate {
                    value: -20.0,
                    percent: true
                },
                Predicate {
                    value: 5.0,
                    percent: false
                }
            ]
        );
    }

    #[test]
    fn empty_expression_defaults_to_center() {
        let p = parse_placement("");
        assert_eq!(p.keyword, None);
        assert!(p.predicates.is_empty());
    }

    #[test]
    fn predicates_resolve_percent_against_reference() {
        let p = parse_placement("start+50%-10");
        assert_eq!(eval_predicates(&p.predicates, 200.0), 90.0);
    }

    #[test]
    fn strict_parse_rejects_garbage() {
        assert!(parse_placement_strict("sideways").is_err());
        assert!(parse_placement_strict("").is_ok());
        assert!(parse_placement_strict("before").is_ok());
    }
}
