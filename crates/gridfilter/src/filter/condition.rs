//! Normalization of operators and search terms into per-term conditions.
//!
//! A filter can express the same intent several ways: `a*` with `Jo`, `EQ` with
//! `Jo*`, or no operator at all with `Jo*`. Everything is normalized here into a
//! list of [`Condition`]s so the evaluator only deals with one representation.

use serde_json::Value;

use super::operator::Operator;

/// A single operator applied to a single operand.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Effective operator for this term.
    pub operator: Operator,
    /// Search term with any embedded markers stripped.
    pub operand: Value,
}

/// Returns true if a search term carries no filtering information.
pub fn is_blank_term(term: &Value) -> bool {
    match term {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Drops null and blank search terms, keeping order.
pub fn retain_terms(terms: impl IntoIterator<Item = Value>) -> Vec<Value> {
    terms.into_iter().filter(|t| !is_blank_term(t)).collect()
}

/// Splits a term into the operator embedded in it and the remaining text.
///
/// `*` markers map to the substring operators (leading: ends with, trailing:
/// starts with, both: contains). Otherwise a comparison prefix such as `>=` is
/// recognized.
fn split_embedded(term: &str) -> Option<(Operator, &str)> {
    let leading = term.starts_with('*');
    let trailing = term.len() > 1 && term.ends_with('*');

    match (leading, trailing) {
        (true, true) => Some((Operator::Contains, &term[1..term.len() - 1])),
        (true, false) => Some((Operator::EndsWith, &term[1..])),
        (false, true) => Some((Operator::StartsWith, &term[..term.len() - 1])),
        (false, false) => {
            Operator::parse_prefix(term).map(|(op, len)| (op, term[len..].trim_start()))
        }
    }
}

/// Strips `*` markers only, keeping comparison prefixes as literal text.
fn strip_wildcards(term: &str) -> &str {
    term.trim_start_matches('*').trim_end_matches('*')
}

fn is_set_operator(operator: Operator) -> bool {
    matches!(
        operator,
        Operator::In | Operator::NotIn | Operator::InContains | Operator::NotInContains
    )
}

/// Normalizes an operator and its search terms into per-term conditions.
///
/// Precedence: an operator-level wildcard (`a*`, `*z`, `*`) wins over markers in
/// the term; otherwise a marker embedded in the term wins over the operator;
/// otherwise the operator applies, defaulting to [`Operator::Equal`]. Set
/// operators split comma-joined string terms into separate terms.
pub fn normalize(operator: Option<Operator>, terms: &[Value]) -> Vec<Condition> {
    let base = operator.unwrap_or_default();
    let mut conditions = Vec::with_capacity(terms.len());

    for term in terms.iter().filter(|t| !is_blank_term(t)) {
        let Value::String(text) = term else {
            conditions.push(Condition {
                operator: base,
                operand: term.clone(),
            });
            continue;
        };

        let text = text.trim();

        if is_set_operator(base) {
            conditions.extend(
                text.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| Condition {
                        operator: base,
                        operand: Value::String(part.to_string()),
                    }),
            );
            continue;
        }

        let (effective, operand) = if base.is_wildcard() {
            (base, strip_wildcards(text))
        } else {
            match split_embedded(text) {
                Some((embedded, rest)) => (embedded, rest),
                None => (base, text),
            }
        };

        conditions.push(Condition {
            operator: effective,
            operand: Value::String(operand.to_string()),
        });
    }

    conditions
}
