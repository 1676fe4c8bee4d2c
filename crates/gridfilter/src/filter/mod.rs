//! Operators, value resolution and row evaluation for column filters.
//!
//! A column filter pairs an [`Operator`] with an ordered list of search terms.
//! Evaluating it against a row takes two steps:
//!
//! 1. [`resolve_value`] reads the column's value from the row (dotted paths,
//!    formatter output, detail-row parents).
//! 2. [`evaluate`] applies the operator to that value and the search terms.
//!
//! # Operators
//!
//! | Operator | Tokens |
//! |---|---|
//! | equal (default) | `EQ`, `=`, `==` |
//! | not equal | `NE`, `!=`, `<>` |
//! | in / not in | `IN`, `NIN` |
//! | in contains / not in contains | `IN_CONTAINS`, `NOT_IN_CONTAINS` |
//! | starts with | `a*`, `StartsWith` |
//! | ends with | `*z`, `EndsWith` |
//! | contains / not contains | `*`, `Contains`, `Not_Contains` |
//! | ordering | `LT`, `LE`, `GT`, `GE`, `<`, `<=`, `>`, `>=` |
//!
//! Search terms may also carry the operator themselves: `Jo*`, `*hn`, `*oh*`,
//! `>=18`, `<>Doe`.
//!
//! # Example
//!
//! ```
//! use gridfilter_rs::filter::{evaluate, Operator};
//! use serde_json::json;
//!
//! assert!(evaluate(Some(Operator::StartsWith), Some(&json!("John")), &[json!("Jo")]));
//! assert!(evaluate(None, Some(&json!("John")), &[json!("*hn")]));
//! assert!(evaluate(Some(Operator::Equal), Some(&json!("26")), &[json!(26)]));
//! ```

mod condition;
mod error;
mod evaluator;
mod operator;
mod resolver;

pub use condition::{is_blank_term, normalize, retain_terms, Condition};
pub use error::{FilterError, FilterResult};
pub use evaluator::{evaluate, matches_filters, FilterContext, FilterEvaluator, LocalFilter};
pub use operator::Operator;
pub use resolver::{detail_parent, resolve_path, resolve_value, PADDING_KEY, PARENT_KEY};
