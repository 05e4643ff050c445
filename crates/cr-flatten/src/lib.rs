#![forbid(unsafe_code)]

use cr_ast::{CondExpr, Connector, Literal, TestKeyword};
use serde::{Deserialize, Serialize};

/// Rendered value cell of a condition triple.
///
/// Textual literals arrive here already wrapped in exactly one pair of double
/// quotes; numbers and booleans keep their raw lexical form. The downstream
/// serializer must not quote again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CondValue {
    Scalar(String),
    List(Vec<String>),
}

impl CondValue {
    /// Single-cell rendering: lists become a parenthesized tuple of their
    /// already-quoted items.
    #[must_use]
    pub fn render(&self) -> String {
        match self {
            Self::Scalar(value) => value.clone(),
            Self::List(items) => format!("({})", items.join(",")),
        }
    }
}

/// One atomic comparison/predicate: field, operator, value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CondTriple {
    pub field: String,
    pub operator: String,
    pub value: CondValue,
}

/// Element of a flattened condition sequence.
///
/// A well-formed sequence alternates triples and connectors and never starts
/// or ends on a connector unless the source tree was degenerate; a lone
/// triple is the simple-condition case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CondToken {
    Triple(CondTriple),
    Connector(Connector),
}

/// Flatten one `WHEN` condition subtree into its ordered token sequence.
///
/// Total and pure: the closed AST guarantees every node has a flattening
/// rule (unsupported SQL is rejected during lowering), so no error path
/// exists here. Ordering is left-to-right and left-associative — the tree
/// shape already encodes operator precedence and is not re-ordered.
#[must_use]
pub fn flatten(expr: &CondExpr) -> Vec<CondToken> {
    let mut tokens = Vec::new();
    flatten_into(expr, &mut tokens);
    tokens
}

fn flatten_into(expr: &CondExpr, out: &mut Vec<CondToken>) {
    match expr {
        CondExpr::Compare { field, op, value } => out.push(triple(
            field,
            op.as_str(),
            CondValue::Scalar(render_literal(value)),
        )),
        CondExpr::Logical {
            left,
            connector,
            right,
        } => {
            let before = out.len();
            flatten_into(left, out);
            // Connector only between two non-empty sides; an empty left
            // flattening degenerates to the right sequence alone.
            if out.len() > before {
                out.push(CondToken::Connector(*connector));
            }
            flatten_into(right, out);
        }
        CondExpr::InList {
            field,
            negated,
            values,
        } => {
            let operator = if *negated { "not in" } else { "in" };
            let items = values.iter().map(render_literal).collect();
            out.push(triple(field, operator, CondValue::List(items)));
        }
        CondExpr::NullTest {
            field,
            negated,
            keyword,
        } => {
            let operator = if *negated { "is not" } else { "is" };
            let value = match keyword {
                TestKeyword::Null => keyword.as_str().to_owned(),
                other => format!("\"{}\"", other.as_str()),
            };
            out.push(triple(field, operator, CondValue::Scalar(value)));
        }
        CondExpr::PatternMatch {
            field,
            negated,
            pattern,
        } => {
            let operator = if *negated { "not like" } else { "like" };
            out.push(triple(
                field,
                operator,
                CondValue::Scalar(format!("\"{pattern}\"")),
            ));
        }
        // Degenerate bare list: only the first contained expression counts.
        CondExpr::List { items } => {
            if let Some(first) = items.first() {
                flatten_into(first, out);
            }
        }
    }
}

fn triple(field: &str, operator: &str, value: CondValue) -> CondToken {
    CondToken::Triple(CondTriple {
        field: field.to_owned(),
        operator: operator.to_owned(),
        value,
    })
}

fn render_literal(literal: &Literal) -> String {
    match literal {
        Literal::Null => "NULL".to_owned(),
        Literal::Bool(flag) => flag.to_string(),
        Literal::Number(number) => number.clone(),
        Literal::Text(text) => format!("\"{text}\""),
    }
}
