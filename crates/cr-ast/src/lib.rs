#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod lower;

pub use lower::parse_rule_query;

/// Logical connector between two flattened condition triples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl CompareOp {
    /// Source-text spelling of the operator. The parser folds `<>` into
    /// [`CompareOp::NotEq`], which renders as `!=`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
        }
    }
}

/// Scalar literal appearing on the right-hand side of a condition.
///
/// Numbers keep the lexical form the parser saw; the compiler never
/// re-formats them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Literal {
    Null,
    Bool(bool),
    Number(String),
    Text(String),
}

/// Keyword operand of an `IS [NOT] <keyword>` predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestKeyword {
    Null,
    True,
    False,
    Unknown,
}

impl TestKeyword {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::True => "true",
            Self::False => "false",
            Self::Unknown => "unknown",
        }
    }
}

/// One `WHEN` condition subtree, closed over the kinds the compiler can
/// flatten. Anything the external parser produces outside these kinds is
/// rejected during lowering, never silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CondExpr {
    Compare {
        field: String,
        op: CompareOp,
        value: Literal,
    },
    Logical {
        left: Box<CondExpr>,
        connector: Connector,
        right: Box<CondExpr>,
    },
    InList {
        field: String,
        negated: bool,
        values: Vec<Literal>,
    },
    NullTest {
        field: String,
        negated: bool,
        keyword: TestKeyword,
    },
    PatternMatch {
        field: String,
        negated: bool,
        pattern: String,
    },
    /// Bare list literal used as an expression. Degenerate: only the first
    /// item survives flattening.
    List { items: Vec<CondExpr> },
}

/// Value produced when a clause's condition holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CaseResult {
    Null,
    /// Rendered as the bare column name, never quoted.
    FieldRef(String),
    /// Raw lexical form; the assembler wraps it in double quotes
    /// (numbers included).
    Literal(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhenClause {
    pub condition: CondExpr,
    pub result: CaseResult,
}

/// One `CASE` expression lifted out of a `SELECT` item: the governing column
/// alias plus the ordered `WHEN` clauses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCase {
    pub alias: String,
    pub clauses: Vec<WhenClause>,
}

#[derive(Debug, Error)]
pub enum AstError {
    #[error("expected exactly one sql statement, found {0}")]
    StatementCount(usize),
    #[error("statement is not a plain SELECT query")]
    NotASelect,
    #[error("select list carries no aliased CASE expression")]
    MissingCase,
    #[error("CASE expression must carry a column alias")]
    MissingAlias,
    #[error("CASE has {conditions} WHEN conditions but {results} THEN results")]
    ClauseMismatch { conditions: usize, results: usize },
    #[error("unsupported sql construct: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Parse(#[from] sqlparser::parser::ParserError),
}
