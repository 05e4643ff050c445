#![forbid(unsafe_code)]

//! End-to-end pipeline: SQL text → parsed `CASE` → flattened conditions →
//! rule rows. Parsing and IO live in the member crates; this crate only
//! wires them together and re-exports the public surface.

use thiserror::Error;

pub use cr_ast::{
    AstError, CaseResult, CompareOp, CondExpr, Connector, Literal, RuleCase, TestKeyword,
    WhenClause, parse_rule_query,
};
pub use cr_flatten::{CondToken, CondTriple, CondValue, flatten};
pub use cr_io::{
    COLUMNS, DEFAULT_DELIMITER, IoError, read_sql_file, write_rules_file, write_rules_string,
};
pub use cr_table::{
    ACTIVE_FLAG, Assembler, GROUP_LABEL, RowKind, RuleRow, assemble_case,
};

#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Ast(#[from] AstError),
    #[error(transparent)]
    Io(#[from] IoError),
}

/// Compile one SQL `SELECT ... CASE WHEN ...` into its ordered rule rows.
pub fn compile_sql(sql: &str) -> Result<Vec<RuleRow>, CompileError> {
    let case = parse_rule_query(sql)?;
    Ok(assemble_case(&case))
}

/// Compile SQL straight to the delimited text rendering.
pub fn compile_sql_to_table(sql: &str, delimiter: u8) -> Result<String, CompileError> {
    let rows = compile_sql(sql)?;
    Ok(write_rules_string(&rows, delimiter)?)
}
