#![forbid(unsafe_code)]

use cr_ast::{CaseResult, Connector, RuleCase};
use cr_flatten::{CondToken, CondTriple, flatten};
use serde::{Deserialize, Serialize};

/// Constant `group_label` column value shared by every row of a rule set.
pub const GROUP_LABEL: &str = "Rule";
/// Constant `active_flag` column value.
pub const ACTIVE_FLAG: &str = "active";

/// Shape discriminator of a rule row, coded `C` / `S` in the output table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    Condition,
    Result,
}

impl RowKind {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::Condition => "C",
            Self::Result => "S",
        }
    }
}

/// One output row of the rule table.
///
/// Condition rows carry one flattened triple plus the connector to the next
/// row; result rows carry the `SELECT` alias, `=`, and the rendered branch
/// outcome. `description` is part of the fixed schema but never populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleRow {
    pub group_label: String,
    pub rule_id: u32,
    pub sequence_number: u32,
    pub is_elseif: bool,
    pub row_kind: RowKind,
    pub field: String,
    pub operator: String,
    pub value: String,
    pub next_connector: Option<Connector>,
    pub description: Option<String>,
    pub active_flag: String,
}

/// Rule-table builder owning the cross-clause counters.
///
/// `rule_id` increments once per pushed clause; `sequence_number` restarts at
/// 1 inside each rule. The state is local to one compilation run — no
/// ambient globals.
#[derive(Debug, Default)]
pub struct Assembler {
    rows: Vec<RuleRow>,
    clause_count: u32,
}

impl Assembler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one `WHEN` clause: its chunked condition rows followed by
    /// exactly one result row.
    pub fn push_clause(&mut self, alias: &str, tokens: &[CondToken], result: &CaseResult) {
        self.clause_count += 1;
        let rule_id = self.clause_count;
        let is_elseif = rule_id != 1;

        let mut clause_rows = condition_rows(tokens);
        clause_rows.push(blank_row(RowKind::Result));
        let last = clause_rows.len() - 1;
        clause_rows[last].field = alias.to_owned();
        clause_rows[last].operator = "=".to_owned();
        clause_rows[last].value = render_result(result);

        for (offset, mut row) in clause_rows.into_iter().enumerate() {
            row.rule_id = rule_id;
            row.sequence_number = offset as u32 + 1;
            row.is_elseif = is_elseif;
            self.rows.push(row);
        }
    }

    #[must_use]
    pub fn finish(self) -> Vec<RuleRow> {
        self.rows
    }
}

/// Assemble the full rule table for one `CASE` expression: flatten every
/// clause condition in source order and thread them through one
/// [`Assembler`]. Zero clauses yield zero rows.
#[must_use]
pub fn assemble_case(case: &RuleCase) -> Vec<RuleRow> {
    let mut assembler = Assembler::new();
    for clause in &case.clauses {
        let tokens = flatten(&clause.condition);
        assembler.push_clause(&case.alias, &tokens, &clause.result);
    }
    let rows = assembler.finish();
    #[cfg(feature = "tracing")]
    tracing::debug!(
        rules = case.clauses.len(),
        rows = rows.len(),
        "assembled rule table"
    );
    rows
}

/// Chunk a flattened sequence into condition rows: one triple plus its
/// trailing connector per row (the four-cell window of the output schema).
/// The final row may omit the connector. An empty sequence still yields one
/// blank condition row — never zero.
fn condition_rows(tokens: &[CondToken]) -> Vec<RuleRow> {
    let mut rows = Vec::new();
    let mut iter = tokens.iter().peekable();
    while let Some(token) = iter.next() {
        match token {
            CondToken::Triple(t) => {
                let connector = if matches!(iter.peek(), Some(CondToken::Connector(_))) {
                    match iter.next() {
                        Some(CondToken::Connector(connector)) => Some(*connector),
                        _ => None,
                    }
                } else {
                    None
                };
                rows.push(triple_row(t, connector));
            }
            // A connector with no preceding triple cannot come out of the
            // flattener; keep it as its own cell rather than dropping it.
            CondToken::Connector(connector) => {
                let mut row = blank_row(RowKind::Condition);
                row.next_connector = Some(*connector);
                rows.push(row);
            }
        }
    }
    if rows.is_empty() {
        rows.push(blank_row(RowKind::Condition));
    }
    rows
}

fn triple_row(triple: &CondTriple, connector: Option<Connector>) -> RuleRow {
    let mut row = blank_row(RowKind::Condition);
    row.field = triple.field.clone();
    row.operator = triple.operator.clone();
    row.value = triple.value.render();
    row.next_connector = connector;
    row
}

fn blank_row(kind: RowKind) -> RuleRow {
    RuleRow {
        group_label: GROUP_LABEL.to_owned(),
        rule_id: 0,
        sequence_number: 0,
        is_elseif: false,
        row_kind: kind,
        field: String::new(),
        operator: String::new(),
        value: String::new(),
        next_connector: None,
        description: None,
        active_flag: ACTIVE_FLAG.to_owned(),
    }
}

fn render_result(result: &CaseResult) -> String {
    match result {
        CaseResult::Null => "NULL".to_owned(),
        CaseResult::FieldRef(name) => name.clone(),
        // Quoted regardless of the literal's dtype, numbers included.
        CaseResult::Literal(raw) => format!("\"{raw}\""),
    }
}
