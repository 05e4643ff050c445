#![forbid(unsafe_code)]

use std::fs;
use std::path::Path;

use csv::{QuoteStyle, WriterBuilder};
use cr_table::RuleRow;
use thiserror::Error;

/// Delimiter of the emitted rule table.
pub const DEFAULT_DELIMITER: u8 = b';';

/// Column header of the rule table, in the fixed output order.
pub const COLUMNS: [&str; 11] = [
    "group_label",
    "rule_id",
    "sequence_number",
    "is_elseif",
    "row_kind",
    "field",
    "operator",
    "value",
    "next_connector",
    "description",
    "active_flag",
];

#[derive(Debug, Error)]
pub enum IoError {
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

pub fn read_sql_file(path: impl AsRef<Path>) -> Result<String, IoError> {
    Ok(fs::read_to_string(path)?)
}

/// Render the rule rows as a delimited text table with a header row.
///
/// Textual literal cells arrive pre-quoted from the compiler, so quoting is
/// disabled here: re-quoting would double-wrap them.
pub fn write_rules_string(rows: &[RuleRow], delimiter: u8) -> Result<String, IoError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Never)
        .from_writer(Vec::new());

    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.write_record(record(row))?;
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

pub fn write_rules_file(
    path: impl AsRef<Path>,
    rows: &[RuleRow],
    delimiter: u8,
) -> Result<(), IoError> {
    let rendered = write_rules_string(rows, delimiter)?;
    fs::write(path, rendered)?;
    Ok(())
}

fn record(row: &RuleRow) -> [String; 11] {
    [
        row.group_label.clone(),
        row.rule_id.to_string(),
        row.sequence_number.to_string(),
        row.is_elseif.to_string(),
        row.row_kind.code().to_owned(),
        row.field.clone(),
        row.operator.clone(),
        row.value.clone(),
        row.next_connector
            .map_or_else(String::new, |connector| connector.as_str().to_owned()),
        row.description.clone().unwrap_or_default(),
        row.active_flag.clone(),
    ]
}

#[cfg(test)]
mod tests {
    use cr_ast::{CaseResult, CompareOp, CondExpr, Literal, RuleCase, WhenClause};
    use cr_table::assemble_case;

    use super::{DEFAULT_DELIMITER, read_sql_file, write_rules_file, write_rules_string};

    fn sample_rows() -> Vec<cr_table::RuleRow> {
        let case = RuleCase {
            alias: "state".to_owned(),
            clauses: vec![WhenClause {
                condition: CondExpr::Compare {
                    field: "status".to_owned(),
                    op: CompareOp::Eq,
                    value: Literal::Text("A".to_owned()),
                },
                result: CaseResult::Literal("Active".to_owned()),
            }],
        };
        assemble_case(&case)
    }

    #[test]
    fn output_starts_with_the_fixed_header() {
        let out = write_rules_string(&sample_rows(), DEFAULT_DELIMITER).expect("write");
        let header = out.lines().next().expect("header");
        assert_eq!(
            header,
            "group_label;rule_id;sequence_number;is_elseif;row_kind;field;\
             operator;value;next_connector;description;active_flag"
        );
    }

    #[test]
    fn pre_quoted_values_are_not_quoted_again() {
        let out = write_rules_string(&sample_rows(), DEFAULT_DELIMITER).expect("write");
        assert!(out.contains(";\"A\";"));
        assert!(!out.contains("\"\"A\"\""));
    }

    #[test]
    fn empty_cells_stay_empty() {
        let out = write_rules_string(&sample_rows(), DEFAULT_DELIMITER).expect("write");
        let condition_line = out.lines().nth(1).expect("condition row");
        // next_connector and description are both unpopulated here.
        assert!(condition_line.ends_with(";;active"));
    }

    #[test]
    fn custom_delimiter_is_honored() {
        let out = write_rules_string(&sample_rows(), b',').expect("write");
        assert!(out.starts_with("group_label,rule_id"));
    }

    #[test]
    fn zero_rows_emit_header_only() {
        let out = write_rules_string(&[], DEFAULT_DELIMITER).expect("write");
        assert_eq!(out.lines().count(), 1);
    }

    #[test]
    fn file_round_trip_matches_string_rendering() {
        let dir = tempfile::tempdir().expect("tempdir");
        let csv_path = dir.path().join("rules.csv");
        let rows = sample_rows();

        write_rules_file(&csv_path, &rows, DEFAULT_DELIMITER).expect("write file");
        let from_disk = std::fs::read_to_string(&csv_path).expect("read back");
        let rendered = write_rules_string(&rows, DEFAULT_DELIMITER).expect("render");
        assert_eq!(from_disk, rendered);

        let sql_path = dir.path().join("query.sql");
        std::fs::write(&sql_path, "SELECT 1").expect("write sql");
        assert_eq!(read_sql_file(&sql_path).expect("read sql"), "SELECT 1");
    }
}
