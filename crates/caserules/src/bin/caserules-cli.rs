#![forbid(unsafe_code)]

use std::path::PathBuf;

use caserules::{DEFAULT_DELIMITER, compile_sql, read_sql_file, write_rules_file};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut input: Option<PathBuf> = None;
    let mut output: Option<PathBuf> = None;
    let mut delimiter = DEFAULT_DELIMITER;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--input" => {
                let value = args.next().ok_or("--input requires a path to a .sql file")?;
                input = Some(PathBuf::from(value));
            }
            "--output" => {
                let value = args.next().ok_or("--output requires a path")?;
                output = Some(PathBuf::from(value));
            }
            "--delimiter" => {
                let value = args.next().ok_or("--delimiter requires a single character")?;
                let mut bytes = value.bytes();
                delimiter = match (bytes.next(), bytes.next()) {
                    (Some(byte), None) => byte,
                    _ => return Err(format!("delimiter must be one byte: {value:?}").into()),
                };
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            other => {
                return Err(format!("unknown argument: {other}").into());
            }
        }
    }

    let input = input.ok_or("--input is required (see --help)")?;
    let output = output.unwrap_or_else(|| input.with_extension("csv"));

    let sql = read_sql_file(&input)?;
    let rows = compile_sql(&sql)?;
    write_rules_file(&output, &rows, delimiter)?;

    let rules = rows.last().map_or(0, |row| row.rule_id);
    println!("rules={} rows={} wrote={}", rules, rows.len(), output.display());
    Ok(())
}

fn print_help() {
    println!(
        "caserules-cli\n\
         Usage:\n\
         \tcaserules-cli --input query.sql [--output rules.csv] [--delimiter ';']\n\
         Options:\n\
         \t--input <path>      SQL file with one SELECT carrying an aliased CASE expression\n\
         \t--output <path>     Output table path (default: input with .csv extension)\n\
         \t--delimiter <char>  Field delimiter, one byte (default ';')\n\
         \t-h, --help          Show this help"
    );
}
