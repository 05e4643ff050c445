//! Lowering from the external `sqlparser` AST into the closed condition AST.
//!
//! The external parser validates SQL syntax; this module validates that the
//! parsed tree stays inside the subset the rule compiler can translate.
//! Every construct without a translation rule fails with
//! [`AstError::Unsupported`] — nothing is silently dropped.

use sqlparser::ast::{
    BinaryOperator, Expr, SelectItem, SetExpr, Statement, UnaryOperator, Value,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::{
    AstError, CaseResult, CompareOp, CondExpr, Connector, Literal, RuleCase, TestKeyword,
    WhenClause,
};

/// Parse a `SELECT` carrying one aliased `CASE WHEN ... END` expression and
/// lower it into a [`RuleCase`].
pub fn parse_rule_query(sql: &str) -> Result<RuleCase, AstError> {
    let statements = Parser::parse_sql(&GenericDialect {}, sql)?;
    if statements.len() != 1 {
        return Err(AstError::StatementCount(statements.len()));
    }

    let query = match &statements[0] {
        Statement::Query(query) => query,
        _ => return Err(AstError::NotASelect),
    };
    let select = match query.body.as_ref() {
        SetExpr::Select(select) => select,
        _ => return Err(AstError::NotASelect),
    };

    for item in &select.projection {
        match item {
            SelectItem::ExprWithAlias { expr, alias } => {
                if let Some(parts) = case_parts(expr) {
                    return lower_case(alias.value.clone(), &parts);
                }
            }
            SelectItem::UnnamedExpr(expr) => {
                if case_parts(expr).is_some() {
                    return Err(AstError::MissingAlias);
                }
            }
            _ => {}
        }
    }

    Err(AstError::MissingCase)
}

struct CaseParts<'a> {
    operand: Option<&'a Expr>,
    conditions: &'a [Expr],
    results: &'a [Expr],
}

fn case_parts(expr: &Expr) -> Option<CaseParts<'_>> {
    match expr {
        Expr::Case {
            operand,
            conditions,
            results,
            ..
        } => Some(CaseParts {
            operand: operand.as_deref(),
            conditions,
            results,
        }),
        Expr::Nested(inner) => case_parts(inner),
        _ => None,
    }
}

fn lower_case(alias: String, parts: &CaseParts<'_>) -> Result<RuleCase, AstError> {
    if parts.operand.is_some() {
        return Err(AstError::Unsupported(
            "CASE <operand> WHEN ... (simple form)".to_owned(),
        ));
    }
    if parts.conditions.len() != parts.results.len() {
        return Err(AstError::ClauseMismatch {
            conditions: parts.conditions.len(),
            results: parts.results.len(),
        });
    }

    // An ELSE branch has no row shape in the rule table; it is accepted and
    // dropped, matching the reference behavior.
    let clauses = parts
        .conditions
        .iter()
        .zip(parts.results.iter())
        .map(|(condition, result)| {
            Ok(WhenClause {
                condition: lower_condition(condition)?,
                result: lower_result(result)?,
            })
        })
        .collect::<Result<Vec<_>, AstError>>()?;

    Ok(RuleCase { alias, clauses })
}

fn lower_condition(expr: &Expr) -> Result<CondExpr, AstError> {
    match expr {
        Expr::BinaryOp { left, op, right } => match op {
            BinaryOperator::And => Ok(CondExpr::Logical {
                left: Box::new(lower_condition(left)?),
                connector: Connector::And,
                right: Box::new(lower_condition(right)?),
            }),
            BinaryOperator::Or => Ok(CondExpr::Logical {
                left: Box::new(lower_condition(left)?),
                connector: Connector::Or,
                right: Box::new(lower_condition(right)?),
            }),
            BinaryOperator::Eq => lower_compare(left, CompareOp::Eq, right),
            BinaryOperator::NotEq => lower_compare(left, CompareOp::NotEq, right),
            BinaryOperator::Lt => lower_compare(left, CompareOp::Lt, right),
            BinaryOperator::LtEq => lower_compare(left, CompareOp::LtEq, right),
            BinaryOperator::Gt => lower_compare(left, CompareOp::Gt, right),
            BinaryOperator::GtEq => lower_compare(left, CompareOp::GtEq, right),
            other => Err(AstError::Unsupported(format!(
                "binary operator {other} in a WHEN condition"
            ))),
        },
        Expr::InList {
            expr,
            list,
            negated,
        } => Ok(CondExpr::InList {
            field: field_name(expr)?,
            negated: *negated,
            values: list.iter().map(lower_literal).collect::<Result<_, _>>()?,
        }),
        Expr::IsNull(inner) => null_test(inner, false, TestKeyword::Null),
        Expr::IsNotNull(inner) => null_test(inner, true, TestKeyword::Null),
        Expr::IsTrue(inner) => null_test(inner, false, TestKeyword::True),
        Expr::IsNotTrue(inner) => null_test(inner, true, TestKeyword::True),
        Expr::IsFalse(inner) => null_test(inner, false, TestKeyword::False),
        Expr::IsNotFalse(inner) => null_test(inner, true, TestKeyword::False),
        Expr::IsUnknown(inner) => null_test(inner, false, TestKeyword::Unknown),
        Expr::IsNotUnknown(inner) => null_test(inner, true, TestKeyword::Unknown),
        Expr::Like {
            negated,
            expr,
            pattern,
            ..
        } => {
            let pattern = match lower_literal(pattern)? {
                Literal::Text(text) => text,
                other => {
                    return Err(AstError::Unsupported(format!(
                        "LIKE pattern must be a string literal, found {other:?}"
                    )));
                }
            };
            Ok(CondExpr::PatternMatch {
                field: field_name(expr)?,
                negated: *negated,
                pattern,
            })
        }
        Expr::Nested(inner) => lower_condition(inner),
        Expr::Tuple(items) => Ok(CondExpr::List {
            items: items
                .iter()
                .map(lower_condition)
                .collect::<Result<_, _>>()?,
        }),
        other => Err(AstError::Unsupported(format!(
            "WHEN condition expression: {other}"
        ))),
    }
}

fn lower_compare(left: &Expr, op: CompareOp, right: &Expr) -> Result<CondExpr, AstError> {
    Ok(CondExpr::Compare {
        field: field_name(left)?,
        op,
        value: lower_literal(right)?,
    })
}

fn null_test(inner: &Expr, negated: bool, keyword: TestKeyword) -> Result<CondExpr, AstError> {
    Ok(CondExpr::NullTest {
        field: field_name(inner)?,
        negated,
        keyword,
    })
}

fn field_name(expr: &Expr) -> Result<String, AstError> {
    match expr {
        Expr::Identifier(ident) => Ok(ident.value.clone()),
        Expr::CompoundIdentifier(idents) => Ok(idents
            .iter()
            .map(|ident| ident.value.as_str())
            .collect::<Vec<_>>()
            .join(".")),
        Expr::Nested(inner) => field_name(inner),
        other => Err(AstError::Unsupported(format!(
            "left operand must be a column reference, found {other}"
        ))),
    }
}

fn lower_literal(expr: &Expr) -> Result<Literal, AstError> {
    match expr {
        Expr::Value(Value::SingleQuotedString(text) | Value::DoubleQuotedString(text)) => {
            Ok(Literal::Text(text.clone()))
        }
        Expr::Value(Value::Number(number, _)) => Ok(Literal::Number(number.clone())),
        Expr::Value(Value::Boolean(flag)) => Ok(Literal::Bool(*flag)),
        Expr::Value(Value::Null) => Ok(Literal::Null),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr: inner,
        } => match lower_literal(inner)? {
            Literal::Number(number) => Ok(Literal::Number(format!("-{number}"))),
            other => Err(AstError::Unsupported(format!(
                "negation of non-numeric literal {other:?}"
            ))),
        },
        Expr::Nested(inner) => lower_literal(inner),
        other => Err(AstError::Unsupported(format!(
            "right operand must be a literal, found {other}"
        ))),
    }
}

fn lower_result(expr: &Expr) -> Result<CaseResult, AstError> {
    match expr {
        Expr::Value(Value::Null) => Ok(CaseResult::Null),
        Expr::Identifier(_) | Expr::CompoundIdentifier(_) => {
            Ok(CaseResult::FieldRef(field_name(expr)?))
        }
        Expr::Value(Value::SingleQuotedString(text) | Value::DoubleQuotedString(text)) => {
            Ok(CaseResult::Literal(text.clone()))
        }
        Expr::Value(Value::Number(number, _)) => Ok(CaseResult::Literal(number.clone())),
        Expr::Value(Value::Boolean(flag)) => Ok(CaseResult::Literal(flag.to_string())),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr: inner,
        } => match lower_result(inner)? {
            CaseResult::Literal(number) => Ok(CaseResult::Literal(format!("-{number}"))),
            other => Err(AstError::Unsupported(format!(
                "negation of THEN result {other:?}"
            ))),
        },
        Expr::Nested(inner) => lower_result(inner),
        other => Err(AstError::Unsupported(format!("THEN result: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use crate::{AstError, CaseResult, CompareOp, CondExpr, Connector, Literal, TestKeyword};

    use super::parse_rule_query;

    #[test]
    fn lowers_two_clause_case_with_alias() {
        let case = parse_rule_query(
            "SELECT CASE WHEN status = 'A' THEN 'Active' \
             WHEN status = 'B' THEN 'Blocked' END AS state",
        )
        .expect("lower");

        assert_eq!(case.alias, "state");
        assert_eq!(case.clauses.len(), 2);
        assert_eq!(
            case.clauses[0].condition,
            CondExpr::Compare {
                field: "status".to_owned(),
                op: CompareOp::Eq,
                value: Literal::Text("A".to_owned()),
            }
        );
        assert_eq!(
            case.clauses[1].result,
            CaseResult::Literal("Blocked".to_owned())
        );
    }

    #[test]
    fn lowers_logical_in_null_and_like_predicates() {
        let case = parse_rule_query(
            "SELECT CASE \
             WHEN age >= 18 AND age < 65 THEN 'adult' \
             WHEN code IN ('X', 'Y') THEN NULL \
             WHEN flag IS NOT NULL THEN other_col \
             WHEN name NOT LIKE 'tmp%' THEN 1 \
             END AS bucket",
        )
        .expect("lower");

        assert_eq!(case.clauses.len(), 4);
        assert!(matches!(
            case.clauses[0].condition,
            CondExpr::Logical {
                connector: Connector::And,
                ..
            }
        ));
        assert_eq!(
            case.clauses[1].condition,
            CondExpr::InList {
                field: "code".to_owned(),
                negated: false,
                values: vec![
                    Literal::Text("X".to_owned()),
                    Literal::Text("Y".to_owned()),
                ],
            }
        );
        assert_eq!(case.clauses[1].result, CaseResult::Null);
        assert_eq!(
            case.clauses[2].condition,
            CondExpr::NullTest {
                field: "flag".to_owned(),
                negated: true,
                keyword: TestKeyword::Null,
            }
        );
        assert_eq!(
            case.clauses[2].result,
            CaseResult::FieldRef("other_col".to_owned())
        );
        assert_eq!(
            case.clauses[3].condition,
            CondExpr::PatternMatch {
                field: "name".to_owned(),
                negated: true,
                pattern: "tmp%".to_owned(),
            }
        );
        assert_eq!(case.clauses[3].result, CaseResult::Literal("1".to_owned()));
    }

    #[test]
    fn compound_identifiers_join_with_dots() {
        let case =
            parse_rule_query("SELECT CASE WHEN t.status = 'A' THEN t.label END AS state")
                .expect("lower");
        assert_eq!(
            case.clauses[0].condition,
            CondExpr::Compare {
                field: "t.status".to_owned(),
                op: CompareOp::Eq,
                value: Literal::Text("A".to_owned()),
            }
        );
        assert_eq!(
            case.clauses[0].result,
            CaseResult::FieldRef("t.label".to_owned())
        );
    }

    #[test]
    fn negative_numbers_keep_their_sign() {
        let case = parse_rule_query("SELECT CASE WHEN delta < -3.5 THEN -1 END AS sign")
            .expect("lower");
        assert_eq!(
            case.clauses[0].condition,
            CondExpr::Compare {
                field: "delta".to_owned(),
                op: CompareOp::Lt,
                value: Literal::Number("-3.5".to_owned()),
            }
        );
        assert_eq!(case.clauses[0].result, CaseResult::Literal("-1".to_owned()));
    }

    #[test]
    fn else_branch_is_dropped() {
        let case = parse_rule_query(
            "SELECT CASE WHEN status = 'A' THEN 'Active' ELSE 'Other' END AS state",
        )
        .expect("lower");
        assert_eq!(case.clauses.len(), 1);
    }

    #[test]
    fn zero_when_clauses_lower_to_an_empty_rule_case() {
        // Degenerate but valid per the error-handling contract.
        let case = parse_rule_query("SELECT CASE ELSE 'x' END AS state");
        // Some dialects refuse CASE without WHEN at parse time; either an
        // empty clause list or a parser error is acceptable here, but never
        // a panic.
        if let Ok(case) = case {
            assert!(case.clauses.is_empty());
        }
    }

    #[test]
    fn case_without_alias_is_rejected() {
        let err = parse_rule_query("SELECT CASE WHEN a = 1 THEN 'x' END").unwrap_err();
        assert!(matches!(err, AstError::MissingAlias));
    }

    #[test]
    fn select_without_case_is_rejected() {
        let err = parse_rule_query("SELECT a, b FROM t").unwrap_err();
        assert!(matches!(err, AstError::MissingCase));
    }

    #[test]
    fn simple_form_case_is_unsupported() {
        let err = parse_rule_query("SELECT CASE status WHEN 'A' THEN 'Active' END AS state")
            .unwrap_err();
        assert!(matches!(err, AstError::Unsupported(_)));
    }

    #[test]
    fn function_call_condition_is_unsupported() {
        let err = parse_rule_query("SELECT CASE WHEN length(a) = 1 THEN 'x' END AS state")
            .unwrap_err();
        assert!(matches!(err, AstError::Unsupported(_)));
    }

    #[test]
    fn subquery_result_is_unsupported() {
        let err = parse_rule_query(
            "SELECT CASE WHEN a = 1 THEN (SELECT b FROM t) END AS state",
        )
        .unwrap_err();
        assert!(matches!(err, AstError::Unsupported(_)));
    }

    #[test]
    fn multiple_statements_are_rejected() {
        let err = parse_rule_query("SELECT 1; SELECT 2").unwrap_err();
        assert!(matches!(err, AstError::StatementCount(2)));
    }
}
