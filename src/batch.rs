//! Client-side splitting of `;`-delimited command text.
//!
//! Each statement gets its own slice of the flat parameter list: tokens are matched to
//! parameters in order, and every token is re-emitted as the `:name` marker the
//! parameter binds under so the segment's text and bindings agree.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::error::Db2Error;
use crate::marshal::bind_name;
use crate::parameters::Parameter;
use crate::translation::{TokenScanner, splice};
use crate::types::Value;

static STATEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<q>[^;]+);?").expect("statement pattern is valid"));

/// One statement of a batch with the parameters it consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSegment {
    /// Statement as written.
    pub source: String,
    /// Statement with each token replaced by its parameter's `:name` marker.
    pub text: String,
    pub parameters: Vec<Parameter>,
}

/// Split text on `;` into statements.
///
/// Semicolons inside quoted text are not special-cased. Whitespace-only runs are dropped.
#[must_use]
pub fn split_statements(sql: &str) -> Vec<&str> {
    STATEMENT
        .captures_iter(sql)
        .filter_map(|caps| caps.name("q"))
        .map(|m| m.as_str())
        .filter(|stmt| !stmt.trim().is_empty())
        .collect()
}

fn is_skipped(param: &Parameter) -> bool {
    matches!(param.value(), Value::XmlDeclaration(_))
}

/// Split `sql` and distribute `params` over the statements.
///
/// Text with fewer than two statements comes back as a single segment holding the
/// original text and all parameters. Otherwise each `:name`, `@name` or `?` token takes
/// the next parameter from `params` (skipping XML declaration values).
///
/// # Errors
///
/// Returns `Db2Error::ParameterUnderflow` when the statements hold more tokens than there
/// are bindable parameters.
pub fn split_batch(sql: &str, params: &[Parameter]) -> Result<Vec<BatchSegment>, Db2Error> {
    let statements = split_statements(sql);
    if statements.len() < 2 {
        return Ok(vec![BatchSegment {
            source: sql.to_string(),
            text: sql.to_string(),
            parameters: params.iter().map(Parameter::duplicate).collect(),
        }]);
    }

    let mut cursor = 0;
    let mut required = 0;
    let mut segments = Vec::with_capacity(statements.len());
    let mut underflow = false;
    for statement in statements {
        let mut consumed = Vec::new();
        let text = splice(statement, TokenScanner::new(statement).with_positional(), |_| {
            required += 1;
            while params.get(cursor).is_some_and(is_skipped) {
                cursor += 1;
            }
            match params.get(cursor) {
                Some(param) => {
                    cursor += 1;
                    consumed.push(param.duplicate());
                    Cow::Owned(format!(":{}", bind_name(param)))
                }
                None => {
                    underflow = true;
                    Cow::Borrowed("")
                }
            }
        })
        .into_owned();
        segments.push(BatchSegment {
            source: statement.to_string(),
            text,
            parameters: consumed,
        });
    }

    if underflow {
        let supplied = params.iter().filter(|p| !is_skipped(p)).count();
        return Err(Db2Error::ParameterUnderflow { required, supplied });
    }
    debug!(segments = segments.len(), parameters = cursor, "split batch");
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marshal::xml::{XmlDeclaration, XmlDocument};

    fn p(name: &str, value: impl Into<Value>) -> Parameter {
        Parameter::new(name, value)
    }

    #[test]
    fn splits_on_semicolons() {
        assert_eq!(split_statements("SELECT 1;SELECT 2;"), vec!["SELECT 1", "SELECT 2"]);
        assert_eq!(split_statements("SELECT 1; \n"), vec!["SELECT 1"]);
        assert_eq!(split_statements("SELECT 'a;b'"), vec!["SELECT 'a", "b'"]);
    }

    #[test]
    fn single_statement_is_passed_through() {
        let params = vec![p(":ID", 1_i32)];
        let segments = split_batch("SELECT * FROM T WHERE ID = :ID;", &params).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "SELECT * FROM T WHERE ID = :ID;");
        assert_eq!(segments[0].parameters.len(), 1);
    }

    #[test]
    fn redistributes_positional_tokens() {
        let params = vec![p("id", 1_i32), p("p", "x"), p("categoryCode", 7_i64)];
        let sql = "SELECT * FROM HEAD WHERE ID = ?;\nSELECT * FROM LINE WHERE P = ? AND C = ?;";
        let segments = split_batch(sql, &params).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "SELECT * FROM HEAD WHERE ID = :id");
        assert_eq!(segments[1].text, "\nSELECT * FROM LINE WHERE P = :p AND C = :categoryCode");
        let names: Vec<&str> = segments[1].parameters.iter().map(Parameter::name).collect();
        assert_eq!(names, vec!["p", "categoryCode"]);
    }

    #[test]
    fn conserves_parameters_across_segments() {
        let params = vec![p(":A", 1_i32), p(":B", 2_i32), p(":C", 3_i32), p(":D", 4_i32)];
        let sql = "UPDATE T SET X = :A WHERE Y = @B; DELETE FROM T WHERE Z = ?; INSERT INTO T VALUES (:D)";
        let segments = split_batch(sql, &params).unwrap();
        let total: usize = segments.iter().map(|s| s.parameters.len()).sum();
        assert_eq!(total, params.len());
        assert_eq!(segments[1].text, " DELETE FROM T WHERE Z = :C");
        assert!(segments.iter().flat_map(|s| &s.parameters).all(|p| !p.is_owned()));
    }

    #[test]
    fn markers_in_comments_and_literals_do_not_consume() {
        let params = vec![p(":A", 1_i32), p(":B", 2_i32)];
        let sql = "SELECT ':x', ? FROM T -- ?\n; SELECT ? FROM T";
        let segments = split_batch(sql, &params).unwrap();
        assert_eq!(segments[0].text, "SELECT ':x', :A FROM T -- ?\n");
        assert_eq!(segments[1].text, " SELECT :B FROM T");
    }

    #[test]
    fn skips_xml_declaration_values() {
        let params = vec![
            p(":DOC0", Value::XmlDeclaration(XmlDeclaration::new("1.0", None, None))),
            p(":A", 1_i32),
            p(":B", 2_i32),
        ];
        let segments = split_batch("SELECT ? FROM T; SELECT ? FROM U", &params).unwrap();
        assert_eq!(segments[0].text, "SELECT :A FROM T");
        assert_eq!(segments[1].text, " SELECT :B FROM U");
    }

    #[test]
    fn xml_element_token_uses_its_bind_name() {
        let doc = XmlDocument::parse("<r/>").unwrap();
        let params = vec![
            p(":XML1", Value::XmlDeclaration(XmlDeclaration::new("1.0", None, None))),
            p(":XML2", Value::XmlElement(doc)),
            p(":ID", 5_i32),
        ];
        let sql = "INSERT INTO X(DOC) VALUES XMLPARSE(DOCUMENT :XML); DELETE FROM Y WHERE ID = :ID";
        let segments = split_batch(sql, &params).unwrap();
        assert_eq!(segments[0].text, "INSERT INTO X(DOC) VALUES XMLPARSE(DOCUMENT :XML)");
        assert_eq!(segments[0].parameters[0].name(), ":XML2");
        assert_eq!(segments[1].text, " DELETE FROM Y WHERE ID = :ID");
    }

    #[test]
    fn underflow_fails_fast() {
        let params = vec![p(":A", 1_i32)];
        let err = split_batch("SELECT ? FROM T; SELECT ?, ? FROM U", &params).unwrap_err();
        assert!(matches!(err, Db2Error::ParameterUnderflow { required: 3, supplied: 1 }));
    }
}
