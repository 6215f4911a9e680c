use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::error::{FlowError, Result};
use crate::state::{VariableScope, VariableValue};

/// 顺序流条件
///
/// 对变量作用域求值的谓词。缺失的键或类型不匹配一律求值为 `false`
/// （`NotEquals`、`Absent` 除外）。
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    Equals { key: String, value: VariableValue },
    NotEquals { key: String, value: VariableValue },
    GreaterThan { key: String, value: VariableValue },
    GreaterOrEqual { key: String, value: VariableValue },
    LessThan { key: String, value: VariableValue },
    LessOrEqual { key: String, value: VariableValue },
    Exists { key: String },
    Absent { key: String },
    IsTrue { key: String },
    IsFalse { key: String },
    All { conditions: Vec<Condition> },
    Any { conditions: Vec<Condition> },
    Not { condition: Box<Condition> },
    /// 代码中构造的自定义谓词，不参与序列化
    #[serde(skip)]
    Custom(ConditionFn),
}

/// 自定义条件函数
#[derive(Clone)]
pub struct ConditionFn(Arc<dyn Fn(&VariableScope) -> bool + Send + Sync>);

impl fmt::Debug for ConditionFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConditionFn(..)")
    }
}

impl Condition {
    pub fn equals(key: impl Into<String>, value: impl Into<VariableValue>) -> Self {
        Condition::Equals {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn not_equals(key: impl Into<String>, value: impl Into<VariableValue>) -> Self {
        Condition::NotEquals {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn greater_than(key: impl Into<String>, value: impl Into<VariableValue>) -> Self {
        Condition::GreaterThan {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn less_than(key: impl Into<String>, value: impl Into<VariableValue>) -> Self {
        Condition::LessThan {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn exists(key: impl Into<String>) -> Self {
        Condition::Exists { key: key.into() }
    }

    pub fn absent(key: impl Into<String>) -> Self {
        Condition::Absent { key: key.into() }
    }

    pub fn is_true(key: impl Into<String>) -> Self {
        Condition::IsTrue { key: key.into() }
    }

    pub fn is_false(key: impl Into<String>) -> Self {
        Condition::IsFalse { key: key.into() }
    }

    pub fn negate(condition: Condition) -> Self {
        Condition::Not {
            condition: Box::new(condition),
        }
    }

    pub fn custom<F>(func: F) -> Self
    where
        F: Fn(&VariableScope) -> bool + Send + Sync + 'static,
    {
        Condition::Custom(ConditionFn(Arc::new(func)))
    }

    pub fn evaluate(&self, scope: &VariableScope) -> bool {
        match self {
            Condition::Equals { key, value } => scope
                .get(key)
                .is_some_and(|current| current.loosely_equals(value)),
            Condition::NotEquals { key, value } => scope
                .get(key)
                .map_or(true, |current| !current.loosely_equals(value)),
            Condition::GreaterThan { key, value } => {
                compare(scope, key, value, |ord| ord == Ordering::Greater)
            }
            Condition::GreaterOrEqual { key, value } => {
                compare(scope, key, value, |ord| ord != Ordering::Less)
            }
            Condition::LessThan { key, value } => {
                compare(scope, key, value, |ord| ord == Ordering::Less)
            }
            Condition::LessOrEqual { key, value } => {
                compare(scope, key, value, |ord| ord != Ordering::Greater)
            }
            Condition::Exists { key } => scope.contains(key),
            Condition::Absent { key } => !scope.contains(key),
            Condition::IsTrue { key } => {
                scope.get(key).and_then(VariableValue::as_bool) == Some(true)
            }
            Condition::IsFalse { key } => {
                scope.get(key).and_then(VariableValue::as_bool) == Some(false)
            }
            Condition::All { conditions } => conditions.iter().all(|c| c.evaluate(scope)),
            Condition::Any { conditions } => conditions.iter().any(|c| c.evaluate(scope)),
            Condition::Not { condition } => !condition.evaluate(scope),
            Condition::Custom(func) => (func.0)(scope),
        }
    }

    /// 解析简单条件表达式
    ///
    /// 支持 `key`、`!key`、`key == 字面量`、`!=`、`>`、`>=`、`<`、`<=`，
    /// 以及用 `&&` / `||` 连接的组合（`&&` 优先，不支持括号）。
    /// 表达式可以包在 `${ }` 中。
    pub fn parse(expression: &str) -> Result<Self> {
        let trimmed = expression.trim();
        let body = trimmed
            .strip_prefix("${")
            .and_then(|rest| rest.strip_suffix('}'))
            .unwrap_or(trimmed)
            .trim();
        if body.is_empty() {
            return Err(invalid(expression, "empty expression"));
        }

        let alternatives = split_outside_quotes(body, "||");
        if alternatives.len() > 1 {
            let conditions = alternatives
                .into_iter()
                .map(|part| parse_conjunction(expression, part))
                .collect::<Result<Vec<_>>>()?;
            return Ok(Condition::Any { conditions });
        }
        parse_conjunction(expression, body)
    }
}

impl fmt::Debug for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Equals { key, value } => write!(f, "{key} == {value:?}"),
            Condition::NotEquals { key, value } => write!(f, "{key} != {value:?}"),
            Condition::GreaterThan { key, value } => write!(f, "{key} > {value:?}"),
            Condition::GreaterOrEqual { key, value } => write!(f, "{key} >= {value:?}"),
            Condition::LessThan { key, value } => write!(f, "{key} < {value:?}"),
            Condition::LessOrEqual { key, value } => write!(f, "{key} <= {value:?}"),
            Condition::Exists { key } => write!(f, "exists({key})"),
            Condition::Absent { key } => write!(f, "absent({key})"),
            Condition::IsTrue { key } => write!(f, "{key}"),
            Condition::IsFalse { key } => write!(f, "!{key}"),
            Condition::All { conditions } => f.debug_tuple("All").field(conditions).finish(),
            Condition::Any { conditions } => f.debug_tuple("Any").field(conditions).finish(),
            Condition::Not { condition } => write!(f, "!({condition:?})"),
            Condition::Custom(func) => func.fmt(f),
        }
    }
}

fn compare(
    scope: &VariableScope,
    key: &str,
    expected: &VariableValue,
    accept: impl Fn(Ordering) -> bool,
) -> bool {
    scope
        .get(key)
        .and_then(|current| current.compare(expected))
        .is_some_and(accept)
}

fn invalid(expression: &str, reason: impl Into<String>) -> FlowError {
    FlowError::InvalidCondition {
        expression: expression.to_string(),
        reason: reason.into(),
    }
}

fn parse_conjunction(expression: &str, body: &str) -> Result<Condition> {
    let parts = split_outside_quotes(body, "&&");
    if parts.len() == 1 {
        return parse_comparison(expression, body);
    }
    let conditions = parts
        .into_iter()
        .map(|part| parse_comparison(expression, part))
        .collect::<Result<Vec<_>>>()?;
    Ok(Condition::All { conditions })
}

const OPERATORS: [&str; 6] = ["==", "!=", ">=", "<=", ">", "<"];

fn parse_comparison(expression: &str, part: &str) -> Result<Condition> {
    let part = part.trim();
    for operator in OPERATORS {
        if let Some(index) = find_outside_quotes(part, operator) {
            let key = parse_identifier(expression, &part[..index])?;
            let value = parse_literal(expression, &part[index + operator.len()..])?;
            return Ok(match operator {
                "==" => Condition::Equals { key, value },
                "!=" => Condition::NotEquals { key, value },
                ">=" => Condition::GreaterOrEqual { key, value },
                "<=" => Condition::LessOrEqual { key, value },
                ">" => Condition::GreaterThan { key, value },
                _ => Condition::LessThan { key, value },
            });
        }
    }

    match part.strip_prefix('!') {
        Some(rest) => Ok(Condition::IsFalse {
            key: parse_identifier(expression, rest)?,
        }),
        None => Ok(Condition::IsTrue {
            key: parse_identifier(expression, part)?,
        }),
    }
}

/// 查找引号之外第一次出现 `pattern` 的字节位置
fn find_outside_quotes(text: &str, pattern: &str) -> Option<usize> {
    let mut quote = None;
    for (index, c) in text.char_indices() {
        match quote {
            Some(open) if c == open => quote = None,
            Some(_) => {}
            None if c == '\'' || c == '"' => quote = Some(c),
            None if text[index..].starts_with(pattern) => return Some(index),
            None => {}
        }
    }
    None
}

fn split_outside_quotes<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    let mut parts = Vec::new();
    let mut rest = text;
    while let Some(index) = find_outside_quotes(rest, separator) {
        parts.push(&rest[..index]);
        rest = &rest[index + separator.len()..];
    }
    parts.push(rest);
    parts
}

fn parse_identifier(expression: &str, raw: &str) -> Result<String> {
    let ident = raw.trim();
    let valid = !ident.is_empty()
        && ident
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.');
    if valid {
        Ok(ident.to_string())
    } else {
        Err(invalid(expression, format!("`{ident}` is not a variable name")))
    }
}

fn parse_literal(expression: &str, raw: &str) -> Result<VariableValue> {
    let literal = raw.trim();
    if literal.is_empty() {
        return Err(invalid(expression, "missing right-hand side"));
    }
    match literal {
        "true" => return Ok(VariableValue::Boolean(true)),
        "false" => return Ok(VariableValue::Boolean(false)),
        _ => {}
    }
    for quote in ['"', '\''] {
        if let Some(inner) = literal
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return Ok(VariableValue::String(inner.to_string()));
        }
    }
    if let Ok(integer) = literal.parse::<i64>() {
        return Ok(VariableValue::Integer(integer));
    }
    if let Ok(float) = literal.parse::<f64>() {
        return Ok(VariableValue::Float(float));
    }
    Err(invalid(expression, format!("unsupported literal `{literal}`")))
}

/// 顺序流条件既可以写成表达式字符串，也可以写成结构化对象
#[derive(Deserialize)]
#[serde(untagged)]
enum ConditionInput {
    Expression(String),
    Structured(Condition),
}

pub(crate) fn deserialize_optional<'de, D>(deserializer: D) -> std::result::Result<Option<Condition>, D::Error>
where
    D: Deserializer<'de>,
{
    let input = Option::<ConditionInput>::deserialize(deserializer)?;
    match input {
        None => Ok(None),
        Some(ConditionInput::Structured(condition)) => Ok(Some(condition)),
        Some(ConditionInput::Expression(expression)) => Condition::parse(&expression)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope() -> VariableScope {
        VariableScope::from_variables(crate::variables! {
            "approved" => true,
            "nrOfHolidays" => 3,
            "employee" => "Alice",
        })
    }

    #[test]
    fn parses_comparison_expressions() {
        let scope = scope();
        assert!(Condition::parse("approved == true").unwrap().evaluate(&scope));
        assert!(Condition::parse("${approved}").unwrap().evaluate(&scope));
        assert!(!Condition::parse("${!approved}").unwrap().evaluate(&scope));
        assert!(Condition::parse("nrOfHolidays >= 3").unwrap().evaluate(&scope));
        assert!(!Condition::parse("nrOfHolidays > 3").unwrap().evaluate(&scope));
        assert!(Condition::parse("employee == 'Alice'").unwrap().evaluate(&scope));
        assert!(Condition::parse("employee != \"Bob\"").unwrap().evaluate(&scope));
    }

    #[test]
    fn parses_combinators() {
        let scope = scope();
        let both = Condition::parse("approved && nrOfHolidays < 10").unwrap();
        assert!(both.evaluate(&scope));
        let either = Condition::parse("nrOfHolidays > 10 || employee == 'Alice'").unwrap();
        assert!(either.evaluate(&scope));
    }

    #[test]
    fn operators_inside_quotes_are_literal_text() {
        let scope = VariableScope::from_variables(crate::variables! {
            "note" => "a && b",
            "name" => "x==y",
            "route" => "left||right",
        });
        assert!(Condition::parse("note == 'a && b'").unwrap().evaluate(&scope));
        assert!(Condition::parse("name == 'x==y'").unwrap().evaluate(&scope));
        assert!(!Condition::parse("name != 'x==y'").unwrap().evaluate(&scope));
        assert!(Condition::parse("route == \"left||right\" && name == 'x==y'")
            .unwrap()
            .evaluate(&scope));
    }

    #[test]
    fn date_literals_match_timestamps_and_date_strings() {
        let due: chrono::DateTime<chrono::Utc> = "2024-05-01T08:00:00Z".parse().unwrap();
        let condition = Condition::parse("due == '2024-05-01T08:00:00Z'").unwrap();
        let as_text = VariableScope::from_variables(crate::variables! { "due" => "2024-05-01T08:00:00Z" });
        let as_stamp = VariableScope::from_variables(crate::variables! { "due" => due });
        assert!(condition.evaluate(&as_text));
        assert!(condition.evaluate(&as_stamp));
        assert!(Condition::parse("due < '2024-06-01T00:00:00Z'").unwrap().evaluate(&as_stamp));
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert!(Condition::parse("").is_err());
        assert!(Condition::parse("approved ==").is_err());
        assert!(Condition::parse("approved == maybe").is_err());
        assert!(Condition::parse("a b == 1").is_err());
    }

    #[test]
    fn missing_or_mistyped_variables_are_false() {
        let scope = scope();
        assert!(!Condition::equals("missing", true).evaluate(&scope));
        assert!(!Condition::is_true("employee").evaluate(&scope));
        assert!(!Condition::greater_than("employee", 1).evaluate(&scope));
        assert!(Condition::not_equals("missing", 1).evaluate(&scope));
        assert!(Condition::absent("missing").evaluate(&scope));
    }

    #[test]
    fn custom_condition_sees_scope() {
        let condition = Condition::custom(|scope| {
            scope
                .get("nrOfHolidays")
                .and_then(VariableValue::as_i64)
                .is_some_and(|days| days <= 5)
        });
        assert!(condition.evaluate(&scope()));
        assert!(!Condition::negate(condition).evaluate(&scope()));
    }

    #[test]
    fn structured_conditions_round_trip_through_json() {
        let condition: Condition = serde_json::from_value(serde_json::json!({
            "type": "all",
            "conditions": [
                { "type": "is_true", "key": "approved" },
                { "type": "less_than", "key": "nrOfHolidays", "value": 5 }
            ]
        }))
        .unwrap();
        assert!(condition.evaluate(&scope()));
    }
}
