use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// 流程变量值
///
/// 封闭的带标签变体，条件求值按类型进行比较。序列化为无标签 JSON，
/// 因此 `true`、`3`、`"Alice"` 可以直接映射到对应变体。
/// 时间戳写成 `{"$timestamp": "<RFC 3339>"}`，与形似日期的字符串区分开。
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VariableValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Timestamp(#[serde(with = "tagged_timestamp")] DateTime<Utc>),
    String(String),
}

mod tagged_timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Tagged {
        #[serde(rename = "$timestamp")]
        at: DateTime<Utc>,
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        Tagged { at: *value }.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        Tagged::deserialize(deserializer).map(|tagged| tagged.at)
    }
}

impl VariableValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            VariableValue::Boolean(_) => "boolean",
            VariableValue::Integer(_) => "integer",
            VariableValue::Float(_) => "float",
            VariableValue::Timestamp(_) => "timestamp",
            VariableValue::String(_) => "string",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            VariableValue::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            VariableValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            VariableValue::Integer(value) => Some(*value as f64),
            VariableValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            VariableValue::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            VariableValue::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    /// 同类比较；整数与浮点数互相提升，其余跨类型比较返回 `None`
    pub fn compare(&self, other: &VariableValue) -> Option<Ordering> {
        match (self, other) {
            (VariableValue::Boolean(a), VariableValue::Boolean(b)) => Some(a.cmp(b)),
            (VariableValue::Integer(a), VariableValue::Integer(b)) => Some(a.cmp(b)),
            (VariableValue::String(a), VariableValue::String(b)) => Some(a.cmp(b)),
            (VariableValue::Timestamp(a), VariableValue::Timestamp(b)) => Some(a.cmp(b)),
            // 表达式里的日期只能写成字符串字面量
            (VariableValue::Timestamp(a), VariableValue::String(b)) => {
                b.parse::<DateTime<Utc>>().ok().map(|b| a.cmp(&b))
            }
            (VariableValue::String(a), VariableValue::Timestamp(b)) => {
                a.parse::<DateTime<Utc>>().ok().map(|a| a.cmp(b))
            }
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }

    pub fn loosely_equals(&self, other: &VariableValue) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// 从任意 JSON 值转换；数组、null 以及 `$timestamp` 以外的对象不是合法的流程变量
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(VariableValue::Boolean(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(VariableValue::Integer)
                .or_else(|| n.as_f64().map(VariableValue::Float)),
            serde_json::Value::String(s) => Some(VariableValue::String(s.clone())),
            serde_json::Value::Object(_) => serde_json::from_value(value.clone())
                .ok()
                .filter(|parsed| matches!(parsed, VariableValue::Timestamp(_))),
            _ => None,
        }
    }
}

impl fmt::Display for VariableValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VariableValue::Boolean(value) => write!(f, "{value}"),
            VariableValue::Integer(value) => write!(f, "{value}"),
            VariableValue::Float(value) => write!(f, "{value}"),
            VariableValue::Timestamp(value) => write!(f, "{}", value.to_rfc3339()),
            VariableValue::String(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for VariableValue {
    fn from(value: bool) -> Self {
        VariableValue::Boolean(value)
    }
}

impl From<i64> for VariableValue {
    fn from(value: i64) -> Self {
        VariableValue::Integer(value)
    }
}

impl From<i32> for VariableValue {
    fn from(value: i32) -> Self {
        VariableValue::Integer(value as i64)
    }
}

impl From<u32> for VariableValue {
    fn from(value: u32) -> Self {
        VariableValue::Integer(value as i64)
    }
}

impl From<f64> for VariableValue {
    fn from(value: f64) -> Self {
        VariableValue::Float(value)
    }
}

impl From<DateTime<Utc>> for VariableValue {
    fn from(value: DateTime<Utc>) -> Self {
        VariableValue::Timestamp(value)
    }
}

impl From<&str> for VariableValue {
    fn from(value: &str) -> Self {
        VariableValue::String(value.to_string())
    }
}

impl From<String> for VariableValue {
    fn from(value: String) -> Self {
        VariableValue::String(value)
    }
}
