//! 平台查询条件
//!
//! 平台的 filter 接口接受一个 JSON 对象：字段等值匹配，或 `{"$in": [...]}` 成员匹配。

use serde::Serialize;
use serde_json::{Map, Value};

/// 实体查询条件（多个条件之间为 AND）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    clauses: Map<String, Value>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// 字段等值条件
    pub fn eq(mut self, field: &str, value: impl Serialize) -> Self {
        self.clauses.insert(
            field.to_string(),
            serde_json::to_value(value).unwrap_or(Value::Null),
        );
        self
    }

    /// 字段取值属于给定集合
    pub fn is_in<V: Serialize>(mut self, field: &str, values: &[V]) -> Self {
        let values = values
            .iter()
            .map(|v| serde_json::to_value(v).unwrap_or(Value::Null))
            .collect::<Vec<_>>();
        self.clauses
            .insert(field.to_string(), serde_json::json!({ "$in": values }));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &Map<String, Value> {
        &self.clauses
    }

    pub fn to_json(&self) -> Value {
        Value::Object(self.clauses.clone())
    }

    /// 判断一条记录是否满足全部条件
    ///
    /// 记录字段为数组时，只要数组中有一个元素命中即可。
    pub fn matches(&self, record: &Value) -> bool {
        self.clauses.iter().all(|(field, expected)| {
            let actual = record.get(field).unwrap_or(&Value::Null);
            match expected.get("$in").and_then(Value::as_array) {
                Some(candidates) => candidates.iter().any(|c| value_hits(actual, c)),
                None => value_hits(actual, expected),
            }
        })
    }
}

fn value_hits(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::Array(items) => items.iter().any(|item| item == expected),
        other => other == expected,
    }
}

/// 排序键，平台约定 `-field` 表示降序
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

impl SortKey {
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix('-') {
            Some(field) => Self {
                field: field.to_string(),
                descending: true,
            },
            None => Self {
                field: raw.to_string(),
                descending: false,
            },
        }
    }

    /// 比较两条记录，缺失字段排在最后
    pub fn compare(&self, a: &Value, b: &Value) -> std::cmp::Ordering {
        use std::cmp::Ordering;

        let (a, b) = (a.get(&self.field), b.get(&self.field));
        let ordering = match (a, b) {
            (None, None) | (Some(Value::Null), Some(Value::Null)) => return Ordering::Equal,
            (None | Some(Value::Null), _) => return Ordering::Greater,
            (_, None | Some(Value::Null)) => return Ordering::Less,
            (Some(Value::Number(x)), Some(Value::Number(y))) => {
                let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
            (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
            _ => Ordering::Equal,
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}
