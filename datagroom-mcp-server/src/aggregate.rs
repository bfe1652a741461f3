//! In-memory aggregation over a fetched page of rows.
//!
//! The Gateway has no aggregation endpoint, so the aggregate tool pulls at
//! most [`AGGREGATION_ROW_CAP`] rows and reduces them here.

use std::collections::HashMap;

use datagroom_gateway::models::Row;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// Upper bound on rows fetched for one aggregation; larger datasets are truncated
pub const AGGREGATION_ROW_CAP: u64 = 10_000;

/// Bucket for rows whose group-by value is missing, null, or not a scalar
pub const NULL_GROUP: &str = "null";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOp {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateOp {
    fn prefix(self) -> &'static str {
        match self {
            AggregateOp::Count => "count",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
        }
    }
}

/// One requested computation, e.g. `{"operation": "sum", "field": "amount"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregationSpec {
    pub operation: AggregateOp,
    /// Ignored by `count`
    #[serde(default)]
    pub field: Option<String>,
}

impl AggregationSpec {
    /// Key of the computed value: `count`, or `<op>_<field>`
    pub fn result_key(&self) -> String {
        match self.operation {
            AggregateOp::Count => "count".to_string(),
            op => format!("{}_{}", op.prefix(), self.field.as_deref().unwrap_or_default()),
        }
    }

    pub fn new(operation: AggregateOp, field: Option<&str>) -> Self {
        Self {
            operation,
            field: field.map(str::to_owned),
        }
    }
}

/// Compute the requested aggregations.
///
/// Without `group_by` the result is a single summary; with it there is one
/// entry per distinct value (first-seen order), each starting with `group`.
pub fn aggregate(rows: &[Row], specs: &[AggregationSpec], group_by: Option<&str>) -> Vec<Row> {
    match group_by {
        None => {
            let all: Vec<&Row> = rows.iter().collect();
            vec![summarize(&all, specs)]
        }
        Some(field) => group_rows(rows, field)
            .into_iter()
            .map(|(group, members)| {
                let mut result = Row::new();
                result.insert("group".to_string(), group);
                result.extend(summarize(&members, specs));
                result
            })
            .collect(),
    }
}

fn group_rows<'a>(rows: &'a [Row], field: &str) -> Vec<(Value, Vec<&'a Row>)> {
    let mut groups: Vec<(Value, Vec<&'a Row>)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let group = match row.get(field) {
            Some(value @ (Value::String(_) | Value::Number(_) | Value::Bool(_))) => value.clone(),
            _ => Value::String(NULL_GROUP.to_string()),
        };
        // scalars serialize canonically, so the JSON text is a faithful key
        let key = group.to_string();

        match index.get(&key) {
            Some(&position) => groups[position].1.push(row),
            None => {
                index.insert(key, groups.len());
                groups.push((group, vec![row]));
            }
        }
    }

    groups
}

fn summarize(rows: &[&Row], specs: &[AggregationSpec]) -> Row {
    let mut result = Row::new();

    for spec in specs {
        let numbers = || {
            spec.field
                .as_deref()
                .map(|field| numbers_of(rows, field))
                .filter(|numbers| !numbers.is_empty())
        };

        let value = match spec.operation {
            AggregateOp::Count => Some(Value::from(rows.len())),
            AggregateOp::Sum => numbers().map(|n| sum(&n)),
            AggregateOp::Avg => numbers().map(|n| Value::from(float_sum(&n) / n.len() as f64)),
            AggregateOp::Min => numbers().map(|n| extreme(&n, |candidate, best| candidate < best)),
            AggregateOp::Max => numbers().map(|n| extreme(&n, |candidate, best| candidate > best)),
        };

        if let Some(value) = value {
            result.insert(spec.result_key(), value);
        }
    }

    result
}

/// Values of `field` that are JSON numbers; anything else is skipped
fn numbers_of<'a>(rows: &[&'a Row], field: &str) -> Vec<&'a Number> {
    rows.iter()
        .filter_map(|&row| match row.get(field) {
            Some(Value::Number(number)) => Some(number),
            _ => None,
        })
        .collect()
}

/// Integer sum while every value is an integer and nothing overflows
fn sum(numbers: &[&Number]) -> Value {
    let integer_sum = numbers
        .iter()
        .try_fold(0i64, |acc, number| number.as_i64().and_then(|n| acc.checked_add(n)));

    match integer_sum {
        Some(total) => Value::from(total),
        None => Value::from(float_sum(numbers)),
    }
}

fn float_sum(numbers: &[&Number]) -> f64 {
    numbers.iter().filter_map(|number| number.as_f64()).sum()
}

/// The first number that wins every comparison, returned as given
fn extreme(numbers: &[&Number], wins: impl Fn(f64, f64) -> bool) -> Value {
    let mut best = numbers[0];
    for &candidate in &numbers[1..] {
        if let (Some(c), Some(b)) = (candidate.as_f64(), best.as_f64()) {
            if wins(c, b) {
                best = candidate;
            }
        }
    }
    Value::Number(best.clone())
}
