use serde::Deserialize;
use serde_json::{Map, Value};

/// Response of `GET /ds/view/columns/{dataset}/{view}/{user}`
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ViewColumns {
    /// Column names keyed by their position, e.g. `{"1": "name", "2": "owner"}`
    #[serde(default)]
    pub columns: Value,
    #[serde(rename = "columnAttrs", default)]
    pub column_attrs: Vec<ColumnAttr>,
    #[serde(default)]
    pub keys: Vec<Value>,
    #[serde(default)]
    pub filters: Value,
}

/// Display attributes of one column
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ColumnAttr {
    #[serde(default)]
    pub field: Option<String>,
    /// Editor kind, which doubles as the column's type
    #[serde(default)]
    pub editor: Option<Value>,
    #[serde(default)]
    pub width: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ViewColumns {
    /// Column names ordered by their numeric position.
    ///
    /// Positions that are not non-negative integers sort as 0; ties keep the
    /// Gateway's order.
    pub fn ordered_column_names(&self) -> Vec<String> {
        let Some(columns) = self.columns.as_object() else {
            return Vec::new();
        };

        let mut positioned: Vec<(u64, &Value)> = columns
            .iter()
            .map(|(key, name)| (column_position(key), name))
            .collect();
        positioned.sort_by_key(|(position, _)| *position);

        positioned
            .into_iter()
            .map(|(_, name)| match name {
                Value::String(name) => name.clone(),
                other => other.to_string(),
            })
            .collect()
    }

    pub fn attr_for(&self, column: &str) -> Option<&ColumnAttr> {
        self.column_attrs
            .iter()
            .find(|attr| attr.field.as_deref() == Some(column))
    }
}

/// Plain ASCII digits only; signs and whitespace make a key non-numeric
fn column_position(key: &str) -> u64 {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return 0;
    }
    key.parse().unwrap_or(0)
}
