use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One row of a dataset, keyed by column name
pub type Row = Map<String, Value>;

/// A single query predicate, `{field, type, value}`.
///
/// Any additional keys supplied by the caller are forwarded to the Gateway
/// untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Filter {
    pub fn new<F: Into<String>, K: Into<String>>(field: F, kind: K, value: Value) -> Self {
        Self {
            field: Some(field.into()),
            kind: Some(kind.into()),
            value: Some(value),
            extra: Map::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "ASC", alias = "Asc")]
    Asc,
    #[serde(alias = "DESC", alias = "Desc")]
    Desc,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sorter {
    pub field: String,
    pub dir: SortDirection,
}

/// Body of `POST /ds/viewViaPost/{dataset}/{view}/{user}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ViewQuery {
    pub filters: Vec<Filter>,
    /// 1-based page number
    pub page: u64,
    pub per_page: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sorters: Option<Vec<Sorter>>,
}

impl ViewQuery {
    pub fn page_of(filters: Vec<Filter>, page: u64, per_page: u64) -> Self {
        Self {
            filters,
            page,
            per_page,
            sorters: None,
        }
    }

    /// Smallest possible query; only useful for the `total` it reports
    pub fn count_only() -> Self {
        Self::page_of(Vec::new(), 1, 1)
    }

    pub fn with_sorter<S: Into<String>>(mut self, field: S, dir: SortDirection) -> Self {
        self.sorters.get_or_insert_with(Vec::new).push(Sorter {
            field: field.into(),
            dir,
        });
        self
    }
}

/// One page of query results
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ViewPage {
    #[serde(default)]
    pub data: Vec<Row>,
    /// Total number of matching rows, independent of the page size
    #[serde(default)]
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorters_are_omitted_unless_set() {
        let body = serde_json::to_value(ViewQuery::count_only()).unwrap();
        assert_eq!(body, json!({"filters": [], "page": 1, "per_page": 1}));

        let body = serde_json::to_value(
            ViewQuery::page_of(vec![Filter::new("status", "eq", json!("open"))], 2, 100)
                .with_sorter("created", SortDirection::Desc),
        )
        .unwrap();
        assert_eq!(
            body,
            json!({
                "filters": [{"field": "status", "type": "eq", "value": "open"}],
                "page": 2,
                "per_page": 100,
                "sorters": [{"field": "created", "dir": "desc"}]
            })
        );
    }

    #[test]
    fn filters_keep_unknown_keys() {
        let filter: Filter =
            serde_json::from_value(json!({"field": "a", "type": "like", "value": "x%", "case": false}))
                .unwrap();
        assert_eq!(filter.extra.get("case"), Some(&json!(false)));
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({"field": "a", "type": "like", "value": "x%", "case": false})
        );
    }

    #[test]
    fn view_page_defaults_missing_keys() {
        let page: ViewPage = serde_json::from_value(json!({})).unwrap();
        assert!(page.data.is_empty());
        assert_eq!(page.total, 0);
    }
}
