use serde::{Deserialize, Deserializer};
use serde_json::Value;

const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Response of `GET /ds/dsList/{user}`
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct DatasetList {
    #[serde(rename = "dbList", default, deserialize_with = "lenient_entries")]
    pub db_list: Vec<DatasetEntry>,
}

/// A dataset listing entry; older Gateways return bare names
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DatasetEntry {
    Detailed(DatasetInfo),
    Name(String),
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct DatasetInfo {
    /// Usually a string, but some Gateways store numeric names
    #[serde(default)]
    pub name: Option<Value>,
    /// Size in bytes
    #[serde(rename = "sizeOnDisk", default)]
    pub size_on_disk: Option<f64>,
    #[serde(default)]
    pub perms: Option<Perms>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct Perms {
    #[serde(default)]
    pub owner: Option<Value>,
}

impl DatasetInfo {
    pub fn name(&self) -> String {
        display_or_unknown(self.name.as_ref())
    }

    /// Size in mebibytes
    pub fn size_mib(&self) -> f64 {
        self.size_on_disk.unwrap_or(0.0) / BYTES_PER_MIB
    }

    pub fn owner(&self) -> String {
        display_or_unknown(self.perms.as_ref().and_then(|perms| perms.owner.as_ref()))
    }
}

fn display_or_unknown(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => "unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

/// Decode each entry on its own, dropping the ones with an unexpected shape
fn lenient_entries<'de, D>(deserializer: D) -> Result<Vec<DatasetEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<Value>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(raw
        .into_iter()
        .filter_map(|entry| serde_json::from_value(entry).ok())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mixed_entries_decode_and_junk_is_skipped() {
        let list: DatasetList = serde_json::from_value(json!({
            "dbList": [
                {"name": "sales", "sizeOnDisk": 2097152, "perms": {"owner": "alice"}},
                "legacy",
                42,
                null
            ]
        }))
        .unwrap();

        assert_eq!(list.db_list.len(), 2);
        match &list.db_list[0] {
            DatasetEntry::Detailed(info) => {
                assert_eq!(info.name(), "sales");
                assert_eq!(info.size_mib(), 2.0);
                assert_eq!(info.owner(), "alice");
            }
            other => panic!("unexpected entry {other:?}"),
        }
        assert_eq!(list.db_list[1], DatasetEntry::Name("legacy".to_string()));
    }

    #[test]
    fn numeric_names_are_kept() {
        let list: DatasetList = serde_json::from_value(json!({
            "dbList": [{"name": 2024, "sizeOnDisk": 0, "perms": {"owner": 7}}]
        }))
        .unwrap();

        assert_eq!(list.db_list.len(), 1);
        match &list.db_list[0] {
            DatasetEntry::Detailed(info) => {
                assert_eq!(info.name(), "2024");
                assert_eq!(info.owner(), "7");
            }
            other => panic!("unexpected entry {other:?}"),
        }
    }

    #[test]
    fn missing_details_fall_back() {
        let info: DatasetInfo = serde_json::from_value(json!({})).unwrap();
        assert_eq!(info.name(), "unknown");
        assert_eq!(info.size_mib(), 0.0);
        assert_eq!(info.owner(), "unknown");
    }

    #[test]
    fn missing_or_null_list_is_empty() {
        let list: DatasetList = serde_json::from_value(json!({})).unwrap();
        assert!(list.db_list.is_empty());
        let list: DatasetList = serde_json::from_value(json!({"dbList": null})).unwrap();
        assert!(list.db_list.is_empty());
    }
}
