use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::builder::TableBuilder;
use crate::errors::TableError;
use crate::table::ResourceTable;

/// JSON form of a resource table
///
/// ```json
/// {
///   "packages": [{
///     "id": "0x7f",
///     "name": "com.example",
///     "resources": [
///       { "id": "0x7f010000", "name": "attr/colorAccent", "value": "@null" },
///       { "id": "0x7f020000", "name": "color/accent", "value": "#ff4081" },
///       { "id": "0x7f020000", "name": "color/accent", "config": "night", "value": "#c51162" },
///       { "id": "0x7f030000", "name": "style/Base",
///         "bag": [{ "key": "attr/colorAccent", "value": "@color/accent" }] },
///       { "id": "0x7f040000", "name": "array/sizes", "items": ["1dp", "2dp"] }
///     ]
///   }]
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableDescription {
    #[serde(default)]
    pub packages: Vec<PackageDescription>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageDescription {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: u8,
    pub name: String,
    #[serde(default)]
    pub resources: Vec<ResourceDescription>,
}

/// One configuration-specific definition of a resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDescription {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub config: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bag: Option<Vec<BagItemDescription>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BagItemDescription {
    /// Attribute id or name, empty for the next array position
    #[serde(default)]
    pub key: String,
    pub value: String,
}

/// Accept ids both as JSON numbers and as `0x` prefixed strings
fn deserialize_id<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<u64>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    let raw = match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n,
        RawId::Text(text) => {
            let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                Some(hex) => u64::from_str_radix(hex, 16),
                None => text.parse::<u64>(),
            };
            parsed.map_err(|_| de::Error::custom(format!("invalid id: {:?}", text)))?
        }
    };

    T::try_from(raw).map_err(|_| de::Error::custom(format!("id out of range: {:#x}", raw)))
}

impl TableDescription {
    pub fn from_json(json: &str) -> Result<TableDescription, TableError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build the described table, resolving symbolic names against `imports` as well
    pub fn build(&self, imports: &[&ResourceTable]) -> Result<ResourceTable, TableError> {
        let mut builder = TableBuilder::new();
        for table in imports {
            builder.import_names(table);
        }

        for package in &self.packages {
            builder.package(package.id, &package.name);

            for resource in &package.resources {
                match (&resource.value, &resource.bag, &resource.items) {
                    (Some(value), None, None) if resource.parent.is_none() => {
                        builder.value_for(resource.id, &resource.name, &resource.config, value);
                    }
                    (None, bag, None) => {
                        let entries: Vec<(&str, &str)> = bag
                            .iter()
                            .flatten()
                            .map(|item| (item.key.as_str(), item.value.as_str()))
                            .collect();
                        builder.bag_for(
                            resource.id,
                            &resource.name,
                            &resource.config,
                            resource.parent.as_deref().unwrap_or(""),
                            &entries,
                        );
                    }
                    (None, None, Some(items)) if resource.parent.is_none() => {
                        let entries: Vec<(&str, &str)> =
                            items.iter().map(|item| ("", item.as_str())).collect();
                        builder.bag_for(resource.id, &resource.name, &resource.config, "", &entries);
                    }
                    _ => return Err(TableError::InvalidValue(resource.name.clone())),
                }
            }
        }

        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::EntryData;
    use crate::value::Value;

    const JSON: &str = r##"{
        "packages": [{
            "id": "0x7f",
            "name": "com.example",
            "resources": [
                { "id": "0x7f010000", "name": "attr/colorAccent", "value": "@null" },
                { "id": 2130837504, "name": "color/accent", "value": "#ff4081" },
                { "id": "0x7f020000", "name": "color/accent", "config": "night", "value": "#c51162" },
                { "id": "0x7f030000", "name": "style/Base",
                  "bag": [{ "key": "attr/colorAccent", "value": "@color/accent" }] },
                { "id": "0x7f030001", "name": "style/Child", "parent": "@style/Base" },
                { "id": "0x7f040000", "name": "array/sizes", "items": ["1dp", "2dp"] }
            ]
        }]
    }"##;

    #[test]
    fn build_from_json() {
        let table = TableDescription::from_json(JSON).unwrap().build(&[]).unwrap();

        assert_eq!(table.find_entry(0x7f020000).unwrap().configs.len(), 2);

        let EntryData::Bag(base) = &table.find_entry(0x7f030000).unwrap().configs[0].data else {
            panic!("expected a bag");
        };
        assert_eq!(base.entries[0].key, 0x7f010000);
        assert_eq!(base.entries[0].value, Value::reference(0x7f020000));

        let EntryData::Bag(child) = &table.find_entry(0x7f030001).unwrap().configs[0].data else {
            panic!("expected a bag");
        };
        assert_eq!(child.parent, 0x7f030000);
        assert!(child.entries.is_empty());
    }

    #[test]
    fn rejects_ambiguous_resources() {
        let json = r##"{ "packages": [{ "id": 127, "name": "app", "resources": [
            { "id": "0x7f020000", "name": "color/x", "value": "#fff", "items": ["1"] }
        ]}]}"##;
        let description = TableDescription::from_json(json).unwrap();
        assert!(matches!(description.build(&[]), Err(TableError::InvalidValue(_))));
    }

    #[test]
    fn rejects_bad_ids() {
        let json = r#"{ "packages": [{ "id": "0x17f", "name": "app" }]}"#;
        assert!(matches!(TableDescription::from_json(json), Err(TableError::Json(_))));
    }
}
