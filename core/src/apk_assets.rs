use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use apk_res_table::{ResourceTable, TableDescription};
use bitflags::bitflags;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::asset::Asset;
use crate::errors::ResourceError;

bitflags! {
    /// Properties of an asset source
    ///
    /// [Source Code](https://cs.android.com/android/platform/superproject/main/+/main:frameworks/base/libs/androidfw/include/androidfw/ApkAssets.h)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PropertyFlags: u32 {
        /// The source is part of the system image
        const SYSTEM = 1 << 0;

        /// The source was added by a resources loader
        const LOADER = 1 << 2;

        /// The source is a runtime resource overlay
        const OVERLAY = 1 << 3;

        /// Equal definitions from earlier sources win over this one
        const LOWER_PRIORITY = 1 << 4;
    }
}

/// JSON form of an asset source: a table description plus source properties and assets
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceDescription {
    #[serde(default)]
    pub system: bool,
    #[serde(default)]
    pub overlay: bool,
    #[serde(default)]
    pub loader: bool,
    #[serde(default)]
    pub lower_priority: bool,

    /// Asset files by path, with text content
    #[serde(default)]
    pub assets: BTreeMap<String, String>,

    #[serde(flatten)]
    pub table: TableDescription,
}

impl SourceDescription {
    pub fn flags(&self) -> PropertyFlags {
        let mut flags = PropertyFlags::empty();
        flags.set(PropertyFlags::SYSTEM, self.system);
        flags.set(PropertyFlags::OVERLAY, self.overlay);
        flags.set(PropertyFlags::LOADER, self.loader);
        flags.set(PropertyFlags::LOWER_PRIORITY, self.lower_priority);
        flags
    }
}

/// One immutable asset source: a resource table and the asset files shipped with it
#[derive(Debug)]
pub struct ApkAssets {
    path: String,
    table: ResourceTable,
    flags: PropertyFlags,
    assets: BTreeMap<String, Arc<[u8]>>,
}

impl ApkAssets {
    pub fn new(path: &str, table: ResourceTable, flags: PropertyFlags) -> ApkAssets {
        ApkAssets {
            path: path.to_owned(),
            table,
            flags,
            assets: BTreeMap::new(),
        }
    }

    /// Build a source from its description, resolving names against `imports` as well
    pub fn from_description(
        path: &str,
        description: &SourceDescription,
        imports: &[&ResourceTable],
    ) -> Result<ApkAssets, ResourceError> {
        let table = description.table.build(imports)?;

        let mut apk_assets = ApkAssets::new(path, table, description.flags());
        for (name, content) in &description.assets {
            apk_assets = apk_assets.with_asset(name, content.as_bytes());
        }

        debug!(
            "loaded source {:?} with {} package(s), flags {:?}",
            path,
            apk_assets.table.packages().count(),
            apk_assets.flags
        );

        Ok(apk_assets)
    }

    /// Load a JSON source description from disk
    pub fn load(path: &Path, imports: &[&ResourceTable]) -> Result<ApkAssets, ResourceError> {
        let json = fs::read_to_string(path)?;
        let description: SourceDescription = serde_json::from_str(&json)?;
        Self::from_description(&path.to_string_lossy(), &description, imports)
    }

    pub fn with_asset(mut self, name: &str, data: &[u8]) -> ApkAssets {
        self.assets.insert(name.trim_start_matches('/').to_owned(), Arc::from(data));
        self
    }

    #[inline]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[inline]
    pub fn table(&self) -> &ResourceTable {
        &self.table
    }

    #[inline]
    pub fn flags(&self) -> PropertyFlags {
        self.flags
    }

    #[inline]
    pub fn is_system(&self) -> bool {
        self.flags.contains(PropertyFlags::SYSTEM)
    }

    #[inline]
    pub fn is_overlay(&self) -> bool {
        self.flags.contains(PropertyFlags::OVERLAY)
    }

    #[inline]
    pub fn is_lower_priority(&self) -> bool {
        self.flags.contains(PropertyFlags::LOWER_PRIORITY)
    }

    pub fn open(&self, name: &str) -> Option<Asset> {
        let name = name.trim_start_matches('/');
        self.assets
            .get(name)
            .map(|data| Asset::new(name, Arc::clone(data)))
    }

    /// Names of the files and directories directly inside `dir`
    pub fn list(&self, dir: &str) -> Vec<String> {
        let dir = dir.trim_matches('/');
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{}/", dir)
        };

        let mut names: Vec<String> = self
            .assets
            .keys()
            .filter_map(|path| path.strip_prefix(&prefix))
            .map(|rest| rest.split('/').next().unwrap_or(rest).to_owned())
            .collect();
        names.dedup();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_flags_and_assets() {
        let json = r#"{
            "overlay": true,
            "assets": { "fonts/a.ttf": "aaa", "fonts/b.ttf": "bb", "readme.txt": "hi" },
            "packages": [{ "id": 127, "name": "app" }]
        }"#;
        let description: SourceDescription = serde_json::from_str(json).unwrap();
        let apk_assets = ApkAssets::from_description("overlay.json", &description, &[]).unwrap();

        assert!(apk_assets.is_overlay());
        assert!(!apk_assets.is_system());
        assert_eq!(apk_assets.table().package(0x7f).unwrap().name, "app");

        assert_eq!(apk_assets.list(""), vec!["fonts".to_owned(), "readme.txt".to_owned()]);
        assert_eq!(
            apk_assets.list("/fonts/"),
            vec!["a.ttf".to_owned(), "b.ttf".to_owned()]
        );
        assert_eq!(apk_assets.open("/fonts/b.ttf").unwrap().length(), 2);
        assert!(apk_assets.open("fonts/c.ttf").is_none());
    }
}
