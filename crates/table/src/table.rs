use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use bitflags::bitflags;

use crate::config::{ConfigChanges, ResTableConfig};
use crate::parse::parse_resource_name;
use crate::string_pool::StringPool;
use crate::value::Value;

/// Key of the first element of an array bag, element `i` has key `ARRAY_KEY_BASE + i`
pub const ARRAY_KEY_BASE: u32 = 0x0200_0000;

/// Compose a resource id from its parts
#[inline(always)]
pub const fn make_resid(package_id: u8, type_id: u8, entry_id: u16) -> u32 {
    entry_id as u32 | (type_id as u32) << 16 | (package_id as u32) << 24
}

#[inline(always)]
pub const fn package_id(resid: u32) -> u8 {
    (resid >> 24) as u8
}

/// Type part of a resource id, 1-based
#[inline(always)]
pub const fn type_id(resid: u32) -> u8 {
    (resid >> 16) as u8
}

#[inline(always)]
pub const fn entry_id(resid: u32) -> u16 {
    resid as u16
}

/// A resource id must carry both a package and a type part
#[inline(always)]
pub const fn is_valid_resid(resid: u32) -> bool {
    resid & 0x00ff_0000 != 0 && resid & 0xff00_0000 != 0
}

bitflags! {
    /// Flags of one configuration-specific definition
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct EntryFlags: u16 {
        /// If set, this is a complex entry, holding a set of name/value mappings
        const COMPLEX = 0x0001;

        /// If set, this resource has been declared public, so libraries are allowed to reference it
        const PUBLIC = 0x0002;

        /// If set, this is a weak resource and may be overriden by strong resources of the same name/type
        const WEAK = 0x0004;
    }
}

/// One name/value pair of a bag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapEntry {
    /// Attribute id for styles, `ARRAY_KEY_BASE + index` for arrays
    pub key: u32,
    pub value: Value,
}

/// Bag as defined in one source, before merging with its parent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BagDefinition {
    /// Resource id of the parent bag, or 0 if there is none
    pub parent: u32,
    pub entries: Vec<MapEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryData {
    Value(Value),
    Bag(BagDefinition),
}

/// Definition of an entry for one configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub config: ResTableConfig,
    pub flags: EntryFlags,
    pub data: EntryData,
}

impl ConfigEntry {
    #[inline]
    pub fn is_bag(&self) -> bool {
        matches!(self.data, EntryData::Bag(_))
    }
}

/// All definitions of one resource id in one table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub name: String,

    /// Dimensions over which the definitions of this entry vary
    pub spec_flags: ConfigChanges,

    pub configs: Vec<ConfigEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceType {
    /// Type id, 1-based
    pub id: u8,
    pub name: String,
    pub entries: BTreeMap<u16, Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub id: u8,
    pub name: String,
    pub types: BTreeMap<u8, ResourceType>,
}

impl Package {
    pub fn type_by_name(&self, name: &str) -> Option<&ResourceType> {
        self.types.values().find(|t| t.name == name)
    }
}

/// Fully qualified `package:type/entry` name of a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceName {
    pub package: String,
    pub type_name: String,
    pub entry: String,
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.package, self.type_name, self.entry)
    }
}

/// Parsed and indexed resource table of one asset source
#[derive(Debug, Clone, Default)]
pub struct ResourceTable {
    pub(crate) packages: BTreeMap<u8, Package>,
    pub(crate) string_pool: StringPool,
}

impl ResourceTable {
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    #[inline]
    pub fn package(&self, id: u8) -> Option<&Package> {
        self.packages.get(&id)
    }

    pub fn package_by_name(&self, name: &str) -> Option<&Package> {
        self.packages.values().find(|p| p.name == name)
    }

    #[inline]
    pub fn string_pool(&self) -> &StringPool {
        &self.string_pool
    }

    pub fn resource_type(&self, resid: u32) -> Option<&ResourceType> {
        self.package(package_id(resid))?.types.get(&type_id(resid))
    }

    /// Get all definitions of a resource id
    pub fn find_entry(&self, resid: u32) -> Option<&Entry> {
        self.resource_type(resid)?.entries.get(&entry_id(resid))
    }

    pub fn resource_name(&self, resid: u32) -> Option<ResourceName> {
        let package = self.package(package_id(resid))?;
        let resource_type = package.types.get(&type_id(resid))?;
        let entry = resource_type.entries.get(&entry_id(resid))?;

        Some(ResourceName {
            package: package.name.clone(),
            type_name: resource_type.name.clone(),
            entry: entry.name.clone(),
        })
    }

    /// Find a resource by `[package:][type/]entry` name
    ///
    /// Missing parts of the name are taken from `default_type` and `default_package`;
    /// without a package all packages are searched in id order.
    pub fn find_resource_id(
        &self,
        name: &str,
        default_type: Option<&str>,
        default_package: Option<&str>,
    ) -> Option<u32> {
        let parts = parse_resource_name(name).ok()?;
        let type_name = parts.type_name.or(default_type)?;
        let package_name = parts.package.or(default_package);

        self.packages
            .values()
            .filter(|p| package_name.is_none_or(|name| p.name == name))
            .find_map(|package| {
                let resource_type = package.type_by_name(type_name)?;
                resource_type
                    .entries
                    .iter()
                    .find(|(_, entry)| entry.name == parts.entry)
                    .map(|(id, _)| make_resid(package.id, resource_type.id, *id))
            })
    }

    /// Every configuration any value in this table is defined for
    pub fn configurations(&self, exclude_mipmap: bool) -> BTreeSet<ResTableConfig> {
        self.packages
            .values()
            .flat_map(|p| p.types.values())
            .filter(|t| !(exclude_mipmap && t.name == "mipmap"))
            .flat_map(|t| t.entries.values())
            .flat_map(|e| e.configs.iter().map(|c| c.config))
            .collect()
    }

    /// Every locale any value in this table is defined for, as `language[-region]` tags
    pub fn locales(&self) -> BTreeSet<String> {
        self.configurations(false)
            .iter()
            .filter(|c| c.has_locale())
            .map(|c| c.locale_tag())
            .collect()
    }
}
