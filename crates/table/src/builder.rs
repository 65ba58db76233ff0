use std::collections::BTreeMap;
use std::mem;

use ahash::AHashMap;
use log::debug;
use winnow::ascii::hex_uint;
use winnow::error::{ContextError, ErrMode};
use winnow::prelude::*;

use crate::config::{ConfigChanges, ResTableConfig};
use crate::errors::TableError;
use crate::parse::{Literal, parse_literal, parse_resource_name};
use crate::string_pool::StringPool;
use crate::table::{
    ARRAY_KEY_BASE, BagDefinition, ConfigEntry, Entry, EntryData, EntryFlags, MapEntry, Package,
    ResourceTable, ResourceType, entry_id, is_valid_resid, make_resid, package_id, type_id,
};
use crate::value::{Value, ValueType};

#[derive(Debug, Clone)]
enum BagKey {
    Id(u32),
    Name(String),
    /// Next array position
    Position,
}

#[derive(Debug, Clone)]
enum PendingData {
    Value(Literal),
    Bag {
        parent: Option<Literal>,
        entries: Vec<(BagKey, Literal)>,
    },
}

#[derive(Debug, Clone)]
struct PendingEntry {
    resid: u32,
    name: String,
    config: ResTableConfig,
    data: PendingData,
}

type NameKey = (String, String, String);

/// Incrementally builds a [`ResourceTable`]
///
/// Values are given in their text form (see [`parse_literal`]) and may refer to other
/// resources by name. Names are resolved when the table is built, so definitions can come
/// in any order. The first invalid input is kept and reported by [`TableBuilder::build`].
///
/// ```
/// use apk_res_table::TableBuilder;
///
/// let table = TableBuilder::new()
///     .package(0x7f, "com.example")
///     .value(0x7f010000, "attr/colorAccent", "@null")
///     .bag(0x7f020000, "style/Base", "", &[("attr/colorAccent", "#ff4081")])
///     .build()
///     .unwrap();
/// assert!(table.find_entry(0x7f020000).is_some());
/// ```
#[derive(Debug, Default)]
pub struct TableBuilder {
    packages: Vec<(u8, String)>,
    pending: Vec<PendingEntry>,
    imported: AHashMap<NameKey, u32>,
    error: Option<TableError>,
}

impl TableBuilder {
    pub fn new() -> TableBuilder {
        TableBuilder::default()
    }

    fn fail(&mut self, err: TableError) -> &mut Self {
        if self.error.is_none() {
            self.error = Some(err);
        }
        self
    }

    pub fn package(&mut self, id: u8, name: &str) -> &mut Self {
        self.packages.push((id, name.to_owned()));
        self
    }

    /// Make the names of `table` available for symbolic references
    pub fn import_names(&mut self, table: &ResourceTable) -> &mut Self {
        for package in table.packages() {
            for resource_type in package.types.values() {
                for (id, entry) in &resource_type.entries {
                    self.imported.insert(
                        (
                            package.name.clone(),
                            resource_type.name.clone(),
                            entry.name.clone(),
                        ),
                        make_resid(package.id, resource_type.id, *id),
                    );
                }
            }
        }
        self
    }

    /// Define a value for the default configuration
    pub fn value(&mut self, resid: u32, name: &str, text: &str) -> &mut Self {
        self.value_for(resid, name, "", text)
    }

    /// Define a value for the configuration given as a qualifier string
    pub fn value_for(&mut self, resid: u32, name: &str, config: &str, text: &str) -> &mut Self {
        let literal = match parse_literal(text) {
            Ok(literal) => literal,
            Err(err) => return self.fail(err),
        };
        self.push(resid, name, config, PendingData::Value(literal))
    }

    /// Define an already encoded value
    pub fn typed_value(
        &mut self,
        resid: u32,
        name: &str,
        config: ResTableConfig,
        value: Value,
    ) -> &mut Self {
        self.pending.push(PendingEntry {
            resid,
            name: name.to_owned(),
            config,
            data: PendingData::Value(Literal::Value(value)),
        });
        self
    }

    /// Define a bag for the default configuration
    ///
    /// `parent` is empty or a reference to the parent bag. Keys are attribute ids
    /// (`0x7f010000`), attribute names (`attr/name`, `android:attr/name` or just `name`)
    /// or empty for the next array position.
    pub fn bag(
        &mut self,
        resid: u32,
        name: &str,
        parent: &str,
        entries: &[(&str, &str)],
    ) -> &mut Self {
        self.bag_for(resid, name, "", parent, entries)
    }

    pub fn bag_for(
        &mut self,
        resid: u32,
        name: &str,
        config: &str,
        parent: &str,
        entries: &[(&str, &str)],
    ) -> &mut Self {
        let parent = match parent {
            "" => None,
            p if p.starts_with('@') => match parse_literal(p) {
                Ok(literal) => Some(literal),
                Err(err) => return self.fail(err),
            },
            // bare names refer to a bag of the same type
            p => {
                let type_name = name.split_once('/').map(|(t, _)| t).unwrap_or("style");
                Some(Literal::Name {
                    name: format!("{}/{}", type_name, p),
                    attribute: false,
                })
            }
        };

        let mut parsed = Vec::with_capacity(entries.len());
        for (key, text) in entries {
            let key = match *key {
                "" => BagKey::Position,
                k => match preceded_hex(k) {
                    Some(id) => BagKey::Id(id),
                    None => BagKey::Name(k.to_owned()),
                },
            };
            match parse_literal(text) {
                Ok(literal) => parsed.push((key, literal)),
                Err(err) => return self.fail(err),
            }
        }

        self.push(
            resid,
            name,
            config,
            PendingData::Bag {
                parent,
                entries: parsed,
            },
        )
    }

    /// Define an array bag from its items
    pub fn array(&mut self, resid: u32, name: &str, items: &[&str]) -> &mut Self {
        let entries: Vec<_> = items.iter().map(|item| ("", *item)).collect();
        self.bag(resid, name, "", &entries)
    }

    fn push(&mut self, resid: u32, name: &str, config: &str, data: PendingData) -> &mut Self {
        let config = match config.parse::<ResTableConfig>() {
            Ok(config) => config,
            Err(err) => return self.fail(err),
        };
        self.pending.push(PendingEntry {
            resid,
            name: name.to_owned(),
            config,
            data,
        });
        self
    }

    /// Resolve all names and produce the table, leaving the builder empty
    pub fn build(&mut self) -> Result<ResourceTable, TableError> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }

        let packages = mem::take(&mut self.packages);
        let pending = mem::take(&mut self.pending);

        let mut table = ResourceTable::default();
        for (id, name) in packages {
            if table.packages.contains_key(&id) {
                return Err(TableError::DuplicatePackage(id));
            }
            table.packages.insert(
                id,
                Package {
                    id,
                    name,
                    types: BTreeMap::new(),
                },
            );
        }

        // first pass: declare every type and entry name
        let mut names = self.imported.clone();
        for item in &pending {
            let resid = item.resid;
            if !is_valid_resid(resid) {
                return Err(TableError::InvalidResourceId(resid));
            }

            let parts = parse_resource_name(&item.name)?;
            let type_name = parts
                .type_name
                .ok_or_else(|| TableError::InvalidName(item.name.clone()))?;

            let package = table
                .packages
                .get_mut(&package_id(resid))
                .ok_or(TableError::UnknownPackage(resid))?;
            if parts.package.is_some_and(|p| p != package.name) {
                return Err(TableError::InvalidName(item.name.clone()));
            }

            let resource_type =
                package
                    .types
                    .entry(type_id(resid))
                    .or_insert_with(|| ResourceType {
                        id: type_id(resid),
                        name: type_name.to_owned(),
                        entries: BTreeMap::new(),
                    });
            if resource_type.name != type_name {
                return Err(TableError::NameMismatch {
                    resid,
                    first: resource_type.name.clone(),
                    second: type_name.to_owned(),
                });
            }

            let entry = resource_type
                .entries
                .entry(entry_id(resid))
                .or_insert_with(|| Entry {
                    name: parts.entry.to_owned(),
                    spec_flags: ConfigChanges::empty(),
                    configs: Vec::new(),
                });
            if entry.name != parts.entry {
                return Err(TableError::NameMismatch {
                    resid,
                    first: entry.name.clone(),
                    second: parts.entry.to_owned(),
                });
            }

            names.insert(
                (
                    package.name.clone(),
                    type_name.to_owned(),
                    parts.entry.to_owned(),
                ),
                resid,
            );
        }

        // second pass: encode values
        let mut string_pool = StringPool::default();
        for item in pending {
            let resid = item.resid;
            let package_name = table
                .packages
                .get(&package_id(resid))
                .map(|p| p.name.clone())
                .unwrap_or_default();
            let mut resolver = LiteralResolver {
                names: &names,
                package: &package_name,
                string_pool: &mut string_pool,
            };

            let (flags, data) = match item.data {
                PendingData::Value(literal) => {
                    (EntryFlags::empty(), EntryData::Value(resolver.resolve(literal)?))
                }
                PendingData::Bag { parent, entries } => {
                    let parent = match parent {
                        Some(literal) => resolver.resolve(literal)?.data,
                        None => 0,
                    };

                    let mut position = 0u32;
                    let mut map_entries = Vec::with_capacity(entries.len());
                    for (key, literal) in entries {
                        let key = match key {
                            BagKey::Id(id) => id,
                            BagKey::Name(name) => resolver.resolve_name(&name, "attr")?,
                            BagKey::Position => {
                                position += 1;
                                ARRAY_KEY_BASE + position - 1
                            }
                        };
                        map_entries.push(MapEntry {
                            key,
                            value: resolver.resolve(literal)?,
                        });
                    }

                    (
                        EntryFlags::COMPLEX,
                        EntryData::Bag(BagDefinition {
                            parent,
                            entries: map_entries,
                        }),
                    )
                }
            };

            let entry = table
                .packages
                .get_mut(&package_id(resid))
                .and_then(|p| p.types.get_mut(&type_id(resid)))
                .and_then(|t| t.entries.get_mut(&entry_id(resid)))
                .ok_or(TableError::UnknownPackage(resid))?;

            if entry.configs.iter().any(|c| c.config == item.config) {
                return Err(TableError::DuplicateConfiguration {
                    resid,
                    config: item.config.to_string(),
                });
            }

            entry.configs.push(ConfigEntry {
                config: item.config,
                flags,
                data,
            });
        }

        for package in table.packages.values_mut() {
            for resource_type in package.types.values_mut() {
                for entry in resource_type.entries.values_mut() {
                    entry.spec_flags = match entry.configs.first() {
                        Some(first) => entry
                            .configs
                            .iter()
                            .fold(ConfigChanges::empty(), |acc, c| acc | first.config.diff(&c.config)),
                        None => ConfigChanges::empty(),
                    };
                }
            }
        }

        table.string_pool = string_pool;

        debug!(
            "built resource table with {} package(s), {} string(s)",
            table.packages.len(),
            table.string_pool.len()
        );

        Ok(table)
    }
}

fn preceded_hex(text: &str) -> Option<u32> {
    let digits = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))?;
    hex_uint::<_, u32, ErrMode<ContextError>>.parse(digits).ok()
}

struct LiteralResolver<'a> {
    names: &'a AHashMap<NameKey, u32>,
    package: &'a str,
    string_pool: &'a mut StringPool,
}

impl LiteralResolver<'_> {
    fn resolve(&mut self, literal: Literal) -> Result<Value, TableError> {
        match literal {
            Literal::Value(value) => Ok(value),
            Literal::String(s) => Ok(Value::new(ValueType::String, self.string_pool.intern(&s))),
            Literal::Name { name, attribute } => {
                if attribute {
                    Ok(Value::attribute(self.resolve_name(&name, "attr")?))
                } else {
                    Ok(Value::reference(self.resolve_name(&name, "")?))
                }
            }
        }
    }

    fn resolve_name(&self, name: &str, default_type: &str) -> Result<u32, TableError> {
        let parts = parse_resource_name(name)?;
        let type_name = parts.type_name.unwrap_or(default_type);
        let package = parts.package.unwrap_or(self.package);

        self.names
            .get(&(package.to_owned(), type_name.to_owned(), parts.entry.to_owned()))
            .copied()
            .ok_or_else(|| TableError::InvalidName(name.to_owned()))
    }
}
