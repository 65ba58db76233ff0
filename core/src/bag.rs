//! Merging of bag resources (styles, arrays and attribute maps) across sources
//!
//! A bag may be defined in several sources: every source contributes the
//! definition that best matches the configuration, and the parent bag named by
//! the highest-priority definition is merged in first.

use std::sync::Arc;

use apk_res_table::{
    ARRAY_KEY_BASE, BagDefinition, ConfigChanges, EntryData, ResTableConfig, Value, ValueType,
    is_valid_resid, package_id,
};
use log::{debug, warn};
use smallvec::SmallVec;

use crate::asset_manager::{AssetManager, Cookie, SelectedValue};
use crate::errors::ResourceError;
use crate::selector::Candidate;

/// How entries of a bag are keyed when layers are merged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BagKind {
    /// Keyed by attribute id
    Style,
    /// Keyed by element position
    Array,
    /// Keyed by attribute id, holds the format and enum/flag values of an attribute
    AttributeMap,
}

impl BagKind {
    fn from_type_name(name: &str) -> BagKind {
        match name {
            "array" | "string-array" | "integer-array" => BagKind::Array,
            "attr" => BagKind::AttributeMap,
            _ => BagKind::Style,
        }
    }

    /// Merge key of the entry at `position` within its own layer
    #[inline]
    fn slot(self, key: u32, position: usize) -> u32 {
        match self {
            BagKind::Array => ARRAY_KEY_BASE + position as u32,
            BagKind::Style | BagKind::AttributeMap => key,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BagEntry {
    pub key: u32,
    pub value: Value,

    /// Source the entry came from
    pub cookie: Cookie,

    /// Bag that defined the entry, a parent style for inherited entries
    pub style: u32,
}

/// A bag merged across all sources and its parents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBag {
    pub resid: u32,
    pub kind: BagKind,
    pub entries: Vec<BagEntry>,

    /// Configuration dimensions the bag, its layers or its parents vary over
    pub type_spec_flags: ConfigChanges,

    /// Parent bag, 0 if there is none
    pub parent: u32,
}

impl ResolvedBag {
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last entry with `key`
    pub fn find(&self, key: u32) -> Option<&BagEntry> {
        self.entries.iter().rev().find(|e| e.key == key)
    }

    /// Replace entries with an existing key in place, append the others
    fn merge(&mut self, layer: impl IntoIterator<Item = BagEntry>) {
        for entry in layer {
            match self.entries.iter_mut().find(|e| e.key == entry.key) {
                Some(existing) => *existing = entry,
                None => self.entries.push(entry),
            }
        }
    }

    /// Entry as a value detached from any table entry
    pub fn selected(&self, entry: &BagEntry) -> SelectedValue {
        SelectedValue {
            cookie: entry.cookie,
            value: entry.value,
            resid: 0,
            flags: self.type_spec_flags,
            config: ResTableConfig::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct CachedBag {
    generation: u64,
    bag: Arc<ResolvedBag>,
}

/// One source's definition of a bag
struct Layer<'a> {
    cookie: Cookie,
    kind: BagKind,
    spec_flags: ConfigChanges,
    definition: &'a BagDefinition,
}

impl AssetManager {
    /// Best definition of `resid` in every source defining it as a bag, lowest priority first
    ///
    /// Each source picks its definition over the locale list like single values do.
    fn bag_layers(&self, resid: u32) -> Vec<Layer<'_>> {
        if !is_valid_resid(resid) {
            return Vec::new();
        }
        let Some(group) = self
            .package_groups()
            .iter()
            .find(|g| g.id == package_id(resid))
        else {
            return Vec::new();
        };

        let mut layers = Vec::new();
        for &idx in &group.sources {
            let table = self.sources()[idx].table();
            let Some(entry) = table.find_entry(resid) else {
                continue;
            };

            let cookie = self.cookie_at(idx);
            let candidates: Vec<_> = entry
                .configs
                .iter()
                .map(|config_entry| Candidate {
                    cookie,
                    rank: self.rank(idx),
                    entry: config_entry,
                })
                .collect();

            let Some((best, _)) = self.select_for_locales(&candidates, None) else {
                continue;
            };
            let EntryData::Bag(definition) = &candidates[best].entry.data else {
                continue;
            };

            let kind = table
                .resource_type(resid)
                .map(|t| BagKind::from_type_name(&t.name))
                .unwrap_or(BagKind::Style);

            layers.push(Layer {
                cookie,
                kind,
                spec_flags: entry.spec_flags,
                definition,
            });
        }
        layers
    }

    /// Bag `resid` merged across sources and parents, `None` if it is not a bag
    /// or its parent chain is broken or cyclic
    pub fn get_bag(&self, resid: u32) -> Option<Arc<ResolvedBag>> {
        let mut chain: SmallVec<[u32; 8]> = SmallVec::new();
        self.resolve_bag(resid, &mut chain)
    }

    fn resolve_bag(&self, resid: u32, chain: &mut SmallVec<[u32; 8]>) -> Option<Arc<ResolvedBag>> {
        if let Some(cached) = self.bag_cache.borrow().get(&resid)
            && cached.generation == self.generation()
        {
            return Some(Arc::clone(&cached.bag));
        }

        if chain.contains(&resid) {
            warn!("cyclic parent chain through bag {:#010x}", resid);
            return None;
        }
        chain.push(resid);

        let layers = self.bag_layers(resid);
        let top = layers.last()?;

        let mut bag = ResolvedBag {
            resid,
            kind: top.kind,
            entries: Vec::new(),
            type_spec_flags: ConfigChanges::empty(),
            parent: top.definition.parent,
        };

        if bag.parent != 0 {
            let Some(parent) = self.resolve_bag(bag.parent, chain) else {
                warn!(
                    "failed to find parent {:#010x} of bag {:#010x}",
                    bag.parent, resid
                );
                return None;
            };
            bag.entries.clone_from(&parent.entries);
            bag.type_spec_flags |= parent.type_spec_flags;
        }

        for layer in &layers {
            bag.type_spec_flags |= layer.spec_flags;
            let kind = bag.kind;
            bag.merge(
                layer
                    .definition
                    .entries
                    .iter()
                    .enumerate()
                    .map(|(position, entry)| BagEntry {
                        key: kind.slot(entry.key, position),
                        value: entry.value,
                        cookie: layer.cookie,
                        style: resid,
                    }),
            );
        }

        debug!(
            "resolved bag {:#010x} with {} entries from {} layer(s)",
            resid,
            bag.len(),
            layers.len()
        );

        let bag = Arc::new(bag);
        self.bag_cache.borrow_mut().insert(
            resid,
            CachedBag {
                generation: self.generation(),
                bag: Arc::clone(&bag),
            },
        );
        Some(bag)
    }

    /// Drop cached bags that vary over any of the `changes` dimensions
    pub(crate) fn invalidate_bags(&self, changes: ConfigChanges) {
        self.bag_cache
            .borrow_mut()
            .retain(|_, cached| !cached.bag.type_spec_flags.intersects(changes));
    }

    /// Reference-resolved value of the last entry with `key` in bag `bag_id`
    pub fn find_bag_entry(&self, bag_id: u32, key: u32) -> Option<SelectedValue> {
        let bag = self.get_bag(bag_id)?;
        let entry = bag.find(key)?;

        let mut value = bag.selected(entry);
        self.resolve_reference(&mut value).then_some(value)
    }

    /// `resid` followed by its parents, nearest first
    ///
    /// Missing bags end the chain, a cyclic chain is corrupt data.
    pub fn get_bag_res_id_stack(&self, resid: u32) -> Result<Vec<u32>, ResourceError> {
        let mut stack = Vec::new();
        let mut current = resid;
        while current != 0 {
            if stack.contains(&current) {
                return Err(ResourceError::CorruptData(format!(
                    "cyclic parent chain through style {:#010x}",
                    current
                )));
            }
            let layers = self.bag_layers(current);
            let Some(top) = layers.last() else {
                break;
            };
            stack.push(current);
            current = top.definition.parent;
        }
        Ok(stack)
    }

    /// Attribute ids a style sets, including inherited ones
    pub fn get_style_attributes(&self, style: u32) -> Option<Vec<u32>> {
        self.get_bag(style)
            .map(|bag| bag.entries.iter().map(|e| e.key).collect())
    }

    /// Parent of a style, `None` if the style is missing or has no parent
    pub fn get_parent_theme_resource_id(&self, style: u32) -> Option<u32> {
        self.get_bag(style)
            .map(|bag| bag.parent)
            .filter(|&parent| parent != 0)
    }

    /// Elements of an array, each reference-resolved
    ///
    /// Elements that fail to resolve keep their unresolved value.
    pub fn get_resource_array(&self, resid: u32) -> Option<Vec<SelectedValue>> {
        let bag = self.get_bag(resid)?;
        Some(
            bag.entries
                .iter()
                .map(|entry| {
                    let mut value = bag.selected(entry);
                    self.resolve_reference(&mut value);
                    value
                })
                .collect(),
        )
    }

    pub fn get_resource_array_size(&self, resid: u32) -> Option<usize> {
        self.get_bag(resid).map(|bag| bag.len())
    }

    /// Strings of an array, `None` for elements that are not strings
    pub fn get_resource_string_array(&self, resid: u32) -> Option<Vec<Option<String>>> {
        let values = self.get_resource_array(resid)?;
        Some(
            values
                .iter()
                .map(|value| self.value_string(value).map(str::to_owned))
                .collect(),
        )
    }

    /// Source and string pool index of every string element of an array
    pub fn get_resource_string_array_info(&self, resid: u32) -> Option<Vec<Option<(Cookie, u32)>>> {
        let values = self.get_resource_array(resid)?;
        Some(
            values
                .iter()
                .map(|value| {
                    (value.data_type() == ValueType::String).then_some((value.cookie, value.data()))
                })
                .collect(),
        )
    }

    /// Integers of an array, 0 for elements that are not integers
    pub fn get_resource_int_array(&self, resid: u32) -> Option<Vec<i32>> {
        let values = self.get_resource_array(resid)?;
        Some(
            values
                .iter()
                .map(|value| {
                    if value.data_type().is_int() {
                        value.data() as i32
                    } else {
                        0
                    }
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::apk_assets::PropertyFlags;
    use crate::asset_manager::tests::{manager, source};

    use super::*;

    const A1: u32 = 0x7f010001;
    const A2: u32 = 0x7f010002;
    const A3: u32 = 0x7f010003;

    fn attrs(b: &mut apk_res_table::TableBuilder) -> &mut apk_res_table::TableBuilder {
        b.package(0x7f, "app")
            .value(A1, "attr/one", "0")
            .value(A2, "attr/two", "0")
            .value(A3, "attr/three", "0")
    }

    fn entries(bag: &ResolvedBag) -> Vec<(u32, u32)> {
        bag.entries.iter().map(|e| (e.key, e.value.data)).collect()
    }

    #[test]
    fn layers_merge_in_place() {
        let base = source("base.json", PropertyFlags::empty(), |b| {
            attrs(b).bag(0x7f020000, "style/S", "", &[("one", "1"), ("two", "2")]);
        });
        let overlay = source("overlay.json", PropertyFlags::OVERLAY, |b| {
            attrs(b).bag(0x7f020000, "style/S", "", &[("two", "20"), ("three", "30")]);
        });
        let am = manager(vec![base, overlay]);

        let bag = am.get_bag(0x7f020000).unwrap();
        assert_eq!(bag.kind, BagKind::Style);
        assert_eq!(entries(&bag), vec![(A1, 1), (A2, 20), (A3, 30)]);
        assert_eq!(bag.entries[0].cookie, Cookie(0));
        assert_eq!(bag.entries[1].cookie, Cookie(1));
    }

    #[test]
    fn parents_form_the_base_layer() {
        let base = source("base.json", PropertyFlags::empty(), |b| {
            attrs(b)
                .bag(0x7f020000, "style/Parent", "", &[("one", "1"), ("two", "2")])
                .bag(0x7f020001, "style/Child", "Parent", &[("two", "22"), ("three", "3")])
                .bag(0x7f020002, "style/Orphan", "@0x7f020099", &[("one", "1")]);
        });
        let am = manager(vec![base]);

        let child = am.get_bag(0x7f020001).unwrap();
        assert_eq!(child.parent, 0x7f020000);
        assert_eq!(entries(&child), vec![(A1, 1), (A2, 22), (A3, 3)]);
        assert_eq!(child.entries[0].style, 0x7f020000);
        assert_eq!(child.entries[1].style, 0x7f020001);

        assert_eq!(am.get_parent_theme_resource_id(0x7f020001), Some(0x7f020000));
        assert_eq!(am.get_parent_theme_resource_id(0x7f020000), None);
        assert_eq!(am.get_style_attributes(0x7f020001), Some(vec![A1, A2, A3]));

        assert!(am.get_bag(0x7f020002).is_none());
        assert!(am.get_bag(0x7f010001).is_none());
        assert!(am.get_bag(0x7f020099).is_none());
    }

    #[test]
    fn cyclic_parents() {
        let base = source("base.json", PropertyFlags::empty(), |b| {
            attrs(b)
                .bag(0x7f020000, "style/A", "B", &[("one", "1")])
                .bag(0x7f020001, "style/B", "A", &[("two", "2")])
                .bag(0x7f020002, "style/C", "B", &[]);
        });
        let am = manager(vec![base]);

        assert!(am.get_bag(0x7f020000).is_none());
        assert!(am.get_bag(0x7f020002).is_none());
        assert!(matches!(
            am.get_bag_res_id_stack(0x7f020002),
            Err(ResourceError::CorruptData(_))
        ));
    }

    #[test]
    fn res_id_stack() {
        let base = source("base.json", PropertyFlags::empty(), |b| {
            attrs(b)
                .bag(0x7f020000, "style/A", "", &[])
                .bag(0x7f020001, "style/B", "A", &[])
                .bag(0x7f020002, "style/C", "B", &[]);
        });
        let am = manager(vec![base]);

        assert_eq!(
            am.get_bag_res_id_stack(0x7f020002).unwrap(),
            vec![0x7f020002, 0x7f020001, 0x7f020000]
        );
        assert!(am.get_bag_res_id_stack(0).unwrap().is_empty());
        assert!(am.get_bag_res_id_stack(0x7f020009).unwrap().is_empty());
    }

    #[test]
    fn arrays_merge_by_position() {
        let base = source("base.json", PropertyFlags::empty(), |b| {
            b.package(0x7f, "app")
                .value(0x7f010000, "string/first", "First")
                .array(0x7f030000, "array/items", &["@string/first", "two", "3"])
                .array(0x7f030001, "array/numbers", &["1", "0x10", "@null", "text"]);
        });
        let overlay = source("overlay.json", PropertyFlags::OVERLAY, |b| {
            b.package(0x7f, "app")
                .array(0x7f030000, "array/items", &["one", "zwei"]);
        });
        let am = manager(vec![base, overlay]);

        let bag = am.get_bag(0x7f030000).unwrap();
        assert_eq!(bag.kind, BagKind::Array);
        assert_eq!(am.get_resource_array_size(0x7f030000), Some(3));
        assert_eq!(
            am.get_resource_string_array(0x7f030000).unwrap(),
            vec![Some("one".to_owned()), Some("zwei".to_owned()), None]
        );

        let info = am.get_resource_string_array_info(0x7f030000).unwrap();
        assert_eq!(info[0].map(|(cookie, _)| cookie), Some(Cookie(1)));
        assert_eq!(info[2], None);

        assert_eq!(
            am.get_resource_int_array(0x7f030001).unwrap(),
            vec![1, 0x10, 0, 0]
        );
        assert_eq!(am.get_resource_array_size(0x7f030009), None);
    }

    #[test]
    fn array_elements_are_resolved() {
        let base = source("base.json", PropertyFlags::empty(), |b| {
            b.package(0x7f, "app")
                .value(0x7f010000, "string/first", "First")
                .array(0x7f030000, "array/items", &["@string/first", "@0x7f010005"]);
        });
        let am = manager(vec![base]);

        let values = am.get_resource_array(0x7f030000).unwrap();
        assert_eq!(am.format_value(&values[0]), "First");
        assert_eq!(values[0].resid, 0x7f010000);
        assert_eq!(values[1].value, Value::reference(0x7f010005));
    }

    #[test]
    fn find_bag_entry_resolves() {
        let base = source("base.json", PropertyFlags::empty(), |b| {
            attrs(b)
                .value(0x7f040000, "color/accent", "#ff0000")
                .bag(0x7f020000, "style/S", "", &[("one", "@color/accent"), ("two", "2")]);
        });
        let am = manager(vec![base]);

        let accent = am.find_bag_entry(0x7f020000, A1).unwrap();
        assert_eq!(accent.data(), 0xffff0000);
        assert_eq!(accent.resid, 0x7f040000);
        assert_eq!(am.find_bag_entry(0x7f020000, A2).unwrap().value, Value::int(2));
        assert!(am.find_bag_entry(0x7f020000, A3).is_none());
    }

    #[test]
    fn find_prefers_last_duplicate() {
        let bag = ResolvedBag {
            resid: 0x7f020000,
            kind: BagKind::Style,
            entries: vec![
                BagEntry {
                    key: A1,
                    value: Value::int(1),
                    cookie: Cookie(0),
                    style: 0x7f020000,
                },
                BagEntry {
                    key: A1,
                    value: Value::int(2),
                    cookie: Cookie(1),
                    style: 0x7f020000,
                },
            ],
            type_spec_flags: ConfigChanges::empty(),
            parent: 0,
        };
        assert_eq!(bag.find(A1).unwrap().value, Value::int(2));
    }

    #[test]
    fn cache_follows_configuration() {
        let base = source("base.json", PropertyFlags::empty(), |b| {
            attrs(b)
                .bag(0x7f020000, "style/S", "", &[("one", "1")])
                .bag_for(0x7f020000, "style/S", "night", "", &[("one", "2")])
                .bag(0x7f020001, "style/Plain", "", &[("one", "3")]);
        });
        let mut am = manager(vec![base]);
        am.set_configurations(vec!["notnight".parse().unwrap()], false)
            .unwrap();

        let day = am.get_bag(0x7f020000).unwrap();
        let plain = am.get_bag(0x7f020001).unwrap();
        assert_eq!(day.entries[0].value, Value::int(1));
        assert!(day.type_spec_flags.contains(ConfigChanges::UI_MODE));

        am.set_configurations(vec!["night".parse().unwrap()], false)
            .unwrap();
        assert_eq!(am.bag_cache.borrow().len(), 1);
        let night = am.get_bag(0x7f020000).unwrap();
        assert_eq!(night.entries[0].value, Value::int(2));
        assert!(Arc::ptr_eq(&plain, &am.get_bag(0x7f020001).unwrap()));
    }

    #[test]
    fn layers_follow_locale_fallbacks() {
        let base = source("base.json", PropertyFlags::empty(), |b| {
            attrs(b)
                .value(0x7f040000, "string/hello", "Hello")
                .value_for(0x7f040000, "string/hello", "de", "Hallo")
                .bag(0x7f020000, "style/S", "", &[("one", "1")])
                .bag_for(0x7f020000, "style/S", "de", "", &[("one", "2")]);
        });
        let mut am = manager(vec![base]);
        am.set_configurations(vec!["it".parse().unwrap(), "de".parse().unwrap()], false)
            .unwrap();

        let hello = am.get_resource(0x7f040000, false, None).unwrap();
        assert_eq!(am.format_value(&hello), "Hallo");
        assert_eq!(am.get_bag(0x7f020000).unwrap().entries[0].value, Value::int(2));
        assert_eq!(am.find_bag_entry(0x7f020000, A1).unwrap().value, Value::int(2));
    }

    #[test]
    fn cache_is_dropped_with_sources() {
        let first = source("first.json", PropertyFlags::empty(), |b| {
            attrs(b).bag(0x7f020000, "style/S", "", &[("one", "1")]);
        });
        let second = source("second.json", PropertyFlags::empty(), |b| {
            attrs(b).bag(0x7f020000, "style/S", "", &[("one", "2")]);
        });
        let mut am = manager(vec![first]);
        assert_eq!(am.get_bag(0x7f020000).unwrap().entries[0].value, Value::int(1));

        am.set_sources(vec![second], false);
        assert_eq!(am.get_bag(0x7f020000).unwrap().entries[0].value, Value::int(2));
    }
}
