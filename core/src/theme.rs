//! Themes: an ordered stack of styles merged into one attribute map

use std::collections::hash_map::Entry as MapEntry;

use ahash::AHashMap;
use apk_res_table::{
    ConfigChanges, ResTableConfig, Value, ValueType, is_valid_resid, package_id,
};
use log::{debug, info, warn};
use smallvec::SmallVec;

use crate::asset_manager::{AssetManager, Cookie, SelectedValue};
use crate::errors::ResourceError;
use crate::resolver::MAX_REFERENCE_DEPTH;

/// One attribute of a theme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeEntry {
    pub cookie: Cookie,
    pub type_spec_flags: ConfigChanges,
    pub value: Value,

    /// Style the value was taken from
    pub style: u32,
}

/// A style applied to a theme, with its force flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AppliedStyle {
    pub style: u32,
    pub force: bool,
}

/// Mutable set of attribute values built by applying styles in order
///
/// A theme is bound to the [`AssetManager`] it was created for (or last rebased
/// on); every operation taking a manager checks it is that one.
#[derive(Debug, Clone)]
pub struct Theme {
    registry: u64,
    entries: AHashMap<u32, ThemeEntry>,
    stack: SmallVec<[AppliedStyle; 4]>,
    type_spec_flags: ConfigChanges,
}

/// Undefined entries are `@undefined`, not `@empty`
#[inline]
fn is_undefined(value: &Value) -> bool {
    value.data_type == ValueType::Null && value.data != Value::DATA_NULL_EMPTY
}

impl Theme {
    pub fn new(am: &AssetManager) -> Theme {
        Theme {
            registry: am.tag(),
            entries: AHashMap::new(),
            stack: SmallVec::new(),
            type_spec_flags: ConfigChanges::empty(),
        }
    }

    /// Tag of the manager this theme belongs to
    #[inline]
    pub fn registry(&self) -> u64 {
        self.registry
    }

    pub(crate) fn check_registry(&self, am: &AssetManager) -> Result<(), ResourceError> {
        if self.registry != am.tag() {
            return Err(ResourceError::WrongRegistry);
        }
        Ok(())
    }

    /// Styles applied so far, in order
    #[inline]
    pub fn stack(&self) -> &[AppliedStyle] {
        &self.stack
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Attribute ids with their entries, in ascending attribute order
    pub fn entries(&self) -> Vec<(u32, ThemeEntry)> {
        let mut entries: Vec<_> = self.entries.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_unstable_by_key(|(k, _)| *k);
        entries
    }

    /// Merge the attributes of `style` into this theme
    ///
    /// With `force` every attribute of the style is taken, otherwise only missing
    /// ones are. The style is recorded even when it can't be found, in which case
    /// `false` is returned.
    pub fn apply_style(
        &mut self,
        am: &AssetManager,
        style: u32,
        force: bool,
    ) -> Result<bool, ResourceError> {
        self.check_registry(am)?;
        self.stack.push(AppliedStyle { style, force });
        Ok(self.merge_style(am, style, force))
    }

    fn merge_style(&mut self, am: &AssetManager, style: u32, force: bool) -> bool {
        let Some(bag) = am.get_bag(style) else {
            debug!("style {:#010x} not found, theme unchanged", style);
            return false;
        };

        self.type_spec_flags |= bag.type_spec_flags;

        for entry in &bag.entries {
            if !is_valid_resid(entry.key) {
                warn!(
                    "style {:#010x} sets invalid attribute {:#010x}",
                    style, entry.key
                );
                continue;
            }

            let undefined = is_undefined(&entry.value);
            if !force && undefined {
                continue;
            }

            let new = ThemeEntry {
                cookie: entry.cookie,
                type_spec_flags: bag.type_spec_flags,
                value: entry.value,
                style: entry.style,
            };

            match self.entries.entry(entry.key) {
                MapEntry::Occupied(mut slot) => {
                    if force || is_undefined(&slot.get().value) {
                        if undefined {
                            slot.remove();
                        } else {
                            slot.insert(new);
                        }
                    }
                }
                MapEntry::Vacant(slot) => {
                    if !undefined {
                        slot.insert(new);
                    }
                }
            }
        }

        true
    }

    /// Recompute the theme from its stack against `am`, which it is bound to from now on
    ///
    /// With `stack` the recorded styles are replaced first.
    pub fn rebase(&mut self, am: &AssetManager, stack: Option<&[AppliedStyle]>) {
        if let Some(stack) = stack {
            self.stack = stack.iter().copied().collect();
        }

        self.registry = am.tag();
        self.entries.clear();
        self.type_spec_flags = ConfigChanges::empty();

        let stack = self.stack.clone();
        for applied in &stack {
            self.merge_style(am, applied.style, applied.force);
        }

        debug!(
            "rebased theme on {} style(s), {} attribute(s)",
            stack.len(),
            self.entries.len()
        );
    }

    /// Make this theme a copy of `other`
    ///
    /// Entries and styles are copied as they are. Across managers each cookie is
    /// mapped to the source of `am` with the same path, or made invalid. Strings
    /// without a mapped source and attributes of packages `am` doesn't have are dropped.
    pub fn set_to(
        &mut self,
        am: &AssetManager,
        other: &Theme,
        other_am: &AssetManager,
    ) -> Result<(), ResourceError> {
        self.check_registry(am)?;
        other.check_registry(other_am)?;

        self.stack.clone_from(&other.stack);
        self.type_spec_flags = other.type_spec_flags;

        if self.registry == other.registry {
            self.entries.clone_from(&other.entries);
            return Ok(());
        }

        self.entries.clear();
        for (&attr, entry) in &other.entries {
            if !am.package_groups().iter().any(|g| g.id == package_id(attr)) {
                debug!("dropping attribute {:#010x} of a missing package", attr);
                continue;
            }

            let cookie = other_am
                .get_source_for_cookie(entry.cookie)
                .and_then(|src| am.sources().iter().position(|s| s.path() == src.path()))
                .map(|idx| am.cookie_at(idx))
                .unwrap_or(Cookie::INVALID);
            if !cookie.is_valid() && entry.value.data_type == ValueType::String {
                debug!("dropping string attribute {:#010x} without a source", attr);
                continue;
            }

            self.entries.insert(attr, ThemeEntry { cookie, ..*entry });
        }

        debug!(
            "copied {} of {} attribute(s) across managers",
            self.entries.len(),
            other.entries.len()
        );
        Ok(())
    }

    /// Remove every attribute and style
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stack.clear();
        self.type_spec_flags = ConfigChanges::empty();
    }

    /// Value of `attr` and the style it came from, following `?attr` indirections
    pub(crate) fn lookup(&self, attr: u32) -> Option<(SelectedValue, u32)> {
        let mut attr = attr;
        let mut flags = ConfigChanges::empty();

        for _ in 0..MAX_REFERENCE_DEPTH {
            let entry = self.entries.get(&attr)?;
            flags |= entry.type_spec_flags;

            if entry.value.data_type == ValueType::Attribute {
                attr = entry.value.data;
                continue;
            }

            let value = SelectedValue {
                cookie: entry.cookie,
                value: entry.value,
                resid: 0,
                flags,
                config: ResTableConfig::default(),
            };
            return Some((value, entry.style));
        }

        debug!("attribute chain from {:#010x} is too deep", attr);
        None
    }

    /// Value of `attr` in this theme
    ///
    /// Attribute indirections are followed, resource references are not.
    pub fn get_attribute(&self, attr: u32) -> Option<SelectedValue> {
        self.lookup(attr).map(|(value, _)| value)
    }

    /// Resolve an attribute-typed value through the theme, then follow references
    ///
    /// Returns `false` and leaves `value` untouched if the attribute is not set.
    pub fn resolve_attribute_reference(
        &self,
        am: &AssetManager,
        value: &mut SelectedValue,
    ) -> Result<bool, ResourceError> {
        self.check_registry(am)?;
        Ok(self.resolve_attribute_in(am, value))
    }

    /// [`resolve_attribute_reference`](Self::resolve_attribute_reference) for callers
    /// that already checked `am` is this theme's manager
    pub(crate) fn resolve_attribute_in(&self, am: &AssetManager, value: &mut SelectedValue) -> bool {
        let mut resolved = *value;
        if resolved.data_type() == ValueType::Attribute {
            let Some(attribute) = self.get_attribute(resolved.data()) else {
                return false;
            };
            resolved = SelectedValue {
                flags: resolved.flags | attribute.flags,
                ..attribute
            };
        }

        if !am.resolve_reference(&mut resolved) {
            return false;
        }
        *value = resolved;
        true
    }

    /// Configuration dimensions the applied styles vary over
    #[inline]
    pub fn get_changing_configurations(&self) -> ConfigChanges {
        self.type_spec_flags
    }

    /// Log every attribute of the theme
    pub fn dump(&self, am: &AssetManager) {
        info!(
            "theme with {} style(s), {} attribute(s)",
            self.stack.len(),
            self.entries.len()
        );
        for (attr, entry) in self.entries() {
            let name = am
                .get_resource_name(attr)
                .map(|n| n.to_string())
                .unwrap_or_default();
            let value = SelectedValue {
                cookie: entry.cookie,
                value: entry.value,
                resid: 0,
                flags: entry.type_spec_flags,
                config: ResTableConfig::default(),
            };
            info!(
                "  {:#010x} {} = {} (style {:#010x})",
                attr,
                name,
                am.format_value(&value),
                entry.style
            );
        }
    }
}
