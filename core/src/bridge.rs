//! Scalar surface over the engine for callers across a language boundary
//!
//! Sources, managers, themes and open assets are addressed by [`Handle`]s.
//! Resource ids are `i32`, cookies are 1-based with `<= 0` meaning "no source",
//! and typed values are flat records of integers. Misuse (stale handles, short
//! buffers, bad arguments) is an error; lookups that find nothing return `None`
//! or a sentinel.

use std::collections::BTreeMap;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use apk_res_table::{ResTableConfig, ResourceTable, Value};
use log::debug;
use parking_lot::Mutex;
use serde::Serialize;

use crate::apk_assets::ApkAssets;
use crate::asset::Asset;
use crate::asset_manager::{AssetManager, Cookie, SelectedValue};
use crate::attribute_resolution::{self, AttributeResults, XmlAttributeSet};
use crate::errors::ResourceError;
use crate::guarded::{Guarded, LockedPair};
use crate::handles::{Handle, HandleTable};
use crate::theme::{AppliedStyle, Theme};

pub const STYLE_NUM_ENTRIES: usize = 7;
pub const STYLE_TYPE: usize = 0;
pub const STYLE_DATA: usize = 1;
pub const STYLE_ASSET_COOKIE: usize = 2;
pub const STYLE_RESOURCE_ID: usize = 3;
pub const STYLE_CHANGING_CONFIGURATIONS: usize = 4;
pub const STYLE_DENSITY: usize = 5;
pub const STYLE_SOURCE_RESOURCE_ID: usize = 6;

/// Boundary form of a cookie: 1-based, -1 for no source
pub fn cookie_to_boundary(cookie: Cookie) -> i32 {
    if cookie.is_valid() && cookie.0 < i32::MAX as u32 {
        cookie.0 as i32 + 1
    } else {
        -1
    }
}

pub fn cookie_from_boundary(cookie: i32) -> Cookie {
    if cookie > 0 {
        Cookie(cookie as u32 - 1)
    } else {
        Cookie::INVALID
    }
}

/// Flat form of a resolved value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypedValue {
    pub data_type: i32,
    pub data: i32,
    pub asset_cookie: i32,
    pub resource_id: i32,
    pub changing_configurations: i32,
    pub density: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,
}

impl TypedValue {
    fn new(am: &AssetManager, value: &SelectedValue) -> TypedValue {
        TypedValue {
            data_type: value.data_type().code() as i32,
            data: value.data() as i32,
            asset_cookie: cookie_to_boundary(value.cookie),
            resource_id: value.resid as i32,
            changing_configurations: value.flags.bits() as i32,
            density: value.config.density as i32,
            string: am.value_string(value).map(str::to_owned),
        }
    }
}

fn density_override(density: i32) -> Option<u16> {
    u16::try_from(density).ok().filter(|&d| d != 0)
}

fn parse_config(text: &str) -> Result<ResTableConfig, ResourceError> {
    text.parse()
        .map_err(|err| ResourceError::InvalidArgument(format!("configuration {:?}: {}", text, err)))
}

fn write_results(
    results: &AttributeResults,
    out_values: &mut [i32],
    out_indices: Option<&mut [i32]>,
) -> Result<usize, ResourceError> {
    let needed = results.values.len() * STYLE_NUM_ENTRIES;
    if out_values.len() < needed {
        return Err(ResourceError::BufferTooSmall {
            needed,
            got: out_values.len(),
        });
    }
    if let Some(indices) = &out_indices
        && indices.len() < results.values.len() + 1
    {
        return Err(ResourceError::BufferTooSmall {
            needed: results.values.len() + 1,
            got: indices.len(),
        });
    }

    for (attribute, out) in results
        .values
        .iter()
        .zip(out_values.chunks_exact_mut(STYLE_NUM_ENTRIES))
    {
        let value = &attribute.value;
        out[STYLE_TYPE] = value.data_type().code() as i32;
        out[STYLE_DATA] = value.data() as i32;
        out[STYLE_ASSET_COOKIE] = cookie_to_boundary(value.cookie);
        out[STYLE_RESOURCE_ID] = value.resid as i32;
        out[STYLE_CHANGING_CONFIGURATIONS] = value.flags.bits() as i32;
        out[STYLE_DENSITY] = value.config.density as i32;
        out[STYLE_SOURCE_RESOURCE_ID] = attribute.source_resid as i32;
    }

    if let Some(indices) = out_indices {
        indices[0] = results.indices.len() as i32;
        for (slot, idx) in indices[1..].iter_mut().zip(&results.indices) {
            *slot = *idx as i32;
        }
    }

    Ok(results.indices.len())
}

fn attribute_ids(attrs: &[i32]) -> Vec<u32> {
    attrs.iter().map(|&a| a as u32).collect()
}

type SharedManager = Arc<Guarded<AssetManager>>;
type SharedTheme = Arc<Mutex<Theme>>;

/// Handle-based entry point holding every source, manager, theme and open asset
#[derive(Debug, Default)]
pub struct ResourceBridge {
    sources: Mutex<HandleTable<Arc<ApkAssets>>>,
    managers: Mutex<HandleTable<SharedManager>>,
    themes: Mutex<HandleTable<SharedTheme>>,
    assets: Mutex<HandleTable<Asset>>,
}

impl ResourceBridge {
    pub fn new() -> ResourceBridge {
        ResourceBridge::default()
    }

    fn source(&self, handle: Handle) -> Result<Arc<ApkAssets>, ResourceError> {
        self.sources.lock().get(handle).cloned()
    }

    fn manager(&self, handle: Handle) -> Result<SharedManager, ResourceError> {
        self.managers.lock().get(handle).cloned()
    }

    fn theme(&self, handle: Handle) -> Result<SharedTheme, ResourceError> {
        self.themes.lock().get(handle).cloned()
    }

    // Sources

    pub fn add_source(&self, assets: ApkAssets) -> Handle {
        self.sources.lock().insert(Arc::new(assets))
    }

    /// Load a JSON source, resolving names against already loaded sources
    pub fn load_source(&self, path: &Path, imports: &[Handle]) -> Result<Handle, ResourceError> {
        let imports = imports
            .iter()
            .map(|&h| self.source(h))
            .collect::<Result<Vec<_>, _>>()?;
        let tables: Vec<&ResourceTable> = imports.iter().map(|s| s.table()).collect();

        let assets = ApkAssets::load(path, &tables)?;
        Ok(self.add_source(assets))
    }

    pub fn source_path(&self, source: Handle) -> Result<String, ResourceError> {
        Ok(self.source(source)?.path().to_owned())
    }

    /// Release a source; managers already using it keep their reference
    pub fn close_source(&self, source: Handle) -> Result<(), ResourceError> {
        self.sources.lock().remove(source).map(|_| ())
    }

    // Managers

    pub fn create_manager(&self) -> Handle {
        let manager = Arc::new(Guarded::new(AssetManager::new()));
        self.managers.lock().insert(manager)
    }

    pub fn destroy_manager(&self, manager: Handle) -> Result<(), ResourceError> {
        self.managers.lock().remove(manager).map(|_| ())
    }

    pub fn set_sources(
        &self,
        manager: Handle,
        sources: &[Handle],
        invalidate_caches: bool,
    ) -> Result<(), ResourceError> {
        let sources = sources
            .iter()
            .map(|&h| self.source(h))
            .collect::<Result<Vec<_>, _>>()?;
        let manager = self.manager(manager)?;

        manager.lock().set_sources(sources, invalidate_caches);
        Ok(())
    }

    /// Set the device configuration from qualifier strings, the first one being primary
    pub fn set_configuration(
        &self,
        manager: Handle,
        configurations: &[&str],
        default_locale: Option<&str>,
        force_refresh: bool,
    ) -> Result<(), ResourceError> {
        let configurations = configurations
            .iter()
            .map(|c| parse_config(c))
            .collect::<Result<Vec<_>, _>>()?;
        let default_locale = default_locale.map(parse_config).transpose()?;
        let manager = self.manager(manager)?;

        let mut am = manager.lock();
        am.set_configurations(configurations, force_refresh)?;
        am.set_default_locale(default_locale);
        Ok(())
    }

    pub fn get_assigned_package_identifiers(
        &self,
        manager: Handle,
        include_overlays: bool,
        include_loaders: bool,
    ) -> Result<BTreeMap<i32, String>, ResourceError> {
        let manager = self.manager(manager)?;
        let am = manager.lock();
        Ok(am
            .get_assigned_package_identifiers(include_overlays, include_loaders)
            .into_iter()
            .map(|(id, name)| (id as i32, name))
            .collect())
    }

    pub fn get_resource_value(
        &self,
        manager: Handle,
        resid: i32,
        density: i32,
        resolve_references: bool,
    ) -> Result<Option<TypedValue>, ResourceError> {
        let manager = self.manager(manager)?;
        let am = manager.lock();

        let Some(mut value) = am.get_resource(resid as u32, false, density_override(density))
        else {
            return Ok(None);
        };
        if resolve_references && !am.resolve_reference(&mut value) {
            return Ok(None);
        }
        Ok(Some(TypedValue::new(&am, &value)))
    }

    pub fn get_resource_bag_value(
        &self,
        manager: Handle,
        resid: i32,
        bag_entry_id: i32,
    ) -> Result<Option<TypedValue>, ResourceError> {
        let manager = self.manager(manager)?;
        let am = manager.lock();
        Ok(am
            .find_bag_entry(resid as u32, bag_entry_id as u32)
            .map(|value| TypedValue::new(&am, &value)))
    }

    pub fn get_style_attributes(
        &self,
        manager: Handle,
        resid: i32,
    ) -> Result<Option<Vec<i32>>, ResourceError> {
        let manager = self.manager(manager)?;
        let am = manager.lock();
        Ok(am
            .get_style_attributes(resid as u32)
            .map(|attrs| attrs.into_iter().map(|a| a as i32).collect()))
    }

    pub fn get_resource_string_array(
        &self,
        manager: Handle,
        resid: i32,
    ) -> Result<Option<Vec<Option<String>>>, ResourceError> {
        let manager = self.manager(manager)?;
        let am = manager.lock();
        Ok(am.get_resource_string_array(resid as u32))
    }

    /// `(cookie, string index)` pairs, `(-1, -1)` for elements that are not strings
    pub fn get_resource_string_array_info(
        &self,
        manager: Handle,
        resid: i32,
    ) -> Result<Option<Vec<i32>>, ResourceError> {
        let manager = self.manager(manager)?;
        let am = manager.lock();
        Ok(am.get_resource_string_array_info(resid as u32).map(|items| {
            items
                .into_iter()
                .flat_map(|item| match item {
                    Some((cookie, idx)) => [cookie_to_boundary(cookie), idx as i32],
                    None => [-1, -1],
                })
                .collect()
        }))
    }

    pub fn get_resource_int_array(
        &self,
        manager: Handle,
        resid: i32,
    ) -> Result<Option<Vec<i32>>, ResourceError> {
        let manager = self.manager(manager)?;
        let am = manager.lock();
        Ok(am.get_resource_int_array(resid as u32))
    }

    /// Number of elements, -1 if the array doesn't exist
    pub fn get_resource_array_size(&self, manager: Handle, resid: i32) -> Result<i32, ResourceError> {
        let manager = self.manager(manager)?;
        let am = manager.lock();
        Ok(am
            .get_resource_array_size(resid as u32)
            .map_or(-1, |size| size as i32))
    }

    /// Write `STYLE_NUM_ENTRIES` integers per element into `out`, returning the
    /// number of elements or -1 if the array doesn't exist
    pub fn get_resource_array(
        &self,
        manager: Handle,
        resid: i32,
        out: &mut [i32],
    ) -> Result<i32, ResourceError> {
        let manager = self.manager(manager)?;
        let am = manager.lock();

        let Some(values) = am.get_resource_array(resid as u32) else {
            return Ok(-1);
        };
        if out.len() < values.len() * STYLE_NUM_ENTRIES {
            return Err(ResourceError::InvalidArgument(format!(
                "output of {} entries can't hold {} elements",
                out.len(),
                values.len()
            )));
        }

        for (value, slot) in values.iter().zip(out.chunks_exact_mut(STYLE_NUM_ENTRIES)) {
            let mut value = *value;
            if value.value.is_null_reference() || value.value.is_undefined() {
                value.value = Value::undefined();
                value.cookie = Cookie::INVALID;
            }
            slot[STYLE_TYPE] = value.data_type().code() as i32;
            slot[STYLE_DATA] = value.data() as i32;
            slot[STYLE_ASSET_COOKIE] = cookie_to_boundary(value.cookie);
            slot[STYLE_RESOURCE_ID] = value.resid as i32;
            slot[STYLE_CHANGING_CONFIGURATIONS] = value.flags.bits() as i32;
            slot[STYLE_DENSITY] = value.config.density as i32;
            slot[STYLE_SOURCE_RESOURCE_ID] = 0;
        }
        Ok(values.len() as i32)
    }

    /// Resource id for a name, 0 if there is none
    pub fn get_resource_identifier(
        &self,
        manager: Handle,
        name: &str,
        def_type: Option<&str>,
        def_package: Option<&str>,
    ) -> Result<i32, ResourceError> {
        if name.is_empty() {
            return Err(ResourceError::InvalidArgument("empty resource name".to_owned()));
        }
        let manager = self.manager(manager)?;
        let am = manager.lock();
        Ok(am
            .get_resource_id(name, def_type, def_package)
            .map_or(0, |id| id as i32))
    }

    pub fn get_resource_name(&self, manager: Handle, resid: i32) -> Result<Option<String>, ResourceError> {
        let manager = self.manager(manager)?;
        let am = manager.lock();
        Ok(am.get_resource_name(resid as u32).map(|n| n.to_string()))
    }

    pub fn get_resource_package_name(
        &self,
        manager: Handle,
        resid: i32,
    ) -> Result<Option<String>, ResourceError> {
        let manager = self.manager(manager)?;
        let am = manager.lock();
        Ok(am.get_resource_name(resid as u32).map(|n| n.package))
    }

    pub fn get_resource_type_name(
        &self,
        manager: Handle,
        resid: i32,
    ) -> Result<Option<String>, ResourceError> {
        let manager = self.manager(manager)?;
        let am = manager.lock();
        Ok(am.get_resource_name(resid as u32).map(|n| n.type_name))
    }

    pub fn get_resource_entry_name(
        &self,
        manager: Handle,
        resid: i32,
    ) -> Result<Option<String>, ResourceError> {
        let manager = self.manager(manager)?;
        let am = manager.lock();
        Ok(am.get_resource_name(resid as u32).map(|n| n.entry))
    }

    pub fn get_locales(&self, manager: Handle, exclude_system: bool) -> Result<Vec<String>, ResourceError> {
        let manager = self.manager(manager)?;
        let am = manager.lock();
        Ok(am.get_locales(exclude_system).into_iter().collect())
    }

    pub fn get_resource_configurations(
        &self,
        manager: Handle,
        exclude_system: bool,
        exclude_mipmap: bool,
    ) -> Result<Vec<String>, ResourceError> {
        let manager = self.manager(manager)?;
        let am = manager.lock();
        Ok(am
            .get_resource_configurations(exclude_system, exclude_mipmap)
            .iter()
            .map(|c| c.to_string())
            .collect())
    }

    /// Parent of a style, 0 if there is none
    pub fn get_parent_theme_identifier(&self, manager: Handle, resid: i32) -> Result<i32, ResourceError> {
        let manager = self.manager(manager)?;
        let am = manager.lock();
        Ok(am
            .get_parent_theme_resource_id(resid as u32)
            .map_or(0, |id| id as i32))
    }

    pub fn set_resource_resolution_logging_enabled(
        &self,
        manager: Handle,
        enabled: bool,
    ) -> Result<(), ResourceError> {
        let manager = self.manager(manager)?;
        manager.lock().set_resource_resolution_logging_enabled(enabled);
        Ok(())
    }

    pub fn get_last_resource_resolution(&self, manager: Handle) -> Result<Option<String>, ResourceError> {
        let manager = self.manager(manager)?;
        let am = manager.lock();
        Ok(am.get_last_resource_resolution())
    }

    // Assets

    pub fn open_asset(&self, manager: Handle, name: &str) -> Result<Option<Handle>, ResourceError> {
        let manager = self.manager(manager)?;
        let asset = manager.lock().open(name);
        Ok(asset.map(|(_, asset)| self.assets.lock().insert(asset)))
    }

    pub fn open_non_asset(
        &self,
        manager: Handle,
        cookie: i32,
        name: &str,
    ) -> Result<Option<Handle>, ResourceError> {
        let manager = self.manager(manager)?;
        let asset = manager.lock().open_non_asset(cookie_from_boundary(cookie), name);
        Ok(asset.map(|asset| self.assets.lock().insert(asset)))
    }

    pub fn list(&self, manager: Handle, path: &str) -> Result<Vec<String>, ResourceError> {
        let manager = self.manager(manager)?;
        let am = manager.lock();
        Ok(am.list(path))
    }

    /// Next byte, -1 at the end
    pub fn asset_read_char(&self, asset: Handle) -> Result<i32, ResourceError> {
        let mut assets = self.assets.lock();
        Ok(assets.get_mut(asset)?.read_byte().map_or(-1, i32::from))
    }

    /// Bytes read into `buf`, -1 at the end
    pub fn asset_read(&self, asset: Handle, buf: &mut [u8]) -> Result<i32, ResourceError> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut assets = self.assets.lock();
        let read = assets.get_mut(asset)?.read(buf)?;
        Ok(if read == 0 { -1 } else { read as i32 })
    }

    /// Move the read position, `whence` is 0 (start), 1 (current) or 2 (end);
    /// -1 if the position would be negative
    pub fn asset_seek(&self, asset: Handle, offset: i64, whence: i32) -> Result<i64, ResourceError> {
        let pos = match whence {
            0 => SeekFrom::Start(u64::try_from(offset).unwrap_or(u64::MAX)),
            1 => SeekFrom::Current(offset),
            2 => SeekFrom::End(offset),
            _ => {
                return Err(ResourceError::InvalidArgument(format!(
                    "unknown seek origin {}",
                    whence
                )));
            }
        };
        if whence == 0 && offset < 0 {
            return Ok(-1);
        }

        let mut assets = self.assets.lock();
        Ok(assets
            .get_mut(asset)?
            .seek(pos)
            .map_or(-1, |pos| pos as i64))
    }

    pub fn asset_get_length(&self, asset: Handle) -> Result<i64, ResourceError> {
        Ok(self.assets.lock().get(asset)?.length() as i64)
    }

    pub fn asset_get_remaining_length(&self, asset: Handle) -> Result<i64, ResourceError> {
        Ok(self.assets.lock().get(asset)?.remaining_length() as i64)
    }

    pub fn destroy_asset(&self, asset: Handle) -> Result<(), ResourceError> {
        self.assets.lock().remove(asset).map(|_| ())
    }

    // Themes

    pub fn create_theme(&self, manager: Handle) -> Result<Handle, ResourceError> {
        let manager = self.manager(manager)?;
        let theme = Theme::new(&manager.lock());
        Ok(self.themes.lock().insert(Arc::new(Mutex::new(theme))))
    }

    pub fn destroy_theme(&self, theme: Handle) -> Result<(), ResourceError> {
        self.themes.lock().remove(theme).map(|_| ())
    }

    pub fn theme_apply_style(
        &self,
        manager: Handle,
        theme: Handle,
        resid: i32,
        force: bool,
    ) -> Result<(), ResourceError> {
        let manager = self.manager(manager)?;
        let theme = self.theme(theme)?;

        let am = manager.lock();
        let applied = theme.lock().apply_style(&am, resid as u32, force)?;
        if !applied {
            debug!("style {:#010x} was not applied", resid);
        }
        Ok(())
    }

    /// Replay the first `count` styles of `style_ids`/`force` against `manager`
    pub fn theme_rebase(
        &self,
        manager: Handle,
        theme: Handle,
        style_ids: &[i32],
        force: &[bool],
        count: usize,
    ) -> Result<(), ResourceError> {
        if count > style_ids.len() || count > force.len() {
            return Err(ResourceError::InvalidArgument(format!(
                "{} styles requested, {} ids and {} flags given",
                count,
                style_ids.len(),
                force.len()
            )));
        }
        let stack: Vec<AppliedStyle> = style_ids[..count]
            .iter()
            .zip(&force[..count])
            .map(|(&style, &force)| AppliedStyle {
                style: style as u32,
                force,
            })
            .collect();

        let manager = self.manager(manager)?;
        let theme = self.theme(theme)?;

        let am = manager.lock();
        theme.lock().rebase(&am, Some(&stack));
        Ok(())
    }

    /// Make `dst_theme` a copy of `src_theme`, holding both managers' locks
    pub fn theme_copy(
        &self,
        dst_manager: Handle,
        dst_theme: Handle,
        src_manager: Handle,
        src_theme: Handle,
    ) -> Result<(), ResourceError> {
        let dst_am = self.manager(dst_manager)?;
        let src_am = self.manager(src_manager)?;
        let dst = self.theme(dst_theme)?;
        let src = self.theme(src_theme)?;

        let locked = Guarded::lock_pair(&*dst_am, &*src_am);
        let (dst_guard, src_guard) = match &locked {
            LockedPair::Same(am) => (&**am, &**am),
            LockedPair::Distinct(dst_am, src_am) => (&**dst_am, &**src_am),
        };

        if Arc::ptr_eq(&dst, &src) {
            return dst.lock().check_registry(dst_guard);
        }

        let (mut dst_locked, src_locked) = if dst_theme < src_theme {
            let d = dst.lock();
            (d, src.lock())
        } else {
            let s = src.lock();
            (dst.lock(), s)
        };
        dst_locked.set_to(dst_guard, &src_locked, src_guard)
    }

    pub fn theme_clear(&self, theme: Handle) -> Result<(), ResourceError> {
        self.theme(theme)?.lock().clear();
        Ok(())
    }

    pub fn theme_get_attribute_value(
        &self,
        manager: Handle,
        theme: Handle,
        resid: i32,
        resolve_references: bool,
    ) -> Result<Option<TypedValue>, ResourceError> {
        let manager = self.manager(manager)?;
        let theme = self.theme(theme)?;

        let am = manager.lock();
        let theme = theme.lock();
        theme.check_registry(&am)?;

        let Some(mut value) = theme.get_attribute(resid as u32) else {
            return Ok(None);
        };
        if resolve_references && !am.resolve_reference(&mut value) {
            return Ok(None);
        }
        Ok(Some(TypedValue::new(&am, &value)))
    }

    pub fn theme_get_changing_configurations(&self, theme: Handle) -> Result<i32, ResourceError> {
        Ok(self.theme(theme)?.lock().get_changing_configurations().bits() as i32)
    }

    pub fn theme_dump(&self, manager: Handle, theme: Handle) -> Result<(), ResourceError> {
        let manager = self.manager(manager)?;
        let theme = self.theme(theme)?;

        let am = manager.lock();
        let theme = theme.lock();
        theme.check_registry(&am)?;
        theme.dump(&am);
        Ok(())
    }

    // Attribute retrieval

    /// `values` holds an attribute id per slot to take the value from, 0 for none.
    /// Returns the number of defined attributes.
    #[allow(clippy::too_many_arguments)]
    pub fn resolve_attrs(
        &self,
        manager: Handle,
        theme: Handle,
        def_style_attr: i32,
        def_style_res: i32,
        values: Option<&[i32]>,
        attrs: &[i32],
        out_values: &mut [i32],
        out_indices: Option<&mut [i32]>,
    ) -> Result<usize, ResourceError> {
        let values: Option<Vec<Value>> = values.map(|values| {
            values
                .iter()
                .map(|&v| {
                    if v == 0 {
                        Value::undefined()
                    } else {
                        Value::attribute(v as u32)
                    }
                })
                .collect()
        });

        let manager = self.manager(manager)?;
        let theme = self.theme(theme)?;
        let am = manager.lock();
        let theme = theme.lock();

        let results = attribute_resolution::resolve_attrs(
            &am,
            &theme,
            def_style_attr as u32,
            def_style_res as u32,
            values.as_deref(),
            &attribute_ids(attrs),
        )?;
        write_results(&results, out_values, out_indices)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn apply_style(
        &self,
        manager: Handle,
        theme: Handle,
        xml: Option<&XmlAttributeSet>,
        def_style_attr: i32,
        def_style_res: i32,
        attrs: &[i32],
        out_values: &mut [i32],
        out_indices: Option<&mut [i32]>,
    ) -> Result<usize, ResourceError> {
        let manager = self.manager(manager)?;
        let theme = self.theme(theme)?;
        let am = manager.lock();
        let theme = theme.lock();

        let results = attribute_resolution::apply_style(
            &am,
            &theme,
            xml,
            def_style_attr as u32,
            def_style_res as u32,
            &attribute_ids(attrs),
        )?;
        write_results(&results, out_values, out_indices)
    }

    pub fn retrieve_attributes(
        &self,
        manager: Handle,
        xml: &XmlAttributeSet,
        attrs: &[i32],
        out_values: &mut [i32],
        out_indices: Option<&mut [i32]>,
    ) -> Result<usize, ResourceError> {
        let manager = self.manager(manager)?;
        let am = manager.lock();

        let results = attribute_resolution::retrieve_attributes(&am, xml, &attribute_ids(attrs));
        write_results(&results, out_values, out_indices)
    }

    pub fn get_style_attribute_resolution_stack(
        &self,
        manager: Handle,
        theme: Handle,
        xml_style: i32,
        def_style_attr: i32,
        def_style_res: i32,
    ) -> Result<Vec<i32>, ResourceError> {
        let manager = self.manager(manager)?;
        let theme = self.theme(theme)?;
        let am = manager.lock();
        let theme = theme.lock();

        let stack = attribute_resolution::attribute_resolution_stack(
            &am,
            &theme,
            xml_style as u32,
            def_style_attr as u32,
            def_style_res as u32,
        )?;
        Ok(stack.into_iter().map(|id| id as i32).collect())
    }
}

#[cfg(test)]
mod tests {
    use apk_res_table::{TableBuilder, ValueType};
    use proptest::prelude::*;

    use crate::apk_assets::PropertyFlags;

    use super::*;

    const ATTR_COLOR: i32 = 0x7f010000;
    const ATTR_SIZE: i32 = 0x7f010001;
    const STYLE: i32 = 0x7f020000;
    const OTHER_STYLE: i32 = 0x7f020001;
    const RED: i32 = 0x7f030000;
    const ITEMS: i32 = 0x7f040000;

    fn app_source(bridge: &ResourceBridge, color: &str) -> Handle {
        let mut builder = TableBuilder::new();
        builder
            .package(0x7f, "app")
            .value(ATTR_COLOR as u32, "attr/color", "0")
            .value(ATTR_SIZE as u32, "attr/size", "0")
            .value(RED as u32, "color/red", color)
            .value_for(RED as u32, "color/red", "hdpi", "#00ff00")
            .bag(STYLE as u32, "style/Base", "", &[("color", "@color/red"), ("size", "4dp")])
            .bag(OTHER_STYLE as u32, "style/Other", "Base", &[("size", "8dp")])
            .array(ITEMS as u32, "array/items", &["one", "@color/red", "@null"]);
        let table = builder.build().unwrap();
        bridge.add_source(
            ApkAssets::new("app.json", table, PropertyFlags::empty())
                .with_asset("fonts/a.ttf", b"abc"),
        )
    }

    fn setup() -> (ResourceBridge, Handle, Handle) {
        let bridge = ResourceBridge::new();
        let source = app_source(&bridge, "#ff0000");
        let manager = bridge.create_manager();
        bridge.set_sources(manager, &[source], true).unwrap();
        (bridge, manager, source)
    }

    #[test]
    fn values_at_the_boundary() {
        let (bridge, am, _) = setup();

        let red = bridge.get_resource_value(am, RED, 0, false).unwrap().unwrap();
        assert_eq!(red.data_type, ValueType::ColorRgb8.code() as i32);
        assert_eq!(red.data as u32, 0xffff0000);
        assert_eq!(red.asset_cookie, 1);
        assert_eq!(red.resource_id, RED);

        let hdpi = bridge.get_resource_value(am, RED, 240, false).unwrap().unwrap();
        assert_eq!(hdpi.data as u32, 0xff00ff00);
        assert_eq!(hdpi.density, 240);

        assert!(bridge.get_resource_value(am, 0x7f03_0009, 0, true).unwrap().is_none());
        assert!(bridge.get_resource_value(am, STYLE, 0, true).unwrap().is_none());

        let size = bridge.get_resource_bag_value(am, OTHER_STYLE, ATTR_SIZE).unwrap().unwrap();
        assert_eq!(size.data_type, ValueType::Dimension.code() as i32);

        assert_eq!(bridge.get_resource_identifier(am, "color/red", None, None).unwrap(), RED);
        assert_eq!(bridge.get_resource_identifier(am, "color/blue", None, None).unwrap(), 0);
        assert!(bridge.get_resource_identifier(am, "", None, None).is_err());
        assert_eq!(
            bridge.get_resource_name(am, RED).unwrap().as_deref(),
            Some("app:color/red")
        );
        assert_eq!(bridge.get_resource_type_name(am, RED).unwrap().as_deref(), Some("color"));
        assert_eq!(bridge.get_parent_theme_identifier(am, OTHER_STYLE).unwrap(), STYLE);
        assert_eq!(bridge.get_parent_theme_identifier(am, STYLE).unwrap(), 0);
    }

    #[test]
    fn arrays_at_the_boundary() {
        let (bridge, am, _) = setup();

        assert_eq!(bridge.get_resource_array_size(am, ITEMS).unwrap(), 3);
        assert_eq!(bridge.get_resource_array_size(am, 0x7f04_0009).unwrap(), -1);

        let info = bridge.get_resource_string_array_info(am, ITEMS).unwrap().unwrap();
        assert_eq!(info.len(), 6);
        assert_eq!(info[0], 1);
        assert_eq!(&info[2..], &[-1, -1, -1, -1]);

        let mut out = [0i32; 3 * STYLE_NUM_ENTRIES];
        assert_eq!(bridge.get_resource_array(am, ITEMS, &mut out).unwrap(), 3);
        let second = &out[STYLE_NUM_ENTRIES..2 * STYLE_NUM_ENTRIES];
        assert_eq!(second[STYLE_RESOURCE_ID], RED);
        assert_eq!(second[STYLE_ASSET_COOKIE], 1);
        let third = &out[2 * STYLE_NUM_ENTRIES..];
        assert_eq!(third[STYLE_TYPE], ValueType::Null.code() as i32);
        assert_eq!(third[STYLE_ASSET_COOKIE], -1);

        let mut short = [0i32; STYLE_NUM_ENTRIES];
        assert!(matches!(
            bridge.get_resource_array(am, ITEMS, &mut short),
            Err(ResourceError::InvalidArgument(_))
        ));
        assert_eq!(bridge.get_resource_array(am, 0x7f04_0009, &mut short).unwrap(), -1);
    }

    #[test]
    fn stale_handles() {
        let (bridge, am, source) = setup();
        bridge.close_source(source).unwrap();

        assert!(matches!(
            bridge.set_sources(am, &[source], true),
            Err(ResourceError::StaleHandle)
        ));
        // the manager still holds the closed source
        assert!(bridge.get_resource_value(am, RED, 0, false).unwrap().is_some());

        let theme = bridge.create_theme(am).unwrap();
        bridge.destroy_theme(theme).unwrap();
        assert!(matches!(
            bridge.theme_apply_style(am, theme, STYLE, true),
            Err(ResourceError::StaleHandle)
        ));

        bridge.destroy_manager(am).unwrap();
        assert!(matches!(
            bridge.get_resource_value(am, RED, 0, false),
            Err(ResourceError::StaleHandle)
        ));
        assert!(bridge.source_path(Handle::from_raw(0)).is_err());
    }

    #[test]
    fn cookies_of_replaced_sources() {
        let (bridge, am, source) = setup();
        let cookie = bridge.get_resource_value(am, RED, 0, false).unwrap().unwrap().asset_cookie;
        assert!(bridge.open_non_asset(am, cookie, "fonts/a.ttf").unwrap().is_some());

        bridge.set_sources(am, &[source], true).unwrap();
        assert!(bridge.open_non_asset(am, cookie, "fonts/a.ttf").unwrap().is_none());
        let fresh = bridge.get_resource_value(am, RED, 0, false).unwrap().unwrap().asset_cookie;
        assert_ne!(fresh, cookie);
        assert!(bridge.open_non_asset(am, fresh, "fonts/a.ttf").unwrap().is_some());
        assert!(bridge.open_non_asset(am, 0, "fonts/a.ttf").unwrap().is_none());
    }

    #[test]
    fn asset_streaming() {
        let (bridge, am, _) = setup();
        assert!(bridge.open_asset(am, "missing").unwrap().is_none());
        assert_eq!(bridge.list(am, "fonts").unwrap(), vec!["a.ttf".to_owned()]);

        let asset = bridge.open_asset(am, "fonts/a.ttf").unwrap().unwrap();
        assert_eq!(bridge.asset_get_length(asset).unwrap(), 3);
        assert_eq!(bridge.asset_read_char(asset).unwrap(), b'a' as i32);
        assert_eq!(bridge.asset_get_remaining_length(asset).unwrap(), 2);

        let mut buf = [0u8; 8];
        assert_eq!(bridge.asset_read(asset, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"bc");
        assert_eq!(bridge.asset_read(asset, &mut buf).unwrap(), -1);
        assert_eq!(bridge.asset_read_char(asset).unwrap(), -1);

        assert_eq!(bridge.asset_seek(asset, -2, 2).unwrap(), 1);
        assert_eq!(bridge.asset_seek(asset, -5, 1).unwrap(), -1);
        assert_eq!(bridge.asset_seek(asset, -1, 0).unwrap(), -1);
        assert!(bridge.asset_seek(asset, 0, 7).is_err());

        bridge.destroy_asset(asset).unwrap();
        assert!(matches!(
            bridge.asset_get_length(asset),
            Err(ResourceError::StaleHandle)
        ));
    }

    #[test]
    fn themes_at_the_boundary() {
        let (bridge, am, _) = setup();
        let theme = bridge.create_theme(am).unwrap();
        bridge.theme_apply_style(am, theme, OTHER_STYLE, false).unwrap();
        bridge.theme_apply_style(am, theme, 0x7f02_0009, false).unwrap();

        let color = bridge.theme_get_attribute_value(am, theme, ATTR_COLOR, false).unwrap().unwrap();
        assert_eq!(color.data_type, ValueType::Reference.code() as i32);
        let color = bridge.theme_get_attribute_value(am, theme, ATTR_COLOR, true).unwrap().unwrap();
        assert_eq!(color.resource_id, RED);
        assert!(bridge.theme_get_attribute_value(am, theme, 0x7f01_0009, true).unwrap().is_none());

        let copy = bridge.create_theme(am).unwrap();
        bridge.theme_copy(am, copy, am, theme).unwrap();
        bridge.theme_copy(am, copy, am, copy).unwrap();
        let size = bridge.theme_get_attribute_value(am, copy, ATTR_SIZE, false).unwrap().unwrap();
        assert_eq!(size.data_type, ValueType::Dimension.code() as i32);

        let other_am = bridge.create_manager();
        let source = app_source(&bridge, "#0000ff");
        bridge.set_sources(other_am, &[source], true).unwrap();
        let foreign = bridge.create_theme(other_am).unwrap();
        bridge.theme_copy(other_am, foreign, am, theme).unwrap();
        let copied = bridge
            .theme_get_attribute_value(other_am, foreign, ATTR_COLOR, false)
            .unwrap()
            .unwrap();
        assert_eq!(copied.data as u32, RED as u32);
        assert_eq!(copied.asset_cookie, 1);
        let color = bridge
            .theme_get_attribute_value(other_am, foreign, ATTR_COLOR, true)
            .unwrap()
            .unwrap();
        assert_eq!(color.data as u32, 0xff0000ff);

        assert!(matches!(
            bridge.theme_get_attribute_value(other_am, theme, ATTR_COLOR, true),
            Err(ResourceError::WrongRegistry)
        ));

        bridge.theme_rebase(am, theme, &[STYLE], &[true], 1).unwrap();
        let size = bridge.theme_get_attribute_value(am, theme, ATTR_SIZE, false).unwrap().unwrap();
        let base_size = bridge.get_resource_bag_value(am, STYLE, ATTR_SIZE).unwrap().unwrap();
        assert_eq!(size.data, base_size.data);
        assert!(matches!(
            bridge.theme_rebase(am, theme, &[STYLE], &[], 1),
            Err(ResourceError::InvalidArgument(_))
        ));

        bridge.theme_clear(theme).unwrap();
        assert!(bridge.theme_get_attribute_value(am, theme, ATTR_SIZE, false).unwrap().is_none());
        assert_eq!(bridge.theme_get_changing_configurations(theme).unwrap(), 0);
    }

    #[test]
    fn attribute_retrieval_at_the_boundary() {
        let (bridge, am, _) = setup();
        let theme = bridge.create_theme(am).unwrap();
        bridge.theme_apply_style(am, theme, STYLE, false).unwrap();

        let attrs = [ATTR_COLOR, ATTR_SIZE];
        let mut out = [0i32; 2 * STYLE_NUM_ENTRIES];
        let mut indices = [0i32; 3];
        let defined = bridge
            .resolve_attrs(am, theme, 0, OTHER_STYLE, None, &attrs, &mut out, Some(&mut indices))
            .unwrap();
        assert_eq!(defined, 2);
        assert_eq!(indices, [2, 0, 1]);
        assert_eq!(out[STYLE_RESOURCE_ID], RED);
        assert_eq!(out[STYLE_SOURCE_RESOURCE_ID], STYLE);
        assert_eq!(out[STYLE_NUM_ENTRIES + STYLE_SOURCE_RESOURCE_ID], OTHER_STYLE);

        let mut short = [0i32; STYLE_NUM_ENTRIES];
        assert!(matches!(
            bridge.resolve_attrs(am, theme, 0, 0, None, &attrs, &mut short, None),
            Err(ResourceError::BufferTooSmall { needed: 14, got: 7 })
        ));

        let mut xml = XmlAttributeSet::new();
        xml.push(ATTR_SIZE as u32, Value::int(3));
        let defined = bridge
            .retrieve_attributes(am, &xml, &attrs, &mut out, Some(&mut indices))
            .unwrap();
        assert_eq!(defined, 1);
        assert_eq!(indices[..2], [1, 1]);
        assert_eq!(out[STYLE_NUM_ENTRIES + STYLE_DATA], 3);
        assert_eq!(out[STYLE_NUM_ENTRIES + STYLE_ASSET_COOKIE], -1);

        let defined = bridge
            .apply_style(am, theme, Some(&xml), 0, OTHER_STYLE, &attrs, &mut out, None)
            .unwrap();
        assert_eq!(defined, 2);

        assert_eq!(
            bridge
                .get_style_attribute_resolution_stack(am, theme, 0, 0, OTHER_STYLE)
                .unwrap(),
            vec![OTHER_STYLE, STYLE]
        );
    }

    #[test]
    fn configuration_and_logging() {
        let (bridge, am, _) = setup();
        assert!(matches!(
            bridge.set_configuration(am, &["not a qualifier"], None, false),
            Err(ResourceError::InvalidArgument(_))
        ));
        assert!(matches!(
            bridge.set_configuration(am, &[], None, false),
            Err(ResourceError::InvalidArgument(_))
        ));
        bridge.set_configuration(am, &["hdpi"], Some("en"), false).unwrap();
        let red = bridge.get_resource_value(am, RED, 0, false).unwrap().unwrap();
        assert_eq!(red.data as u32, 0xff00ff00);

        bridge.set_resource_resolution_logging_enabled(am, true).unwrap();
        bridge.get_resource_value(am, RED, 0, false).unwrap();
        let log = bridge.get_last_resource_resolution(am).unwrap().unwrap();
        assert!(log.contains("Best matching is from hdpi configuration of app.json"));

        assert_eq!(
            bridge.get_assigned_package_identifiers(am, true, true).unwrap(),
            BTreeMap::from([(0x7f, "app".to_owned())])
        );
        assert_eq!(
            bridge.get_resource_configurations(am, false, false).unwrap(),
            vec!["".to_owned(), "hdpi".to_owned()]
        );
        assert!(bridge.get_locales(am, false).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn cookie_translation(cookie in 0u32..i32::MAX as u32, boundary in i32::MIN..=0) {
            prop_assert_eq!(cookie_to_boundary(Cookie(cookie)), cookie as i32 + 1);
            prop_assert_eq!(cookie_from_boundary(cookie as i32 + 1), Cookie(cookie));
            prop_assert!(!cookie_from_boundary(boundary).is_valid());
            prop_assert!(cookie_to_boundary(Cookie::INVALID) <= 0);
        }
    }
}
