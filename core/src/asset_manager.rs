use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use apk_res_table::{
    ConfigChanges, ConfigEntry, Entry, EntryData, ResTableConfig, ResourceName, Value, ValueType,
    is_valid_resid, package_id,
};
use log::{debug, info, warn};
use once_cell::unsync::OnceCell;

use crate::apk_assets::{ApkAssets, PropertyFlags};
use crate::asset::Asset;
use crate::bag::CachedBag;
use crate::errors::ResourceError;
use crate::selector::{self, Candidate, SourceRank};

static NEXT_TAG: AtomicU64 = AtomicU64::new(1);

/// Identifies one asset source within one generation of an [`AssetManager`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Cookie(pub u32);

impl Cookie {
    /// No source
    pub const INVALID: Cookie = Cookie(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Cookie::INVALID
    }
}

/// Result of resolving one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedValue {
    /// Source the value was found in
    pub cookie: Cookie,

    pub value: Value,

    /// Resource id the value was defined for, 0 if it did not come from a table entry
    pub resid: u32,

    /// Configuration dimensions the value varies over
    pub flags: ConfigChanges,

    /// Configuration the value was defined for
    pub config: ResTableConfig,
}

impl SelectedValue {
    /// Value not backed by any source, e.g. from an XML attribute
    pub fn detached(value: Value) -> SelectedValue {
        SelectedValue {
            cookie: Cookie::INVALID,
            value,
            resid: 0,
            flags: ConfigChanges::empty(),
            config: ResTableConfig::default(),
        }
    }

    #[inline]
    pub fn data_type(&self) -> ValueType {
        self.value.data_type
    }

    #[inline]
    pub fn data(&self) -> u32 {
        self.value.data
    }
}

/// All sources defining one package id
#[derive(Debug, Clone)]
pub struct PackageGroup {
    pub id: u8,
    pub name: String,
    /// Indices into the source list, in priority order
    pub(crate) sources: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepKind {
    Initial,
    Better,
    Overlaid,
    Skipped,
}

#[derive(Debug, Clone)]
struct ResolutionStep {
    kind: StepKind,
    source: String,
    config: ResTableConfig,
}

/// Trace of the last resource lookup, kept when resolution logging is enabled
#[derive(Debug, Clone, Default)]
struct Resolution {
    resid: u32,
    config: ResTableConfig,
    steps: Vec<ResolutionStep>,
    best: Option<(String, ResTableConfig)>,
}

/// The best definition of a resource found by [`AssetManager::find_entry`]
#[derive(Debug, Clone, Copy)]
pub(crate) struct FindEntryResult<'a> {
    pub(crate) cookie: Cookie,
    pub(crate) source: &'a ApkAssets,
    pub(crate) entry: &'a Entry,
    pub(crate) config_entry: &'a ConfigEntry,
}

/// Ordered collection of asset sources with the device configuration to resolve against
///
/// Every lookup goes through one registry; it is usually owned by a
/// [`Guarded`](crate::Guarded) so that multi-source reads are consistent.
#[derive(Debug)]
pub struct AssetManager {
    tag: u64,

    sources: Vec<Arc<ApkAssets>>,

    /// Cookie of the first source, grows with every replacement of the source list
    cookie_base: u32,
    generation: u64,

    package_groups: OnceCell<Vec<PackageGroup>>,

    configurations: Vec<ResTableConfig>,
    default_locale: Option<ResTableConfig>,

    pub(crate) bag_cache: RefCell<AHashMap<u32, CachedBag>>,

    resolution_logging: bool,
    last_resolution: RefCell<Option<Resolution>>,
}

impl Default for AssetManager {
    fn default() -> Self {
        AssetManager::new()
    }
}

impl AssetManager {
    pub fn new() -> AssetManager {
        AssetManager {
            tag: NEXT_TAG.fetch_add(1, Ordering::Relaxed),
            sources: Vec::new(),
            cookie_base: 0,
            generation: 0,
            package_groups: OnceCell::new(),
            configurations: vec![ResTableConfig::default()],
            default_locale: None,
            bag_cache: RefCell::new(AHashMap::new()),
            resolution_logging: false,
            last_resolution: RefCell::new(None),
        }
    }

    /// Identity of this registry, unique within the process
    #[inline]
    pub fn tag(&self) -> u64 {
        self.tag
    }

    /// Incremented every time the source list is replaced
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn install(&mut self, sources: Vec<Arc<ApkAssets>>) {
        self.cookie_base = self.cookie_base.wrapping_add(self.sources.len() as u32);
        self.generation += 1;
        self.sources = sources;
        self.package_groups = OnceCell::new();
    }

    /// Replace all sources; cookies issued for the previous sources become invalid
    pub fn set_sources(&mut self, sources: Vec<Arc<ApkAssets>>, invalidate_caches: bool) {
        self.install(sources);
        let groups = self.package_groups().len();

        if invalidate_caches {
            self.bag_cache.borrow_mut().clear();
        }

        info!(
            "installed {} source(s) with {} package group(s), generation {}",
            self.sources.len(),
            groups,
            self.generation
        );
    }

    /// Replace all sources without building the package index
    pub fn preset_sources(&mut self, sources: Vec<Arc<ApkAssets>>) {
        self.install(sources);
        debug!("preset {} source(s), generation {}", self.sources.len(), self.generation);
    }

    #[inline]
    pub fn sources(&self) -> &[Arc<ApkAssets>] {
        &self.sources
    }

    #[inline]
    pub(crate) fn cookie_at(&self, index: usize) -> Cookie {
        Cookie(self.cookie_base.wrapping_add(index as u32))
    }

    /// Position of the source identified by `cookie`, `None` for cookies of other generations
    pub(crate) fn source_index(&self, cookie: Cookie) -> Option<usize> {
        if !cookie.is_valid() {
            return None;
        }
        let index = cookie.0.wrapping_sub(self.cookie_base) as usize;
        (index < self.sources.len()).then_some(index)
    }

    pub fn get_source_for_cookie(&self, cookie: Cookie) -> Option<&Arc<ApkAssets>> {
        self.source_index(cookie).map(|idx| &self.sources[idx])
    }

    pub(crate) fn rank(&self, index: usize) -> SourceRank {
        SourceRank {
            preferred: !self.sources[index].is_lower_priority(),
            position: index,
        }
    }

    /// Package groups, built on first use after the sources changed
    pub fn package_groups(&self) -> &[PackageGroup] {
        self.package_groups.get_or_init(|| {
            let mut groups: BTreeMap<u8, PackageGroup> = BTreeMap::new();
            for (idx, source) in self.sources.iter().enumerate() {
                for package in source.table().packages() {
                    groups
                        .entry(package.id)
                        .or_insert_with(|| PackageGroup {
                            id: package.id,
                            name: package.name.clone(),
                            sources: Vec::new(),
                        })
                        .sources
                        .push(idx);
                }
            }

            for group in groups.values_mut() {
                group.sources.sort_by_key(|&idx| self.rank(idx));
            }

            groups.into_values().collect()
        })
    }

    fn package_group(&self, id: u8) -> Option<&PackageGroup> {
        let groups = self.package_groups();
        groups
            .binary_search_by_key(&id, |g| g.id)
            .ok()
            .map(|idx| &groups[idx])
    }

    /// Visit every distinct package with its id, skipping sources whose flags intersect
    /// `exclusion_flags`. The visitor stops the iteration by returning `false`.
    pub fn for_each_package<F>(&self, exclusion_flags: PropertyFlags, mut visitor: F)
    where
        F: FnMut(&str, u8) -> bool,
    {
        for group in self.package_groups() {
            let included = group
                .sources
                .iter()
                .find(|&&idx| !self.sources[idx].flags().intersects(exclusion_flags));

            let Some(&idx) = included else {
                continue;
            };
            let name = self.sources[idx]
                .table()
                .package(group.id)
                .map(|p| p.name.as_str())
                .unwrap_or(&group.name);

            if !visitor(name, group.id) {
                break;
            }
        }
    }

    /// Package ids with their names, overlays and loader sources only on request
    pub fn get_assigned_package_identifiers(
        &self,
        include_overlays: bool,
        include_loaders: bool,
    ) -> BTreeMap<u8, String> {
        let mut exclusion = PropertyFlags::empty();
        exclusion.set(PropertyFlags::OVERLAY, !include_overlays);
        exclusion.set(PropertyFlags::LOADER, !include_loaders);

        let mut result = BTreeMap::new();
        self.for_each_package(exclusion, |name, id| {
            result.insert(id, name.to_owned());
            true
        });
        result
    }

    /// Set the device configuration, with further configurations as a locale fallback list
    pub fn set_configurations(
        &mut self,
        configurations: Vec<ResTableConfig>,
        force_refresh: bool,
    ) -> Result<(), ResourceError> {
        let Some(primary) = configurations.first() else {
            return Err(ResourceError::InvalidArgument(
                "at least one configuration is required".to_owned(),
            ));
        };

        let diff = self.configurations[0].diff(primary);
        let locales_changed = self.configurations.len() != configurations.len()
            || self
                .configurations
                .iter()
                .zip(&configurations)
                .any(|(a, b)| a.language != b.language || a.country != b.country);

        self.configurations = configurations;

        if force_refresh {
            self.bag_cache.borrow_mut().clear();
        } else {
            let mut diff = diff;
            if locales_changed {
                diff |= ConfigChanges::LOCALE;
            }
            if !diff.is_empty() {
                self.invalidate_bags(diff);
            }
        }

        debug!("configuration set to {:?}", self.configurations[0].to_string());
        Ok(())
    }

    /// Locale to try when none of the configured locales has a definition
    pub fn set_default_locale(&mut self, locale: Option<ResTableConfig>) {
        self.default_locale = locale.map(|c| c.locale_only());
        self.bag_cache.borrow_mut().clear();
    }

    /// Primary device configuration
    #[inline]
    pub fn configuration(&self) -> &ResTableConfig {
        &self.configurations[0]
    }

    #[inline]
    pub fn configurations(&self) -> &[ResTableConfig] {
        &self.configurations
    }

    pub fn set_resource_resolution_logging_enabled(&mut self, enabled: bool) {
        self.resolution_logging = enabled;
        if !enabled {
            self.last_resolution.borrow_mut().take();
        }
    }

    /// All definitions of `resid` across the sources, in priority order
    fn candidates(&self, resid: u32) -> Vec<(usize, &Entry, Candidate<'_>)> {
        let Some(group) = self.package_group(package_id(resid)) else {
            return Vec::new();
        };

        let mut result = Vec::new();
        for &idx in &group.sources {
            let Some(entry) = self.sources[idx].table().find_entry(resid) else {
                continue;
            };
            for config_entry in &entry.configs {
                result.push((
                    idx,
                    entry,
                    Candidate {
                        cookie: self.cookie_at(idx),
                        rank: self.rank(idx),
                        entry: config_entry,
                    },
                ));
            }
        }
        result
    }

    /// Index of the best candidate for the configured locale list, with the
    /// configuration it was selected for
    ///
    /// Configurations are tried in order; one is taken when its best candidate has
    /// its language. Then the default locale, then the first result.
    pub(crate) fn select_for_locales(
        &self,
        candidates: &[Candidate<'_>],
        density: Option<u16>,
    ) -> Option<(usize, ResTableConfig)> {
        let select = |config: &ResTableConfig| {
            selector::select_best_value(candidates, config, density).map(|idx| (idx, *config))
        };

        let locale_matches = |idx: usize, config: &ResTableConfig| {
            candidates[idx].entry.config.language == config.language
        };

        let mut chosen = None;
        let mut first = None;
        for config in &self.configurations {
            let Some((idx, config)) = select(config) else {
                continue;
            };
            if self.configurations.len() == 1 || !config.has_locale() || locale_matches(idx, &config)
            {
                chosen = Some((idx, config));
                break;
            }
            first.get_or_insert((idx, config));
        }

        if chosen.is_none()
            && let Some(locale) = &self.default_locale
        {
            let config = ResTableConfig {
                language: locale.language,
                country: locale.country,
                ..self.configurations[0]
            };
            chosen = select(&config).filter(|(idx, _)| locale_matches(*idx, locale));
        }

        chosen.or(first)
    }

    /// Best definition of `resid` for the configured locale list
    pub(crate) fn find_entry(&self, resid: u32, density: Option<u16>) -> Option<FindEntryResult<'_>> {
        if !is_valid_resid(resid) {
            return None;
        }

        let candidates = self.candidates(resid);
        let plain: Vec<Candidate<'_>> = candidates.iter().map(|(_, _, c)| *c).collect();

        let (idx, config) = self.select_for_locales(&plain, density)?;

        if self.resolution_logging {
            self.record_resolution(resid, &config, density, &candidates);
        }

        let (source_idx, entry, candidate) = &candidates[idx];
        Some(FindEntryResult {
            cookie: candidate.cookie,
            source: &self.sources[*source_idx],
            entry,
            config_entry: candidate.entry,
        })
    }

    fn record_resolution(
        &self,
        resid: u32,
        config: &ResTableConfig,
        density: Option<u16>,
        candidates: &[(usize, &Entry, Candidate<'_>)],
    ) {
        let requested = selector::effective_config(config, density);

        let mut resolution = Resolution {
            resid,
            config: requested,
            ..Default::default()
        };

        let mut best: Option<&Candidate<'_>> = None;
        for (source_idx, _, candidate) in candidates {
            if !candidate.entry.config.matches(&requested) {
                continue;
            }

            let source = &self.sources[*source_idx];
            let kind = match best {
                None => StepKind::Initial,
                Some(current) => {
                    if selector::compare(candidate, current, &requested).is_gt() {
                        if candidate.entry.config == current.entry.config {
                            StepKind::Overlaid
                        } else {
                            StepKind::Better
                        }
                    } else {
                        StepKind::Skipped
                    }
                }
            };
            if kind != StepKind::Skipped {
                best = Some(candidate);
                resolution.best = Some((source.path().to_owned(), candidate.entry.config));
            }

            resolution.steps.push(ResolutionStep {
                kind,
                source: source.path().to_owned(),
                config: candidate.entry.config,
            });
        }

        *self.last_resolution.borrow_mut() = Some(resolution);
    }

    /// Human-readable trace of the last lookup, if resolution logging is enabled
    pub fn get_last_resource_resolution(&self) -> Option<String> {
        if !self.resolution_logging {
            return None;
        }

        let resolution = self.last_resolution.borrow();
        let resolution = resolution.as_ref()?;

        let name = self
            .get_resource_name(resolution.resid)
            .map(|name| name.to_string())
            .unwrap_or_default();

        let config_name = |config: &ResTableConfig| {
            let s = config.to_string();
            if s.is_empty() { "default".to_owned() } else { s }
        };

        let mut log = format!("Resolution for {:#010x} {}", resolution.resid, name);
        let _ = write!(log, "\n\tFor config - {}", config_name(&resolution.config));
        for step in &resolution.steps {
            let prefix = match step.kind {
                StepKind::Initial => "Found initial",
                StepKind::Better => "Found better",
                StepKind::Overlaid => "Overlaid",
                StepKind::Skipped => "Skipped",
            };
            let _ = write!(log, "\n\t{}: {} #{}", prefix, step.source, config_name(&step.config));
        }
        if let Some((source, config)) = &resolution.best {
            let _ = write!(
                log,
                "\nBest matching is from {} configuration of {}",
                config_name(config),
                source
            );
        }

        Some(log)
    }

    /// Resolve `resid` to its best definition, without following references
    ///
    /// A bag is only returned when `may_be_bag` is set, as a reference to itself.
    pub fn get_resource(
        &self,
        resid: u32,
        may_be_bag: bool,
        density: Option<u16>,
    ) -> Option<SelectedValue> {
        self.select_resource(resid, may_be_bag, density)
            .map(|(value, _)| value)
    }

    /// Like [`get_resource`](Self::get_resource), also telling whether the value stands for a bag
    pub(crate) fn select_resource(
        &self,
        resid: u32,
        may_be_bag: bool,
        density: Option<u16>,
    ) -> Option<(SelectedValue, bool)> {
        let result = self.find_entry(resid, density)?;

        let (value, is_bag) = match &result.config_entry.data {
            EntryData::Value(value) => (*value, false),
            EntryData::Bag(_) => {
                if !may_be_bag {
                    warn!("resource {:#010x} is a complex map type", resid);
                    return None;
                }
                (Value::reference(resid), true)
            }
        };

        let selected = SelectedValue {
            cookie: result.cookie,
            value,
            resid,
            flags: result.entry.spec_flags,
            config: result.config_entry.config,
        };
        Some((selected, is_bag))
    }

    /// String behind a string-typed value, looked up in the pool of its source
    pub fn value_string(&self, value: &SelectedValue) -> Option<&str> {
        if value.data_type() != ValueType::String {
            return None;
        }
        self.get_source_for_cookie(value.cookie)?
            .table()
            .string_pool()
            .get(value.data())
    }

    /// Text form of a value, strings are looked up in the pool of their source
    pub fn format_value(&self, value: &SelectedValue) -> String {
        match self.value_string(value) {
            Some(s) => s.to_owned(),
            None => value.value.to_raw_string(),
        }
    }

    pub fn get_resource_name(&self, resid: u32) -> Option<ResourceName> {
        let group = self.package_group(package_id(resid))?;
        group
            .sources
            .iter()
            .find_map(|&idx| self.sources[idx].table().resource_name(resid))
    }

    /// Find a resource id by `[package:][type/]entry` name, 0 is never returned
    pub fn get_resource_id(
        &self,
        name: &str,
        default_type: Option<&str>,
        default_package: Option<&str>,
    ) -> Option<u32> {
        self.sources
            .iter()
            .rev()
            .find_map(|source| source.table().find_resource_id(name, default_type, default_package))
    }

    pub fn get_locales(&self, exclude_system: bool) -> BTreeSet<String> {
        self.sources
            .iter()
            .filter(|s| !(exclude_system && s.is_system()))
            .flat_map(|s| s.table().locales())
            .collect()
    }

    pub fn get_resource_configurations(
        &self,
        exclude_system: bool,
        exclude_mipmap: bool,
    ) -> BTreeSet<ResTableConfig> {
        self.sources
            .iter()
            .filter(|s| !(exclude_system && s.is_system()))
            .flat_map(|s| s.table().configurations(exclude_mipmap))
            .collect()
    }

    /// Open an asset from the highest-priority source that has it
    pub fn open(&self, name: &str) -> Option<(Cookie, Asset)> {
        self.sources
            .iter()
            .enumerate()
            .rev()
            .find_map(|(idx, source)| source.open(name).map(|asset| (self.cookie_at(idx), asset)))
    }

    /// Open an asset from one specific source
    pub fn open_non_asset(&self, cookie: Cookie, name: &str) -> Option<Asset> {
        self.get_source_for_cookie(cookie)?.open(name)
    }

    /// Merged listing of `dir` across all sources
    pub fn list(&self, dir: &str) -> Vec<String> {
        self.sources
            .iter()
            .flat_map(|s| s.list(dir))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
