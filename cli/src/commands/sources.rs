use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use apk_res::table::{ResTableConfig, ResourceTable};
use apk_res::{ApkAssets, AssetManager, Theme};
use clap::Args;
use log::{debug, warn};

use crate::commands::path_helpers::get_all_files;

/// Options shared by every command: where resources come from and the device configuration
#[derive(Args, Debug)]
pub(crate) struct SourceArgs {
    /// Source descriptions (JSON), directories are walked; later sources override earlier ones
    #[arg(short, long = "source", required = true, num_args = 1..)]
    pub sources: Vec<PathBuf>,

    /// Device configuration as qualifiers, e.g. `en-rUS-land-hdpi`; repeat for locale fallbacks
    #[arg(short, long = "config")]
    pub configs: Vec<String>,

    /// Locale used when none of the configured locales has a value
    #[arg(long)]
    pub default_locale: Option<String>,

    /// Print JSON instead of text
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

fn parse_config(text: &str) -> Result<ResTableConfig> {
    text.parse::<ResTableConfig>()
        .with_context(|| format!("got invalid configuration: {:?}", text))
}

/// Load every source in order and configure a manager over them
pub(crate) fn load_manager(args: &SourceArgs) -> Result<AssetManager> {
    let files = get_all_files(&args.sources, &["json"]);
    if files.is_empty() {
        bail!("no source descriptions found in {:?}", args.sources);
    }

    let mut sources: Vec<Arc<ApkAssets>> = Vec::with_capacity(files.len());
    for path in &files {
        // names of earlier sources can be referenced, e.g. `@android:color/white`
        let imports: Vec<&ResourceTable> = sources.iter().map(|s| s.table()).collect();
        let source = ApkAssets::load(path, &imports)
            .with_context(|| format!("got error while loading source: {:?}", path))?;
        debug!("loaded {:?} ({:?})", path, source.flags());
        sources.push(Arc::new(source));
    }

    let mut am = AssetManager::new();
    am.set_sources(sources, true);

    if !args.configs.is_empty() {
        let configs = args
            .configs
            .iter()
            .map(|c| parse_config(c))
            .collect::<Result<Vec<_>>>()?;
        am.set_configurations(configs, false)?;
    }
    if let Some(locale) = &args.default_locale {
        am.set_default_locale(Some(parse_config(locale)?));
    }

    Ok(am)
}

/// Resource id from `0x7f010000` or a `[package:][type/]entry` name
pub(crate) fn parse_resid(am: &AssetManager, text: &str, default_type: Option<&str>) -> Result<u32> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16)
            .with_context(|| format!("got invalid resource id: {}", text));
    }

    let name = text.trim_start_matches(['@', '?']);
    am.get_resource_id(name, default_type, None)
        .with_context(|| format!("can't find resource: {}", text))
}

/// Name of a resource, or its id when it has none
pub(crate) fn label(am: &AssetManager, resid: u32) -> String {
    match am.get_resource_name(resid) {
        Some(name) => name.to_string(),
        None => format!("{:#010x}", resid),
    }
}

/// Theme with `styles` applied in order
pub(crate) fn build_theme(am: &AssetManager, styles: &[String], force: bool) -> Result<Theme> {
    let mut theme = Theme::new(am);
    for style in styles {
        let resid = parse_resid(am, style, Some("style"))?;
        if !theme.apply_style(am, resid, force)? {
            warn!("style {} not found, skipped", style);
        }
    }
    Ok(theme)
}
