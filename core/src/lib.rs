//! Resource resolution and theme engine over layered asset sources
//!
//! An [`AssetManager`] holds an ordered list of [`ApkAssets`], picks the best
//! definition of a resource for the current configuration, follows references,
//! flattens style hierarchies into bags and backs [`Theme`]s and attribute
//! retrieval. [`bridge::ResourceBridge`] exposes the same operations through
//! handles and plain integers.

pub mod apk_assets;
pub mod asset;
pub mod asset_manager;
pub mod attribute_resolution;
pub mod bag;
pub mod bridge;
pub mod errors;
pub mod guarded;
pub mod handles;
pub mod resolver;
pub mod selector;
pub mod theme;

pub use apk_assets::{ApkAssets, PropertyFlags, SourceDescription};
pub use asset::Asset;
pub use asset_manager::{AssetManager, Cookie, PackageGroup, SelectedValue};
pub use attribute_resolution::{
    AttributeResults, AttributeSource, ResolvedAttribute, XmlAttributeSet,
};
pub use bag::{BagEntry, BagKind, ResolvedBag};
pub use bridge::{ResourceBridge, TypedValue};
pub use errors::ResourceError;
pub use guarded::Guarded;
pub use handles::Handle;
pub use resolver::MAX_REFERENCE_DEPTH;
pub use theme::{AppliedStyle, Theme, ThemeEntry};

pub use apk_res_table as table;
