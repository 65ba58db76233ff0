pub mod builder;
pub mod config;
pub mod description;
pub mod errors;
pub mod parse;
pub mod string_pool;
pub mod table;
pub mod value;

pub(crate) mod qualifiers;

pub use builder::TableBuilder;
pub use config::{ConfigChanges, ResTableConfig};
pub use description::TableDescription;
pub use errors::TableError;
pub use string_pool::StringPool;
pub use table::{
    ARRAY_KEY_BASE, BagDefinition, ConfigEntry, Entry, EntryData, EntryFlags, MapEntry, Package,
    ResourceName, ResourceTable, ResourceType, entry_id, is_valid_resid, make_resid, package_id,
    type_id,
};
pub use value::{Value, ValueType};
