pub(crate) mod attrs;
pub(crate) mod bag;
pub(crate) mod locales;
pub(crate) mod output;
pub(crate) mod packages;
pub(crate) mod path_helpers;
pub(crate) mod resource;
pub(crate) mod sources;
pub(crate) mod stack;
pub(crate) mod theme;

pub(crate) use attrs::{ElementArgs, command_attrs};
pub(crate) use bag::command_bag;
pub(crate) use locales::command_locales;
pub(crate) use packages::command_packages;
pub(crate) use resource::command_resource;
pub(crate) use sources::SourceArgs;
pub(crate) use stack::command_stack;
pub(crate) use theme::command_theme;
