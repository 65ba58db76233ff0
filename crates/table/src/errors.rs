use thiserror::Error;

#[derive(Error, Debug)]
pub enum TableError {
    /// Qualifier token not recognized in a configuration string
    #[error("invalid configuration qualifier: {0:?}")]
    InvalidQualifier(String),

    /// Value literal that can't be encoded as a typed value
    #[error("invalid value literal: {0:?}")]
    InvalidValue(String),

    /// Resource name not in `type/entry` or `package:type/entry` form
    #[error("invalid resource name: {0:?}")]
    InvalidName(String),

    /// Resource id without a package, type or with a zero entry part
    #[error("invalid resource id: {0:#010x}")]
    InvalidResourceId(u32),

    /// Resource id refers to a package that was never declared
    #[error("resource {0:#010x} refers to undeclared package")]
    UnknownPackage(u32),

    #[error("package {0:#04x} declared twice")]
    DuplicatePackage(u8),

    /// Same resource defined twice for one configuration
    #[error("resource {resid:#010x} defined twice for configuration {config:?}")]
    DuplicateConfiguration { resid: u32, config: String },

    /// Same id given two different names, or same type id two type names
    #[error("resource {resid:#010x} named both {first:?} and {second:?}")]
    NameMismatch {
        resid: u32,
        first: String,
        second: String,
    },

    /// Malformed table description
    #[error("got error while reading table description")]
    Json(#[from] serde_json::Error),
}
