use anyhow::Result;
use apk_res::{AssetManager, SelectedValue};
use colored::Colorize;
use serde::Serialize;

use crate::commands::sources::label;

/// Printable form of a resolved value
#[derive(Debug, Serialize)]
pub(crate) struct ValueOutput {
    pub resid: Option<String>,
    pub data_type: String,
    pub data: String,
    pub value: String,
    pub source: Option<String>,
    pub config: String,
    pub changing_configurations: Vec<String>,
}

impl ValueOutput {
    pub(crate) fn new(am: &AssetManager, value: &SelectedValue) -> ValueOutput {
        ValueOutput {
            resid: (value.resid != 0).then(|| label(am, value.resid)),
            data_type: format!("{:?}", value.data_type()),
            data: format!("{:#010x}", value.data()),
            value: am.format_value(value),
            source: am
                .get_source_for_cookie(value.cookie)
                .map(|s| s.path().to_owned()),
            config: config_name(&value.config.to_string()),
            changing_configurations: value
                .flags
                .iter_names()
                .map(|(name, _)| name.to_lowercase())
                .collect(),
        }
    }

    pub(crate) fn print(&self, indent: &str) {
        println!("{}{}: {}", indent, "Value", self.value.green());
        println!("{}{}: {} ({})", indent, "Type", self.data_type, self.data);
        if let Some(resid) = &self.resid {
            println!("{}{}: {}", indent, "Resource", resid.green());
        }
        println!(
            "{}{}: {}",
            indent,
            "Source",
            self.source.as_deref().unwrap_or("-").green()
        );
        println!("{}{}: {}", indent, "Config", self.config);
        if !self.changing_configurations.is_empty() {
            println!(
                "{}{}: {}",
                indent,
                "Varies by",
                self.changing_configurations.join(", ")
            );
        }
    }
}

pub(crate) fn config_name(config: &str) -> String {
    if config.is_empty() {
        "default".to_owned()
    } else {
        config.to_owned()
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
