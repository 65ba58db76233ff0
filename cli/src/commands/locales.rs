use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use crate::commands::output::{config_name, print_json};
use crate::commands::sources::{SourceArgs, load_manager};

#[derive(Serialize)]
struct LocalesOutput {
    locales: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    configurations: Option<Vec<String>>,
}

pub(crate) fn command_locales(
    args: &SourceArgs,
    exclude_system: bool,
    configurations: bool,
    exclude_mipmap: bool,
) -> Result<()> {
    let am = load_manager(args)?;

    let output = LocalesOutput {
        locales: am.get_locales(exclude_system).into_iter().collect(),
        configurations: configurations.then(|| {
            am.get_resource_configurations(exclude_system, exclude_mipmap)
                .iter()
                .map(|c| config_name(&c.to_string()))
                .collect()
        }),
    };

    if args.json {
        return print_json(&output);
    }

    println!("{}:", "Locales".blue().bold());
    for locale in &output.locales {
        println!("  {}", locale.green());
    }
    if let Some(configurations) = &output.configurations {
        println!("\n{}:", "Configurations".blue().bold());
        for config in configurations {
            println!("  {}", config.green());
        }
    }

    Ok(())
}
