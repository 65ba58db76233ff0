use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use crate::commands::output::print_json;
use crate::commands::sources::{SourceArgs, load_manager};

#[derive(Serialize)]
struct PackageOutput {
    id: String,
    name: String,
}

#[derive(Serialize)]
struct SourceOutput {
    cookie: u32,
    path: String,
    flags: Vec<String>,
}

#[derive(Serialize)]
struct PackagesOutput {
    packages: Vec<PackageOutput>,
    sources: Vec<SourceOutput>,
}

pub(crate) fn command_packages(
    args: &SourceArgs,
    include_overlays: bool,
    include_loaders: bool,
) -> Result<()> {
    let am = load_manager(args)?;

    let output = PackagesOutput {
        packages: am
            .get_assigned_package_identifiers(include_overlays, include_loaders)
            .into_iter()
            .map(|(id, name)| PackageOutput {
                id: format!("{:#04x}", id),
                name,
            })
            .collect(),
        sources: am
            .sources()
            .iter()
            .enumerate()
            .map(|(idx, source)| SourceOutput {
                cookie: idx as u32,
                path: source.path().to_owned(),
                flags: source
                    .flags()
                    .iter_names()
                    .map(|(name, _)| name.to_lowercase())
                    .collect(),
            })
            .collect(),
    };

    if args.json {
        return print_json(&output);
    }

    println!("{}:", "Packages".blue().bold());
    for package in &output.packages {
        println!("  {} {}", package.id, package.name.green());
    }

    println!("\n{}:", "Sources".blue().bold());
    for source in &output.sources {
        if source.flags.is_empty() {
            println!("  #{} {}", source.cookie, source.path.green());
        } else {
            println!(
                "  #{} {} ({})",
                source.cookie,
                source.path.green(),
                source.flags.join(", ")
            );
        }
    }

    Ok(())
}
