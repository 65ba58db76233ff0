use anyhow::{Context, Result};
use apk_res::BagKind;
use apk_res::table::ARRAY_KEY_BASE;
use colored::Colorize;
use serde::Serialize;

use crate::commands::output::print_json;
use crate::commands::sources::{SourceArgs, label, load_manager, parse_resid};

#[derive(Serialize)]
struct BagEntryOutput {
    key: String,
    value: String,
    data_type: String,
    from: String,
}

#[derive(Serialize)]
struct BagOutput {
    name: String,
    kind: String,
    parent: Option<String>,
    entries: Vec<BagEntryOutput>,
}

pub(crate) fn command_bag(args: &SourceArgs, name: &str) -> Result<()> {
    let am = load_manager(args)?;

    let resid = parse_resid(&am, name, Some("style"))?;
    let bag = am
        .get_bag(resid)
        .with_context(|| format!("{} is not a bag or its parent chain is broken", name))?;

    let output = BagOutput {
        name: label(&am, resid),
        kind: format!("{:?}", bag.kind),
        parent: (bag.parent != 0).then(|| label(&am, bag.parent)),
        entries: bag
            .entries
            .iter()
            .map(|entry| BagEntryOutput {
                key: match bag.kind {
                    BagKind::Array => format!("[{}]", entry.key.wrapping_sub(ARRAY_KEY_BASE)),
                    BagKind::Style | BagKind::AttributeMap => label(&am, entry.key),
                },
                value: am.format_value(&bag.selected(entry)),
                data_type: format!("{:?}", entry.value.data_type),
                from: label(&am, entry.style),
            })
            .collect(),
    };

    if args.json {
        return print_json(&output);
    }

    println!("{}: {} ({})", "Bag".blue().bold(), output.name.green(), output.kind);
    if let Some(parent) = &output.parent {
        println!("{}: {}", "Parent", parent.green());
    }
    for entry in &output.entries {
        println!(
            "  {} = {} ({}, from {})",
            entry.key,
            entry.value.green(),
            entry.data_type,
            entry.from
        );
    }

    Ok(())
}
