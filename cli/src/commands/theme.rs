use anyhow::Result;
use apk_res::SelectedValue;
use colored::Colorize;
use serde::Serialize;

use crate::commands::output::{ValueOutput, print_json};
use crate::commands::sources::{SourceArgs, build_theme, label, load_manager, parse_resid};

#[derive(Serialize)]
struct ThemeAttributeOutput {
    attr: String,
    from: Option<String>,
    value: Option<ValueOutput>,
}

#[derive(Serialize)]
struct ThemeOutput {
    styles: Vec<String>,
    changing_configurations: Vec<String>,
    attributes: Vec<ThemeAttributeOutput>,
}

/// Apply `styles` and print either the requested attributes, resolved, or every entry
pub(crate) fn command_theme(
    args: &SourceArgs,
    styles: &[String],
    force: bool,
    attrs: &[String],
) -> Result<()> {
    let am = load_manager(args)?;
    let theme = build_theme(&am, styles, force)?;

    let attributes = if attrs.is_empty() {
        theme
            .entries()
            .into_iter()
            .map(|(attr, entry)| {
                let value = SelectedValue {
                    cookie: entry.cookie,
                    value: entry.value,
                    resid: 0,
                    flags: entry.type_spec_flags,
                    config: Default::default(),
                };
                ThemeAttributeOutput {
                    attr: label(&am, attr),
                    from: Some(label(&am, entry.style)),
                    value: Some(ValueOutput::new(&am, &value)),
                }
            })
            .collect()
    } else {
        attrs
            .iter()
            .map(|name| -> Result<ThemeAttributeOutput> {
                let attr = parse_resid(&am, name, Some("attr"))?;
                let mut value = theme.get_attribute(attr);
                if let Some(value) = &mut value {
                    am.resolve_reference(value);
                }
                Ok(ThemeAttributeOutput {
                    attr: label(&am, attr),
                    from: None,
                    value: value.map(|v| ValueOutput::new(&am, &v)),
                })
            })
            .collect::<Result<Vec<_>>>()?
    };

    let output = ThemeOutput {
        styles: theme.stack().iter().map(|s| label(&am, s.style)).collect(),
        changing_configurations: theme
            .get_changing_configurations()
            .iter_names()
            .map(|(name, _)| name.to_lowercase())
            .collect(),
        attributes,
    };

    if args.json {
        return print_json(&output);
    }

    println!("{}: {}", "Theme".blue().bold(), output.styles.join(" > ").green());
    if !output.changing_configurations.is_empty() {
        println!("{}: {}", "Varies by", output.changing_configurations.join(", "));
    }
    for attribute in &output.attributes {
        match (&attribute.value, &attribute.from) {
            (Some(value), Some(from)) => {
                println!("  {} = {} (from {})", attribute.attr, value.value.green(), from)
            }
            (Some(value), None) => {
                println!("  {}:", attribute.attr);
                value.print("    ");
            }
            (None, _) => println!("  {} = {}", attribute.attr, "-".red()),
        }
    }

    Ok(())
}
