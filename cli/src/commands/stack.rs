use anyhow::Result;
use apk_res::attribute_resolution::attribute_resolution_stack;
use colored::Colorize;

use crate::commands::output::print_json;
use crate::commands::sources::{SourceArgs, build_theme, label, load_manager, parse_resid};

/// Print the styles consulted for an element, most specific first
pub(crate) fn command_stack(
    args: &SourceArgs,
    theme: &[String],
    style: Option<&str>,
    def_style_attr: Option<&str>,
    def_style: Option<&str>,
) -> Result<()> {
    let am = load_manager(args)?;
    let theme = build_theme(&am, theme, false)?;

    let resolve = |name: Option<&str>, default_type: &str| -> Result<u32> {
        Ok(name
            .map(|n| parse_resid(&am, n, Some(default_type)))
            .transpose()?
            .unwrap_or(0))
    };
    let style = resolve(style, "style")?;
    let def_style_attr = resolve(def_style_attr, "attr")?;
    let def_style = resolve(def_style, "style")?;

    let stack: Vec<String> = attribute_resolution_stack(&am, &theme, style, def_style_attr, def_style)?
        .into_iter()
        .map(|id| label(&am, id))
        .collect();

    if args.json {
        return print_json(&stack);
    }

    println!("{}:", "Style stack".blue().bold());
    for (i, style) in stack.iter().enumerate() {
        println!("  {}. {}", i + 1, style.green());
    }

    Ok(())
}
