use anyhow::{Result, bail};
use colored::Colorize;
use log::warn;
use serde::Serialize;

use crate::commands::output::{ValueOutput, print_json};
use crate::commands::sources::{SourceArgs, label, load_manager, parse_resid};

#[derive(Serialize)]
struct ResourceOutput {
    name: String,
    resolved: bool,
    value: ValueOutput,

    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<String>,
}

pub(crate) fn command_resource(
    args: &SourceArgs,
    name: &str,
    density: Option<u16>,
    no_resolve: bool,
    trace: bool,
) -> Result<()> {
    let mut am = load_manager(args)?;
    am.set_resource_resolution_logging_enabled(trace);

    let resid = parse_resid(&am, name, None)?;
    let Some(mut value) = am.get_resource(resid, true, density) else {
        bail!("resource {} has no value for this configuration", name);
    };
    let trace = am.get_last_resource_resolution();

    let resolved = no_resolve || am.resolve_reference(&mut value);
    if !resolved {
        warn!("can't resolve the reference chain of {}", name);
    }

    let output = ResourceOutput {
        name: label(&am, resid),
        resolved,
        value: ValueOutput::new(&am, &value),
        trace,
    };

    if args.json {
        return print_json(&output);
    }

    println!("{}: {}", "Resource".blue().bold(), output.name.green());
    output.value.print("  ");
    if let Some(trace) = &output.trace {
        println!("\n{}", trace);
    }

    Ok(())
}
