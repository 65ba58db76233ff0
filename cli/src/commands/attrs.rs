use anyhow::{Context, Result};
use apk_res::attribute_resolution::apply_style;
use apk_res::{AttributeSource, XmlAttributeSet};
use colored::Colorize;
use serde::Serialize;

use crate::commands::output::{ValueOutput, print_json};
use crate::commands::sources::{SourceArgs, build_theme, label, load_manager, parse_resid};

#[derive(Serialize)]
struct AttributeOutput {
    attr: String,
    source: AttributeSource,
    from: Option<String>,
    value: Option<ValueOutput>,
}

/// Inputs of one element's attribute retrieval
pub(crate) struct ElementArgs<'a> {
    pub theme: &'a [String],
    pub xml: &'a [String],
    pub style: Option<&'a str>,
    pub def_style_attr: Option<&'a str>,
    pub def_style: Option<&'a str>,
}

fn parse_xml_pair(text: &str) -> Result<(&str, &str)> {
    text.split_once('=')
        .with_context(|| format!("expected name=value, got {:?}", text))
}

pub(crate) fn command_attrs(args: &SourceArgs, element: &ElementArgs, attrs: &[String]) -> Result<()> {
    let am = load_manager(args)?;
    let theme = build_theme(&am, element.theme, false)?;

    let pairs = element
        .xml
        .iter()
        .map(|x| parse_xml_pair(x))
        .collect::<Result<Vec<_>>>()?;
    let xml = if pairs.is_empty() && element.style.is_none() {
        None
    } else {
        Some(XmlAttributeSet::from_text(&am, element.style, &pairs)?)
    };

    let def_style_attr = element
        .def_style_attr
        .map(|a| parse_resid(&am, a, Some("attr")))
        .transpose()?
        .unwrap_or(0);
    let def_style = element
        .def_style
        .map(|s| parse_resid(&am, s, Some("style")))
        .transpose()?
        .unwrap_or(0);
    let attrs = attrs
        .iter()
        .map(|a| parse_resid(&am, a, Some("attr")))
        .collect::<Result<Vec<_>>>()?;

    let results = apply_style(&am, &theme, xml.as_ref(), def_style_attr, def_style, &attrs)?;

    let output: Vec<AttributeOutput> = results
        .values
        .iter()
        .map(|attribute| {
            let mut value = attribute.is_defined().then(|| ValueOutput::new(&am, &attribute.value));
            if let (Some(value), Some(s)) = (&mut value, &attribute.string) {
                value.value.clone_from(s);
            }
            AttributeOutput {
                attr: label(&am, attribute.attr),
                source: attribute.source,
                from: (attribute.source_resid != 0).then(|| label(&am, attribute.source_resid)),
                value,
            }
        })
        .collect();

    if args.json {
        return print_json(&output);
    }

    for attribute in &output {
        let Some(value) = &attribute.value else {
            println!("{} = {}", attribute.attr, "-".red());
            continue;
        };
        match &attribute.from {
            Some(from) => println!(
                "{} = {} ({:?}, {})",
                attribute.attr,
                value.value.green(),
                attribute.source,
                from
            ),
            None => println!(
                "{} = {} ({:?})",
                attribute.attr,
                value.value.green(),
                attribute.source
            ),
        }
    }

    Ok(())
}
