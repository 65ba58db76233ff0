use clap::{Parser, Subcommand};

use crate::commands::{
    ElementArgs, SourceArgs, command_attrs, command_bag, command_locales, command_packages,
    command_resource, command_stack, command_theme,
};

mod commands;

#[derive(Parser)]
#[command(version, about, arg_required_else_help(true))]
struct Cli {
    #[command(subcommand)]
    commands: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show package ids and the loaded sources
    Packages {
        #[command(flatten)]
        sources: SourceArgs,

        #[arg(long, default_value_t = false, help = "include overlay packages")]
        include_overlays: bool,

        #[arg(long, default_value_t = false, help = "include loader packages")]
        include_loaders: bool,
    },
    /// Resolve a resource for the configured device
    Resource {
        #[command(flatten)]
        sources: SourceArgs,

        #[arg(required = true, help = "resource id (0x7f010000) or name (color/accent)")]
        name: String,

        #[arg(short, long, help = "use this screen density instead of the configured one")]
        density: Option<u16>,

        #[arg(long, default_value_t = false, help = "don't follow references")]
        no_resolve: bool,

        #[arg(short, long, default_value_t = false, help = "print how the value was selected")]
        trace: bool,
    },
    /// Show a style or array merged across sources and parents
    Bag {
        #[command(flatten)]
        sources: SourceArgs,

        #[arg(required = true)]
        name: String,
    },
    /// Apply styles to a theme and show its attributes
    Theme {
        #[command(flatten)]
        sources: SourceArgs,

        #[arg(required = true, help = "styles to apply, in order")]
        styles: Vec<String>,

        #[arg(short, long, default_value_t = false, help = "override existing attributes")]
        force: bool,

        #[arg(short, long = "attr", help = "only show these attributes, resolved")]
        attrs: Vec<String>,
    },
    /// Resolve attributes of an element against XML, styles and a theme
    Attrs {
        #[command(flatten)]
        sources: SourceArgs,

        #[arg(required = true, help = "attributes to retrieve")]
        attrs: Vec<String>,

        #[arg(long = "theme", help = "styles of the theme, in order")]
        theme: Vec<String>,

        #[arg(short, long, help = "XML attribute as name=value")]
        xml: Vec<String>,

        #[arg(long, help = "`style` attribute of the element")]
        style: Option<String>,

        #[arg(long, help = "theme attribute naming the default style")]
        def_style_attr: Option<String>,

        #[arg(long, help = "default style used when the attribute is unset")]
        def_style: Option<String>,
    },
    /// Show the styles consulted for an element, most specific first
    Stack {
        #[command(flatten)]
        sources: SourceArgs,

        #[arg(help = "`style` attribute of the element")]
        style: Option<String>,

        #[arg(long = "theme", help = "styles of the theme, in order")]
        theme: Vec<String>,

        #[arg(long, help = "theme attribute naming the default style")]
        def_style_attr: Option<String>,

        #[arg(long, help = "default style")]
        def_style: Option<String>,
    },
    /// List locales and configurations that have resources
    Locales {
        #[command(flatten)]
        sources: SourceArgs,

        #[arg(long, default_value_t = false, help = "skip system sources")]
        exclude_system: bool,

        #[arg(long, default_value_t = false, help = "also list every configuration")]
        configurations: bool,

        #[arg(long, default_value_t = false, help = "skip mipmap configurations")]
        exclude_mipmap: bool,
    },
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match &cli.commands {
        Some(Commands::Packages {
            sources,
            include_overlays,
            include_loaders,
        }) => command_packages(sources, *include_overlays, *include_loaders),
        Some(Commands::Resource {
            sources,
            name,
            density,
            no_resolve,
            trace,
        }) => command_resource(sources, name, *density, *no_resolve, *trace),
        Some(Commands::Bag { sources, name }) => command_bag(sources, name),
        Some(Commands::Theme {
            sources,
            styles,
            force,
            attrs,
        }) => command_theme(sources, styles, *force, attrs),
        Some(Commands::Attrs {
            sources,
            attrs,
            theme,
            xml,
            style,
            def_style_attr,
            def_style,
        }) => command_attrs(
            sources,
            &ElementArgs {
                theme,
                xml,
                style: style.as_deref(),
                def_style_attr: def_style_attr.as_deref(),
                def_style: def_style.as_deref(),
            },
            attrs,
        ),
        Some(Commands::Stack {
            sources,
            style,
            theme,
            def_style_attr,
            def_style,
        }) => command_stack(
            sources,
            theme,
            style.as_deref(),
            def_style_attr.as_deref(),
            def_style.as_deref(),
        ),
        Some(Commands::Locales {
            sources,
            exclude_system,
            configurations,
            exclude_mipmap,
        }) => command_locales(sources, *exclude_system, *configurations, *exclude_mipmap),
        None => Ok(()),
    };

    if let Err(err) = result {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}
