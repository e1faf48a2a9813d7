//! Command-line interface for bilens
//! Reads configuration files through the built-in lenses, prints their trees, and writes
//! edits back without disturbing the rest of the file.
//!
//! Usage:
//!   bilens list-lenses                                   - List the built-in lenses
//!   bilens get `<lens>` `<file>` [--format `<format>`]       - Print the tree of a file
//!   bilens set `<lens>` `<file>` `<path>` `<value>` [--in-place] - Set a value and print the result
//!   bilens rm `<lens>` `<file>` `<path>` [--in-place]          - Remove nodes and print the result
//!   bilens check `<lens>` `<file>`                           - Verify the file round-trips unchanged

use bilens::config::{BilensConfig, Loader, OutputFormat};
use bilens::engine::{self, Parsed};
use bilens::library::LensRegistry;
use bilens::{Lens, Tree};
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::process;
use tracing_subscriber::EnvFilter;

fn main() {
    let matches = Command::new("bilens")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Edit configuration files through bidirectional lenses")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .global(true)
                .help("Configuration file layered over the defaults"),
        )
        .subcommand(Command::new("list-lenses").about("List the built-in lenses"))
        .subcommand(
            Command::new("get")
                .about("Print the tree of a file")
                .arg(lens_arg())
                .arg(file_arg())
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .value_parser(["paths", "json", "yaml"])
                        .help("Output format (defaults to output.format from the configuration)"),
                )
                .arg(
                    Arg::new("trace")
                        .long("trace")
                        .action(ArgAction::SetTrue)
                        .help("Log parser progress, matches and tokens to stderr"),
                ),
        )
        .subcommand(
            Command::new("set")
                .about("Set the value at a path and print the new file")
                .arg(lens_arg())
                .arg(file_arg())
                .arg(Arg::new("path").help("Tree path, e.g. /1/ipaddr").required(true).index(3))
                .arg(Arg::new("value").help("New value").required(true).index(4))
                .arg(in_place_arg()),
        )
        .subcommand(
            Command::new("rm")
                .about("Remove the nodes at a path and print the new file")
                .arg(lens_arg())
                .arg(file_arg())
                .arg(Arg::new("path").help("Tree path, e.g. /2").required(true).index(3))
                .arg(in_place_arg()),
        )
        .subcommand(
            Command::new("check")
                .about("Verify that writing the unmodified tree reproduces the file")
                .arg(lens_arg())
                .arg(file_arg()),
        )
        .get_matches();

    let config = load_config(&matches);
    init_logging(&config);

    let result = match matches.subcommand() {
        Some(("list-lenses", _)) => {
            handle_list_lenses_command();
            Ok(())
        }
        Some(("get", get_matches)) => handle_get_command(get_matches, &config),
        Some(("set", set_matches)) => handle_set_command(set_matches, &config),
        Some(("rm", rm_matches)) => handle_rm_command(rm_matches, &config),
        Some(("check", check_matches)) => handle_check_command(check_matches, &config),
        _ => unreachable!(),
    };
    if let Err(message) = result {
        eprintln!("Error: {message}");
        process::exit(1);
    }
}

fn lens_arg() -> Arg {
    Arg::new("lens")
        .help("Name of a built-in lens (see list-lenses)")
        .required(true)
        .index(1)
}

fn file_arg() -> Arg {
    Arg::new("file")
        .help("Path to the file")
        .required(true)
        .index(2)
}

fn in_place_arg() -> Arg {
    Arg::new("in-place")
        .long("in-place")
        .short('i')
        .action(ArgAction::SetTrue)
        .help("Write the result back to the file instead of printing it")
}

fn load_config(matches: &ArgMatches) -> BilensConfig {
    let mut loader = Loader::new();
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }
    let trace = matches
        .subcommand_matches("get")
        .is_some_and(|m| m.get_flag("trace"));
    let mut loader = loader.with_env();
    if trace {
        for key in ["show_advance", "show_matches", "show_tokens"] {
            loader = loader
                .set_override(&format!("diagnostics.{key}"), true)
                .unwrap_or_else(|e| {
                    eprintln!("Error: {e}");
                    process::exit(1);
                });
        }
    }
    loader.build().unwrap_or_else(|e| {
        eprintln!("Error loading configuration: {e}");
        process::exit(1);
    })
}

fn init_logging(config: &BilensConfig) {
    let mut filter = EnvFilter::from_default_env();
    let flags = config.diagnostics;
    let targets = [
        (flags.show_advance, "bilens::advance=debug"),
        (flags.show_matches, "bilens::match=debug"),
        (flags.show_tokens, "bilens::token=debug"),
    ];
    for (on, directive) in targets {
        if on {
            if let Ok(directive) = directive.parse() {
                filter = filter.add_directive(directive);
            }
        }
    }
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

fn lens_named(name: &str) -> Result<Lens, String> {
    LensRegistry::with_defaults()
        .get(name)
        .map_err(|e| e.to_string())
}

fn read(matches: &ArgMatches, config: &BilensConfig) -> Result<(Lens, String, String, Parsed), String> {
    let lens = lens_named(required(matches, "lens"))?;
    let path = required(matches, "file").to_string();
    let text = std::fs::read_to_string(&path).map_err(|e| format!("reading {path}: {e}"))?;
    let parsed = engine::get(&lens, &text, config.diagnostics).map_err(|e| {
        let (line, col) = e.pos().map_or((0, 0), |p| bilens::error::line_col(&text, p));
        format!("{path}:{line}:{col}: {e}")
    })?;
    Ok((lens, path, text, parsed))
}

fn required<'a>(matches: &'a ArgMatches, id: &str) -> &'a str {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .unwrap_or_default()
}

/// Handle the list-lenses command
fn handle_list_lenses_command() {
    println!("Available lenses:\n");
    for (name, description) in LensRegistry::with_defaults().list_lenses() {
        println!("  {name}");
        println!("    {description}");
    }
}

/// Handle the get command
fn handle_get_command(matches: &ArgMatches, config: &BilensConfig) -> Result<(), String> {
    let (_, _, _, parsed) = read(matches, config)?;
    let format = match matches.get_one::<String>("format").map(String::as_str) {
        Some("json") => OutputFormat::Json,
        Some("yaml") => OutputFormat::Yaml,
        Some(_) => OutputFormat::Paths,
        None => config.output.format,
    };
    print!("{}", render(&parsed.tree, format, config.output.pretty)?);
    Ok(())
}

fn render(tree: &Tree, format: OutputFormat, pretty: bool) -> Result<String, String> {
    match format {
        OutputFormat::Paths => Ok(tree.render_paths()),
        OutputFormat::Json => {
            let json = if pretty {
                serde_json::to_string_pretty(tree)
            } else {
                serde_json::to_string(tree)
            };
            json.map(|s| s + "\n").map_err(|e| e.to_string())
        }
        OutputFormat::Yaml => serde_yaml::to_string(tree).map_err(|e| e.to_string()),
    }
}

/// Handle the set command
fn handle_set_command(matches: &ArgMatches, config: &BilensConfig) -> Result<(), String> {
    let (lens, path, text, mut parsed) = read(matches, config)?;
    parsed
        .tree
        .set(required(matches, "path"), required(matches, "value"))
        .map_err(|e| e.to_string())?;
    write_back(&lens, &path, &text, parsed, matches.get_flag("in-place"))
}

/// Handle the rm command
fn handle_rm_command(matches: &ArgMatches, config: &BilensConfig) -> Result<(), String> {
    let (lens, path, text, mut parsed) = read(matches, config)?;
    let removed = parsed
        .tree
        .remove(required(matches, "path"))
        .map_err(|e| e.to_string())?;
    eprintln!("removed {removed} node(s)");
    write_back(&lens, &path, &text, parsed, matches.get_flag("in-place"))
}

fn write_back(lens: &Lens, path: &str, text: &str, mut parsed: Parsed, in_place: bool) -> Result<(), String> {
    let out = engine::put(lens, &parsed.tree, &parsed.skel, &mut parsed.dict, text)
        .map_err(|e| e.to_string())?;
    if in_place {
        std::fs::write(path, out).map_err(|e| format!("writing {path}: {e}"))
    } else {
        print!("{out}");
        Ok(())
    }
}

/// Handle the check command
fn handle_check_command(matches: &ArgMatches, config: &BilensConfig) -> Result<(), String> {
    let (lens, path, text, mut parsed) = read(matches, config)?;
    let out = engine::put(&lens, &parsed.tree, &parsed.skel, &mut parsed.dict, &text)
        .map_err(|e| e.to_string())?;
    if out != text {
        let at = out
            .bytes()
            .zip(text.bytes())
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| out.len().min(text.len()));
        let (line, col) = bilens::error::line_col(&text, at);
        return Err(format!("{path}: round trip differs at {line}:{col}"));
    }
    println!("{path}: ok");
    Ok(())
}
