//! Command-line interface for templater
//! This binary cycles template tags in files and inspects the dialect tables.
//!
//! Usage:
//!   templater cycle `<path>` -s `<sel>`... [-d `<dialect>`] [-i `<index>`] [--format `<format>`] [--write]
//!   templater dialects                                  - List registered dialects
//!   templater patterns `<dialect>`                      - Show compiled matcher patterns
//!   templater detect --syntax `<syntax>` [--file `<f>`] - Sniff a dialect
//!
//! Configuration is layered: built-in defaults, then `templater.toml` from the
//! template's directory (the working directory for the other commands), then
//! the `--config` file.

use clap::{Arg, ArgAction, ArgMatches, Command};
use serde::Serialize;
use std::ops::Range;
use std::path::Path;
use templater::templater::{Buffer, DialectId, Edit, Session, TextBuffer};
use templater_config::{Loader, TemplaterConfig};

fn main() {
    env_logger::init();

    let matches = Command::new("templater")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Insert and cycle template tags around selections")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("Configuration file layered over the defaults")
                .global(true),
        )
        .subcommand(
            Command::new("cycle")
                .about("Insert or cycle a tag at each selection")
                .arg(
                    Arg::new("path")
                        .help("Path to the template file")
                        .required(true)
                        .index(1),
                )
                .arg(
                    Arg::new("selection")
                        .long("selection")
                        .short('s')
                        .help("Byte offset (e.g. '12') or range (e.g. '12..15')")
                        .required(true)
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("dialect")
                        .long("dialect")
                        .short('d')
                        .help("Dialect name (e.g. 'erb', 'jinja', 'php'); sniffed from the file name if omitted"),
                )
                .arg(
                    Arg::new("insert-variant")
                        .long("insert-variant")
                        .short('i')
                        .help("Index of the variant inserted around untagged selections")
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    Arg::new("format")
                        .long("format")
                        .short('f')
                        .help("Output format: 'text' or 'json'")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(
                    Arg::new("write")
                        .long("write")
                        .short('w')
                        .help("Rewrite the file in place and print the new selections")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("dialects").about("List registered dialects and their variants"))
        .subcommand(
            Command::new("patterns")
                .about("Show the compiled opener and closer patterns of a dialect")
                .arg(
                    Arg::new("dialect")
                        .help("Dialect name")
                        .required(true)
                        .index(1),
                ),
        )
        .subcommand(
            Command::new("detect")
                .about("Pick a dialect from an editor syntax name and file name")
                .arg(
                    Arg::new("syntax")
                        .long("syntax")
                        .help("Syntax name, e.g. 'Ruby on Rails'")
                        .required(true),
                )
                .arg(Arg::new("file").long("file").help("File name")),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config");

    match matches.subcommand() {
        Some(("cycle", cycle_matches)) => {
            let path = cycle_matches.get_one::<String>("path").unwrap();
            let project_dir = Path::new(path).parent().unwrap_or(Path::new(""));
            let mut loader = Loader::new().with_project_dir(project_dir);
            if let Some(index) = cycle_matches.get_one::<u32>("insert-variant") {
                loader = loader
                    .set_override("cycle.insert_variant", i64::from(*index))
                    .unwrap_or_else(|e| {
                        eprintln!("Invalid insert variant: {}", e);
                        std::process::exit(1);
                    });
            }
            let config = load_config(loader, config_path);
            handle_cycle_command(&config, cycle_matches);
        }
        Some(("dialects", _)) => {
            let config = load_config(Loader::new().with_project_dir("."), config_path);
            handle_dialects_command(&config);
        }
        Some(("patterns", pattern_matches)) => {
            let dialect = pattern_matches.get_one::<String>("dialect").unwrap();
            let config = load_config(Loader::new().with_project_dir("."), config_path);
            handle_patterns_command(&config, dialect);
        }
        Some(("detect", detect_matches)) => {
            let syntax = detect_matches.get_one::<String>("syntax").unwrap();
            let file = detect_matches.get_one::<String>("file");
            println!("{}", DialectId::sniff(syntax, file.map(String::as_str)));
        }
        _ => unreachable!(),
    }
}

/// Layer the `--config` file, if any, and build the configuration
fn load_config(mut loader: Loader, path: Option<&String>) -> TemplaterConfig {
    if let Some(path) = path {
        loader = loader.with_file(path);
    }
    loader.build().unwrap_or_else(|e| {
        eprintln!("Error loading configuration: {}", e);
        std::process::exit(1);
    })
}

fn build_session(config: &TemplaterConfig) -> Session {
    config.session().unwrap_or_else(|e| {
        eprintln!("Invalid dialect in configuration: {}", e);
        std::process::exit(1);
    })
}

#[derive(Serialize)]
struct CycleOutput<'a> {
    dialect: &'a str,
    text: &'a str,
    selections: &'a [Range<usize>],
    edits: &'a [Edit],
}

/// Handle the cycle command
fn handle_cycle_command(config: &TemplaterConfig, matches: &ArgMatches) {
    let path = matches.get_one::<String>("path").unwrap();
    let format = matches.get_one::<String>("format").unwrap();

    let selections: Vec<Range<usize>> = matches
        .get_many::<String>("selection")
        .unwrap_or_default()
        .map(|s| {
            parse_selection(s).unwrap_or_else(|e| {
                eprintln!("{}", e);
                std::process::exit(1);
            })
        })
        .collect();

    let mut session = build_session(config);
    match matches.get_one::<String>("dialect") {
        Some(name) => {
            if !session.set_active_dialect(name) {
                eprintln!("Unknown dialect '{}'", name);
                eprintln!("Run 'templater dialects' to list the available dialects");
                std::process::exit(1);
            }
        }
        None => {
            if let Some(ext) = Path::new(path).extension().and_then(|e| e.to_str()) {
                if session.registry().get(ext).is_some() {
                    log::debug!("dialect {} picked from file extension", ext);
                    session.set_active_dialect(ext);
                }
            }
        }
    }

    let source = std::fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file: {}", e);
        std::process::exit(1);
    });

    let mut buffer = Buffer::new(source)
        .with_selections(selections)
        .unwrap_or_else(|e| {
            eprintln!("Invalid selection: {}", e);
            std::process::exit(1);
        });

    let plan = session.plan(&buffer, &buffer.selections());
    if let Err(e) = buffer.apply_edits(&plan.edits) {
        eprintln!("Cannot apply edits: {}", e);
        std::process::exit(1);
    }
    buffer.set_selections(plan.selections.clone());

    if matches.get_flag("write") {
        if let Err(e) = std::fs::write(path, buffer.text()) {
            eprintln!("Error writing file: {}", e);
            std::process::exit(1);
        }
        for selection in &plan.selections {
            println!("{}..{}", selection.start, selection.end);
        }
        return;
    }

    match format.as_str() {
        "json" => {
            let output = CycleOutput {
                dialect: session.active_name(),
                text: buffer.text(),
                selections: &plan.selections,
                edits: &plan.edits,
            };
            let json = serde_json::to_string_pretty(&output).unwrap_or_else(|e| {
                eprintln!("Error formatting output: {}", e);
                std::process::exit(1);
            });
            println!("{}", json);
        }
        _ => print!("{}", buffer.text()),
    }
}

/// Handle the dialects command
fn handle_dialects_command(config: &TemplaterConfig) {
    let session = build_session(config);
    let registry = session.registry();
    println!("Available dialects:\n");

    for name in registry.names() {
        let Some(dialect) = registry.get(name) else {
            continue;
        };
        let variants: Vec<String> = dialect
            .variant_sequence()
            .iter()
            .map(|v| format!("{} {}", v.opener, v.closer))
            .collect();
        println!("  {}", name);
        println!("    {}", variants.join("  |  "));
        println!();
    }
}

/// Handle the patterns command
fn handle_patterns_command(config: &TemplaterConfig, name: &str) {
    let session = build_session(config);
    let Some(dialect) = session.registry().get(name) else {
        eprintln!("Unknown dialect '{}'", name);
        std::process::exit(1);
    };

    let opener = dialect.opener_matcher();
    println!("opener: {}", opener.pattern());
    if let Some(guard) = opener.guard() {
        println!("        (rejected when followed by {:?})", guard);
    }
    println!("closer: {}", dialect.closer_matcher().pattern());
}

/// Parse `N` or `N..M` into a byte range
fn parse_selection(raw: &str) -> Result<Range<usize>, String> {
    let parse = |s: &str| {
        s.trim()
            .parse::<usize>()
            .map_err(|_| format!("Invalid selection '{}': expected 'N' or 'N..M'", raw))
    };

    match raw.split_once("..") {
        Some((start, end)) => Ok(parse(start)?..parse(end)?),
        None => {
            let offset = parse(raw)?;
            Ok(offset..offset)
        }
    }
}
