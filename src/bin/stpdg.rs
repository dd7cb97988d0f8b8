//! Command-line front-end: stdin/file ingestion, pragma override, format
//! selection, and exit-code mapping over the `st-pdg-miner` library.

use clap::{Parser, ValueEnum};
use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Xml,
    Json,
    Dot,
}

/// Static analyzer for IEC 61131-3 Structured Text.
#[derive(Parser, Debug)]
#[command(name = "stpdg", version, about)]
struct Cli {
    /// ST source files. Stdin is read and concatenated when none are given.
    files: Vec<PathBuf>,

    /// Output path, or "-" for stdout.
    #[arg(short = 'o', long = "output", default_value = "-")]
    output: String,

    /// Pretty-print XML/JSON output.
    #[arg(long)]
    pretty: bool,

    /// Output format.
    #[arg(long, value_enum, default_value = "xml")]
    format: Format,

    /// Print only the raw parse tree.
    #[arg(long = "ast-only")]
    ast_only: bool,

    /// Force nested-comment scanning regardless of the `@NESTEDCOMMENTS` pragma.
    #[arg(long)]
    pragma: bool,
}

fn read_input(files: &[PathBuf]) -> io::Result<String> {
    if files.is_empty() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    let mut buf = String::new();
    for path in files {
        buf.push_str(&fs::read_to_string(path)?);
        buf.push('\n');
    }
    Ok(buf)
}

fn write_output(output: &str, contents: &str) -> io::Result<()> {
    if output == "-" {
        let mut stdout = io::stdout();
        stdout.write_all(contents.as_bytes())?;
        stdout.flush()
    } else {
        fs::write(output, contents)
    }
}

fn run(cli: Cli) -> ExitCode {
    let source = match read_input(&cli.files) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "failed to read input");
            eprintln!("stpdg: {e}");
            return ExitCode::from(5);
        }
    };

    if cli.ast_only {
        let analysis = match st_pdg_miner::analyze(&source, cli.pragma) {
            Ok(a) => a,
            Err(e) => {
                eprintln!("stpdg: {e}");
                return ExitCode::from(5);
            }
        };
        if cli.output == "-" {
            if analysis.tree.print().is_err() {
                return ExitCode::from(1);
            }
            return ExitCode::SUCCESS;
        }
        let rendered = match cli.format {
            Format::Xml => Ok(st_pdg_miner::serialize::xml::render_ast(&analysis.tree, cli.pretty)),
            Format::Json => st_pdg_miner::serialize::json::render_ast(&analysis.tree, cli.pretty)
                .map_err(|e| e.to_string()),
            Format::Dot => Ok(st_pdg_miner::serialize::dot::render_ast(&analysis.tree)),
        };
        return match rendered {
            Ok(text) => match write_output(&cli.output, &text) {
                Ok(()) => ExitCode::SUCCESS,
                Err(_) => ExitCode::from(1),
            },
            Err(message) => {
                eprintln!("stpdg: {message}");
                ExitCode::from(5)
            }
        };
    }

    let analysis = match st_pdg_miner::analyze(&source, cli.pragma) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("stpdg: {e}");
            return ExitCode::from(5);
        }
    };

    let rendered = match cli.format {
        Format::Xml => Ok(analysis.to_xml(cli.pretty)),
        Format::Json => analysis.to_json(cli.pretty).map_err(|e| e.to_string()),
        Format::Dot => Ok(analysis.to_dot()),
    };

    match rendered {
        Ok(text) => match write_output(&cli.output, &text) {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::from(1),
        },
        Err(message) => {
            eprintln!("stpdg: {message}");
            ExitCode::from(5)
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let cli = Cli::parse();
    run(cli)
}
