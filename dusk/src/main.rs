//! Dusk CLI

use clap::{Parser, Subcommand};
use dusk::interp::Interpreter;
use dusk::{parse, Value};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dusk", version, about = "Dusk - a small scripting language")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a Dusk source file
    Run {
        /// Source file to run
        file: PathBuf,
    },
    /// Start the interactive REPL
    Repl,
    /// Parse and dump AST (debug)
    Parse {
        /// Source file to parse
        file: PathBuf,
    },
    /// Tokenize and dump tokens (debug)
    Tokens {
        /// Source file to tokenize
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Some(Command::Run { file }) => run_file(&file),
        Some(Command::Parse { file }) => parse_file(&file),
        Some(Command::Tokens { file }) => tokenize_file(&file),
        Some(Command::Repl) | None => repl(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run_file(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;

    let (program, errors) = parse(&source);
    if let Some(err) = errors.first() {
        return Err(format!("parse error: {err}").into());
    }

    let mut interpreter = Interpreter::new();
    let result = interpreter.run(&program);

    // Captured logs print even when evaluation failed partway
    for line in interpreter.drain_logs() {
        println!("{line}");
    }

    let value = result?;
    if value != Value::Null {
        println!("{value}");
    }
    Ok(())
}

fn repl() -> Result<(), Box<dyn std::error::Error>> {
    let mut repl = dusk::repl::Repl::new()?;
    repl.run()?;
    Ok(())
}

fn parse_file(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;

    let (program, errors) = parse(&source);
    if let Some(err) = errors.first() {
        return Err(format!("parse error: {err}").into());
    }

    println!("{}", serde_json::to_string_pretty(&program)?);
    Ok(())
}

fn tokenize_file(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)?;

    for tok in dusk::lexer::tokenize(&source) {
        println!("{tok:?}");
    }

    Ok(())
}
