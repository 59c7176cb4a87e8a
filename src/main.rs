use clap::Parser;
use npl::ast::{AstPrinter, Program};
use npl::{parser, scanner, Error, Interpreter};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// npl is a small dynamically typed scripting language. Without a script it
/// starts an interactive prompt.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Script to run.
    script: Option<PathBuf>,

    /// Print the token stream before evaluating.
    #[arg(long)]
    tokens: bool,

    /// Print the syntax tree before evaluating.
    #[arg(long)]
    ast: bool,

    /// Don't echo the results of each line at the prompt.
    #[arg(short, long)]
    quiet: bool,
}

fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Only initialize if RUST_LOG is set
    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();
    match &args.script {
        Some(script) => run_file(&args, script),
        None => run_prompt(&args),
    }
}

fn run_file(args: &Args, script: &Path) -> ExitCode {
    let contents = match fs::read_to_string(script) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("Could not read '{}': {}", script.display(), e);
            return ExitCode::from(66);
        }
    };
    let mut interpreter = Interpreter::new();
    let result = prepare(args, &contents)
        .and_then(|program| interpreter.interpret(&program.body, false).map_err(Error::from));
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(65)
        }
    }
}

fn run_prompt(args: &Args) -> ExitCode {
    let mut interpreter = Interpreter::new();
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            return ExitCode::FAILURE;
        }
        // Same reader as `input()`.
        let mut line = String::new();
        match interpreter.input().read_line(&mut line) {
            Ok(0) => return ExitCode::SUCCESS,
            Ok(_) => {}
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::FAILURE;
            }
        }
        if line.trim() == "exit" {
            return ExitCode::SUCCESS;
        }
        let program = match prepare(args, &line) {
            Ok(program) => program,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };
        for result in interpreter.interpret_all(&program.body, !args.quiet) {
            if let Err(e) = result {
                eprintln!("{}", e);
            }
        }
    }
}

/// Tokenizes and parses `source`, dumping either stage when asked to.
fn prepare(args: &Args, source: &str) -> Result<Program, Error> {
    let tokens = scanner::tokenize(source)?;
    if args.tokens {
        for token in &tokens {
            println!("{:>4} {:<12} {}", token.line, token.kind, token.text);
        }
    }
    let program = parser::parse(&tokens)?;
    if args.ast {
        println!("{}", AstPrinter::print(&program));
    }
    Ok(program)
}
