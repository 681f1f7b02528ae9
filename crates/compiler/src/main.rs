//! Veld Compiler CLI
//!
//! Command-line interface for compiling .veld sources to VM assembly.

use clap::Parser as ClapParser;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process;

use veldc::{CompileError, ProjectConfig, Token, compile_tokens, fault_location, reduce, tokenize};

#[derive(ClapParser)]
#[command(name = "veldc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Veld compiler - compile .veld sources to VM assembly", long_about = None)]
struct Cli {
    /// Input .veld source file
    input: PathBuf,

    /// Output assembly path (defaults to the input path with `.asm` appended)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Project configuration file (defaults to a veld.toml next to the input)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the reduced token stream to stderr before compiling
    #[arg(long)]
    dump_tokens: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    process::exit(run(&cli));
}

fn run(cli: &Cli) -> i32 {
    let config = match load_config(cli) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("fatal: {}", message);
            return 1;
        }
    };

    let source = match std::fs::read_to_string(&cli.input) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("fatal: could not open file: {}: {}", cli.input.display(), e);
            return 1;
        }
    };

    let tokens = reduce(tokenize(&source));
    if cli.dump_tokens {
        for (index, token) in tokens.iter().enumerate() {
            eprintln!(
                "{:4}  {}:{}  {:?}",
                index,
                token.line + 1,
                token.column + 1,
                token.text
            );
        }
    }

    let compilation = match compile_tokens(&tokens) {
        Ok(compilation) => compilation,
        Err(error) => {
            eprint!("{}", render_diagnostic(&cli.input, &source, &tokens, &error));
            return 1;
        }
    };

    for warning in &compilation.warnings {
        if config.enabled(*warning) {
            eprintln!("warning: {}", warning);
        }
    }

    let output = cli
        .output
        .clone()
        .or_else(|| config.build.output.clone())
        .unwrap_or_else(|| default_output(&cli.input));
    if let Err(e) = std::fs::write(&output, &compilation.assembly) {
        eprintln!("fatal: could not write file: {}: {}", output.display(), e);
        return 1;
    }
    0
}

fn load_config(cli: &Cli) -> Result<ProjectConfig, String> {
    match &cli.config {
        Some(path) => ProjectConfig::load(path),
        None => ProjectConfig::discover(&cli.input),
    }
}

/// The input path with `.asm` appended: `prog.veld` -> `prog.veld.asm`.
fn default_output(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_os_string();
    name.push(".asm");
    PathBuf::from(name)
}

/// Render a fault with its source position and a three-line context
/// window around the offending line.
fn render_diagnostic(path: &Path, source: &str, tokens: &[Token], error: &CompileError) -> String {
    let (line, column) = fault_location(tokens, error);
    let mut out = String::new();
    let _ = writeln!(out, "{}:{}:{}: {}", path.display(), line, column, error);
    let _ = writeln!(out, "note: source context: {}:{}", path.display(), line);

    let lines: Vec<&str> = source.lines().collect();
    let index = line - 1;
    if index >= 1 {
        if let Some(before) = lines.get(index - 1) {
            let _ = writeln!(out, "    {}", before);
        }
    }
    if let Some(at) = lines.get(index) {
        let _ = writeln!(out, "->  {}", at);
    }
    if let Some(after) = lines.get(index + 1) {
        let _ = writeln!(out, "    {}", after);
    }
    out
}
