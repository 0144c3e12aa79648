//! blangc CLI
//!
//! Takes the front end's two JSON files and produces the textual ITA
//! stream for the native back ends, or just type-checks the program.

use blangc::{BlangConfig, CompileOutput};
use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{Shell, generate};
use std::io;
use std::path::{Path, PathBuf};
use std::process;

#[derive(ClapParser)]
#[command(name = "blangc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "B compiler middle end - lower a parsed program to ITA", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct InputArgs {
    /// Hoisted symbol map (JSON) from the front end
    symbols: PathBuf,

    /// Program AST (JSON) from the front end
    ast: PathBuf,

    /// Path to a blang.toml configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target operating system (linux, bsd)
    #[arg(long)]
    target_os: Option<String>,

    /// Target architecture (x86_64, arm64)
    #[arg(long)]
    target_arch: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Lower a program to ITA and write the textual stream
    Build {
        #[command(flatten)]
        input: InputArgs,

        /// Output path (defaults to the AST filename with .ita)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also echo the ITA stream to stderr
        #[arg(long)]
        dump_ir: bool,
    },

    /// Type-check a program without writing output
    Check {
        #[command(flatten)]
        input: InputArgs,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("BLANGC_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Build {
            input,
            output,
            dump_ir,
        } => {
            let output = output.unwrap_or_else(|| input.ast.with_extension("ita"));
            run_build(&input, &output, dump_ir);
        }
        Commands::Check { input } => {
            run_check(&input);
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "blangc", &mut io::stdout());
        }
    }
}

fn load_config(input: &InputArgs) -> BlangConfig {
    let mut config = match &input.config {
        Some(path) => BlangConfig::load(path).unwrap_or_else(|err| {
            eprintln!("{}", err);
            process::exit(1);
        }),
        None => BlangConfig::default(),
    };
    if let Some(os) = &input.target_os {
        config.target_os = os.clone();
    }
    if let Some(arch) = &input.target_arch {
        config.target_arch = arch.clone();
    }
    config
}

fn compile_inputs(input: &InputArgs) -> CompileOutput {
    let config = load_config(input);
    let symbols = read_json(&input.symbols);
    let ast = read_json(&input.ast);
    match blangc::compile_from_json(&symbols, &ast, &config) {
        Ok(output) => output,
        Err(err) => {
            eprintln!("{}", err);
            process::exit(1);
        }
    }
}

fn read_json(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) => {
            eprintln!("error: cannot read \"{}\": {}", path.display(), err);
            process::exit(1);
        }
    }
}

fn run_build(input: &InputArgs, output_path: &Path, dump_ir: bool) {
    let output = compile_inputs(input);
    if dump_ir {
        eprint!("{}", output.text);
    }
    if let Err(err) = std::fs::write(output_path, &output.text) {
        eprintln!("error: cannot write \"{}\": {}", output_path.display(), err);
        process::exit(1);
    }
}

fn run_check(input: &InputArgs) {
    let output = compile_inputs(input);
    let functions = output.objects.functions.len();
    let vectors = output.objects.vectors.len();
    println!(
        "ok: {} function{}, {} vector{}",
        functions,
        if functions == 1 { "" } else { "s" },
        vectors,
        if vectors == 1 { "" } else { "s" },
    );
}
