//! BreadLang compiler driver (`breadc`).
//!
//! Parses, links, and type-checks a `.bread` entry file and prints
//! diagnostics as banners. It does not lower to bytecode or LLVM IR - those
//! targets are external collaborators that would link against
//! `bread-runtime`'s ABI surface.

use bread_compiler::config::ManifestConfig;
use bread_compiler::CompilerConfig;
use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{generate, Shell};
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "breadc")]
#[command(about = "BreadLang compiler front end - parse, link, and type-check .bread programs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse, link, and type-check a .bread entry file
    Check {
        /// Input .bread entry file
        input: PathBuf,

        /// Additional module search path (repeatable)
        #[arg(short = 'L', long = "search-path")]
        search_paths: Vec<PathBuf>,

        /// Project manifest (bread.toml) to fold search paths and flags from
        #[arg(long)]
        config: Option<PathBuf>,

        /// Enable heap allocation tracking for leak reporting
        #[arg(long)]
        debug_memory: bool,
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
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bread_compiler=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Commands::Check { input, search_paths, config, debug_memory } => {
            run_check(&input, search_paths, config.as_deref(), debug_memory)
        }
        Commands::Completions { shell } => run_completions(shell),
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "breadc", &mut io::stdout());
}

fn run_check(input: &std::path::Path, search_paths: Vec<PathBuf>, manifest_path: Option<&std::path::Path>, debug_memory: bool) {
    let mut config = CompilerConfig::new().with_debug_memory(debug_memory);
    if search_paths.is_empty() {
        let entry_dir = input.parent().unwrap_or_else(|| std::path::Path::new("."));
        for path in bread_compiler::config::default_search_paths(entry_dir) {
            config = config.with_search_path(path);
        }
    } else {
        for path in search_paths {
            config = config.with_search_path(path);
        }
    }

    if let Some(manifest_path) = manifest_path {
        match std::fs::read_to_string(manifest_path).map_err(|e| e.to_string()).and_then(|s| ManifestConfig::from_toml(&s)) {
            Ok(manifest) => config = config.with_manifest(manifest),
            Err(err) => {
                eprintln!("failed to load {}: {err}", manifest_path.display());
                process::exit(1);
            }
        }
    }

    let debug_memory = config.debug_memory;
    if debug_memory {
        bread_core::memory_stats::enable_tracking();
    }

    match bread_compiler::compile_file(input, &config) {
        Ok(_) => {
            tracing::info!(file = %input.display(), "compiled successfully");
            if debug_memory {
                report_leaks();
            }
        }
        Err(errors) => {
            for err in &errors {
                eprintln!("{}", err.to_banner());
            }
            bread_compiler::diagnostics::emit(&errors);
            if debug_memory {
                report_leaks();
            }
            process::exit(1);
        }
    }
}

fn report_leaks() {
    let leaks = bread_core::memory_stats::report_leaks();
    if !leaks.is_empty() {
        eprintln!("{} object(s) still live at exit:", leaks.len());
        for (id, record) in &leaks {
            eprintln!("  #{id}: {:?} ({} bytes)", record.kind, record.size);
        }
    }
}
