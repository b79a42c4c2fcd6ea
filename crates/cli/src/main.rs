//! hsl - command-line runner for HSL scripts

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hsl_config::EngineConfig;
use hsl_script::{Script, ScriptContext};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hsl", version, about = "Run, check and test HSL scripts")]
struct Cli {
    /// Engine configuration file (defaults to ./hsl.conf when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print diagnostics and test results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log pipeline progress
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a script
    Run {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Lex, parse and resolve a script without running it
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Evaluate a script and report its test blocks
    Test {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(cli.config.as_deref())?;
    config.display();

    let ok = match &cli.command {
        Commands::Run { file } => {
            let ctx = load_script(file, &config)?.evaluate();
            report_diagnostics(&ctx, cli.json, config.print_diagnostics)?;
            ctx.is_success()
        }
        Commands::Check { file } => {
            let ctx = load_script(file, &config)?.resolve();
            report_diagnostics(&ctx, cli.json, config.print_diagnostics)?;
            if ctx.is_success() && !cli.json {
                println!(
                    "{}: ok ({} top-level declarations)",
                    file.display(),
                    ctx.declarations().len()
                );
            }
            ctx.is_success()
        }
        Commands::Test { file } => {
            let ctx = load_script(file, &config)?.evaluate();
            report_diagnostics(&ctx, cli.json, config.print_diagnostics)?;
            report_tests(&ctx, cli.json)?;
            ctx.is_success() && ctx.failed_tests().next().is_none()
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::from(1) })
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            EngineConfig::load_from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))
        }
        None => Ok(EngineConfig::load_default()?),
    }
}

fn load_script(file: &Path, config: &EngineConfig) -> Result<Script> {
    let script = Script::from_file(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    debug!("Loaded {} ({} bytes)", script.name(), script.source().len());
    Ok(script.with_config(config.clone()))
}

fn report_diagnostics(ctx: &ScriptContext, json: bool, echo: bool) -> Result<()> {
    if json {
        if ctx.has_errors() {
            println!("{}", ctx.diagnostics_json()?);
        }
    } else if echo {
        for diagnostic in ctx.diagnostics() {
            eprintln!("{}", diagnostic);
        }
    }
    Ok(())
}

fn report_tests(ctx: &ScriptContext, json: bool) -> Result<()> {
    if json {
        println!("{}", ctx.tests_json()?);
        return Ok(());
    }

    let mut failed = 0;
    for test in ctx.tests() {
        if test.passed {
            println!("ok      {}", test.name);
        } else {
            failed += 1;
            println!(
                "FAILED  {}: {}",
                test.name,
                test.message.as_deref().unwrap_or("no message")
            );
        }
    }
    println!("{} passed, {} failed", ctx.tests().len() - failed, failed);
    Ok(())
}
