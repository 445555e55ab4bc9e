//! `gs`: drive the reference DSLs from the command line.
//!
//! ```bash
//! # Compile to a plan and keep it
//! echo 'track(name="Drums").add_clip(start=0, length=8)' | gs compile --out plan.yaml
//!
//! # Execute a stored plan later
//! gs run --plan plan.yaml
//!
//! # Execute actions as they are produced
//! gs stream --file song.gs
//!
//! # Direct-convention DSL
//! echo 'task("docs").done("docs")' | gs --dsl tasks run
//! ```

use std::error::Error as StdError;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::warn;

use grammar_school::cfg::CfgTool;
use grammar_school::config::{self, EngineConfig};
use grammar_school::demo::{FunctionalDsl, MusicDsl, TaskDsl};
use grammar_school::runtime::plan::{load_plan, save_plan};
use grammar_school::runtime::{PrintRuntime, Runtime};
use grammar_school::{logging, CancelToken, Dsl, Engine, TwoLayer};

type CliResult = Result<(), Box<dyn StdError>>;

#[derive(Parser)]
#[command(name = "gs")]
#[command(version)]
#[command(about = "Parse, compile and run chained-call DSL programs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (default: ~/.grammar-school/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// tracing filter, overrides the config file
    #[arg(long, global = true)]
    log: Option<String>,

    /// Which reference DSL to drive
    #[arg(long, global = true, value_enum, default_value = "music")]
    dsl: DemoDsl,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DemoDsl {
    /// Two-layer: track / add_clip / mute + functional verbs
    Music,
    /// Two-layer: square / double / is_even + functional verbs
    Functional,
    /// Direct: task / done / note + functional verbs
    Tasks,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile source into an action plan
    Compile {
        /// Input file (reads stdin if not provided)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Write the plan here (.yaml/.yml for YAML, JSON otherwise)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Compile and execute source, or execute a stored plan
    Run {
        /// Input file (reads stdin if not provided)
        #[arg(short, long, conflicts_with = "plan")]
        file: Option<PathBuf>,

        /// Previously compiled plan
        #[arg(long)]
        plan: Option<PathBuf>,
    },

    /// Evaluate incrementally, handling each event as it arrives
    Stream {
        /// Input file (reads stdin if not provided)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Parse source and print the call chain as JSON
    Parse {
        /// Input file (reads stdin if not provided)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Print the grammar
    Grammar {
        /// Strip directives for CFG use
        #[arg(long)]
        cfg: bool,

        /// Print a CFG tool request config with this tool name instead
        #[arg(long)]
        tool: Option<String>,
    },

    /// List registered handler names
    Verbs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };
    logging::init(cli.log.as_deref().unwrap_or(&config.log_filter));

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || on_interrupt.cancel()) {
        warn!(error = %e, "could not install Ctrl-C handler");
    }

    let result = match cli.dsl {
        DemoDsl::Music => {
            build(MusicDsl, config).and_then(|engine| two_layer(&engine, cli.command, &cancel))
        }
        DemoDsl::Functional => {
            build(FunctionalDsl, config).and_then(|engine| two_layer(&engine, cli.command, &cancel))
        }
        DemoDsl::Tasks => {
            build(TaskDsl::new(), config).and_then(|engine| direct(&engine, cli.command, &cancel))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, Box<dyn StdError>> {
    match path {
        Some(path) => Ok(config::load_from(path)?),
        None => Ok(config::load_config().unwrap_or_default()),
    }
}

fn build<D: Dsl>(dsl: D, config: EngineConfig) -> Result<Engine<D>, Box<dyn StdError>> {
    Ok(Engine::builder(dsl).config(config).build()?)
}

fn read_input(file: Option<PathBuf>) -> Result<String, io::Error> {
    match file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

fn two_layer<D: Dsl<Convention = TwoLayer>>(
    engine: &Engine<D>,
    command: Commands,
    cancel: &CancelToken,
) -> CliResult {
    match command {
        Commands::Compile { file, out } => {
            let plan = engine.compile(&read_input(file)?)?;
            match out {
                Some(path) => {
                    save_plan(&path, &plan)?;
                    eprintln!("wrote {} action(s) to {}", plan.len(), path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&plan)?),
            }
            Ok(())
        }
        Commands::Run { file: _, plan: Some(path) } => {
            let plan = load_plan(&path)?;
            engine.execute_plan(&plan, cancel)?;
            Ok(())
        }
        Commands::Run { file, plan: None } => {
            engine.run(&read_input(file)?, cancel)?;
            Ok(())
        }
        Commands::Stream { file } => {
            let runtime = PrintRuntime::new(engine.config().print_format);
            for event in engine.stream(read_input(file)?, cancel.clone()) {
                runtime.execute(&event?)?;
            }
            Ok(())
        }
        other => shared(engine, other),
    }
}

fn direct(engine: &Engine<TaskDsl>, command: Commands, cancel: &CancelToken) -> CliResult {
    match command {
        Commands::Compile { .. } => Err("compile needs a two-layer DSL (try --dsl music)".into()),
        Commands::Run { plan: Some(_), .. } => {
            Err("stored plans need a two-layer DSL (try --dsl music)".into())
        }
        Commands::Run { file, plan: None } => {
            engine.execute(&read_input(file)?, cancel)?;
            print_log(engine.dsl());
            Ok(())
        }
        Commands::Stream { file } => {
            for event in engine.stream(read_input(file)?, cancel.clone()) {
                println!("completed: {}", event?.call);
            }
            print_log(engine.dsl());
            Ok(())
        }
        other => shared(engine, other),
    }
}

fn shared<D: Dsl>(engine: &Engine<D>, command: Commands) -> CliResult {
    match command {
        Commands::Parse { file } => {
            let chain = engine.parse(&read_input(file)?)?;
            println!("{}", serde_json::to_string_pretty(&chain)?);
        }
        Commands::Grammar { tool: Some(name), .. } => {
            let tool = CfgTool::new(name, "Emits a program in this DSL", engine.grammar());
            println!("{}", serde_json::to_string_pretty(&tool.request_config())?);
        }
        Commands::Grammar { cfg: true, .. } => println!("{}", engine.cfg_grammar()),
        Commands::Grammar { .. } => println!("{}", engine.grammar().trim()),
        Commands::Verbs => {
            for name in engine.handler_names() {
                println!("{name}");
            }
        }
        Commands::Compile { .. } | Commands::Run { .. } | Commands::Stream { .. } => {
            return Err("command not supported for this DSL".into());
        }
    }
    Ok(())
}

fn print_log(dsl: &TaskDsl) {
    for entry in dsl.entries() {
        println!("{entry}");
    }
}
