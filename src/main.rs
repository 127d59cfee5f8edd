//! openvoice-launcher CLI entry point.

use std::fs;
use std::io::{self, Stdout};
use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use openvoice_launcher::cli::{Args, Command, ConfigAction, exit_status, parse_batch, run_batch};
use openvoice_launcher::config::{ConfigStore, LauncherConfig};
use openvoice_launcher::installer::{HELPER_SCRIPTS, install};
use openvoice_launcher::jobs::Job;
use openvoice_launcher::runner::{Dispatcher, Invocation, LogPane};
use tracing_subscriber::EnvFilter;

const GREEN: &str = "\x1b[92m";
const CYAN: &str = "\x1b[96m";
const YELLOW: &str = "\x1b[93m";
const RESET: &str = "\x1b[0m";

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let store = match &args.config {
        Some(path) => ConfigStore::with_path(path.clone()),
        None => ConfigStore::new().context("Failed to locate settings file")?,
    };
    let loaded = store
        .load()
        .with_context(|| format!("Failed to load settings from {}", store.path().display()))?;
    let config = args.apply_overrides(loaded);

    match &args.command {
        Command::Install { dir, save_config } => {
            install_helpers(&store, config, dir, *save_config)
        }
        Command::Config { action } => config_command(&store, config, *action),
        Command::Extract(extract) => {
            let config = resolve(config)?;
            run_job(&args, &extract.to_job(), &config)
        }
        Command::Say(say) => {
            let config = resolve(config)?;
            run_job(&args, &say.to_job(), &config)
        }
        Command::LongSynth(long) => {
            let config = resolve(config)?;
            run_job(&args, &long.to_job(), &config)
        }
        Command::Exec { tokens } => {
            let config = resolve(config)?;
            let invocation = Invocation::new(tokens.iter().cloned())
                .context("Invalid command")?
                .with_cwd(config.working_dir());
            run_single(&args, "exec", invocation)
        }
        Command::Batch { file } => {
            let config = resolve(config)?;
            batch_command(&args, file, &config)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "openvoice_launcher=debug"
    } else {
        "openvoice_launcher=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn resolve(config: LauncherConfig) -> Result<LauncherConfig> {
    config.resolve().context("Failed to resolve script directories")
}

fn install_helpers(
    store: &ConfigStore,
    mut config: LauncherConfig,
    dir: &Path,
    save_config: bool,
) -> Result<ExitCode> {
    println!("{CYAN}--- OpenVoice V2 Helper Installer ---{RESET}");

    let report = install(dir)
        .with_context(|| format!("Failed to install helpers into {}", dir.display()))?;

    for (path, script) in report.written.iter().zip(HELPER_SCRIPTS.iter()) {
        println!("{GREEN}{} written ({}){RESET}", path.display(), script.description);
    }
    println!("{GREEN}Installation complete in {}!{RESET}", report.dest.display());

    if save_config {
        config.scripts_dir = report.dest.clone();
        store
            .save(&config)
            .with_context(|| format!("Failed to save settings to {}", store.path().display()))?;
        println!("Settings saved to: {}", store.path().display());
    }

    let dest = report.dest.display();
    println!("Next steps:");
    println!("{YELLOW}conda activate openvoice{RESET}");
    println!("{YELLOW}openvoice-launcher --scripts-dir {dest} extract reference.wav -n myvoice{RESET}");
    println!(
        "{YELLOW}openvoice-launcher --scripts-dir {dest} say --text \"Hello\" --voice myvoice{RESET}"
    );
    println!(
        "{YELLOW}openvoice-launcher --scripts-dir {dest} long-synth input.txt reference.wav output.wav{RESET}"
    );

    Ok(ExitCode::SUCCESS)
}

fn config_command(
    store: &ConfigStore,
    config: LauncherConfig,
    action: ConfigAction,
) -> Result<ExitCode> {
    match action {
        ConfigAction::Show => {
            let json = serde_json::to_string_pretty(&config).context("Failed to render settings")?;
            println!("{json}");
        }
        ConfigAction::Path => println!("{}", store.path().display()),
        ConfigAction::Save => {
            let config = resolve(config)?;
            store
                .save(&config)
                .with_context(|| format!("Failed to save settings to {}", store.path().display()))?;
            println!("Settings saved to: {}", store.path().display());
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn run_job<J: Job>(args: &Args, job: &J, config: &LauncherConfig) -> Result<ExitCode> {
    let invocation = job
        .invocation(config)
        .with_context(|| format!("Invalid {} parameters", job.label()))?;
    run_single(args, job.label(), invocation)
}

fn run_single(args: &Args, label: &str, invocation: Invocation) -> Result<ExitCode> {
    if args.dry_run {
        print_dry_run(&invocation)?;
        return Ok(ExitCode::SUCCESS);
    }

    let pane = open_pane(args)?;
    let mut dispatcher = Dispatcher::new();
    let id = dispatcher
        .launch(label, invocation)
        .with_context(|| format!("Failed to start {label}"))?;

    let codes = dispatcher.drain(&pane, false);
    let code = codes.get(&id).copied().unwrap_or(-1);
    Ok(ExitCode::from(exit_status(code)))
}

fn batch_command(args: &Args, file: &Path, config: &LauncherConfig) -> Result<ExitCode> {
    let contents = fs::read_to_string(file)
        .with_context(|| format!("Failed to read batch file: {}", file.display()))?;
    let entries = parse_batch(&contents)
        .with_context(|| format!("Invalid batch file: {}", file.display()))?;

    let mut invocations = Vec::with_capacity(entries.len());
    for entry in &entries {
        let invocation = Invocation::new(entry.tokens.iter().cloned())
            .with_context(|| format!("Invalid command on line {}", entry.line))?
            .with_cwd(config.working_dir());
        invocations.push((entry.label(), invocation));
    }

    if args.dry_run {
        for (_, invocation) in &invocations {
            print_dry_run(invocation)?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let total = invocations.len();
    let pane = open_pane(args)?;
    let outcome = run_batch(invocations, &pane);

    if outcome.failed() > 0 {
        tracing::warn!(failed = outcome.failed(), total, "batch finished with failures");
    }
    Ok(ExitCode::from(outcome.exit_status()))
}

fn open_pane(args: &Args) -> Result<LogPane<Stdout>> {
    let pane = LogPane::new(io::stdout());

    match &args.log_file {
        Some(path) => {
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;
            Ok(pane.mirror_to(file))
        }
        None => Ok(pane),
    }
}

fn print_dry_run(invocation: &Invocation) -> Result<()> {
    let argv = serde_json::to_string(&invocation.argv()).context("Failed to render command")?;
    match invocation.cwd() {
        Some(dir) => println!("(cd {}) {argv}", dir.display()),
        None => println!("{argv}"),
    }
    Ok(())
}
