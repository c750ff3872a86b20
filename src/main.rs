use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

use texpatch_lib::config::{default_config_path, PatchConfig};
use texpatch_lib::matcher::TextureMatcher;
use texpatch_lib::patch::{
    build_catalog, resolve_container_path, run_patch, CommitMode, PatchOutcome, RecordStatus,
    TexturePatcher,
};

#[derive(Parser, Debug)]
#[command(
    name = "texpatch",
    about = "Replace named textures inside an asset container",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replace textures and write the container back
    Patch(PatchArgs),
    /// List target textures and their replacement decisions without writing
    Inspect(InspectArgs),
    /// Write the default config so it can be edited
    Init(InitArgs),
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Container file, or a root directory holding it at the configured relative path
    input: PathBuf,
    /// JSON config file (defaults to the per-user config, then built-in defaults)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory holding the explicit table's images
    #[arg(long)]
    frame_dir: Option<PathBuf>,
    /// Directory scanned for images named after textures
    #[arg(long, conflicts_with = "no_mask")]
    mask_dir: Option<PathBuf>,
    /// Skip the directory scan
    #[arg(long)]
    no_mask: bool,
    /// Only consider textures whose name contains this string
    #[arg(long)]
    filter: Option<String>,
    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct PatchArgs {
    #[command(flatten)]
    common: ConfigArgs,
    /// Write-back strategy
    #[arg(long, value_enum, default_value_t = Mode::Copy)]
    mode: Mode,
}

#[derive(Args, Debug)]
struct InspectArgs {
    #[command(flatten)]
    common: ConfigArgs,
}

#[derive(Args, Debug)]
struct InitArgs {
    /// Target file (defaults to the per-user config path)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Replace an existing file
    #[arg(long)]
    force: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    /// Back up the original, then overwrite it
    Commit,
    /// Save a `_modified` copy next to the original
    Copy,
}

impl From<Mode> for CommitMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Commit => CommitMode::BackupAndCommit,
            Mode::Copy => CommitMode::SaveAsCopy,
        }
    }
}

fn load_config(args: &ConfigArgs) -> Result<PatchConfig, Box<dyn std::error::Error>> {
    let mut config = PatchConfig::load_or_default(args.config.as_deref())?;
    if let Some(dir) = &args.frame_dir {
        config.frame_dir = dir.clone();
    }
    if args.no_mask {
        config.mask_dir = None;
    } else if let Some(dir) = &args.mask_dir {
        config.mask_dir = Some(dir.clone());
    }
    if args.filter.is_some() {
        config.name_filter = args.filter.clone();
    }
    Ok(config)
}

fn patch(args: &PatchArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.common)?;
    let outcome = run_patch(&args.common.input, &config, args.mode.into())?;

    if args.common.json {
        println!("{}", serde_json::to_string_pretty(outcome.report())?);
        return Ok(());
    }

    let report = outcome.report();
    for o in &report.outcomes {
        match &o.status {
            RecordStatus::Replaced {
                source,
                width,
                height,
                ..
            } => println!("replaced  {} <- {} ({}x{})", o.name, source.display(), width, height),
            RecordStatus::NoCatalogEntry => println!("skipped   {}", o.name),
            RecordStatus::MissingFile { path } => {
                println!("missing   {} ({})", o.name, path.display())
            }
            RecordStatus::Failed { error } => println!("failed    {}: {}", o.name, error),
        }
    }

    match &outcome {
        PatchOutcome::NothingToDo { .. } => println!("No matching assets found to replace."),
        PatchOutcome::Committed {
            backup_path,
            output_path,
            ..
        } => println!(
            "Replaced {} assets. Updated {}, backup at {}",
            report.replaced_count,
            output_path.display(),
            backup_path.display()
        ),
        PatchOutcome::SavedAsCopy { output_path, .. } => println!(
            "Replaced {} assets. Saved {}",
            report.replaced_count,
            output_path.display()
        ),
    }
    Ok(())
}

fn inspect(args: &InspectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(&args.common)?;
    let path = resolve_container_path(
        &args.common.input,
        config.container_relative_path.as_deref(),
    )?;
    let catalog = build_catalog(&config)?;
    let patcher = TexturePatcher::load(&path, TextureMatcher::new(config.name_filter.clone()))?;
    let plan = patcher.plan(&catalog);

    if args.common.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    for entry in &plan {
        println!(
            "#{:<5} {} {}x{} {:?} -> {:?}",
            entry.index, entry.name, entry.width, entry.height, entry.format, entry.decision
        );
    }
    println!("{} target textures", plan.len());
    Ok(())
}

fn init(args: &InitArgs) -> Result<(), Box<dyn std::error::Error>> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => default_config_path().ok_or("no per-user config directory on this platform")?,
    };
    if path.exists() && !args.force {
        return Err(format!("{} already exists, pass --force to replace it", path.display()).into());
    }

    PatchConfig::default().save(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn main() -> ExitCode {
    texpatch_lib::init_logging();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Patch(args) => patch(args),
        Commands::Inspect(args) => inspect(args),
        Commands::Init(args) => init(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
