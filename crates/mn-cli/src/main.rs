use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use mn_core::{
    MemoryStore, MemoryType, Vector, format_timestamp, now_unix_secs_f64, random_displacement,
};
use mn_store::MnHome;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "mn", about = "Velocity-bounded memory store with decay")]
struct Cli {
    /// Name of the memory store to operate on
    #[arg(long, global = true, default_value = "default")]
    store: String,

    /// Config file (TOML); defaults to <data dir>/mn.toml when present
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Offer an event for admission
    Ingest {
        /// Where the event came from
        source: String,
        /// Event text
        content: String,
        /// Comma-separated vector components
        #[arg(long, conflicts_with = "vector_file", allow_hyphen_values = true)]
        vector: Option<String>,
        /// JSON file holding a flat array of components
        #[arg(long)]
        vector_file: Option<PathBuf>,
        /// conversation, fact or identity
        #[arg(long, default_value = "conversation")]
        memory_type: String,
    },

    /// Store a pinned axiom (bypasses admission)
    Axiom {
        content: String,
        #[arg(long, default_value = "core")]
        source: String,
        #[arg(long, default_value = "identity")]
        memory_type: String,
    },

    /// Remove decayed events
    Prune {
        /// Decay weight below which events are removed (default from config)
        #[arg(long)]
        threshold: Option<f64>,
    },

    /// Record a retrieval of an event
    Boost { id: Uuid },

    /// Exempt an event from decay and pruning
    Pin { id: Uuid },

    /// List stored events with their current decay weight
    List,

    /// Show store statistics
    Stats {
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export state to a JSON file
    Export { path: PathBuf },

    /// Import state from a JSON file
    Import { path: PathBuf },

    /// Write a snapshot shell to the archive
    Preserve,

    /// Replace the store with the newest snapshot shell
    Restore,

    /// Run the three-event demo on a throwaway store
    Simulate {
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn open_home(cli: &Cli) -> Result<MnHome> {
    let base_dir = std::env::var("MN_DATA_DIR").ok().map(PathBuf::from);
    MnHome::open(&cli.store, base_dir.as_deref(), cli.config.as_deref())
        .context("failed to open memory store")
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Ingest {
            source,
            content,
            vector,
            vector_file,
            memory_type,
        } => cmd_ingest(
            &cli,
            source,
            content,
            vector.as_deref(),
            vector_file.as_deref(),
            memory_type,
        ),
        Commands::Axiom {
            content,
            source,
            memory_type,
        } => cmd_axiom(&cli, content, source, memory_type),
        Commands::Prune { threshold } => cmd_prune(&cli, *threshold),
        Commands::Boost { id } => cmd_boost(&cli, *id),
        Commands::Pin { id } => cmd_pin(&cli, *id),
        Commands::List => cmd_list(&cli),
        Commands::Stats { json } => cmd_stats(&cli, *json),
        Commands::Export { path } => cmd_export(&cli, path),
        Commands::Import { path } => cmd_import(&cli, path),
        Commands::Preserve => cmd_preserve(&cli),
        Commands::Restore => cmd_restore(&cli),
        Commands::Simulate { seed } => cmd_simulate(&cli, *seed),
    }
}

/// Parse `"0.1, 0.2,0.3"` into a vector.
fn parse_vector(s: &str) -> Result<Vector> {
    let components = s
        .split(',')
        .map(|part| {
            let part = part.trim();
            part.parse::<f64>()
                .with_context(|| format!("invalid vector component '{part}'"))
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok(Vector::new(components))
}

fn read_vector(inline: Option<&str>, file: Option<&Path>) -> Result<Vector> {
    match (inline, file) {
        (Some(s), _) => parse_vector(s),
        (None, Some(path)) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let components: Vec<f64> = serde_json::from_str(&json)
                .with_context(|| format!("{} is not a JSON array of numbers", path.display()))?;
            Ok(Vector::new(components))
        }
        (None, None) => bail!("one of --vector or --vector-file is required"),
    }
}

fn cmd_ingest(
    cli: &Cli,
    source: &str,
    content: &str,
    vector: Option<&str>,
    vector_file: Option<&Path>,
    memory_type: &str,
) -> Result<()> {
    let memory_type: MemoryType = memory_type.parse()?;
    let vector = read_vector(vector, vector_file)?;
    let home = open_home(cli)?;

    let outcome = home
        .ingest(source, content, vector, memory_type)
        .context("ingest failed")?;

    match outcome.event_id {
        Some(id) if outcome.accepted => {
            println!("accepted {id} (magnitude={:.4})", outcome.metrics.magnitude);
        }
        _ => println!(
            "rejected: residual={:.4}, pressure={:.4}",
            outcome.metrics.residual_energy, outcome.metrics.buffer_pressure
        ),
    }
    if outcome.density_exceeded {
        println!("density over budget: shell preserved");
    }
    Ok(())
}

fn cmd_axiom(cli: &Cli, content: &str, source: &str, memory_type: &str) -> Result<()> {
    let memory_type: MemoryType = memory_type.parse()?;
    let home = open_home(cli)?;
    let id = home
        .insert_axiom(source, content, memory_type)
        .context("failed to store axiom")?;
    println!("pinned {id}");
    Ok(())
}

fn cmd_prune(cli: &Cli, threshold: Option<f64>) -> Result<()> {
    let home = open_home(cli)?;
    let threshold = threshold.unwrap_or(home.config().prune_threshold);
    let pruned = home.prune(threshold).context("prune failed")?;
    println!("pruned {pruned}");
    Ok(())
}

fn cmd_boost(cli: &Cli, id: Uuid) -> Result<()> {
    let home = open_home(cli)?;
    let strength = home.boost(id).context("boost failed")?;
    println!("boosted {id} (storage_strength={strength:.4})");
    Ok(())
}

fn cmd_pin(cli: &Cli, id: Uuid) -> Result<()> {
    let home = open_home(cli)?;
    home.pin(id).context("pin failed")?;
    println!("pinned {id}");
    Ok(())
}

fn cmd_list(cli: &Cli) -> Result<()> {
    let home = open_home(cli)?;
    let memory = home.load_memory().context("failed to load store")?;
    let now = now_unix_secs_f64();

    if memory.is_empty() {
        println!("(no events)");
        return Ok(());
    }
    for event in memory.events() {
        println!(
            "{}  {}  {:<12} {} w={:.4}  {}: {}",
            event.id,
            format_timestamp(event.timestamp),
            event.memory_type.as_str(),
            if event.pinned { "pinned" } else { "      " },
            memory.lethe().decay_weight_at(event, now),
            event.source,
            event.content,
        );
    }
    Ok(())
}

fn cmd_stats(cli: &Cli, json: bool) -> Result<()> {
    let home = open_home(cli)?;
    let memory = home.load_memory().context("failed to load store")?;
    let summary = memory.summary();

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("store:       {}", home.name());
    println!("dimension:   {}", memory.config().dimension);
    println!("events:      {}", summary.events);
    println!("pinned:      {}", summary.pinned);
    println!("noise_floor: {:.4}", summary.noise_floor);
    println!("pressure:    {:.4}", summary.filter_pressure);
    println!("energy_seen: {:.4}", summary.total_energy_seen);
    println!("mean_weight: {:.4}", summary.mean_decay_weight);
    println!(
        "dominant:    {}",
        summary.dominant_source.as_deref().unwrap_or("-")
    );
    println!("shells:      {}", home.shells().list()?.len());
    for axiom in &summary.axioms {
        println!("axiom:       {axiom}");
    }
    Ok(())
}

fn cmd_export(cli: &Cli, path: &Path) -> Result<()> {
    let home = open_home(cli)?;
    home.store()
        .export_json_file(path, home.config())
        .with_context(|| format!("failed to export to {}", path.display()))?;
    println!("exported to {}", path.display());
    Ok(())
}

fn cmd_import(cli: &Cli, path: &Path) -> Result<()> {
    let home = open_home(cli)?;
    home.store()
        .import_json_file(path)
        .context("failed to import JSON")?;
    let memory = home
        .load_memory()
        .context("failed to load store after import")?;
    println!(
        "imported from {}. events={}, dimension={}",
        path.display(),
        memory.len(),
        memory.config().dimension
    );
    Ok(())
}

fn cmd_preserve(cli: &Cli) -> Result<()> {
    let home = open_home(cli)?;
    let path = home.preserve().context("failed to preserve shell")?;
    println!("preserved {}", path.display());
    Ok(())
}

fn cmd_restore(cli: &Cli) -> Result<()> {
    let home = open_home(cli)?;
    match home.restore_latest().context("failed to restore shell")? {
        Some(n) => println!("restored {n} events"),
        None => println!("no shells to restore"),
    }
    Ok(())
}

/// Three events against a fresh store: a gentle drift, a panic spike and a
/// moderate adjustment.
fn cmd_simulate(cli: &Cli, seed: u64) -> Result<()> {
    let config = match &cli.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            mn_store::parse_config(&content)?
        }
        None => mn_core::MnConfig::default(),
    };
    let dim = config.dimension;
    let mut memory = MemoryStore::new(config)?;
    let mut rng = SmallRng::seed_from_u64(seed);

    for (source, content, drift) in [
        ("NATURE", "Sun rise", 0.1),
        ("MARKETS", "Crash panic", 5.0),
        ("GOV", "Policy update", 0.8),
    ] {
        let vector = random_displacement(&mut rng, dim, drift);
        let outcome = memory.ingest(source, content, vector)?;
        println!(
            "{:<8} {:<14} drift={drift:<4} {} residual={:.4} pressure={:.4}",
            source,
            content,
            if outcome.accepted { "accepted" } else { "rejected" },
            outcome.metrics.residual_energy,
            outcome.metrics.buffer_pressure,
        );
    }

    let summary = memory.summary();
    println!(
        "stored={} pressure={:.4} energy_seen={:.4}",
        summary.events, summary.filter_pressure, summary.total_energy_seen
    );
    Ok(())
}
