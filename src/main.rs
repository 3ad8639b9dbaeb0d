use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fmly_tree::{
    config::TreeConfig,
    graph::{FamilyClassifier, RelationStore},
    layout::{LayoutSerializer, OutputFormat, TreeLayoutBuilder},
    snapshot::FamilySnapshot,
    types::{ClassifiedRelation, PersonId, RelationKind},
};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "fmly-tree")]
#[command(about = "Family relationship classifier and family tree layout generator")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Family snapshot (JSON with persons and relations)
    #[arg(short, long, default_value = "family.json")]
    snapshot: PathBuf,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the family tree below a person
    Tree {
        /// Id of the person at the top of the tree
        root: u64,

        /// Output format (dot, json)
        #[arg(short, long, default_value = "dot")]
        format: String,

        /// Directory to write `<root>.<ext>` to (defaults to stdout)
        #[arg(short = 'd', long)]
        output_dir: Option<PathBuf>,
    },

    /// List the parents, children, partners and siblings of a person
    Relatives {
        /// Person id
        person: u64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        output: String,
    },

    /// Initialize configuration file
    Init {
        /// Configuration file path
        #[arg(short, long, default_value = "fmly-tree.yml")]
        config_file: PathBuf,
    },

    /// Check the snapshot for invalid relations and ancestor cycles
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(&cli.log_level)?;

    // Load configuration
    let config = load_config(cli.config.as_ref()).await?;

    match cli.command {
        Commands::Tree {
            root,
            format,
            output_dir,
        } => {
            generate_tree(&cli.snapshot, PersonId(root), &format, output_dir, &config).await?;
        }

        Commands::Relatives { person, output } => {
            list_relatives(&cli.snapshot, PersonId(person), &output, &config)?;
        }

        Commands::Init { config_file } => {
            init_config(config_file).await?;
        }

        Commands::Validate => {
            validate_snapshot(&cli.snapshot)?;
        }
    }

    Ok(())
}

/// Initialize tracing with the specified log level
fn init_tracing(log_level: &str) -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(log_level))
        .context("Failed to create env filter")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_level(true),
        )
        .with(env_filter)
        .init();

    Ok(())
}

/// Load configuration from file or use defaults, then apply environment overrides
async fn load_config(config_path: Option<&PathBuf>) -> Result<TreeConfig> {
    let mut config = TreeConfig::default();

    if let Some(path) = config_path {
        if path.exists() {
            info!("Loading configuration from: {:?}", path);
            config = TreeConfig::load_from_file(path)
                .await
                .with_context(|| format!("Failed to load configuration file: {:?}", path))?;
        } else {
            warn!("Configuration file not found: {:?}. Using defaults.", path);
        }
    }

    config
        .apply_env()
        .context("Invalid environment configuration")?;
    config.validate()?;

    Ok(config)
}

/// Build and write the family tree below `root`
async fn generate_tree(
    snapshot_path: &PathBuf,
    root: PersonId,
    format: &str,
    output_dir: Option<PathBuf>,
    config: &TreeConfig,
) -> Result<()> {
    let format = format.parse::<OutputFormat>().unwrap_or_else(|e| {
        warn!("{}, using dot", e);
        OutputFormat::Dot
    });

    let snapshot = FamilySnapshot::load(snapshot_path)?;
    let layout = TreeLayoutBuilder::from_snapshot(
        snapshot.persons,
        snapshot.relations,
        &config.layout,
        root,
    )
    .with_context(|| format!("Failed to build family tree for person {}", root))?;

    let serializer = LayoutSerializer::new(&config.layout);
    let content = serializer.serialize(&layout, format)?;

    if let Some(dir) = output_dir {
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create output directory: {:?}", dir))?;
        let file_path = dir.join(serializer.render_file_name(root, format));
        tokio::fs::write(&file_path, &content)
            .await
            .with_context(|| format!("Failed to write output to: {:?}", file_path))?;
        info!("Family tree written to: {:?}", file_path);
    } else {
        print!("{}", content);
    }

    if layout.is_partial() {
        warn!(
            "Family tree for person {} is partial: {} warnings",
            root,
            layout.warnings.len()
        );
    }

    Ok(())
}

/// Print the classified family of a person
fn list_relatives(
    snapshot_path: &PathBuf,
    person: PersonId,
    output: &str,
    config: &TreeConfig,
) -> Result<()> {
    let (store, warnings) = FamilySnapshot::load(snapshot_path)?.into_partial_store()?;
    if !warnings.is_empty() {
        warn!("Skipped {} relations with unknown people", warnings.len());
    }

    let classifier =
        FamilyClassifier::new(&store).with_families(config.classification.families.clone());
    let relations = classifier
        .classify(person)
        .with_context(|| format!("Failed to classify relatives of person {}", person))?;

    let content = match output.to_lowercase().as_str() {
        "json" => serde_json::to_string_pretty(&relations)?,
        "text" => format_relations(&store, person, &relations)?,
        _ => {
            warn!("Unknown output format '{}', using text", output);
            format_relations(&store, person, &relations)?
        }
    };

    println!("{}", content);
    Ok(())
}

fn format_relations(
    store: &RelationStore,
    person: PersonId,
    relations: &[ClassifiedRelation],
) -> Result<String> {
    let mut lines = vec![format!("Relatives of {}", store.person(person)?.display_name())];

    for relation in relations {
        let relative = store.person(relation.person)?;
        let mut line = format!("  {:<8} {}", relation.kind, relative.display_name());
        if let Some(family) = &relation.family {
            line.push_str(&format!(" [{}]", family));
        }
        if relation.relation.is_none() && relation.kind == RelationKind::Partner {
            line.push_str(" (inferred)");
        }
        lines.push(line);
    }

    if relations.is_empty() {
        lines.push("  No relatives recorded".to_string());
    }

    Ok(lines.join("\n"))
}

/// Initialize configuration file
async fn init_config(config_file: PathBuf) -> Result<()> {
    info!("Initializing configuration file: {:?}", config_file);

    if config_file.exists() {
        warn!("Configuration file already exists: {:?}", config_file);
        println!("Configuration file already exists: {:?}", config_file);
        return Ok(());
    }

    let default_config = r#"# Family tree configuration

# Layout settings
layout:
  graph_name: G
  spacer: 8
  # Stop populating the tree after this many people
  max_nodes: null

  colours:
    male: lightblue
    female: pink
    unknown: lightgrey

  node_style:
    fontname: sans-serif
    fontsize: 8
    color: black
    width: 1.0
    height: 0.5

# Classification settings
classification:
  # Family surnames relatives are tagged with
  families: []
"#;

    tokio::fs::write(&config_file, default_config)
        .await
        .with_context(|| format!("Failed to write configuration file: {:?}", config_file))?;

    info!("Configuration file created successfully: {:?}", config_file);
    println!("Configuration file created: {:?}", config_file);
    println!("Edit this file to customize the family tree layout.");

    Ok(())
}

/// Validate the snapshot against the strict store rules
fn validate_snapshot(snapshot_path: &PathBuf) -> Result<()> {
    info!("Validating family snapshot at: {:?}", snapshot_path);

    let snapshot = match FamilySnapshot::load(snapshot_path) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("Failed to load snapshot: {:#}", e);
            std::process::exit(1);
        }
    };

    let store = match snapshot.into_store() {
        Ok(store) => store,
        Err(e) => {
            error!("Invalid snapshot: {}", e);
            println!("Snapshot Status: Invalid - {}", e);
            std::process::exit(1);
        }
    };

    println!("Snapshot Statistics:");
    println!("  People: {}", store.person_count());
    println!("  Relations: {}", store.edge_count());

    let cycles = store.parent_cycles();
    if cycles.is_empty() {
        println!("  Ancestor cycles: none");
    } else {
        println!("  Ancestor cycles: {}", cycles.len());
        for cycle in &cycles {
            let members: Vec<String> = cycle.iter().map(PersonId::to_string).collect();
            println!("    {}", members.join(" -> "));
        }
    }

    info!("Snapshot validation completed");
    Ok(())
}
