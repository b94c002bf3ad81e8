//! gedgraph CLI: explore a family tree as a graph.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use gedgraph::graph::analytics;
use gedgraph::query::NameUniqueBy;
use gedgraph::record::Record;
use gedgraph::tree::MemoryTree;
use gedgraph::{FamilyGraph, GraphBuilder, GraphConfig, GraphSnapshot, SnapshotFormat};

#[derive(Parser)]
#[command(name = "gedgraph", version, about = "Genealogy property graph explorer")]
struct Cli {
    /// Tree document (JSON) to load records from.
    #[arg(long, global = true, default_value = "tree.json")]
    tree: PathBuf,

    /// Graph configuration (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Restore the graph structure from a snapshot instead of rebuilding it.
    #[arg(long, global = true)]
    snapshot: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show graph statistics.
    Stats,

    /// List ancestors of an individual.
    Ancestors {
        xref: String,
        /// Generations to walk (0 = unlimited).
        #[arg(long, default_value = "0")]
        generations: usize,
    },

    /// List descendants of an individual.
    Descendants {
        xref: String,
        /// Generations to walk (0 = unlimited).
        #[arg(long, default_value = "0")]
        generations: usize,
    },

    /// Find paths between two individuals.
    Path {
        from: String,
        to: String,
        /// Enumerate every simple path instead of the shortest one.
        #[arg(long)]
        all: bool,
        /// Maximum path length for --all (0 = configured default).
        #[arg(long, default_value = "0")]
        max_length: usize,
        /// Skip purely marital paths.
        #[arg(long)]
        blood_only: bool,
    },

    /// Name the relationship of `to` relative to `from`.
    Relationship { from: String, to: String },

    /// List connected components of the kinship graph.
    Components,

    /// Search individuals through the filter indexes.
    Search {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        sex: Option<String>,
        #[arg(long)]
        birth_place: Option<String>,
        #[arg(long)]
        living: Option<bool>,
    },

    /// Most common surnames.
    Surnames {
        #[arg(long, default_value = "10")]
        top: usize,
    },

    /// Write a structural snapshot of the graph.
    Snapshot {
        /// Output file; `.json` selects JSON, anything else binary.
        out: PathBuf,
    },
}

fn load_graph(cli: &Cli) -> Result<FamilyGraph> {
    let config = match &cli.config {
        Some(path) => GraphConfig::load(path)?,
        None => GraphConfig::default(),
    };
    let tree = Arc::new(MemoryTree::load(&cli.tree)?);
    let graph = match &cli.snapshot {
        Some(path) => {
            let snapshot = GraphSnapshot::load(path)?;
            FamilyGraph::from_snapshot(&snapshot, tree, config)?
        }
        None => GraphBuilder::new(config).build(tree)?,
    };
    Ok(graph)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let graph = load_graph(&cli)?;
    let query = graph.query();

    match cli.command {
        Commands::Stats => {
            let summary = analytics::summary(&graph);
            println!("{}", serde_json::to_string_pretty(&summary).into_diagnostic()?);
            if let Some(metrics) = graph.metrics_snapshot() {
                println!("Build time: {:?}", metrics.graph_build_time);
                println!("Loaded:     {} nodes, {} edges", metrics.nodes_loaded, metrics.edges_loaded);
            }
        }

        Commands::Ancestors { xref, generations } => {
            let entries = query
                .individual(&xref)
                .ancestors()
                .max_generations(generations)
                .execute_with_depths()?;
            println!("Ancestors of {xref} ({}):", entries.len());
            for entry in entries {
                println!("  {:>3}  {}", entry.depth, entry.xref);
            }
        }

        Commands::Descendants { xref, generations } => {
            let entries = query
                .individual(&xref)
                .descendants()
                .max_generations(generations)
                .execute_with_depths()?;
            println!("Descendants of {xref} ({}):", entries.len());
            for entry in entries {
                println!("  {:>3}  {}", entry.depth, entry.xref);
            }
        }

        Commands::Path {
            from,
            to,
            all,
            max_length,
            blood_only,
        } => {
            let mut paths = query.individual(&from).path_to(&to).max_length(max_length);
            if blood_only {
                paths = paths.blood_only();
            }
            if !all {
                paths = paths.shortest();
            }
            let found = paths.execute()?;
            if found.is_empty() {
                println!("No path from {from} to {to}.");
            }
            for path in found {
                println!("[{:?}, {} steps] {path}", path.kind, path.len());
            }
        }

        Commands::Relationship { from, to } => {
            let result = graph.calculate_relationship(&from, &to)?;
            match &result.relationship {
                Some(label) => println!("{to} is the {label} of {from}"),
                None => println!("No relationship found between {from} and {to}."),
            }
            if let Some(ancestor) = &result.common_ancestor {
                println!(
                    "  common ancestor: {} ({} / {} generations)",
                    ancestor.xref, ancestor.from_depth, ancestor.to_depth
                );
            }
            if let Some(path) = &result.path {
                println!("  path: {path}");
            }
        }

        Commands::Components => {
            let components = analytics::connected_components(&graph);
            println!("Components ({}):", components.len());
            for component in components {
                println!("  #{:<3} size {:<5} {}", component.id, component.size, component.members.join(" "));
            }
        }

        Commands::Search {
            name,
            sex,
            birth_place,
            living,
        } => {
            let mut filter = query.filter();
            if let Some(name) = &name {
                filter = filter.name_contains(name);
            }
            if let Some(sex) = &sex {
                filter = filter.sex(sex);
            }
            if let Some(place) = &birth_place {
                filter = filter.birth_place(place);
            }
            if let Some(living) = living {
                filter = filter.living(living);
            }
            let found = filter.execute();
            println!("Matches ({}):", found.len());
            for record in found {
                println!("  {:<10} {}", record.xref(), record.name());
            }
        }

        Commands::Surnames { top } => {
            for (surname, count) in query.names().unique_by(NameUniqueBy::Surname).most_common(top) {
                println!("  {count:>5}  {surname}");
            }
        }

        Commands::Snapshot { out } => {
            let format = SnapshotFormat::for_path(&out);
            graph.snapshot().save(&out, format)?;
            println!("Wrote {format:?} snapshot to {}", out.display());
        }
    }

    Ok(())
}
