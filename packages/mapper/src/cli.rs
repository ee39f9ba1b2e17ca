//! Command-line interface for the mapper.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use console::style;

use crate::config::MapperConfig;
use crate::error::{MapperError, Result};
use crate::manifest::Manifest;
use crate::service::{OutputFormat, Service};
use crate::store::DirectoryStore;
use crate::watcher::UpdateWatcher;

/// Briefedition Mapper - Extract records from TEI letter collections.
#[derive(Parser)]
#[command(name = "briefedition-mapper")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Manifest file (default: $MANIFEST_PATH or config.yml)
    #[arg(short, long, global = true)]
    pub manifest: Option<PathBuf>,

    /// Directory containing the collection (default: $COLLECTION_ROOT or .)
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load and validate the manifest.
    Validate,

    /// Print all records of an entity type as JSON.
    List {
        /// Entity type (e.g., letters)
        entity: String,
    },

    /// Print one entity.
    Show {
        /// Entity type (e.g., letters)
        entity: String,

        /// Entity identifier
        id: String,

        /// Output format: record, json or xml
        #[arg(short, long, default_value = "record")]
        format: String,
    },

    /// Keep the collection loaded and report updates.
    Watch {
        /// Polling interval in seconds (default: $WATCH_INTERVAL_SECS or 2)
        #[arg(short, long)]
        interval: Option<u64>,
    },
}

/// Run the CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = MapperConfig::from_env()?;
    if let Some(manifest) = cli.manifest {
        config = config.with_manifest_path(manifest);
    }
    if let Some(root) = cli.root {
        config = config.with_collection_root(root);
    }

    match cli.command {
        Commands::Validate => validate_command(&config),
        Commands::List { entity } => list_command(&config, &entity),
        Commands::Show { entity, id, format } => show_command(&config, &entity, &id, &format),
        Commands::Watch { interval } => {
            if let Some(secs) = interval {
                config = config.with_watch_interval(Duration::from_secs(secs));
            }
            watch_command(&config)
        }
    }
}

fn open_service(config: &MapperConfig) -> Result<Service> {
    let manifest = Manifest::load(&config.manifest_path)?;
    let store = DirectoryStore::new(&config.collection_root, manifest.collection());
    Service::new(Arc::new(manifest), Arc::new(store))
}

fn validate_command(config: &MapperConfig) -> Result<()> {
    let manifest = Manifest::load(&config.manifest_path)?;

    println!(
        "{} {}",
        style("Manifest valid:").green().bold(),
        config.manifest_path.display()
    );
    println!("  Collection: {}", style(manifest.collection()).cyan());
    println!("  Mode: {:?}", manifest.mode());
    for entity in manifest.entities() {
        println!(
            "  {} {} ({} properties, id {})",
            style(&entity.name).bold(),
            entity.root,
            entity.properties.len(),
            entity.id_attribute
        );
    }

    Ok(())
}

fn list_command(config: &MapperConfig, entity: &str) -> Result<()> {
    let service = open_service(config)?;
    let records = service.get_entities(entity)?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

fn show_command(config: &MapperConfig, entity: &str, id: &str, format: &str) -> Result<()> {
    let format: OutputFormat = format.parse()?;
    let service = open_service(config)?;

    match service.render_entity(entity, id, format)? {
        Some(output) => {
            println!("{output}");
            Ok(())
        }
        None => Err(MapperError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }),
    }
}

fn watch_command(config: &MapperConfig) -> Result<()> {
    let service = Arc::new(open_service(config)?);
    let _watcher = UpdateWatcher::spawn(Arc::clone(&service), config.watch_interval)?;

    println!(
        "{} {} every {:?}",
        style("Watching").bold(),
        style(config.collection_root.display()).cyan(),
        config.watch_interval
    );

    let mut seen = None;
    loop {
        let snapshot = service.snapshot();
        if seen != snapshot.loaded_at() {
            seen = snapshot.loaded_at();
            for name in service.manifest().entity_names() {
                let count = service.get_entities(name)?.len();
                println!("  {}: {} records", style(name).bold(), style(count).green());
            }
        }
        std::thread::sleep(config.watch_interval);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_list() {
        let cli = Cli::parse_from(["briefedition-mapper", "list", "letters"]);

        let Commands::List { entity } = cli.command else {
            panic!("expected list command");
        };
        assert_eq!(entity, "letters");
        assert!(cli.manifest.is_none());
        assert!(cli.root.is_none());
    }

    #[test]
    fn test_cli_parse_show_with_global_options() {
        let cli = Cli::parse_from([
            "briefedition-mapper",
            "show",
            "letters",
            "L0001",
            "--format",
            "xml",
            "--manifest",
            "manifest.yml",
            "-r",
            "/data",
        ]);

        let Commands::Show { entity, id, format } = cli.command else {
            panic!("expected show command");
        };
        assert_eq!(entity, "letters");
        assert_eq!(id, "L0001");
        assert_eq!(format, "xml");
        assert_eq!(cli.manifest, Some(PathBuf::from("manifest.yml")));
        assert_eq!(cli.root, Some(PathBuf::from("/data")));
    }

    #[test]
    fn test_cli_parse_show_default_format() {
        let cli = Cli::parse_from(["briefedition-mapper", "show", "persons", "P1"]);
        let Commands::Show { format, .. } = cli.command else {
            panic!("expected show command");
        };
        assert_eq!(format, "record");
    }

    #[test]
    fn test_cli_parse_watch() {
        let cli = Cli::parse_from(["briefedition-mapper", "watch", "--interval", "5"]);
        assert!(matches!(cli.command, Commands::Watch { interval: Some(5) }));
    }
}
