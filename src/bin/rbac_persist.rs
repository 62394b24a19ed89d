//! # RBAC persistence tool
//!
//! Loads role and inheritance records, builds the role graph, reports a few
//! grant checks, registers the `nobody` role and writes the graph back out.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RBAC_ROLES_FILE` - role -> permission ids (default: roles.yaml)
//! - `RBAC_INHERITANCE_FILE` - role -> parent ids (default: inher.yaml)
//! - `RBAC_OUTPUT_ROLES_FILE` - exported roles (default: new-roles.yaml)
//! - `RBAC_OUTPUT_INHERITANCE_FILE` - exported inheritance (default: new-inher.yaml)
//! - `RUST_LOG` - Log level (default: info)
//!
//! Paths ending in `.json` are read and written as JSON, anything else as
//! YAML.

use anyhow::{Context, Result};
use rbac::records::{self, InheritanceRecords, RoleRecords};
use rbac::{GraphRecords, Permission, PermissionRegistry, Role, RoleGraph};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// File locations, read from the environment
#[derive(Debug, Clone)]
struct Config {
    roles_file: PathBuf,
    inheritance_file: PathBuf,
    output_roles_file: PathBuf,
    output_inheritance_file: PathBuf,
}

impl Config {
    fn from_env() -> Self {
        Self {
            roles_file: env_path("RBAC_ROLES_FILE", "roles.yaml"),
            inheritance_file: env_path("RBAC_INHERITANCE_FILE", "inher.yaml"),
            output_roles_file: env_path("RBAC_OUTPUT_ROLES_FILE", "new-roles.yaml"),
            output_inheritance_file: env_path("RBAC_OUTPUT_INHERITANCE_FILE", "new-inher.yaml"),
        }
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var_os(key)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Yaml,
    Json,
}

impl Format {
    fn for_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Format::Json,
            _ => Format::Yaml,
        }
    }
}

fn load_records<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let records = match Format::for_path(path) {
        Format::Json => serde_json::from_reader(reader)
            .with_context(|| format!("failed to decode {}", path.display()))?,
        Format::Yaml => serde_yaml::from_reader(reader)
            .with_context(|| format!("failed to decode {}", path.display()))?,
    };

    Ok(records)
}

fn save_records<T: Serialize>(path: &Path, records: &T) -> Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    match Format::for_path(path) {
        Format::Json => serde_json::to_writer_pretty(&mut writer, records)
            .with_context(|| format!("failed to encode {}", path.display()))?,
        Format::Yaml => serde_yaml::to_writer(&mut writer, records)
            .with_context(|| format!("failed to encode {}", path.display()))?,
    }

    writer
        .flush()
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn report_checks(graph: &RoleGraph, registry: &PermissionRegistry) {
    let add_text = registry
        .get("add-text")
        .unwrap_or_else(|| Permission::exact("add-text"));
    let read_text = registry
        .get("read-text")
        .unwrap_or_else(|| Permission::exact("read-text"));

    if graph.is_granted("editor", &add_text, None) {
        info!("Editor can add text");
    }
    if graph.is_granted("chief-editor", &add_text, None) {
        info!("Chief editor can add text");
    }
    if !graph.is_granted("photographer", &add_text, None) {
        info!("Photographer can't add text");
    }
    if !graph.is_granted("nobody", &read_text, None) {
        info!("Nobody can't read text");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting rbac-persist v{}", rbac::VERSION);

    let config = Config::from_env();
    info!("Configuration:");
    info!("  Roles: {}", config.roles_file.display());
    info!("  Inheritance: {}", config.inheritance_file.display());

    let roles: RoleRecords = load_records(&config.roles_file)?;
    let inheritance: InheritanceRecords = load_records(&config.inheritance_file)?;

    let registry = PermissionRegistry::new();
    let graph = records::build(&GraphRecords::new(roles, inheritance), &registry)
        .context("failed to build role graph")?;
    info!(
        roles = graph.len(),
        permissions = registry.len(),
        "Role graph built"
    );

    report_checks(&graph, &registry);

    let read_text = registry.ensure_default("read-text");
    match graph.add(Role::new("nobody").with_permissions([read_text.clone()])) {
        Ok(()) => info!("Registered role nobody"),
        Err(err) => warn!("Keeping existing definition: {}", err),
    }

    if graph.is_granted("nobody", &read_text, None) {
        info!("Nobody can read text");
    }

    let output = records::dump(&graph);
    save_records(&config.output_roles_file, &output.roles)?;
    save_records(&config.output_inheritance_file, &output.inheritance)?;

    info!(
        roles = %config.output_roles_file.display(),
        inheritance = %config.output_inheritance_file.display(),
        "Role graph persisted"
    );
    Ok(())
}
