// SPDX-License-Identifier: MIT OR Apache-2.0
//! VPE headless driver
//!
//! Loads a serialized scene (or a bare graph), builds a [`Scene`] over a
//! recording surface, renders one frame and prints a summary. Useful for
//! checking saved files and for exercising the renderer without a host UI.
//!
//! ```text
//! vpe_headless graph.json --zoom 0.5 --output normalized.json
//! ```

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use vpe_graph::{default_registry, Graph, Point};
use vpe_scene::{
    ConfigError, Layer, LayerSet, Lod, MemoryStore, RecordingSurface, Scene, SceneConfig, SceneError, Severity,
};

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "vpe_headless", version, about = "Load, render and re-save node graph scenes")]
struct Args {
    /// Scene or graph JSON to load
    input: Option<PathBuf>,

    /// Scene config in RON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Surface width in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Surface height in pixels
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Zoom factor, applied about the surface center
    #[arg(long)]
    zoom: Option<f64>,

    /// Force the coarse level of detail
    #[arg(long)]
    low_detail: bool,

    /// Composite the debug layer
    #[arg(long)]
    debug: bool,

    /// List registered node types whose name contains this text
    #[arg(long)]
    search: Option<String>,

    /// Print the node type category tree as JSON
    #[arg(long)]
    types: bool,

    /// Write the re-serialized scene to this file
    #[arg(long, short)]
    output: Option<PathBuf>,
}

#[derive(Debug, Error)]
enum HeadlessError {
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn main() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vpe_scene=debug,vpe_graph=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting VPE headless v{}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    if let Err(e) = run(&args) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<(), HeadlessError> {
    let registry = default_registry();
    if let Some(needle) = &args.search {
        for name in registry.read().list_by_name_substring(needle) {
            println!("{name}");
        }
    }
    if args.types {
        let tree = registry.read().category_tree();
        println!("{}", serde_json::to_string_pretty(&tree)?);
    }

    let config = match &args.config {
        Some(path) => SceneConfig::load(path)?,
        None => SceneConfig::default(),
    };
    let surface = RecordingSurface::new(args.width, args.height);
    let mut scene = Scene::new(Graph::new(registry), surface, config, Box::new(MemoryStore::default()))?;

    if let Some(path) = &args.input {
        let json = std::fs::read_to_string(path).map_err(|source| HeadlessError::Read {
            path: path.clone(),
            source,
        })?;
        scene.load_json(&json)?;
        tracing::info!("Loaded {}", path.display());
    }
    if let Some(zoom) = args.zoom {
        let center = Point::new(f64::from(args.width) / 2.0, f64::from(args.height) / 2.0);
        scene.state_mut().view.set_scale(zoom, center);
    }
    if args.low_detail {
        scene.set_force_lod(Some(Lod::Low));
    }
    scene.set_debug(args.debug);

    let redrawn = scene.render_now()?;
    print_summary(&scene, redrawn);

    for diagnostic in scene.take_diagnostics() {
        match diagnostic.severity {
            Severity::Warning => tracing::warn!("{}", diagnostic.message),
            Severity::Error => tracing::error!("{}", diagnostic.message),
        }
    }

    if let Some(path) = &args.output {
        std::fs::write(path, scene.to_json()?).map_err(|source| HeadlessError::Write {
            path: path.clone(),
            source,
        })?;
        tracing::info!("Wrote {}", path.display());
    }
    Ok(())
}

fn print_summary(scene: &Scene<RecordingSurface>, redrawn: LayerSet) {
    let state = scene.state();
    println!("nodes:      {}", state.graph.node_count());
    println!("connectors: {}", state.graph.connector_count());
    println!("scale:      {:.3} ({:?} detail)", state.view.scale(), state.lod());
    println!("redrawn:    {:?}", redrawn.iter().collect::<Vec<_>>());
    for layer in Layer::ALL {
        println!("  {:<12} {} draw call(s)", format!("{layer:?}"), scene.renderer().layer(layer).ops().len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["vpe_headless"]).unwrap();
        assert_eq!((args.width, args.height), (1280, 720));
        assert!(args.input.is_none());
        assert!(!args.debug);
    }

    #[test]
    fn test_args_full() {
        let args = Args::try_parse_from([
            "vpe_headless",
            "scene.json",
            "--zoom",
            "0.5",
            "--low-detail",
            "-o",
            "out.json",
        ])
        .unwrap();
        assert_eq!(args.input, Some(PathBuf::from("scene.json")));
        assert_eq!(args.zoom, Some(0.5));
        assert!(args.low_detail);
        assert_eq!(args.output, Some(PathBuf::from("out.json")));
    }

    #[test]
    fn test_run_empty_scene() {
        let args = Args::try_parse_from(["vpe_headless", "--width", "320", "--height", "200"]).unwrap();
        assert!(run(&args).is_ok());
    }

    #[test]
    fn test_missing_input_is_read_error() {
        let args = Args::try_parse_from(["vpe_headless", "/nonexistent/scene.json"]).unwrap();
        assert!(matches!(run(&args), Err(HeadlessError::Read { .. })));
    }
}
