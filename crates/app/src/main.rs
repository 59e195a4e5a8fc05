mod output;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;
use vertexbake_core::{block_tiles, BakeProject, BakeSettings, BakedScene, GridBuilder};

use crate::output::BakeOutput;

const PROGRESS_INTERVAL: Duration = Duration::from_millis(250);

/// Bakes vertex lighting for a tile level.
#[derive(Debug, Parser)]
#[command(name = "vertexbake", version)]
struct Args {
    /// Project JSON. The built-in sample level is used when omitted.
    #[arg(long)]
    project: Option<PathBuf>,
    /// Where to write the baked batches as JSON.
    #[arg(long)]
    out: Option<PathBuf>,
    /// Bounce samples per vertex, overriding the project.
    #[arg(long)]
    samples: Option<u32>,
    /// Direct light with hard shadows only.
    #[arg(long)]
    fast: bool,
    /// Write the effective project JSON to this path.
    #[arg(long)]
    save_project: Option<PathBuf>,
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
    /// Print the baked batches to stdout.
    #[arg(long)]
    print: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(args.log_level))
        .init();

    tracing::info!("vertexbake starting");
    run(&args)
}

fn run(args: &Args) -> anyhow::Result<()> {
    let mut project = match &args.project {
        Some(path) => load_project(path)?,
        None => BakeProject::default(),
    };
    if args.fast {
        project.settings = BakeSettings::preview();
    }
    if let Some(samples) = args.samples {
        project.settings.bounce_samples = samples;
    }
    if let Some(path) = &args.save_project {
        save_project(&project, path)?;
    }

    let map = project.tile_map().context("parse project map")?;
    let grid = GridBuilder::new(
        project.tiles.size,
        block_tiles(project.tiles.size, project.tiles.wall_height),
    );
    let scene = Arc::new(grid.build(&map).context("assemble tile grid")?);
    tracing::info!(
        width = map.width(),
        height = map.height(),
        instances = scene.len(),
        "level assembled"
    );

    let mut baked = BakedScene::new();
    *baked.lights_mut() = project.light_set(&grid, &map);
    baked.set_scene(Arc::clone(&scene))?;

    let state = baked.state();
    let settings = project.settings;
    let baked = &baked;
    let stats = thread::scope(|s| {
        let worker = s.spawn(move || baked.bake(scene, &settings));
        while !worker.is_finished() {
            thread::sleep(PROGRESS_INTERVAL);
            if state.baking() {
                tracing::info!("baking {:.0}%", state.progress() * 100.0);
            }
        }
        worker
            .join()
            .map_err(|_| anyhow::anyhow!("bake thread panicked"))
    })??;

    let mut output = BakeOutput::with_stats(&stats);
    baked.draw(&mut output);

    if let Some(path) = &args.out {
        output.write(path)?;
    }
    if args.print {
        println!("{}", output.to_json()?);
    }

    tracing::info!("vertexbake: completed");
    Ok(())
}

fn load_project(path: &Path) -> anyhow::Result<BakeProject> {
    let data = std::fs::read(path)
        .with_context(|| format!("read project {}", path.display()))?;
    let project = serde_json::from_slice(&data)
        .with_context(|| format!("parse project {}", path.display()))?;
    tracing::info!("loaded project {:?}", path);
    Ok(project)
}

fn save_project(project: &BakeProject, path: &Path) -> anyhow::Result<()> {
    let data = serde_json::to_vec_pretty(project).context("serialize project")?;
    std::fs::write(path, data).with_context(|| format!("write project {}", path.display()))?;
    tracing::info!("saved project to {:?}", path);
    Ok(())
}
