use std::path::{Path, PathBuf};

use choreo_core::{
    BeatGrid, ChoreoError, ChoreographyPlan, CurveRegistry, FixtureRig, ParamOverrides,
    RenderConfig, Renderer,
};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

fn main() -> choreo_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            plan,
            fixtures,
            grid,
            tempo,
            beats_per_bar,
            bars,
            config,
            output,
        } => {
            let grid = match grid {
                Some(path) => read_json(&path)?,
                None => BeatGrid::uniform(tempo, beats_per_bar, bars)?,
            };
            run_render(&plan, &fixtures, &grid, config.as_deref(), output.as_deref())
        }
        Commands::Curves => run_curves(),
        Commands::Sample {
            curve,
            samples,
            amplitude,
            frequency,
            center,
        } => {
            let overrides = ParamOverrides {
                amplitude,
                frequency,
                center,
                ..Default::default()
            };
            run_sample(&curve, samples, &overrides)
        }
    }
}

fn run_render(
    plan: &Path,
    fixtures: &Path,
    grid: &BeatGrid,
    config: Option<&Path>,
    output: Option<&Path>,
) -> choreo_core::Result<()> {
    tracing::info!(?plan, ?fixtures, ?config, ?output, "rendering choreography");

    let plan = ChoreographyPlan::from_json_str(&std::fs::read_to_string(plan)?)?;
    let rig = FixtureRig::from_json_str(&std::fs::read_to_string(fixtures)?)?;
    let config = match config {
        Some(path) => RenderConfig::from_json_str(&std::fs::read_to_string(path)?)?,
        None => RenderConfig::default(),
    };

    let registry = CurveRegistry::standard();
    let rendered = Renderer::new(&registry, &config)?.render(&plan, grid, &rig)?;
    for warning in &rendered.diagnostics.warnings {
        tracing::warn!(?warning, "render warning");
    }

    let json = serde_json::to_string_pretty(&rendered)?;
    match output {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn run_curves() -> choreo_core::Result<()> {
    let registry = CurveRegistry::standard();
    for definition in registry.definitions() {
        println!(
            "{:<20} {:<12} {}",
            definition.id,
            format!("{:?}", definition.family()).to_lowercase(),
            definition.level()
        );
    }
    Ok(())
}

fn run_sample(curve: &str, samples: usize, overrides: &ParamOverrides) -> choreo_core::Result<()> {
    let sampled = CurveRegistry::standard().resolve(curve, Some(samples), overrides)?;
    for point in sampled.points() {
        println!("{:.4}\t{:.4}", point.t(), point.v());
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> choreo_core::Result<T> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(ChoreoError::from)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Beat-quantized fixture movement renderer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a choreography plan into per-fixture DMX curves.
    Render {
        /// Choreography plan (JSON).
        plan: PathBuf,
        /// Fixture rig with envelopes and groups (JSON).
        fixtures: PathBuf,
        /// Beat grid (JSON). A uniform grid is built from the tempo when absent.
        #[arg(short, long)]
        grid: Option<PathBuf>,
        #[arg(long, default_value_t = 120.0)]
        tempo: f64,
        #[arg(long, default_value_t = 4)]
        beats_per_bar: u32,
        #[arg(long, default_value_t = 64)]
        bars: u32,
        /// Render configuration (JSON).
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Where to write the rendered output. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List the standard curve library.
    Curves,
    /// Print a curve's samples as `t<TAB>v` lines.
    Sample {
        curve: String,
        #[arg(short = 'n', long, default_value_t = 32)]
        samples: usize,
        #[arg(long)]
        amplitude: Option<f64>,
        #[arg(long)]
        frequency: Option<f64>,
        #[arg(long)]
        center: Option<f64>,
    },
}
