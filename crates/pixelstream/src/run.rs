use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use compute::{ComputeSource, StillSource, WasmSource};
use renderer::{FilterMode, RenderResolution, RendererConfig};
use tracing_subscriber::EnvFilter;

use crate::cli::{parse_rgba, Cli};
use crate::manifest::{FilterSetting, SessionManifest};

/// Render resolution of the reference deployment.
const DEFAULT_RENDER_SIZE: (u32, u32) = (1024, 1024);
const DEFAULT_WINDOW_SIZE: (u32, u32) = (768, 768);
const DEFAULT_FPS: f32 = 24.0;

/// Where this session's pixels come from.
enum SourceKind {
    Module(PathBuf),
    Still([u8; 4]),
}

/// Fully resolved session setup after merging CLI over manifest over
/// defaults.
struct SessionSetup {
    source: SourceKind,
    render_size: (u32, u32),
    window_size: (u32, u32),
    fps: f32,
    filter: FilterMode,
    pointer: bool,
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(cli: Cli) -> Result<()> {
    let manifest = match cli.manifest.as_deref() {
        Some(path) => {
            SessionManifest::load(path).context("failed to load session manifest")?
        }
        None => SessionManifest::default(),
    };

    let setup = resolve(&cli, &manifest)?;

    let resolution = RenderResolution::new(setup.render_size.0, setup.render_size.1)
        .context("invalid render resolution")?;
    let source: Box<dyn ComputeSource> = match &setup.source {
        SourceKind::Module(path) => {
            tracing::info!(module = %path.display(), "loading compute module");
            Box::new(WasmSource::load(path).context("failed to load compute module")?)
        }
        SourceKind::Still(rgba) => {
            tracing::info!(?rgba, "streaming a still colour (no compute module)");
            Box::new(StillSource::solid(*rgba))
        }
    };

    let mut config = RendererConfig::new(resolution);
    config.surface_size = setup.window_size;
    config.target_fps = setup.fps;
    config.filter = setup.filter;
    config.pointer_input = setup.pointer;

    renderer::run_windowed(config, source)
}

fn resolve(cli: &Cli, manifest: &SessionManifest) -> Result<SessionSetup> {
    let module = cli
        .module
        .clone()
        .or_else(|| manifest.module.clone());
    let still_color = match (cli.still_color, manifest.still_color.as_deref()) {
        (Some(rgba), _) => Some(rgba),
        (None, Some(hex)) => {
            Some(parse_rgba(hex).map_err(|err| anyhow::anyhow!("manifest still_color: {err}"))?)
        }
        (None, None) => None,
    };

    // A module path beats a manifest still colour; the CLI-level conflict
    // is already rejected by clap.
    let source = match (module, still_color) {
        (Some(path), _) => SourceKind::Module(path),
        (None, Some(rgba)) => SourceKind::Still(rgba),
        (None, None) => bail!("nothing to stream: pass a MODULE path or --still-color"),
    };

    let render_size = cli
        .size
        .or_else(|| manifest.size.map(|extent| (extent.width, extent.height)))
        .unwrap_or(DEFAULT_RENDER_SIZE);
    let window_size = cli
        .window
        .or_else(|| manifest.window.map(|extent| (extent.width, extent.height)))
        .unwrap_or(DEFAULT_WINDOW_SIZE);

    let fps = cli.fps.or(manifest.fps).unwrap_or(DEFAULT_FPS);
    if !fps.is_finite() || fps <= 0.0 {
        bail!("target fps must be positive, got {fps}");
    }

    let filter = cli.filter.unwrap_or_else(|| match manifest.filter {
        Some(FilterSetting::Nearest) => FilterMode::Nearest,
        Some(FilterSetting::Linear) | None => FilterMode::Linear,
    });

    let pointer = if cli.no_pointer {
        false
    } else {
        manifest.pointer.unwrap_or(true)
    };

    Ok(SessionSetup {
        source,
        render_size,
        window_size,
        fps,
        filter,
        pointer,
    })
}
