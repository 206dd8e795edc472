use compute::RenderResolution;

/// Sampling filter for the streamed image. Which one looks right depends on
/// the content and on whether the render resolution is above or below the
/// surface size, so the choice is left to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Linear,
    Nearest,
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterMode::Linear => f.write_str("linear"),
            FilterMode::Nearest => f.write_str("nearest"),
        }
    }
}

/// Immutable configuration passed to the renderer at start-up.
///
/// The surface size and the render resolution are deliberately independent:
/// the stream may render at a higher resolution than it is displayed at, or
/// the inverse.
#[derive(Clone)]
pub struct RendererConfig {
    /// Window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Logical size of the streamed pixel buffer.
    pub render_resolution: RenderResolution,
    /// Rate the streaming loop is throttled to, independent of the display
    /// refresh rate.
    pub target_fps: f32,
    /// Sampling filter for the full-surface quad.
    pub filter: FilterMode,
    /// Whether pointer events are relayed to the compute source.
    pub pointer_input: bool,
    /// Window title.
    pub title: String,
}

impl RendererConfig {
    /// Defaults matched to the reference deployment: a 768 square window
    /// streaming at 24 fps with linear filtering and pointer input on.
    pub fn new(render_resolution: RenderResolution) -> Self {
        Self {
            surface_size: (768, 768),
            render_resolution,
            target_fps: 24.0,
            filter: FilterMode::default(),
            pointer_input: true,
            title: "pixelstream".to_string(),
        }
    }
}
