//! Bridge to the external computation module that produces each frame's
//! pixels.
//!
//! The module is a black box behind [`ComputeSource`]: the core tells it the
//! render resolution once, then asks it for one frame at a time and copies
//! the returned bytes straight into the streaming texture. The returned
//! slice borrows the source mutably, so holding a frame across a second
//! `produce_frame` call is a compile error rather than a use-after-reuse
//! hazard.
//!
//! Two backends ship here: [`WasmSource`] hosts a WebAssembly module with
//! its own linear memory, and [`StillSource`] serves a fixed in-process
//! buffer for deployments that stream static content.

use std::path::PathBuf;

mod still;
mod wasm;

pub use still::StillSource;
pub use wasm::WasmSource;

#[derive(Debug, thiserror::Error)]
pub enum ComputeError {
    #[error("render resolution must be non-zero (got {width}x{height})")]
    InvalidResolution { width: u32, height: u32 },
    #[error("failed to load compute module from {}: {reason}", path.display())]
    ModuleLoad {
        path: PathBuf,
        reason: wasmtime::Error,
    },
    #[error("compute module rejected: {0}")]
    ModuleInvalid(wasmtime::Error),
    #[error("compute module does not export '{0}'")]
    MissingExport(&'static str),
    #[error("compute source used before initialize")]
    NotInitialized,
    #[error("compute module returned a null frame pointer")]
    NullFrame,
    #[error("compute module trapped: {0}")]
    Trap(wasmtime::Error),
    #[error("frame at {ptr:#x}+{len} exceeds module memory of {memory} bytes")]
    OutOfBounds { ptr: u32, len: usize, memory: usize },
}

impl ComputeError {
    /// Whether the error poisons the session or just this frame. Per-frame
    /// errors are logged and retried on the next accepted tick.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ComputeError::NullFrame | ComputeError::Trap(_) | ComputeError::OutOfBounds { .. }
        )
    }
}

/// Logical pixel-buffer size, independent of the physical surface size.
/// Fixed for the lifetime of a stream; changing it means re-initialising
/// the source and recreating the streaming texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderResolution {
    width: u32,
    height: u32,
}

impl RenderResolution {
    pub fn new(width: u32, height: u32) -> Result<Self, ComputeError> {
        if width == 0 || height == 0 {
            return Err(ComputeError::InvalidResolution { width, height });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Exact length of one RGBA8 frame at this resolution.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

impl std::fmt::Display for RenderResolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Normalised pointer position in [-1, 1] on both axes: the physical
/// centre maps to (0, 0), the top-left corner to (-1, -1). Written by the
/// input relay, read at the start of each accepted frame.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputState {
    pub x: f32,
    pub y: f32,
}

/// Capability interface to whatever produces pixels.
///
/// `produce_frame` returns a view into storage owned by the backend; the
/// backend may reuse or invalidate it on its next call, which the `&mut
/// self` borrow makes impossible to observe.
pub trait ComputeSource {
    /// One-time (per resolution) setup. The backend allocates its output
    /// buffer to match and may reset any internal simulation clock.
    fn initialize(&mut self, resolution: RenderResolution) -> Result<(), ComputeError>;

    /// Produces the next frame. The slice is exactly
    /// `resolution.byte_len()` bytes of RGBA8, row-major, top-left origin.
    fn produce_frame(&mut self, input: InputState, elapsed_ms: f64)
        -> Result<&[u8], ComputeError>;
}
