//! Renderer crate for pixelstream.
//!
//! Streams frames from a [`compute::ComputeSource`] onto a full-surface
//! textured quad, throttled by the frame pacer. The overall flow is:
//!
//! ```text
//!   CLI / pixelstream
//!          │ RendererConfig + Box<dyn ComputeSource>
//!          ▼
//!   run_windowed ──▶ StreamSession ──▶ winit event loop
//!          │                              │ RedrawRequested (pacer-accepted)
//!          │                              ▼
//!          │                 produce_frame ─▶ StreamingTexture ─▶ draw quad
//!          └─ pointer events ─▶ normalised InputState
//! ```
//!
//! The logical render resolution (the streamed buffer size) is independent
//! of the physical window size; the quad stretches whatever arrives. GPU
//! resources are created once at startup and only the texture contents
//! change per frame.

mod compile;
mod error;
mod gpu;
mod types;
mod window;

pub use compute::{ComputeSource, InputState, RenderResolution};
pub use error::{PipelineStage, RendererError};
pub use types::{FilterMode, RendererConfig};
pub use window::run_windowed;
