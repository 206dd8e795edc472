//! GPU plumbing for the streaming quad.
//!
//! - `context` owns wgpu instance/device/surface wiring and reconfigures
//!   the swapchain when the window resizes.
//! - `pipeline` compiles the two-stage quad program and uploads the static
//!   position/texcoord buffers exactly once.
//! - `texture` is the streaming image: allocated at the logical render
//!   resolution, rewritten in place every accepted frame.
//! - `state` glues the pieces together and exposes the `GpuState` API used
//!   by the event loop in `window`.

mod context;
mod pipeline;
mod state;
mod texture;

pub(crate) use state::GpuState;
