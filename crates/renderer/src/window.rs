use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use compute::{ComputeError, ComputeSource, InputState};
use pacer::{FrameDecision, FramePacer};
use tracing::{error, info, warn};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::error::RendererError;
use crate::gpu::GpuState;
use crate::types::RendererConfig;

/// Translates raw window-local pointer positions into the normalised
/// coordinate space the compute source reads. Last write wins; the value a
/// frame sees is whatever arrived most recently before it started.
#[derive(Debug, Default)]
struct PointerTracker {
    input: InputState,
}

impl PointerTracker {
    fn handle_cursor_moved(&mut self, position: PhysicalPosition<f64>, extent: PhysicalSize<u32>) {
        self.input = normalize_pointer(position, extent);
    }

    fn input(&self) -> InputState {
        self.input
    }
}

/// Maps the physical extent onto [-1, 1] per axis: centre to (0, 0),
/// top-left corner to (-1, -1), bottom-right to (1, 1).
fn normalize_pointer(position: PhysicalPosition<f64>, extent: PhysicalSize<u32>) -> InputState {
    let width = f64::from(extent.width.max(1));
    let height = f64::from(extent.height.max(1));
    InputState {
        x: (2.0 * (position.x / width - 0.5)) as f32,
        y: (2.0 * (position.y / height - 0.5)) as f32,
    }
}

/// Anything that can go wrong inside one accepted frame. All variants are
/// isolated to the frame: the pacer rolls back and the loop re-arms.
#[derive(Debug, thiserror::Error)]
enum FrameIssue {
    #[error("frame production failed: {0}")]
    Produce(ComputeError),
    #[error("frame upload failed: {0}")]
    Upload(RendererError),
    #[error("surface error: {0}")]
    Surface(wgpu::SurfaceError),
}

/// Owns everything one streaming session needs: the window, GPU state, the
/// compute source, the pacer, and pointer state. Dropping it releases the
/// GPU handles first, then the module instance.
struct StreamSession {
    window: Arc<Window>,
    gpu: GpuState,
    source: Box<dyn ComputeSource>,
    pacer: FramePacer,
    pointer: PointerTracker,
    pointer_enabled: bool,
    epoch: Instant,
}

impl StreamSession {
    fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    /// Runs one full accepted frame: pull pixels from the source, rewrite
    /// the streaming texture, draw. The borrowed frame is consumed by the
    /// upload before anything else can call back into the source.
    fn advance(&mut self, now_ms: f64) -> Result<(), FrameIssue> {
        let input = if self.pointer_enabled {
            self.pointer.input()
        } else {
            InputState::default()
        };

        let buffer = self
            .source
            .produce_frame(input, now_ms)
            .map_err(FrameIssue::Produce)?;
        self.gpu.upload(buffer).map_err(FrameIssue::Upload)?;
        self.gpu.render().map_err(FrameIssue::Surface)
    }
}

/// Opens a window and runs the streaming loop until the window closes or
/// the surface is irrecoverably lost.
///
/// Startup failures (surface, shaders, source initialisation) abort before
/// the loop starts. Once running, per-frame failures are logged, the
/// pacer's clock is rolled back, and the next refresh callback retries.
pub fn run_windowed(config: RendererConfig, mut source: Box<dyn ComputeSource>) -> Result<()> {
    let event_loop =
        EventLoop::new().map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(config.title.clone())
        .with_inner_size(window_size)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let gpu = GpuState::new(
        window.as_ref(),
        window.inner_size(),
        config.render_resolution,
        config.filter,
    )?;
    source
        .initialize(config.render_resolution)
        .context("failed to initialise compute source")?;

    let pacer = FramePacer::new(config.target_fps)?;
    let mut session = StreamSession {
        window,
        gpu,
        source,
        pacer,
        pointer: PointerTracker::default(),
        pointer_enabled: config.pointer_input,
        epoch: Instant::now(),
    };

    let start_ms = session.now_ms();
    session.pacer.start(start_ms);
    info!(fps = config.target_fps, "stream loop running");
    session.window.request_redraw();

    event_loop
        .run(move |event, elwt| match event {
            Event::WindowEvent { window_id, event } if window_id == session.window.id() => {
                match event {
                    WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                        session.pacer.stop();
                        elwt.exit();
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        if session.pointer_enabled {
                            session.pointer.handle_cursor_moved(position, session.gpu.size());
                        }
                    }
                    WindowEvent::Resized(new_size) => {
                        session.gpu.resize(new_size);
                    }
                    WindowEvent::RedrawRequested => {
                        let now_ms = session.now_ms();
                        if session.pacer.on_refresh(now_ms) == FrameDecision::Render {
                            match session.advance(now_ms) {
                                Ok(()) => session.pacer.frame_presented(),
                                Err(FrameIssue::Surface(err)) => {
                                    session.pacer.frame_failed();
                                    match err {
                                        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                                            let size = session.gpu.size();
                                            session.gpu.resize(size);
                                        }
                                        wgpu::SurfaceError::OutOfMemory => {
                                            error!("surface out of memory; stopping stream");
                                            session.pacer.stop();
                                            elwt.exit();
                                        }
                                        other => {
                                            warn!(error = %other, "surface error; retrying next frame");
                                        }
                                    }
                                }
                                Err(FrameIssue::Produce(err)) => {
                                    session.pacer.frame_failed();
                                    // The loop never halts on a bad frame,
                                    // but non-transient faults deserve a
                                    // louder line than an occasional skip.
                                    if err.is_transient() {
                                        warn!(error = %err, "frame skipped");
                                    } else {
                                        error!(error = %err, "frame skipped");
                                    }
                                }
                                Err(FrameIssue::Upload(err)) => {
                                    session.pacer.frame_failed();
                                    warn!(error = %err, "frame skipped");
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
            Event::AboutToWait => {
                let now_ms = session.now_ms();
                match session.pacer.next_deadline_ms() {
                    Some(deadline) if now_ms >= deadline => {
                        session.window.request_redraw();
                        elwt.set_control_flow(ControlFlow::Wait);
                    }
                    Some(deadline) => {
                        let wait = Duration::from_secs_f64((deadline - now_ms) / 1000.0);
                        elwt.set_control_flow(ControlFlow::WaitUntil(Instant::now() + wait));
                    }
                    None => elwt.set_control_flow(ControlFlow::Wait),
                }
            }
            _ => {}
        })
        .map_err(|err| anyhow!("event loop error: {err}"))
}
