use std::fmt;

/// Program stage a shader diagnostic belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Vertex,
    Fragment,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Vertex => f.write_str("vertex"),
            PipelineStage::Fragment => f.write_str("fragment"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    /// No hardware-accelerated surface could be obtained. Fatal at startup.
    #[error("display surface unavailable: {0}")]
    SurfaceUnavailable(String),
    /// Shader compilation failed. Fatal at startup.
    #[error("{stage} shader failed to compile: {log}")]
    Compile { stage: PipelineStage, log: String },
    /// Pipeline creation/link failed. Fatal at startup.
    #[error("pipeline link failed: {log}")]
    Link { log: String },
    /// The supplied buffer does not cover the streaming texture exactly.
    /// Per-frame, recoverable; the texture keeps its previous contents.
    #[error("pixel buffer is {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },
}
