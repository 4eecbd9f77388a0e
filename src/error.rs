use crate::input::Tool;
use crate::layer::LayerId;

pub type CanvasResult<T> = Result<T, CanvasError>;

#[derive(thiserror::Error, Debug)]
pub enum CanvasError {
    #[error("canvas surface is not ready")]
    NotReady,

    #[error("at least one layer is required")]
    LastLayer,

    #[error("unknown layer {0}")]
    UnknownLayer(LayerId),

    #[error("layer index {0} is out of range")]
    LayerIndex(usize),

    #[error("tool {0:?} is not available in the current edit mode")]
    ToolUnavailable(Tool),

    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("image encode failed: {0}")]
    Encode(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CanvasError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Structural rejections the shell shows as a non-fatal notice.
    pub fn is_user_notice(&self) -> bool {
        matches!(
            self,
            Self::LastLayer | Self::UnknownLayer(_) | Self::LayerIndex(_) | Self::ToolUnavailable(_)
        )
    }
}
