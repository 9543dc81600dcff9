use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Candle(#[from] candle_core::Error),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error("failed to install the tracing subscriber: {0}")]
  Tracing(#[from] tracing::subscriber::SetGlobalDefaultError),

  #[error("shape error in `{layer}`: {reason}")]
  Shape { layer: String, reason: String },

  #[error("invalid configuration: {0}")]
  Config(&'static str),
}

impl Error {
  pub(crate) fn shape(layer: &str, reason: impl Into<String>) -> Self {
    Self::Shape {
      layer: layer.to_owned(),
      reason: reason.into(),
    }
  }
}
