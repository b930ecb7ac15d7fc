/// Convenience result type used across the crate.
pub type LowpolyResult<T> = Result<T, LowpolyError>;

/// Top-level error taxonomy used by pipeline APIs.
#[derive(thiserror::Error, Debug)]
pub enum LowpolyError {
    /// Invalid user-provided configuration or arguments.
    #[error("validation error: {0}")]
    Validation(String),

    /// Input image failed to load, decode, or yields a degenerate pipeline.
    #[error("input error: {0}")]
    Input(String),

    /// Errors while rasterizing or persisting a frame.
    #[error("raster error: {0}")]
    Raster(String),

    /// Errors from the external video encoder invocation.
    #[error("encode error: {0}")]
    Encode(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LowpolyError {
    /// Build a [`LowpolyError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`LowpolyError::Input`] value.
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Build a [`LowpolyError::Raster`] value.
    pub fn raster(msg: impl Into<String>) -> Self {
        Self::Raster(msg.into())
    }

    /// Build a [`LowpolyError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_format_messages() {
        let e = LowpolyError::validation("rate must be >= 1");
        assert_eq!(e.to_string(), "validation error: rate must be >= 1");

        let e = LowpolyError::encode("ffmpeg exited with status 1");
        assert_eq!(e.to_string(), "encode error: ffmpeg exited with status 1");
    }

    #[test]
    fn anyhow_errors_pass_through_transparently() {
        let inner = anyhow::anyhow!("disk full");
        let e = LowpolyError::from(inner);
        assert_eq!(e.to_string(), "disk full");
    }
}
