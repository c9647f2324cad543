/// Convenience result type used across filmlab.
pub type FilmResult<T> = Result<T, FilmError>;

/// Pipeline stage tags carried by [`FilmError::StageFailure`] and used in dirty keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RenderStage {
    /// Source decode and orientation.
    Source,
    /// Crop/rotate/scale/perspective/lens warp.
    Geometry,
    /// Texture (or CPU surface) upload.
    Upload,
    /// Exposure, white balance, tone masks, saturation, color grading.
    Master,
    /// Per-hue-band hue/saturation/luminance.
    Hsl,
    /// Point and parametric tone curves.
    Curve,
    /// Texture, clarity, dehaze, sharpening, noise reduction.
    Detail,
    /// LUT, tone response, color cast, grain, defects.
    Film,
    /// Halation, bloom, vignette.
    Optics,
    /// Local adjustment mask + blend.
    Local,
    /// Final write into the caller canvas.
    Output,
}

impl RenderStage {
    /// Short lowercase tag used in keys and log lines.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Source => "src",
            Self::Geometry => "geo",
            Self::Upload => "up",
            Self::Master => "master",
            Self::Hsl => "hsl",
            Self::Curve => "curve",
            Self::Detail => "detail",
            Self::Film => "film",
            Self::Optics => "optics",
            Self::Local => "local",
            Self::Output => "out",
        }
    }
}

impl std::fmt::Display for RenderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Top-level error taxonomy used by render and export APIs.
#[derive(thiserror::Error, Debug)]
pub enum FilmError {
    /// Cooperative cancellation. Never retried and never routed through fallbacks.
    #[error("render aborted")]
    Abort,

    /// No usable GPU context (adapter, device or a required capability is missing).
    #[error("render context unavailable: {0}")]
    ContextUnavailable(String),

    /// Requested surface exceeds the backend's maximum texture dimension.
    #[error("texture size exceeded: {width}x{height} > {max}")]
    TextureSizeExceeded {
        /// Requested width in pixels.
        width: u32,
        /// Requested height in pixels.
        height: u32,
        /// Backend limit on either dimension.
        max: u32,
    },

    /// A specific pipeline pass failed.
    #[error("stage '{stage}' failed: {source}")]
    StageFailure {
        /// Failing stage.
        stage: RenderStage,
        /// Underlying cause.
        #[source]
        source: Box<FilmError>,
    },

    /// Invalid caller-provided data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Source image could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Output blob could not be encoded.
    #[error("encode error: {0}")]
    Encode(String),

    /// Storage collaborator failure; surfaced, never produced by the render core.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FilmError {
    /// Build a [`FilmError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`FilmError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`FilmError::Encode`] value.
    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    /// Build a [`FilmError::ContextUnavailable`] value.
    pub fn context_unavailable(msg: impl Into<String>) -> Self {
        Self::ContextUnavailable(msg.into())
    }

    /// Wrap `err` as a failure of `stage`. Aborts pass through untouched.
    pub fn stage(stage: RenderStage, err: FilmError) -> Self {
        match err {
            Self::Abort => Self::Abort,
            other => Self::StageFailure {
                stage,
                source: Box::new(other),
            },
        }
    }

    /// Whether this error is a cooperative cancellation.
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Abort)
    }

    /// Whether this error (or its innermost cause) is a missing render context.
    pub fn is_context_unavailable(&self) -> bool {
        match self {
            Self::ContextUnavailable(_) => true,
            Self::StageFailure { source, .. } => source.is_context_unavailable(),
            _ => false,
        }
    }

    /// Stage of the outermost [`FilmError::StageFailure`], if any.
    pub fn failed_stage(&self) -> Option<RenderStage> {
        match self {
            Self::StageFailure { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
