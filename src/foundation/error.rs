/// Convenience result type used across Deckreel.
pub type DeckreelResult<T> = Result<T, DeckreelError>;

/// Top-level error taxonomy used by curve, timeline and render-job APIs.
#[derive(thiserror::Error, Debug)]
pub enum DeckreelError {
    /// A curve was evaluated without any keyframes.
    #[error("curve has no keyframes")]
    EmptyCurve,

    /// Two adjacent keyframes share the same time, so no progress can be computed between them.
    #[error("degenerate keyframe span at t={at}")]
    DegenerateSpan {
        /// Time shared by both keyframes.
        at: f64,
    },

    /// A keyframe insert/update would collide with an existing keyframe time.
    #[error("track '{track}' already has a keyframe at t={time}")]
    DuplicateTime {
        /// Track that rejected the mutation.
        track: String,
        /// Colliding time.
        time: f64,
    },

    /// Lookup of a track, keyframe or job failed.
    #[error("not found: {0}")]
    NotFound(String),

    /// A locked track rejected a mutation.
    #[error("track '{0}' is locked")]
    TrackLocked(String),

    /// Invalid user-provided or timeline data.
    #[error("validation error: {0}")]
    Validation(String),

    /// One asset or frame failed and was replaced with a fallback.
    #[error("{stage} partial failure: {message}")]
    StagePartialFailure {
        /// Stage that recovered locally.
        stage: String,
        /// Failure description.
        message: String,
    },

    /// A stage failed in a way that aborts the job.
    #[error("{stage} failed: {message}")]
    StageFatalFailure {
        /// Stage that failed.
        stage: String,
        /// Failure description.
        message: String,
    },

    /// The final artifact is missing or below the size sanity threshold.
    #[error("corrupt output '{path}': {bytes} bytes (minimum {min_bytes})")]
    CorruptOutput {
        /// Artifact path.
        path: String,
        /// Observed size.
        bytes: u64,
        /// Required minimum size.
        min_bytes: u64,
    },

    /// The job was cancelled by the caller.
    #[error("cancelled")]
    Cancelled,

    /// The external encoder reported an error.
    #[error("encoder error: {0}")]
    Encoder(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DeckreelError {
    /// Build a [`DeckreelError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`DeckreelError::NotFound`] value.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Build a [`DeckreelError::Encoder`] value.
    pub fn encoder(msg: impl Into<String>) -> Self {
        Self::Encoder(msg.into())
    }

    /// Build a [`DeckreelError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Build a [`DeckreelError::StageFatalFailure`] value.
    pub fn stage_fatal(stage: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::StageFatalFailure {
            stage: stage.into(),
            message: msg.into(),
        }
    }

    /// Build a [`DeckreelError::StagePartialFailure`] value.
    pub fn stage_partial(stage: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::StagePartialFailure {
            stage: stage.into(),
            message: msg.into(),
        }
    }

    /// Return `true` for user-requested cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<serde_json::Error> for DeckreelError {
    fn from(e: serde_json::Error) -> Self {
        Self::serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
