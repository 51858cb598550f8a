/// Convenience result type used across the crate.
pub type KineticResult<T> = Result<T, KineticError>;

/// Top-level error taxonomy used by toolkit APIs.
#[derive(thiserror::Error, Debug)]
pub enum KineticError {
    /// Invalid geometry input (unknown element, malformed directive).
    #[error("geometry error: {0}")]
    Geometry(String),

    /// Errors while reading, writing, or probing style state.
    #[error("style error: {0}")]
    Style(String),

    /// Errors while resolving effects or driving playback.
    #[error("animation error: {0}")]
    Animation(String),

    /// Errors raised by the frame scheduler.
    #[error("schedule error: {0}")]
    Schedule(String),

    /// Errors from the host document model (missing element, bad selector).
    #[error("host error: {0}")]
    Host(String),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KineticError {
    /// Build a [`KineticError::Geometry`] value.
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    /// Build a [`KineticError::Style`] value.
    pub fn style(msg: impl Into<String>) -> Self {
        Self::Style(msg.into())
    }

    /// Build a [`KineticError::Animation`] value.
    pub fn animation(msg: impl Into<String>) -> Self {
        Self::Animation(msg.into())
    }

    /// Build a [`KineticError::Schedule`] value.
    pub fn schedule(msg: impl Into<String>) -> Self {
        Self::Schedule(msg.into())
    }

    /// Build a [`KineticError::Host`] value.
    pub fn host(msg: impl Into<String>) -> Self {
        Self::Host(msg.into())
    }

    /// Variant-preserving copy, for forwarding an error out of a shared
    /// settlement result.
    pub fn duplicate(&self) -> Self {
        match self {
            Self::Geometry(s) => Self::Geometry(s.clone()),
            Self::Style(s) => Self::Style(s.clone()),
            Self::Animation(s) => Self::Animation(s.clone()),
            Self::Schedule(s) => Self::Schedule(s.clone()),
            Self::Host(s) => Self::Host(s.clone()),
            Self::Other(e) => Self::Other(anyhow::anyhow!("{e}")),
        }
    }
}
