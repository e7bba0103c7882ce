/// Result alias that carries the custom [`AvatarError`] type.
pub type Result<T> = std::result::Result<T, AvatarError>;

/// Common error type for the core crate.
///
/// None of these ever escape a frame tick. They surface from the edges of the
/// core: configuration loading, collaborator payloads and UI labels.
#[derive(Debug, thiserror::Error)]
pub enum AvatarError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    Json(#[from] serde_json::Error),
    /// The chat collaborator returned text without a usable JSON object.
    #[error("malformed chat reply: {0}")]
    MalformedReply(String),
    #[error("unknown emotion `{0}`")]
    UnknownEmotion(String),
    #[error("unknown action `{0}`")]
    UnknownAction(String),
    #[error("a rig is already attached to this controller")]
    RigAlreadyAttached,
}

impl From<toml::de::Error> for AvatarError {
    fn from(value: toml::de::Error) -> Self {
        Self::Config(value.to_string())
    }
}
