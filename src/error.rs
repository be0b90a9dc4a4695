use std::path::PathBuf;

pub type ZipreelResult<T> = Result<T, ZipreelError>;

#[derive(thiserror::Error, Debug)]
pub enum ZipreelError {
    #[error("archive not found: {0}")]
    NotFound(PathBuf),

    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("entry not found in archive: '{0}'")]
    EntryNotFound(String),

    #[error("unsupported image '{path}': {reason}")]
    UnsupportedImage { path: PathBuf, reason: String },

    #[error("timeline has no frames")]
    EmptyTimeline,

    #[error("no suitable content found for video generation")]
    NoSuitableContent,

    #[error("audio attach error: {0}")]
    AudioAttach(String),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ZipreelError {
    pub fn corrupt(msg: impl Into<String>) -> Self {
        Self::CorruptArchive(msg.into())
    }

    pub fn audio(msg: impl Into<String>) -> Self {
        Self::AudioAttach(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            ZipreelError::corrupt("x")
                .to_string()
                .contains("corrupt archive:")
        );
        assert!(
            ZipreelError::audio("x")
                .to_string()
                .contains("audio attach error:")
        );
        assert!(ZipreelError::encode("x").to_string().contains("encode error:"));
        assert!(
            ZipreelError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(
            ZipreelError::EntryNotFound("a.txt".to_string())
                .to_string()
                .contains("a.txt")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = ZipreelError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
