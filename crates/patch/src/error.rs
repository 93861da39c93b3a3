use thiserror::Error;

/// Everything that can go wrong while parsing or applying a patch.
#[derive(Debug, Error)]
pub enum PatchError {
    #[error("Patch text must start with *** Begin Patch")]
    InvalidStart,

    #[error("Invalid patch text - missing sentinels")]
    MissingSentinels,

    #[error("Missing *** End Patch sentinel")]
    MissingEndSentinel,

    #[error("Unknown line: {0}")]
    UnknownLine(String),

    #[error("Unexpected end of input")]
    UnexpectedEnd,

    #[error("Duplicate action for: {path}")]
    Duplicate { path: String },

    #[error("Missing file: {path}")]
    MissingFile { path: String },

    #[error("File already exists: {path}")]
    FileExists { path: String },

    #[error("Invalid add line: {0}")]
    InvalidAddLine(String),

    #[error("Invalid diff line: {0}")]
    InvalidDiffLine(String),

    #[error("Context not found in {path}:\n{context}\nAfter line {after_line} in file")]
    ContextNotFound {
        path: String,
        context: String,
        after_line: usize,
    },

    #[error("{path}: Overlapping chunks at {cursor} > {index}")]
    OverlappingChunks {
        path: String,
        cursor: usize,
        index: usize,
    },

    #[error("{path}: Chunk position {index} out of bounds")]
    OutOfBounds { path: String, index: usize },

    #[error("Missing content for {path}")]
    MissingContent { path: String },

    #[error("Failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Coarse classification of a [`PatchError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchErrorKind {
    /// The patch text is malformed or does not fit the files it targets.
    /// Nothing has been written.
    Format,
    /// A computed change could not be written. Earlier files may already
    /// be on disk.
    Apply,
}

impl PatchError {
    pub fn kind(&self) -> PatchErrorKind {
        match self {
            Self::MissingContent { .. } | Self::Io { .. } => PatchErrorKind::Apply,
            _ => PatchErrorKind::Format,
        }
    }

    /// Classify a failure to load an original: a missing file is a format
    /// error like any other unknown path.
    pub fn read(path: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::MissingFile {
                path: path.to_string(),
            }
        } else {
            Self::Read {
                path: path.to_string(),
                source,
            }
        }
    }

    pub(crate) fn io(path: &str, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }
}
