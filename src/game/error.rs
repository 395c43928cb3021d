use std::path::PathBuf;
use thiserror::Error;

/// What was wrong with a note record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("expected 6 fields, found {0}")]
    FieldCount(usize),

    #[error("user_played must be True or False")]
    UserPlayed,

    #[error("instrument name is empty")]
    Instrument,

    #[error("velocity is not a number")]
    Velocity,

    #[error("pitch is not an integer")]
    Pitch,

    #[error("start is not a finite, non-negative number")]
    Start,

    #[error("end is not a finite number")]
    End,

    #[error("end precedes start")]
    EndBeforeStart,
}

/// A single malformed note record. Fatal to that record only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    /// 1-based, counting the header line.
    pub line: usize,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("no voice loaded for instrument '{instrument}'")]
    MissingVoice { instrument: String },
}

/// Failures that prevent a game from starting at all.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read note dataset: {path}")]
    DatasetRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read replay file: {path}")]
    ReplayRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No note dataset configured")]
    NoDataset,

    #[error("No audio voices available")]
    NoVoices,
}
