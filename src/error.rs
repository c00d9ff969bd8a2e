use nom::error::{ErrorKind, ParseError};
use thiserror::Error;

/// Low-level error raised while framing records or blocks.
///
/// These errors describe a single reader attempt. Most of them are consumed
/// by the fallback chain in [`CaptureParser`](crate::CaptureParser) and never
/// reach the caller directly.
#[derive(Debug, Error, PartialEq)]
pub enum FramingError {
    /// Error while reading from the underlying source
    #[error("error while reading from input")]
    ReadError,
    /// More data is needed to parse a complete item
    #[error("incomplete data (missing {0} bytes)")]
    Incomplete(usize),
    /// The input ended in the middle of a record or block
    #[error("input ended in the middle of a record")]
    UnexpectedEof,
    /// The reader buffer cannot hold a complete record
    #[error("buffer capacity too small for record")]
    BufferTooSmall,
    /// The file header magic is not in the known table
    #[error("file header not recognized")]
    HeaderNotRecognized,
    /// Generic parsing error
    #[error("parsing failed ({0:?})")]
    NomError(ErrorKind),
}

impl<I> ParseError<I> for FramingError {
    fn from_error_kind(_input: I, kind: ErrorKind) -> Self {
        FramingError::NomError(kind)
    }
    fn append(_input: I, kind: ErrorKind, _other: Self) -> Self {
        FramingError::NomError(kind)
    }
}

impl From<nom::Err<FramingError>> for FramingError {
    fn from(e: nom::Err<FramingError>) -> Self {
        match e {
            nom::Err::Error(e) | nom::Err::Failure(e) => e,
            nom::Err::Incomplete(nom::Needed::Size(n)) => FramingError::Incomplete(n.into()),
            nom::Err::Incomplete(nom::Needed::Unknown) => FramingError::Incomplete(0),
        }
    }
}

/// Error returned by a whole parse session, after all fallbacks ran.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// No magic number matched and no fallback reader applied
    #[error("capture format not recognized")]
    UnknownFormat,
    /// Every applicable reader ran and produced zero frames
    #[error("no recognizable frames in input")]
    NoRecognizableFrames,
    /// A structural error that no fallback could work around
    #[error("unrecoverable structural error: {0}")]
    Structure(#[from] FramingError),
    /// I/O error on the underlying source, surfaced unchanged
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
