/// Reader failure, as surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReadError {
    /// Status byte 0: the producing compiler rejected the script and the
    /// rest of the buffer is its error message.
    #[error("bytecode rejected by compiler: {0}")]
    Rejected(String),

    /// Status byte above 1: a format version this reader does not speak.
    #[error("unsupported bytecode version {0}")]
    Version(u8),

    /// Anything else: truncated input, unknown tags, out-of-range indices.
    #[error("malformed bytecode at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: String },
}

/// Internal nom error: the remaining input (for offset computation) plus a
/// human-readable reason.
#[derive(Debug)]
pub(crate) struct DecodeError<'a> {
    pub input: &'a [u8],
    pub reason: String,
}

impl<'a> nom::error::ParseError<&'a [u8]> for DecodeError<'a> {
    fn from_error_kind(input: &'a [u8], kind: nom::error::ErrorKind) -> Self {
        let reason = if input.is_empty() {
            "unexpected end of input".to_string()
        } else {
            kind.description().to_string()
        };
        Self { input, reason }
    }

    fn append(_input: &'a [u8], _kind: nom::error::ErrorKind, other: Self) -> Self {
        other
    }
}

pub(crate) type ByteResult<'a, T> = nom::IResult<&'a [u8], T, DecodeError<'a>>;

/// Abort parsing with a semantic reason anchored at `input`.
pub(crate) fn fail<'a, T>(input: &'a [u8], reason: impl Into<String>) -> ByteResult<'a, T> {
    Err(fail_err(input, reason))
}

pub(crate) fn fail_err(input: &[u8], reason: impl Into<String>) -> nom::Err<DecodeError<'_>> {
    nom::Err::Failure(DecodeError {
        input,
        reason: reason.into(),
    })
}

/// Convert a nom error into the public error, resolving the byte offset
/// against the full input buffer.
pub(crate) fn into_read_error(bytes: &[u8], err: nom::Err<DecodeError<'_>>) -> ReadError {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => ReadError::Malformed {
            offset: bytes.len() - e.input.len(),
            reason: e.reason,
        },
        nom::Err::Incomplete(_) => ReadError::Malformed {
            offset: bytes.len(),
            reason: "unexpected end of input".to_string(),
        },
    }
}
