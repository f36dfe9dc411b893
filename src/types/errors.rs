use std::fmt;

/// Possible errors returned by the codec, the forwarding tables, the FIB
/// and the ingestion pipeline. All of them are recoverable for the store
/// itself: a failed insert leaves no structure half-updated.
/// [FibError::InputUnavailable] is the only variant that should end a
/// batch build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FibError {
    /// An address required by the operation was absent, e.g. an empty
    /// column in an input row.
    NilAddress,
    /// The requested prefix length exceeds the bit width of the native
    /// family of the address (32 for IPv4, 128 for IPv6).
    InvalidPrefixLength { len: u8, max: u8 },
    /// A bit-string key is malformed: longer than 128 bits, or it
    /// contains something other than '0' and '1'. Carries the offending
    /// length.
    InvalidKey(usize),
    /// One input row could not be turned into an observation. The
    /// ingestion pipeline logs and skips these.
    MalformedRecord(String),
    /// A structural invariant of the store was found violated. This is a
    /// programming error, not a data error.
    InternalInconsistency(&'static str),
    /// The input source could not be read at all.
    InputUnavailable(String),
}

impl std::error::Error for FibError {}

impl fmt::Display for FibError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FibError::NilAddress => {
                write!(f, "Error: A required address is missing.")
            }
            FibError::InvalidPrefixLength { len, max } => write!(
                f,
                "Error: The specified prefix length {} is invalid, the \
                maximum for this address family is {}.",
                len, max
            ),
            FibError::InvalidKey(len) => write!(
                f,
                "Error: Malformed key of {} bits, a key holds at most 128 \
                binary digits.",
                len
            ),
            FibError::MalformedRecord(reason) => {
                write!(f, "Error: Malformed record: {}.", reason)
            }
            FibError::InternalInconsistency(what) => write!(
                f,
                "FATAL: Internal inconsistency in the forwarding store: {}.",
                what
            ),
            FibError::InputUnavailable(reason) => {
                write!(f, "FATAL: Cannot read the input: {}.", reason)
            }
        }
    }
}

impl From<csv::Error> for FibError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            FibError::InputUnavailable(err.to_string())
        } else {
            FibError::MalformedRecord(err.to_string())
        }
    }
}

impl From<std::io::Error> for FibError {
    fn from(err: std::io::Error) -> Self {
        FibError::InputUnavailable(err.to_string())
    }
}
