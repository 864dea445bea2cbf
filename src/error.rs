use std::{error::Error, fmt, io};

/// The crate's result type.
pub type Result<T> = std::result::Result<T, PipelineErr>;

/// Pipeline runtime failures.
///
/// Every variant is fatal: the run is abandoned on first error and the
/// failure propagates to process exit.
#[derive(Debug)]
pub enum PipelineErr {
    /// The object store could not serve or accept a blob.
    Store { key: String, source: io::Error },
    /// A CSV blob could not be decoded or encoded.
    Csv(csv::Error),
    /// A JSON artifact could not be decoded or encoded.
    Json(serde_json::Error),
    /// A required column is absent from the raw dataset.
    MissingColumn { column: &'static str },
    /// An event time could not be read as a point in time.
    BadTimestamp { value: String },
    /// A stage was left with nothing to work on.
    EmptyDataset { stage: &'static str },
    /// An identifier outside the encoded domain was passed to an encoder.
    UnknownId { kind: &'static str, id: String },
    /// A dense index exceeds the table it addresses.
    IndexOutOfRange {
        kind: &'static str,
        got: u32,
        bound: usize,
    },
    /// A length invariant was violated (e.g. params vs model size).
    ShapeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    /// Parameter initialization was given an invalid distribution.
    Init(String),
    /// A model or encoder artifact could not be written or read back.
    Artifact(String),
}

impl fmt::Display for PipelineErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineErr::Store { key, source } => write!(f, "object store error for {key}: {source}"),
            PipelineErr::Csv(e) => write!(f, "csv error: {e}"),
            PipelineErr::Json(e) => write!(f, "json error: {e}"),
            PipelineErr::MissingColumn { column } => write!(f, "missing column {column}"),
            PipelineErr::BadTimestamp { value } => write!(f, "unreadable event time {value:?}"),
            PipelineErr::EmptyDataset { stage } => write!(f, "no records left after {stage}"),
            PipelineErr::UnknownId { kind, id } => {
                write!(f, "{kind} {id:?} is outside the encoded domain")
            }
            PipelineErr::IndexOutOfRange { kind, got, bound } => {
                write!(f, "{kind} index {got} is outside 0..{bound}")
            }
            PipelineErr::ShapeMismatch { what, got, expected } => {
                write!(f, "shape mismatch for {what}: got {got}, expected {expected}")
            }
            PipelineErr::Init(msg) => write!(f, "initialization error: {msg}"),
            PipelineErr::Artifact(msg) => write!(f, "artifact error: {msg}"),
        }
    }
}

impl Error for PipelineErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineErr::Store { source, .. } => Some(source),
            PipelineErr::Csv(e) => Some(e),
            PipelineErr::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<csv::Error> for PipelineErr {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<serde_json::Error> for PipelineErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
