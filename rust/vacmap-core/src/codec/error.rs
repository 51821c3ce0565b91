use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("map image header line {0} missing")]
    MissingHeader(usize),
    #[error("invalid map package: {0}")]
    InvalidPackage(String),
}

impl CodecError {
    /// Format errors are malformed input; everything else is I/O.
    pub fn is_format(&self) -> bool { !matches!(self, CodecError::Io(_)) }
}
