use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MseedError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid record header at offset {0}")]
    InvalidHeader(u64),

    #[error("Cannot determine record length: {0}")]
    UnknownRecordLength(String),

    #[error("File is empty")]
    EmptyFile,

    #[error("Invalid start time: {0}")]
    InvalidTime(String),

    #[error("Invalid tolerance: {0}")]
    InvalidTolerance(String),

    #[error("Invalid writer parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, MseedError>;
