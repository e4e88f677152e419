use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("input is not decodable audio: {0}")]
    InputFormat(String),

    #[error("failed to read weight artifact {path}: {source}")]
    WeightsIo {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("weight artifact is malformed: {0}")]
    WeightsFormat(String),

    #[error("unsupported weight artifact version {got} (supported: {supported})")]
    UnsupportedWeightsVersion { got: u16, supported: u16 },

    #[error("message width of {got} bits exceeds the supported width of {max}")]
    InvalidMessageBits { got: u32, max: u32 },

    #[error("capability returned {got} samples for a {expected}-sample segment")]
    SegmentLength { expected: usize, got: usize },

    #[error("FFT error: {0}")]
    Fft(String),
}

pub type Result<T> = std::result::Result<T, Error>;
