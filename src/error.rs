//! Error types for the zone trigger library.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// ゾーン定義のインポート失敗（レジストリは変更されない）
    #[error("Data format error: {0}")]
    DataFormat(String),

    #[error("Zone {0} not found")]
    ZoneNotFound(u32),

    /// 割り当て可能なゾーン ID が残っていない
    #[error("Zone ids exhausted")]
    IdsExhausted,

    /// フレームバッファ長が width * height * 4 と一致しない
    #[error("Frame size mismatch: {width}x{height} needs {expected} bytes, got {actual}")]
    FrameSizeMismatch {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },

    /// 送信先が開いていない
    #[error("Sink unavailable: {0}")]
    SinkUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OSC encode error: {0}")]
    Osc(#[from] rosc::OscError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::DataFormat(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
