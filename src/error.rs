use std::path::PathBuf;

use thiserror::Error;

use crate::models::DetectorKind;

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid input root {}: {reason}", path.display())]
    InvalidRoot { path: PathBuf, reason: String },
    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to load {kind} model from {}: {source}", path.display())]
    ModelLoad {
        kind: DetectorKind,
        path: PathBuf,
        #[source]
        source: ort::Error,
    },
    #[error("{kind} model unavailable: {reason}")]
    ModelUnavailable { kind: DetectorKind, reason: String },
    #[error("ort (onnxruntime) error: {0}")]
    Ort(#[from] ort::Error),
    #[error("unexpected tensor shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("{kind} inference: {reason}")]
    Inference { kind: DetectorKind, reason: String },
    #[error("{kind} task panicked: {reason}")]
    TaskPanicked { kind: DetectorKind, reason: String },
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("unsupported output format: {}", .0.display())]
    UnsupportedFormat(PathBuf),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse failure classes. Only `Config` and `Path` abort a run, and only at startup;
/// inside a task every error is logged and the run goes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Config,
    Path,
    ImageDecode,
    Detection,
    Write,
}

impl ErrorClass {
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorClass::Config | ErrorClass::Path)
    }
}

impl Error {
    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Config(_) => ErrorClass::Config,
            Error::InvalidRoot { .. } | Error::CreateDir { .. } => ErrorClass::Path,
            Error::Decode { .. } => ErrorClass::ImageDecode,
            Error::ModelLoad { .. }
            | Error::ModelUnavailable { .. }
            | Error::Ort(_)
            | Error::Shape(_)
            | Error::Inference { .. }
            | Error::TaskPanicked { .. } => ErrorClass::Detection,
            Error::Write { .. } | Error::UnsupportedFormat(_) => ErrorClass::Write,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_startup_failures_are_fatal() {
        let root = Error::InvalidRoot {
            path: PathBuf::from("/nope"),
            reason: "not found".into(),
        };
        assert_eq!(root.class(), ErrorClass::Path);
        assert!(root.class().is_fatal());
        assert!(Error::Config("missing --inputImage".into()).class().is_fatal());

        let unavailable = Error::ModelUnavailable {
            kind: DetectorKind::East,
            reason: "bad artifact".into(),
        };
        assert_eq!(unavailable.class(), ErrorClass::Detection);
        assert!(!unavailable.class().is_fatal());

        let unsupported = Error::UnsupportedFormat(PathBuf::from("out/a.xyz"));
        assert_eq!(unsupported.class(), ErrorClass::Write);
        assert!(!unsupported.class().is_fatal());
    }

    #[test]
    fn messages_carry_the_path() {
        let err = Error::UnsupportedFormat(PathBuf::from("out/a.xyz"));
        assert_eq!(err.to_string(), "unsupported output format: out/a.xyz");
    }
}
