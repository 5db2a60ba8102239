//! # Overview
//!
//! Batch-annotates a directory tree of images with text regions found by
//! [EAST](https://arxiv.org/abs/1704.03155) and [DB](https://arxiv.org/abs/1911.08947)
//! text detectors in ONNX format, run through onnxruntime (bindings via [ort](https://github.com/pykeio/ort)).
//!
//! Annotated copies land in `ImagesProcessedWithEAST/` and `ImagesProcessedWithDB50/`
//! next to the input root, mirroring its directory structure.

mod coordinator;
mod error;
mod metrics;
pub mod models;
mod output;
mod pipeline;
pub mod render;
mod text_polygon;
mod utils;
mod walker;

pub use error::{Error, ErrorClass, Result};

// re-exports
pub use geo_types;
pub use image;
pub use ort;

pub use coordinator::{DetectorUnit, RunReport, TaskCoordinator};
pub use metrics::Stopwatch;
pub use output::OutputPathMapper;
pub use pipeline::{run, run_with_detectors, RunOptions};
pub use render::AnnotationStyle;
pub use text_polygon::TextPolygon;
pub use walker::{is_supported_image, ImageFile, ImageWalker, SUPPORTED_EXTENSIONS};
