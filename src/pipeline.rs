use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::coordinator::{DetectorUnit, RunReport, TaskCoordinator};
use crate::error::{Error, Result};
use crate::metrics::Stopwatch;
use crate::models::{load_detector, DetectorConfig, TextDetector, UnavailableDetector};
use crate::output::OutputPathMapper;
use crate::render::AnnotationStyle;
use crate::walker::ImageWalker;

/// Everything a run needs, decided once at startup.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input_root: PathBuf,
    pub east_model: Option<PathBuf>,
    pub db_model: Option<PathBuf>,
    pub east_config: DetectorConfig,
    pub db_config: DetectorConfig,
    pub style: AnnotationStyle,
}

impl RunOptions {
    pub fn new(input_root: impl Into<PathBuf>) -> Self {
        Self {
            input_root: input_root.into(),
            east_model: None,
            db_model: None,
            east_config: DetectorConfig::east(),
            db_config: DetectorConfig::db(),
            style: AnnotationStyle::default(),
        }
    }

    pub fn with_east_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.east_model = Some(path.into());
        self
    }

    pub fn with_db_model(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_model = Some(path.into());
        self
    }
}

/// Load the configured models and annotate every image under the input root.
///
/// Only startup problems (bad root, uncreatable output root) are returned as
/// errors; a model that fails to load only fails its own tasks.
pub fn run(options: RunOptions) -> Result<RunReport> {
    let RunOptions {
        input_root,
        east_model,
        db_model,
        east_config,
        db_config,
        style,
    } = options;

    // Fail on a bad root before paying for model loading.
    let input_root = canonical_root(&input_root)?;

    let detectors: Vec<Box<dyn TextDetector>> = [(east_config, east_model), (db_config, db_model)]
        .into_iter()
        .filter_map(|(config, path)| path.map(|path| build_detector(config, &path)))
        .collect();

    run_with_detectors(&input_root, detectors, style)
}

/// Annotate every image under `input_root` with the given detectors.
pub fn run_with_detectors(
    input_root: &Path,
    detectors: Vec<Box<dyn TextDetector>>,
    style: AnnotationStyle,
) -> Result<RunReport> {
    let input_root = canonical_root(input_root)?;
    let mut walker = ImageWalker::new(&input_root)?;

    let mut units = Vec::with_capacity(detectors.len());
    for detector in detectors {
        let output = OutputPathMapper::beside_input(&input_root, detector.kind());
        output.ensure_root()?;
        info!(
            detector = %detector.kind(),
            output = %output.root().display(),
            "writing annotated images"
        );
        walker = walker.excluding(output.root());
        units.push(DetectorUnit::new(detector, output));
    }

    let coordinator = TaskCoordinator::new(units, style);

    let stopwatch = Stopwatch::start("traversal");
    let mut report = coordinator.run(&walker);
    report.elapsed = stopwatch.finish();

    info!(
        files = report.files_visited,
        undecodable = report.files_undecodable,
        succeeded = report.tasks_succeeded,
        failed = report.tasks_failed,
        "run complete"
    );

    Ok(report)
}

fn canonical_root(input_root: &Path) -> Result<PathBuf> {
    let root = std::fs::canonicalize(input_root).map_err(|err| Error::InvalidRoot {
        path: input_root.to_path_buf(),
        reason: err.to_string(),
    })?;
    if !root.is_dir() {
        return Err(Error::InvalidRoot {
            path: input_root.to_path_buf(),
            reason: "not a directory".to_string(),
        });
    }
    Ok(root)
}

fn build_detector(config: DetectorConfig, path: &Path) -> Box<dyn TextDetector> {
    let kind = config.kind;
    match load_detector(config, path) {
        Ok(detector) => {
            info!(detector = %kind, model = %path.display(), "model loaded");
            detector
        }
        Err(err) => {
            error!(
                detector = %kind,
                model = %path.display(),
                error = %err,
                "model failed to load; its tasks will fail"
            );
            Box::new(UnavailableDetector::new(kind, err.to_string()))
        }
    }
}
