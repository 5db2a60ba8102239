use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::Duration;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::models::{DetectorKind, TextDetector};
use crate::output::OutputPathMapper;
use crate::render::{self, AnnotationStyle};
use crate::walker::{ImageFile, ImageWalker};

/// One enabled detector paired with the tree it writes into.
pub struct DetectorUnit {
    detector: Box<dyn TextDetector>,
    output: OutputPathMapper,
}

impl DetectorUnit {
    pub fn new(detector: Box<dyn TextDetector>, output: OutputPathMapper) -> Self {
        Self { detector, output }
    }

    pub fn kind(&self) -> DetectorKind {
        self.detector.kind()
    }

    /// Resolve, detect, render, write. Returns the written path.
    fn process(
        &self,
        file: &ImageFile,
        img: &image::DynamicImage,
        style: &AnnotationStyle,
    ) -> Result<PathBuf> {
        let target = self.output.resolve(file)?;
        let polygons = self.detector.detect(img)?;
        let annotated = render::render(img, &polygons, style);
        render::write(&annotated, &target)?;
        debug!(
            file = %file.path.display(),
            detector = %self.kind(),
            regions = polygons.len(),
            output = %target.display(),
            "annotated"
        );
        Ok(target)
    }

    /// [`Self::process`] with panics turned into an ordinary task failure.
    fn process_isolated(
        &self,
        file: &ImageFile,
        img: &image::DynamicImage,
        style: &AnnotationStyle,
    ) -> Result<PathBuf> {
        panic::catch_unwind(AssertUnwindSafe(|| self.process(file, img, style))).unwrap_or_else(
            |payload| {
                Err(Error::TaskPanicked {
                    kind: self.kind(),
                    reason: panic_message(payload.as_ref()),
                })
            },
        )
    }
}

/// Counts gathered over one traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub files_visited: usize,
    pub files_undecodable: usize,
    pub tasks_succeeded: usize,
    pub tasks_failed: usize,
    pub elapsed: Duration,
}

/// Drives the walker and fans each file out to every enabled detector.
///
/// The units for one file run concurrently and are all joined before the next
/// file is read. A failed unit is logged and counted, nothing more.
pub struct TaskCoordinator {
    units: Vec<DetectorUnit>,
    style: AnnotationStyle,
}

impl TaskCoordinator {
    pub fn new(units: Vec<DetectorUnit>, style: AnnotationStyle) -> Self {
        Self { units, style }
    }

    pub fn run(&self, walker: &ImageWalker) -> RunReport {
        let mut report = RunReport::default();

        if self.units.is_empty() {
            info!("no detector configured; images will be listed but not annotated");
        }

        for file in walker.files() {
            report.files_visited += 1;
            if self.units.is_empty() {
                debug!(file = %file.path.display(), "visited");
                continue;
            }

            let img = match image::open(&file.path) {
                Ok(img) => img,
                Err(source) => {
                    let err = Error::Decode {
                        path: file.path.clone(),
                        source,
                    };
                    warn!(file = %file.path.display(), error = %err, "skipping image");
                    report.files_undecodable += 1;
                    continue;
                }
            };

            // Join barrier: collect() returns once every unit for this file is done.
            let outcomes: Vec<Result<PathBuf>> = self
                .units
                .par_iter()
                .map(|unit| unit.process_isolated(&file, &img, &self.style))
                .collect();

            for (unit, outcome) in self.units.iter().zip(outcomes) {
                match outcome {
                    Ok(_) => report.tasks_succeeded += 1,
                    Err(err) => {
                        warn!(
                            file = %file.path.display(),
                            detector = %unit.kind(),
                            error = %err,
                            "task failed"
                        );
                        report.tasks_failed += 1;
                    }
                }
            }
        }

        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
