use super::DetectorKind;

/// EAST input edge used by default.
pub const EAST_INPUT_SIZE: u32 = 736;
/// The smaller EAST geometry used by most published examples.
pub const EAST_UPSTREAM_INPUT_SIZE: u32 = 320;
pub const DB_INPUT_SIZE: u32 = 736;
/// Per-channel mean, in blob channel order.
pub const CHANNEL_MEAN: [f32; 3] = [122.679, 116.669, 104.007];

/// Both networks downsample by 32.
const INPUT_ALIGNMENT: u32 = 32;

/// Thresholds, geometry and normalization applied when invoking a detector.
///
/// Built once at startup and never mutated during a run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectorConfig {
    pub kind: DetectorKind,
    /// EAST: minimum score of a geometry cell.
    pub confidence_threshold: f32,
    /// EAST: overlap above which the weaker quad is suppressed.
    pub nms_threshold: f32,
    /// DB: probability above which a pixel counts as text.
    pub binary_threshold: f32,
    /// DB: minimum mean probability inside a kept polygon.
    pub polygon_threshold: f32,
    /// DB: upper bound on contours considered per image.
    pub max_candidates: usize,
    /// DB: how far shrunk text kernels are grown back out.
    pub unclip_ratio: f32,
    pub input_width: u32,
    pub input_height: u32,
    pub mean: [f32; 3],
    pub scale: f32,
    pub swap_rb: bool,
}

impl DetectorConfig {
    pub const EAST_CONFIDENCE_THRESHOLD: f32 = 0.5;
    pub const EAST_NMS_THRESHOLD: f32 = 0.4;
    pub const DB_BINARY_THRESHOLD: f32 = 0.3;
    pub const DB_POLYGON_THRESHOLD: f32 = 0.1;
    pub const DB_MAX_CANDIDATES: usize = 10000;
    pub const DB_UNCLIP_RATIO: f32 = 1.5;

    pub fn east() -> Self {
        Self {
            kind: DetectorKind::East,
            confidence_threshold: Self::EAST_CONFIDENCE_THRESHOLD,
            nms_threshold: Self::EAST_NMS_THRESHOLD,
            binary_threshold: 0.0,
            polygon_threshold: 0.0,
            max_candidates: 0,
            unclip_ratio: 0.0,
            input_width: EAST_INPUT_SIZE,
            input_height: EAST_INPUT_SIZE,
            mean: CHANNEL_MEAN,
            scale: 1.0,
            swap_rb: true,
        }
    }

    pub fn db() -> Self {
        Self {
            kind: DetectorKind::Db,
            confidence_threshold: 0.0,
            nms_threshold: 0.0,
            binary_threshold: Self::DB_BINARY_THRESHOLD,
            polygon_threshold: Self::DB_POLYGON_THRESHOLD,
            max_candidates: Self::DB_MAX_CANDIDATES,
            unclip_ratio: Self::DB_UNCLIP_RATIO,
            input_width: DB_INPUT_SIZE,
            input_height: DB_INPUT_SIZE,
            mean: CHANNEL_MEAN,
            scale: 1.0 / 255.0,
            swap_rb: false,
        }
    }

    /// Override the network input size, rounded down to a multiple of 32.
    pub fn with_input_size(mut self, width: u32, height: u32) -> Self {
        self.input_width = align_input(width);
        self.input_height = align_input(height);
        self
    }
}

fn align_input(edge: u32) -> u32 {
    (edge / INPUT_ALIGNMENT).max(1) * INPUT_ALIGNMENT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn east_profile() {
        let config = DetectorConfig::east();
        assert_eq!(config.kind, DetectorKind::East);
        assert_eq!(config.confidence_threshold, 0.5);
        assert_eq!(config.nms_threshold, 0.4);
        assert_eq!((config.input_width, config.input_height), (736, 736));
        assert!(config.swap_rb);
        assert_eq!(config.scale, 1.0);
    }

    #[test]
    fn db_profile() {
        let config = DetectorConfig::db();
        assert_eq!(config.binary_threshold, 0.3);
        assert_eq!(config.polygon_threshold, 0.1);
        assert_eq!(config.max_candidates, 10000);
        assert_eq!(config.unclip_ratio, 1.5);
        assert_eq!((config.input_width, config.input_height), (736, 736));
        assert_eq!(config.mean, CHANNEL_MEAN);
    }

    #[test]
    fn input_size_is_aligned_to_32() {
        let config = DetectorConfig::east().with_input_size(EAST_UPSTREAM_INPUT_SIZE, 700);
        assert_eq!((config.input_width, config.input_height), (320, 672));
        let tiny = DetectorConfig::db().with_input_size(5, 0);
        assert_eq!((tiny.input_width, tiny.input_height), (32, 32));
    }
}
