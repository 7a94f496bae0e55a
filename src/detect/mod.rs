mod backend;
mod backends;
mod result;

pub use backend::Detector;
pub use backends::{FailingDetector, HttpDetector, HttpDetectorConfig, StaticDetector};
pub use result::{letterbox, CoordMap, Detection, DetectionBatch};
