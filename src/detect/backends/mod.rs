mod http;
mod stub;

pub use http::{HttpDetector, HttpDetectorConfig};
pub use stub::{FailingDetector, StaticDetector};
