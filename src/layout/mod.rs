pub mod classify;
pub mod config;
pub mod scale;

pub use classify::{PageClass, PageClassifier};
pub use config::{BulletinLayout, FlowBelowRegion, PageLayout, RegionStrategy};
pub use scale::{scale_rect, PixelRect, ScaleFactors};
