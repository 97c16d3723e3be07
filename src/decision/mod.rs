mod aggregate;
mod cooldown;
mod gate;
mod geometry;

pub use aggregate::{aggregate, FrameResult, FrameStatus, GatedDetection};
pub use cooldown::{AlertState, CooldownController};
pub use gate::{Disposition, Reason, Verdict};
pub use geometry::ShapeFeatures;
