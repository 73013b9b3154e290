pub mod keypoint;

pub use keypoint::{Keypoint, KeypointName, Pose};
