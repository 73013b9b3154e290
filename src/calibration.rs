use crate::config::MotionConfig;
use crate::pose::{KeypointName, Pose};

/// 両目の距離から cm/pixel 比を求める
///
/// 頭の傾き（縦方向）は補正しない。X軸方向の距離のみ使う近似
#[derive(Debug, Clone, Copy)]
pub struct Calibration {
    known_eye_distance_cm: f32,
    confidence_threshold: f32,
}

impl Calibration {
    pub fn new(known_eye_distance_cm: f32, confidence_threshold: f32) -> Self {
        Self {
            known_eye_distance_cm,
            confidence_threshold,
        }
    }

    pub fn from_config(config: &MotionConfig) -> Self {
        Self::new(config.known_eye_distance_cm, config.keypoint_confidence)
    }

    pub fn known_eye_distance_cm(&self) -> f32 {
        self.known_eye_distance_cm
    }

    /// 現フレームの cm/pixel 比
    ///
    /// 目が検出されていない・信頼度不足・距離0 の場合は None（このフレームは座標更新しない）
    pub fn cm_per_pixel(&self, pose: &Pose) -> Option<f32> {
        let left_eye = pose.confident(KeypointName::LeftEye, self.confidence_threshold)?;
        let right_eye = pose.confident(KeypointName::RightEye, self.confidence_threshold)?;

        let distance = (left_eye.x - right_eye.x).abs();
        let ratio = self.known_eye_distance_cm / distance;
        if ratio.is_finite() && ratio > 0.0 {
            Some(ratio)
        } else {
            log::trace!("degenerate eye distance {}", distance);
            None
        }
    }
}
