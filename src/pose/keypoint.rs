use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 17 キーポイント名
///
/// シリアライズ時は `leftEye` のような camelCase 名になる
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(usize)]
pub enum KeypointName {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointName {
    pub const COUNT: usize = 17;

    pub const ALL: [KeypointName; Self::COUNT] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nose => "nose",
            Self::LeftEye => "leftEye",
            Self::RightEye => "rightEye",
            Self::LeftEar => "leftEar",
            Self::RightEar => "rightEar",
            Self::LeftShoulder => "leftShoulder",
            Self::RightShoulder => "rightShoulder",
            Self::LeftElbow => "leftElbow",
            Self::RightElbow => "rightElbow",
            Self::LeftWrist => "leftWrist",
            Self::RightWrist => "rightWrist",
            Self::LeftHip => "leftHip",
            Self::RightHip => "rightHip",
            Self::LeftKnee => "leftKnee",
            Self::RightKnee => "rightKnee",
            Self::LeftAnkle => "leftAnkle",
            Self::RightAnkle => "rightAnkle",
        }
    }
}

impl fmt::Display for KeypointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeypointName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|k| k.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown keypoint: {}", s))
    }
}

/// 単一キーポイント
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    /// X座標（ピクセル）
    pub x: f32,
    /// Y座標（ピクセル）
    pub y: f32,
    /// 信頼度スコア (0.0〜1.0)
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// 信頼度が閾値以上か
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }
}

/// 1人分の姿勢。検出されなかったキーポイントは None
#[derive(Debug, Clone, Default)]
pub struct Pose {
    pub keypoints: [Option<Keypoint>; KeypointName::COUNT],
}

impl Pose {
    pub fn new(keypoints: [Option<Keypoint>; KeypointName::COUNT]) -> Self {
        Self { keypoints }
    }

    pub fn get(&self, name: KeypointName) -> Option<&Keypoint> {
        self.keypoints[name as usize].as_ref()
    }

    pub fn set(&mut self, name: KeypointName, keypoint: Keypoint) {
        self.keypoints[name as usize] = Some(keypoint);
    }

    /// builder 形式でキーポイントを追加
    pub fn with(mut self, name: KeypointName, x: f32, y: f32, confidence: f32) -> Self {
        self.set(name, Keypoint::new(x, y, confidence));
        self
    }

    /// 閾値以上の信頼度を持つキーポイントのみ返す
    pub fn confident(&self, name: KeypointName, threshold: f32) -> Option<&Keypoint> {
        self.get(name).filter(|k| k.is_valid(threshold))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_name_count() {
        assert_eq!(KeypointName::COUNT, 17);
        assert_eq!(KeypointName::ALL.len(), 17);
    }

    #[test]
    fn test_keypoint_name_from_index() {
        assert_eq!(KeypointName::from_index(0), Some(KeypointName::Nose));
        assert_eq!(KeypointName::from_index(16), Some(KeypointName::RightAnkle));
        assert_eq!(KeypointName::from_index(17), None);
        for (i, name) in KeypointName::ALL.iter().enumerate() {
            assert_eq!(*name as usize, i);
        }
    }

    #[test]
    fn test_keypoint_name_serde_matches_as_str() {
        for name in KeypointName::ALL {
            let json = serde_json::to_string(&name).unwrap();
            assert_eq!(json, format!("\"{}\"", name.as_str()));
            assert_eq!(name.as_str().parse::<KeypointName>().unwrap(), name);
        }
        assert!("leftFoot".parse::<KeypointName>().is_err());
    }

    #[test]
    fn test_keypoint_is_valid() {
        let kp = Keypoint::new(10.0, 20.0, 0.5);
        assert!(kp.is_valid(0.5));
        assert!(!kp.is_valid(0.51));
    }

    #[test]
    fn test_pose_missing_and_confident() {
        let pose = Pose::default().with(KeypointName::Nose, 320.0, 120.0, 0.9);
        assert_eq!(pose.get(KeypointName::Nose).unwrap().x, 320.0);
        assert!(pose.get(KeypointName::LeftEye).is_none());
        assert!(pose.confident(KeypointName::Nose, 0.5).is_some());
        assert!(pose.confident(KeypointName::Nose, 0.95).is_none());
    }
}
