use super::{PixelRect, TrackedZone, Zone};
use crate::config::MotionConfig;
use crate::pose::Pose;

/// 絶対座標ゾーンの単位（ピクセル）
const ABSOLUTE_UNIT_PX: f32 = 10.0;

/// 0.5 は +∞ 方向に丸める
fn round_half_up(v: f32) -> f32 {
    (v + 0.5).floor()
}

fn to_pixel(v: f32) -> Option<i32> {
    let r = round_half_up(v);
    if r.is_finite() && r >= i32::MIN as f32 && r <= i32::MAX as f32 {
        Some(r as i32)
    } else {
        None
    }
}

/// ゾーン定義（cm, キーポイント基準）をピクセル矩形に変換する
#[derive(Debug, Clone, Copy)]
pub struct CoordinateMapper {
    confidence_threshold: f32,
}

impl CoordinateMapper {
    pub fn new(confidence_threshold: f32) -> Self {
        Self { confidence_threshold }
    }

    pub fn from_config(config: &MotionConfig) -> Self {
        Self::new(config.keypoint_confidence)
    }

    /// 1ゾーン分の矩形を計算。保持すべき場合（キーポイント欠損・低信頼度・
    /// キャリブレーション不可・非有限値）は None
    pub fn map(&self, zone: &Zone, pose: &Pose, cm_per_pixel: Option<f32>) -> Option<PixelRect> {
        let kp = pose.confident(zone.relative_to, self.confidence_threshold)?;

        let (x, y, w, h) = if zone.absolute {
            (
                zone.offset_x * ABSOLUTE_UNIT_PX,
                zone.offset_y * ABSOLUTE_UNIT_PX,
                zone.width * ABSOLUTE_UNIT_PX,
                zone.height * ABSOLUTE_UNIT_PX,
            )
        } else {
            let r = cm_per_pixel?;
            (
                kp.x + zone.offset_x / r,
                kp.y + zone.offset_y / r,
                zone.width / r,
                zone.height / r,
            )
        };

        Some(PixelRect::new(to_pixel(x)?, to_pixel(y)?, to_pixel(w)?, to_pixel(h)?))
    }

    /// 全ゾーンの矩形を更新し、更新できた数を返す。更新できなかったゾーンは前回値を保持
    pub fn update(&self, zones: &mut [TrackedZone], pose: &Pose, cm_per_pixel: Option<f32>) -> usize {
        let mut updated = 0;
        for tracked in zones.iter_mut() {
            if let Some(rect) = self.map(&tracked.zone, pose, cm_per_pixel) {
                tracked.state.rect = rect;
                updated += 1;
            }
        }
        updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::KeypointName;

    fn zone(offset: (f32, f32), size: (f32, f32)) -> Zone {
        Zone {
            id: 1,
            relative_to: KeypointName::LeftEye,
            offset_x: offset.0,
            offset_y: offset.1,
            width: size.0,
            height: size.1,
            absolute: false,
        }
    }

    fn pose_with_left_eye(x: f32, y: f32, confidence: f32) -> Pose {
        Pose::default().with(KeypointName::LeftEye, x, y, confidence)
    }

    #[test]
    fn test_relative_mapping() {
        let mapper = CoordinateMapper::new(0.5);
        let rect = mapper
            .map(&zone((5.0, -7.0), (4.0, 4.0)), &pose_with_left_eye(100.0, 100.0, 0.9), Some(0.1))
            .unwrap();
        assert_eq!(rect, PixelRect::new(150, 30, 40, 40));
    }

    #[test]
    fn test_low_confidence_holds() {
        let mapper = CoordinateMapper::new(0.5);
        let z = zone((5.0, -7.0), (4.0, 4.0));
        assert!(mapper.map(&z, &pose_with_left_eye(100.0, 100.0, 0.49), Some(0.1)).is_none());
        assert!(mapper.map(&z, &Pose::default(), Some(0.1)).is_none());
    }

    #[test]
    fn test_calibration_unavailable_holds() {
        let mapper = CoordinateMapper::new(0.5);
        let mut zones = vec![TrackedZone::new(zone((5.0, -7.0), (4.0, 4.0)))];
        zones[0].state.rect = PixelRect::new(1, 2, 3, 4);

        let updated = mapper.update(&mut zones, &pose_with_left_eye(100.0, 100.0, 0.9), None);
        assert_eq!(updated, 0);
        assert_eq!(zones[0].state.rect, PixelRect::new(1, 2, 3, 4));
    }

    #[test]
    fn test_degenerate_ratio_skipped() {
        let mapper = CoordinateMapper::new(0.5);
        let z = zone((5.0, -7.0), (4.0, 4.0));
        let pose = pose_with_left_eye(100.0, 100.0, 0.9);
        assert!(mapper.map(&z, &pose, Some(0.0)).is_none());
        assert!(mapper.map(&z, &pose, Some(1e-30)).is_none());
        assert!(mapper.map(&z, &pose, Some(f32::NAN)).is_none());
    }

    #[test]
    fn test_half_rounds_up() {
        let mapper = CoordinateMapper::new(0.5);
        // -2.5 → -2, 2.5 → 3
        let rect = mapper
            .map(&zone((-1.25, 1.25), (0.0, 0.0)), &pose_with_left_eye(0.0, 0.0, 0.9), Some(0.5))
            .unwrap();
        assert_eq!(rect.x, -2);
        assert_eq!(rect.y, 3);
        assert_eq!(rect.area(), 0);
    }

    #[test]
    fn test_absolute_zone_ignores_calibration() {
        let mapper = CoordinateMapper::new(0.5);
        let mut z = zone((5.0, 7.0), (4.0, 3.0));
        z.absolute = true;
        let rect = mapper.map(&z, &pose_with_left_eye(100.0, 100.0, 0.9), None).unwrap();
        assert_eq!(rect, PixelRect::new(50, 70, 40, 30));
        // アンカーが検出されていなければ保持
        assert!(mapper.map(&z, &Pose::default(), None).is_none());
    }
}
