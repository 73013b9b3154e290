pub mod mapper;
pub mod motion;
pub mod registry;
pub mod trigger;

pub use mapper::CoordinateMapper;
pub use motion::{MotionEstimator, MotionSample};
pub use registry::{CommandOutcome, ZoneCommand, ZoneRegistry};
pub use trigger::{TriggerEdge, TriggerEngine, TriggerState};

use serde::{Deserialize, Serialize};

use crate::pose::KeypointName;

/// ゾーンのデフォルトサイズ（センチメートル）
pub const DEFAULT_ZONE_SIZE_CM: f32 = 4.0;

/// ユーザーが定義するゾーン
///
/// 位置とサイズはアンカーキーポイント基準のセンチメートル
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: u32,
    pub relative_to: KeypointName,
    #[serde(alias = "x")]
    pub offset_x: f32,
    #[serde(alias = "y")]
    pub offset_y: f32,
    pub width: f32,
    pub height: f32,
    /// true の場合、キーポイント基準ではなく 10px 単位の絶対座標
    #[serde(
        default,
        rename = "isAbsPosition",
        alias = "absolute",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub absolute: bool,
}

/// `ZoneRegistry::add` の入力。未指定の項目はデフォルト値で埋める
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ZoneDraft {
    pub relative_to: Option<KeypointName>,
    pub offset_x: Option<f32>,
    pub offset_y: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub absolute: bool,
}

impl ZoneDraft {
    pub fn anchored(relative_to: KeypointName) -> Self {
        Self {
            relative_to: Some(relative_to),
            ..Self::default()
        }
    }

    pub fn offset(mut self, x: f32, y: f32) -> Self {
        self.offset_x = Some(x);
        self.offset_y = Some(y);
        self
    }

    pub fn size(mut self, width: f32, height: f32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// ピクセル座標の矩形。幅・高さは 0 以上
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl PixelRect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w: w.max(0), h: h.max(0) }
    }

    /// クリップ前の面積
    pub fn area(&self) -> u64 {
        self.w.max(0) as u64 * self.h.max(0) as u64
    }

    /// フレーム範囲に収めた (x0, y0, x1, y1)。範囲外なら None
    pub fn clip(&self, width: u32, height: u32) -> Option<(usize, usize, usize, usize)> {
        let x0 = (self.x as i64).max(0);
        let y0 = (self.y as i64).max(0);
        let x1 = (self.x as i64 + self.w.max(0) as i64).min(width as i64);
        let y1 = (self.y as i64 + self.h.max(0) as i64).min(height as i64);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }
        Some((x0 as usize, y0 as usize, x1 as usize, y1 as usize))
    }
}

/// フレームごとに再計算される実行時状態（永続化しない）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ZoneState {
    pub rect: PixelRect,
    pub motion_count: u32,
    pub motion_ratio: f32,
    pub trigger: TriggerState,
}

impl ZoneState {
    pub fn is_triggered(&self) -> bool {
        self.trigger == TriggerState::Triggered
    }
}

/// 定義と実行時状態の組
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedZone {
    pub zone: Zone,
    pub state: ZoneState,
}

impl TrackedZone {
    pub fn new(zone: Zone) -> Self {
        Self {
            zone,
            state: ZoneState::default(),
        }
    }
}
