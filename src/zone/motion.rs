use super::{PixelRect, TrackedZone};
use crate::config::MotionConfig;
use crate::frame::{Frame, BYTES_PER_PIXEL};

/// 1ゾーン分の計測結果
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionSample {
    /// 閾値を超えたピクセル数
    pub count: u32,
    /// count / (w * h)。面積0なら 0.0
    pub ratio: f32,
}

/// 前フレームとの差分でゾーン内の動きを検出する
///
/// 前フレームと現フレームの2バッファを持ち、毎フレーム入れ替える。
/// 全ゾーンは同じ前フレームに対して評価され、評価後にまとめて差し替える
pub struct MotionEstimator {
    threshold: f32,
    previous: Vec<u8>,
    current: Vec<u8>,
    width: u32,
    height: u32,
    seeded: bool,
}

impl MotionEstimator {
    /// threshold は 0.0〜1.0 に丸める
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
            previous: Vec::new(),
            current: Vec::new(),
            width: 0,
            height: 0,
            seeded: false,
        }
    }

    pub fn from_config(config: &MotionConfig) -> Self {
        Self::new(config.motion_threshold)
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold.clamp(0.0, 1.0);
    }

    /// 次のフレームで基準バッファを取り直す
    pub fn reset(&mut self) {
        self.seeded = false;
    }

    pub fn is_seeded(&self) -> bool {
        self.seeded
    }

    /// RGB差分の合計がこの値を超えたピクセルを「動き」とみなす
    fn threshold_amount(&self) -> f32 {
        self.threshold * 255.0 * 3.0
    }

    /// 全ゾーンの動きを計測し、基準フレームを現フレームに差し替える
    ///
    /// 最初のフレーム（または解像度変更時）は基準を取るだけで全ゾーン 0
    pub fn process(&mut self, frame: &Frame, zones: &mut [TrackedZone]) {
        let data = frame.data();

        if !self.seeded || frame.width() != self.width || frame.height() != self.height {
            if self.seeded {
                log::info!(
                    "frame size changed {}x{} -> {}x{}, reseeding",
                    self.width, self.height, frame.width(), frame.height()
                );
            }
            self.previous.clear();
            self.previous.extend_from_slice(data);
            self.current.clear();
            self.current.extend_from_slice(data);
            self.width = frame.width();
            self.height = frame.height();
            self.seeded = true;
            for tracked in zones.iter_mut() {
                tracked.state.motion_count = 0;
                tracked.state.motion_ratio = 0.0;
            }
            return;
        }

        self.current.copy_from_slice(data);

        for tracked in zones.iter_mut() {
            let sample = self.measure(&tracked.state.rect);
            tracked.state.motion_count = sample.count;
            tracked.state.motion_ratio = sample.ratio;
        }

        std::mem::swap(&mut self.previous, &mut self.current);
    }

    /// 1矩形分の差分計測（前フレームと現フレームは読むだけ）
    fn measure(&self, rect: &PixelRect) -> MotionSample {
        let area = rect.area();
        if area == 0 {
            return MotionSample::default();
        }

        let amount = self.threshold_amount();
        let stride = self.width as usize * BYTES_PER_PIXEL;
        let mut count = 0u32;

        if let Some((x0, y0, x1, y1)) = rect.clip(self.width, self.height) {
            for y in y0..y1 {
                let row = y * stride;
                for x in x0..x1 {
                    let i = row + x * BYTES_PER_PIXEL;
                    let cur = &self.current[i..i + 3];
                    let prev = &self.previous[i..i + 3];
                    let diff = cur[0].abs_diff(prev[0]) as u32
                        + cur[1].abs_diff(prev[1]) as u32
                        + cur[2].abs_diff(prev[2]) as u32;
                    if diff as f32 > amount {
                        count += 1;
                    }
                }
            }
        }

        MotionSample {
            count,
            ratio: (count as f64 / area as f64) as f32,
        }
    }
}
