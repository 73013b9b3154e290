//! 1フレーム分のパイプライン
//!
//! pose → 座標変換 → 差分検出 → トリガー判定 → 通知

use crate::calibration::Calibration;
use crate::config::{Config, MotionConfig};
use crate::error::Result;
use crate::frame::Frame;
use crate::notify::{Notification, SinkSet};
use crate::pose::Pose;
use crate::zone::{
    CommandOutcome, CoordinateMapper, MotionEstimator, TriggerEngine, TriggerState, ZoneCommand,
    ZoneRegistry,
};

/// tick の結果
#[derive(Debug)]
pub struct TickReport<'a> {
    /// このフレームの cm/pixel 比（取得できなければ None）
    pub cm_per_pixel: Option<f32>,
    /// 矩形を更新できたゾーン数
    pub zones_mapped: usize,
    pub notifications: &'a [Notification],
}

/// ゾーン検出エンジン。tick は &mut self なので同時に2つ走ることはない
pub struct ZoneEngine {
    registry: ZoneRegistry,
    calibration: Calibration,
    mapper: CoordinateMapper,
    motion: MotionEstimator,
    trigger: TriggerEngine,
    sinks: SinkSet,
    pending: Vec<Notification>,
    frames: u64,
}

impl ZoneEngine {
    pub fn new(config: &MotionConfig, registry: ZoneRegistry, sinks: SinkSet) -> Self {
        Self {
            registry,
            calibration: Calibration::from_config(config),
            mapper: CoordinateMapper::from_config(config),
            motion: MotionEstimator::from_config(config),
            trigger: TriggerEngine::from_config(config),
            sinks,
            pending: Vec::new(),
            frames: 0,
        }
    }

    /// 設定ファイルから送信先まで含めて構築
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.motion, ZoneRegistry::new(), SinkSet::from_config(config))
    }

    pub fn registry(&self) -> &ZoneRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ZoneRegistry {
        &mut self.registry
    }

    pub fn sinks_mut(&mut self) -> &mut SinkSet {
        &mut self.sinks
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn set_motion_threshold(&mut self, threshold: f32) {
        self.motion.set_threshold(threshold);
    }

    pub fn set_motion_count_threshold(&mut self, count: u32) {
        self.trigger.set_count_threshold(count);
    }

    /// ゾーン編集はフレーム間でのみ適用する
    ///
    /// ON のまま消えた・位置がずれたゾーンには旧 index で OFF を送り、Idle に戻す
    pub fn apply(&mut self, command: ZoneCommand) -> Result<CommandOutcome> {
        let triggered: Vec<(usize, u32)> = self
            .registry
            .tracked()
            .iter()
            .enumerate()
            .filter(|(_, t)| t.state.is_triggered())
            .map(|(i, t)| (i, t.zone.id))
            .collect();

        let outcome = self.registry.apply(command)?;
        let imported = matches!(outcome, CommandOutcome::Imported(_));
        if imported {
            // 新しいゾーンは前フレームの差分を引き継がない
            self.motion.reset();
        }

        for (index, id) in triggered {
            let position = if imported { None } else { self.registry.position(id) };
            if position == Some(index) {
                continue;
            }
            log::debug!("zone #{} released (id {})", index, id);
            self.sinks.dispatch(&Notification::StateChanged { index, is_on: false });
            if let Some(pos) = position {
                self.registry.tracked_mut()[pos].state.trigger = TriggerState::Idle;
            }
        }
        Ok(outcome)
    }

    /// 1フレーム処理する。poses は先頭の1人のみ使う
    pub fn tick(&mut self, poses: &[Pose], frame: &Frame) -> TickReport<'_> {
        self.pending.clear();
        self.frames += 1;

        let mut cm_per_pixel = None;
        let mut zones_mapped = 0;
        if let Some(pose) = poses.first() {
            cm_per_pixel = self.calibration.cm_per_pixel(pose);
            if cm_per_pixel.is_none() {
                log::trace!("frame {}: calibration unavailable", self.frames);
            }
            zones_mapped = self.mapper.update(self.registry.tracked_mut(), pose, cm_per_pixel);
        }

        self.motion.process(frame, self.registry.tracked_mut());
        self.trigger.update(self.registry.tracked_mut(), &mut self.pending);
        self.sinks.dispatch_all(&self.pending);

        TickReport {
            cm_per_pixel,
            zones_mapped,
            notifications: &self.pending,
        }
    }
}
