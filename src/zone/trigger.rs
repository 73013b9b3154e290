use super::{TrackedZone, ZoneState};
use crate::config::MotionConfig;
use crate::notify::Notification;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TriggerState {
    #[default]
    Idle,
    Triggered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEdge {
    Rising,
    Falling,
}

/// 動きピクセル数からゾーンの ON/OFF を決める
///
/// デバウンスなし: 1フレームで閾値をまたげば即座に切り替わる
#[derive(Debug, Clone, Copy)]
pub struct TriggerEngine {
    count_threshold: u32,
}

impl TriggerEngine {
    pub fn new(count_threshold: u32) -> Self {
        Self { count_threshold }
    }

    pub fn from_config(config: &MotionConfig) -> Self {
        Self::new(config.motion_count_threshold)
    }

    pub fn count_threshold(&self) -> u32 {
        self.count_threshold
    }

    pub fn set_count_threshold(&mut self, count_threshold: u32) {
        self.count_threshold = count_threshold;
    }

    /// 1ゾーン分の状態遷移。index はレジストリ内の位置
    ///
    /// 立ち上がり/立ち下がりで StateChanged、Triggered 中は毎フレーム Intensity を積む
    pub fn step(&self, index: usize, state: &mut ZoneState, out: &mut Vec<Notification>) -> Option<TriggerEdge> {
        let is_triggered = state.motion_count >= self.count_threshold;

        let edge = match (state.trigger, is_triggered) {
            (TriggerState::Idle, true) => Some(TriggerEdge::Rising),
            (TriggerState::Triggered, false) => Some(TriggerEdge::Falling),
            _ => None,
        };

        if let Some(edge) = edge {
            let is_on = edge == TriggerEdge::Rising;
            log::debug!("zone #{} {} (motion {})", index, if is_on { "on" } else { "off" }, state.motion_count);
            out.push(Notification::StateChanged { index, is_on });
        }
        if is_triggered {
            out.push(Notification::Intensity {
                index,
                ratio: state.motion_ratio.clamp(0.0, 1.0),
            });
        }

        state.trigger = if is_triggered {
            TriggerState::Triggered
        } else {
            TriggerState::Idle
        };
        edge
    }

    /// 全ゾーンを登録順に評価
    pub fn update(&self, zones: &mut [TrackedZone], out: &mut Vec<Notification>) {
        for (index, tracked) in zones.iter_mut().enumerate() {
            self.step(index, &mut tracked.state, out);
        }
    }
}
