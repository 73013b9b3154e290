//! ゾーンの ON/OFF と強度を外部 (OSC / MIDI) へ通知する
//!
//! 送信はベストエフォート。閉じている送信先はスキップし、失敗はログに残して捨てる

pub mod midi;
pub mod osc;

pub use midi::{LogMidiPort, MidiMessage, MidiPort, MidiSink};
pub use osc::OscSink;

use crate::config::Config;
use crate::error::Result;

/// ゾーン index はレジストリ内の位置（id ではない）
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Notification {
    StateChanged { index: usize, is_on: bool },
    Intensity { index: usize, ratio: f32 },
}

impl Notification {
    pub fn index(&self) -> usize {
        match self {
            Self::StateChanged { index, .. } | Self::Intensity { index, .. } => *index,
        }
    }
}

pub trait NotificationSink {
    fn name(&self) -> &str;

    /// false の間は send を呼ばない
    fn is_open(&self) -> bool {
        true
    }

    fn send(&mut self, notification: &Notification) -> Result<()>;
}

/// 複数の送信先へ配る
#[derive(Default)]
pub struct SinkSet {
    sinks: Vec<Box<dyn NotificationSink>>,
}

impl SinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 設定に従って OSC / MIDI 送信先を作る。OSC ソケットが作れなくても続行する
    pub fn from_config(config: &Config) -> Self {
        let mut set = Self::new();
        if config.osc.enabled {
            set.push(OscSink::connect(&config.osc.addr, &config.osc.address));
        }
        if config.midi.enabled {
            set.push(MidiSink::from_config(&config.midi, LogMidiPort::default()));
        }
        set
    }

    pub fn push<S: NotificationSink + 'static>(&mut self, sink: S) {
        self.sinks.push(Box::new(sink));
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// 開いている全送信先へ送る。戻り値は実際に渡せた送信先の数
    pub fn dispatch(&mut self, notification: &Notification) -> usize {
        let mut delivered = 0;
        for sink in self.sinks.iter_mut() {
            if !sink.is_open() {
                log::trace!("{} not open, dropping {:?}", sink.name(), notification);
                continue;
            }
            match sink.send(notification) {
                Ok(()) => delivered += 1,
                Err(e) => log::debug!("{} dropped {:?}: {}", sink.name(), notification, e),
            }
        }
        delivered
    }

    pub fn dispatch_all(&mut self, notifications: &[Notification]) {
        for n in notifications {
            self.dispatch(n);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingSink;
    use super::*;

    #[test]
    fn test_closed_sink_skipped() {
        let open = RecordingSink::open();
        let closed = RecordingSink::default();
        let mut set = SinkSet::new();
        set.push(open.clone());
        set.push(closed.clone());

        let n = Notification::StateChanged { index: 0, is_on: true };
        assert_eq!(set.dispatch(&n), 1);
        assert_eq!(open.received.borrow().as_slice(), &[n]);
        assert!(closed.received.borrow().is_empty());
    }

    #[test]
    fn test_failing_sink_does_not_block_others() {
        let mut failing = RecordingSink::open();
        failing.fail = true;
        let ok = RecordingSink::open();
        let mut set = SinkSet::new();
        set.push(failing);
        set.push(ok.clone());

        set.dispatch_all(&[
            Notification::StateChanged { index: 1, is_on: true },
            Notification::Intensity { index: 1, ratio: 0.5 },
        ]);
        assert_eq!(ok.received.borrow().len(), 2);
    }

    #[test]
    fn test_notification_index() {
        assert_eq!(Notification::Intensity { index: 4, ratio: 0.1 }.index(), 4);
        assert_eq!(Notification::StateChanged { index: 2, is_on: false }.index(), 2);
    }
}
