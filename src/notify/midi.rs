use super::{Notification, NotificationSink};
use crate::config::MidiConfig;
use crate::error::{Error, Result};

/// ノートのベロシティ（ON/OFF 共通）
pub const NOTE_VELOCITY: u8 = 64;

/// チャンネルは 1〜16
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
}

impl MidiMessage {
    /// 3バイトのチャンネルメッセージにエンコード
    pub fn to_bytes(&self) -> [u8; 3] {
        let status = |kind: u8, channel: u8| kind | (channel.clamp(1, 16) - 1);
        match *self {
            Self::NoteOn { channel, note, velocity } => [status(0x90, channel), note & 0x7F, velocity & 0x7F],
            Self::NoteOff { channel, note, velocity } => [status(0x80, channel), note & 0x7F, velocity & 0x7F],
            Self::ControlChange { channel, controller, value } => {
                [status(0xB0, channel), controller & 0x7F, value & 0x7F]
            }
        }
    }
}

/// MIDI出力ポート。実際の送信手段はホスト側が用意する
pub trait MidiPort {
    fn is_open(&self) -> bool;
    fn send(&mut self, bytes: &[u8]) -> Result<()>;
}

/// 送信内容をログに出すだけのポート
#[derive(Debug, Default)]
pub struct LogMidiPort {
    sent: u64,
}

impl MidiPort for LogMidiPort {
    fn is_open(&self) -> bool {
        true
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.sent += 1;
        log::debug!("midi #{} {:02X?}", self.sent, bytes);
        Ok(())
    }
}

/// ゾーン i → ノート base_note+i / CC base_controller+i
pub struct MidiSink<P: MidiPort> {
    port: P,
    channel: u8,
    base_note: u8,
    base_controller: u8,
}

impl<P: MidiPort> MidiSink<P> {
    pub fn new(port: P, channel: u8, base_note: u8, base_controller: u8) -> Self {
        Self {
            port,
            channel,
            base_note,
            base_controller,
        }
    }

    pub fn from_config(config: &MidiConfig, port: P) -> Self {
        Self::new(port, config.channel, config.base_note, config.base_controller)
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// 通知をMIDIメッセージへ変換。7bitに収まらないゾーン番号は None
    pub fn message_for(&self, notification: &Notification) -> Option<MidiMessage> {
        let offset = u8::try_from(notification.index()).ok()?;
        match *notification {
            Notification::StateChanged { is_on, .. } => {
                let note = self.base_note.checked_add(offset).filter(|n| *n <= 0x7F)?;
                Some(if is_on {
                    MidiMessage::NoteOn { channel: self.channel, note, velocity: NOTE_VELOCITY }
                } else {
                    MidiMessage::NoteOff { channel: self.channel, note, velocity: NOTE_VELOCITY }
                })
            }
            Notification::Intensity { ratio, .. } => {
                let controller = self.base_controller.checked_add(offset).filter(|c| *c <= 0x7F)?;
                let value = (ratio.clamp(0.0, 1.0) * 127.0 + 0.5).floor() as u8;
                Some(MidiMessage::ControlChange { channel: self.channel, controller, value })
            }
        }
    }
}

impl<P: MidiPort> NotificationSink for MidiSink<P> {
    fn name(&self) -> &str {
        "midi"
    }

    fn is_open(&self) -> bool {
        self.port.is_open()
    }

    fn send(&mut self, notification: &Notification) -> Result<()> {
        let msg = self.message_for(notification).ok_or_else(|| {
            Error::SinkUnavailable(format!("zone #{} out of MIDI range", notification.index()))
        })?;
        self.port.send(&msg.to_bytes())
    }
}
