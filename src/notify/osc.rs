use rosc::{encoder, OscMessage, OscPacket, OscType};
use std::net::UdpSocket;

use super::{Notification, NotificationSink};
use crate::error::{Error, Result};

/// TidalCycles の制御ポート
pub const OSC_DEFAULT_ADDR: &str = "127.0.0.1:6010";
pub const OSC_DEFAULT_ADDRESS: &str = "/ctrl";

/// 通知からOSCメッセージを構築
///
/// ON/OFF: `<address> "zone<i>" 1|0`
/// 強度:   `<address> "zone<i>-diff" ratio`
pub fn build_osc_message(address: &str, notification: &Notification) -> OscMessage {
    let args = match *notification {
        Notification::StateChanged { index, is_on } => vec![
            OscType::String(format!("zone{}", index)),
            OscType::Int(if is_on { 1 } else { 0 }),
        ],
        Notification::Intensity { index, ratio } => vec![
            OscType::String(format!("zone{}-diff", index)),
            OscType::Float(ratio),
        ],
    };
    OscMessage {
        addr: address.to_string(),
        args,
    }
}

/// OSCメッセージをバイト列にエンコード
pub fn encode_osc_message(msg: &OscMessage) -> Result<Vec<u8>> {
    let packet = OscPacket::Message(msg.clone());
    let encoded = encoder::encode(&packet)?;
    Ok(encoded)
}

/// UDPでOSCを送る送信先
pub struct OscSink {
    socket: Option<UdpSocket>,
    target_addr: String,
    address: String,
}

impl OscSink {
    pub fn new(target_addr: &str, address: &str) -> Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        Ok(Self {
            socket: Some(socket),
            target_addr: target_addr.to_string(),
            address: address.to_string(),
        })
    }

    /// ソケットを作れなければ閉じた状態で返す
    pub fn connect(target_addr: &str, address: &str) -> Self {
        match Self::new(target_addr, address) {
            Ok(sink) => {
                log::info!("OSC -> {} {}", target_addr, address);
                sink
            }
            Err(e) => {
                log::warn!("OSC socket unavailable ({}), notifications will be dropped", e);
                Self::closed(target_addr, address)
            }
        }
    }

    pub fn closed(target_addr: &str, address: &str) -> Self {
        Self {
            socket: None,
            target_addr: target_addr.to_string(),
            address: address.to_string(),
        }
    }
}

impl NotificationSink for OscSink {
    fn name(&self) -> &str {
        "osc"
    }

    fn is_open(&self) -> bool {
        self.socket.is_some()
    }

    fn send(&mut self, notification: &Notification) -> Result<()> {
        let socket = self
            .socket
            .as_ref()
            .ok_or_else(|| Error::SinkUnavailable(self.target_addr.clone()))?;
        let msg = build_osc_message(&self.address, notification);
        let data = encode_osc_message(&msg)?;
        socket.send_to(&data, &self.target_addr)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rosc::decoder;

    #[test]
    fn test_state_message() {
        let msg = build_osc_message("/ctrl", &Notification::StateChanged { index: 2, is_on: true });
        assert_eq!(msg.addr, "/ctrl");
        assert_eq!(msg.args, vec![OscType::String("zone2".into()), OscType::Int(1)]);

        let msg = build_osc_message("/ctrl", &Notification::StateChanged { index: 2, is_on: false });
        assert_eq!(msg.args[1], OscType::Int(0));
    }

    #[test]
    fn test_intensity_message() {
        let msg = build_osc_message("/ctrl", &Notification::Intensity { index: 0, ratio: 0.25 });
        assert_eq!(msg.args, vec![OscType::String("zone0-diff".into()), OscType::Float(0.25)]);
    }

    #[test]
    fn test_encode_osc_message() {
        let msg = build_osc_message("/ctrl", &Notification::Intensity { index: 1, ratio: 0.5 });
        let encoded = encode_osc_message(&msg).unwrap();
        assert!(!encoded.is_empty());
    }

    #[test]
    fn test_closed_sink() {
        let mut sink = OscSink::closed(OSC_DEFAULT_ADDR, OSC_DEFAULT_ADDRESS);
        assert!(!sink.is_open());
        let err = sink.send(&Notification::StateChanged { index: 0, is_on: true });
        assert!(matches!(err, Err(Error::SinkUnavailable(_))));
    }

    #[test]
    fn test_send_over_udp() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(std::time::Duration::from_secs(2)))
            .unwrap();
        let target = receiver.local_addr().unwrap().to_string();

        let mut sink = OscSink::new(&target, "/ctrl").unwrap();
        sink.send(&Notification::StateChanged { index: 5, is_on: true }).unwrap();

        let mut buf = [0u8; 1024];
        let (n, _) = receiver.recv_from(&mut buf).unwrap();
        let (_, packet) = decoder::decode_udp(&buf[..n]).unwrap();
        match packet {
            OscPacket::Message(msg) => {
                assert_eq!(msg.addr, "/ctrl");
                assert_eq!(msg.args, vec![OscType::String("zone5".into()), OscType::Int(1)]);
            }
            other => panic!("unexpected packet: {:?}", other),
        }
    }
}
