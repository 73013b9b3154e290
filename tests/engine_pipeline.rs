use std::cell::RefCell;
use std::rc::Rc;

use zone_trigger::config::MotionConfig;
use zone_trigger::frame::Frame;
use zone_trigger::notify::{Notification, NotificationSink, SinkSet};
use zone_trigger::pose::{KeypointName, Pose};
use zone_trigger::zone::{PixelRect, ZoneCommand, ZoneDraft, ZoneRegistry};
use zone_trigger::{Error, ZoneEngine};

const W: u32 = 80;
const H: u32 = 60;

#[derive(Clone, Default)]
struct Recorder {
    received: Rc<RefCell<Vec<Notification>>>,
    closed: bool,
}

impl NotificationSink for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn is_open(&self) -> bool {
        !self.closed
    }

    fn send(&mut self, notification: &Notification) -> zone_trigger::Result<()> {
        self.received.borrow_mut().push(*notification);
        Ok(())
    }
}

/// 両目 33px → 0.1 cm/px、左目 (20, 20)
fn pose() -> Pose {
    Pose::default()
        .with(KeypointName::LeftEye, 20.0, 20.0, 0.9)
        .with(KeypointName::RightEye, 53.0, 20.0, 0.9)
}

/// 左目基準 (+0.5, +0.5)cm, 1x1cm → 矩形 (25, 25, 10, 10)
fn draft() -> ZoneDraft {
    ZoneDraft::anchored(KeypointName::LeftEye).offset(0.5, 0.5).size(1.0, 1.0)
}

/// ゾーン内の先頭 n ピクセルだけ明るいフレーム
fn frame_with_bright(n: usize) -> Vec<u8> {
    let mut buf = vec![0u8; (W * H * 4) as usize];
    for k in 0..n {
        let x = 25 + (k % 10) as u32;
        let y = 25 + (k / 10) as u32;
        let i = ((y * W + x) * 4) as usize;
        buf[i..i + 3].copy_from_slice(&[255, 255, 255]);
    }
    buf
}

fn engine_with(recorder: &Recorder, count_threshold: u32) -> ZoneEngine {
    let config = MotionConfig {
        motion_count_threshold: count_threshold,
        ..MotionConfig::default()
    };
    let mut sinks = SinkSet::new();
    sinks.push(recorder.clone());
    ZoneEngine::new(&config, ZoneRegistry::with_seed(3), sinks)
}

#[test]
fn test_trigger_sequence_through_pipeline() {
    let recorder = Recorder::default();
    let mut engine = engine_with(&recorder, 50);
    engine.apply(ZoneCommand::Add(draft())).unwrap();

    // 明るいピクセル集合を 0 → 10 → 70 → 10 → 50 と変え、差分 [10, 60, 60, 40] を作る
    let seed = frame_with_bright(0);
    engine.tick(&[pose()], &Frame::new(W, H, &seed).unwrap());
    assert_eq!(engine.registry().tracked()[0].state.rect, PixelRect::new(25, 25, 10, 10));
    assert_eq!(engine.registry().tracked()[0].state.motion_count, 0);

    let mut per_tick = Vec::new();
    for bright in [10, 70, 10, 50] {
        let buf = frame_with_bright(bright);
        let notifications = engine.tick(&[pose()], &Frame::new(W, H, &buf).unwrap()).notifications.to_vec();
        per_tick.push((engine.registry().tracked()[0].state.motion_count, notifications));
    }

    let counts: Vec<u32> = per_tick.iter().map(|(c, _)| *c).collect();
    assert_eq!(counts, vec![10, 60, 60, 40]);

    assert!(per_tick[0].1.is_empty());
    assert_eq!(
        per_tick[1].1,
        vec![
            Notification::StateChanged { index: 0, is_on: true },
            Notification::Intensity { index: 0, ratio: 0.6 },
        ]
    );
    assert_eq!(per_tick[2].1, vec![Notification::Intensity { index: 0, ratio: 0.6 }]);
    assert_eq!(per_tick[3].1, vec![Notification::StateChanged { index: 0, is_on: false }]);

    let received = recorder.received.borrow();
    let ons = received
        .iter()
        .filter(|n| matches!(n, Notification::StateChanged { is_on: true, .. }))
        .count();
    let offs = received
        .iter()
        .filter(|n| matches!(n, Notification::StateChanged { is_on: false, .. }))
        .count();
    assert_eq!((ons, offs), (1, 1));
}

#[test]
fn test_closed_sink_never_receives() {
    let recorder = Recorder {
        closed: true,
        ..Recorder::default()
    };
    let mut engine = engine_with(&recorder, 1);
    engine.apply(ZoneCommand::Add(draft())).unwrap();

    let dark = frame_with_bright(0);
    let bright = frame_with_bright(100);
    engine.tick(&[pose()], &Frame::new(W, H, &dark).unwrap());
    let report = engine.tick(&[pose()], &Frame::new(W, H, &bright).unwrap());

    assert_eq!(report.notifications.len(), 2);
    assert!(recorder.received.borrow().is_empty());
}

#[test]
fn test_only_first_pose_is_used() {
    let recorder = Recorder::default();
    let mut engine = engine_with(&recorder, 50);
    engine.apply(ZoneCommand::Add(draft())).unwrap();

    let other = Pose::default()
        .with(KeypointName::LeftEye, 60.0, 40.0, 0.9)
        .with(KeypointName::RightEye, 70.0, 40.0, 0.9);
    let buf = frame_with_bright(0);
    engine.tick(&[pose(), other], &Frame::new(W, H, &buf).unwrap());
    assert_eq!(engine.registry().tracked()[0].state.rect, PixelRect::new(25, 25, 10, 10));
}

#[test]
fn test_failed_import_keeps_running_state() {
    let recorder = Recorder::default();
    let mut engine = engine_with(&recorder, 50);
    engine.apply(ZoneCommand::Add(draft())).unwrap();
    let buf = frame_with_bright(0);
    engine.tick(&[pose()], &Frame::new(W, H, &buf).unwrap());

    let before = engine.registry().tracked().to_vec();
    let err = engine.apply(ZoneCommand::Import("[]".into())).unwrap_err();
    assert!(matches!(err, Error::DataFormat(_)));
    assert_eq!(engine.registry().tracked(), before.as_slice());
}

#[test]
fn test_export_import_between_engines() {
    let recorder = Recorder::default();
    let mut source = engine_with(&recorder, 50);
    source.apply(ZoneCommand::Add(draft())).unwrap();
    source
        .apply(ZoneCommand::Add(ZoneDraft::anchored(KeypointName::Nose).offset(-3.0, 2.5)))
        .unwrap();
    let text = source.registry().serialize().unwrap();

    let mut target = engine_with(&recorder, 50);
    target.apply(ZoneCommand::Import(text)).unwrap();
    let a: Vec<_> = source.registry().zones().cloned().collect();
    let b: Vec<_> = target.registry().zones().cloned().collect();
    assert_eq!(a, b);
}
