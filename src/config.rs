use anyhow::Result;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub osc: OscConfig,
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub zones: ZonesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MotionConfig {
    /// 両目の実距離（センチメートル）
    #[serde(default = "default_known_eye_distance_cm")]
    pub known_eye_distance_cm: f32,
    /// ピクセル差分の閾値 (0.0〜1.0)
    #[serde(default = "default_motion_threshold")]
    pub motion_threshold: f32,
    /// トリガーに必要な動きピクセル数
    #[serde(default = "default_motion_count_threshold")]
    pub motion_count_threshold: u32,
    /// キーポイント信頼度閾値
    #[serde(default = "default_keypoint_confidence")]
    pub keypoint_confidence: f32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OscConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 送信先 (host:port)
    #[serde(default = "default_osc_addr")]
    pub addr: String,
    /// OSCアドレスパターン
    #[serde(default = "default_osc_address")]
    pub address: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MidiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// MIDIチャンネル (1〜16)
    #[serde(default = "default_midi_channel")]
    pub channel: u8,
    /// ゾーン0のノート番号
    #[serde(default = "default_base_note")]
    pub base_note: u8,
    /// ゾーン0のコントロールチェンジ番号
    #[serde(default = "default_base_controller")]
    pub base_controller: u8,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ZonesConfig {
    /// 起動時に左目基準のデフォルトゾーンを1つ追加する
    #[serde(default = "default_true")]
    pub seed_default: bool,
}

fn default_known_eye_distance_cm() -> f32 { 3.3 }
fn default_motion_threshold() -> f32 { 0.3 }
fn default_motion_count_threshold() -> u32 { 50 }
fn default_keypoint_confidence() -> f32 { 0.5 }
fn default_true() -> bool { true }
fn default_osc_addr() -> String { "127.0.0.1:6010".to_string() }
fn default_osc_address() -> String { "/ctrl".to_string() }
fn default_midi_channel() -> u8 { 1 }
fn default_base_note() -> u8 { 36 }
fn default_base_controller() -> u8 { 20 }

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            known_eye_distance_cm: default_known_eye_distance_cm(),
            motion_threshold: default_motion_threshold(),
            motion_count_threshold: default_motion_count_threshold(),
            keypoint_confidence: default_keypoint_confidence(),
        }
    }
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            addr: default_osc_addr(),
            address: default_osc_address(),
        }
    }
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel: default_midi_channel(),
            base_note: default_base_note(),
            base_controller: default_base_controller(),
        }
    }
}

impl Default for ZonesConfig {
    fn default() -> Self {
        Self { seed_default: true }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 読み込めなければデフォルト値
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("{} not found, using defaults", path.display());
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;

        if !(0.0..=1.0).contains(&self.motion.motion_threshold) {
            return Err(Error::Config(format!(
                "motion_threshold must be within 0..1, got {}",
                self.motion.motion_threshold
            )));
        }
        if !(self.motion.known_eye_distance_cm > 0.0) {
            return Err(Error::Config(format!(
                "known_eye_distance_cm must be positive, got {}",
                self.motion.known_eye_distance_cm
            )));
        }
        if !(1..=16).contains(&self.midi.channel) {
            return Err(Error::Config(format!(
                "midi channel must be within 1..16, got {}",
                self.midi.channel
            )));
        }
        Ok(())
    }
}
