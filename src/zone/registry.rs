use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

use super::{TrackedZone, Zone, ZoneDraft, DEFAULT_ZONE_SIZE_CM};
use crate::error::{Error, Result};
use crate::pose::KeypointName;

/// 割り当てない ID。next_id の上限を兼ねる
const RESERVED_ID: u32 = u32::MAX;

/// 操作パネルなどから届くゾーン編集コマンド
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneCommand {
    Add(ZoneDraft),
    Remove(u32),
    /// 確認は呼び出し側で行う
    RemoveAll,
    /// JSON を読み込んで全置換
    Import(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Added(Zone),
    Removed(Zone),
    Cleared(usize),
    Imported(usize),
}

/// ゾーン定義と実行時状態を登録順に保持する
pub struct ZoneRegistry {
    zones: Vec<TrackedZone>,
    next_id: u32,
    rng: StdRng,
}

impl ZoneRegistry {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// アンカーのランダム選択を再現可能にする
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            zones: Vec::new(),
            next_id: 1,
            rng,
        }
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter().map(|t| &t.zone)
    }

    pub fn get(&self, id: u32) -> Option<&TrackedZone> {
        self.zones.iter().find(|t| t.zone.id == id)
    }

    /// レジストリ内の位置（通知の zone index）
    pub fn position(&self, id: u32) -> Option<usize> {
        self.zones.iter().position(|t| t.zone.id == id)
    }

    pub fn tracked(&self) -> &[TrackedZone] {
        &self.zones
    }

    pub fn tracked_mut(&mut self) -> &mut [TrackedZone] {
        &mut self.zones
    }

    /// 未指定項目を埋めて追加。アンカー未指定ならランダムに選ぶ
    ///
    /// ID を使い切った場合は `IdsExhausted`
    pub fn add(&mut self, draft: ZoneDraft) -> Result<Zone> {
        if self.next_id == RESERVED_ID {
            return Err(Error::IdsExhausted);
        }
        let relative_to = draft.relative_to.unwrap_or_else(|| {
            KeypointName::ALL[self.rng.gen_range(0..KeypointName::COUNT)]
        });
        let zone = Zone {
            id: self.next_id,
            relative_to,
            offset_x: draft.offset_x.unwrap_or(0.0),
            offset_y: draft.offset_y.unwrap_or(0.0),
            width: draft.width.unwrap_or(DEFAULT_ZONE_SIZE_CM).max(0.0),
            height: draft.height.unwrap_or(DEFAULT_ZONE_SIZE_CM).max(0.0),
            absolute: draft.absolute,
        };
        self.next_id += 1;
        log::info!("add zone {} ({} {:+.1},{:+.1} {}x{}cm)",
            zone.id, zone.relative_to, zone.offset_x, zone.offset_y, zone.width, zone.height);
        self.zones.push(TrackedZone::new(zone.clone()));
        Ok(zone)
    }

    pub fn remove(&mut self, id: u32) -> Result<Zone> {
        let pos = self.position(id).ok_or(Error::ZoneNotFound(id))?;
        let removed = self.zones.remove(pos).zone;
        log::info!("remove zone {}", id);
        Ok(removed)
    }

    /// 全削除。削除した数を返す
    pub fn remove_all(&mut self) -> usize {
        let n = self.zones.len();
        self.zones.clear();
        if n > 0 {
            log::info!("removed all {} zones", n);
        }
        n
    }

    /// 全ゾーンを置き換える。検証に失敗した場合は何も変更しない
    ///
    /// 実行時状態はリセットされる。ID カウンタは取り込んだ最大 ID より先に進める
    pub fn replace_all(&mut self, zones: Vec<Zone>) -> Result<()> {
        validate(&zones)?;
        let max_id = zones.iter().map(|z| z.id).max().unwrap_or(0);
        let replaced: Vec<TrackedZone> = zones.into_iter().map(TrackedZone::new).collect();
        self.zones = replaced;
        // validate 済みなので max_id < RESERVED_ID
        self.next_id = self.next_id.max(max_id + 1);
        log::info!("imported {} zones", self.zones.len());
        Ok(())
    }

    /// ゾーン定義（実行時状態は含まない）を JSON 配列に
    pub fn serialize(&self) -> Result<String> {
        let defs: Vec<&Zone> = self.zones().collect();
        Ok(serde_json::to_string_pretty(&defs)?)
    }

    /// JSON 配列をゾーン定義に。空・不正な値は DataFormat エラー
    pub fn deserialize(text: &str) -> Result<Vec<Zone>> {
        let zones: Vec<Zone> = serde_json::from_str(text)?;
        validate(&zones)?;
        Ok(zones)
    }

    pub fn import(&mut self, text: &str) -> Result<usize> {
        let zones = Self::deserialize(text)?;
        self.replace_all(zones)?;
        Ok(self.zones.len())
    }

    pub fn apply(&mut self, command: ZoneCommand) -> Result<CommandOutcome> {
        match command {
            ZoneCommand::Add(draft) => self.add(draft).map(CommandOutcome::Added),
            ZoneCommand::Remove(id) => self.remove(id).map(CommandOutcome::Removed),
            ZoneCommand::RemoveAll => Ok(CommandOutcome::Cleared(self.remove_all())),
            ZoneCommand::Import(text) => self.import(&text).map(CommandOutcome::Imported),
        }
    }
}

impl Default for ZoneRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(zones: &[Zone]) -> Result<()> {
    if zones.is_empty() {
        return Err(Error::DataFormat("zone list is empty".into()));
    }
    let mut seen = HashSet::with_capacity(zones.len());
    for zone in zones {
        if zone.id == RESERVED_ID {
            return Err(Error::DataFormat(format!("zone id {} is reserved", zone.id)));
        }
        if !seen.insert(zone.id) {
            return Err(Error::DataFormat(format!("duplicate zone id {}", zone.id)));
        }
        let values = [zone.offset_x, zone.offset_y, zone.width, zone.height];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::DataFormat(format!("zone {} has non-finite values", zone.id)));
        }
        if zone.width < 0.0 || zone.height < 0.0 {
            return Err(Error::DataFormat(format!("zone {} has negative size", zone.id)));
        }
    }
    Ok(())
}
