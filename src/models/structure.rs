use std::f64::consts::PI;

use crate::models::{
    common::{
        LocationCategory, ModelError, StructureId, TouchProtection, location_coefficient,
        require_non_negative, require_positive,
    },
    line::Line,
    protection::{Lps, Shielding, SpdSystem, Tws},
    zone::Zone,
};

/// 構造物周囲の近傍落雷領域の幅（m）
pub const NEAR_STRUCTURE_BUFFER_M: f64 = 250.0;

/// 評価対象の構造物
///
/// ゾーンと引込線を所有します。ゾーンと引込線は `StructureId` で
/// 所属構造物を参照するだけで、構造物を所有しません。
#[derive(Debug, Clone)]
pub struct Structure {
    pub id: StructureId,
    pub name: String,
    /// 長さ L（m）
    pub length: f64,
    /// 幅 W（m）
    pub width: f64,
    /// 高さ H（m）
    pub height: f64,
    pub location: LocationCategory,
    /// 屋上突出物の高さ（m）
    pub protrusions: Vec<f64>,
    /// 図面解析などから得た捕捉面積 AD（m²）
    pub manual_collection_area: Option<f64>,
    /// 近傍面積 AM（m²）の上書き値
    pub manual_near_area: Option<f64>,
    pub lps: Option<Lps>,
    pub tws: Option<Tws>,
    pub spd: Option<SpdSystem>,
    pub shielding: Option<Shielding>,
    pub touch_protection: TouchProtection,
    pub zones: Vec<Zone>,
    pub lines: Vec<Line>,
}

impl Structure {
    pub fn new(
        name: impl Into<String>,
        length: f64,
        width: f64,
        height: f64,
        location: LocationCategory,
    ) -> Result<Self, ModelError> {
        let name = name.into();
        Ok(Self {
            id: StructureId::from(name.as_str()),
            name,
            length: require_positive("length", length)?,
            width: require_positive("width", width)?,
            height: require_positive("height", height)?,
            location,
            protrusions: Vec::new(),
            manual_collection_area: None,
            manual_near_area: None,
            lps: None,
            tws: None,
            spd: None,
            shielding: None,
            touch_protection: TouchProtection::None,
            zones: Vec::new(),
            lines: Vec::new(),
        })
    }

    /// 立地係数 CD
    pub fn location_coefficient(&self) -> f64 {
        location_coefficient(self.location)
    }

    pub fn set_lps(&mut self, lps: Lps) {
        self.lps = Some(lps);
    }

    pub fn set_tws(&mut self, tws: Tws) {
        self.tws = Some(tws);
    }

    pub fn set_spd(&mut self, spd: SpdSystem) {
        self.spd = Some(spd);
    }

    pub fn set_shielding(&mut self, shielding: Shielding) {
        self.shielding = Some(shielding);
    }

    pub fn set_touch_protection(&mut self, protection: TouchProtection) {
        self.touch_protection = protection;
    }

    /// 屋上突出物を追加します
    pub fn add_protrusion(&mut self, height: f64) -> Result<(), ModelError> {
        self.protrusions.push(require_positive("protrusion height", height)?);
        Ok(())
    }

    pub fn set_collection_area(&mut self, area: f64) -> Result<(), ModelError> {
        self.manual_collection_area = Some(require_non_negative("collection area", area)?);
        Ok(())
    }

    pub fn set_near_area(&mut self, area: f64) -> Result<(), ModelError> {
        self.manual_near_area = Some(require_non_negative("near area", area)?);
        Ok(())
    }

    /// ゾーンを追加し、所属構造物の参照を設定します
    ///
    /// ゾーン名は評価結果のキーになるため、構造物内で一意でなければなりません。
    pub fn add_zone(&mut self, mut zone: Zone) -> Result<(), ModelError> {
        if self.zones.iter().any(|z| z.name == zone.name) {
            return Err(ModelError::DuplicateZone(zone.name));
        }
        zone.structure = self.id.clone();
        self.zones.push(zone);
        Ok(())
    }

    /// 引込線を追加し、所属構造物の参照を設定します
    pub fn add_line(&mut self, mut line: Line) {
        line.structure = self.id.clone();
        self.lines.push(line);
    }

    /// 直撃の捕捉面積 AD（m²）
    ///
    /// 基本高さと全突出物高さのうち最大の面積を採用します（保守的評価）。
    pub fn collection_area(&self) -> f64 {
        if let Some(area) = self.manual_collection_area {
            return area;
        }

        self.protrusions
            .iter()
            .map(|&h| self.area_from_height(h))
            .fold(self.area_from_height(self.height), f64::max)
    }

    /// 近傍落雷の面積 AM（m²）
    pub fn near_area(&self) -> f64 {
        if let Some(area) = self.manual_near_area {
            return area;
        }

        let d = NEAR_STRUCTURE_BUFFER_M;
        self.length * self.width + 2.0 * d * (self.length + self.width) + PI * d.powi(2)
    }

    /// 矩形構造物の捕捉面積
    fn area_from_height(&self, h: f64) -> f64 {
        self.length * self.width + 6.0 * h * (self.length + self.width) + PI * (3.0 * h).powi(2)
    }
}
