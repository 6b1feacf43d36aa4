//! # Aggregator モジュール
//!
//! 人命損失リスク R1 の集計を行う評価エンジンです。
//!
//! 構造物の危険事象頻度（Annex A）、損傷確率（Annex B）、損失（Annex C）を組み合わせ、
//! ゾーンごとのリスク成分を求めて合計し、許容リスクと比較します。
//!
//! ## リスク成分
//!
//! | 成分 | 式 | 発生源 |
//! |------|----|--------|
//! | RA | ND × PA × LA | S1 人への傷害 |
//! | RB | ND × PB × LX | S1 物理的損傷 |
//! | RU | NL × PU × LA | S3 人への傷害 |
//! | RV | NL × PV × LX | S3 物理的損傷 |
//! | RW | NL × PW × LX | S3 内部システム故障 |
//! | RZ | (NI − NL) × PZ × LX | S4 内部システム故障 |
//!
//! 引込線の成分は区間ごとに加算されます。ゾーン間・区間間の寄与は加算のみで結合されるため、
//! ゾーンは並列に評価し、ゾーン順に合計します。
//!
//! ## 使用例
//!
//! ```rust
//! use lprisk::aggregator::RiskAggregator;
//! use lprisk::models::{LocationCategory, LossCategory, Structure, Zone};
//!
//! let mut structure = Structure::new("house", 10.0, 10.0, 5.0, LocationCategory::Isolated)?;
//! structure.add_zone(Zone::new("Z1", LossCategory::Residential, 1.0, 1.0, 8760.0)?)?;
//!
//! let report = RiskAggregator::new(&structure, 4.0).evaluate()?;
//! assert!(!report.is_safe);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::formulas::{
    frequency_near_line_section, frequency_near_structure, frequency_to_line_section,
    frequency_to_structure, ground_flash_density, injury_probability, loss_of_life,
    physical_damage_probability, relative_loss, STANDARD_LINE_TABLES,
};
use crate::models::{LineProbabilityTable, Structure, Zone};

/// R1（人命損失）の許容リスク RT
pub const TOLERABLE_RISK_R1: f64 = 1e-5;

/// 集計エラー
#[derive(Debug, Error)]
pub enum RiskError {
    #[error("ground flash density must be a non-negative finite number (got {0})")]
    InvalidDensity(f64),

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("duplicate zone name: {0}")]
    DuplicateZone(String),
}

/// ゾーンごとのリスク成分
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneRisk {
    pub zone: String,
    pub ra: f64,
    pub rb: f64,
    pub ru: f64,
    pub rv: f64,
    pub rw: f64,
    pub rz: f64,
}

impl ZoneRisk {
    pub fn total(&self) -> f64 {
        self.ra + self.rb + self.ru + self.rv + self.rw + self.rz
    }

    fn components(&self) -> [(&'static str, f64); 6] {
        [
            ("ra", self.ra),
            ("rb", self.rb),
            ("ru", self.ru),
            ("rv", self.rv),
            ("rw", self.rw),
            ("rz", self.rz),
        ]
    }
}

/// 評価結果
#[derive(Debug, Clone)]
pub struct RiskReport {
    pub structure: String,
    /// 構造物への直撃頻度 ND（/年）
    pub nd: f64,
    /// 構造物近傍への落雷頻度 NM（/年）
    pub nm: f64,
    pub tolerable_risk: f64,
    pub zones: Vec<ZoneRisk>,
    pub total_r1: f64,
    pub is_safe: bool,
}

impl RiskReport {
    /// `zone_<name>_<成分>` をキーとする成分値
    pub fn components(&self) -> BTreeMap<String, f64> {
        self.zones
            .iter()
            .flat_map(|z| {
                z.components()
                    .into_iter()
                    .map(move |(key, value)| (format!("zone_{}_{}", z.zone, key), value))
            })
            .collect()
    }

    pub fn component(&self, key: &str) -> Option<f64> {
        self.components().get(key).copied()
    }

    /// 成分値、`total_r1`、`is_safe` を持つフラットなJSONオブジェクト
    pub fn to_json(&self) -> serde_json::Value {
        let mut map: serde_json::Map<String, serde_json::Value> = self
            .components()
            .into_iter()
            .map(|(key, value)| (key, serde_json::Value::from(value)))
            .collect();
        map.insert("total_r1".to_string(), self.total_r1.into());
        map.insert("is_safe".to_string(), self.is_safe.into());
        serde_json::Value::Object(map)
    }
}

/// 引込線1区間の寄与（ゾーンに依存しない部分）
#[derive(Debug, Clone, Copy)]
struct SectionCoupling {
    nl: f64,
    /// max(NI − NL, 0)
    near_excess: f64,
    pu: f64,
    pv: f64,
    pw: f64,
    pz: f64,
}

/// R1 リスク集計器
pub struct RiskAggregator<'a> {
    structure: &'a Structure,
    ground_flash_density: f64,
    include_line_risks: bool,
    line_tables: Option<&'a dyn LineProbabilityTable>,
}

impl<'a> RiskAggregator<'a> {
    /// 大地落雷密度 NG（/km²/年）を指定して集計器を作成します
    ///
    /// 既定では引込線の成分を含め、規格の確率テーブルを使用します。
    pub fn new(structure: &'a Structure, ground_flash_density: f64) -> Self {
        Self {
            structure,
            ground_flash_density,
            include_line_risks: true,
            line_tables: Some(&STANDARD_LINE_TABLES),
        }
    }

    /// 雷雨日数 TD から集計器を作成します
    pub fn from_thunderstorm_days(structure: &'a Structure, thunderstorm_days: f64) -> Self {
        Self::new(structure, ground_flash_density(thunderstorm_days))
    }

    pub fn include_line_risks(mut self, include: bool) -> Self {
        self.include_line_risks = include;
        self
    }

    pub fn with_line_tables(mut self, tables: Option<&'a dyn LineProbabilityTable>) -> Self {
        self.line_tables = tables;
        self
    }

    pub fn ground_flash_density(&self) -> f64 {
        self.ground_flash_density
    }

    /// R1 の全成分を評価します
    pub fn evaluate(&self) -> Result<RiskReport, RiskError> {
        let ng = self.ground_flash_density;
        if !ng.is_finite() || ng < 0.0 {
            return Err(RiskError::InvalidDensity(ng));
        }

        let structure = self.structure;
        let mut names = BTreeSet::new();
        for zone in &structure.zones {
            if !names.insert(zone.name.as_str()) {
                return Err(RiskError::DuplicateZone(zone.name.clone()));
            }
        }

        let nd = frequency_to_structure(structure, ng);
        let nm = frequency_near_structure(structure, ng);
        let pa = injury_probability(structure.tws.as_ref(), structure.touch_protection);
        let pb = physical_damage_probability(structure.lps.as_ref());
        debug!(structure = %structure.name, nd, nm, pa, pb, "構造物の頻度と確率");

        let couplings = self.line_couplings()?;

        let zones: Vec<ZoneRisk> = structure
            .zones
            .par_iter()
            .map(|zone| evaluate_zone(zone, nd, pa, pb, &couplings))
            .collect();

        for zone in &structure.zones {
            if zone.structure != structure.id {
                warn!(
                    zone = %zone.name,
                    owner = zone.structure.as_str(),
                    structure = structure.id.as_str(),
                    "ゾーンの所属構造物が一致しません"
                );
            }
        }

        let total_r1: f64 = zones.iter().map(ZoneRisk::total).sum();
        let is_safe = total_r1 <= TOLERABLE_RISK_R1;

        info!(
            structure = %structure.name,
            total_r1,
            tolerable = TOLERABLE_RISK_R1,
            is_safe,
            "R1 評価完了"
        );

        Ok(RiskReport {
            structure: structure.name.clone(),
            nd,
            nm,
            tolerable_risk: TOLERABLE_RISK_R1,
            zones,
            total_r1,
            is_safe,
        })
    }

    /// 全引込線・全区間の頻度と確率を求めます
    fn line_couplings(&self) -> Result<Vec<SectionCoupling>, RiskError> {
        let structure = self.structure;
        if !self.include_line_risks || structure.lines.is_empty() {
            return Ok(Vec::new());
        }
        let tables = self
            .line_tables
            .ok_or(RiskError::NotImplemented("line probability tables (PU, PV, PW, PZ)"))?;

        let ng = self.ground_flash_density;
        let mut couplings = Vec::new();

        for line in &structure.lines {
            let (pu, pv, pw, pz) = (
                tables.pu(line),
                tables.pv(line),
                tables.pw(line),
                tables.pz(line),
            );
            debug!(line = %line.name, pu, pv, pw, pz, "引込線の確率");

            for (index, section) in line.effective_sections().iter().enumerate() {
                let nl = frequency_to_line_section(section, line, structure, ng);
                let ni = frequency_near_line_section(section, line, ng);
                if ni < nl {
                    warn!(
                        line = %line.name,
                        section = index,
                        ni,
                        nl,
                        "NI < NL: 区間の形状が不整合のため RZ の寄与を 0 とします"
                    );
                }
                debug!(line = %line.name, section = index, nl, ni, "区間の頻度");

                couplings.push(SectionCoupling {
                    nl,
                    near_excess: (ni - nl).max(0.0),
                    pu,
                    pv,
                    pw,
                    pz,
                });
            }
        }

        Ok(couplings)
    }
}

fn evaluate_zone(
    zone: &Zone,
    nd: f64,
    pa: f64,
    pb: f64,
    couplings: &[SectionCoupling],
) -> ZoneRisk {
    let la = zone.surface_reduction
        * loss_of_life(zone.persons_in_zone, zone.persons_total, zone.occupancy_hours);
    let lx = relative_loss(
        zone.loss_type,
        zone.fire_risk_factor(),
        zone.fire_provision,
        zone.hazard_factor,
    );

    let mut risk = ZoneRisk {
        zone: zone.name.clone(),
        ra: nd * pa * la,
        rb: nd * pb * lx,
        ru: 0.0,
        rv: 0.0,
        rw: 0.0,
        rz: 0.0,
    };

    for c in couplings {
        risk.ru += c.nl * c.pu * la;
        risk.rv += c.nl * c.pv * lx;
        risk.rw += c.nl * c.pw * lx;
        risk.rz += c.near_excess * c.pz * lx;
    }

    debug!(zone = %zone.name, la, lx, total = risk.total(), "ゾーン評価");
    risk
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        InstallationCategory, Line, LineSection, LineType, LocationCategory, LossCategory, Lps,
        ProtectionLevel,
    };

    const EPS: f64 = 1e-15;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= EPS.max(1e-9 * a.abs().max(b.abs()))
    }

    fn test_house() -> Structure {
        let mut s = Structure::new("Test House", 10.0, 10.0, 5.0, LocationCategory::Isolated)
            .unwrap();
        s.add_zone(Zone::new("Z1", LossCategory::Residential, 1.0, 1.0, 8760.0).unwrap()).unwrap();
        s
    }

    fn power_line(length: f64) -> Line {
        let mut line = Line::new("Power Line", LineType::Power);
        line.add_section(LineSection::new(length, InstallationCategory::Aerial).unwrap());
        line
    }

    #[test]
    fn test_end_to_end_unprotected_house() {
        let s = test_house();
        let report = RiskAggregator::new(&s, 4.0).evaluate().unwrap();

        let nd = 4.0 * s.collection_area() * 1e-6;
        assert!(close(report.nd, nd));
        assert!(close(report.component("zone_Z1_ra").unwrap(), nd));
        assert!(close(report.component("zone_Z1_rb").unwrap(), nd * 1e-3 * 0.01));
        for key in ["ru", "rv", "rw", "rz"] {
            assert_eq!(report.component(&format!("zone_Z1_{key}")), Some(0.0));
        }
        assert!(report.total_r1 > TOLERABLE_RISK_R1);
        assert!(!report.is_safe);
    }

    #[test]
    fn test_lps_level_one_scales_rb() {
        let unprotected = test_house();
        let mut protected = test_house();
        protected.set_lps(Lps::with_level(ProtectionLevel::LevelI));

        let before = RiskAggregator::new(&unprotected, 4.0).evaluate().unwrap();
        let after = RiskAggregator::new(&protected, 4.0).evaluate().unwrap();

        let rb_before = before.component("zone_Z1_rb").unwrap();
        let rb_after = after.component("zone_Z1_rb").unwrap();
        assert!(close(rb_after, rb_before * 0.02));
        assert!(after.total_r1 < before.total_r1);
    }

    #[test]
    fn test_safe_when_risk_is_low() {
        let mut s = Structure::new("shed", 2.0, 2.0, 2.0, LocationCategory::SurroundedByTaller)
            .unwrap();
        s.add_zone(Zone::new("Z", LossCategory::Residential, 1.0, 10.0, 10.0).unwrap()).unwrap();
        let report = RiskAggregator::new(&s, 1.0).evaluate().unwrap();
        assert!(report.total_r1 <= TOLERABLE_RISK_R1);
        assert!(report.is_safe);
    }

    #[test]
    fn test_line_components() {
        let mut s = test_house();
        s.add_line(power_line(500.0));
        let report = RiskAggregator::new(&s, 4.0).evaluate().unwrap();

        let line = &s.lines[0];
        let section = &line.sections[0];
        let nl = frequency_to_line_section(section, line, &s, 4.0);
        let ni = frequency_near_line_section(section, line, 4.0);
        let lx = 1e-3 * 0.01;

        let z = &report.zones[0];
        assert!(close(z.ru, nl * 1.0 * 1.0));
        assert!(close(z.rv, nl * lx));
        assert!(close(z.rw, nl * lx));
        assert!(close(z.rz, (ni - nl) * 0.6 * lx));
        assert!(close(report.total_r1, z.total()));
    }

    #[test]
    fn test_line_risks_can_be_excluded() {
        let mut s = test_house();
        s.add_line(power_line(500.0));
        let report = RiskAggregator::new(&s, 4.0)
            .include_line_risks(false)
            .with_line_tables(None)
            .evaluate()
            .unwrap();
        let z = &report.zones[0];
        assert_eq!((z.ru, z.rv, z.rw, z.rz), (0.0, 0.0, 0.0, 0.0));
    }

    #[test]
    fn test_missing_line_tables_is_not_implemented() {
        let mut s = test_house();
        s.add_line(power_line(500.0));
        let result = RiskAggregator::new(&s, 4.0).with_line_tables(None).evaluate();
        assert!(matches!(result, Err(RiskError::NotImplemented(_))));

        // 引込線がなければテーブルは不要
        let plain = test_house();
        assert!(RiskAggregator::new(&plain, 4.0).with_line_tables(None).evaluate().is_ok());
    }

    #[test]
    fn test_rz_clamped_when_near_frequency_below_direct() {
        let mut s = test_house();
        let mut line = Line::new("buried", LineType::Power);
        line.add_section(
            LineSection::new(1000.0, InstallationCategory::Buried)
                .unwrap()
                .with_soil_resistivity(25.0e6)
                .unwrap(),
        );
        s.add_line(line);

        let report = RiskAggregator::new(&s, 4.0).evaluate().unwrap();
        let z = &report.zones[0];
        assert_eq!(z.rz, 0.0);
        assert!(z.ru > 0.0);
    }

    #[test]
    fn test_zone_order_does_not_change_total() {
        let mut s = Structure::new("office", 40.0, 20.0, 15.0, LocationCategory::Isolated).unwrap();
        let specs = [
            ("lobby", LossCategory::PublicEntertainment, 30.0, 2000.0),
            ("offices", LossCategory::Commercial, 120.0, 2500.0),
            ("server", LossCategory::Industrial, 2.0, 8760.0),
            ("flat", LossCategory::Residential, 4.0, 6000.0),
        ];
        for (name, loss, nz, tz) in specs {
            s.add_zone(Zone::new(name, loss, nz, 156.0, tz).unwrap()).unwrap();
        }
        s.add_line(power_line(800.0));
        let mut telecom = Line::new("telecom", LineType::Telecom);
        telecom.add_section(LineSection::new(300.0, InstallationCategory::Buried).unwrap());
        telecom.add_section(LineSection::new(700.0, InstallationCategory::Aerial).unwrap());
        s.add_line(telecom);

        let reference = RiskAggregator::new(&s, 2.5).evaluate().unwrap().total_r1;

        let mut reversed = s.clone();
        reversed.zones.reverse();
        reversed.lines.reverse();
        for line in &mut reversed.lines {
            line.sections.reverse();
        }
        let mut rotated = s.clone();
        rotated.zones.rotate_left(2);

        for variant in [reversed, rotated] {
            let total = RiskAggregator::new(&variant, 2.5).evaluate().unwrap().total_r1;
            assert!((total - reference).abs() <= 1e-12 * reference);
        }
    }

    #[test]
    fn test_components_add_up_to_total() {
        let mut s = test_house();
        s.add_zone(Zone::new("Z2", LossCategory::Residential, 1.0, 2.0, 8760.0).unwrap())
            .unwrap();
        s.add_line(power_line(800.0));
        let report = RiskAggregator::new(&s, 4.0).evaluate().unwrap();

        let components = report.components();
        assert_eq!(components.len(), 12);
        assert!(close(components.values().sum::<f64>(), report.total_r1));
    }

    #[test]
    fn test_duplicate_zone_names_rejected() {
        let mut s = test_house();
        let mut twin = Zone::new("Z1", LossCategory::Residential, 1.0, 2.0, 8760.0).unwrap();
        twin.structure = s.id.clone();
        s.zones.push(twin);

        let result = RiskAggregator::new(&s, 4.0).evaluate();
        assert!(matches!(result, Err(RiskError::DuplicateZone(name)) if name == "Z1"));
    }

    #[test]
    fn test_invalid_density_rejected() {
        let s = test_house();
        assert!(matches!(
            RiskAggregator::new(&s, -1.0).evaluate(),
            Err(RiskError::InvalidDensity(_))
        ));
        assert!(RiskAggregator::new(&s, f64::NAN).evaluate().is_err());
    }

    #[test]
    fn test_from_thunderstorm_days() {
        let s = test_house();
        let aggregator = RiskAggregator::from_thunderstorm_days(&s, 40.0);
        assert!((aggregator.ground_flash_density() - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_json_export_keys() {
        let mut s = test_house();
        s.add_zone(Zone::new("Z2", LossCategory::Hospital, 0.0, 1.0, 0.0).unwrap()).unwrap();
        let json = RiskAggregator::new(&s, 4.0).evaluate().unwrap().to_json();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 2 * 6 + 2);
        assert!(object.contains_key("zone_Z2_rz"));
        assert_eq!(object["is_safe"], serde_json::Value::Bool(false));
        assert!(object["total_r1"].as_f64().unwrap() > 0.0);
    }
}
