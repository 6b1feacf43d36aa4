use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::formulas::{ground_flash_density, induced_failure_probability, internal_failure_probability};
use crate::models::{
    Environment, FireRisk, InstallationCategory, InternalSystem, LightningSource, Line,
    LineSection, LineShielding, LineType, LocationCategory, LossCategory, Lps, ModelError,
    ProtectionLevel, Shielding, SpdSystem, Structure, TouchProtection, Tws, Zone,
    line::{DEFAULT_LINE_HEIGHT_M, DEFAULT_SOIL_RESISTIVITY, DEFAULT_WITHSTAND_VOLTAGE_KV},
};

/// シナリオメタデータ
#[derive(Debug, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// 評価条件
#[derive(Debug, Deserialize, Serialize)]
pub struct AssessmentConfig {
    /// 大地落雷密度 NG（/km²/年）
    pub ground_flash_density: Option<f64>,
    /// 雷雨日数 TD（NG 未指定時に換算）
    pub thunderstorm_days: Option<f64>,
    #[serde(default = "default_true")]
    pub include_line_risks: bool,
}

fn default_true() -> bool {
    true
}

/// 構造物設定
#[derive(Debug, Deserialize, Serialize)]
pub struct StructureConfig {
    pub name: String,
    pub length_m: f64,
    pub width_m: f64,
    pub height_m: f64,
    #[serde(default)]
    pub location: LocationCategory,
    #[serde(default)]
    pub protrusions_m: Vec<f64>,
    pub collection_area_m2: Option<f64>,
    pub near_area_m2: Option<f64>,
    #[serde(default)]
    pub touch_protection: TouchProtection,
}

/// 保護設備設定
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ProtectionConfig {
    pub lps: Option<LpsConfig>,
    pub tws: Option<TwsConfig>,
    pub spd: Option<SpdSystem>,
    pub shielding: Option<ShieldingConfig>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LpsConfig {
    pub level: Option<ProtectionLevel>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TwsConfig {
    #[serde(default = "default_true")]
    pub active: bool,
    pub failure_to_warn: f64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ShieldingConfig {
    pub ks1: f64,
    pub ks2: f64,
    #[serde(default = "default_withstand_voltage")]
    pub withstand_voltage_kv: f64,
}

fn default_withstand_voltage() -> f64 {
    DEFAULT_WITHSTAND_VOLTAGE_KV
}

/// ゾーン設定
#[derive(Debug, Deserialize, Serialize)]
pub struct ZoneConfig {
    pub name: String,
    #[serde(default)]
    pub loss_type: LossCategory,
    #[serde(default)]
    pub fire_risk: FireRisk,
    #[serde(default = "default_factor")]
    pub fire_provision: f64,
    #[serde(default = "default_factor")]
    pub surface_reduction: f64,
    #[serde(default = "default_factor")]
    pub hazard_factor: f64,
    pub persons_in_zone: f64,
    pub persons_total: f64,
    pub occupancy_hours: f64,
    #[serde(default)]
    pub systems: Vec<SystemConfig>,
}

fn default_factor() -> f64 {
    1.0
}

/// 内部システム設定（確率未指定時は構造物の保護設備から導出）
#[derive(Debug, Deserialize, Serialize)]
pub struct SystemConfig {
    pub name: String,
    pub pc: Option<f64>,
    pub pm: Option<f64>,
}

/// 引込線設定
#[derive(Debug, Deserialize, Serialize)]
pub struct LineConfig {
    pub name: String,
    #[serde(rename = "type", default)]
    pub line_type: LineType,
    #[serde(default)]
    pub shielding: LineShielding,
    pub shield_resistance_ohm_km: Option<f64>,
    #[serde(default = "default_withstand_voltage")]
    pub withstand_voltage_kv: f64,
    pub spd: Option<SpdSystem>,
    #[serde(default)]
    pub touch_protection: TouchProtection,
    #[serde(default)]
    pub sections: Vec<SectionConfig>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SectionConfig {
    pub length_m: f64,
    #[serde(default)]
    pub installation: InstallationCategory,
    #[serde(default = "default_line_height")]
    pub height_m: f64,
    #[serde(default = "default_soil_resistivity")]
    pub soil_resistivity_ohm_m: f64,
    #[serde(default)]
    pub environment: Environment,
}

fn default_line_height() -> f64 {
    DEFAULT_LINE_HEIGHT_M
}

fn default_soil_resistivity() -> f64 {
    DEFAULT_SOIL_RESISTIVITY
}

/// 完全なシナリオ設定
#[derive(Debug, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub assessment: AssessmentConfig,
    pub structure: StructureConfig,
    #[serde(default)]
    pub protection: ProtectionConfig,
    pub zones: Vec<ZoneConfig>,
    #[serde(default)]
    pub lines: Vec<LineConfig>,
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ScenarioError::Io(path.to_path_buf(), e))?;

        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::Parse(path.to_path_buf(), e))?;

        config.validate()?;

        Ok(config)
    }

    /// YAML文字列からシナリオ設定を読み込み
    pub fn from_yaml_str(contents: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = serde_yaml::from_str(contents)
            .map_err(|e| ScenarioError::Parse(PathBuf::from("<string>"), e))?;
        config.validate()?;
        Ok(config)
    }

    /// 設定の基本的な検証
    ///
    /// 寸法や人数などの値域はモデル構築時に検証されます。
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let density = self.ground_flash_density()?;
        if !density.is_finite() || density < 0.0 {
            return Err(ScenarioError::Validation(format!(
                "ground flash density must be non-negative (got {})",
                density
            )));
        }

        if self.zones.is_empty() {
            return Err(ScenarioError::Validation("at least one zone is required".to_string()));
        }

        let mut names = std::collections::HashSet::new();
        for zone in &self.zones {
            if !names.insert(zone.name.as_str()) {
                return Err(ScenarioError::Validation(format!(
                    "duplicate zone name: {}",
                    zone.name
                )));
            }
        }

        Ok(())
    }

    /// 大地落雷密度 NG。未指定なら雷雨日数から換算します。
    pub fn ground_flash_density(&self) -> Result<f64, ScenarioError> {
        match (self.assessment.ground_flash_density, self.assessment.thunderstorm_days) {
            (Some(ng), _) => Ok(ng),
            (None, Some(td)) => Ok(ground_flash_density(td)),
            (None, None) => Err(ScenarioError::Validation(
                "either ground_flash_density or thunderstorm_days must be set".to_string(),
            )),
        }
    }

    /// 設定からドメインモデルを構築
    pub fn build_structure(&self) -> Result<Structure, ScenarioError> {
        let cfg = &self.structure;
        let mut structure =
            Structure::new(cfg.name.clone(), cfg.length_m, cfg.width_m, cfg.height_m, cfg.location)?;

        for &h in &cfg.protrusions_m {
            structure.add_protrusion(h)?;
        }
        if let Some(area) = cfg.collection_area_m2 {
            structure.set_collection_area(area)?;
        }
        if let Some(area) = cfg.near_area_m2 {
            structure.set_near_area(area)?;
        }
        structure.set_touch_protection(cfg.touch_protection);

        let protection = &self.protection;
        if let Some(lps) = &protection.lps {
            structure.set_lps(Lps::new(lps.level));
        }
        if let Some(tws) = &protection.tws {
            structure.set_tws(Tws::new(tws.active, tws.failure_to_warn)?);
        }
        if let Some(spd) = protection.spd {
            structure.set_spd(spd);
        }
        if let Some(s) = &protection.shielding {
            structure.set_shielding(Shielding::new(s.ks1, s.ks2, s.withstand_voltage_kv)?);
        }

        for zone_cfg in &self.zones {
            let zone = build_zone(zone_cfg, &structure)?;
            structure.add_zone(zone)?;
        }

        for line_cfg in &self.lines {
            structure.add_line(build_line(line_cfg)?);
        }

        Ok(structure)
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== 評価条件 ===");
        match self.ground_flash_density() {
            Ok(ng) => println!("大地落雷密度 NG: {:.2} /km²/年", ng),
            Err(e) => println!("大地落雷密度 NG: 未設定 ({})", e),
        }
        println!(
            "引込線成分: {}",
            if self.assessment.include_line_risks { "含む" } else { "含まない" }
        );
        println!();

        let s = &self.structure;
        println!("=== 構造物 ===");
        println!("名前: {}", s.name);
        println!("寸法: {:.1} × {:.1} × {:.1} m", s.length_m, s.width_m, s.height_m);
        println!("立地: {:?}", s.location);
        println!("突出物: {}個", s.protrusions_m.len());
        let lps = self
            .protection
            .lps
            .as_ref()
            .and_then(|l| l.level)
            .map_or("なし".to_string(), |l| format!("{:?}", l));
        println!("LPS: {}", lps);
        println!();

        println!("=== ゾーン ===");
        for zone in &self.zones {
            println!(
                "  {}: {:?} ({}/{}人, {:.0}時間/年)",
                zone.name, zone.loss_type, zone.persons_in_zone, zone.persons_total, zone.occupancy_hours
            );
        }
        println!();

        println!("=== 引込線 ===");
        println!("引込線数: {}", self.lines.len());
        for line in &self.lines {
            let length: f64 = line.sections.iter().map(|s| s.length_m).sum();
            println!("  {}: {:?} ({}区間, {:.0}m)", line.name, line.line_type, line.sections.len(), length);
        }
        println!();

        println!("=== 構築モデル ===");
        let structure = match self.build_structure() {
            Ok(structure) => structure,
            Err(e) => {
                println!("構築エラー: {}", e);
                return;
            }
        };
        for zone in &structure.zones {
            println!(
                "  ゾーン {}: 在室確率 {:.3}, PC {:.3}, PM {:.3} ({}システム)",
                zone.name,
                zone.presence_probability(),
                zone.aggregated_pc(),
                zone.aggregated_pm(),
                zone.systems.len()
            );
        }
        for line in &structure.lines {
            println!(
                "  引込線 {}: 評価長 {:.0}m, 最大大地抵抗率 {:.0}Ωm",
                line.name,
                line.total_length(),
                line.worst_case_resistivity()
            );
        }
    }
}

fn build_zone(cfg: &ZoneConfig, structure: &Structure) -> Result<Zone, ModelError> {
    let mut zone = Zone::new(
        cfg.name.clone(),
        cfg.loss_type,
        cfg.persons_in_zone,
        cfg.persons_total,
        cfg.occupancy_hours,
    )?
    .with_fire_risk(cfg.fire_risk)
    .with_fire_provision(cfg.fire_provision)?
    .with_surface_reduction(cfg.surface_reduction)?
    .with_hazard_factor(cfg.hazard_factor)?;

    let default_pc = internal_failure_probability(structure.spd.as_ref(), LightningSource::S1);
    let default_pm = structure.shielding.map_or(1.0, |s| {
        induced_failure_probability(s.ks1, s.ks2, s.withstand_voltage_kv)
    });

    for system in &cfg.systems {
        zone.add_system(InternalSystem::new(
            system.name.clone(),
            system.pc.unwrap_or(default_pc),
            system.pm.unwrap_or(default_pm),
        )?);
    }

    Ok(zone)
}

fn build_line(cfg: &LineConfig) -> Result<Line, ModelError> {
    let mut line = Line::new(cfg.name.clone(), cfg.line_type)
        .with_shielding(cfg.shielding, cfg.shield_resistance_ohm_km)?
        .with_withstand_voltage(cfg.withstand_voltage_kv)?
        .with_touch_protection(cfg.touch_protection);
    if let Some(spd) = cfg.spd {
        line = line.with_spd(spd);
    }

    for section in &cfg.sections {
        line.add_section(
            LineSection::new(section.length_m, section.installation)?
                .with_height(section.height_m)?
                .with_soil_resistivity(section.soil_resistivity_ohm_m)?
                .with_environment(section.environment),
        );
    }

    Ok(line)
}

/// シナリオ読み込みエラー
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("シナリオファイルが見つかりません: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("ファイル読み込みエラー {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("YAML解析エラー {}: {}", .0.display(), .1)]
    Parse(PathBuf, #[source] serde_yaml::Error),

    #[error("設定検証エラー: {0}")]
    Validation(String),

    #[error("入力値エラー: {0}")]
    Model(#[from] ModelError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::RiskAggregator;

    const HOUSE: &str = r#"
meta:
  name: Test House
assessment:
  ground_flash_density: 4.0
structure:
  name: Test House
  length_m: 10
  width_m: 10
  height_m: 5
  location: isolated
zones:
  - name: Z1
    loss_type: residential
    fire_risk: ordinary
    persons_in_zone: 1
    persons_total: 1
    occupancy_hours: 8760
"#;

    #[test]
    fn test_parse_minimal_scenario() {
        let config = ScenarioConfig::from_yaml_str(HOUSE).unwrap();
        assert_eq!(config.meta.version, "1.0");
        assert!(config.assessment.include_line_risks);
        assert_eq!(config.ground_flash_density().unwrap(), 4.0);

        let structure = config.build_structure().unwrap();
        assert_eq!(structure.zones.len(), 1);
        assert_eq!(structure.zones[0].structure, structure.id);
        assert!(structure.lps.is_none());
        assert!(structure.manual_near_area.is_none());
    }

    #[test]
    fn test_scenario_evaluates_end_to_end() {
        let config = ScenarioConfig::from_yaml_str(HOUSE).unwrap();
        let structure = config.build_structure().unwrap();
        let report = RiskAggregator::new(&structure, config.ground_flash_density().unwrap())
            .evaluate()
            .unwrap();
        assert!(!report.is_safe);
    }

    #[test]
    fn test_thunderstorm_days_conversion() {
        let yaml = HOUSE.replace("ground_flash_density: 4.0", "thunderstorm_days: 25");
        let config = ScenarioConfig::from_yaml_str(&yaml).unwrap();
        assert!((config.ground_flash_density().unwrap() - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_missing_density_is_validation_error() {
        let yaml = HOUSE.replace("  ground_flash_density: 4.0\n", "  include_line_risks: false\n");
        assert!(matches!(
            ScenarioConfig::from_yaml_str(&yaml),
            Err(ScenarioError::Validation(_))
        ));
    }

    #[test]
    fn test_invalid_dimension_surfaces_model_error() {
        let yaml = HOUSE.replace("height_m: 5", "height_m: 0");
        let config = ScenarioConfig::from_yaml_str(&yaml).unwrap();
        assert!(matches!(
            config.build_structure(),
            Err(ScenarioError::Model(ModelError::NonPositive { .. }))
        ));
    }

    #[test]
    fn test_invalid_zone_values_rejected_at_build() {
        let cases = [
            ("persons_total: 1", "persons_total: 0"),
            ("occupancy_hours: 8760", "occupancy_hours: 99999"),
            ("fire_risk: ordinary", "fire_risk: ordinary\n    fire_provision: 5"),
        ];
        for (from, to) in cases {
            let yaml = HOUSE.replace(from, to);
            let config = ScenarioConfig::from_yaml_str(&yaml).unwrap();
            assert!(
                matches!(config.build_structure(), Err(ScenarioError::Model(_))),
                "{to}"
            );
        }
    }

    #[test]
    fn test_unrecognized_categories_from_yaml() {
        let yaml = format!(
            "{}{}",
            HOUSE.replace("loss_type: residential", "loss_type: warehouse"),
            "protection:\n  lps:\n    level: V\n"
        );
        let config = ScenarioConfig::from_yaml_str(&yaml).unwrap();
        let structure = config.build_structure().unwrap();
        assert_eq!(structure.zones[0].loss_type, LossCategory::Unrecognized);
        assert_eq!(
            structure.lps.and_then(|l| l.level),
            Some(ProtectionLevel::Unrecognized)
        );
    }

    #[test]
    fn test_system_probabilities_derived_from_protection() {
        let yaml = format!(
            "{}{}",
            HOUSE,
            r#"    systems:
      - name: explicit
        pc: 0.5
        pm: 0.25
      - name: derived
protection:
  spd:
    level: II
    coordinated: true
  shielding:
    ks1: 1.0
    ks2: 1.0
    withstand_voltage_kv: 2.535
"#
        );
        let config = ScenarioConfig::from_yaml_str(&yaml).unwrap();
        let structure = config.build_structure().unwrap();
        let systems = &structure.zones[0].systems;
        assert_eq!(systems[0].pc, 0.5);
        assert_eq!(systems[0].pm, 0.25);
        assert_eq!(systems[1].pc, 0.02);
        assert!((systems[1].pm - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_lines_and_sections_from_yaml() {
        let yaml = format!(
            "{}{}",
            HOUSE,
            r#"lines:
  - name: Power Line
    type: power
    sections:
      - length_m: 500
        installation: aerial
      - length_m: 250
        installation: buried
        soil_resistivity_ohm_m: 400
        environment: urban
  - name: Telecom
    type: telecom
    shielding: buried_shielded_bonded
    shield_resistance_ohm_km: 2
    spd:
      level: I
"#
        );
        let config = ScenarioConfig::from_yaml_str(&yaml).unwrap();
        let structure = config.build_structure().unwrap();
        assert_eq!(structure.lines.len(), 2);

        let power = &structure.lines[0];
        assert_eq!(power.total_length(), 750.0);
        assert_eq!(power.sections[0].height, DEFAULT_LINE_HEIGHT_M);
        assert_eq!(power.sections[1].environment, Environment::Urban);

        let telecom = &structure.lines[1];
        assert!(telecom.sections.is_empty());
        assert_eq!(telecom.shield_resistance, Some(2.0));
        assert!(telecom.spd.is_some_and(|s| s.coordinated));
        assert_eq!(telecom.structure, structure.id);
    }

    #[test]
    fn test_duplicate_zone_names_rejected() {
        let yaml = format!(
            "{}{}",
            HOUSE,
            "  - name: Z1\n    persons_in_zone: 0\n    persons_total: 1\n    occupancy_hours: 0\n"
        );
        assert!(matches!(
            ScenarioConfig::from_yaml_str(&yaml),
            Err(ScenarioError::Validation(_))
        ));
    }

    #[test]
    fn test_bundled_scenarios_load() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios");
        for file in ["residential_house.yaml", "office_with_lines.yaml"] {
            let config = ScenarioConfig::from_file(dir.join(file)).unwrap();
            let structure = config.build_structure().unwrap();
            let report = RiskAggregator::new(&structure, config.ground_flash_density().unwrap())
                .include_line_risks(config.assessment.include_line_risks)
                .evaluate()
                .unwrap();
            assert!(report.total_r1 > 0.0, "{file}");
        }
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            ScenarioConfig::from_file("does/not/exist.yaml"),
            Err(ScenarioError::FileNotFound(_))
        ));
    }
}
