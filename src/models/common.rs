//! 分類（カテゴリ）と係数テーブル
//!
//! 各カテゴリは識別子のみを表し、係数は本モジュールの参照関数で解決します。
//! テーブルは不変データであり、複数の評価から同時に参照しても安全です。

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 年間時間数（h）
pub const HOURS_PER_YEAR: f64 = 8760.0;

/// 構造物の識別子
///
/// ゾーンと引込線が所属構造物を参照するための非所有の逆参照です。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct StructureId(String);

impl StructureId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StructureId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for StructureId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// 構造物の立地条件（Table A.1）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationCategory {
    /// 丘の上などの孤立した高所
    IsolatedTaller,
    /// 周囲に他の物体がない
    #[default]
    Isolated,
    /// 同程度の高さの物体に囲まれている
    SurroundedBySimilar,
    /// より高い物体に囲まれている
    SurroundedByTaller,
}

/// 立地係数 CD
pub fn location_coefficient(category: LocationCategory) -> f64 {
    match category {
        LocationCategory::IsolatedTaller => 2.0,
        LocationCategory::Isolated => 1.0,
        LocationCategory::SurroundedBySimilar => 0.5,
        LocationCategory::SurroundedByTaller => 0.25,
    }
}

/// 引込線区間の敷設方式（Table A.2）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallationCategory {
    #[default]
    Aerial,
    Buried,
}

/// 敷設係数 CI
pub fn installation_coefficient(category: InstallationCategory) -> f64 {
    match category {
        InstallationCategory::Aerial => 1.0,
        InstallationCategory::Buried => 0.5,
    }
}

/// 引込線の種別（Table A.3）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineType {
    /// 低圧電力線
    #[default]
    Power,
    Telecom,
    Data,
    /// 高圧電力線（HV/LV変圧器あり）
    HvPower,
}

/// 変圧器係数 CT
pub fn transmission_coefficient(line_type: LineType) -> f64 {
    match line_type {
        LineType::Power | LineType::Telecom | LineType::Data => 1.0,
        LineType::HvPower => 0.2,
    }
}

/// 引込線周辺の環境（Table A.4）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Rural,
    Suburban,
    Urban,
    /// 高さ20mを超える建物のある都市部
    UrbanWithTallBuildings,
}

/// 環境係数 CE
pub fn environmental_coefficient(environment: Environment) -> f64 {
    match environment {
        Environment::Rural => 1.0,
        Environment::Suburban => 0.5,
        Environment::Urban => 0.1,
        Environment::UrbanWithTallBuildings => 0.01,
    }
}

/// 雷保護レベル LPL（I が最も強い）
///
/// 認識できないレベルは `Unrecognized` となり、確率参照では保護なし（1.0）として扱います。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProtectionLevel {
    #[serde(rename = "I")]
    LevelI,
    #[serde(rename = "II")]
    LevelII,
    #[serde(rename = "III")]
    LevelIII,
    #[serde(rename = "IV")]
    LevelIV,
    #[serde(other)]
    Unrecognized,
}

/// 雷撃の発生源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightningSource {
    /// 構造物への直撃
    S1,
    /// 構造物近傍への落雷
    S2,
    /// 引込線への直撃
    S3,
    /// 引込線近傍への落雷
    S4,
}

/// ゾーンの損失種別（Table C.2）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossCategory {
    Hospital,
    Industrial,
    PublicEntertainment,
    #[default]
    Residential,
    Commercial,
    #[serde(other)]
    Unrecognized,
}

/// 火災リスク区分（Table C.5）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FireRisk {
    Explosion,
    High,
    #[default]
    Ordinary,
    Low,
    Negligible,
}

/// 火災リスク係数 rf
pub fn fire_risk_factor(risk: FireRisk) -> f64 {
    match risk {
        FireRisk::Explosion => 1.0,
        FireRisk::High => 0.1,
        FireRisk::Ordinary => 0.01,
        FireRisk::Low => 0.001,
        FireRisk::Negligible => 0.0,
    }
}

/// 接触・歩幅電圧に対する保護対策（Table B.1 / B.6）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TouchProtection {
    #[default]
    None,
    WarningNotices,
    ElectricalInsulation,
    SoilEquipotentialization,
    PhysicalRestrictions,
}

/// 引込線の経路・遮蔽・ボンディング条件（Table B.4）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineShielding {
    #[default]
    AerialUnshielded,
    BuriedUnshielded,
    MultiGroundedNeutral,
    BuriedShieldedUnbonded,
    AerialShieldedUnbonded,
    BuriedShieldedBonded,
    AerialShieldedBonded,
    LightningProtectiveCable,
    IsolatingInterface,
}

impl LineShielding {
    /// 遮蔽層が機器と同じボンディングバーに接続されているか
    pub fn is_bonded(&self) -> bool {
        matches!(
            self,
            LineShielding::BuriedShieldedBonded | LineShielding::AerialShieldedBonded
        )
    }
}

/// 係数 (CLD, CLI)
pub fn line_shielding_factors(shielding: LineShielding) -> (f64, f64) {
    match shielding {
        LineShielding::AerialUnshielded => (1.0, 1.0),
        LineShielding::BuriedUnshielded => (1.0, 1.0),
        LineShielding::MultiGroundedNeutral => (1.0, 0.2),
        LineShielding::BuriedShieldedUnbonded => (1.0, 0.3),
        LineShielding::AerialShieldedUnbonded => (1.0, 0.1),
        LineShielding::BuriedShieldedBonded => (1.0, 0.0),
        LineShielding::AerialShieldedBonded => (1.0, 0.0),
        LineShielding::LightningProtectiveCable => (0.0, 0.0),
        LineShielding::IsolatingInterface => (0.0, 0.0),
    }
}

/// 入力検証エラー
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("{field} must be a positive finite number (got {value})")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be a non-negative finite number (got {value})")]
    Negative { field: &'static str, value: f64 },

    #[error("{field} must be within [{min}, {max}] (got {value})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("persons in zone ({nz}) exceed persons in structure ({nt})")]
    PersonsExceedTotal { nz: f64, nt: f64 },

    #[error("persons_total is zero while persons_in_zone is {nz}")]
    ZeroPersonsTotal { nz: f64 },

    #[error("duplicate zone name: {0}")]
    DuplicateZone(String),
}

pub(crate) fn require_positive(field: &'static str, value: f64) -> Result<f64, ModelError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ModelError::NonPositive { field, value })
    }
}

pub(crate) fn require_non_negative(field: &'static str, value: f64) -> Result<f64, ModelError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ModelError::Negative { field, value })
    }
}

pub(crate) fn require_range(
    field: &'static str,
    value: f64,
    min: f64,
    max: f64,
) -> Result<f64, ModelError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(value)
    } else {
        Err(ModelError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}
