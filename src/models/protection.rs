use serde::{Deserialize, Serialize};

use crate::models::common::{ModelError, ProtectionLevel, require_non_negative, require_range};

/// 雷保護システム（LPS）
///
/// レベル未設定のLPSは保護なしと同等に扱われます。
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Lps {
    pub level: Option<ProtectionLevel>,
}

impl Lps {
    pub fn new(level: Option<ProtectionLevel>) -> Self {
        Self { level }
    }

    pub fn with_level(level: ProtectionLevel) -> Self {
        Self { level: Some(level) }
    }
}

/// サージ保護デバイス（SPD）システム
///
/// 協調設計されたシステムのみが 1.0 未満の故障確率を与えます。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpdSystem {
    pub level: ProtectionLevel,
    #[serde(default = "default_coordinated")]
    pub coordinated: bool,
}

fn default_coordinated() -> bool {
    true
}

impl SpdSystem {
    pub fn new(level: ProtectionLevel, coordinated: bool) -> Self {
        Self { level, coordinated }
    }
}

/// 雷警報システム（TWS）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tws {
    pub active: bool,
    /// 警報失敗率（0〜1）
    pub failure_to_warn: f64,
}

impl Tws {
    pub fn new(active: bool, failure_to_warn: f64) -> Result<Self, ModelError> {
        let failure_to_warn = require_range("failure_to_warn", failure_to_warn, 0.0, 1.0)?;
        Ok(Self {
            active,
            failure_to_warn,
        })
    }

    /// 屋外にいる人への危険の低減係数 PTWS
    pub fn reduction_factor(&self) -> f64 {
        if self.active { self.failure_to_warn } else { 1.0 }
    }
}

/// 空間遮蔽と機器耐電圧
///
/// ks1: LPSまたは構造物外壁による遮蔽係数、ks2: 内部空間遮蔽係数、
/// withstand_voltage_kv: 機器の定格耐電圧 UW（kV）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shielding {
    pub ks1: f64,
    pub ks2: f64,
    pub withstand_voltage_kv: f64,
}

impl Shielding {
    pub fn new(ks1: f64, ks2: f64, withstand_voltage_kv: f64) -> Result<Self, ModelError> {
        Ok(Self {
            ks1: require_non_negative("ks1", ks1)?,
            ks2: require_non_negative("ks2", ks2)?,
            withstand_voltage_kv: require_non_negative("withstand_voltage_kv", withstand_voltage_kv)?,
        })
    }
}
