//! # 損傷確率（Annex B）
//!
//! 保護設備のパラメータから、傷害・物理的損傷・内部システム故障の確率を求めます。
//! すべての戻り値は [0, 1] の範囲です。認識できない保護レベルは保護なし（1.0）として
//! 扱い、リスクを過小評価しない側に倒します。

use tracing::trace;

use crate::models::{
    Line, LineProbabilityTable, LineType, LightningSource, Lps, ProtectionLevel, SpdSystem,
    TouchProtection, Tws, line_shielding_factors,
};

/// 耐電圧の列（kV）: Table B.8 / B.9
const WITHSTAND_COLUMNS_KV: [f64; 5] = [1.0, 1.5, 2.5, 4.0, 6.0];

/// PLD: 遮蔽抵抗 RS（Ω/km）の帯ごとの行（Table B.8）
const PLD_RS_UP_TO_1: [f64; 5] = [0.6, 0.4, 0.2, 0.04, 0.02];
const PLD_RS_UP_TO_5: [f64; 5] = [0.9, 0.8, 0.6, 0.3, 0.1];
const PLD_RS_UP_TO_20: [f64; 5] = [1.0, 1.0, 0.95, 0.9, 0.8];

/// PLI: 電力線 / 通信線（Table B.9）
const PLI_POWER: [f64; 5] = [1.0, 0.6, 0.3, 0.16, 0.1];
const PLI_TELECOM: [f64; 5] = [1.0, 0.5, 0.2, 0.08, 0.04];

/// 人への傷害確率 PA
///
/// PA = PTA × PTWS。接触電圧対策も警報システムもなければ 1.0。
pub fn injury_probability(tws: Option<&Tws>, barrier: TouchProtection) -> f64 {
    let ptws = tws.map_or(1.0, Tws::reduction_factor);
    touch_protection_probability(barrier) * ptws
}

/// 構造物の接触・歩幅電圧対策による低減 PTA（Table B.1）
pub fn touch_protection_probability(protection: TouchProtection) -> f64 {
    match protection {
        TouchProtection::None => 1.0,
        TouchProtection::WarningNotices => 0.1,
        TouchProtection::ElectricalInsulation => 0.01,
        TouchProtection::SoilEquipotentialization => 0.01,
        TouchProtection::PhysicalRestrictions => 0.0,
    }
}

/// 引込線の接触電圧対策による低減 PTU（Table B.6）
///
/// 大地等電位化は引込線には適用されないため低減なし。
pub fn line_touch_protection_probability(protection: TouchProtection) -> f64 {
    match protection {
        TouchProtection::None | TouchProtection::SoilEquipotentialization => 1.0,
        TouchProtection::WarningNotices => 0.1,
        TouchProtection::ElectricalInsulation => 0.01,
        TouchProtection::PhysicalRestrictions => 0.0,
    }
}

/// 物理的損傷確率 PB（Table B.2）
pub fn physical_damage_probability(lps: Option<&Lps>) -> f64 {
    match lps.and_then(|l| l.level) {
        Some(ProtectionLevel::LevelI) => 0.02,
        Some(ProtectionLevel::LevelII) => 0.05,
        Some(ProtectionLevel::LevelIII) => 0.10,
        Some(ProtectionLevel::LevelIV) => 0.20,
        Some(ProtectionLevel::Unrecognized) | None => 1.0,
    }
}

/// 協調設計されたSPDシステムの保護レベルによる確率 PSPD（Table B.3）
pub fn spd_level_probability(level: ProtectionLevel) -> f64 {
    match level {
        ProtectionLevel::LevelI => 0.01,
        ProtectionLevel::LevelII => 0.02,
        ProtectionLevel::LevelIII => 0.03,
        ProtectionLevel::LevelIV => 0.05,
        ProtectionLevel::Unrecognized => 1.0,
    }
}

/// 内部システムの故障確率 PC（PSPD）
///
/// 協調設計されていないSPDシステム、またはSPDなしの場合は 1.0。
/// 現行の表では発生源 S1〜S4 で値は共通です。
pub fn internal_failure_probability(spd: Option<&SpdSystem>, source: LightningSource) -> f64 {
    let p = match spd {
        Some(spd) if spd.coordinated => spd_level_probability(spd.level),
        _ => 1.0,
    };
    trace!(?source, p, "PSPD");
    p
}

/// 誘導による内部システム故障確率 PM
///
/// ks1 × ks2 が 0 以下なら完全遮蔽として 0。
/// ratio = uw / (ks1 × ks2) が 5 以上で 0、0.07 以下で 1、その間は線形補間。
pub fn induced_failure_probability(ks1: f64, ks2: f64, withstand_voltage: f64) -> f64 {
    let combined_shielding = ks1 * ks2;
    if combined_shielding <= 0.0 {
        return 0.0;
    }

    let ratio = withstand_voltage / combined_shielding;
    if ratio >= 5.0 {
        0.0
    } else if ratio <= 0.07 {
        1.0
    } else {
        1.0 - (ratio - 0.07) / (5.0 - 0.07)
    }
}

/// 耐電圧 UW に対応する列。UW を超えない最大の列を選びます。
fn withstand_column(uw_kv: f64) -> usize {
    WITHSTAND_COLUMNS_KV
        .iter()
        .rposition(|&column| uw_kv >= column)
        .unwrap_or(0)
}

/// 引込線の遮蔽・耐電圧による故障確率 PLD（Table B.8）
pub fn line_damage_probability(line: &Line) -> f64 {
    if !line.shielding.is_bonded() {
        return 1.0;
    }

    let row = match line.shield_resistance {
        Some(rs) if rs <= 1.0 => &PLD_RS_UP_TO_1,
        Some(rs) if rs <= 5.0 => &PLD_RS_UP_TO_5,
        Some(rs) if rs <= 20.0 => &PLD_RS_UP_TO_20,
        _ => return 1.0,
    };
    row[withstand_column(line.withstand_voltage_kv)]
}

/// 引込線近傍の落雷による故障確率 PLI（Table B.9）
pub fn line_induced_probability(line: &Line) -> f64 {
    let row = match line.line_type {
        LineType::Power | LineType::HvPower => &PLI_POWER,
        LineType::Telecom | LineType::Data => &PLI_TELECOM,
    };
    row[withstand_column(line.withstand_voltage_kv)]
}

/// 等電位ボンディング用SPDの保護レベルによる確率 PEB（Table B.7）
///
/// PSPD と異なり、LPL III と IV は同じ値です。
pub fn bonding_level_probability(level: ProtectionLevel) -> f64 {
    match level {
        ProtectionLevel::LevelI => 0.01,
        ProtectionLevel::LevelII => 0.02,
        ProtectionLevel::LevelIII | ProtectionLevel::LevelIV => 0.05,
        ProtectionLevel::Unrecognized => 1.0,
    }
}

/// 引込口の等電位ボンディングによる確率 PEB
pub fn bonding_probability(line: &Line) -> f64 {
    line.spd.map_or(1.0, |spd| bonding_level_probability(spd.level))
}

/// 規格の表に基づく引込線経由の確率
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardLineTables;

pub static STANDARD_LINE_TABLES: StandardLineTables = StandardLineTables;

impl LineProbabilityTable for StandardLineTables {
    fn pu(&self, line: &Line) -> f64 {
        let (cld, _) = line_shielding_factors(line.shielding);
        line_touch_protection_probability(line.touch_protection)
            * bonding_probability(line)
            * line_damage_probability(line)
            * cld
    }

    fn pv(&self, line: &Line) -> f64 {
        let (cld, _) = line_shielding_factors(line.shielding);
        bonding_probability(line) * line_damage_probability(line) * cld
    }

    fn pw(&self, line: &Line) -> f64 {
        let (cld, _) = line_shielding_factors(line.shielding);
        internal_failure_probability(line.spd.as_ref(), LightningSource::S3)
            * line_damage_probability(line)
            * cld
    }

    fn pz(&self, line: &Line) -> f64 {
        let (_, cli) = line_shielding_factors(line.shielding);
        internal_failure_probability(line.spd.as_ref(), LightningSource::S4)
            * line_induced_probability(line)
            * cli
    }
}
