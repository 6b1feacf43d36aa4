//! # 危険事象の発生頻度（Annex A）
//!
//! 大地落雷密度 NG と各捕捉面積から、年間の危険事象数を求める純粋関数群です。
//!
//! - ND: 構造物への直撃
//! - NM: 構造物近傍への落雷
//! - NL: 引込線への直撃
//! - NI: 引込線近傍への落雷

use crate::models::{Line, LineSection, Structure};

/// m² を km² に換算する係数
const M2_TO_KM2: f64 = 1e-6;

/// 雷雨日数 TD から大地落雷密度 NG（/km²/年）を求めます
pub fn ground_flash_density(thunderstorm_days: f64) -> f64 {
    0.1 * thunderstorm_days
}

/// 構造物への直撃頻度 ND = NG × AD × CD × 1e-6
pub fn frequency_to_structure(structure: &Structure, density: f64) -> f64 {
    density * structure.collection_area() * structure.location_coefficient() * M2_TO_KM2
}

/// 構造物近傍への落雷頻度 NM = NG × (AM − AD × CD) × 1e-6
///
/// AM を手動で小さく上書きした場合でも負にはなりません。
pub fn frequency_near_structure(structure: &Structure, density: f64) -> f64 {
    let area = structure.near_area()
        - structure.collection_area() * structure.location_coefficient();
    density * area.max(0.0) * M2_TO_KM2
}

/// 引込線の1区間への直撃頻度
pub fn frequency_to_line_section(
    section: &LineSection,
    line: &Line,
    structure: &Structure,
    density: f64,
) -> f64 {
    density
        * section.collection_area(structure.height)
        * section.installation_coefficient()
        * line.transmission_coefficient()
        * section.environmental_coefficient()
        * M2_TO_KM2
}

/// 引込線への直撃頻度 NL（全区間の合計）
pub fn frequency_to_line(line: &Line, structure: &Structure, density: f64) -> f64 {
    line.effective_sections()
        .iter()
        .map(|section| frequency_to_line_section(section, line, structure, density))
        .sum()
}

/// 引込線の1区間近傍への落雷頻度
pub fn frequency_near_line_section(section: &LineSection, line: &Line, density: f64) -> f64 {
    density
        * section.near_area()
        * section.installation_coefficient()
        * line.transmission_coefficient()
        * section.environmental_coefficient()
        * M2_TO_KM2
}

/// 引込線近傍への落雷頻度 NI（全区間の合計）
pub fn frequency_near_line(line: &Line, density: f64) -> f64 {
    line.effective_sections()
        .iter()
        .map(|section| frequency_near_line_section(section, line, density))
        .sum()
}
