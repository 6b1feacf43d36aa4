//! 雷保護のリスク評価（IEC 62305-2 の R1: 人命損失リスク）
//!
//! 構造物・ゾーン・引込線・保護設備からなるドメインモデルに対して、
//! 危険事象の頻度（Annex A）、損傷確率（Annex B）、損失（Annex C）を求め、
//! [`aggregator::RiskAggregator`] でリスク成分を集計して許容リスクと比較します。

pub mod aggregator;
pub mod formulas;
pub mod logging;
pub mod models;
pub mod scenario;
