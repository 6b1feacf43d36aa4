use crate::models::line::Line;

/// 引込線経由の損傷確率テーブルのインターフェース
///
/// 集計器は引込線起因のリスク成分（RU, RV, RW, RZ）を求めるときにのみ参照します。
pub trait LineProbabilityTable: Send + Sync {
    /// 引込線への直撃による人への傷害確率 PU
    fn pu(&self, line: &Line) -> f64;

    /// 引込線への直撃による物理的損傷確率 PV
    fn pv(&self, line: &Line) -> f64;

    /// 引込線への直撃による内部システム故障確率 PW
    fn pw(&self, line: &Line) -> f64;

    /// 引込線近傍への落雷による内部システム故障確率 PZ
    fn pz(&self, line: &Line) -> f64;
}
