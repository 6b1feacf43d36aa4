use crate::models::common::{
    FireRisk, HOURS_PER_YEAR, LossCategory, ModelError, StructureId, fire_risk_factor,
    require_non_negative, require_range,
};

/// ゾーン内の電気・電子システム
#[derive(Debug, Clone, PartialEq)]
pub struct InternalSystem {
    pub name: String,
    /// 物理的損傷による故障確率（S1/S3）
    pub pc: f64,
    /// 誘導による故障確率（S2/S4）
    pub pm: f64,
}

impl InternalSystem {
    pub fn new(name: impl Into<String>, pc: f64, pm: f64) -> Result<Self, ModelError> {
        Ok(Self {
            name: name.into(),
            pc: require_range("pc", pc, 0.0, 1.0)?,
            pm: require_range("pm", pm, 0.0, 1.0)?,
        })
    }
}

/// 構造物内の評価ゾーン
#[derive(Debug, Clone)]
pub struct Zone {
    pub name: String,
    /// 所属構造物（`Structure::add_zone` で設定）
    pub structure: StructureId,
    pub loss_type: LossCategory,
    /// ゾーン内の人数 nz
    pub persons_in_zone: f64,
    /// 構造物内の総人数 nt
    pub persons_total: f64,
    /// 年間在室時間 tz（h）
    pub occupancy_hours: f64,
    pub fire_risk: FireRisk,
    /// 火災対策係数 rp
    pub fire_provision: f64,
    /// 床面種別による低減係数 rt
    pub surface_reduction: f64,
    /// 特別な危険による損失増加係数 hz
    pub hazard_factor: f64,
    pub systems: Vec<InternalSystem>,
}

impl Zone {
    pub fn new(
        name: impl Into<String>,
        loss_type: LossCategory,
        persons_in_zone: f64,
        persons_total: f64,
        occupancy_hours: f64,
    ) -> Result<Self, ModelError> {
        let nz = require_non_negative("persons_in_zone", persons_in_zone)?;
        let nt = require_non_negative("persons_total", persons_total)?;
        if nt == 0.0 && nz > 0.0 {
            return Err(ModelError::ZeroPersonsTotal { nz });
        }
        if nz > nt {
            return Err(ModelError::PersonsExceedTotal { nz, nt });
        }
        let tz = require_range("occupancy_hours", occupancy_hours, 0.0, HOURS_PER_YEAR)?;

        Ok(Self {
            name: name.into(),
            structure: StructureId::default(),
            loss_type,
            persons_in_zone: nz,
            persons_total: nt,
            occupancy_hours: tz,
            fire_risk: FireRisk::Ordinary,
            fire_provision: 1.0,
            surface_reduction: 1.0,
            hazard_factor: 1.0,
            systems: Vec::new(),
        })
    }

    pub fn with_fire_risk(mut self, fire_risk: FireRisk) -> Self {
        self.fire_risk = fire_risk;
        self
    }

    pub fn with_fire_provision(mut self, rp: f64) -> Result<Self, ModelError> {
        self.fire_provision = require_range("fire_provision", rp, 0.0, 1.0)?;
        Ok(self)
    }

    pub fn with_surface_reduction(mut self, rt: f64) -> Result<Self, ModelError> {
        self.surface_reduction = require_range("surface_reduction", rt, 0.0, 1.0)?;
        Ok(self)
    }

    pub fn with_hazard_factor(mut self, hz: f64) -> Result<Self, ModelError> {
        self.hazard_factor = require_range("hazard_factor", hz, 1.0, f64::MAX)?;
        Ok(self)
    }

    pub fn add_system(&mut self, system: InternalSystem) {
        self.systems.push(system);
    }

    /// 火災リスク係数 rf
    pub fn fire_risk_factor(&self) -> f64 {
        fire_risk_factor(self.fire_risk)
    }

    /// 在室確率 tz/8760
    pub fn presence_probability(&self) -> f64 {
        self.occupancy_hours / HOURS_PER_YEAR
    }

    /// ゾーン全体の物理的損傷による故障確率
    ///
    /// PC = 1 - Π(1 - PC_i)。システムがなければ 0。
    pub fn aggregated_pc(&self) -> f64 {
        combine_failures(self.systems.iter().map(|s| s.pc))
    }

    /// ゾーン全体の誘導による故障確率
    pub fn aggregated_pm(&self) -> f64 {
        combine_failures(self.systems.iter().map(|s| s.pm))
    }
}

fn combine_failures(probabilities: impl Iterator<Item = f64>) -> f64 {
    1.0 - probabilities.fold(1.0, |survive, p| survive * (1.0 - p))
}
