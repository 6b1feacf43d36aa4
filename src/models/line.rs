use std::borrow::Cow;

use crate::models::{
    common::{
        Environment, InstallationCategory, LineShielding, LineType, ModelError, StructureId,
        TouchProtection, environmental_coefficient, installation_coefficient,
        require_non_negative, require_positive, transmission_coefficient,
    },
    protection::SpdSystem,
};

/// 区間が未定義の引込線に用いる公称長さ（m）
pub const NOMINAL_LINE_LENGTH_M: f64 = 1000.0;
/// 架空線の標準的な高さ Ha（m）
pub const DEFAULT_LINE_HEIGHT_M: f64 = 6.0;
/// 標準的な大地抵抗率 ρ（Ωm）
pub const DEFAULT_SOIL_RESISTIVITY: f64 = 250.0;
/// 機器の標準定格耐電圧 UW（kV）
pub const DEFAULT_WITHSTAND_VOLTAGE_KV: f64 = 1.5;
/// 引込線近傍の捕捉幅（m、線路両側の合計）
pub const NEAR_LINE_WIDTH_M: f64 = 4000.0;

/// 引込線の区間
#[derive(Debug, Clone, PartialEq)]
pub struct LineSection {
    /// 区間長 LL（m）
    pub length: f64,
    pub installation: InstallationCategory,
    /// 接続点の高さ Ha（m）
    pub height: f64,
    /// 大地抵抗率 ρ（Ωm）
    pub soil_resistivity: f64,
    pub environment: Environment,
}

impl LineSection {
    pub fn new(length: f64, installation: InstallationCategory) -> Result<Self, ModelError> {
        Ok(Self {
            length: require_positive("section length", length)?,
            installation,
            height: DEFAULT_LINE_HEIGHT_M,
            soil_resistivity: DEFAULT_SOIL_RESISTIVITY,
            environment: Environment::Rural,
        })
    }

    /// 区間情報がない引込線を評価するための公称区間
    pub fn nominal() -> Self {
        Self {
            length: NOMINAL_LINE_LENGTH_M,
            installation: InstallationCategory::Aerial,
            height: DEFAULT_LINE_HEIGHT_M,
            soil_resistivity: DEFAULT_SOIL_RESISTIVITY,
            environment: Environment::Rural,
        }
    }

    pub fn with_height(mut self, height: f64) -> Result<Self, ModelError> {
        self.height = require_non_negative("section height", height)?;
        Ok(self)
    }

    pub fn with_soil_resistivity(mut self, rho: f64) -> Result<Self, ModelError> {
        self.soil_resistivity = require_non_negative("soil resistivity", rho)?;
        Ok(self)
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// 敷設係数 CI
    pub fn installation_coefficient(&self) -> f64 {
        installation_coefficient(self.installation)
    }

    /// 環境係数 CE
    pub fn environmental_coefficient(&self) -> f64 {
        environmental_coefficient(self.environment)
    }

    /// 直撃の捕捉面積 AL（m²）
    ///
    /// `structure_height` は引込線が接続される構造物の高さ Hb。
    /// 両端の遷移区間 3(Ha + Hb) を差し引いた長さが負になる場合は 0 とします。
    pub fn collection_area(&self, structure_height: f64) -> f64 {
        let transition = 3.0 * (self.height + structure_height);
        let width = match self.installation {
            InstallationCategory::Aerial => transition,
            InstallationCategory::Buried => self.soil_resistivity.sqrt(),
        };
        let reduced_length = self.length - transition;
        if reduced_length <= 0.0 {
            return 0.0;
        }
        reduced_length * width
    }

    /// 近傍落雷の捕捉面積 AI（m²）
    pub fn near_area(&self) -> f64 {
        NEAR_LINE_WIDTH_M * self.length
    }
}

/// 構造物に接続された引込線
#[derive(Debug, Clone)]
pub struct Line {
    pub name: String,
    /// 所属構造物（`Structure::add_line` で設定）
    pub structure: StructureId,
    pub line_type: LineType,
    pub sections: Vec<LineSection>,
    pub shielding: LineShielding,
    /// 遮蔽層の抵抗 RS（Ω/km）
    pub shield_resistance: Option<f64>,
    /// 接続機器の定格耐電圧 UW（kV）
    pub withstand_voltage_kv: f64,
    /// 引込口のSPD
    pub spd: Option<SpdSystem>,
    pub touch_protection: TouchProtection,
}

impl Line {
    pub fn new(name: impl Into<String>, line_type: LineType) -> Self {
        Self {
            name: name.into(),
            structure: StructureId::default(),
            line_type,
            sections: Vec::new(),
            shielding: LineShielding::AerialUnshielded,
            shield_resistance: None,
            withstand_voltage_kv: DEFAULT_WITHSTAND_VOLTAGE_KV,
            spd: None,
            touch_protection: TouchProtection::None,
        }
    }

    pub fn add_section(&mut self, section: LineSection) {
        self.sections.push(section);
    }

    pub fn with_shielding(
        mut self,
        shielding: LineShielding,
        shield_resistance: Option<f64>,
    ) -> Result<Self, ModelError> {
        if let Some(rs) = shield_resistance {
            require_non_negative("shield resistance", rs)?;
        }
        self.shielding = shielding;
        self.shield_resistance = shield_resistance;
        Ok(self)
    }

    pub fn with_withstand_voltage(mut self, uw_kv: f64) -> Result<Self, ModelError> {
        self.withstand_voltage_kv = require_positive("withstand voltage", uw_kv)?;
        Ok(self)
    }

    pub fn with_spd(mut self, spd: SpdSystem) -> Self {
        self.spd = Some(spd);
        self
    }

    pub fn with_touch_protection(mut self, protection: TouchProtection) -> Self {
        self.touch_protection = protection;
        self
    }

    /// 変圧器係数 CT
    pub fn transmission_coefficient(&self) -> f64 {
        transmission_coefficient(self.line_type)
    }

    /// 引込線の全長（m）。区間がなければ公称長さ。
    pub fn total_length(&self) -> f64 {
        if self.sections.is_empty() {
            return NOMINAL_LINE_LENGTH_M;
        }
        self.sections.iter().map(|s| s.length).sum()
    }

    /// 評価に用いる区間。区間がなければ公称区間1つ。
    pub fn effective_sections(&self) -> Cow<'_, [LineSection]> {
        if self.sections.is_empty() {
            Cow::Owned(vec![LineSection::nominal()])
        } else {
            Cow::Borrowed(self.sections.as_slice())
        }
    }

    /// 区間ごとに値が異なる場合、最もリスクが高くなる大地抵抗率
    pub fn worst_case_resistivity(&self) -> f64 {
        self.effective_sections()
            .iter()
            .map(|s| s.soil_resistivity)
            .fold(0.0, f64::max)
    }
}
