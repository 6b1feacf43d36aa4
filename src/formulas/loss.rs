//! # 損失（Annex C）

use crate::models::{HOURS_PER_YEAR, LossCategory};

/// 損失種別ごとの基準損失 LT（Table C.2）
///
/// 認識できない種別は 1e-3 とします。
pub fn base_loss(category: LossCategory) -> f64 {
    match category {
        LossCategory::Hospital | LossCategory::Industrial | LossCategory::PublicEntertainment => {
            1e-2
        }
        LossCategory::Residential | LossCategory::Commercial | LossCategory::Unrecognized => 1e-3,
    }
}

/// 相対損失 LX = LT × rf × rp × hz
pub fn relative_loss(
    loss_type: LossCategory,
    fire_risk_factor: f64,
    fire_provision_factor: f64,
    hazard_factor: f64,
) -> f64 {
    base_loss(loss_type) * fire_risk_factor * fire_provision_factor * hazard_factor
}

/// 人命損失 LO = (nz / nt) × (tz / 8760)
///
/// ゾーン内に人がいなければ 0。nt > 0 はゾーン構築時に保証されます。
pub fn loss_of_life(persons_in_zone: f64, persons_total: f64, occupancy_hours: f64) -> f64 {
    if persons_in_zone <= 0.0 {
        return 0.0;
    }
    (persons_in_zone / persons_total) * (occupancy_hours / HOURS_PER_YEAR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_loss_table() {
        assert_eq!(base_loss(LossCategory::Hospital), 1e-2);
        assert_eq!(base_loss(LossCategory::Industrial), 1e-2);
        assert_eq!(base_loss(LossCategory::PublicEntertainment), 1e-2);
        assert_eq!(base_loss(LossCategory::Residential), 1e-3);
        assert_eq!(base_loss(LossCategory::Commercial), 1e-3);
    }

    #[test]
    fn test_unrecognized_category_uses_conservative_default() {
        assert_eq!(base_loss(LossCategory::Unrecognized), 1e-3);
        assert!((relative_loss(LossCategory::Unrecognized, 0.01, 1.0, 1.0) - 1e-5).abs() < 1e-18);
    }

    #[test]
    fn test_relative_loss_product() {
        let lx = relative_loss(LossCategory::Hospital, 0.1, 0.5, 5.0);
        assert!((lx - 1e-2 * 0.1 * 0.5 * 5.0).abs() < 1e-15);
    }

    #[test]
    fn test_loss_of_life_bounds() {
        assert_eq!(loss_of_life(1.0, 1.0, 8760.0), 1.0);
        assert_eq!(loss_of_life(0.0, 0.0, 8760.0), 0.0);

        for nt in [1.0, 3.0, 50.0] {
            for nz in [0.0, 1.0, nt / 2.0, nt] {
                for tz in [0.0, 1.0, 4380.0, 8760.0] {
                    let lo = loss_of_life(nz, nt, tz);
                    assert!((0.0..=1.0).contains(&lo), "nz={nz} nt={nt} tz={tz}");
                }
            }
        }
        assert!(loss_of_life(49.0, 50.0, 8760.0) < 1.0);
        assert!(loss_of_life(50.0, 50.0, 8759.0) < 1.0);
    }
}
