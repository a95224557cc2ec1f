//! Material presets
//!
//! Every preset fills the whole grid; models restrict it with
//! [`Material::with_membership`]. Pole data are literature fits in SI
//! angular units.

use crate::domain::material::{LorentzPole, Material};
use std::f64::consts::PI;

const THZ: f64 = 2.0 * PI * 1e12;

/// Lossless, non-dispersive dielectric
pub fn dielectric(epsilon: f64) -> Material {
    Material::new("dielectric", epsilon)
}

/// Rutile titanium dioxide, ordinary axis: two infrared phonons
///
/// The first pole is the dominant soft phonon near 5.7 THz.
pub fn tio2() -> Material {
    Material::new("TiO2", 6.84).with_poles([
        LorentzPole::lorentz(79.0, 5.7 * THZ, 0.28 * THZ),
        LorentzPole::lorentz(1.8, 11.6 * THZ, 0.6 * THZ),
    ])
}

/// Gold: Drude term followed by one interband Lorentz pole
pub fn gold() -> Material {
    Material::new("Au", 5.9673).with_poles([
        LorentzPole::drude(2113.6 * THZ, 15.92 * THZ),
        LorentzPole::lorentz(1.09, 650.07 * THZ, 104.86 * THZ),
    ])
}

/// Silver: Drude term followed by one interband Lorentz pole
pub fn silver() -> Material {
    Material::new("Ag", 3.7).with_poles([
        LorentzPole::drude(2180.0 * THZ, 4.35 * THZ),
        LorentzPole::lorentz(0.6, 1250.0 * THZ, 250.0 * THZ),
    ])
}

/// Preset by its short name (`"Au"`, `"Ag"`, `"TiO2"`)
pub fn by_name(name: &str) -> Option<Material> {
    match name {
        "Au" | "gold" => Some(gold()),
        "Ag" | "silver" => Some(silver()),
        "TiO2" => Some(tio2()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tio2_static_permittivity() {
        let eps = tio2().permittivity(0.0).re;
        assert!(eps > 80.0 && eps < 95.0, "{eps}");
    }

    #[test]
    fn test_metals_are_negative_in_terahertz() {
        let omega = 1.0 * THZ;
        for m in [gold(), silver()] {
            let eps = m.permittivity(omega);
            assert!(eps.re < -1e3, "{} {eps}", m.name);
            assert!(eps.im > 0.0);
            // the Drude term comes first
            assert_eq!(m.poles[0].omega0, 0.0);
        }
    }

    #[test]
    fn test_lookup() {
        assert_eq!(by_name("Au").unwrap().name, "Au");
        assert!(by_name("unobtainium").is_none());
    }
}
