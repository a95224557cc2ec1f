//! Unit-cell geometries
//!
//! Each structure is a plain parameter struct plus pure membership functions
//! `fn(r, &Params) -> f64` returning the fill weight at position `r`. The unit
//! cell is centred on the origin; small offsets of a quarter cell keep
//! symmetric objects from cutting grid nodes in half.

use crate::utilities::geometry::{
    in_sphere, in_xcyl, in_xslab, in_ycyl, in_yslab, in_zcyl, in_zslab,
};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

fn weight(inside: bool) -> f64 {
    if inside {
        1.0
    } else {
        0.0
    }
}

/// Permittivity given either as a preset name or as a number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Permittivity {
    Value(f64),
    Named(String),
}

/// Dielectric sphere between two optional metallic wires along x
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SphereWire {
    pub simtime: f64,
    pub resolution: f64,
    pub cellsize: f64,
    pub radius: f64,
    pub wirethick: f64,
    pub wirecut: f64,
    /// Damping multiplier of the leading pole of a named preset
    pub loss: f64,
    pub epsilon: Permittivity,
}

impl Default for SphereWire {
    fn default() -> Self {
        Self {
            simtime: 30e-12,
            resolution: 4e-6,
            cellsize: 100e-6,
            radius: 30e-6,
            wirethick: 0.0,
            wirecut: 0.0,
            loss: 1.0,
            epsilon: Permittivity::Named("TiO2".into()),
        }
    }
}

pub fn sphere_wire_sphere(r: [f64; 3], p: &SphereWire) -> f64 {
    let dd = p.resolution / 4.0;
    weight(in_sphere(r, [dd, dd, dd], p.radius))
}

pub fn sphere_wire_wire(r: [f64; 3], p: &SphereWire) -> f64 {
    let dd = p.resolution / 4.0;
    if in_xslab(r, dd, p.wirecut) {
        return 0.0;
    }
    let half = p.cellsize / 2.0;
    weight(
        in_xcyl(r, half + dd, 0.0, p.wirethick) || in_xcyl(r, -half + dd, 0.0, p.wirethick),
    )
}

/// Dielectric rod along x
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RodArray {
    pub simtime: f64,
    pub resolution: f64,
    pub cellsize: f64,
    pub radius: f64,
}

impl Default for RodArray {
    fn default() -> Self {
        Self {
            simtime: 100e-12,
            resolution: 4e-6,
            cellsize: 100e-6,
            radius: 10e-6,
        }
    }
}

pub fn rod_array_rod(r: [f64; 3], p: &RodArray) -> f64 {
    weight(in_xcyl(r, 0.0, 0.0, p.radius))
}

/// Layer normal to z filling `fillfraction` of the cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Slab {
    pub simtime: f64,
    pub resolution: f64,
    pub cellsize: f64,
    pub fillfraction: f64,
    pub epsilon: f64,
}

impl Default for Slab {
    fn default() -> Self {
        Self {
            simtime: 100e-12,
            resolution: 2e-6,
            cellsize: 100e-6,
            fillfraction: 0.5,
            epsilon: 2.0,
        }
    }
}

pub fn slab_layer(r: [f64; 3], p: &Slab) -> f64 {
    weight(in_zslab(r, 0.0, p.cellsize * p.fillfraction))
}

/// Split-ring resonators with wires; an optional central bar makes it an ESRR
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EsrrArray {
    pub simtime: f64,
    pub resolution: f64,
    pub cellsize: f64,
    pub radius: f64,
    pub wirethick: f64,
    pub srrthick: f64,
    pub splitting: f64,
    pub splitting2: f64,
    pub capacitorr: f64,
    pub cbarthick: f64,
    pub insplitting: f64,
    pub incapacitorr: f64,
}

impl Default for EsrrArray {
    fn default() -> Self {
        Self {
            simtime: 50e-12,
            resolution: 4e-6,
            cellsize: 100e-6,
            radius: 40e-6,
            wirethick: 6e-6,
            srrthick: 6e-6,
            splitting: 26e-6,
            splitting2: 0.0,
            capacitorr: 10e-6,
            cbarthick: 0.0,
            insplitting: 100e-6,
            incapacitorr: 0.0,
        }
    }
}

pub fn esrr_metal(r: [f64; 3], p: &EsrrArray) -> f64 {
    let dd = p.resolution / 4.0;
    let half = p.cellsize / 2.0;
    let z = r[2];

    // wires along x on the cell faces
    if in_xcyl(r, half, 0.0, p.wirethick) || in_xcyl(r, -half, 0.0, p.wirethick) {
        return 1.0;
    }

    // ring with up to two gaps
    let upper_gap = z > p.radius / 2.0 && in_xslab(r, dd, p.splitting);
    let lower_gap = z < -p.radius / 2.0 && in_xslab(r, dd, p.splitting2);
    if !upper_gap && !lower_gap {
        let in_disc =
            in_ycyl(r, dd, 0.0, p.radius + p.srrthick / 2.0) && in_yslab(r, dd, p.srrthick);
        if in_disc && !in_ycyl(r, dd, 0.0, p.radius - p.srrthick / 2.0) {
            return 1.0;
        }
        if p.splitting > 0.0
            && in_xcyl(r, dd, p.radius, p.capacitorr)
            && in_xslab(r, dd, p.splitting + 2.0 * p.srrthick)
        {
            return 1.0;
        }
        if p.splitting2 > 0.0
            && in_xcyl(r, dd, -p.radius, p.capacitorr)
            && in_xslab(r, dd, p.splitting2 + 2.0 * p.srrthick)
        {
            return 1.0;
        }
    }

    // central bar, itself split by `insplitting`
    let bar_gap = in_zslab(r, 0.0, p.radius) && in_xslab(r, dd, p.insplitting);
    if p.cbarthick > 0.0 && !bar_gap {
        if in_ycyl(r, dd, 0.0, p.radius + p.srrthick / 2.0)
            && in_yslab(r, dd, p.srrthick)
            && in_zslab(r, 0.0, p.cbarthick)
        {
            return 1.0;
        }
        if p.insplitting > 0.0
            && in_xcyl(r, dd, 0.0, p.incapacitorr)
            && in_xslab(r, dd, p.insplitting + 2.0 * p.srrthick)
        {
            return 1.0;
        }
    }
    0.0
}

/// Sphere embedded in a dielectric layer, with optional wires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SphereInDiel {
    #[serde(flatten)]
    pub sphere: SphereWire,
    /// Permittivity of the embedding layer
    pub diel: f64,
}

impl Default for SphereInDiel {
    fn default() -> Self {
        Self {
            sphere: SphereWire::default(),
            diel: 1.0,
        }
    }
}

pub fn sphere_in_diel_host(r: [f64; 3], p: &SphereInDiel) -> f64 {
    if sphere_wire_sphere(r, &p.sphere) > 0.0 {
        return 0.0;
    }
    weight(in_zslab(r, 0.0, p.sphere.cellsize))
}

/// Single-layer fishnet: a metal sheet with rounded rectangular holes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fishnet {
    pub simtime: f64,
    pub resolution: f64,
    pub cellsize: f64,
    pub cornerradius: f64,
    pub xholesize: f64,
    /// `inf` gives a one-dimensional grating of strips
    pub yholesize: f64,
    pub slabthick: f64,
    /// Distance of two sheets; zero for a single one
    pub slabcdist: f64,
}

impl Default for Fishnet {
    fn default() -> Self {
        Self {
            simtime: 150e-12,
            resolution: 4e-6,
            cellsize: 100e-6,
            cornerradius: 30e-6,
            xholesize: 80e-6,
            yholesize: 80e-6,
            slabthick: 12e-6,
            slabcdist: 0.0,
        }
    }
}

pub fn fishnet_metal(r: [f64; 3], p: &Fishnet) -> f64 {
    let dd = p.resolution / 4.0;
    let in_sheet = in_zslab(r, -p.slabcdist / 2.0, p.slabthick)
        || in_zslab(r, p.slabcdist / 2.0, p.slabthick);
    if !in_sheet {
        return 0.0;
    }
    let xhr = p.xholesize / 2.0 - p.cornerradius;
    let yhr = p.yholesize / 2.0 - p.cornerradius;
    let in_hole = (in_xslab(r, dd, 2.0 * xhr) && in_yslab(r, dd, p.yholesize))
        || (in_xslab(r, dd, p.xholesize) && in_yslab(r, dd, 2.0 * yhr))
        || [(1.0, 1.0), (-1.0, 1.0), (1.0, -1.0), (-1.0, -1.0)]
            .iter()
            .any(|(sx, sy)| in_zcyl(r, dd + sx * xhr, dd + sy * yhr, p.cornerradius));
    weight(!in_hole)
}

/// Two gratings of wires along x, `ldist` apart in z; the second one may be shifted in y
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TMathieuGrating {
    pub simtime: f64,
    pub resolution: f64,
    /// Vacuum gap kept on both sides of the gratings
    pub padding: f64,
    /// Wire period of the gratings
    pub tdist: f64,
    /// Distance of the two gratings
    pub ldist: f64,
    pub rcore1: f64,
    pub rcore2: f64,
    /// Transverse shift of the second grating
    pub tshift: f64,
}

impl Default for TMathieuGrating {
    fn default() -> Self {
        Self {
            simtime: 200e-15,
            resolution: 20e-9,
            padding: 50e-6,
            tdist: 50e-6,
            ldist: 100e-6,
            rcore1: 6e-6,
            rcore2: 6e-6,
            tshift: 0.0,
        }
    }
}

impl TMathieuGrating {
    pub fn cellsize(&self) -> f64 {
        self.ldist + 2.0 * self.padding
    }
}

pub fn grating_wires(r: [f64; 3], p: &TMathieuGrating) -> f64 {
    let z2 = p.ldist / 2.0;
    let first = in_xcyl(r, 0.0, -z2, p.rcore1);
    // the shifted wire and its image one cell below
    let second = in_xcyl(r, p.tshift, z2, p.rcore2)
        || in_xcyl(r, p.tshift - p.cellsize(), z2, p.rcore2);
    weight(first || second)
}

/// Half-space `z > 0` with an optional smooth anti-reflex transition of width `blend`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HalfSpace {
    pub simtime: f64,
    pub resolution: f64,
    pub cellsize: f64,
    pub epsilon: f64,
    pub blend: f64,
}

impl Default for HalfSpace {
    fn default() -> Self {
        Self {
            simtime: 100e-15,
            resolution: 10e-9,
            cellsize: 200e-9,
            epsilon: 33.97,
            blend: 0.0,
        }
    }
}

pub fn half_space_medium(r: [f64; 3], p: &HalfSpace) -> f64 {
    let z = r[2];
    if z < -0.5 * p.blend {
        return 0.0;
    }
    if p.blend == 0.0 || z > 0.5 * p.blend {
        return 1.0;
    }
    0.5 * (1.0 + (z / (0.5 * p.blend) * PI / 2.0).sin())
}
