//! Metamaterial unit-cell models
//!
//! A [`ModelConfig`] names one of the known structures together with its
//! parameters; [`ModelConfig::build`] validates them and produces the
//! [`Model`] consumed by the simulation driver. Configurations deserialize
//! from a table whose `model` key selects the variant, so the same form works
//! for TOML files and `key=value` overrides.

pub mod materials;
pub mod structures;

use crate::domain::material::Material;
use crate::domain::source::TimeProfile;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use structures::{
    EsrrArray, Fishnet, HalfSpace, Permittivity, RodArray, Slab, SphereInDiel, SphereWire,
    TMathieuGrating,
};

/// Parameters shared by every model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommonParams {
    /// Free text; some models pick their metal from it
    pub comment: String,
    /// Forced wavevector (rad/m)
    #[serde(rename = "Kx", alias = "kx")]
    pub kx: f64,
    #[serde(rename = "Ky", alias = "ky")]
    pub ky: f64,
    #[serde(rename = "Kz", alias = "kz")]
    pub kz: f64,
    /// Solve one frequency with the CW solver instead of time stepping
    pub frequency_domain: bool,
    /// CW frequency (Hz)
    pub frequency: f64,
    #[serde(rename = "MaxTol", alias = "max_tol")]
    pub max_tol: f64,
    #[serde(rename = "MaxIter", alias = "max_iter")]
    pub max_iter: usize,
    /// Krylov dimension ℓ of BiCGStab(ℓ)
    #[serde(rename = "BiCGStab", alias = "bicgstab")]
    pub bicgstab: usize,
}

impl Default for CommonParams {
    fn default() -> Self {
        Self {
            comment: String::new(),
            kx: 0.0,
            ky: 0.0,
            kz: 0.0,
            frequency_domain: false,
            frequency: 0.0,
            max_tol: 1e-3,
            max_iter: 5000,
            bicgstab: 8,
        }
    }
}

/// Common parameters plus those of one structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Params<S> {
    #[serde(flatten)]
    pub common: CommonParams,
    #[serde(flatten)]
    pub structure: S,
}

/// A model selected by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model")]
pub enum ModelConfig {
    #[serde(alias = "default")]
    Slab(Params<Slab>),
    SphereWire(Params<SphereWire>),
    RodArray(Params<RodArray>),
    #[serde(rename = "ESRRArray", alias = "SRRArray")]
    EsrrArray(Params<EsrrArray>),
    SphereInDiel(Params<SphereInDiel>),
    Fishnet(Params<Fishnet>),
    #[serde(rename = "TMathieu_Grating", alias = "TMathieuGrating")]
    TMathieuGrating(Params<TMathieuGrating>),
    HalfSpace(Params<HalfSpace>),
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig::Slab(Params::default())
    }
}

/// Everything the driver needs to set up one unit-cell simulation
#[derive(Debug, Clone)]
pub struct Model {
    pub simulation_name: String,
    /// Cell extent (m); cubic for current-driven homogenisation
    pub size: [f64; 3],
    pub resolution: f64,
    pub simtime: f64,
    /// Centre frequency and bandwidth of the pulse (Hz)
    pub src_freq: f64,
    pub src_width: f64,
    /// Forced wavevector (rad/m)
    pub k: [f64; 3],
    pub materials: Vec<Material>,
    pub frequency_domain: bool,
    pub frequency: f64,
    pub max_tol: f64,
    pub max_iter: usize,
    pub bicgstab: usize,
    /// Flattened parameter record, sorted by key
    pub parameters: Vec<(String, String)>,
}

impl Model {
    /// Source time dependence: the CW tone, or a band-limited pulse ending at simtime/10
    pub fn time_profile(&self) -> TimeProfile {
        if self.frequency_domain {
            TimeProfile::continuous(self.frequency)
        } else {
            TimeProfile::band_limited(self.src_freq, self.src_width, self.simtime / 10.0)
        }
    }
}

/// Sizes of one structure in a uniform shape
struct Dimensions {
    simtime: f64,
    resolution: f64,
    cellsize: f64,
}

fn require_positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

fn require_non_negative(name: &str, value: f64) -> Result<()> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(Error::Configuration(format!(
            "{name} must not be negative, got {value}"
        )))
    }
}

/// Metal named in a free-text comment, falling back to `otherwise`
fn metal_from_comment(comment: &str, otherwise: Material) -> Material {
    if comment.contains("Au") {
        materials::gold()
    } else if comment.contains("Ag") {
        materials::silver()
    } else {
        otherwise
    }
}

fn sphere_material(p: &SphereWire) -> Result<Material> {
    let material = match &p.epsilon {
        Permittivity::Named(name) => {
            let mut m = materials::by_name(name).ok_or_else(|| {
                Error::Configuration(format!("unknown sphere permittivity '{name}'"))
            })?;
            // `loss` scales the damping of the leading pole
            if let Some(first) = m.poles.first_mut() {
                first.gamma *= p.loss;
            }
            m
        }
        Permittivity::Value(eps) => {
            require_positive("epsilon", *eps)?;
            materials::dielectric(*eps)
        }
    };
    let geometry = p.clone();
    Ok(material.with_membership(move |r| structures::sphere_wire_sphere(r, &geometry)))
}

fn wire_material(p: &SphereWire) -> Material {
    let geometry = p.clone();
    materials::gold().with_membership(move |r| structures::sphere_wire_wire(r, &geometry))
}

impl ModelConfig {
    /// Model for a name of the registry, with default parameters
    pub fn from_name(name: &str) -> Result<Self> {
        let config = match name {
            "default" | "Slab" => ModelConfig::Slab(Params::default()),
            "SphereWire" => ModelConfig::SphereWire(Params::default()),
            "RodArray" => ModelConfig::RodArray(Params::default()),
            "ESRRArray" | "SRRArray" => ModelConfig::EsrrArray(Params::default()),
            "SphereInDiel" => ModelConfig::SphereInDiel(Params::default()),
            "Fishnet" => ModelConfig::Fishnet(Params::default()),
            "TMathieu_Grating" | "TMathieuGrating" => {
                ModelConfig::TMathieuGrating(Params::default())
            }
            "HalfSpace" => ModelConfig::HalfSpace(Params::default()),
            other => {
                return Err(Error::Configuration(format!("unknown model '{other}'")));
            }
        };
        Ok(config)
    }

    pub fn common(&self) -> &CommonParams {
        match self {
            ModelConfig::Slab(p) => &p.common,
            ModelConfig::SphereWire(p) => &p.common,
            ModelConfig::RodArray(p) => &p.common,
            ModelConfig::EsrrArray(p) => &p.common,
            ModelConfig::SphereInDiel(p) => &p.common,
            ModelConfig::Fishnet(p) => &p.common,
            ModelConfig::TMathieuGrating(p) => &p.common,
            ModelConfig::HalfSpace(p) => &p.common,
        }
    }

    /// Flattened `(key, value)` record of every parameter, sorted by key
    pub fn parameter_record(&self) -> Result<Vec<(String, String)>> {
        let value = toml::Value::try_from(self)
            .map_err(|e| Error::Configuration(format!("cannot record parameters: {e}")))?;
        let toml::Value::Table(table) = value else {
            return Err(Error::Configuration("parameters are not a table".into()));
        };
        Ok(table
            .into_iter()
            .map(|(key, value)| {
                let text = match value {
                    toml::Value::String(s) => s,
                    toml::Value::Float(f) => format!("{f:e}"),
                    other => other.to_string(),
                };
                (key, text)
            })
            .collect())
    }

    /// Validate the parameters and build the model
    pub fn build(&self) -> Result<Model> {
        let common = self.common();
        let (name, dims, (src_freq, src_width), materials) = match self {
            ModelConfig::Slab(Params { structure: p, .. }) => {
                require_positive("epsilon", p.epsilon)?;
                if !(0.0..=1.0).contains(&p.fillfraction) {
                    return Err(Error::Configuration(format!(
                        "fillfraction must lie in [0, 1], got {}",
                        p.fillfraction
                    )));
                }
                let geometry = p.clone();
                let material = metal_from_comment(&common.comment, materials::dielectric(p.epsilon))
                    .with_membership(move |r| structures::slab_layer(r, &geometry));
                (
                    "Slab",
                    Dimensions {
                        simtime: p.simtime,
                        resolution: p.resolution,
                        cellsize: p.cellsize,
                    },
                    (1000e9, 4000e9),
                    vec![material],
                )
            }
            ModelConfig::SphereWire(Params { structure: p, .. }) => {
                require_non_negative("radius", p.radius)?;
                require_non_negative("wirethick", p.wirethick)?;
                let mut list = Vec::new();
                if p.radius > 0.0 {
                    list.push(sphere_material(p)?);
                }
                if p.wirethick > 0.0 {
                    list.push(wire_material(p));
                }
                (
                    "SphereWire",
                    Dimensions {
                        simtime: p.simtime,
                        resolution: p.resolution,
                        cellsize: p.cellsize,
                    },
                    (1000e9, 4000e9),
                    list,
                )
            }
            ModelConfig::RodArray(Params { structure: p, .. }) => {
                require_positive("radius", p.radius)?;
                let geometry = p.clone();
                let rod = materials::tio2()
                    .with_membership(move |r| structures::rod_array_rod(r, &geometry));
                (
                    "RodArray",
                    Dimensions {
                        simtime: p.simtime,
                        resolution: p.resolution,
                        cellsize: p.cellsize,
                    },
                    (2000e9, 4000e9),
                    vec![rod],
                )
            }
            ModelConfig::EsrrArray(Params { structure: p, .. }) => {
                require_positive("radius", p.radius)?;
                require_positive("srrthick", p.srrthick)?;
                let geometry = p.clone();
                let metal = materials::gold()
                    .with_membership(move |r| structures::esrr_metal(r, &geometry));
                (
                    "SRRArray",
                    Dimensions {
                        simtime: p.simtime,
                        resolution: p.resolution,
                        cellsize: p.cellsize,
                    },
                    (1000e9, 4000e9),
                    vec![metal],
                )
            }
            ModelConfig::SphereInDiel(Params { structure: p, .. }) => {
                let s = &p.sphere;
                require_non_negative("radius", s.radius)?;
                require_positive("diel", p.diel)?;
                let mut list = Vec::new();
                if s.radius > 0.0 {
                    list.push(sphere_material(s)?);
                }
                let geometry = p.clone();
                list.push(
                    materials::dielectric(p.diel)
                        .with_membership(move |r| structures::sphere_in_diel_host(r, &geometry)),
                );
                if s.wirethick > 0.0 {
                    list.push(wire_material(s));
                }
                (
                    "SphereInDiel",
                    Dimensions {
                        simtime: s.simtime,
                        resolution: s.resolution,
                        cellsize: s.cellsize,
                    },
                    (1000e9, 4000e9),
                    list,
                )
            }
            ModelConfig::Fishnet(Params { structure: p, .. }) => {
                require_positive("slabthick", p.slabthick)?;
                require_non_negative("cornerradius", p.cornerradius)?;
                let mut metal = materials::gold();
                if let Some(drude) = metal.poles.first_mut() {
                    drude.sigma /= 10.0;
                    drude.gamma *= 10.0;
                }
                let geometry = p.clone();
                let metal = metal.with_membership(move |r| structures::fishnet_metal(r, &geometry));
                (
                    "Fishnet",
                    Dimensions {
                        simtime: p.simtime,
                        resolution: p.resolution,
                        cellsize: p.cellsize,
                    },
                    (1000e9, 4000e9),
                    vec![metal],
                )
            }
            ModelConfig::TMathieuGrating(Params { structure: p, .. }) => {
                require_positive("ldist", p.ldist)?;
                require_non_negative("padding", p.padding)?;
                require_positive("rcore1", p.rcore1)?;
                require_positive("rcore2", p.rcore2)?;
                let geometry = p.clone();
                let wires = materials::gold()
                    .with_membership(move |r| structures::grating_wires(r, &geometry));
                (
                    "TMathieu_Grating",
                    Dimensions {
                        simtime: p.simtime,
                        resolution: p.resolution,
                        cellsize: p.cellsize(),
                    },
                    (500e12, 2000e12),
                    vec![wires],
                )
            }
            ModelConfig::HalfSpace(Params { structure: p, .. }) => {
                require_non_negative("blend", p.blend)?;
                let medium = if common.comment.contains("metal") && !common.comment.contains("Au") && !common.comment.contains("Ag") {
                    // lossless free-electron metal
                    let mut m = materials::gold();
                    m.poles.truncate(1);
                    if let Some(drude) = m.poles.first_mut() {
                        drude.gamma = 0.0;
                    }
                    m
                } else {
                    require_positive("epsilon", p.epsilon)?;
                    metal_from_comment(&common.comment, materials::dielectric(p.epsilon))
                };
                let geometry = p.clone();
                let medium =
                    medium.with_membership(move |r| structures::half_space_medium(r, &geometry));
                (
                    "HalfSpace",
                    Dimensions {
                        simtime: p.simtime,
                        resolution: p.resolution,
                        cellsize: p.cellsize,
                    },
                    (500e12, 100e12),
                    vec![medium],
                )
            }
        };

        require_positive("simtime", dims.simtime)?;
        require_positive("resolution", dims.resolution)?;
        require_positive("cellsize", dims.cellsize)?;
        if dims.cellsize < dims.resolution {
            return Err(Error::Configuration(format!(
                "cellsize {:e} m is smaller than one cell of {:e} m",
                dims.cellsize, dims.resolution
            )));
        }
        if common.frequency_domain {
            require_positive("frequency", common.frequency)?;
            if common.max_iter == 0 || common.bicgstab == 0 {
                return Err(Error::Configuration(
                    "MaxIter and BiCGStab must be at least 1".into(),
                ));
            }
            require_positive("MaxTol", common.max_tol)?;
        }

        Ok(Model {
            simulation_name: name.to_string(),
            size: [dims.cellsize; 3],
            resolution: dims.resolution,
            simtime: dims.simtime,
            src_freq,
            src_width,
            k: [common.kx, common.ky, common.kz],
            materials,
            frequency_domain: common.frequency_domain,
            frequency: common.frequency,
            max_tol: common.max_tol,
            max_iter: common.max_iter,
            bicgstab: common.bicgstab,
            parameters: self.parameter_record()?,
        })
    }
}
