//! Volume-averaged, plane-wave demodulated field monitor
//!
//! The monitor samples one field component on a regular cell-centred pattern
//! covering the whole unit cell and multiplies each sample by `exp(i K·r)`,
//! undoing the phase forced by the current source. What remains is the slowly
//! varying envelope used for homogenisation.

use crate::domain::maxwell::Engine;
use crate::engine::array::Complex64;
use crate::error::{Error, Result};
use crate::grid::{Component, FieldKind};
use num_traits::Zero;

/// Samples per axis used when none are given
pub const DEFAULT_SAMPLE_COUNTS: [usize; 3] = [1, 5, 3];

/// Records the demodulated volume average of one component over time
#[derive(Debug, Clone)]
pub struct AmplitudeMonitor {
    pub component: Component,
    /// Extent of the sampled box, centred on the origin (m)
    pub size: [f64; 3],
    /// Forced wavevector (rad/m)
    pub k: [f64; 3],
    counts: [usize; 3],
    times: Vec<f64>,
    values: Vec<Complex64>,
}

impl AmplitudeMonitor {
    pub fn new(component: Component, size: [f64; 3], k: [f64; 3]) -> Self {
        Self {
            component,
            size,
            k,
            counts: DEFAULT_SAMPLE_COUNTS,
            times: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn with_sample_counts(mut self, counts: [usize; 3]) -> Self {
        self.counts = counts.map(|n| n.max(1));
        self
    }

    /// Cell-centred sample positions: `(i + ½)·size/n − size/2` per axis
    pub fn sample_positions(&self) -> Vec<[f64; 3]> {
        let coords: [Vec<f64>; 3] = std::array::from_fn(|a| {
            let n = self.counts[a];
            let step = self.size[a] / n as f64;
            (0..n)
                .map(|i| (i as f64 + 0.5) * step - 0.5 * self.size[a])
                .collect()
        });
        let mut positions = Vec::with_capacity(self.counts.iter().product());
        for &x in &coords[0] {
            for &y in &coords[1] {
                for &z in &coords[2] {
                    positions.push([x, y, z]);
                }
            }
        }
        positions
    }

    /// Demodulated average of the component over the sample pattern
    ///
    /// Each sample is taken at the nearest grid node and demodulated with
    /// that node's exact position.
    pub fn average_field(&self, engine: &Engine) -> Complex64 {
        let grid = engine.grid();
        let positions = self.sample_positions();
        let sum = positions
            .iter()
            .map(|&p| {
                let idx = grid.nearest_index(self.component, p);
                let r = grid.position(self.component, idx);
                let phase = self.k[0] * r[0] + self.k[1] * r[1] + self.k[2] * r[2];
                engine.fields().array(self.component).data[idx] * Complex64::from_polar(1.0, phase)
            })
            .fold(Complex64::zero(), |acc, v| acc + v);
        sum / positions.len() as f64
    }

    /// Append the current demodulated average
    pub fn record(&mut self, engine: &Engine) -> Result<()> {
        let value = self.average_field(engine);
        if !(value.re.is_finite() && value.im.is_finite()) {
            return Err(Error::Diverged {
                time: engine.time(),
            });
        }
        self.times.push(engine.time());
        self.values.push(value);
        Ok(())
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn values(&self) -> &[Complex64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Recorded waveform aligned to the electric time grid
    ///
    /// Electric samples are returned as recorded. Magnetic fields lag half a
    /// step behind the recorded time, so consecutive samples are averaged and
    /// the last time point is dropped. Series of one sample are returned as is.
    pub fn waveforms(&self) -> (Vec<f64>, Vec<Complex64>) {
        if self.values.len() <= 1 || self.component.kind() == FieldKind::Electric {
            return (self.times.clone(), self.values.clone());
        }
        let n = self.values.len() - 1;
        let values = self
            .values
            .windows(2)
            .map(|w| (w[0] + w[1]) * 0.5)
            .collect();
        (self.times[..n].to_vec(), values)
    }
}
