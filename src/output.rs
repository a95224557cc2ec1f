//! Result files of a CDH run
//!
//! The monitor waveform goes to `<dir>/<name>.dat`: one `#param key,value`
//! line per model parameter, the column headers, then one row per sample
//! with the time and the real and imaginary part of the demodulated field.

use crate::engine::array::Complex64;
use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Default directory of the waveform files
pub const OUTPUT_DIR: &str = "cdh";

/// Default name of the file recording the last simulation name
pub const MARKER_FILE: &str = "last_simulation_name.dat";

/// `%.6e` as printed by C: six decimals, signed exponent of at least two digits
pub fn format_scientific(value: f64) -> String {
    if value.is_nan() {
        return "nan".into();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf".into() } else { "-inf".into() };
    }
    let text = format!("{value:.6e}");
    match text.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exponent.abs())
        }
        None => text,
    }
}

/// Write the header and waveform rows to any writer
pub fn write_waveform<W: Write>(
    mut out: W,
    parameters: &[(String, String)],
    component: &str,
    times: &[f64],
    values: &[Complex64],
) -> Result<()> {
    if times.len() != values.len() {
        return Err(Error::Configuration(format!(
            "{} times for {} values",
            times.len(),
            values.len()
        )));
    }
    for (key, value) in parameters {
        writeln!(out, "#param {key},{value}")?;
    }
    writeln!(out, "#x-column Time [s]")?;
    writeln!(out, "#Column {component} real")?;
    writeln!(out, "#Column {component} imag")?;
    for (t, v) in times.iter().zip(values) {
        writeln!(
            out,
            "{} {} {}",
            format_scientific(*t),
            format_scientific(v.re),
            format_scientific(v.im)
        )?;
    }
    out.flush()?;
    Ok(())
}

/// Write `<dir>/<name>.dat`, creating `dir` if needed; returns the file path
pub fn write_monitor_file(
    dir: &Path,
    name: &str,
    parameters: &[(String, String)],
    component: &str,
    times: &[f64],
    values: &[Complex64],
) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{name}.dat"));
    let file = BufWriter::new(File::create(&path)?);
    write_waveform(file, parameters, component, times, values)?;
    Ok(path)
}

/// Record `name` as the last simulation run
pub fn write_marker(path: &Path, name: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, name)?;
    Ok(())
}
