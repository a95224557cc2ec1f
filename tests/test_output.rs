//! Waveform and marker files

use cdhsim::output::{write_marker, write_monitor_file};
use cdhsim::Complex64;
use std::fs;

#[test]
fn test_monitor_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("cdh");
    let parameters = vec![
        ("cellsize".to_string(), "1e-4".to_string()),
        ("model".to_string(), "Fishnet".to_string()),
    ];
    let times = [1e-15, 2e-15, 3e-15];
    let values = [
        Complex64::new(1.5, -2.0),
        Complex64::new(-3.25e-7, 0.0),
        Complex64::new(0.0, 1e20),
    ];
    let path = write_monitor_file(&out, "Fishnet", &parameters, "Ex", &times, &values).unwrap();
    assert_eq!(path, out.join("Fishnet.dat"));

    let text = fs::read_to_string(&path).unwrap();
    let header: Vec<&str> = text.lines().take_while(|l| l.starts_with('#')).collect();
    assert_eq!(
        header,
        [
            "#param cellsize,1e-4",
            "#param model,Fishnet",
            "#x-column Time [s]",
            "#Column Ex real",
            "#Column Ex imag",
        ]
    );

    let rows: Vec<Vec<f64>> = text
        .lines()
        .filter(|l| !l.starts_with('#'))
        .map(|l| l.split_whitespace().map(|x| x.parse().unwrap()).collect())
        .collect();
    assert_eq!(rows.len(), 3);
    for ((row, t), v) in rows.iter().zip(times).zip(values) {
        assert_eq!(row.len(), 3);
        assert!((row[0] - t).abs() <= 1e-6 * t);
        assert!((row[1] - v.re).abs() <= 1e-6 * v.re.abs());
        assert!((row[2] - v.im).abs() <= 1e-6 * v.im.abs());
    }
    assert!(text.contains("-3.250000e-07 0.000000e+00"));
}

#[test]
fn test_marker_holds_plain_name() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("last_simulation_name.dat");
    write_marker(&marker, "SphereWire").unwrap();
    write_marker(&marker, "RodArray").unwrap();
    assert_eq!(fs::read_to_string(&marker).unwrap(), "RodArray");
}
