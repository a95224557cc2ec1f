//! Membership predicates for simple solids
//!
//! Positions are `[x, y, z]` in metres. All tests are strict, so points on a
//! surface are outside.

/// Ball of radius `radius` around `center`
pub fn in_sphere(r: [f64; 3], center: [f64; 3], radius: f64) -> bool {
    let d: f64 = (0..3).map(|a| (r[a] - center[a]).powi(2)).sum();
    d < radius * radius
}

/// Axis-aligned ellipsoid with semi-axes `radii`
pub fn in_ellipsoid(r: [f64; 3], center: [f64; 3], radii: [f64; 3]) -> bool {
    if radii.iter().any(|&s| s <= 0.0) {
        return false;
    }
    let d: f64 = (0..3).map(|a| ((r[a] - center[a]) / radii[a]).powi(2)).sum();
    d < 1.0
}

/// Infinite cylinder along `axis` through the point (`c1`, `c2`) of the two other axes
fn in_cylinder(r: [f64; 3], axis: usize, c1: f64, c2: f64, radius: f64) -> bool {
    let (a1, a2) = ((axis + 1) % 3, (axis + 2) % 3);
    // keep (c1, c2) in x, y, z order of the remaining axes
    let (p1, p2) = if a1 < a2 { (r[a1], r[a2]) } else { (r[a2], r[a1]) };
    (p1 - c1).powi(2) + (p2 - c2).powi(2) < radius * radius
}

/// Cylinder along x through (`cy`, `cz`)
pub fn in_xcyl(r: [f64; 3], cy: f64, cz: f64, radius: f64) -> bool {
    in_cylinder(r, 0, cy, cz, radius)
}

/// Cylinder along y through (`cx`, `cz`)
pub fn in_ycyl(r: [f64; 3], cx: f64, cz: f64, radius: f64) -> bool {
    in_cylinder(r, 1, cx, cz, radius)
}

/// Cylinder along z through (`cx`, `cy`)
pub fn in_zcyl(r: [f64; 3], cx: f64, cy: f64, radius: f64) -> bool {
    in_cylinder(r, 2, cx, cy, radius)
}

/// Slab of thickness `d` normal to x, centred at `cx`
pub fn in_xslab(r: [f64; 3], cx: f64, d: f64) -> bool {
    (r[0] - cx).abs() < 0.5 * d
}

/// Slab of thickness `d` normal to y, centred at `cy`
pub fn in_yslab(r: [f64; 3], cy: f64, d: f64) -> bool {
    (r[1] - cy).abs() < 0.5 * d
}

/// Slab of thickness `d` normal to z, centred at `cz`
pub fn in_zslab(r: [f64; 3], cz: f64, d: f64) -> bool {
    (r[2] - cz).abs() < 0.5 * d
}
