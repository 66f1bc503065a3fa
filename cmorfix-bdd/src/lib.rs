//! BDD harness (cucumber-rs).
//!
//! This crate keeps scenario tests isolated from the production crates. The helpers below build
//! on-disk dataset fixtures shared by the step definitions.

use camino::{Utf8Path, Utf8PathBuf};
use cmorfix_types::{Coord, Cube};
use fs_err as fs;

/// Parse a comma separated list of numbers, e.g. `"10, -4"`.
pub fn parse_values(text: &str) -> Vec<f64> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse().unwrap_or(f64::NAN))
        .collect()
}

/// A time series cube with one point per value.
pub fn series_cube(var_name: &str, units: &str, values: &[f64]) -> Cube {
    let times = (0..values.len()).map(|i| i as f64).collect();
    Cube::new(var_name, units)
        .with_dim(Coord::new("time", "days since 2000-01-01", times))
        .with_data(values.to_vec())
}

/// Write `cube` as `<data_root>/<project>/<dataset>/<file_name>`.
pub fn write_input(
    data_root: &Utf8Path,
    project: &str,
    dataset: &str,
    file_name: &str,
    cube: &Cube,
) -> std::io::Result<Utf8PathBuf> {
    let dir = data_root.join(project).join(dataset);
    fs::create_dir_all(&dir)?;
    let path = dir.join(file_name);
    let json = serde_json::to_string_pretty(cube)?;
    fs::write(&path, json)?;
    Ok(path)
}
