use crate::pipeline::repaired_path;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use cmorfix_fixer_api::Fix;
use cmorfix_types::{Coord, Cube};
use fs_err as fs;
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Default)]
pub struct Cesm2Cl;

impl Cesm2Cl {
    /// Swap inverted `[upper, lower]` pairs of the `lev` bounds. Returns how many were swapped.
    fn repair(doc: &mut Value) -> usize {
        let Some(coords) = doc.get_mut("dim_coords").and_then(Value::as_array_mut) else {
            return 0;
        };
        let Some(lev) = coords
            .iter_mut()
            .find(|c| c.get("name").and_then(Value::as_str) == Some("lev"))
        else {
            return 0;
        };
        let Some(bounds) = lev.get_mut("bounds").and_then(Value::as_array_mut) else {
            return 0;
        };

        let mut swapped = 0;
        for pair in bounds.iter_mut() {
            let Some(items) = pair.as_array_mut() else {
                continue;
            };
            if items.len() != 2 {
                continue;
            }
            if let (Some(a), Some(b)) = (items[0].as_f64(), items[1].as_f64())
                && a > b
            {
                items.swap(0, 1);
                swapped += 1;
            }
        }
        swapped
    }
}

impl Fix for Cesm2Cl {
    fn fix_file(&self, path: &Utf8Path, output_dir: &Utf8Path) -> anyhow::Result<Utf8PathBuf> {
        let contents = fs::read_to_string(path).with_context(|| format!("read {}", path))?;
        let mut doc: Value =
            serde_json::from_str(&contents).with_context(|| format!("parse {}", path))?;

        let swapped = Self::repair(&mut doc);
        if swapped == 0 {
            return Ok(path.to_path_buf());
        }

        fs::create_dir_all(output_dir).with_context(|| format!("create {}", output_dir))?;
        let out = repaired_path(path, output_dir, "fixed");
        let json = serde_json::to_string_pretty(&doc).context("serialize repaired cube")?;
        fs::write(&out, json).with_context(|| format!("write {}", out))?;
        debug!(path = %path, repaired = %out, swapped, "swapped inverted lev bounds");
        Ok(out)
    }
}

#[derive(Debug, Default)]
pub struct Cesm2Tas;

impl Fix for Cesm2Tas {
    fn fix_metadata(&self, mut cube: Cube) -> anyhow::Result<Cube> {
        if cube.coord("height").is_none() {
            cube.scalar_coords.push(Coord::new("height", "m", vec![2.0]));
        }
        Ok(cube)
    }
}

#[derive(Debug, Default)]
pub struct McmUa10Hfss;

impl McmUa10Hfss {
    const UNITS: &'static str = "W m-2";
}

impl Fix for McmUa10Hfss {
    fn fix_metadata(&self, mut cube: Cube) -> anyhow::Result<Cube> {
        if cube.units == "W/m2" {
            cube.units = Self::UNITS.to_string();
        }
        Ok(cube)
    }

    fn fix_data(&self, cube: Cube) -> anyhow::Result<Cube> {
        anyhow::ensure!(
            cube.units == Self::UNITS,
            "expected units '{}' before flipping the sign, found '{}'",
            Self::UNITS,
            cube.units
        );
        Ok(cube.map_data(|v| -v))
    }
}
