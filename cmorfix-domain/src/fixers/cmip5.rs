use cmorfix_fixer_api::Fix;
use cmorfix_types::Cube;

const CARBON_PER_CO2: f64 = 12.0 / 44.0;

#[derive(Debug, Default)]
pub struct CanEsm2Fgco2;

impl Fix for CanEsm2Fgco2 {
    fn fix_data(&self, cube: Cube) -> anyhow::Result<Cube> {
        Ok(cube.map_data(|v| v * CARBON_PER_CO2))
    }
}

#[derive(Debug, Default)]
pub struct FgoalsG2AllVars;

impl FgoalsG2AllVars {
    const DECIMALS: i32 = 4;

    fn round(v: f64) -> f64 {
        let scale = 10f64.powi(Self::DECIMALS);
        (v * scale).round() / scale
    }
}

impl Fix for FgoalsG2AllVars {
    fn fix_metadata(&self, mut cube: Cube) -> anyhow::Result<Cube> {
        for name in ["lat", "lon", "latitude", "longitude"] {
            let Some(coord) = cube.coord_mut(name) else {
                continue;
            };
            for p in coord.points.iter_mut() {
                *p = Self::round(*p);
            }
            if let Some(bounds) = coord.bounds.as_mut() {
                for pair in bounds.iter_mut() {
                    *pair = [Self::round(pair[0]), Self::round(pair[1])];
                }
            }
        }
        Ok(cube)
    }
}
