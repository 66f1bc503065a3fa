use cmorfix_fixer_api::{Fix, FixConstructor, FixMeta};
use cmorfix_types::{HandlerKey, Stage};

mod cmip5;
mod cmip6;

/// A built-in handler: catalog metadata plus its constructor.
pub(crate) struct BuiltinFix {
    pub meta: FixMeta,
    pub construct: FixConstructor,
}

fn boxed<F: Fix + Default + 'static>() -> anyhow::Result<Box<dyn Fix>> {
    Ok(Box::new(F::default()))
}

pub(crate) static BUILTIN: &[BuiltinFix] = &[
    BuiltinFix {
        meta: FixMeta {
            project: "CMIP5",
            model: "CanESM2",
            variable: "fgco2",
            stages: &[Stage::Data],
            title: "CanESM2 fgco2 carbon mass",
            description: "CanESM2 reports the air-sea CO2 flux as mass of CO2. The data stage \
                rescales it by 12/44 so it is expressed as mass of carbon.",
        },
        construct: boxed::<cmip5::CanEsm2Fgco2>,
    },
    BuiltinFix {
        meta: FixMeta {
            project: "CMIP5",
            model: "FGOALS-g2",
            variable: "allvars",
            stages: &[Stage::Metadata],
            title: "FGOALS-g2 horizontal coordinate noise",
            description: "Latitude and longitude points and bounds carry floating point noise \
                that breaks grid comparisons. They are rounded to 4 decimals.",
        },
        construct: boxed::<cmip5::FgoalsG2AllVars>,
    },
    BuiltinFix {
        meta: FixMeta {
            project: "CMIP6",
            model: "CESM2",
            variable: "cl",
            stages: &[Stage::File],
            title: "CESM2 cl inverted vertical bounds",
            description: "Some CESM2 cloud fraction files store the lev bounds as [upper, lower]. \
                The file stage writes a repaired copy with every pair in [lower, upper] order \
                and loads that copy instead. Files without inverted pairs are loaded as-is.",
        },
        construct: boxed::<cmip6::Cesm2Cl>,
    },
    BuiltinFix {
        meta: FixMeta {
            project: "CMIP6",
            model: "CESM2",
            variable: "tas",
            stages: &[Stage::Metadata],
            title: "CESM2 tas missing height coordinate",
            description: "Near-surface air temperature lacks the scalar height coordinate. The \
                metadata stage adds height = 2 m when it is missing.",
        },
        construct: boxed::<cmip6::Cesm2Tas>,
    },
    BuiltinFix {
        meta: FixMeta {
            project: "CMIP6",
            model: "MCM-UA-1-0",
            variable: "hfss",
            stages: &[Stage::Metadata, Stage::Data],
            title: "MCM-UA-1-0 hfss units and sign",
            description: "Sensible heat flux is written with units 'W/m2' and the opposite sign \
                convention. The metadata stage rewrites the units to 'W m-2'; the data stage \
                flips the sign and refuses to run on uncorrected units.",
        },
        construct: boxed::<cmip6::McmUa10Hfss>,
    },
];

/// Catalog entries of every built-in fix, in table order.
pub fn builtin_fix_metas() -> Vec<FixMeta> {
    BUILTIN.iter().map(|f| f.meta).collect()
}

/// Find a built-in fix by `project/model/variable`. Hyphens and underscores are interchangeable.
pub fn lookup_fix_meta(key: &str) -> Option<FixMeta> {
    let wanted = HandlerKey::parse(key)?;
    BUILTIN
        .iter()
        .map(|f| f.meta)
        .find(|m| m.key() == wanted)
}
