use cmorfix_types::report::{
    DatasetReport, DatasetStatus, HandlerRecord, LoadReport, ResolutionStatus, ToolInfo,
    VariableReport, VariableStatus,
};
use cmorfix_types::{Coord, Cube, CubeError};
use pretty_assertions::assert_eq;

fn sample_cube() -> Cube {
    Cube::new("tas", "K")
        .with_dim(Coord::new("time", "days since 1850-01-01", vec![0.0, 31.0]))
        .with_dim(Coord::new("lat", "degrees_north", vec![-45.0, 0.0, 45.0]))
        .with_data(vec![280.0, 290.0, 300.0, 281.0, 291.0, 301.0])
}

#[test]
fn shape_follows_dim_coords() {
    let cube = sample_cube();
    assert_eq!(cube.shape(), vec![2, 3]);
    assert_eq!(cube.ndim(), 2);
    assert!(cube.has_dim("time"));
    assert!(cube.validate().is_ok());
}

#[test]
fn validate_rejects_short_data() {
    let mut cube = sample_cube();
    cube.data.pop();
    assert_eq!(
        cube.validate(),
        Err(CubeError::ShapeMismatch {
            expected: 6,
            actual: 5
        })
    );
}

#[test]
fn validate_rejects_bounds_of_wrong_length() {
    let mut cube = sample_cube();
    cube.coord_mut("lat").unwrap().bounds = Some(vec![[-90.0, -22.5]]);
    let err = cube.validate().unwrap_err();
    assert!(err.to_string().contains("'lat'"));
}

#[test]
fn map_data_skips_fill_values() {
    let mut cube = sample_cube();
    cube.fill_value = Some(1e20);
    cube.data[0] = 1e20;
    let cube = cube.map_data(|v| -v);
    assert_eq!(cube.data[0], 1e20);
    assert_eq!(cube.data[1], -290.0);
}

#[test]
fn metadata_digest_ignores_data() {
    let a = sample_cube();
    let b = a.clone().map_data(|v| v * 2.0);
    assert_eq!(a.metadata_digest(), b.metadata_digest());

    let mut c = a.clone();
    c.units = "degC".to_string();
    assert_ne!(a.metadata_digest(), c.metadata_digest());
}

#[test]
fn cube_json_defaults_fill_in_missing_fields() {
    let cube: Cube = serde_json::from_str(r#"{ "var_name": "pr", "data": [] }"#).unwrap();
    assert_eq!(cube.schema, cmorfix_types::schema::CMORFIX_CUBE_V1);
    assert!(cube.attributes.is_empty());
    assert!(cube.dim_coords.is_empty());
    assert_eq!(cube.units, "");
}

#[test]
fn report_summary_counts_applied_handlers_of_loaded_variables() {
    let mut report = LoadReport::new(ToolInfo {
        name: "cmorfix".to_string(),
        version: Some("test".to_string()),
    });
    let handler = |status| HandlerRecord {
        key: "CMIP6/CESM2/tas".to_string(),
        status,
        detail: None,
    };
    report.datasets.push(DatasetReport {
        project: "CMIP6".to_string(),
        dataset: "CESM2".to_string(),
        status: DatasetStatus::Failed,
        reason: None,
        variables: vec![
            VariableReport {
                short_name: "tas".to_string(),
                source_path: "tas.json".to_string(),
                loaded_path: Some("tas.json".to_string()),
                output_path: None,
                handler: Some(handler(ResolutionStatus::Found)),
                status: VariableStatus::Loaded,
                failure: None,
                metadata_digest: None,
            },
            VariableReport {
                short_name: "pr".to_string(),
                source_path: "pr.json".to_string(),
                loaded_path: None,
                output_path: None,
                handler: Some(handler(ResolutionStatus::Found)),
                status: VariableStatus::Failed,
                failure: None,
                metadata_digest: None,
            },
        ],
    });
    report.finish();

    assert!(report.run.ended_at.is_some());
    assert!(report.has_failures());
    assert_eq!(report.summary.datasets_total, 1);
    assert_eq!(report.summary.datasets_failed, 1);
    assert_eq!(report.summary.variables_loaded, 1);
    assert_eq!(report.summary.variables_failed, 1);
    assert_eq!(report.summary.handlers_applied, 1);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["schema"], "cmorfix.report.v1");
    assert_eq!(json["datasets"][0]["status"], "failed");
    assert_eq!(json["datasets"][0]["variables"][0]["handler"]["status"], "found");
}
