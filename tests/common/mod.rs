//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use ipm_forecast::model::Predictor;
use ipm_forecast::model::artifact::ModelArtifact;
use ipm_forecast::series::{Components, Observation, Record};

/// Linear artifact over the full training feature order.
///
/// `IPM = 0.5 * UHH + HLS + RLS + 0.000001 * Pengeluaran`
pub const LINEAR_ARTIFACT: &str = r#"{
    "features": ["UHH", "HLS", "RLS", "Pengeluaran", "Tahun"],
    "model": {
        "type": "linear",
        "intercept": 0.0,
        "coefficients": [0.5, 1.0, 1.0, 0.000001, 0.0]
    }
}"#;

/// Historical dataset: two regions with several years, one with a single year.
pub const HISTORY_CSV: &str = "\
Cakupan,Tahun,UHH,HLS,RLS,Pengeluaran,IPM
Kota Bandung,2018,73.9,13.9,10.6,16000000,80.3
Kota Bandung,2019,74.0,14.0,10.7,16400000,81.0
Kota Bandung,2020,74.1,14.1,10.8,16100000,81.1
Kota Bandung,2021,74.2,14.2,10.9,16300000,81.5
Kota Bandung,2022,74.4,14.3,11.0,16900000,82.0
Kab. Aceh Besar,2019,70.1,14.5,9.4,9500000,72.5
Kab. Aceh Besar,2020,70.2,14.6,9.5,9400000,72.8
Kab. Aceh Besar,2021,70.3,14.7,9.6,9600000,
Kab. Aceh Besar,2022,70.5,14.8,9.8,9900000,73.9
Kab. Nduga,2022,55.1,5.0,1.1,4000000,32.8
";

/// Predictor built from [`LINEAR_ARTIFACT`].
pub fn linear_predictor() -> Predictor {
    ModelArtifact::from_json_str(LINEAR_ARTIFACT)
        .and_then(ModelArtifact::into_predictor)
        .expect("fixture artifact should load")
}

/// Builds one record with every component set.
pub fn record(region: &str, year: i32, c: [f64; 4], ipm: Option<f64>) -> Record {
    Record {
        region: Some(region.to_string()),
        observation: Observation {
            year,
            components: Components::new(c[0], c[1], c[2], c[3]),
            composite: ipm,
        },
    }
}

/// Fresh per-test scratch directory under the system temp dir.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ipm-forecast-{name}-{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("scratch dir should be creatable");
    dir
}

/// Writes the model artifact and history CSV plus a config pointing at them.
///
/// Returns the config path.
pub fn write_fixture_files(dir: &std::path::Path) -> PathBuf {
    let model = dir.join("model_ipm.json");
    let history = dir.join("data_ipm.csv");
    fs::write(&model, LINEAR_ARTIFACT).expect("write model");
    fs::write(&history, HISTORY_CSV).expect("write history");
    let config = dir.join("ipm.toml");
    let toml = format!(
        "[paths]\nmodel = {:?}\nhistory = {:?}\n\n[forecast]\nmethod = \"drift\"\nhorizon = 3\n",
        model.display().to_string(),
        history.display().to_string()
    );
    fs::write(&config, toml).expect("write config");
    config
}
