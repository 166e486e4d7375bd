//! Estimation options consumed by the optimizer's property-estimation
//! integration.
//!
//! The schema is owned by that integration; this module only constructs and
//! serializes it. Weights and denominators are fixed: both trained property
//! classes weigh equally, and the denominators carry the spread expected of
//! each property.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_SERVER_ADDRESS: &str = "localhost";
pub const SIMULATION_LAYER: &str = "SimulationLayer";
pub const TRAINING_SET_PATH: &str = "training-set.json";

#[derive(Debug, Error)]
pub enum OptionsError {
    #[error("I/O error for '{path}': {source}", path = path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A physical quantity as the estimation schema spells it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: String,
}

impl Quantity {
    pub fn new(value: f64, unit: &str) -> Self {
        Self {
            value,
            unit: unit.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionOptions {
    pub server_address: String,
    pub server_port: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationOptions {
    pub calculation_layers: Vec<String>,
}

/// The options file handed to the optimizer's estimator integration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionsFile {
    pub connection_options: ConnectionOptions,
    pub estimation_options: CalculationOptions,
    pub data_set_path: String,
    pub weights: BTreeMap<String, f64>,
    pub denominators: BTreeMap<String, Quantity>,
}

impl OptionsFile {
    /// Options for a training run against a local estimation server.
    pub fn for_training_run(port: u16) -> Self {
        let mut weights = BTreeMap::new();
        weights.insert("Density".to_string(), 1.0);
        weights.insert("EnthalpyOfMixing".to_string(), 1.0);

        let mut denominators = BTreeMap::new();
        denominators.insert(
            "Density".to_string(),
            Quantity::new(0.05, "gram / milliliter"),
        );
        denominators.insert(
            "EnthalpyOfMixing".to_string(),
            Quantity::new(1.6, "kilojoule / mole"),
        );

        Self {
            connection_options: ConnectionOptions {
                server_address: DEFAULT_SERVER_ADDRESS.to_string(),
                server_port: port,
            },
            estimation_options: CalculationOptions {
                calculation_layers: vec![SIMULATION_LAYER.to_string()],
            },
            data_set_path: TRAINING_SET_PATH.to_string(),
            weights,
            denominators,
        }
    }

    pub fn to_json(&self) -> Result<String, OptionsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the options as JSON, creating parent directories as needed.
    pub fn write_to_path(&self, path: &Path) -> Result<(), OptionsError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| OptionsError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| OptionsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}
