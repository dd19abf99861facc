//! Labeled training data read from CSV.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::Value;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::DatasetError;
use crate::observation::RawObservation;
use crate::schema::{HOUR, TIMESTAMP};

/// Raw feature rows with their throughput labels, in file order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub observations: Vec<RawObservation>,
    pub targets: Vec<f64>,
}

impl Dataset {
    pub fn from_csv_path(path: impl AsRef<Path>, target: &str) -> Result<Self, DatasetError> {
        Self::from_reader(File::open(path)?, target)
    }

    /// The target column is split off each row; every other column stays in
    /// the observation. Rows are numbered from 1 in errors.
    pub fn from_reader<R: Read>(reader: R, target: &str) -> Result<Self, DatasetError> {
        let mut csv = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers = csv.headers()?.clone();

        if !headers.iter().any(|h| h == target) {
            return Err(DatasetError::MissingColumn(target.to_string()));
        }
        if !headers.iter().any(|h| h == TIMESTAMP || h == HOUR) {
            return Err(DatasetError::MissingColumn(TIMESTAMP.to_string()));
        }

        let mut dataset = Dataset::default();
        for (index, record) in csv.records().enumerate() {
            let record = record?;
            let row = index + 1;
            let mut observation = RawObservation::from_csv_record(&headers, &record);

            let label = match observation.remove(target) {
                Some(Value::String(cell)) => cell,
                _ => String::new(),
            };
            let value = label
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or(DatasetError::InvalidTarget { row, value: label })?;

            dataset.observations.push(observation);
            dataset.targets.push(value);
        }

        if dataset.is_empty() {
            return Err(DatasetError::Empty);
        }
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Shuffled `(train, validation)` row indices. The validation share is
/// `ceil(n * test_size)`. ChaCha8 output is fixed across `rand_chacha`
/// releases, so a seed names the same split on every build.
pub fn train_validation_split(n: usize, test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let n_validation = ((n as f64) * test_size).ceil() as usize;
    let n_validation = n_validation.min(n);

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_validation);
    (train, indices)
}
