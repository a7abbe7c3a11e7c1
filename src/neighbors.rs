//! K-nearest-neighbors prediction.
//!
//! An instance-based learner: `train` stores the reference set verbatim and
//! `predict` runs an exhaustive scan per query row, averaging the target
//! vectors of the nearest examples.
//!
//! Tie handling is deliberately inclusive: when a candidate's distance ties
//! the furthest admitted neighbor, the candidate is admitted too, so the
//! retained set can grow beyond `k` at a tie boundary. Four examples all at
//! distance 1 from the query with `k = 1` all contribute to the average.

use crate::{Error, Matrix, Result};

/// Distance between two 1xF row matrices.
pub type DistanceFn = fn(&Matrix, &Matrix) -> f64;

/// Sum of squared elementwise differences; the default distance.
pub fn squared_euclidean(x: &Matrix, y: &Matrix) -> f64 {
    debug_assert_eq!(x.row_count(), y.row_count());
    debug_assert_eq!(x.column_count(), y.column_count());

    x.as_slice()
        .iter()
        .zip(y.as_slice())
        .map(|(a, b)| (a - b) * (a - b))
        .sum()
}

#[derive(Debug, Clone)]
pub struct NearestNeighbors {
    distance: DistanceFn,
    neighbor_count: usize,

    inputs: Option<Matrix>,
    targets: Option<Matrix>,
}

impl Default for NearestNeighbors {
    fn default() -> Self {
        Self::new()
    }
}

impl NearestNeighbors {
    pub fn new() -> Self {
        Self {
            distance: squared_euclidean,
            neighbor_count: 1,
            inputs: None,
            targets: None,
        }
    }

    /// Stores the reference set. No preprocessing or indexing happens here;
    /// all work is deferred to `predict`.
    pub fn train(&mut self, inputs: &Matrix, targets: &Matrix) -> Result<()> {
        if inputs.row_count() != targets.row_count() {
            return Err(Error::InvalidData(format!(
                "inputs have {} rows but targets have {} rows",
                inputs.row_count(),
                targets.row_count()
            )));
        }

        self.inputs = Some(inputs.clone());
        self.targets = Some(targets.clone());
        Ok(())
    }

    /// Predicts one target row per query row by averaging the retained
    /// neighbors' targets.
    pub fn predict(&self, inputs: &Matrix) -> Result<Matrix> {
        let (train_inputs, train_targets) = self.reference_set()?;
        if self.neighbor_count > train_inputs.row_count() {
            return Err(Error::InvalidConfig(format!(
                "{} neighbors requested but only {} training examples are stored",
                self.neighbor_count,
                train_inputs.row_count()
            )));
        }
        if inputs.column_count() != train_inputs.column_count() {
            return Err(Error::InvalidData(format!(
                "queries have {} columns but the training inputs have {}",
                inputs.column_count(),
                train_inputs.column_count()
            )));
        }

        let mut predictions = Matrix::zeros(0, 0);
        for row in 0..inputs.row_count() {
            let prediction = self.predict_one(&inputs.row(row), train_inputs, train_targets)?;
            predictions.append_bottom(&prediction)?;
        }
        Ok(predictions)
    }

    /* Parameter setters */

    pub fn set_distance(&mut self, distance: DistanceFn) -> &mut Self {
        self.distance = distance;
        self
    }

    pub fn set_neighbor_count(&mut self, neighbor_count: usize) -> Result<&mut Self> {
        if neighbor_count == 0 {
            return Err(Error::InvalidConfig(
                "neighbor count must be > 0".to_owned(),
            ));
        }
        self.neighbor_count = neighbor_count;
        Ok(self)
    }

    /* Parameter getters */

    pub fn distance(&self) -> DistanceFn {
        self.distance
    }

    pub fn neighbor_count(&self) -> usize {
        self.neighbor_count
    }

    /* Private */

    fn reference_set(&self) -> Result<(&Matrix, &Matrix)> {
        match (&self.inputs, &self.targets) {
            (Some(inputs), Some(targets)) => Ok((inputs, targets)),
            _ => Err(Error::InvalidConfig(
                "no training examples stored: call train before predict".to_owned(),
            )),
        }
    }

    fn predict_one(
        &self,
        input: &Matrix,
        train_inputs: &Matrix,
        train_targets: &Matrix,
    ) -> Result<Matrix> {
        // (distance, target row) for every retained neighbor.
        let mut neighbors: Vec<(f64, Matrix)> = Vec::with_capacity(self.neighbor_count);
        let mut furthest_distance = 0.0_f64;

        for example in 0..train_inputs.row_count() {
            let distance = (self.distance)(input, &train_inputs.row(example));

            // The first k examples are always admitted.
            if example < self.neighbor_count {
                neighbors.push((distance, train_targets.row(example)));
                if distance > furthest_distance {
                    furthest_distance = distance;
                }
                continue;
            }

            if distance > furthest_distance {
                continue;
            }

            // Admit the candidate; drop retained neighbors that are now
            // strictly further away. Neighbors tying the candidate stay,
            // which is what lets the retained set exceed k.
            if neighbors.len() >= self.neighbor_count {
                neighbors.retain(|(neighbor_distance, _)| *neighbor_distance <= distance);
            }
            neighbors.push((distance, train_targets.row(example)));

            furthest_distance = neighbors
                .iter()
                .map(|(neighbor_distance, _)| *neighbor_distance)
                .fold(0.0, f64::max);
        }

        let mut prediction = Matrix::zeros(1, train_targets.column_count());
        for (_, target) in &neighbors {
            prediction.add(target)?;
        }
        prediction.multiply_scalar(1.0 / neighbors.len() as f64);
        Ok(prediction)
    }
}
