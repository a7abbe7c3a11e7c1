//! One-vs-all multiclass classification.
//!
//! Decomposes a C-class problem with one-hot targets into C independent
//! binary logistic regressions, one per target column. The sub-models are
//! built lazily at the first `train` call (the target column count fixes
//! the class count) and share the wrapper's hyperparameters.

use crate::regression::Regression;
use crate::{Error, Matrix, Result};

#[derive(Debug, Clone)]
pub struct MulticlassLogisticRegression {
    epochs: usize,
    batch_size: usize,
    learning_rate: f64,
    regularization_factor: f64,

    models: Option<Vec<Regression>>,
}

impl Default for MulticlassLogisticRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl MulticlassLogisticRegression {
    pub fn new() -> Self {
        Self {
            epochs: 1000,
            batch_size: 0,
            learning_rate: 0.001,
            regularization_factor: 0.0,
            models: None,
        }
    }

    /// Trains one logistic regression per target column.
    ///
    /// `targets` is NxC one-hot; the first call fixes the class count C.
    /// Later calls must present the same number of target columns.
    pub fn train(&mut self, inputs: &Matrix, targets: &Matrix) -> Result<()> {
        let class_count = targets.column_count();
        if class_count == 0 {
            return Err(Error::InvalidData("targets have no columns".to_owned()));
        }

        if self.models.is_none() {
            let mut models = Vec::with_capacity(class_count);
            for _ in 0..class_count {
                let mut model = Regression::logistic();
                model.set_epochs(self.epochs).set_batch_size(self.batch_size);
                model.set_learning_rate(self.learning_rate)?;
                model.set_regularization_factor(self.regularization_factor)?;
                models.push(model);
            }
            self.models = Some(models);
        }

        let models = self.models.as_mut().expect("models were just initialized");
        if models.len() != class_count {
            return Err(Error::DimensionMismatch(format!(
                "model was trained with {} classes but targets have {class_count} columns",
                models.len()
            )));
        }

        for (class, model) in models.iter_mut().enumerate() {
            model.train(inputs, &targets.column(class))?;
        }
        Ok(())
    }

    /// Predicts an NxC matrix: one column per class, in target-column order.
    pub fn predict(&self, inputs: &Matrix) -> Result<Matrix> {
        let models = self.models()?;

        let mut predictions = Matrix::zeros(0, 0);
        for model in models {
            predictions.append_right(&model.predict(inputs)?)?;
        }
        Ok(predictions)
    }

    /* Parameter setters (broadcast to existing sub-models) */

    /// Set the batch size to
    /// - 0 for batch gradient descent (the whole dataset per update)
    /// - 1 for stochastic gradient descent
    /// - greater than 1 for mini-batch gradient descent
    pub fn set_batch_size(&mut self, batch_size: usize) -> &mut Self {
        self.batch_size = batch_size;
        if let Some(models) = &mut self.models {
            for model in models {
                model.set_batch_size(batch_size);
            }
        }
        self
    }

    pub fn set_epochs(&mut self, epochs: usize) -> &mut Self {
        self.epochs = epochs;
        if let Some(models) = &mut self.models {
            for model in models {
                model.set_epochs(epochs);
            }
        }
        self
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) -> Result<&mut Self> {
        if let Some(models) = &mut self.models {
            for model in models.iter_mut() {
                model.set_learning_rate(learning_rate)?;
            }
        } else {
            // Validate eagerly even before any sub-model exists.
            Regression::logistic().set_learning_rate(learning_rate)?;
        }
        self.learning_rate = learning_rate;
        Ok(self)
    }

    pub fn set_regularization_factor(&mut self, regularization_factor: f64) -> Result<&mut Self> {
        if let Some(models) = &mut self.models {
            for model in models.iter_mut() {
                model.set_regularization_factor(regularization_factor)?;
            }
        } else {
            Regression::logistic().set_regularization_factor(regularization_factor)?;
        }
        self.regularization_factor = regularization_factor;
        Ok(self)
    }

    /// Injects one hypothesis per class, parallel to the target columns.
    ///
    /// Fails before the first `train` call, when the class count is still
    /// unknown.
    pub fn set_hypotheses(&mut self, hypotheses: Vec<Matrix>) -> Result<&mut Self> {
        let models = self.models_mut()?;
        if hypotheses.len() != models.len() {
            return Err(Error::DimensionMismatch(format!(
                "got {} hypotheses for {} classes",
                hypotheses.len(),
                models.len()
            )));
        }
        for (model, hypothesis) in models.iter_mut().zip(hypotheses) {
            model.set_hypothesis(hypothesis);
        }
        Ok(self)
    }

    /// Drops the sub-models; the next `train` call re-infers the class
    /// count and starts from scratch.
    pub fn reset(&mut self) -> &mut Self {
        self.models = None;
        self
    }

    /* Parameter getters */

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn epochs(&self) -> usize {
        self.epochs
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn regularization_factor(&self) -> f64 {
        self.regularization_factor
    }

    /// One hypothesis per class, parallel to the target columns.
    pub fn hypotheses(&self) -> Result<Vec<&Matrix>> {
        let models = self.models()?;
        models
            .iter()
            .map(|model| {
                model.hypothesis().ok_or_else(|| {
                    Error::InvalidConfig("sub-model has no hypothesis yet".to_owned())
                })
            })
            .collect()
    }

    /* Private */

    fn models(&self) -> Result<&[Regression]> {
        self.models.as_deref().ok_or_else(|| {
            Error::InvalidConfig(
                "class count is unknown until the first train call".to_owned(),
            )
        })
    }

    fn models_mut(&mut self) -> Result<&mut Vec<Regression>> {
        self.models.as_mut().ok_or_else(|| {
            Error::InvalidConfig(
                "class count is unknown until the first train call".to_owned(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xor_ish_dataset() -> (Matrix, Matrix) {
        let inputs = Matrix::from_rows(&[
            vec![5.0, 1.0],
            vec![1.0, 5.0],
            vec![4.0, 0.0],
            vec![0.0, 4.0],
        ])
        .unwrap();
        let targets = Matrix::from_rows(&[
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![0.0, 1.0],
        ])
        .unwrap();
        (inputs, targets)
    }

    #[test]
    fn train_builds_one_model_per_target_column() {
        let (inputs, targets) = xor_ish_dataset();
        let mut model = MulticlassLogisticRegression::new();
        model.set_epochs(5);
        model.train(&inputs, &targets).unwrap();

        let hypotheses = model.hypotheses().unwrap();
        assert_eq!(hypotheses.len(), 2);
        assert_eq!(hypotheses[0].row_count(), 3);
    }

    #[test]
    fn predict_concatenates_class_columns() {
        let (inputs, targets) = xor_ish_dataset();
        let mut model = MulticlassLogisticRegression::new();
        model.set_epochs(5);
        model.train(&inputs, &targets).unwrap();

        let predictions = model.predict(&inputs).unwrap();
        assert_eq!(predictions.row_count(), 4);
        assert_eq!(predictions.column_count(), 2);

        // Each sub-model's column must match its standalone prediction.
        let hypotheses = model.hypotheses().unwrap();
        let mut standalone = Regression::logistic();
        standalone.set_hypothesis(hypotheses[1].clone());
        let column = standalone.predict(&inputs).unwrap();
        for row in 0..4 {
            assert!((predictions.get(row, 1) - column.get(row, 0)).abs() < 1e-12);
        }
    }

    #[test]
    fn hypothesis_access_before_training_fails() {
        let mut model = MulticlassLogisticRegression::new();
        assert!(model.hypotheses().is_err());
        assert!(model.set_hypotheses(vec![Matrix::zeros(3, 1)]).is_err());
        assert!(model.predict(&Matrix::ones(1, 2)).is_err());
    }

    #[test]
    fn setters_broadcast_to_existing_models() {
        let (inputs, targets) = xor_ish_dataset();
        let mut model = MulticlassLogisticRegression::new();
        model.set_epochs(1);
        model.train(&inputs, &targets).unwrap();

        model.set_learning_rate(0.25).unwrap();
        assert_eq!(model.learning_rate(), 0.25);
    }

    #[test]
    fn class_count_changes_are_rejected() {
        let (inputs, targets) = xor_ish_dataset();
        let mut model = MulticlassLogisticRegression::new();
        model.set_epochs(1);
        model.train(&inputs, &targets).unwrap();

        let three_class = Matrix::zeros(4, 3);
        assert!(model.train(&inputs, &three_class).is_err());

        model.reset();
        model.train(&inputs, &three_class).unwrap();
        assert_eq!(model.hypotheses().unwrap().len(), 3);
    }
}
