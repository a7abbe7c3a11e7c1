//! Gradient-descent regression.
//!
//! A single trainer covers both linear and logistic regression: the two
//! differ only in the link function applied to the linear combination
//! `inputs * hypothesis`. The link is a closed enum so the batch loop stays
//! monomorphic.
//!
//! The hypothesis is a `(features + 1) x 1` column matrix; the extra leading
//! row is the bias term, represented by prepending a constant ones column to
//! the inputs. It persists across `train` calls, so training is resumable.

use crate::{Error, Matrix, Result};

/// Link function mapping the linear combination to a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    /// Identity: linear regression.
    Identity,
    /// Logistic sigmoid `1 / (1 + e^-x)`: logistic regression.
    Sigmoid,
}

impl Link {
    #[inline]
    fn apply(self, combinations: &mut Matrix) {
        match self {
            Link::Identity => {}
            Link::Sigmoid => {
                combinations.transform(|value, _, _| sigmoid(value));
            }
        }
    }
}

#[inline]
pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Debug, Clone)]
pub struct Regression {
    link: Link,
    hypothesis: Option<Matrix>,

    epochs: usize,
    batch_size: usize,
    learning_rate: f64,
    regularization_factor: f64,
}

impl Regression {
    pub fn new(link: Link) -> Self {
        Self {
            link,
            hypothesis: None,
            epochs: 1000,
            batch_size: 0,
            learning_rate: 0.001,
            regularization_factor: 0.0,
        }
    }

    /// Linear regression: identity link.
    pub fn linear() -> Self {
        Self::new(Link::Identity)
    }

    /// Logistic regression: sigmoid link.
    pub fn logistic() -> Self {
        Self::new(Link::Sigmoid)
    }

    /// Runs the configured number of epochs of gradient descent.
    ///
    /// `inputs` is NxF, `targets` is Nx1. The first call fixes the
    /// hypothesis shape at `(F + 1) x 1` (zero-initialized unless one was
    /// injected); later calls must use the same feature count.
    ///
    /// Within an epoch, examples are processed as contiguous batches in
    /// index order (no shuffling), so training is reproducible for fixed
    /// inputs and a fixed starting hypothesis.
    pub fn train(&mut self, inputs: &Matrix, targets: &Matrix) -> Result<()> {
        let example_count = inputs.row_count();
        if targets.row_count() != example_count {
            return Err(Error::InvalidData(format!(
                "inputs have {example_count} rows but targets have {} rows",
                targets.row_count()
            )));
        }
        if targets.column_count() != 1 {
            return Err(Error::InvalidData(format!(
                "targets must be a single column, got {} columns",
                targets.column_count()
            )));
        }

        let enriched = enriched_with_bias(inputs)?;

        match &self.hypothesis {
            None => self.hypothesis = Some(Matrix::zeros(enriched.column_count(), 1)),
            Some(hypothesis) => {
                if hypothesis.row_count() != enriched.column_count() {
                    return Err(Error::DimensionMismatch(format!(
                        "hypothesis has {} rows but the enriched inputs have {} columns",
                        hypothesis.row_count(),
                        enriched.column_count()
                    )));
                }
            }
        }

        let batch_size = if self.batch_size == 0 {
            example_count.max(1)
        } else {
            self.batch_size
        };

        for _ in 0..self.epochs {
            let mut batch_start = 0;
            while batch_start < example_count {
                let batch_end = (batch_start + batch_size).min(example_count);
                self.train_batch(
                    &enriched.slice_rows(batch_start..batch_end),
                    &targets.slice_rows(batch_start..batch_end),
                )?;
                batch_start = batch_end;
            }
        }

        Ok(())
    }

    /// Predicts an Nx1 column for NxF inputs. Pure: no state is mutated.
    ///
    /// Requires a hypothesis, either from a previous `train` call or from
    /// [`Regression::set_hypothesis`].
    pub fn predict(&self, inputs: &Matrix) -> Result<Matrix> {
        self.predict_from_enriched(&enriched_with_bias(inputs)?)
    }

    /* Parameter setters */

    /// Set the batch size to
    /// - 0 for batch gradient descent (the whole dataset per update)
    /// - 1 for stochastic gradient descent
    /// - greater than 1 for mini-batch gradient descent
    pub fn set_batch_size(&mut self, batch_size: usize) -> &mut Self {
        self.batch_size = batch_size;
        self
    }

    pub fn set_learning_rate(&mut self, learning_rate: f64) -> Result<&mut Self> {
        if !(learning_rate.is_finite() && learning_rate > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "learning rate must be finite and > 0, got {learning_rate}"
            )));
        }
        self.learning_rate = learning_rate;
        Ok(self)
    }

    pub fn set_epochs(&mut self, epochs: usize) -> &mut Self {
        self.epochs = epochs;
        self
    }

    pub fn set_regularization_factor(&mut self, regularization_factor: f64) -> Result<&mut Self> {
        if !(regularization_factor.is_finite() && regularization_factor >= 0.0) {
            return Err(Error::InvalidConfig(format!(
                "regularization factor must be finite and >= 0, got {regularization_factor}"
            )));
        }
        self.regularization_factor = regularization_factor;
        Ok(self)
    }

    /// Injects a hypothesis, e.g. one captured earlier via
    /// [`Regression::hypothesis`]. Its shape is validated on the next call
    /// that uses it.
    pub fn set_hypothesis(&mut self, hypothesis: Matrix) -> &mut Self {
        self.hypothesis = Some(hypothesis);
        self
    }

    /// Drops the hypothesis so the next `train` starts from zeros.
    pub fn reset_hypothesis(&mut self) -> &mut Self {
        self.hypothesis = None;
        self
    }

    /* Parameter getters */

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn epochs(&self) -> usize {
        self.epochs
    }

    pub fn regularization_factor(&self) -> f64 {
        self.regularization_factor
    }

    pub fn hypothesis(&self) -> Option<&Matrix> {
        self.hypothesis.as_ref()
    }

    pub fn link(&self) -> Link {
        self.link
    }

    /* Private */

    // One gradient update on an already bias-enriched batch.
    fn train_batch(&mut self, inputs: &Matrix, targets: &Matrix) -> Result<()> {
        let batch_len = inputs.row_count() as f64;

        let mut gradient = self.predict_from_enriched(inputs)?;
        gradient
            .subtract(targets)?
            .transpose()
            .multiply(inputs)?
            .transpose()
            .multiply_scalar(self.learning_rate / batch_len);

        let hypothesis = self
            .hypothesis
            .as_mut()
            .expect("hypothesis is initialized before batches run");

        if self.regularization_factor > 0.0 {
            let mut regularization = hypothesis.clone();
            regularization
                .multiply_scalar(
                    self.learning_rate * self.regularization_factor / batch_len,
                )
                // The bias term is never regularized.
                .set(0, 0, 0.0);
            hypothesis.subtract(&regularization)?;
        }

        hypothesis.subtract(&gradient)?;
        Ok(())
    }

    fn predict_from_enriched(&self, inputs: &Matrix) -> Result<Matrix> {
        let hypothesis = self.hypothesis.as_ref().ok_or_else(|| {
            Error::InvalidConfig(
                "no hypothesis: call train or set_hypothesis before predict".to_owned(),
            )
        })?;

        let mut predictions = inputs.clone();
        predictions.multiply(hypothesis)?;
        self.link.apply(&mut predictions);
        Ok(predictions)
    }
}

/// Prepends a constant ones column representing the bias term.
pub(crate) fn enriched_with_bias(inputs: &Matrix) -> Result<Matrix> {
    let mut enriched = inputs.clone();
    enriched.append_left(&Matrix::ones(inputs.row_count(), 1))?;
    Ok(enriched)
}
