//! Feedforward neural network trained by backpropagation.
//!
//! The topology is a list of node counts from the input layer through the
//! output layer; each layer boundary owns a `(incoming + 1) x outgoing`
//! weight matrix whose extra row is the bias, fed by a constant ones column
//! prepended to the activations during the forward pass.
//!
//! The activation function and its gradient are two plain `fn(f64) -> f64`
//! values. They default to the sigmoid pair; callers who swap one must swap
//! the other to match, or the analytic gradients will be wrong (the
//! [`FeedforwardNetwork::check_gradients`] oracle will catch that).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::regression::sigmoid;
use crate::{Error, Matrix, Result};

/// A scalar function applied elementwise, e.g. an activation or its gradient.
pub type ScalarFn = fn(f64) -> f64;

#[inline]
fn sigmoid_gradient(x: f64) -> f64 {
    let s = sigmoid(x);
    s * (1.0 - s)
}

#[derive(Debug, Clone)]
pub struct FeedforwardNetwork {
    /// One weight matrix per layer boundary, shape `(incoming + 1) x outgoing`.
    weights: Vec<Matrix>,

    epochs: usize,
    batch_size: usize,
    learning_rate: f64,

    activation: ScalarFn,
    activation_gradient: ScalarFn,
}

impl FeedforwardNetwork {
    /// Builds a network with random initial weights.
    ///
    /// `sizes` lists every layer's node count, input through output, so it
    /// must have at least two entries, all nonzero. Each boundary's weights
    /// are drawn uniformly from `[-epsilon, epsilon)` with
    /// `epsilon = sqrt(6) / sqrt(incoming + outgoing)`.
    pub fn new(sizes: &[usize]) -> Result<Self> {
        Self::new_with_rng(sizes, &mut rand::rng())
    }

    /// Like [`FeedforwardNetwork::new`] with a deterministic seed.
    pub fn new_with_seed(sizes: &[usize], seed: u64) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        Self::new_with_rng(sizes, &mut rng)
    }

    pub fn new_with_rng<R: Rng + ?Sized>(sizes: &[usize], rng: &mut R) -> Result<Self> {
        if sizes.len() < 2 {
            return Err(Error::InvalidConfig(
                "sizes must include input and output layers".to_owned(),
            ));
        }
        if sizes.contains(&0) {
            return Err(Error::InvalidConfig(
                "all layer sizes must be > 0".to_owned(),
            ));
        }

        let mut weights = Vec::with_capacity(sizes.len() - 1);
        for boundary in sizes.windows(2) {
            let incoming = boundary[0];
            let outgoing = boundary[1];
            let epsilon = 6.0_f64.sqrt() / ((incoming + outgoing) as f64).sqrt();
            weights.push(Matrix::rand_with_rng(incoming + 1, outgoing, epsilon, rng));
        }

        Ok(Self {
            weights,
            epochs: 1000,
            batch_size: 0,
            learning_rate: 0.001,
            activation: sigmoid,
            activation_gradient: sigmoid_gradient,
        })
    }

    #[inline]
    pub fn input_dim(&self) -> usize {
        self.weights
            .first()
            .expect("network has at least one boundary")
            .row_count()
            - 1
    }

    #[inline]
    pub fn output_dim(&self) -> usize {
        self.weights
            .last()
            .expect("network has at least one boundary")
            .column_count()
    }

    /// Runs the configured number of epochs of backpropagation.
    ///
    /// `inputs` is NxI and `targets` is NxO where I and O are the input and
    /// output layer sizes. Examples are processed as contiguous batches in
    /// index order per epoch, with the same batch-size semantics as the
    /// regression trainer (0 = full batch, 1 = stochastic).
    pub fn train(&mut self, inputs: &Matrix, targets: &Matrix) -> Result<()> {
        self.check_dataset(inputs, Some(targets))?;

        let example_count = inputs.row_count();
        let batch_size = if self.batch_size == 0 {
            example_count.max(1)
        } else {
            self.batch_size
        };

        for _ in 0..self.epochs {
            let mut batch_start = 0;
            while batch_start < example_count {
                let batch_end = (batch_start + batch_size).min(example_count);
                let batch_inputs = inputs.slice_rows(batch_start..batch_end);
                let batch_targets = targets.slice_rows(batch_start..batch_end);

                let (activations, incoming) = self.forward_propagate(&batch_inputs)?;
                let gradients = self.gradients(&activations, &incoming, &batch_targets)?;
                for (weights, mut gradient) in self.weights.iter_mut().zip(gradients) {
                    gradient.multiply_scalar(self.learning_rate);
                    weights.subtract(&gradient)?;
                }

                batch_start = batch_end;
            }
        }

        Ok(())
    }

    /// Forward pass only; returns the NxO output activations.
    pub fn predict(&self, inputs: &Matrix) -> Result<Matrix> {
        self.check_dataset(inputs, None)?;
        let (mut activations, _) = self.forward_propagate(inputs)?;
        Ok(activations.pop().expect("forward pass yields an output layer"))
    }

    /// Numeric gradient oracle for the backward pass.
    ///
    /// Perturbs every weight by +-1e-4, recomputes a mean cross-entropy
    /// cost, and compares the central-difference estimate against the
    /// analytic gradient. Returns `Ok(true)` when every per-weight
    /// discrepancy is below 1e-4. Original weights are restored on every
    /// exit path: each element is put back right after its two cost
    /// evaluations, before any comparison can bail out.
    ///
    /// The cost assumes outputs in (0, 1), i.e. the default sigmoid pair.
    /// This is a diagnostic, not part of the training path.
    pub fn check_gradients(&mut self, inputs: &Matrix, targets: &Matrix) -> Result<bool> {
        const EPSILON: f64 = 1e-4;
        const TOLERANCE: f64 = 1e-4;

        self.check_dataset(inputs, Some(targets))?;

        let (activations, incoming) = self.forward_propagate(inputs)?;
        let analytic = self.gradients(&activations, &incoming, targets)?;

        for boundary in 0..self.weights.len() {
            for row in 0..self.weights[boundary].row_count() {
                for col in 0..self.weights[boundary].column_count() {
                    let original = self.weights[boundary].get(row, col);

                    self.weights[boundary].set(row, col, original + EPSILON);
                    let cost_plus = self.cost(inputs, targets)?;

                    self.weights[boundary].set(row, col, original - EPSILON);
                    let cost_minus = self.cost(inputs, targets)?;

                    self.weights[boundary].set(row, col, original);

                    let numeric = (cost_plus - cost_minus) / (2.0 * EPSILON);
                    if (numeric - analytic[boundary].get(row, col)).abs() >= TOLERANCE {
                        return Ok(false);
                    }
                }
            }
        }

        Ok(true)
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

    pub fn set_epochs(&mut self, epochs: usize) -> &mut Self {
        self.epochs = epochs;
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

    /// Swaps the activation function. Swap the gradient to match via
    /// [`FeedforwardNetwork::set_activation_gradient`].
    pub fn set_activation(&mut self, activation: ScalarFn) -> &mut Self {
        self.activation = activation;
        self
    }

    /// Swaps the activation gradient, applied to pre-activation values.
    pub fn set_activation_gradient(&mut self, activation_gradient: ScalarFn) -> &mut Self {
        self.activation_gradient = activation_gradient;
        self
    }

    /// Replaces all weight matrices, e.g. from an earlier
    /// [`FeedforwardNetwork::weights`] snapshot. Shapes must match the
    /// network's topology.
    pub fn set_weights(&mut self, weights: Vec<Matrix>) -> Result<&mut Self> {
        if weights.len() != self.weights.len() {
            return Err(Error::DimensionMismatch(format!(
                "got {} weight matrices for {} layer boundaries",
                weights.len(),
                self.weights.len()
            )));
        }
        for (current, replacement) in self.weights.iter().zip(&weights) {
            if current.row_count() != replacement.row_count()
                || current.column_count() != replacement.column_count()
            {
                return Err(Error::DimensionMismatch(format!(
                    "weight matrix is {}x{} but the boundary needs {}x{}",
                    replacement.row_count(),
                    replacement.column_count(),
                    current.row_count(),
                    current.column_count()
                )));
            }
        }
        self.weights = weights;
        Ok(self)
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

    pub fn activation(&self) -> ScalarFn {
        self.activation
    }

    pub fn activation_gradient(&self) -> ScalarFn {
        self.activation_gradient
    }

    /// One weight matrix per layer boundary.
    pub fn weights(&self) -> &[Matrix] {
        &self.weights
    }

    /* Private */

    fn check_dataset(&self, inputs: &Matrix, targets: Option<&Matrix>) -> Result<()> {
        if inputs.column_count() != self.input_dim() {
            return Err(Error::InvalidData(format!(
                "inputs have {} columns but the input layer has {} nodes",
                inputs.column_count(),
                self.input_dim()
            )));
        }
        if let Some(targets) = targets {
            if targets.column_count() != self.output_dim() {
                return Err(Error::InvalidData(format!(
                    "targets have {} columns but the output layer has {} nodes",
                    targets.column_count(),
                    self.output_dim()
                )));
            }
            if targets.row_count() != inputs.row_count() {
                return Err(Error::InvalidData(format!(
                    "inputs have {} rows but targets have {} rows",
                    inputs.row_count(),
                    targets.row_count()
                )));
            }
        }
        Ok(())
    }

    /// Forward pass retaining everything backpropagation needs.
    ///
    /// Returns `(activations, incoming)`:
    /// - `activations[0]` is the input matrix and `activations[l]` for
    ///   `l >= 1` the post-activation values of node layer `l`; every entry
    ///   except the last carries the prepended bias ones column, because
    ///   that is the shape the gradient computation consumes.
    /// - `incoming[b]` holds the pre-activation values produced by boundary
    ///   `b`, i.e. the input to node layer `b + 1`.
    fn forward_propagate(&self, inputs: &Matrix) -> Result<(Vec<Matrix>, Vec<Matrix>)> {
        let example_count = inputs.row_count();
        let mut activations = vec![inputs.clone()];
        let mut incoming = Vec::with_capacity(self.weights.len());

        let activation = self.activation;
        for weights in &self.weights {
            let current = activations.last_mut().expect("activations start non-empty");
            current.append_left(&Matrix::ones(example_count, 1))?;

            let mut pre_activation = current.clone();
            pre_activation.multiply(weights)?;

            let mut next = pre_activation.clone();
            next.transform(|value, _, _| activation(value));

            incoming.push(pre_activation);
            activations.push(next);
        }

        Ok((activations, incoming))
    }

    /// Backward pass: per-boundary gradients, averaged over the examples.
    fn gradients(
        &self,
        activations: &[Matrix],
        incoming: &[Matrix],
        targets: &Matrix,
    ) -> Result<Vec<Matrix>> {
        let boundary_count = self.weights.len();
        let activation_gradient = self.activation_gradient;

        // errors[l] is the error at node layer l; layer 0 needs none.
        let mut errors = vec![Matrix::zeros(0, 0); boundary_count + 1];
        errors[boundary_count] = activations[boundary_count].clone();
        errors[boundary_count].subtract(targets)?;

        for layer in (1..boundary_count).rev() {
            // Weights of the outgoing boundary, transposed, bias row dropped:
            // the bias node receives no error.
            let mut outgoing_weights = self.weights[layer].clone();
            outgoing_weights.transpose();
            let outgoing_weights = outgoing_weights.columns(1..outgoing_weights.column_count());

            let mut gradient_factor = incoming[layer - 1].clone();
            gradient_factor.transform(|value, _, _| activation_gradient(value));

            let mut error = errors[layer + 1].clone();
            error
                .multiply(&outgoing_weights)?
                .multiply_element_wise(&gradient_factor)?;
            errors[layer] = error;
        }

        let example_count = targets.row_count() as f64;
        let mut gradients = Vec::with_capacity(boundary_count);
        for boundary in 0..boundary_count {
            let mut gradient = activations[boundary].clone();
            gradient
                .transpose()
                .multiply(&errors[boundary + 1])?
                .multiply_scalar(1.0 / example_count);
            gradients.push(gradient);
        }

        Ok(gradients)
    }

    /// Mean cross-entropy over the dataset; the scalar objective whose
    /// gradient the backward pass computes under the sigmoid pair.
    fn cost(&self, inputs: &Matrix, targets: &Matrix) -> Result<f64> {
        let (mut activations, _) = self.forward_propagate(inputs)?;
        let outputs = activations.pop().expect("forward pass yields an output layer");

        let example_count = inputs.row_count() as f64;
        let mut total = 0.0;
        for row in 0..outputs.row_count() {
            for col in 0..outputs.column_count() {
                let prediction = outputs.get(row, col);
                let target = targets.get(row, col);
                total -= target * prediction.ln() + (1.0 - target) * (1.0 - prediction).ln();
            }
        }
        Ok(total / example_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_validates_topology() {
        assert!(FeedforwardNetwork::new_with_seed(&[3], 0).is_err());
        assert!(FeedforwardNetwork::new_with_seed(&[3, 0, 1], 0).is_err());

        let network = FeedforwardNetwork::new_with_seed(&[3, 4, 2], 0).unwrap();
        assert_eq!(network.input_dim(), 3);
        assert_eq!(network.output_dim(), 2);
        assert_eq!(network.weights().len(), 2);
        assert_eq!(network.weights()[0].row_count(), 4);
        assert_eq!(network.weights()[0].column_count(), 4);
        assert_eq!(network.weights()[1].row_count(), 5);
        assert_eq!(network.weights()[1].column_count(), 2);
    }

    #[test]
    fn initialization_respects_the_layer_dependent_range() {
        let network = FeedforwardNetwork::new_with_seed(&[10, 2], 7).unwrap();
        let epsilon = 6.0_f64.sqrt() / 12.0_f64.sqrt();
        assert!(network.weights()[0]
            .as_slice()
            .iter()
            .all(|w| w.abs() < epsilon));
    }

    #[test]
    fn seeded_networks_are_deterministic() {
        let a = FeedforwardNetwork::new_with_seed(&[2, 3, 1], 123).unwrap();
        let b = FeedforwardNetwork::new_with_seed(&[2, 3, 1], 123).unwrap();
        assert_eq!(a.weights(), b.weights());

        let inputs = Matrix::from_rows(&[vec![0.3, -0.7]]).unwrap();
        assert_eq!(
            a.predict(&inputs).unwrap(),
            b.predict(&inputs).unwrap()
        );
    }

    #[test]
    fn predict_produces_sigmoid_outputs() {
        let network = FeedforwardNetwork::new_with_seed(&[2, 4, 3], 0).unwrap();
        let inputs = Matrix::from_rows(&[vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        let outputs = network.predict(&inputs).unwrap();

        assert_eq!(outputs.row_count(), 2);
        assert_eq!(outputs.column_count(), 3);
        assert!(outputs.as_slice().iter().all(|v| (0.0..1.0).contains(v)));
    }

    #[test]
    fn train_validates_dataset_shapes() {
        let mut network = FeedforwardNetwork::new_with_seed(&[2, 2, 1], 0).unwrap();

        let bad_inputs = Matrix::ones(2, 3);
        let targets = Matrix::ones(2, 1);
        assert!(network.train(&bad_inputs, &targets).is_err());

        let inputs = Matrix::ones(2, 2);
        let bad_targets = Matrix::ones(2, 2);
        assert!(network.train(&inputs, &bad_targets).is_err());

        let short_targets = Matrix::ones(1, 1);
        assert!(network.train(&inputs, &short_targets).is_err());
    }

    #[test]
    fn training_reduces_the_cost() {
        let inputs = Matrix::from_rows(&[
            vec![0.0, 0.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
            vec![1.0, 1.0],
        ])
        .unwrap();
        let targets = Matrix::from_rows(&[vec![1.0], vec![0.0], vec![0.0], vec![1.0]]).unwrap();

        let mut network = FeedforwardNetwork::new_with_seed(&[2, 5, 1], 0).unwrap();
        network.set_epochs(200);
        network.set_learning_rate(1.0).unwrap();

        let before = network.cost(&inputs, &targets).unwrap();
        network.train(&inputs, &targets).unwrap();
        let after = network.cost(&inputs, &targets).unwrap();
        assert!(after < before);
    }

    #[test]
    fn analytic_gradients_match_numeric_estimates() {
        let inputs = Matrix::rand(6, 3, 1.0, Some(1));
        let mut targets = Matrix::rand(6, 2, 0.5, Some(2));
        targets.add_scalar(0.5);

        let mut network = FeedforwardNetwork::new_with_seed(&[3, 4, 2], 0).unwrap();
        assert!(network.check_gradients(&inputs, &targets).unwrap());
    }

    #[test]
    fn check_gradients_restores_weights() {
        let inputs = Matrix::rand(4, 2, 1.0, Some(1));
        let mut targets = Matrix::rand(4, 1, 0.5, Some(2));
        targets.add_scalar(0.5);

        let mut network = FeedforwardNetwork::new_with_seed(&[2, 3, 1], 0).unwrap();
        let before = network.weights().to_vec();
        network.check_gradients(&inputs, &targets).unwrap();
        assert_eq!(network.weights(), &before[..]);
    }

    #[test]
    fn check_gradients_flags_an_inconsistent_pair() {
        let inputs = Matrix::rand(4, 2, 1.0, Some(1));
        let mut targets = Matrix::rand(4, 1, 0.5, Some(2));
        targets.add_scalar(0.5);

        let mut network = FeedforwardNetwork::new_with_seed(&[2, 3, 1], 0).unwrap();
        // Wrong gradient for the sigmoid activation.
        network.set_activation_gradient(|_| 1.0);
        assert!(!network.check_gradients(&inputs, &targets).unwrap());

        // And the weights must still be restored afterwards.
        let reference = FeedforwardNetwork::new_with_seed(&[2, 3, 1], 0).unwrap();
        assert_eq!(network.weights(), reference.weights());
    }

    #[test]
    fn set_weights_validates_shapes() {
        let mut network = FeedforwardNetwork::new_with_seed(&[2, 3, 1], 0).unwrap();
        assert!(network.set_weights(vec![Matrix::zeros(3, 3)]).is_err());
        assert!(network
            .set_weights(vec![Matrix::zeros(3, 3), Matrix::zeros(3, 1)])
            .is_err());

        let snapshot = network.weights().to_vec();
        assert!(network.set_weights(snapshot).is_ok());
    }
}
