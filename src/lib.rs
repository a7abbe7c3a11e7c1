//! A small numerical-computing core: dense f64 matrices plus a family of
//! classic supervised learners built on top of them.
//!
//! `learnkit` provides:
//!
//! - [`Matrix`]: a row-major dense matrix with shape-validated arithmetic,
//!   slicing/concatenation, elementwise transforms, and cofactor-expansion
//!   determinant/inverse for small square matrices.
//! - [`Regression`]: mini-batch gradient descent shared by linear and
//!   logistic regression (the two differ only in their [`Link`] function).
//! - [`MulticlassLogisticRegression`]: one-vs-all composition of independent
//!   logistic regressions.
//! - [`FeedforwardNetwork`]: stacked fully-connected sigmoid layers trained
//!   by backpropagation, with a numeric gradient self-check.
//! - [`NearestNeighbors`]: exhaustive-scan KNN with inclusive tie handling.
//!
//! # Design notes
//!
//! - Scalars are `f64`; matrices are row-major and never alias each other.
//! - Matrix commands mutate in place and return `&mut Self` for chaining;
//!   queries return fresh copies.
//! - Shape mismatches surface as [`Error::DimensionMismatch`] at the call
//!   site; nothing is silently truncated or padded.
//! - Everything is synchronous and single-threaded; models own their
//!   parameters and share no global state.
//! - Matrix products go through one GEMM kernel: `matrixmultiply` when that
//!   feature is enabled, a portable triple loop otherwise, with identical
//!   results.
//!
//! # Quick start
//!
//! ```rust
//! use learnkit::{Matrix, Regression};
//!
//! # fn main() -> learnkit::Result<()> {
//! // y = 2x + 1
//! let inputs = Matrix::from_rows(&[vec![0.0], vec![1.0], vec![2.0], vec![3.0]])?;
//! let targets = Matrix::from_rows(&[vec![1.0], vec![3.0], vec![5.0], vec![7.0]])?;
//!
//! let mut model = Regression::linear();
//! model.set_epochs(5000);
//! model.set_learning_rate(0.05)?;
//! model.train(&inputs, &targets)?;
//!
//! let predictions = model.predict(&inputs)?;
//! assert!((predictions.get(3, 0) - 7.0).abs() < 0.1);
//! # Ok(())
//! # }
//! ```
//!
//! Training is resumable: the learned parameters persist across `train`
//! calls and can be extracted/injected as plain matrices (`hypothesis` /
//! `set_hypothesis`, `weights` / `set_weights`) for checkpointing by the
//! caller.

pub mod error;
pub(crate) mod matmul;
pub mod matrix;
pub mod multiclass;
pub mod neighbors;
pub mod network;
pub mod regression;

pub use error::{Error, Result};
pub use matrix::Matrix;
pub use multiclass::MulticlassLogisticRegression;
pub use neighbors::{DistanceFn, NearestNeighbors, squared_euclidean};
pub use network::{FeedforwardNetwork, ScalarFn};
pub use regression::{Link, Regression};
