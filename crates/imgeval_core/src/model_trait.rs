//! Model traits for evaluation.
//!
//! Defines the trait a network must implement to be driven by the inference runner.

use burn::prelude::*;

/// Trait for image classification models.
///
/// Implemented on the inference backend directly; evaluation never records
/// a gradient graph, so no autodiff bound is required.
pub trait ImageClassifier<B: Backend> {
    /// Forward pass returning logits.
    ///
    /// # Arguments
    ///
    /// * `x` - Input tensor of shape (batch, channels, height, width)
    ///
    /// # Returns
    ///
    /// Logits tensor of shape (batch, n_classes)
    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2>;

    /// Forward pass returning probabilities.
    fn forward_probs(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let logits = self.forward(x);
        burn::tensor::activation::softmax(logits, 1)
    }

    /// Number of output classes.
    fn n_classes(&self) -> usize;
}
