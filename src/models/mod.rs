//! Forward models.
//!
//! Models are small, pure types behind the `ForwardModel` trait so that the
//! grid search stays generic over what is being fitted.

pub mod exponential;
pub mod logistic;
pub mod model;
pub mod sine;

pub use exponential::Exponential;
pub use logistic::Logistic;
pub use model::*;
pub use sine::Sine;
