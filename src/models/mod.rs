//! Spiral model implementation.
//!
//! The model is a small, pure function so that fitting/search code can stay
//! generic over how it is evaluated.

pub mod model;

pub use model::*;
