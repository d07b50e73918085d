//! Upscale backend implementations
//!
//! The software backend ships with the crate; accelerated backends are
//! injected by front-ends through the [`crate::inference::BackendFactory`]
//! trait.

pub mod software;
pub mod test_utils;

pub use software::SoftwareBackend;
