//! Runtime implementations
//!
//! Concrete device access and capture backends that plug into the
//! [`Runtime`](crate::capture::Runtime) seam.

pub mod synthetic;

pub use synthetic::{SyntheticEngine, SyntheticOptions, SyntheticRuntime};
