//! JSON run configurations for the companion binaries.

pub mod demo;
