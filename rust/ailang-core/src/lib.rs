//! Shared primitives used across every stage of the AILANG pipeline.

mod span;

pub use span::Span;
