// Content-to-layout packing: height estimation, slide building, overflow splitting.
// Everything here is synchronous and free of I/O.

pub mod builder;
pub mod metrics;
pub mod splitter;

// Re-export the public API consumed by the generation pipeline.
pub use metrics::LayoutMetrics;
