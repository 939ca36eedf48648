pub mod pattern;
pub mod serve;
pub mod stats;

// Re-export command functions for convenience
pub use pattern::pattern;
pub use serve::{serve, ServeParams};
pub use stats::stats;
