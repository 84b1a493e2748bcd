/*!
 * Process Module
 * Identity tracking for sampled processes
 */

pub mod registry;
pub mod types;

// Re-export for convenience
pub use registry::ProcessRegistry;
pub use types::{name_hash, ProcessIdentity};
