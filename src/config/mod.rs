/*!
 * Configuration Module
 * Command line surface and the immutable run options
 */

pub mod options;

pub use options::{Cli, Options, OutputMode};
