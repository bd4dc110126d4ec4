//! Matching call sites against intercepted call shapes, and redirecting them
//!
//! An [`InvocationPattern`] describes one method whose calls are intercepted. Patterns are
//! collected in a [`PatternRegistry`], which the [`ConstantRewriter`] consults while walking the
//! code and constant pool of a class.

mod config;
mod errors;
mod matcher;
mod pattern;
mod registry;
mod rewriter;
mod settings;

pub use config::*;
pub use errors::*;
pub use matcher::*;
pub use pattern::*;
pub use registry::*;
pub use rewriter::*;
pub use settings::*;
