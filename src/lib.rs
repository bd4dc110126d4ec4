//! Redirect calls to sensitive JVM methods (such as `System.exit`) into interceptor routines
//!
//! Class files are rewritten as they get loaded: every call site, method handle, and bootstrap
//! argument that refers to an intercepted method gets pointed at a static method on an
//! interceptor class instead. Reflective lookups that would hand out an intercepted method are
//! filtered at run time by [`reflect::ReflectionFilter`].

pub mod agent;
pub mod intercept;
pub mod jvm;
pub mod reflect;
pub mod transform;
pub mod util;

pub use agent::{Agent, Instrumentation};
pub use intercept::{Error, PatternRegistry, PatternSource, Settings};
pub use transform::{ClassFileTransformer, ClassTransformer, LoaderKind};
