//! Reading and writing JVM class files
//!
//! The model is deliberately shallow: the constant pool is fully decoded (it is where call sites
//! get redirected), `Code` and `BootstrapMethods` are decoded on demand, and every other
//! attribute is carried along as opaque bytes.

mod access_flags;
mod attributes;
mod binary_format;
mod bytecode;
mod class_file;
mod constants;
mod descriptors;
mod errors;
mod names;
mod version;

pub use crate::util::{Offset, OffsetResult, OffsetVec, Width};
pub use access_flags::*;
pub use attributes::*;
pub use binary_format::*;
pub use bytecode::*;
pub use class_file::*;
pub use constants::*;
pub use descriptors::*;
pub use errors::*;
pub use names::*;
pub use version::*;
