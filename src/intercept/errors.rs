use super::InvocationPattern;
use crate::jvm;
use crate::jvm::ConstantIndex;
use std::path::PathBuf;

#[derive(Debug)]
pub enum Error {
    /// Class file could not be read, or the rewritten class could not be written
    ClassFile(jvm::Error),

    /// Call kind is not one of the four method invocation kinds
    IllegalCallKind(String),

    /// Name or descriptor in a pattern is not valid for the JVM
    BadPattern(String),

    /// Two patterns could match the same call site or reflected method
    OverlappingPatterns(Box<(InvocationPattern, InvocationPattern)>),

    /// Two patterns would redirect to the same interceptor method
    CollidingRedirects(Box<(InvocationPattern, InvocationPattern)>),

    /// Line of a pattern configuration file could not be understood (lines count from 1)
    BadConfigLine { line: usize, message: String },

    /// Pattern configuration file could not be read
    ReadConfig {
        path: PathBuf,
        error: std::io::Error,
    },

    /// Dynamic constants nested deeper than the configured limit
    ConstantNestingTooDeep { index: ConstantIndex, limit: usize },

    /// Dynamic constant that (transitively) refers to itself
    CyclicConstant(ConstantIndex),
}

impl From<jvm::Error> for Error {
    fn from(err: jvm::Error) -> Error {
        Error::ClassFile(err)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::ClassFile(jvm::Error::IoError(err))
    }
}
