use super::{parse_patterns, Error, PatternRegistry};
use crate::jvm::BinaryName;
use std::path::PathBuf;

/// Where the set of intercepted calls comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PatternSource {
    /// Process termination and reflective lookups (see [`PatternRegistry::builtin`])
    Builtin,

    /// Pattern configuration file on disk
    File(PathBuf),

    /// Pattern configuration text
    Inline(String),
}

#[derive(Clone, Debug)]
pub struct Settings {
    /// Class holding the interceptor methods, written as `my/pkg/Interceptors`
    pub interceptor_class_name: BinaryName,

    /// Which calls get intercepted
    pub patterns: PatternSource,

    /// How many dynamic constants may be nested inside each other before a class is rejected
    ///
    /// The class file format puts no bound on this, but real compilers never get anywhere near
    /// the default.
    pub max_constant_nesting: usize,
}

impl Settings {
    pub const DEFAULT_MAX_CONSTANT_NESTING: usize = 64;

    pub fn new() -> Settings {
        Settings {
            interceptor_class_name: BinaryName::INTERCEPTORS,
            patterns: PatternSource::Builtin,
            max_constant_nesting: Settings::DEFAULT_MAX_CONSTANT_NESTING,
        }
    }

    /// Build and validate the pattern registry
    pub fn load_registry(&self) -> Result<PatternRegistry, Error> {
        let interceptor = self.interceptor_class_name.clone();
        match &self.patterns {
            PatternSource::Builtin => PatternRegistry::builtin(interceptor),
            PatternSource::File(path) => {
                let source = std::fs::read_to_string(path).map_err(|error| Error::ReadConfig {
                    path: path.clone(),
                    error,
                })?;
                parse_patterns(interceptor, &source)
            }
            PatternSource::Inline(source) => parse_patterns(interceptor, source),
        }
    }
}

impl Default for Settings {
    fn default() -> Settings {
        Settings::new()
    }
}
