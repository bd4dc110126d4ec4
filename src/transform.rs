use crate::intercept::{ConstantRewriter, Error, PatternRegistry};
use crate::jvm::{AttributeLike, ClassFile, Code, Name, Serialize};
use std::sync::Arc;

/// Class loader that is about to define a class
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LoaderKind {
    /// The JVM's own loader (`null` in Java)
    Bootstrap,

    /// Loader for the platform modules
    Platform,

    /// Any other loader, identified by an opaque host-assigned id
    Application(u64),
}

/// Hook invoked with the bytes of every class about to be defined
pub trait ClassFileTransformer {
    /// Return new bytes for the class, or `None` to keep the original bytes
    fn transform(
        &self,
        loader: &LoaderKind,
        class_name: &str,
        class_bytes: &[u8],
    ) -> Result<Option<Vec<u8>>, Error>;
}

/// Redirects intercepted calls in a class file
///
/// Each call works on its own copy of the class. The only thing shared between calls is the
/// (immutable) registry, so one transformer can serve any number of threads.
#[derive(Clone, Debug)]
pub struct ClassTransformer {
    registry: Arc<PatternRegistry>,
    max_constant_nesting: usize,
}

impl ClassTransformer {
    pub fn new(registry: Arc<PatternRegistry>, max_constant_nesting: usize) -> ClassTransformer {
        ClassTransformer {
            registry,
            max_constant_nesting,
        }
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    /// Rewrite every method body of the class
    ///
    /// Returns `None` if nothing was redirected, in which case the original bytes should be used
    /// as they are. The interceptor class itself is never rewritten, since its methods call the
    /// very methods they stand in for.
    pub fn transform_class(&self, class_bytes: &[u8]) -> Result<Option<Vec<u8>>, Error> {
        let mut class = ClassFile::parse(class_bytes)?;
        let class_name = class.constants.lookup_class_name(class.this_class)?;
        if class_name.as_deref() == Some(self.registry.interceptor().as_str()) {
            log::debug!("Leaving interceptor class {} alone", self.registry.interceptor());
            return Ok(None);
        }
        let bootstrap_methods = class.bootstrap_methods()?;

        let mut changed_methods = 0;
        {
            let ClassFile {
                constants, methods, ..
            } = &mut class;
            let mut rewriter = ConstantRewriter::new(
                &self.registry,
                constants,
                &bootstrap_methods.0,
                self.max_constant_nesting,
            );

            for method in methods.iter_mut() {
                for attribute in method.attributes.iter_mut() {
                    if rewriter.pool().lookup_utf8(attribute.name_index)? != Code::NAME.as_bytes() {
                        continue;
                    }
                    let mut code: Code = attribute.decode()?;
                    if rewriter.rewrite_code(&mut code.code_array.0)? {
                        attribute.encode(&code)?;
                        changed_methods += 1;
                    }
                }
            }
        }

        if changed_methods == 0 {
            return Ok(None);
        }
        log::trace!("Redirected calls in {} method(s)", changed_methods);

        let mut output = Vec::with_capacity(class_bytes.len() + 128);
        class.serialize(&mut output)?;
        Ok(Some(output))
    }
}

impl ClassFileTransformer for ClassTransformer {
    fn transform(
        &self,
        _loader: &LoaderKind,
        class_name: &str,
        class_bytes: &[u8],
    ) -> Result<Option<Vec<u8>>, Error> {
        let transformed = self.transform_class(class_bytes)?;
        if transformed.is_some() {
            log::debug!("Redirected intercepted calls in {}", class_name);
        }
        Ok(transformed)
    }
}
