//! Attaching the interceptors to a running JVM

use crate::intercept::{Error, PatternRegistry, Settings};
use crate::jvm::Name;
use crate::reflect::{Reflection, ReflectionFilter};
use crate::transform::{ClassFileTransformer, ClassTransformer, LoaderKind};
use std::sync::Arc;

/// What a JVM offers to an agent at startup (`java.lang.instrument.Instrumentation`)
pub trait Instrumentation {
    /// Register a hook that sees every class before it gets defined
    fn add_transformer(
        &mut self,
        transformer: Box<dyn ClassFileTransformer + Send + Sync>,
        can_retransform: bool,
    );
}

/// Agent that redirects intercepted calls in application classes
///
/// The registry is loaded and validated once, when the agent is created. A bad pattern
/// configuration therefore stops the agent before any class is touched.
#[derive(Debug)]
pub struct Agent {
    registry: Arc<PatternRegistry>,
    max_constant_nesting: usize,
}

impl Agent {
    pub fn new(settings: &Settings) -> Result<Agent, Error> {
        let registry = settings.load_registry()?;
        log::info!(
            "Intercepting {} method(s) with {}",
            registry.len(),
            registry.interceptor()
        );
        for pattern in registry.patterns() {
            log::debug!("Intercepting {}", pattern);
        }
        Ok(Agent {
            registry: Arc::new(registry),
            max_constant_nesting: settings.max_constant_nesting,
        })
    }

    pub fn registry(&self) -> &PatternRegistry {
        &self.registry
    }

    pub fn transformer(&self) -> ClassTransformer {
        ClassTransformer::new(self.registry.clone(), self.max_constant_nesting)
    }

    /// Reflective lookups against `runtime` that hand out interceptors instead
    pub fn reflection_filter<R: Reflection>(&self, runtime: R) -> ReflectionFilter<R> {
        ReflectionFilter::new(self.registry.clone(), runtime)
    }

    /// Register the class transformer with the host
    pub fn install(&self, instrumentation: &mut impl Instrumentation) {
        let transformer = ApplicationClasses(self.transformer());
        instrumentation.add_transformer(Box::new(transformer), true);
        log::info!("Installed class transformer");
    }
}

/// Leaves classes of the JVM itself, and the interceptor class, alone
///
/// The interceptor calls the methods it replaces, so rewriting it would make every interceptor
/// call itself. It usually sits on the application class path, so the loader alone can't tell.
struct ApplicationClasses(ClassTransformer);

impl ClassFileTransformer for ApplicationClasses {
    fn transform(
        &self,
        loader: &LoaderKind,
        class_name: &str,
        class_bytes: &[u8],
    ) -> Result<Option<Vec<u8>>, Error> {
        let interceptor = self.0.registry().interceptor();
        match loader {
            LoaderKind::Bootstrap | LoaderKind::Platform => Ok(None),
            LoaderKind::Application(_) if class_name == interceptor.as_str() => Ok(None),
            LoaderKind::Application(_) => self.0.transform(loader, class_name, class_bytes),
        }
    }
}
