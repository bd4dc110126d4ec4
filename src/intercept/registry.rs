use super::{
    Error, HandleDescriptor, InvocationPattern, InvokeSite, ReflectedMethod, RevealedHandle,
};
use crate::jvm::{BinaryName, FieldType, MethodDescriptor, UnqualifiedName};

/// Every call shape that gets intercepted, and the class holding the interceptors
///
/// The registry is validated once when built and never changes afterwards, so it can be shared
/// freely between threads.
#[derive(Debug)]
pub struct PatternRegistry {
    interceptor: BinaryName,
    patterns: Vec<InvocationPattern>,
}

impl PatternRegistry {
    /// Build a registry, rejecting pattern sets where one candidate could match two patterns or
    /// where two patterns would share an interceptor method
    pub fn new(
        interceptor: BinaryName,
        patterns: Vec<InvocationPattern>,
    ) -> Result<PatternRegistry, Error> {
        for pattern in &patterns {
            pattern.check()?;
        }
        for (i, first) in patterns.iter().enumerate() {
            for second in &patterns[i + 1..] {
                if first.owner == second.owner
                    && first.name == second.name
                    && first.descriptor == second.descriptor
                {
                    let pair = (first.clone(), second.clone());
                    return Err(Error::OverlappingPatterns(Box::new(pair)));
                }
                if first.name == second.name
                    && first.redirect_descriptor() == second.redirect_descriptor()
                {
                    let pair = (first.clone(), second.clone());
                    return Err(Error::CollidingRedirects(Box::new(pair)));
                }
            }
        }

        Ok(PatternRegistry {
            interceptor,
            patterns,
        })
    }

    /// Process termination, and the reflective lookups that could be used to reach it indirectly
    pub fn builtin(interceptor: BinaryName) -> Result<PatternRegistry, Error> {
        let exit_code = || MethodDescriptor {
            parameters: vec![FieldType::int()],
            return_type: None,
        };
        let lookup_one = || MethodDescriptor {
            parameters: vec![
                FieldType::object(BinaryName::STRING),
                FieldType::object_array(BinaryName::CLASS),
            ],
            return_type: Some(FieldType::object(BinaryName::METHOD)),
        };
        let lookup_all = || MethodDescriptor {
            parameters: vec![],
            return_type: Some(FieldType::object_array(BinaryName::METHOD)),
        };
        let find_handle = || MethodDescriptor {
            parameters: vec![
                FieldType::object(BinaryName::CLASS),
                FieldType::object(BinaryName::STRING),
                FieldType::object(BinaryName::METHODTYPE),
            ],
            return_type: Some(FieldType::object(BinaryName::METHODHANDLE)),
        };

        use InvocationPattern as P;
        PatternRegistry::new(
            interceptor,
            vec![
                P::static_call(BinaryName::SYSTEM, UnqualifiedName::EXIT, exit_code()),
                P::virtual_call(BinaryName::RUNTIME, UnqualifiedName::EXIT, exit_code()),
                P::virtual_call(BinaryName::RUNTIME, UnqualifiedName::HALT, exit_code()),
                P::virtual_call(
                    BinaryName::CLASS,
                    UnqualifiedName::GETDECLAREDMETHOD,
                    lookup_one(),
                ),
                P::virtual_call(BinaryName::CLASS, UnqualifiedName::GETMETHOD, lookup_one()),
                P::virtual_call(
                    BinaryName::CLASS,
                    UnqualifiedName::GETDECLAREDMETHODS,
                    lookup_all(),
                ),
                P::virtual_call(BinaryName::CLASS, UnqualifiedName::GETMETHODS, lookup_all()),
                P::virtual_call(
                    BinaryName::METHODHANDLES_LOOKUP,
                    UnqualifiedName::FINDVIRTUAL,
                    find_handle(),
                ),
                P::virtual_call(
                    BinaryName::METHODHANDLES_LOOKUP,
                    UnqualifiedName::FINDSTATIC,
                    find_handle(),
                ),
            ],
        )
    }

    /// Class on which all of the interceptor methods are defined
    pub fn interceptor(&self) -> &BinaryName {
        &self.interceptor
    }

    pub fn patterns(&self) -> &[InvocationPattern] {
        &self.patterns
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn match_invoke(&self, site: &InvokeSite) -> Option<&InvocationPattern> {
        self.patterns.iter().find(|p| p.matches_invoke(site))
    }

    pub fn match_handle(&self, handle: &HandleDescriptor) -> Option<&InvocationPattern> {
        self.patterns.iter().find(|p| p.matches_handle(handle))
    }

    pub fn match_method(&self, method: &ReflectedMethod) -> Option<&InvocationPattern> {
        self.patterns.iter().find(|p| p.matches_method(method))
    }

    pub fn match_revealed_handle(&self, handle: &RevealedHandle) -> Option<&InvocationPattern> {
        self.patterns
            .iter()
            .find(|p| p.matches_revealed_handle(handle))
    }
}
