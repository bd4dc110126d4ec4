//! Intercepting reflective lookups at call time
//!
//! Rewriting class files covers code that names an intercepted method directly. Code can still
//! reach the method indirectly, by asking the runtime for a `Method` or a `MethodHandle` and
//! invoking that. The [`ReflectionFilter`] wraps those lookups, and hands out the interceptor
//! whenever the runtime would have handed out an intercepted method.

use crate::intercept::{InvocationPattern, PatternRegistry, ReflectedMethod, RevealedHandle};
use crate::jvm::{FieldType, MethodDescriptor};
use std::sync::Arc;

/// Reflective primitives of a running JVM
pub trait Reflection {
    /// `java.lang.Class`
    type Class;

    /// `java.lang.reflect.Method`
    type Method;

    /// `java.lang.invoke.MethodHandle`
    type MethodHandle;

    /// `java.lang.invoke.MethodHandles.Lookup`
    type Lookup;

    /// `java.lang.invoke.MethodType`
    type MethodType;

    /// Failure to find or access a class or member (`ReflectiveOperationException`)
    type Error;

    /// `Class.getDeclaredMethod`
    fn get_declared_method(
        &self,
        class: &Self::Class,
        name: &str,
        parameter_types: &[Self::Class],
    ) -> Result<Self::Method, Self::Error>;

    /// `Class.getMethod`
    fn get_method(
        &self,
        class: &Self::Class,
        name: &str,
        parameter_types: &[Self::Class],
    ) -> Result<Self::Method, Self::Error>;

    /// `Class.getDeclaredMethods`
    fn get_declared_methods(&self, class: &Self::Class) -> Result<Vec<Self::Method>, Self::Error>;

    /// `Class.getMethods`
    fn get_methods(&self, class: &Self::Class) -> Result<Vec<Self::Method>, Self::Error>;

    /// `Lookup.findVirtual`
    fn find_virtual(
        &self,
        lookup: &Self::Lookup,
        class: &Self::Class,
        name: &str,
        method_type: &Self::MethodType,
    ) -> Result<Self::MethodHandle, Self::Error>;

    /// `Lookup.findStatic`
    fn find_static(
        &self,
        lookup: &Self::Lookup,
        class: &Self::Class,
        name: &str,
        method_type: &Self::MethodType,
    ) -> Result<Self::MethodHandle, Self::Error>;

    /// Declaring class, name, and signature of a method
    fn describe_method(&self, method: &Self::Method) -> ReflectedMethod;

    /// `Lookup.revealDirect`
    fn reveal_direct(
        &self,
        lookup: &Self::Lookup,
        handle: &Self::MethodHandle,
    ) -> Result<RevealedHandle, Self::Error>;

    /// Class for a type descriptor (primitive, array, or object type)
    fn resolve_type(&self, field_type: &FieldType) -> Result<Self::Class, Self::Error>;

    /// `MethodType` for a method descriptor
    fn resolve_method_type(
        &self,
        descriptor: &MethodDescriptor,
    ) -> Result<Self::MethodType, Self::Error>;
}

/// Reflective lookups that never hand out an intercepted method
///
/// Every operation first performs the real lookup, so lookup failures are exactly those of the
/// runtime. Only successful results are inspected and, if they are intercepted, swapped for the
/// interceptor.
pub struct ReflectionFilter<R> {
    registry: Arc<PatternRegistry>,
    runtime: R,
}

impl<R: Reflection> ReflectionFilter<R> {
    pub fn new(registry: Arc<PatternRegistry>, runtime: R) -> ReflectionFilter<R> {
        ReflectionFilter { registry, runtime }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn get_declared_method(
        &self,
        class: &R::Class,
        name: &str,
        parameter_types: &[R::Class],
    ) -> Result<R::Method, R::Error> {
        let method = self
            .runtime
            .get_declared_method(class, name, parameter_types)?;
        self.filter_method(method)
    }

    pub fn get_method(
        &self,
        class: &R::Class,
        name: &str,
        parameter_types: &[R::Class],
    ) -> Result<R::Method, R::Error> {
        let method = self.runtime.get_method(class, name, parameter_types)?;
        self.filter_method(method)
    }

    pub fn get_declared_methods(&self, class: &R::Class) -> Result<Vec<R::Method>, R::Error> {
        let methods = self.runtime.get_declared_methods(class)?;
        self.filter_methods(methods)
    }

    pub fn get_methods(&self, class: &R::Class) -> Result<Vec<R::Method>, R::Error> {
        let methods = self.runtime.get_methods(class)?;
        self.filter_methods(methods)
    }

    pub fn find_virtual(
        &self,
        lookup: &R::Lookup,
        class: &R::Class,
        name: &str,
        method_type: &R::MethodType,
    ) -> Result<R::MethodHandle, R::Error> {
        let handle = self
            .runtime
            .find_virtual(lookup, class, name, method_type)?;
        self.filter_handle(lookup, handle)
    }

    pub fn find_static(
        &self,
        lookup: &R::Lookup,
        class: &R::Class,
        name: &str,
        method_type: &R::MethodType,
    ) -> Result<R::MethodHandle, R::Error> {
        let handle = self.runtime.find_static(lookup, class, name, method_type)?;
        self.filter_handle(lookup, handle)
    }

    fn filter_method(&self, method: R::Method) -> Result<R::Method, R::Error> {
        let description = self.runtime.describe_method(&method);
        match self.registry.match_method(&description) {
            None => Ok(method),
            Some(pattern) => {
                log::debug!("Handing out interceptor for reflected {}", pattern);
                self.interceptor_method(pattern)
            }
        }
    }

    fn filter_methods(&self, methods: Vec<R::Method>) -> Result<Vec<R::Method>, R::Error> {
        methods
            .into_iter()
            .map(|method| self.filter_method(method))
            .collect()
    }

    fn filter_handle(
        &self,
        lookup: &R::Lookup,
        handle: R::MethodHandle,
    ) -> Result<R::MethodHandle, R::Error> {
        let revealed = self.runtime.reveal_direct(lookup, &handle)?;
        match self.registry.match_revealed_handle(&revealed) {
            None => Ok(handle),
            Some(pattern) => {
                log::debug!("Handing out interceptor for method handle to {}", pattern);
                self.interceptor_handle(lookup, pattern)
            }
        }
    }

    /// Interceptor method for a pattern, looked up on the interceptor class
    fn interceptor_method(&self, pattern: &InvocationPattern) -> Result<R::Method, R::Error> {
        let target = pattern.redirect_target(self.registry.interceptor());
        let class = self
            .runtime
            .resolve_type(&FieldType::object(target.owner.clone()))?;
        let parameter_types = target
            .descriptor
            .parameters
            .iter()
            .map(|parameter| self.runtime.resolve_type(parameter))
            .collect::<Result<Vec<_>, _>>()?;
        self.runtime
            .get_declared_method(&class, target.name.as_ref(), &parameter_types)
    }

    /// Static method handle to the interceptor for a pattern
    fn interceptor_handle(
        &self,
        lookup: &R::Lookup,
        pattern: &InvocationPattern,
    ) -> Result<R::MethodHandle, R::Error> {
        let target = pattern.redirect_target(self.registry.interceptor());
        let class = self
            .runtime
            .resolve_type(&FieldType::object(target.owner.clone()))?;
        let method_type = self.runtime.resolve_method_type(&target.descriptor)?;
        self.runtime
            .find_static(lookup, &class, target.name.as_ref(), &method_type)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::{
        BaseType, BinaryName, HandleKind, Name, ParseDescriptor, RefType, RenderDescriptor,
    };
    use std::collections::HashMap;

    /// Class table of a pretend JVM
    struct FakeRuntime {
        classes: HashMap<String, FakeClass>,
    }

    struct FakeClass {
        is_interface: bool,
        superclass: Option<String>,
        methods: Vec<(String, MethodDescriptor, bool)>,
    }

    #[derive(Debug, PartialEq)]
    enum FakeError {
        ClassNotFound(String),
        NoSuchMethod(String),
    }

    #[derive(Debug, PartialEq)]
    struct FakeHandle(RevealedHandle);

    impl FakeRuntime {
        fn new() -> FakeRuntime {
            let mut classes = HashMap::new();
            add_class(&mut classes, "java/lang/Object", None, &[("hashCode", "()I", false)]);
            add_class(
                &mut classes,
                "java/lang/Runtime",
                Some("java/lang/Object"),
                &[
                    ("exit", "(I)V", false),
                    ("halt", "(I)V", false),
                    ("gc", "()V", false),
                    ("getRuntime", "()Ljava/lang/Runtime;", true),
                ],
            );
            add_class(
                &mut classes,
                "callguard/Interceptors",
                Some("java/lang/Object"),
                &[
                    ("exit", "(I)V", true),
                    ("exit", "(Ljava/lang/Runtime;I)V", true),
                    ("halt", "(Ljava/lang/Runtime;I)V", true),
                ],
            );
            FakeRuntime { classes }
        }

        fn class_name(class: &FieldType) -> Result<&str, FakeError> {
            match class {
                FieldType::Ref(RefType::Object(name)) => Ok(name.as_str()),
                other => Err(FakeError::ClassNotFound(other.render())),
            }
        }

        fn class(&self, class: &FieldType) -> Result<(&str, &FakeClass), FakeError> {
            let name = Self::class_name(class)?;
            self.classes
                .get_key_value(name)
                .map(|(name, class)| (name.as_str(), class))
                .ok_or_else(|| FakeError::ClassNotFound(name.to_owned()))
        }

        fn declared(&self, class: &FieldType) -> Result<Vec<ReflectedMethod>, FakeError> {
            let (name, fake) = self.class(class)?;
            Ok(fake
                .methods
                .iter()
                .map(|(method, desc, _)| ReflectedMethod {
                    declaring_class: name.to_owned(),
                    declaring_class_is_interface: fake.is_interface,
                    name: method.clone(),
                    parameter_types: desc.parameters.clone(),
                    return_type: desc.return_type.clone(),
                })
                .collect())
        }

        fn find(
            &self,
            class: &FieldType,
            name: &str,
            method_type: &MethodDescriptor,
            is_static: bool,
        ) -> Result<FakeHandle, FakeError> {
            let (class_name, fake) = self.class(class)?;
            let found = fake
                .methods
                .iter()
                .any(|(n, d, s)| n == name && d == method_type && *s == is_static);
            if !found {
                return Err(FakeError::NoSuchMethod(name.to_owned()));
            }
            Ok(FakeHandle(RevealedHandle {
                declaring_class: class_name.to_owned(),
                declaring_class_is_interface: fake.is_interface,
                name: name.to_owned(),
                method_type: method_type.clone(),
                reference_kind: if is_static {
                    HandleKind::InvokeStatic
                } else {
                    HandleKind::InvokeVirtual
                },
            }))
        }
    }

    fn add_class(
        classes: &mut HashMap<String, FakeClass>,
        name: &str,
        superclass: Option<&str>,
        methods: &[(&str, &str, bool)],
    ) {
        let methods = methods
            .iter()
            .map(|(method, desc, is_static)| {
                let desc = MethodDescriptor::parse(desc).unwrap();
                (method.to_string(), desc, *is_static)
            })
            .collect();
        let class = FakeClass {
            is_interface: false,
            superclass: superclass.map(str::to_owned),
            methods,
        };
        classes.insert(name.to_owned(), class);
    }

    impl Reflection for FakeRuntime {
        type Class = FieldType;
        type Method = ReflectedMethod;
        type MethodHandle = FakeHandle;
        type Lookup = ();
        type MethodType = MethodDescriptor;
        type Error = FakeError;

        fn get_declared_method(
            &self,
            class: &FieldType,
            name: &str,
            parameter_types: &[FieldType],
        ) -> Result<ReflectedMethod, FakeError> {
            self.declared(class)?
                .into_iter()
                .find(|m| m.name == name && m.parameter_types == parameter_types)
                .ok_or_else(|| FakeError::NoSuchMethod(name.to_owned()))
        }

        fn get_method(
            &self,
            class: &FieldType,
            name: &str,
            parameter_types: &[FieldType],
        ) -> Result<ReflectedMethod, FakeError> {
            self.get_methods(class)?
                .into_iter()
                .find(|m| m.name == name && m.parameter_types == parameter_types)
                .ok_or_else(|| FakeError::NoSuchMethod(name.to_owned()))
        }

        fn get_declared_methods(
            &self,
            class: &FieldType,
        ) -> Result<Vec<ReflectedMethod>, FakeError> {
            self.declared(class)
        }

        fn get_methods(&self, class: &FieldType) -> Result<Vec<ReflectedMethod>, FakeError> {
            let mut methods = self.declared(class)?;
            let (_, fake) = self.class(class)?;
            if let Some(superclass) = &fake.superclass {
                let superclass = BinaryName::from_string(superclass.clone()).unwrap();
                methods.extend(self.get_methods(&FieldType::object(superclass))?);
            }
            Ok(methods)
        }

        fn find_virtual(
            &self,
            _lookup: &(),
            class: &FieldType,
            name: &str,
            method_type: &MethodDescriptor,
        ) -> Result<FakeHandle, FakeError> {
            self.find(class, name, method_type, false)
        }

        fn find_static(
            &self,
            _lookup: &(),
            class: &FieldType,
            name: &str,
            method_type: &MethodDescriptor,
        ) -> Result<FakeHandle, FakeError> {
            self.find(class, name, method_type, true)
        }

        fn describe_method(&self, method: &ReflectedMethod) -> ReflectedMethod {
            method.clone()
        }

        fn reveal_direct(
            &self,
            _lookup: &(),
            handle: &FakeHandle,
        ) -> Result<RevealedHandle, FakeError> {
            Ok(handle.0.clone())
        }

        fn resolve_type(&self, field_type: &FieldType) -> Result<FieldType, FakeError> {
            Ok(field_type.clone())
        }

        fn resolve_method_type(
            &self,
            descriptor: &MethodDescriptor,
        ) -> Result<MethodDescriptor, FakeError> {
            Ok(descriptor.clone())
        }
    }

    fn filter() -> ReflectionFilter<FakeRuntime> {
        let registry = PatternRegistry::builtin(BinaryName::INTERCEPTORS).unwrap();
        ReflectionFilter::new(Arc::new(registry), FakeRuntime::new())
    }

    const RUNTIME: FieldType = FieldType::object(BinaryName::RUNTIME);
    const INT: FieldType = FieldType::Base(BaseType::Int);

    #[test]
    fn declared_and_accessible_lookups_agree() {
        let filter = filter();
        let declared = filter
            .get_declared_method(&RUNTIME, "exit", &[INT])
            .unwrap();
        let accessible = filter.get_method(&RUNTIME, "exit", &[INT]).unwrap();

        assert_eq!(declared, accessible);
        assert_eq!(declared.declaring_class, "callguard/Interceptors");
        assert_eq!(declared.name, "exit");
        assert_eq!(declared.parameter_types, vec![RUNTIME, INT]);
        assert_eq!(declared.return_type, None);
    }

    #[test]
    fn other_methods_pass_through() {
        let filter = filter();
        let gc = filter.get_method(&RUNTIME, "gc", &[]).unwrap();
        assert_eq!(gc.declaring_class, "java/lang/Runtime");

        let hash_code = filter.get_method(&RUNTIME, "hashCode", &[]).unwrap();
        assert_eq!(hash_code.declaring_class, "java/lang/Object");
    }

    #[test]
    fn lookup_failures_propagate_unchanged() {
        let filter = filter();
        assert_eq!(
            filter.get_declared_method(&RUNTIME, "exit", &[]),
            Err(FakeError::NoSuchMethod(String::from("exit")))
        );
        assert_eq!(
            filter.get_declared_method(&RUNTIME, "hashCode", &[]),
            Err(FakeError::NoSuchMethod(String::from("hashCode")))
        );
        let missing = BinaryName::from_string(String::from("a/Missing")).unwrap();
        let missing = FieldType::object(missing);
        assert_eq!(
            filter.get_methods(&missing),
            Err(FakeError::ClassNotFound(String::from("a/Missing")))
        );
    }

    #[test]
    fn method_lists_keep_their_order() {
        let filter = filter();
        let methods = filter.get_declared_methods(&RUNTIME).unwrap();
        let summary: Vec<(String, String)> = methods
            .iter()
            .map(|m| (m.declaring_class.clone(), m.name.clone()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (String::from("callguard/Interceptors"), String::from("exit")),
                (String::from("callguard/Interceptors"), String::from("halt")),
                (String::from("java/lang/Runtime"), String::from("gc")),
                (String::from("java/lang/Runtime"), String::from("getRuntime")),
            ]
        );
        assert_eq!(filter.get_methods(&RUNTIME).unwrap().len(), 5);
    }

    #[test]
    fn method_handles_are_swapped_for_static_interceptors() {
        let filter = filter();
        let exit = MethodDescriptor::parse("(I)V").unwrap();

        let halt = filter.find_virtual(&(), &RUNTIME, "halt", &exit).unwrap();
        assert_eq!(halt.0.declaring_class, "callguard/Interceptors");
        assert_eq!(halt.0.reference_kind, HandleKind::InvokeStatic);
        assert_eq!(halt.0.method_type.render(), "(Ljava/lang/Runtime;I)V");

        let get_runtime = MethodDescriptor::parse("()Ljava/lang/Runtime;").unwrap();
        let handle = filter
            .find_static(&(), &RUNTIME, "getRuntime", &get_runtime)
            .unwrap();
        assert_eq!(handle.0.declaring_class, "java/lang/Runtime");

        assert_eq!(
            filter.find_static(&(), &RUNTIME, "halt", &exit),
            Err(FakeError::NoSuchMethod(String::from("halt")))
        );
    }
}
