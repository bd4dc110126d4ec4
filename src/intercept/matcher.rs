use super::{CallKind, DirectHandleKind, InvocationPattern};
use crate::jvm::{FieldType, HandleKind, MethodDescriptor, MethodRefInfo, Name, RenderDescriptor};

/// Method invocation instruction, with its method reference resolved
#[derive(Copy, Clone, Debug)]
pub struct InvokeSite<'a> {
    pub kind: CallKind,
    pub method: &'a MethodRefInfo,
}

/// Method handle constant, with its member resolved
#[derive(Copy, Clone, Debug)]
pub struct HandleDescriptor<'a> {
    pub kind: DirectHandleKind,
    pub method: &'a MethodRefInfo,
}

/// What the runtime reports about a reflected method
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ReflectedMethod {
    /// Internal name of the declaring class
    pub declaring_class: String,
    pub declaring_class_is_interface: bool,
    pub name: String,
    pub parameter_types: Vec<FieldType>,
    pub return_type: Option<FieldType>,
}

/// What the runtime reveals about a direct method handle
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RevealedHandle {
    /// Internal name of the declaring class
    pub declaring_class: String,
    pub declaring_class_is_interface: bool,
    pub name: String,
    pub method_type: MethodDescriptor,
    pub reference_kind: HandleKind,
}

impl InvocationPattern {
    /// Does the invoke instruction call the intercepted method?
    pub fn matches_invoke(&self, site: &InvokeSite) -> bool {
        self.kind == site.kind
            && self.owner_is_interface == site.method.is_interface
            && self.name.as_str() == site.method.name
            && self.owner.as_str() == site.method.owner
            && self.descriptor.render() == site.method.descriptor
    }

    /// Does the method handle constant refer to the intercepted method?
    pub fn matches_handle(&self, handle: &HandleDescriptor) -> bool {
        self.direct_handle_kind() == handle.kind
            && self.owner.as_str() == handle.method.owner
            && self.name.as_str() == handle.method.name
            && self.descriptor.render() == handle.method.descriptor
    }

    /// Is the reflected method the intercepted method?
    ///
    /// A reflected method does not know how it will get called, so the call kind is not compared.
    pub fn matches_method(&self, method: &ReflectedMethod) -> bool {
        self.owner_is_interface == method.declaring_class_is_interface
            && self.owner.as_str() == method.declaring_class
            && self.name.as_str() == method.name
            && self.descriptor.return_type == method.return_type
            && self.descriptor.parameters == method.parameter_types
    }

    /// Does the live method handle point at the intercepted method?
    ///
    /// The live handle is projected onto the same description as a handle constant.
    pub fn matches_revealed_handle(&self, handle: &RevealedHandle) -> bool {
        let is_interface = handle.declaring_class_is_interface;
        let kind = match DirectHandleKind::from_parts(handle.reference_kind, is_interface) {
            Some(kind) => kind,
            None => return false,
        };
        let method = MethodRefInfo {
            owner: handle.declaring_class.clone(),
            name: handle.name.clone(),
            descriptor: handle.method_type.render(),
            is_interface,
        };
        self.matches_handle(&HandleDescriptor {
            kind,
            method: &method,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::{opcodes, BinaryName, ParseDescriptor};

    fn runtime_exit() -> InvocationPattern {
        InvocationPattern::from_opcode(
            opcodes::INVOKEVIRTUAL,
            "java/lang/Runtime",
            "exit",
            "(I)V",
            false,
        )
        .unwrap()
    }

    fn method_ref(owner: &str, name: &str, descriptor: &str, is_interface: bool) -> MethodRefInfo {
        MethodRefInfo {
            owner: owner.to_owned(),
            name: name.to_owned(),
            descriptor: descriptor.to_owned(),
            is_interface,
        }
    }

    #[test]
    fn invoke_sites_compare_every_component() {
        let pattern = runtime_exit();
        let exit = method_ref("java/lang/Runtime", "exit", "(I)V", false);
        fn site(kind: CallKind, method: &MethodRefInfo) -> InvokeSite<'_> {
            InvokeSite { kind, method }
        }

        assert!(pattern.matches_invoke(&site(CallKind::Virtual, &exit)));
        assert!(!pattern.matches_invoke(&site(CallKind::Special, &exit)));
        assert!(!pattern.matches_invoke(&site(
            CallKind::Virtual,
            &method_ref("java/lang/Runtime", "exit", "(I)V", true)
        )));
        assert!(!pattern.matches_invoke(&site(
            CallKind::Virtual,
            &method_ref("java/lang/Runtime", "halt", "(I)V", false)
        )));
        assert!(!pattern.matches_invoke(&site(
            CallKind::Virtual,
            &method_ref("java/lang/System", "exit", "(I)V", false)
        )));
        assert!(!pattern.matches_invoke(&site(
            CallKind::Virtual,
            &method_ref("java/lang/Runtime", "exit", "(J)V", false)
        )));
    }

    #[test]
    fn handles_compare_direct_kind() {
        let pattern = runtime_exit();
        let exit = method_ref("java/lang/Runtime", "exit", "(I)V", false);
        let handle = |kind| HandleDescriptor {
            kind,
            method: &exit,
        };
        assert!(pattern.matches_handle(&handle(DirectHandleKind::Virtual)));
        assert!(!pattern.matches_handle(&handle(DirectHandleKind::Special)));
        assert!(!pattern.matches_handle(&handle(DirectHandleKind::Static)));
    }

    #[test]
    fn reflected_methods_ignore_call_kind() {
        let exit = ReflectedMethod {
            declaring_class: String::from("java/lang/Runtime"),
            declaring_class_is_interface: false,
            name: String::from("exit"),
            parameter_types: vec![FieldType::int()],
            return_type: None,
        };
        assert!(runtime_exit().matches_method(&exit));

        let mut as_static = runtime_exit();
        as_static.kind = CallKind::Static;
        assert!(as_static.matches_method(&exit));

        let wrong_return = ReflectedMethod {
            return_type: Some(FieldType::int()),
            ..exit.clone()
        };
        assert!(!runtime_exit().matches_method(&wrong_return));

        let on_interface = ReflectedMethod {
            declaring_class_is_interface: true,
            ..exit
        };
        assert!(!runtime_exit().matches_method(&on_interface));
    }

    #[test]
    fn revealed_handles_compare_reference_kind() {
        let revealed = RevealedHandle {
            declaring_class: String::from("java/lang/Runtime"),
            declaring_class_is_interface: false,
            name: String::from("exit"),
            method_type: MethodDescriptor::parse("(I)V").unwrap(),
            reference_kind: HandleKind::InvokeVirtual,
        };
        assert!(runtime_exit().matches_revealed_handle(&revealed));
        assert!(!runtime_exit().matches_revealed_handle(&RevealedHandle {
            reference_kind: HandleKind::InvokeStatic,
            ..revealed.clone()
        }));
        assert!(!runtime_exit().matches_revealed_handle(&RevealedHandle {
            declaring_class: BinaryName::SYSTEM.to_string(),
            ..revealed
        }));
    }
}
