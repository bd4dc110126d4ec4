use super::Error;
use crate::jvm::{
    opcodes, BinaryName, FieldType, HandleKind, MethodDescriptor, Name, ParseDescriptor,
    RenderDescriptor, UnqualifiedName,
};
use std::fmt::{self, Display, Formatter};

/// How a method gets invoked at a call site
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum CallKind {
    Static,
    Virtual,
    Special,
    Interface,
}

impl CallKind {
    /// Call kind of an invoke instruction
    pub fn from_opcode(opcode: u8) -> Result<CallKind, Error> {
        match opcode {
            opcodes::INVOKESTATIC => Ok(CallKind::Static),
            opcodes::INVOKEVIRTUAL => Ok(CallKind::Virtual),
            opcodes::INVOKESPECIAL => Ok(CallKind::Special),
            opcodes::INVOKEINTERFACE => Ok(CallKind::Interface),
            other => Err(Error::IllegalCallKind(format!("opcode 0x{:02x}", other))),
        }
    }

    pub fn opcode(self) -> u8 {
        match self {
            CallKind::Static => opcodes::INVOKESTATIC,
            CallKind::Virtual => opcodes::INVOKEVIRTUAL,
            CallKind::Special => opcodes::INVOKESPECIAL,
            CallKind::Interface => opcodes::INVOKEINTERFACE,
        }
    }

    /// Call kind from its name in a pattern configuration file
    pub fn from_keyword(keyword: &str) -> Result<CallKind, Error> {
        match keyword {
            "static" => Ok(CallKind::Static),
            "virtual" => Ok(CallKind::Virtual),
            "special" => Ok(CallKind::Special),
            "interface" => Ok(CallKind::Interface),
            other => Err(Error::IllegalCallKind(format!("'{}'", other))),
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            CallKind::Static => "static",
            CallKind::Virtual => "virtual",
            CallKind::Special => "special",
            CallKind::Interface => "interface",
        }
    }
}

/// Dispatch of a method handle that points directly at a method
///
/// This is the reference kind of the handle combined with whether the referenced method lives on
/// an interface. Field accessor handles have no direct handle kind.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum DirectHandleKind {
    Virtual,
    Static,
    InterfaceStatic,
    Special,
    InterfaceSpecial,
    Constructor,
    InterfaceVirtual,
}

impl DirectHandleKind {
    /// Classify a handle, if the reference kind and member are a combination the JVM accepts
    pub fn from_parts(reference_kind: HandleKind, is_interface: bool) -> Option<DirectHandleKind> {
        match (reference_kind, is_interface) {
            (HandleKind::InvokeVirtual, false) => Some(DirectHandleKind::Virtual),
            (HandleKind::InvokeStatic, false) => Some(DirectHandleKind::Static),
            (HandleKind::InvokeStatic, true) => Some(DirectHandleKind::InterfaceStatic),
            (HandleKind::InvokeSpecial, false) => Some(DirectHandleKind::Special),
            (HandleKind::InvokeSpecial, true) => Some(DirectHandleKind::InterfaceSpecial),
            (HandleKind::NewInvokeSpecial, false) => Some(DirectHandleKind::Constructor),
            (HandleKind::InvokeInterface, true) => Some(DirectHandleKind::InterfaceVirtual),
            _ => None,
        }
    }

    pub fn reference_kind(self) -> HandleKind {
        match self {
            DirectHandleKind::Virtual => HandleKind::InvokeVirtual,
            DirectHandleKind::Static | DirectHandleKind::InterfaceStatic => {
                HandleKind::InvokeStatic
            }
            DirectHandleKind::Special | DirectHandleKind::InterfaceSpecial => {
                HandleKind::InvokeSpecial
            }
            DirectHandleKind::Constructor => HandleKind::NewInvokeSpecial,
            DirectHandleKind::InterfaceVirtual => HandleKind::InvokeInterface,
        }
    }

    pub fn is_interface(self) -> bool {
        matches!(
            self,
            DirectHandleKind::InterfaceStatic
                | DirectHandleKind::InterfaceSpecial
                | DirectHandleKind::InterfaceVirtual
        )
    }
}

/// One shape of call that gets intercepted
///
/// Patterns are compared structurally. They are immutable once built.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct InvocationPattern {
    pub kind: CallKind,
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor,
    pub owner_is_interface: bool,
}

/// Static method on the interceptor class which replaces an intercepted method
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct RedirectTarget {
    pub owner: BinaryName,
    pub name: UnqualifiedName,
    pub descriptor: MethodDescriptor,
}

impl InvocationPattern {
    pub fn new(
        kind: CallKind,
        owner: BinaryName,
        name: UnqualifiedName,
        descriptor: MethodDescriptor,
        owner_is_interface: bool,
    ) -> InvocationPattern {
        InvocationPattern {
            kind,
            owner,
            name,
            descriptor,
            owner_is_interface,
        }
    }

    /// Build a pattern out of an invoke opcode and unchecked strings
    pub fn from_opcode(
        opcode: u8,
        owner: &str,
        name: &str,
        descriptor: &str,
        owner_is_interface: bool,
    ) -> Result<InvocationPattern, Error> {
        let kind = CallKind::from_opcode(opcode)?;
        let owner = BinaryName::from_string(owner.to_owned()).map_err(Error::BadPattern)?;
        let name = UnqualifiedName::from_string(name.to_owned()).map_err(Error::BadPattern)?;
        let descriptor = MethodDescriptor::parse(descriptor).map_err(|err| {
            Error::BadPattern(format!("Bad descriptor '{}': {}", descriptor, err))
        })?;
        let pattern = InvocationPattern::new(kind, owner, name, descriptor, owner_is_interface);
        pattern.check()?;
        Ok(pattern)
    }

    /// Reject patterns that no call site could ever match, or whose interceptor could not exist
    ///
    /// `invokeinterface` always references an interface method and `invokevirtual` never does.
    /// Constructors and class initializers can't be replaced by a static method of the same name.
    pub fn check(&self) -> Result<(), Error> {
        match (self.kind, self.owner_is_interface) {
            (CallKind::Interface, false) => {
                let msg = format!("'{}' is an interface call on a class", self);
                return Err(Error::BadPattern(msg));
            }
            (CallKind::Virtual, true) => {
                let msg = format!("'{}' is a virtual call on an interface", self);
                return Err(Error::BadPattern(msg));
            }
            _ => (),
        }
        if self.name == UnqualifiedName::INIT || self.name == UnqualifiedName::CLINIT {
            let msg = format!("'{}' can't be redirected to a static method", self.name);
            return Err(Error::BadPattern(msg));
        }
        Ok(())
    }

    /// Pattern for `invokestatic` on a class
    pub fn static_call(
        owner: BinaryName,
        name: UnqualifiedName,
        descriptor: MethodDescriptor,
    ) -> InvocationPattern {
        InvocationPattern::new(CallKind::Static, owner, name, descriptor, false)
    }

    /// Pattern for `invokevirtual` on a class
    pub fn virtual_call(
        owner: BinaryName,
        name: UnqualifiedName,
        descriptor: MethodDescriptor,
    ) -> InvocationPattern {
        InvocationPattern::new(CallKind::Virtual, owner, name, descriptor, false)
    }

    /// Kind a method handle to the intercepted method would have
    pub fn direct_handle_kind(&self) -> DirectHandleKind {
        match self.kind {
            CallKind::Virtual => DirectHandleKind::Virtual,
            CallKind::Special if self.owner_is_interface => DirectHandleKind::InterfaceSpecial,
            CallKind::Special => DirectHandleKind::Special,
            CallKind::Static if self.owner_is_interface => DirectHandleKind::InterfaceStatic,
            CallKind::Static => DirectHandleKind::Static,
            CallKind::Interface => DirectHandleKind::InterfaceVirtual,
        }
    }

    /// Descriptor of the interceptor method
    ///
    /// Non-static calls pass their receiver explicitly, as the first argument.
    pub fn redirect_descriptor(&self) -> MethodDescriptor {
        match self.kind {
            CallKind::Static => self.descriptor.clone(),
            CallKind::Virtual | CallKind::Special | CallKind::Interface => self
                .descriptor
                .with_leading_parameter(FieldType::object(self.owner.clone())),
        }
    }

    /// Interceptor method that replaces calls matching this pattern
    pub fn redirect_target(&self, interceptor: &BinaryName) -> RedirectTarget {
        RedirectTarget {
            owner: interceptor.clone(),
            name: self.name.clone(),
            descriptor: self.redirect_descriptor(),
        }
    }
}

/// Same layout as a line of a pattern configuration file
impl Display for InvocationPattern {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.keyword())?;
        if self.owner_is_interface {
            f.write_str(" interface")?;
        }
        write!(
            f,
            " {} {} {}",
            self.owner,
            self.name,
            self.descriptor.render()
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn only_invoke_opcodes_make_patterns() {
        assert!(InvocationPattern::from_opcode(0xb8, "java/lang/System", "exit", "(I)V", false)
            .is_ok());
        for opcode in [0xba, 0xb2, 0x00] {
            assert!(matches!(
                InvocationPattern::from_opcode(opcode, "java/lang/System", "exit", "(I)V", false),
                Err(Error::IllegalCallKind(_))
            ));
        }
        assert!(matches!(
            InvocationPattern::from_opcode(0xb8, "java.lang.System", "exit", "(I)V", false),
            Err(Error::BadPattern(_))
        ));
        assert!(matches!(
            InvocationPattern::from_opcode(0xb8, "java/lang/System", "exit", "(I", false),
            Err(Error::BadPattern(_))
        ));
    }

    #[test]
    fn impossible_patterns_are_rejected() {
        let executor = "java/util/concurrent/Executor";
        let descriptor = "(Ljava/lang/Runnable;)V";
        assert!(
            InvocationPattern::from_opcode(0xb9, executor, "execute", descriptor, true).is_ok()
        );
        for (opcode, owner_is_interface) in [(0xb9, false), (0xb6, true)] {
            assert!(matches!(
                InvocationPattern::from_opcode(
                    opcode,
                    executor,
                    "execute",
                    descriptor,
                    owner_is_interface
                ),
                Err(Error::BadPattern(_))
            ));
        }

        for name in ["<init>", "<clinit>"] {
            assert!(matches!(
                InvocationPattern::from_opcode(0xb7, "java/lang/Thread", name, "()V", false),
                Err(Error::BadPattern(_))
            ));
        }
    }

    #[test]
    fn receiver_is_prepended_for_instance_calls() {
        let halt =
            InvocationPattern::from_opcode(0xb6, "java/lang/Runtime", "halt", "(I)V", false)
                .unwrap();
        let target = halt.redirect_target(&BinaryName::INTERCEPTORS);
        assert_eq!(target.owner, BinaryName::INTERCEPTORS);
        assert_eq!(target.name, UnqualifiedName::HALT);
        assert_eq!(target.descriptor.render(), "(Ljava/lang/Runtime;I)V");

        let exit = InvocationPattern::from_opcode(0xb8, "java/lang/System", "exit", "(I)V", false)
            .unwrap();
        assert_eq!(
            exit.redirect_target(&BinaryName::INTERCEPTORS)
                .descriptor
                .render(),
            "(I)V"
        );
    }

    #[test]
    fn handle_kinds() {
        let kind_of = |opcode: u8, owner_is_interface: bool| {
            InvocationPattern::from_opcode(opcode, "a/B", "run", "()V", owner_is_interface)
                .unwrap()
                .direct_handle_kind()
        };
        assert_eq!(kind_of(0xb7, true), DirectHandleKind::InterfaceSpecial);
        assert_eq!(kind_of(0xb7, false), DirectHandleKind::Special);
        assert_eq!(kind_of(0xb8, true), DirectHandleKind::InterfaceStatic);
        assert_eq!(kind_of(0xb9, true), DirectHandleKind::InterfaceVirtual);

        for kind in [
            DirectHandleKind::Virtual,
            DirectHandleKind::Static,
            DirectHandleKind::InterfaceStatic,
            DirectHandleKind::Special,
            DirectHandleKind::InterfaceSpecial,
            DirectHandleKind::Constructor,
            DirectHandleKind::InterfaceVirtual,
        ] {
            assert_eq!(
                DirectHandleKind::from_parts(kind.reference_kind(), kind.is_interface()),
                Some(kind)
            );
        }
        assert_eq!(
            DirectHandleKind::from_parts(HandleKind::InvokeInterface, false),
            None
        );
        assert_eq!(DirectHandleKind::from_parts(HandleKind::GetField, false), None);
    }
}
