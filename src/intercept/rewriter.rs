use super::{
    CallKind, DirectHandleKind, Error, HandleDescriptor, InvocationPattern, InvokeSite,
    PatternRegistry,
};
use crate::jvm::{
    decode_instructions, opcodes, BootstrapMethod, CodeElement, Constant, ConstantIndex,
    ConstantsPool, HandleKind, MethodRefConstantIndex, Name, RenderDescriptor,
};
use std::collections::HashMap;

/// Progress of visiting a constant
#[derive(Copy, Clone, Debug)]
enum Visit {
    InProgress,

    /// Whether the constant, or anything it refers to, was redirected
    Done(bool),
}

/// Redirects intercepted calls in the code and the constant pool of one class
///
/// Method handle constants are redirected in place: the slot keeps its index and now holds a
/// static handle to the interceptor. Every `ldc`, bootstrap method, or bootstrap argument that
/// refers to the slot thus picks up the change without being re-emitted. Invoke instructions are
/// rewritten to `invokestatic` on a (possibly new) method reference, padded with `nop` so that no
/// instruction moves.
///
/// All state lives for the duration of one class transformation.
pub struct ConstantRewriter<'a> {
    registry: &'a PatternRegistry,
    pool: &'a mut ConstantsPool,
    bootstrap_methods: &'a [BootstrapMethod],

    /// Deepest chain of dynamic constants followed before giving up
    max_nesting: usize,

    /// Constants already visited (keyed by their index in the pool)
    visited: HashMap<ConstantIndex, Visit>,

    /// Method reference to call instead, for every method reference invoked so far
    invokes: HashMap<(CallKind, ConstantIndex), Option<MethodRefConstantIndex>>,
}

impl<'a> ConstantRewriter<'a> {
    pub fn new(
        registry: &'a PatternRegistry,
        pool: &'a mut ConstantsPool,
        bootstrap_methods: &'a [BootstrapMethod],
        max_nesting: usize,
    ) -> ConstantRewriter<'a> {
        ConstantRewriter {
            registry,
            pool,
            bootstrap_methods,
            max_nesting,
            visited: HashMap::new(),
            invokes: HashMap::new(),
        }
    }

    pub fn pool(&self) -> &ConstantsPool {
        self.pool
    }

    /// Rewrite one method body in place, returning whether anything in it got redirected
    ///
    /// This includes constants that were already redirected while rewriting an earlier method:
    /// the method still refers to something that changed.
    pub fn rewrite_code(&mut self, code: &mut [u8]) -> Result<bool, Error> {
        let mut modified = false;

        for instruction in decode_instructions(code)? {
            let offset = instruction.offset;
            match instruction.element {
                CodeElement::Invoke { opcode, method } => {
                    let kind = CallKind::from_opcode(opcode)?;
                    if let Some(redirected) = self.redirect_invoke(kind, method)? {
                        let [high, low] = ConstantIndex::from(redirected).0.to_be_bytes();
                        code[offset] = opcodes::INVOKESTATIC;
                        code[offset + 1] = high;
                        code[offset + 2] = low;
                        for padding in &mut code[offset + 3..offset + instruction.length] {
                            *padding = opcodes::NOP;
                        }
                        log::trace!("Redirected {} at offset {}", kind.keyword(), offset);
                        modified = true;
                    }
                }
                CodeElement::InvokeDynamic { call_site } => {
                    modified |= self.rewrite_constant(call_site, 0)?;
                }
                CodeElement::LoadConstant { constant } => {
                    modified |= self.rewrite_constant(constant, 0)?;
                }
                CodeElement::Other => (),
            }
        }

        Ok(modified)
    }

    /// Rewrite a constant and everything reachable from it
    ///
    /// Only method handles, dynamic constants, and invokedynamic call sites can lead to a method;
    /// every other kind of constant is left alone.
    pub fn rewrite_constant(&mut self, index: ConstantIndex, depth: usize) -> Result<bool, Error> {
        match self.visited.get(&index) {
            Some(Visit::Done(redirected)) => return Ok(*redirected),
            Some(Visit::InProgress) => return Err(Error::CyclicConstant(index)),
            None => (),
        }
        if depth > self.max_nesting {
            return Err(Error::ConstantNestingTooDeep {
                index,
                limit: self.max_nesting,
            });
        }

        let _ = self.visited.insert(index, Visit::InProgress);
        let redirected = match *self.pool.get(index)? {
            Constant::MethodHandle {
                handle_kind,
                member,
            } => self.rewrite_method_handle(index, handle_kind, member)?,
            Constant::Dynamic {
                bootstrap_method, ..
            }
            | Constant::InvokeDynamic {
                bootstrap_method, ..
            } => self.rewrite_bootstrap(bootstrap_method, depth)?,
            Constant::Class(_)
            | Constant::FieldRef(_, _)
            | Constant::MethodRef { .. }
            | Constant::String(_)
            | Constant::Integer(_)
            | Constant::Float(_)
            | Constant::Long(_)
            | Constant::Double(_)
            | Constant::NameAndType { .. }
            | Constant::Utf8(_)
            | Constant::MethodType { .. }
            | Constant::Module(_)
            | Constant::Package(_) => false,
        };
        let _ = self.visited.insert(index, Visit::Done(redirected));

        Ok(redirected)
    }

    /// Rewrite the bootstrap method handle, and then every static argument
    fn rewrite_bootstrap(&mut self, bootstrap_method: u16, depth: usize) -> Result<bool, Error> {
        let bootstrap_methods = self.bootstrap_methods;
        let bootstrap = bootstrap_methods
            .get(bootstrap_method as usize)
            .ok_or(crate::jvm::Error::BadBootstrapMethod(bootstrap_method))?;

        let mut redirected = self.rewrite_constant(bootstrap.bootstrap_method, depth + 1)?;
        for argument in &bootstrap.bootstrap_arguments {
            redirected |= self.rewrite_constant(*argument, depth + 1)?;
        }
        Ok(redirected)
    }

    fn rewrite_method_handle(
        &mut self,
        index: ConstantIndex,
        handle_kind: HandleKind,
        member: ConstantIndex,
    ) -> Result<bool, Error> {
        if !handle_kind.is_method() {
            return Ok(false);
        }
        let method = match self.pool.lookup_method_ref(member)? {
            Some(method) => method,
            None => return Ok(false),
        };
        let kind = match DirectHandleKind::from_parts(handle_kind, method.is_interface) {
            Some(kind) => kind,
            None => return Ok(false),
        };

        let handle = HandleDescriptor {
            kind,
            method: &method,
        };
        let registry = self.registry;
        match registry.match_handle(&handle) {
            None => Ok(false),
            Some(pattern) => {
                let redirected = self.redirect_method_ref(pattern)?;
                let _ = self.pool.replace_method_handle(
                    index,
                    HandleKind::InvokeStatic,
                    redirected,
                )?;
                log::trace!("Redirected method handle #{} ({})", index.0, pattern);
                Ok(true)
            }
        }
    }

    /// Method reference that the invoke should call instead, if the call is intercepted
    fn redirect_invoke(
        &mut self,
        kind: CallKind,
        method: ConstantIndex,
    ) -> Result<Option<MethodRefConstantIndex>, Error> {
        if let Some(cached) = self.invokes.get(&(kind, method)) {
            return Ok(*cached);
        }

        let redirected = match self.pool.lookup_method_ref(method)? {
            None => None,
            Some(info) => {
                let site = InvokeSite {
                    kind,
                    method: &info,
                };
                let registry = self.registry;
                match registry.match_invoke(&site) {
                    None => None,
                    Some(pattern) => Some(self.redirect_method_ref(pattern)?),
                }
            }
        };

        let _ = self.invokes.insert((kind, method), redirected);
        Ok(redirected)
    }

    /// Get or insert the method reference to the interceptor for a pattern
    fn redirect_method_ref(
        &mut self,
        pattern: &InvocationPattern,
    ) -> Result<MethodRefConstantIndex, Error> {
        let target = pattern.redirect_target(self.registry.interceptor());
        let class_name = self.pool.get_utf8(target.owner.as_str())?;
        let class = self.pool.get_class(class_name)?;
        let name = self.pool.get_utf8(target.name.as_str())?;
        let descriptor = self.pool.get_utf8(&target.descriptor.render())?;
        let name_and_type = self.pool.get_name_and_type(name, descriptor)?;
        Ok(self.pool.get_method_ref(class, name_and_type, false)?)
    }
}
