use super::{Deserialize, Error, Offset, OffsetResult, OffsetVec, Serialize, Width};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::result::Result;

/// Constant pool of a class being rewritten
///
/// The pool is seeded with the entries of the class as it was read, so every existing index stays
/// valid. New entries are only ever appended, and they are deduplicated against both the original
/// entries and each other.
///
/// Note: elements can be easily added to the pool, but not so easily removed
pub struct ConstantsPool {
    constants: OffsetVec<Constant>,

    classes: HashMap<Utf8ConstantIndex, ClassConstantIndex>,
    methodrefs:
        HashMap<(ClassConstantIndex, NameAndTypeConstantIndex, bool), MethodRefConstantIndex>,
    name_and_types: HashMap<(Utf8ConstantIndex, Utf8ConstantIndex), NameAndTypeConstantIndex>,
    utf8s: HashMap<Vec<u8>, Utf8ConstantIndex>,
}

/// Method reference with all of its symbolic components resolved
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MethodRefInfo {
    /// Internal name of the class (or array type, for methods like `clone`)
    pub owner: String,
    pub name: String,
    pub descriptor: String,
    pub is_interface: bool,
}

impl ConstantsPool {
    /// Make a fresh empty constants pool
    pub fn new() -> ConstantsPool {
        ConstantsPool::from_constants(OffsetVec::new_starting_at(Offset(1)))
    }

    /// Make a pool out of existing entries (which keep their offsets)
    ///
    /// When the existing entries contain duplicates, the first one is the one that gets reused.
    pub fn from_constants(constants: OffsetVec<Constant>) -> ConstantsPool {
        let offsets: Vec<Offset> = constants.iter().map(|(offset, _)| offset).collect();
        let mut pool = ConstantsPool {
            constants,
            classes: HashMap::new(),
            methodrefs: HashMap::new(),
            name_and_types: HashMap::new(),
            utf8s: HashMap::new(),
        };
        for Offset(offset) in offsets {
            pool.remember(ConstantIndex(offset as u16));
        }
        pool
    }

    /// Make the constant at `index` available for reuse, unless an equal one already is
    fn remember(&mut self, index: ConstantIndex) {
        let constant = match self.constants.get_offset(Offset(index.0 as usize)).ok() {
            Some(constant) => constant,
            None => return,
        };
        match constant {
            Constant::Utf8(bytes) => {
                self.utf8s
                    .entry(bytes.clone())
                    .or_insert(Utf8ConstantIndex(index));
            }
            Constant::Class(name) => {
                self.classes.entry(*name).or_insert(ClassConstantIndex(index));
            }
            Constant::NameAndType { name, descriptor } => {
                self.name_and_types
                    .entry((*name, *descriptor))
                    .or_insert(NameAndTypeConstantIndex(index));
            }
            Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            } => {
                self.methodrefs
                    .entry((*class, *name_and_type, *is_interface))
                    .or_insert(MethodRefConstantIndex(index));
            }
            _ => (),
        }
    }

    /// Read a pool (starting at `constant_pool_count`)
    pub fn parse<R: ReadBytesExt>(reader: &mut R) -> Result<ConstantsPool, Error> {
        let count = u16::deserialize(reader)?;
        let mut constants = OffsetVec::new_starting_at(Offset(1));
        while constants.offset_len().0 < count as usize {
            let index = ConstantIndex(constants.offset_len().0 as u16);
            let constant = Constant::parse(reader, index)?;
            constants.push(constant);
        }

        // Either the count was zero, or a wide constant claimed the slot past the end
        if constants.offset_len().0 != count as usize {
            return Err(Error::BadConstantIndex(ConstantIndex(count)));
        }

        Ok(ConstantsPool::from_constants(constants))
    }

    /// Value of `constant_pool_count` (one more than the largest index in use)
    pub fn count(&self) -> u16 {
        self.constants.offset_len().0 as u16
    }

    /// Push a constant into the constant pool, provided there is space for it
    ///
    /// Note: the largest valid index is 65535, indexing starts at 1, and some constants take two
    /// spaces.
    fn push_constant(
        constants: &mut OffsetVec<Constant>,
        constant: Constant,
    ) -> Result<ConstantIndex, Error> {
        let Offset(offset) = constants.offset_len();

        if offset + constant.width() <= u16::MAX.into() {
            let _ = constants.push(constant);
            Ok(ConstantIndex(offset as u16))
        } else {
            Err(Error::ConstantPoolOverflow { constant, offset })
        }
    }

    /// Append a constant without looking for an existing equal entry
    pub fn push(&mut self, constant: Constant) -> Result<ConstantIndex, Error> {
        let index = Self::push_constant(&mut self.constants, constant)?;
        self.remember(index);
        Ok(index)
    }

    /// Get a constant from the pool
    pub fn get(&self, index: ConstantIndex) -> Result<&Constant, Error> {
        self.constants
            .get_offset(Offset(index.0 as usize))
            .ok()
            .ok_or(Error::BadConstantIndex(index))
    }

    /// Swap the method handle at `index` for a different handle, in place
    ///
    /// Everything referring to the slot (`ldc`, bootstrap methods, bootstrap arguments) sees the
    /// new handle. The previous constant is returned.
    pub fn replace_method_handle(
        &mut self,
        index: ConstantIndex,
        handle_kind: HandleKind,
        member: MethodRefConstantIndex,
    ) -> Result<Constant, Error> {
        match self.get(index)? {
            Constant::MethodHandle { .. } => (),
            other => {
                return Err(Error::UnexpectedConstant {
                    index,
                    expected: "MethodHandle",
                    found: other.clone(),
                })
            }
        }

        let replacement = Constant::MethodHandle {
            handle_kind,
            member: member.into(),
        };
        match self
            .constants
            .replace_offset(Offset(index.0 as usize), replacement)
        {
            OffsetResult::Replaced(_, previous) => Ok(previous),
            _ => Err(Error::BadConstantIndex(index)),
        }
    }

    /// Get or insert a utf8 constant from the constant pool
    pub fn get_utf8(&mut self, utf8: &str) -> Result<Utf8ConstantIndex, Error> {
        let encoded = encode_modified_utf8(utf8);
        match self.utf8s.entry(encoded) {
            Entry::Occupied(occupied) => Ok(*occupied.get()),
            Entry::Vacant(vacant) => {
                let constant = Constant::Utf8(vacant.key().clone());
                let idx = Utf8ConstantIndex(Self::push_constant(&mut self.constants, constant)?);
                let _ = vacant.insert(idx);
                Ok(idx)
            }
        }
    }

    /// Get or insert a class constant from the constant pool
    pub fn get_class(&mut self, name: Utf8ConstantIndex) -> Result<ClassConstantIndex, Error> {
        match self.classes.entry(name) {
            Entry::Occupied(occupied) => Ok(*occupied.get()),
            Entry::Vacant(vacant) => {
                let constant = Constant::Class(name);
                let idx = ClassConstantIndex(Self::push_constant(&mut self.constants, constant)?);
                let _ = vacant.insert(idx);
                Ok(idx)
            }
        }
    }

    /// Get or insert a name & type constant from the constant pool
    pub fn get_name_and_type(
        &mut self,
        name: Utf8ConstantIndex,
        descriptor: Utf8ConstantIndex,
    ) -> Result<NameAndTypeConstantIndex, Error> {
        match self.name_and_types.entry((name, descriptor)) {
            Entry::Occupied(occupied) => Ok(*occupied.get()),
            Entry::Vacant(vacant) => {
                let constant = Constant::NameAndType { name, descriptor };
                let idx =
                    NameAndTypeConstantIndex(Self::push_constant(&mut self.constants, constant)?);
                let _ = vacant.insert(idx);
                Ok(idx)
            }
        }
    }

    /// Get or insert a method reference constant from the constant pool
    pub fn get_method_ref(
        &mut self,
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
        is_interface: bool,
    ) -> Result<MethodRefConstantIndex, Error> {
        match self.methodrefs.entry((class, name_and_type, is_interface)) {
            Entry::Occupied(occupied) => Ok(*occupied.get()),
            Entry::Vacant(vacant) => {
                let constant = Constant::MethodRef {
                    class,
                    name_and_type,
                    is_interface,
                };
                let idx =
                    MethodRefConstantIndex(Self::push_constant(&mut self.constants, constant)?);
                let _ = vacant.insert(idx);
                Ok(idx)
            }
        }
    }

    /// Raw (modified UTF-8) bytes of a utf8 constant
    pub fn lookup_utf8(&self, index: Utf8ConstantIndex) -> Result<&[u8], Error> {
        match self.get(index.0)? {
            Constant::Utf8(bytes) => Ok(bytes),
            other => Err(Error::UnexpectedConstant {
                index: index.0,
                expected: "Utf8",
                found: other.clone(),
            }),
        }
    }

    /// Utf8 constant decoded as a string, or `None` if it has no valid string form (eg. it holds
    /// an unpaired surrogate)
    pub fn lookup_str(&self, index: Utf8ConstantIndex) -> Result<Option<String>, Error> {
        self.lookup_utf8(index).map(decode_modified_utf8)
    }

    /// Name of a class constant
    pub fn lookup_class_name(&self, index: ClassConstantIndex) -> Result<Option<String>, Error> {
        match self.get(index.0)? {
            Constant::Class(name) => self.lookup_str(*name),
            other => Err(Error::UnexpectedConstant {
                index: index.0,
                expected: "Class",
                found: other.clone(),
            }),
        }
    }

    /// Resolve a `Methodref` or `InterfaceMethodref` into its components
    ///
    /// Components that cannot be decoded as strings can't be compared against anything, so they
    /// produce `None` rather than an error.
    pub fn lookup_method_ref(&self, index: ConstantIndex) -> Result<Option<MethodRefInfo>, Error> {
        let (class, name_and_type, is_interface) = match self.get(index)? {
            Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            } => (*class, *name_and_type, *is_interface),
            other => {
                return Err(Error::UnexpectedConstant {
                    index,
                    expected: "Methodref",
                    found: other.clone(),
                })
            }
        };
        let (name, descriptor) = match self.get(name_and_type.0)? {
            Constant::NameAndType { name, descriptor } => (*name, *descriptor),
            other => {
                return Err(Error::UnexpectedConstant {
                    index: name_and_type.0,
                    expected: "NameAndType",
                    found: other.clone(),
                })
            }
        };

        let owner = self.lookup_class_name(class)?;
        let name = self.lookup_str(name)?;
        let descriptor = self.lookup_str(descriptor)?;
        Ok(match (owner, name, descriptor) {
            (Some(owner), Some(name), Some(descriptor)) => Some(MethodRefInfo {
                owner,
                name,
                descriptor,
                is_interface,
            }),
            _ => None,
        })
    }
}

impl Default for ConstantsPool {
    fn default() -> Self {
        ConstantsPool::new()
    }
}

impl Serialize for ConstantsPool {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.count().serialize(writer)?;
        for (_, constant) in self.constants.iter() {
            constant.serialize(writer)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ConstantsPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.constants.fmt(f)
    }
}

/// Constants as in the constant pool
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.4
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    /// Class or an interface
    Class(Utf8ConstantIndex),

    /// Field
    FieldRef(ClassConstantIndex, NameAndTypeConstantIndex),

    /// Method (this combines `Methodref` and `InterfaceMethodref`
    MethodRef {
        class: ClassConstantIndex,
        name_and_type: NameAndTypeConstantIndex,
        is_interface: bool,
    },

    /// Constant object of type `java.lang.String`
    String(Utf8ConstantIndex),

    /// Constant primitive of type `int`
    Integer(i32),

    /// Constant primitive of type `float`
    Float(f32),

    /// Constant primitive of type `long`
    Long(i64),

    /// Constant primitive of type `double`
    Double(f64),

    /// Name and a type (eg. for a field or a method)
    NameAndType {
        name: Utf8ConstantIndex,
        descriptor: Utf8ConstantIndex,
    },

    /// Constant string value, kept in its encoded form
    ///
    /// Despite the name, the encoding is not quite UTF-8 (the encoding of the null character
    /// `\u{0000}` and the encoding of supplementary characters is different). Keeping the bytes
    /// means strings that aren't valid UTF-16 survive a round trip untouched.
    Utf8(Vec<u8>),

    /// Constant object of type `java.lang.invoke.MethodHandle`
    MethodHandle {
        handle_kind: HandleKind,

        /// Depending on the method kind, this points to different things:
        ///
        ///   - `FieldRef` for `GetField`, `GetStatic`, `PutField`, `PutStatic`
        ///   - `MethodRef` for the rest
        member: ConstantIndex,
    },

    /// Method type
    MethodType { descriptor: Utf8ConstantIndex },

    /// Dynamically-computed constant
    Dynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method: u16,
        name_and_type: NameAndTypeConstantIndex,
    },

    /// Dynamically-computed call site
    InvokeDynamic {
        /// Index into the `BootstrapMethods` attribute
        bootstrap_method: u16,
        method_descriptor: NameAndTypeConstantIndex,
    },

    Module(Utf8ConstantIndex),

    Package(Utf8ConstantIndex),
}

impl Constant {
    /// Read one constant, tag included
    fn parse<R: ReadBytesExt>(reader: &mut R, index: ConstantIndex) -> Result<Constant, Error> {
        let constant = match u8::deserialize(reader)? {
            1 => {
                let len = u16::deserialize(reader)?;
                Constant::Utf8(super::read_bytes(reader, len as usize)?)
            }
            3 => Constant::Integer(i32::deserialize(reader)?),
            4 => Constant::Float(f32::deserialize(reader)?),
            5 => Constant::Long(i64::deserialize(reader)?),
            6 => Constant::Double(f64::deserialize(reader)?),
            7 => Constant::Class(Utf8ConstantIndex::deserialize(reader)?),
            8 => Constant::String(Utf8ConstantIndex::deserialize(reader)?),
            9 => Constant::FieldRef(
                ClassConstantIndex::deserialize(reader)?,
                NameAndTypeConstantIndex::deserialize(reader)?,
            ),
            tag @ (10 | 11) => Constant::MethodRef {
                class: ClassConstantIndex::deserialize(reader)?,
                name_and_type: NameAndTypeConstantIndex::deserialize(reader)?,
                is_interface: tag == 11,
            },
            12 => Constant::NameAndType {
                name: Utf8ConstantIndex::deserialize(reader)?,
                descriptor: Utf8ConstantIndex::deserialize(reader)?,
            },
            15 => Constant::MethodHandle {
                handle_kind: HandleKind::from_u8(u8::deserialize(reader)?)?,
                member: ConstantIndex::deserialize(reader)?,
            },
            16 => Constant::MethodType {
                descriptor: Utf8ConstantIndex::deserialize(reader)?,
            },
            17 => Constant::Dynamic {
                bootstrap_method: u16::deserialize(reader)?,
                name_and_type: NameAndTypeConstantIndex::deserialize(reader)?,
            },
            18 => Constant::InvokeDynamic {
                bootstrap_method: u16::deserialize(reader)?,
                method_descriptor: NameAndTypeConstantIndex::deserialize(reader)?,
            },
            19 => Constant::Module(Utf8ConstantIndex::deserialize(reader)?),
            20 => Constant::Package(Utf8ConstantIndex::deserialize(reader)?),
            tag => return Err(Error::BadConstantTag { tag, index }),
        };
        Ok(constant)
    }
}

impl Serialize for Constant {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        match self {
            Constant::Utf8(bytes) => {
                1u8.serialize(writer)?;
                (bytes.len() as u16).serialize(writer)?;
                writer.write_all(bytes)?;
            }
            Constant::Integer(integer) => {
                3u8.serialize(writer)?;
                integer.serialize(writer)?;
            }
            Constant::Float(float) => {
                4u8.serialize(writer)?;
                float.serialize(writer)?;
            }
            Constant::Long(long) => {
                5u8.serialize(writer)?;
                long.serialize(writer)?;
            }
            Constant::Double(double) => {
                6u8.serialize(writer)?;
                double.serialize(writer)?;
            }
            Constant::Class(name) => {
                7u8.serialize(writer)?;
                name.serialize(writer)?;
            }
            Constant::String(bytes) => {
                8u8.serialize(writer)?;
                bytes.serialize(writer)?;
            }
            Constant::FieldRef(class, name_and_type) => {
                9u8.serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::MethodRef {
                class,
                name_and_type,
                is_interface,
            } => {
                (if !is_interface { 10u8 } else { 11u8 }).serialize(writer)?;
                class.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::NameAndType { name, descriptor } => {
                12u8.serialize(writer)?;
                name.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
            Constant::MethodHandle {
                handle_kind,
                member,
            } => {
                15u8.serialize(writer)?;
                handle_kind.serialize(writer)?;
                member.serialize(writer)?;
            }
            Constant::MethodType { descriptor } => {
                16u8.serialize(writer)?;
                descriptor.serialize(writer)?;
            }
            Constant::Dynamic {
                bootstrap_method,
                name_and_type,
            } => {
                17u8.serialize(writer)?;
                bootstrap_method.serialize(writer)?;
                name_and_type.serialize(writer)?;
            }
            Constant::InvokeDynamic {
                bootstrap_method,
                method_descriptor,
            } => {
                18u8.serialize(writer)?;
                bootstrap_method.serialize(writer)?;
                method_descriptor.serialize(writer)?;
            }
            Constant::Module(name) => {
                19u8.serialize(writer)?;
                name.serialize(writer)?;
            }
            Constant::Package(name) => {
                20u8.serialize(writer)?;
                name.serialize(writer)?;
            }
        };
        Ok(())
    }
}

/// Almost all constants have width 1, except for `Constant::Long` and `Constant::Double`. Quoting
/// the JVM specification:
///
/// > All 8-byte constants take up two entries in the constant_pool table of the class file. If a
/// > CONSTANT_Long_info or CONSTANT_Double_info structure is the item in the constant_pool table
/// > at index n, then the next usable item in the pool is located at index n+2. The constant_pool
/// > index n+1 must be valid but is considered unusable.
impl Width for Constant {
    fn width(&self) -> usize {
        match self {
            Constant::Long(_) | Constant::Double(_) => 2,
            _ => 1,
        }
    }
}

/// Encode a string the way class files store `Utf8` constants
///
/// Strings are encoded one UTF-16 code unit at a time: supplementary characters become a pair of
/// 3-byte surrogates and `\u{0000}` takes two bytes so that no encoded byte is ever zero.
pub fn encode_modified_utf8(string: &str) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(string.len());
    for unit in string.encode_utf16() {
        match unit {
            0x0001..=0x007F => buffer.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                buffer.push((unit >> 6 & 0x1F) as u8 | 0b1100_0000);
                buffer.push((unit & 0x3F) as u8 | 0b1000_0000);
            }
            _ => {
                buffer.push((unit >> 12 & 0x0F) as u8 | 0b1110_0000);
                buffer.push((unit >> 6 & 0x3F) as u8 | 0b1000_0000);
                buffer.push((unit & 0x3F) as u8 | 0b1000_0000);
            }
        }
    }
    buffer
}

/// Decode a `Utf8` constant, if it denotes a valid string
pub fn decode_modified_utf8(bytes: &[u8]) -> Option<String> {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut bytes = bytes.iter().copied();
    let continuation = |byte: Option<u8>| match byte {
        Some(b) if b & 0b1100_0000 == 0b1000_0000 => Some((b & 0x3F) as u16),
        _ => None,
    };
    while let Some(lead) = bytes.next() {
        let unit = match lead {
            0x01..=0x7F => lead as u16,
            0xC0..=0xDF => ((lead & 0x1F) as u16) << 6 | continuation(bytes.next())?,
            0xE0..=0xEF => {
                let high = continuation(bytes.next())?;
                let low = continuation(bytes.next())?;
                ((lead & 0x0F) as u16) << 12 | high << 6 | low
            }
            _ => return None,
        };
        units.push(unit);
    }
    String::from_utf16(&units).ok()
}

#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Debug)]
pub struct ConstantIndex(pub u16);

impl Serialize for ConstantIndex {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.0.serialize(writer)
    }
}

impl Deserialize for ConstantIndex {
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
        u16::deserialize(reader).map(ConstantIndex)
    }
}

// Typed indices only record what the referencing structure expects; whether the entry really
// has that kind is checked when it gets looked up.
macro_rules! typed_constant_index {
    ($($name:ident),* $(,)?) => {
        $(
            #[derive(Copy, Clone, Hash, Eq, PartialEq, Debug)]
            pub struct $name(ConstantIndex);

            impl From<$name> for ConstantIndex {
                fn from(index: $name) -> ConstantIndex {
                    index.0
                }
            }

            impl Serialize for $name {
                fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
                    self.0.serialize(writer)
                }
            }

            impl Deserialize for $name {
                fn deserialize<R: ReadBytesExt>(reader: &mut R) -> std::io::Result<Self> {
                    ConstantIndex::deserialize(reader).map($name)
                }
            }
        )*
    };
}

typed_constant_index!(
    Utf8ConstantIndex,
    NameAndTypeConstantIndex,
    ClassConstantIndex,
    MethodRefConstantIndex,
);

/// Type of method handle
///
/// [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-5.html#jvms-5.4.3.5-220
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq)]
pub enum HandleKind {
    GetField,
    GetStatic,
    PutField,
    PutStatic,
    InvokeVirtual,
    InvokeStatic,
    InvokeSpecial,
    NewInvokeSpecial,
    InvokeInterface,
}

impl HandleKind {
    pub fn from_u8(byte: u8) -> Result<HandleKind, Error> {
        Ok(match byte {
            1 => HandleKind::GetField,
            2 => HandleKind::GetStatic,
            3 => HandleKind::PutField,
            4 => HandleKind::PutStatic,
            5 => HandleKind::InvokeVirtual,
            6 => HandleKind::InvokeStatic,
            7 => HandleKind::InvokeSpecial,
            8 => HandleKind::NewInvokeSpecial,
            9 => HandleKind::InvokeInterface,
            other => return Err(Error::BadHandleKind(other)),
        })
    }

    pub fn as_u8(self) -> u8 {
        match self {
            HandleKind::GetField => 1,
            HandleKind::GetStatic => 2,
            HandleKind::PutField => 3,
            HandleKind::PutStatic => 4,
            HandleKind::InvokeVirtual => 5,
            HandleKind::InvokeStatic => 6,
            HandleKind::InvokeSpecial => 7,
            HandleKind::NewInvokeSpecial => 8,
            HandleKind::InvokeInterface => 9,
        }
    }

    /// Does the handle refer to a method (as opposed to a field)?
    pub fn is_method(self) -> bool {
        !matches!(
            self,
            HandleKind::GetField
                | HandleKind::GetStatic
                | HandleKind::PutField
                | HandleKind::PutStatic
        )
    }
}

impl Serialize for HandleKind {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> std::io::Result<()> {
        self.as_u8().serialize(writer)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn modified_utf8_encoding() {
        assert_eq!(encode_modified_utf8("exit"), b"exit".to_vec());
        assert_eq!(encode_modified_utf8("a\u{0000}b"), vec![b'a', 0xC0, 0x80, b'b']);
        assert_eq!(encode_modified_utf8("\u{00e9}"), vec![0xC3, 0xA9]);
        assert_eq!(
            encode_modified_utf8("\u{1F600}"),
            vec![0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80]
        );

        let mixed = "Lookup$\u{0000}\u{00e9}\u{20AC}\u{1F600}";
        assert_eq!(
            decode_modified_utf8(&encode_modified_utf8(mixed)).as_deref(),
            Some(mixed)
        );
    }

    #[test]
    fn unrepresentable_utf8_constants_do_not_decode() {
        // Lone high surrogate
        assert_eq!(decode_modified_utf8(&[0xED, 0xA0, 0xBD]), None);
        // Raw zero byte
        assert_eq!(decode_modified_utf8(&[b'a', 0x00]), None);
        // Truncated two byte sequence
        assert_eq!(decode_modified_utf8(&[0xC3]), None);
    }

    #[test]
    fn parsed_pool_reuses_existing_entries() {
        let mut bytes = vec![0, 5];
        bytes.extend_from_slice(&[1, 0, 4]);
        bytes.extend_from_slice(b"exit");
        bytes.extend_from_slice(&[5, 0, 0, 0, 0, 0, 0, 0, 42]);
        bytes.extend_from_slice(&[1, 0, 3]);
        bytes.extend_from_slice(b"(I)V");
        let mut pool = ConstantsPool::parse(&mut Cursor::new(&bytes)).unwrap();

        // Trailing slot of the long is unusable
        assert!(matches!(pool.get(ConstantIndex(3)), Err(Error::BadConstantIndex(_))));
        assert_eq!(pool.count(), 5);

        assert_eq!(pool.get_utf8("exit").unwrap(), Utf8ConstantIndex(ConstantIndex(1)));
        assert_eq!(pool.count(), 5);
        assert_eq!(pool.get_utf8("halt").unwrap(), Utf8ConstantIndex(ConstantIndex(5)));
        assert_eq!(pool.count(), 6);

        let mut written = vec![];
        pool.serialize(&mut written).unwrap();
        assert_eq!(written[..bytes.len()][2..], bytes[2..]);
        assert_eq!(&written[..2], &[0, 6]);
    }

    #[test]
    fn wide_constant_overhanging_the_pool_is_rejected() {
        let bytes = [0, 2, 6, 0, 0, 0, 0, 0, 0, 0, 0];
        assert!(matches!(
            ConstantsPool::parse(&mut Cursor::new(&bytes[..])),
            Err(Error::BadConstantIndex(ConstantIndex(2)))
        ));
    }

    #[test]
    fn handles_are_replaced_in_place() {
        let mut pool = ConstantsPool::new();
        let owner = pool.get_utf8("java/lang/System").unwrap();
        let owner = pool.get_class(owner).unwrap();
        let name = pool.get_utf8("exit").unwrap();
        let desc = pool.get_utf8("(I)V").unwrap();
        let nat = pool.get_name_and_type(name, desc).unwrap();
        let method = pool.get_method_ref(owner, nat, false).unwrap();
        assert_eq!(pool.get_method_ref(owner, nat, false).unwrap(), method);

        let handle = Constant::MethodHandle {
            handle_kind: HandleKind::InvokeStatic,
            member: method.into(),
        };
        let handle_idx = pool.push(handle.clone()).unwrap();
        let other = pool.get_method_ref(owner, nat, true).unwrap();

        let previous = pool
            .replace_method_handle(handle_idx, HandleKind::InvokeStatic, other)
            .unwrap();
        assert_eq!(previous, handle);
        assert_eq!(
            pool.get(handle_idx).unwrap(),
            &Constant::MethodHandle {
                handle_kind: HandleKind::InvokeStatic,
                member: other.into(),
            }
        );
        assert!(pool
            .replace_method_handle(owner.into(), HandleKind::InvokeStatic, other)
            .is_err());
    }
}
