//! Field and method descriptors
//!
//! [0]: https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.3

use super::{BinaryName, Name};
use std::io::{Error, ErrorKind, Result};

/// Types that can be written out as (part of) a descriptor
pub trait RenderDescriptor {
    fn render(&self) -> String {
        let mut rendered = String::new();
        self.render_to(&mut rendered);
        rendered
    }

    fn render_to(&self, out: &mut String);
}

/// Types that can be read back from a descriptor
pub trait ParseDescriptor: Sized {
    /// Parse a complete descriptor (leftover input is an error)
    fn parse(source: &str) -> Result<Self> {
        let mut reader = DescriptorReader { rest: source };
        let parsed = Self::read(&mut reader)?;
        if !reader.rest.is_empty() {
            let msg = format!("Trailing '{}' after descriptor '{}'", reader.rest, source);
            return Err(Error::new(ErrorKind::InvalidInput, msg));
        }
        Ok(parsed)
    }

    fn read(reader: &mut DescriptorReader) -> Result<Self>;
}

/// Unparsed remainder of a descriptor
pub struct DescriptorReader<'a> {
    rest: &'a str,
}

impl<'a> DescriptorReader<'a> {
    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn next(&mut self) -> Result<char> {
        let mut chars = self.rest.chars();
        let c = chars
            .next()
            .ok_or_else(|| Error::new(ErrorKind::UnexpectedEof, "Descriptor ended early"))?;
        self.rest = chars.as_str();
        Ok(c)
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.next()? {
            c if c == expected => Ok(()),
            c => Err(unexpected(c, &format!("'{}'", expected))),
        }
    }

    /// Everything up to (but excluding) the next `terminator`, which gets skipped
    fn take_until(&mut self, terminator: char) -> Result<&'a str> {
        let rest: &'a str = self.rest;
        match rest.find(terminator) {
            Some(end) => {
                self.rest = &rest[end + terminator.len_utf8()..];
                Ok(&rest[..end])
            }
            None => {
                let msg = format!("Missing '{}' in '{}'", terminator, rest);
                Err(Error::new(ErrorKind::UnexpectedEof, msg))
            }
        }
    }
}

fn unexpected(found: char, expected: &str) -> Error {
    let msg = format!("Found '{}' where {} was expected", found, expected);
    Error::new(ErrorKind::InvalidInput, msg)
}

/// Primitive value types
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BaseType {
    Byte,
    Char,
    Double,
    Float,
    Int,
    Long,
    Short,
    Boolean,
}

impl BaseType {
    const ALL: [(BaseType, char); 8] = [
        (BaseType::Byte, 'B'),
        (BaseType::Char, 'C'),
        (BaseType::Double, 'D'),
        (BaseType::Float, 'F'),
        (BaseType::Int, 'I'),
        (BaseType::Long, 'J'),
        (BaseType::Short, 'S'),
        (BaseType::Boolean, 'Z'),
    ];

    pub fn from_char(c: char) -> Option<BaseType> {
        BaseType::ALL
            .iter()
            .find(|(_, descriptor)| *descriptor == c)
            .map(|(base_type, _)| *base_type)
    }

    pub fn as_char(self) -> char {
        BaseType::ALL[self as usize].1
    }
}

impl RenderDescriptor for BaseType {
    fn render_to(&self, out: &mut String) {
        out.push(self.as_char());
    }
}

impl ParseDescriptor for BaseType {
    fn read(reader: &mut DescriptorReader) -> Result<Self> {
        let c = reader.next()?;
        BaseType::from_char(c).ok_or_else(|| unexpected(c, "a primitive type"))
    }
}

/// `L<binary name>;`
impl RenderDescriptor for BinaryName {
    fn render_to(&self, out: &mut String) {
        out.push('L');
        out.push_str(self.as_str());
        out.push(';');
    }
}

impl ParseDescriptor for BinaryName {
    fn read(reader: &mut DescriptorReader) -> Result<Self> {
        reader.expect('L')?;
        let name = reader.take_until(';')?;
        BinaryName::from_string(name.to_owned())
            .map_err(|msg| Error::new(ErrorKind::InvalidInput, msg))
    }
}

/// Array type, by element type and number of dimensions
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ArrayType<T> {
    /// Dimensions after the first one (`int[][]` has 1)
    pub additional_dimensions: usize,
    pub element_type: T,
}

impl<T: RenderDescriptor> RenderDescriptor for ArrayType<T> {
    fn render_to(&self, out: &mut String) {
        out.extend(std::iter::repeat('[').take(self.additional_dimensions + 1));
        self.element_type.render_to(out);
    }
}

/// Object or array type
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum RefType {
    Object(BinaryName),
    ObjectArray(ArrayType<BinaryName>),
    PrimitiveArray(ArrayType<BaseType>),
}

impl RenderDescriptor for RefType {
    fn render_to(&self, out: &mut String) {
        match self {
            RefType::Object(class_name) => class_name.render_to(out),
            RefType::ObjectArray(array) => array.render_to(out),
            RefType::PrimitiveArray(array) => array.render_to(out),
        }
    }
}

impl ParseDescriptor for RefType {
    fn read(reader: &mut DescriptorReader) -> Result<Self> {
        if reader.peek() != Some('[') {
            return BinaryName::read(reader).map(RefType::Object);
        }

        let mut dimensions = 0;
        while reader.peek() == Some('[') {
            reader.expect('[')?;
            dimensions += 1;
        }
        let additional_dimensions = dimensions - 1;
        if reader.peek() == Some('L') {
            let element_type = BinaryName::read(reader)?;
            Ok(RefType::ObjectArray(ArrayType {
                additional_dimensions,
                element_type,
            }))
        } else {
            let element_type = BaseType::read(reader)?;
            Ok(RefType::PrimitiveArray(ArrayType {
                additional_dimensions,
                element_type,
            }))
        }
    }
}

/// Type of a field, parameter, or return value
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum FieldType {
    Base(BaseType),
    Ref(RefType),
}

impl FieldType {
    pub const fn object(class_name: BinaryName) -> FieldType {
        FieldType::Ref(RefType::Object(class_name))
    }

    /// `C[]` for a class `C`
    pub const fn object_array(class_name: BinaryName) -> FieldType {
        FieldType::Ref(RefType::ObjectArray(ArrayType {
            additional_dimensions: 0,
            element_type: class_name,
        }))
    }

    pub const fn int() -> FieldType {
        FieldType::Base(BaseType::Int)
    }
}

impl RenderDescriptor for FieldType {
    fn render_to(&self, out: &mut String) {
        match self {
            FieldType::Base(base_type) => base_type.render_to(out),
            FieldType::Ref(ref_type) => ref_type.render_to(out),
        }
    }
}

impl ParseDescriptor for FieldType {
    fn read(reader: &mut DescriptorReader) -> Result<Self> {
        match reader.peek() {
            Some('L' | '[') => RefType::read(reader).map(FieldType::Ref),
            _ => BaseType::read(reader).map(FieldType::Base),
        }
    }
}

/// Parameter and return types of a method
#[derive(PartialEq, Eq, Hash, Debug, Clone)]
pub struct MethodDescriptor {
    pub parameters: Vec<FieldType>,

    /// `None` for `void`
    pub return_type: Option<FieldType>,
}

impl MethodDescriptor {
    /// Same descriptor with one more parameter in front
    pub fn with_leading_parameter(&self, parameter: FieldType) -> MethodDescriptor {
        MethodDescriptor {
            parameters: std::iter::once(parameter)
                .chain(self.parameters.iter().cloned())
                .collect(),
            return_type: self.return_type.clone(),
        }
    }
}

impl RenderDescriptor for MethodDescriptor {
    fn render_to(&self, out: &mut String) {
        out.push('(');
        self.parameters
            .iter()
            .for_each(|parameter| parameter.render_to(out));
        out.push(')');
        match &self.return_type {
            Some(return_type) => return_type.render_to(out),
            None => out.push('V'),
        }
    }
}

impl ParseDescriptor for MethodDescriptor {
    fn read(reader: &mut DescriptorReader) -> Result<Self> {
        reader.expect('(')?;
        let mut parameters = vec![];
        while reader.peek() != Some(')') {
            parameters.push(FieldType::read(reader)?);
        }
        reader.expect(')')?;

        let return_type = if reader.peek() == Some('V') {
            reader.expect('V')?;
            None
        } else {
            Some(FieldType::read(reader)?)
        };

        Ok(MethodDescriptor {
            parameters,
            return_type,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const INT: FieldType = FieldType::Base(BaseType::Int);
    const STRING: FieldType = FieldType::object(BinaryName::STRING);

    #[test]
    fn reflective_lookup_descriptors() {
        let get_method = MethodDescriptor {
            parameters: vec![STRING, FieldType::object_array(BinaryName::CLASS)],
            return_type: Some(FieldType::object(BinaryName::METHOD)),
        };
        let rendered = "(Ljava/lang/String;[Ljava/lang/Class;)Ljava/lang/reflect/Method;";
        assert_eq!(get_method.render(), rendered);
        assert_eq!(MethodDescriptor::parse(rendered).unwrap(), get_method);

        let get_methods = MethodDescriptor::parse("()[Ljava/lang/reflect/Method;").unwrap();
        assert!(get_methods.parameters.is_empty());
        assert_eq!(
            get_methods.return_type,
            Some(FieldType::object_array(BinaryName::METHOD))
        );
    }

    #[test]
    fn nested_primitive_arrays() {
        let parsed = MethodDescriptor::parse("([[[DJ)Z").unwrap();
        assert_eq!(
            parsed.parameters,
            vec![
                FieldType::Ref(RefType::PrimitiveArray(ArrayType {
                    additional_dimensions: 2,
                    element_type: BaseType::Double,
                })),
                FieldType::Base(BaseType::Long),
            ]
        );
        assert_eq!(parsed.return_type, Some(FieldType::Base(BaseType::Boolean)));
        assert_eq!(parsed.render(), "([[[DJ)Z");
    }

    #[test]
    fn leading_parameter_is_prepended() {
        let exit = MethodDescriptor::parse("(I)V").unwrap();
        let redirected = exit.with_leading_parameter(FieldType::object(BinaryName::RUNTIME));
        assert_eq!(redirected.render(), "(Ljava/lang/Runtime;I)V");
        assert_eq!(exit.parameters, vec![INT]);
    }

    #[test]
    fn malformed_descriptors() {
        for malformed in ["(I", "I)V", "(Ljava/lang/String)V", "(I)VV", "(V)V", "([)V", "()"] {
            assert!(
                MethodDescriptor::parse(malformed).is_err(),
                "accepted {}",
                malformed
            );
        }
        assert!(FieldType::parse("Q").is_err());
        assert!(FieldType::parse("La.b.C;").is_err());
    }
}
