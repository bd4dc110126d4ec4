use std::borrow::Cow;
use std::fmt::{Debug, Display, Error as FmtError, Formatter};

/// Names that have been checked against the JVM's rules
pub trait Name: Sized {
    fn as_str(&self) -> &str;

    /// Check the name and wrap it, or explain what is wrong with it
    fn from_string(name: String) -> Result<Self, String>;
}

macro_rules! checked_name {
    ($(#[$attr:meta])* $name:ident, $validate:path) => {
        $(#[$attr])*
        #[derive(Clone, Hash, Eq, PartialEq)]
        pub struct $name(Cow<'static, str>);

        impl $name {
            const fn known(value: &'static str) -> $name {
                $name(Cow::Borrowed(value))
            }
        }

        impl Name for $name {
            fn as_str(&self) -> &str {
                &self.0
            }

            fn from_string(name: String) -> Result<$name, String> {
                $validate(&name)?;
                Ok($name(Cow::Owned(name)))
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Debug for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
                write!(f, "{:?}", self.0)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), FmtError> {
                f.write_str(&self.0)
            }
        }
    };
}

checked_name!(
    /// Name of a method or field
    ///
    /// See <https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.2.2>
    UnqualifiedName,
    validate_unqualified
);

checked_name!(
    /// Name of a class or interface in internal form (`java/lang/Object`)
    ///
    /// See <https://docs.oracle.com/javase/specs/jvms/se21/html/jvms-4.html#jvms-4.2.1>
    BinaryName,
    validate_binary
);

fn validate_unqualified(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err(String::from("Unqualified name is empty"));
    }
    if let Some(c) = name.chars().find(|c| matches!(c, '.' | ';' | '[' | '/')) {
        return Err(format!("Unqualified name '{}' contains '{}'", name, c));
    }
    let special =
        name == UnqualifiedName::INIT.as_str() || name == UnqualifiedName::CLINIT.as_str();
    if !special && name.contains(&['<', '>'][..]) {
        return Err(format!("Unqualified name '{}' contains angle brackets", name));
    }
    Ok(())
}

fn validate_binary(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err(String::from("Binary name is empty"));
    }
    for segment in name.split('/') {
        validate_unqualified(segment).map_err(|err| format!("In '{}': {}", name, err))?;
    }
    Ok(())
}

impl UnqualifiedName {
    pub const EXIT: Self = Self::known("exit");
    pub const FINDSTATIC: Self = Self::known("findStatic");
    pub const FINDVIRTUAL: Self = Self::known("findVirtual");
    pub const GETDECLAREDMETHOD: Self = Self::known("getDeclaredMethod");
    pub const GETDECLAREDMETHODS: Self = Self::known("getDeclaredMethods");
    pub const GETMETHOD: Self = Self::known("getMethod");
    pub const GETMETHODS: Self = Self::known("getMethods");
    pub const HALT: Self = Self::known("halt");

    // Only these two may contain angle brackets
    pub const INIT: Self = Self::known("<init>");
    pub const CLINIT: Self = Self::known("<clinit>");
}

impl BinaryName {
    pub const CLASS: Self = Self::known("java/lang/Class");
    pub const METHOD: Self = Self::known("java/lang/reflect/Method");
    pub const METHODHANDLE: Self = Self::known("java/lang/invoke/MethodHandle");
    pub const METHODHANDLES_LOOKUP: Self = Self::known("java/lang/invoke/MethodHandles$Lookup");
    pub const METHODTYPE: Self = Self::known("java/lang/invoke/MethodType");
    pub const OBJECT: Self = Self::known("java/lang/Object");
    pub const RUNTIME: Self = Self::known("java/lang/Runtime");
    pub const STRING: Self = Self::known("java/lang/String");
    pub const SYSTEM: Self = Self::known("java/lang/System");

    /// Default home of the interceptor methods
    pub const INTERCEPTORS: Self = Self::known("callguard/Interceptors");
}
