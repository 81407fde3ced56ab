//! Host class model: declared members, inheritance, and static type shapes.
//!
//! Classes are the adapter's picture of the host's internal types. They carry
//! only what layout discovery needs: declared field and method lists in
//! declaration order, a supertype link, and the value-record flag that decides
//! whether instances can be mutated in place or must be reconstructed.
//!
//! # Key Components
//!
//! - [`HostClass`] - One registered internal type of the host
//! - [`FieldDef`] / [`MethodDef`] - Declared members with assigned [`Token`]s
//! - [`TypeDesc`] - Static type shape of a member, with assignability
//! - [`MemberFlags`] - Access-control attributes honored by resolved handles
//! - [`ClassSpec`] - Builder used by embeddings and tests to describe a class
//!   before registration assigns its tokens

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::host::token::Token;

/// Reference-counted handle to a registered host class
pub type HostClassRc = Arc<HostClass>;

bitflags! {
    /// Access-control attributes of a declared member.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct MemberFlags: u8 {
        /// Member is accessible without opening access
        const PUBLIC = 0b0000_0001;
        /// Member cannot be written even through an opened handle
        const FINAL = 0b0000_0010;
        /// Member was generated by the host's tooling rather than declared in source
        const SYNTHETIC = 0b0000_0100;
    }
}

/// Static type shape of a declared member.
///
/// Primitive shapes cover the handful of leaf types the adapter ever touches;
/// everything else is a reference to another registered class. Assignability
/// follows the superclass chain for class shapes and identity for primitives.
#[derive(Clone)]
pub enum TypeDesc {
    /// A 128-bit unique id
    Uuid,
    /// A string cell
    Text,
    /// An insertion-ordered signed property multi-map
    Properties,
    /// A connection transport channel
    Channel,
    /// The host's shared online-name index
    NameIndex,
    /// An instance of the given registered class
    Class(HostClassRc),
}

/// Hashable identity of a [`TypeDesc`], used as a resolver cache key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum TypeKey {
    /// Key for [`TypeDesc::Uuid`]
    Uuid,
    /// Key for [`TypeDesc::Text`]
    Text,
    /// Key for [`TypeDesc::Properties`]
    Properties,
    /// Key for [`TypeDesc::Channel`]
    Channel,
    /// Key for [`TypeDesc::NameIndex`]
    NameIndex,
    /// Key for [`TypeDesc::Class`], by class token
    Class(Token),
}

impl TypeDesc {
    /// Returns the hashable cache key for this shape
    #[must_use]
    pub fn key(&self) -> TypeKey {
        match self {
            TypeDesc::Uuid => TypeKey::Uuid,
            TypeDesc::Text => TypeKey::Text,
            TypeDesc::Properties => TypeKey::Properties,
            TypeDesc::Channel => TypeKey::Channel,
            TypeDesc::NameIndex => TypeKey::NameIndex,
            TypeDesc::Class(class) => TypeKey::Class(class.token()),
        }
    }

    /// `true` if a member of shape `other` can stand in for this shape.
    ///
    /// Primitives are assignable only from themselves; a class shape is
    /// assignable from any class that reaches it on the superclass chain.
    #[must_use]
    pub fn is_assignable_from(&self, other: &TypeDesc) -> bool {
        match (self, other) {
            (TypeDesc::Uuid, TypeDesc::Uuid)
            | (TypeDesc::Text, TypeDesc::Text)
            | (TypeDesc::Properties, TypeDesc::Properties)
            | (TypeDesc::Channel, TypeDesc::Channel)
            | (TypeDesc::NameIndex, TypeDesc::NameIndex) => true,
            (TypeDesc::Class(target), TypeDesc::Class(source)) => {
                target.is_assignable_from(source)
            }
            _ => false,
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Uuid => write!(f, "Uuid"),
            TypeDesc::Text => write!(f, "Text"),
            TypeDesc::Properties => write!(f, "Properties"),
            TypeDesc::Channel => write!(f, "Channel"),
            TypeDesc::NameIndex => write!(f, "NameIndex"),
            TypeDesc::Class(class) => write!(f, "Class({})", class.name()),
        }
    }
}

impl fmt::Debug for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A declared field of a host class.
#[derive(Clone, Debug)]
pub struct FieldDef {
    token: Token,
    name: String,
    ty: TypeDesc,
    flags: MemberFlags,
}

impl FieldDef {
    pub(crate) fn new(token: Token, name: String, ty: TypeDesc, flags: MemberFlags) -> Self {
        FieldDef {
            token,
            name,
            ty,
            flags,
        }
    }

    /// Token assigned at registration
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// Declared name, possibly obfuscated
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Static type shape of the field
    #[must_use]
    pub fn ty(&self) -> &TypeDesc {
        &self.ty
    }

    /// Access-control attributes
    #[must_use]
    pub fn flags(&self) -> MemberFlags {
        self.flags
    }
}

/// A declared method or constructor of a host class.
#[derive(Clone, Debug)]
pub struct MethodDef {
    token: Token,
    name: String,
    arity: usize,
    constructor: bool,
}

impl MethodDef {
    pub(crate) fn new(token: Token, name: String, arity: usize, constructor: bool) -> Self {
        MethodDef {
            token,
            name,
            arity,
            constructor,
        }
    }

    /// Token assigned at registration
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// Declared name, possibly obfuscated
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of parameters
    #[must_use]
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// `true` if this method is a constructor
    #[must_use]
    pub fn is_constructor(&self) -> bool {
        self.constructor
    }
}

/// One registered internal type of the host.
///
/// Immutable after registration; all member tokens are assigned by the image's
/// registry and stay valid for the process lifetime.
pub struct HostClass {
    token: Token,
    name: String,
    superclass: Option<HostClassRc>,
    value_record: bool,
    fields: Vec<FieldDef>,
    methods: Vec<MethodDef>,
}

impl HostClass {
    pub(crate) fn from_parts(
        token: Token,
        name: String,
        superclass: Option<HostClassRc>,
        value_record: bool,
        fields: Vec<FieldDef>,
        methods: Vec<MethodDef>,
    ) -> Self {
        HostClass {
            token,
            name,
            superclass,
            value_record,
            fields,
            methods,
        }
    }

    /// Token assigned at registration
    #[must_use]
    pub fn token(&self) -> Token {
        self.token
    }

    /// Registered class name, possibly obfuscated
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared supertype, if any
    #[must_use]
    pub fn superclass(&self) -> Option<&HostClassRc> {
        self.superclass.as_ref()
    }

    /// `true` if instances of this class are immutable value records.
    ///
    /// Value-record instances reject in-place field writes; changing one means
    /// constructing a replacement through the canonical constructor.
    #[must_use]
    pub fn is_value_record(&self) -> bool {
        self.value_record
    }

    /// Declared fields in declaration order, excluding inherited ones
    #[must_use]
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Declared methods in declaration order, excluding inherited ones
    #[must_use]
    pub fn methods(&self) -> &[MethodDef] {
        &self.methods
    }

    /// Looks up a declared field by exact name, excluding inherited ones
    #[must_use]
    pub fn declared_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name() == name)
    }

    /// Looks up a field by exact name, walking the superclass chain
    #[must_use]
    pub fn field_named(&self, name: &str) -> Option<&FieldDef> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(field) = class.declared_field(name) {
                return Some(field);
            }
            current = class.superclass.as_deref();
        }
        None
    }

    /// `true` if `other` is this class or derives from it
    #[must_use]
    pub fn is_assignable_from(&self, other: &HostClass) -> bool {
        let mut current = Some(other);
        while let Some(class) = current {
            if class.token == self.token {
                return true;
            }
            current = class.superclass.as_deref();
        }
        false
    }
}

impl fmt::Debug for HostClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostClass")
            .field("token", &self.token)
            .field("name", &self.name)
            .field("value_record", &self.value_record)
            .field("fields", &self.fields.len())
            .finish()
    }
}

/// Description of a class before registration assigns its tokens.
///
/// Used by embeddings to mirror the live host's layout and by tests to build
/// synthetic hierarchies.
pub struct ClassSpec {
    pub(crate) name: String,
    pub(crate) superclass: Option<HostClassRc>,
    pub(crate) value_record: bool,
    pub(crate) fields: Vec<(String, TypeDesc, MemberFlags)>,
    pub(crate) methods: Vec<(String, usize, bool)>,
}

impl ClassSpec {
    /// Starts a spec for a class with the given name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        ClassSpec {
            name: name.into(),
            superclass: None,
            value_record: false,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Declares the supertype
    #[must_use]
    pub fn extends(mut self, superclass: &HostClassRc) -> Self {
        self.superclass = Some(Arc::clone(superclass));
        self
    }

    /// Marks the class as an immutable value record.
    ///
    /// Registration forces [`MemberFlags::FINAL`] onto every declared field of
    /// a value record.
    #[must_use]
    pub fn value_record(mut self) -> Self {
        self.value_record = true;
        self
    }

    /// Declares a field with default flags
    #[must_use]
    pub fn field(self, name: impl Into<String>, ty: TypeDesc) -> Self {
        self.field_with_flags(name, ty, MemberFlags::empty())
    }

    /// Declares a field with explicit flags
    #[must_use]
    pub fn field_with_flags(
        mut self,
        name: impl Into<String>,
        ty: TypeDesc,
        flags: MemberFlags,
    ) -> Self {
        self.fields.push((name.into(), ty, flags));
        self
    }

    /// Declares a constructor with the given arity
    #[must_use]
    pub fn constructor(mut self, arity: usize) -> Self {
        self.methods.push(("<init>".to_string(), arity, true));
        self
    }

    /// Declares a plain method
    #[must_use]
    pub fn method(mut self, name: impl Into<String>, arity: usize) -> Self {
        self.methods.push((name.into(), arity, false));
        self
    }
}
