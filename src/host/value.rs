//! Dynamic slot values and the signed property multi-map.

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

use crate::host::channel::Channel;
use crate::host::class::TypeDesc;
use crate::host::image::NameIndex;
use crate::host::object::HostObjectRc;

/// One attested attribute of a player identity, e.g. a skin texture blob.
///
/// The signature, when present, is the attestation produced by the authority
/// that issued the value; this crate never validates it, only carries it.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct SignedProperty {
    /// Property name, e.g. `"textures"`
    pub name: String,
    /// Property value, e.g. a base64 texture blob
    pub value: String,
    /// Attestation over the value, if any
    pub signature: Option<String>,
}

impl SignedProperty {
    /// Creates a signed property
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        signature: Option<&str>,
    ) -> Self {
        SignedProperty {
            name: name.into(),
            value: value.into(),
            signature: signature.map(str::to_string),
        }
    }
}

/// Insertion-ordered multi-map of [`SignedProperty`] entries.
///
/// Keys are not unique; a name may carry several values. Lookup is first-wins,
/// matching how the host itself only honors the first entry of a name.
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct PropertySet {
    entries: Vec<SignedProperty>,
}

impl PropertySet {
    /// Creates an empty property set
    #[must_use]
    pub fn new() -> Self {
        PropertySet::default()
    }

    /// Appends an entry, preserving insertion order
    pub fn insert(&mut self, property: SignedProperty) {
        self.entries.push(property);
    }

    /// First entry with the given name, if any
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&SignedProperty> {
        self.entries.iter().find(|p| p.name == name)
    }

    /// Removes every entry with the given name, returning how many were removed
    pub fn remove_all(&mut self, name: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|p| p.name != name);
        before - self.entries.len()
    }

    /// Iterates entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &SignedProperty> {
        self.entries.iter()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the set holds no entries
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A dynamic value held in a host object slot.
///
/// Cloning is shallow for reference shapes (objects, channels, the name index)
/// and deep for leaf shapes, matching host reference semantics.
#[derive(Clone)]
pub enum Value {
    /// Absent value
    Null,
    /// A unique id
    Uuid(Uuid),
    /// A string cell
    Text(String),
    /// A signed property multi-map
    Properties(PropertySet),
    /// A reference to another host object
    Object(HostObjectRc),
    /// A reference to a connection transport channel
    Channel(Arc<Channel>),
    /// A reference to the shared online-name index
    NameIndex(Arc<NameIndex>),
}

impl Value {
    /// Short name of the value's runtime shape, for diagnostics
    #[must_use]
    pub fn shape(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Uuid(_) => "Uuid",
            Value::Text(_) => "Text",
            Value::Properties(_) => "Properties",
            Value::Object(_) => "Object",
            Value::Channel(_) => "Channel",
            Value::NameIndex(_) => "NameIndex",
        }
    }

    /// `true` if this value can be stored in a slot of the given static shape.
    ///
    /// `Null` fits every shape.
    #[must_use]
    pub fn fits(&self, ty: &TypeDesc) -> bool {
        match (self, ty) {
            (Value::Null, _)
            | (Value::Uuid(_), TypeDesc::Uuid)
            | (Value::Text(_), TypeDesc::Text)
            | (Value::Properties(_), TypeDesc::Properties)
            | (Value::Channel(_), TypeDesc::Channel)
            | (Value::NameIndex(_), TypeDesc::NameIndex) => true,
            (Value::Object(obj), TypeDesc::Class(class)) => {
                class.is_assignable_from(obj.class())
            }
            _ => false,
        }
    }

    /// The contained uuid, if this is a [`Value::Uuid`]
    #[must_use]
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Value::Uuid(id) => Some(*id),
            _ => None,
        }
    }

    /// The contained text, if this is a [`Value::Text`]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The contained property set, if this is a [`Value::Properties`]
    #[must_use]
    pub fn as_properties(&self) -> Option<&PropertySet> {
        match self {
            Value::Properties(p) => Some(p),
            _ => None,
        }
    }

    /// The contained object reference, if this is a [`Value::Object`]
    #[must_use]
    pub fn as_object(&self) -> Option<&HostObjectRc> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The contained channel reference, if this is a [`Value::Channel`]
    #[must_use]
    pub fn as_channel(&self) -> Option<&Arc<Channel>> {
        match self {
            Value::Channel(c) => Some(c),
            _ => None,
        }
    }

    /// The contained name-index reference, if this is a [`Value::NameIndex`]
    #[must_use]
    pub fn as_name_index(&self) -> Option<&Arc<NameIndex>> {
        match self {
            Value::NameIndex(i) => Some(i),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Uuid(id) => write!(f, "Uuid({id})"),
            Value::Text(s) => write!(f, "Text({s:?})"),
            Value::Properties(p) => write!(f, "Properties({} entries)", p.len()),
            Value::Object(o) => write!(f, "Object({})", o.class().name()),
            Value::Channel(_) => write!(f, "Channel"),
            Value::NameIndex(_) => write!(f, "NameIndex"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_set_preserves_insertion_order() {
        let mut props = PropertySet::new();
        props.insert(SignedProperty::new("cape", "CAPE1", None));
        props.insert(SignedProperty::new("textures", "TEX1", Some("SIG1")));
        props.insert(SignedProperty::new("textures", "TEX2", None));

        let names: Vec<&str> = props.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["cape", "textures", "textures"]);
    }

    #[test]
    fn test_property_lookup_is_first_wins() {
        let mut props = PropertySet::new();
        props.insert(SignedProperty::new("textures", "TEX1", Some("SIG1")));
        props.insert(SignedProperty::new("textures", "TEX2", None));

        let first = props.first("textures").unwrap();
        assert_eq!(first.value, "TEX1");
        assert_eq!(first.signature.as_deref(), Some("SIG1"));
        assert!(props.first("cape").is_none());
    }

    #[test]
    fn test_property_remove_all() {
        let mut props = PropertySet::new();
        props.insert(SignedProperty::new("textures", "TEX1", None));
        props.insert(SignedProperty::new("cape", "CAPE1", None));
        props.insert(SignedProperty::new("textures", "TEX2", None));

        assert_eq!(props.remove_all("textures"), 2);
        assert_eq!(props.len(), 1);
        assert_eq!(props.first("cape").unwrap().value, "CAPE1");
        assert_eq!(props.remove_all("textures"), 0);
    }

    #[test]
    fn test_value_fits_primitives() {
        use crate::host::class::TypeDesc;

        assert!(Value::Text("x".into()).fits(&TypeDesc::Text));
        assert!(Value::Null.fits(&TypeDesc::Uuid));
        assert!(!Value::Text("x".into()).fits(&TypeDesc::Uuid));
        assert!(Value::Properties(PropertySet::new()).fits(&TypeDesc::Properties));
    }
}
