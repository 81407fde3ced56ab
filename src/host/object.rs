//! Host object instances: tokenized field slots behind a lock.
//!
//! Objects are the adapter's view of live host state. Plain instances accept
//! slot writes; instances of value-record classes are frozen at construction
//! and reject every write, which is what forces the reconstruct-and-replace
//! path in the identity adapter.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::host::class::{FieldDef, HostClassRc};
use crate::host::token::Token;
use crate::host::value::Value;
use crate::{Error, Result};

/// Reference-counted handle to a host object
pub type HostObjectRc = Arc<HostObject>;

/// One live instance of a registered host class.
pub struct HostObject {
    class: HostClassRc,
    frozen: bool,
    slots: RwLock<HashMap<Token, Value>>,
}

impl HostObject {
    /// Creates an instance with all fields (including inherited ones) set to
    /// [`Value::Null`].
    ///
    /// Instances of value-record classes come out frozen; populate those through
    /// [`HostObject::instantiate`] instead.
    #[must_use]
    pub fn new(class: HostClassRc) -> HostObjectRc {
        let mut slots = HashMap::new();
        let mut current = Some(&class);
        while let Some(c) = current {
            for field in c.fields() {
                slots.insert(field.token(), Value::Null);
            }
            current = c.superclass();
        }
        let frozen = class.is_value_record();
        Arc::new(HostObject {
            class,
            frozen,
            slots: RwLock::new(slots),
        })
    }

    /// Constructs an instance through the class's canonical constructor path.
    ///
    /// Arguments map positionally onto the class's declared fields. This is the
    /// only way to obtain a populated value-record instance.
    ///
    /// # Errors
    /// Returns [`Error::Construction`] on arity mismatch and
    /// [`Error::TypeMismatch`] when an argument does not fit the declared field
    /// type.
    pub fn instantiate(class: &HostClassRc, args: Vec<Value>) -> Result<HostObjectRc> {
        let fields = class.fields();
        if args.len() != fields.len() {
            return Err(Error::Construction(format!(
                "{} takes {} arguments, got {}",
                class.name(),
                fields.len(),
                args.len()
            )));
        }

        let mut slots = HashMap::new();
        for (field, value) in fields.iter().zip(args) {
            if !value.fits(field.ty()) {
                return Err(Error::TypeMismatch {
                    expected: field.ty().to_string(),
                    found: value.shape().to_string(),
                });
            }
            slots.insert(field.token(), value);
        }

        let frozen = class.is_value_record();
        Ok(Arc::new(HostObject {
            class: Arc::clone(class),
            frozen,
            slots: RwLock::new(slots),
        }))
    }

    /// Class this object was created from
    #[must_use]
    pub fn class(&self) -> &HostClassRc {
        &self.class
    }

    /// `true` if slot writes are rejected on this instance
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub(crate) fn read_slot(&self, token: Token) -> Option<Value> {
        read_lock!(self.slots).get(&token).cloned()
    }

    pub(crate) fn write_slot(&self, field: &FieldDef, value: Value) -> Result<()> {
        if self.frozen {
            return Err(Error::ReflectionDenied {
                member: field.token(),
                holder: self.class.name().to_string(),
                reason: "instance is a frozen value record",
            });
        }
        write_lock!(self.slots).insert(field.token(), value);
        Ok(())
    }

    /// Reads a field by name, walking the superclass chain.
    ///
    /// This is the object's own best-effort accessor; adapters fall back to it
    /// when optional resolved shortcuts are missing.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<Value> {
        let field = self.class.field_named(name)?;
        self.read_slot(field.token())
    }

    /// Writes a field by name, walking the superclass chain.
    ///
    /// This is the host's own write path used by embeddings to populate state;
    /// it honors the frozen flag but not member flags.
    ///
    /// # Errors
    /// Returns [`Error::LayoutNotFound`] when no such field exists,
    /// [`Error::TypeMismatch`] when the value does not fit, and
    /// [`Error::ReflectionDenied`] on frozen instances.
    pub fn set_by_name(&self, name: &str, value: Value) -> Result<()> {
        let field = self
            .class
            .field_named(name)
            .ok_or_else(|| Error::LayoutNotFound {
                container: self.class.name().to_string(),
                expected: format!("field named {name:?}"),
            })?
            .clone();
        if !value.fits(field.ty()) {
            return Err(Error::TypeMismatch {
                expected: field.ty().to_string(),
                found: value.shape().to_string(),
            });
        }
        self.write_slot(&field, value)
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostObject")
            .field("class", &self.class.name())
            .field("frozen", &self.frozen)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use crate::host::class::{ClassSpec, TypeDesc};
    use crate::host::image::HostImage;
    use crate::host::value::PropertySet;
    use crate::host::version::{HostBuild, HostVersion, Mappings};

    use super::*;

    fn image() -> Arc<HostImage> {
        HostImage::new(HostBuild::new(
            HostVersion::new(21, 0, 0),
            Mappings::Readable,
        ))
    }

    fn record_class(image: &HostImage) -> HostClassRc {
        image
            .define_class(
                ClassSpec::new("PlayerProfile")
                    .value_record()
                    .field("id", TypeDesc::Uuid)
                    .field("name", TypeDesc::Text)
                    .field("properties", TypeDesc::Properties)
                    .constructor(3),
            )
            .unwrap()
    }

    #[test]
    fn test_instantiate_record_is_frozen() {
        let image = image();
        let class = record_class(&image);
        let id = Uuid::new_v4();

        let record = HostObject::instantiate(
            &class,
            vec![
                Value::Uuid(id),
                Value::Text("Alice".into()),
                Value::Properties(PropertySet::new()),
            ],
        )
        .unwrap();

        assert!(record.is_frozen());
        assert_eq!(record.get_by_name("id").unwrap().as_uuid(), Some(id));
        assert_eq!(
            record.get_by_name("name").unwrap().as_text(),
            Some("Alice")
        );
    }

    #[test]
    fn test_instantiate_checks_arity_and_types() {
        let image = image();
        let class = record_class(&image);

        let err = HostObject::instantiate(&class, vec![Value::Text("Alice".into())]).unwrap_err();
        assert!(matches!(err, Error::Construction(_)));

        let err = HostObject::instantiate(
            &class,
            vec![
                Value::Text("not-a-uuid".into()),
                Value::Text("Alice".into()),
                Value::Properties(PropertySet::new()),
            ],
        )
        .unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
    }

    #[test]
    fn test_frozen_instance_rejects_writes() {
        let image = image();
        let class = record_class(&image);
        let record = HostObject::instantiate(
            &class,
            vec![
                Value::Uuid(Uuid::new_v4()),
                Value::Text("Alice".into()),
                Value::Properties(PropertySet::new()),
            ],
        )
        .unwrap();

        let err = record
            .set_by_name("name", Value::Text("Mallory".into()))
            .unwrap_err();
        assert!(matches!(err, Error::ReflectionDenied { .. }));
        assert_eq!(record.get_by_name("name").unwrap().as_text(), Some("Alice"));
    }

    #[test]
    fn test_plain_instance_accepts_named_writes_through_hierarchy() {
        let image = image();
        let base = image
            .define_class(ClassSpec::new("Player").field("name", TypeDesc::Text))
            .unwrap();
        let leaf = image
            .define_class(ClassSpec::new("ServerPlayer").extends(&base))
            .unwrap();

        let obj = HostObject::new(leaf);
        obj.set_by_name("name", Value::Text("Alice".into())).unwrap();
        assert_eq!(obj.get_by_name("name").unwrap().as_text(), Some("Alice"));

        let err = obj.set_by_name("name", Value::Uuid(Uuid::new_v4())).unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { .. }));
        let err = obj.set_by_name("ghost", Value::Null).unwrap_err();
        assert!(matches!(err, Error::LayoutNotFound { .. }));
    }
}
