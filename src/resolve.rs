//! Internal layout resolver: fallback member search and resolved handles.
//!
//! Internal member names vary by host build and by whether a distribution
//! re-maps obfuscated names to readable ones, so nothing here trusts a single
//! name. Resolution runs a deterministic three-tier fallback, first match wins:
//!
//! 1. Candidate names in the caller-supplied priority order (covers readable
//!    and known obfuscated spellings).
//! 2. A scan of the declared members for the first one whose static type is
//!    assignable to the expected member type.
//! 3. The same search repeated on the declared supertype, recursively, until
//!    no supertype remains.
//!
//! Type-directed scanning survives renames as long as the member's type is
//! unique within its class, which holds for the identity-record field and the
//! transport-channel field on every supported host build.
//!
//! Results are cached per `(container, expected member type)` for the lifetime
//! of the resolver; internal layout cannot change without a host restart.
//!
//! # Key Components
//!
//! - [`LayoutResolver`] - The fallback search plus its process-lifetime cache
//! - [`FieldHandle`] - Resolved field accessor with holder revalidation
//! - [`MethodHandle`] - Resolved constructor accessor

use dashmap::DashMap;

use crate::host::class::{FieldDef, HostClassRc, MemberFlags, MethodDef, TypeDesc, TypeKey};
use crate::host::object::{HostObject, HostObjectRc};
use crate::host::token::Token;
use crate::host::value::Value;
use crate::{Error, Result};

/// A resolved field accessor, bound to the class that declares the field.
///
/// Owns no host state: just the resolved location plus the declaring class,
/// kept so every access revalidates that the holder actually derives from it.
#[derive(Clone, Debug)]
pub struct FieldHandle {
    declaring: HostClassRc,
    field: FieldDef,
}

impl FieldHandle {
    fn new(declaring: HostClassRc, field: FieldDef) -> Self {
        FieldHandle { declaring, field }
    }

    /// Class that declares the resolved field
    #[must_use]
    pub fn declaring(&self) -> &HostClassRc {
        &self.declaring
    }

    /// Token of the resolved field
    #[must_use]
    pub fn token(&self) -> Token {
        self.field.token()
    }

    /// Declared name the search matched
    #[must_use]
    pub fn name(&self) -> &str {
        self.field.name()
    }

    /// Static type shape of the resolved field
    #[must_use]
    pub fn ty(&self) -> &TypeDesc {
        self.field.ty()
    }

    fn revalidate(&self, holder: &HostObjectRc) -> Result<()> {
        if self.declaring.is_assignable_from(holder.class()) {
            Ok(())
        } else {
            Err(Error::TypeMismatch {
                expected: format!("instance of {}", self.declaring.name()),
                found: holder.class().name().to_string(),
            })
        }
    }

    /// Reads the field from a holder object.
    ///
    /// # Errors
    /// Returns [`Error::TypeMismatch`] when the holder does not derive from the
    /// declaring class.
    pub fn get(&self, holder: &HostObjectRc) -> Result<Value> {
        self.revalidate(holder)?;
        Ok(holder.read_slot(self.field.token()).unwrap_or(Value::Null))
    }

    /// Writes the field on a holder object.
    ///
    /// # Errors
    /// Returns [`Error::TypeMismatch`] on revalidation or value-shape failure
    /// and [`Error::ReflectionDenied`] for final members or frozen holders.
    pub fn set(&self, holder: &HostObjectRc, value: Value) -> Result<()> {
        self.revalidate(holder)?;
        if self.field.flags().contains(MemberFlags::FINAL) {
            return Err(Error::ReflectionDenied {
                member: self.field.token(),
                holder: holder.class().name().to_string(),
                reason: "member is final",
            });
        }
        if !value.fits(self.field.ty()) {
            return Err(Error::TypeMismatch {
                expected: self.field.ty().to_string(),
                found: value.shape().to_string(),
            });
        }
        holder.write_slot(&self.field, value)
    }
}

/// A resolved constructor accessor for a host class.
#[derive(Clone, Debug)]
pub struct MethodHandle {
    declaring: HostClassRc,
    method: MethodDef,
}

impl MethodHandle {
    /// Class that declares the resolved method
    #[must_use]
    pub fn declaring(&self) -> &HostClassRc {
        &self.declaring
    }

    /// Token of the resolved method
    #[must_use]
    pub fn token(&self) -> Token {
        self.method.token()
    }

    /// Constructs a new instance through the resolved constructor.
    ///
    /// # Errors
    /// Returns [`Error::Construction`] when the handle is not a constructor or
    /// the argument count does not match its arity, and the instantiation
    /// errors of [`HostObject::instantiate`] otherwise.
    pub fn construct(&self, args: Vec<Value>) -> Result<HostObjectRc> {
        if !self.method.is_constructor() {
            return Err(Error::Construction(format!(
                "{}::{} is not a constructor",
                self.declaring.name(),
                self.method.name()
            )));
        }
        if args.len() != self.method.arity() {
            return Err(Error::Construction(format!(
                "constructor of {} takes {} arguments, got {}",
                self.declaring.name(),
                self.method.arity(),
                args.len()
            )));
        }
        HostObject::instantiate(&self.declaring, args)
    }
}

/// The fallback member search with its process-lifetime result cache.
#[derive(Default)]
#[derive(Debug)]
pub struct LayoutResolver {
    fields: DashMap<(Token, TypeKey), FieldHandle>,
}

impl LayoutResolver {
    /// Creates a resolver with an empty cache
    #[must_use]
    pub fn new() -> Self {
        LayoutResolver::default()
    }

    /// Resolves a field of `container` whose static type is assignable to
    /// `expected`, trying `candidates` by name first.
    ///
    /// Deterministic: the most-derived class wins, and within a class the
    /// candidate order wins over declaration order. The first resolution for a
    /// given `(container, expected)` pair is cached and returned for every
    /// later call, regardless of the candidate list.
    ///
    /// # Errors
    /// Returns [`Error::LayoutNotFound`] after the fallback chain is exhausted.
    pub fn field(
        &self,
        container: &HostClassRc,
        expected: &TypeDesc,
        candidates: &[&str],
    ) -> Result<FieldHandle> {
        let key = (container.token(), expected.key());
        if let Some(hit) = self.fields.get(&key) {
            return Ok(hit.clone());
        }

        let handle = Self::search(container, expected, candidates)?;
        self.fields.insert(key, handle.clone());
        Ok(handle)
    }

    fn search(
        container: &HostClassRc,
        expected: &TypeDesc,
        candidates: &[&str],
    ) -> Result<FieldHandle> {
        let mut current = Some(container.clone());
        while let Some(class) = current {
            for name in candidates {
                if let Some(field) = class.declared_field(name) {
                    if expected.is_assignable_from(field.ty()) {
                        return Ok(FieldHandle::new(class.clone(), field.clone()));
                    }
                }
            }
            if let Some(field) = class
                .fields()
                .iter()
                .find(|f| expected.is_assignable_from(f.ty()))
            {
                return Ok(FieldHandle::new(class.clone(), field.clone()));
            }
            current = class.superclass().cloned();
        }

        Err(Error::LayoutNotFound {
            container: container.name().to_string(),
            expected: expected.to_string(),
        })
    }

    /// Resolves the canonical constructor of `container` with the given arity.
    ///
    /// Constructors are not inherited, so no supertype recursion happens here.
    ///
    /// # Errors
    /// Returns [`Error::LayoutNotFound`] when the class declares no matching
    /// constructor.
    pub fn constructor(&self, container: &HostClassRc, arity: usize) -> Result<MethodHandle> {
        container
            .methods()
            .iter()
            .find(|m| m.is_constructor() && m.arity() == arity)
            .map(|m| MethodHandle {
                declaring: container.clone(),
                method: m.clone(),
            })
            .ok_or_else(|| Error::LayoutNotFound {
                container: container.name().to_string(),
                expected: format!("constructor with {arity} parameters"),
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use crate::host::class::ClassSpec;
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

    #[test]
    fn test_candidate_order_wins_over_declaration_order() {
        let image = image();
        let class = image
            .define_class(
                ClassSpec::new("Holder")
                    .field("first", TypeDesc::Text)
                    .field("second", TypeDesc::Text),
            )
            .unwrap();

        let resolver = LayoutResolver::new();
        let handle = resolver
            .field(&class, &TypeDesc::Text, &["second", "first"])
            .unwrap();
        assert_eq!(handle.name(), "second");
    }

    #[test]
    fn test_type_scan_when_candidates_miss() {
        let image = image();
        let class = image
            .define_class(
                ClassSpec::new("Holder")
                    .field("latency", TypeDesc::Text)
                    .field("cs", TypeDesc::Uuid),
            )
            .unwrap();

        let resolver = LayoutResolver::new();
        let handle = resolver
            .field(&class, &TypeDesc::Uuid, &["id", "uniqueId"])
            .unwrap();
        assert_eq!(handle.name(), "cs");
    }

    #[test]
    fn test_type_scan_picks_first_declared() {
        let image = image();
        let class = image
            .define_class(
                ClassSpec::new("Holder")
                    .field("a", TypeDesc::Text)
                    .field("b", TypeDesc::Text),
            )
            .unwrap();

        let resolver = LayoutResolver::new();
        let handle = resolver.field(&class, &TypeDesc::Text, &["missing"]).unwrap();
        assert_eq!(handle.name(), "a");
    }

    #[test]
    fn test_supertype_recursion() {
        let image = image();
        let base = image
            .define_class(ClassSpec::new("Player").field("game_profile", TypeDesc::Uuid))
            .unwrap();
        let leaf = image
            .define_class(
                ClassSpec::new("ServerPlayer")
                    .extends(&base)
                    .field("latency", TypeDesc::Text),
            )
            .unwrap();

        let resolver = LayoutResolver::new();
        let handle = resolver
            .field(&leaf, &TypeDesc::Uuid, &["game_profile"])
            .unwrap();
        assert_eq!(handle.name(), "game_profile");
        assert_eq!(handle.declaring().name(), "Player");
    }

    #[test]
    fn test_most_derived_match_shadows_supertype() {
        let image = image();
        let base = image
            .define_class(ClassSpec::new("Player").field("game_profile", TypeDesc::Uuid))
            .unwrap();
        let leaf = image
            .define_class(
                ClassSpec::new("ServerPlayer")
                    .extends(&base)
                    .field("shadow", TypeDesc::Uuid),
            )
            .unwrap();

        let resolver = LayoutResolver::new();
        let handle = resolver
            .field(&leaf, &TypeDesc::Uuid, &["game_profile"])
            .unwrap();
        assert_eq!(handle.name(), "shadow");
        assert_eq!(handle.declaring().name(), "ServerPlayer");
    }

    #[test]
    fn test_resolution_is_cached_per_container_and_type() {
        let image = image();
        let class = image
            .define_class(
                ClassSpec::new("Holder")
                    .field("first", TypeDesc::Text)
                    .field("second", TypeDesc::Text),
            )
            .unwrap();

        let resolver = LayoutResolver::new();
        let a = resolver.field(&class, &TypeDesc::Text, &["first"]).unwrap();
        let b = resolver.field(&class, &TypeDesc::Text, &["second"]).unwrap();
        assert_eq!(a.token(), b.token());
    }

    #[test]
    fn test_exhausted_fallback_fails() {
        let image = image();
        let class = image
            .define_class(ClassSpec::new("Holder").field("latency", TypeDesc::Text))
            .unwrap();

        let resolver = LayoutResolver::new();
        let err = resolver
            .field(&class, &TypeDesc::Uuid, &["id"])
            .unwrap_err();
        assert!(matches!(err, Error::LayoutNotFound { .. }));
    }

    #[test]
    fn test_handle_revalidates_holder() {
        let image = image();
        let class = image
            .define_class(ClassSpec::new("Holder").field("name", TypeDesc::Text))
            .unwrap();
        let other = image.define_class(ClassSpec::new("Other")).unwrap();

        let resolver = LayoutResolver::new();
        let handle = resolver.field(&class, &TypeDesc::Text, &["name"]).unwrap();

        let stranger = HostObject::new(other);
        assert!(matches!(
            handle.get(&stranger).unwrap_err(),
            Error::TypeMismatch { .. }
        ));
    }

    #[test]
    fn test_final_member_write_denied() {
        let image = image();
        let class = image
            .define_class(ClassSpec::new("Holder").field_with_flags(
                "name",
                TypeDesc::Text,
                MemberFlags::FINAL,
            ))
            .unwrap();

        let resolver = LayoutResolver::new();
        let handle = resolver.field(&class, &TypeDesc::Text, &["name"]).unwrap();
        let holder = HostObject::new(class);

        assert!(matches!(
            handle.set(&holder, Value::Text("x".into())).unwrap_err(),
            Error::ReflectionDenied { .. }
        ));
    }

    #[test]
    fn test_constructor_resolution_and_arity() {
        let image = image();
        let class = image
            .define_class(
                ClassSpec::new("PlayerProfile")
                    .value_record()
                    .field("id", TypeDesc::Uuid)
                    .field("name", TypeDesc::Text)
                    .field("properties", TypeDesc::Properties)
                    .constructor(3),
            )
            .unwrap();

        let resolver = LayoutResolver::new();
        assert!(resolver.constructor(&class, 2).is_err());
        let ctor = resolver.constructor(&class, 3).unwrap();

        let record = ctor
            .construct(vec![
                Value::Uuid(Uuid::new_v4()),
                Value::Text("Alice".into()),
                Value::Properties(PropertySet::new()),
            ])
            .unwrap();
        assert!(record.is_frozen());

        let err = ctor.construct(vec![Value::Null]).unwrap_err();
        assert!(matches!(err, Error::Construction(_)));
    }
}
