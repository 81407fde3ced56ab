//! The host image: class registry, server root, and the shared online index.
//!
//! A [`HostImage`] is the adapter's window onto one running host process. It is
//! populated once, by the embedding, from the live host, and read for the
//! rest of the process lifetime; classes and their tokens never change after
//! registration.
//!
//! # Key Components
//!
//! - [`HostImage`] - Concurrent class registry, build metadata, server root
//! - [`NameIndex`] - The host's shared name → connection-entity index
//!
//! # Thread Safety
//!
//! The class registry is a concurrent map and safe to read from any thread.
//! The [`NameIndex`] carries the minimal lock Rust requires for shared access;
//! the host's own discipline (tick-thread mutation) remains the documented
//! precondition for callers, see the registry adapter.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock, RwLock};
use std::thread::{self, ThreadId};

use dashmap::DashMap;

use crate::host::class::{ClassSpec, FieldDef, HostClass, HostClassRc, MemberFlags, MethodDef};
use crate::host::object::HostObjectRc;
use crate::host::token::{Token, TokenKind};
use crate::host::version::HostBuild;
use crate::{Error, Result};

/// The host's shared online-player index: name key → connection entity.
///
/// Key casing is the caller's concern; hosts of different eras normalize keys
/// differently and the registry adapter applies the era's rule before touching
/// this map.
#[derive(Default, Debug)]
pub struct NameIndex {
    inner: RwLock<HashMap<String, HostObjectRc>>,
}

impl NameIndex {
    /// Creates an empty index
    #[must_use]
    pub fn new() -> Self {
        NameIndex::default()
    }

    /// Inserts a mapping, returning the previous entity for the key if any
    pub fn insert(&self, key: String, entity: HostObjectRc) -> Option<HostObjectRc> {
        write_lock!(self.inner).insert(key, entity)
    }

    /// Removes a mapping, returning the entity that was mapped if any
    pub fn remove(&self, key: &str) -> Option<HostObjectRc> {
        write_lock!(self.inner).remove(key)
    }

    /// Exact-key lookup
    #[must_use]
    pub fn get(&self, key: &str) -> Option<HostObjectRc> {
        read_lock!(self.inner).get(key).cloned()
    }

    /// `true` if the exact key is present
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        read_lock!(self.inner).contains_key(key)
    }

    /// Snapshot of all entries, in no particular order
    #[must_use]
    pub fn entries(&self) -> Vec<(String, HostObjectRc)> {
        read_lock!(self.inner)
            .iter()
            .map(|(k, v)| (k.clone(), Arc::clone(v)))
            .collect()
    }

    /// Number of entries
    #[must_use]
    pub fn len(&self) -> usize {
        read_lock!(self.inner).len()
    }

    /// `true` if no entries are present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        read_lock!(self.inner).is_empty()
    }
}

/// One running host process, as seen by the adapter.
#[derive(Debug)]
pub struct HostImage {
    build: HostBuild,
    classes: DashMap<String, HostClassRc>,
    next_index: AtomicU32,
    server: OnceLock<HostObjectRc>,
    main_thread: OnceLock<ThreadId>,
}

impl HostImage {
    /// Creates an empty image for a host with the given build metadata
    #[must_use]
    pub fn new(build: HostBuild) -> Arc<Self> {
        Arc::new(HostImage {
            build,
            classes: DashMap::new(),
            next_index: AtomicU32::new(1),
            server: OnceLock::new(),
            main_thread: OnceLock::new(),
        })
    }

    /// Build metadata of the running host
    #[must_use]
    pub fn build(&self) -> &HostBuild {
        &self.build
    }

    fn next_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, self.next_index.fetch_add(1, Ordering::Relaxed))
    }

    /// Registers a class, assigning it and its members process-lifetime tokens.
    ///
    /// Fields of a value-record class are forced [`MemberFlags::FINAL`].
    ///
    /// # Errors
    /// Returns [`Error::DuplicateClass`] when a class of the same name is
    /// already registered.
    pub fn define_class(&self, spec: ClassSpec) -> Result<HostClassRc> {
        if self.classes.contains_key(&spec.name) {
            return Err(Error::DuplicateClass(spec.name));
        }

        let class_token = self.next_token(TokenKind::Class);
        let fields = spec
            .fields
            .into_iter()
            .map(|(name, ty, mut flags)| {
                if spec.value_record {
                    flags |= MemberFlags::FINAL;
                }
                FieldDef::new(self.next_token(TokenKind::Field), name, ty, flags)
            })
            .collect();
        let methods = spec
            .methods
            .into_iter()
            .map(|(name, arity, constructor)| {
                MethodDef::new(self.next_token(TokenKind::Method), name, arity, constructor)
            })
            .collect();

        let class = Arc::new(HostClass::from_parts(
            class_token,
            spec.name,
            spec.superclass,
            spec.value_record,
            fields,
            methods,
        ));
        self.classes
            .insert(class.name().to_string(), Arc::clone(&class));
        Ok(class)
    }

    /// Looks up a registered class by exact name
    #[must_use]
    pub fn class(&self, name: &str) -> Option<HostClassRc> {
        self.classes.get(name).map(|c| Arc::clone(&c))
    }

    /// Installs the server root object.
    ///
    /// # Errors
    /// Returns [`Error::DuplicateClass`] dressed as a probe failure when called
    /// twice; the server root is process-lifetime state.
    pub fn install_server(&self, server: HostObjectRc) -> Result<()> {
        self.server
            .set(server)
            .map_err(|_| Error::ProbeFailed("server root already installed".to_string()))
    }

    /// The server root object, if installed
    #[must_use]
    pub fn server(&self) -> Option<&HostObjectRc> {
        self.server.get()
    }

    /// Records the calling thread as the host's main simulation thread.
    ///
    /// Enables the debug-mode thread-affinity assertions in the identity
    /// adapter. First caller wins; later calls are ignored.
    pub fn adopt_main_thread(&self) {
        let _ = self.main_thread.set(thread::current().id());
    }

    /// Whether the calling thread is the adopted main thread.
    ///
    /// `None` when no thread was adopted, in which case affinity checks are
    /// skipped.
    #[must_use]
    pub fn is_main_thread(&self) -> Option<bool> {
        self.main_thread
            .get()
            .map(|id| *id == thread::current().id())
    }
}

#[cfg(test)]
mod tests {
    use crate::host::class::TypeDesc;
    use crate::host::object::HostObject;
    use crate::host::version::{HostVersion, Mappings};

    use super::*;

    fn image() -> Arc<HostImage> {
        HostImage::new(HostBuild::new(
            HostVersion::new(17, 0, 0),
            Mappings::Obfuscated,
        ))
    }

    #[test]
    fn test_define_and_lookup() {
        let image = image();
        let class = image
            .define_class(ClassSpec::new("ServerPlayer").field("name", TypeDesc::Text))
            .unwrap();

        assert!(class.token().is_class());
        assert!(class.fields()[0].token().is_field());
        let found = image.class("ServerPlayer").unwrap();
        assert_eq!(found.token(), class.token());
        assert!(image.class("Nope").is_none());
    }

    #[test]
    fn test_duplicate_class_rejected() {
        let image = image();
        image.define_class(ClassSpec::new("A")).unwrap();
        let err = image.define_class(ClassSpec::new("A")).unwrap_err();
        assert!(matches!(err, Error::DuplicateClass(_)));
    }

    #[test]
    fn test_tokens_are_unique_across_kinds() {
        let image = image();
        let a = image
            .define_class(
                ClassSpec::new("A")
                    .field("x", TypeDesc::Text)
                    .constructor(1),
            )
            .unwrap();
        let b = image.define_class(ClassSpec::new("B")).unwrap();

        assert_ne!(a.token(), b.token());
        assert_ne!(a.token().index(), a.fields()[0].token().index());
        assert_ne!(a.fields()[0].token().index(), a.methods()[0].token().index());
    }

    #[test]
    fn test_server_installed_once() {
        let image = image();
        let class = image.define_class(ClassSpec::new("DedicatedServer")).unwrap();
        image.install_server(HostObject::new(Arc::clone(&class))).unwrap();
        assert!(image.server().is_some());
        assert!(image.install_server(HostObject::new(class)).is_err());
    }

    #[test]
    fn test_name_index_roundtrip() {
        let image = image();
        let class = image.define_class(ClassSpec::new("ServerPlayer")).unwrap();
        let entity = HostObject::new(class);

        let index = NameIndex::new();
        assert!(index.is_empty());
        assert!(index.insert("alice".to_string(), Arc::clone(&entity)).is_none());
        assert!(index.contains("alice"));
        assert!(index.get("Alice").is_none());
        assert_eq!(index.len(), 1);
        assert!(index.remove("alice").is_some());
        assert!(index.is_empty());
    }
}
