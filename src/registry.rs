//! Online registry adapter: era-aware access to the shared name index.
//!
//! The host keys its online-player index differently across eras: newer builds
//! fold keys to lowercase, older ones store the visible name verbatim. The
//! adapter applies the probed era's rule on every write so a disguised name
//! remains findable by the host's own lookup paths.
//!
//! Mutation follows the host's tick-thread discipline; with a main thread
//! adopted on the image, that precondition is asserted in debug builds.

use std::sync::Arc;

use crate::host::connection::Connection;
use crate::probe::HostCapabilities;

/// Registers and looks up connections in the host's online-name index.
pub struct OnlineRegistry {
    caps: Arc<HostCapabilities>,
}

impl OnlineRegistry {
    /// Creates a registry adapter over a completed probe result
    #[must_use]
    pub fn new(caps: Arc<HostCapabilities>) -> Self {
        OnlineRegistry { caps }
    }

    /// Registers a connection under the given visible name.
    ///
    /// The key is folded per the probed era before insertion. An existing
    /// mapping for the key is replaced, matching host semantics for a
    /// reconnecting player.
    pub fn register(&self, conn: &Connection, name: &str) {
        self.assert_tick_thread();
        let key = self.key_for(name);
        let replaced = self
            .caps
            .registry()
            .index
            .insert(key.clone(), Arc::clone(conn.entity()))
            .is_some();
        tracing::debug!(%key, replaced, "registered connection in online index");
    }

    /// Removes the mapping for the given visible name.
    ///
    /// Returns `false` when no mapping was present.
    pub fn unregister(&self, name: &str) -> bool {
        self.assert_tick_thread();
        let key = self.key_for(name);
        let removed = self.caps.registry().index.remove(&key).is_some();
        tracing::debug!(%key, removed, "unregistered connection from online index");
        removed
    }

    /// Looks up an online connection by name.
    ///
    /// Tries the era-folded key exactly first, then falls back to a
    /// case-insensitive scan of the index so lookups keep working for callers
    /// that guess the wrong casing.
    #[must_use]
    pub fn find_player(&self, name: &str) -> Option<Connection> {
        let index = &self.caps.registry().index;
        if let Some(entity) = index.get(&self.key_for(name)) {
            return Some(Connection::new(entity));
        }
        let folded = name.to_lowercase();
        index
            .entries()
            .into_iter()
            .find(|(key, _)| key.to_lowercase() == folded)
            .map(|(_, entity)| Connection::new(entity))
    }

    fn key_for(&self, name: &str) -> String {
        if self.caps.profile().era.folds_index_keys() {
            name.to_lowercase()
        } else {
            name.to_string()
        }
    }

    fn assert_tick_thread(&self) {
        debug_assert!(
            self.caps.image().is_main_thread().unwrap_or(true),
            "online-index mutation must run on the host simulation thread"
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::host::version::HostVersion;
    use crate::probe::CapabilityProbe;
    use crate::test::{synthetic_host, HostShape};

    use super::*;

    fn registry(shape: HostShape) -> (OnlineRegistry, crate::test::Fixture) {
        let fixture = synthetic_host(shape);
        let caps = Arc::new(CapabilityProbe::run(&fixture.image).unwrap());
        (OnlineRegistry::new(caps), fixture)
    }

    #[test]
    fn test_modern_era_folds_keys_to_lowercase() {
        let (registry, fixture) = registry(HostShape::immutable_readable());
        registry.register(&fixture.conn, "Alice");

        assert!(fixture.index.contains("alice"));
        assert!(!fixture.index.contains("Alice"));
    }

    #[test]
    fn test_legacy_era_preserves_key_casing() {
        let shape = HostShape::mutable_readable().with_version(HostVersion::new(8, 8, 0));
        let (registry, fixture) = registry(shape);
        registry.register(&fixture.conn, "Alice");

        assert!(fixture.index.contains("Alice"));
        assert!(!fixture.index.contains("alice"));
    }

    #[test]
    fn test_register_replaces_existing_mapping() {
        let (registry, fixture) = registry(HostShape::immutable_readable());
        registry.register(&fixture.conn, "Alice");
        registry.register(&fixture.conn, "Alice");
        assert_eq!(fixture.index.len(), 1);
    }

    #[test]
    fn test_unregister_uses_the_same_folding() {
        let (registry, fixture) = registry(HostShape::immutable_readable());
        registry.register(&fixture.conn, "Alice");

        assert!(registry.unregister("ALICE"));
        assert!(fixture.index.is_empty());
        assert!(!registry.unregister("Alice"));
    }

    #[test]
    fn test_find_player_exact_then_case_insensitive() {
        let shape = HostShape::mutable_readable().with_version(HostVersion::new(8, 8, 0));
        let (registry, fixture) = registry(shape);
        registry.register(&fixture.conn, "Alice");

        let exact = registry.find_player("Alice").unwrap();
        assert!(Arc::ptr_eq(exact.entity(), fixture.conn.entity()));

        let folded = registry.find_player("aLiCe").unwrap();
        assert!(Arc::ptr_eq(folded.entity(), fixture.conn.entity()));

        assert!(registry.find_player("Bob").is_none());
    }

    #[test]
    fn test_find_player_fallback_handles_non_ascii_names() {
        let shape = HostShape::mutable_readable().with_version(HostVersion::new(8, 8, 0));
        let (registry, fixture) = registry(shape);
        registry.register(&fixture.conn, "Ægir");

        let found = registry.find_player("ægir").unwrap();
        assert!(Arc::ptr_eq(found.entity(), fixture.conn.entity()));
    }

    #[test]
    fn test_register_allowed_on_adopted_main_thread() {
        let (registry, fixture) = registry(HostShape::immutable_readable());
        fixture.image.adopt_main_thread();
        registry.register(&fixture.conn, "Alice");
        assert!(fixture.index.contains("alice"));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "online-index mutation must run on the host simulation thread")]
    fn test_register_off_main_thread_trips_assertion() {
        let (registry, fixture) = registry(HostShape::immutable_readable());
        std::thread::spawn({
            let image = Arc::clone(&fixture.image);
            move || image.adopt_main_thread()
        })
        .join()
        .unwrap();

        registry.register(&fixture.conn, "Alice");
    }
}
