//! One-time host capability probe.
//!
//! Runs once at plugin startup against a populated [`HostImage`] and turns the
//! host's shape into explicit, immutable configuration: the [`HostProfile`]
//! plus every resolved handle the adapters need. Nothing here is hidden static
//! state: the returned [`HostCapabilities`] is passed by reference to each
//! adapter, so tests can build a fresh probe result per case.
//!
//! Failure semantics follow the plugin's feature split: steps required for
//! identity mutation and registry access are *primary* and abort the probe
//! (the plugin cannot run without them); the connection → transport → channel
//! chain is *secondary* and merely disables entity-level impersonation, with
//! the failure logged rather than returned.

use std::sync::Arc;

use crate::host::class::{HostClassRc, TypeDesc};
use crate::host::connection::Connection;
use crate::host::image::{HostImage, NameIndex};
use crate::host::version::{Mappings, VersionEra};
use crate::resolve::{FieldHandle, LayoutResolver, MethodHandle};
use crate::{Error, Result};

/// Ordered candidate spellings for one internal class or member.
///
/// Which spelling a build uses depends on its mapping mode, so the probe
/// orders the obfuscated spellings first on obfuscated builds and last
/// otherwise before handing the list to the resolver.
struct Candidates {
    readable: &'static [&'static str],
    obfuscated: &'static [&'static str],
}

impl Candidates {
    fn ordered(&self, obfuscated_first: bool) -> Vec<&'static str> {
        let (first, second) = if obfuscated_first {
            (self.obfuscated, self.readable)
        } else {
            (self.readable, self.obfuscated)
        };
        first.iter().chain(second.iter()).copied().collect()
    }
}

const PROFILE_CLASS: Candidates = Candidates {
    readable: &["PlayerProfile", "GameProfile"],
    obfuscated: &["ax", "dq"],
};

const ENTITY_CLASS: Candidates = Candidates {
    readable: &["ServerPlayer", "EntityPlayer"],
    obfuscated: &["aft", "aqj"],
};

const CONNECTION_CLASS: Candidates = Candidates {
    readable: &["ServerCommonListener", "ServerConnection", "PlayerConnection"],
    obfuscated: &["aqx", "ok"],
};

const TRANSPORT_CLASS: Candidates = Candidates {
    readable: &["NetworkTransport", "NetworkManager"],
    obfuscated: &["ou", "ek"],
};

const PLAYER_LIST_CLASS: Candidates = Candidates {
    readable: &["PlayerList", "DedicatedPlayerList"],
    obfuscated: &["aeb"],
};

const PROFILE_FIELD: Candidates = Candidates {
    readable: &["game_profile", "gameProfile", "profile"],
    obfuscated: &["f", "bM", "bN", "cs", "ct"],
};

const ID_FIELD: Candidates = Candidates {
    readable: &["id"],
    obfuscated: &["a"],
};

const NAME_FIELD: Candidates = Candidates {
    readable: &["name"],
    obfuscated: &["b"],
};

const PROPERTIES_FIELD: Candidates = Candidates {
    readable: &["properties"],
    obfuscated: &["c"],
};

const CONNECTION_FIELD: Candidates = Candidates {
    readable: &["connection"],
    obfuscated: &["b", "c"],
};

const TRANSPORT_FIELD: Candidates = Candidates {
    readable: &["transport", "network_manager", "networkManager"],
    obfuscated: &["h", "e"],
};

const CHANNEL_FIELD: Candidates = Candidates {
    readable: &["channel"],
    obfuscated: &["m", "n"],
};

const PLAYER_LIST_FIELD: Candidates = Candidates {
    readable: &["player_list", "playerList"],
    obfuscated: &["ac"],
};

const NAME_INDEX_FIELD: Candidates = Candidates {
    readable: &["players_by_name", "playersByName"],
    obfuscated: &["j"],
};

/// Identity-record constructor shape: `(id, name, properties)`.
const RECORD_CONSTRUCTOR_ARITY: usize = 3;

/// Classified shape of the running host, computed once per process.
#[derive(Clone, Copy, Debug)]
pub struct HostProfile {
    /// Major version era of the host build
    pub era: VersionEra,
    /// `true` when the identity-record type is an immutable value record and
    /// mutation must go through reconstruct-and-replace
    pub identity_record_immutable: bool,
    /// `true` when internal member names are obfuscated on this build
    pub names_obfuscated: bool,
}

/// Variant-specific identity mutation strategy, selected once at probe time.
#[derive(Debug)]
pub(crate) enum IdentityStrategy {
    /// The record's cells can be overwritten in place
    InPlace,
    /// Records are immutable; build a replacement and swap the holder field
    Rebuild {
        /// Canonical `(id, name, properties)` constructor of the record class
        constructor: MethodHandle,
    },
}

#[derive(Debug)]
pub(crate) struct IdentityHandles {
    pub(crate) holder: FieldHandle,
    pub(crate) id: Option<FieldHandle>,
    pub(crate) name: Option<FieldHandle>,
    pub(crate) properties: Option<FieldHandle>,
    pub(crate) strategy: IdentityStrategy,
}

#[derive(Debug)]
pub(crate) struct RegistryHandles {
    pub(crate) index: Arc<NameIndex>,
}

#[derive(Debug)]
pub(crate) struct InjectionHandles {
    pub(crate) connection: FieldHandle,
    pub(crate) transport: FieldHandle,
    pub(crate) channel: FieldHandle,
}

/// Everything the probe learned about the host: profile plus resolved handles.
///
/// Immutable for the process lifetime; there is no teardown beyond process
/// exit.
#[derive(Debug)]
pub struct HostCapabilities {
    image: Arc<HostImage>,
    profile: HostProfile,
    resolver: LayoutResolver,
    identity: IdentityHandles,
    registry: RegistryHandles,
    injection: Option<InjectionHandles>,
}

impl HostCapabilities {
    /// The classified host profile
    #[must_use]
    pub fn profile(&self) -> &HostProfile {
        &self.profile
    }

    /// The resolver seeded by the probe, with its process-lifetime cache.
    ///
    /// Available so embeddings can resolve additional members against the
    /// probed host without starting a fresh search state.
    #[must_use]
    pub fn resolver(&self) -> &LayoutResolver {
        &self.resolver
    }

    /// `true` when entity-level impersonation survived the probe
    #[must_use]
    pub fn injection_available(&self) -> bool {
        self.injection.is_some()
    }

    pub(crate) fn image(&self) -> &Arc<HostImage> {
        &self.image
    }

    pub(crate) fn identity(&self) -> &IdentityHandles {
        &self.identity
    }

    pub(crate) fn registry(&self) -> &RegistryHandles {
        &self.registry
    }

    pub(crate) fn injection(&self) -> Option<&InjectionHandles> {
        self.injection.as_ref()
    }

    /// Best-effort display name of the affected player, for diagnostics only.
    pub(crate) fn player_label(&self, conn: &Connection) -> String {
        let record = self
            .identity
            .holder
            .get(conn.entity())
            .ok()
            .and_then(|v| v.as_object().cloned());
        let name = record.and_then(|r| {
            match &self.identity.name {
                Some(handle) => handle.get(&r).ok(),
                None => r.get_by_name("name"),
            }
            .and_then(|v| v.as_text().map(str::to_string))
        });
        name.unwrap_or_else(|| format!("<{}>", conn.entity().class().name()))
    }
}

/// The one-time startup probe.
pub struct CapabilityProbe;

impl CapabilityProbe {
    /// Probes the host image and resolves every handle the adapters need.
    ///
    /// Intended to run exactly once per process, at plugin startup.
    ///
    /// # Errors
    /// Returns [`Error::ProbeFailed`] (or the underlying discovery error) when
    /// a step required for identity mutation or registry access cannot
    /// complete. Transport-chain failures are logged and recorded as
    /// unavailable instead.
    pub fn run(image: &Arc<HostImage>) -> Result<HostCapabilities> {
        let build = image.build();
        let era = VersionEra::of(&build.version);
        let names_obfuscated =
            era.ships_obfuscated_names() && matches!(build.mappings, Mappings::Obfuscated);
        let resolver = LayoutResolver::new();

        let record_class = Self::find_class(image, &PROFILE_CLASS, names_obfuscated)?;
        // Value-record adoption is a runtime fact of the record type, not a
        // version fact; introspect instead of hard-coding a cutoff.
        let identity_record_immutable = record_class.is_value_record();

        let entity_class = Self::find_class(image, &ENTITY_CLASS, names_obfuscated)?;
        let holder = resolver
            .field(
                &entity_class,
                &TypeDesc::Class(Arc::clone(&record_class)),
                &PROFILE_FIELD.ordered(names_obfuscated),
            )
            .map_err(|e| Error::ProbeFailed(format!("identity-record holder field: {e}")))?;

        let id = resolver
            .field(&record_class, &TypeDesc::Uuid, &ID_FIELD.ordered(names_obfuscated))
            .ok();
        let name = resolver
            .field(&record_class, &TypeDesc::Text, &NAME_FIELD.ordered(names_obfuscated))
            .ok();
        let properties = resolver
            .field(
                &record_class,
                &TypeDesc::Properties,
                &PROPERTIES_FIELD.ordered(names_obfuscated),
            )
            .ok();

        let strategy = if identity_record_immutable {
            let constructor = resolver
                .constructor(&record_class, RECORD_CONSTRUCTOR_ARITY)
                .map_err(|e| Error::ProbeFailed(format!("canonical record constructor: {e}")))?;
            IdentityStrategy::Rebuild { constructor }
        } else {
            if name.is_none() || properties.is_none() {
                return Err(Error::ProbeFailed(
                    "mutable identity record is missing its name or properties cell".to_string(),
                ));
            }
            IdentityStrategy::InPlace
        };

        let registry = Self::resolve_registry(image, &resolver, names_obfuscated)?;

        let injection =
            match Self::resolve_injection(image, &resolver, &entity_class, names_obfuscated) {
                Ok(handles) => Some(handles),
                Err(error) => {
                    tracing::error!(
                        %error,
                        "failed to resolve the transport chain; entity impersonation disabled"
                    );
                    None
                }
            };

        let profile = HostProfile {
            era,
            identity_record_immutable,
            names_obfuscated,
        };
        tracing::info!(
            era = %profile.era,
            immutable_record = profile.identity_record_immutable,
            obfuscated = profile.names_obfuscated,
            injection = injection.is_some(),
            holder_field = holder.name(),
            "host capability probe complete"
        );

        Ok(HostCapabilities {
            image: Arc::clone(image),
            profile,
            resolver,
            identity: IdentityHandles {
                holder,
                id,
                name,
                properties,
                strategy,
            },
            registry,
            injection,
        })
    }

    fn find_class(
        image: &HostImage,
        candidates: &Candidates,
        obfuscated_first: bool,
    ) -> Result<HostClassRc> {
        let ordered = candidates.ordered(obfuscated_first);
        ordered
            .iter()
            .find_map(|name| image.class(name))
            .ok_or_else(|| Error::ClassNotFound(ordered.join(", ")))
    }

    fn resolve_registry(
        image: &HostImage,
        resolver: &LayoutResolver,
        obfuscated: bool,
    ) -> Result<RegistryHandles> {
        let server = image
            .server()
            .ok_or_else(|| Error::ProbeFailed("no server root installed".to_string()))?;
        let player_list_class = Self::find_class(image, &PLAYER_LIST_CLASS, obfuscated)?;
        let list_field = resolver
            .field(
                server.class(),
                &TypeDesc::Class(player_list_class),
                &PLAYER_LIST_FIELD.ordered(obfuscated),
            )
            .map_err(|e| Error::ProbeFailed(format!("player list field: {e}")))?;
        let player_list = list_field
            .get(server)?
            .as_object()
            .cloned()
            .ok_or_else(|| Error::ProbeFailed("player list is not initialized".to_string()))?;

        let index_field = resolver
            .field(
                player_list.class(),
                &TypeDesc::NameIndex,
                &NAME_INDEX_FIELD.ordered(obfuscated),
            )
            .map_err(|e| Error::ProbeFailed(format!("online-name index field: {e}")))?;
        let index = index_field
            .get(&player_list)?
            .as_name_index()
            .cloned()
            .ok_or_else(|| Error::ProbeFailed("online-name index is not initialized".to_string()))?;

        Ok(RegistryHandles { index })
    }

    fn resolve_injection(
        image: &HostImage,
        resolver: &LayoutResolver,
        entity_class: &HostClassRc,
        obfuscated: bool,
    ) -> Result<InjectionHandles> {
        let connection_class = Self::find_class(image, &CONNECTION_CLASS, obfuscated)?;
        let transport_class = Self::find_class(image, &TRANSPORT_CLASS, obfuscated)?;

        let connection = resolver.field(
            entity_class,
            &TypeDesc::Class(Arc::clone(&connection_class)),
            &CONNECTION_FIELD.ordered(obfuscated),
        )?;
        let transport = resolver.field(
            &connection_class,
            &TypeDesc::Class(transport_class.clone()),
            &TRANSPORT_FIELD.ordered(obfuscated),
        )?;
        let channel = resolver.field(
            &transport_class,
            &TypeDesc::Channel,
            &CHANNEL_FIELD.ordered(obfuscated),
        )?;

        Ok(InjectionHandles {
            connection,
            transport,
            channel,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::host::version::HostVersion;
    use crate::test::{synthetic_host, HostShape};

    use super::*;

    #[test]
    fn test_probe_classifies_mutable_readable_host() {
        let fixture = synthetic_host(HostShape::mutable_readable());
        let caps = CapabilityProbe::run(&fixture.image).unwrap();

        let profile = caps.profile();
        assert_eq!(profile.era, VersionEra::Interim);
        assert!(!profile.identity_record_immutable);
        assert!(!profile.names_obfuscated);
        assert!(caps.injection_available());
        assert!(matches!(caps.identity().strategy, IdentityStrategy::InPlace));
    }

    #[test]
    fn test_probe_detects_value_record_at_runtime() {
        // Same era either way: immutability is introspected from the record
        // type, not derived from the version.
        let fixture = synthetic_host(HostShape::immutable_readable());
        let caps = CapabilityProbe::run(&fixture.image).unwrap();

        assert!(caps.profile().identity_record_immutable);
        assert!(matches!(
            caps.identity().strategy,
            IdentityStrategy::Rebuild { .. }
        ));
    }

    #[test]
    fn test_probe_handles_obfuscated_names() {
        let fixture = synthetic_host(HostShape::immutable_obfuscated());
        let caps = CapabilityProbe::run(&fixture.image).unwrap();

        let profile = caps.profile();
        assert_eq!(profile.era, VersionEra::Modern);
        assert!(profile.names_obfuscated);
        assert!(caps.injection_available());
        assert_eq!(caps.identity().holder.name(), "cs");
    }

    #[test]
    fn test_probe_fatal_without_identity_class() {
        let shape = HostShape::mutable_readable().without_profile_class();
        let fixture = synthetic_host(shape);
        let err = CapabilityProbe::run(&fixture.image).unwrap_err();
        assert!(matches!(err, Error::ClassNotFound(_)));
    }

    #[test]
    fn test_probe_fatal_without_server_root() {
        let shape = HostShape::mutable_readable().without_server();
        let fixture = synthetic_host(shape);
        let err = CapabilityProbe::run(&fixture.image).unwrap_err();
        assert!(matches!(err, Error::ProbeFailed(_)));
    }

    #[test]
    fn test_probe_degrades_without_transport_chain() {
        let shape = HostShape::mutable_readable().without_transport_chain();
        let fixture = synthetic_host(shape);
        let caps = CapabilityProbe::run(&fixture.image).unwrap();

        assert!(!caps.injection_available());
        // Primary capabilities are unaffected by the secondary failure.
        assert!(matches!(caps.identity().strategy, IdentityStrategy::InPlace));
    }

    #[test]
    fn test_era_thresholds_via_fixture_versions() {
        let legacy = synthetic_host(HostShape::mutable_readable().with_version(HostVersion::new(8, 8, 0)));
        let caps = CapabilityProbe::run(&legacy.image).unwrap();
        assert_eq!(caps.profile().era, VersionEra::Legacy);
        assert!(!caps.profile().era.folds_index_keys());
    }
}
