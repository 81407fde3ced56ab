//! # hostmask Prelude
//!
//! A curated selection of the types most embeddings need, for convenient glob
//! imports. Everything here is also reachable through its home module.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all hostmask operations
pub use crate::Error;

/// The result type used throughout hostmask
pub use crate::Result;

// ================================================================================================
// Host Model
// ================================================================================================

/// The host image the embedding populates at startup
pub use crate::host::image::HostImage;

/// Build metadata and its components
pub use crate::host::version::{HostBuild, HostVersion, Mappings, VersionEra};

/// A player's connection handle
pub use crate::host::connection::Connection;

/// Slot values and the signed property multi-map
pub use crate::host::value::{PropertySet, SignedProperty, Value};

/// Class definition builder for populating an image
pub use crate::host::class::{ClassSpec, TypeDesc};

/// Pipeline stage trait and message direction
pub use crate::host::channel::{PacketDirection, PacketStage};

// ================================================================================================
// Probe and Adapters
// ================================================================================================

/// The one-time startup probe and its result
pub use crate::probe::{CapabilityProbe, HostCapabilities, HostProfile};

/// Identity reads and mutations
pub use crate::identity::{Identity, IdentityAdapter, Skin, TEXTURES_PROPERTY};

/// Interception stage installs and removals
pub use crate::inject::PipelineInjector;

/// Online-index registration and lookup
pub use crate::registry::OnlineRegistry;

/// Remote skin lookup
pub use crate::skinsource::fetch_skin;
