#![doc(html_no_source)]
#![deny(missing_docs)]

//! # hostmask
//!
//! A version-tolerant adapter over a game host's internal player structures.
//! Built for embeddings that need to read and rewrite a player's visible
//! identity (id, name, signed skin properties) and intercept their
//! connection traffic, on hosts that ship no stable API and rename their
//! internals every release.
//!
//! ## Features
//!
//! - **One-time capability probe** - Classifies the running build and resolves
//!   every internal handle up front, so per-call paths never search
//! - **Fallback layout resolution** - Candidate names, type-directed scanning,
//!   and supertype recursion survive renames and obfuscation
//! - **Variant-aware identity mutation** - In-place writes on mutable records,
//!   reconstruct-and-replace on immutable value records, behind one API
//! - **Pipeline interception** - Stage installs scheduled on the connection's
//!   own event loop, inserted before the host's terminal stage
//! - **Era-aware registry access** - Online-index keys folded the way the
//!   probed release folds them
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hostmask::prelude::*;
//!
//! let image = HostImage::new(HostBuild::parse("21.1.0", Mappings::Readable)?);
//! // ... the embedding mirrors the live host's classes and objects into `image` ...
//!
//! let caps = Arc::new(CapabilityProbe::run(&image)?);
//! let registry = OnlineRegistry::new(Arc::clone(&caps));
//! let identity = IdentityAdapter::new(Arc::clone(&caps));
//!
//! if let Some(conn) = registry.find_player("Alice") {
//!     identity.set_name_and_skin(&conn, "Bob", "B64TEX", Some("SIG"))?;
//! }
//! # Ok::<(), hostmask::Error>(())
//! ```
//!
//! ## Architecture
//!
//! `hostmask` is organized into several key modules:
//!
//! - [`prelude`] - Convenient re-exports of commonly used types
//! - [`host`] - The host object model: image, classes, objects, transport
//! - [`probe`] - The one-time capability probe and its result
//! - [`resolve`] - Fallback member search and resolved handles
//! - [`identity`], [`inject`], [`registry`] - The per-call adapters
//! - [`skinsource`] - The remote skin-authority collaborator
//! - [`Error`] and [`Result`] - Comprehensive error handling
//!
//! The [`probe::CapabilityProbe`] runs once at startup and is the only place
//! layout discovery happens; everything after it operates through resolved
//! handles. A failed primary probe step aborts startup, a failed transport
//! chain merely disables [`inject`].

#[macro_use]
pub(crate) mod macros;

pub(crate) mod error;


/// Convenient re-exports of the most commonly used types.
///
/// # Example
///
/// ```rust,no_run
/// use hostmask::prelude::*;
///
/// let image = HostImage::new(HostBuild::parse("21.1.0", Mappings::Readable)?);
/// let caps = CapabilityProbe::run(&image)?;
/// # Ok::<(), hostmask::Error>(())
/// ```
pub mod prelude;

/// The host object model: image, classes, objects, values, and transport.
///
/// Everything under here mirrors live host state rather than owning it. The
/// embedding populates a [`host::image::HostImage`] once at startup; the rest
/// of the crate only reads and mutates through it.
pub mod host;

/// Identity record adapter: read and rewrite a player's visible identity.
pub mod identity;

/// Pipeline injector: install interception stages on connection transports.
pub mod inject;

/// The one-time capability probe and its immutable result.
pub mod probe;

/// Online registry adapter: era-aware access to the shared name index.
pub mod registry;

/// Internal layout resolver: fallback member search and resolved handles.
pub mod resolve;

/// Remote skin lookup against a signing authority endpoint.
pub mod skinsource;

/// The error type for all operations of this crate.
///
/// See the variant documentation for the fatal / non-fatal split the probe
/// applies to these.
pub use error::Error;

/// Result alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
