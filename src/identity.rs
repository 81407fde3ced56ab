//! Identity record adapter: read and rewrite a player's visible identity.
//!
//! The identity record is the host-internal `(id, name, properties)` triple a
//! player presents to everyone else. How it can be changed depends on the
//! probed record variant: mutable records get their cells overwritten in
//! place, value records are rebuilt through their canonical constructor and
//! swapped into the holder field. Callers never see the difference; both
//! paths go through the same mutation entry points.
//!
//! # Key Components
//!
//! - [`IdentityAdapter`] - Variant-dispatching identity reads and mutations
//! - [`Identity`] - Detached snapshot of the record's three cells
//! - [`Skin`] - The signed textures attribute, as carried by the record
//!
//! # Thread Safety
//!
//! Mutation must happen on the host's simulation thread; with a thread adopted
//! via [`HostImage::adopt_main_thread`](crate::host::image::HostImage::adopt_main_thread)
//! that precondition is asserted in debug builds.

use std::sync::Arc;

use uuid::Uuid;

use crate::host::connection::Connection;
use crate::host::object::HostObjectRc;
use crate::host::value::{PropertySet, SignedProperty, Value};
use crate::probe::{HostCapabilities, IdentityStrategy};
use crate::resolve::FieldHandle;
use crate::{Error, Result};

/// Property name under which the host carries the skin textures blob.
pub const TEXTURES_PROPERTY: &str = "textures";

/// Detached snapshot of one player's identity record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    /// Stable unique id of the player
    pub id: Uuid,
    /// Visible player name
    pub name: String,
    /// Signed attribute set, including the skin textures if any
    pub properties: PropertySet,
}

/// A skin as carried in the record's `textures` property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Skin {
    /// Base64 texture payload
    pub textures: String,
    /// Authority attestation over the payload, if any
    pub signature: Option<String>,
}

/// Reads and rewrites identity records through the probed handles.
pub struct IdentityAdapter {
    caps: Arc<HostCapabilities>,
}

impl IdentityAdapter {
    /// Creates an adapter over a completed probe result
    #[must_use]
    pub fn new(caps: Arc<HostCapabilities>) -> Self {
        IdentityAdapter { caps }
    }

    /// Snapshots the identity record of a connection.
    ///
    /// # Errors
    /// Returns [`Error::AdapterUnavailable`] when the entity holds no record
    /// and [`Error::TypeMismatch`] when a cell holds an unexpected shape.
    pub fn identity(&self, conn: &Connection) -> Result<Identity> {
        let record = self.record(conn)?;
        self.snapshot(&record)
    }

    /// The skin currently carried by the connection's record, if any.
    ///
    /// Only the first `textures` entry counts; the host ignores the rest.
    ///
    /// # Errors
    /// Same failure modes as [`IdentityAdapter::identity`].
    pub fn skin(&self, conn: &Connection) -> Result<Option<Skin>> {
        let record = self.record(conn)?;
        let properties = self.read_properties(&record)?;
        Ok(properties.first(TEXTURES_PROPERTY).map(|p| Skin {
            textures: p.value.clone(),
            signature: p.signature.clone(),
        }))
    }

    /// Rewrites the visible name, keeping id and properties intact.
    ///
    /// # Errors
    /// Read failures of [`IdentityAdapter::identity`], plus the write failures
    /// of the probed strategy.
    pub fn set_name(&self, conn: &Connection, name: &str) -> Result<()> {
        self.mutate(conn, |identity| {
            identity.name = name.to_string();
        })
    }

    /// Replaces the skin carried by the record.
    ///
    /// Existing `textures` entries are removed first. An empty `textures`
    /// payload removes the skin without adding a replacement, so the player
    /// falls back to the host's default appearance.
    ///
    /// # Errors
    /// Read failures of [`IdentityAdapter::identity`], plus the write failures
    /// of the probed strategy.
    pub fn set_skin(
        &self,
        conn: &Connection,
        textures: &str,
        signature: Option<&str>,
    ) -> Result<()> {
        self.mutate(conn, |identity| {
            Self::apply_skin(identity, textures, signature);
        })
    }

    /// Rewrites name and skin in one commit, so observers of the record never
    /// see the intermediate state.
    ///
    /// # Errors
    /// Read failures of [`IdentityAdapter::identity`], plus the write failures
    /// of the probed strategy.
    pub fn set_name_and_skin(
        &self,
        conn: &Connection,
        name: &str,
        textures: &str,
        signature: Option<&str>,
    ) -> Result<()> {
        self.mutate(conn, |identity| {
            identity.name = name.to_string();
            Self::apply_skin(identity, textures, signature);
        })
    }

    fn apply_skin(identity: &mut Identity, textures: &str, signature: Option<&str>) {
        identity.properties.remove_all(TEXTURES_PROPERTY);
        if !textures.is_empty() {
            identity
                .properties
                .insert(SignedProperty::new(TEXTURES_PROPERTY, textures, signature));
        }
    }

    fn mutate(&self, conn: &Connection, edit: impl FnOnce(&mut Identity)) -> Result<()> {
        debug_assert!(
            self.caps.image().is_main_thread().unwrap_or(true),
            "identity mutation must run on the host simulation thread"
        );

        let result = self.commit(conn, edit);
        if let Err(error) = &result {
            tracing::error!(
                player = %self.caps.player_label(conn),
                %error,
                "identity mutation failed"
            );
        }
        result
    }

    fn commit(&self, conn: &Connection, edit: impl FnOnce(&mut Identity)) -> Result<()> {
        let record = self.record(conn)?;
        let mut identity = self.snapshot(&record)?;
        edit(&mut identity);

        let handles = self.caps.identity();
        match &handles.strategy {
            IdentityStrategy::InPlace => {
                Self::required(&handles.name, "identity name cell")?
                    .set(&record, Value::Text(identity.name.clone()))?;
                Self::required(&handles.properties, "identity properties cell")?
                    .set(&record, Value::Properties(identity.properties))?;
            }
            IdentityStrategy::Rebuild { constructor } => {
                let replacement = constructor.construct(vec![
                    Value::Uuid(identity.id),
                    Value::Text(identity.name.clone()),
                    Value::Properties(identity.properties),
                ])?;
                handles.holder.set(conn.entity(), Value::Object(replacement))?;
            }
        }

        tracing::debug!(player = %identity.name, "identity record updated");
        Ok(())
    }

    fn required<'a>(
        handle: &'a Option<FieldHandle>,
        what: &'static str,
    ) -> Result<&'a FieldHandle> {
        handle.as_ref().ok_or(Error::AdapterUnavailable(what))
    }

    fn record(&self, conn: &Connection) -> Result<HostObjectRc> {
        self.caps
            .identity()
            .holder
            .get(conn.entity())?
            .as_object()
            .cloned()
            .ok_or(Error::AdapterUnavailable("identity record"))
    }

    fn snapshot(&self, record: &HostObjectRc) -> Result<Identity> {
        let handles = self.caps.identity();
        let id = Self::cell(record, &handles.id, "id")?;
        let id = id.as_uuid().ok_or_else(|| Self::shape_error("Uuid", &id))?;
        let name = Self::cell(record, &handles.name, "name")?;
        let name = name
            .as_text()
            .map(str::to_string)
            .ok_or_else(|| Self::shape_error("Text", &name))?;
        let properties = self.read_properties(record)?;
        Ok(Identity {
            id,
            name,
            properties,
        })
    }

    fn read_properties(&self, record: &HostObjectRc) -> Result<PropertySet> {
        let value = Self::cell(record, &self.caps.identity().properties, "properties")?;
        value
            .as_properties()
            .cloned()
            .ok_or_else(|| Self::shape_error("Properties", &value))
    }

    // Reads through the probed handle when the probe found one, or by the
    // canonical cell name otherwise.
    fn cell(
        record: &HostObjectRc,
        handle: &Option<FieldHandle>,
        canonical: &str,
    ) -> Result<Value> {
        match handle {
            Some(handle) => handle.get(record),
            None => Ok(record.get_by_name(canonical).unwrap_or(Value::Null)),
        }
    }

    fn shape_error(expected: &str, found: &Value) -> Error {
        Error::TypeMismatch {
            expected: expected.to_string(),
            found: found.shape().to_string(),
        }
    }
}
