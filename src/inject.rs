//! Pipeline injector: install interception stages on connection transports.
//!
//! Pipeline mutation is only legal on the connection's own event loop thread,
//! so both operations here resolve the channel eagerly on the caller's thread
//! and then schedule the actual mutation as a loop task. Scheduling always
//! succeeds; a channel that closed in between silently swallows the task, the
//! same way the host discards late work for a dead connection.
//!
//! # Key Components
//!
//! - [`PipelineInjector`] - Schedules stage installs and removals per connection

use std::sync::Arc;

use crate::host::channel::{Channel, PacketStage, TERMINAL_STAGE};
use crate::host::connection::Connection;
use crate::probe::{HostCapabilities, InjectionHandles};
use crate::{Error, Result};

/// Installs and removes named interception stages on connection pipelines.
pub struct PipelineInjector {
    caps: Arc<HostCapabilities>,
}

impl PipelineInjector {
    /// Creates an injector over a completed probe result
    #[must_use]
    pub fn new(caps: Arc<HostCapabilities>) -> Self {
        PipelineInjector { caps }
    }

    /// Schedules installation of a stage immediately before the host's
    /// terminal stage.
    ///
    /// Idempotent per name: if a stage of this name is already installed when
    /// the task runs, the new stage is dropped. Returns as soon as the task is
    /// scheduled; on a closed channel the task never runs and no error is
    /// reported.
    ///
    /// # Errors
    /// Returns [`Error::AdapterUnavailable`] when the probe could not resolve
    /// the transport chain, and the resolution errors of the chain walk.
    pub fn inject(
        &self,
        conn: &Connection,
        name: &str,
        stage: Box<dyn PacketStage>,
    ) -> Result<()> {
        let channel = self.channel_of(conn).inspect_err(|error| {
            tracing::error!(
                player = %self.caps.player_label(conn),
                %error,
                "stage install refused"
            );
        })?;
        tracing::debug!(
            player = %self.caps.player_label(conn),
            stage = %name,
            "scheduling interception stage install"
        );

        let target = Arc::clone(&channel);
        let name = name.to_string();
        channel.event_loop().submit(move || {
            let mut pipeline = target.pipeline_mut();
            if pipeline.contains(&name) {
                tracing::debug!(stage = %name, "interception stage already installed");
                return;
            }
            if !pipeline.add_before(TERMINAL_STAGE, name.clone(), stage) {
                tracing::error!(stage = %name, "terminal stage missing, install dropped");
            }
        });
        Ok(())
    }

    /// Schedules removal of a previously installed stage.
    ///
    /// Removing a name that is not installed is a no-op. Same scheduling
    /// semantics as [`PipelineInjector::inject`].
    ///
    /// # Errors
    /// Returns [`Error::AdapterUnavailable`] when the probe could not resolve
    /// the transport chain, and the resolution errors of the chain walk.
    pub fn uninject(&self, conn: &Connection, name: &str) -> Result<()> {
        let channel = self.channel_of(conn).inspect_err(|error| {
            tracing::error!(
                player = %self.caps.player_label(conn),
                %error,
                "stage removal refused"
            );
        })?;
        tracing::debug!(
            player = %self.caps.player_label(conn),
            stage = %name,
            "scheduling interception stage removal"
        );

        let target = Arc::clone(&channel);
        let name = name.to_string();
        channel.event_loop().submit(move || {
            target.pipeline_mut().remove(&name);
        });
        Ok(())
    }

    /// Walks entity → connection → transport to the connection's channel.
    ///
    /// # Errors
    /// Returns [`Error::AdapterUnavailable`] when injection handles are absent
    /// or a link of the chain is uninitialized.
    pub fn channel_of(&self, conn: &Connection) -> Result<Arc<Channel>> {
        let handles = self.handles()?;
        let connection = handles
            .connection
            .get(conn.entity())?
            .as_object()
            .cloned()
            .ok_or(Error::AdapterUnavailable("connection object"))?;
        let transport = handles
            .transport
            .get(&connection)?
            .as_object()
            .cloned()
            .ok_or(Error::AdapterUnavailable("transport object"))?;
        handles
            .channel
            .get(&transport)?
            .as_channel()
            .cloned()
            .ok_or(Error::AdapterUnavailable("transport channel"))
    }

    fn handles(&self) -> Result<&InjectionHandles> {
        self.caps
            .injection()
            .ok_or(Error::AdapterUnavailable("pipeline injection"))
    }
}
