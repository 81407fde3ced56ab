//! The per-player connection handle.

use std::fmt;

use crate::host::object::HostObjectRc;

/// Handle to one connected player's internal object graph.
///
/// Wraps the player's connection entity, the root from which every resolved
/// accessor chain starts (identity record holder, connection → transport →
/// channel). The handle owns nothing; the host owns the graph, and adapters
/// hold only transient resolved views into it for the duration of one
/// operation.
#[derive(Clone)]
pub struct Connection {
    entity: HostObjectRc,
}

impl Connection {
    /// Wraps a connection entity object
    #[must_use]
    pub fn new(entity: HostObjectRc) -> Self {
        Connection { entity }
    }

    /// The player's connection entity
    #[must_use]
    pub fn entity(&self) -> &HostObjectRc {
        &self.entity
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("entity", &self.entity.class().name())
            .finish()
    }
}
