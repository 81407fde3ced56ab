use thiserror::Error;

use crate::host::token::Token;

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// This enum covers every failure mode of the adapter: layout discovery against an unstable
/// host surface, access-control refusals, capability gating, the host object model itself,
/// and the remote skin lookup boundary.
///
/// # Error Categories
///
/// ## Layout Discovery
/// - [`Error::LayoutNotFound`] - Fallback search exhausted without a match
/// - [`Error::ClassNotFound`] - No candidate class name is registered in the host image
/// - [`Error::UnsupportedBuild`] - Build metadata could not be classified
/// - [`Error::ProbeFailed`] - A required capability-probe step did not complete
///
/// ## Access and Typing
/// - [`Error::ReflectionDenied`] - Member located but the access-control layer refused it
/// - [`Error::TypeMismatch`] - A handle or value did not fit the expected shape
/// - [`Error::AdapterUnavailable`] - Dependent capability was never initialized
///
/// ## Host Model
/// - [`Error::DuplicateClass`] - Class registration collided on a name
/// - [`Error::Construction`] - Canonical constructor invocation was invalid
///
/// ## External Collaborators
/// - [`Error::RemoteLookupFailed`] - Skin service unreachable or returned non-success
#[derive(Error, Debug)]
pub enum Error {
    /// The resolver could not locate a required internal member.
    ///
    /// Raised after the full fallback chain of candidate names, type-directed scan,
    /// and supertype recursion has been exhausted for a container type.
    #[error("no member of type {expected} found in {container} or its supertypes")]
    LayoutNotFound {
        /// Name of the container class that was searched
        container: String,
        /// Description of the expected member type
        expected: String,
    },

    /// A member was located but access to it was refused.
    ///
    /// This mirrors the host's access-control layer: writes to final members or to
    /// frozen value-record instances are rejected here rather than corrupting state.
    #[error("access to member {member} on {holder} was denied: {reason}")]
    ReflectionDenied {
        /// Token of the member that was refused
        member: Token,
        /// Class name of the holder object
        holder: String,
        /// Why access was refused
        reason: &'static str,
    },

    /// A dependent capability was never initialized.
    ///
    /// Returned by per-call operations whose backing handles were not resolved
    /// because an earlier, non-fatal probe step failed. The operation is refused
    /// before anything unsafe is attempted.
    #[error("capability unavailable: {0}")]
    AdapterUnavailable(&'static str),

    /// The remote skin service was unreachable or returned a non-success status.
    ///
    /// Fatal for the individual lookup; never retried by this crate.
    #[error("remote skin lookup failed: {0}")]
    RemoteLookupFailed(String),

    /// No class with any of the candidate names is registered in the host image.
    ///
    /// The associated string lists the candidate names that were tried.
    #[error("no class found for candidates [{0}]")]
    ClassNotFound(String),

    /// A value or holder did not match the expected type shape.
    ///
    /// Raised during handle revalidation (holder not derived from the declaring
    /// class), slot writes with incompatible values, and record reads that yield
    /// an unexpected slot shape.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Description of the expected shape
        expected: String,
        /// Description of what was actually found
        found: String,
    },

    /// The host build metadata could not be classified into a version era.
    #[error("unsupported host build: {0}")]
    UnsupportedBuild(String),

    /// A required step of the one-time capability probe did not complete.
    ///
    /// Raised only for primary capabilities (identity mutation, registry access);
    /// secondary failures are logged and degrade the one dependent feature instead.
    #[error("capability probe failed: {0}")]
    ProbeFailed(String),

    /// A class with the same name is already registered in the host image.
    #[error("a class named {0} is already registered")]
    DuplicateClass(String),

    /// Canonical constructor invocation was invalid for the target class.
    ///
    /// Covers arity mismatches and argument values that do not fit the declared
    /// field types of a value-record class.
    #[error("constructor invocation invalid: {0}")]
    Construction(String),
}
