//! Model of the running host's internal object graph.
//!
//! The host exposes no public API for what this crate does, so the adapter
//! works against this model instead: registered classes with tokenized members
//! ([`class`], [`token`]), live instances with lockable field slots
//! ([`object`], [`value`]), the per-connection transport chain ([`channel`],
//! [`connection`]), build metadata ([`version`]), and the image tying it all
//! together ([`image`]).
//!
//! Embeddings populate the model once from the live host at startup; tests
//! populate it synthetically. Everything above this module (probe, resolver,
//! adapters) touches the host exclusively through these types.

pub mod channel;
pub mod class;
pub mod connection;
pub mod image;
pub mod object;
pub mod token;
pub mod value;
pub mod version;
