//! Remote skin lookup against a signing authority endpoint.
//!
//! One blocking GET per call, no retries. The endpoint is expected to answer
//! with a JSON body carrying the base64 texture payload and, optionally, the
//! authority's signature over it. Anything other than a success status is a
//! hard failure; a skin source that answers strangely is not worth guessing
//! at.

use std::sync::OnceLock;

use serde::Deserialize;

use crate::identity::Skin;
use crate::{Error, Result};

const USER_AGENT: &str = concat!("hostmask/", env!("CARGO_PKG_VERSION"));

/// Shared blocking client, built on first use and reused across calls so
/// repeated lookups keep their connection pool.
fn client() -> Result<&'static reqwest::blocking::Client> {
    static CLIENT: OnceLock<reqwest::blocking::Client> = OnceLock::new();
    if let Some(client) = CLIENT.get() {
        return Ok(client);
    }
    let built = reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| Error::RemoteLookupFailed(e.to_string()))?;
    Ok(CLIENT.get_or_init(|| built))
}

/// Wire shape of a skin-authority response.
#[derive(Deserialize)]
struct SkinResponse {
    textures: String,
    #[serde(default)]
    signature: Option<String>,
}

/// Fetches a signed skin from the given endpoint.
///
/// Blocks the calling thread for the duration of the request; callers on a
/// host simulation thread should run this elsewhere and hop back before
/// applying the result.
///
/// # Errors
/// Returns [`Error::RemoteLookupFailed`] on transport failure, a non-success
/// status, or an unparseable body.
pub fn fetch_skin(url: &str) -> Result<Skin> {
    let response = client()?
        .get(url)
        .send()
        .map_err(|e| Error::RemoteLookupFailed(format!("{url}: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::RemoteLookupFailed(format!(
            "{url} answered {status}"
        )));
    }

    let body: SkinResponse = response
        .json()
        .map_err(|e| Error::RemoteLookupFailed(format!("{url}: malformed body: {e}")))?;
    tracing::debug!(%url, signed = body.signature.is_some(), "fetched remote skin");
    Ok(Skin {
        textures: body.textures,
        signature: body.signature,
    })
}
