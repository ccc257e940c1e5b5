use log::{debug, info};
use miette::Diagnostic;
use reqwest::Client;

use crate::slack::Message;

/// A Slack incoming webhook.
#[derive(Clone, Eq, PartialEq)]
pub struct Destination {
    /// Used in logs and errors in place of the URL, which is a secret.
    pub name: String,
    pub url: String,
}

impl Destination {
    #[must_use]
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

impl std::fmt::Debug for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Destination")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Post `message` to each destination in order, stopping at the first one that fails.
///
/// ## Errors
/// The first transport failure or non-2xx response. Destinations after it are not attempted.
pub async fn deliver(
    client: &Client,
    destinations: &[Destination],
    message: &Message,
) -> Result<(), Error> {
    for destination in destinations {
        debug!("Posting changelog entry to the {} webhook", destination.name);
        let response = client
            .post(&destination.url)
            .json(message)
            .send()
            .await
            .map_err(|source| Error::Request {
                destination: destination.name.clone(),
                source: source.without_url(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Rejected {
                destination: destination.name.clone(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }
        info!("Posted changelog entry to the {} webhook", destination.name);
    }
    Ok(())
}

#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum Error {
    #[error("Trouble communicating with Slack while posting to the {destination} webhook: {source}")]
    #[diagnostic(
        code(deliver::request),
        help("There was a problem reaching Slack, this may be a network issue or a malformed webhook URL.")
    )]
    Request {
        destination: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("The {destination} webhook rejected the message: {status} {reason}")]
    #[diagnostic(
        code(deliver::rejected),
        help("Check that the webhook URL is still valid and that the app is allowed to post to the channel.")
    )]
    Rejected {
        destination: String,
        status: u16,
        reason: String,
    },
}
