use clap::{crate_description, crate_name, crate_version, Arg, ArgAction, Command};
use log::{debug, info};
use miette::{Diagnostic, Result};
use reqwest::Client;

use crate::{changelog::Changelog, config::Config, deliver::deliver, slack::Message};

pub mod changelog;
pub mod config;
pub mod deliver;
pub mod detect;
mod fs;
pub mod slack;

/// Parse the command line and environment, then notify if the changelog changed.
///
/// ## Errors
/// Anything that stops the notification, rendered by `miette`.
pub async fn run() -> Result<()> {
    let matches = command().get_matches();
    let force = matches.get_flag("force");

    let root = std::env::current_dir().map_err(Error::CurrentDirectory)?;
    let config = Config::from_env(root, |key| std::env::var(key).ok()).map_err(Error::from)?;

    match notify(&config, force, &Client::new()).await? {
        Outcome::Unchanged => println!("Changelog unchanged, nothing to announce."),
        Outcome::Notified { destinations } => {
            println!("Announced the latest changelog entry to {destinations} Slack channels.");
        }
    }
    Ok(())
}

fn command() -> Command {
    Command::new(crate_name!())
        .version(crate_version!())
        .about(crate_description!())
        .arg(
            Arg::new("force")
                .long("force")
                .help("Announce the latest entry even if the changelog hasn't changed")
                .action(ArgAction::SetTrue),
        )
}

/// What a successful run did.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The changelog hadn't changed, nothing was sent.
    Unchanged,
    Notified { destinations: usize },
}

/// Read the changelog, and if it changed (or `force`), post its newest entry everywhere.
///
/// The detector only records the new state after every destination accepted the message, so a
/// failed run is retried in full next time.
///
/// ## Errors
/// 1. The changelog can't be read
/// 2. The detector fails
/// 3. A webhook isn't configured (only checked when there's something to send)
/// 4. The changelog has no Timeline entry
/// 5. A destination rejects the message
/// 6. The detector can't record the new state
pub async fn notify(config: &Config, force: bool, client: &Client) -> Result<Outcome, Error> {
    let document = fs::read_to_string(config.changelog_path())?;
    let detector = config.detector();

    if force {
        info!("--force was passed, skipping change detection");
    } else if !detector.has_changed(&document)? {
        debug!("{} is unchanged", config.changelog.display());
        return Ok(Outcome::Unchanged);
    }

    let destinations = config.destinations()?;
    let entry = Changelog::new(&document)
        .with_entry_level(config.entry_level)
        .latest_entry()?;
    debug!("Latest changelog entry is {:?}", entry.title);
    let message = Message::from_entry(&entry);

    deliver(client, &destinations, &message).await?;
    detector.record(&document)?;

    Ok(Outcome::Notified {
        destinations: destinations.len(),
    })
}

#[derive(Debug, Diagnostic, thiserror::Error)]
pub enum Error {
    #[error("Could not determine current directory: {0}")]
    CurrentDirectory(#[source] std::io::Error),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Fs(#[from] fs::Error),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] config::Error),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Detect(#[from] detect::Error),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Changelog(#[from] changelog::Error),
    #[error(transparent)]
    #[diagnostic(transparent)]
    Deliver(#[from] deliver::Error),
}
