mod download;
mod key;

pub use download::Download;
pub use key::Key;

use crate::{
    descriptor::{Descriptor, Playlist},
    keys::KeySource,
};
use anyhow::{Result, anyhow, bail};
use clap::{ColorChoice, Parser, Subcommand};
use colored::Colorize;
use std::{
    io::{self, Write},
    path::PathBuf,
};

/// Resolve envelope keys and download encrypted DASH assets described by .blurl containers.
#[derive(Debug, Clone, Parser)]
#[command(version, author = "clitic <clitic21@gmail.com>", about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// When to output colored text.
    #[arg(long, global = true, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Increase logging verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print warnings and errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    Download(Download),
    Key(Key),
}

/// Options shared by every command that needs a content key.
#[derive(Debug, Clone, clap::Args)]
pub struct KeyOptions {
    /// Path of the .blurl container (or its decompressed .json form).
    #[arg(required = true)]
    pub input: PathBuf,

    /// Bearer credential. Selects the bearer envelope scheme instead of the key store.
    #[arg(long, env = "BLURL_BEARER", hide_env_values = true, help_heading = "Key Options")]
    pub bearer: Option<String>,

    /// Key-store file scanned for the wrapping key.
    #[arg(long, default_value = "keys.bin", help_heading = "Key Options")]
    pub keys_bin: PathBuf,
}

impl KeyOptions {
    pub fn source(&self) -> KeySource {
        match &self.bearer {
            Some(bearer) => KeySource::Bearer(bearer.to_owned()),
            None => KeySource::KeyStore(self.keys_bin.clone()),
        }
    }

    pub fn descriptor(&self) -> Result<Descriptor> {
        let descriptor = Descriptor::open(&self.input)?;

        if !descriptor.has_envelope() {
            bail!("{} does not carry an envelope value.", self.input.to_string_lossy());
        }

        Ok(descriptor)
    }
}

/// Pick one playlist by position or language, prompting on stdin when
/// several exist and neither was given.
pub fn select_playlist<'a>(
    descriptor: &'a Descriptor,
    position: Option<usize>,
    language: Option<&str>,
) -> Result<&'a Playlist> {
    if let Some(position) = position {
        return Ok(descriptor.playlist_at(position)?);
    }

    if let Some(language) = language {
        return descriptor
            .playlist_by_language(language)
            .ok_or_else(|| anyhow!("no playlist found for language {}.", language));
    }

    match descriptor.playlists.len() {
        0 => bail!("No playlists were found in descriptor."),
        1 => Ok(&descriptor.playlists[0]),
        _ => {
            println!("Select one playlist:");

            for (i, playlist) in descriptor.playlists.iter().enumerate() {
                println!(
                    "{:2}) [{}] {} {}",
                    i + 1,
                    if i == 0 { 'x' } else { ' ' },
                    playlist.language.green(),
                    playlist.url
                );
            }

            println!("------------------------------");
            print!(
                "Press enter to proceed with defaults.\n\
                Or select playlist to download (1, 2, etc.): "
            );
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            println!("------------------------------");

            let input = input.trim();

            if input.is_empty() {
                return Ok(&descriptor.playlists[0]);
            }

            let position = input
                .parse::<usize>()
                .map_err(|_| anyhow!("input is not a valid positive number."))?;
            Ok(descriptor.playlist_at(position)?)
        }
    }
}
