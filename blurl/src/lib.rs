//! Resolve envelope keys and download encrypted DASH assets described by
//! `.blurl` containers.

mod commands;
mod logger;

pub mod dash;
pub mod descriptor;
pub mod downloader;
pub mod error;
pub mod keys;
pub mod progress;
pub mod utils;

#[doc(hidden)]
pub use commands::{Args, Commands};
#[doc(hidden)]
pub use logger::Logger;

pub use error::{Error, Result};
pub use reqwest;
