mod manifest;
mod template;

use template::Template;

pub use manifest::{Presentation, Track};
