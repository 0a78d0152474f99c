//! Asset descriptor container.
//!
//! A `.blurl` file is an 8 byte header followed by a zlib stream holding the
//! JSON descriptor. The same JSON may also be supplied directly as `.json`.

use crate::error::{Error, Result};
use flate2::read::ZlibDecoder;
use log::debug;
use serde::{Deserialize, Serialize};
use std::{fs, io::Read, path::Path};

const HEADER_LEN: usize = 8;

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Descriptor {
    #[serde(rename = "audioonly")]
    pub audio_only: bool,
    pub ev: String,
    #[serde(rename = "partysync")]
    pub party_sync: bool,
    pub playlists: Vec<Playlist>,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Playlist {
    pub data: String,
    pub duration: f64,
    pub language: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

impl Descriptor {
    /// Read a descriptor from a `.blurl` or `.json` file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .map(|x| x.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        debug!("Reading descriptor {}", path.to_string_lossy());

        match ext.as_str() {
            "blurl" => Self::from_blurl(&fs::read(path)?),
            "json" => Self::from_json(&fs::read(path)?),
            _ => Err(Error::Descriptor(
                "input must be a .blurl or a .json file".to_owned(),
            )),
        }
    }

    /// Parse the compressed container form.
    pub fn from_blurl(data: &[u8]) -> Result<Self> {
        let body = data.get(HEADER_LEN..).ok_or_else(|| {
            Error::Descriptor(format!("container is shorter than its {HEADER_LEN} byte header"))
        })?;

        let mut json = Vec::new();
        ZlibDecoder::new(body)
            .read_to_end(&mut json)
            .map_err(|x| Error::Descriptor(format!("couldn't decompress container ({x})")))?;

        Self::from_json(&json)
    }

    /// Parse the already decompressed JSON form.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn has_envelope(&self) -> bool {
        !self.ev.is_empty()
    }

    /// First playlist whose language matches `language`, case-insensitively.
    pub fn playlist_by_language(&self, language: &str) -> Option<&Playlist> {
        self.playlists
            .iter()
            .find(|x| x.language.eq_ignore_ascii_case(language))
    }

    /// Playlist at a 1-based position.
    pub fn playlist_at(&self, position: usize) -> Result<&Playlist> {
        position
            .checked_sub(1)
            .and_then(|x| self.playlists.get(x))
            .ok_or_else(|| {
                Error::Descriptor(format!(
                    "playlist {} is out of range (1-{})",
                    position,
                    self.playlists.len()
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::{Compression, write::ZlibEncoder};
    use std::io::Write;

    const JSON: &str = r#"{
        "audioonly": true,
        "ev": "AQAF",
        "partysync": false,
        "playlists": [
            {"data": "", "duration": 181.5, "language": "en-US", "type": "main", "url": "https://cdn.example.com/a/master.mpd"},
            {"data": "", "duration": 181.5, "language": "fr-FR", "type": "main", "url": "https://cdn.example.com/b/master.mpd"}
        ],
        "type": "vod"
    }"#;

    fn container(json: &str) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(json.as_bytes()).unwrap();

        let mut data = b"\x00\x01\x02\x03\x04\x05\x06\x07".to_vec();
        data.extend(encoder.finish().unwrap());
        data
    }

    #[test]
    fn parses_compressed_container() {
        let descriptor = Descriptor::from_blurl(&container(JSON)).unwrap();

        assert!(descriptor.audio_only);
        assert!(!descriptor.party_sync);
        assert_eq!(descriptor.ev, "AQAF");
        assert_eq!(descriptor.kind, "vod");
        assert_eq!(descriptor.playlists.len(), 2);
        assert_eq!(descriptor.playlists[1].language, "fr-FR");
        assert_eq!(descriptor.playlists[0].duration, 181.5);
    }

    #[test]
    fn json_and_container_agree() {
        let a = Descriptor::from_json(JSON.as_bytes()).unwrap();
        let b = Descriptor::from_blurl(&container(JSON)).unwrap();
        assert_eq!(a.playlists[0].url, b.playlists[0].url);
    }

    #[test]
    fn missing_fields_default() {
        let descriptor = Descriptor::from_json(br#"{"playlists":[{"url":"x"}]}"#).unwrap();
        assert!(!descriptor.has_envelope());
        assert_eq!(descriptor.playlists[0].url, "x");
    }

    #[test]
    fn rejects_truncated_container() {
        assert!(matches!(
            Descriptor::from_blurl(&[0; 4]),
            Err(Error::Descriptor(_))
        ));
        assert!(matches!(
            Descriptor::from_blurl(&[0; 12]),
            Err(Error::Descriptor(_))
        ));
    }

    #[test]
    fn selects_playlists() {
        let descriptor = Descriptor::from_json(JSON.as_bytes()).unwrap();

        assert_eq!(
            descriptor.playlist_by_language("FR-fr").unwrap().url,
            "https://cdn.example.com/b/master.mpd"
        );
        assert!(descriptor.playlist_by_language("de-DE").is_none());
        assert_eq!(
            descriptor.playlist_at(1).unwrap().url,
            "https://cdn.example.com/a/master.mpd"
        );
        assert!(descriptor.playlist_at(0).is_err());
        assert!(descriptor.playlist_at(3).is_err());
    }

    #[test]
    fn open_rejects_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("asset.txt");
        fs::write(&path, JSON).unwrap();

        assert!(matches!(Descriptor::open(&path), Err(Error::Descriptor(_))));

        let path = dir.path().join("asset.json");
        fs::write(&path, JSON).unwrap();
        assert_eq!(Descriptor::open(&path).unwrap().playlists.len(), 2);
    }
}
