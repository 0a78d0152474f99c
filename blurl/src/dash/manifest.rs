use super::Template;
use crate::error::{Error, Result};
use dash_mpd::{AdaptationSet, MPD, Representation, SegmentTemplate};
use log::debug;
use reqwest::{Client, Url};
use std::time::Duration;

/// The parts of a DASH manifest the downloader needs.
#[derive(Clone, Debug)]
pub struct Presentation {
    /// `MPD@mediaPresentationDuration` in seconds.
    pub duration: f64,
    /// `SegmentTemplate@duration` of the first representation.
    pub segment_duration: f64,
    /// `SegmentTemplate@timescale` of the first representation.
    pub timescale: f64,
    pub tracks: Vec<Track>,
}

/// First representation of one adaptation set.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub content_type: String,
    pub representation_id: String,
    pub codecs: Option<String>,
    pub sample_rate: Option<String>,
    /// Initialization path with the representation id substituted.
    pub initialization: String,
    pub default_kid: Option<String>,
}

impl Presentation {
    pub async fn fetch(client: &Client, url: &Url, timeout: Duration) -> Result<Self> {
        debug!("Fetching manifest {}", url);
        let response = client.get(url.clone()).timeout(timeout).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(Error::Network {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Self::parse(&response.text().await?)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mpd = dash_mpd::parse(text)
            .map_err(|x| Error::Manifest(format!("couldn't parse response as dash playlist ({x})")))?;
        Self::from_mpd(&mpd)
    }

    pub fn from_mpd(mpd: &MPD) -> Result<Self> {
        let duration = mpd
            .mediaPresentationDuration
            .map(|x| x.as_secs_f64())
            .ok_or_else(|| Error::Manifest("missing @mediaPresentationDuration".to_owned()))?;

        let period = mpd
            .periods
            .first()
            .ok_or_else(|| Error::Manifest("no period found".to_owned()))?;

        let mut tracks = Vec::new();
        let mut timing = None;

        for adaptation_set in &period.adaptations {
            let Some(representation) = adaptation_set.representations.first() else {
                continue;
            };

            let segment_template = segment_template(adaptation_set, representation)?;

            if timing.is_none() {
                let segment_duration = segment_template
                    .duration
                    .map(|x| x as f64)
                    .ok_or_else(|| {
                        Error::Manifest("representation is missing SegmentTemplate@duration".to_owned())
                    })?;
                let timescale = segment_template.timescale.unwrap_or(1) as f64;
                timing = Some((segment_duration, timescale));
            }

            tracks.push(track(adaptation_set, representation, segment_template)?);
        }

        let (segment_duration, timescale) =
            timing.ok_or_else(|| Error::Manifest("no adaptation sets found".to_owned()))?;

        Ok(Self {
            duration,
            segment_duration,
            timescale,
            tracks,
        })
    }

    /// `ceil(duration / (segment_duration / timescale))`.
    ///
    /// This may overestimate by one when the duration is not an exact multiple
    /// of the segment length; the downloader tolerates that on the last index.
    pub fn segment_count(&self) -> Result<usize> {
        let seconds = self.segment_duration / self.timescale;

        if !(seconds > 0.0) || !(self.duration > 0.0) {
            return Err(Error::Manifest(format!(
                "invalid number of segments (duration {}s, segment {}s)",
                self.duration, seconds
            )));
        }

        Ok((self.duration / seconds).ceil() as usize)
    }

    /// Default KID of the first adaptation set, used for output naming.
    pub fn default_kid(&self) -> Option<&str> {
        self.tracks.first().and_then(|x| x.default_kid.as_deref())
    }
}

fn segment_template<'a>(
    adaptation_set: &'a AdaptationSet,
    representation: &'a Representation,
) -> Result<&'a SegmentTemplate> {
    representation
        .SegmentTemplate
        .as_ref()
        .or(adaptation_set.SegmentTemplate.as_ref())
        .ok_or_else(|| Error::Manifest("representation has no SegmentTemplate".to_owned()))
}

fn track(
    adaptation_set: &AdaptationSet,
    representation: &Representation,
    segment_template: &SegmentTemplate,
) -> Result<Track> {
    let representation_id = representation
        .id
        .clone()
        .ok_or_else(|| Error::Manifest("missing @id on representation node".to_owned()))?;

    let content_type = adaptation_set
        .contentType
        .clone()
        .or_else(|| {
            representation
                .mimeType
                .clone()
                .or(adaptation_set.mimeType.clone())
                .and_then(|x| x.split_once('/').map(|x| x.0.to_owned()))
        })
        .unwrap_or_else(|| "unknown".to_owned());

    let initialization = segment_template
        .initialization
        .as_ref()
        .ok_or_else(|| Error::Manifest("missing SegmentTemplate@initialization".to_owned()))?;

    let mut template = Template::new(&representation_id);

    if let Some(bandwidth) = &representation.bandwidth {
        template.insert("Bandwidth", bandwidth.to_string());
    }

    let default_kid = adaptation_set
        .ContentProtection
        .iter()
        .chain(representation.ContentProtection.iter())
        .find_map(|x| x.default_KID.clone());

    Ok(Track {
        content_type,
        codecs: representation.codecs.clone().or(adaptation_set.codecs.clone()),
        sample_rate: representation
            .audioSamplingRate
            .as_ref()
            .map(|x| x.to_string()),
        initialization: template.resolve(initialization),
        representation_id,
        default_kid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MPD_TEXT: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<MPD xmlns="urn:mpeg:dash:schema:mpd:2011" xmlns:cenc="urn:mpeg:cenc:2013" type="static" mediaPresentationDuration="PT1M2.5S" minBufferTime="PT2S" profiles="urn:mpeg:dash:profile:isoff-live:2011">
  <Period id="0" start="PT0S">
    <AdaptationSet id="0" contentType="video" segmentAlignment="true">
      <ContentProtection schemeIdUri="urn:mpeg:dash:mp4protection:2011" value="cenc" cenc:default_KID="01234567-89ab-cdef-fedc-ba9876543210"/>
      <Representation id="v1" bandwidth="800000" mimeType="video/mp4" codecs="avc1.64001f">
        <SegmentTemplate duration="4000" timescale="1000" initialization="init_en_US_$RepresentationID$.mp4" media="segment_en_US_$RepresentationID$_$Number$.m4s" startNumber="1"/>
      </Representation>
    </AdaptationSet>
    <AdaptationSet id="1" contentType="audio">
      <Representation id="a1" bandwidth="128000" mimeType="audio/mp4" codecs="mp4a.40.2" audioSamplingRate="48000">
        <SegmentTemplate duration="4000" timescale="1000" initialization="init_en_US_$RepresentationID$.mp4" media="segment_en_US_$RepresentationID$_$Number$.m4s" startNumber="1"/>
      </Representation>
    </AdaptationSet>
  </Period>
</MPD>"#;

    #[test]
    fn projects_tracks() {
        let presentation = Presentation::parse(MPD_TEXT).unwrap();

        assert_eq!(presentation.duration, 62.5);
        assert_eq!(presentation.tracks.len(), 2);

        let video = &presentation.tracks[0];
        assert_eq!(video.content_type, "video");
        assert_eq!(video.representation_id, "v1");
        assert_eq!(video.initialization, "init_en_US_v1.mp4");
        assert_eq!(video.codecs.as_deref(), Some("avc1.64001f"));

        let audio = &presentation.tracks[1];
        assert_eq!(audio.content_type, "audio");
        assert_eq!(audio.sample_rate.as_deref(), Some("48000"));
        assert_eq!(audio.default_kid, None);

        assert_eq!(
            presentation.default_kid(),
            Some("01234567-89ab-cdef-fedc-ba9876543210")
        );
    }

    #[test]
    fn segment_count_rounds_up() {
        let presentation = Presentation::parse(MPD_TEXT).unwrap();
        // 62.5s / 4s
        assert_eq!(presentation.segment_count().unwrap(), 16);
    }

    #[test]
    fn segment_count_rejects_zero_duration() {
        let mut presentation = Presentation::parse(MPD_TEXT).unwrap();
        presentation.segment_duration = 0.0;
        assert!(presentation.segment_count().is_err());
    }

    #[test]
    fn missing_duration_is_an_error() {
        let text = MPD_TEXT.replace(r#"mediaPresentationDuration="PT1M2.5S" "#, "");
        assert!(matches!(Presentation::parse(&text), Err(Error::Manifest(_))));
    }
}
