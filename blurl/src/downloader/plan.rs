use crate::error::{Error, Result};
use reqwest::Url;

/// Where a track's initialization and media segments live.
#[derive(Clone, Debug)]
pub struct SegmentPlan {
    pub base_url: Url,
    pub init_path: String,
    /// Estimated number of media segments, numbered from 1.
    pub expected: usize,
    pub adaptation_id: String,
}

impl SegmentPlan {
    pub fn new(
        base_url: Url,
        init_path: impl Into<String>,
        expected: usize,
        adaptation_id: impl Into<String>,
    ) -> Self {
        Self {
            base_url,
            init_path: init_path.into(),
            expected,
            adaptation_id: adaptation_id.into(),
        }
    }

    pub fn init_url(&self) -> Result<Url> {
        self.join(&self.init_path)
    }

    pub fn segment_url(&self, index: usize) -> Result<Url> {
        self.join(&self.segment_name(index))
    }

    /// Media segment file name for a 1-based index.
    ///
    /// `init_<name>_<id>.mp4` becomes `segment_<name>_<id>_<index>.m4s` and
    /// `init_<id>.mp4` becomes `segment_<id>_<index>.m4s`.
    pub fn segment_name(&self, index: usize) -> String {
        let id = &self.adaptation_id;
        let stem = self.init_path.rsplit('/').next().unwrap_or(&self.init_path);
        let stem = stem.strip_prefix("init_").unwrap_or(stem);
        let stem = stem.strip_suffix(".mp4").unwrap_or(stem);

        let name = if stem == id {
            ""
        } else {
            stem.strip_suffix(id.as_str())
                .and_then(|x| x.strip_suffix('_'))
                .unwrap_or(stem)
        };

        let dir = self
            .init_path
            .rsplit_once('/')
            .map(|x| format!("{}/", x.0))
            .unwrap_or_default();

        if name.is_empty() {
            format!("{dir}segment_{id}_{index}.m4s")
        } else {
            format!("{dir}segment_{name}_{id}_{index}.m4s")
        }
    }

    fn join(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|_| Error::Url(format!("{}{}", self.base_url, path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(init: &str, id: &str) -> SegmentPlan {
        SegmentPlan::new(
            "https://cdn.example.com/asset/".parse().unwrap(),
            init,
            10,
            id,
        )
    }

    #[test]
    fn names_language_tagged_segments() {
        let plan = plan("init_en_US_a1.mp4", "a1");
        assert_eq!(plan.segment_name(3), "segment_en_US_a1_3.m4s");
        assert_eq!(
            plan.segment_url(3).unwrap().as_str(),
            "https://cdn.example.com/asset/segment_en_US_a1_3.m4s"
        );
        assert_eq!(
            plan.init_url().unwrap().as_str(),
            "https://cdn.example.com/asset/init_en_US_a1.mp4"
        );
    }

    #[test]
    fn names_bare_id_segments() {
        assert_eq!(plan("init_0.mp4", "0").segment_name(1), "segment_0_1.m4s");
        assert_eq!(plan("init_0.mp4", "0").segment_name(12), "segment_0_12.m4s");
    }

    #[test]
    fn keeps_name_when_id_is_absent() {
        assert_eq!(plan("init_video.mp4", "7").segment_name(2), "segment_video_7_2.m4s");
    }

    #[test]
    fn keeps_subdirectories() {
        assert_eq!(
            plan("video/init_0.mp4", "0").segment_name(4),
            "video/segment_0_4.m4s"
        );
    }
}
