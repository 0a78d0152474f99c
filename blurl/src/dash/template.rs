/*
    REFERENCES
    ----------

    1. https://github.com/emarsden/dash-mpd-rs/blob/7e985069fd95fd5d9993b7610c28228d2448aea7/src/fetch.rs#L1422-L1460

*/

use regex::Regex;
use std::{collections::HashMap, sync::LazyLock};

static RE_REPRESENTATION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\\$RepresentationID%0([\\d])d\\$").unwrap());
static RE_BANDWIDTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\\$Bandwidth%0([\\d])d\\$").unwrap());

/// `SegmentTemplate` identifier substitution.
pub(crate) struct Template {
    vars: HashMap<&'static str, String>,
}

impl Template {
    pub(crate) fn new(representation_id: &str) -> Self {
        Self {
            vars: HashMap::from([("RepresentationID", representation_id.to_owned())]),
        }
    }

    pub(crate) fn insert(&mut self, var: &'static str, val: String) {
        self.vars.insert(var, val);
    }

    pub(crate) fn resolve(&self, template: &str) -> String {
        let mut template = template.to_owned();

        for (var, ident_re) in [
            ("RepresentationID", &*RE_REPRESENTATION_ID),
            ("Bandwidth", &*RE_BANDWIDTH),
        ] {
            let Some(value) = self.vars.get(var) else {
                continue;
            };

            template = template.replace(&format!("${var}$"), value);

            while let Some(cap) = ident_re.captures(&template) {
                let Some(m) = cap.get(0) else {
                    break;
                };
                let width = cap[1].parse::<usize>().unwrap_or_default();
                let padded = format!("{:0>width$}", value, width = width);
                template = format!("{}{}{}", &template[..m.start()], padded, &template[m.end()..]);
            }
        }

        template
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_representation_id() {
        let template = Template::new("a1");
        assert_eq!(template.resolve("init_en_US_$RepresentationID$.mp4"), "init_en_US_a1.mp4");
        assert_eq!(template.resolve("init_$RepresentationID%05d$.mp4"), "init_000a1.mp4");
        assert_eq!(template.resolve("init_0.mp4"), "init_0.mp4");
    }

    #[test]
    fn unknown_variables_are_left_alone() {
        let mut template = Template::new("7");
        assert_eq!(template.resolve("$Bandwidth$/$RepresentationID$"), "$Bandwidth$/7");

        template.insert("Bandwidth", "128000".to_owned());
        assert_eq!(template.resolve("$Bandwidth$/$RepresentationID$"), "128000/7");
    }
}
