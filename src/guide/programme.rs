//! Programme and channel element builders

use tracing::debug;

use super::document::XmlElement;
use super::episode::{EpisodeEncoder, SYSTEM_COMMON, SYSTEM_DD_PROGID, SYSTEM_XMLTV_NS};
use crate::models::{GridChannel, GridEvent};
use crate::utils::datetime::XmltvDateFormatter;
use crate::utils::{normalize_icon_url, title_case};

pub const THUMBNAIL_BASE_URL: &str = "http://zap2it.tmsimg.com/assets/";
pub const OVERVIEW_BASE_URL: &str = "https://tvlistings.gracenote.com//overview.html";
pub const MISSING_DESCRIPTION: &str = "Unavailable";

const FILTER_PREFIX: &str = "filter-";
const MARKER_FLAGS: [&str; 3] = ["New", "Finale", "Premiere"];
const NEW_FLAG: &str = "New";
const CLOSED_CAPTION_TAG: &str = "CC";

/// Builds `<programme>` elements for one guide language
#[derive(Debug, Clone)]
pub struct ProgrammeBuilder {
    lang: String,
}

impl ProgrammeBuilder {
    pub fn new<L: Into<String>>(lang: L) -> Self {
        Self { lang: lang.into() }
    }

    pub fn build(&self, event: &GridEvent, channel_id: &str) -> XmlElement {
        let program = &event.program;

        let mut element = XmlElement::new("programme")
            .with_attr("start", XmltvDateFormatter::format_upstream(&event.start_time))
            .with_attr("stop", XmltvDateFormatter::format_upstream(&event.end_time))
            .with_attr("channel", channel_id);

        element.push(self.localized("title", &program.title));

        if let Some(episode_title) = &program.episode_title {
            element.push(self.localized("sub-title", episode_title));
        }

        let description = program.short_desc.as_deref().unwrap_or_else(|| {
            debug!("No description for {} ({})", program.title, program.id);
            MISSING_DESCRIPTION
        });
        element.push(self.localized("desc", description));

        element.push(
            XmlElement::text_element("length", &event.duration).with_attr("units", "minutes"),
        );

        if let Some(thumbnail) = event.thumbnail.as_deref().filter(|t| !t.is_empty()) {
            let image_url = format!("{}{}.jpg", THUMBNAIL_BASE_URL, thumbnail);
            element.push(XmlElement::text_element("thumbnail", image_url.as_str()));
            element.push(XmlElement::new("icon").with_attr("src", image_url));
        }

        element.push(XmlElement::text_element(
            "url",
            overview_url(&event.series_id, &program.id),
        ));

        for category in &event.filter {
            let category = category.strip_prefix(FILTER_PREFIX).unwrap_or(category);
            element.push(self.localized("category", category));
        }

        let numbers = EpisodeEncoder::encode(
            program.season.as_deref(),
            program.episode.as_deref(),
            &event.series_id,
            &program.id,
        );
        if numbers.is_series() {
            element.push(XmlElement::text_element("category", "Series"));
        } else {
            debug!("No episode number for {} ({})", program.title, program.id);
        }
        if let Some(common) = numbers.common {
            element.push(episode_num(SYSTEM_COMMON, common));
        }
        if let Some(xmltv_ns) = numbers.xmltv_ns {
            element.push(episode_num(SYSTEM_XMLTV_NS, xmltv_ns));
        }
        element.push(episode_num(SYSTEM_DD_PROGID, numbers.dd_progid));

        for flag in &event.flag {
            if MARKER_FLAGS.contains(&flag.as_str()) {
                element.push(XmlElement::new(flag.as_str()));
            }
        }
        if !event.flag.iter().any(|flag| flag == NEW_FLAG) {
            element.push(XmlElement::new("previously-shown"));
        }

        for tag in &event.tags {
            if tag == CLOSED_CAPTION_TAG {
                element.push(XmlElement::new("subtitles").with_attr("type", "teletext"));
            }
        }

        if let Some(rating) = &event.rating {
            element.push(
                XmlElement::new("rating").with_child(XmlElement::text_element("value", rating)),
            );
        }

        element
    }

    fn localized(&self, name: &str, text: &str) -> XmlElement {
        XmlElement::text_element(name, text).with_attr("lang", self.lang.as_str())
    }
}

/// `<channel>` block with the display names guide consumers match on
pub fn build_channel(channel: &GridChannel) -> XmlElement {
    XmlElement::new("channel")
        .with_attr("id", channel.channel_id.as_str())
        .with_child(XmlElement::text_element(
            "display-name",
            format!("{} {}", channel.channel_no, channel.call_sign),
        ))
        .with_child(XmlElement::text_element("display-name", channel.channel_no.as_str()))
        .with_child(XmlElement::text_element("display-name", channel.call_sign.as_str()))
        .with_child(XmlElement::text_element(
            "display-name",
            title_case(&channel.affiliate_name),
        ))
        .with_child(
            XmlElement::new("icon").with_attr("src", normalize_icon_url(&channel.thumbnail)),
        )
}

/// Permalink to the provider's overview page for a program
pub fn overview_url(series_id: &str, program_id: &str) -> String {
    format!(
        "{}?programSeriesId={}&tmsId={}",
        OVERVIEW_BASE_URL, series_id, program_id
    )
}

fn episode_num(system: &str, value: String) -> XmlElement {
    XmlElement::text_element("episode-num", value).with_attr("system", system)
}
