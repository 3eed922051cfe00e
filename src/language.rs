// Local post language detection.
//
// Links and mentions are cut out using the record's facets, then emoji and
// punctuation are removed so they don't skew the guess. whatlang scores
// what's left; low-confidence guesses are dropped. Detected languages are
// reported as ISO 639-1 codes, the form translation targets use.

use serde::Deserialize;
use tracing::debug;
use whatlang::Lang;

use crate::bluesky::types::{FeedEntry, PostView, ReplyTarget};

/// Guesses below this confidence are treated as undetected.
pub const MIN_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Deserialize)]
struct Facet {
    index: ByteSlice,
    #[serde(default)]
    features: Vec<FacetFeature>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ByteSlice {
    byte_start: usize,
    byte_end: usize,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "$type")]
enum FacetFeature {
    #[serde(rename = "app.bsky.richtext.facet#link")]
    Link,
    #[serde(rename = "app.bsky.richtext.facet#mention")]
    Mention,
    #[serde(other)]
    Other,
}

impl Facet {
    fn is_link_or_mention(&self) -> bool {
        self.features
            .iter()
            .any(|f| matches!(f, FacetFeature::Link | FacetFeature::Mention))
    }
}

fn is_emoji(c: char) -> bool {
    // Everything outside the BMP, plus the BMP symbol blocks used as emoji.
    (c as u32) > 0xFFFF
        || matches!(
            c,
            '\u{2190}'..='\u{21FF}'
                | '\u{2600}'..='\u{27BF}'
                | '\u{231A}'..='\u{231B}'
                | '\u{2328}'
                | '\u{23CF}'
                | '\u{23E9}'..='\u{23F3}'
                | '\u{23F8}'..='\u{23FA}'
                | '\u{25AA}'..='\u{25AB}'
                | '\u{25B6}'
                | '\u{25C0}'
                | '\u{25FB}'..='\u{25FE}'
                | '\u{2934}'..='\u{2935}'
                | '\u{2B05}'..='\u{2B07}'
                | '\u{2B1B}'..='\u{2B1C}'
                | '\u{2B50}'
                | '\u{2B55}'
                | '\u{203C}'
                | '\u{2049}'
                | '\u{2122}'
                | '\u{2139}'
                | '\u{24C2}'
                | '\u{3030}'
                | '\u{303D}'
                | '\u{3297}'
                | '\u{3299}'
                | '\u{00A9}'
                | '\u{00AE}'
                | '\u{20E3}'
                | '\u{FE0F}'
        )
}

fn is_stripped_punctuation(c: char) -> bool {
    matches!(
        c,
        '.' | ',' | '/' | '#' | '!' | '$' | '%' | '^' | '&' | '*' | ';' | ':' | '{' | '}' | '='
            | '_' | '`' | '~' | '(' | ')'
    )
}

/// Split `text` on its facets and drop the link and mention segments.
///
/// Facets whose byte range is out of bounds, overlaps an earlier facet or
/// doesn't fall on a char boundary are ignored.
fn strip_facets(text: &str, facets: &[Facet]) -> String {
    let mut sorted: Vec<&Facet> = facets.iter().collect();
    sorted.sort_by_key(|f| f.index.byte_start);

    let mut segments = Vec::new();
    let mut pos = 0;
    for facet in sorted {
        let (start, end) = (facet.index.byte_start, facet.index.byte_end);
        if start < pos || end < start {
            continue;
        }
        let (Some(before), Some(inner)) = (text.get(pos..start), text.get(start..end)) else {
            continue;
        };
        segments.push(before);
        if !facet.is_link_or_mention() {
            segments.push(inner);
        }
        pos = end;
    }
    segments.push(text.get(pos..).unwrap_or_default());

    segments.join(" ")
}

/// The text worth running detection on: no links, mentions, emoji or
/// punctuation.
pub fn strip_extraneous(text: &str, facets: Option<&serde_json::Value>) -> String {
    let facets: Vec<Facet> = facets
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default();

    strip_facets(text, &facets)
        .chars()
        .filter(|c| !is_emoji(*c) && !is_stripped_punctuation(*c))
        .collect()
}

/// ISO 639-1 code for a detected language, where one exists.
pub fn iso639_1(lang: Lang) -> Option<&'static str> {
    let code = match lang.code() {
        "afr" => "af",
        "aka" => "ak",
        "amh" => "am",
        "ara" => "ar",
        "aze" => "az",
        "bel" => "be",
        "ben" => "bn",
        "bul" => "bg",
        "cat" => "ca",
        "ces" => "cs",
        "cmn" => "zh",
        "dan" => "da",
        "deu" => "de",
        "ell" => "el",
        "eng" => "en",
        "epo" => "eo",
        "est" => "et",
        "fin" => "fi",
        "fra" => "fr",
        "guj" => "gu",
        "heb" => "he",
        "hin" => "hi",
        "hrv" => "hr",
        "hun" => "hu",
        "hye" => "hy",
        "ind" => "id",
        "ita" => "it",
        "jav" => "jv",
        "jpn" => "ja",
        "kan" => "kn",
        "kat" => "ka",
        "khm" => "km",
        "kor" => "ko",
        "lat" => "la",
        "lav" => "lv",
        "lit" => "lt",
        "mal" => "ml",
        "mar" => "mr",
        "mkd" => "mk",
        "mya" => "my",
        "nep" => "ne",
        "nld" => "nl",
        "nob" => "nb",
        "ori" => "or",
        "pan" => "pa",
        "pes" => "fa",
        "pol" => "pl",
        "por" => "pt",
        "ron" => "ro",
        "rus" => "ru",
        "sin" => "si",
        "slk" => "sk",
        "slv" => "sl",
        "sna" => "sn",
        "spa" => "es",
        "srp" => "sr",
        "swe" => "sv",
        "tam" => "ta",
        "tel" => "te",
        "tgl" => "tl",
        "tha" => "th",
        "tuk" => "tk",
        "tur" => "tr",
        "ukr" => "uk",
        "urd" => "ur",
        "uzb" => "uz",
        "vie" => "vi",
        "yid" => "yi",
        "zul" => "zu",
        _ => return None,
    };
    Some(code)
}

/// English name for an ISO 639-1 code, for display.
pub fn language_name(code: &str) -> Option<&'static str> {
    Lang::all()
        .iter()
        .find(|lang| iso639_1(**lang) == Some(code))
        .map(|lang| lang.eng_name())
}

/// Detect the language of already-stripped text.
pub fn detect_text(text: &str) -> Option<&'static str> {
    if text.chars().count() <= 1 {
        return None;
    }
    let info = whatlang::detect(text)?;
    if info.confidence() < MIN_CONFIDENCE {
        return None;
    }
    iso639_1(info.lang())
}

/// Detect a post's language from its record text and facets.
pub fn detect_post(post: &PostView) -> Option<&'static str> {
    let stripped = strip_extraneous(post.text(), post.record.get("facets"));
    detect_text(&stripped)
}

/// Fill in `language` on every post of a feed page, and on each reply's
/// parent when it is a visible post.
///
/// Posts that already carry a language are left alone.
pub fn detect_languages(entries: &mut [FeedEntry]) {
    let mut detected = 0;
    let mut annotate = |post: &mut PostView| {
        if post.language.is_none() {
            post.language = detect_post(post).map(String::from);
            detected += usize::from(post.language.is_some());
        }
    };

    for entry in entries.iter_mut() {
        annotate(&mut entry.post);
        if let Some(ReplyTarget::Post(parent)) = entry.reply.as_mut().map(|r| &mut r.parent) {
            annotate(parent);
        }
    }

    debug!(entries = entries.len(), detected = detected, "Detected post languages");
}
