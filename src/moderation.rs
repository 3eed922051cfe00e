// Content filtering: map moderation labels to show / warn / hide using the
// user's label preferences.
//
// Labels are matched against a fixed table of label groups. Adult groups
// are hidden outright when adult content is disabled; otherwise the
// per-group preference decides. A `hide` anywhere wins over any `warn`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::bluesky::types::{Label, Preference};
use crate::config::Platform;

/// A user's visibility preference for one label group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelVisibility {
    Show,
    Warn,
    Hide,
}

impl LabelVisibility {
    /// Parse a `contentLabelPref.visibility` value. Newer servers send
    /// `ignore` for show; anything unrecognised is treated as show.
    pub fn from_pref(value: &str) -> Self {
        match value {
            "hide" => LabelVisibility::Hide,
            "warn" => LabelVisibility::Warn,
            _ => LabelVisibility::Show,
        }
    }
}

/// Label groups the client knows how to filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelGroup {
    Nsfw,
    Nudity,
    Suggestive,
    Gore,
    Hate,
    Spam,
    Impersonation,
}

impl LabelGroup {
    pub fn key(&self) -> &'static str {
        self.def().key
    }

    pub fn from_key(key: &str) -> Option<Self> {
        LABEL_GROUPS.iter().find(|d| d.key == key).map(|d| d.group)
    }

    pub fn def(&self) -> &'static LabelGroupDef {
        // Every variant has exactly one table entry.
        LABEL_GROUPS
            .iter()
            .find(|d| d.group == *self)
            .unwrap_or(&LABEL_GROUPS[0])
    }
}

/// Static description of a label group.
#[derive(Debug)]
pub struct LabelGroupDef {
    pub group: LabelGroup,
    pub key: &'static str,
    pub title: &'static str,
    pub default_visibility: LabelVisibility,
    /// Raw label values that belong to this group
    pub values: &'static [&'static str],
    /// Adult groups are hidden when adult content is disabled
    pub adult: bool,
    pub message: &'static str,
}

/// The label table, in lookup order. A value listed under two groups
/// (`nsfl`) resolves to the first.
pub static LABEL_GROUPS: [LabelGroupDef; 7] = [
    LabelGroupDef {
        group: LabelGroup::Nsfw,
        key: "nsfw",
        title: "Explicit Sexual Images",
        default_visibility: LabelVisibility::Warn,
        values: &["porn", "nsfl"],
        adult: true,
        message: "This post contains explicit sexual images",
    },
    LabelGroupDef {
        group: LabelGroup::Nudity,
        key: "nudity",
        title: "Other Nudity",
        default_visibility: LabelVisibility::Warn,
        values: &["nudity"],
        adult: true,
        message: "This post contains nudity",
    },
    LabelGroupDef {
        group: LabelGroup::Suggestive,
        key: "suggestive",
        title: "Sexually Suggestive",
        default_visibility: LabelVisibility::Show,
        values: &["sexual"],
        adult: true,
        message: "This post contains sexually suggestive content",
    },
    LabelGroupDef {
        group: LabelGroup::Gore,
        key: "gore",
        title: "Violent / Bloody",
        default_visibility: LabelVisibility::Hide,
        values: &["gore", "self-harm", "torture", "nsfl", "corpse"],
        adult: true,
        message: "This post contains violent or bloody content",
    },
    LabelGroupDef {
        group: LabelGroup::Hate,
        key: "hate",
        title: "Political Hate-Groups",
        default_visibility: LabelVisibility::Warn,
        values: &["icon-kkk", "icon-nazi", "icon-intolerant", "behavior-intolerant"],
        adult: false,
        message: "This post has political hate content",
    },
    LabelGroupDef {
        group: LabelGroup::Spam,
        key: "spam",
        title: "Spam",
        default_visibility: LabelVisibility::Hide,
        values: &["spam"],
        adult: false,
        message: "This post has been flagged as spam",
    },
    LabelGroupDef {
        group: LabelGroup::Impersonation,
        key: "impersonation",
        title: "Impersonation",
        default_visibility: LabelVisibility::Warn,
        values: &["impersonation"],
        adult: false,
        message: "This post has been flagged as impersonation",
    },
];

/// Find the label group a raw label value belongs to.
pub fn group_for_label(value: &str) -> Option<&'static LabelGroupDef> {
    LABEL_GROUPS.iter().find(|d| d.values.contains(&value))
}

/// How a filtered item should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterVisibility {
    Warn,
    Hide,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filtered {
    pub visibility: FilterVisibility,
    pub message: String,
}

/// `None` means show without interstitial.
pub type FilterResult = Option<Filtered>;

pub fn is_hidden(result: &FilterResult) -> bool {
    matches!(
        result,
        Some(Filtered {
            visibility: FilterVisibility::Hide,
            ..
        })
    )
}

/// The user's moderation preferences as the filter needs them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModerationPrefs {
    /// `None` when the user never set the adult content toggle
    pub adult_content_enabled: Option<bool>,
    pub label_visibility: HashMap<LabelGroup, LabelVisibility>,
}

impl ModerationPrefs {
    /// Extract moderation settings from a `getPreferences` response.
    /// Label preferences for groups this client doesn't know are ignored.
    pub fn from_preferences(prefs: &[Preference]) -> Self {
        let mut out = Self::default();
        for pref in prefs {
            match pref {
                Preference::AdultContent { enabled } => {
                    if out.adult_content_enabled.is_none() {
                        out.adult_content_enabled = Some(*enabled);
                    }
                }
                Preference::ContentLabel { label, visibility } => {
                    if let Some(group) = LabelGroup::from_key(label) {
                        out.label_visibility
                            .entry(group)
                            .or_insert_with(|| LabelVisibility::from_pref(visibility));
                    }
                }
                Preference::Unknown => {}
            }
        }
        out
    }

    pub fn with_adult_content(mut self, enabled: bool) -> Self {
        self.adult_content_enabled = Some(enabled);
        self
    }

    pub fn with_label(mut self, group: LabelGroup, visibility: LabelVisibility) -> Self {
        self.label_visibility.insert(group, visibility);
        self
    }
}

/// A content filter bound to one user's preferences on one platform.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    adult_content_enabled: bool,
    label_visibility: HashMap<LabelGroup, LabelVisibility>,
}

impl ContentFilter {
    /// Resolve the adult-content default: when unset, iOS builds default to
    /// off and every other platform to on.
    pub fn new(prefs: ModerationPrefs, platform: Platform) -> Self {
        let adult_content_enabled = prefs
            .adult_content_enabled
            .unwrap_or(platform != Platform::Ios);
        Self {
            adult_content_enabled,
            label_visibility: prefs.label_visibility,
        }
    }

    /// A filter that shows everything it doesn't have a preference for.
    pub fn permissive() -> Self {
        Self::new(ModerationPrefs::default().with_adult_content(true), Platform::Other)
    }

    pub fn adult_content_enabled(&self) -> bool {
        self.adult_content_enabled
    }

    /// Decide how to present an item carrying `labels`.
    pub fn filter(&self, labels: &[Label]) -> FilterResult {
        let mut warn: FilterResult = None;

        for label in labels {
            let Some(def) = group_for_label(&label.val) else {
                continue;
            };

            if def.adult && !self.adult_content_enabled {
                return Some(Filtered {
                    visibility: FilterVisibility::Hide,
                    message: def.message.to_string(),
                });
            }

            match self.label_visibility.get(&def.group) {
                Some(LabelVisibility::Hide) => {
                    return Some(Filtered {
                        visibility: FilterVisibility::Hide,
                        message: def.message.to_string(),
                    });
                }
                Some(LabelVisibility::Warn) => {
                    warn = Some(Filtered {
                        visibility: FilterVisibility::Warn,
                        message: def.message.to_string(),
                    });
                }
                Some(LabelVisibility::Show) | None => {}
            }
        }

        warn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(val: &str) -> Label {
        Label {
            val: val.to_string(),
            src: None,
            uri: None,
            cts: None,
        }
    }

    #[test]
    fn no_labels_shows() {
        let filter = ContentFilter::new(ModerationPrefs::default(), Platform::Ios);
        assert_eq!(filter.filter(&[]), None);
    }

    #[test]
    fn porn_hidden_when_adult_content_disabled() {
        let filter = ContentFilter::new(
            ModerationPrefs::default().with_adult_content(false),
            Platform::Other,
        );
        assert_eq!(
            filter.filter(&[label("porn")]),
            Some(Filtered {
                visibility: FilterVisibility::Hide,
                message: "This post contains explicit sexual images".to_string(),
            })
        );
    }

    #[test]
    fn spam_warn_preference() {
        let filter = ContentFilter::new(
            ModerationPrefs::default().with_label(LabelGroup::Spam, LabelVisibility::Warn),
            Platform::Other,
        );
        assert_eq!(
            filter.filter(&[label("spam")]),
            Some(Filtered {
                visibility: FilterVisibility::Warn,
                message: "This post has been flagged as spam".to_string(),
            })
        );
    }

    #[test]
    fn adult_gate_overrides_show_preference() {
        let filter = ContentFilter::new(
            ModerationPrefs::default()
                .with_adult_content(false)
                .with_label(LabelGroup::Suggestive, LabelVisibility::Show),
            Platform::Other,
        );
        assert!(is_hidden(&filter.filter(&[label("sexual")])));
    }

    #[test]
    fn later_hide_beats_earlier_warn() {
        let filter = ContentFilter::new(
            ModerationPrefs::default()
                .with_label(LabelGroup::Impersonation, LabelVisibility::Warn)
                .with_label(LabelGroup::Spam, LabelVisibility::Hide),
            Platform::Other,
        );
        let result = filter.filter(&[label("impersonation"), label("spam")]);
        assert_eq!(
            result,
            Some(Filtered {
                visibility: FilterVisibility::Hide,
                message: "This post has been flagged as spam".to_string(),
            })
        );
    }

    #[test]
    fn last_warning_wins_when_nothing_hides() {
        let filter = ContentFilter::new(
            ModerationPrefs::default()
                .with_label(LabelGroup::Hate, LabelVisibility::Warn)
                .with_label(LabelGroup::Impersonation, LabelVisibility::Warn),
            Platform::Other,
        );
        let result = filter.filter(&[label("icon-nazi"), label("impersonation")]);
        assert_eq!(
            result.map(|f| f.message),
            Some("This post has been flagged as impersonation".to_string())
        );
    }

    #[test]
    fn unknown_labels_and_missing_prefs_are_ignored() {
        let filter = ContentFilter::new(ModerationPrefs::default(), Platform::Other);
        assert_eq!(filter.filter(&[label("!no-unauthenticated"), label("spam")]), None);
    }

    #[test]
    fn adult_default_depends_on_platform() {
        assert!(!ContentFilter::new(ModerationPrefs::default(), Platform::Ios).adult_content_enabled());
        assert!(ContentFilter::new(ModerationPrefs::default(), Platform::Android).adult_content_enabled());
        assert!(ContentFilter::new(
            ModerationPrefs::default().with_adult_content(true),
            Platform::Ios
        )
        .adult_content_enabled());
    }

    #[test]
    fn nsfl_resolves_to_first_group() {
        assert_eq!(group_for_label("nsfl").map(|d| d.group), Some(LabelGroup::Nsfw));
        assert_eq!(group_for_label("corpse").map(|d| d.group), Some(LabelGroup::Gore));
    }

    #[test]
    fn every_group_has_a_table_entry() {
        for def in &LABEL_GROUPS {
            assert_eq!(def.group.def().key, def.key);
            assert_eq!(LabelGroup::from_key(def.key), Some(def.group));
        }
    }

    #[test]
    fn prefs_parse_from_preference_list() {
        let prefs = vec![
            Preference::Unknown,
            Preference::AdultContent { enabled: false },
            Preference::ContentLabel {
                label: "gore".to_string(),
                visibility: "hide".to_string(),
            },
            Preference::ContentLabel {
                label: "spam".to_string(),
                visibility: "ignore".to_string(),
            },
            Preference::ContentLabel {
                label: "graphic-media".to_string(),
                visibility: "warn".to_string(),
            },
        ];
        let parsed = ModerationPrefs::from_preferences(&prefs);
        assert_eq!(parsed.adult_content_enabled, Some(false));
        assert_eq!(parsed.label_visibility.get(&LabelGroup::Gore), Some(&LabelVisibility::Hide));
        assert_eq!(parsed.label_visibility.get(&LabelGroup::Spam), Some(&LabelVisibility::Show));
        assert_eq!(parsed.label_visibility.len(), 2);
    }
}
