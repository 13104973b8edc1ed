//! Macro-category profiles and score trends.
//!
//! Fine dimensions roll up into exactly four macro categories. The mapping
//! is an explicit value handed to [`ProfileNormalizer`], so callers and tests
//! can substitute their own table.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::record::AssessmentRecord;
use crate::scoring::{DimensionTally, FineSubtotals};

/// Default number of records shown in a trend.
pub const DEFAULT_TREND_LIMIT: usize = 10;

/// The four broad categories shown on the radar chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MacroCategory {
    SocialEmotional,
    HealthWellbeing,
    Relationships,
    SchoolExperience,
}

impl MacroCategory {
    /// All categories, in display order.
    pub const ALL: [MacroCategory; 4] = [
        MacroCategory::SocialEmotional,
        MacroCategory::HealthWellbeing,
        MacroCategory::Relationships,
        MacroCategory::SchoolExperience,
    ];

    pub fn key(self) -> &'static str {
        match self {
            MacroCategory::SocialEmotional => "social_emotional",
            MacroCategory::HealthWellbeing => "health_wellbeing",
            MacroCategory::Relationships => "relationships",
            MacroCategory::SchoolExperience => "school_experience",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MacroCategory::SocialEmotional => "Social-emotional skills",
            MacroCategory::HealthWellbeing => "Health & wellbeing",
            MacroCategory::Relationships => "Relationships",
            MacroCategory::SchoolExperience => "School experience",
        }
    }
}

impl fmt::Display for MacroCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for MacroCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MacroCategory::ALL
            .into_iter()
            .find(|c| c.key() == s.trim())
            .ok_or_else(|| format!("unknown macro category: {s}"))
    }
}

/// Fine dimension key → macro category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionMapping(HashMap<String, MacroCategory>);

impl DimensionMapping {
    /// An empty mapping. Every fine key is dropped during normalization.
    pub fn empty() -> Self {
        Self(HashMap::new())
    }

    /// The standard table shipped with assessa.
    ///
    /// Changing an entry changes the meaning of every profile computed from
    /// stored records; there is no versioning.
    pub fn standard() -> Self {
        use MacroCategory::*;

        const TABLE: &[(&str, MacroCategory)] = &[
            ("optimism", SocialEmotional),
            ("sadness_absence", SocialEmotional),
            ("resilience", SocialEmotional),
            ("resilience_ext", SocialEmotional),
            ("empathy", SocialEmotional),
            ("social_anxiety", SocialEmotional),
            ("cooperation", SocialEmotional),
            ("social_resp", SocialEmotional),
            ("decision", SocialEmotional),
            ("grit", SocialEmotional),
            ("grit_consistency", SocialEmotional),
            ("meaning_presence", SocialEmotional),
            ("health", HealthWellbeing),
            ("health_general", HealthWellbeing),
            ("body_image", HealthWellbeing),
            ("life_satisfaction", HealthWellbeing),
            ("flourishing", HealthWellbeing),
            ("sleep_quality", HealthWellbeing),
            ("energy", HealthWellbeing),
            ("peer_support", Relationships),
            ("friendship", Relationships),
            ("friendship_intimacy", Relationships),
            ("peer_belonging", Relationships),
            ("parent_rel", Relationships),
            ("parent_relationship", Relationships),
            ("family_support", Relationships),
            ("parent_comm", Relationships),
            ("teacher_rel", Relationships),
            ("teacher_care", Relationships),
            ("teacher_understanding", Relationships),
            ("teacher_support", Relationships),
            ("school_climate", SchoolExperience),
            ("school_belonging", SchoolExperience),
        ];

        TABLE
            .iter()
            .map(|(fine, category)| ((*fine).to_string(), *category))
            .collect()
    }

    pub fn insert(&mut self, fine: impl Into<String>, category: MacroCategory) {
        self.0.insert(fine.into(), category);
    }

    pub fn category_of(&self, fine: &str) -> Option<MacroCategory> {
        self.0.get(fine).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for DimensionMapping {
    fn default() -> Self {
        Self::standard()
    }
}

impl FromIterator<(String, MacroCategory)> for DimensionMapping {
    fn from_iter<I: IntoIterator<Item = (String, MacroCategory)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Tunables of the normalization formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileSettings {
    /// Assumed maximum raw score of one item (Likert-style 1..=5).
    #[serde(default = "default_max_item_score")]
    pub max_item_score: f64,
    /// Value reported instead of an exact zero, so empty categories stay
    /// visible on a radar chart. This also hides genuinely zero scores.
    #[serde(default = "default_zero_floor")]
    pub zero_floor: u8,
}

fn default_max_item_score() -> f64 {
    5.0
}

fn default_zero_floor() -> u8 {
    20
}

impl Default for ProfileSettings {
    fn default() -> Self {
        Self {
            max_item_score: default_max_item_score(),
            zero_floor: default_zero_floor(),
        }
    }
}

/// One labelled value of a profile, in `0..=100`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileEntry {
    pub category: MacroCategory,
    pub label: String,
    pub value: u8,
}

/// A four-category profile for radar display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroProfile {
    pub entries: [ProfileEntry; 4],
}

impl MacroProfile {
    /// The profile shown when there is no scored history: all zeros.
    pub fn empty() -> Self {
        Self::from_values(|_| 0)
    }

    fn from_values(mut value: impl FnMut(MacroCategory) -> u8) -> Self {
        Self {
            entries: MacroCategory::ALL.map(|category| ProfileEntry {
                category,
                label: category.label().to_string(),
                value: value(category),
            }),
        }
    }

    pub fn get(&self, category: MacroCategory) -> u8 {
        self.entries
            .iter()
            .find(|e| e.category == category)
            .map(|e| e.value)
            .unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProfileEntry> {
        self.entries.iter()
    }
}

/// Maps fine subtotals onto the macro categories.
#[derive(Debug, Clone, Default)]
pub struct ProfileNormalizer {
    mapping: DimensionMapping,
    settings: ProfileSettings,
}

impl ProfileNormalizer {
    pub fn new(mapping: DimensionMapping) -> Self {
        Self {
            mapping,
            settings: ProfileSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: ProfileSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn mapping(&self) -> &DimensionMapping {
        &self.mapping
    }

    pub fn settings(&self) -> &ProfileSettings {
        &self.settings
    }

    /// Sum each category's fine subtotals. Unmapped fine keys are dropped.
    pub fn category_tallies(
        &self,
        subtotals: &FineSubtotals,
    ) -> HashMap<MacroCategory, DimensionTally> {
        let mut tallies: HashMap<MacroCategory, DimensionTally> = MacroCategory::ALL
            .into_iter()
            .map(|c| (c, DimensionTally::default()))
            .collect();

        for (fine, tally) in subtotals.iter() {
            match self.mapping.category_of(fine) {
                Some(category) => tallies.entry(category).or_default().merge(tally),
                None => tracing::debug!(dimension = fine, "unmapped dimension dropped"),
            }
        }

        tallies
    }

    /// Normalize subtotals into a profile.
    ///
    /// Each category scores `round(min(avg / max_item_score * 100, 100))`,
    /// clamped to `0..=100`; an exact zero is reported as the zero floor.
    pub fn normalize(&self, subtotals: &FineSubtotals) -> MacroProfile {
        let tallies = self.category_tallies(subtotals);
        MacroProfile::from_values(|category| {
            let average = tallies.get(&category).map(|t| t.average()).unwrap_or(0.0);
            match self.scale(average) {
                0 => self.settings.zero_floor.min(100),
                value => value,
            }
        })
    }

    fn scale(&self, average: f64) -> u8 {
        let max = self.settings.max_item_score;
        if !max.is_finite() || max <= 0.0 || !average.is_finite() {
            return 0;
        }
        let percent = (average / max * 100.0).min(100.0);
        percent.round().clamp(0.0, 100.0) as u8
    }

    /// Profile of a respondent's history (newest first), with the id of the
    /// record it was computed from.
    ///
    /// Uses the record chosen by [`select_profile_record`]; when no record
    /// carries dimension data the all-zero profile is returned and the zero
    /// floor does not apply.
    pub fn profile_from_history(
        &self,
        records: &[AssessmentRecord],
        primary_assessment: Option<&str>,
    ) -> (MacroProfile, Option<Uuid>) {
        match select_profile_record(records, primary_assessment) {
            Some(record) => (self.normalize(&record.fine_subtotals), Some(record.id)),
            None => (MacroProfile::empty(), None),
        }
    }
}

/// Pick the record a profile is computed from, out of records ordered
/// newest first: the newest record of the primary assessment if it has
/// dimension data, otherwise the newest record that has any.
pub fn select_profile_record<'r>(
    records: &'r [AssessmentRecord],
    primary_assessment: Option<&str>,
) -> Option<&'r AssessmentRecord> {
    let primary = primary_assessment.and_then(|id| {
        records
            .iter()
            .find(|r| r.assessment_id == id)
            .filter(|r| r.has_dimension_data())
    });
    primary.or_else(|| records.iter().find(|r| r.has_dimension_data()))
}

/// One point of a score trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// 1-based position among the points shown, oldest first.
    pub ordinal: usize,
    /// Display label, e.g. "3rd".
    pub label: String,
    pub assessment_id: String,
    pub total_score: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Chronological total-score trend of the `limit` most recent records.
///
/// `records` must be ordered newest first, as stores return them.
pub fn trend_series(records: &[AssessmentRecord], limit: usize) -> Vec<TrendPoint> {
    records
        .iter()
        .take(limit)
        .rev()
        .enumerate()
        .map(|(i, record)| TrendPoint {
            ordinal: i + 1,
            label: ordinal_label(i + 1),
            assessment_id: record.assessment_id.clone(),
            total_score: record.total_score,
            recorded_at: record.created_at,
        })
        .collect()
}

/// English ordinal: 1st, 2nd, 3rd, 4th, ..., 11th, 12th, 13th, 21st.
pub fn ordinal_label(n: usize) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnswerMap;
    use chrono::{Duration, TimeZone};

    fn subtotals(entries: &[(&str, f64, u32)]) -> FineSubtotals {
        entries
            .iter()
            .map(|(k, sum, count)| ((*k).to_string(), DimensionTally::new(*sum, *count)))
            .collect()
    }

    fn record(assessment: &str, score: f64, minutes: i64, dims: FineSubtotals) -> AssessmentRecord {
        AssessmentRecord {
            id: Uuid::new_v4(),
            respondent_id: "student".into(),
            assessment_id: assessment.into(),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minutes),
            answers: AnswerMap::new(),
            total_score: score,
            fine_subtotals: dims,
        }
    }

    #[test]
    fn normalizes_and_floors_zero_categories() {
        let normalizer = ProfileNormalizer::new(DimensionMapping::standard());
        let profile = normalizer.normalize(&subtotals(&[("optimism", 8.0, 2), ("health", 0.0, 0)]));

        assert_eq!(profile.get(MacroCategory::SocialEmotional), 80);
        assert_eq!(profile.get(MacroCategory::HealthWellbeing), 20);
        assert_eq!(profile.get(MacroCategory::Relationships), 20);
        assert_eq!(profile.get(MacroCategory::SchoolExperience), 20);
    }

    #[test]
    fn small_positive_values_are_not_floored() {
        let normalizer = ProfileNormalizer::new(DimensionMapping::standard());
        // average 0.5 → 10%, below the floor but not zero
        let profile = normalizer.normalize(&subtotals(&[("friendship", 1.0, 2)]));
        assert_eq!(profile.get(MacroCategory::Relationships), 10);
    }

    #[test]
    fn values_are_capped_at_100() {
        let normalizer = ProfileNormalizer::new(DimensionMapping::standard());
        let profile = normalizer.normalize(&subtotals(&[("school_climate", 14.0, 2)]));
        assert_eq!(profile.get(MacroCategory::SchoolExperience), 100);
    }

    #[test]
    fn negative_averages_clamp_to_zero_then_floor() {
        let normalizer = ProfileNormalizer::new(DimensionMapping::standard());
        let profile = normalizer.normalize(&subtotals(&[("energy", -3.0, 1)]));
        assert_eq!(profile.get(MacroCategory::HealthWellbeing), 20);
    }

    #[test]
    fn out_of_range_settings_stay_within_bounds() {
        let data = subtotals(&[("optimism", 4.0, 1)]);

        let high_floor = ProfileNormalizer::default().with_settings(ProfileSettings {
            max_item_score: 5.0,
            zero_floor: 250,
        });
        let profile = high_floor.normalize(&data);
        assert_eq!(profile.get(MacroCategory::SocialEmotional), 80);
        assert_eq!(profile.get(MacroCategory::HealthWellbeing), 100);

        let nan_max = ProfileNormalizer::default().with_settings(ProfileSettings {
            max_item_score: f64::NAN,
            zero_floor: 20,
        });
        assert!(nan_max.normalize(&data).iter().all(|e| e.value == 20));
    }

    #[test]
    fn category_pools_all_fine_keys() {
        let normalizer = ProfileNormalizer::new(DimensionMapping::standard());
        // (6 + 2) / (2 + 2) = 2.0 → 40
        let profile = normalizer.normalize(&subtotals(&[("grit", 6.0, 2), ("empathy", 2.0, 2)]));
        assert_eq!(profile.get(MacroCategory::SocialEmotional), 40);
    }

    #[test]
    fn unmapped_keys_are_dropped() {
        let normalizer = ProfileNormalizer::new(DimensionMapping::standard());
        let tallies =
            normalizer.category_tallies(&subtotals(&[("general", 10.0, 2), ("x", 3.0, 1)]));
        assert!(tallies.values().all(|t| t.count == 0));
    }

    #[test]
    fn custom_mapping_substitutes_table() {
        let mut mapping = DimensionMapping::empty();
        mapping.insert("x", MacroCategory::SchoolExperience);
        let normalizer = ProfileNormalizer::new(mapping).with_settings(ProfileSettings {
            max_item_score: 4.0,
            zero_floor: 5,
        });
        let profile = normalizer.normalize(&subtotals(&[("x", 3.0, 1), ("optimism", 5.0, 1)]));
        assert_eq!(profile.get(MacroCategory::SchoolExperience), 75);
        assert_eq!(profile.get(MacroCategory::SocialEmotional), 5);
    }

    #[test]
    fn history_without_dimension_data_is_all_zero() {
        let normalizer = ProfileNormalizer::default();
        let records = vec![record("logic-01", 12.0, 0, FineSubtotals::new())];
        assert_eq!(
            normalizer.profile_from_history(&records, None),
            (MacroProfile::empty(), None)
        );
        assert_eq!(normalizer.profile_from_history(&[], None), (MacroProfile::empty(), None));
    }

    #[test]
    fn history_prefers_primary_assessment() {
        let normalizer = ProfileNormalizer::default();
        let records = vec![
            record("psy-01", 5.0, 30, subtotals(&[("health", 5.0, 1)])),
            record("national-survey", 9.0, 20, subtotals(&[("optimism", 4.0, 1)])),
        ];

        let (primary, source) = normalizer.profile_from_history(&records, Some("national-survey"));
        assert_eq!(primary.get(MacroCategory::SocialEmotional), 80);
        assert_eq!(primary.get(MacroCategory::HealthWellbeing), 20);
        assert_eq!(source, Some(records[1].id));

        let (newest, source) = normalizer.profile_from_history(&records, Some("missing"));
        assert_eq!(newest.get(MacroCategory::HealthWellbeing), 100);
        assert_eq!(source, Some(records[0].id));
    }

    #[test]
    fn primary_record_without_dimensions_is_skipped() {
        let normalizer = ProfileNormalizer::default();
        let records = vec![
            record("national-survey", 9.0, 30, FineSubtotals::new()),
            record("psy-01", 5.0, 20, subtotals(&[("health", 3.0, 1)])),
            record("national-survey", 7.0, 10, subtotals(&[("optimism", 4.0, 1)])),
        ];

        let selected = select_profile_record(&records, Some("national-survey"));
        assert_eq!(selected.map(|r| r.id), Some(records[1].id));

        let (profile, source) = normalizer.profile_from_history(&records, Some("national-survey"));
        assert_eq!(source, Some(records[1].id));
        assert_eq!(profile.get(MacroCategory::HealthWellbeing), 60);
        assert_eq!(profile.get(MacroCategory::SocialEmotional), 20);
    }

    #[test]
    fn trend_is_capped_and_chronological() {
        // newest first: record 14 is the most recent
        let records: Vec<AssessmentRecord> = (0..15)
            .rev()
            .map(|i| record("quiz", i as f64, i, FineSubtotals::new()))
            .collect();

        let trend = trend_series(&records, DEFAULT_TREND_LIMIT);
        assert_eq!(trend.len(), 10);
        let scores: Vec<f64> = trend.iter().map(|p| p.total_score).collect();
        assert_eq!(scores, (5..15).map(|i| i as f64).collect::<Vec<_>>());
        let ordinals: Vec<usize> = trend.iter().map(|p| p.ordinal).collect();
        assert_eq!(ordinals, (1..=10).collect::<Vec<_>>());
        assert!(trend.windows(2).all(|w| w[0].recorded_at < w[1].recorded_at));
        assert_eq!(trend[0].label, "1st");
    }

    #[test]
    fn ordinal_labels() {
        let labels: Vec<String> = [1, 2, 3, 4, 11, 12, 13, 21, 22, 101]
            .into_iter()
            .map(ordinal_label)
            .collect();
        assert_eq!(
            labels,
            vec!["1st", "2nd", "3rd", "4th", "11th", "12th", "13th", "21st", "22nd", "101st"]
        );
    }

    #[test]
    fn category_keys_roundtrip() {
        for category in MacroCategory::ALL {
            assert_eq!(category.key().parse::<MacroCategory>().unwrap(), category);
        }
        assert!("academics".parse::<MacroCategory>().is_err());
    }
}
