//! The combined per-day quality snapshot shown on the dashboard header.

use chrono::NaiveDate;
use playlens_core::{
  calendar::ReportingCalendar,
  content::ContentItem,
  session::{Round, Session},
};
use serde::{Deserialize, Serialize};

use crate::{
  coverage::{self, CoverageReport},
  exposure::{self, ExposureReport, ExposureStats},
  repetition::{self, RepetitionReport},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
  pub reference_date:          NaiveDate,
  pub anti_repetition_rate:    f64,
  pub no_repeat_sessions:      usize,
  pub total_sessions:          usize,
  pub live_content_compliance: f64,
  pub content_coverage:        f64,
  pub daily_seen_average:      u64,
  /// Number of items at or above the overexposure threshold.
  pub overexposed_items:       usize,
  pub exposure:                ExposureStats,
}

impl QualityMetrics {
  pub fn combine(
    reference_date: NaiveDate,
    exposure: &ExposureReport,
    repetition: &RepetitionReport,
    coverage: &CoverageReport,
  ) -> Self {
    Self {
      reference_date,
      anti_repetition_rate: repetition.anti_repetition_rate,
      no_repeat_sessions: repetition.no_repeat_sessions,
      total_sessions: repetition.total_sessions,
      live_content_compliance: coverage.live_content_compliance,
      content_coverage: coverage.content_coverage,
      daily_seen_average: coverage.daily_seen_average,
      overexposed_items: exposure.overexposed_items.len(),
      exposure: exposure.stats.clone(),
    }
  }
}

/// Run the exposure, repetition and coverage calculators over one local day.
///
/// `sessions` must contain the sessions started that day as well as every
/// session referenced by `rounds`.
pub fn compute(
  calendar:       &ReportingCalendar,
  reference_date: NaiveDate,
  catalog:        &[ContentItem],
  sessions:       &[Session],
  rounds:         &[Round],
  threshold:      u32,
) -> QualityMetrics {
  let day = calendar.day_window(reference_date);
  let exposure = exposure::aggregate(sessions, rounds, day, threshold);
  let repetition = repetition::compute(sessions, rounds, day);
  let coverage = coverage::compute(catalog, sessions, rounds, day);
  QualityMetrics::combine(reference_date, &exposure, &repetition, &coverage)
}
