//! Aligning start offsets and folding charts into a duet.
//!
//! Two charts of the same song often disagree on `GAP`, the millisecond
//! offset from track start to the first beat. Their notes still line up
//! musically, so the later-starting chart can adopt the earlier `GAP` by
//! shifting every note forward a whole number of quarter-beat units. When no
//! whole-unit shift exists the merge fails instead of drifting.

use thiserror::Error;

use super::{
    Result,
    model::{Chart, Headers, Performers},
};

/// Milliseconds per minute, for tempo conversion.
const MS_PER_MINUTE: f64 = 60_000.0;
/// Note start times are quarter-beat units.
const UNITS_PER_BEAT: f64 = 4.0;
/// Largest tolerated relative rounding error when converting a `GAP` delta
/// into whole units. Anything above it would be an audible drift.
const GAP_TOLERANCE: f64 = 0.0001;

/// A merge precondition that did not hold.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MergeError {
    /// Promotion target already has numbered performer sections.
    #[error("chart already has player sections")]
    AlreadyDuet,
    /// The merge target must be promoted to a duet first.
    #[error("merge target has no player sections yet")]
    SoloTarget,
    /// The merge source must be a single-player chart.
    #[error("merge source already has player sections")]
    DuetSource,
    /// At least one chart is needed to start a fold.
    #[error("no charts to merge")]
    NoCharts,
    /// A header other than the overridden ones differs between the charts.
    #[error("header `{key}` differs between charts: `{ours}` vs `{}`", theirs.as_deref().unwrap_or("(absent)"))]
    HeaderMismatch {
        /// The disagreeing key.
        key: String,
        /// The merge target's value.
        ours: String,
        /// The merge source's value, if it has one at all.
        theirs: Option<String>,
    },
    /// A numeric header failed to parse as a decimal.
    #[error("header `{key}` is not a decimal number: `{value}`")]
    BadNumericHeader {
        /// The header key.
        key: String,
        /// The raw value.
        value: String,
    },
    /// The `GAP` difference is not a whole number of quarter-beat units, so
    /// aligning the charts would require finer tempo resolution.
    #[error("incompatible GAP values: the offset is {beats} quarter-beats, not a whole shift")]
    IncompatibleGap {
        /// The offset expressed in quarter-beat units.
        beats: f64,
    },
    /// Relative-timing charts encode deltas between lines and cannot be
    /// shifted uniformly.
    #[error("cannot shift a chart with relative timing")]
    RelativeChart,
    /// The shift would move a note before the start of the track.
    #[error("shifting by {offset} units moves a note starting at {start} to a negative time")]
    NegativeStart {
        /// The attempted shift in quarter-beat units.
        offset: i64,
        /// The start time that would go negative.
        start: i64,
    },
}

/// Makes both charts agree on one `GAP` value with no change to perceived
/// timing. The chart with the larger `GAP` is aligned toward the smaller;
/// equal values are a no-op, so reconciling twice is idempotent.
///
/// # Errors
///
/// Returns a [`MergeError`] when the offset cannot be expressed as a whole
/// quarter-beat shift, or when the shifted chart uses relative timing, and
/// propagates any failure of the shift itself.
pub fn reconcile_gaps(a: &mut Chart, b: &mut Chart) -> Result<()> {
    let gap_a = a.numeric_header("GAP", 0.0)?;
    let gap_b = b.numeric_header("GAP", 0.0)?;
    if gap_a > gap_b {
        align_to(a, gap_b)
    } else if gap_b > gap_a {
        align_to(b, gap_a)
    } else {
        Ok(())
    }
}

/// Shifts `chart` so that its `GAP` header can become `target` without
/// moving any note relative to the audio track.
#[allow(clippy::float_cmp)] // an exactly zero beat count means no shift at all
fn align_to(chart: &mut Chart, target: f64) -> Result<()> {
    let gap = chart.numeric_header("GAP", 0.0)?;
    let bpm = chart.numeric_header("BPM", 0.0)?;
    let delta = gap - target;
    let beats = delta / MS_PER_MINUTE * bpm * UNITS_PER_BEAT;
    if beats == 0.0 {
        return Ok(());
    }
    let rounded = beats.round();
    if rounded == 0.0 {
        return Err(MergeError::IncompatibleGap { beats }.into());
    }
    let error = f64::max(beats / rounded, rounded / beats) - 1.0;
    if error >= GAP_TOLERANCE {
        return Err(MergeError::IncompatibleGap { beats }.into());
    }
    if chart.is_relative() {
        return Err(MergeError::RelativeChart.into());
    }
    chart.shift_notes(rounded as i64)?;
    chart.set_numeric_header("GAP", target);
    Ok(())
}

impl Chart {
    /// Folds `other` into `self` as the next performer.
    ///
    /// `self` must already hold player sections (the fold promotes its first
    /// chart) and `other` must be single-player. After gap reconciliation,
    /// every header of `self` not named by `overrides` must be carried by
    /// `other` with an equal value; keys only `other` has are ignored. The
    /// newcomer's lines land at the next free player number, then
    /// `overrides` are applied onto `self`'s headers.
    ///
    /// A header mismatch leaves `self`'s headers untouched.
    ///
    /// # Errors
    ///
    /// Returns a [`MergeError`] on any failed precondition and propagates
    /// reconciliation failures.
    pub fn merge(&mut self, mut other: Self, overrides: &Headers) -> Result<()> {
        if matches!(other.performers, Performers::Duet(_)) {
            return Err(MergeError::DuetSource.into());
        }
        if matches!(self.performers, Performers::Solo(_)) {
            return Err(MergeError::SoloTarget.into());
        }
        reconcile_gaps(self, &mut other)?;

        for (key, ours) in self.headers.iter() {
            if overrides.contains(key) {
                continue;
            }
            let theirs = other.headers.get(key);
            if theirs != Some(ours) {
                return Err(MergeError::HeaderMismatch {
                    key: key.into(),
                    ours: ours.into(),
                    theirs: theirs.map(Into::into),
                }
                .into());
            }
        }

        let next = self.max_player_id() + 1;
        let Performers::Solo(lines) = other.performers else {
            return Err(MergeError::DuetSource.into());
        };
        let Performers::Duet(sections) = &mut self.performers else {
            return Err(MergeError::SoloTarget.into());
        };
        sections.insert(next, lines);

        for (key, value) in overrides.iter() {
            self.headers.set(key, value);
        }
        Ok(())
    }
}

/// Merges parsed charts left to right into one duet chart: the first chart
/// becomes performer 1, each later chart takes the next free number.
///
/// # Errors
///
/// Returns [`MergeError::NoCharts`] on an empty input and propagates any
/// promotion or merge failure.
pub fn merge_all(charts: impl IntoIterator<Item = Chart>, overrides: &Headers) -> Result<Chart> {
    let mut charts = charts.into_iter();
    let Some(mut target) = charts.next() else {
        return Err(MergeError::NoCharts.into());
    };
    target.promote_to_duet()?;
    for chart in charts {
        target.merge(chart, overrides)?;
    }
    Ok(target)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{Chart, Headers, MergeError, merge_all, reconcile_gaps};
    use crate::txt::TxtError;

    fn chart(source: &str) -> Chart {
        Chart::parse(source).unwrap()
    }

    #[test]
    fn equal_gaps_are_a_no_op() {
        let source = "#BPM:120\n#GAP:1000\n: 0 2 5 la\nE\n";
        let mut a = chart(source);
        let mut b = chart(source);
        let (a0, b0) = (a.clone(), b.clone());

        reconcile_gaps(&mut a, &mut b).unwrap();
        assert_eq!(a, a0);
        assert_eq!(b, b0);
    }

    #[test]
    fn half_second_at_120_bpm_is_four_units() {
        let mut a = chart("#BPM:120\n#GAP:1000\n: 0 2 5 la\nE\n");
        let mut b = chart("#BPM:120\n#GAP:1500\n: 0 2 9 ooh\n: 2 2 9 aah\nE\n");

        reconcile_gaps(&mut a, &mut b).unwrap();
        assert_eq!(b.headers.get("GAP"), Some("1000"));
        assert_eq!(
            b.note_lines().map(|l| l.render()).collect::<Vec<_>>(),
            vec![": 4 2 9 ooh", ": 6 2 9 aah"]
        );
        // The earlier-starting chart is untouched.
        assert_eq!(a.headers.get("GAP"), Some("1000"));
        assert_eq!(a.note_lines().next().unwrap().render(), ": 0 2 5 la");

        // Reconciling again changes nothing.
        let (a1, b1) = (a.clone(), b.clone());
        reconcile_gaps(&mut a, &mut b).unwrap();
        assert_eq!(a, a1);
        assert_eq!(b, b1);
    }

    #[test]
    fn fractional_unit_offset_is_incompatible() {
        // 100 ms at 99 BPM is 0.66 quarter-beats: no whole shift exists.
        let mut a = chart("#BPM:99\n#GAP:1000\n: 0 2 5 la\nE\n");
        let mut b = chart("#BPM:99\n#GAP:1100\n: 0 2 9 ooh\nE\n");

        assert!(matches!(
            reconcile_gaps(&mut a, &mut b),
            Err(TxtError::Merge(MergeError::IncompatibleGap { .. }))
        ));
    }

    #[test]
    fn tiny_offset_rounding_to_zero_is_incompatible() {
        let mut a = chart("#BPM:120\n#GAP:1000\n: 0 2 5 la\nE\n");
        let mut b = chart("#BPM:120\n#GAP:1010\n: 0 2 9 ooh\nE\n");

        assert!(matches!(
            reconcile_gaps(&mut a, &mut b),
            Err(TxtError::Merge(MergeError::IncompatibleGap { .. }))
        ));
    }

    #[test]
    fn relative_chart_refuses_to_shift() {
        let mut a = chart("#BPM:120\n#GAP:1000\n: 0 2 5 la\nE\n");
        let mut b = chart("#BPM:120\n#GAP:1500\n#RELATIVE:YES\n: 0 2 9 ooh\nE\n");

        assert_eq!(
            reconcile_gaps(&mut a, &mut b),
            Err(TxtError::Merge(MergeError::RelativeChart))
        );

        // With equal gaps the relative chart never needs a shift.
        let mut c = chart("#BPM:120\n#GAP:1000\n#RELATIVE:YES\n: 0 2 9 ooh\nE\n");
        reconcile_gaps(&mut a, &mut c).unwrap();
    }

    #[test]
    fn merge_builds_performer_sections_in_order() {
        let lead = chart("#TITLE:Duo (Lead)\n#BPM:120\n#GAP:1000\n: 0 2 5 la\nE\n");
        let harmony = chart("#TITLE:Duo (Harmony)\n#BPM:120\n#GAP:1500\n: 0 2 9 ooh\nE\n");
        let overrides: Headers = [("TITLE", "Duo (Duet)")].into_iter().collect();

        let duet = merge_all([lead, harmony], &overrides).unwrap();
        assert_eq!(duet.title(), Some("Duo (Duet)"));
        assert_eq!(duet.max_player_id(), 2);
        assert_eq!(duet.headers.get("GAP"), Some("1000"));
        assert_eq!(
            duet.note_lines().map(|l| l.render()).collect::<Vec<_>>(),
            vec![": 0 2 5 la", ": 4 2 9 ooh"]
        );
    }

    #[test]
    fn mismatched_header_fails_without_touching_the_target() {
        let mut target = chart("#TITLE:Same\n#ARTIST:Us\n#BPM:120\n#GAP:1000\n: 0 2 5 la\nE\n");
        target.promote_to_duet().unwrap();
        let other = chart("#TITLE:Same\n#ARTIST:Them\n#BPM:120\n#GAP:1000\n: 0 2 9 ooh\nE\n");
        let before = target.clone();

        let result = target.merge(other, &Headers::default());
        assert_eq!(
            result,
            Err(TxtError::Merge(MergeError::HeaderMismatch {
                key: "ARTIST".into(),
                ours: "Us".into(),
                theirs: Some("Them".into()),
            }))
        );
        assert_eq!(target, before);
    }

    #[test]
    fn header_missing_from_source_fails_too() {
        let mut target = chart("#TITLE:Same\n#EDITION:Gold\n#BPM:120\n#GAP:0\n: 0 2 5 la\nE\n");
        target.promote_to_duet().unwrap();
        let other = chart("#TITLE:Same\n#BPM:120\n#GAP:0\n: 0 2 9 ooh\nE\n");

        assert_eq!(
            target.merge(other, &Headers::default()),
            Err(TxtError::Merge(MergeError::HeaderMismatch {
                key: "EDITION".into(),
                ours: "Gold".into(),
                theirs: None,
            }))
        );
    }

    #[test]
    fn extra_source_headers_are_ignored() {
        let mut target = chart("#BPM:120\n#GAP:0\n: 0 2 5 la\nE\n");
        target.promote_to_duet().unwrap();
        let other = chart("#BPM:120\n#GAP:0\n#CREATOR:them\n: 0 2 9 ooh\nE\n");

        target.merge(other, &Headers::default()).unwrap();
        assert!(!target.headers.contains("CREATOR"));
    }

    #[test]
    fn merge_rejects_wrongly_shaped_charts() {
        let solo = chart("#BPM:120\n#GAP:0\n: 0 2 5 la\nE\n");
        let sectioned = chart("#BPM:120\n#GAP:0\nP1\n: 0 2 9 ooh\nE\n");

        let mut target = solo.clone();
        assert_eq!(
            target.merge(sectioned.clone(), &Headers::default()),
            Err(TxtError::Merge(MergeError::DuetSource))
        );
        assert_eq!(
            target.merge(solo, &Headers::default()),
            Err(TxtError::Merge(MergeError::SoloTarget))
        );
        assert_eq!(
            merge_all([], &Headers::default()),
            Err(TxtError::Merge(MergeError::NoCharts))
        );
    }

    #[test]
    fn player_numbers_continue_after_gaps() {
        let mut target = chart("#BPM:120\n#GAP:0\nP1\n: 0 2 5 la\nP4\n: 2 2 5 li\nE\n");
        let other = chart("#BPM:120\n#GAP:0\n: 0 2 9 ooh\nE\n");

        target.merge(other, &Headers::default()).unwrap();
        assert_eq!(target.max_player_id(), 5);
    }
}
