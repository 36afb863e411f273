use crate::calc::PerformanceSummary;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankMetric {
    #[default]
    Percentage,
    TotalObtained,
}

impl RankMetric {
    pub fn as_str(self) -> &'static str {
        match self {
            RankMetric::Percentage => "percentage",
            RankMetric::TotalObtained => "totalObtained",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "percentage" | "p" => Some(RankMetric::Percentage),
            "totalobtained" | "total_obtained" | "total" | "t" => Some(RankMetric::TotalObtained),
            _ => None,
        }
    }

    /// Missing percentages (no marks) sort after every real value.
    fn compare_desc(self, a: &PerformanceSummary, b: &PerformanceSummary) -> Ordering {
        match self {
            RankMetric::TotalObtained => b.total_obtained.cmp(&a.total_obtained),
            RankMetric::Percentage => match (a.percentage, b.percentage) {
                (Some(x), Some(y)) => y.total_cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedSummary {
    pub rank: usize,
    #[serde(flatten)]
    pub summary: PerformanceSummary,
}

/// Competition ranking: tied values share a rank and the next value takes
/// its 1-based position, so `[90, 90, 80]` ranks `[1, 1, 3]`.
pub fn rank(summaries: &[PerformanceSummary], metric: RankMetric) -> Vec<RankedSummary> {
    let mut sorted: Vec<&PerformanceSummary> = summaries.iter().collect();
    // Stable: tied students keep their incoming (id) order.
    sorted.sort_by(|a, b| metric.compare_desc(a, b));

    let mut out: Vec<RankedSummary> = Vec::with_capacity(sorted.len());
    for (i, s) in sorted.into_iter().enumerate() {
        let rank = match out.last() {
            Some(prev) if metric.compare_desc(&prev.summary, s) == Ordering::Equal => prev.rank,
            _ => i + 1,
        };
        out.push(RankedSummary {
            rank,
            summary: s.clone(),
        });
    }
    out
}

/// First `n` rows of the ranking. A tie group straddling the cut is split.
pub fn top_n(summaries: &[PerformanceSummary], n: usize, metric: RankMetric) -> Vec<RankedSummary> {
    let mut ranked = rank(summaries, metric);
    ranked.truncate(n);
    ranked
}

/// Students with marks whose percentage is under `threshold`, worst first.
pub fn below_threshold(summaries: &[PerformanceSummary], threshold: f64) -> Vec<PerformanceSummary> {
    let mut failing: Vec<(f64, &PerformanceSummary)> = summaries
        .iter()
        .filter(|s| s.has_marks())
        .filter_map(|s| s.percentage.map(|p| (p, s)))
        .filter(|(p, _)| *p < threshold)
        .collect();
    failing.sort_by(|a, b| a.0.total_cmp(&b.0));
    failing.into_iter().map(|(_, s)| s.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::percentage;

    fn summary(id: i64, obtained: i64, max: i64) -> PerformanceSummary {
        PerformanceSummary {
            student_id: id,
            first_name: format!("S{}", id),
            last_name: "Test".to_string(),
            class_section: None,
            subject_count: if max > 0 { 1 } else { 0 },
            total_obtained: obtained,
            total_max: max,
            percentage: percentage(obtained, max),
        }
    }

    fn ranks(rows: &[RankedSummary]) -> Vec<usize> {
        rows.iter().map(|r| r.rank).collect()
    }

    fn ids(rows: &[RankedSummary]) -> Vec<i64> {
        rows.iter().map(|r| r.summary.student_id).collect()
    }

    #[test]
    fn ties_share_rank_and_next_rank_skips() {
        let rows = vec![summary(1, 80, 100), summary(2, 90, 100), summary(3, 90, 100)];
        let ranked = rank(&rows, RankMetric::Percentage);
        assert_eq!(ranks(&ranked), vec![1, 1, 3]);
        assert_eq!(ids(&ranked), vec![2, 3, 1]);
    }

    #[test]
    fn empty_input_ranks_to_empty_output() {
        assert!(rank(&[], RankMetric::Percentage).is_empty());
        assert!(top_n(&[], 3, RankMetric::TotalObtained).is_empty());
        assert!(below_threshold(&[], 40.0).is_empty());
    }

    #[test]
    fn top_n_keeps_both_leaders() {
        let rows = vec![
            summary(1, 70, 100),
            summary(2, 90, 100),
            summary(3, 80, 100),
            summary(4, 90, 100),
        ];
        let top = top_n(&rows, 2, RankMetric::Percentage);
        assert_eq!(ids(&top), vec![2, 4]);
        assert_eq!(ranks(&top), vec![1, 1]);
    }

    #[test]
    fn top_n_splits_tie_at_boundary() {
        let rows = vec![summary(1, 90, 100), summary(2, 80, 100), summary(3, 80, 100)];
        let top = top_n(&rows, 2, RankMetric::Percentage);
        assert_eq!(ids(&top), vec![1, 2]);
        assert_eq!(ranks(&top), vec![1, 2]);
    }

    #[test]
    fn total_metric_ignores_scale() {
        // 45/50 beats 80/100 on percentage but not on total.
        let rows = vec![summary(1, 45, 50), summary(2, 80, 100)];
        assert_eq!(ids(&rank(&rows, RankMetric::Percentage)), vec![1, 2]);
        assert_eq!(ids(&rank(&rows, RankMetric::TotalObtained)), vec![2, 1]);
    }

    #[test]
    fn unmarked_students_rank_last_together() {
        let rows = vec![summary(1, 0, 0), summary(2, 10, 100), summary(3, 0, 0)];
        let ranked = rank(&rows, RankMetric::Percentage);
        assert_eq!(ids(&ranked), vec![2, 1, 3]);
        assert_eq!(ranks(&ranked), vec![1, 2, 2]);
    }

    #[test]
    fn below_threshold_excludes_unmarked_and_sorts_worst_first() {
        let rows = vec![
            summary(1, 0, 0),
            summary(2, 35, 100),
            summary(3, 10, 100),
            summary(4, 40, 100),
            summary(5, 0, 50),
        ];
        let failing: Vec<i64> = below_threshold(&rows, 40.0)
            .into_iter()
            .map(|s| s.student_id)
            .collect();
        assert_eq!(failing, vec![5, 3, 2]);
    }

    #[test]
    fn metric_parse_accepts_short_forms() {
        assert_eq!(RankMetric::parse("t"), Some(RankMetric::TotalObtained));
        assert_eq!(RankMetric::parse("totalObtained"), Some(RankMetric::TotalObtained));
        assert_eq!(RankMetric::parse("Percentage"), Some(RankMetric::Percentage));
        assert_eq!(RankMetric::parse("median"), None);
    }

    #[test]
    fn ranked_rows_serialize_flat() {
        let ranked = rank(&[summary(1, 50, 100)], RankMetric::Percentage);
        let v = serde_json::to_value(&ranked[0]).expect("serialize");
        assert_eq!(v["rank"], 1);
        assert_eq!(v["studentId"], 1);
        assert_eq!(v["percentage"], 50.0);
    }
}
