use crate::filter::FilteredView;
use crate::models::Tagged;
use crate::reports::cost_by_tagged;

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub tagged: Tagged,
    pub before: f64,
    pub after: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CostComparison {
    pub rows: Vec<ComparisonRow>,
}

/// Cost per Tagged status before and after remediation, joined on the status.
/// A status absent on one side reads as zero there.
pub fn compare(before: &FilteredView, after: &FilteredView) -> CostComparison {
    let before = cost_by_tagged(before);
    let after = cost_by_tagged(after);
    let rows = Tagged::ALL
        .iter()
        .filter_map(|t| {
            let b = before.iter().find(|c| c.tagged == *t);
            let a = after.iter().find(|c| c.tagged == *t);
            if b.is_none() && a.is_none() {
                return None;
            }
            Some(ComparisonRow {
                tagged: *t,
                before: b.map_or(0.0, |c| c.total),
                after: a.map_or(0.0, |c| c.total),
            })
        })
        .collect();
    CostComparison { rows }
}
