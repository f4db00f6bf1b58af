use std::collections::BTreeMap;

use crate::filter::FilteredView;
use crate::fmt::round2;
use crate::models::{Column, ResourceRecord, TagField, Tagged};

// ---------------------------------------------------------------------------
// Grouping helpers
// ---------------------------------------------------------------------------

/// Cost summed per key. Rows with a missing key are dropped; missing costs add
/// nothing but still create their group.
fn sum_by<'a, F>(records: &[&'a ResourceRecord], key: F) -> BTreeMap<&'a str, f64>
where
    F: Fn(&'a ResourceRecord) -> Option<&'a str>,
{
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for &r in records {
        if let Some(k) = key(r) {
            *totals.entry(k).or_default() += r.cost();
        }
    }
    totals
}

/// Largest total; ties go to the first key in order.
fn max_group(totals: BTreeMap<&str, f64>) -> Option<GroupCost> {
    let mut best: Option<GroupCost> = None;
    for (name, total) in totals {
        if best.as_ref().map_or(true, |b| total > b.total) {
            best = Some(GroupCost {
                name: name.to_string(),
                total,
            });
        }
    }
    best
}

fn pct_of(part: f64, whole: f64) -> f64 {
    if whole != 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Data exploration
// ---------------------------------------------------------------------------

pub struct MissingCount {
    pub column: Column,
    pub missing: usize,
}

pub fn missing_values(view: &FilteredView) -> Vec<MissingCount> {
    let mut counts: Vec<MissingCount> = Column::ALL
        .iter()
        .map(|c| MissingCount {
            column: *c,
            missing: view.records.iter().filter(|r| r.is_missing(*c)).count(),
        })
        .collect();
    counts.sort_by(|a, b| b.missing.cmp(&a.missing));
    counts
}

#[derive(Debug, Clone, PartialEq)]
pub struct TagSummary {
    pub total: usize,
    pub tagged: usize,
    pub untagged: usize,
    /// Rows whose Tagged value is neither Yes nor No.
    pub unknown: usize,
    pub pct_untagged: f64,
}

pub fn tag_summary(view: &FilteredView) -> TagSummary {
    let total = view.len();
    let tagged = view.records.iter().filter(|r| r.tagged == Tagged::Yes).count();
    let untagged = view.records.iter().filter(|r| r.tagged == Tagged::No).count();
    TagSummary {
        total,
        tagged,
        untagged,
        unknown: total - tagged - untagged,
        pct_untagged: pct_of(untagged as f64, total as f64),
    }
}

/// First `n` rows of the view with their row identity.
pub fn preview<'a>(view: &FilteredView<'a>, n: usize) -> Vec<(usize, &'a ResourceRecord)> {
    view.rows().take(n).collect()
}

// ---------------------------------------------------------------------------
// Cost visibility
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct GroupCost {
    pub name: String,
    pub total: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaggedCost {
    pub tagged: Tagged,
    pub total: f64,
}

pub fn cost_by_tagged(view: &FilteredView) -> Vec<TaggedCost> {
    let mut totals: BTreeMap<Tagged, f64> = BTreeMap::new();
    for r in view.records.iter().filter(|r| r.tagged != Tagged::Unknown) {
        *totals.entry(r.tagged).or_default() += r.cost();
    }
    totals
        .into_iter()
        .map(|(tagged, total)| TaggedCost { tagged, total })
        .collect()
}

pub fn top_untagged_department(view: &FilteredView) -> Option<GroupCost> {
    let untagged: Vec<&ResourceRecord> = view
        .records
        .iter()
        .copied()
        .filter(|r| r.tagged == Tagged::No)
        .collect();
    max_group(sum_by(&untagged, |r| r.department.as_deref()))
}

pub fn top_cost_project(view: &FilteredView) -> Option<GroupCost> {
    max_group(sum_by(&view.records, |r| r.project.as_deref()))
}

pub struct EnvironmentCost {
    pub environment: String,
    pub tagged_cost: f64,
    pub untagged_cost: f64,
    pub total: f64,
    pub pct_untagged: f64,
}

pub fn environment_breakdown(view: &FilteredView) -> Vec<EnvironmentCost> {
    split_by_tagged(view, |r| r.environment.as_deref())
        .into_iter()
        .map(|(environment, (tagged_cost, untagged_cost))| {
            let total = tagged_cost + untagged_cost;
            EnvironmentCost {
                environment: environment.to_string(),
                tagged_cost,
                untagged_cost,
                total,
                pct_untagged: round2(pct_of(untagged_cost, total)),
            }
        })
        .collect()
}

/// (tagged cost, untagged cost) per key.
fn split_by_tagged<'a, F>(view: &FilteredView<'a>, key: F) -> BTreeMap<&'a str, (f64, f64)>
where
    F: Fn(&'a ResourceRecord) -> Option<&'a str>,
{
    let mut totals: BTreeMap<&str, (f64, f64)> = BTreeMap::new();
    for &r in &view.records {
        let Some(k) = key(r) else { continue };
        match r.tagged {
            Tagged::Yes => totals.entry(k).or_default().0 += r.cost(),
            Tagged::No => totals.entry(k).or_default().1 += r.cost(),
            Tagged::Unknown => {}
        }
    }
    totals
}

// ---------------------------------------------------------------------------
// Tagging compliance
// ---------------------------------------------------------------------------

pub struct CompletenessRow<'a> {
    pub row: usize,
    pub record: &'a ResourceRecord,
    pub score: u8,
    pub pct: f64,
}

pub fn completeness_pct(score: u8) -> f64 {
    round2(score as f64 / TagField::ALL.len() as f64 * 100.0)
}

pub fn tag_completeness<'a>(view: &FilteredView<'a>) -> Vec<CompletenessRow<'a>> {
    view.rows()
        .map(|(row, record)| {
            let score = record.completeness_score();
            CompletenessRow {
                row,
                record,
                score,
                pct: completeness_pct(score),
            }
        })
        .collect()
}

/// The `n` rows with the lowest score; ties keep original row order.
pub fn lowest_completeness<'a>(view: &FilteredView<'a>, n: usize) -> Vec<CompletenessRow<'a>> {
    let mut rows = tag_completeness(view);
    rows.sort_by_key(|r| r.score);
    rows.truncate(n);
    rows
}

pub fn missing_tag_fields(view: &FilteredView) -> Vec<(TagField, usize)> {
    let mut counts: Vec<(TagField, usize)> = TagField::ALL
        .iter()
        .map(|f| (*f, view.records.iter().filter(|r| r.tag(*f).is_none()).count()))
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

pub fn untagged_resources<'a>(view: &FilteredView<'a>) -> Vec<(usize, &'a ResourceRecord)> {
    view.rows().filter(|(_, r)| r.tagged == Tagged::No).collect()
}

// ---------------------------------------------------------------------------
// Chart feeds
// ---------------------------------------------------------------------------

/// Row counts per Tagged value, most frequent first.
pub fn tag_counts(view: &FilteredView) -> Vec<(Tagged, usize)> {
    let mut counts: Vec<(Tagged, usize)> = Tagged::ALL
        .iter()
        .map(|t| (*t, view.records.iter().filter(|r| r.tagged == *t).count()))
        .filter(|(_, n)| *n > 0)
        .collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}

/// Total cost per Service, ascending by value.
pub fn service_costs(view: &FilteredView) -> Vec<GroupCost> {
    let mut items: Vec<GroupCost> = sum_by(&view.records, |r| r.service.as_deref())
        .into_iter()
        .map(|(name, total)| GroupCost {
            name: name.to_string(),
            total,
        })
        .collect();
    items.sort_by(|a, b| a.total.total_cmp(&b.total));
    items
}

pub struct DepartmentTagCost {
    pub department: String,
    pub tagged: f64,
    pub untagged: f64,
}

pub fn department_tag_costs(view: &FilteredView) -> Vec<DepartmentTagCost> {
    split_by_tagged(view, |r| r.department.as_deref())
        .into_iter()
        .map(|(department, (tagged, untagged))| DepartmentTagCost {
            department: department.to_string(),
            tagged,
            untagged,
        })
        .collect()
}

pub fn environment_costs(view: &FilteredView) -> Vec<GroupCost> {
    sum_by(&view.records, |r| r.environment.as_deref())
        .into_iter()
        .map(|(name, total)| GroupCost {
            name: name.to_string(),
            total,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{apply, FilterSet, Selection};
    use crate::models::Dataset;

    fn rec(
        dept: Option<&str>,
        project: Option<&str>,
        owner: Option<&str>,
        env: &str,
        tagged: Tagged,
        cost: Option<f64>,
    ) -> ResourceRecord {
        ResourceRecord {
            account_id: Some("1001".into()),
            resource_id: Some("r".into()),
            service: Some("EC2".into()),
            region: Some("us-east-1".into()),
            department: dept.map(Into::into),
            project: project.map(Into::into),
            owner: owner.map(Into::into),
            environment: Some(env.into()),
            tagged,
            monthly_cost_usd: cost,
        }
    }

    fn sample() -> Dataset {
        Dataset::new(vec![
            rec(Some("Finance"), Some("Atlas"), Some("ana"), "Prod", Tagged::Yes, Some(100.0)),
            rec(Some("Finance"), Some("Atlas"), None, "Prod", Tagged::No, Some(10.5)),
            rec(Some("Ops"), Some("Nova"), None, "Dev", Tagged::No, Some(20.25)),
            rec(Some("Ops"), Some("Nova"), Some("bo"), "Dev", Tagged::No, None),
            rec(Some("Ops"), Some("Nova"), Some("cy"), "Test", Tagged::Yes, Some(50.0)),
        ])
    }

    #[test]
    fn test_tag_summary_counts_add_up() {
        let ds = sample();
        let s = tag_summary(&FilteredView::full(&ds));
        assert_eq!(s.total, 5);
        assert_eq!(s.tagged + s.untagged, s.total);
        assert_eq!(s.untagged, 3);
        assert_eq!(s.pct_untagged, 60.0);
    }

    #[test]
    fn test_unknown_tagged_counts_as_neither() {
        let mut ds = sample();
        ds.records[0].tagged = Tagged::Unknown;
        let view = FilteredView::full(&ds);
        let s = tag_summary(&view);
        assert_eq!(s.total, 5);
        assert_eq!(s.unknown, 1);
        assert_eq!(s.tagged + s.untagged + s.unknown, s.total);
        assert!(cost_by_tagged(&view).iter().all(|c| c.tagged != Tagged::Unknown));
        assert!(tag_counts(&view).iter().all(|(t, _)| *t != Tagged::Unknown));
    }

    #[test]
    fn test_tag_summary_empty_view_is_zero() {
        let ds = sample();
        let filters = FilterSet {
            region: Selection::only(Vec::<String>::new()),
            ..Default::default()
        };
        let s = tag_summary(&apply(&ds, &filters));
        assert_eq!((s.total, s.tagged, s.untagged), (0, 0, 0));
        assert_eq!(s.pct_untagged, 0.0);
    }

    #[test]
    fn test_cost_by_tagged_skips_missing_costs() {
        let ds = sample();
        let costs = cost_by_tagged(&FilteredView::full(&ds));
        assert_eq!(costs.len(), 2);
        assert_eq!(costs[0].tagged, Tagged::No);
        assert_eq!(costs[0].total, 30.75);
        assert_eq!(costs[1].total, 150.0);
    }

    #[test]
    fn test_top_untagged_department_and_project() {
        let ds = sample();
        let view = FilteredView::full(&ds);
        let dept = top_untagged_department(&view).unwrap();
        assert_eq!(dept.name, "Ops");
        assert_eq!(dept.total, 20.25);
        let project = top_cost_project(&view).unwrap();
        assert_eq!(project.name, "Atlas");
        assert_eq!(project.total, 110.5);
    }

    #[test]
    fn test_max_group_tie_goes_to_first_key() {
        let mut totals = BTreeMap::new();
        totals.insert("b", 5.0);
        totals.insert("a", 5.0);
        assert_eq!(max_group(totals).unwrap().name, "a");
        assert!(max_group(BTreeMap::new()).is_none());
    }

    #[test]
    fn test_environment_breakdown() {
        let ds = sample();
        let rows = environment_breakdown(&FilteredView::full(&ds));
        let names: Vec<&str> = rows.iter().map(|r| r.environment.as_str()).collect();
        assert_eq!(names, vec!["Dev", "Prod", "Test"]);
        let dev = &rows[0];
        assert_eq!(dev.tagged_cost, 0.0);
        assert_eq!(dev.untagged_cost, 20.25);
        assert_eq!(dev.pct_untagged, 100.0);
        let prod = &rows[1];
        assert_eq!(prod.total, 110.5);
        assert_eq!(prod.pct_untagged, 9.5);
    }

    #[test]
    fn test_environment_breakdown_zero_total_guarded() {
        let ds = Dataset::new(vec![rec(None, None, None, "Dev", Tagged::No, None)]);
        let rows = environment_breakdown(&FilteredView::full(&ds));
        assert_eq!(rows[0].total, 0.0);
        assert_eq!(rows[0].pct_untagged, 0.0);
    }

    #[test]
    fn test_completeness_scores_in_range() {
        let ds = sample();
        for row in tag_completeness(&FilteredView::full(&ds)) {
            assert!(row.score <= 3);
            assert_eq!(row.pct, completeness_pct(row.score));
        }
        assert_eq!(completeness_pct(0), 0.0);
        assert_eq!(completeness_pct(1), 33.33);
        assert_eq!(completeness_pct(2), 66.67);
        assert_eq!(completeness_pct(3), 100.0);
    }

    #[test]
    fn test_lowest_completeness_ties_keep_row_order() {
        let ds = sample();
        let rows = lowest_completeness(&FilteredView::full(&ds), 2);
        let ids: Vec<usize> = rows.iter().map(|r| r.row).collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn test_missing_values_sorted_descending() {
        let ds = sample();
        let counts = missing_values(&FilteredView::full(&ds));
        assert_eq!(counts.len(), 10);
        assert_eq!(counts[0].column, Column::Owner);
        assert_eq!(counts[0].missing, 2);
        assert_eq!(counts[1].column, Column::MonthlyCostUsd);
        assert!(counts.windows(2).all(|w| w[0].missing >= w[1].missing));
    }

    #[test]
    fn test_missing_tag_fields() {
        let ds = sample();
        let counts = missing_tag_fields(&FilteredView::full(&ds));
        assert_eq!(counts[0], (TagField::Owner, 2));
        assert_eq!(counts[1].1, 0);
    }

    #[test]
    fn test_chart_feeds() {
        let ds = sample();
        let view = FilteredView::full(&ds);
        assert_eq!(tag_counts(&view), vec![(Tagged::No, 3), (Tagged::Yes, 2)]);
        let deps = department_tag_costs(&view);
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].department, "Finance");
        assert_eq!((deps[0].tagged, deps[0].untagged), (100.0, 10.5));
        let envs = environment_costs(&view);
        assert_eq!(envs.iter().map(|g| g.total).sum::<f64>(), 180.75);
    }

    #[test]
    fn test_service_costs_ascending() {
        let mut ds = sample();
        ds.records[0].service = Some("S3".into());
        let items = service_costs(&FilteredView::full(&ds));
        assert_eq!(items[0].name, "EC2");
        assert_eq!(items[1].name, "S3");
        assert!(items[0].total <= items[1].total);
    }

    #[test]
    fn test_grouped_sums_are_order_independent() {
        let ds = sample();
        let mut reversed = ds.clone();
        reversed.records.reverse();
        let a = department_tag_costs(&FilteredView::full(&ds));
        let b = department_tag_costs(&FilteredView::full(&reversed));
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.department, y.department);
            assert_eq!(x.tagged, y.tagged);
            assert_eq!(x.untagged, y.untagged);
        }
        assert_eq!(
            cost_by_tagged(&FilteredView::full(&ds)),
            cost_by_tagged(&FilteredView::full(&reversed))
        );
    }

    #[test]
    fn test_untagged_resources_and_preview() {
        let ds = sample();
        let view = FilteredView::full(&ds);
        let rows: Vec<usize> = untagged_resources(&view).iter().map(|(i, _)| *i).collect();
        assert_eq!(rows, vec![1, 2, 3]);
        assert_eq!(preview(&view, 2).len(), 2);
        assert_eq!(preview(&view, 50).len(), 5);
    }
}
