//! One pass over the dataset for the current filters: the view, every panel's
//! aggregates and the chart data. Panels render from the returned `Dashboard`.

use tracing::debug;

use crate::charts::{self, Chart};
use crate::filter::{apply, FilterSet, FilteredView};
use crate::models::{Dataset, ResourceRecord, TagField};
use crate::reports::{self, CompletenessRow, EnvironmentCost, GroupCost, MissingCount, TagSummary, TaggedCost};
use crate::settings::Settings;

pub struct Dashboard<'a> {
    pub view: FilteredView<'a>,
    pub filters: String,
    // Exploration
    pub preview: Vec<(usize, &'a ResourceRecord)>,
    pub missing: Vec<MissingCount>,
    pub summary: TagSummary,
    // Cost visibility
    pub cost_by_tagged: Vec<TaggedCost>,
    pub top_untagged_department: Option<GroupCost>,
    pub top_cost_project: Option<GroupCost>,
    pub environments: Vec<EnvironmentCost>,
    // Tagging compliance
    pub completeness: Vec<CompletenessRow<'a>>,
    pub lowest: Vec<CompletenessRow<'a>>,
    pub missing_tags: Vec<(TagField, usize)>,
    pub untagged: Vec<(usize, &'a ResourceRecord)>,
    // Visualization
    pub charts: Vec<Chart>,
}

pub fn run<'a>(dataset: &'a Dataset, filters: &FilterSet, settings: &Settings) -> Dashboard<'a> {
    let view = apply(dataset, filters);
    debug!(rows = view.len(), filters = %filters.describe(), "running pipeline");

    let mut completeness = reports::tag_completeness(&view);
    let lowest = reports::lowest_completeness(&view, settings.lowest_completeness);
    completeness.truncate(settings.completeness_rows);

    Dashboard {
        preview: reports::preview(&view, settings.preview_rows),
        missing: reports::missing_values(&view),
        summary: reports::tag_summary(&view),
        cost_by_tagged: reports::cost_by_tagged(&view),
        top_untagged_department: reports::top_untagged_department(&view),
        top_cost_project: reports::top_cost_project(&view),
        environments: reports::environment_breakdown(&view),
        completeness,
        lowest,
        missing_tags: reports::missing_tag_fields(&view),
        untagged: reports::untagged_resources(&view),
        charts: chart_set(&view),
        filters: filters.describe(),
        view,
    }
}

/// The four visualization-panel charts in display order.
pub fn chart_set(view: &FilteredView) -> Vec<Chart> {
    vec![
        charts::tag_pie(&reports::tag_counts(view)),
        charts::service_cost_bars(&reports::service_costs(view)),
        charts::department_tag_bars(&reports::department_tag_costs(view)),
        charts::environment_cost_bars(&reports::environment_costs(view)),
    ]
}
