use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::charts::{BarChart, Chart};
use crate::compare::CostComparison;
use crate::fmt::{money, pct};
use crate::loader::LoadReport;
use crate::models::{Column, Dataset, ResourceRecord};
use crate::pipeline::Dashboard;
use crate::reports::{CompletenessRow, GroupCost};

const GOVERNANCE_NOTES: &[(&str, &[&str])] = &[
    (
        "How improved tagging helps accountability",
        &[
            "Clear ownership: every resource has a responsible person or team, so a cost spike or incident has someone to contact.",
            "Resource tracking: you can see which department or project uses which resources, so nothing is left orphaned.",
            "Policy enforcement: automated checks can read tags and alert on, or block, resources that lack them.",
        ],
    ),
    (
        "How improved tagging helps reporting",
        &[
            "Cost visibility: cloud spend breaks down by project, department or environment.",
            "Performance tracking: reports can show usage trends for individual teams or applications.",
            "Compliance and auditing: tags show who owns what and whether resources meet internal or regulatory policy.",
            "Decision-making: leadership can target high-spend projects or underused resources.",
        ],
    ),
    (
        "Recommendations for governance improvement",
        &[
            "Standardize tagging policies.",
            "Enforce tagging when resources are created.",
            "Integrate cost and tag reporting.",
        ],
    ),
];

fn heading(title: &str, filters: &str) -> String {
    format!("{}  ({})", title.bold(), filters.dimmed())
}

fn opt(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

fn cost_cell(record: &ResourceRecord) -> String {
    record.monthly_cost_usd.map(money).unwrap_or_default()
}

/// All ten columns, prefixed with the row number.
fn record_table<'a, I>(rows: I) -> Table
where
    I: IntoIterator<Item = (usize, &'a ResourceRecord)>,
{
    let mut table = Table::new();
    let mut header = vec!["Row"];
    header.extend(Column::ALL.iter().map(|c| c.header()));
    table.set_header(header);
    for (row, r) in rows {
        table.add_row(vec![
            Cell::new(row),
            Cell::new(opt(&r.account_id)),
            Cell::new(opt(&r.resource_id)),
            Cell::new(opt(&r.service)),
            Cell::new(opt(&r.region)),
            Cell::new(opt(&r.department)),
            Cell::new(opt(&r.project)),
            Cell::new(opt(&r.owner)),
            Cell::new(opt(&r.environment)),
            Cell::new(r.tagged.as_str()),
            Cell::new(cost_cell(r)),
        ]);
    }
    table
}

fn completeness_table(rows: &[CompletenessRow]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "Row",
        "ResourceID",
        "Department",
        "Project",
        "Owner",
        "Score",
        "Completeness %",
    ]);
    for r in rows {
        table.add_row(vec![
            Cell::new(r.row),
            Cell::new(opt(&r.record.resource_id)),
            Cell::new(opt(&r.record.department)),
            Cell::new(opt(&r.record.project)),
            Cell::new(opt(&r.record.owner)),
            Cell::new(r.score),
            Cell::new(pct(r.pct)),
        ]);
    }
    table
}

// ---------------------------------------------------------------------------
// Panels
// ---------------------------------------------------------------------------

pub fn format_explore(dash: &Dashboard, load: &LoadReport) -> String {
    let mut out = heading("Data Exploration", &dash.filters);

    if !load.unknown_columns.is_empty() {
        let cols = load.unknown_columns.join(", ");
        out.push_str(&format!("\n{} {cols}", "Ignored columns:".yellow()));
    }
    if load.unparseable_costs > 0 {
        out.push_str(&format!(
            "\n{} {} MonthlyCostUSD value(s) could not be read as numbers",
            "Note:".yellow(),
            load.unparseable_costs
        ));
    }

    if load.unrecognised_tagged > 0 {
        out.push_str(&format!(
            "\n{} {} Tagged value(s) were neither Yes nor No and count as neither",
            "Note:".yellow(),
            load.unrecognised_tagged
        ));
    }

    out.push_str(&format!(
        "\n\nFirst rows\n{}",
        record_table(dash.preview.iter().copied())
    ));

    let mut missing = Table::new();
    missing.set_header(vec!["Column", "Missing"]);
    for m in &dash.missing {
        missing.add_row(vec![Cell::new(m.column.header()), Cell::new(m.missing)]);
    }
    out.push_str(&format!("\n\nMissing values per column\n{missing}"));

    let s = &dash.summary;
    let mut summary = Table::new();
    summary.set_header(vec!["Total resources", "Tagged", "Untagged", "% Untagged"]);
    summary.add_row(vec![
        Cell::new(s.total),
        Cell::new(s.tagged),
        Cell::new(s.untagged),
        Cell::new(pct(s.pct_untagged)),
    ]);
    out.push_str(&format!("\n\nTagging summary\n{summary}"));
    out
}

pub fn format_costs(dash: &Dashboard) -> String {
    let mut out = heading("Cost Visibility", &dash.filters);

    let mut by_tag = Table::new();
    by_tag.set_header(vec!["Tagged", "Total Cost"]);
    for c in &dash.cost_by_tagged {
        by_tag.add_row(vec![Cell::new(c.tagged.as_str()), Cell::new(money(c.total))]);
    }
    out.push_str(&format!("\n\nTotal cost by tagging status\n{by_tag}"));

    let group_line = |label: &str, group: &Option<GroupCost>| match group {
        Some(g) => format!("\n{label}: {} ({})", g.name.bold(), money(g.total)),
        None => format!("\n{label}: {}", "none".dimmed()),
    };
    out.push('\n');
    out.push_str(&group_line(
        "Department with the most untagged cost",
        &dash.top_untagged_department,
    ));
    out.push_str(&group_line("Project with the highest total cost", &dash.top_cost_project));

    let mut env = Table::new();
    env.set_header(vec![
        "Environment",
        "Tagged Cost",
        "Untagged Cost",
        "Total",
        "% Untagged",
    ]);
    for e in &dash.environments {
        env.add_row(vec![
            Cell::new(&e.environment),
            Cell::new(money(e.tagged_cost)),
            Cell::new(money(e.untagged_cost)),
            Cell::new(money(e.total)),
            Cell::new(pct(e.pct_untagged)),
        ]);
    }
    out.push_str(&format!("\n\nCost by environment\n{env}"));
    out
}

pub fn format_compliance(dash: &Dashboard) -> String {
    let mut out = heading("Tagging Compliance", &dash.filters);
    out.push_str(&format!(
        "\n\nTag completeness (first {} rows)\n{}",
        dash.completeness.len(),
        completeness_table(&dash.completeness)
    ));
    out.push_str(&format!(
        "\n\nLowest completeness\n{}",
        completeness_table(&dash.lowest)
    ));

    let mut fields = Table::new();
    fields.set_header(vec!["Tag field", "Missing"]);
    for (field, n) in &dash.missing_tags {
        fields.add_row(vec![Cell::new(field.name()), Cell::new(n)]);
    }
    out.push_str(&format!("\n\nMost frequently missing tag fields\n{fields}"));

    out.push_str(&format!(
        "\n\nUntagged resources ({})\n{}",
        dash.untagged.len(),
        record_table(dash.untagged.iter().copied())
    ));
    out
}

fn format_chart(chart: &Chart) -> String {
    let mut table = Table::new();
    match chart {
        Chart::Pie(pie) => {
            table.set_header(vec!["Tagged", "Resources", "Share"]);
            for s in &pie.slices {
                table.add_row(vec![
                    Cell::new(&s.label),
                    Cell::new(s.value),
                    Cell::new(s.pct_label()),
                ]);
            }
        }
        Chart::Bar(bars) => {
            let mut header = vec![bars.category_label.clone()];
            header.extend(bars.series.iter().map(|s| s.label.clone()));
            table.set_header(header);
            for g in &bars.groups {
                let mut row = vec![Cell::new(&g.label)];
                row.extend(g.values.iter().map(|v| Cell::new(BarChart::annotation(*v))));
                table.add_row(row);
            }
        }
    }
    format!("{}\n{table}", chart.title())
}

/// Text rendering of the chart data; the graphics go to PDF.
pub fn format_visualize(dash: &Dashboard) -> String {
    let mut out = heading("Visualization", &dash.filters);
    for chart in &dash.charts {
        out.push_str("\n\n");
        if chart.is_empty() {
            out.push_str(&format!("{}\n{}", chart.title(), "No data".dimmed()));
        } else {
            out.push_str(&format_chart(chart));
        }
    }
    out
}

pub fn format_comparison(comparison: &CostComparison, filters: &str) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Tagged", "Total Cost Before", "Total Cost After"]);
    for row in &comparison.rows {
        table.add_row(vec![
            Cell::new(row.tagged.as_str()),
            Cell::new(money(row.before)),
            Cell::new(money(row.after)),
        ]);
    }
    format!(
        "{}\n{table}",
        heading("Cost Visibility Before vs After Remediation", filters)
    )
}

/// The given rows as they stand in the remediated dataset.
pub fn format_updated_rows(dataset: &Dataset, rows: &[usize]) -> String {
    let title = "Updated Dataset After Remediation".bold();
    if rows.is_empty() {
        return format!("{title}\n{}", "No rows changed.".dimmed());
    }
    let records = rows
        .iter()
        .filter_map(|&i| dataset.records.get(i).map(|r| (i, r)));
    format!("{title}\n{}", record_table(records))
}

/// Wrapped governance notes.
pub fn format_reflection(width: usize) -> String {
    let mut out = "Reflection".bold().to_string();
    let options = textwrap::Options::new(width.max(20))
        .initial_indent("  - ")
        .subsequent_indent("    ");
    for (title, points) in GOVERNANCE_NOTES {
        out.push_str(&format!("\n\n{}", title.underline()));
        for point in *points {
            out.push('\n');
            out.push_str(&textwrap::fill(point, &options));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::ComparisonRow;
    use crate::filter::{FilterSet, Selection};
    use crate::models::Tagged;
    use crate::pipeline;
    use crate::settings::Settings;

    fn sample() -> Dataset {
        let rec = |id: &str, dept: Option<&str>, tagged: Tagged, cost: f64| ResourceRecord {
            account_id: Some("1001".into()),
            resource_id: Some(id.into()),
            service: Some("EC2".into()),
            region: Some("us-east-1".into()),
            department: dept.map(Into::into),
            project: Some("Atlas".into()),
            owner: Some("kim".into()),
            environment: Some("Prod".into()),
            tagged,
            monthly_cost_usd: Some(cost),
        };
        Dataset::new(vec![
            rec("r-1", Some("Finance"), Tagged::Yes, 1500.0),
            rec("r-2", Some("Ops"), Tagged::No, 250.25),
        ])
    }

    #[test]
    fn test_explore_lists_preview_and_summary() {
        let ds = sample();
        let dash = pipeline::run(&ds, &FilterSet::default(), &Settings::default());
        let load = LoadReport {
            rows: 2,
            unparseable_costs: 1,
            unrecognised_tagged: 1,
            unknown_columns: vec!["Notes".into()],
        };
        let out = format_explore(&dash, &load);
        assert!(out.contains("1 Tagged value(s) were neither Yes nor No"));
        assert!(out.contains("r-1"));
        assert!(out.contains("MonthlyCostUSD"));
        assert!(out.contains("50.00%"));
        assert!(out.contains("Notes"));
    }

    #[test]
    fn test_costs_show_currency_and_leaders() {
        let ds = sample();
        let dash = pipeline::run(&ds, &FilterSet::default(), &Settings::default());
        let out = format_costs(&dash);
        assert!(out.contains("$1,500.00"));
        assert!(out.contains("$250.25"));
        assert!(out.contains("Ops"));
        assert!(out.contains("Atlas"));
    }

    #[test]
    fn test_empty_view_renders_without_panicking() {
        let ds = sample();
        let filters = FilterSet {
            region: Selection::only(Vec::<String>::new()),
            ..Default::default()
        };
        let dash = pipeline::run(&ds, &filters, &Settings::default());
        let out = format_costs(&dash);
        assert!(out.contains("none"));
        let out = format_visualize(&dash);
        assert!(out.contains("No data"));
        let out = format_compliance(&dash);
        assert!(out.contains("Untagged resources (0)"));
    }

    #[test]
    fn test_comparison_labels_filters() {
        let comparison = CostComparison {
            rows: vec![ComparisonRow {
                tagged: Tagged::Yes,
                before: 10.0,
                after: 1234.5,
            }],
        };
        let out = format_comparison(&comparison, "Region: us-east-1");
        assert!(out.contains("Region: us-east-1"));
        assert!(out.contains("$1,234.50"));
    }

    #[test]
    fn test_updated_rows_show_post_edit_values() {
        let mut ds = sample();
        ds.records[1].owner = Some("lee".into());
        ds.records[1].tagged = Tagged::Yes;
        let out = format_updated_rows(&ds, &[1]);
        assert!(out.contains("Updated Dataset After Remediation"));
        assert!(out.contains("r-2"));
        assert!(out.contains("lee"));
        assert!(!out.contains("r-1"));
        assert!(format_updated_rows(&ds, &[]).contains("No rows changed."));
    }

    #[test]
    fn test_reflection_wraps() {
        let out = format_reflection(40);
        assert!(out.contains("Standardize tagging policies."));
        assert!(out.lines().all(|l| l.chars().count() <= 60));
    }
}
