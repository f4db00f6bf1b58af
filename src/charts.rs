//! Chart data built from report output. Rendering lives in `pdf`.

use crate::compare::CostComparison;
use crate::fmt::money_whole;
use crate::reports::{DepartmentTagCost, GroupCost};
use crate::models::Tagged;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb(pub u8, pub u8, pub u8);

pub const LIGHT_GREEN: Rgb = Rgb(144, 238, 144);
pub const SALMON: Rgb = Rgb(250, 128, 114);
pub const SKY_BLUE: Rgb = Rgb(135, 206, 235);
const LIGHT_GRAY: Rgb = Rgb(211, 211, 211);
const ENVIRONMENT_COLORS: [Rgb; 3] = [Rgb(173, 216, 230), Rgb(255, 165, 0), Rgb(0, 128, 0)];

#[derive(Debug, Clone, PartialEq)]
pub struct Slice {
    pub label: String,
    pub value: f64,
    pub pct: f64,
    pub color: Rgb,
}

impl Slice {
    /// Label drawn on the slice: percentage to one decimal.
    pub fn pct_label(&self) -> String {
        format!("{:.1}%", self.pct)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PieChart {
    pub title: String,
    pub slices: Vec<Slice>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Orientation {
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub label: String,
    pub color: Rgb,
}

/// One category on the axis; `values[i]` belongs to `series[i]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BarGroup {
    pub label: String,
    pub values: Vec<f64>,
    /// Per-group color override for single-series charts.
    pub color: Option<Rgb>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChart {
    pub title: String,
    pub category_label: String,
    pub value_label: String,
    pub orientation: Orientation,
    pub series: Vec<Series>,
    pub groups: Vec<BarGroup>,
    /// Print each bar's value next to it.
    pub annotate: bool,
}

impl BarChart {
    pub fn max_value(&self) -> f64 {
        self.groups
            .iter()
            .flat_map(|g| g.values.iter().copied())
            .fold(0.0, f64::max)
    }

    pub fn annotation(value: f64) -> String {
        money_whole(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    Pie(PieChart),
    Bar(BarChart),
}

impl Chart {
    pub fn title(&self) -> &str {
        match self {
            Self::Pie(p) => &p.title,
            Self::Bar(b) => &b.title,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Pie(p) => p.slices.iter().all(|s| s.value == 0.0),
            Self::Bar(b) => b.groups.is_empty(),
        }
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

fn tagged_color(tagged: Tagged) -> Rgb {
    match tagged {
        Tagged::Yes => LIGHT_GREEN,
        Tagged::No => SALMON,
        Tagged::Unknown => LIGHT_GRAY,
    }
}

pub fn tag_pie(counts: &[(Tagged, usize)]) -> Chart {
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    let slices = counts
        .iter()
        .map(|(tagged, n)| Slice {
            label: tagged.as_str().to_string(),
            value: *n as f64,
            pct: if total > 0 { *n as f64 / total as f64 * 100.0 } else { 0.0 },
            color: tagged_color(*tagged),
        })
        .collect();
    Chart::Pie(PieChart {
        title: "Tagged vs Untagged Resources".to_string(),
        slices,
    })
}

fn single_series(items: &[GroupCost]) -> Vec<BarGroup> {
    items
        .iter()
        .map(|g| BarGroup {
            label: g.name.clone(),
            values: vec![g.total],
            color: None,
        })
        .collect()
}

/// Expects `items` already sorted ascending by value.
pub fn service_cost_bars(items: &[GroupCost]) -> Chart {
    Chart::Bar(BarChart {
        title: "Total Cost per Service".to_string(),
        category_label: "Service".to_string(),
        value_label: "Total Cost (USD)".to_string(),
        orientation: Orientation::Horizontal,
        series: vec![Series {
            label: "Cost".to_string(),
            color: SKY_BLUE,
        }],
        groups: single_series(items),
        annotate: false,
    })
}

fn tagged_series() -> Vec<Series> {
    vec![
        Series {
            label: "Tagged".to_string(),
            color: LIGHT_GREEN,
        },
        Series {
            label: "Untagged".to_string(),
            color: SALMON,
        },
    ]
}

pub fn department_tag_bars(items: &[DepartmentTagCost]) -> Chart {
    Chart::Bar(BarChart {
        title: "Cost per Department by Tagging Status".to_string(),
        category_label: "Department".to_string(),
        value_label: "Total Cost (USD)".to_string(),
        orientation: Orientation::Vertical,
        series: tagged_series(),
        groups: items
            .iter()
            .map(|d| BarGroup {
                label: d.department.clone(),
                values: vec![d.tagged, d.untagged],
                color: None,
            })
            .collect(),
        annotate: true,
    })
}

pub fn environment_cost_bars(items: &[GroupCost]) -> Chart {
    let mut groups = single_series(items);
    for (i, g) in groups.iter_mut().enumerate() {
        g.color = Some(ENVIRONMENT_COLORS[i % ENVIRONMENT_COLORS.len()]);
    }
    Chart::Bar(BarChart {
        title: "Total Cost by Environment".to_string(),
        category_label: "Environment".to_string(),
        value_label: "Total Cost (USD)".to_string(),
        orientation: Orientation::Vertical,
        series: vec![Series {
            label: "Cost".to_string(),
            color: ENVIRONMENT_COLORS[0],
        }],
        groups,
        annotate: true,
    })
}

pub fn before_after_bars(comparison: &CostComparison) -> Chart {
    Chart::Bar(BarChart {
        title: "Cost Visibility Before vs After Remediation".to_string(),
        category_label: "Tagged Status".to_string(),
        value_label: "Total Cost ($)".to_string(),
        orientation: Orientation::Vertical,
        series: vec![
            Series {
                label: "Before".to_string(),
                color: SALMON,
            },
            Series {
                label: "After".to_string(),
                color: LIGHT_GREEN,
            },
        ],
        groups: comparison
            .rows
            .iter()
            .map(|r| BarGroup {
                label: r.tagged.as_str().to_string(),
                values: vec![r.before, r.after],
                color: None,
            })
            .collect(),
        annotate: true,
    })
}
