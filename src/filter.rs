use std::collections::BTreeSet;
use std::fmt;

use tracing::debug;

use crate::models::{Dataset, ResourceRecord};

/// Command-line token that selects rows whose value is missing.
pub const MISSING_OPTION: &str = "(missing)";

/// The four categorical columns the sidebar filters on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterColumn {
    Service,
    Region,
    Department,
    Project,
}

impl FilterColumn {
    pub const ALL: [FilterColumn; 4] = [
        FilterColumn::Service,
        FilterColumn::Region,
        FilterColumn::Department,
        FilterColumn::Project,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Service => "Service",
            Self::Region => "Region",
            Self::Department => "Department",
            Self::Project => "Project",
        }
    }

    pub fn value<'r>(&self, record: &'r ResourceRecord) -> Option<&'r str> {
        match self {
            Self::Service => record.service.as_deref(),
            Self::Region => record.region.as_deref(),
            Self::Department => record.department.as_deref(),
            Self::Project => record.project.as_deref(),
        }
    }
}

/// Selected values for one column. `values: None` is "select all", i.e. every
/// observed non-missing value.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Selection {
    values: Option<BTreeSet<String>>,
    include_missing: bool,
}

impl Selection {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn only<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut include_missing = false;
        let mut set = BTreeSet::new();
        for v in values {
            let v = v.into();
            if v == MISSING_OPTION {
                include_missing = true;
            } else {
                set.insert(v);
            }
        }
        Self {
            values: Some(set),
            include_missing,
        }
    }

    /// Build from an optional command-line list: absent means all.
    pub fn from_arg(values: Option<&[String]>) -> Self {
        match values {
            None => Self::all(),
            Some(v) => Self::only(v.iter().cloned()),
        }
    }

    pub fn with_missing(mut self) -> Self {
        self.include_missing = true;
        self
    }

    pub fn is_all(&self) -> bool {
        self.values.is_none() && !self.include_missing
    }

    pub fn matches(&self, value: Option<&str>) -> bool {
        match value {
            None => self.include_missing,
            Some(v) => self.values.as_ref().map_or(true, |set| set.contains(v)),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<&str> = match &self.values {
            None => vec!["all"],
            Some(set) if set.is_empty() && !self.include_missing => vec!["none"],
            Some(set) => set.iter().map(String::as_str).collect(),
        };
        if self.include_missing {
            parts.push(MISSING_OPTION);
        }
        f.write_str(&parts.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterSet {
    pub service: Selection,
    pub region: Selection,
    pub department: Selection,
    pub project: Selection,
}

impl FilterSet {
    pub fn selection(&self, column: FilterColumn) -> &Selection {
        match column {
            FilterColumn::Service => &self.service,
            FilterColumn::Region => &self.region,
            FilterColumn::Department => &self.department,
            FilterColumn::Project => &self.project,
        }
    }

    pub fn matches(&self, record: &ResourceRecord) -> bool {
        FilterColumn::ALL
            .iter()
            .all(|col| self.selection(*col).matches(col.value(record)))
    }

    pub fn is_unfiltered(&self) -> bool {
        FilterColumn::ALL.iter().all(|c| self.selection(*c).is_all())
    }

    /// One-line summary of the non-default selections.
    pub fn describe(&self) -> String {
        let parts: Vec<String> = FilterColumn::ALL
            .iter()
            .filter(|c| !self.selection(**c).is_all())
            .map(|c| format!("{}: {}", c.name(), self.selection(*c)))
            .collect();
        if parts.is_empty() {
            "no filters".to_string()
        } else {
            parts.join(" | ")
        }
    }
}

/// The rows of a dataset that pass a filter set, in original order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    pub indices: Vec<usize>,
    pub records: Vec<&'a ResourceRecord>,
}

impl<'a> FilteredView<'a> {
    pub fn full(dataset: &'a Dataset) -> Self {
        Self {
            indices: (0..dataset.len()).collect(),
            records: dataset.records.iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// (row identity, record) pairs.
    pub fn rows(&self) -> impl Iterator<Item = (usize, &'a ResourceRecord)> + '_ {
        self.indices.iter().copied().zip(self.records.iter().copied())
    }
}

pub fn apply<'a>(dataset: &'a Dataset, filters: &FilterSet) -> FilteredView<'a> {
    let mut indices = Vec::new();
    let mut records = Vec::new();
    for (i, record) in dataset.records.iter().enumerate() {
        if filters.matches(record) {
            indices.push(i);
            records.push(record);
        }
    }
    debug!(total = dataset.len(), kept = records.len(), "filters applied");
    FilteredView { indices, records }
}

/// Observed non-missing values of `column`, in first-appearance order.
pub fn distinct_values(dataset: &Dataset, column: FilterColumn) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for record in &dataset.records {
        if let Some(v) = column.value(record) {
            if seen.insert(v) {
                out.push(v.to_string());
            }
        }
    }
    out
}
