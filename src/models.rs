use std::fmt;

/// Asserted tagging status of a resource.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tagged {
    // Declaration order is the display order of grouped reports: No, Yes.
    #[default]
    No,
    Yes,
    /// Blank or unrecognised in the source data. Counted as neither.
    Unknown,
}

impl Tagged {
    pub const ALL: [Tagged; 2] = [Tagged::No, Tagged::Yes];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yes => "Yes",
            Self::No => "No",
            Self::Unknown => "",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        if raw.eq_ignore_ascii_case("yes") {
            Some(Self::Yes)
        } else if raw.eq_ignore_ascii_case("no") {
            Some(Self::No)
        } else {
            None
        }
    }
}

impl fmt::Display for Tagged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the three governance tag fields whose completeness is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagField {
    Department,
    Project,
    Owner,
}

impl TagField {
    pub const ALL: [TagField; 3] = [TagField::Department, TagField::Project, TagField::Owner];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Department => "Department",
            Self::Project => "Project",
            Self::Owner => "Owner",
        }
    }
}

/// Every column of the dataset, in canonical CSV order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    AccountId,
    ResourceId,
    Service,
    Region,
    Department,
    Project,
    Owner,
    Environment,
    Tagged,
    MonthlyCostUsd,
}

impl Column {
    pub const ALL: [Column; 10] = [
        Column::AccountId,
        Column::ResourceId,
        Column::Service,
        Column::Region,
        Column::Department,
        Column::Project,
        Column::Owner,
        Column::Environment,
        Column::Tagged,
        Column::MonthlyCostUsd,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            Self::AccountId => "AccountID",
            Self::ResourceId => "ResourceID",
            Self::Service => "Service",
            Self::Region => "Region",
            Self::Department => "Department",
            Self::Project => "Project",
            Self::Owner => "Owner",
            Self::Environment => "Environment",
            Self::Tagged => "Tagged",
            Self::MonthlyCostUsd => "MonthlyCostUSD",
        }
    }

    pub fn from_header(name: &str) -> Option<Self> {
        Self::ALL.iter().find(|c| c.header() == name).copied()
    }
}

/// One billing/tagging row. Every string column may be missing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceRecord {
    pub account_id: Option<String>,
    pub resource_id: Option<String>,
    pub service: Option<String>,
    pub region: Option<String>,
    pub department: Option<String>,
    pub project: Option<String>,
    pub owner: Option<String>,
    pub environment: Option<String>,
    pub tagged: Tagged,
    pub monthly_cost_usd: Option<f64>,
}

impl ResourceRecord {
    pub fn tag(&self, field: TagField) -> Option<&str> {
        match field {
            TagField::Department => self.department.as_deref(),
            TagField::Project => self.project.as_deref(),
            TagField::Owner => self.owner.as_deref(),
        }
    }

    pub fn set_tag(&mut self, field: TagField, value: String) {
        let slot = match field {
            TagField::Department => &mut self.department,
            TagField::Project => &mut self.project,
            TagField::Owner => &mut self.owner,
        };
        *slot = Some(value);
    }

    /// Whether the cell for `column` holds no value.
    pub fn is_missing(&self, column: Column) -> bool {
        match column {
            Column::AccountId => self.account_id.is_none(),
            Column::ResourceId => self.resource_id.is_none(),
            Column::Service => self.service.is_none(),
            Column::Region => self.region.is_none(),
            Column::Department => self.department.is_none(),
            Column::Project => self.project.is_none(),
            Column::Owner => self.owner.is_none(),
            Column::Environment => self.environment.is_none(),
            Column::Tagged => self.tagged == Tagged::Unknown,
            Column::MonthlyCostUsd => self.monthly_cost_usd.is_none(),
        }
    }

    /// Number of tag fields holding a value (0..=3).
    pub fn completeness_score(&self) -> u8 {
        TagField::ALL.iter().filter(|f| self.tag(**f).is_some()).count() as u8
    }

    pub fn is_fully_tagged(&self) -> bool {
        self.completeness_score() == TagField::ALL.len() as u8
    }

    pub fn cost(&self) -> f64 {
        self.monthly_cost_usd.unwrap_or(0.0)
    }
}

/// The full in-memory table. A row's identity is its index in `records`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub records: Vec<ResourceRecord>,
}

impl Dataset {
    pub fn new(records: Vec<ResourceRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
