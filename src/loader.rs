use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, info, warn};

use crate::error::{DashboardError, Result};
use crate::models::{Column, Dataset, ResourceRecord, Tagged};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Spellings read as a missing value (pandas' default NA set).
const NA_VALUES: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Strip surrounding whitespace, then every double-quote character.
pub fn clean(raw: &str) -> String {
    raw.trim().replace('"', "")
}

/// Cleaned cell value, or `None` when the cell reads as missing.
pub fn clean_cell(raw: &str) -> Option<String> {
    let s = clean(raw);
    if NA_VALUES.contains(&s.as_str()) {
        None
    } else {
        Some(s)
    }
}

/// Numeric coercion of a cost cell. Anything unparseable or non-finite is missing.
pub fn parse_cost(raw: &str) -> Option<f64> {
    let s = clean_cell(raw)?;
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Header mapping
// ---------------------------------------------------------------------------

struct HeaderMap {
    positions: Vec<(Column, usize)>,
    unknown: Vec<String>,
}

impl HeaderMap {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let mut positions: Vec<(Column, usize)> = Vec::new();
        let mut unknown = Vec::new();
        for (i, raw) in headers.iter().enumerate() {
            let name = clean(raw);
            match Column::from_header(&name) {
                Some(col) if !positions.iter().any(|(c, _)| *c == col) => {
                    positions.push((col, i));
                }
                _ => unknown.push(name),
            }
        }
        let missing: Vec<String> = Column::ALL
            .iter()
            .filter(|c| !positions.iter().any(|(p, _)| p == *c))
            .map(|c| c.header().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(DashboardError::MissingColumns(missing));
        }
        Ok(Self { positions, unknown })
    }

    fn get<'r>(&self, record: &'r StringRecord, column: Column) -> &'r str {
        self.positions
            .iter()
            .find(|(c, _)| *c == column)
            .and_then(|(_, i)| record.get(*i))
            .unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// load
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub rows: usize,
    pub unparseable_costs: usize,
    pub unrecognised_tagged: usize,
    pub unknown_columns: Vec<String>,
}

/// Parse a CSV stream into a typed dataset.
pub fn load_reader<R: Read>(reader: R) -> Result<(Dataset, LoadReport)> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);
    let headers = rdr.headers()?.clone();
    let map = HeaderMap::from_headers(&headers)?;
    for name in &map.unknown {
        warn!(column = %name, "ignoring unknown column");
    }

    let mut records = Vec::new();
    let mut unparseable_costs = 0usize;
    let mut unrecognised_tagged = 0usize;
    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let raw_tagged = clean(map.get(&record, Column::Tagged));
        let tagged = Tagged::parse(&raw_tagged).unwrap_or_else(|| {
            unrecognised_tagged += 1;
            debug!(line, value = %raw_tagged, "Tagged is neither Yes nor No");
            Tagged::Unknown
        });

        let raw_cost = map.get(&record, Column::MonthlyCostUsd);
        let monthly_cost_usd = parse_cost(raw_cost);
        if monthly_cost_usd.is_none() && clean_cell(raw_cost).is_some() {
            unparseable_costs += 1;
            debug!(line, value = raw_cost, "cost is not numeric, treating as missing");
        }

        records.push(ResourceRecord {
            account_id: clean_cell(map.get(&record, Column::AccountId)),
            resource_id: clean_cell(map.get(&record, Column::ResourceId)),
            service: clean_cell(map.get(&record, Column::Service)),
            region: clean_cell(map.get(&record, Column::Region)),
            department: clean_cell(map.get(&record, Column::Department)),
            project: clean_cell(map.get(&record, Column::Project)),
            owner: clean_cell(map.get(&record, Column::Owner)),
            environment: clean_cell(map.get(&record, Column::Environment)),
            tagged,
            monthly_cost_usd,
        });
    }

    if unparseable_costs > 0 {
        warn!(count = unparseable_costs, "non-numeric MonthlyCostUSD values treated as missing");
    }
    if unrecognised_tagged > 0 {
        warn!(count = unrecognised_tagged, "Tagged values other than Yes/No counted as neither");
    }
    let report = LoadReport {
        rows: records.len(),
        unparseable_costs,
        unrecognised_tagged,
        unknown_columns: map.unknown,
    };
    info!(rows = report.rows, "dataset loaded");
    Ok((Dataset::new(records), report))
}

pub fn load_file(path: &Path) -> Result<(Dataset, LoadReport)> {
    let file = std::fs::File::open(path).map_err(|e| {
        DashboardError::Other(format!("Cannot open dataset {}: {e}", path.display()))
    })?;
    load_reader(std::io::BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "AccountID,ResourceID,Service,Region,Department,Project,Owner,Environment,Tagged,MonthlyCostUSD\n";

    #[test]
    fn test_clean_strips_whitespace_and_quotes() {
        assert_eq!(clean("  EC2 "), "EC2");
        assert_eq!(clean("\"Service\""), "Service");
        assert_eq!(clean(" \"a\"b "), "ab");
    }

    #[test]
    fn test_clean_cell_missing_markers() {
        assert_eq!(clean_cell(""), None);
        assert_eq!(clean_cell("   "), None);
        assert_eq!(clean_cell("NaN"), None);
        assert_eq!(clean_cell("N/A"), None);
        assert_eq!(clean_cell(" Finance "), Some("Finance".to_string()));
    }

    #[test]
    fn test_parse_cost() {
        assert_eq!(parse_cost("10.5"), Some(10.5));
        assert_eq!(parse_cost(" 20.25 "), Some(20.25));
        assert_eq!(parse_cost("\"7\""), Some(7.0));
        assert_eq!(parse_cost("bad"), None);
        assert_eq!(parse_cost(""), None);
        assert_eq!(parse_cost("inf"), None);
    }

    #[test]
    fn test_load_coerces_costs_and_trims() {
        let csv = format!(
            "{HEADER}\
             1, r-1 ,EC2,us-east-1,Finance,Atlas,ana,Prod,Yes,10.5\n\
             1,r-2,S3,us-east-1,,Atlas,bo,Dev,No,20.25\n\
             2,r-3,RDS,eu-west-1,Ops,,,Prod,No,bad\n"
        );
        let (ds, report) = load_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(report.rows, 3);
        assert_eq!(report.unparseable_costs, 1);
        let costs: Vec<Option<f64>> = ds.records.iter().map(|r| r.monthly_cost_usd).collect();
        assert_eq!(costs, vec![Some(10.5), Some(20.25), None]);
        assert_eq!(ds.records[0].resource_id.as_deref(), Some("r-1"));
        assert_eq!(ds.records[1].department, None);
        assert_eq!(ds.records[2].tagged, Tagged::No);
    }

    #[test]
    fn test_load_cleans_quoted_headers_and_reordered_columns() {
        let csv = "\" Tagged \",MonthlyCostUSD,AccountID,ResourceID,Service,Region,Department,Project,Owner,Environment\n\
                   Yes,5,1,r-1,EC2,us-east-1,Fin,P,o,Prod\n";
        let (ds, _) = load_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.records[0].tagged, Tagged::Yes);
        assert_eq!(ds.records[0].monthly_cost_usd, Some(5.0));
        assert_eq!(ds.records[0].service.as_deref(), Some("EC2"));
    }

    #[test]
    fn test_load_reports_missing_columns() {
        let csv = "AccountID,ResourceID,Region\n1,r,us\n";
        let err = load_reader(csv.as_bytes()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Service"), "got: {msg}");
        assert!(msg.contains("Tagged"), "got: {msg}");
        assert!(msg.contains("MonthlyCostUSD"), "got: {msg}");
    }

    #[test]
    fn test_load_flags_unknown_columns() {
        let csv = "AccountID,ResourceID,Service,Region,Department,Project,Owner,Environment,Tagged,MonthlyCostUSD,CostCenter\n\
                   1,r,EC2,us,Fin,P,o,Prod,Yes,1,cc-9\n";
        let (_, report) = load_reader(csv.as_bytes()).unwrap();
        assert_eq!(report.unknown_columns, vec!["CostCenter".to_string()]);
    }

    #[test]
    fn test_load_keeps_rows_with_blank_or_odd_tagged() {
        let csv = format!(
            "{HEADER}\
             1,r-1,EC2,us,Fin,P,o,Prod,Yes,1\n\
             1,r-2,EC2,us,Fin,P,o,Prod,,2\n\
             1,r-3,EC2,us,Fin,P,o,Prod,Maybe,3\n"
        );
        let (ds, report) = load_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.len(), 3);
        assert_eq!(report.unrecognised_tagged, 2);
        assert_eq!(ds.records[1].tagged, Tagged::Unknown);
        assert_eq!(ds.records[2].tagged, Tagged::Unknown);
        assert!(ds.records[1].is_missing(Column::Tagged));
        assert!(!ds.records[0].is_missing(Column::Tagged));
    }

    #[test]
    fn test_load_malformed_csv_is_fatal() {
        let csv = format!("{HEADER}1,r,EC2\n");
        let err = load_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DashboardError::Csv(_)));
    }

    #[test]
    fn test_load_file_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_file(&dir.path().join("nope.csv")).unwrap_err();
        assert!(err.to_string().contains("Cannot open dataset"));
    }
}
