use std::io::{Read, Write};
use std::path::Path;

use tracing::{info, warn};

use crate::error::{DashboardError, Result};
use crate::filter::FilteredView;
use crate::loader::{clean, clean_cell};
use crate::models::{Column, Dataset, ResourceRecord, TagField, Tagged};

pub const UNTAGGED_EXPORT: &str = "untagged_resources.csv";
pub const DATASET_EXPORT: &str = "cloudmart_updated_dataset.csv";

// ---------------------------------------------------------------------------
// Edit grid
// ---------------------------------------------------------------------------

/// One editable line. `row` is the dataset row it came from; rows added in
/// the grid have none.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridRow {
    pub row: Option<usize>,
    pub department: Option<String>,
    pub project: Option<String>,
    pub owner: Option<String>,
}

impl GridRow {
    pub fn tag(&self, field: TagField) -> Option<&str> {
        match field {
            TagField::Department => self.department.as_deref(),
            TagField::Project => self.project.as_deref(),
            TagField::Owner => self.owner.as_deref(),
        }
    }

    /// Any string is accepted, including the empty string.
    pub fn set(&mut self, field: TagField, value: String) {
        let slot = match field {
            TagField::Department => &mut self.department,
            TagField::Project => &mut self.project,
            TagField::Owner => &mut self.owner,
        };
        *slot = Some(value);
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EditGrid {
    pub rows: Vec<GridRow>,
}

impl EditGrid {
    /// The tag columns of every untagged row in the view.
    pub fn from_view(view: &FilteredView) -> Self {
        let rows = view
            .rows()
            .filter(|(_, r)| r.tagged == Tagged::No)
            .map(|(i, r)| GridRow {
                row: Some(i),
                department: r.department.clone(),
                project: r.project.clone(),
                owner: r.owner.clone(),
            })
            .collect();
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn add_row(&mut self) {
        self.rows.push(GridRow::default());
    }

    pub fn remove(&mut self, index: usize) -> Option<GridRow> {
        (index < self.rows.len()).then(|| self.rows.remove(index))
    }

    /// Set a tag on the grid line holding dataset row `row`.
    pub fn set_for_row(&mut self, row: usize, field: TagField, value: String) -> Result<()> {
        let line = self
            .rows
            .iter_mut()
            .find(|g| g.row == Some(row))
            .ok_or(DashboardError::UnknownRow(row))?;
        line.set(field, value);
        Ok(())
    }

    /// Dataset rows present in the grid, in grid order.
    pub fn row_ids(&self) -> Vec<usize> {
        self.rows.iter().filter_map(|g| g.row).collect()
    }
}

/// Apply an edits CSV (`Row,Department,Project,Owner`) to the grid. Blank
/// cells leave the value unchanged. Returns the number of cells set.
pub fn apply_edits_csv<R: Read>(reader: R, grid: &mut EditGrid) -> Result<usize> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers: Vec<String> = rdr.headers()?.iter().map(clean).collect();
    let position = |name: &str| headers.iter().position(|h| h == name);
    let row_idx = position("Row")
        .ok_or_else(|| DashboardError::MissingColumns(vec!["Row".to_string()]))?;
    let fields: Vec<(TagField, usize)> = TagField::ALL
        .iter()
        .filter_map(|f| position(f.name()).map(|i| (*f, i)))
        .collect();

    let mut applied = 0usize;
    for result in rdr.records() {
        let record = result?;
        let raw_row = clean(record.get(row_idx).unwrap_or(""));
        let row: usize = raw_row
            .parse()
            .map_err(|_| DashboardError::Other(format!("Invalid row number in edits: {raw_row:?}")))?;
        for (field, i) in &fields {
            if let Some(value) = record.get(*i).and_then(clean_cell) {
                grid.set_for_row(row, *field, value)?;
                applied += 1;
            }
        }
    }
    Ok(applied)
}

// ---------------------------------------------------------------------------
// Write-back
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RemediationOutcome {
    /// Dataset rows with at least one changed tag value.
    pub rows_updated: usize,
    /// Rows whose Tagged status flipped from No to Yes.
    pub newly_tagged: usize,
    /// Grid lines with no dataset row (added in the grid).
    pub ignored_rows: usize,
}

/// Write grid values into the dataset, then re-derive Tagged for every row.
/// Missing grid cells never overwrite a dataset value.
pub fn write_back(dataset: &mut Dataset, grid: &EditGrid) -> Result<RemediationOutcome> {
    let mut outcome = RemediationOutcome::default();
    for line in &grid.rows {
        let Some(row) = line.row else {
            outcome.ignored_rows += 1;
            continue;
        };
        let record = dataset
            .records
            .get_mut(row)
            .ok_or(DashboardError::UnknownRow(row))?;
        let mut changed = false;
        for field in TagField::ALL {
            if let Some(value) = line.tag(field) {
                if record.tag(field) != Some(value) {
                    record.set_tag(field, value.to_string());
                    changed = true;
                }
            }
        }
        if changed {
            outcome.rows_updated += 1;
        }
    }
    if outcome.ignored_rows > 0 {
        warn!(count = outcome.ignored_rows, "rows added in the grid have no dataset row, ignoring");
    }
    outcome.newly_tagged = retag(dataset);
    info!(
        updated = outcome.rows_updated,
        newly_tagged = outcome.newly_tagged,
        "remediation applied"
    );
    Ok(outcome)
}

/// Mark every fully tagged row as Tagged = Yes. Other rows keep their status.
/// Returns how many rows changed.
pub fn retag(dataset: &mut Dataset) -> usize {
    let mut flipped = 0usize;
    for record in dataset.records.iter_mut() {
        if record.is_fully_tagged() && record.tagged != Tagged::Yes {
            record.tagged = Tagged::Yes;
            flipped += 1;
        }
    }
    flipped
}

/// Rows whose values differ between two snapshots of the same table.
pub fn changed_rows(before: &Dataset, after: &Dataset) -> Vec<usize> {
    before
        .records
        .iter()
        .zip(&after.records)
        .enumerate()
        .filter(|(_, (b, a))| b != a)
        .map(|(i, _)| i)
        .collect()
}

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

fn cell(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

/// Serialize records with a header row and no index column.
pub fn write_csv<'a, W, I>(writer: W, records: I) -> Result<()>
where
    W: Write,
    I: IntoIterator<Item = &'a ResourceRecord>,
{
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(Column::ALL.iter().map(|c| c.header()))?;
    for r in records {
        let cost = r.monthly_cost_usd.map(|v| v.to_string()).unwrap_or_default();
        wtr.write_record([
            cell(&r.account_id),
            cell(&r.resource_id),
            cell(&r.service),
            cell(&r.region),
            cell(&r.department),
            cell(&r.project),
            cell(&r.owner),
            cell(&r.environment),
            r.tagged.as_str(),
            cost.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_file<'a, I>(path: &Path, records: I) -> Result<()>
where
    I: IntoIterator<Item = &'a ResourceRecord>,
{
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_csv(std::io::BufWriter::new(file), records)?;
    info!(path = %path.display(), "wrote export");
    Ok(())
}

/// The grid's dataset rows with their current values.
pub fn export_untagged(dataset: &Dataset, grid: &EditGrid, path: &Path) -> Result<()> {
    let records = grid.row_ids().into_iter().filter_map(|i| dataset.records.get(i));
    write_file(path, records)
}

pub fn export_untagged_view(view: &FilteredView, path: &Path) -> Result<()> {
    let records = view.records.iter().copied().filter(|r| r.tagged == Tagged::No);
    write_file(path, records)
}

pub fn export_dataset(dataset: &Dataset, path: &Path) -> Result<()> {
    write_file(path, &dataset.records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{apply, FilterSet};
    use crate::loader::load_reader;

    fn rec(
        id: &str,
        dept: Option<&str>,
        project: Option<&str>,
        owner: Option<&str>,
        tagged: Tagged,
    ) -> ResourceRecord {
        ResourceRecord {
            account_id: Some("1001".into()),
            resource_id: Some(id.into()),
            service: Some("EC2".into()),
            region: Some("us-east-1".into()),
            department: dept.map(Into::into),
            project: project.map(Into::into),
            owner: owner.map(Into::into),
            environment: Some("Prod".into()),
            tagged,
            monthly_cost_usd: Some(12.5),
        }
    }

    #[test]
    fn test_editing_missing_department_retags_row() {
        let mut ds = Dataset::new(vec![
            rec("A", None, Some("x"), Some("y"), Tagged::No),
            rec("B", Some("d"), Some("p"), Some("o"), Tagged::No),
        ]);
        let mut grid = EditGrid::from_view(&FilteredView::full(&ds));
        assert_eq!(grid.len(), 2);
        grid.set_for_row(0, TagField::Department, "d2".into()).unwrap();
        let before_b = ds.records[1].clone();
        write_back(&mut ds, &grid).unwrap();
        assert_eq!(ds.records[0].tagged, Tagged::Yes);
        assert_eq!(ds.records[0].department.as_deref(), Some("d2"));
        // B's tags are untouched; it was already complete so the retag pass marks it
        assert_eq!(ds.records[1].department, before_b.department);
        assert_eq!(ds.records[1].tagged, Tagged::Yes);
    }

    #[test]
    fn test_changed_rows_include_retagged_rows_outside_grid() {
        let before = Dataset::new(vec![
            rec("A", None, Some("p"), Some("o"), Tagged::No),
            rec("B", Some("d"), None, Some("o"), Tagged::No),
            rec("C", Some("d"), Some("p"), Some("o"), Tagged::Unknown),
        ]);
        let mut after = before.clone();
        let mut grid = EditGrid::from_view(&FilteredView::full(&after));
        grid.remove(1);
        grid.set_for_row(0, TagField::Department, "d".into()).unwrap();
        write_back(&mut after, &grid).unwrap();
        assert_eq!(changed_rows(&before, &after), vec![0, 2]);
        assert_eq!(after.records[2].tagged, Tagged::Yes);
    }

    #[test]
    fn test_partial_tags_keep_prior_status() {
        let mut ds = Dataset::new(vec![
            rec("A", None, None, Some("y"), Tagged::No),
            rec("B", None, Some("p"), None, Tagged::Yes),
        ]);
        let mut grid = EditGrid::from_view(&FilteredView::full(&ds));
        grid.set_for_row(0, TagField::Project, "p".into()).unwrap();
        let outcome = write_back(&mut ds, &grid).unwrap();
        assert_eq!(outcome.rows_updated, 1);
        assert_eq!(outcome.newly_tagged, 0);
        assert_eq!(ds.records[0].tagged, Tagged::No);
        assert_eq!(ds.records[1].tagged, Tagged::Yes);
    }

    #[test]
    fn test_every_fully_tagged_row_is_yes_after_write_back() {
        let mut ds = Dataset::new(vec![
            rec("A", Some("d"), Some("p"), Some("o"), Tagged::No),
            rec("B", None, Some("p"), Some("o"), Tagged::No),
            rec("C", Some("d"), None, None, Tagged::Yes),
        ]);
        let prior: Vec<Tagged> = ds.records.iter().map(|r| r.tagged).collect();
        let grid = EditGrid::default();
        write_back(&mut ds, &grid).unwrap();
        for (r, before) in ds.records.iter().zip(prior) {
            if r.is_fully_tagged() {
                assert_eq!(r.tagged, Tagged::Yes);
            } else {
                assert_eq!(r.tagged, before);
            }
        }
    }

    #[test]
    fn test_empty_string_counts_as_present() {
        let mut ds = Dataset::new(vec![rec("A", None, Some("p"), Some("o"), Tagged::No)]);
        let mut grid = EditGrid::from_view(&FilteredView::full(&ds));
        grid.rows[0].set(TagField::Department, String::new());
        write_back(&mut ds, &grid).unwrap();
        assert_eq!(ds.records[0].department.as_deref(), Some(""));
        assert_eq!(ds.records[0].tagged, Tagged::Yes);
    }

    #[test]
    fn test_empty_string_tag_exports_blank_and_reloads_missing() {
        let mut ds = Dataset::new(vec![rec("A", None, Some("p"), Some("o"), Tagged::No)]);
        let mut grid = EditGrid::from_view(&FilteredView::full(&ds));
        grid.rows[0].set(TagField::Department, String::new());
        write_back(&mut ds, &grid).unwrap();
        let mut buf = Vec::new();
        write_csv(&mut buf, &ds.records).unwrap();
        let (reloaded, _) = load_reader(buf.as_slice()).unwrap();
        assert_eq!(reloaded.records[0].department, None);
        assert_eq!(reloaded.records[0].tagged, Tagged::Yes);
    }

    #[test]
    fn test_added_and_removed_grid_rows() {
        let mut ds = Dataset::new(vec![
            rec("A", None, Some("p"), Some("o"), Tagged::No),
            rec("B", None, Some("p"), Some("o"), Tagged::No),
        ]);
        let mut grid = EditGrid::from_view(&FilteredView::full(&ds));
        grid.add_row();
        grid.rows[2].set(TagField::Department, "ghost".into());
        grid.remove(0);
        grid.set_for_row(1, TagField::Department, "d".into()).unwrap();
        let outcome = write_back(&mut ds, &grid).unwrap();
        assert_eq!(outcome.ignored_rows, 1);
        assert_eq!(outcome.rows_updated, 1);
        assert_eq!(ds.records[0].department, None);
        assert_eq!(ds.records[1].department.as_deref(), Some("d"));
        assert_eq!(ds.len(), 2);
    }

    #[test]
    fn test_set_for_unknown_row_fails() {
        let ds = Dataset::new(vec![rec("A", None, None, None, Tagged::Yes)]);
        let mut grid = EditGrid::from_view(&FilteredView::full(&ds));
        assert!(grid.is_empty());
        let err = grid.set_for_row(0, TagField::Owner, "x".into()).unwrap_err();
        assert!(matches!(err, DashboardError::UnknownRow(0)));
    }

    #[test]
    fn test_apply_edits_csv() {
        let ds = Dataset::new(vec![
            rec("A", None, None, Some("o"), Tagged::No),
            rec("B", None, Some("p"), None, Tagged::No),
        ]);
        let mut grid = EditGrid::from_view(&FilteredView::full(&ds));
        let edits = "Row,Department,Project,Owner\n0,Finance,Atlas,\n1,Ops,,lee\n";
        let applied = apply_edits_csv(edits.as_bytes(), &mut grid).unwrap();
        assert_eq!(applied, 4);
        assert_eq!(grid.rows[0].department.as_deref(), Some("Finance"));
        assert_eq!(grid.rows[0].owner.as_deref(), Some("o"));
        assert_eq!(grid.rows[1].project.as_deref(), Some("p"));
        assert_eq!(grid.rows[1].owner.as_deref(), Some("lee"));
    }

    #[test]
    fn test_apply_edits_csv_rejects_bad_rows() {
        let ds = Dataset::new(vec![rec("A", None, None, None, Tagged::No)]);
        let mut grid = EditGrid::from_view(&FilteredView::full(&ds));
        let err = apply_edits_csv("Row,Owner\n7,x\n".as_bytes(), &mut grid).unwrap_err();
        assert!(matches!(err, DashboardError::UnknownRow(7)));
        let err = apply_edits_csv("Row,Owner\nabc,x\n".as_bytes(), &mut grid).unwrap_err();
        assert!(err.to_string().contains("Invalid row number"));
        let err = apply_edits_csv("Owner\nx\n".as_bytes(), &mut grid).unwrap_err();
        assert!(matches!(err, DashboardError::MissingColumns(_)));
    }

    #[test]
    fn test_export_roundtrip_through_loader() {
        let mut ds = Dataset::new(vec![
            rec("A", Some("Fin"), Some("Atlas"), None, Tagged::No),
            rec("B", Some("Ops"), Some("Nova"), Some("bo"), Tagged::Yes),
        ]);
        ds.records[1].monthly_cost_usd = None;
        ds.records[0].monthly_cost_usd = Some(1234.75);
        let mut buf = Vec::new();
        write_csv(&mut buf, &ds.records).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.starts_with("AccountID,ResourceID,Service"));
        let (reloaded, _) = load_reader(buf.as_slice()).unwrap();
        assert_eq!(reloaded, ds);
    }

    #[test]
    fn test_export_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut ds = Dataset::new(vec![
            rec("A", None, Some("p"), Some("o"), Tagged::No),
            rec("B", Some("d"), Some("p"), Some("o"), Tagged::Yes),
        ]);
        let view = apply(&ds, &FilterSet::default());
        assert_eq!(view.len(), 1);
        let grid = EditGrid::from_view(&FilteredView::full(&ds));
        write_back(&mut ds, &grid).unwrap();
        let untagged = dir.path().join("out").join(UNTAGGED_EXPORT);
        export_untagged(&ds, &grid, &untagged).unwrap();
        let full = dir.path().join(DATASET_EXPORT);
        export_dataset(&ds, &full).unwrap();
        let untagged_text = std::fs::read_to_string(&untagged).unwrap();
        assert_eq!(untagged_text.lines().count(), 2);
        let full_text = std::fs::read_to_string(&full).unwrap();
        assert_eq!(full_text.lines().count(), 3);
    }
}
