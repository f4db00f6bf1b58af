use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use colored::Colorize;
use crossterm::event::KeyCode;
use ratatui::{
    layout::{Constraint, Layout},
    text::{Line, Span},
    widgets::{Cell, Paragraph, Row, Table, TableState},
    Frame,
};
use tracing::warn;

use crate::cli::dashboard::text_width;
use crate::cli::export;
use crate::cli::report::{format_comparison, format_reflection, format_updated_rows};
use crate::cli::Session;
use crate::compare::compare;
use crate::error::{DashboardError, Result};
use crate::filter::apply;
use crate::models::{Dataset, TagField};
use crate::remediation::{
    apply_edits_csv, changed_rows, export_dataset, export_untagged, write_back, EditGrid,
    DATASET_EXPORT, UNTAGGED_EXPORT,
};
use crate::settings::shellexpand_path;
use crate::tui::{
    run_view, View, ViewAction, CURSOR_STYLE, FOOTER_STYLE, HEADER_STYLE, MISSING_STYLE,
    SELECTED_STYLE,
};

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Navigate,
    Edit(String),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditorOutcome {
    Save,
    Quit,
}

/// Terminal grid over the tag columns of the untagged rows.
pub struct GridEditor<'a> {
    dataset: &'a Dataset,
    grid: EditGrid,
    row: usize,
    col: usize,
    mode: Mode,
    state: TableState,
    outcome: Option<EditorOutcome>,
}

impl<'a> GridEditor<'a> {
    pub fn new(dataset: &'a Dataset, grid: EditGrid) -> Self {
        Self {
            dataset,
            grid,
            row: 0,
            col: 0,
            mode: Mode::Navigate,
            state: TableState::default(),
            outcome: None,
        }
    }

    fn field(&self) -> TagField {
        TagField::ALL[self.col]
    }

    /// Saved grid, or `None` if the user quit.
    pub fn finish(self) -> Option<EditGrid> {
        (self.outcome == Some(EditorOutcome::Save)).then_some(self.grid)
    }

    fn navigate(&mut self, code: KeyCode) -> ViewAction {
        match code {
            KeyCode::Up => self.row = self.row.saturating_sub(1),
            KeyCode::Down => {
                if self.row + 1 < self.grid.len() {
                    self.row += 1;
                }
            }
            KeyCode::Left => self.col = self.col.saturating_sub(1),
            KeyCode::Right => self.col = (self.col + 1).min(TagField::ALL.len() - 1),
            KeyCode::Enter => {
                if let Some(line) = self.grid.rows.get(self.row) {
                    let current = line.tag(self.field()).unwrap_or("").to_string();
                    self.mode = Mode::Edit(current);
                }
            }
            KeyCode::Char('a') => {
                self.grid.add_row();
                self.row = self.grid.len() - 1;
            }
            KeyCode::Char('d') => {
                self.grid.remove(self.row);
                if self.row >= self.grid.len() {
                    self.row = self.grid.len().saturating_sub(1);
                }
            }
            KeyCode::Char('s') => {
                self.outcome = Some(EditorOutcome::Save);
                return ViewAction::Close;
            }
            KeyCode::Char('q') | KeyCode::Esc => {
                self.outcome = Some(EditorOutcome::Quit);
                return ViewAction::Close;
            }
            _ => {}
        }
        ViewAction::Continue
    }

    fn edit(&mut self, code: KeyCode) -> ViewAction {
        let Mode::Edit(buffer) = &mut self.mode else {
            return ViewAction::Continue;
        };
        match code {
            KeyCode::Char(c) => buffer.push(c),
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Enter => {
                let value = std::mem::take(buffer);
                let field = self.field();
                if let Some(line) = self.grid.rows.get_mut(self.row) {
                    line.set(field, value);
                }
                self.mode = Mode::Navigate;
            }
            KeyCode::Esc => self.mode = Mode::Navigate,
            _ => {}
        }
        ViewAction::Continue
    }

    fn label(&self, index: usize) -> String {
        match self.grid.rows[index].row {
            Some(i) => {
                let id = self.dataset.records[i].resource_id.as_deref().unwrap_or("");
                format!("{i} {id}")
            }
            None => "(new)".to_string(),
        }
    }
}

impl View for GridEditor<'_> {
    fn draw(&mut self, frame: &mut Frame) {
        let [title_area, table_area, input_area, hints_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(frame.area());

        let title = format!("Untagged resources: {} row(s)", self.grid.len());
        frame.render_widget(Paragraph::new(title).style(HEADER_STYLE), title_area);

        let rows: Vec<Row> = (0..self.grid.len())
            .map(|i| {
                let line = &self.grid.rows[i];
                let mut cells = vec![Cell::from(self.label(i))];
                for (c, field) in TagField::ALL.iter().enumerate() {
                    let cell = match line.tag(*field) {
                        Some("") => Cell::from("\"\""),
                        Some(v) => Cell::from(v.to_string()),
                        None => Cell::from("(missing)").style(MISSING_STYLE),
                    };
                    let cell = if i == self.row && c == self.col {
                        cell.style(CURSOR_STYLE)
                    } else {
                        cell
                    };
                    cells.push(cell);
                }
                Row::new(cells)
            })
            .collect();
        let header = Row::new(
            ["Row / ResourceID", "Department", "Project", "Owner"]
                .iter()
                .map(|h| Cell::from(*h)),
        )
        .style(HEADER_STYLE);
        let table = Table::new(
            rows,
            [
                Constraint::Length(24),
                Constraint::Fill(1),
                Constraint::Fill(1),
                Constraint::Fill(1),
            ],
        )
        .header(header)
        .column_spacing(1)
        .row_highlight_style(SELECTED_STYLE);
        self.state.select((!self.grid.is_empty()).then_some(self.row));
        frame.render_stateful_widget(table, table_area, &mut self.state);

        let input = match &self.mode {
            Mode::Edit(buffer) => Line::from(vec![
                Span::raw(format!("  {}: ", self.field().name())),
                Span::raw(format!("{buffer}\u{2588}")),
            ]),
            Mode::Navigate => Line::from(""),
        };
        frame.render_widget(Paragraph::new(input), input_area);

        let hints = match self.mode {
            Mode::Navigate => "Arrows=move  Enter=edit  a=add row  d=delete row  s=save  q/Esc=quit",
            Mode::Edit(_) => "Enter=set value  Esc=cancel",
        };
        frame.render_widget(Paragraph::new(hints).style(FOOTER_STYLE), hints_area);
    }

    fn handle_key(&mut self, code: KeyCode) -> ViewAction {
        match self.mode {
            Mode::Navigate => self.navigate(code),
            Mode::Edit(_) => self.edit(code),
        }
    }
}

fn load_edits(path: &Path, grid: &mut EditGrid) -> Result<usize> {
    let file = std::fs::File::open(path).map_err(|e| {
        DashboardError::Other(format!("Cannot open edits file {}: {e}", path.display()))
    })?;
    apply_edits_csv(std::io::BufReader::new(file), grid)
}

/// Collect edits, write them back, export both CSVs and print the comparison.
pub fn run(
    session: Session,
    edits: Option<PathBuf>,
    chart: bool,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let Session {
        dataset: before,
        filters,
        settings,
        ..
    } = session;
    let out_dir =
        output_dir.unwrap_or_else(|| PathBuf::from(shellexpand_path(&settings.export_dir)));

    let mut grid = EditGrid::from_view(&apply(&before, &filters));
    println!("{} untagged resource(s) in view ({})", grid.len(), filters.describe());

    match edits {
        Some(path) => {
            let applied = load_edits(&path, &mut grid)?;
            println!("Applied {applied} edit(s) from {}", path.display());
        }
        None if grid.is_empty() => {}
        None if std::io::stdin().is_terminal() && std::io::stdout().is_terminal() => {
            let mut editor = GridEditor::new(&before, grid);
            run_view(&mut editor)?;
            match editor.finish() {
                Some(saved) => grid = saved,
                None => {
                    println!("Remediation cancelled; nothing written.");
                    return Ok(());
                }
            }
        }
        None => {
            warn!("not running in a terminal, writing back without edits");
            println!("{}", "No terminal for the grid editor; pass --edits to apply changes.".yellow());
        }
    }

    let mut after = before.clone();
    let outcome = write_back(&mut after, &grid)?;
    println!(
        "Updated {} row(s); {} newly tagged.",
        outcome.rows_updated, outcome.newly_tagged
    );
    if outcome.ignored_rows > 0 {
        println!(
            "{}",
            format!("Ignored {} added row(s) with no matching resource.", outcome.ignored_rows)
                .yellow()
        );
    }
    println!("\n{}\n", format_updated_rows(&after, &changed_rows(&before, &after)));

    let untagged_path = out_dir.join(UNTAGGED_EXPORT);
    export_untagged(&after, &grid, &untagged_path)?;
    println!("Wrote {}", untagged_path.display());
    let dataset_path = out_dir.join(DATASET_EXPORT);
    export_dataset(&after, &dataset_path)?;
    println!("Wrote {}", dataset_path.display());

    let comparison = compare(&apply(&before, &filters), &apply(&after, &filters));
    let label = filters.describe();
    println!("\n{}", format_comparison(&comparison, &label));
    if chart {
        let path = out_dir.join(format!("{}.pdf", export::COMPARISON_EXPORT));
        export::comparison(&comparison, &label, &path)?;
    }

    println!("\n{}", format_reflection(text_width()));
    Ok(())
}
