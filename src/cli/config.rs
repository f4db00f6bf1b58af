use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::settings::{load_settings, save_settings, set_value, settings_path, Settings};

pub struct ConfigChanges {
    pub dataset: Option<String>,
    pub export_dir: Option<String>,
    pub preview_rows: Option<usize>,
    pub completeness_rows: Option<usize>,
    pub lowest_completeness: Option<usize>,
}

impl ConfigChanges {
    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        if let Some(v) = &self.dataset {
            out.push(("dataset", v.clone()));
        }
        if let Some(v) = &self.export_dir {
            out.push(("export_dir", v.clone()));
        }
        if let Some(v) = self.preview_rows {
            out.push(("preview_rows", v.to_string()));
        }
        if let Some(v) = self.completeness_rows {
            out.push(("completeness_rows", v.to_string()));
        }
        if let Some(v) = self.lowest_completeness {
            out.push(("lowest_completeness", v.to_string()));
        }
        out
    }
}

pub fn format_settings(settings: &Settings) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Setting", "Value"]);
    let rows = [
        ("dataset", settings.dataset.clone()),
        ("export_dir", settings.export_dir.clone()),
        ("preview_rows", settings.preview_rows.to_string()),
        ("completeness_rows", settings.completeness_rows.to_string()),
        ("lowest_completeness", settings.lowest_completeness.to_string()),
    ];
    for (key, value) in rows {
        table.add_row(vec![Cell::new(key), Cell::new(value)]);
    }
    table.to_string()
}

/// Show the settings, saving first if anything changed.
pub fn run(changes: ConfigChanges) -> Result<()> {
    let mut settings = load_settings();
    let pairs = changes.pairs();
    for (key, value) in &pairs {
        set_value(&mut settings, key, value)?;
    }
    if !pairs.is_empty() {
        save_settings(&settings)?;
        println!("{}", "Settings saved.".green());
    }
    println!("{}", settings_path().display().to_string().dimmed());
    println!("{}", format_settings(&settings));
    Ok(())
}
