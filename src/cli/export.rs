use std::path::{Path, PathBuf};

use crate::cli::report::format_visualize;
use crate::cli::Session;
use crate::compare::CostComparison;
use crate::error::Result;
use crate::pipeline;
use crate::settings::shellexpand_path;

pub const CHARTS_EXPORT: &str = "cloudmart-charts";
pub const COMPARISON_EXPORT: &str = "cloudmart-remediation";

/// `<export_dir>/<name>-<date>.pdf`
pub fn default_pdf_path(export_dir: &str, name: &str) -> PathBuf {
    let date = chrono::Local::now().format("%Y-%m-%d").to_string();
    PathBuf::from(shellexpand_path(export_dir)).join(format!("{name}-{date}.pdf"))
}

#[cfg(feature = "pdf")]
fn write_pdf(bytes: &[u8], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)?;
    tracing::info!(path = %path.display(), bytes = bytes.len(), "wrote pdf");
    println!("Wrote {}", path.display());
    Ok(())
}

#[cfg(not(feature = "pdf"))]
fn pdf_disabled() -> crate::error::DashboardError {
    crate::error::DashboardError::Pdf(
        "PDF export requires the `pdf` feature (rebuild with --features pdf)".to_string(),
    )
}

/// Print the chart data and render the charts to PDF.
pub fn charts(session: &Session, output: Option<PathBuf>) -> Result<()> {
    let dash = pipeline::run(&session.dataset, &session.filters, &session.settings);
    println!("{}", format_visualize(&dash));
    let path = output.unwrap_or_else(|| default_pdf_path(&session.settings.export_dir, CHARTS_EXPORT));
    render_charts(&dash, &path)
}

#[cfg(feature = "pdf")]
fn render_charts(dash: &pipeline::Dashboard, path: &Path) -> Result<()> {
    let bytes = crate::pdf::render_charts("CloudMart Tagging Dashboard", &dash.filters, &dash.charts)?;
    write_pdf(&bytes, path)
}

#[cfg(not(feature = "pdf"))]
fn render_charts(_dash: &pipeline::Dashboard, _path: &Path) -> Result<()> {
    Err(pdf_disabled())
}

#[cfg(feature = "pdf")]
pub fn comparison(comparison: &CostComparison, filters: &str, path: &Path) -> Result<()> {
    let bytes = crate::pdf::render_comparison(comparison, filters)?;
    write_pdf(&bytes, path)
}

#[cfg(not(feature = "pdf"))]
pub fn comparison(_comparison: &CostComparison, _filters: &str, _path: &Path) -> Result<()> {
    Err(pdf_disabled())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_pdf_path() {
        let path = default_pdf_path("/tmp/out", CHARTS_EXPORT);
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("cloudmart-charts-"));
        assert!(name.ends_with(".pdf"));
        assert_eq!(path.parent().unwrap(), Path::new("/tmp/out"));
    }
}
