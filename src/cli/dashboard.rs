use colored::Colorize;

use crate::cli::report::{
    format_compliance, format_costs, format_explore, format_reflection, format_visualize,
};
use crate::cli::Session;
use crate::error::Result;
use crate::pipeline::{self, Dashboard};
use crate::remediation::{export_untagged_view, UNTAGGED_EXPORT};
use crate::settings::shellexpand_path;

const DEFAULT_WIDTH: usize = 80;

/// Terminal width for wrapped text, or a fixed width when not on a terminal.
pub fn text_width() -> usize {
    crossterm::terminal::size()
        .map(|(w, _)| (w as usize).saturating_sub(2))
        .unwrap_or(DEFAULT_WIDTH)
        .clamp(40, 100)
}

fn remediation_summary(dash: &Dashboard) -> String {
    let count = dash.untagged.len();
    let mut out = format!(
        "{}  ({})\n",
        "Tag Remediation".bold(),
        dash.filters.dimmed()
    );
    if count == 0 {
        out.push_str("No untagged resources in the current view.");
    } else {
        out.push_str(&format!(
            "{count} untagged resource(s) can be fixed with `cloudmart remediate`."
        ));
    }
    out.push_str("\n\n");
    out.push_str(&format_reflection(text_width()));
    out
}

/// Every panel in order.
pub fn run(session: &Session) -> Result<()> {
    let dash = pipeline::run(&session.dataset, &session.filters, &session.settings);
    let panels = [
        format_explore(&dash, &session.load),
        format_costs(&dash),
        format_compliance(&dash),
        format_visualize(&dash),
        remediation_summary(&dash),
    ];
    println!("{}", panels.join("\n\n"));
    Ok(())
}

pub fn explore(session: &Session) -> Result<()> {
    let dash = pipeline::run(&session.dataset, &session.filters, &session.settings);
    println!("{}", format_explore(&dash, &session.load));
    Ok(())
}

pub fn costs(session: &Session) -> Result<()> {
    let dash = pipeline::run(&session.dataset, &session.filters, &session.settings);
    println!("{}", format_costs(&dash));
    Ok(())
}

pub fn compliance(session: &Session, export: bool) -> Result<()> {
    let dash = pipeline::run(&session.dataset, &session.filters, &session.settings);
    println!("{}", format_compliance(&dash));
    if export {
        let path = std::path::PathBuf::from(shellexpand_path(&session.settings.export_dir))
            .join(UNTAGGED_EXPORT);
        export_untagged_view(&dash.view, &path)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}
