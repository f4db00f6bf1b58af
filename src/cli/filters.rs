use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::Session;
use crate::error::Result;
use crate::filter::{distinct_values, FilterColumn, MISSING_OPTION};
use crate::models::Dataset;

pub fn format_filters(dataset: &Dataset) -> String {
    let mut table = Table::new();
    table.set_header(vec!["Filter", "Values", "Rows missing"]);
    for column in FilterColumn::ALL {
        let values = distinct_values(dataset, column);
        let missing = dataset
            .records
            .iter()
            .filter(|r| column.value(r).is_none())
            .count();
        table.add_row(vec![
            Cell::new(format!("--{}", column.name().to_lowercase())),
            Cell::new(values.join(", ")),
            Cell::new(missing),
        ]);
    }
    format!(
        "{}\n{table}\nUse {} to select rows where the value is missing.",
        "Filter values".bold(),
        MISSING_OPTION
    )
}

pub fn run(session: &Session) -> Result<()> {
    println!("{}", format_filters(&session.dataset));
    Ok(())
}
