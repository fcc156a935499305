//! Text and JSON rendering for CLI output.

use std::fmt::Write as _;

use crate::aircraft::AircraftRecord;
use crate::error::{Error, Result};
use crate::roster::RosterState;

use super::OutputFormat;

const TABLE_COLUMNS: [&str; 5] = ["REGISTRATION", "TYPE", "MANUFACTURER", "OWNER", "COUNTRY"];

/// Render a roster state.
///
/// Empty rosters render as a message (or `[]` for JSON). A failed state is
/// rendered as its message; callers decide whether that is fatal.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_roster(state: &RosterState, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(state.records())?);
    }

    match state {
        RosterState::Loaded(records) => Ok(match format {
            OutputFormat::Table => render_table(records),
            _ => render_plain(records),
        }),
        other => Ok(format!("{}\n", other.message().unwrap_or_default())),
    }
}

/// Render a single record as labelled lines or JSON.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn render_record(record: &AircraftRecord, json: bool) -> Result<String> {
    if json {
        return serde_json::to_string_pretty(record).map_err(Error::from);
    }

    let mut out = String::new();
    let _ = writeln!(out, "Registration:  {}", record.identifier);
    let _ = writeln!(out, "Type:          {}", record.aircraft_type);
    let _ = writeln!(out, "Manufacturer:  {}", record.manufacturer);
    let _ = writeln!(out, "Owner:         {}", record.registered_owner);
    let _ = writeln!(out, "Country:       {}", record.owner_country);
    let _ = writeln!(out, "Photo:         {}", record.display_photo_url());
    Ok(out)
}

fn render_plain(records: &[AircraftRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let _ = writeln!(
            out,
            "{} {} {} - {} ({})",
            record.identifier,
            record.manufacturer,
            record.aircraft_type,
            record.registered_owner,
            record.owner_country
        );
    }
    out
}

fn render_table(records: &[AircraftRecord]) -> String {
    let rows: Vec<[&str; 5]> = records
        .iter()
        .map(|r| {
            [
                r.identifier.as_str(),
                r.aircraft_type.as_str(),
                r.manufacturer.as_str(),
                r.registered_owner.as_str(),
                r.owner_country.as_str(),
            ]
        })
        .collect();

    let mut widths = TABLE_COLUMNS.map(|c| c.chars().count());
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    write_row(&mut out, &TABLE_COLUMNS, &widths);
    for row in &rows {
        write_row(&mut out, row, &widths);
    }
    let _ = writeln!(out, "\n{} aircraft", rows.len());
    out
}

fn write_row(out: &mut String, cells: &[&str; 5], widths: &[usize; 5]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect();
    let _ = writeln!(out, "{}", line.join("  ").trim_end());
}
