//! CSV audit report

use super::RepositoryInspection;
use std::io::{self, Write};

pub const AUDIT_REPORT_HEADER: &str = "final_github_repo,folder_name,name_matches,remote_default_branch,local_branch,in_sync,remote_protocol,origin_matches_canonical";

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn optional_yes_no(value: Option<bool>) -> &'static str {
    value.map(yes_no).unwrap_or("n/a")
}

fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn audit_row(inspection: &RepositoryInspection) -> String {
    [
        escape_field(inspection.final_github_repo()),
        escape_field(&inspection.folder_name),
        yes_no(inspection.name_matches()).to_string(),
        escape_field(&inspection.remote_default_branch),
        escape_field(&inspection.local_branch),
        optional_yes_no(inspection.in_sync).to_string(),
        inspection.remote_protocol.to_string(),
        optional_yes_no(inspection.origin_matches_canonical()).to_string(),
    ]
    .join(",")
}

/// Write the header and one row per inspection
pub fn write_audit_report<W: Write + ?Sized>(writer: &mut W, inspections: &[RepositoryInspection]) -> io::Result<()> {
    writeln!(writer, "{AUDIT_REPORT_HEADER}")?;
    for inspection in inspections {
        writeln!(writer, "{}", audit_row(inspection))?;
    }
    writer.flush()
}
