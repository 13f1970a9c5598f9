//! Plain-text dashboard for audit and rewrite results.

use std::io;
use std::io::Write;

use crate::models::AuditResult;
use crate::models::RewriteResult;

pub const NOT_REPORTED: &str = "not reported";
pub const NO_REMEDIATION: &str = "No immediate code remediation identified.";

fn or_not_reported<T: ToString>(value: Option<T>) -> String {
    match value {
        Some(value) => value.to_string(),
        None => NOT_REPORTED.to_string(),
    }
}

pub fn write_audit_human<W: Write>(result: &AuditResult, writer: &mut W) -> io::Result<()> {
    let score = or_not_reported(result.score().map(|score| format!("{score}/100")));
    let severity = result.severity();

    writeln!(writer, "Security Score: {score}")?;
    writeln!(
        writer,
        "Critical: {}",
        or_not_reported(severity.map(|counts| counts.critical))
    )?;
    writeln!(
        writer,
        "Medium: {}",
        or_not_reported(severity.map(|counts| counts.medium))
    )?;
    writeln!(
        writer,
        "Best Practice: {}",
        or_not_reported(severity.map(|counts| counts.low))
    )?;

    writeln!(writer)?;
    writeln!(writer, "Remediation Preview:")?;
    match result.suggested_fix() {
        Some(fix) => {
            for line in fix.lines() {
                writeln!(writer, "    {line}")?;
            }
        }
        None => writeln!(writer, "  {NO_REMEDIATION}")?,
    }

    writeln!(writer)?;
    writeln!(writer, "Full Scrutiny Log:")?;
    writeln!(writer, "{}", result.raw_text())?;
    Ok(())
}

pub fn write_rewrite_human<W: Write>(result: &RewriteResult, writer: &mut W) -> io::Result<()> {
    writeln!(writer, "Refined Version:")?;
    writeln!(writer, "{}", result.raw_text())
}
