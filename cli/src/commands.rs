use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use kritikos_core::RewriteMode;
use kritikos_core::SessionState;
use kritikos_core::Tone;
use kritikos_core::input::select_audit_input;
use kritikos_core::refine_text;
use kritikos_core::render::write_audit_human;
use kritikos_core::render::write_rewrite_human;
use kritikos_core::run_audit;
use kritikos_export::ReportKind;
use kritikos_export::export_report;
use kritikos_gateway::ModelGateway;

use crate::export_dir;

const STDIN_MARKER: &str = "-";

#[derive(Debug, Args)]
pub struct AuditArgs {
    /// Source file, PDF or PNG/JPEG screenshot to audit. `-` reads text from stdin.
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Audit this text. Ignored when PATH is given.
    #[arg(long, value_name = "TEXT")]
    pub text: Option<String>,

    /// Print the parsed result as JSON instead of the dashboard.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Also write Security_Audit.pdf into the current directory, or into DIR
    /// with `--export=DIR`.
    #[arg(
        long,
        value_name = "DIR",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "."
    )]
    pub export: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct RefineArgs {
    /// Draft to rewrite. Omit or pass `-` to read it from stdin.
    #[arg(value_name = "TEXT")]
    pub text: Option<String>,

    /// Persona (executive|direct|colloquial).
    #[arg(long, default_value = "executive", value_parser = parse_tone)]
    pub tone: Tone,

    /// Optimization (grammar-check|architect-mode).
    #[arg(long, default_value = "grammar-check", value_parser = parse_mode)]
    pub mode: RewriteMode,

    /// Print the result as JSON.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Also write Refined.pdf into the current directory, or into DIR with
    /// `--export=DIR`.
    #[arg(
        long,
        value_name = "DIR",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "."
    )]
    pub export: Option<PathBuf>,
}

fn parse_tone(s: &str) -> Result<Tone, String> {
    s.parse()
}

fn parse_mode(s: &str) -> Result<RewriteMode, String> {
    s.parse()
}

fn read_stdin() -> anyhow::Result<String> {
    std::io::read_to_string(std::io::stdin()).context("failed to read stdin")
}

pub async fn run_audit_command(
    args: AuditArgs,
    gateway: &Arc<dyn ModelGateway>,
) -> anyhow::Result<()> {
    let AuditArgs {
        path,
        text,
        json,
        export,
    } = args;

    let (upload, pasted) = match path {
        Some(path) if path.as_os_str() == STDIN_MARKER => (None, Some(read_stdin()?)),
        Some(path) => (Some(path), text),
        None => (None, text),
    };
    let input = select_audit_input(upload.as_deref(), pasted.as_deref())?;

    let mut state = SessionState::new();
    let result = run_audit(&mut state, gateway.as_ref(), input).await?;

    let mut stdout = std::io::stdout().lock();
    if json {
        writeln!(stdout, "{}", serde_json::to_string_pretty(result)?)?;
    } else {
        write_audit_human(result, &mut stdout)?;
    }

    if let Some(dir) = export {
        let saved = save_report(ReportKind::Audit, result.raw_text(), &export_dir(Some(dir)))?;
        report_saved(&saved);
    }
    Ok(())
}

pub async fn run_refine_command(
    args: RefineArgs,
    gateway: &Arc<dyn ModelGateway>,
) -> anyhow::Result<()> {
    let RefineArgs {
        text,
        tone,
        mode,
        json,
        export,
    } = args;

    let draft = match text {
        Some(text) if text != STDIN_MARKER => text,
        _ => read_stdin()?,
    };

    let mut state = SessionState::new();
    let result = refine_text(&mut state, gateway.as_ref(), &draft, tone, mode).await?;

    let mut stdout = std::io::stdout().lock();
    if json {
        writeln!(stdout, "{}", serde_json::to_string_pretty(result)?)?;
    } else {
        write_rewrite_human(result, &mut stdout)?;
    }

    if let Some(dir) = export {
        let saved = save_report(ReportKind::Rewrite, result.raw_text(), &export_dir(Some(dir)))?;
        report_saved(&saved);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SavedReport {
    pub path: PathBuf,
    pub replaced: usize,
}

/// Export `text` and write it to `dir` under the report's fixed filename.
pub(crate) fn save_report(
    kind: ReportKind,
    text: &str,
    dir: &Path,
) -> anyhow::Result<SavedReport> {
    let report = export_report(kind, text)?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join(report.filename);
    std::fs::write(&path, &report.bytes)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(SavedReport {
        path,
        replaced: report.replaced,
    })
}

pub(crate) fn describe_saved(saved: &SavedReport) -> String {
    if saved.replaced == 0 {
        format!("Saved {}", saved.path.display())
    } else {
        format!(
            "Saved {} ({} unsupported characters replaced with '{}')",
            saved.path.display(),
            saved.replaced,
            kritikos_export::PLACEHOLDER
        )
    }
}

#[allow(clippy::print_stderr)]
fn report_saved(saved: &SavedReport) {
    eprintln!("{}", describe_saved(saved));
}
