//! Line-oriented interactive session over a single [`SessionState`].

use std::io::BufRead;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use kritikos_core::ActionError;
use kritikos_core::InputField;
use kritikos_core::RewriteMode;
use kritikos_core::SessionState;
use kritikos_core::Slot;
use kritikos_core::SlotValue;
use kritikos_core::Tone;
use kritikos_core::config::Config;
use kritikos_core::input::select_audit_input;
use kritikos_core::refine_text;
use kritikos_core::render::write_audit_human;
use kritikos_core::render::write_rewrite_human;
use kritikos_core::run_audit;
use kritikos_export::ReportKind;
use kritikos_gateway::GeminiGateway;
use kritikos_gateway::ModelGateway;
use owo_colors::OwoColorize;
use supports_color::Stream;

use crate::commands::describe_saved;
use crate::commands::save_report;
use crate::credential_message;
use crate::export_dir;

const PROMPT: &str = "kritikos> ";
const END_OF_BLOCK: &str = ".";

const HELP: &str = r#"Commands:
  audit [PATH]            audit PATH, or the text entered with `paste`
  paste                   enter code to audit, ending with a line containing only '.'
  refine [TONE] [MODE]    enter a draft the same way and rewrite it
                          TONE: executive|direct|colloquial  MODE: grammar-check|architect-mode
  show [audit|rewrite]    print stored results
  export audit|rewrite [DIR]
                          write Security_Audit.pdf or Refined.pdf into DIR (default: .)
  reset audit|rewrite|all clear results and the inputs that produced them
  key VALUE               use VALUE as the API key when the environment has none
  status                  models, credential and session state
  help                    this text
  quit                    leave (results are not kept)"#;

#[derive(Debug, Clone, PartialEq, Eq)]
enum ResetTarget {
    Slot(Slot),
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ShellCommand {
    Empty,
    Audit(Option<PathBuf>),
    Paste,
    Refine { tone: Tone, mode: RewriteMode },
    Show(Option<Slot>),
    Export { slot: Slot, dir: Option<PathBuf> },
    Reset(ResetTarget),
    Key(String),
    Status,
    Help,
    Quit,
}

fn parse_slot(word: &str) -> Result<Slot, String> {
    match word.to_ascii_lowercase().as_str() {
        "audit" => Ok(Slot::Audit),
        "rewrite" | "refine" => Ok(Slot::Rewrite),
        _ => Err(format!("unknown slot: {word}. Expected audit|rewrite")),
    }
}

fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let arg = (!rest.is_empty()).then_some(rest);

    match verb.to_ascii_lowercase().as_str() {
        "" => Ok(ShellCommand::Empty),
        "audit" => Ok(ShellCommand::Audit(arg.map(PathBuf::from))),
        "paste" => Ok(ShellCommand::Paste),
        "refine" => {
            let (tone, mode) = match rest.split_once(char::is_whitespace) {
                Some((tone, mode)) => (tone.parse()?, mode.parse()?),
                None if rest.is_empty() => (Tone::default(), RewriteMode::default()),
                None => (rest.parse()?, RewriteMode::default()),
            };
            Ok(ShellCommand::Refine { tone, mode })
        }
        "show" => arg
            .map(parse_slot)
            .transpose()
            .map(ShellCommand::Show),
        "export" => {
            let Some(arg) = arg else {
                return Err("usage: export audit|rewrite [DIR]".to_string());
            };
            let (slot, dir) = match arg.split_once(char::is_whitespace) {
                Some((slot, dir)) => (slot, Some(PathBuf::from(dir.trim()))),
                None => (arg, None),
            };
            Ok(ShellCommand::Export {
                slot: parse_slot(slot)?,
                dir,
            })
        }
        "reset" => match arg {
            Some(target) if target.eq_ignore_ascii_case("all") => {
                Ok(ShellCommand::Reset(ResetTarget::All))
            }
            Some(target) => {
                parse_slot(target).map(|slot| ShellCommand::Reset(ResetTarget::Slot(slot)))
            }
            None => Err("usage: reset audit|rewrite|all".to_string()),
        },
        "key" => arg
            .map(|key| ShellCommand::Key(key.to_string()))
            .ok_or_else(|| "usage: key VALUE".to_string()),
        "status" => Ok(ShellCommand::Status),
        "help" | "?" => Ok(ShellCommand::Help),
        "quit" | "exit" => Ok(ShellCommand::Quit),
        other => Err(format!("unknown command: {other}. Type `help` for a list")),
    }
}

/// Read lines up to a line holding only `.` (or end of input).
fn read_block<R: BufRead>(input: &mut R) -> std::io::Result<String> {
    let mut block = String::new();
    let mut line = String::new();
    loop {
        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        if line.trim_end_matches(['\r', '\n']) == END_OF_BLOCK {
            break;
        }
        block.push_str(&line);
    }
    Ok(block)
}

pub struct Shell {
    state: SessionState,
    config: Config,
    manual_key: Option<String>,
    gateway: Option<Arc<dyn ModelGateway>>,
    color: bool,
}

impl Shell {
    pub fn new(config: Config, manual_key: Option<String>) -> Self {
        Self {
            state: SessionState::new(),
            config,
            manual_key,
            gateway: None,
            color: supports_color::on_cached(Stream::Stdout).is_some(),
        }
    }

    /// Shell bound to an already connected gateway.
    pub fn with_gateway(config: Config, gateway: Arc<dyn ModelGateway>) -> Self {
        Self {
            state: SessionState::new(),
            config,
            manual_key: None,
            gateway: Some(gateway),
            color: false,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub async fn run<R: BufRead, W: Write>(
        &mut self,
        mut input: R,
        out: &mut W,
    ) -> anyhow::Result<()> {
        writeln!(out, "Kritikos Guard. Type `help` for commands.")?;
        let mut line = String::new();
        loop {
            write!(out, "{PROMPT}")?;
            out.flush()?;
            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(out)?;
                break;
            }
            let command = match parse_command(&line) {
                Ok(command) => command,
                Err(message) => {
                    self.warn(out, &message)?;
                    continue;
                }
            };
            if command == ShellCommand::Quit {
                break;
            }
            self.dispatch(command, &mut input, out).await?;
        }
        Ok(())
    }

    async fn dispatch<R: BufRead, W: Write>(
        &mut self,
        command: ShellCommand,
        input: &mut R,
        out: &mut W,
    ) -> anyhow::Result<()> {
        match command {
            ShellCommand::Empty | ShellCommand::Quit => {}
            ShellCommand::Audit(path) => {
                if let Some(path) = path {
                    self.state
                        .set_input(InputField::AuditUpload, path.to_string_lossy());
                }
                let outcome = self.audit().await;
                self.report_outcome(outcome, out)?;
            }
            ShellCommand::Paste => {
                writeln!(out, "Paste code, then a line containing only '.':")?;
                let code = read_block(input)?;
                let lines = code.lines().count();
                self.state.set_input(InputField::AuditCode, code);
                writeln!(out, "Captured {lines} lines for the next audit.")?;
            }
            ShellCommand::Refine { tone, mode } => {
                writeln!(out, "Paste draft, then a line containing only '.':")?;
                let draft = read_block(input)?;
                self.state.set_input(InputField::RewriteDraft, draft);
                let outcome = self.refine(tone, mode).await;
                self.report_outcome(outcome, out)?;
            }
            ShellCommand::Show(slot) => {
                let slots = slot.map_or(Slot::ALL.to_vec(), |slot| vec![slot]);
                for slot in slots {
                    self.show(slot, out)?;
                }
            }
            ShellCommand::Export { slot, dir } => self.export(slot, dir, out)?,
            ShellCommand::Reset(target) => {
                match target {
                    ResetTarget::Slot(slot) => {
                        self.state.reset_slot(slot);
                        writeln!(out, "Cleared {slot}.")?;
                    }
                    ResetTarget::All => {
                        self.state.reset_all();
                        writeln!(out, "Cleared audit and rewrite.")?;
                    }
                }
            }
            ShellCommand::Key(key) => {
                self.manual_key = Some(key);
                self.gateway = None;
                match self.gateway() {
                    Ok(_) => writeln!(out, "API key set for this session.")?,
                    Err(err) => self.report_error(&err, out)?,
                }
            }
            ShellCommand::Status => self.status(out)?,
            ShellCommand::Help => writeln!(out, "{HELP}")?,
        }
        Ok(())
    }

    fn gateway(&mut self) -> Result<Arc<dyn ModelGateway>, ActionError> {
        if let Some(gateway) = &self.gateway {
            return Ok(Arc::clone(gateway));
        }
        let api_key = self
            .config
            .provider
            .resolve_api_key(self.manual_key.as_deref())?;
        let gateway: Arc<dyn ModelGateway> = Arc::new(GeminiGateway::new(
            self.config.provider.clone(),
            api_key,
            self.config.models.clone(),
        )?);
        self.gateway = Some(Arc::clone(&gateway));
        Ok(gateway)
    }

    async fn audit(&mut self) -> Result<Slot, ActionError> {
        let gateway = self.gateway()?;
        let upload = self.state.input(InputField::AuditUpload).map(PathBuf::from);
        let pasted = self.state.input(InputField::AuditCode).map(str::to_string);
        let input = select_audit_input(upload.as_deref(), pasted.as_deref())?;
        run_audit(&mut self.state, gateway.as_ref(), input).await?;
        Ok(Slot::Audit)
    }

    async fn refine(&mut self, tone: Tone, mode: RewriteMode) -> Result<Slot, ActionError> {
        let gateway = self.gateway()?;
        let draft = self
            .state
            .input(InputField::RewriteDraft)
            .unwrap_or_default()
            .to_string();
        refine_text(&mut self.state, gateway.as_ref(), &draft, tone, mode).await?;
        Ok(Slot::Rewrite)
    }

    fn report_outcome<W: Write>(
        &self,
        outcome: Result<Slot, ActionError>,
        out: &mut W,
    ) -> std::io::Result<()> {
        match outcome {
            Ok(slot) => self.show(slot, out),
            Err(err) => self.report_error(&err, out),
        }
    }

    fn report_error<W: Write>(&self, err: &ActionError, out: &mut W) -> std::io::Result<()> {
        match err {
            ActionError::InputMissing => {
                self.warn(out, "Please provide input material for Kritikos.")
            }
            ActionError::CredentialMissing(err) => self.error(out, &credential_message(err)),
            ActionError::Gateway(err) => {
                let message = match err.status() {
                    Some(code) => {
                        format!("{} error (HTTP {code}): {}", err.kind(), err.message())
                    }
                    None => format!("{} error: {}", err.kind(), err.message()),
                };
                self.error(out, &message)
            }
            ActionError::Input(err) => self.error(out, &err.to_string()),
        }
    }

    fn show<W: Write>(&self, slot: Slot, out: &mut W) -> std::io::Result<()> {
        match self.state.get(slot) {
            Some(SlotValue::Audit(result)) => write_audit_human(result, out),
            Some(SlotValue::Rewrite(result)) => write_rewrite_human(result, out),
            None => writeln!(out, "{slot}: empty"),
        }
    }

    fn export<W: Write>(
        &self,
        slot: Slot,
        dir: Option<PathBuf>,
        out: &mut W,
    ) -> anyhow::Result<()> {
        let Some(value) = self.state.get(slot) else {
            self.warn(out, &format!("nothing to export: {slot} is empty"))?;
            return Ok(());
        };
        let kind = match slot {
            Slot::Audit => ReportKind::Audit,
            Slot::Rewrite => ReportKind::Rewrite,
        };
        match save_report(kind, value.raw_text(), &export_dir(dir)) {
            Ok(saved) => writeln!(out, "{}", describe_saved(&saved))?,
            Err(err) => self.error(out, &format!("{err:#}"))?,
        }
        Ok(())
    }

    fn status<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        let credential = if self.gateway.is_some()
            || self
                .config
                .provider
                .resolve_api_key(self.manual_key.as_deref())
                .is_ok()
        {
            "configured".to_string()
        } else {
            let var = self.config.provider.env_key.as_deref().unwrap_or("the API key variable");
            format!("missing (set {var} or use `key`)")
        };
        let slot_state = |slot| {
            if self.state.is_populated(slot) {
                "populated"
            } else {
                "empty"
            }
        };

        writeln!(out, "audit model:   {}", self.config.models.audit)?;
        writeln!(out, "rewrite model: {}", self.config.models.rewrite)?;
        writeln!(out, "timeout:       {}s", self.config.request_timeout().as_secs_f64())?;
        writeln!(out, "credential:    {credential}")?;
        writeln!(out, "audit:         {}", slot_state(Slot::Audit))?;
        writeln!(out, "rewrite:       {}", slot_state(Slot::Rewrite))?;
        writeln!(out, "generation:    {}", self.state.generation())?;
        Ok(())
    }

    fn warn<W: Write>(&self, out: &mut W, message: &str) -> std::io::Result<()> {
        if self.color {
            writeln!(out, "{} {message}", "warning:".yellow().bold())
        } else {
            writeln!(out, "warning: {message}")
        }
    }

    fn error<W: Write>(&self, out: &mut W, message: &str) -> std::io::Result<()> {
        if self.color {
            writeln!(out, "{} {message}", "error:".red().bold())
        } else {
            writeln!(out, "error: {message}")
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::io::Cursor;
    use std::sync::Mutex;

    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use kritikos_core::AuditResult;
    use kritikos_core::config::ConfigOverrides;
    use kritikos_core::config::ConfigToml;
    use kritikos_gateway::GatewayError;
    use kritikos_gateway::GatewayRequest;
    use kritikos_gateway::GatewayResponse;
    use kritikos_gateway::Payload;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    struct ScriptedGateway {
        replies: Mutex<VecDeque<Result<String, GatewayError>>>,
        requests: Mutex<Vec<GatewayRequest>>,
    }

    impl ScriptedGateway {
        fn new(replies: Vec<Result<&str, GatewayError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(
                    replies
                        .into_iter()
                        .map(|reply| reply.map(str::to_string))
                        .collect(),
                ),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ModelGateway for ScriptedGateway {
        async fn generate(
            &self,
            request: GatewayRequest,
        ) -> Result<GatewayResponse, GatewayError> {
            self.requests.lock().unwrap().push(request);
            let reply = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GatewayError::upstream("no scripted reply")));
            reply.map(|text| GatewayResponse { text })
        }
    }

    fn test_config() -> Config {
        let mut config = Config::load_from_base_config_with_overrides(
            ConfigToml::default(),
            ConfigOverrides::default(),
            PathBuf::from("/tmp/kritikos-test-home"),
        )
        .expect("config");
        config.provider.env_key = Some("KRITIKOS_TEST_KEY_THAT_IS_NEVER_SET".to_string());
        config
    }

    async fn run_script(shell: &mut Shell, script: &str) -> String {
        let mut out = Vec::new();
        shell
            .run(Cursor::new(script.to_string()), &mut out)
            .await
            .expect("shell runs");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("  "), Ok(ShellCommand::Empty));
        assert_eq!(
            parse_command("audit src/main.py"),
            Ok(ShellCommand::Audit(Some(PathBuf::from("src/main.py"))))
        );
        assert_eq!(
            parse_command("refine direct architect mode"),
            Ok(ShellCommand::Refine {
                tone: Tone::Direct,
                mode: RewriteMode::ArchitectMode
            })
        );
        assert_eq!(
            parse_command("refine"),
            Ok(ShellCommand::Refine {
                tone: Tone::Executive,
                mode: RewriteMode::GrammarCheck
            })
        );
        assert_eq!(
            parse_command("export audit /tmp/out dir"),
            Ok(ShellCommand::Export {
                slot: Slot::Audit,
                dir: Some(PathBuf::from("/tmp/out dir"))
            })
        );
        assert_eq!(
            parse_command("RESET all"),
            Ok(ShellCommand::Reset(ResetTarget::All))
        );
        assert_eq!(parse_command("show"), Ok(ShellCommand::Show(None)));
        assert!(parse_command("reset").is_err());
        assert!(parse_command("export everything").is_err());
        assert!(parse_command("frobnicate").is_err());
    }

    #[test]
    fn block_ends_at_dot_line_or_eof() {
        let mut input = Cursor::new("a = 1\n  b\n.\nstatus\n");
        assert_eq!(read_block(&mut input).expect("read"), "a = 1\n  b\n");
        let mut rest = String::new();
        input.read_line(&mut rest).expect("read");
        assert_eq!(rest, "status\n");

        let mut unterminated = Cursor::new("tail");
        assert_eq!(read_block(&mut unterminated).expect("read"), "tail");
    }

    #[tokio::test]
    async fn pasted_code_is_audited_and_reset_clears_it() {
        let gateway = ScriptedGateway::new(vec![Ok(
            "SCORE: 73\nVULNERABILITIES: [2, 5, 1]\nCORRECTED_CODE_START\nprint('ok')\nCORRECTED_CODE_END",
        )]);
        let mut shell = Shell::with_gateway(test_config(), gateway.clone());

        let output = run_script(
            &mut shell,
            "paste\nprint(eval(input()))\n.\naudit\nreset audit\naudit\nquit\n",
        )
        .await;

        assert!(output.contains("Captured 1 lines for the next audit."));
        assert!(output.contains("Security Score: 73/100\nCritical: 2\nMedium: 5\nBest Practice: 1"));
        assert!(output.contains("Cleared audit."));
        assert!(output.contains("warning: Please provide input material for Kritikos."));
        assert_eq!(shell.state().generation(), 1);
        assert_eq!(shell.state().audit(), None);

        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].payload,
            Payload::Text("print(eval(input()))\n".to_string())
        );
    }

    #[tokio::test]
    async fn failed_audit_keeps_previous_result() {
        let gateway = ScriptedGateway::new(vec![
            Ok("SCORE: 40"),
            Err(GatewayError::Network("connection refused".to_string())),
        ]);
        let mut shell = Shell::with_gateway(test_config(), gateway);

        let output = run_script(&mut shell, "paste\nx\n.\naudit\naudit\n").await;

        assert!(output.contains("error: network error: connection refused"));
        assert_eq!(
            shell.state().audit().map(AuditResult::raw_text),
            Some("SCORE: 40")
        );
    }

    #[tokio::test]
    async fn uploaded_path_does_not_survive_a_reset() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("app.py");
        std::fs::write(&path, "os.system(cmd)\n").expect("write");
        let gateway = ScriptedGateway::new(vec![Ok("SCORE: 10"), Ok("SCORE: 11")]);
        let mut shell = Shell::with_gateway(test_config(), gateway.clone());

        let script = format!("audit {}\nreset rewrite\naudit\n", path.display());
        let output = run_script(&mut shell, &script).await;

        assert!(output.contains("Security Score: 10/100"));
        assert!(output.contains("warning: Please provide input material for Kritikos."));
        assert_eq!(shell.state().input(InputField::AuditUpload), None);
        let requests = gateway.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].payload, Payload::Text("os.system(cmd)\n".to_string()));
    }

    #[tokio::test]
    async fn upstream_failure_shows_status_and_verbatim_message() {
        let gateway = ScriptedGateway::new(vec![Err(GatewayError::Upstream {
            status: Some(503),
            message: "The model is overloaded.".to_string(),
        })]);
        let mut shell = Shell::with_gateway(test_config(), gateway);

        let output = run_script(&mut shell, "paste\nx\n.\naudit\n").await;

        assert!(output.contains("error: upstream error (HTTP 503): The model is overloaded."));
        assert_eq!(shell.state().audit(), None);
    }

    #[tokio::test]
    async fn refine_then_show_and_export() {
        let gateway = ScriptedGateway::new(vec![Ok("Where are they now? When will they return?")]);
        let mut shell = Shell::with_gateway(test_config(), gateway);
        let dir = TempDir::new().expect("tempdir");

        let script = format!(
            "refine direct grammar-check\nwhere is they now? when was they return?\n.\nshow rewrite\nexport rewrite {}\nexport audit {}\n",
            dir.path().display(),
            dir.path().display()
        );
        let output = run_script(&mut shell, &script).await;

        assert!(output.contains("Refined Version:\nWhere are they now? When will they return?"));
        assert!(output.contains(&format!(
            "Saved {}",
            dir.path().join("Refined.pdf").display()
        )));
        assert!(output.contains("warning: nothing to export: audit is empty"));
        assert!(dir.path().join("Refined.pdf").exists());
        assert!(!dir.path().join("Security_Audit.pdf").exists());
    }

    #[tokio::test]
    async fn missing_credential_blocks_only_gateway_actions() {
        let mut shell = Shell::new(test_config(), None);
        shell.color = false;

        let output = run_script(&mut shell, "paste\nx\n.\naudit\nreset all\nstatus\n").await;

        assert!(output.contains(
            "error: no API key configured: set KRITIKOS_TEST_KEY_THAT_IS_NEVER_SET or enter a key manually"
        ));
        assert!(output.contains("Cleared audit and rewrite."));
        assert!(output.contains(
            "credential:    missing (set KRITIKOS_TEST_KEY_THAT_IS_NEVER_SET or use `key`)"
        ));
        assert!(output.contains("generation:    1"));
    }

    #[tokio::test]
    async fn manual_key_satisfies_credential_check() {
        let mut shell = Shell::new(test_config(), None);
        shell.color = false;

        let output = run_script(&mut shell, "key test-key-123\nstatus\n").await;

        assert!(output.contains("API key set for this session."));
        assert!(output.contains("credential:    configured"));
        assert!(!output.contains("test-key-123\n"));
        assert_matches!(shell.gateway, Some(_));
    }
}
