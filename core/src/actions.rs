//! User-triggered actions. Each one is a single gateway round trip that either
//! replaces its slot in [`SessionState`] or leaves the slot exactly as it was.

use kritikos_gateway::ModelGateway;
use tracing::info;
use tracing::warn;

use crate::error::ActionError;
use crate::input::AuditInput;
use crate::models::AuditResult;
use crate::models::RewriteResult;
use crate::prompts::RewriteMode;
use crate::prompts::Tone;
use crate::prompts::build_audit_request;
use crate::prompts::build_rewrite_request;
use crate::state::SessionState;

pub async fn run_audit<'s, G>(
    state: &'s mut SessionState,
    gateway: &G,
    input: Option<AuditInput>,
) -> Result<&'s AuditResult, ActionError>
where
    G: ModelGateway + ?Sized,
{
    let Some(input) = input else {
        warn!("audit requested without input");
        return Err(ActionError::InputMissing);
    };
    info!(input = %input.describe(), "requesting audit");
    let request = build_audit_request(input)?;
    let response = gateway.generate(request).await?;

    let result = AuditResult::from_response(response.text);
    info!(
        score = ?result.score(),
        severity = ?result.severity(),
        code_blocks = result.code_blocks().len(),
        "audit complete"
    );
    Ok(state.set_audit(result))
}

pub async fn refine_text<'s, G>(
    state: &'s mut SessionState,
    gateway: &G,
    draft: &str,
    tone: Tone,
    mode: RewriteMode,
) -> Result<&'s RewriteResult, ActionError>
where
    G: ModelGateway + ?Sized,
{
    let request = build_rewrite_request(draft, tone, mode)?;
    let response = gateway.generate(request).await?;
    info!(%tone, %mode, "rewrite complete");
    Ok(state.set_rewrite(RewriteResult::from_response(response.text)))
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use kritikos_gateway::GatewayError;
    use kritikos_gateway::GatewayRequest;
    use kritikos_gateway::GatewayResponse;
    use kritikos_gateway::Payload;
    use kritikos_gateway::Task;
    use pretty_assertions::assert_eq;

    struct ScriptedGateway {
        replies: Mutex<VecDeque<Result<GatewayResponse, GatewayError>>>,
        requests: Mutex<Vec<GatewayRequest>>,
    }

    impl ScriptedGateway {
        fn new(replies: Vec<Result<&str, GatewayError>>) -> Self {
            let replies = replies
                .into_iter()
                .map(|reply| {
                    reply.map(|text| GatewayResponse {
                        text: text.to_string(),
                    })
                })
                .collect();
            Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<GatewayRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelGateway for ScriptedGateway {
        async fn generate(
            &self,
            request: GatewayRequest,
        ) -> Result<GatewayResponse, GatewayError> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(GatewayError::upstream("no scripted reply")))
        }
    }

    #[tokio::test]
    async fn successful_audit_populates_slot() {
        let gateway = ScriptedGateway::new(vec![Ok(
            "SCORE: 73\nVULNERABILITIES: [2, 5, 1]\n```py\nprint('ok')\n```",
        )]);
        let mut state = SessionState::new();

        let result = run_audit(
            &mut state,
            &gateway,
            Some(AuditInput::Text("print(input())".to_string())),
        )
        .await
        .expect("audit succeeds");
        assert_eq!(result.score(), Some(73));
        assert_eq!(result.suggested_fix(), Some("print('ok')"));

        let requests = gateway.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].task, Task::Audit);
        assert_eq!(
            requests[0].payload,
            Payload::Text("print(input())".to_string())
        );
    }

    #[tokio::test]
    async fn network_failure_keeps_previous_audit() {
        let gateway = ScriptedGateway::new(vec![
            Ok("SCORE: 40"),
            Err(GatewayError::Network("connection reset by peer".to_string())),
        ]);
        let mut state = SessionState::new();
        let input = || Some(AuditInput::Text("eval(x)".to_string()));

        run_audit(&mut state, &gateway, input())
            .await
            .expect("first audit succeeds");
        let err = run_audit(&mut state, &gateway, input())
            .await
            .expect_err("second audit fails");

        assert_matches!(
            err,
            ActionError::Gateway(GatewayError::Network(message))
                if message == "connection reset by peer"
        );
        assert_eq!(state.audit().map(AuditResult::raw_text), Some("SCORE: 40"));
        assert_eq!(state.generation(), 0);
    }

    #[tokio::test]
    async fn missing_input_never_calls_gateway() {
        let gateway = ScriptedGateway::new(vec![Ok("SCORE: 1")]);
        let mut state = SessionState::new();

        assert_matches!(
            run_audit(&mut state, &gateway, None).await,
            Err(ActionError::InputMissing)
        );
        assert_matches!(
            refine_text(&mut state, &gateway, "\n", Tone::Direct, RewriteMode::GrammarCheck).await,
            Err(ActionError::InputMissing)
        );
        assert!(gateway.requests().is_empty());
        assert_eq!(state.audit(), None);
    }

    #[tokio::test]
    async fn refine_overwrites_previous_rewrite() {
        let gateway = ScriptedGateway::new(vec![Ok("First."), Ok("Second.")]);
        let mut state = SessionState::new();

        refine_text(&mut state, &gateway, "first", Tone::Executive, RewriteMode::GrammarCheck)
            .await
            .expect("first rewrite");
        let result = refine_text(
            &mut state,
            &gateway,
            "second",
            Tone::Colloquial,
            RewriteMode::ArchitectMode,
        )
        .await
        .expect("second rewrite");
        assert_eq!(result.raw_text(), "Second.");

        let requests = gateway.requests();
        assert_eq!(requests[1].task, Task::Rewrite);
        assert!(requests[1].instruction.starts_with("Task: Architect Mode\nTone: Colloquial"));
    }

    #[tokio::test]
    async fn auth_failure_leaves_empty_rewrite_slot_empty() {
        let gateway = ScriptedGateway::new(vec![Err(GatewayError::Auth(
            "API key not valid. Please pass a valid API key.".to_string(),
        ))]);
        let mut state = SessionState::new();

        let err = refine_text(&mut state, &gateway, "draft", Tone::Direct, RewriteMode::GrammarCheck)
            .await
            .expect_err("auth fails");
        assert_eq!(
            err.to_string(),
            "authentication failed: API key not valid. Please pass a valid API key."
        );
        assert_eq!(state.rewrite(), None);
    }
}
