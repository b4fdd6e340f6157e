//! JSON-lines bridge between the host runtime and the memory hooks.
//!
//! Each input line is one hook event tagged by `hook`; each event gets one
//! reply line. The bridge ends on a `stop` event, end of input, or the
//! shutdown signal, and always drains the buffers before returning.

use std::future::Future;

use anyhow::{Context as _, Result};
use keel_capture::{CaptureOutcome, DrainReport, InjectedContext, MemoryHooks};
use keel_types::{AfterResponseEvent, BeforeResponseEvent};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, warn};

/// An event from the host.
#[derive(Debug, Deserialize)]
#[serde(tag = "hook", rename_all = "snake_case")]
pub enum HookRequest {
    BeforeResponse(BeforeResponseEvent),
    AfterResponse(AfterResponseEvent),
    Stop,
}

/// The reply written for each event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "hook", rename_all = "snake_case")]
pub enum HookReply {
    BeforeResponse {
        /// Block to prepend, if any.
        context: Option<String>,
        decisions_included: u32,
    },
    AfterResponse {
        outcome: String,
        /// Messages in the channel's live buffer afterwards.
        buffered: usize,
    },
    Stop {
        channels: usize,
        extraction_calls: usize,
        messages: usize,
    },
    Error {
        message: String,
    },
}

impl HookReply {
    fn recalled(injected: Option<InjectedContext>) -> Self {
        match injected {
            Some(ctx) => HookReply::BeforeResponse {
                context: Some(ctx.text),
                decisions_included: ctx.decisions_included,
            },
            None => HookReply::BeforeResponse {
                context: None,
                decisions_included: 0,
            },
        }
    }

    fn captured(outcome: &CaptureOutcome) -> Self {
        let (label, buffered) = match outcome {
            CaptureOutcome::Ignored => ("ignored", 0),
            CaptureOutcome::Buffered { size, .. } => ("buffered", *size),
            CaptureOutcome::Overflowed { retained, .. } => ("overflowed", *retained),
            CaptureOutcome::Disabled => ("disabled", 0),
            CaptureOutcome::Closed => ("closed", 0),
        };
        HookReply::AfterResponse {
            outcome: label.to_string(),
            buffered,
        }
    }

    fn stopped(report: &DrainReport) -> Self {
        HookReply::Stop {
            channels: report.outcomes.len(),
            extraction_calls: report.extraction_calls(),
            messages: report.messages(),
        }
    }
}

/// Serve hook events from `input` until stop, end of input, or `shutdown`.
pub async fn serve<R, W, S>(
    hooks: &MemoryHooks,
    input: R,
    mut output: W,
    shutdown: S,
) -> Result<DrainReport>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    let mut lines = input.lines();
    tokio::pin!(shutdown);

    loop {
        let line = tokio::select! {
            biased;
            _ = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
            line = lines.next_line() => line.context("failed to read hook event")?,
        };
        let Some(line) = line else {
            debug!("Input closed");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<HookRequest>(&line) {
            Ok(HookRequest::BeforeResponse(event)) => {
                HookReply::recalled(hooks.before_response(&event).await)
            }
            Ok(HookRequest::AfterResponse(event)) => {
                HookReply::captured(&hooks.after_response(&event).await)
            }
            Ok(HookRequest::Stop) => {
                let report = hooks.on_stop().await;
                write_reply(&mut output, &HookReply::stopped(&report)).await?;
                return Ok(report);
            }
            Err(e) => {
                warn!(error = %e, "Ignoring malformed hook event");
                HookReply::Error {
                    message: e.to_string(),
                }
            }
        };
        write_reply(&mut output, &reply).await?;
    }

    Ok(hooks.on_stop().await)
}

async fn write_reply<W: AsyncWrite + Unpin>(output: &mut W, reply: &HookReply) -> Result<()> {
    let mut line = serde_json::to_vec(reply)?;
    line.push(b'\n');
    output
        .write_all(&line)
        .await
        .context("failed to write hook reply")?;
    output.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_capture::testing::{MockExtractor, MockRecall};
    use keel_capture::{BufferConfig, ConversationBufferRegistry};
    use keel_types::RawMessage;
    use std::sync::Arc;

    fn hooks(extractor: &Arc<MockExtractor>) -> MemoryHooks {
        let registry =
            ConversationBufferRegistry::new(BufferConfig::default(), extractor.clone()).unwrap();
        let recall = Arc::new(MockRecall::with_context("Release frozen until May 2", 1));
        MemoryHooks::new(registry).with_recall(recall, 1500)
    }

    fn replies(output: &[u8]) -> Vec<HookReply> {
        std::str::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    const SESSION: &str = concat!(
        r#"{"hook":"before_response","prompt":"When did we agree to unfreeze the release?","sessionKey":"s1"}"#,
        "\n",
        r#"{"hook":"after_response","sessionKey":"s1","messages":[{"role":"user","content":"When did we agree to unfreeze the release?"},{"role":"assistant","content":"The freeze lifts on May 2."}]}"#,
        "\n",
        "\n",
        r#"{"hook":"after_response","sessionKey":"s1","messages":[{"role":"user","content":"Great, plan the rollout for May 3"},{"role":"assistant","content":"Rollout planned for May 3."}]}"#,
        "\n",
        r#"{"hook":"stop"}"#,
        "\n",
        r#"{"hook":"after_response","sessionKey":"s1","messages":[]}"#,
        "\n",
    );

    #[tokio::test]
    async fn test_session_replies_and_stop() {
        let extractor = Arc::new(MockExtractor::with_decisions(2));
        let hooks = hooks(&extractor);
        let mut output = Vec::new();

        let report = serve(
            &hooks,
            SESSION.as_bytes(),
            &mut output,
            std::future::pending(),
        )
        .await
        .unwrap();

        let replies = replies(&output);
        assert_eq!(replies.len(), 4);
        match &replies[0] {
            HookReply::BeforeResponse {
                context: Some(context),
                decisions_included: 1,
            } => assert!(context.contains("Release frozen until May 2")),
            other => panic!("unexpected reply: {other:?}"),
        }
        assert_eq!(
            replies[1],
            HookReply::AfterResponse {
                outcome: "buffered".to_string(),
                buffered: 2
            }
        );
        assert_eq!(
            replies[2],
            HookReply::AfterResponse {
                outcome: "buffered".to_string(),
                buffered: 4
            }
        );
        assert_eq!(
            replies[3],
            HookReply::Stop {
                channels: 1,
                extraction_calls: 1,
                messages: 4
            }
        );

        // Lines after stop are not read.
        assert_eq!(report.extraction_calls(), 1);
        assert_eq!(extractor.request_count(), 1);
    }

    #[tokio::test]
    async fn test_end_of_input_drains() {
        let extractor = Arc::new(MockExtractor::new());
        let hooks = hooks(&extractor);
        let input = concat!(
            r#"{"hook":"after_response","channelId":"c","messages":[{"role":"user","content":"one two three"},{"role":"assistant","content":"four five six"},{"role":"user","content":"seven eight"},{"role":"assistant","content":"nine ten"}]}"#,
            "\n"
        );
        let mut output = Vec::new();

        let report = serve(&hooks, input.as_bytes(), &mut output, std::future::pending())
            .await
            .unwrap();

        assert_eq!(replies(&output).len(), 1);
        assert_eq!(report.extraction_calls(), 1);
        assert_eq!(extractor.requests()[0].channel.as_str(), "c");
    }

    #[tokio::test]
    async fn test_malformed_line_gets_error_reply() {
        let extractor = Arc::new(MockExtractor::new());
        let hooks = hooks(&extractor);
        let input = "not json\n{\"hook\":\"unknown\"}\n{\"hook\":\"stop\"}\n";
        let mut output = Vec::new();

        serve(&hooks, input.as_bytes(), &mut output, std::future::pending())
            .await
            .unwrap();

        let replies = replies(&output);
        assert_eq!(replies.len(), 3);
        assert!(matches!(replies[0], HookReply::Error { .. }));
        assert!(matches!(replies[1], HookReply::Error { .. }));
        assert!(matches!(replies[2], HookReply::Stop { .. }));
    }

    #[tokio::test]
    async fn test_shutdown_signal_drains() {
        let extractor = Arc::new(MockExtractor::new());
        let hooks = hooks(&extractor);
        let messages: Vec<RawMessage> = (0..4)
            .map(|i| RawMessage::new("user", format!("pending note {i}")))
            .collect();
        hooks
            .after_response(&AfterResponseEvent::new("s", messages))
            .await;

        let mut output = Vec::new();
        let report = serve(
            &hooks,
            SESSION.as_bytes(),
            &mut output,
            std::future::ready(()),
        )
        .await
        .unwrap();

        assert!(output.is_empty());
        assert_eq!(report.extraction_calls(), 1);
        assert!(hooks.registry().is_closed());
    }
}
