//! Stage sequencing — wizard → profile compilation → chat.
//!
//! Each stage receives the collected answers by value from the one before;
//! there is no shared state between stages.

use std::io::Write;
use std::sync::Arc;

use tokio::io::AsyncBufRead;
use tracing::info;

use crate::chat::{ChatConfig, ChatSession, StreamSource};
use crate::config::AppConfig;
use crate::error::Result;
use crate::progress::{ProgressConfig, ProgressSimulator, Start};
use crate::terminal::Terminal;
use crate::wizard::{AnswerMap, Wizard, default_steps};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Wizard,
    /// Progress screen. Entered without answers, it redirects to the wizard.
    Compiling(Option<AnswerMap>),
    Chat(AnswerMap),
    Exit,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Wizard => "wizard",
            Self::Compiling(_) => "compiling",
            Self::Chat(_) => "chat",
            Self::Exit => "exit",
        }
    }
}

/// Run the whole flow from the wizard.
pub async fn run<R, W>(
    config: &AppConfig,
    source: Arc<dyn StreamSource>,
    terminal: &mut Terminal<R, W>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    run_from(Stage::Wizard, config, source, terminal).await
}

/// Run the flow starting at `stage`, until the user leaves.
pub async fn run_from<R, W>(
    mut stage: Stage,
    config: &AppConfig,
    source: Arc<dyn StreamSource>,
    terminal: &mut Terminal<R, W>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        info!(stage = stage.name(), "Entering stage");
        stage = match stage {
            Stage::Wizard => {
                let mut wizard = Wizard::new(default_steps())?;
                match terminal.run_wizard(&mut wizard).await? {
                    Some(answers) => Stage::Compiling(Some(answers)),
                    None => Stage::Exit,
                }
            }
            Stage::Compiling(context) => {
                match ProgressSimulator::start(context, ProgressConfig::from(config)) {
                    Start::Redirect => Stage::Wizard,
                    Start::Running(handle) => match terminal.run_progress(handle).await? {
                        Some(answers) => Stage::Chat(answers),
                        None => Stage::Exit,
                    },
                }
            }
            Stage::Chat(answers) => {
                let mut chat = ChatSession::new(Arc::clone(&source), ChatConfig::from(config))
                    .with_context(answers);
                terminal.run_chat(&mut chat).await?;
                Stage::Exit
            }
            Stage::Exit => return Ok(()),
        };
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use futures::stream;

    use super::*;
    use crate::chat::{EventStream, StreamEvent};
    use crate::error::StreamError;

    struct EchoSource;

    #[async_trait]
    impl StreamSource for EchoSource {
        fn name(&self) -> &str {
            "echo"
        }

        async fn open(&self, query: &str) -> std::result::Result<EventStream, StreamError> {
            Ok(Box::pin(stream::iter(vec![
                StreamEvent::Fragment("You asked: ".to_string()),
                StreamEvent::Fragment(query.to_string()),
                StreamEvent::Done,
            ])))
        }
    }

    fn fast_config() -> AppConfig {
        AppConfig {
            tick_interval: Duration::from_millis(1),
            handoff_delay: Duration::from_millis(1),
            ..AppConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn full_flow_reaches_chat() {
        let input = "1\n\n\n\n\n:skip\nYes\nwhat next?\n/faq 4\n/quit\n";
        let mut terminal = Terminal::new(input.as_bytes(), Vec::new());
        run(&fast_config(), Arc::new(EchoSource), &mut terminal).await.unwrap();

        let out = String::from_utf8(terminal.into_output()).unwrap();
        assert!(out.contains("Profile — ielts: Yes, qualifications: A-Levels"));
        assert!(out.contains("100% Almost ready…"));
        assert!(out.contains("FES Guide: You asked: what next?"));
        assert!(out.contains("You asked: Scholarship opportunities?"));
    }

    #[tokio::test(start_paused = true)]
    async fn compiling_without_answers_redirects_to_wizard() {
        let mut terminal = Terminal::new(":quit\n".as_bytes(), Vec::new());
        run_from(
            Stage::Compiling(None),
            &fast_config(),
            Arc::new(EchoSource),
            &mut terminal,
        )
        .await
        .unwrap();

        let out = String::from_utf8(terminal.into_output()).unwrap();
        assert!(out.contains("Step 1 of 6"));
        assert!(!out.contains("Compiling your profile"));
    }

    #[test]
    fn stage_names() {
        assert_eq!(Stage::Compiling(None).name(), "compiling");
        assert_eq!(Stage::Chat(AnswerMap::new()).name(), "chat");
    }
}
