//! Line-oriented terminal front end for the three stages.

use std::io::Write;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::chat::{ChatSession, FAQS, MessageSlot, MessageStatus, Sender};
use crate::error::Result;
use crate::progress::{ProgressEvent, ProgressHandle};
use crate::wizard::{Advance, AnswerMap, InputKind, Wizard};

const BAR_WIDTH: usize = 30;

/// Wizard commands; anything else is an answer.
const BACK: &str = ":back";
const SKIP: &str = ":skip";
const QUIT_WIZARD: &str = ":quit";

/// Chat commands.
const QUIT_CHAT: &str = "/quit";
const FAQ: &str = "/faq";

pub struct Terminal<R, W> {
    lines: Lines<R>,
    out: W,
}

impl Terminal<BufReader<Stdin>, std::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), std::io::stdout())
    }
}

impl<R: AsyncBufRead + Unpin, W: Write> Terminal<R, W> {
    pub fn new(input: R, out: W) -> Self {
        Self {
            lines: input.lines(),
            out,
        }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    async fn read_line(&mut self) -> Result<Option<String>> {
        Ok(self.lines.next_line().await?)
    }

    /// Ask each question in turn. Returns the answers on hand-off, or `None`
    /// if the user quits or input ends.
    pub async fn run_wizard(&mut self, wizard: &mut Wizard) -> Result<Option<AnswerMap>> {
        writeln!(self.out, "Edu Reco — Onboarding")?;
        writeln!(
            self.out,
            "Enter to keep the current answer, {BACK} to go back, {SKIP} to jump to the end, {QUIT_WIZARD} to leave."
        )?;

        loop {
            self.render_step(wizard)?;
            let Some(line) = self.read_line().await? else {
                return Ok(None);
            };
            let line = line.trim();

            match line {
                BACK => {
                    wizard.retreat();
                    continue;
                }
                SKIP => {
                    wizard.skip();
                    continue;
                }
                QUIT_WIZARD => return Ok(None),
                "" => {}
                answer => {
                    let step = wizard.current_step();
                    let value = answer
                        .parse::<usize>()
                        .ok()
                        .and_then(|n| step.kind.option_at(n))
                        .unwrap_or(answer)
                        .to_string();
                    let name = step.name.clone();
                    wizard.update(&name, value);
                }
            }

            match wizard.advance() {
                Advance::HandOff(answers) => return Ok(Some(answers)),
                Advance::Moved(_) => {}
                Advance::Finished => return Ok(None),
            }
        }
    }

    fn render_step(&mut self, wizard: &Wizard) -> Result<()> {
        let step = wizard.current_step();
        writeln!(self.out)?;
        writeln!(
            self.out,
            "{} {}",
            bar(wizard.completion_percent()),
            wizard.position_label()
        )?;
        writeln!(self.out, "{}", step.title)?;
        writeln!(self.out, "{}", step.prompt())?;
        match &step.kind {
            InputKind::Choice { options } => {
                for (i, option) in options.iter().enumerate() {
                    writeln!(self.out, "  {}) {}", i + 1, option)?;
                }
            }
            InputKind::Text { placeholder } => writeln!(self.out, "  ({placeholder})")?,
        }
        let current = wizard.value_for(&step.name);
        if !current.is_empty() {
            writeln!(self.out, "  current: {current}")?;
        }
        write!(self.out, "[{}] > ", wizard.advance_label())?;
        self.out.flush()?;
        Ok(())
    }

    /// Render progress until the hand-off. `None` if the run ended early.
    pub async fn run_progress(&mut self, mut handle: ProgressHandle) -> Result<Option<AnswerMap>> {
        writeln!(self.out)?;
        while let Some(event) = handle.recv().await {
            match event {
                ProgressEvent::Tick { percent, label } => {
                    write!(self.out, "\r{} {:>3}% {:<40}", bar(percent), percent, label)?;
                    self.out.flush()?;
                }
                ProgressEvent::HandOff(answers) => {
                    writeln!(self.out)?;
                    return Ok(Some(answers));
                }
            }
        }
        writeln!(self.out)?;
        Ok(None)
    }

    /// Chat REPL. Each reply is streamed to the output as it arrives.
    pub async fn run_chat(&mut self, chat: &mut ChatSession) -> Result<()> {
        writeln!(self.out, "\nFES Guide Chat")?;
        if let Some(profile) = chat.context().filter(|p| !p.is_empty()) {
            let summary: Vec<String> = profile.iter().map(|(k, v)| format!("{k}: {v}")).collect();
            writeln!(self.out, "Profile — {}", summary.join(", "))?;
        }
        for message in chat.history().iter() {
            writeln!(self.out, "{}: {}", speaker(message.sender), message.text)?;
        }
        writeln!(self.out, "FAQs ({FAQ} <n> to ask):")?;
        for (i, faq) in FAQS.iter().enumerate() {
            writeln!(self.out, "  {}) {}", i + 1, faq)?;
        }

        loop {
            write!(self.out, "> ")?;
            self.out.flush()?;
            let Some(line) = self.read_line().await? else {
                break;
            };
            let line = line.trim();
            if line == QUIT_CHAT {
                break;
            }

            let query = match line.strip_prefix(FAQ) {
                Some(rest) => match rest.trim().parse::<usize>().ok().and_then(|n| n.checked_sub(1)) {
                    Some(i) if i < FAQS.len() => FAQS[i],
                    _ => {
                        writeln!(self.out, "Pick a FAQ between 1 and {}.", FAQS.len())?;
                        continue;
                    }
                },
                None => line,
            };

            if let Some(slot) = chat.send_message(query) {
                writeln!(self.out, "{}: {}", speaker(Sender::User), query.trim())?;
                self.stream_reply(chat, slot).await?;
            }
        }

        chat.shutdown();
        Ok(())
    }

    async fn stream_reply(&mut self, chat: &mut ChatSession, slot: MessageSlot) -> Result<()> {
        write!(self.out, "{}: ", speaker(Sender::Assistant))?;
        self.out.flush()?;
        let mut shown = String::new();
        while let Some(update) = chat.next_update().await {
            if update.slot != slot {
                continue;
            }
            match update.text.strip_prefix(shown.as_str()) {
                Some(delta) if update.status != MessageStatus::Failed => {
                    write!(self.out, "{delta}")?
                }
                _ => write!(self.out, "\n{}", update.text)?,
            }
            self.out.flush()?;
            shown = update.text;
        }
        writeln!(self.out)?;
        Ok(())
    }
}

fn speaker(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "You",
        Sender::Assistant => "FES Guide",
    }
}

fn bar(percent: u8) -> String {
    let filled = usize::from(percent.min(100)) * BAR_WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}
