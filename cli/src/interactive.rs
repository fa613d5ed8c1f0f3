//! Line-driven front end: each stdin line is either new prompt text or a `:command` standing in for
//! a pointer/keyboard gesture, and every session update is written to stdout.

use std::time::Duration;

use anyhow::Context;
use better_prompt_engine::AnchorRect;
use better_prompt_engine::ScrollOffset;
use better_prompt_engine::SessionEvent;
use better_prompt_engine::SessionUpdate;
use better_prompt_engine::SuggestionFetcher;
use better_prompt_engine::SuggestionSession;
use tokio::io::AsyncBufRead;
use tokio::io::AsyncBufReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tokio::time::sleep_until;

pub const HELP: &str = "\
Type a prompt line to replace the text. Commands:
  :hover WORD [LEFT TOP WIDTH HEIGHT]  pointer enters a highlighted word
  :leave [WORD]                        pointer leaves the word
  :panel / :unpanel                    pointer enters / leaves the suggestion panel
  :pick WORD ALTERNATIVE               choose an alternative
  :esc  :click  :close                 dismiss the panel
  :scroll TOP [LEFT]                   scroll the input
  :wait MS                             stop reading input for MS milliseconds
  :help                                show this help
  :quit                                end the session
A line starting with `::` is text that begins with a single `:`.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Event(SessionEvent),
    Wait(Duration),
    Help,
    Quit,
}

pub fn parse_line(line: &str) -> anyhow::Result<Command> {
    if let Some(text) = line.strip_prefix("::") {
        return Ok(Command::Event(SessionEvent::TextChanged(format!(":{text}"))));
    }
    let Some(command) = line.strip_prefix(':') else {
        return Ok(Command::Event(SessionEvent::TextChanged(line.to_string())));
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();
    let event = match (name, args.as_slice()) {
        ("hover", [word]) => SessionEvent::WordHover {
            word: (*word).to_string(),
            anchor: AnchorRect::default(),
        },
        ("hover", [word, left, top, width, height]) => SessionEvent::WordHover {
            word: (*word).to_string(),
            anchor: AnchorRect {
                left: parse_number(left)?,
                top: parse_number(top)?,
                width: parse_number(width)?,
                height: parse_number(height)?,
            },
        },
        ("leave", []) => SessionEvent::WordUnhover {
            word: String::new(),
        },
        ("leave", [word]) => SessionEvent::WordUnhover {
            word: (*word).to_string(),
        },
        ("panel", []) => SessionEvent::PanelHover,
        ("unpanel", []) => SessionEvent::PanelUnhover,
        // Alternatives may be multi-word phrases.
        ("pick", [word, alternative @ ..]) if !alternative.is_empty() => {
            SessionEvent::AlternativeSelected {
                word: (*word).to_string(),
                alternative: alternative.join(" "),
            }
        }
        ("esc", []) => SessionEvent::Escape,
        ("click", []) => SessionEvent::ClickOutside,
        ("close", []) => SessionEvent::CloseTooltip,
        ("scroll", [top]) => SessionEvent::Scroll(ScrollOffset {
            top: parse_number(top)?,
            left: 0.0,
        }),
        ("scroll", [top, left]) => SessionEvent::Scroll(ScrollOffset {
            top: parse_number(top)?,
            left: parse_number(left)?,
        }),
        ("wait", [millis]) => {
            let millis: u64 = millis
                .parse()
                .with_context(|| format!("invalid duration `{millis}`"))?;
            return Ok(Command::Wait(Duration::from_millis(millis)));
        }
        ("help", []) => return Ok(Command::Help),
        ("quit", []) => return Ok(Command::Quit),
        _ => anyhow::bail!("unrecognized command `:{command}` (try :help)"),
    };
    Ok(Command::Event(event))
}

fn parse_number(raw: &str) -> anyhow::Result<f64> {
    raw.parse()
        .with_context(|| format!("invalid number `{raw}`"))
}

/// Human-readable rendition of an update; highlighted words are bracketed.
pub fn render_update(update: &SessionUpdate) -> String {
    let mut out = format!(
        "[{}] dir={} requests={}\n",
        update.status, update.direction, update.requests_issued
    );

    let mut cursor = 0usize;
    for highlight in &update.highlights {
        let range = highlight.range.clone();
        let (Some(before), Some(word)) = (
            update.text.get(cursor..range.start),
            update.text.get(range.clone()),
        ) else {
            continue;
        };
        out.push_str(before);
        out.push('[');
        out.push_str(word);
        out.push(']');
        cursor = range.end;
    }
    out.push_str(update.text.get(cursor..).unwrap_or_default());
    out.push('\n');

    if update.scroll != ScrollOffset::default() {
        out.push_str(&format!(
            "scroll: top={} left={}\n",
            update.scroll.top, update.scroll.left
        ));
    }

    if let Some(tooltip) = &update.tooltip {
        out.push_str(&format!(
            "tooltip: {} -> {} at ({}, {}){}\n",
            tooltip.word,
            tooltip.alternatives.join(" | "),
            tooltip.placement.left,
            tooltip.placement.top,
            if tooltip.hide_pending {
                " (closing)"
            } else {
                ""
            },
        ));
    }
    out
}

fn format_update(update: &SessionUpdate, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(render_update(update)),
        OutputFormat::Json => {
            let mut line = serde_json::to_string(update).context("serialize update")?;
            line.push('\n');
            Ok(line)
        }
    }
}

/// Drives `session` from `input` until `:quit` or end of input, writing every update to `output`.
pub async fn run<F, R, W>(
    session: SuggestionSession<F>,
    input: R,
    mut output: W,
    format: OutputFormat,
) -> anyhow::Result<()>
where
    F: SuggestionFetcher,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (events, mut updates, handle) = session.spawn();
    let mut lines = input.lines();
    let mut input_open = true;
    let mut paused_until: Option<Instant> = None;

    loop {
        tokio::select! {
            maybe_update = updates.recv() => {
                let Some(update) = maybe_update else {
                    break;
                };
                let rendered = format_update(&update, format)?;
                output
                    .write_all(rendered.as_bytes())
                    .await
                    .context("write update")?;
                output.flush().await.context("flush output")?;
            }
            () = sleep_until(paused_until.unwrap_or_else(Instant::now)), if paused_until.is_some() => {
                paused_until = None;
            }
            line = lines.next_line(), if input_open && paused_until.is_none() => {
                let line = line.context("read input")?;
                let command = match line {
                    Some(line) => match parse_line(&line) {
                        Ok(command) => command,
                        Err(err) => {
                            tracing::warn!("{err:#}");
                            continue;
                        }
                    },
                    None => Command::Quit,
                };

                match command {
                    Command::Event(event) => {
                        if events.send(event).is_err() {
                            break;
                        }
                    }
                    Command::Wait(duration) => paused_until = Some(Instant::now() + duration),
                    Command::Help => {
                        output
                            .write_all(format!("{HELP}\n").as_bytes())
                            .await
                            .context("write help")?;
                    }
                    Command::Quit => {
                        input_open = false;
                        // The session drains and closes the update channel, ending this loop.
                        let _ = events.send(SessionEvent::Shutdown);
                    }
                }
            }
        }
    }

    handle.await.context("join session task")?;
    Ok(())
}
