use crate::chat::{Message, MessageId, RequestMode, Sender, SessionObserver};
use crate::utils::text::{
    display_width, looks_like_markdown, settled_visible_text, strip_think_blocks, wrap_text,
};
use console::style;
use std::io::{self, Write};

fn box_width(max: usize) -> usize {
    let term = console::Term::stdout();
    let terminal_width = term.size().1 as usize;
    std::cmp::min(terminal_width.saturating_sub(4), max).max(40)
}

/// Display an answer in a formatted box, red when it reports a failure
pub fn display_response(response: &str, is_error: bool) {
    let max_width = box_width(120);

    let mut wrapped_lines = Vec::new();
    for line in response.lines() {
        if line.is_empty() {
            wrapped_lines.push(String::new());
        } else {
            wrapped_lines.extend(wrap_text(line, max_width.saturating_sub(4)));
        }
    }

    let content_max_len = wrapped_lines
        .iter()
        .map(|line| display_width(line))
        .max()
        .unwrap_or(0);
    let width = std::cmp::min(max_width, content_max_len + 4).max(4);

    let top_border = "┌".to_string() + &"─".repeat(width - 2) + "┐";
    let bottom_border = "└".to_string() + &"─".repeat(width - 2) + "┘";

    if is_error {
        println!("\n{}", style("⚠️  REQUEST FAILED").bold().red());
        println!("{}", style(&top_border).dim().red());
    } else {
        println!("\n{}", style("🤖 AI RESPONSE").bold().blue());
        println!("{}", style(&top_border).dim().blue());
    }

    for line in wrapped_lines {
        let padding = width.saturating_sub(display_width(&line) + 3);
        let text = if is_error {
            style(&line).bold().red()
        } else {
            style(&line).bold().white()
        };
        println!("│ {}{}│", text, " ".repeat(padding));
    }

    if is_error {
        println!("{}", style(&bottom_border).dim().red());
    } else {
        println!("{}", style(&bottom_border).dim().blue());
    }
}

/// Render a markdown answer
pub fn display_markdown(response: &str) {
    println!("\n{}", style("🤖 AI RESPONSE").bold().blue());
    let skin = termimad::MadSkin::default();
    skin.print_text(response);
}

/// Picks markdown or boxed rendering for a complete answer.
pub fn display_answer(message: &Message) {
    let text = strip_think_blocks(&message.text);
    if !message.is_error && looks_like_markdown(&text) {
        display_markdown(&text);
    } else {
        display_response(&text, message.is_error);
    }
    display_answer_footer(message);
}

fn display_answer_footer(message: &Message) {
    let mut details = Vec::new();
    if let Some(category) = &message.category {
        details.push(format!("Category: {}", category));
    }
    if let Some(source) = &message.source {
        details.push(format!("Source: {}", source));
    }
    if !details.is_empty() {
        println!("{}", style(details.join("  ·  ")).dim().magenta());
    }
}

fn sender_label(message: &Message) -> console::StyledObject<&'static str> {
    match message.sender {
        Sender::User => style("You").bold().cyan(),
        Sender::Assistant if message.is_error => style("AI").bold().red(),
        Sender::Assistant => style("AI").bold().blue(),
    }
}

/// Prints the whole conversation with 1-based positions usable by `/edit` and friends.
pub fn display_history(messages: &[Message]) {
    if messages.is_empty() {
        println!("{}", style("No messages yet.").dim());
        return;
    }

    for (index, message) in messages.iter().enumerate() {
        let text = strip_think_blocks(&message.text);
        let body = if message.is_error {
            style(text).red().to_string()
        } else {
            text
        };
        println!(
            "{} {} {}",
            style(format!("[{}]", index + 1)).dim(),
            sender_label(message),
            style(message.created_at.format("%H:%M:%S")).dim()
        );
        println!("{}", body);
        if let Some(doc) = &message.document_ref {
            println!(
                "{}",
                style(format!(
                    "🔗 Document: {} ({})",
                    doc.display_name,
                    doc.group_label()
                ))
                .dim()
            );
        }
        if let Some(category) = &message.category {
            println!("{}", style(format!("Category: {}", category)).dim().magenta());
        }
        println!();
    }
}

pub fn display_notice(text: &str) {
    println!("{}", style(text).dim());
}

pub fn display_error(text: &str) {
    eprintln!("{} {}", style("✗").bold().red(), style(text).red());
}

/// How much of the streamed reply has been written out so far
struct StreamProgress {
    id: MessageId,
    printed: usize,
    text: String,
    is_error: bool,
}

/// Renders a session as it changes: complete answers as a box or markdown, streamed
/// answers piece by piece as they arrive.
pub struct TerminalView {
    mode: RequestMode,
    streaming: Option<StreamProgress>,
}

impl TerminalView {
    pub fn new() -> Self {
        Self {
            mode: RequestMode::Sync,
            streaming: None,
        }
    }

    /// Records the latest text of a streamed reply and returns the part not printed yet,
    /// along with whether this is the first piece of a new reply.
    fn stream_delta(&mut self, message: &Message) -> (bool, String) {
        let fresh = !matches!(&self.streaming, Some(p) if p.id == message.id);
        if fresh {
            self.streaming = Some(StreamProgress {
                id: message.id,
                printed: 0,
                text: String::new(),
                is_error: false,
            });
        }

        let visible = settled_visible_text(&message.text);
        let Some(progress) = self.streaming.as_mut() else {
            return (fresh, String::new());
        };
        progress.text = message.text.clone();
        progress.is_error = message.is_error;
        let delta = visible.get(progress.printed..).unwrap_or_default().to_string();
        progress.printed = progress.printed.max(visible.len());
        (fresh, delta)
    }

    /// Text held back while the reply was arriving, released once the turn settles.
    fn finish_stream(&mut self) -> Option<(String, bool)> {
        let progress = self.streaming.take()?;
        let visible = strip_think_blocks(&progress.text);
        let rest = visible.get(progress.printed..).unwrap_or_default().to_string();
        Some((rest, progress.is_error))
    }

    fn print_stream(&mut self, message: &Message) {
        let (fresh, delta) = self.stream_delta(message);
        if fresh {
            println!("\n{}", style("🤖 AI RESPONSE").bold().blue());
        }
        print_fragment(&delta, message.is_error);
    }
}

fn print_fragment(text: &str, is_error: bool) {
    if text.is_empty() {
        return;
    }
    if is_error {
        print!("{}", style(text).red());
    } else {
        print!("{}", text);
    }
    let _ = io::stdout().flush();
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionObserver for TerminalView {
    fn turn_started(&mut self, mode: RequestMode) {
        self.mode = mode;
        self.streaming = None;
        if mode == RequestMode::Sync {
            display_notice("AI is typing...");
        }
    }

    fn message_appended(&mut self, message: &Message) {
        match message.sender {
            Sender::User => {
                if let Some(doc) = &message.document_ref {
                    display_notice(&format!(
                        "🔗 Using document: {} ({})",
                        doc.display_name,
                        doc.group_label()
                    ));
                }
            }
            Sender::Assistant => match self.mode {
                RequestMode::Sync => display_answer(message),
                RequestMode::Stream => self.print_stream(message),
            },
        }
    }

    fn message_updated(&mut self, message: &Message) {
        if message.sender == Sender::Assistant {
            self.print_stream(message);
        }
    }

    fn busy_changed(&mut self, busy: bool) {
        if busy {
            return;
        }
        if let Some((rest, is_error)) = self.finish_stream() {
            print_fragment(&rest, is_error);
            println!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn streamed(view: &mut TerminalView, texts: &[&str]) -> String {
        let mut reply = Message::assistant("", None);
        reply.id = MessageId(2);
        let mut out = String::new();
        for text in texts {
            reply.text = text.to_string();
            out.push_str(&view.stream_delta(&reply).1);
        }
        out
    }

    #[test]
    fn test_think_tag_split_across_fragments_is_hidden() {
        let mut view = TerminalView::new();
        let out = streamed(
            &mut view,
            &["Hello <thi", "Hello <think>x", "Hello <think>x</think>World"],
        );
        assert_eq!(out, "Hello World");
        assert_eq!(view.finish_stream(), Some((String::new(), false)));
    }

    #[test]
    fn test_held_back_text_is_released_when_turn_settles() {
        let mut view = TerminalView::new();
        let out = streamed(&mut view, &["Is 1 ", "Is 1 <"]);
        assert_eq!(out, "Is 1 ");
        assert_eq!(view.finish_stream(), Some(("<".to_string(), false)));
        assert_eq!(view.finish_stream(), None);
    }

    #[test]
    fn test_new_reply_starts_fresh() {
        let mut view = TerminalView::new();
        let mut reply = Message::assistant("first", None);
        reply.id = MessageId(2);
        assert_eq!(view.stream_delta(&reply), (true, "first".to_string()));
        reply.text = "first part".to_string();
        assert_eq!(view.stream_delta(&reply), (false, " part".to_string()));

        reply.id = MessageId(4);
        reply.text = "second".to_string();
        assert_eq!(view.stream_delta(&reply), (true, "second".to_string()));
    }
}
