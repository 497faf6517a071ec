//! Pure report rendering.
//!
//! Renderers produce [`Report`]s: lines of text spans tagged with a semantic
//! [`Style`]. Turning styles into terminal colors is left to the caller.

mod format;
mod instance;
mod trace;

pub use format::{format_duration, format_timestamp};
pub use instance::{render_cli_outputs, render_instance, render_ipsec_correlation};
pub use trace::{is_drop_node, render_packet_summary, render_trace_report};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Plain,
    /// Field labels such as `Packet` or `took`.
    Label,
    /// Measured values: ids, times, counts.
    Value,
    /// Origin/destination node of a packet.
    Node,
    /// A destination that dropped the packet.
    DropNode,
    /// Node name heading a capture block.
    CaptureNode,
    /// Something that went wrong.
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: Style,
}

impl Span {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Style::Plain)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    pub spans: Vec<Span>,
}

impl Line {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: impl Into<String>, style: Style) -> &mut Self {
        self.spans.push(Span::new(text, style));
        self
    }

    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|span| span.text.as_str()).collect()
    }

    /// First span carrying `style`, if any.
    pub fn find(&self, style: Style) -> Option<&Span> {
        self.spans.iter().find(|span| span.style == style)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    pub lines: Vec<Line>,
}

impl Report {
    pub fn push(&mut self, line: Line) {
        self.lines.push(line);
    }

    pub fn extend(&mut self, other: Report) {
        self.lines.extend(other.lines);
    }

    /// Renders every line through `paint`, one output line per report line.
    pub fn render_with<F>(&self, mut paint: F) -> String
    where
        F: FnMut(&Span) -> String,
    {
        let mut out = String::new();
        for line in &self.lines {
            for span in &line.spans {
                out.push_str(&paint(span));
            }
            out.push('\n');
        }
        out
    }

    pub fn to_plain_string(&self) -> String {
        self.render_with(|span| span.text.clone())
    }
}
