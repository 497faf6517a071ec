use crossterm::style::{Color, Stylize};
use probe_core::render::{Report, Span, Style};
use std::io::IsTerminal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StylePolicy {
    Plain,
    Ansi,
}

impl StylePolicy {
    /// Colors only when writing to a terminal and nobody opted out
    /// (`--no-color` or `NO_COLOR`).
    pub(crate) fn detect(no_color: bool) -> Self {
        if no_color || std::env::var_os("NO_COLOR").is_some() || !std::io::stdout().is_terminal() {
            StylePolicy::Plain
        } else {
            StylePolicy::Ansi
        }
    }

    pub(crate) fn paint(self, span: &Span) -> String {
        let StylePolicy::Ansi = self else {
            return span.text.clone();
        };
        let text = span.text.as_str();
        match span.style {
            Style::Plain => text.to_string(),
            Style::Label => text.with(Color::Yellow).to_string(),
            Style::Value => text.with(Color::Blue).to_string(),
            Style::Node => text.with(Color::Magenta).to_string(),
            Style::DropNode => text.with(Color::Red).bold().to_string(),
            Style::CaptureNode => text.with(Color::Cyan).to_string(),
            Style::Error => text.with(Color::Red).to_string(),
        }
    }

    pub(crate) fn render(self, report: &Report) -> String {
        report.render_with(|span| self.paint(span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use probe_core::render::Line;

    fn report() -> Report {
        let mut line = Line::new();
        line.push("Packet ", Style::Label)
            .push("1", Style::Value)
            .push(" | ", Style::Plain)
            .push("drop", Style::DropNode);
        Report { lines: vec![line] }
    }

    #[test]
    fn plain_policy_emits_text_only() {
        assert_eq!(StylePolicy::Plain.render(&report()), "Packet 1 | drop\n");
    }

    #[test]
    fn ansi_policy_wraps_styled_spans() {
        let out = StylePolicy::Ansi.render(&report());
        assert!(out.contains("\u{1b}["));
        assert!(out.contains("drop"));
        assert_ne!(out, StylePolicy::Plain.render(&report()));
        assert_eq!(StylePolicy::Ansi.paint(&Span::plain(" | ")), " | ");
    }

    #[test]
    fn no_color_forces_plain() {
        assert_eq!(StylePolicy::detect(true), StylePolicy::Plain);
    }
}
