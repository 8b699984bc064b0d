pub mod charting;

use keystride::{
    metrics::CharMark,
    session::{SessionSnapshot, Status, WordState},
    util,
};
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};
use unicode_width::UnicodeWidthStr;

use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

fn mark_style(mark: CharMark) -> Style {
    match mark {
        CharMark::Correct => bold().fg(Color::Green),
        CharMark::Incorrect => bold().fg(Color::Red),
        CharMark::Extra => bold().fg(Color::Red).add_modifier(Modifier::CROSSED_OUT),
        CharMark::Missing => dim_bold().fg(Color::Red),
        CharMark::Pending => dim_bold(),
    }
}

/// Spans for the whole text, one group per word, with the cursor on the
/// next character of the active word.
fn word_spans(snapshot: &SessionSnapshot<'_>) -> Vec<Span<'static>> {
    let mut spans = Vec::new();
    for index in 0..snapshot.words.len() {
        if index > 0 {
            spans.push(Span::raw(" "));
        }
        let state = snapshot.word_state(index);
        let marks = snapshot.word_marks(index);
        let cursor = (state == WordState::Active && snapshot.status != Status::Waiting)
            .then(|| snapshot.current_input.chars().count());

        for (pos, (c, mark)) in marks.iter().enumerate() {
            let mut style = mark_style(*mark);
            if state == WordState::Incorrect && *mark == CharMark::Correct {
                style = style.fg(Color::Yellow);
            }
            if cursor == Some(pos) {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            spans.push(Span::styled(c.to_string(), style));
        }
        // cursor sits past the target word while overtyping
        if cursor.is_some_and(|pos| pos >= marks.len()) {
            spans.push(Span::styled("_", dim_bold()));
        }
    }
    spans
}

fn status_line(snapshot: &SessionSnapshot<'_>) -> String {
    match snapshot.status {
        Status::Waiting => format!("press enter to start · {}s", snapshot.time_limit_secs),
        Status::Running => format!("{}s", snapshot.time_remaining_secs),
        Status::Paused => format!(
            "PAUSED · {}s left · (tab) to resume",
            snapshot.time_remaining_secs
        ),
        Status::Finished => "finished".to_string(),
    }
}

impl App {
    fn render_typing(&self, area: Rect, buf: &mut Buffer) {
        let snapshot = self.controller.snapshot();

        let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
        let text_width = self.controller.session().words().to_text().width();
        let prompt_occupied_lines = if text_width <= max_chars_per_line as usize {
            1
        } else {
            (text_width as f64 / max_chars_per_line as f64).ceil() as u16 + 1
        };
        let padding = area.height.saturating_sub(prompt_occupied_lines + 5) / 2;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .constraints([
                Constraint::Length(padding),
                Constraint::Length(2), // timer / status
                Constraint::Length(prompt_occupied_lines),
                Constraint::Length(2), // live metrics
                Constraint::Min(0),
                Constraint::Length(1), // legend
            ])
            .split(area);

        let status_style = match snapshot.status {
            Status::Paused => bold().fg(Color::Yellow).add_modifier(Modifier::ITALIC),
            _ => dim_bold(),
        };
        Paragraph::new(Span::styled(status_line(&snapshot), status_style))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);

        Paragraph::new(Line::from(word_spans(&snapshot)))
            .alignment(if prompt_occupied_lines == 1 {
                // when the prompt is small enough to fit on one line
                // centering the text gives a nice zen feeling
                Alignment::Center
            } else {
                Alignment::Left
            })
            .wrap(Wrap { trim: true })
            .render(chunks[2], buf);

        if snapshot.status != Status::Waiting {
            let live = &snapshot.live;
            Paragraph::new(Span::styled(
                format!(
                    "{} wpm   {}% acc   {} err",
                    live.wpm, live.accuracy, live.error_count
                ),
                Style::default().fg(Color::Cyan),
            ))
            .alignment(Alignment::Center)
            .render(chunks[3], buf);
        }

        if let Some(notice) = &self.notice {
            Paragraph::new(Span::styled(notice.as_str(), bold().fg(Color::Yellow)))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .render(chunks[4], buf);
        }

        Paragraph::new(Span::styled(
            "(tab) pause / (ctrl-d) finish / (←) retry / (→) new / (esc)ape",
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[5], buf);
    }

    fn render_results(&self, area: Rect, buf: &mut Buffer) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Min(1),    // chart
                Constraint::Length(1), // stats
                Constraint::Length(1), // personal best / notice
                Constraint::Length(1), // padding
                Constraint::Length(1), // legend
            ])
            .split(area);

        let samples = self.controller.samples();
        let limit = self.controller.session().time_limit_secs();
        let (overall_duration, highest_wpm) = charting::compute_chart_params(samples, limit);
        let points = charting::chart_points(samples);

        let datasets = vec![Dataset::default()
            .marker(Marker::Braille)
            .style(Style::default().fg(Color::Magenta))
            .graph_type(GraphType::Line)
            .data(&points)];

        Chart::new(datasets)
            .x_axis(
                Axis::default()
                    .title("seconds")
                    .bounds([1.0, overall_duration])
                    .labels(vec![
                        Span::styled("1", bold()),
                        Span::styled(charting::format_label(overall_duration), bold()),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .title("wpm")
                    .bounds([0.0, highest_wpm])
                    .labels(vec![
                        Span::styled("0", bold()),
                        Span::styled(charting::format_label(highest_wpm), bold()),
                    ]),
            )
            .render(chunks[0], buf);

        if let Some(last) = &self.last {
            let r = &last.result;
            let wpms: Vec<f64> = samples.iter().map(|s| f64::from(s.wpm)).collect();
            let consistency = util::consistency(&wpms)
                .map(|c| format!("   {c:.0}% consistency"))
                .unwrap_or_default();
            Paragraph::new(Span::styled(
                format!(
                    "{} wpm   {}% acc   {} err   {} chars   {}s{consistency}",
                    r.wpm, r.accuracy, r.error_count, r.characters_typed, r.time_taken_secs
                ),
                bold(),
            ))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
        }

        let (line, style) = match (&self.notice, self.personal_best) {
            (Some(notice), _) => (notice.clone(), bold().fg(Color::Yellow)),
            (None, Some(best)) => (
                format!("personal best {best} wpm"),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ),
            (None, None) => (String::new(), Style::default()),
        };
        Paragraph::new(Span::styled(line, style))
            .alignment(Alignment::Center)
            .render(chunks[2], buf);

        Paragraph::new(Span::styled(
            "(r)etry / (n)ew / (s)ave / (esc)ape",
            Style::default().add_modifier(Modifier::ITALIC),
        ))
        .render(chunks[4], buf);
    }
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Typing => self.render_typing(area, buf),
            AppState::Results => self.render_results(area, buf),
        }
    }
}
