use itertools::Itertools;
use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use tazza::{classify::CharStatus, practice::SaveStatus, report, session::SessionState};

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 1;
const MAX_LISTED_ERRORS: usize = 5;

pub fn draw(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let content = self.practice.content();
        let text = self.practice.session().text();
        let snapshot = &self.snapshot;
        let finished = snapshot.state == SessionState::Finished;

        let bold_style = Style::default().add_modifier(Modifier::BOLD);
        let green_bold_style = bold_style.fg(Color::Green);
        let red_bold_style = bold_style.fg(Color::Red);
        let dim_bold_style = bold_style.add_modifier(Modifier::DIM);
        let underlined_dim_bold_style = dim_bold_style.add_modifier(Modifier::UNDERLINED);

        let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
        let text_lines = if text.width() <= max_chars_per_line as usize {
            1
        } else {
            ((text.width() as f64 / max_chars_per_line as f64).ceil() + 1.0) as u16
        };
        let results_lines = if finished { 9 } else { 0 };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .horizontal_margin(HORIZONTAL_MARGIN)
            .vertical_margin(VERTICAL_MARGIN)
            .constraints([
                Constraint::Length(1),             // title
                Constraint::Length(1),             // padding
                Constraint::Length(text_lines),    // reference text
                Constraint::Length(1),             // padding
                Constraint::Length(3),             // input
                Constraint::Length(1),             // elapsed
                Constraint::Length(results_lines), // results
                Constraint::Min(0),
                Constraint::Length(1), // legend
            ])
            .split(area);

        Paragraph::new(Line::from(vec![
            Span::styled(content.title.clone(), bold_style.fg(Color::Cyan)),
            Span::styled(
                format!("  [{} · {} chars]", content.difficulty, content.char_count()),
                Style::default().add_modifier(Modifier::DIM),
            ),
        ]))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

        let cursor = self.input.chars().count();
        let spans = text
            .chars()
            .zip(snapshot.statuses.iter())
            .enumerate()
            .map(|(idx, (expected, status))| match status {
                CharStatus::Correct => Span::styled(expected.to_string(), green_bold_style),
                CharStatus::Incorrect => Span::styled(
                    match expected {
                        ' ' => "·".to_owned(),
                        c => c.to_string(),
                    },
                    red_bold_style,
                ),
                CharStatus::Pending if idx == cursor && !finished => {
                    Span::styled(expected.to_string(), underlined_dim_bold_style)
                }
                CharStatus::Pending => Span::styled(expected.to_string(), dim_bold_style),
            })
            .collect::<Vec<Span>>();

        Paragraph::new(Line::from(spans))
            .alignment(if text_lines == 1 {
                Alignment::Center
            } else {
                Alignment::Left
            })
            .wrap(Wrap { trim: false })
            .render(chunks[2], buf);

        let border_color = if snapshot.is_valid_prefix {
            Color::Green
        } else {
            Color::Red
        };
        let input_title = match snapshot.state {
            SessionState::Idle => "start typing",
            SessionState::Active => "typing",
            SessionState::Finished => "done",
        };
        Paragraph::new(self.input.as_str())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(border_color))
                    .title(input_title),
            )
            .render(chunks[4], buf);

        Paragraph::new(Span::styled(
            format!("{:.1}s", snapshot.elapsed.as_secs_f64()),
            dim_bold_style,
        ))
        .alignment(Alignment::Center)
        .render(chunks[5], buf);

        if let Some(metrics) = &snapshot.metrics {
            let save_line = match &self.save_status {
                Some(SaveStatus::Saved) => {
                    Line::styled("result saved", Style::default().fg(Color::Green))
                }
                Some(SaveStatus::NotSaved) => Line::styled(
                    "not logged in, your result was not saved",
                    Style::default().fg(Color::Yellow),
                ),
                Some(SaveStatus::Failed(reason)) => Line::styled(
                    format!("could not save result: {reason}"),
                    Style::default().fg(Color::Red),
                ),
                None => Line::default(),
            };

            let mut lines = vec![
                Line::styled(
                    if metrics.is_perfect() {
                        "perfect run!"
                    } else {
                        "practice complete"
                    },
                    bold_style,
                ),
                Line::from(format!(
                    "{} cpm · {}% acc · {} errors",
                    metrics.speed, metrics.accuracy, metrics.error_count
                )),
            ];
            if !metrics.errors.is_empty() {
                let listed = metrics
                    .errors
                    .iter()
                    .take(MAX_LISTED_ERRORS)
                    .map(report::describe_error)
                    .join(", ");
                let more = metrics.errors.len().saturating_sub(MAX_LISTED_ERRORS);
                lines.push(Line::styled(
                    if more > 0 {
                        format!("{listed} (+{more} more)")
                    } else {
                        listed
                    },
                    Style::default().fg(Color::Red),
                ));
            }
            lines.push(save_line);

            Paragraph::new(lines)
                .block(Block::default().borders(Borders::ALL).title("results"))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .render(chunks[6], buf);
        }

        let legend = if finished {
            "(r)etry / (n)ew / (esc)ape"
        } else {
            "(esc)ape / backspace to fix"
        };
        Paragraph::new(Span::styled(legend, Style::default().add_modifier(Modifier::ITALIC)))
            .alignment(Alignment::Center)
            .render(chunks[8], buf);
    }
}
