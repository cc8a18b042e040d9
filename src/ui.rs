//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).
//!
//! Layout, top to bottom: the search form, the scrollable newest-first
//! result list, and a one-line status bar.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

use crate::aggregator::{ScrapeKind, Status};
use crate::app::{App, Field};

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let [search_area, main_area, status_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_search_form(app, frame, search_area);
    draw_result_list(app, frame, main_area);
    draw_status_bar(app, frame, status_area);
}

fn draw_search_form(app: &App, frame: &mut Frame, area: Rect) {
    let form = &app.form;
    let kind = match form.kind {
        ScrapeKind::Hackathons => "hackathons",
        ScrapeKind::Certificates => "certificates",
    };

    let field = |label: &'static str, value: &str, which: Field| {
        let focused = app.editing && form.focus == which;
        let style = if focused {
            Style::default().fg(Color::Black).bg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        };
        let shown = if value.is_empty() { "any".to_string() } else { value.to_string() };
        [
            Span::styled(label, Style::default().fg(Color::DarkGray)),
            Span::styled(shown, style),
            Span::raw("   "),
        ]
    };

    let spans: Vec<Span> = [
        field("kind: ", kind, Field::Kind),
        field("domain: ", &form.domain, Field::Domain),
        field("location: ", &form.location, Field::Location),
        field("count: ", &form.count, Field::Count),
    ]
    .into_iter()
    .flatten()
    .collect();

    let title = if app.editing {
        " Search (Tab: next field  Space: kind  Enter: go  Esc: cancel) "
    } else {
        " Search "
    };
    let paragraph = Paragraph::new(Line::from(spans))
        .block(Block::default().title(title).borders(Borders::ALL));
    frame.render_widget(paragraph, area);
}

/// Render the scrollable result list.
fn draw_result_list(app: &mut App, frame: &mut Frame, area: Rect) {
    let list_items: Vec<ListItem> = app
        .items
        .iter()
        .map(|record| {
            let mut spans = vec![
                Span::styled(
                    format!("{:<17}", record.collected_at.format("%Y-%m-%d %H:%M")),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(" "),
                Span::styled(&record.name, Style::default().fg(Color::White)),
            ];
            if let Some(platform) = &record.platform {
                spans.push(Span::raw("  "));
                spans.push(Span::styled(
                    format!("[{platform}]"),
                    Style::default().fg(Color::Cyan),
                ));
            }
            if !record.tags.is_empty() {
                spans.push(Span::raw("  "));
                spans.push(Span::styled(
                    record.tags.join(", "),
                    Style::default().fg(Color::Magenta),
                ));
            }

            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(list_items)
        .block(
            Block::default()
                .title(" Hackathons ")
                .borders(Borders::ALL),
        )
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let colour = match app.status {
        Status::Collecting => Color::Yellow,
        Status::Completed if app.items.is_empty() => Color::Red,
        Status::Completed => Color::Green,
        Status::Idle => Color::Gray,
    };

    let mut spans = vec![Span::raw(" ")];
    if let Some(session) = app.session {
        spans.push(Span::styled(
            format!("session {session} "),
            Style::default().fg(Color::DarkGray),
        ));
    }
    spans.extend([
        Span::styled(app.status_line(), Style::default().fg(colour)),
        Span::raw("  "),
        Span::styled(
            format!("{} items", app.items.len()),
            Style::default().fg(Color::Green),
        ),
        Span::raw("  /: search  s: rerun  q: quit  ↑/↓: scroll  Home/End: jump"),
    ]);
    let status = Paragraph::new(Line::from(spans));
    frame.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{make_record, make_update};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn render(app: &mut App) -> String {
        let backend = TestBackend::new(120, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(app, f)).unwrap();

        let buf = terminal.backend().buffer().clone();
        buf.content()
            .iter()
            .map(|c| c.symbol().chars().next().unwrap_or(' '))
            .collect()
    }

    #[test]
    fn draw_does_not_panic_with_no_items() {
        let mut app = App::new(10);
        let text = render(&mut app);
        assert!(text.contains("0 items"));
    }

    #[test]
    fn draw_shows_records_and_progress() {
        let mut app = App::new(10);
        app.apply_update(make_update(
            vec![make_record("HackMIT", 3), make_record("TreeHacks", 1)],
            Status::Collecting,
        ));
        app.select_first();

        let text = render(&mut app);
        assert!(text.contains("HackMIT"));
        assert!(text.contains("[Devpost]"));
        assert!(text.contains("2024-01-03 10:00"));
        assert!(text.contains("2 items"), "status bar should show item count");
        assert!(text.contains("session #1"));
        assert!(text.contains("Searching... 2 hackathons"));
    }

    #[test]
    fn draw_shows_form_values() {
        let mut app = App::new(15);
        app.form.domain = "AI".into();
        app.editing = true;

        let text = render(&mut app);
        assert!(text.contains("domain: AI"));
        assert!(text.contains("location: any"));
        assert!(text.contains("count: 15"));
        assert!(text.contains("Enter: go"));
    }
}
