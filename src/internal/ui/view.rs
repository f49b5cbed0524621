use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap},
};

use super::app::{App, InputMode, ViewMode};
use crate::internal::models::{MediaItem, MediaKind};
use crate::internal::notification::format_reward;
use crate::utils::datetime::format_relative;

pub fn draw(app: &mut App, f: &mut Frame) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.area());

    render_top_bar(app, f, chunks[0]);

    match app.view_mode {
        ViewMode::Feed => render_feed(app, f, chunks[1]),
        ViewMode::FullScreen => render_full_screen(app, f, chunks[1]),
        ViewMode::QuizInvite => render_quiz_invite(app, f, chunks[1]),
        ViewMode::QuizQuestion => render_quiz_question(app, f, chunks[1]),
        ViewMode::QuizResult => render_quiz_result(app, f, chunks[1]),
        ViewMode::SessionExpired => render_session_expired(app, f, chunks[1]),
    }

    render_status_bar(app, f, chunks[2]);

    if app.input_mode == InputMode::Search {
        render_search_overlay(app, f);
    }

    if app.notification.is_some() {
        render_notification(app, f);
    }
}

/// Letter label for an option index (0 -> 'A' .. 3 -> 'D').
pub fn option_letter(index: usize) -> char {
    (b'A' + (index as u8).min(3)) as char
}

/// "current/total" position indicator for the feed, 1-based.
pub fn feed_position(current_index: usize, total: usize) -> String {
    if total == 0 {
        "0/0".to_string()
    } else {
        format!("{}/{}", current_index.min(total - 1) + 1, total)
    }
}

/// Character-based wrap that never panics on degenerate widths. Used where a
/// Paragraph's own wrapping is not available (list items).
pub fn wrap_text(text: &str, width: u16) -> Vec<String> {
    let width = width.max(1) as usize;
    let mut lines = Vec::new();
    for raw in text.lines() {
        let mut current = String::new();
        for word in raw.split_whitespace() {
            if current.is_empty() {
                current = word.to_string();
            } else if current.chars().count() + 1 + word.chars().count() <= width {
                current.push(' ');
                current.push_str(word);
            } else {
                lines.push(std::mem::take(&mut current));
                current = word.to_string();
            }
            // Hard-break words longer than the width.
            while current.chars().count() > width {
                let head: String = current.chars().take(width).collect();
                let tail: String = current.chars().skip(width).collect();
                lines.push(head);
                current = tail;
            }
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

fn item_title(item: &MediaItem) -> &str {
    item.description.as_deref().unwrap_or("(no description)")
}

fn render_top_bar(app: &App, f: &mut Frame, area: Rect) {
    let left = format!("media feed v{}", app.app_version);
    let right = if app.cursor.search_term().is_empty() {
        String::new()
    } else {
        format!("Search: {}", app.cursor.search_term())
    };
    let line = Line::from(vec![
        Span::styled(left, Style::default().fg(app.theme.accent)),
        Span::raw("  "),
        Span::styled(right, Style::default().fg(app.theme.muted)),
    ]);
    let p = Paragraph::new(line).style(
        Style::default()
            .bg(app.theme.background)
            .fg(app.theme.foreground),
    );
    f.render_widget(p, area);
}

fn render_feed(app: &mut App, f: &mut Frame, area: Rect) {
    if app.cursor.is_initial_loading() {
        let p = Paragraph::new("Loading media...")
            .alignment(Alignment::Center)
            .style(Style::default().fg(app.theme.muted));
        f.render_widget(p, area);
        return;
    }

    if let Some(error) = app.cursor.initial_error() {
        let text = format!("Error loading media: {error}\n\nPress r to retry");
        let p = Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(Style::default().fg(app.theme.error))
            .wrap(Wrap { trim: true });
        f.render_widget(p, area);
        return;
    }

    if app.cursor.is_empty() {
        let text = if app.cursor.search_term().is_empty() {
            "No media found".to_string()
        } else {
            format!(
                "No matches for \"{}\"\n\nPress C to clear the search",
                app.cursor.search_term()
            )
        };
        let p = Paragraph::new(text)
            .alignment(Alignment::Center)
            .style(Style::default().fg(app.theme.muted));
        f.render_widget(p, area);
        return;
    }

    let items: Vec<ListItem> = app
        .cursor
        .items()
        .iter()
        .map(|item| {
            let kind_tag = match item.kind {
                MediaKind::Video => "[video]",
                MediaKind::Image => "[image]",
            };
            let watched = if item.has_watched { " ✓" } else { "" };
            let meta = format!(
                " (@{} | {} views | +{} | {})",
                item.uploader_username,
                item.view_count,
                format_reward(item.reward),
                format_relative(item.created_at),
            );

            let content = Line::from(vec![
                Span::styled(
                    format!("{kind_tag} "),
                    Style::default().fg(app.theme.accent),
                ),
                Span::styled(item_title(item), Style::default().fg(app.theme.foreground)),
                Span::styled(watched, Style::default().fg(app.theme.watched)),
                Span::styled(meta, Style::default().fg(app.theme.muted)),
            ]);
            ListItem::new(content)
        })
        .collect();

    let mut title = format!("Explore - {}", feed_position(app.current_index, app.cursor.len()));
    if app.cursor.is_loading() {
        title.push_str(" (loading more...)");
    } else if !app.cursor.has_more() {
        title.push_str(" (end)");
    }

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border))
                .title(title)
                .title_style(Style::default().fg(app.theme.foreground)),
        )
        .style(Style::default().bg(app.theme.background))
        .highlight_style(
            Style::default()
                .bg(app.theme.selection_bg)
                .fg(app.theme.selection_fg)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    state.select(Some(app.current_index));
    f.render_stateful_widget(list, area, &mut state);
}

fn render_full_screen(app: &App, f: &mut Frame, area: Rect) {
    let item = match &app.selected_media {
        Some(item) => item,
        None => return,
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(0)])
        .split(area);

    let tags: Vec<&str> = item.tags.iter().map(|t| t.label()).collect();
    let watched_line = if item.has_watched {
        "Watched ✓"
    } else {
        match item.kind {
            MediaKind::Video => "Playing...",
            MediaKind::Image => "Viewing...",
        }
    };
    let meta = format!(
        "@{}\nKind: {}\nReward: +{}\nTags: {}\nViews: {} | {}\n{}",
        item.uploader_username,
        item.kind,
        format_reward(item.reward),
        tags.join(", "),
        item.view_count,
        format_relative(item.created_at),
        watched_line,
    );
    let header = Paragraph::new(meta)
        .style(
            Style::default()
                .fg(app.theme.foreground)
                .bg(app.theme.background),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border))
                .title(item_title(item).to_string())
                .title_style(Style::default().fg(app.theme.accent)),
        );
    f.render_widget(header, chunks[0]);

    let body = Paragraph::new(item.url.clone())
        .style(Style::default().fg(app.theme.muted).bg(app.theme.background))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border))
                .title("Media (o: open externally, Esc: close)")
                .title_style(Style::default().fg(app.theme.foreground)),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(body, chunks[1]);
}

fn render_quiz_invite(app: &App, f: &mut Frame, area: Rect) {
    let challenge = match app.quiz_session.active() {
        Some(challenge) => challenge,
        None => return,
    };

    let popup = centered_rect(area, 50, 7);
    let text = format!(
        "You earned a quiz!\n\nAnswer one question to win +{}.\n\ny/Enter: accept   n/Esc: decline",
        format_reward(challenge.reward),
    );
    let p = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(
            Style::default()
                .fg(app.theme.foreground)
                .bg(app.theme.background),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.accent))
                .title("Quiz invitation")
                .title_style(Style::default().fg(app.theme.accent)),
        );
    f.render_widget(Clear, popup);
    f.render_widget(p, popup);
}

fn render_quiz_question(app: &App, f: &mut Frame, area: Rect) {
    let challenge = match app.quiz_session.active() {
        Some(challenge) => challenge,
        None => return,
    };
    let round = match &app.quiz_round {
        Some(round) => round,
        None => return,
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),
            Constraint::Length(3),
            Constraint::Length(6),
        ])
        .split(area);

    let question = Paragraph::new(challenge.question.question.clone())
        .alignment(Alignment::Center)
        .style(
            Style::default()
                .fg(app.theme.foreground)
                .bg(app.theme.background),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border))
                .title("Question")
                .title_style(Style::default().fg(app.theme.accent)),
        )
        .wrap(Wrap { trim: true });
    f.render_widget(question, chunks[0]);

    let percent = if round.duration() > 0 {
        (round.time_left() * 100 / round.duration()).min(100) as u16
    } else {
        0
    };
    let timer = Gauge::default()
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border))
                .title(format!("{}s", round.time_left())),
        )
        .gauge_style(
            Style::default()
                .fg(app.theme.accent)
                .bg(app.theme.background),
        )
        .percent(percent);
    f.render_widget(timer, chunks[1]);

    let options: Vec<ListItem> = challenge
        .question
        .options()
        .iter()
        .enumerate()
        .map(|(i, option)| {
            let marker = if round.selected() == Some(i) { ">" } else { " " };
            let style = if round.is_answered() && i == round.correct_index() {
                Style::default().fg(app.theme.watched)
            } else if round.selected() == Some(i) {
                Style::default()
                    .fg(app.theme.selection_fg)
                    .bg(app.theme.selection_bg)
            } else {
                Style::default().fg(app.theme.foreground)
            };
            ListItem::new(Line::from(Span::styled(
                format!("{marker} {}. {option}", option_letter(i)),
                style,
            )))
        })
        .collect();

    let list = List::new(options)
        .style(Style::default().bg(app.theme.background))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.border))
                .title("a-d: answer")
                .title_style(Style::default().fg(app.theme.foreground)),
        );
    f.render_widget(list, chunks[2]);
}

fn render_quiz_result(app: &App, f: &mut Frame, area: Rect) {
    let outcome = match app.quiz_outcome {
        Some(outcome) => outcome,
        None => return,
    };

    let popup = centered_rect(area, 54, 9);
    let verdict = if outcome.is_correct {
        "Correct!"
    } else if outcome.time_expired {
        "Time's up!"
    } else {
        "Wrong answer"
    };
    let selected = match outcome.selected {
        Some(i) => option_letter(i).to_string(),
        None => "none".to_string(),
    };
    let reward_line = match (outcome.is_correct, app.quiz_session.active()) {
        (true, Some(challenge)) => format!("\nYou won +{}!", format_reward(challenge.reward)),
        _ => String::new(),
    };
    let text = format!(
        "{verdict}\n\nYour answer: {selected}\nCorrect answer: {}{reward_line}\n\nPress any key to continue",
        option_letter(outcome.correct_index),
    );

    let color = if outcome.is_correct {
        app.theme.watched
    } else {
        app.theme.error
    };
    let p = Paragraph::new(text)
        .alignment(Alignment::Center)
        .style(Style::default().fg(app.theme.foreground).bg(app.theme.background))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title("Quiz result")
                .title_style(Style::default().fg(color)),
        );
    f.render_widget(Clear, popup);
    f.render_widget(p, popup);
}

fn render_session_expired(app: &App, f: &mut Frame, area: Rect) {
    let p = Paragraph::new("Session expired. Please sign in again.\n\nPress any key to exit.")
        .alignment(Alignment::Center)
        .style(Style::default().fg(app.theme.error).bg(app.theme.background));
    f.render_widget(p, area);
}

fn render_status_bar(app: &App, f: &mut Frame, area: Rect) {
    let status = if app.input_mode == InputMode::Search {
        "Search: type to edit | Enter: apply | Esc: cancel".to_string()
    } else {
        match app.view_mode {
            ViewMode::Feed => format!(
                "j/k: Nav | Enter: Watch | /: Search | C: Clear | q: Quit | {}",
                feed_position(app.current_index, app.cursor.len()),
            ),
            ViewMode::FullScreen => "o: Open media | Esc: Close".to_string(),
            ViewMode::QuizInvite => "y: Accept | n: Decline".to_string(),
            ViewMode::QuizQuestion => "a-d: Answer".to_string(),
            ViewMode::QuizResult | ViewMode::SessionExpired => "Any key: Continue".to_string(),
        }
    };

    let p = Paragraph::new(status).style(
        Style::default()
            .bg(app.theme.selection_bg)
            .fg(app.theme.selection_fg),
    );
    f.render_widget(p, area);
}

fn render_notification(app: &App, f: &mut Frame) {
    if let Some(n) = &app.notification {
        let area = f.area();
        let popup_width = (n.message.chars().count() as u16 + 4).min(area.width.saturating_sub(4));
        let popup_height = 3;
        let popup_x = (area.width.saturating_sub(popup_width)) / 2;
        let popup_y = (area.height.saturating_sub(popup_height)) / 2;
        let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

        let popup = Paragraph::new(n.message.as_str())
            .style(
                Style::default()
                    .bg(app.theme.selection_bg)
                    .fg(app.theme.selection_fg)
                    .add_modifier(Modifier::BOLD),
            )
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(app.theme.border)),
            )
            .alignment(Alignment::Center);

        f.render_widget(Clear, popup_area);
        f.render_widget(popup, popup_area);
    }
}

fn render_search_overlay(app: &App, f: &mut Frame) {
    let area = f.area();
    let search_width = 60.min(area.width.saturating_sub(4));
    let search_height = 3;
    let search_x = (area.width.saturating_sub(search_width)) / 2;
    let search_y = (area.height.saturating_sub(search_height)) / 2;
    let search_area = Rect::new(search_x, search_y, search_width, search_height);

    let display_text = format!("{}█", app.search_input);
    let search_box = Paragraph::new(display_text)
        .style(
            Style::default()
                .fg(app.theme.foreground)
                .bg(app.theme.background),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(app.theme.selection_bg))
                .title(" Search (Esc to cancel) ")
                .title_style(
                    Style::default()
                        .fg(app.theme.selection_fg)
                        .bg(app.theme.selection_bg)
                        .add_modifier(Modifier::BOLD),
                ),
        );

    f.render_widget(Clear, search_area);
    f.render_widget(search_box, search_area);
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(2));
    let height = height.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}
