use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};

use super::app::App;
use crate::neko::Mood;
use crate::workspace::Workspace;

pub fn render(frame: &mut Frame, app: &App, ws: &Workspace) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(rows[0]);
    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(5)])
        .split(columns[1]);

    render_tasks(frame, app, columns[0]);
    render_docs(frame, ws, side[0]);
    render_neko(frame, ws, side[1]);
    render_status(frame, app, rows[1]);
}

fn priority_style(priority: u8, completed: bool) -> Style {
    if completed {
        return Style::default().fg(Color::DarkGray);
    }
    match priority {
        5 => Style::default().fg(Color::Red),
        4 => Style::default().fg(Color::Yellow),
        _ => Style::default(),
    }
}

fn render_tasks(frame: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let icon = if row.completed { "[x]" } else { "[ ]" };
            let line = Line::from(vec![
                Span::styled(
                    format!("{icon} "),
                    priority_style(row.priority, row.completed),
                ),
                Span::styled(format!("{}: ", row.id), Style::default().bold()),
                Span::styled(
                    row.text.clone(),
                    priority_style(row.priority, row.completed),
                ),
                Span::styled(
                    format!("  P{}", row.priority),
                    Style::default().fg(Color::DarkGray),
                ),
            ]);

            let item = ListItem::new(line);
            if i == app.cursor {
                item.style(Style::default().bg(Color::DarkGray))
            } else {
                item
            }
        })
        .collect();

    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Tasks "));
    frame.render_widget(list, area);
}

fn render_docs(frame: &mut Frame, ws: &Workspace, area: Rect) {
    let text = if ws.docs.list().is_empty() {
        "No documents.".to_string()
    } else {
        ws.docs
            .list()
            .iter()
            .map(|d| {
                if d.tags.is_empty() {
                    format!("{}: {}", d.id, d.title)
                } else {
                    format!("{}: {} [{}]", d.id, d.title, d.tags.join(", "))
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let paragraph = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(" Documents "))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_neko(frame: &mut Frame, ws: &Workspace, area: Rect) {
    let neko = ws.neko.borrow();
    let mood = neko.mood();
    let style = match mood {
        Mood::Thriving | Mood::Happy => Style::default().fg(Color::Green),
        Mood::Idle => Style::default(),
        Mood::Sad => Style::default().fg(Color::Yellow),
        Mood::Critical | Mood::Dead => Style::default().fg(Color::Red),
    };
    let status = if mood == Mood::Dead {
        "GHOST (complete a task to revive)".to_string()
    } else {
        format!("[{}] {}%", neko.bar(), neko.life())
    };
    let text = vec![
        Line::styled(format!("{} {}", mood.face(), mood.as_str()), style),
        Line::raw(status),
    ];

    let paragraph = Paragraph::new(text).block(Block::default().borders(Borders::ALL).title(" Neko "));
    frame.render_widget(paragraph, area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let text = match &app.message {
        Some(msg) => Line::styled(msg.clone(), Style::default().fg(Color::Yellow)),
        None => Line::styled(
            "j/k move  space toggle  d delete  r refresh  q quit",
            Style::default().fg(Color::DarkGray),
        ),
    };
    frame.render_widget(Paragraph::new(text), area);
}
