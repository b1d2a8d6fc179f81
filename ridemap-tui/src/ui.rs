use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
};
use ridemap_core::model::{LoadState, MapStatus, MapView, ProviderKind};

use crate::app::App;

pub(crate) fn draw(frame: &mut Frame<'_>, app: &App) {
    let area = frame.area();

    // Outer layout: title, main content, status line
    let layout_chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area);

    let chunks = layout_chunks.as_ref();
    let [header_area, content_area, status_area] = chunks else {
        return;
    };

    let header = Paragraph::new("ridemap – map SDK bootstrap across app panels")
        .block(Block::default().borders(Borders::ALL).title("Ridemap"));
    frame.render_widget(header, *header_area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(*content_area);
    let [left_area, log_area] = columns.as_ref() else {
        return;
    };

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(0)])
        .split(*left_area);
    let [bootstrap_area, panels_area] = left.as_ref() else {
        return;
    };

    draw_bootstrap(frame, app, *bootstrap_area);
    draw_panels(frame, app, *panels_area);
    draw_log(frame, app, *log_area);

    let nav_hint = "↑/↓ select panel · Enter/m mount/unmount · s switch provider · r reload settings · q/Ctrl-C quit";

    let status_text = if app.is_busy {
        format!("Working… · {nav_hint}")
    } else if let Some(msg) = &app.error_message {
        format!("{msg} · {nav_hint}")
    } else {
        nav_hint.to_owned()
    };

    let status_style = if app.error_message.is_some() {
        Style::default().fg(Color::Red)
    } else if app.is_busy {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let status = Paragraph::new(status_text)
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(status_style)
        .wrap(Wrap { trim: true });

    frame.render_widget(status, *status_area);
}

fn draw_bootstrap(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let snapshot = &app.snapshot;

    let rows = ProviderKind::ALL.into_iter().map(|provider| {
        let state = snapshot.load_state(provider);
        let configured = if snapshot.configured.contains(&provider) {
            "yes"
        } else {
            "no"
        };
        let active = if snapshot.active_provider == Some(provider) {
            "●"
        } else {
            ""
        };
        Row::new(vec![
            Cell::from(provider.to_string()),
            Cell::from(configured),
            Cell::from(format!("{state:?}")),
            Cell::from(active),
        ])
        .style(Style::default().fg(load_state_color(state)))
    });

    let column_widths = [
        Constraint::Length(10),
        Constraint::Length(12),
        Constraint::Length(15),
        Constraint::Min(6),
    ];

    let table = Table::new(rows, column_widths)
        .header(
            Row::new(vec!["Provider", "Configured", "Load state", "Active"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Bootstrap: {}", snapshot.status))
                .title_style(Style::default().fg(status_color(&snapshot.status))),
        )
        .column_spacing(1);

    frame.render_widget(table, area);
}

fn draw_panels(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let items = app
        .panels
        .iter()
        .enumerate()
        .map(|(idx, slot)| {
            let prefix = if idx == app.panel_index { "> " } else { "  " };
            let state = match (&slot.subscription, &slot.view) {
                (None, _) => "unmounted".to_owned(),
                (Some(_), Some(view)) => view_label(view),
                (Some(_), None) => "mounted".to_owned(),
            };
            ListItem::new(format!(
                "{prefix}{:<11}{state} ({} updates)",
                slot.panel.label(),
                slot.notifications
            ))
        })
        .collect::<Vec<ListItem<'_>>>();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(
                    "Map consumers ({} subscribed)",
                    app.bootstrap.subscriber_count()
                )),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if app.selected_panel().is_some() {
        state.select(Some(app.panel_index));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_log(frame: &mut Frame<'_>, app: &App, area: Rect) {
    let visible = usize::from(area.height.saturating_sub(2));
    let items = app
        .log
        .iter()
        .rev()
        .take(visible)
        .map(|line| {
            ListItem::new(format!(
                "{} {:<10} {}",
                line.at.format("%H:%M:%S"),
                line.source,
                line.message
            ))
        })
        .collect::<Vec<ListItem<'_>>>();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Notifications (newest first)"),
    );
    frame.render_widget(list, area);
}

// What a map component would render for this view.
fn view_label(view: &MapView) -> String {
    match (&view.error, view.provider, view.is_loaded) {
        (Some(_), _, _) => "configure a map provider".to_owned(),
        (None, Some(provider), true) => format!("map via {provider}"),
        (None, _, false) if !view.has_primary_configured && !view.has_backup_configured => {
            "waiting for settings".to_owned()
        }
        _ => "loading map…".to_owned(),
    }
}

fn load_state_color(state: LoadState) -> Color {
    match state {
        LoadState::Uninitialized => Color::Gray,
        LoadState::Loading => Color::Yellow,
        LoadState::Ready => Color::Green,
        LoadState::Failed => Color::Red,
    }
}

fn status_color(status: &MapStatus) -> Color {
    match status {
        MapStatus::NotConfigured => Color::Gray,
        MapStatus::Loading(_) => Color::Yellow,
        MapStatus::Ready(_) => Color::Green,
        MapStatus::Error(_) => Color::Red,
    }
}
