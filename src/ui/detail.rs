//! Detail view
//!
//! Renders one playback session: item info, season and episode pickers,
//! the server list and the player line.

use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, List, ListItem, Paragraph, Wrap},
};

use crate::app::{DetailFocus, DetailView, ListState};
use crate::models::MediaItem;
use crate::session::{PlaybackSession, PlayerStatus, SessionState};
use crate::ui::browser::rating_style;
use crate::ui::Theme;

/// Render the detail screen for the session
pub fn render(frame: &mut Frame, area: Rect, session: &PlaybackSession, view: &mut DetailView) {
    let Some(item) = session.item() else {
        render_placeholder(frame, area, session);
        return;
    };

    let v_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(4)])
        .split(area);

    if item.is_episodic() {
        // Left: info, right: seasons / episodes / servers
        let h_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(v_chunks[0]);

        render_info_panel(frame, h_chunks[0], session, item);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(25),
                Constraint::Percentage(40),
                Constraint::Percentage(35),
            ])
            .split(h_chunks[1]);

        render_seasons_panel(frame, right[0], session, item, view);
        render_episodes_panel(frame, right[1], session, view);
        render_servers_panel(frame, right[2], session, view);
    } else {
        let h_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(v_chunks[0]);

        render_info_panel(frame, h_chunks[0], session, item);
        render_servers_panel(frame, h_chunks[1], session, view);
    }

    render_player_panel(frame, v_chunks[1], session);
}

fn panel(title: String, focused: bool) -> Block<'static> {
    let border_style = if focused {
        Theme::border_focused()
    } else {
        Theme::border()
    };

    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(border_style)
        .title(Span::styled(title, Theme::title()))
}

/// Loading or failed details
fn render_placeholder(frame: &mut Frame, area: Rect, session: &PlaybackSession) {
    let (text, style) = match session.state() {
        SessionState::Failed(err) => (format!("{}\n\n[r] retry  [esc] back", err), Theme::error()),
        SessionState::DetailsLoading => ("Loading details...".to_string(), Theme::loading()),
        _ => ("No media selected".to_string(), Theme::dimmed()),
    };

    let paragraph = Paragraph::new(text)
        .style(style)
        .alignment(Alignment::Center)
        .block(panel(" DETAIL ".into(), false));

    frame.render_widget(paragraph, area);
}

fn render_info_panel(frame: &mut Frame, area: Rect, session: &PlaybackSession, item: &MediaItem) {
    let block = panel(" INFO ".into(), false);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();

    let year_str = item.year().map(|y| format!(" ({})", y)).unwrap_or_default();
    let mut title = vec![
        Span::styled("▶ ", Theme::accent()),
        Span::styled(item.title.clone(), Theme::title()),
        Span::styled(year_str, Theme::secondary()),
    ];
    if session.is_saved() {
        title.push(Span::styled("  ✚ saved", Theme::success()));
    }
    lines.push(Line::from(title));

    let mut meta = vec![Span::styled(
        format!("★ {:.1}", item.rating),
        rating_style(item.rating, false),
    )];
    if item.is_episodic() {
        meta.push(Span::styled(" │ ", Theme::dimmed()));
        meta.push(Span::styled(format!("{} seasons", item.seasons.len()), Theme::secondary()));
    } else {
        meta.push(Span::styled(" │ ", Theme::dimmed()));
        meta.push(Span::styled(item.runtime.to_string(), Theme::secondary()));
    }
    if let Some(status) = &item.status {
        meta.push(Span::styled(" │ ", Theme::dimmed()));
        meta.push(Span::styled(status.clone(), Theme::dimmed()));
    }
    lines.push(Line::from(meta));

    if !item.genres.is_empty() {
        lines.push(Line::from(vec![
            Span::styled("Genre: ", Theme::dimmed()),
            Span::styled(item.genres.join(", "), Theme::text()),
        ]));
    }

    if !item.cast.is_empty() {
        let names: Vec<&str> = item.cast.iter().take(5).map(|c| c.name.as_str()).collect();
        lines.push(Line::from(vec![
            Span::styled("Cast: ", Theme::dimmed()),
            Span::styled(names.join(", "), Theme::text()),
        ]));
    }

    if let Some(trailer) = &item.trailer {
        lines.push(Line::from(vec![
            Span::styled("Trailer: ", Theme::dimmed()),
            Span::styled(trailer.name.clone(), Theme::text()),
            Span::styled("  [t]", Theme::keybind()),
        ]));
    }

    lines.push(Line::from(Span::styled(
        "─".repeat(inner.width as usize),
        Theme::dimmed(),
    )));

    if !item.overview.is_empty() {
        lines.push(Line::from(Span::styled("OVERVIEW", Theme::accent())));
        for line in item.overview.lines() {
            lines.push(Line::from(Span::styled(line.to_string(), Theme::text())));
        }
    }

    let paragraph = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, inner);
}

/// Rows rendered with the cursor marker and the chosen entry in bold
fn list_rows(labels: Vec<(String, bool)>, list: &mut ListState, height: u16) -> Vec<ListItem<'static>> {
    let visible = height.saturating_sub(2) as usize;
    list.scroll_into_view(visible);

    labels
        .into_iter()
        .enumerate()
        .skip(list.offset)
        .take(visible)
        .map(|(i, (label, chosen))| {
            let is_cursor = i == list.selected;
            let marker = if is_cursor { "▸ " } else { "  " };
            let style = if is_cursor {
                Theme::highlighted()
            } else if chosen {
                Theme::selected()
            } else {
                Theme::text()
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, if is_cursor { Theme::accent() } else { Theme::dimmed() }),
                Span::styled(label, style),
            ]))
        })
        .collect()
}

fn render_seasons_panel(
    frame: &mut Frame,
    area: Rect,
    session: &PlaybackSession,
    item: &MediaItem,
    view: &mut DetailView,
) {
    let block = panel(
        format!(" SEASONS ({}) ", item.seasons.len()),
        view.focus == DetailFocus::Seasons,
    );

    if item.seasons.is_empty() {
        let empty = Paragraph::new("No seasons")
            .style(Theme::dimmed())
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let selected = session.selection().selected_season;
    let labels = item
        .seasons
        .iter()
        .map(|s| (s.to_string(), s.season_number == selected))
        .collect();

    let list = List::new(list_rows(labels, &mut view.seasons, area.height)).block(block);
    frame.render_widget(list, area);
}

fn render_episodes_panel(frame: &mut Frame, area: Rect, session: &PlaybackSession, view: &mut DetailView) {
    let focused = view.focus == DetailFocus::Episodes;

    let (message, style) = match session.state() {
        SessionState::SeasonLoading => ("Loading episodes...".to_string(), Theme::loading()),
        SessionState::SeasonFailed(err) => (format!("{}\n[r] retry", err), Theme::error()),
        SessionState::DetailsReady => ("Select a season".to_string(), Theme::dimmed()),
        _ => (String::new(), Theme::text()),
    };

    let Some(detail) = session.season_detail().filter(|_| message.is_empty()) else {
        let block = panel(" EPISODES ".into(), focused);
        let paragraph = Paragraph::new(message)
            .style(style)
            .alignment(Alignment::Center)
            .block(block);
        frame.render_widget(paragraph, area);
        return;
    };

    let block = panel(
        format!(" EPISODES ({}) ", detail.episode_count()),
        focused,
    );
    let selected = session.selection().selected_episode;
    let labels = detail
        .episodes
        .iter()
        .map(|e| (format!("{:>2}. {}", e.episode, e.name), e.episode == selected))
        .collect();

    let list = List::new(list_rows(labels, &mut view.episodes, area.height)).block(block);
    frame.render_widget(list, area);
}

fn render_servers_panel(frame: &mut Frame, area: Rect, session: &PlaybackSession, view: &mut DetailView) {
    let catalog = session.catalog();
    let block = panel(
        format!(" SERVERS ({}) ", catalog.len()),
        view.focus == DetailFocus::Servers,
    );

    let selected = session.selection().selected_server_id;
    let labels = catalog
        .servers()
        .iter()
        .enumerate()
        .map(|(i, s)| {
            (
                format!("[{}] {} · {} · ads: {}", i + 1, s.name, s.quality, s.ads),
                s.id == selected,
            )
        })
        .collect();

    let list = List::new(list_rows(labels, &mut view.servers, area.height)).block(block);
    frame.render_widget(list, area);
}

fn render_player_panel(frame: &mut Frame, area: Rect, session: &PlaybackSession) {
    let selection = session.selection();
    let server = session.server();

    let status = match session.player_status() {
        PlayerStatus::Hidden => Line::from(vec![
            Span::styled("Player hidden  ", Theme::dimmed()),
            Span::styled("[p]", Theme::keybind()),
            Span::styled(" play", Theme::dimmed()),
        ]),
        PlayerStatus::Pending if session.item().is_some() => {
            Line::from(Span::styled("Pick a season to play", Theme::loading()))
        }
        PlayerStatus::Pending => Line::from(Span::styled("Waiting for details...", Theme::loading())),
        PlayerStatus::Playing(url) => Line::from(vec![
            Span::styled("▶ ", Theme::success()),
            Span::styled(url, Theme::text()),
        ]),
        PlayerStatus::NoServerAvailable => Line::from(Span::styled(
            "No server available, pick one with 1-8",
            Theme::error(),
        )),
    };

    let mut target = vec![Span::styled(server.name, Theme::accent())];
    if session.item().is_some_and(|i| i.is_episodic()) {
        target.push(Span::styled(
            format!("  S{:02}E{:02}", selection.selected_season, selection.selected_episode),
            Theme::secondary(),
        ));
    }
    if session.failed_attempts() > 0 {
        target.push(Span::styled(
            format!("  {} failed", session.failed_attempts()),
            Theme::warning(),
        ));
    }
    if selection.trailer_visible {
        target.push(Span::styled("  trailer", Theme::secondary()));
    }

    let paragraph = Paragraph::new(vec![Line::from(target), status])
        .block(panel(" PLAYER ".into(), selection.player_visible));
    frame.render_widget(paragraph, area);
}
