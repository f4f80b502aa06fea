//! Content browser view
//!
//! Displays trending content, search results or the watchlist in a
//! selectable list.

use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, List, ListItem, Paragraph},
};

use crate::app::{ListState, LoadingState};
use crate::models::{MediaType, SearchResult, WatchlistEntry};
use crate::ui::Theme;

/// Trait for items that can be displayed in the browser
pub trait BrowserItem {
    fn title(&self) -> &str;
    fn year(&self) -> Option<u16>;
    fn media_type(&self) -> MediaType;
    /// Trailing column (rating, date added)
    fn extra_info(&self) -> Option<String>;
    fn rating(&self) -> Option<f32> {
        None
    }
}

impl BrowserItem for SearchResult {
    fn title(&self) -> &str {
        &self.title
    }

    fn year(&self) -> Option<u16> {
        self.year
    }

    fn media_type(&self) -> MediaType {
        self.media_type
    }

    fn extra_info(&self) -> Option<String> {
        Some(format!("★ {:.1}", self.vote_average))
    }

    fn rating(&self) -> Option<f32> {
        Some(self.vote_average)
    }
}

impl BrowserItem for WatchlistEntry {
    fn title(&self) -> &str {
        &self.title
    }

    fn year(&self) -> Option<u16> {
        self.release_date
            .as_deref()
            .and_then(crate::models::extract_year)
    }

    fn media_type(&self) -> MediaType {
        self.media_type
    }

    fn extra_info(&self) -> Option<String> {
        Some(format!("added {}", self.added_at.format("%Y-%m-%d")))
    }
}

/// Borrowed view over one list for a single frame
pub struct BrowserView<'a, T: BrowserItem> {
    pub title: &'a str,
    pub items: &'a [T],
    pub focused: bool,
    pub loading: Option<&'a LoadingState>,
    pub empty_message: &'a str,
}

impl<'a, T: BrowserItem> BrowserView<'a, T> {
    pub fn new(title: &'a str, items: &'a [T]) -> Self {
        Self {
            title,
            items,
            focused: true,
            loading: None,
            empty_message: "No content to display",
        }
    }

    pub fn loading(mut self, loading: &'a LoadingState) -> Self {
        self.loading = Some(loading);
        self
    }

    pub fn empty_message(mut self, message: &'a str) -> Self {
        self.empty_message = message;
        self
    }

    /// Render the list, scrolling `list` to keep the cursor visible
    pub fn render(&self, frame: &mut Frame, area: Rect, list: &mut ListState) {
        let visible_height = area.height.saturating_sub(2) as usize;
        list.scroll_into_view(visible_height);

        if let Some(state) = self.loading {
            if state.is_loading() || matches!(state, LoadingState::Error(_)) {
                let style = if state.is_loading() {
                    Theme::loading()
                } else {
                    Theme::error()
                };
                self.render_message(frame, area, state.message().unwrap_or("Loading..."), style);
                return;
            }
        }

        if self.items.is_empty() {
            self.render_message(frame, area, self.empty_message, Theme::dimmed());
            return;
        }

        let items: Vec<ListItem> = self
            .items
            .iter()
            .enumerate()
            .skip(list.offset)
            .take(visible_height)
            .map(|(i, item)| render_item(item, i == list.selected))
            .collect();

        let title = format!(" {} ({}/{}) ", self.title, list.selected + 1, self.items.len());
        let list_widget = List::new(items)
            .block(self.block(title))
            .style(Theme::text());

        frame.render_widget(list_widget, area);
    }

    fn block(&self, title: String) -> Block<'static> {
        let border_style = if self.focused {
            Theme::border_focused()
        } else {
            Theme::border()
        };

        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .border_type(BorderType::Rounded)
            .title(Span::styled(title, Theme::title()))
            .title_alignment(Alignment::Left)
    }

    fn render_message(&self, frame: &mut Frame, area: Rect, message: &str, style: Style) {
        let paragraph = Paragraph::new(message.to_string())
            .style(style)
            .alignment(Alignment::Center)
            .block(self.block(format!(" {} ", self.title)));

        frame.render_widget(paragraph, area);
    }
}

/// Render a single row: ▸ Title (Year)  [TYPE] extra
fn render_item<T: BrowserItem>(item: &T, is_selected: bool) -> ListItem<'static> {
    let marker = if is_selected { "▸ " } else { "  " };
    let year_str = item.year().map(|y| format!(" ({})", y)).unwrap_or_default();
    let type_str = match item.media_type() {
        MediaType::Movie => "MOVIE",
        MediaType::Tv => "TV",
    };

    let mut spans = vec![
        Span::styled(
            marker.to_string(),
            if is_selected { Theme::accent() } else { Theme::dimmed() },
        ),
        Span::styled(
            item.title().to_string(),
            if is_selected { Theme::selected() } else { Theme::text() },
        ),
        Span::styled(
            year_str,
            if is_selected { Theme::accent() } else { Theme::year() },
        ),
        Span::raw(" "),
        Span::styled(
            format!("[{}]", type_str),
            if is_selected { Theme::accent() } else { Theme::secondary() },
        ),
    ];

    if let Some(extra) = item.extra_info() {
        let style = match item.rating() {
            Some(rating) => rating_style(rating, is_selected),
            None => Theme::dimmed(),
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(extra, style));
    }

    ListItem::new(Line::from(spans))
}

/// Get style for rating based on value
pub fn rating_style(rating: f32, is_selected: bool) -> Style {
    if is_selected {
        Theme::accent()
    } else if rating >= 7.5 {
        Theme::success()
    } else if rating >= 6.0 {
        Theme::warning()
    } else if rating >= 4.0 {
        Theme::dimmed()
    } else {
        Theme::error()
    }
}
