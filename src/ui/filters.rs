//! Discover filter panel, shown above the home list

use ratatui::{
    prelude::*,
    widgets::{Block, BorderType, Borders, Paragraph},
};

use crate::app::{FilterField, FilterPanel};
use crate::ui::Theme;

/// One row per field plus the border
pub const PANEL_HEIGHT: u16 = FilterField::ALL.len() as u16 + 2;

pub fn render(frame: &mut Frame, area: Rect, panel: &FilterPanel) {
    let rows: Vec<Line> = FilterField::ALL
        .iter()
        .map(|field| {
            let focused = *field == panel.field;
            Line::from(vec![
                Span::styled(if focused { "▸ " } else { "  " }, Theme::keybind()),
                Span::styled(
                    format!("{:<12}", field.label()),
                    if focused { Theme::highlighted() } else { Theme::dimmed() },
                ),
                Span::styled(
                    format!("◂ {} ▸", panel.value_label(*field)),
                    if focused { Theme::selected() } else { Theme::text() },
                ),
            ])
        })
        .collect();

    let title = match panel.draft.active_count() {
        0 => " FILTERS ".to_string(),
        n => format!(" FILTERS ({} active) ", n),
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Theme::border_focused())
        .title(Span::styled(title, Theme::title()));

    frame.render_widget(Paragraph::new(rows).block(block), area);
}
