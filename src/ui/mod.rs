mod views;

use crate::app::{App, Mode};
use crate::fetch::CatalogState;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App, state: &CatalogState) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Pagination / errors
      Constraint::Length(1), // Status bar
    ])
    .split(frame.area());

  match &state.selected {
    Some(detail) => {
      let panes = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[0]);
      views::catalog_list::draw_catalog_list(frame, panes[0], state, app.cursor());
      views::entry_detail::draw_entry_detail(frame, panes[1], detail);
    }
    None => views::catalog_list::draw_catalog_list(frame, chunks[0], state, app.cursor()),
  }

  draw_info_line(frame, chunks[1], app, state);
  draw_status_bar(frame, chunks[2], app);
}

fn draw_info_line(frame: &mut Frame, area: Rect, app: &App, state: &CatalogState) {
  let line = if let Some(error) = &state.error {
    Line::from(vec![
      Span::styled(format!(" {}", error), Style::default().fg(Color::Red)),
      Span::styled("  (r: retry)", Style::default().fg(Color::DarkGray)),
    ])
  } else if let Some(notice) = app.notice() {
    Line::styled(format!(" {}", notice), Style::default().fg(Color::Green))
  } else {
    let pagination = &state.pagination;
    let pages = pagination
      .total_pages
      .map(|total| total.to_string())
      .unwrap_or_else(|| "?".to_string());
    Line::styled(
      format!(
        " Page {}/{}  ({} total)",
        pagination.current_page, pages, pagination.total_count
      ),
      Style::default().fg(Color::DarkGray),
    )
  };

  frame.render_widget(Paragraph::new(line), area);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
  let (content, style) = match app.mode() {
    Mode::Normal => {
      let hint = " /search  j/k:nav  Enter:details  n/p:page  r:retry  C:clear cache  q:back/quit";
      (hint.to_string(), Style::default().fg(Color::DarkGray))
    }
    Mode::Search => {
      let search = format!("/{}", app.search_input());
      (search, Style::default().fg(Color::Cyan))
    }
  };

  let paragraph = Paragraph::new(content).style(style);
  frame.render_widget(paragraph, area);
}
