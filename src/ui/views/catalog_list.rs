use crate::fetch::CatalogState;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

pub fn draw_catalog_list(frame: &mut Frame, area: Rect, state: &CatalogState, selected: usize) {
  let scope = if state.search_term.trim().is_empty() {
    "Pokémon".to_string()
  } else {
    format!("Pokémon [{}]", state.search_term.trim())
  };
  let title = if state.loading {
    format!(" {} (loading...) ", scope)
  } else {
    format!(" {} ({}) ", scope, state.items.len())
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  if state.items.is_empty() {
    let content = if state.loading {
      "Loading..."
    } else if state.error.is_some() {
      "Nothing to show."
    } else {
      "No Pokémon found."
    };
    let paragraph = Paragraph::new(content)
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let items: Vec<ListItem> = state
    .items
    .iter()
    .map(|item| {
      let line = Line::from(vec![
        Span::styled(format!("#{:<5}", item.id), Style::default().fg(Color::Cyan)),
        Span::raw(" "),
        Span::raw(title_case(&item.name)),
      ]);
      ListItem::new(line)
    })
    .collect();

  let list = List::new(items)
    .block(block)
    .highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

  let mut list_state = ListState::default();
  list_state.select(Some(selected));

  frame.render_stateful_widget(list, area, &mut list_state);
}

/// "mr-mime" -> "Mr Mime"
pub(super) fn title_case(name: &str) -> String {
  name
    .split('-')
    .filter(|part| !part.is_empty())
    .map(|part| {
      let mut chars = part.chars();
      match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
      }
    })
    .collect::<Vec<_>>()
    .join(" ")
}
