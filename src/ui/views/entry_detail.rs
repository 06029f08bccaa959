use super::catalog_list::title_case;
use crate::pokeapi::types::Detail;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

pub fn draw_entry_detail(frame: &mut Frame, area: Rect, detail: &Detail) {
  let block = Block::default()
    .title(format!(" #{} {} ", detail.id, title_case(&detail.name)))
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  let label = Style::default().fg(Color::DarkGray);

  // Height and weight arrive in decimetres and hectograms
  let mut lines = vec![
    Line::from(vec![
      Span::styled("Height: ", label),
      Span::raw(format!("{:.1} m", detail.height as f64 / 10.0)),
      Span::raw("  "),
      Span::styled("Weight: ", label),
      Span::raw(format!("{:.1} kg", detail.weight as f64 / 10.0)),
    ]),
    Line::from(vec![
      Span::styled("Base experience: ", label),
      Span::raw(
        detail
          .base_experience
          .map(|xp| xp.to_string())
          .unwrap_or_else(|| "-".to_string()),
      ),
    ]),
    Line::from(vec![
      Span::styled("Types: ", label),
      Span::styled(detail.types.join(", "), Style::default().fg(Color::Yellow)),
    ]),
    Line::from(vec![
      Span::styled("Abilities: ", label),
      Span::raw(detail.abilities.join(", ")),
    ]),
  ];

  if let Some(url) = detail.artwork_url.as_ref().or(detail.sprite_url.as_ref()) {
    lines.push(Line::raw(""));
    lines.push(Line::from(vec![
      Span::styled("Artwork: ", label),
      Span::styled(url.as_str(), Style::default().fg(Color::Cyan)),
    ]));
  }

  let paragraph = Paragraph::new(lines)
    .block(block)
    .wrap(Wrap { trim: true });
  frame.render_widget(paragraph, area);
}
