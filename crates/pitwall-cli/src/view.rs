//! Terminal output.
//!
//! Every command builds a [`Report`] of text lines and tables. On a terminal
//! the report is drawn by ratatui into an inline viewport below the prompt;
//! when stdout is piped, or the report is taller than the screen, the same
//! widgets are rendered into an off-screen buffer and printed as plain lines.

use std::io::{self, IsTerminal, Write as _};

use anyhow::{Context, Result};
use ratatui::{
  Terminal, TerminalOptions, Viewport,
  backend::CrosstermBackend,
  buffer::Buffer,
  layout::{Constraint, Layout, Rect},
  style::{Modifier, Style},
  text::{Line, Text},
  widgets::{Paragraph, Row, Table, Widget},
};

const COLUMN_SPACING: u16 = 2;

fn cells(n: usize) -> u16 { u16::try_from(n).unwrap_or(u16::MAX) }

struct Grid {
  header: Vec<&'static str>,
  rows:   Vec<Vec<String>>,
}

impl Grid {
  fn widths(&self) -> Vec<u16> {
    self
      .header
      .iter()
      .enumerate()
      .map(|(i, h)| {
        let widest = self
          .rows
          .iter()
          .map(|r| Line::raw(r[i].as_str()).width())
          .fold(Line::raw(*h).width(), usize::max);
        cells(widest)
      })
      .collect()
  }

  fn width(&self) -> u16 {
    let gaps = COLUMN_SPACING.saturating_mul(cells(self.header.len().saturating_sub(1)));
    self
      .widths()
      .into_iter()
      .fold(gaps, u16::saturating_add)
  }

  fn render(&self, area: Rect, buf: &mut Buffer) {
    let header = Row::new(self.header.iter().copied())
      .style(Style::new().add_modifier(Modifier::BOLD | Modifier::UNDERLINED));
    let rows = self
      .rows
      .iter()
      .map(|r| Row::new(r.iter().map(String::as_str)));
    Table::new(rows, self.widths().into_iter().map(Constraint::Length))
      .header(header)
      .column_spacing(COLUMN_SPACING)
      .render(area, buf);
  }
}

enum Part {
  Text(Text<'static>),
  Grid(Grid),
}

impl Part {
  fn height(&self) -> u16 {
    match self {
      Part::Text(text) => cells(text.height()),
      Part::Grid(grid) => cells(grid.rows.len() + 1),
    }
  }

  fn width(&self) -> u16 {
    match self {
      Part::Text(text) => cells(text.width()),
      Part::Grid(grid) => grid.width(),
    }
  }
}

/// A vertical stack of text and tables.
#[derive(Default)]
pub struct Report {
  parts: Vec<Part>,
}

impl Report {
  pub fn new() -> Self { Self::default() }

  pub fn line(&mut self, line: impl Into<Line<'static>>) -> &mut Self {
    match self.parts.last_mut() {
      Some(Part::Text(text)) => text.push_line(line),
      _ => self.parts.push(Part::Text(Text::from(line.into()))),
    }
    self
  }

  pub fn blank(&mut self) -> &mut Self { self.line("") }

  /// Append a table; an empty one renders as a single "(no results)" line.
  pub fn table<const N: usize>(
    &mut self,
    header: [&'static str; N],
    rows: impl IntoIterator<Item = [String; N]>,
  ) -> &mut Self {
    let rows: Vec<Vec<String>> = rows.into_iter().map(Vec::from).collect();
    if rows.is_empty() {
      return self.line("(no results)");
    }
    self.parts.push(Part::Grid(Grid { header: header.to_vec(), rows }));
    self
  }

  pub fn height(&self) -> u16 {
    self
      .parts
      .iter()
      .map(Part::height)
      .fold(0, u16::saturating_add)
  }

  pub fn width(&self) -> u16 { self.parts.iter().map(Part::width).max().unwrap_or(0) }

  fn render(&self, area: Rect, buf: &mut Buffer) {
    let areas = Layout::vertical(self.parts.iter().map(|p| Constraint::Length(p.height())))
      .split(area);
    for (part, area) in self.parts.iter().zip(areas.iter()) {
      match part {
        Part::Text(text) => Paragraph::new(text.clone()).render(*area, buf),
        Part::Grid(grid) => grid.render(*area, buf),
      }
    }
  }

  /// Render off-screen and return the rows as plain text.
  pub fn lines(&self) -> Vec<String> {
    let area = Rect::new(0, 0, self.width(), self.height());
    let mut buf = Buffer::empty(area);
    self.render(area, &mut buf);
    (area.top()..area.bottom())
      .map(|y| {
        let row: String = (area.left()..area.right())
          .map(|x| buf[(x, y)].symbol())
          .collect();
        row.trim_end().to_owned()
      })
      .collect()
  }

  pub fn print(&self) -> Result<()> {
    let height = self.height();
    let fits = io::stdout().is_terminal()
      && crossterm::terminal::size().is_ok_and(|(_, rows)| height < rows);

    if !fits {
      let mut out = io::stdout().lock();
      for line in self.lines() {
        writeln!(out, "{line}")?;
      }
      return Ok(());
    }

    let mut terminal = Terminal::with_options(
      CrosstermBackend::new(io::stdout()),
      TerminalOptions { viewport: Viewport::Inline(height) },
    )
    .context("creating terminal")?;
    terminal
      .draw(|frame| self.render(frame.area(), frame.buffer_mut()))
      .context("drawing output")?;
    drop(terminal);
    // Leave the prompt below the viewport.
    println!();
    Ok(())
  }
}
