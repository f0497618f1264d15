use crate::board::{Board, Card, InputMode};
use crate::config::Settings;
use crate::model::TaskColor;
use crate::position::Viewport;
use crate::store::{FileStore, StoreHandle, StoreLocation, TaskStore};
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, KeyEventKind,
    KeyboardEnhancementFlags, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{
    self as term, disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use log::info;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};

const STATUS_ROWS: u16 = 1;
const COMMENT_WIDTH: u16 = 36;
const HINTS: &str = "1-9 color  f front  d delete  m move  F2 edit  s scroll  q quit  ctrl+click toggle";

pub fn run(store: FileStore, location: StoreLocation, settings: &Settings) -> Result<()> {
    let tasks = store.list()?;
    let count = tasks.len();
    let sink = StoreHandle::spawn(store)?;
    let (width, height) = term::size()?;
    let board = Board::new(
        tasks,
        Viewport::new(width, height.saturating_sub(STATUS_ROWS)),
        (settings.card_width, settings.card_height),
        Box::new(sink),
    );
    info!(
        "event=tui_start tasks={} store={}",
        count,
        location.path.display()
    );

    let enhanced = term::supports_keyboard_enhancement().unwrap_or(false);
    let mut terminal = setup_terminal(enhanced)?;
    let mut app = App::new(board, location, settings);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal, enhanced)?;
    result
}

struct App {
    board: Board,
    location: StoreLocation,
    status: String,
    pointer: (u16, u16),
    last_press: Option<(u16, u16, Instant)>,
    double_click: Duration,
}

impl App {
    fn new(board: Board, location: StoreLocation, settings: &Settings) -> Self {
        let status = format!(
            "Loaded {} tasks from {}",
            board.len(),
            location.path.display()
        );
        App {
            board,
            location,
            status,
            pointer: (0, 0),
            last_press: None,
            double_click: Duration::from_millis(settings.double_click_ms),
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            if let Some(screen) = self.board.apply_pending_scroll() {
                self.status = format!("Showing {} screen", screen.label());
            }
            terminal.draw(|f| self.draw(f))?;
            self.board.observe_viewport();
            if event::poll(Duration::from_millis(200))? {
                match event::read()? {
                    Event::Key(key) => {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if self.handle_key(key) {
                            break;
                        }
                    }
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    Event::Resize(width, height) => self
                        .board
                        .resize(width, height.saturating_sub(STATUS_ROWS)),
                    _ => {}
                }
            }
        }
        info!("event=tui_exit tasks={}", self.board.len());
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let command = match self.board.mode() {
            InputMode::Board => self.board.command_for(&key),
            InputMode::Editing(_) => None,
        };
        let was_editing = self.board.editing().is_some();
        if self.board.handle_key(key) {
            return true;
        }
        if let Some(command) = command {
            self.status = format!(
                "{} ({} focused)",
                command.label(),
                self.board.selection().len()
            );
        } else if was_editing && self.board.editing().is_none() {
            self.status = "Edit cancelled".into();
        }
        false
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        self.pointer = (mouse.column, mouse.row);
        let (x, y) = (f64::from(mouse.column), f64::from(mouse.row));
        let on_canvas = y < self.board.viewport().height;
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) if on_canvas => {
                let now = Instant::now();
                let repeated = self
                    .last_press
                    .map(|(col, row, at)| {
                        col == mouse.column
                            && row == mouse.row
                            && now.duration_since(at) <= self.double_click
                    })
                    .unwrap_or(false);
                if repeated {
                    self.last_press = None;
                    let before = self.board.len();
                    self.board.double_click(x, y);
                    self.status = if self.board.len() > before {
                        "Created task".into()
                    } else if self.board.editing().is_some() {
                        "Editing (Tab apply, Esc cancel, click outside to finish)".into()
                    } else {
                        self.status.clone()
                    };
                } else {
                    self.last_press = Some((mouse.column, mouse.row, now));
                    let was_editing = self.board.editing().is_some();
                    self.board
                        .pointer_down(x, y, mouse.modifiers.contains(KeyModifiers::CONTROL));
                    if was_editing && self.board.editing().is_none() {
                        self.status = "Saved edit".into();
                    }
                }
            }
            MouseEventKind::Drag(MouseButton::Left) | MouseEventKind::Moved => {
                self.board.pointer_move(x, y)
            }
            MouseEventKind::Up(MouseButton::Left) => self.board.pointer_up(),
            _ => {}
        }
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(STATUS_ROWS)])
            .split(f.size());

        self.draw_canvas(f, layout[0]);
        self.draw_marquee(f, layout[0]);
        self.draw_comment(f, layout[0]);
        self.draw_status(f, layout[1]);
    }

    fn draw_canvas(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        for card in self.board.cards_by_z() {
            self.draw_card(f, area, card);
        }
    }

    fn draw_card(&self, f: &mut ratatui::Frame<'_>, area: Rect, card: &Card) {
        let (width, height) = self.board.card_size();
        let editing = self
            .board
            .editing()
            .filter(|session| session.task_id() == card.task.id);
        let height = editing.map(|s| s.height()).unwrap_or(height);
        let (x, y) = self.board.viewport().to_cells(card.task.position);
        let Some((rect, hidden_rows)) = clip(area, x, y, width, height) else {
            return;
        };

        let (bg, fg) = card_colors(card.task.color);
        let focused = self.board.is_focused(&card.task.id);
        let mut block = Block::default()
            .borders(Borders::ALL)
            .border_type(if focused {
                BorderType::Double
            } else {
                BorderType::Plain
            })
            .style(Style::default().bg(bg).fg(fg));
        if focused {
            block = block.border_style(Style::default().add_modifier(Modifier::BOLD));
        }
        let body: Vec<Line<'static>> = match editing {
            Some(session) => {
                block = block
                    .title(" editing ")
                    .border_style(Style::default().fg(Color::Cyan));
                session
                    .with_caret()
                    .split('\n')
                    .map(|line| Line::raw(line.to_string()))
                    .collect()
            }
            None => card.rendered.lines.clone(),
        };
        let paragraph = Paragraph::new(body)
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((hidden_rows, 0));
        f.render_widget(Clear, rect);
        f.render_widget(paragraph, rect);
    }

    fn draw_marquee(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let Some(marquee) = self.board.marquee() else {
            return;
        };
        let viewport = self.board.viewport();
        let (from, to) = marquee.bounds();
        let (x0, y0) = viewport.to_cells(from);
        let (x1, y1) = viewport.to_cells(to);
        let width = (x1 - x0).round().max(1.0) as u16;
        let height = (y1 - y0).round().max(1.0) as u16;
        if let Some((rect, _)) = clip(area, x0, y0, width.saturating_add(1), height.saturating_add(1))
        {
            let block = Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::DarkGray));
            f.render_widget(block, rect);
        }
    }

    fn draw_comment(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        if self.board.is_dragging() || self.board.marquee().is_some() {
            return;
        }
        let Some(comment) = self.board.hovered_comment() else {
            return;
        };
        let lines: Vec<Line> = comment.lines().map(Line::raw).collect();
        let width = COMMENT_WIDTH.min(area.width);
        let height = (u16::try_from(lines.len()).unwrap_or(u16::MAX))
            .saturating_add(2)
            .min(area.height);
        let x = self.pointer.0.saturating_add(1).min(area.right().saturating_sub(width));
        let y = self.pointer.1.saturating_add(1).min(area.bottom().saturating_sub(height));
        let rect = Rect::new(x, y, width, height);
        let popup = Paragraph::new(lines)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" comment ")
                    .border_style(Style::default().fg(Color::Yellow)),
            )
            .style(Style::default().bg(Color::Rgb(22, 24, 30)).fg(Color::Gray))
            .wrap(Wrap { trim: true });
        f.render_widget(Clear, rect);
        f.render_widget(popup, rect);
    }

    fn draw_status(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let mode = if self.board.editing().is_some() {
            "edit"
        } else if self.board.is_dragging() {
            "drag"
        } else if self.board.scroll_in_flight() {
            "scroll"
        } else {
            "board"
        };
        let focus = match self.board.selection().single() {
            Some(id) => match self.board.color(id) {
                Some(color) => format!("1 focused ({}) ", color),
                None => "1 focused ".to_string(),
            },
            None => format!("{} focused ", self.board.selection().len()),
        };
        let line = Line::from(vec![
            Span::styled(
                " pinboard ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{} ", self.location.scope.label()),
                Style::default().fg(Color::Green),
            ),
            Span::raw("• "),
            Span::styled(
                format!("{} screen ", self.board.viewport().screen.label()),
                Style::default().fg(Color::Magenta),
            ),
            Span::raw("• "),
            Span::raw(focus),
            Span::raw("• "),
            Span::styled(format!("{} ", mode), Style::default().fg(Color::Yellow)),
            Span::raw("• "),
            Span::styled(format!("{}  ", self.status), Style::default().fg(Color::Gray)),
            Span::styled(HINTS, Style::default().fg(Color::DarkGray)),
        ]);
        f.render_widget(
            Paragraph::new(line).style(Style::default().bg(Color::Rgb(22, 24, 30))),
            area,
        );
    }
}

/// `enhanced` asks the terminal to report modifier chords such as
/// Ctrl+Enter as distinct keys.
fn setup_terminal(enhanced: bool) -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    if enhanced {
        execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
        )?;
    }
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    enhanced: bool,
) -> Result<()> {
    if enhanced {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableMouseCapture,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Visible part of a `width` x `height` block whose top-left sits at cell
/// (`x`, `y`) relative to `area`, plus the number of rows cut off above.
fn clip(area: Rect, x: f64, y: f64, width: u16, height: u16) -> Option<(Rect, u16)> {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let left = x0.max(0);
    let top = y0.max(0);
    let right = x0.saturating_add(i32::from(width)).min(i32::from(area.width));
    let bottom = y0.saturating_add(i32::from(height)).min(i32::from(area.height));
    if right <= left || bottom <= top {
        return None;
    }
    let rect = Rect::new(
        area.x + left as u16,
        area.y + top as u16,
        (right - left) as u16,
        (bottom - top) as u16,
    );
    let hidden = u16::try_from(top.saturating_sub(y0)).unwrap_or(u16::MAX);
    Some((rect, hidden))
}

/// (background, foreground)
fn card_colors(color: TaskColor) -> (Color, Color) {
    let bg = match color {
        TaskColor::Red => Color::Rgb(255, 138, 128),
        TaskColor::Orange => Color::Rgb(255, 209, 128),
        TaskColor::Yellow => Color::Rgb(255, 255, 141),
        TaskColor::Green => Color::Rgb(204, 255, 144),
        TaskColor::Blue => Color::Rgb(128, 216, 255),
        TaskColor::Indigo => Color::Rgb(140, 158, 255),
        TaskColor::Purple => Color::Rgb(234, 128, 252),
        TaskColor::White => Color::Rgb(250, 250, 250),
        TaskColor::Black => Color::Rgb(48, 48, 48),
    };
    let fg = match color {
        TaskColor::Black => Color::White,
        _ => Color::Black,
    };
    (bg, fg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_keeps_fully_visible_blocks() {
        let area = Rect::new(0, 0, 80, 24);
        let (rect, hidden) = clip(area, 10.4, 5.0, 20, 6).unwrap();
        assert_eq!(rect, Rect::new(10, 5, 20, 6));
        assert_eq!(hidden, 0);
    }

    #[test]
    fn clip_trims_blocks_above_and_right() {
        let area = Rect::new(0, 0, 80, 24);
        let (rect, hidden) = clip(area, 70.0, -2.0, 20, 6).unwrap();
        assert_eq!(rect, Rect::new(70, 0, 10, 4));
        assert_eq!(hidden, 2);
    }

    #[test]
    fn clip_saturates_on_huge_coordinates() {
        let area = Rect::new(0, 0, 80, 24);
        assert!(clip(area, 0.0, 1e300, 20, 6).is_none());
        assert!(clip(area, 1e300, 0.0, 20, 6).is_none());
        assert!(clip(area, 0.0, -1e300, 20, 6).is_none());
        assert!(clip(area, f64::NAN, f64::NAN, 20, 6).is_some());
    }

    #[test]
    fn clip_drops_offscreen_blocks() {
        let area = Rect::new(0, 0, 80, 24);
        assert!(clip(area, 10.0, 30.0, 20, 6).is_none());
        assert!(clip(area, -25.0, 3.0, 20, 6).is_none());
    }
}
