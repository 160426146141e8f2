use crate::collision::Point;
use crate::config::{ConfigLocation, DragConfig};
use crate::drag::{DragController, DragEffect, DragSession, InputKind};
use crate::layout::{BoardLayout, ColumnLayout};
use crate::model::{Board, Task, TaskId};
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::{Alignment, Color, Modifier, Rect, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};
use ratatui::Terminal;
use std::io::{stdout, Stdout};
use std::time::{Duration, Instant};
use tracing::{debug, info};

const IDLE_POLL: Duration = Duration::from_millis(200);
const FRAME_POLL: Duration = Duration::from_millis(16);

pub fn run(board: Board, drag: &DragConfig, location: ConfigLocation) -> Result<()> {
    let mut terminal = setup_terminal()?;
    let mut app = App::new(board, drag, location);
    let result = app.event_loop(&mut terminal);
    teardown_terminal(&mut terminal)?;
    result
}

struct App {
    board: Board,
    location: ConfigLocation,
    drag: DragController,
    input: InputKind,
    layout: BoardLayout,
    board_area: Rect,
    selected_column: usize,
    status: String,
    mode: Mode,
    settle: Option<DropSettle>,
    settle_duration: Duration,
    dirty: bool,
}

enum Mode {
    Normal,
    Creating(TaskForm),
}

/// The overlay gliding from where it was released into the card's slot.
struct DropSettle {
    task_id: TaskId,
    from: Rect,
    started: Instant,
}

struct TaskForm {
    column: String,
    title: FieldValue,
    description: FieldValue,
    field: FormField,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum FormField {
    Title,
    Description,
}

#[derive(Clone)]
struct FieldValue {
    value: String,
    cursor: usize,
}

impl FieldValue {
    fn new() -> Self {
        FieldValue {
            value: String::new(),
            cursor: 0,
        }
    }

    fn move_left(&mut self) {
        self.cursor = self.value[..self.cursor]
            .char_indices()
            .next_back()
            .map(|(idx, _)| idx)
            .unwrap_or(0);
    }

    fn move_right(&mut self) {
        if let Some(ch) = self.value[self.cursor..].chars().next() {
            self.cursor += ch.len_utf8();
        }
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let end = self.cursor;
        self.move_left();
        self.value.drain(self.cursor..end);
    }

    fn insert_char(&mut self, ch: char) {
        self.value.insert(self.cursor, ch);
        self.cursor += ch.len_utf8();
    }

    fn with_caret(&self) -> String {
        let mut text = self.value.clone();
        text.insert_str(self.cursor, "▌");
        text
    }
}

impl TaskForm {
    fn new(column: impl Into<String>) -> Self {
        TaskForm {
            column: column.into(),
            title: FieldValue::new(),
            description: FieldValue::new(),
            field: FormField::Title,
        }
    }

    fn toggle_field(&mut self) {
        self.field = match self.field {
            FormField::Title => FormField::Description,
            FormField::Description => FormField::Title,
        };
    }

    fn active_field_mut(&mut self) -> &mut FieldValue {
        match self.field {
            FormField::Title => &mut self.title,
            FormField::Description => &mut self.description,
        }
    }

    /// Title and description, only when both are filled in.
    fn submission(&self) -> Option<(&str, &str)> {
        let title = self.title.value.trim();
        let description = self.description.value.trim();
        if title.is_empty() || description.is_empty() {
            None
        } else {
            Some((title, description))
        }
    }
}

impl App {
    fn new(board: Board, drag: &DragConfig, location: ConfigLocation) -> Self {
        let status = match &location.path {
            Some(path) => format!("Loaded {}", path.display()),
            None => "Using built-in board".to_string(),
        };
        App {
            board,
            location,
            drag: DragController::new(drag.sensors()),
            input: drag.input,
            layout: BoardLayout::default(),
            board_area: Rect::default(),
            selected_column: 0,
            status,
            mode: Mode::Normal,
            settle: None,
            settle_duration: drag.drop_animation(),
            dirty: true,
        }
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            if self.dirty || self.settle.is_some() {
                terminal.draw(|f| self.draw(f))?;
                self.dirty = false;
            }
            let busy = !matches!(self.drag.session(), DragSession::Idle);
            let timeout = if self.settle.is_some() || busy {
                FRAME_POLL
            } else {
                IDLE_POLL
            };
            if event::poll(timeout)? && self.handle_event(event::read()?, Instant::now()) {
                break;
            }
            self.tick(Instant::now());
        }
        Ok(())
    }

    /// Returns true when the app should quit.
    fn handle_event(&mut self, event: Event, now: Instant) -> bool {
        match event {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key, now),
            Event::Mouse(mouse) => {
                self.handle_mouse(mouse, now);
                false
            }
            Event::Resize(..) => {
                self.dirty = true;
                false
            }
            _ => false,
        }
    }

    fn handle_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        match self.mode {
            Mode::Normal => self.handle_normal_key(key, now),
            Mode::Creating(_) => {
                self.handle_form_key(key);
                false
            }
        }
    }

    fn handle_normal_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return true,
            KeyCode::Esc => {
                let from = self.drag.active().map(|a| a.translated_rect());
                let effect = self.drag.cancel();
                self.apply(effect, from, now);
            }
            KeyCode::Left | KeyCode::Char('h') => self.prev_column(),
            KeyCode::Right | KeyCode::Char('l') => self.next_column(),
            KeyCode::Char('n') => {
                if let Some(name) = self
                    .board
                    .columns()
                    .get(self.selected_column)
                    .map(|c| c.name.clone())
                {
                    self.open_form(name, now);
                }
            }
            _ => {}
        }
        false
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let mut mode = std::mem::replace(&mut self.mode, Mode::Normal);
        let close_form = match &mut mode {
            Mode::Creating(form) => self.process_form_key(form, key),
            Mode::Normal => false,
        };
        self.mode = if close_form { Mode::Normal } else { mode };
        self.dirty = true;
    }

    fn process_form_key(&mut self, form: &mut TaskForm, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Esc => {
                self.status = "Canceled".into();
                return true;
            }
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => form.toggle_field(),
            KeyCode::Left => form.active_field_mut().move_left(),
            KeyCode::Right => form.active_field_mut().move_right(),
            KeyCode::Backspace => form.active_field_mut().backspace(),
            KeyCode::Enter => return self.submit_form(form),
            KeyCode::Char(c) => {
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                {
                    form.active_field_mut().insert_char(c);
                }
            }
            _ => {}
        }
        false
    }

    /// Incomplete forms stay open without complaint.
    fn submit_form(&mut self, form: &TaskForm) -> bool {
        let Some((title, description)) = form.submission() else {
            return false;
        };
        match self.board.add_task(&form.column, title, description) {
            Ok(id) => {
                info!(task_id = %id, container = %form.column, "task created");
                self.status = format!("Added \"{}\" to {}", title, form.column);
                self.relayout();
                true
            }
            Err(err) => {
                debug!(%err, "task creation failed");
                false
            }
        }
    }

    /// The form swallows mouse input, so any drag in flight is cancelled
    /// first.
    fn open_form(&mut self, column: String, now: Instant) {
        let from = self.drag.active().map(|a| a.translated_rect());
        let effect = self.drag.cancel();
        self.apply(effect, from, now);
        self.status = format!("New task in {} (Tab switch field, Enter add, Esc close)", column);
        self.mode = Mode::Creating(TaskForm::new(column));
        self.dirty = true;
    }

    fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        if !matches!(self.mode, Mode::Normal) {
            return;
        }
        let point = Point::new(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(name) = self.layout.button_at(point).map(str::to_owned) {
                    self.open_form(name, now);
                } else if let Some(card) = self.layout.card_at(point).cloned() {
                    let effect = self.drag.press(self.input, card.task_id, point, card.rect, now);
                    self.apply(effect, None, now);
                } else if let Some(idx) = self.layout.column_at(point) {
                    self.selected_column = idx;
                    self.dirty = true;
                }
            }
            MouseEventKind::Drag(MouseButton::Left) => {
                let droppables = self.layout.droppables();
                let effect = self
                    .drag
                    .pointer_move(point, now, &mut self.board, &droppables);
                self.apply(effect, None, now);
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let from = self.drag.active().map(|active| {
                    let mut released = active.clone();
                    released.pointer = point;
                    released.translated_rect()
                });
                let droppables = self.layout.droppables();
                let effect = self.drag.release(point, &mut self.board, &droppables);
                self.apply(effect, from, now);
            }
            _ => {}
        }
    }

    fn tick(&mut self, now: Instant) {
        let droppables = self.layout.droppables();
        let effect = self.drag.tick(now, &mut self.board, &droppables);
        self.apply(effect, None, now);
        if let Some(settle) = &self.settle {
            if now.saturating_duration_since(settle.started) >= self.settle_duration {
                self.settle = None;
                self.dirty = true;
            }
        }
    }

    /// Reacts to a controller outcome. `released_at` is the overlay rect at
    /// the moment the session ended, used to start the settle animation.
    fn apply(&mut self, effect: DragEffect, released_at: Option<Rect>, now: Instant) {
        if effect.mutated_board() {
            self.relayout();
        }
        match &effect {
            DragEffect::Started { task_id } => {
                self.settle = None;
                self.status = format!("Dragging \"{}\"", self.title_of(task_id));
            }
            DragEffect::MovedAcross { task_id, to, .. } => {
                self.settle = None;
                self.status = format!("\"{}\" → {}", self.title_of(task_id), to);
            }
            DragEffect::Reordered {
                task_id, container, ..
            } => {
                self.status = format!("Reordered \"{}\" in {}", self.title_of(task_id), container);
            }
            DragEffect::Dropped { task_id, over } => {
                let title = self.title_of(task_id);
                self.status = match (over, self.board.find_container(task_id)) {
                    (Some(_), Some(container)) => format!("Dropped \"{}\" in {}", title, container),
                    _ => format!("Dropped \"{}\" outside the board", title),
                };
            }
            DragEffect::Cancelled { task_id } => {
                self.status = format!("Drag of \"{}\" cancelled", self.title_of(task_id));
            }
            DragEffect::Clicked { task_id } => {
                if let Some(idx) = self
                    .board
                    .find_container(task_id)
                    .and_then(|name| self.board.columns().iter().position(|c| c.name == name))
                {
                    self.selected_column = idx;
                }
                self.status = self
                    .board
                    .find_task(task_id)
                    .map(|t| format!("{}: {}", t.title, t.description))
                    .unwrap_or_default();
            }
            DragEffect::None
            | DragEffect::Pending { .. }
            | DragEffect::Aborted { .. }
            | DragEffect::Hovering { .. } => {}
        }
        if let (
            DragEffect::Reordered { task_id, .. }
            | DragEffect::MovedAcross { task_id, .. }
            | DragEffect::Dropped { task_id, .. }
            | DragEffect::Cancelled { task_id },
            Some(from),
        ) = (&effect, released_at)
        {
            if !self.settle_duration.is_zero() {
                self.settle = Some(DropSettle {
                    task_id: task_id.clone(),
                    from,
                    started: now,
                });
            }
        }
        if effect.needs_redraw() {
            self.dirty = true;
        }
    }

    fn relayout(&mut self) {
        self.layout = BoardLayout::compute(self.board_area, &self.board);
        self.dirty = true;
    }

    fn set_board_area(&mut self, area: Rect) {
        self.board_area = area;
        self.layout = BoardLayout::compute(area, &self.board);
    }

    fn draw(&mut self, f: &mut ratatui::Frame<'_>) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(6),
                Constraint::Length(3),
            ])
            .split(f.size());

        self.set_board_area(rows[1]);
        self.draw_header(f, rows[0]);
        self.draw_board(f);
        self.draw_overlay(f, Instant::now());
        self.draw_footer(f, rows[2]);

        if let Mode::Creating(form) = &self.mode {
            self.draw_form(f, form);
        }
    }

    fn draw_header(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let source = match &self.location.path {
            Some(path) => format!("{} config {}", self.location.scope.label(), path.display()),
            None => format!("{} config", self.location.scope.label()),
        };
        let title = Line::from(vec![
            Span::styled(
                "dragboard ",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  •  "),
            Span::styled(source, Style::default().fg(Color::DarkGray)),
            Span::raw("  •  "),
            Span::styled(
                format!("{} tasks", self.board.task_count()),
                Style::default().fg(Color::Green),
            ),
        ]);
        let block = Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray));
        let paragraph = Paragraph::new(title)
            .alignment(Alignment::Center)
            .block(block);
        f.render_widget(paragraph, area);
    }

    fn draw_board(&self, f: &mut ratatui::Frame<'_>) {
        if self.layout.columns.is_empty() {
            let msg = Paragraph::new("No columns defined")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("dragboard"));
            f.render_widget(Clear, self.board_area);
            f.render_widget(msg, self.board_area);
            return;
        }
        for (idx, column) in self.layout.columns.iter().enumerate() {
            self.draw_column(f, idx, column);
        }
    }

    fn draw_column(&self, f: &mut ratatui::Frame<'_>, idx: usize, column: &ColumnLayout) {
        let accent = color_for_index(idx);
        let count = self.board.column(&column.name).map(|c| c.len()).unwrap_or(0);
        let block = Block::default()
            .title(Span::styled(
                format!("{} ({})", column.name, count),
                Style::default()
                    .fg(accent)
                    .add_modifier(if idx == self.selected_column {
                        Modifier::BOLD | Modifier::UNDERLINED
                    } else {
                        Modifier::BOLD
                    }),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent))
            .style(Style::default().bg(Color::Rgb(16, 18, 24)));
        f.render_widget(block, column.area);

        for card in &column.cards {
            if self.is_lifted(&card.task_id) {
                f.render_widget(placeholder(), card.rect);
            } else if let Some(task) = self.board.find_task(&card.task_id) {
                f.render_widget(card_widget(task, card.rect.width, card_style()), card.rect);
            }
        }

        let button = Paragraph::new(Line::from(Span::styled(
            "+ Task",
            Style::default().fg(accent).add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center);
        f.render_widget(button, column.add_button);
    }

    fn draw_overlay(&self, f: &mut ratatui::Frame<'_>, now: Instant) {
        let (task_id, rect) = if let Some(active) = self.drag.active() {
            (active.task_id.as_str(), active.translated_rect())
        } else if let Some(settle) = &self.settle {
            let progress = if self.settle_duration.is_zero() {
                1.0
            } else {
                (now.saturating_duration_since(settle.started).as_secs_f64()
                    / self.settle_duration.as_secs_f64())
                .min(1.0)
            };
            let to = self.layout.card_rect(&settle.task_id).unwrap_or(settle.from);
            (settle.task_id.as_str(), lerp_rect(settle.from, to, progress))
        } else {
            return;
        };
        let Some(task) = self.board.find_task(task_id) else {
            return;
        };
        let area = rect.intersection(f.size());
        if area.width == 0 || area.height == 0 {
            return;
        }
        f.render_widget(Clear, area);
        f.render_widget(card_widget(task, area.width, overlay_style()), area);
    }

    fn draw_footer(&self, f: &mut ratatui::Frame<'_>, area: Rect) {
        let help = Line::from(vec![
            Span::styled("drag", Style::default().fg(Color::LightCyan)),
            Span::raw(" move card  "),
            Span::styled("← →", Style::default().fg(Color::LightCyan)),
            Span::raw(" column  "),
            Span::styled("n", Style::default().fg(Color::LightCyan)),
            Span::raw(" new task  "),
            Span::styled("Esc", Style::default().fg(Color::LightCyan)),
            Span::raw(" cancel drag  "),
            Span::styled("q", Style::default().fg(Color::LightCyan)),
            Span::raw(" quit"),
        ]);
        let footer = Paragraph::new(vec![help, Line::from(self.status.clone())])
            .alignment(Alignment::Center)
            .block(
                Block::default()
                    .borders(Borders::TOP)
                    .border_style(Style::default().fg(Color::DarkGray)),
            );
        f.render_widget(footer, area);
    }

    fn draw_form(&self, f: &mut ratatui::Frame<'_>, form: &TaskForm) {
        let area = centered_rect(60, 40, f.size());
        let mut lines = Vec::new();
        lines.push(field_line(
            "Title",
            &form.title,
            form.field == FormField::Title,
        ));
        lines.push(Line::from(""));
        lines.push(field_line(
            "Description",
            &form.description,
            form.field == FormField::Description,
        ));
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "Enter to add • Tab to switch field • Esc to close",
            Style::default().fg(Color::Gray),
        )));
        let dialog = Paragraph::new(lines)
            .block(
                Block::default()
                    .title(Span::styled(
                        format!("New Task - {}", form.column),
                        Style::default()
                            .fg(Color::Cyan)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Cyan)),
            )
            .wrap(Wrap { trim: true });

        f.render_widget(Clear, area);
        f.render_widget(dialog, area);
    }

    fn prev_column(&mut self) {
        if self.selected_column > 0 {
            self.selected_column -= 1;
            self.dirty = true;
        }
    }

    fn next_column(&mut self) {
        if self.selected_column + 1 < self.board.columns().len() {
            self.selected_column += 1;
            self.dirty = true;
        }
    }

    /// True while the card's slot should show a placeholder instead of content.
    fn is_lifted(&self, task_id: &str) -> bool {
        self.drag.active_id() == Some(task_id)
            || self
                .settle
                .as_ref()
                .is_some_and(|settle| settle.task_id == task_id)
    }

    fn title_of(&self, task_id: &str) -> String {
        self.board
            .find_task(task_id)
            .map(|t| t.title.clone())
            .unwrap_or_else(|| task_id.to_string())
    }
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn lerp_rect(from: Rect, to: Rect, t: f64) -> Rect {
    let lerp = |a: u16, b: u16| -> u16 {
        let value = f64::from(a) + (f64::from(b) - f64::from(a)) * t;
        value.round().clamp(0.0, f64::from(u16::MAX)) as u16
    };
    Rect {
        x: lerp(from.x, to.x),
        y: lerp(from.y, to.y),
        width: lerp(from.width, to.width),
        height: lerp(from.height, to.height),
    }
}

fn color_for_index(idx: usize) -> Color {
    let palette = [
        Color::Cyan,
        Color::LightGreen,
        Color::LightMagenta,
        Color::LightBlue,
        Color::LightYellow,
        Color::LightRed,
    ];
    palette[idx % palette.len()]
}

fn card_style() -> Style {
    Style::default().bg(Color::Rgb(39, 39, 42)).fg(Color::White)
}

/// Terminals have no opacity; a dimmed slate card reads as the floating copy.
fn overlay_style() -> Style {
    Style::default()
        .bg(Color::Rgb(15, 23, 42))
        .fg(Color::Gray)
        .add_modifier(Modifier::DIM)
}

fn card_widget(task: &Task, width: u16, style: Style) -> Paragraph<'static> {
    let inner = width.saturating_sub(2) as usize;
    Paragraph::new(vec![
        Line::from(Span::styled(
            truncate_text(&task.title, inner),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            truncate_text(&task.description, inner),
            Style::default().fg(Color::Gray),
        )),
    ])
    .style(style)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    )
}

fn placeholder() -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Gray))
}

fn truncate_text(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out = text.chars().take(max.saturating_sub(3)).collect::<String>();
    out.push_str("...");
    out.chars().take(max).collect()
}

fn field_line(label: &str, field: &FieldValue, active: bool) -> Line<'static> {
    let label_style = Style::default()
        .fg(Color::Gray)
        .add_modifier(Modifier::BOLD | Modifier::DIM);
    let value_style = Style::default().fg(if active { Color::Cyan } else { Color::White });
    let text = if active {
        field.with_caret()
    } else {
        field.value.clone()
    };
    Line::from(vec![
        Span::styled(format!("{}: ", label), label_style),
        Span::styled(text, value_style),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigScope;
    use crate::model::{assert_unique, ids, test_board};
    use ratatui::backend::TestBackend;
    use rstest::{fixture, rstest};

    const WIDTH: u16 = 90;
    const HEIGHT: u16 = 20;

    #[fixture]
    fn app() -> App {
        let board = test_board(&[("To Do", &["t1", "t2"]), ("In Progress", &[]), ("Done", &[])]);
        App::new(
            board,
            &DragConfig::default(),
            ConfigLocation {
                path: None,
                scope: ConfigScope::Builtin,
            },
        )
    }

    fn render(app: &mut App) -> Terminal<TestBackend> {
        let mut terminal = Terminal::new(TestBackend::new(WIDTH, HEIGHT)).expect("test terminal");
        terminal.draw(|f| app.draw(f)).expect("draw");
        terminal
    }

    fn row_text(terminal: &Terminal<TestBackend>, y: u16) -> String {
        let buffer = terminal.backend().buffer();
        (0..buffer.area.width)
            .map(|x| buffer.get(x, y).symbol())
            .collect()
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        (0..HEIGHT)
            .map(|y| row_text(terminal, y))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn mouse(app: &mut App, kind: MouseEventKind, x: u16, y: u16, now: Instant) {
        app.handle_event(
            Event::Mouse(MouseEvent {
                kind,
                column: x,
                row: y,
                modifiers: KeyModifiers::NONE,
            }),
            now,
        );
    }

    fn key(app: &mut App, code: KeyCode) -> bool {
        app.handle_event(
            Event::Key(KeyEvent::new(code, KeyModifiers::NONE)),
            Instant::now(),
        )
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            key(app, KeyCode::Char(ch));
        }
    }

    #[rstest]
    fn columns_render_names_counts_and_cards(mut app: App) {
        let terminal = render(&mut app);
        let screen = screen_text(&terminal);
        assert!(screen.contains("To Do (2)"));
        assert!(screen.contains("In Progress (0)"));
        assert!(screen.contains("Done (0)"));
        assert!(screen.contains("t1 description"));
        assert_eq!(screen.matches("+ Task").count(), 3);
        // First card occupies rows 4..8 of the first column.
        assert!(row_text(&terminal, 5).contains("t1"));
    }

    #[rstest]
    fn dragging_shows_placeholder_and_overlay(mut app: App) {
        render(&mut app);
        let now = Instant::now();
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), 5, 5, now);
        mouse(&mut app, MouseEventKind::Drag(MouseButton::Left), 5, 11, now);
        assert_eq!(app.drag.active_id(), Some("t1"));

        let terminal = render(&mut app);
        assert!(!row_text(&terminal, 5).contains("t1"));
        assert!(row_text(&terminal, 11).contains("t1"));
        assert_eq!(screen_text(&terminal).matches("t1 description").count(), 1);
    }

    #[rstest]
    fn dragging_into_empty_column_moves_live_and_drops(mut app: App) {
        render(&mut app);
        let now = Instant::now();
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), 5, 5, now);
        mouse(&mut app, MouseEventKind::Drag(MouseButton::Left), 65, 10, now);
        mouse(&mut app, MouseEventKind::Drag(MouseButton::Left), 66, 10, now);
        assert_eq!(ids(&app.board, "Done"), ["t1"]);
        assert_eq!(app.layout.card_rect("t1"), Some(Rect::new(61, 4, 28, 4)));

        mouse(&mut app, MouseEventKind::Up(MouseButton::Left), 66, 10, now);
        assert_eq!(app.drag.session(), &DragSession::Idle);
        assert_eq!(ids(&app.board, "To Do"), ["t2"]);
        assert_eq!(ids(&app.board, "Done"), ["t1"]);
        assert_unique(&app.board);

        assert!(app.settle.is_some());
        app.tick(now + Duration::from_secs(1));
        assert!(app.settle.is_none());
        let terminal = render(&mut app);
        assert!(screen_text(&terminal).contains("Done (1)"));
    }

    #[rstest]
    fn single_drag_event_into_column_then_release_lands_there(mut app: App) {
        render(&mut app);
        let now = Instant::now();
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), 5, 5, now);
        mouse(&mut app, MouseEventKind::Drag(MouseButton::Left), 65, 10, now);
        mouse(&mut app, MouseEventKind::Up(MouseButton::Left), 65, 10, now);
        assert_eq!(app.drag.session(), &DragSession::Idle);
        assert_eq!(ids(&app.board, "To Do"), ["t2"]);
        assert_eq!(ids(&app.board, "Done"), ["t1"]);
        assert_eq!(app.status, "Dropped \"t1\" in Done");
    }

    #[rstest]
    fn release_in_unhovered_column_moves_task_there(mut app: App) {
        render(&mut app);
        let now = Instant::now();
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), 5, 5, now);
        mouse(&mut app, MouseEventKind::Drag(MouseButton::Left), 5, 11, now);
        assert_eq!(ids(&app.board, "To Do"), ["t1", "t2"]);
        mouse(&mut app, MouseEventKind::Up(MouseButton::Left), 40, 10, now);
        assert_eq!(app.drag.session(), &DragSession::Idle);
        assert_eq!(ids(&app.board, "In Progress"), ["t1"]);
        assert_eq!(app.layout.card_rect("t1"), Some(Rect::new(31, 4, 28, 4)));
        assert!(app.settle.is_some());
    }

    #[rstest]
    fn opening_form_mid_drag_ends_the_drag(mut app: App) {
        render(&mut app);
        let now = Instant::now();
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), 5, 5, now);
        mouse(&mut app, MouseEventKind::Drag(MouseButton::Left), 5, 12, now);
        assert!(app.drag.is_dragging());

        key(&mut app, KeyCode::Char('n'));
        assert!(matches!(app.mode, Mode::Creating(_)));
        assert_eq!(app.drag.session(), &DragSession::Idle);
        mouse(&mut app, MouseEventKind::Up(MouseButton::Left), 5, 12, now);
        key(&mut app, KeyCode::Esc);
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.drag.session(), &DragSession::Idle);

        app.tick(now + Duration::from_secs(1));
        let terminal = render(&mut app);
        assert!(row_text(&terminal, 5).contains("t1"));
        assert_eq!(screen_text(&terminal).matches("t1 description").count(), 1);
    }

    #[rstest]
    fn dragging_onto_sibling_reorders_on_release(mut app: App) {
        render(&mut app);
        let now = Instant::now();
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), 5, 5, now);
        mouse(&mut app, MouseEventKind::Drag(MouseButton::Left), 5, 11, now);
        mouse(&mut app, MouseEventKind::Drag(MouseButton::Left), 5, 11, now);
        assert_eq!(ids(&app.board, "To Do"), ["t1", "t2"]);
        mouse(&mut app, MouseEventKind::Up(MouseButton::Left), 5, 11, now);
        assert_eq!(ids(&app.board, "To Do"), ["t2", "t1"]);
    }

    #[rstest]
    fn escape_cancels_but_keeps_live_move(mut app: App) {
        render(&mut app);
        let now = Instant::now();
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), 5, 5, now);
        mouse(&mut app, MouseEventKind::Drag(MouseButton::Left), 40, 10, now);
        mouse(&mut app, MouseEventKind::Drag(MouseButton::Left), 41, 10, now);
        assert_eq!(ids(&app.board, "In Progress"), ["t1"]);
        key(&mut app, KeyCode::Esc);
        assert!(!app.drag.is_dragging());
        assert_eq!(ids(&app.board, "In Progress"), ["t1"]);
    }

    #[rstest]
    fn click_without_moving_selects_card_column(mut app: App) {
        render(&mut app);
        let now = Instant::now();
        app.selected_column = 2;
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), 5, 10, now);
        mouse(&mut app, MouseEventKind::Up(MouseButton::Left), 5, 10, now);
        assert_eq!(app.selected_column, 0);
        assert_eq!(app.status, "t2: t2 description");
        assert_eq!(ids(&app.board, "To Do"), ["t1", "t2"]);
    }

    #[rstest]
    fn add_button_opens_form_and_creates_task(mut app: App) {
        render(&mut app);
        // In Progress button sits on the last inner row of the column.
        mouse(&mut app, MouseEventKind::Down(MouseButton::Left), 40, 15, Instant::now());
        assert!(matches!(&app.mode, Mode::Creating(form) if form.column == "In Progress"));

        let terminal = render(&mut app);
        assert!(screen_text(&terminal).contains("New Task - In Progress"));

        type_text(&mut app, "X");
        key(&mut app, KeyCode::Tab);
        type_text(&mut app, "Y");
        key(&mut app, KeyCode::Enter);

        assert!(matches!(app.mode, Mode::Normal));
        let column = app.board.column("In Progress").expect("column");
        assert_eq!(column.len(), 1);
        assert_eq!(column.tasks()[0].title, "X");
        assert_eq!(column.tasks()[0].description, "Y");
        assert_eq!(app.layout.columns[1].cards.len(), 1);
    }

    #[rstest]
    fn incomplete_form_stays_open(mut app: App) {
        key(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "X");
        key(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Creating(_)));
        assert_eq!(app.board.task_count(), 2);

        key(&mut app, KeyCode::Tab);
        type_text(&mut app, "   ");
        key(&mut app, KeyCode::Enter);
        assert!(matches!(app.mode, Mode::Creating(_)));
        assert_eq!(app.board.task_count(), 2);
    }

    #[rstest]
    fn closing_form_resets_fields(mut app: App) {
        key(&mut app, KeyCode::Right);
        key(&mut app, KeyCode::Char('n'));
        type_text(&mut app, "draft");
        key(&mut app, KeyCode::Esc);
        assert!(matches!(app.mode, Mode::Normal));

        key(&mut app, KeyCode::Char('n'));
        match &app.mode {
            Mode::Creating(form) => {
                assert_eq!(form.column, "In Progress");
                assert!(form.title.value.is_empty());
            }
            Mode::Normal => panic!("form should be open"),
        }
    }

    #[rstest]
    fn quit_key_ends_loop(mut app: App) {
        assert!(key(&mut app, KeyCode::Char('q')));
    }

    #[rstest]
    fn field_editing_handles_multibyte_chars() {
        let mut field = FieldValue::new();
        for ch in "añb".chars() {
            field.insert_char(ch);
        }
        field.move_left();
        field.move_left();
        field.backspace();
        assert_eq!(field.value, "ñb");
        assert_eq!(field.cursor, 0);
        field.move_right();
        assert_eq!(field.with_caret(), "ñ▌b");
    }

    #[rstest]
    #[case(0.0, Rect::new(10, 10, 20, 4))]
    #[case(0.5, Rect::new(5, 7, 20, 4))]
    #[case(1.0, Rect::new(0, 4, 20, 4))]
    fn settle_interpolates_between_rects(#[case] t: f64, #[case] expected: Rect) {
        let from = Rect::new(10, 10, 20, 4);
        let to = Rect::new(0, 4, 20, 4);
        assert_eq!(lerp_rect(from, to, t), expected);
    }

    #[rstest]
    fn truncate_keeps_short_text_and_marks_long_text() {
        assert_eq!(truncate_text("short", 10), "short");
        assert_eq!(truncate_text("a long title here", 10), "a long ...");
        assert_eq!(truncate_text("abc", 0), "");
    }
}
