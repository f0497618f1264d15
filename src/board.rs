//! The live board: owns every card and routes pointer and key input to the
//! selection, drag, z-order and edit components.
//!
//! All mutation happens on the caller's thread. Store writes are handed to a
//! [`StoreSink`] and never awaited; in-memory state stays authoritative if a
//! write later fails.

use crate::drag::DragController;
use crate::edit::{EditOutcome, EditSession};
use crate::model::{next_zindex, unique_id, NewTask, Position, Task, TaskColor, TaskId, TaskPatch};
use crate::position::{self, Screen, Viewport};
use crate::render::{render_markdown, Rendered};
use crate::scroll::Scroller;
use crate::selection::{Press, SelectionController};
use crate::store::{StoreOp, StoreSink};
use crate::zorder::{self, Stacked};
use crossterm::event::{KeyCode, KeyEvent};
use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CardState {
    #[default]
    Idle,
    Dragging,
    Editing,
}

#[derive(Debug, Clone)]
pub struct Card {
    pub task: Task,
    pub state: CardState,
    pub rendered: Rendered,
}

impl Card {
    fn new(task: Task) -> Self {
        let rendered = render_markdown(&task.text);
        Card {
            task,
            state: CardState::Idle,
            rendered,
        }
    }
}

impl Stacked for Card {
    fn stack_id(&self) -> &str {
        &self.task.id
    }

    fn zindex(&self) -> u32 {
        self.task.zindex
    }

    fn set_zindex(&mut self, zindex: u32) {
        self.task.zindex = zindex;
    }
}

/// Where key input goes. Board shortcuts are only consulted in `Board` mode.
#[derive(Debug)]
pub enum InputMode {
    Board,
    Editing(EditSession),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Color(TaskColor),
    BringToFront,
    Delete,
    MoveScreen,
    Edit,
    ToggleScroll,
    Quit,
}

impl Command {
    pub fn label(&self) -> String {
        match self {
            Command::Color(color) => format!("color {}", color),
            Command::BringToFront => "bring to front".into(),
            Command::Delete => "delete".into(),
            Command::MoveScreen => "move to other screen".into(),
            Command::Edit => "edit".into(),
            Command::ToggleScroll => "scroll".into(),
            Command::Quit => "quit".into(),
        }
    }
}

/// Rubber-band rectangle in canvas percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marquee {
    pub anchor: Position,
    pub current: Position,
}

impl Marquee {
    /// (top-left, bottom-right)
    pub fn bounds(&self) -> (Position, Position) {
        (
            Position::new(
                self.anchor.top.min(self.current.top),
                self.anchor.left.min(self.current.left),
            ),
            Position::new(
                self.anchor.top.max(self.current.top),
                self.anchor.left.max(self.current.left),
            ),
        )
    }
}

pub fn default_bindings() -> Vec<(KeyCode, Command)> {
    let mut bindings: Vec<(KeyCode, Command)> = TaskColor::ALL
        .iter()
        .zip('1'..='9')
        .map(|(color, key)| (KeyCode::Char(key), Command::Color(*color)))
        .collect();
    bindings.extend([
        (KeyCode::Char('f'), Command::BringToFront),
        (KeyCode::Char('d'), Command::Delete),
        (KeyCode::Delete, Command::Delete),
        (KeyCode::Char('m'), Command::MoveScreen),
        (KeyCode::F(2), Command::Edit),
        (KeyCode::Char('s'), Command::ToggleScroll),
        (KeyCode::Char('q'), Command::Quit),
    ]);
    bindings
}

pub struct Board {
    cards: BTreeMap<TaskId, Card>,
    selection: SelectionController,
    drag: DragController,
    scroller: Scroller,
    viewport: Viewport,
    card_size: (u16, u16),
    mode: InputMode,
    marquee: Option<Marquee>,
    hovered: Option<TaskId>,
    bindings: Vec<(KeyCode, Command)>,
    sink: Box<dyn StoreSink>,
}

impl Board {
    pub fn new(
        tasks: Vec<Task>,
        viewport: Viewport,
        card_size: (u16, u16),
        sink: Box<dyn StoreSink>,
    ) -> Self {
        let cards = tasks
            .into_iter()
            .map(|mut task| {
                if !position::in_bounds(task.position) {
                    let settled = position::clamp(task.position);
                    warn!(
                        "event=task_load status=clamped id={} top={} left={}",
                        task.id, task.position.top, task.position.left
                    );
                    task.position = settled;
                }
                (task.id.clone(), Card::new(task))
            })
            .collect();
        Board {
            cards,
            selection: SelectionController::default(),
            drag: DragController::default(),
            scroller: Scroller::default(),
            viewport,
            card_size,
            mode: InputMode::Board,
            marquee: None,
            hovered: None,
            bindings: default_bindings(),
            sink,
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn task(&self, id: &str) -> Option<&Task> {
        self.cards.get(id).map(|c| &c.task)
    }

    #[cfg(test)]
    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.get(id)
    }

    /// Cards in paint order, back to front.
    pub fn cards_by_z(&self) -> Vec<&Card> {
        let mut cards: Vec<&Card> = self.cards.values().collect();
        cards.sort_by(|a, b| {
            a.task
                .zindex
                .cmp(&b.task.zindex)
                .then_with(|| a.task.id.cmp(&b.task.id))
        });
        cards
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn is_focused(&self, id: &str) -> bool {
        self.selection.is_focused(id)
    }

    pub fn focused_ids(&self) -> Vec<TaskId> {
        self.selection.focused_ids()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn card_size(&self) -> (u16, u16) {
        self.card_size
    }

    pub fn mode(&self) -> &InputMode {
        &self.mode
    }

    pub fn editing(&self) -> Option<&EditSession> {
        match &self.mode {
            InputMode::Editing(session) => Some(session),
            InputMode::Board => None,
        }
    }

    pub fn marquee(&self) -> Option<Marquee> {
        self.marquee
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_dragging()
    }

    pub fn hovered_comment(&self) -> Option<&str> {
        let id = self.hovered.as_ref()?;
        self.cards.get(id)?.rendered.comment.as_deref()
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.viewport.resize(width, height);
    }

    /// Card size as (top, left) percentages of the current viewport.
    pub fn card_extent(&self) -> Position {
        self.viewport
            .extent_percent(self.card_size.0, self.card_size.1)
    }

    /// Topmost card under viewport cell (`x`, `y`).
    pub fn hit_test(&self, x: f64, y: f64) -> Option<TaskId> {
        let point = self.viewport.to_canvas_percent(x, y);
        let extent = self.card_extent();
        // The card being edited grows to the edit field's height.
        let editing = self
            .editing()
            .map(|s| (s.task_id(), self.viewport.extent_percent(self.card_size.0, s.height()).top));
        self.cards
            .values()
            .filter(|card| {
                let p = card.task.position;
                let height = match editing {
                    Some((id, height)) if id == card.task.id => height,
                    _ => extent.top,
                };
                point.top >= p.top
                    && point.top < p.top + height
                    && point.left >= p.left
                    && point.left < p.left + extent.left
            })
            .max_by(|a, b| {
                a.task
                    .zindex
                    .cmp(&b.task.zindex)
                    .then_with(|| a.task.id.cmp(&b.task.id))
            })
            .map(|card| card.task.id.clone())
    }

    fn covered_by(&self, marquee: &Marquee) -> BTreeSet<TaskId> {
        let (from, to) = marquee.bounds();
        let extent = self.card_extent();
        self.cards
            .values()
            .filter(|card| {
                let p = card.task.position;
                p.top <= to.top
                    && p.top + extent.top >= from.top
                    && p.left <= to.left
                    && p.left + extent.left >= from.left
            })
            .map(|card| card.task.id.clone())
            .collect()
    }

    // --- creation / deletion ---

    /// Id and zindex are derived from the in-memory collection before the
    /// store sees the record, so back-to-back creations cannot collide.
    pub fn create_task(&mut self, mut fields: NewTask) -> TaskId {
        if !position::in_bounds(fields.position) {
            fields.position = position::clamp(fields.position);
        }
        let id = unique_id(|candidate| self.cards.contains_key(candidate));
        let zindex = next_zindex(self.cards.values().map(|c| &c.task));
        let task = Task::from_new(id.clone(), fields, zindex);
        self.sink.submit(StoreOp::Insert(task.clone()));
        self.cards.insert(id.clone(), Card::new(task));
        info!("event=task_create id={} zindex={}", id, zindex);
        id
    }

    pub fn create_task_at(&mut self, x: f64, y: f64) -> TaskId {
        let position = self.viewport.to_canvas_percent(x, y);
        self.create_task(NewTask {
            position,
            ..Default::default()
        })
    }

    pub fn delete(&mut self, id: &str) {
        if self.cards.remove(id).is_none() {
            debug!("event=task_delete status=missing id={}", id);
            return;
        }
        self.selection.forget(id);
        self.drag.forget(id);
        if self.hovered.as_deref() == Some(id) {
            self.hovered = None;
        }
        if self.editing().map(|s| s.task_id() == id).unwrap_or(false) {
            self.mode = InputMode::Board;
        }
        self.sink.submit(StoreOp::Delete(id.to_string()));
        info!("event=task_delete id={}", id);
    }

    pub fn delete_focused(&mut self) {
        for id in self.focused_ids() {
            self.delete(&id);
        }
    }

    // --- per-task setters used by commands ---

    pub fn position(&self, id: &str) -> Option<Position> {
        self.task(id).map(|t| t.position)
    }

    /// Settles `id` at `position` (clamped) and persists it.
    pub fn set_position(&mut self, id: &str, position: Position) {
        let Some(card) = self.cards.get_mut(id) else {
            debug!("event=set_position status=missing id={}", id);
            return;
        };
        let settled = position::clamp(position);
        card.task.position = settled;
        self.sink.submit(StoreOp::Update {
            id: id.to_string(),
            patch: TaskPatch::position(settled),
        });
    }

    pub fn color(&self, id: &str) -> Option<TaskColor> {
        self.task(id).map(|t| t.color)
    }

    pub fn set_color(&mut self, id: &str, color: TaskColor) {
        let Some(card) = self.cards.get_mut(id) else {
            debug!("event=set_color status=missing id={}", id);
            return;
        };
        card.task.color = color;
        self.sink.submit(StoreOp::Update {
            id: id.to_string(),
            patch: TaskPatch::color(color),
        });
    }

    pub fn set_color_focused(&mut self, color: TaskColor) {
        for id in self.focused_ids() {
            self.set_color(&id, color);
        }
    }

    /// Replaces a task's text, re-renders it and persists it.
    pub fn set_text(&mut self, id: &str, text: String) {
        let Some(card) = self.cards.get_mut(id) else {
            debug!("event=set_text status=missing id={}", id);
            return;
        };
        card.rendered = render_markdown(&text);
        card.task.text = text.clone();
        self.sink.submit(StoreOp::Update {
            id: id.to_string(),
            patch: TaskPatch::text(text),
        });
    }

    // --- stacking ---

    pub fn bring_to_front(&mut self, id: &str) {
        if zorder::bring_to_front(self.cards.values_mut(), id) {
            self.sink.submit(StoreOp::ReorderToFront(id.to_string()));
        } else {
            debug!("event=bring_to_front status=missing id={}", id);
        }
    }

    pub fn bring_focused_to_front(&mut self) {
        let picks: Vec<(TaskId, Position)> = self
            .selection
            .focused()
            .filter_map(|id| self.cards.get(id).map(|c| (id.clone(), c.task.position)))
            .collect();
        for id in zorder::front_order(picks) {
            self.bring_to_front(&id);
        }
    }

    // --- screens ---

    /// Flips every focused task onto the other screen. When the first focused
    /// task is on the screen being shown, the view follows it.
    pub fn move_focused_to_other_screen(&mut self) {
        let ids = self.focused_ids();
        let Some(first) = ids.first().and_then(|id| self.position(id)) else {
            return;
        };
        let from = Screen::containing(first.top);
        if from == self.viewport.screen {
            self.scroll_to(from.other());
        }
        for id in ids {
            if let Some(pos) = self.position(&id) {
                let top = if pos.top < position::SCREEN_SPAN {
                    pos.top + position::SCREEN_SPAN
                } else {
                    pos.top - position::SCREEN_SPAN
                };
                self.set_position(&id, Position::new(top, pos.left));
            }
        }
    }

    /// Requests a scroll transition; false if already there or one is in flight.
    pub fn scroll_to(&mut self, target: Screen) -> bool {
        if target == self.viewport.screen {
            return false;
        }
        self.scroller.request(target)
    }

    /// Moves the viewport to the pending scroll target, if any.
    pub fn apply_pending_scroll(&mut self) -> Option<Screen> {
        let target = self.scroller.pending()?;
        self.viewport.screen = target;
        Some(target)
    }

    /// Reports that the viewport's current screen is fully visible.
    pub fn observe_viewport(&mut self) {
        if self.scroller.observe(self.viewport.screen) {
            debug!("event=scroll status=settled screen={}", self.viewport.screen.label());
        }
    }

    pub fn scroll_in_flight(&self) -> bool {
        self.scroller.in_flight()
    }

    // --- pointer input (viewport cells) ---

    pub fn pointer_down(&mut self, x: f64, y: f64, toggle: bool) {
        let hit = self.hit_test(x, y);
        if let Some(session) = self.editing() {
            if hit.as_deref() == Some(session.task_id()) {
                return;
            }
            self.commit_edit();
        }
        let pointer = self.viewport.to_canvas_percent(x, y);
        match hit {
            Some(id) => {
                if self.selection.press(&id, toggle) == Press::Grabbed {
                    self.begin_drag(pointer);
                }
            }
            None => {
                self.selection.begin_marquee();
                self.marquee = Some(Marquee {
                    anchor: pointer,
                    current: pointer,
                });
            }
        }
    }

    fn begin_drag(&mut self, pointer: Position) {
        let mut tasks = Vec::new();
        for id in self.selection.focused() {
            if let Some(card) = self.cards.get_mut(id) {
                card.state = CardState::Dragging;
                tasks.push((id.clone(), card.task.position));
            }
        }
        debug!("event=drag_begin count={}", tasks.len());
        self.drag.begin(pointer, tasks);
    }

    pub fn pointer_move(&mut self, x: f64, y: f64) {
        if self.drag.is_dragging() {
            if let Some(target) = self
                .drag
                .auto_scroll_target(y, &self.viewport, &self.scroller)
            {
                if self.scroller.request(target) {
                    debug!("event=auto_scroll target={}", target.label());
                }
            }
            let pointer = self.viewport.to_canvas_percent(x, y);
            for (id, pos) in self.drag.positions_at(pointer) {
                if let Some(card) = self.cards.get_mut(&id) {
                    card.task.position = pos;
                }
            }
            return;
        }
        if let Some(mut marquee) = self.marquee {
            marquee.current = self.viewport.to_canvas_percent(x, y);
            self.marquee = Some(marquee);
            let covered = self.covered_by(&marquee);
            self.selection.update_marquee(covered);
            return;
        }
        self.hovered = self.hit_test(x, y);
    }

    pub fn pointer_up(&mut self) {
        let cards = &mut self.cards;
        let sink = &self.sink;
        let settled = self.drag.release(|id| {
            if let Some(card) = cards.get_mut(id) {
                let pos = position::clamp(card.task.position);
                card.task.position = pos;
                card.state = CardState::Idle;
                sink.submit(StoreOp::Update {
                    id: id.clone(),
                    patch: TaskPatch::position(pos),
                });
            }
        });
        if !settled.is_empty() {
            debug!("event=drag_settle count={}", settled.len());
        }
        if self.marquee.take().is_some() {
            self.selection.end_marquee();
        }
    }

    /// Double-click edits the card under the pointer, or creates a task there.
    pub fn double_click(&mut self, x: f64, y: f64) {
        match self.hit_test(x, y) {
            Some(id) => {
                self.begin_edit(&id);
            }
            None => {
                self.create_task_at(x, y);
            }
        }
    }

    // --- editing ---

    pub fn begin_edit(&mut self, id: &str) -> bool {
        let current = self.editing().map(|s| s.task_id().to_string());
        match current {
            Some(current) if current == id => return false,
            Some(_) => self.commit_edit(),
            None => {}
        }
        let min_height = self.card_size.1;
        let Some(card) = self.cards.get_mut(id) else {
            debug!("event=edit_begin status=missing id={}", id);
            return false;
        };
        let rendered_rows = u16::try_from(card.rendered.lines.len())
            .unwrap_or(u16::MAX)
            .saturating_add(2);
        card.state = CardState::Editing;
        self.mode = InputMode::Editing(EditSession::begin(
            id.to_string(),
            &card.task.text,
            rendered_rows.max(min_height),
        ));
        debug!("event=edit_begin id={}", id);
        true
    }

    pub fn edit_focused(&mut self) -> bool {
        match self.selection.single().cloned() {
            Some(id) => self.begin_edit(&id),
            None => false,
        }
    }

    /// Blur: the field's contents become the task text.
    pub fn commit_edit(&mut self) {
        let InputMode::Editing(session) = std::mem::replace(&mut self.mode, InputMode::Board)
        else {
            return;
        };
        let (id, text) = session.blur();
        self.finish_edit(&id, text);
    }

    pub fn cancel_edit(&mut self) {
        let InputMode::Editing(session) = std::mem::replace(&mut self.mode, InputMode::Board)
        else {
            return;
        };
        let (id, snapshot) = session.cancel();
        self.finish_edit(&id, snapshot);
    }

    fn finish_edit(&mut self, id: &str, text: String) {
        let changed = match self.cards.get_mut(id) {
            Some(card) => {
                card.state = CardState::Idle;
                card.task.text != text
            }
            None => return,
        };
        if changed {
            self.set_text(id, text);
        }
        debug!("event=edit_end id={} changed={}", id, changed);
    }

    // --- keys ---

    /// The single key dispatcher. Returns true when the user asked to quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if matches!(self.mode, InputMode::Board) {
            return match self.command_for(&key) {
                Some(command) => self.run(command),
                None => false,
            };
        }
        let InputMode::Editing(session) = &mut self.mode else {
            return false;
        };
        let outcome = session.handle_key(key);
        let id = session.task_id().to_string();
        match outcome {
            EditOutcome::Continue => {}
            EditOutcome::Applied(text) => {
                let changed = self.task(&id).map(|t| t.text != text).unwrap_or(false);
                if changed {
                    self.set_text(&id, text);
                }
            }
            EditOutcome::Cancelled(_) => self.cancel_edit(),
        }
        false
    }

    pub fn command_for(&self, key: &KeyEvent) -> Option<Command> {
        self.bindings
            .iter()
            .find(|(code, _)| *code == key.code)
            .map(|(_, command)| *command)
    }

    /// Runs a board command against the focus set. Returns true on quit.
    pub fn run(&mut self, command: Command) -> bool {
        match command {
            Command::Color(color) => self.set_color_focused(color),
            Command::BringToFront => self.bring_focused_to_front(),
            Command::Delete => self.delete_focused(),
            Command::MoveScreen => self.move_focused_to_other_screen(),
            Command::Edit => {
                self.edit_focused();
            }
            Command::ToggleScroll => {
                let target = self.viewport.screen.other();
                self.scroll_to(target);
            }
            Command::Quit => return true,
        }
        false
    }
}
