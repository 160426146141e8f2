//! Drag session lifecycle: activation sensors plus the start / over / end
//! handlers that turn pointer positions into board mutations.

use crate::collision::{detect_collisions, placement_index, translate, Droppable, Point};
use crate::model::{Board, Column, DropId, DropTarget, TaskId};
use ratatui::layout::Rect;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Touch mode suits terminals that turn taps into mouse events, where a
/// short hold is needed to tell a drag from a scroll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    #[default]
    Pointer,
    Touch,
}

/// What a press has to do before it becomes a drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActivationConstraint {
    /// Move at least this many cells away from the press point.
    Distance(f64),
    /// Hold for `delay` without wandering more than `tolerance` cells.
    Delay { delay: Duration, tolerance: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sensors {
    pub pointer: ActivationConstraint,
    pub touch: ActivationConstraint,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Press {
    pub task_id: TaskId,
    pub kind: InputKind,
    pub origin: Point,
    pub rect: Rect,
    pub at: Instant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveDrag {
    pub task_id: TaskId,
    pub origin: Point,
    pub pointer: Point,
    /// Card bounds when the drag started.
    pub initial_rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragSession {
    #[default]
    Idle,
    Pending(Press),
    Dragging(ActiveDrag),
}

/// Outcome of a controller handler. The UI uses it to decide whether to
/// relayout and redraw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragEffect {
    None,
    Pending {
        task_id: TaskId,
    },
    /// The press wandered off before a touch delay elapsed.
    Aborted {
        task_id: TaskId,
    },
    /// Released before the activation constraint was met.
    Clicked {
        task_id: TaskId,
    },
    Started {
        task_id: TaskId,
    },
    Hovering {
        task_id: TaskId,
        over: Option<DropTarget>,
    },
    MovedAcross {
        task_id: TaskId,
        from: String,
        to: String,
        index: usize,
    },
    Reordered {
        task_id: TaskId,
        container: String,
        from: usize,
        to: usize,
    },
    Dropped {
        task_id: TaskId,
        over: Option<DropTarget>,
    },
    Cancelled {
        task_id: TaskId,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DragController {
    sensors: Sensors,
    session: DragSession,
}

impl Default for Sensors {
    fn default() -> Self {
        Sensors {
            pointer: ActivationConstraint::Distance(5.0),
            touch: ActivationConstraint::Delay {
                delay: Duration::from_millis(250),
                tolerance: 5.0,
            },
        }
    }
}

impl Sensors {
    pub fn constraint(&self, kind: InputKind) -> ActivationConstraint {
        match kind {
            InputKind::Pointer => self.pointer,
            InputKind::Touch => self.touch,
        }
    }
}

impl ActiveDrag {
    pub fn delta(&self) -> (i32, i32) {
        (
            i32::from(self.pointer.x) - i32::from(self.origin.x),
            i32::from(self.pointer.y) - i32::from(self.origin.y),
        )
    }

    /// Where the dragged card currently floats.
    pub fn translated_rect(&self) -> Rect {
        let (dx, dy) = self.delta();
        translate(self.initial_rect, dx, dy)
    }
}

impl DragEffect {
    pub fn mutated_board(&self) -> bool {
        matches!(
            self,
            DragEffect::MovedAcross { .. } | DragEffect::Reordered { .. }
        )
    }

    pub fn needs_redraw(&self) -> bool {
        !matches!(self, DragEffect::None | DragEffect::Pending { .. })
    }
}

impl DragController {
    pub fn new(sensors: Sensors) -> Self {
        DragController {
            sensors,
            session: DragSession::Idle,
        }
    }

    pub fn session(&self) -> &DragSession {
        &self.session
    }

    pub fn active(&self) -> Option<&ActiveDrag> {
        match &self.session {
            DragSession::Dragging(active) => Some(active),
            _ => None,
        }
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active().map(|a| a.task_id.as_str())
    }

    pub fn is_dragging(&self) -> bool {
        self.active().is_some()
    }

    /// Arms a drag on `task_id`. Nothing moves until the sensor for `kind`
    /// activates.
    pub fn press(
        &mut self,
        kind: InputKind,
        task_id: impl Into<TaskId>,
        pointer: Point,
        rect: Rect,
        now: Instant,
    ) -> DragEffect {
        let task_id = task_id.into();
        trace!(%task_id, ?kind, x = pointer.x, y = pointer.y, "press");
        self.session = DragSession::Pending(Press {
            task_id: task_id.clone(),
            kind,
            origin: pointer,
            rect,
            at: now,
        });
        DragEffect::Pending { task_id }
    }

    pub fn pointer_move(
        &mut self,
        pointer: Point,
        now: Instant,
        board: &mut Board,
        droppables: &[Droppable],
    ) -> DragEffect {
        match std::mem::take(&mut self.session) {
            DragSession::Idle => DragEffect::None,
            DragSession::Pending(press) => {
                let moved = press.origin.distance(pointer);
                match self.sensors.constraint(press.kind) {
                    ActivationConstraint::Distance(distance) if moved >= distance => {
                        self.start(press, pointer, board, droppables)
                    }
                    ActivationConstraint::Delay { delay, .. }
                        if now.saturating_duration_since(press.at) >= delay =>
                    {
                        self.start(press, pointer, board, droppables)
                    }
                    ActivationConstraint::Delay { tolerance, .. } if moved > tolerance => {
                        debug!(
                            task_id = %press.task_id,
                            moved,
                            "press left tolerance, not a drag"
                        );
                        DragEffect::Aborted {
                            task_id: press.task_id,
                        }
                    }
                    _ => {
                        self.session = DragSession::Pending(press);
                        DragEffect::None
                    }
                }
            }
            DragSession::Dragging(mut active) => {
                active.pointer = pointer;
                let effect = over(&active, board, droppables);
                self.session = DragSession::Dragging(active);
                effect
            }
        }
    }

    /// Activates a held touch press once its delay has passed.
    pub fn tick(
        &mut self,
        now: Instant,
        board: &mut Board,
        droppables: &[Droppable],
    ) -> DragEffect {
        match std::mem::take(&mut self.session) {
            DragSession::Pending(press) => match self.sensors.constraint(press.kind) {
                ActivationConstraint::Delay { delay, .. }
                    if now.saturating_duration_since(press.at) >= delay =>
                {
                    let origin = press.origin;
                    self.start(press, origin, board, droppables)
                }
                _ => {
                    self.session = DragSession::Pending(press);
                    DragEffect::None
                }
            },
            other => {
                self.session = other;
                DragEffect::None
            }
        }
    }

    pub fn release(
        &mut self,
        pointer: Point,
        board: &mut Board,
        droppables: &[Droppable],
    ) -> DragEffect {
        match std::mem::take(&mut self.session) {
            DragSession::Idle => DragEffect::None,
            DragSession::Pending(press) => DragEffect::Clicked {
                task_id: press.task_id,
            },
            DragSession::Dragging(mut active) if active.pointer != pointer => {
                // The release cell was never hovered. Droppables predate any
                // move made here, so a cross-container move ends the drop.
                active.pointer = pointer;
                match over(&active, board, droppables) {
                    moved @ DragEffect::MovedAcross { .. } => moved,
                    _ => end(active, board, droppables),
                }
            }
            DragSession::Dragging(active) => end(active, board, droppables),
        }
    }

    /// Ends the session without a drop. Moves already applied while hovering
    /// stay where they are.
    pub fn cancel(&mut self) -> DragEffect {
        match std::mem::take(&mut self.session) {
            DragSession::Idle => DragEffect::None,
            DragSession::Pending(press) => DragEffect::Aborted {
                task_id: press.task_id,
            },
            DragSession::Dragging(active) => {
                info!(task_id = %active.task_id, "drag cancelled");
                DragEffect::Cancelled {
                    task_id: active.task_id,
                }
            }
        }
    }

    /// Activation hovers at once, so a drag that activates over another
    /// container lands there even if no further move arrives.
    fn start(
        &mut self,
        press: Press,
        pointer: Point,
        board: &mut Board,
        droppables: &[Droppable],
    ) -> DragEffect {
        debug!(task_id = %press.task_id, "drag started");
        let task_id = press.task_id.clone();
        let active = ActiveDrag {
            task_id: press.task_id,
            origin: press.origin,
            pointer,
            initial_rect: press.rect,
        };
        let hover = over(&active, board, droppables);
        self.session = DragSession::Dragging(active);
        if hover.mutated_board() {
            hover
        } else {
            DragEffect::Started { task_id }
        }
    }
}

/// Live cross-container placement. Hovering inside the source container
/// never mutates; the final order there is settled by `end`.
fn over(active: &ActiveDrag, board: &mut Board, droppables: &[Droppable]) -> DragEffect {
    let task_id = active.task_id.clone();
    let dragged = active.translated_rect();
    let target = resolve_over(active, board, droppables);
    let source = container_of(board, &task_id);

    let (Some(source), Some(target)) = (source, target) else {
        return DragEffect::Hovering {
            task_id,
            over: None,
        };
    };
    if target.container() == source {
        return DragEffect::Hovering {
            task_id,
            over: Some(target),
        };
    }

    let dest = target.container().to_string();
    let dest_len = board.column(&dest).map(Column::len).unwrap_or(0);
    let index = placement_index(&target, dest_len, dragged, over_rect(&target, droppables));
    match board.move_across_containers(&task_id, &source, &dest, index) {
        Ok(index) => {
            info!(%task_id, from = %source, to = %dest, index, "moved across containers");
            DragEffect::MovedAcross {
                task_id,
                from: source,
                to: dest,
                index,
            }
        }
        Err(err) => {
            debug!(%task_id, %err, "cross-container move skipped");
            DragEffect::Hovering {
                task_id,
                over: Some(target),
            }
        }
    }
}

fn end(active: ActiveDrag, board: &mut Board, droppables: &[Droppable]) -> DragEffect {
    let task_id = active.task_id.clone();
    let Some(target) = resolve_over(&active, board, droppables) else {
        debug!(%task_id, "dropped outside any target");
        return DragEffect::Dropped {
            task_id,
            over: None,
        };
    };
    let Some(source) = container_of(board, &task_id) else {
        return DragEffect::Dropped {
            task_id,
            over: None,
        };
    };
    if target.container() != source {
        // Already placed while hovering.
        return DragEffect::Dropped {
            task_id,
            over: Some(target),
        };
    }

    let from = board.index_of(&source, &task_id);
    let to = match &target {
        DropTarget::Task { index, .. } => Some(*index),
        DropTarget::Container { name } => board.column(name).and_then(|c| c.len().checked_sub(1)),
    };
    match (from, to) {
        (Some(from), Some(to)) if from != to => {
            match board.move_within_container(&source, from, to) {
                Ok(()) => {
                    info!(%task_id, container = %source, from, to, "reordered");
                    DragEffect::Reordered {
                        task_id,
                        container: source,
                        from,
                        to,
                    }
                }
                Err(err) => {
                    debug!(%task_id, %err, "reorder skipped");
                    DragEffect::Dropped {
                        task_id,
                        over: Some(target),
                    }
                }
            }
        }
        _ => DragEffect::Dropped {
            task_id,
            over: Some(target),
        },
    }
}

fn resolve_over(
    active: &ActiveDrag,
    board: &Board,
    droppables: &[Droppable],
) -> Option<DropTarget> {
    let collisions = detect_collisions(active.pointer, active.translated_rect(), droppables);
    let first = collisions.first()?;
    trace!(over = ?first.id, value = first.value, "collision");
    board.resolve(&first.id)
}

fn container_of(board: &Board, task_id: &str) -> Option<String> {
    board
        .resolve(&DropId::Task(task_id.to_string()))
        .map(|target| target.container().to_string())
}

fn over_rect(target: &DropTarget, droppables: &[Droppable]) -> Option<Rect> {
    let DropTarget::Task { id, .. } = target else {
        return None;
    };
    droppables
        .iter()
        .find(|d| matches!(&d.id, DropId::Task(task) if task == id))
        .map(|d| d.rect)
}
