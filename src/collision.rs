//! Decides which drop targets a drag is currently over and where the dragged
//! card should land inside the hovered container.

use crate::model::{DropId, DropTarget};
use ratatui::layout::Rect;

/// A terminal cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: u16,
    pub y: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Droppable {
    pub id: DropId,
    pub rect: Rect,
}

/// A candidate hit with its ranking value. For pointer hits lower is closer,
/// for rect hits higher overlaps more; [`detect_collisions`] returns both
/// kinds already sorted most relevant first.
#[derive(Debug, Clone, PartialEq)]
pub struct Collision {
    pub id: DropId,
    pub value: f64,
}

impl Point {
    pub fn new(x: u16, y: u16) -> Self {
        Point { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        (dx * dx + dy * dy).sqrt()
    }
}

pub fn contains(rect: Rect, point: Point) -> bool {
    let right = u32::from(rect.x) + u32::from(rect.width);
    let bottom = u32::from(rect.y) + u32::from(rect.height);
    point.x >= rect.x
        && u32::from(point.x) < right
        && point.y >= rect.y
        && u32::from(point.y) < bottom
}

/// Offsets `rect` by a signed delta, pinning it inside the u16 plane.
pub fn translate(rect: Rect, dx: i32, dy: i32) -> Rect {
    let max = i32::from(u16::MAX);
    let x = (i32::from(rect.x) + dx).clamp(0, max - i32::from(rect.width));
    let y = (i32::from(rect.y) + dy).clamp(0, max - i32::from(rect.height));
    Rect {
        x: x as u16,
        y: y as u16,
        width: rect.width,
        height: rect.height,
    }
}

/// Targets whose bounds contain the pointer, ranked by the mean distance from
/// the pointer to the four corners. Nested targets (a card inside its column)
/// therefore rank ahead of their parent.
pub fn pointer_within(pointer: Point, candidates: &[Droppable]) -> Vec<Collision> {
    let mut hits = candidates
        .iter()
        .filter(|d| contains(d.rect, pointer))
        .map(|d| Collision {
            id: d.id.clone(),
            value: corners(d.rect)
                .iter()
                .map(|corner| pointer.distance(*corner))
                .sum::<f64>()
                / 4.0,
        })
        .collect::<Vec<_>>();
    hits.sort_by(|a, b| a.value.total_cmp(&b.value));
    hits
}

/// Targets overlapping `active`, ranked by intersection-over-union.
pub fn rect_intersection(active: Rect, candidates: &[Droppable]) -> Vec<Collision> {
    let mut hits = candidates
        .iter()
        .filter_map(|d| {
            let ratio = overlap_ratio(active, d.rect);
            (ratio > 0.0).then(|| Collision {
                id: d.id.clone(),
                value: ratio,
            })
        })
        .collect::<Vec<_>>();
    hits.sort_by(|a, b| b.value.total_cmp(&a.value));
    hits
}

/// Pointer containment wins whenever it finds anything; only an empty
/// pointer result falls back to rect overlap of the dragged card.
pub fn detect_collisions(pointer: Point, active: Rect, candidates: &[Droppable]) -> Vec<Collision> {
    let hits = pointer_within(pointer, candidates);
    if !hits.is_empty() {
        return hits;
    }
    rect_intersection(active, candidates)
}

/// Insertion index inside the hovered container. Hovering the container
/// itself appends; hovering a card inserts before it, or after it once the
/// dragged card's top edge has passed the card's vertical midpoint.
pub fn placement_index(
    target: &DropTarget,
    dest_len: usize,
    active: Rect,
    over: Option<Rect>,
) -> usize {
    match target {
        DropTarget::Container { .. } => dest_len,
        DropTarget::Task { index, .. } => {
            let below = over
                .map(|rect| {
                    f64::from(active.y) > f64::from(rect.y) + f64::from(rect.height) / 2.0
                })
                .unwrap_or(false);
            let index = if below { index + 1 } else { *index };
            index.min(dest_len)
        }
    }
}

fn corners(rect: Rect) -> [Point; 4] {
    let right = rect.x.saturating_add(rect.width);
    let bottom = rect.y.saturating_add(rect.height);
    [
        Point::new(rect.x, rect.y),
        Point::new(right, rect.y),
        Point::new(rect.x, bottom),
        Point::new(right, bottom),
    ]
}

fn overlap_ratio(a: Rect, b: Rect) -> f64 {
    let left = a.x.max(b.x) as u32;
    let top = a.y.max(b.y) as u32;
    let right = (u32::from(a.x) + u32::from(a.width)).min(u32::from(b.x) + u32::from(b.width));
    let bottom = (u32::from(a.y) + u32::from(a.height)).min(u32::from(b.y) + u32::from(b.height));
    if right <= left || bottom <= top {
        return 0.0;
    }
    let inter = f64::from((right - left) * (bottom - top));
    let area_a = f64::from(u32::from(a.width) * u32::from(a.height));
    let area_b = f64::from(u32::from(b.width) * u32::from(b.height));
    inter / (area_a + area_b - inter)
}
