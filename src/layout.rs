use crate::collision::{contains, Droppable, Point};
use crate::model::{Board, DropId, TaskId};
use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Rows taken by one card: border, title, description, border.
pub const CARD_HEIGHT: u16 = 4;
const CARD_GAP: u16 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardLayout {
    pub task_id: TaskId,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub name: String,
    pub area: Rect,
    pub add_button: Rect,
    /// Only the cards that fit; the rest are counted but not drawn.
    pub cards: Vec<CardLayout>,
}

/// Screen geometry of the board, recomputed whenever the board or the
/// terminal size changes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardLayout {
    pub columns: Vec<ColumnLayout>,
}

impl BoardLayout {
    pub fn compute(area: Rect, board: &Board) -> Self {
        let columns = board.columns();
        if columns.is_empty() {
            return BoardLayout::default();
        }
        let count = columns.len() as u32;
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(
                columns
                    .iter()
                    .map(|_| Constraint::Ratio(1, count))
                    .collect::<Vec<_>>(),
            )
            .split(area);

        let columns = columns
            .iter()
            .zip(chunks.iter())
            .map(|(column, &area)| {
                let inner = Rect {
                    x: area.x.saturating_add(1),
                    y: area.y.saturating_add(1),
                    width: area.width.saturating_sub(2),
                    height: area.height.saturating_sub(2),
                };
                let add_button = Rect {
                    x: inner.x,
                    y: inner.y + inner.height.saturating_sub(1),
                    width: inner.width,
                    height: inner.height.min(1),
                };
                // Keep a blank row between the last card and the button.
                let cards_bottom = add_button.y.saturating_sub(1);
                let mut cards = Vec::new();
                let mut y = inner.y;
                for task in column.tasks() {
                    if y + CARD_HEIGHT > cards_bottom {
                        break;
                    }
                    cards.push(CardLayout {
                        task_id: task.id.clone(),
                        rect: Rect::new(inner.x, y, inner.width, CARD_HEIGHT),
                    });
                    y += CARD_HEIGHT + CARD_GAP;
                }
                ColumnLayout {
                    name: column.name.clone(),
                    area,
                    add_button,
                    cards,
                }
            })
            .collect();
        BoardLayout { columns }
    }

    /// Every column followed by every visible card.
    pub fn droppables(&self) -> Vec<Droppable> {
        let containers = self.columns.iter().map(|c| Droppable {
            id: DropId::Container(c.name.clone()),
            rect: c.area,
        });
        let cards = self.columns.iter().flat_map(|c| {
            c.cards.iter().map(|card| Droppable {
                id: DropId::Task(card.task_id.clone()),
                rect: card.rect,
            })
        });
        containers.chain(cards).collect()
    }

    pub fn card_rect(&self, task_id: &str) -> Option<Rect> {
        self.columns
            .iter()
            .flat_map(|c| c.cards.iter())
            .find(|card| card.task_id == task_id)
            .map(|card| card.rect)
    }

    pub fn card_at(&self, point: Point) -> Option<&CardLayout> {
        self.columns
            .iter()
            .flat_map(|c| c.cards.iter())
            .find(|card| contains(card.rect, point))
    }

    pub fn button_at(&self, point: Point) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| contains(c.add_button, point))
            .map(|c| c.name.as_str())
    }

    pub fn column_at(&self, point: Point) -> Option<usize> {
        self.columns.iter().position(|c| contains(c.area, point))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::test_board;
    use rstest::rstest;

    #[rstest]
    fn columns_split_evenly_with_stacked_cards() {
        let board = test_board(&[("A", &["t1", "t2"]), ("B", &[]), ("C", &["t3"])]);
        let layout = BoardLayout::compute(Rect::new(0, 3, 90, 30), &board);

        assert_eq!(layout.columns.len(), 3);
        assert_eq!(layout.columns[0].area, Rect::new(0, 3, 30, 30));
        assert_eq!(layout.columns[1].area, Rect::new(30, 3, 30, 30));
        assert_eq!(layout.columns[0].add_button, Rect::new(1, 31, 28, 1));
        assert_eq!(layout.card_rect("t1"), Some(Rect::new(1, 4, 28, 4)));
        assert_eq!(layout.card_rect("t2"), Some(Rect::new(1, 9, 28, 4)));
        assert_eq!(layout.card_rect("t3"), Some(Rect::new(61, 4, 28, 4)));
    }

    #[rstest]
    fn droppables_list_containers_then_cards() {
        let board = test_board(&[("A", &["t1"]), ("B", &["t2"])]);
        let layout = BoardLayout::compute(Rect::new(0, 0, 40, 20), &board);
        let ids = layout
            .droppables()
            .into_iter()
            .map(|d| d.id)
            .collect::<Vec<_>>();
        assert_eq!(
            ids,
            [
                DropId::Container("A".into()),
                DropId::Container("B".into()),
                DropId::Task("t1".into()),
                DropId::Task("t2".into()),
            ]
        );
    }

    #[rstest]
    fn cards_that_do_not_fit_are_skipped() {
        let board = test_board(&[("A", &["t1", "t2", "t3"])]);
        // inner rows 1..=10, button on row 10, cards must end by row 9
        let layout = BoardLayout::compute(Rect::new(0, 0, 20, 12), &board);
        let visible = layout.columns[0]
            .cards
            .iter()
            .map(|c| c.task_id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(visible, ["t1"]);
    }

    #[rstest]
    fn hit_testing() {
        let board = test_board(&[("A", &["t1"]), ("B", &[])]);
        let layout = BoardLayout::compute(Rect::new(0, 0, 40, 20), &board);
        assert_eq!(
            layout.card_at(Point::new(3, 2)).map(|c| c.task_id.as_str()),
            Some("t1")
        );
        assert!(layout.card_at(Point::new(25, 2)).is_none());
        assert_eq!(layout.button_at(Point::new(25, 18)), Some("B"));
        assert_eq!(layout.button_at(Point::new(25, 17)), None);
        assert_eq!(layout.column_at(Point::new(25, 17)), Some(1));
        assert_eq!(layout.column_at(Point::new(50, 17)), None);
    }

    #[rstest]
    fn empty_board_has_no_geometry() {
        let board = test_board(&[]);
        let layout = BoardLayout::compute(Rect::new(0, 0, 40, 20), &board);
        assert!(layout.droppables().is_empty());
    }
}
