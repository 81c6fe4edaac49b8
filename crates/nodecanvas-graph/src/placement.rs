//! Grid placement: collision-avoiding auto placement, adjacency placement
//! below a connected source, and the translations used to keep every node at
//! non-negative coordinates.
//!
//! Everything here works on plain grid rectangles so it can be tested without
//! a canvas. The canvas feeds in the rectangles of the other node views.

use nodecanvas_core::{GridPoint, GridRect};

/// How far the candidate may travel, in multiples of its own width.
pub const MAX_SHIFT_FACTOR: i32 = 2;

/// Vertical gap kept between a source and a node placed below it.
pub const ADJACENT_GAP_ROWS: i32 = 1;

/// Rows kept free between a newly placed node and the nodes pushed below it.
pub const PUSH_MARGIN_ROWS: i32 = 2;

fn overlaps_any(candidate: &GridRect, occupied: &[GridRect]) -> bool {
    occupied.iter().any(|rect| rect.intersects(candidate))
}

/// Where auto placement starts: the cursor if it is inside the viewport,
/// otherwise one cell inside the viewport's top-left corner.
pub fn placement_seed(cursor: Option<GridPoint>, viewport: Option<GridRect>) -> GridPoint {
    match (cursor, viewport) {
        (Some(cursor), Some(viewport)) if viewport.contains(cursor) => cursor,
        (Some(cursor), None) => cursor,
        (_, Some(viewport)) => viewport.origin().offset(1, 1),
        (None, None) => GridPoint::new(1, 1),
    }
}

/// Shift `seed` right one cell at a time until it no longer overlaps any
/// occupied rectangle.
///
/// Gives up and returns the unshifted seed when the candidate no longer
/// overlaps the viewport at all or has travelled more than [`MAX_SHIFT_FACTOR`] times its own
/// width. Always terminates.
pub fn find_free_slot(
    seed: GridRect,
    occupied: &[GridRect],
    viewport: Option<GridRect>,
) -> GridPoint {
    let width = seed.width.max(1);
    let mut candidate = seed;
    loop {
        if !overlaps_any(&candidate, occupied) {
            return candidate.origin();
        }
        candidate.x += 1;
        if viewport.is_some_and(|v| !v.intersects(&candidate)) {
            return seed.origin();
        }
        if candidate.x - seed.x > MAX_SHIFT_FACTOR * width {
            return seed.origin();
        }
    }
}

/// Origin for `target` directly below `source` with the two port centers
/// aligned.
///
/// Port centers are pixel offsets from their node's left edge; `cell_width`
/// converts the difference back into grid cells.
pub fn adjacent_seed(
    source: GridRect,
    source_port_offset: f32,
    target_port_offset: f32,
    cell_width: f32,
) -> GridPoint {
    let dx = ((source_port_offset - target_port_offset) / cell_width).round() as i32;
    GridPoint::new(source.x + dx, source.bottom() + ADJACENT_GAP_ROWS)
}

/// How many rows the nodes below `line` must move so `target_height` fits
/// between the line and the closest of them. `None` when nothing is below.
pub fn push_down_rows(line: i32, below: &[GridRect], target_height: i32) -> Option<i32> {
    let min_distance = below
        .iter()
        .filter(|rect| rect.y >= line)
        .map(|rect| rect.y - line)
        .min()?;
    Some((target_height + PUSH_MARGIN_ROWS - min_distance).max(0))
}

/// Shift that brings every rectangle to non-negative coordinates.
pub fn negative_overflow<'a>(rects: impl IntoIterator<Item = &'a GridRect>) -> (i32, i32) {
    let (mut min_x, mut min_y) = (0, 0);
    for rect in rects {
        min_x = min_x.min(rect.x);
        min_y = min_y.min(rect.y);
    }
    (-min_x, -min_y)
}

/// Translation that moves the top-left-most rectangle to grid (1, 1).
pub fn crop_offset<'a>(rects: impl IntoIterator<Item = &'a GridRect>) -> Option<(i32, i32)> {
    let mut iter = rects.into_iter();
    let first = iter.next()?;
    let (mut min_x, mut min_y) = (first.x, first.y);
    for rect in iter {
        min_x = min_x.min(rect.x);
        min_y = min_y.min(rect.y);
    }
    Some((1 - min_x, 1 - min_y))
}

/// Bottom-right extent of all rectangles plus a two cell margin.
pub fn content_extent<'a>(rects: impl IntoIterator<Item = &'a GridRect>) -> GridPoint {
    let (mut right, mut bottom) = (0, 0);
    for rect in rects {
        right = right.max(rect.right());
        bottom = bottom.max(rect.bottom());
    }
    GridPoint::new(right + 2, bottom + 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_seed_is_kept() {
        let seed = GridRect::new(0, 0, 4, 3);
        assert_eq!(find_free_slot(seed, &[], None), GridPoint::new(0, 0));
    }

    #[test]
    fn test_shifts_right_past_obstacle() {
        let seed = GridRect::new(0, 0, 4, 3);
        let occupied = [GridRect::new(0, 0, 3, 3)];
        assert_eq!(find_free_slot(seed, &occupied, None), GridPoint::new(3, 0));
    }

    #[test]
    fn test_touching_neighbour_does_not_block() {
        let seed = GridRect::new(0, 3, 4, 3);
        let occupied = [GridRect::new(0, 0, 4, 3)];
        assert_eq!(find_free_slot(seed, &occupied, None), GridPoint::new(0, 3));
    }

    #[test]
    fn test_gives_up_after_twice_the_width() {
        let seed = GridRect::new(0, 0, 2, 3);
        let occupied = [GridRect::new(0, 0, 20, 3)];
        assert_eq!(find_free_slot(seed, &occupied, None), GridPoint::new(0, 0));
    }

    #[test]
    fn test_gives_up_when_leaving_viewport() {
        let seed = GridRect::new(0, 0, 4, 3);
        let occupied = [GridRect::new(0, 0, 8, 3)];
        let viewport = GridRect::new(0, 0, 5, 10);
        assert_eq!(
            find_free_slot(seed, &occupied, Some(viewport)),
            GridPoint::new(0, 0)
        );
        assert_eq!(find_free_slot(seed, &occupied, None), GridPoint::new(8, 0));
    }

    #[test]
    fn test_slot_straddling_viewport_edge_is_used() {
        let seed = GridRect::new(15, 0, 4, 3);
        let occupied = [GridRect::new(15, 0, 3, 3)];
        let viewport = GridRect::new(0, 0, 20, 20);
        assert_eq!(
            find_free_slot(seed, &occupied, Some(viewport)),
            GridPoint::new(18, 0)
        );
    }

    #[test]
    fn test_placement_seed() {
        let viewport = GridRect::new(10, 10, 20, 20);
        assert_eq!(
            placement_seed(Some(GridPoint::new(12, 15)), Some(viewport)),
            GridPoint::new(12, 15)
        );
        assert_eq!(
            placement_seed(Some(GridPoint::new(0, 0)), Some(viewport)),
            GridPoint::new(11, 11)
        );
        assert_eq!(placement_seed(None, None), GridPoint::new(1, 1));
    }

    #[test]
    fn test_adjacent_seed_aligns_ports() {
        let source = GridRect::new(4, 2, 6, 3);
        // Source port centered 75px in, target port 25px in: target shifts 2 cells right.
        assert_eq!(adjacent_seed(source, 75.0, 25.0, 25.0), GridPoint::new(6, 6));
    }

    #[test]
    fn test_push_down_rows() {
        let below = [GridRect::new(0, 7, 4, 3), GridRect::new(5, 9, 4, 3)];
        // Closest node is 1 row below the line; a 3-row node plus margin needs 5.
        assert_eq!(push_down_rows(6, &below, 3), Some(4));
        assert_eq!(push_down_rows(0, &below, 3), Some(0));
        assert_eq!(push_down_rows(20, &below, 3), None);
    }

    #[test]
    fn test_overflow_and_crop() {
        let rects = [GridRect::new(-3, 2, 4, 3), GridRect::new(5, -1, 4, 3)];
        assert_eq!(negative_overflow(&rects), (3, 1));
        assert_eq!(negative_overflow(&[GridRect::new(1, 1, 1, 1)]), (0, 0));
        assert_eq!(crop_offset(&rects), Some((4, 2)));
        assert_eq!(crop_offset(std::iter::empty()), None);
        assert_eq!(content_extent(&rects), GridPoint::new(11, 7));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn grid_rect_strategy() -> impl Strategy<Value = GridRect> {
        (0i32..40, 0i32..40, 1i32..8, 1i32..5).prop_map(|(x, y, w, h)| GridRect::new(x, y, w, h))
    }

    proptest! {
        #[test]
        fn prop_placement_terminates_without_overlap_or_falls_back(
            occupied in prop::collection::vec(grid_rect_strategy(), 0..30),
            seed in grid_rect_strategy(),
            with_viewport in any::<bool>(),
        ) {
            let viewport = with_viewport.then(|| GridRect::new(0, 0, 50, 50));
            let placed = find_free_slot(seed, &occupied, viewport);
            let rect = seed.moved_to(placed);
            let free = !occupied.iter().any(|r| r.intersects(&rect));
            prop_assert!(free || placed == seed.origin());
            prop_assert_eq!(placed.y, seed.y);
            prop_assert!(placed.x - seed.x <= MAX_SHIFT_FACTOR * seed.width + seed.width);
        }

        #[test]
        fn prop_overflow_makes_coordinates_non_negative(
            rects in prop::collection::vec((-30i32..30, -30i32..30), 1..20),
        ) {
            let rects: Vec<GridRect> = rects.into_iter().map(|(x, y)| GridRect::new(x, y, 2, 2)).collect();
            let (dx, dy) = negative_overflow(&rects);
            prop_assert!(dx >= 0 && dy >= 0);
            for r in &rects {
                prop_assert!(r.x + dx >= 0);
                prop_assert!(r.y + dy >= 0);
            }
        }
    }
}
