//! Edge routing and the per-frame edge plan: routed polylines, auto-hide
//! decisions and colors.

use crate::node_view::PortRange;
use crate::settings::CanvasSettings;
use crate::style::{EdgeStyle, Theme};
use nodecanvas_core::{Compatibility, EdgeShape, EdgeVisibility, NodeId, PortId, Rect, Vec2};

/// Vertical offset of the routed end point when an arrow head is drawn.
pub const ARROW_HEAD_SHIFT: f32 = -8.0;
pub const ARROW_HEAD_SIZE: f32 = 4.0;

pub const EDGE_WIDTH: f32 = 2.0;
pub const SELECTED_EDGE_WIDTH: f32 = 3.0;
pub const HIDDEN_EDGE_WIDTH: f32 = 1.0;

/// Overrides the per-edge visibility policy for a whole pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeMuteMode {
    /// Follow each edge's visibility policy.
    Auto,
    ForceVisible,
    ForceMuted,
}

/// Pull each center into the other's range so the two endpoints sit as close
/// together as their ranges allow.
pub fn tighten(source: &mut PortRange, target: &mut PortRange) {
    let source_center = source.center;
    let target_center = target.center;
    source.center = target_center.clamp(source.min, source.max);
    target.center = source_center.clamp(target.min, target.max);
}

/// Straight line between two points.
pub fn route_line(source: Vec2, target: Vec2, arrows: bool) -> Vec<Vec2> {
    let shift = if arrows { ARROW_HEAD_SHIFT } else { 0.0 };
    vec![source, Vec2::new(target.x, target.y + shift)]
}

/// Orthogonal route from an output at `source` down to an input at `target`.
///
/// Steps out `buffer` below the source first. Targets above the source are
/// reached by detouring around `source_bounds` on the side facing the target.
pub fn route_elbow(
    source: Vec2,
    source_bounds: Rect,
    target: Vec2,
    buffer: f32,
    arrows: bool,
) -> Vec<Vec2> {
    let source_a = source.y;
    let target_a = if arrows {
        target.y + ARROW_HEAD_SHIFT
    } else {
        target.y
    };
    let target_b = target.x;

    let mut points = Vec::with_capacity(6);
    let mut a1 = source_a;
    let mut b1 = source.x;
    points.push(Vec2::new(b1, a1));

    if source_a > target_a {
        a1 += buffer;
        points.push(Vec2::new(b1, a1));
        b1 = if target_b <= b1 {
            (source_bounds.min.x - buffer).max(0.0)
        } else {
            source_bounds.max.x + buffer
        };
        points.push(Vec2::new(b1, a1));
        a1 = (target_a - buffer).max(0.0);
        points.push(Vec2::new(b1, a1));
    } else if b1 != target_b {
        let da = target_a - source_a;
        a1 = (source_a + buffer).min(source_a + da / 2.0);
        points.push(Vec2::new(b1, a1));
    }

    if b1 != target_b {
        b1 = target_b;
        points.push(Vec2::new(b1, a1));
    }

    points.push(Vec2::new(b1, target_a));
    points
}

pub fn route(
    shape: EdgeShape,
    source: Vec2,
    source_bounds: Rect,
    target: Vec2,
    buffer: f32,
    arrows: bool,
) -> Vec<Vec2> {
    match shape {
        EdgeShape::Elbow => route_elbow(source, source_bounds, target, buffer, arrows),
        EdgeShape::Line => route_line(source, target, arrows),
    }
}

/// Arrow head triangle pointing down at `tip`.
pub fn arrow_head(tip: Vec2) -> [Vec2; 3] {
    let base = tip.y - 2.0 * ARROW_HEAD_SIZE;
    [
        Vec2::new(tip.x - ARROW_HEAD_SIZE, base),
        Vec2::new(tip.x + ARROW_HEAD_SIZE, base),
        tip,
    ]
}

/// Dice similarity `2·|A∩B| / (|A|+|B|)` of two rectangles.
///
/// Two zero-area rectangles score 1.0 when identical and 0.0 otherwise.
pub fn dice_score(a: &Rect, b: &Rect) -> f32 {
    let total = a.area() + b.area();
    if total <= 0.0 {
        return if a == b { 1.0 } else { 0.0 };
    }
    let shared = a.intersection(b).map_or(0.0, |r| r.area());
    2.0 * shared / total
}

/// An edge whose endpoints resolved to node views this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeCandidate {
    pub source: PortId,
    pub target: PortId,
    pub source_node: NodeId,
    pub target_node: NodeId,
    pub source_range: PortRange,
    pub target_range: PortRange,
    pub source_bounds: Rect,
    pub visibility: EdgeVisibility,
    pub shape: EdgeShape,
    pub compatibility: Compatibility,
    /// Either endpoint is a comment node.
    pub comment: bool,
    pub label: Option<String>,
}

impl EdgeCandidate {
    pub fn manhattan_distance(&self) -> f32 {
        self.source_range
            .point()
            .manhattan_distance(self.target_range.point())
    }

    fn span(&self) -> Rect {
        Rect::from_points(self.source_range.point(), self.target_range.point())
    }
}

/// Options for one edge drawing pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgePass {
    pub mute: EdgeMuteMode,
    pub multicolor: bool,
    /// Number of hues to spread over when `multicolor` is set.
    pub multicolor_count: usize,
    pub arrows: bool,
    pub auto_hide: bool,
    pub width: f32,
    /// Half a zoomed grid row: how far elbow routes step out.
    pub buffer: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedEdge {
    pub source: PortId,
    pub target: PortId,
    pub points: Vec<Vec2>,
    pub style: EdgeStyle,
    pub hidden: bool,
    pub comment: bool,
    pub label: Option<String>,
}

impl PlannedEdge {
    pub fn end(&self) -> Option<Vec2> {
        self.points.last().copied()
    }
}

fn is_hidden(
    candidate: &EdgeCandidate,
    pass: &EdgePass,
    settings: &CanvasSettings,
    drawn: &[Rect],
) -> bool {
    match pass.mute {
        EdgeMuteMode::ForceVisible => false,
        EdgeMuteMode::ForceMuted => true,
        EdgeMuteMode::Auto => match candidate.visibility {
            EdgeVisibility::AlwaysVisible => false,
            EdgeVisibility::AlwaysHidden | EdgeVisibility::AlwaysHiddenWithLabel => true,
            EdgeVisibility::Smart | EdgeVisibility::SmartSilent => {
                pass.auto_hide
                    && candidate.manhattan_distance() > settings.auto_hide_edge_distance_threshold
                    && {
                        let span = candidate.span();
                        drawn.iter().any(|existing| {
                            dice_score(&span, existing) > settings.auto_hide_edge_overlap_threshold
                        })
                    }
            }
        },
    }
}

/// Decide visibility, color and route for every candidate.
///
/// With auto-hide on, candidates are processed shortest first and each one's
/// span is registered so later, longer edges duplicating it get hidden. The
/// multicolor index follows the input order.
pub fn plan_edges(
    candidates: &[EdgeCandidate],
    pass: &EdgePass,
    settings: &CanvasSettings,
    theme: &Theme,
) -> Vec<PlannedEdge> {
    let hue_count = if pass.multicolor {
        pass.multicolor_count.max(1)
    } else {
        1
    };
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    if pass.auto_hide {
        order.sort_by(|&a, &b| {
            candidates[a]
                .manhattan_distance()
                .total_cmp(&candidates[b].manhattan_distance())
        });
    }

    let mut drawn: Vec<Rect> = Vec::new();
    let mut planned = Vec::with_capacity(candidates.len());
    for index in order {
        let candidate = &candidates[index];
        let hidden = !candidate.comment && is_hidden(candidate, pass, settings, &drawn);

        let mut source = candidate.source_range;
        let mut target = candidate.target_range;
        tighten(&mut source, &mut target);

        let (style, arrows) = if hidden {
            (
                EdgeStyle {
                    color: theme.hidden_edge,
                    width: HIDDEN_EDGE_WIDTH,
                    dashed: true,
                    arrow_head: false,
                },
                false,
            )
        } else {
            let color = if candidate.comment {
                theme.comment_edge
            } else if pass.multicolor {
                theme.multicolor(index, hue_count)
            } else {
                theme.compatibility_color(candidate.compatibility)
            };
            let arrows = pass.arrows && settings.draw_arrow_heads;
            (
                EdgeStyle {
                    color,
                    width: pass.width,
                    dashed: candidate.comment,
                    arrow_head: arrows,
                },
                arrows,
            )
        };

        let points = route(
            candidate.shape,
            source.point(),
            candidate.source_bounds,
            target.point(),
            pass.buffer,
            arrows,
        );
        if pass.auto_hide {
            drawn.push(candidate.span());
        }
        planned.push(PlannedEdge {
            source: candidate.source,
            target: candidate.target,
            points,
            style,
            hidden,
            comment: candidate.comment,
            label: candidate.label.clone(),
        });
    }
    planned
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn rect_strategy() -> impl Strategy<Value = Rect> {
        (0.0f32..500.0, 0.0f32..500.0, 0.0f32..300.0, 0.0f32..300.0)
            .prop_map(|(x, y, w, h)| Rect::from_pos_size(Vec2::new(x, y), Vec2::new(w, h)))
    }

    proptest! {
        #[test]
        fn prop_dice_is_symmetric(a in rect_strategy(), b in rect_strategy()) {
            let ab = dice_score(&a, &b);
            let ba = dice_score(&b, &a);
            prop_assert!((ab - ba).abs() < 1e-5);
            prop_assert!((0.0..=1.0 + 1e-5).contains(&ab));
        }

        #[test]
        fn prop_dice_identity(a in rect_strategy()) {
            prop_assert!((dice_score(&a, &a) - 1.0).abs() < 1e-5);
        }

        #[test]
        fn prop_tightened_centers_stay_in_range(
            (ac, ah) in (0.0f32..500.0, 0.0f32..100.0),
            (bc, bh) in (0.0f32..500.0, 0.0f32..100.0),
        ) {
            let mut a = PortRange { y: 0.0, center: ac, min: ac - ah, max: ac + ah };
            let mut b = PortRange { y: 100.0, center: bc, min: bc - bh, max: bc + bh };
            tighten(&mut a, &mut b);
            prop_assert!(a.center >= a.min && a.center <= a.max);
            prop_assert!(b.center >= b.min && b.center <= b.max);
        }
    }
}
