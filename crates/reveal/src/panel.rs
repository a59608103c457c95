use std::f32::consts::{FRAC_PI_2, PI};

use crate::layout::GridLayout;

const ARC_SEGMENTS: usize = 8;

/// Axis-aligned extent of the panel in object space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: [f32; 2],
    pub size: [f32; 2],
}

impl Bounds {
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a [f32; 3]>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut min = [first[0], first[1]];
        let mut max = min;
        for point in iter {
            min[0] = min[0].min(point[0]);
            min[1] = min[1].min(point[1]);
            max[0] = max[0].max(point[0]);
            max[1] = max[1].max(point[1]);
        }
        Some(Self {
            min,
            size: [max[0] - min[0], max[1] - min[1]],
        })
    }

    pub fn max(&self) -> [f32; 2] {
        [self.min[0] + self.size[0], self.min[1] + self.size[1]]
    }

    /// `(min.x, min.y, width, height)` as consumed by the reveal shader.
    pub fn as_uniform(&self) -> [f32; 4] {
        [self.min[0], self.min[1], self.size[0], self.size[1]]
    }
}

/// Triangulated rounded-rectangle frame: the outer outline minus a scaled inner hole.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelGeometry {
    pub vertices: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
    bounds: Bounds,
}

impl PanelGeometry {
    /// Frame for a card grid: the card area plus the corner radius on every side.
    pub fn for_layout(layout: &GridLayout, inner_factor: f32) -> Self {
        let width = layout.menu_width() + layout.margin * 2.0;
        let height = layout.menu_height() + layout.margin * 2.0;
        Self::rounded_frame(width, height, layout.margin, inner_factor)
    }

    pub fn rounded_frame(width: f32, height: f32, radius: f32, inner_factor: f32) -> Self {
        let outer = rounded_outline(width, height, radius);
        let inner = rounded_outline(width * inner_factor, height * inner_factor, radius);
        let ring = outer.len() as u32;

        let mut vertices = outer;
        vertices.extend(inner);

        let mut indices = Vec::with_capacity(ring as usize * 6);
        for i in 0..ring {
            let next = (i + 1) % ring;
            let (o0, o1) = (i, next);
            let (i0, i1) = (ring + i, ring + next);
            indices.extend_from_slice(&[o0, i0, o1, o1, i0, i1]);
        }

        let bounds = Bounds::from_points(&vertices[..ring as usize]).unwrap_or(Bounds {
            min: [0.0, 0.0],
            size: [0.0, 0.0],
        });

        Self {
            vertices,
            indices,
            bounds,
        }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Clockwise outline with quarter-circle arcs centred on the rectangle corners.
fn rounded_outline(width: f32, height: f32, radius: f32) -> Vec<[f32; 3]> {
    let (hw, hh) = (width / 2.0, height / 2.0);
    let corners = [
        ([-hw, hh], PI, FRAC_PI_2),
        ([hw, hh], FRAC_PI_2, 0.0),
        ([hw, -hh], 0.0, -FRAC_PI_2),
        ([-hw, -hh], -FRAC_PI_2, -PI),
    ];

    let mut points = Vec::with_capacity(corners.len() * (ARC_SEGMENTS + 1));
    for (center, start, end) in corners {
        for step in 0..=ARC_SEGMENTS {
            let angle = start + (end - start) * step as f32 / ARC_SEGMENTS as f32;
            points.push([
                center[0] + radius * angle.cos(),
                center[1] + radius * angle.sin(),
                0.0,
            ]);
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_cover_the_outer_arcs() {
        let geometry = PanelGeometry::rounded_frame(2.0, 1.0, 0.1, 0.9);
        let bounds = geometry.bounds();
        assert!((bounds.min[0] + 1.1).abs() < 1e-5);
        assert!((bounds.min[1] + 0.6).abs() < 1e-5);
        assert!((bounds.size[0] - 2.2).abs() < 1e-5);
        assert!((bounds.size[1] - 1.2).abs() < 1e-5);
    }

    #[test]
    fn frame_is_a_closed_ring() {
        let geometry = PanelGeometry::rounded_frame(1.0, 1.0, 0.05, 0.99);
        let ring = 4 * (ARC_SEGMENTS + 1);
        assert_eq!(geometry.vertices.len(), ring * 2);
        assert_eq!(geometry.triangle_count(), ring * 2);
        assert!(geometry
            .indices
            .iter()
            .all(|index| (*index as usize) < geometry.vertices.len()));
    }

    #[test]
    fn layout_frame_encloses_every_card() {
        let layout = GridLayout::default();
        let bounds = PanelGeometry::for_layout(&layout, 0.99).bounds();
        let max = bounds.max();
        for index in 0..layout.card_count() {
            let [x, y, _] = layout.rest_position_for_index(index).unwrap();
            assert!(x - layout.card_width / 2.0 >= bounds.min[0] - 1e-6);
            assert!(x + layout.card_width / 2.0 <= max[0] + 1e-6);
            assert!(y - layout.card_height / 2.0 >= bounds.min[1] - 1e-6);
            assert!(y + layout.card_height / 2.0 <= max[1] + 1e-6);
        }
    }

    #[test]
    fn uniform_packs_min_then_size() {
        let bounds = Bounds {
            min: [-1.0, -2.0],
            size: [2.0, 4.0],
        };
        assert_eq!(bounds.as_uniform(), [-1.0, -2.0, 2.0, 4.0]);
        assert_eq!(bounds.max(), [1.0, 2.0]);
    }
}
