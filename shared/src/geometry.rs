//! Stateless collision tests over points, segments, circles, rectangles and
//! polygons. Polygons are ordered vertex lists; the closing edge from the last
//! vertex back to the first is implied. Every distance comparison is inclusive.

use std::f32::consts::{PI, TAU};

use crate::Vec2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub a: Vec2,
    pub b: Vec2,
}

impl Segment {
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self { a, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// Axis-aligned rectangle anchored at its lower-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    pub fn from_center(center: Vec2, w: f32, h: f32) -> Self {
        Self::new(center.x - w / 2.0, center.y - h / 2.0, w, h)
    }

    pub fn corners(&self) -> [Vec2; 4] {
        [
            Vec2::new(self.x + self.w, self.y + self.h),
            Vec2::new(self.x + self.w, self.y),
            Vec2::new(self.x, self.y),
            Vec2::new(self.x, self.y + self.h),
        ]
    }
}

/// Edges of a closed polygon, including the one from the last vertex to the first.
pub fn edges(poly: &[Vec2]) -> impl Iterator<Item = Segment> + '_ {
    poly.iter()
        .zip(poly.iter().cycle().skip(1))
        .map(|(a, b)| Segment::new(*a, *b))
}

/// Even-odd ray casting.
pub fn point_in_polygon(p: Vec2, poly: &[Vec2]) -> bool {
    if poly.len() < 3 {
        return false;
    }
    let mut inside = false;
    for edge in edges(poly) {
        let (a, b) = (edge.a, edge.b);
        if (a.y > p.y) != (b.y > p.y) {
            let cross_x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < cross_x {
                inside = !inside;
            }
        }
    }
    inside
}

pub fn closest_point_on_segment(p: Vec2, seg: Segment) -> Vec2 {
    let d = seg.b.sub(seg.a);
    let len_sq = d.dot(d);
    if len_sq == 0.0 {
        return seg.a;
    }
    let t = (p.sub(seg.a).dot(d) / len_sq).clamp(0.0, 1.0);
    seg.a.add(d.scale(t))
}

pub fn distance_to_segment(p: Vec2, seg: Segment) -> f32 {
    p.distance(closest_point_on_segment(p, seg))
}

pub fn circle_to_circle(c1: Circle, c2: Circle) -> bool {
    c1.center.distance(c2.center) <= c1.radius + c2.radius
}

pub fn circle_to_segment(c: Circle, seg: Segment) -> bool {
    distance_to_segment(c.center, seg) <= c.radius
}

pub fn circle_to_polygon(c: Circle, poly: &[Vec2]) -> bool {
    point_in_polygon(c.center, poly) || edges(poly).any(|e| circle_to_segment(c, e))
}

pub fn circle_to_rect(c: Circle, rect: &Rect) -> bool {
    circle_to_polygon(c, &rect.corners())
}

fn cross(o: Vec2, a: Vec2, b: Vec2) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn within_bounds(p: Vec2, seg: Segment) -> bool {
    p.x >= seg.a.x.min(seg.b.x)
        && p.x <= seg.a.x.max(seg.b.x)
        && p.y >= seg.a.y.min(seg.b.y)
        && p.y <= seg.a.y.max(seg.b.y)
}

/// True when the two segments share at least one point, including touching
/// endpoints and collinear overlap.
pub fn segment_to_segment(s1: Segment, s2: Segment) -> bool {
    let d1 = cross(s2.a, s2.b, s1.a);
    let d2 = cross(s2.a, s2.b, s1.b);
    let d3 = cross(s1.a, s1.b, s2.a);
    let d4 = cross(s1.a, s1.b, s2.b);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && within_bounds(s1.a, s2))
        || (d2 == 0.0 && within_bounds(s1.b, s2))
        || (d3 == 0.0 && within_bounds(s2.a, s1))
        || (d4 == 0.0 && within_bounds(s2.b, s1))
}

pub fn segment_to_polygon(seg: Segment, poly: &[Vec2]) -> bool {
    point_in_polygon(seg.a, poly)
        || point_in_polygon(seg.b, poly)
        || edges(poly).any(|e| segment_to_segment(seg, e))
}

/// Rotates `p` about `center` by `angle` radians.
pub fn rotate_about(p: Vec2, center: Vec2, angle: f32) -> Vec2 {
    let (sin, cos) = angle.sin_cos();
    let d = p.sub(center);
    Vec2::new(
        center.x + d.x * cos - d.y * sin,
        center.y + d.x * sin + d.y * cos,
    )
}

pub fn polygon_center(poly: &[Vec2]) -> Vec2 {
    if poly.is_empty() {
        return Vec2::default();
    }
    let sum = poly.iter().fold(Vec2::default(), |acc, p| acc.add(*p));
    sum.scale(1.0 / poly.len() as f32)
}

/// Wraps an angle into (-π, π].
pub fn normalize_angle(angle: f32) -> f32 {
    let a = angle.rem_euclid(TAU);
    if a > PI {
        a - TAU
    } else {
        a
    }
}

/// Wraps a heading into [0, 2π).
pub fn wrap_heading(angle: f32) -> f32 {
    let a = angle.rem_euclid(TAU);
    if a >= TAU {
        0.0
    } else {
        a
    }
}
