//! Static world geometry and a reader for the subset of the BZW map format
//! that describes boxes and team bases.
//!
//! ```text
//! # comment
//! box
//!   position 0 0 0
//!   size 10 20 5
//!   rotation 45
//! end
//! base
//!   pos -370 0 0
//!   size 30 30 0
//!   color 1
//! end
//! ```
//!
//! `size` holds half-extents; `rotation` is in degrees. The world itself is a
//! `width` x `height` square centered on the origin.

use std::path::Path;

use thiserror::Error;

use crate::geometry::{polygon_center, rotate_about, Circle, Rect};
use crate::{TeamColor, Vec2};

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("failed to read world file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: unexpected token '{token}'")]
    UnexpectedToken { line: usize, token: String },
    #[error("line {line}: '{keyword}' expects {expected} numeric values")]
    BadValue {
        line: usize,
        keyword: String,
        expected: &'static str,
    },
    #[error("line {line}: {kind} block is missing '{field}'")]
    MissingField {
        line: usize,
        kind: &'static str,
        field: &'static str,
    },
    #[error("line {line}: color index {index} is not a team color")]
    UnknownColor { line: usize, index: i64 },
    #[error("{kind} block starting on line {line} has no 'end'")]
    Unterminated { line: usize, kind: &'static str },
    #[error("more than one base for team {0}")]
    DuplicateBase(TeamColor),
}

/// A solid box. `shape` is already rotated into absolute corner coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    pub center: Vec2,
    /// Full width and height before rotation.
    pub size: Vec2,
    pub rotation: f32,
    /// Radius of a circle around `center` enclosing the box.
    pub radius: f32,
    pub shape: Vec<Vec2>,
    pub rect: Rect,
}

impl Obstacle {
    pub fn new(center: Vec2, half_size: Vec2, rotation: f32) -> Self {
        let size = half_size.scale(2.0);
        let rect = Rect::from_center(center, size.x, size.y);
        Self {
            center,
            size,
            rotation,
            radius: half_size.length(),
            shape: box_shape(&rect, rotation),
            rect,
        }
    }

    pub fn is_rotated(&self) -> bool {
        self.rotation != 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Base {
    pub color: TeamColor,
    pub center: Vec2,
    pub size: Vec2,
    pub rotation: f32,
    pub radius: f32,
    pub shape: Vec<Vec2>,
    pub rect: Rect,
}

impl Base {
    pub fn new(color: TeamColor, center: Vec2, half_size: Vec2, rotation: f32) -> Self {
        let size = half_size.scale(2.0);
        let rect = Rect::from_center(center, size.x, size.y);
        Self {
            color,
            center,
            size,
            rotation,
            radius: half_size.length(),
            shape: box_shape(&rect, rotation),
            rect,
        }
    }
}

fn box_shape(rect: &Rect, rotation: f32) -> Vec<Vec2> {
    let corners = rect.corners();
    let center = polygon_center(&corners);
    corners
        .iter()
        .map(|p| rotate_about(*p, center, rotation))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct World {
    pub width: f32,
    pub height: f32,
    pub obstacles: Vec<Obstacle>,
    pub bases: Vec<Base>,
}

impl World {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            obstacles: Vec::new(),
            bases: Vec::new(),
        }
    }

    pub fn load(path: impl AsRef<Path>, width: f32, height: f32) -> Result<Self, WorldError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| WorldError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text, width, height)
    }

    pub fn parse(text: &str, width: f32, height: f32) -> Result<Self, WorldError> {
        let mut world = World::new(width, height);
        let mut block: Option<Block> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let content = raw.split('#').next().unwrap_or("");
            let tokens: Vec<&str> = content.split_whitespace().collect();
            let Some((&keyword, values)) = tokens.split_first() else {
                continue;
            };

            if block.is_none() {
                block = match keyword {
                    "box" => Some(Block::new(BlockKind::Box, line)),
                    "base" => Some(Block::new(BlockKind::Base, line)),
                    _ => {
                        return Err(WorldError::UnexpectedToken {
                            line,
                            token: keyword.to_string(),
                        })
                    }
                };
                if let Some(extra) = values.first() {
                    return Err(WorldError::UnexpectedToken {
                        line,
                        token: extra.to_string(),
                    });
                }
                continue;
            }
            let Some(current) = block.as_mut() else {
                continue;
            };

            match keyword {
                "pos" | "position" => current.position = Some(parse_point(line, keyword, values)?),
                "size" => current.size = Some(parse_point(line, keyword, values)?),
                "rot" | "rotation" => {
                    current.rotation = parse_scalar(line, keyword, values)?.to_radians()
                }
                "color" if current.kind == BlockKind::Base => {
                    let index = values
                        .first()
                        .filter(|_| values.len() == 1)
                        .and_then(|v| v.parse::<i64>().ok())
                        .ok_or_else(|| WorldError::BadValue {
                            line,
                            keyword: keyword.to_string(),
                            expected: "one integer",
                        })?;
                    let color = usize::try_from(index)
                        .ok()
                        .and_then(TeamColor::from_index)
                        .ok_or(WorldError::UnknownColor { line, index })?;
                    current.color = Some(color);
                }
                "end" => {
                    if let Some(done) = block.take() {
                        done.finish(&mut world)?;
                    }
                }
                other => {
                    return Err(WorldError::UnexpectedToken {
                        line,
                        token: other.to_string(),
                    })
                }
            }
        }

        if let Some(open) = block {
            return Err(WorldError::Unterminated {
                line: open.start,
                kind: open.kind.name(),
            });
        }
        Ok(world)
    }

    pub fn base(&self, color: TeamColor) -> Option<&Base> {
        self.bases.iter().find(|b| b.color == color)
    }

    /// True when any part of the circle lies outside the arena.
    pub fn out_of_bounds(&self, c: Circle) -> bool {
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        c.center.x - c.radius < -half_w
            || c.center.y - c.radius < -half_h
            || c.center.x + c.radius > half_w
            || c.center.y + c.radius > half_h
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockKind {
    Box,
    Base,
}

impl BlockKind {
    fn name(self) -> &'static str {
        match self {
            BlockKind::Box => "box",
            BlockKind::Base => "base",
        }
    }
}

struct Block {
    kind: BlockKind,
    start: usize,
    position: Option<Vec2>,
    size: Option<Vec2>,
    rotation: f32,
    color: Option<TeamColor>,
}

impl Block {
    fn new(kind: BlockKind, start: usize) -> Self {
        Self {
            kind,
            start,
            position: None,
            size: None,
            rotation: 0.0,
            color: None,
        }
    }

    fn missing(&self, field: &'static str) -> WorldError {
        WorldError::MissingField {
            line: self.start,
            kind: self.kind.name(),
            field,
        }
    }

    fn finish(self, world: &mut World) -> Result<(), WorldError> {
        let position = self.position.ok_or_else(|| self.missing("position"))?;
        let size = self.size.ok_or_else(|| self.missing("size"))?;
        match self.kind {
            BlockKind::Box => world
                .obstacles
                .push(Obstacle::new(position, size, self.rotation)),
            BlockKind::Base => {
                let color = self.color.ok_or_else(|| self.missing("color"))?;
                if world.base(color).is_some() {
                    return Err(WorldError::DuplicateBase(color));
                }
                world
                    .bases
                    .push(Base::new(color, position, size, self.rotation));
            }
        }
        Ok(())
    }
}

fn parse_numbers(values: &[&str]) -> Option<Vec<f32>> {
    values.iter().map(|v| v.parse::<f32>().ok()).collect()
}

// The z component is accepted and ignored.
fn parse_point(line: usize, keyword: &str, values: &[&str]) -> Result<Vec2, WorldError> {
    match parse_numbers(values).as_deref() {
        Some([x, y]) | Some([x, y, _]) => Ok(Vec2::new(*x, *y)),
        _ => Err(WorldError::BadValue {
            line,
            keyword: keyword.to_string(),
            expected: "two or three",
        }),
    }
}

fn parse_scalar(line: usize, keyword: &str, values: &[&str]) -> Result<f32, WorldError> {
    match parse_numbers(values).as_deref() {
        Some([v]) => Ok(*v),
        _ => Err(WorldError::BadValue {
            line,
            keyword: keyword.to_string(),
            expected: "one",
        }),
    }
}
