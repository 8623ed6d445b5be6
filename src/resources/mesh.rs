//! Text mesh parsing.
//!
//! Meshes are stored in the OBJ text format: `v`, `vt` and `vn` lines fill
//! three separate index spaces, and each `f` line lists corners as
//! `position/texcoord/normal` triples of 1-based indices. Faces are
//! fan-triangulated and written out as a flat, non-indexed list of
//! interleaved vertices (position, texcoord, normal).
//!
//! Parsing is split in two steps so each is testable on its own:
//! [`parse_line`] turns a line into an [`ObjLine`], and [`ObjState`] resolves
//! face corners against the index spaces it has collected so far.

use crate::{data_structures::model::FLOATS_PER_VERTEX, error::MeshError};

/// A face corner as written in the file (1-based indices).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Corner {
    pub position: i64,
    pub tex_coord: i64,
    pub normal: i64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ObjLine {
    Position([f32; 3]),
    TexCoord([f32; 2]),
    Normal([f32; 3]),
    Face(Vec<Corner>),
    /// Comments, blank lines, groups, smoothing and material statements.
    Ignored,
}

pub fn parse_line(line_no: usize, line: &str) -> Result<ObjLine, MeshError> {
    let mut tokens = line.split_whitespace();
    let Some(keyword) = tokens.next() else {
        return Ok(ObjLine::Ignored);
    };
    let rest: Vec<&str> = tokens.collect();
    match keyword {
        "v" => Ok(ObjLine::Position(floats::<3>(line_no, "v", &rest)?)),
        "vt" => Ok(ObjLine::TexCoord(floats::<2>(line_no, "vt", &rest)?)),
        "vn" => Ok(ObjLine::Normal(floats::<3>(line_no, "vn", &rest)?)),
        "f" => {
            if rest.len() < 3 {
                return Err(MeshError::DegenerateFace {
                    line: line_no,
                    found: rest.len(),
                });
            }
            rest.iter()
                .map(|corner| parse_corner(line_no, corner))
                .collect::<Result<Vec<_>, _>>()
                .map(ObjLine::Face)
        }
        _ => Ok(ObjLine::Ignored),
    }
}

/// Reads the first `N` values. Extra trailing values (a `w` component, a
/// third texture coordinate) are dropped so the vertex stride stays fixed.
fn floats<const N: usize>(
    line: usize,
    keyword: &'static str,
    tokens: &[&str],
) -> Result<[f32; N], MeshError> {
    if tokens.len() < N {
        return Err(MeshError::TokenCount {
            line,
            keyword,
            expected: N,
            found: tokens.len(),
        });
    }
    let mut values = [0.0; N];
    for (value, token) in values.iter_mut().zip(tokens) {
        *value = token.parse().map_err(|_| MeshError::BadNumber {
            line,
            token: token.to_string(),
        })?;
    }
    Ok(values)
}

fn parse_corner(line: usize, corner: &str) -> Result<Corner, MeshError> {
    let bad_corner = || MeshError::BadCorner {
        line,
        corner: corner.to_string(),
    };
    let parts: Vec<&str> = corner.split('/').collect();
    let [position, tex_coord, normal] = parts.as_slice() else {
        return Err(bad_corner());
    };
    let index = |token: &str| token.parse::<i64>().map_err(|_| bad_corner());
    Ok(Corner {
        position: index(*position)?,
        tex_coord: index(*tex_coord)?,
        normal: index(*normal)?,
    })
}

/// Splits a convex polygon into triangles that all share its first corner.
pub fn fan_triangulate<T: Copy>(corners: &[T]) -> Vec<[T; 3]> {
    if corners.len() < 3 {
        return Vec::new();
    }
    (0..corners.len() - 2)
        .map(|i| [corners[0], corners[i + 1], corners[i + 2]])
        .collect()
}

/// Index spaces seen so far and the interleaved output.
#[derive(Debug, Default)]
pub struct ObjState {
    positions: Vec<[f32; 3]>,
    tex_coords: Vec<[f32; 2]>,
    normals: Vec<[f32; 3]>,
    vertices: Vec<f32>,
}

impl ObjState {
    pub fn feed(&mut self, line_no: usize, line: ObjLine) -> Result<(), MeshError> {
        match line {
            ObjLine::Position(p) => self.positions.push(p),
            ObjLine::TexCoord(t) => self.tex_coords.push(t),
            ObjLine::Normal(n) => self.normals.push(n),
            ObjLine::Face(corners) => {
                for triangle in fan_triangulate(&corners) {
                    for corner in triangle {
                        self.emit(line_no, corner)?;
                    }
                }
            }
            ObjLine::Ignored => (),
        }
        Ok(())
    }

    fn emit(&mut self, line: usize, corner: Corner) -> Result<(), MeshError> {
        let position = lookup(&self.positions, line, "position", corner.position)?;
        let tex_coord = lookup(&self.tex_coords, line, "texcoord", corner.tex_coord)?;
        let normal = lookup(&self.normals, line, "normal", corner.normal)?;
        self.vertices.extend_from_slice(&position);
        self.vertices.extend_from_slice(&tex_coord);
        self.vertices.extend_from_slice(&normal);
        Ok(())
    }

    pub fn finish(self) -> Vec<f32> {
        self.vertices
    }
}

fn lookup<T: Copy>(
    space: &[T],
    line: usize,
    name: &'static str,
    index: i64,
) -> Result<T, MeshError> {
    index
        .checked_sub(1)
        .and_then(|i| usize::try_from(i).ok())
        .and_then(|i| space.get(i).copied())
        .ok_or(MeshError::IndexOutOfRange {
            line,
            space: name,
            index,
            len: space.len(),
        })
}

/// Parses a whole mesh description into interleaved vertex floats.
pub fn parse_obj(text: &str) -> Result<Vec<f32>, MeshError> {
    let mut state = ObjState::default();
    for (i, line) in text.lines().enumerate() {
        let line_no = i + 1;
        let parsed = parse_line(line_no, line)?;
        state.feed(line_no, parsed)?;
    }
    let vertices = state.finish();
    debug_assert_eq!(vertices.len() % FLOATS_PER_VERTEX, 0);
    Ok(vertices)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CUBE: &str = include_str!("../../assets/models/cube.obj");

    #[test]
    fn cube_of_quads_has_36_vertices() {
        let floats = parse_obj(CUBE).unwrap();
        assert_eq!(floats.len(), 36 * FLOATS_PER_VERTEX);
        assert_eq!(floats.len() / FLOATS_PER_VERTEX, 36);
    }

    #[test]
    fn pentagon_fans_into_three_triangles_around_corner_zero() {
        let triangles = fan_triangulate(&[0, 1, 2, 3, 4]);
        assert_eq!(triangles, vec![[0, 1, 2], [0, 2, 3], [0, 3, 4]]);
        assert!(triangles.iter().all(|t| t[0] == 0));
    }

    #[test]
    fn fewer_than_three_corners_make_no_triangles() {
        assert!(fan_triangulate(&[7, 8]).is_empty());
    }

    #[test]
    fn corners_are_interleaved_in_order() {
        let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
vt 0.5 0.25
vn 0 0 1
f 1/1/1 2/1/1 3/1/1
";
        let floats = parse_obj(text).unwrap();
        assert_eq!(
            &floats[..8],
            &[0.0, 0.0, 0.0, 0.5, 0.25, 0.0, 0.0, 1.0]
        );
        assert_eq!(&floats[8..11], &[1.0, 0.0, 0.0]);
        assert_eq!(floats.len(), 24);
    }

    #[test]
    fn comments_and_groups_are_ignored() {
        let text = "# made by hand\no thing\ns off\nusemtl none\n\nv 1 2 3 1\nvt 0 1 0\n";
        let mut state = ObjState::default();
        for (i, line) in text.lines().enumerate() {
            state.feed(i + 1, parse_line(i + 1, line).unwrap()).unwrap();
        }
        assert_eq!(state.positions, vec![[1.0, 2.0, 3.0]]);
        assert_eq!(state.tex_coords, vec![[0.0, 1.0]]);
        assert!(state.finish().is_empty());
    }

    #[test]
    fn out_of_range_index_names_the_line() {
        let text = "v 0 0 0\nvt 0 0\nvn 0 0 1\nf 1/1/1 2/1/1 1/1/1\n";
        let err = parse_obj(text).unwrap_err();
        assert_eq!(
            err,
            MeshError::IndexOutOfRange {
                line: 4,
                space: "position",
                index: 2,
                len: 1
            }
        );
    }

    #[test]
    fn missing_texcoord_slot_is_rejected() {
        let err = parse_line(3, "f 1//1 2//1 3//1").unwrap_err();
        assert!(matches!(err, MeshError::BadCorner { line: 3, .. }));
    }

    #[test]
    fn short_vertex_line_is_rejected() {
        let err = parse_line(1, "v 1.0 2.0").unwrap_err();
        assert_eq!(
            err,
            MeshError::TokenCount {
                line: 1,
                keyword: "v",
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn zero_index_is_out_of_range() {
        let text = "v 0 0 0\nvt 0 0\nvn 0 0 1\nf 0/1/1 1/1/1 1/1/1\n";
        assert!(matches!(
            parse_obj(text),
            Err(MeshError::IndexOutOfRange { index: 0, .. })
        ));
    }

    #[test]
    fn most_negative_index_is_out_of_range() {
        let text = "v 0 0 0\nvt 0 0\nvn 0 0 1\nf -9223372036854775808/1/1 1/1/1 1/1/1\n";
        assert_eq!(
            parse_obj(text),
            Err(MeshError::IndexOutOfRange {
                line: 4,
                space: "position",
                index: i64::MIN,
                len: 1
            })
        );
    }
}
