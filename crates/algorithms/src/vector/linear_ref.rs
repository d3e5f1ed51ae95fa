//! Linear referencing along flowlines

use geo::{Coord, LineLocatePoint, LineString, Point};
use rivernet_core::vector::line_length;

/// Fraction (0..=1) of the way along `line` of the point on it closest to `point`.
///
/// Returns `None` for lines without length.
pub fn locate_fraction(line: &LineString<f64>, point: &Point<f64>) -> Option<f64> {
    if line_length(line) <= 0.0 {
        return None;
    }
    line.line_locate_point(point).map(|f| f.clamp(0.0, 1.0))
}

/// Split `line` at each of `distances` (CRS units from the first vertex).
///
/// Distances must be ascending and strictly inside the line. `n` distances
/// produce `n + 1` pieces; consecutive pieces share their cut vertex.
pub fn split_line(line: &LineString<f64>, distances: &[f64]) -> Vec<LineString<f64>> {
    let coords = &line.0;
    if coords.len() < 2 {
        return vec![line.clone()];
    }

    let mut pieces = Vec::with_capacity(distances.len() + 1);
    let mut current: Vec<Coord<f64>> = vec![coords[0]];
    let mut cuts = distances.iter().copied().peekable();
    let mut walked = 0.0;

    for pair in coords.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let step = (b.x - a.x).hypot(b.y - a.y);

        while let Some(d) = cuts.peek().copied() {
            if step <= 0.0 || d >= walked + step {
                break;
            }
            let t = ((d - walked) / step).max(0.0);
            let p = Coord {
                x: a.x + (b.x - a.x) * t,
                y: a.y + (b.y - a.y) * t,
            };
            if current.last() != Some(&p) {
                current.push(p);
            }
            pieces.push(LineString::new(std::mem::replace(&mut current, vec![p])));
            cuts.next();
        }

        if current.last() != Some(&b) {
            current.push(b);
        }
        walked += step;
    }

    // Cuts at or beyond the end from rounding still owe a piece.
    for _ in cuts {
        let end = *current.last().unwrap_or(&coords[coords.len() - 1]);
        pieces.push(LineString::new(std::mem::replace(&mut current, vec![end])));
    }

    pieces.push(LineString::new(current));
    pieces
}
