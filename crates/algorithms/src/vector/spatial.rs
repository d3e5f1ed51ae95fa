//! Extent of a set of flowlines

use geo::{coord, BoundingRect, LineString, Rect};

/// Smallest rectangle covering every line; `None` if no line has vertices.
pub fn extent<'a>(lines: impl IntoIterator<Item = &'a LineString<f64>>) -> Option<Rect<f64>> {
    lines
        .into_iter()
        .filter_map(|line| line.bounding_rect())
        .reduce(|a, b| {
            Rect::new(
                coord! { x: a.min().x.min(b.min().x), y: a.min().y.min(b.min().y) },
                coord! { x: a.max().x.max(b.max().x), y: a.max().y.max(b.max().y) },
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent() {
        let a = LineString::from(vec![(2.0, 8.0), (5.0, 1.0)]);
        let b = LineString::from(vec![(-1.0, 3.0), (4.0, 9.5)]);
        let empty = LineString::new(vec![]);
        let rect = extent([&a, &empty, &b]).unwrap();
        assert_eq!(rect.min(), coord! { x: -1.0, y: 1.0 });
        assert_eq!(rect.max(), coord! { x: 5.0, y: 9.5 });
    }

    #[test]
    fn test_no_vertices() {
        assert!(extent([&LineString::new(vec![])]).is_none());
        assert!(extent(std::iter::empty::<&LineString<f64>>()).is_none());
    }
}
