//! Flat point buffer -> per-barcode quadrilaterals

use crate::source::Point;

/// One barcode's closed boundary: four corners in the winding order the
/// detector established. Reordering them could invert the winding and draw
/// a self-intersecting outline, so they pass through untouched.
pub type Quad = [Point; 4];

/// Split a detector's flat corner buffer into one [`Quad`] per detection.
///
/// Rows `4i..4i+4` become detection `i`'s corners, source order preserved.
/// An empty buffer, or any buffer whose length is not exactly
/// `4 * detections`, yields an empty result: malformed detector output is an
/// expected "nothing found" case, not an error.
pub fn assemble_quads(points: &[Point], detections: usize) -> Vec<Quad> {
    if detections == 0 || points.len() != detections * 4 {
        return Vec::new();
    }

    points
        .chunks_exact(4)
        .map(|corners| [corners[0], corners[1], corners[2], corners[3]])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn empty_input_yields_empty_output() {
        assert!(assemble_quads(&[], 0).is_empty());
        // Pure and deterministic
        assert_eq!(assemble_quads(&[], 0), assemble_quads(&[], 0));
    }

    #[test]
    fn three_detections_from_twelve_rows() {
        let points: Vec<Point> = (0..12).map(|i| p(i as f32, i as f32 * 2.0)).collect();
        let quads = assemble_quads(&points, 3);

        assert_eq!(quads.len(), 3);
        for (i, quad) in quads.iter().enumerate() {
            // Corner order must survive exactly as the buffer's row order
            for (j, corner) in quad.iter().enumerate() {
                let row = (i * 4 + j) as f32;
                assert_eq!(*corner, p(row, row * 2.0));
            }
        }
    }

    #[test]
    fn row_count_not_multiple_of_four_is_ignored() {
        let points = vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)];
        assert!(assemble_quads(&points, 1).is_empty());
    }

    #[test]
    fn count_and_buffer_mismatch_is_ignored() {
        let points: Vec<Point> = (0..8).map(|i| p(i as f32, 0.0)).collect();
        // 8 rows claim 2 detections, not 1 or 3
        assert!(assemble_quads(&points, 1).is_empty());
        assert!(assemble_quads(&points, 3).is_empty());
        assert_eq!(assemble_quads(&points, 2).len(), 2);
    }

    #[test]
    fn single_quad_preserves_winding() {
        let points = vec![p(10.0, 10.0), p(50.0, 10.0), p(50.0, 40.0), p(10.0, 40.0)];
        let quads = assemble_quads(&points, 1);
        assert_eq!(quads, vec![[points[0], points[1], points[2], points[3]]]);
    }
}
