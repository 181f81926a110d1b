use image::{GrayImage, Luma};
use serde::{Deserialize, Serialize};

const MASK_INSIDE: Luma<u8> = Luma([255]);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Lane detection polygon in frame pixel coordinates, vertices in drawing order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct RegionOfInterest {
    points: Vec<Point>,
}

impl RegionOfInterest {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn from_pairs(pairs: &[(i32, i32)]) -> Self {
        Self::new(pairs.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// At least three vertices, not all on one line. Self-intersecting
    /// polygons pass; even-odd filling handles them.
    pub fn is_valid(&self) -> bool {
        if self.points.len() < 3 {
            return false;
        }

        let origin = self.points[0];
        let Some(axis) = self.points.iter().copied().find(|p| *p != origin) else {
            return false;
        };

        self.points
            .iter()
            .any(|p| cross(origin, axis, *p) != 0)
    }

    /// `(min_x, min_y, max_x, max_y)` of the vertices.
    pub fn bounds(&self) -> Option<(i32, i32, i32, i32)> {
        let first = self.points.first()?;
        Some(self.points.iter().fold(
            (first.x, first.y, first.x, first.y),
            |(min_x, min_y, max_x, max_y), p| {
                (min_x.min(p.x), min_y.min(p.y), max_x.max(p.x), max_y.max(p.y))
            },
        ))
    }

    /// Even-odd point-in-polygon test.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if self.points.len() < 3 {
            return false;
        }

        let mut inside = false;
        let mut j = self.points.len() - 1;
        for i in 0..self.points.len() {
            let (xi, yi) = (self.points[i].x as f64, self.points[i].y as f64);
            let (xj, yj) = (self.points[j].x as f64, self.points[j].y as f64);
            if (yi > y) != (yj > y) {
                let cross_x = xi + (y - yi) * (xj - xi) / (yj - yi);
                if x < cross_x {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    /// Rasterises the polygon into a `width`×`height` mask: 255 where the
    /// pixel centre lies inside, 0 elsewhere. Vertices outside the frame are
    /// clipped.
    pub fn mask(&self, width: u32, height: u32) -> GrayImage {
        let mut mask = GrayImage::new(width, height);
        if self.points.len() < 3 {
            return mask;
        }

        let mut crossings: Vec<f64> = Vec::with_capacity(self.points.len());
        for row in 0..height {
            let yc = row as f64 + 0.5;
            crossings.clear();

            let mut j = self.points.len() - 1;
            for i in 0..self.points.len() {
                let (xi, yi) = (self.points[i].x as f64, self.points[i].y as f64);
                let (xj, yj) = (self.points[j].x as f64, self.points[j].y as f64);
                if (yi > yc) != (yj > yc) {
                    crossings.push(xi + (yc - yi) * (xj - xi) / (yj - yi));
                }
                j = i;
            }
            crossings.sort_by(|a, b| a.total_cmp(b));

            for span in crossings.chunks_exact(2) {
                // Pixel centre x + 0.5 must fall in [span[0], span[1]).
                let start = (span[0] - 0.5).ceil().max(0.0);
                let end = (span[1] - 0.5).ceil().min(width as f64);
                if start >= end {
                    continue;
                }
                for col in start as u32..end as u32 {
                    mask.put_pixel(col, row, MASK_INSIDE);
                }
            }
        }

        mask
    }
}

fn cross(o: Point, a: Point, b: Point) -> i64 {
    let (ax, ay) = (a.x as i64 - o.x as i64, a.y as i64 - o.y as i64);
    let (bx, by) = (b.x as i64 - o.x as i64, b.y as i64 - o.y as i64);
    ax * by - ay * bx
}
