//! Vertex welding on a hashed grid of `epsilon`-sized buckets.

use std::collections::HashMap;

use nurbkit_math::Point3;

type BucketKey = (i64, i64, i64);

/// Grid index of one coordinate, or `None` when it is not finite.
fn quantize(value: f64, inv_epsilon: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let q = (value * inv_epsilon).floor();
    Some(q.clamp(i64::MIN as f64, i64::MAX as f64) as i64)
}

/// Merges points closer than `epsilon`, assigning indices in first-seen order.
pub(crate) struct VertexWelder {
    epsilon: f64,
    inv_epsilon: f64,
    buckets: HashMap<BucketKey, Vec<u32>>,
    vertices: Vec<Point3>,
}

impl VertexWelder {
    pub(crate) fn new(epsilon: f64) -> Self {
        Self {
            epsilon,
            inv_epsilon: 1.0 / epsilon,
            buckets: HashMap::new(),
            vertices: Vec::new(),
        }
    }

    fn key(&self, p: Point3) -> Option<BucketKey> {
        Some((
            quantize(p.x, self.inv_epsilon)?,
            quantize(p.y, self.inv_epsilon)?,
            quantize(p.z, self.inv_epsilon)?,
        ))
    }

    /// First vertex within `epsilon` of `p` in the 27 buckets around `key`.
    fn find(&self, key: BucketKey, p: Point3) -> Option<u32> {
        for dx in -1i64..=1 {
            for dy in -1i64..=1 {
                for dz in -1i64..=1 {
                    let lookup = (
                        key.0.saturating_add(dx),
                        key.1.saturating_add(dy),
                        key.2.saturating_add(dz),
                    );
                    let Some(candidates) = self.buckets.get(&lookup) else {
                        continue;
                    };
                    let found = candidates
                        .iter()
                        .copied()
                        .find(|&c| self.vertices[c as usize].distance(p) <= self.epsilon);
                    if found.is_some() {
                        return found;
                    }
                }
            }
        }
        None
    }

    /// Index of `p`, inserting it if no vertex lies within `epsilon`.
    /// Points with a non-finite coordinate are never merged.
    pub(crate) fn insert(&mut self, p: Point3) -> u32 {
        let key = self.key(p);
        if let Some(index) = key.and_then(|key| self.find(key, p)) {
            return index;
        }

        let index = self.vertices.len() as u32;
        self.vertices.push(p);
        if let Some(key) = key {
            self.buckets.entry(key).or_default().push(index);
        }
        index
    }

    pub(crate) fn into_vertices(self) -> Vec<Point3> {
        self.vertices
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nurbkit_math::dvec3;

    #[test]
    fn test_merges_coincident_points() {
        let mut welder = VertexWelder::new(1e-9);
        let a = welder.insert(dvec3(1.0, 2.0, 3.0));
        let b = welder.insert(dvec3(4.0, 5.0, 6.0));
        let c = welder.insert(dvec3(1.0, 2.0, 3.0 + 1e-12));
        assert_eq!((a, b, c), (0, 1, 0));
        assert_eq!(welder.into_vertices().len(), 2);
    }

    #[test]
    fn test_keeps_distinct_points() {
        let mut welder = VertexWelder::new(1e-9);
        welder.insert(dvec3(0.0, 0.0, 0.0));
        welder.insert(dvec3(1e-6, 0.0, 0.0));
        assert_eq!(welder.into_vertices().len(), 2);
    }

    #[test]
    fn test_merges_across_bucket_boundary() {
        let mut welder = VertexWelder::new(1e-3);
        // Floors land in buckets 0 and -1
        let a = welder.insert(dvec3(1e-5, 0.5, 0.5));
        let b = welder.insert(dvec3(-1e-5, 0.5, 0.5));
        assert_eq!(a, b);
    }

    #[test]
    fn test_same_bucket_but_too_far_apart() {
        let mut welder = VertexWelder::new(1e-3);
        let a = welder.insert(dvec3(0.0, 0.0, 0.0));
        let b = welder.insert(dvec3(9e-4, 9e-4, 0.0));
        assert_ne!(a, b);
    }

    #[test]
    fn test_non_finite_points_stay_separate() {
        let mut welder = VertexWelder::new(1e-9);
        let origin = welder.insert(dvec3(0.0, 0.0, 0.0));
        let nan = welder.insert(dvec3(f64::NAN, 0.0, 0.0));
        let inf = welder.insert(dvec3(f64::INFINITY, 0.0, 0.0));
        let nan_again = welder.insert(dvec3(f64::NAN, 0.0, 0.0));
        assert_eq!((origin, nan, inf, nan_again), (0, 1, 2, 3));
        assert_eq!(welder.insert(dvec3(0.0, 0.0, 0.0)), origin);
    }

    #[test]
    fn test_far_coordinates_do_not_collapse() {
        // 1e10 / 1e-9 is past i64::MAX, so every x lands in the clamped bucket
        let mut welder = VertexWelder::new(1e-9);
        let a = welder.insert(dvec3(1e10, 0.0, 0.0));
        let b = welder.insert(dvec3(1e10 + 1.0, 0.0, 0.0));
        let c = welder.insert(dvec3(1e10, 0.0, 0.0));
        assert_eq!((a, b, c), (0, 1, 0));
    }
}
