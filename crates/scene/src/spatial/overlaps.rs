use aabb::HilbertRTree;
use foundation::bounds::Aabb2;

/// All index pairs `(i, j)` with `i < j` whose boxes intersect.
///
/// The indexable boxes are bulk-loaded into a Hilbert R-tree and each one is
/// queried against it, so the cost follows the number of nearby candidates
/// instead of the number of boxes sharing an x or y range. Intersections are
/// closed on both axes, matching [`Aabb2::intersects`].
///
/// Boxes with non-finite coordinates or a negative extent never intersect
/// anything.
///
/// Ordering contract:
/// - Pairs are returned in ascending `(i, j)` order, independent of the
///   order in which the tree reports candidates.
pub fn intersecting_pairs(boxes: &[Aabb2]) -> Vec<(usize, usize)> {
    let indexed: Vec<usize> = (0..boxes.len()).filter(|&i| indexable(&boxes[i])).collect();
    if indexed.len() < 2 {
        return Vec::new();
    }

    let mut tree = HilbertRTree::with_capacity(indexed.len());
    for &i in &indexed {
        let b = &boxes[i];
        tree.add(b.min[0], b.min[1], b.max[0], b.max[1]);
    }
    tree.build();

    let mut pairs: Vec<(usize, usize)> = Vec::new();
    let mut hits: Vec<usize> = Vec::new();
    for (slot, &i) in indexed.iter().enumerate() {
        let b = &boxes[i];
        hits.clear();
        tree.query_intersecting(b.min[0], b.min[1], b.max[0], b.max[1], &mut hits);

        for &other in &hits {
            // Each pair is reported from its lower slot only.
            if other <= slot {
                continue;
            }
            let Some(&j) = indexed.get(other) else {
                continue;
            };
            if b.intersects(&boxes[j]) {
                pairs.push((i, j));
            }
        }
    }

    pairs.sort_unstable();
    pairs.dedup();
    pairs
}

fn indexable(b: &Aabb2) -> bool {
    b.is_finite() && b.min[0] <= b.max[0] && b.min[1] <= b.max[1]
}

#[cfg(test)]
fn all_pairs(boxes: &[Aabb2]) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    for i in 0..boxes.len() {
        for j in (i + 1)..boxes.len() {
            if indexable(&boxes[i]) && indexable(&boxes[j]) && boxes[i].intersects(&boxes[j]) {
                out.push((i, j));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{all_pairs, intersecting_pairs};
    use foundation::bounds::Aabb2;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::time::{Duration, Instant};

    fn b(x0: f64, y0: f64, x1: f64, y1: f64) -> Aabb2 {
        Aabb2::new([x0, y0], [x1, y1])
    }

    #[test]
    fn empty_and_single_inputs_have_no_pairs() {
        assert!(intersecting_pairs(&[]).is_empty());
        assert!(intersecting_pairs(&[b(0.0, 0.0, 1.0, 1.0)]).is_empty());
    }

    #[test]
    fn reports_pairs_with_lower_index_first() {
        let boxes = [
            b(50.0, 0.0, 60.0, 10.0),
            b(0.0, 0.0, 10.0, 10.0),
            b(5.0, 5.0, 55.0, 8.0),
        ];
        assert_eq!(intersecting_pairs(&boxes), vec![(0, 2), (1, 2)]);
    }

    #[test]
    fn touching_boxes_intersect() {
        let boxes = [b(0.0, 0.0, 10.0, 10.0), b(10.0, 10.0, 20.0, 20.0)];
        assert_eq!(intersecting_pairs(&boxes), vec![(0, 1)]);
    }

    #[test]
    fn degenerate_boxes_are_skipped() {
        let boxes = [
            b(0.0, 0.0, 10.0, 10.0),
            b(f64::NAN, 0.0, 5.0, 5.0),
            b(8.0, 8.0, 2.0, 2.0),
            b(1.0, 1.0, 2.0, 2.0),
        ];
        assert_eq!(intersecting_pairs(&boxes), vec![(0, 3)]);
    }

    #[test]
    fn identical_boxes_all_intersect() {
        let boxes = vec![b(0.0, 0.0, 100.0, 20.0); 4];
        assert_eq!(
            intersecting_pairs(&boxes),
            vec![(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]
        );
    }

    #[test]
    fn matches_all_pairs_on_random_boxes() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for round in 0..20 {
            let n = 50 + round * 25;
            let boxes: Vec<Aabb2> = (0..n)
                .map(|_| {
                    // Snap to a coarse grid so exact edge contact shows up.
                    let x = rng.random_range(0..200) as f64;
                    let y = rng.random_range(0..200) as f64;
                    let w = rng.random_range(0..30) as f64;
                    let h = rng.random_range(0..15) as f64;
                    Aabb2::from_origin_size([x, y], [w, h])
                })
                .collect();
            assert_eq!(intersecting_pairs(&boxes), all_pairs(&boxes), "round {round}");
        }
    }

    fn column(n: usize) -> Vec<Aabb2> {
        (0..n)
            .map(|i| Aabb2::from_origin_size([0.0, i as f64 * 20.0], [60.0, 13.0]))
            .collect()
    }

    fn timed(boxes: &[Aabb2]) -> Duration {
        let start = Instant::now();
        assert!(intersecting_pairs(boxes).is_empty());
        start.elapsed()
    }

    #[test]
    fn shared_x_range_scales_subquadratically() {
        // A column of labels shares one x-range but never overlaps.
        let small = timed(&column(10_000));
        let large = timed(&column(40_000));
        // Quadratic growth would be ~16x; allow generous slack for noise.
        assert!(
            large <= small * 10 + Duration::from_millis(50),
            "10k: {small:?}, 40k: {large:?}"
        );
    }
}
