use foundation::bounds::Aabb2;
use scene::spatial::intersecting_pairs;
use tracing::{trace, warn};

/// Visibility flag per label box after hiding overlaps.
///
/// For every intersecting pair the label with the lower importance is hidden.
/// A missing importance ranks below any number, and on a tie the label later
/// in `boxes` is hidden. Hiding is decided pair by pair from the full set of
/// intersections, so a label hidden by one pair still hides its own lower
/// ranked neighbours.
///
/// `boxes` and `importances` are parallel. If their lengths differ only the
/// common prefix is resolved.
pub fn resolve(boxes: &[Aabb2], importances: &[Option<f64>]) -> Vec<bool> {
    if boxes.len() != importances.len() {
        warn!(
            boxes = boxes.len(),
            importances = importances.len(),
            "label boxes and importances differ in length"
        );
    }
    let n = boxes.len().min(importances.len());
    let boxes = &boxes[..n];

    let mut visible = vec![true; n];
    let pairs = intersecting_pairs(boxes);
    for &(first, second) in &pairs {
        if outranks(importances[second], importances[first]) {
            visible[first] = false;
        } else {
            visible[second] = false;
        }
    }

    trace!(
        labels = n,
        overlaps = pairs.len(),
        hidden = visible.iter().filter(|v| !**v).count(),
        "resolved label overlaps"
    );
    visible
}

fn outranks(a: Option<f64>, b: Option<f64>) -> bool {
    match (a.filter(|v| !v.is_nan()), b.filter(|v| !v.is_nan())) {
        (Some(a), Some(b)) => a > b,
        (Some(_), None) => true,
        (None, _) => false,
    }
}
