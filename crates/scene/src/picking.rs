use foundation::PointId;

/// Default hover/click tolerance in screen units.
pub const DEFAULT_PICK_DISTANCE: f64 = 5.0;

#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    pub id: PointId,
    pub distance: f64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PickOptions {
    pub max_distance: f64,
}

impl Default for PickOptions {
    fn default() -> Self {
        Self {
            max_distance: DEFAULT_PICK_DISTANCE,
        }
    }
}

/// Nearest point to `(x, y)` by Euclidean screen distance.
///
/// Linear scan over `positions`, which the caller derives from the current
/// projection; nothing is cached between calls.
///
/// Ordering contract:
/// - Only points strictly closer than `opts.max_distance` qualify.
/// - On an exact distance tie the point encountered first wins.
/// - Positions with non-finite coordinates never qualify.
pub fn pick_nearest<'a, I>(positions: I, x: f64, y: f64, opts: PickOptions) -> Option<PickHit>
where
    I: IntoIterator<Item = (&'a PointId, [f64; 2])>,
{
    let mut best: Option<(&PointId, f64)> = None;
    let mut limit = opts.max_distance;

    for (id, pos) in positions {
        let distance = (x - pos[0]).hypot(y - pos[1]);
        if distance < limit {
            limit = distance;
            best = Some((id, distance));
        }
    }

    best.map(|(id, distance)| PickHit {
        id: id.clone(),
        distance,
    })
}
