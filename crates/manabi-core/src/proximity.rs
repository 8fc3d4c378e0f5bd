//! Proximity evaluation and the quiz view it drives.

use crate::geo::{format_distance, haversine_m};
use crate::models::{Checkpoint, LatLng};

/// Shown instead of quiz content when no checkpoint is in range.
pub const NO_CHECKPOINT_HINT: &str = "Walk to a nearby checkpoint to unlock its quiz.";

/// A checkpoint the user is standing inside, with the measured distance.
#[derive(Debug, Clone, PartialEq)]
pub struct InRange<'a> {
    pub checkpoint: &'a Checkpoint,
    pub distance_m: f64,
}

impl InRange<'_> {
    pub fn distance_display(&self) -> String {
        format_distance(self.distance_m)
    }
}

/// Every checkpoint whose radius contains `user`, in input order.
///
/// The boundary is inclusive. An empty result is the "nothing nearby" case,
/// not an error.
pub fn evaluate<'a>(user: LatLng, checkpoints: &'a [Checkpoint]) -> Vec<InRange<'a>> {
    checkpoints
        .iter()
        .filter_map(|checkpoint| {
            let distance_m = haversine_m(user, checkpoint.location);
            (distance_m <= checkpoint.radius_m).then_some(InRange {
                checkpoint,
                distance_m,
            })
        })
        .collect()
}

/// What the quiz box shows after a fix.
#[derive(Debug, Clone, PartialEq)]
pub enum QuizView<'a> {
    Unlocked(Vec<InRange<'a>>),
    NothingNearby,
}

impl<'a> QuizView<'a> {
    pub fn for_location(user: LatLng, checkpoints: &'a [Checkpoint]) -> Self {
        let inside = evaluate(user, checkpoints);
        if inside.is_empty() {
            QuizView::NothingNearby
        } else {
            QuizView::Unlocked(inside)
        }
    }

    pub fn unlocked(&self) -> &[InRange<'a>] {
        match self {
            QuizView::Unlocked(inside) => inside,
            QuizView::NothingNearby => &[],
        }
    }
}
