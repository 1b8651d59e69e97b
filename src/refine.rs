use tracing::debug;

use crate::fragment::Fragment;
use crate::model::BoundingBox;

/// Tightens an approximate table rectangle to the full extents of the
/// fragments centered inside it.
///
/// A fragment whose center sits inside but which reaches far outside pulls
/// the result with it. With no fragment inside, `approximate` comes back
/// unchanged.
#[must_use]
pub fn refine_region(fragments: &[Fragment], approximate: &BoundingBox) -> BoundingBox {
    let inside = fragments
        .iter()
        .filter(|fragment| approximate.contains(fragment.center()));

    match BoundingBox::enclosing(inside) {
        Some(refined) => {
            debug!(?approximate, ?refined, "refined region");
            refined
        }
        None => {
            debug!(?approximate, "no fragments inside region, keeping it");
            *approximate
        }
    }
}
