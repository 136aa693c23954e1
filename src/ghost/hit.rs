use crate::ghost::shell::Hitbox;

/// Finds the hitbox containing the point, if any. Coordinates are
/// surface-local: the caller divides out the display scale first. Hitboxes
/// are tested in declaration order and the first match wins, so the order
/// in the source package is the stacking order for overlapping regions.
/// Containment is inclusive on all four edges.
pub fn hit_test<'a>(hitboxes: &'a [Hitbox], x: f32, y: f32) -> Option<&'a str> {
    hitboxes
        .iter()
        .find(|hitbox| contains(hitbox, x, y))
        .map(|hitbox| hitbox.id.as_str())
}

#[inline(always)]
fn contains(hitbox: &Hitbox, x: f32, y: f32) -> bool {
    let [x1, y1, x2, y2] = hitbox.rect;
    x >= x1 as f32 && x <= x2 as f32 && y >= y1 as f32 && y <= y2 as f32
}
