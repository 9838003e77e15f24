//! Camera constraint policy
//!
//! The view only follows the player once they climb above y = 0. Below that
//! the shell keeps its starting frame.

use glam::Vec2;

use crate::consts::*;

/// Camera centre for a player position, or None when the camera should hold still
pub fn camera_centre(player: Vec2) -> Option<Vec2> {
    if player.y <= 0.0 {
        return None;
    }
    Some(Vec2::new(
        player.x.clamp(CAMERA_MIN_X, CAMERA_MAX_X),
        // Never binds after the guard above; kept as the view's lower clamp
        player.y.max(CAMERA_MIN_Y),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holds_below_zero() {
        assert_eq!(camera_centre(Vec2::new(3.0, -7.0)), None);
        assert_eq!(camera_centre(Vec2::new(3.0, 0.0)), None);
    }

    #[test]
    fn test_follows_vertically_only() {
        assert_eq!(camera_centre(Vec2::new(8.0, 12.5)), Some(Vec2::new(0.0, 12.5)));
        assert_eq!(camera_centre(Vec2::new(-8.0, 0.5)), Some(Vec2::new(0.0, 0.5)));
    }
}
