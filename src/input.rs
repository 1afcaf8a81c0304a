use glam::Vec2;
use serde::Deserialize;

/// Held movement keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MoveInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

impl MoveInput {
    /// Unit movement direction; forward is -y. Opposing keys cancel.
    pub fn direction(&self) -> Vec2 {
        let mut dir = Vec2::ZERO;
        if self.forward {
            dir.y -= 1.0;
        }
        if self.backward {
            dir.y += 1.0;
        }
        if self.left {
            dir.x -= 1.0;
        }
        if self.right {
            dir.x += 1.0;
        }
        dir.normalize_or_zero()
    }

    pub fn is_idle(&self) -> bool {
        self.direction() == Vec2::ZERO
    }
}

/// Everything the local player does in one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TickInput {
    pub movement: MoveInput,
    /// World point the player swings at, if attacking this tick.
    pub attack_at: Option<Vec2>,
}

impl TickInput {
    pub fn moving(movement: MoveInput) -> Self {
        Self {
            movement,
            attack_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_points_up_screen() {
        let input = MoveInput {
            forward: true,
            ..MoveInput::default()
        };
        assert_eq!(input.direction(), Vec2::new(0.0, -1.0));
    }

    #[test]
    fn diagonals_are_normalised() {
        let input = MoveInput {
            backward: true,
            right: true,
            ..MoveInput::default()
        };
        assert!((input.direction().length() - 1.0).abs() < 1e-6);
        assert!(input.direction().x > 0.0 && input.direction().y > 0.0);
    }

    #[test]
    fn opposing_keys_cancel() {
        let input = MoveInput {
            forward: true,
            backward: true,
            left: true,
            right: true,
        };
        assert!(input.is_idle());
    }
}
