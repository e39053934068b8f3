//! Typed translation/rotation/scale transform owned by chunks

use super::types::{Mat4, Quat, Vec3};

/// Translation, rotation and scale with a change flag for lazy model updates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    translation: Vec3,
    rotation: Quat,
    scale: Vec3,
    has_changed: bool,
}

impl Transform {
    /// Create a transform at `translation` with no rotation and unit scale
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            has_changed: true,
        }
    }

    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Move the transform, flagging the model matrix as stale
    pub fn set_translation(&mut self, translation: Vec3) {
        if self.translation != translation {
            self.translation = translation;
            self.has_changed = true;
        }
    }

    pub fn has_changed(&self) -> bool {
        self.has_changed
    }

    pub fn clear_changed(&mut self) {
        self.has_changed = false;
    }

    /// Model matrix (scale, then rotate, then translate)
    pub fn model(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::from_translation(Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_is_translation() {
        let t = Transform::from_translation(Vec3::new(16.0, 0.0, -32.0));
        let p = t.model().transform_point3(Vec3::ZERO);
        assert_eq!(p, Vec3::new(16.0, 0.0, -32.0));
    }

    #[test]
    fn test_change_flag() {
        let mut t = Transform::default();
        assert!(t.has_changed());
        t.clear_changed();

        t.set_translation(Vec3::ZERO);
        assert!(!t.has_changed(), "same translation must not flag a change");

        t.set_translation(Vec3::X);
        assert!(t.has_changed());
    }
}
