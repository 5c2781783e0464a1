use super::vector::{Vector3, Vector4};

/// An RGBA colour with f32 channels, usually in `[0, 1]`.
///
/// Shares its memory layout with [`Vector4`]: `(r, g, b, a)` maps onto
/// `(x, y, z, w)`, so a colour can be handed to any uniform slot expecting a
/// 4-component vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Colour {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Colour {
    pub const WHITE: Self = Self::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::rgb(0.0, 0.0, 0.0);

    /// An opaque colour from RGB channels.
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// A grey with every channel set to `v`, fully opaque.
    pub fn splat(v: f32) -> Self {
        Self::rgb(v, v, v)
    }

    /// Drops the alpha channel.
    pub fn to_vector3(self) -> Vector3 {
        Vector3::new(self.r, self.g, self.b)
    }

    pub fn to_vector4(self) -> Vector4 {
        Vector4::new(self.r, self.g, self.b, self.a)
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl From<Vector4> for Colour {
    fn from(v: Vector4) -> Self {
        Self::rgba(v.x, v.y, v.z, v.w)
    }
}

impl From<Colour> for Vector4 {
    fn from(c: Colour) -> Self {
        c.to_vector4()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_layout_with_vector4() {
        let c = Colour::rgba(0.1, 0.2, 0.3, 0.4);
        assert_eq!(c.to_vector4(), Vector4::new(0.1, 0.2, 0.3, 0.4));
        assert_eq!(Colour::from(c.to_vector4()), c);
    }

    #[test]
    fn rgb_is_opaque() {
        assert_eq!(Colour::rgb(0.5, 0.5, 0.5).a, 1.0);
        assert_eq!(Colour::WHITE.to_vector3(), Vector3::ONE);
    }
}
