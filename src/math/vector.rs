use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

use super::lerp;

/// A 2-component f32 vector.
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

/// A 3-component f32 vector.
///
/// The workhorse type for positions, directions, Euler orientations and
/// scale factors. Arithmetic is component-wise via the standard operator
/// traits; scalar multiply/divide are also provided.
///
/// # Example
///
/// ```
/// use phalanx::Vector3;
///
/// let v = Vector3::new(3.0, 0.0, 4.0);
/// assert_eq!(v.magnitude(), 5.0);
/// assert_eq!(v + Vector3::ONE, Vector3::new(4.0, 1.0, 5.0));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// A 4-component f32 vector.
///
/// Shares its representation with [`Colour`](super::Colour):
/// `(r, g, b, a)` ≡ `(x, y, z, w)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Vector4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

macro_rules! componentwise_ops {
    ($ty:ident, $($c:ident),+) => {
        impl Add for $ty {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                Self { $($c: self.$c + rhs.$c),+ }
            }
        }

        impl Sub for $ty {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                Self { $($c: self.$c - rhs.$c),+ }
            }
        }

        impl Mul for $ty {
            type Output = Self;
            fn mul(self, rhs: Self) -> Self {
                Self { $($c: self.$c * rhs.$c),+ }
            }
        }

        impl Div for $ty {
            type Output = Self;
            fn div(self, rhs: Self) -> Self {
                Self { $($c: self.$c / rhs.$c),+ }
            }
        }

        impl Mul<f32> for $ty {
            type Output = Self;
            fn mul(self, rhs: f32) -> Self {
                Self { $($c: self.$c * rhs),+ }
            }
        }

        impl Div<f32> for $ty {
            type Output = Self;
            fn div(self, rhs: f32) -> Self {
                Self { $($c: self.$c / rhs),+ }
            }
        }

        impl Neg for $ty {
            type Output = Self;
            fn neg(self) -> Self {
                Self { $($c: -self.$c),+ }
            }
        }

        impl AddAssign for $ty {
            fn add_assign(&mut self, rhs: Self) {
                $(self.$c += rhs.$c;)+
            }
        }

        impl SubAssign for $ty {
            fn sub_assign(&mut self, rhs: Self) {
                $(self.$c -= rhs.$c;)+
            }
        }

        impl $ty {
            /// All components zero.
            pub const ZERO: Self = Self { $($c: 0.0),+ };
            /// All components one.
            pub const ONE: Self = Self { $($c: 1.0),+ };

            /// A vector with every component set to `v`.
            pub fn splat(v: f32) -> Self {
                Self { $($c: v),+ }
            }

            /// Component-wise dot product.
            pub fn dot(self, rhs: Self) -> f32 {
                let mut acc = 0.0;
                $(acc += self.$c * rhs.$c;)+
                acc
            }

            /// Squared Euclidean length. Cheaper than [`magnitude`](Self::magnitude)
            /// when only comparisons are needed.
            pub fn magnitude_squared(self) -> f32 {
                self.dot(self)
            }

            /// Euclidean length.
            pub fn magnitude(self) -> f32 {
                self.magnitude_squared().sqrt()
            }

            /// Scales the vector to unit length in place, returning `self`
            /// for chaining. The zero vector is a caller precondition
            /// violation and is left unchanged.
            pub fn normalise(&mut self) -> &mut Self {
                let len = self.magnitude();
                if len > 0.0 {
                    $(self.$c /= len;)+
                }
                self
            }

            /// A unit-length copy of this vector.
            pub fn normalised(self) -> Self {
                let mut out = self;
                out.normalise();
                out
            }

            /// Replaces each component with the reciprocal `1 / c`.
            pub fn invert(&mut self) -> &mut Self {
                $(self.$c = 1.0 / self.$c;)+
                self
            }

            /// Applies `f` to every component in place.
            pub fn map(&mut self, f: impl Fn(f32) -> f32) -> &mut Self {
                $(self.$c = f(self.$c);)+
                self
            }

            /// Sum of all components.
            pub fn sum(self) -> f32 {
                let mut acc = 0.0;
                $(acc += self.$c;)+
                acc
            }

            /// Component-wise linear interpolation toward `target`.
            pub fn lerp(self, target: Self, t: f32) -> Self {
                Self { $($c: lerp(self.$c, target.$c, t)),+ }
            }
        }
    };
}

componentwise_ops!(Vector2, x, y);
componentwise_ops!(Vector3, x, y, z);
componentwise_ops!(Vector4, x, y, z, w);

impl Vector2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn to_array(self) -> [f32; 2] {
        [self.x, self.y]
    }
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// The right-handed cross product `self × rhs`.
    pub fn cross(self, rhs: Self) -> Self {
        Self {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl Vector4 {
    pub fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Drops the `w` component.
    pub fn truncate(self) -> Vector3 {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.x, self.y, self.z, self.w]
    }
}

impl From<Vector2> for [f32; 2] {
    fn from(v: Vector2) -> Self {
        v.to_array()
    }
}

impl From<Vector3> for [f32; 3] {
    fn from(v: Vector3) -> Self {
        v.to_array()
    }
}

impl From<Vector4> for [f32; 4] {
    fn from(v: Vector4) -> Self {
        v.to_array()
    }
}

impl From<[f32; 3]> for Vector3 {
    fn from(a: [f32; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_is_independent() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        let mut copy = v;
        copy.x = 9.0;
        assert_eq!(v, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(copy, Vector3::new(9.0, 2.0, 3.0));
    }

    #[test]
    fn componentwise_arithmetic() {
        let a = Vector3::new(1.0, 2.0, 3.0);
        let b = Vector3::new(4.0, 5.0, 6.0);
        assert_eq!(a + b, Vector3::new(5.0, 7.0, 9.0));
        assert_eq!(b - a, Vector3::new(3.0, 3.0, 3.0));
        assert_eq!(a * b, Vector3::new(4.0, 10.0, 18.0));
        assert_eq!(b / a, Vector3::new(4.0, 2.5, 2.0));
        assert_eq!(-a, Vector3::new(-1.0, -2.0, -3.0));
        assert_eq!(a * 2.0, Vector3::new(2.0, 4.0, 6.0));
    }

    #[test]
    fn dot_and_magnitude() {
        let a = Vector3::new(1.0, 0.0, 0.0);
        let b = Vector3::new(0.0, 1.0, 0.0);
        assert_eq!(a.dot(b), 0.0);
        assert_eq!(Vector3::new(3.0, 4.0, 0.0).magnitude(), 5.0);
        assert_eq!(Vector3::new(3.0, 4.0, 0.0).magnitude_squared(), 25.0);
    }

    #[test]
    fn normalise_unit_length() {
        let mut v = Vector3::new(0.0, 3.0, 4.0);
        v.normalise();
        assert!((v.magnitude() - 1.0).abs() < 1e-6);
        assert_eq!(v, Vector3::new(0.0, 0.6, 0.8));
    }

    #[test]
    fn cross_follows_right_hand_rule() {
        let x = Vector3::new(1.0, 0.0, 0.0);
        let y = Vector3::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(y), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(y.cross(x), Vector3::new(0.0, 0.0, -1.0));
    }

    #[test]
    fn invert_is_reciprocal() {
        let mut v = Vector3::new(2.0, 4.0, 0.5);
        v.invert();
        assert_eq!(v, Vector3::new(0.5, 0.25, 2.0));
    }

    #[test]
    fn lerp_endpoints_and_midpoint() {
        let a = Vector3::ZERO;
        let b = Vector3::new(2.0, 4.0, 6.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Vector3::new(1.0, 2.0, 3.0));
    }
}
