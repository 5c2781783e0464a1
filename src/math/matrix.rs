use std::ops::Mul;

use super::vector::Vector3;

/// A 4×4 f32 matrix in column-major order.
///
/// Element `(row, col)` lives at index `col * 4 + row`, matching OpenGL /
/// WGSL `mat4x4<f32>` conventions, so the raw array can be uploaded to a
/// uniform buffer as-is.
///
/// Composition order matters: `multiply` post-multiplies
/// (`self = self × rhs`) while `multiply_left` pre-multiplies
/// (`self = lhs × self`). The two are *not* interchangeable; scene-graph
/// transform propagation depends on the exact order.
///
/// # Example
///
/// ```
/// use phalanx::{Matrix4, Vector3};
///
/// let mut m = Matrix4::IDENTITY;
/// m.translate(Vector3::new(1.0, 2.0, 3.0))
///     .scale(Vector3::splat(2.0));
///
/// let p = m.transform_point(Vector3::ONE);
/// assert_eq!(p, Vector3::new(3.0, 4.0, 5.0));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
#[repr(C)]
pub struct Matrix4 {
    /// Column-major elements.
    pub elements: [f32; 16],
}

impl Default for Matrix4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix4 {
    /// The identity matrix.
    pub const IDENTITY: Self = Self {
        elements: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, 0.0, 1.0,
        ],
    };

    /// Builds a matrix from raw column-major elements.
    pub fn from_elements(elements: [f32; 16]) -> Self {
        Self { elements }
    }

    /// A pure translation matrix.
    pub fn translation(v: Vector3) -> Self {
        let mut m = Self::IDENTITY;
        m.elements[12] = v.x;
        m.elements[13] = v.y;
        m.elements[14] = v.z;
        m
    }

    /// A rotation of `angle` radians around `axis` (which need not be
    /// normalised).
    pub fn rotation(angle: f32, axis: Vector3) -> Self {
        let a = axis.normalised();
        let (s, c) = angle.sin_cos();
        let t = 1.0 - c;
        let (x, y, z) = (a.x, a.y, a.z);

        Self::from_elements([
            x * x * t + c,
            y * x * t + z * s,
            z * x * t - y * s,
            0.0,
            x * y * t - z * s,
            y * y * t + c,
            z * y * t + x * s,
            0.0,
            x * z * t + y * s,
            y * z * t - x * s,
            z * z * t + c,
            0.0,
            0.0,
            0.0,
            0.0,
            1.0,
        ])
    }

    /// A non-uniform scaling matrix.
    pub fn scaling(v: Vector3) -> Self {
        let mut m = Self::IDENTITY;
        m.elements[0] = v.x;
        m.elements[5] = v.y;
        m.elements[10] = v.z;
        m
    }

    /// A right-handed perspective projection with `[0, 1]` clip depth, the
    /// range wgpu clips against.
    ///
    /// `fovy` is the vertical field of view in radians. Depth maps linearly
    /// in `1/z` with near at 0 and far at 1; no reversed-Z.
    pub fn perspective(fovy: f32, aspect: f32, near: f32, far: f32) -> Self {
        let f = 1.0 / (fovy / 2.0).tan();
        let nf = 1.0 / (near - far);

        Self::from_elements([
            f / aspect,
            0.0,
            0.0,
            0.0,
            0.0,
            f,
            0.0,
            0.0,
            0.0,
            0.0,
            far * nf,
            -1.0,
            0.0,
            0.0,
            far * near * nf,
            0.0,
        ])
    }

    /// A right-handed view matrix looking from `eye` toward `target`.
    ///
    /// The basis is: forward = normalise(target − eye), right =
    /// normalise(forward × up), and the true up is recomputed as
    /// right × forward. The result transforms world space into camera space.
    pub fn look_at(eye: Vector3, target: Vector3, up: Vector3) -> Self {
        let forward = (target - eye).normalised();
        let right = forward.cross(up).normalised();
        let up = right.cross(forward);

        Self::from_elements([
            right.x,
            up.x,
            -forward.x,
            0.0,
            right.y,
            up.y,
            -forward.y,
            0.0,
            right.z,
            up.z,
            -forward.z,
            0.0,
            -right.dot(eye),
            -up.dot(eye),
            forward.dot(eye),
            1.0,
        ])
    }

    /// Resets to the identity, returning `self` for chaining.
    pub fn identity(&mut self) -> &mut Self {
        *self = Self::IDENTITY;
        self
    }

    /// Right-multiplies: `self = self × rhs`.
    pub fn multiply(&mut self, rhs: &Matrix4) -> &mut Self {
        *self = *self * *rhs;
        self
    }

    /// Left-multiplies: `self = lhs × self`.
    pub fn multiply_left(&mut self, lhs: &Matrix4) -> &mut Self {
        *self = *lhs * *self;
        self
    }

    /// Composes a translation onto the current contents
    /// (`self = self × T(v)`).
    pub fn translate(&mut self, v: Vector3) -> &mut Self {
        self.multiply(&Self::translation(v))
    }

    /// Composes a rotation around `axis` onto the current contents.
    pub fn rotate(&mut self, angle: f32, axis: Vector3) -> &mut Self {
        self.multiply(&Self::rotation(angle, axis))
    }

    /// Composes a scale onto the current contents.
    pub fn scale(&mut self, v: Vector3) -> &mut Self {
        self.multiply(&Self::scaling(v))
    }

    /// Transposes in place.
    pub fn transpose(&mut self) -> &mut Self {
        let m = self.elements;
        for row in 0..4 {
            for col in 0..4 {
                self.elements[row * 4 + col] = m[col * 4 + row];
            }
        }
        self
    }

    /// Inverts in place.
    ///
    /// A singular matrix has no inverse; the contents are left unchanged in
    /// that case. Callers are expected to only invert invertible transforms.
    pub fn invert(&mut self) -> &mut Self {
        let m = &self.elements;

        let b00 = m[0] * m[5] - m[1] * m[4];
        let b01 = m[0] * m[6] - m[2] * m[4];
        let b02 = m[0] * m[7] - m[3] * m[4];
        let b03 = m[1] * m[6] - m[2] * m[5];
        let b04 = m[1] * m[7] - m[3] * m[5];
        let b05 = m[2] * m[7] - m[3] * m[6];
        let b06 = m[8] * m[13] - m[9] * m[12];
        let b07 = m[8] * m[14] - m[10] * m[12];
        let b08 = m[8] * m[15] - m[11] * m[12];
        let b09 = m[9] * m[14] - m[10] * m[13];
        let b10 = m[9] * m[15] - m[11] * m[13];
        let b11 = m[10] * m[15] - m[11] * m[14];

        let det = b00 * b11 - b01 * b10 + b02 * b09 + b03 * b08 - b04 * b07 + b05 * b06;
        if det == 0.0 {
            return self;
        }
        let det = 1.0 / det;

        self.elements = [
            (m[5] * b11 - m[6] * b10 + m[7] * b09) * det,
            (m[2] * b10 - m[1] * b11 - m[3] * b09) * det,
            (m[13] * b05 - m[14] * b04 + m[15] * b03) * det,
            (m[10] * b04 - m[9] * b05 - m[11] * b03) * det,
            (m[6] * b08 - m[4] * b11 - m[7] * b07) * det,
            (m[0] * b11 - m[2] * b08 + m[3] * b07) * det,
            (m[14] * b02 - m[12] * b05 - m[15] * b01) * det,
            (m[8] * b05 - m[10] * b02 + m[11] * b01) * det,
            (m[4] * b10 - m[5] * b08 + m[7] * b06) * det,
            (m[1] * b08 - m[0] * b10 - m[3] * b06) * det,
            (m[12] * b04 - m[13] * b02 + m[15] * b00) * det,
            (m[9] * b02 - m[8] * b04 - m[11] * b00) * det,
            (m[5] * b07 - m[4] * b09 - m[6] * b06) * det,
            (m[0] * b09 - m[1] * b07 + m[2] * b06) * det,
            (m[13] * b01 - m[12] * b03 - m[14] * b00) * det,
            (m[8] * b03 - m[9] * b01 + m[10] * b00) * det,
        ];
        self
    }

    /// Transforms a point, treating it as `(x, y, z, 1)`. Only meaningful
    /// for affine matrices (no projective divide is applied).
    pub fn transform_point(&self, p: Vector3) -> Vector3 {
        let m = &self.elements;
        Vector3::new(
            m[0] * p.x + m[4] * p.y + m[8] * p.z + m[12],
            m[1] * p.x + m[5] * p.y + m[9] * p.z + m[13],
            m[2] * p.x + m[6] * p.y + m[10] * p.z + m[14],
        )
    }

    /// The raw column-major array.
    pub fn to_array(&self) -> [f32; 16] {
        self.elements
    }
}

impl Mul for Matrix4 {
    type Output = Matrix4;

    fn mul(self, rhs: Matrix4) -> Matrix4 {
        let a = &self.elements;
        let b = &rhs.elements;
        let mut out = [0.0; 16];
        for col in 0..4 {
            for row in 0..4 {
                let mut acc = 0.0;
                for k in 0..4 {
                    acc += a[k * 4 + row] * b[col * 4 + k];
                }
                out[col * 4 + row] = acc;
            }
        }
        Matrix4::from_elements(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_matrix_eq(a: &Matrix4, b: &Matrix4, epsilon: f32) {
        for i in 0..16 {
            assert!(
                (a.elements[i] - b.elements[i]).abs() < epsilon,
                "element {} differs: {} vs {}",
                i,
                a.elements[i],
                b.elements[i]
            );
        }
    }

    #[test]
    fn translate_then_invert_is_identity() {
        let t = Vector3::new(1.5, -2.0, 3.25);

        let mut inverse = Matrix4::IDENTITY;
        inverse.translate(t).invert();

        let mut forward = Matrix4::IDENTITY;
        forward.translate(t);

        let composed = forward * inverse;
        assert_matrix_eq(&composed, &Matrix4::IDENTITY, 1e-6);
    }

    #[test]
    fn multiply_is_not_commutative() {
        let t = Matrix4::translation(Vector3::new(1.0, 0.0, 0.0));
        let r = Matrix4::rotation(std::f32::consts::FRAC_PI_2, Vector3::new(0.0, 1.0, 0.0));
        assert_ne!((t * r).elements, (r * t).elements);
    }

    #[test]
    fn multiply_left_reverses_order() {
        let t = Matrix4::translation(Vector3::new(1.0, 2.0, 3.0));
        let s = Matrix4::scaling(Vector3::splat(2.0));

        let mut a = t;
        a.multiply(&s);
        let mut b = s;
        b.multiply_left(&t);
        assert_matrix_eq(&a, &b, 1e-6);
    }

    #[test]
    fn translation_moves_points() {
        let m = Matrix4::translation(Vector3::new(5.0, 0.0, -1.0));
        let p = m.transform_point(Vector3::new(1.0, 1.0, 1.0));
        assert_eq!(p, Vector3::new(6.0, 1.0, 0.0));
    }

    #[test]
    fn rotation_about_y_maps_z_to_x() {
        let m = Matrix4::rotation(std::f32::consts::FRAC_PI_2, Vector3::new(0.0, 1.0, 0.0));
        let p = m.transform_point(Vector3::new(0.0, 0.0, -1.0));
        assert!((p.x - -1.0).abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
        assert!(p.z.abs() < 1e-6);
    }

    #[test]
    fn transpose_swaps_rows_and_columns() {
        let mut m = Matrix4::translation(Vector3::new(1.0, 2.0, 3.0));
        m.transpose();
        assert_eq!(m.elements[3], 1.0);
        assert_eq!(m.elements[7], 2.0);
        assert_eq!(m.elements[11], 3.0);
        assert_eq!(m.elements[12], 0.0);
    }

    #[test]
    fn look_at_basis_is_orthonormal() {
        let eye = Vector3::new(2.0, 1.0, 4.0);
        let target = Vector3::new(0.0, 0.0, 0.0);
        let m = Matrix4::look_at(eye, target, Vector3::new(0.0, 1.0, 0.0));

        // Rows of the upper 3x3 are the camera basis vectors.
        let right = Vector3::new(m.elements[0], m.elements[4], m.elements[8]);
        let up = Vector3::new(m.elements[1], m.elements[5], m.elements[9]);
        let back = Vector3::new(m.elements[2], m.elements[6], m.elements[10]);

        assert!((right.magnitude() - 1.0).abs() < 1e-6);
        assert!((up.magnitude() - 1.0).abs() < 1e-6);
        assert!((back.magnitude() - 1.0).abs() < 1e-6);
        assert!(right.dot(up).abs() < 1e-6);
        assert!(right.dot(back).abs() < 1e-6);
        assert!(up.dot(back).abs() < 1e-6);
    }

    #[test]
    fn look_at_maps_eye_to_origin() {
        let eye = Vector3::new(3.0, -2.0, 7.0);
        let m = Matrix4::look_at(eye, Vector3::ZERO, Vector3::new(0.0, 1.0, 0.0));
        let p = m.transform_point(eye);
        assert!(p.magnitude() < 1e-5);
    }

    #[test]
    fn look_at_target_lies_on_negative_z() {
        let eye = Vector3::new(0.0, 0.0, 5.0);
        let target = Vector3::new(0.0, 0.0, 1.0);
        let m = Matrix4::look_at(eye, target, Vector3::new(0.0, 1.0, 0.0));
        let p = m.transform_point(target);
        assert!(p.x.abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
        assert!((p.z - -4.0).abs() < 1e-6);
    }

    #[test]
    fn perspective_spot_values() {
        let fovy = std::f32::consts::FRAC_PI_2;
        let m = Matrix4::perspective(fovy, 2.0, 0.1, 100.0);

        let f = 1.0 / (fovy / 2.0).tan();
        assert!((m.elements[0] - f / 2.0).abs() < 1e-6);
        assert!((m.elements[5] - f).abs() < 1e-6);
        assert!((m.elements[10] - 100.0 / (0.1 - 100.0)).abs() < 1e-6);
        assert_eq!(m.elements[11], -1.0);
        assert!((m.elements[14] - 10.0 / (0.1 - 100.0)).abs() < 1e-6);
        assert_eq!(m.elements[15], 0.0);
    }

    #[test]
    fn perspective_maps_depth_into_zero_one() {
        let m = Matrix4::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0);

        // Homogeneous transform of a point at eye depth d: z_clip / w_clip.
        let ndc_z = |d: f32| {
            let z = m.elements[10] * -d + m.elements[14];
            let w = m.elements[11] * -d;
            z / w
        };
        assert!(ndc_z(0.1).abs() < 1e-5);
        assert!((ndc_z(100.0) - 1.0).abs() < 1e-4);

        // Just past the near plane lands inside the clip volume, not before it.
        let inside = ndc_z(0.15);
        assert!(inside > 0.0 && inside < 1.0);
    }

    #[test]
    fn invert_rotation_equals_transpose() {
        let r = Matrix4::rotation(0.7, Vector3::new(0.3, 1.0, -0.2));
        let mut inverse = r;
        inverse.invert();
        let mut transposed = r;
        transposed.transpose();
        assert_matrix_eq(&inverse, &transposed, 1e-5);
    }
}
