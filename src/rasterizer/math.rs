//! Fixed-size vector and matrix math for the render pipeline
//!
//! `Vector<T, N>` and `Matrix<T, N, M>` are plain `Copy` values backed by arrays.
//! Operators between vectors of different lengths narrow to the shorter one;
//! changing a vector's dimension on purpose goes through `project_to`/`embed_in`.

use std::fmt;
use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Neg, Rem, Sub, SubAssign};

/// Errors from checked element access and normalization
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LinAlgError {
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("cannot normalize a zero-length vector")]
    DegenerateVector,
}

/// Numeric element type usable in vectors and matrices
pub trait Scalar:
    Copy
    + Default
    + PartialEq
    + PartialOrd
    + fmt::Debug
    + fmt::Display
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Rem<Output = Self>
{
    const ZERO: Self;
    const ONE: Self;
}

/// Floating point scalars (needed for norms and trigonometry)
pub trait Float: Scalar + Neg<Output = Self> {
    fn sqrt(self) -> Self;
    fn sin(self) -> Self;
    fn cos(self) -> Self;
    fn abs(self) -> Self;
}

macro_rules! impl_scalar {
    ($($t:ty => $zero:expr, $one:expr);* $(;)?) => {
        $(
            impl Scalar for $t {
                const ZERO: Self = $zero;
                const ONE: Self = $one;
            }
        )*
    };
}

impl_scalar! {
    f32 => 0.0, 1.0;
    f64 => 0.0, 1.0;
    i32 => 0, 1;
    i64 => 0, 1;
    u32 => 0, 1;
    usize => 0, 1;
}

macro_rules! impl_float {
    ($($t:ty),*) => {
        $(
            impl Float for $t {
                fn sqrt(self) -> Self { <$t>::sqrt(self) }
                fn sin(self) -> Self { <$t>::sin(self) }
                fn cos(self) -> Self { <$t>::cos(self) }
                fn abs(self) -> Self { <$t>::abs(self) }
            }
        )*
    };
}

impl_float!(f32, f64);

/// Compile-time dimension checks, evaluated on monomorphization
struct Dims<const A: usize, const B: usize>;

impl<const A: usize, const B: usize> Dims<A, B> {
    const NOT_WIDER: () = assert!(A <= B, "target dimension is wider than the source");
    const NOT_NARROWER: () = assert!(A >= B, "target dimension is narrower than the source");
    const SQUARE: () = assert!(A == B, "matrix must be square");
    const AT_LEAST_3X3: () = assert!(A >= 3 && B >= 3, "rotation block needs at least 3x3");
}

// ============================================================================
// Vector
// ============================================================================

/// Fixed-length numeric tuple
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector<T, const N: usize> {
    data: [T; N],
}

pub type Vec2 = Vector<f32, 2>;
pub type Vec3 = Vector<f32, 3>;
pub type Vec4 = Vector<f32, 4>;

impl<T: Scalar, const N: usize> Vector<T, N> {
    pub const fn new(data: [T; N]) -> Self {
        Self { data }
    }

    pub fn zeros() -> Self {
        Self { data: [T::ZERO; N] }
    }

    pub fn splat(value: T) -> Self {
        Self { data: [value; N] }
    }

    /// Number of components
    pub const fn size(&self) -> usize {
        N
    }

    pub fn as_array(&self) -> &[T; N] {
        &self.data
    }

    pub fn into_array(self) -> [T; N] {
        self.data
    }

    pub fn get(&self, index: usize) -> Result<T, LinAlgError> {
        self.data
            .get(index)
            .copied()
            .ok_or(LinAlgError::IndexOutOfRange { index, len: N })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut T, LinAlgError> {
        self.data
            .get_mut(index)
            .ok_or(LinAlgError::IndexOutOfRange { index, len: N })
    }

    pub fn set(&mut self, index: usize, value: T) -> Result<(), LinAlgError> {
        *self.get_mut(index)? = value;
        Ok(())
    }

    /// Drop trailing components (K <= N, checked at compile time)
    pub fn project_to<const K: usize>(self) -> Vector<T, K> {
        #[allow(clippy::let_unit_value)]
        let () = Dims::<K, N>::NOT_WIDER;
        self.resized()
    }

    /// Pad with zeros up to K components (K >= N, checked at compile time)
    pub fn embed_in<const K: usize>(self) -> Vector<T, K> {
        #[allow(clippy::let_unit_value)]
        let () = Dims::<K, N>::NOT_NARROWER;
        self.resized()
    }

    fn resized<const K: usize>(self) -> Vector<T, K> {
        let mut out = Vector::<T, K>::zeros();
        for (dst, src) in out.data.iter_mut().zip(self.data.iter()) {
            *dst = *src;
        }
        out
    }

    /// Dot product over the shorter of the two lengths
    pub fn dot<const M: usize>(&self, other: &Vector<T, M>) -> T {
        self.data
            .iter()
            .zip(other.data.iter())
            .fold(T::ZERO, |acc, (a, b)| acc + *a * *b)
    }

    /// Element-wise product, narrowed like the other operators
    pub fn component_mul<const M: usize>(&self, other: &Vector<T, M>) -> Vector<T, N> {
        self.zip_with(other, |a, b| a * b)
    }

    pub fn norm_squared(&self) -> T {
        self.dot(self)
    }

    pub fn sum(&self) -> T {
        self.data.iter().fold(T::ZERO, |acc, v| acc + *v)
    }

    pub fn map<U: Scalar>(&self, f: impl Fn(T) -> U) -> Vector<U, N> {
        let mut out = Vector::<U, N>::zeros();
        for (dst, src) in out.data.iter_mut().zip(self.data.iter()) {
            *dst = f(*src);
        }
        out
    }

    /// Combine element-wise up to min(N, M); remaining slots stay zero
    pub fn zip_with<const M: usize>(&self, other: &Vector<T, M>, f: impl Fn(T, T) -> T) -> Vector<T, N> {
        let mut out = Self::zeros();
        for (i, (a, b)) in self.data.iter().zip(other.data.iter()).enumerate() {
            out.data[i] = f(*a, *b);
        }
        out
    }

    pub fn x(&self) -> T {
        self[0]
    }

    pub fn y(&self) -> T {
        self[1]
    }

    pub fn z(&self) -> T {
        self[2]
    }

    pub fn w(&self) -> T {
        self[3]
    }
}

impl<T: Float, const N: usize> Vector<T, N> {
    pub fn norm(&self) -> T {
        self.norm_squared().sqrt()
    }

    /// Unit vector in the same direction; a zero vector stays zero
    pub fn normalize(&self) -> Self {
        self.try_normalize().unwrap_or_else(|_| Self::zeros())
    }

    pub fn try_normalize(&self) -> Result<Self, LinAlgError> {
        let len = self.norm();
        if len == T::ZERO {
            return Err(LinAlgError::DegenerateVector);
        }
        Ok(*self / len)
    }

    pub fn lerp(&self, other: &Self, t: T) -> Self {
        *self + (*other - *self) * t
    }
}

impl<T: Scalar> Vector<T, 3> {
    pub fn cross(&self, other: &Self) -> Self {
        let [ax, ay, az] = self.data;
        let [bx, by, bz] = other.data;
        Self::new([ay * bz - az * by, az * bx - ax * bz, ax * by - ay * bx])
    }
}

impl<T: Scalar, const N: usize> Default for Vector<T, N> {
    fn default() -> Self {
        Self::zeros()
    }
}

impl<T: Scalar, const N: usize> From<[T; N]> for Vector<T, N> {
    fn from(data: [T; N]) -> Self {
        Self::new(data)
    }
}

impl<T: Scalar, const N: usize> Index<usize> for Vector<T, N> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.data.get(index) {
            Some(v) => v,
            None => panic!("{}", LinAlgError::IndexOutOfRange { index, len: N }),
        }
    }
}

impl<T: Scalar, const N: usize> IndexMut<usize> for Vector<T, N> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        match self.data.get_mut(index) {
            Some(v) => v,
            None => panic!("{}", LinAlgError::IndexOutOfRange { index, len: N }),
        }
    }
}

impl<T: Scalar, const N: usize, const M: usize> Add<Vector<T, M>> for Vector<T, N> {
    type Output = Vector<T, N>;
    fn add(self, other: Vector<T, M>) -> Vector<T, N> {
        self.zip_with(&other, |a, b| a + b)
    }
}

impl<T: Scalar, const N: usize, const M: usize> Sub<Vector<T, M>> for Vector<T, N> {
    type Output = Vector<T, N>;
    fn sub(self, other: Vector<T, M>) -> Vector<T, N> {
        self.zip_with(&other, |a, b| a - b)
    }
}

impl<T: Scalar, const N: usize> AddAssign for Vector<T, N> {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl<T: Scalar, const N: usize> SubAssign for Vector<T, N> {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl<T: Scalar + Neg<Output = T>, const N: usize> Neg for Vector<T, N> {
    type Output = Self;
    fn neg(self) -> Self {
        self.map(|v| -v)
    }
}

impl<T: Scalar, const N: usize> Mul<T> for Vector<T, N> {
    type Output = Self;
    fn mul(self, s: T) -> Self {
        self.map(|v| v * s)
    }
}

impl<T: Scalar, const N: usize> Div<T> for Vector<T, N> {
    type Output = Self;
    fn div(self, s: T) -> Self {
        self.map(|v| v / s)
    }
}

/// Remainder per component (`%` on floats is fmod)
impl<T: Scalar, const N: usize> Rem<T> for Vector<T, N> {
    type Output = Self;
    fn rem(self, s: T) -> Self {
        self.map(|v| v % s)
    }
}

impl<T: Scalar, const N: usize> fmt::Display for Vector<T, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, v) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", v)?;
        }
        write!(f, ")")
    }
}

// ============================================================================
// Matrix
// ============================================================================

/// N rows of M-component vectors. `Default` is the identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix<T, const N: usize, const M: usize> {
    rows: [Vector<T, M>; N],
}

pub type Mat3 = Matrix<f32, 3, 3>;
pub type Mat4 = Matrix<f32, 4, 4>;

impl<T: Scalar, const N: usize, const M: usize> Matrix<T, N, M> {
    pub fn identity() -> Self {
        let mut m = Self::zeros();
        for i in 0..N.min(M) {
            m.rows[i].data[i] = T::ONE;
        }
        m
    }

    pub fn zeros() -> Self {
        Self { rows: [Vector::zeros(); N] }
    }

    pub fn from_rows(rows: [[T; M]; N]) -> Self {
        let mut m = Self::zeros();
        for (dst, src) in m.rows.iter_mut().zip(rows) {
            *dst = Vector::new(src);
        }
        m
    }

    pub fn row(&self, index: usize) -> Result<&Vector<T, M>, LinAlgError> {
        self.rows
            .get(index)
            .ok_or(LinAlgError::IndexOutOfRange { index, len: N })
    }

    pub fn get(&self, row: usize, col: usize) -> Result<T, LinAlgError> {
        self.row(row)?.get(col)
    }

    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<(), LinAlgError> {
        self.rows
            .get_mut(row)
            .ok_or(LinAlgError::IndexOutOfRange { index: row, len: N })?
            .set(col, value)
    }

    pub fn transpose(&self) -> Matrix<T, M, N> {
        let mut out = Matrix::<T, M, N>::zeros();
        for i in 0..N {
            for j in 0..M {
                out.rows[j].data[i] = self.rows[i].data[j];
            }
        }
        out
    }

    /// Keep the upper-left R x S block (R <= N, S <= M)
    pub fn project_to<const R: usize, const S: usize>(&self) -> Matrix<T, R, S> {
        #[allow(clippy::let_unit_value)]
        let () = Dims::<R, N>::NOT_WIDER;
        #[allow(clippy::let_unit_value)]
        let () = Dims::<S, M>::NOT_WIDER;
        self.resized()
    }

    /// Place this matrix in the upper-left of a larger zero matrix
    pub fn embed_in<const R: usize, const S: usize>(&self) -> Matrix<T, R, S> {
        #[allow(clippy::let_unit_value)]
        let () = Dims::<R, N>::NOT_NARROWER;
        #[allow(clippy::let_unit_value)]
        let () = Dims::<S, M>::NOT_NARROWER;
        self.resized()
    }

    fn resized<const R: usize, const S: usize>(&self) -> Matrix<T, R, S> {
        let mut out = Matrix::<T, R, S>::zeros();
        for (dst, src) in out.rows.iter_mut().zip(self.rows.iter()) {
            *dst = src.resized();
        }
        out
    }

    /// Overwrite the upper-left 3x3 with the Z*Y*X Euler rotation (roll, pitch, yaw order in `angles`)
    pub fn set_rotation3(&mut self, angles: Vector<T, 3>)
    where
        T: Float,
    {
        #[allow(clippy::let_unit_value)]
        let () = Dims::<N, M>::AT_LEAST_3X3;
        let (sx, cx) = (angles[0].sin(), angles[0].cos());
        let (sy, cy) = (angles[1].sin(), angles[1].cos());
        let (sz, cz) = (angles[2].sin(), angles[2].cos());

        self.write_block3([
            [cy * cz, cz * sx * sy - cx * sz, cx * cz * sy + sx * sz],
            [cy * sz, cx * cz + sx * sy * sz, -cz * sx + cx * sy * sz],
            [-sy, cy * sx, cx * cy],
        ]);
    }

    /// Overwrite the upper-left 3x3 with Rx(pitch) * Ry(yaw), the world-to-camera rotation
    pub fn set_view(&mut self, pitch: T, yaw: T)
    where
        T: Float,
    {
        #[allow(clippy::let_unit_value)]
        let () = Dims::<N, M>::AT_LEAST_3X3;
        let (sp, cp) = (pitch.sin(), pitch.cos());
        let (sy, cy) = (yaw.sin(), yaw.cos());

        self.write_block3([
            [cy, T::ZERO, sy],
            [sp * sy, cp, -sp * cy],
            [-cp * sy, sp, cp * cy],
        ]);
    }

    fn write_block3(&mut self, block: [[T; 3]; 3]) {
        for (row, values) in self.rows.iter_mut().zip(block) {
            for (dst, v) in row.data.iter_mut().zip(values) {
                *dst = v;
            }
        }
    }
}

impl<T: Scalar + Neg<Output = T>, const N: usize, const M: usize> Matrix<T, N, M> {
    /// Determinant by cofactor expansion along the first row
    pub fn determinant(&self) -> T {
        #[allow(clippy::let_unit_value)]
        let () = Dims::<N, M>::SQUARE;
        let flat: Vec<T> = self.rows.iter().flat_map(|r| r.data).collect();
        cofactor_determinant(&flat, N)
    }
}

fn cofactor_determinant<T: Scalar + Neg<Output = T>>(m: &[T], n: usize) -> T {
    match n {
        0 => T::ONE,
        1 => m[0],
        2 => m[0] * m[3] - m[1] * m[2],
        _ => {
            let mut det = T::ZERO;
            let mut minor = Vec::with_capacity((n - 1) * (n - 1));
            for col in 0..n {
                minor.clear();
                for r in 1..n {
                    for c in (0..n).filter(|&c| c != col) {
                        minor.push(m[r * n + c]);
                    }
                }
                let term = m[col] * cofactor_determinant(&minor, n - 1);
                det = if col % 2 == 0 { det + term } else { det + -term };
            }
            det
        }
    }
}

/// Homogeneous helpers: the last column holds the translation
macro_rules! impl_homogeneous {
    ($n:literal, $k:literal) => {
        impl<T: Scalar> Matrix<T, $n, $n> {
            pub fn set_position(&mut self, position: Vector<T, $k>) {
                for i in 0..$k {
                    self.rows[i].data[$n - 1] = position.data[i];
                }
            }

            pub fn get_position(&self) -> Vector<T, $k> {
                let mut out = Vector::<T, $k>::zeros();
                for i in 0..$k {
                    out.data[i] = self.rows[i].data[$n - 1];
                }
                out
            }

            /// Multiply each diagonal element by the matching scale factor
            pub fn set_scale(&mut self, scale: Vector<T, $k>) {
                for i in 0..$k {
                    self.rows[i].data[i] = self.rows[i].data[i] * scale.data[i];
                }
            }

            /// Multiply each column of the linear block by the matching factor (R * diag(scale))
            pub fn scale_axes(&mut self, scale: Vector<T, $k>) {
                for i in 0..$k {
                    for j in 0..$k {
                        self.rows[i].data[j] = self.rows[i].data[j] * scale.data[j];
                    }
                }
            }
        }
    };
}

impl_homogeneous!(3, 2);
impl_homogeneous!(4, 3);

impl<T: Scalar, const N: usize, const M: usize> Default for Matrix<T, N, M> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<T: Scalar, const N: usize, const M: usize> Index<usize> for Matrix<T, N, M> {
    type Output = Vector<T, M>;

    fn index(&self, index: usize) -> &Vector<T, M> {
        match self.rows.get(index) {
            Some(r) => r,
            None => panic!("{}", LinAlgError::IndexOutOfRange { index, len: N }),
        }
    }
}

impl<T: Scalar, const N: usize, const M: usize> IndexMut<usize> for Matrix<T, N, M> {
    fn index_mut(&mut self, index: usize) -> &mut Vector<T, M> {
        match self.rows.get_mut(index) {
            Some(r) => r,
            None => panic!("{}", LinAlgError::IndexOutOfRange { index, len: N }),
        }
    }
}

/// Matrix * vector: each row dotted with the vector (narrowing applies)
impl<T: Scalar, const N: usize, const M: usize, const K: usize> Mul<Vector<T, K>> for Matrix<T, N, M> {
    type Output = Vector<T, N>;
    fn mul(self, v: Vector<T, K>) -> Vector<T, N> {
        let mut out = Vector::<T, N>::zeros();
        for (dst, row) in out.data.iter_mut().zip(self.rows.iter()) {
            *dst = row.dot(&v);
        }
        out
    }
}

impl<T: Scalar, const N: usize, const M: usize, const S: usize> Mul<Matrix<T, M, S>> for Matrix<T, N, M> {
    type Output = Matrix<T, N, S>;
    fn mul(self, other: Matrix<T, M, S>) -> Matrix<T, N, S> {
        let columns = other.transpose();
        let mut out = Matrix::<T, N, S>::zeros();
        for i in 0..N {
            for j in 0..S {
                out.rows[i].data[j] = self.rows[i].dot(&columns.rows[j]);
            }
        }
        out
    }
}

impl<T: Scalar, const N: usize, const M: usize> fmt::Display for Matrix<T, N, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "[")?;
        for row in &self.rows {
            writeln!(f, "  {}", row)?;
        }
        write!(f, "]")
    }
}
