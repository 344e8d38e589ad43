use half::{bf16, f16};

/// Arithmetic used by the element-wise and matmul routines.
///
/// Integer arithmetic wraps, and integer division by zero yields zero.
pub trait Element: Copy + Send + Sync + 'static {
    fn zero() -> Self;
    fn add(self, rhs: Self) -> Self;
    fn sub(self, rhs: Self) -> Self;
    fn mul(self, rhs: Self) -> Self;
    fn div(self, rhs: Self) -> Self;
    fn neg(self) -> Self;
    fn abs(self) -> Self;
    fn relu(self) -> Self;
}

pub trait Float: Element {
    fn sigmoid(self) -> Self;
}

macro_rules! impl_signed {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                #[inline]
                fn zero() -> Self { 0 }
                #[inline]
                fn add(self, rhs: Self) -> Self { self.wrapping_add(rhs) }
                #[inline]
                fn sub(self, rhs: Self) -> Self { self.wrapping_sub(rhs) }
                #[inline]
                fn mul(self, rhs: Self) -> Self { self.wrapping_mul(rhs) }
                #[inline]
                fn div(self, rhs: Self) -> Self { if rhs == 0 { 0 } else { self.wrapping_div(rhs) } }
                #[inline]
                fn neg(self) -> Self { self.wrapping_neg() }
                #[inline]
                fn abs(self) -> Self { self.wrapping_abs() }
                #[inline]
                fn relu(self) -> Self { self.max(0) }
            }
        )*
    };
}

macro_rules! impl_unsigned {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                #[inline]
                fn zero() -> Self { 0 }
                #[inline]
                fn add(self, rhs: Self) -> Self { self.wrapping_add(rhs) }
                #[inline]
                fn sub(self, rhs: Self) -> Self { self.wrapping_sub(rhs) }
                #[inline]
                fn mul(self, rhs: Self) -> Self { self.wrapping_mul(rhs) }
                #[inline]
                fn div(self, rhs: Self) -> Self { if rhs == 0 { 0 } else { self / rhs } }
                #[inline]
                fn neg(self) -> Self { self.wrapping_neg() }
                #[inline]
                fn abs(self) -> Self { self }
                #[inline]
                fn relu(self) -> Self { self }
            }
        )*
    };
}

macro_rules! impl_float {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                #[inline]
                fn zero() -> Self { 0.0 }
                #[inline]
                fn add(self, rhs: Self) -> Self { self + rhs }
                #[inline]
                fn sub(self, rhs: Self) -> Self { self - rhs }
                #[inline]
                fn mul(self, rhs: Self) -> Self { self * rhs }
                #[inline]
                fn div(self, rhs: Self) -> Self { self / rhs }
                #[inline]
                fn neg(self) -> Self { -self }
                #[inline]
                fn abs(self) -> Self { <$t>::abs(self) }
                #[inline]
                fn relu(self) -> Self { if self > 0.0 { self } else { 0.0 } }
            }

            impl Float for $t {
                #[inline]
                fn sigmoid(self) -> Self { 1.0 / (1.0 + (-self).exp()) }
            }
        )*
    };
}

// Half types compute in f32 and round back.
macro_rules! impl_half {
    ($($t:ty),*) => {
        $(
            impl Element for $t {
                #[inline]
                fn zero() -> Self { <$t>::ZERO }
                #[inline]
                fn add(self, rhs: Self) -> Self { <$t>::from_f32(self.to_f32() + rhs.to_f32()) }
                #[inline]
                fn sub(self, rhs: Self) -> Self { <$t>::from_f32(self.to_f32() - rhs.to_f32()) }
                #[inline]
                fn mul(self, rhs: Self) -> Self { <$t>::from_f32(self.to_f32() * rhs.to_f32()) }
                #[inline]
                fn div(self, rhs: Self) -> Self { <$t>::from_f32(self.to_f32() / rhs.to_f32()) }
                #[inline]
                fn neg(self) -> Self { <$t>::from_f32(-self.to_f32()) }
                #[inline]
                fn abs(self) -> Self { <$t>::from_f32(self.to_f32().abs()) }
                #[inline]
                fn relu(self) -> Self { <$t>::from_f32(self.to_f32().max(0.0)) }
            }

            impl Float for $t {
                #[inline]
                fn sigmoid(self) -> Self { <$t>::from_f32(self.to_f32().sigmoid()) }
            }
        )*
    };
}

impl_signed!(i8, i16, i32, i64);
impl_unsigned!(u8, u16, u32, u64);
impl_float!(f32, f64);
impl_half!(f16, bf16);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_division_by_zero_is_zero() {
        assert_eq!(Element::div(7i32, 0), 0);
        assert_eq!(Element::div(7u8, 0), 0);
        assert_eq!(Element::div(i64::MIN, -1), i64::MIN);
    }

    #[test]
    fn relu_and_abs() {
        assert_eq!(Element::relu(-3i16), 0);
        assert_eq!(Element::relu(-0.5f32), 0.0);
        assert_eq!(Element::abs(-2.5f64), 2.5);
        assert_eq!(Element::abs(f16::from_f32(-1.5)), f16::from_f32(1.5));
    }

    #[test]
    fn sigmoid_at_zero() {
        assert_eq!(0.0f32.sigmoid(), 0.5);
        assert_eq!(bf16::from_f32(0.0).sigmoid(), bf16::from_f32(0.5));
    }
}
