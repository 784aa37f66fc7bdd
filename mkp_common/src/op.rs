//! Arithmetic boilerplate for single-field numeric newtypes such as [`crate::Money`].
//!
//! * `binary` implements `Self op Self`
//! * `inplace` implements `Self op= Self`
//! * `unary` implements `op Self`
//! * `scalar` implements `Self op $rhs`, where the inner value is combined with a plain scalar (e.g. a quantity).
#[macro_export]
macro_rules! op {
    (binary $for_struct:ident, $impl_trait:ident, $impl_fn:ident) => {
        impl $impl_trait for $for_struct {
            type Output = Self;

            fn $impl_fn(self, rhs: Self) -> Self::Output {
                Self(self.0.$impl_fn(rhs.0))
            }
        }
    };

    (inplace $for_struct:ident, $impl_trait:ident, $impl_fn:ident) => {
        impl $impl_trait for $for_struct {
            fn $impl_fn(&mut self, rhs: Self) {
                self.0.$impl_fn(rhs.0)
            }
        }
    };

    (unary $for_struct:ident, $impl_trait:ident, $impl_fn:ident) => {
        impl $impl_trait for $for_struct {
            type Output = Self;

            fn $impl_fn(self) -> Self::Output {
                Self(self.0.$impl_fn())
            }
        }
    };

    (scalar $for_struct:ident, $impl_trait:ident < $rhs:ty >, $impl_fn:ident) => {
        impl $impl_trait<$rhs> for $for_struct {
            type Output = Self;

            fn $impl_fn(self, rhs: $rhs) -> Self::Output {
                Self(self.0.$impl_fn(rhs))
            }
        }
    };
}
