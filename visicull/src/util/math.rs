//! Math utilites.

use num_traits::PrimInt;

/// Performs integer division between a and b rounding up, instead of down
///
/// Never overflows, even for `a` close to `T::max_value()`.
pub fn round_up_div<T: PrimInt>(a: T, b: T) -> T {
    let quotient = a / b;
    if a % b == T::zero() {
        quotient
    } else {
        quotient + T::one()
    }
}
