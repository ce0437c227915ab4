//! Minimal decimal formatting for paths that cannot use `core::fmt`
//! (the fatal-fault diagnostic writes digits straight into the console
//! buffer).

/// Largest power of ten not exceeding `number`; 1 for single digits.
pub fn decimal_weight(number: u64) -> u64 {
    let mut weight = 1u64;
    // The weight * 10 > weight test stops the walk before u64 overflow.
    while weight.wrapping_mul(10) <= number && weight.wrapping_mul(10) > weight {
        weight *= 10;
    }
    weight
}

/// Emit the decimal digits of `number` left to right as ASCII bytes.
pub fn for_each_decimal_digit(number: u64, mut emit: impl FnMut(u8)) {
    let mut weight = decimal_weight(number);
    while weight > 0 {
        emit(b'0' + ((number / weight) % 10) as u8);
        weight /= 10;
    }
}
