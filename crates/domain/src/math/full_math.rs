//! Full-precision multiply-then-divide on 256-bit integers.
//!
//! The product is carried in 512 bits so `a * b / denominator` never loses
//! precision to an intermediate overflow.

use crate::error::MathError;
use primitive_types::{U256, U512};

/// Computes `floor(a * b / denominator)`.
pub fn mul_div(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let product = a.full_mul(b);
    let quotient = product / U512::from(denominator);
    U256::try_from(quotient).map_err(|_| MathError::Overflow)
}

/// Like [`mul_div`], but rounds up when the division leaves a remainder.
pub fn mul_div_rounding_up(a: U256, b: U256, denominator: U256) -> Result<U256, MathError> {
    if denominator.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let product = a.full_mul(b);
    let denominator = U512::from(denominator);
    let quotient = product / denominator;
    let quotient = if (product % denominator).is_zero() {
        quotient
    } else {
        quotient + U512::one()
    };
    U256::try_from(quotient).map_err(|_| MathError::Overflow)
}

/// `ceil(a / b)`.
pub fn div_rounding_up(a: U256, b: U256) -> Result<U256, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let (quotient, remainder) = a.div_mod(b);
    if remainder.is_zero() {
        Ok(quotient)
    } else {
        Ok(quotient + U256::one())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mul_div_simple() {
        let r = mul_div(U256::from(10u8), U256::from(20u8), U256::from(5u8)).unwrap();
        assert_eq!(r, U256::from(40u8));
    }

    #[test]
    fn test_mul_div_truncates() {
        let r = mul_div(U256::from(10u8), U256::from(10u8), U256::from(3u8)).unwrap();
        assert_eq!(r, U256::from(33u8));
    }

    #[test]
    fn test_mul_div_intermediate_exceeds_256_bits() {
        // (2^255 * 4) / 8 = 2^254, the product does not fit 256 bits.
        let a = U256::one() << 255usize;
        let r = mul_div(a, U256::from(4u8), U256::from(8u8)).unwrap();
        assert_eq!(r, U256::one() << 254usize);
    }

    #[test]
    fn test_mul_div_overflowing_result() {
        let r = mul_div(U256::MAX, U256::from(2u8), U256::one());
        assert_eq!(r, Err(MathError::Overflow));
    }

    #[test]
    fn test_mul_div_by_zero() {
        assert_eq!(
            mul_div(U256::one(), U256::one(), U256::zero()),
            Err(MathError::DivisionByZero)
        );
    }

    #[test]
    fn test_rounding_up() {
        let r = mul_div_rounding_up(U256::from(10u8), U256::from(10u8), U256::from(3u8)).unwrap();
        assert_eq!(r, U256::from(34u8));
        let exact = mul_div_rounding_up(U256::from(9u8), U256::from(10u8), U256::from(3u8)).unwrap();
        assert_eq!(exact, U256::from(30u8));
        assert_eq!(div_rounding_up(U256::from(7u8), U256::from(2u8)).unwrap(), U256::from(4u8));
        assert_eq!(div_rounding_up(U256::from(8u8), U256::from(2u8)).unwrap(), U256::from(4u8));
    }
}
