//! Tick ↔ sqrt-price conversions in Q64.96 fixed point.

use crate::error::MathError;
use primitive_types::U256;

/// Lowest tick a pool can represent.
pub const MIN_TICK: i32 = -887_272;
/// Highest tick a pool can represent.
pub const MAX_TICK: i32 = -MIN_TICK;

/// `sqrt_price_at_tick(MIN_TICK)`.
pub const MIN_SQRT_PRICE: U256 = U256([4_295_128_739, 0, 0, 0]);
/// `sqrt_price_at_tick(MAX_TICK)`.
pub const MAX_SQRT_PRICE: U256 = U256([
    6_743_328_256_752_651_558,
    17_280_870_778_742_802_505,
    4_294_805_859,
    0,
]);

/// `2^96`, the Q64.96 unit.
pub const Q96: U256 = U256([0, 1 << 32, 0, 0]);

// sqrt(1.0001)^-(2^i) in Q128.128 for i = 1..=19.
const TICK_MULTIPLIERS: [(u32, u128); 19] = [
    (0x2, 0xfff97272373d413259a46990580e213a),
    (0x4, 0xfff2e50f5f656932ef12357cf3c7fdcc),
    (0x8, 0xffe5caca7e10e4e61c3624eaa0941cd0),
    (0x10, 0xffcb9843d60f6159c9db58835c926644),
    (0x20, 0xff973b41fa98c081472e6896dfb254c0),
    (0x40, 0xff2ea16466c96a3843ec78b326b52861),
    (0x80, 0xfe5dee046a99a2a811c461f1969c3053),
    (0x100, 0xfcbe86c7900a88aedcffc83b479aa3a4),
    (0x200, 0xf987a7253ac413176f2b074cf7815e54),
    (0x400, 0xf3392b0822b70005940c7a398e4b70f3),
    (0x800, 0xe7159475a2c29b7443b29c7fa6e889d9),
    (0x1000, 0xd097f3bdfd2022b8845ad8f792aa5825),
    (0x2000, 0xa9f746462d870fdf8a65dc1f90e061e5),
    (0x4000, 0x70d869a156d2a1b890bb3df62baf32f7),
    (0x8000, 0x31be135f97d08fd981231505542fcfa6),
    (0x10000, 0x9aa508b5b7a84e1c677de54f3e99bc9),
    (0x20000, 0x5d6af8dedb81196699c329225ee604),
    (0x40000, 0x2216e584f5fa1ea926041bedfe98),
    (0x80000, 0x48a170391f7dc42444e8fa2),
];

/// Returns `sqrt(1.0001^tick) * 2^96`, rounded up to the next integer.
pub fn sqrt_price_at_tick(tick: i32) -> Result<U256, MathError> {
    let abs_tick = tick.unsigned_abs();
    if abs_tick > MAX_TICK as u32 {
        return Err(MathError::TickOutOfBounds(tick));
    }

    let mut ratio = if abs_tick & 0x1 != 0 {
        U256::from(0xfffcb933bd6fad37aa2d162d1a594001u128)
    } else {
        U256([0, 0, 1, 0])
    };
    for (bit, multiplier) in TICK_MULTIPLIERS {
        if abs_tick & bit != 0 {
            ratio = (ratio * U256::from(multiplier)) >> 128usize;
        }
    }

    if tick > 0 {
        ratio = U256::MAX / ratio;
    }

    // Q128.128 -> Q64.96, rounding up so the inverse lookup stays consistent.
    let rounded = if (ratio.low_u64() & 0xffff_ffff) == 0 {
        U256::zero()
    } else {
        U256::one()
    };
    Ok((ratio >> 32usize) + rounded)
}

/// Returns the greatest tick whose sqrt price is at most `sqrt_price_x96`.
pub fn tick_at_sqrt_price(sqrt_price_x96: U256) -> Result<i32, MathError> {
    if sqrt_price_x96 < MIN_SQRT_PRICE || sqrt_price_x96 >= MAX_SQRT_PRICE {
        return Err(MathError::SqrtPriceOutOfBounds);
    }

    let (mut low, mut high) = (MIN_TICK, MAX_TICK);
    while low < high {
        // Upper midpoint so the loop always makes progress.
        let mid = low + (high - low + 1) / 2;
        if sqrt_price_at_tick(mid)? <= sqrt_price_x96 {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    Ok(low)
}

/// Floors `tick` to a multiple of `spacing`, rounding toward negative
/// infinity so `-1` with spacing 10 becomes `-10`, not `0`.
pub fn tick_floor(tick: i32, spacing: i32) -> Result<i32, MathError> {
    if spacing <= 0 {
        return Err(MathError::InvalidTickSpacing(spacing));
    }
    Ok(tick.div_euclid(spacing) * spacing)
}

/// Lowest tick aligned to `spacing`.
pub fn min_usable_tick(spacing: i32) -> Result<i32, MathError> {
    if spacing <= 0 {
        return Err(MathError::InvalidTickSpacing(spacing));
    }
    Ok((MIN_TICK / spacing) * spacing)
}

/// Highest tick aligned to `spacing`.
pub fn max_usable_tick(spacing: i32) -> Result<i32, MathError> {
    if spacing <= 0 {
        return Err(MathError::InvalidTickSpacing(spacing));
    }
    Ok((MAX_TICK / spacing) * spacing)
}
