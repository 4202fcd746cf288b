//! Fixed-point math utilities for deterministic simulation.
//!
//! All game simulation uses fixed-point arithmetic to ensure
//! deterministic behavior across platforms. Floating-point
//! operations can produce different results on different CPUs.
//!
//! Angles are measured in a 256-unit ring ("degrees256"): heading 0 points
//! along +X, 64 points up the screen (-Y), 128 along -X and 192 down (+Y).
//! Trigonometry works on that ring through a quarter-wave lookup table and a
//! CORDIC arctangent, so every client computes bit-identical results.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
///
/// Division by zero panics. Simulation code never divides by a value that
/// can legitimately be zero, so a panic here is an invariant violation.
pub type Fixed = I32F32;

/// Edge length of a map tile in world units.
pub const TILESIZE: i32 = 64;

/// Number of sprite directions a heading is quantized into.
pub const NUM_ANGLES: i32 = 8;

/// Size of the continuous heading ring.
pub const ANGLE_RANGE: Fixed = Fixed::const_from_int(256);

/// Half turn in degrees256.
pub const HALF_TURN: Fixed = Fixed::const_from_int(128);

/// Pi as raw I32F32 bits (round(pi * 2^32)).
pub const FIX_PI: Fixed = Fixed::from_bits(13_493_037_705);

/// sqrt(2) - 1 as raw I32F32 bits, the diagonal surcharge of [`block_distance`].
pub const SQRT2_MINUS_ONE: Fixed = Fixed::from_bits(1_779_033_704);

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer world coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Euclidean distance between two points.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }

    /// Normalize vector using fixed-point math.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len_sq = self.dot(self);

        if len_sq == Fixed::ZERO {
            return Self::ZERO;
        }

        let len = fixed_sqrt(len_sq);
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }

    /// Round both components to the nearest integer (ties away from zero).
    #[must_use]
    pub fn rounded(self) -> (i32, i32) {
        (lround(self.x), lround(self.y))
    }
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

/// Computes the square root of a fixed-point number using binary search.
///
/// Negative inputs yield zero.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE { value } else { Fixed::ONE };

    for _ in 0..64 {
        let mid = (low + high) / Fixed::const_from_int(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Round to the nearest integer, ties away from zero.
///
/// This is the one rounding rule used by gameplay code; `fixed` implements
/// it with integer operations so it is identical on every platform.
#[must_use]
pub fn lround(value: Fixed) -> i32 {
    value.round().to_num::<i32>()
}

/// Wrap an angle into `[0, 256)`.
#[must_use]
pub fn normalize_angle(angle: Fixed) -> Fixed {
    angle.rem_euclid(ANGLE_RANGE)
}

/// Convert a degrees256 angle to radians.
#[must_use]
pub fn deg256_to_rad(angle: Fixed) -> Fixed {
    angle * FIX_PI / HALF_TURN
}

/// Convert radians to a degrees256 angle.
#[must_use]
pub fn rad_to_deg256(angle_rad: Fixed) -> Fixed {
    angle_rad * HALF_TURN / FIX_PI
}

/// Quantize a continuous heading into one of [`NUM_ANGLES`] sprite buckets.
///
/// Computes `round(angle / 32) mod 8` on the wrapped angle, so the result
/// is invariant under adding whole turns.
#[must_use]
pub fn angle_to_drawn_angle(angle: Fixed) -> u8 {
    let bucket_width = ANGLE_RANGE / Fixed::from_num(NUM_ANGLES);
    let bucket = lround(normalize_angle(angle) / bucket_width);
    let drawn = bucket.rem_euclid(NUM_ANGLES);
    assert!(
        (0..NUM_ANGLES).contains(&drawn),
        "drawn angle {drawn} out of range"
    );
    drawn as u8
}

/// sin(i * 2pi / 256) for i in 0..=64, as raw I32F32 bits.
const QUARTER_SINE: [i64; 65] = [
    0, 105_403_774, 210_744_057, 315_957_395,
    420_980_412, 525_749_847, 630_202_589, 734_275_721,
    837_906_553, 941_032_661, 1_043_591_926, 1_145_522_571,
    1_246_763_195, 1_347_252_816, 1_446_930_903, 1_545_737_412,
    1_643_612_827, 1_740_498_191, 1_836_335_144, 1_931_065_957,
    2_024_633_568, 2_116_981_616, 2_208_054_473, 2_297_797_281,
    2_386_155_981, 2_473_077_351, 2_558_509_031, 2_642_399_561,
    2_724_698_408, 2_805_355_999, 2_884_323_748, 2_961_554_089,
    3_037_000_500, 3_110_617_535, 3_182_360_851, 3_252_187_232,
    3_320_054_617, 3_385_922_125, 3_449_750_080, 3_511_500_034,
    3_571_134_792, 3_628_618_433, 3_683_916_329, 3_736_995_171,
    3_787_822_988, 3_836_369_162, 3_882_604_450, 3_926_501_002,
    3_968_032_378, 4_007_173_558, 4_043_900_968, 4_078_192_482,
    4_110_027_446, 4_139_386_683, 4_166_252_509, 4_190_608_739,
    4_212_440_704, 4_231_735_252, 4_248_480_760, 4_262_667_143,
    4_274_285_855, 4_283_329_896, 4_289_793_820, 4_293_673_732,
    4_294_967_296,
];

/// Sine of a quarter-wave index in `0..=64` with fractional interpolation.
fn quarter_sine(index: i32, frac: Fixed) -> Fixed {
    let lo = Fixed::from_bits(QUARTER_SINE[index as usize]);
    if frac == Fixed::ZERO {
        return lo;
    }
    let hi = Fixed::from_bits(QUARTER_SINE[index as usize + 1]);
    lo + (hi - lo) * frac
}

/// Sine of a degrees256 angle.
#[must_use]
pub fn sin256(angle: Fixed) -> Fixed {
    let a = normalize_angle(angle);
    let whole = a.floor();
    let frac = a - whole;
    let index = whole.to_num::<i32>();
    let quadrant = index / 64;
    let offset = index % 64;

    match quadrant {
        0 => quarter_sine(offset, frac),
        1 => {
            // mirror: sin(64 + x) = sin(64 - x)
            if frac == Fixed::ZERO {
                quarter_sine(64 - offset, Fixed::ZERO)
            } else {
                quarter_sine(63 - offset, Fixed::ONE - frac)
            }
        }
        2 => -quarter_sine(offset, frac),
        _ => {
            if frac == Fixed::ZERO {
                -quarter_sine(64 - offset, Fixed::ZERO)
            } else {
                -quarter_sine(63 - offset, Fixed::ONE - frac)
            }
        }
    }
}

/// Cosine of a degrees256 angle.
#[must_use]
pub fn cos256(angle: Fixed) -> Fixed {
    sin256(angle + Fixed::const_from_int(64))
}

/// Sine of an angle in radians.
#[must_use]
pub fn sin(angle_rad: Fixed) -> Fixed {
    sin256(rad_to_deg256(angle_rad))
}

/// Cosine of an angle in radians.
#[must_use]
pub fn cos(angle_rad: Fixed) -> Fixed {
    cos256(rad_to_deg256(angle_rad))
}

/// atan(2^-i) in degrees256, as raw I32F32 bits.
const CORDIC_ATAN: [i64; 28] = [
    137_438_953_472, 81_134_951_838, 42_869_480_287, 21_761_217_566,
    10_922_836_750, 5_466_743_129, 2_734_038_620, 1_367_102_738,
    683_561_799, 341_782_203, 170_891_265, 85_445_653,
    42_722_829, 21_361_415, 10_680_707, 5_340_354,
    2_670_177, 1_335_088, 667_544, 333_772,
    166_886, 83_443, 41_722, 20_861,
    10_430, 5_215, 2_608, 1_304,
];

/// Angle of the vector `(x, y)` in degrees256, mathematical orientation
/// (counter-clockwise from +X with +Y up). Result is in `[0, 256)`.
///
/// The zero vector yields zero. Axis-aligned vectors map exactly onto
/// 0, 64, 128 and 192.
#[must_use]
pub fn atan2_256(y: Fixed, x: Fixed) -> Fixed {
    // Cardinal directions are exact; CORDIC would land a hair off them.
    if y == Fixed::ZERO {
        return if x < Fixed::ZERO { HALF_TURN } else { Fixed::ZERO };
    }
    if x == Fixed::ZERO {
        return if y > Fixed::ZERO {
            Fixed::const_from_int(64)
        } else {
            Fixed::const_from_int(192)
        };
    }

    // Rotate the left half-plane by a half turn so CORDIC converges.
    let (mut x, mut y, mut z) = if x < Fixed::ZERO {
        (-x, -y, HALF_TURN)
    } else {
        (x, y, Fixed::ZERO)
    };

    for (i, step) in CORDIC_ATAN.iter().enumerate() {
        let shift = i as u32;
        let dx = x >> shift;
        let dy = y >> shift;
        let step = Fixed::from_bits(*step);
        if y > Fixed::ZERO {
            x += dy;
            y -= dx;
            z += step;
        } else {
            x -= dy;
            y += dx;
            z -= step;
        }
    }

    normalize_angle(z)
}

/// Heading from `from` to `to` in screen space (Y grows downward).
///
/// The result is in `[0, 256)`, with 0 meaning +X and 64 meaning up.
#[must_use]
pub fn destination_angle(from: Vec2Fixed, to: Vec2Fixed) -> Fixed {
    atan2_256(from.y - to.y, to.x - from.x)
}

/// Octile distance between two tiles: straight steps cost 1, diagonal
/// steps cost sqrt(2).
#[must_use]
pub fn block_distance(ax: i32, ay: i32, bx: i32, by: i32) -> Fixed {
    let dx = (ax - bx).abs();
    let dy = (ay - by).abs();
    let long = Fixed::from_num(dx.max(dy));
    let short = Fixed::from_num(dx.min(dy));
    long + short * SQRT2_MINUS_ONE
}
