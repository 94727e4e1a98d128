use num_traits::{One, Zero};
use rand::{
    distributions::{Distribution, Standard},
    Rng,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use static_assertions::const_assert_eq;
use std::{
    fmt::{Debug, Display},
    hash::Hash,
    ops::{
        Add, AddAssign, BitAnd, BitOr, BitXor, Div, DivAssign, Mul, MulAssign, Neg, Rem, Shl, Shr,
        Sub, SubAssign,
    },
};

/// Word type backing a Mersenne-prime field `Z_{2^EXP - 1}`.
///
/// The two instantiations are `u32` (p = 2^31 - 1) and `u64` (p = 2^61 - 1).
/// Reduced values occupy `EXP` bits, so a sum of two reduced values never
/// overflows the word and a single conditional subtract keeps it reduced.
pub trait MersennePrime:
    Copy
    + Debug
    + Display
    + Default
    + Eq
    + Ord
    + Hash
    + Send
    + Sync
    + 'static
    + Serialize
    + DeserializeOwned
    + Add<Output = Self>
    + Sub<Output = Self>
    + Div<Output = Self>
    + Rem<Output = Self>
    + BitAnd<Output = Self>
    + BitOr<Output = Self>
    + BitXor<Output = Self>
    + Shl<u32, Output = Self>
    + Shr<u32, Output = Self>
    + Zero
    + One
{
    /// Exponent of the prime; also the bit length of a field element.
    const EXP: u32;
    /// The modulus `2^EXP - 1`.
    const PRIME: Self;
    /// Fractional bits of the fixed-point encoding.
    const FIXED_PRECISION: u32;

    /// Widening product folded back below `2^EXP`, then reduced.
    fn mul_mod(self, rhs: Self) -> Self;

    fn to_u64(self) -> u64;

    /// Truncating cast; the caller guarantees `v < 2^EXP`.
    fn from_u64(v: u64) -> Self;

    /// Folds an arbitrary word into `[0, PRIME)`.
    #[inline(always)]
    fn fold(self) -> Self {
        let x = (self & Self::PRIME) + (self >> Self::EXP);
        if x >= Self::PRIME {
            x - Self::PRIME
        } else {
            x
        }
    }

    #[inline(always)]
    fn add_mod(self, rhs: Self) -> Self {
        let s = self + rhs;
        if s >= Self::PRIME {
            s - Self::PRIME
        } else {
            s
        }
    }

    /// `p XOR x` flips all EXP bits of a reduced value, which is exactly
    /// `p - x`; zero stays zero.
    #[inline(always)]
    fn neg_mod(self) -> Self {
        if self.is_zero() {
            self
        } else {
            Self::PRIME ^ self
        }
    }

    #[inline(always)]
    fn sub_mod(self, rhs: Self) -> Self {
        self.add_mod(rhs.neg_mod())
    }

    /// Extended Euclid on `(a, b)` returning Bezout coefficients `(x, y)`
    /// with `a*x + b*y = gcd(a, b)`, computed in the field.
    fn extend_gcd(a: Self, b: Self) -> (Self, Self) {
        if b.is_zero() {
            return (Self::one(), Self::zero());
        }
        let (y, x) = Self::extend_gcd(b, a % b);
        let tmp = (a / b).mul_mod(x);
        (x, y.add_mod(tmp.neg_mod()))
    }
}

const_assert_eq!((1u64 << 31) - 1, 2147483647u64);
const_assert_eq!((1u128 << 61) - 1, 2305843009213693951u128);

impl MersennePrime for u32 {
    const EXP: u32 = 31;
    const PRIME: u32 = 2147483647;
    const FIXED_PRECISION: u32 = 12;

    #[inline(always)]
    fn mul_mod(self, rhs: Self) -> Self {
        let wide = u64::from(self) * u64::from(rhs);
        let lo = wide as u32;
        let hi = (wide >> 32) as u32;
        let folded = (lo & Self::PRIME) + ((lo >> Self::EXP) ^ (hi << (32 - Self::EXP)));
        if folded >= Self::PRIME {
            folded - Self::PRIME
        } else {
            folded
        }
    }

    #[inline(always)]
    fn to_u64(self) -> u64 {
        u64::from(self)
    }

    #[inline(always)]
    fn from_u64(v: u64) -> Self {
        v as u32
    }
}

impl MersennePrime for u64 {
    const EXP: u32 = 61;
    const PRIME: u64 = 2305843009213693951;
    const FIXED_PRECISION: u32 = 13;

    #[inline(always)]
    fn mul_mod(self, rhs: Self) -> Self {
        let wide = u128::from(self) * u128::from(rhs);
        let lo = wide as u64;
        let hi = (wide >> 64) as u64;
        let folded = (lo & Self::PRIME) + ((lo >> Self::EXP) ^ (hi << (64 - Self::EXP)));
        if folded >= Self::PRIME {
            folded - Self::PRIME
        } else {
            folded
        }
    }

    #[inline(always)]
    fn to_u64(self) -> u64 {
        self
    }

    #[inline(always)]
    fn from_u64(v: u64) -> Self {
        v
    }
}

/// An element of `Z_p` for a Mersenne prime `p`, always kept reduced.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, PartialOrd, Eq, Ord, Hash,
)]
#[serde(bound = "")]
#[repr(transparent)]
pub struct FieldElement<T: MersennePrime>(pub T);

/// The 31-bit field, 12 fractional bits.
pub type F31 = FieldElement<u32>;
/// The 61-bit field, 13 fractional bits.
pub type F61 = FieldElement<u64>;

impl<T: MersennePrime> FieldElement<T> {
    /// Bit length of an element, i.e. the prime exponent.
    pub const fn bit_length() -> u32 {
        T::EXP
    }

    /// Integer bits of the fixed-point encoding.
    pub const fn int_precision() -> u32 {
        T::EXP - T::FIXED_PRECISION
    }

    pub const fn fixed_precision() -> u32 {
        T::FIXED_PRECISION
    }

    /// Largest value interpreted as non-negative, `(p - 1) / 2`.
    #[inline]
    pub fn max_positive() -> T {
        T::PRIME >> 1
    }

    /// `2^(l-2)`, added before a masked reveal so the opened value stays in
    /// the positive half for truncation.
    #[inline]
    pub fn encode_offset() -> Self {
        Self(T::one() << (T::EXP - 2))
    }

    /// `2^(l-2-d)`, the truncated counterpart of [`Self::encode_offset`].
    #[inline]
    pub fn decode_offset() -> Self {
        Self(T::one() << (T::EXP - 2 - T::FIXED_PRECISION))
    }

    /// `2^(l-d) - 1`, the additive wraparound gap of probabilistic
    /// truncation by `d = FIXED_PRECISION` bits.
    #[inline]
    pub fn truncation_gap() -> Self {
        Self((T::one() << (T::EXP - T::FIXED_PRECISION)) - T::one())
    }

    /// `(p + 1) / 2 = 2^(l-1)`, the inverse of two.
    #[inline]
    pub fn two_inverse() -> Self {
        Self(T::one() << (T::EXP - 1))
    }

    /// `2^FIXED_PRECISION`, the fixed-point scaling factor.
    #[inline]
    pub fn factor() -> Self {
        Self(T::one() << T::FIXED_PRECISION)
    }

    #[inline]
    pub fn is_negative(&self) -> bool {
        self.0 > Self::max_positive()
    }

    /// Sign bit as a field element, 1 for the negative half.
    #[inline]
    pub fn msb(&self) -> Self {
        if self.is_negative() {
            Self::one()
        } else {
            Self::zero()
        }
    }

    /// Bit `i` of the reduced representation as a field element.
    #[inline]
    pub fn bit(&self, i: u32) -> Self {
        Self((self.0 >> i) & T::one())
    }

    pub fn square(self) -> Self {
        Self(self.0.mul_mod(self.0))
    }

    /// Square-and-multiply exponentiation.
    pub fn pow(self, mut exp: T) -> Self {
        let mut base = self.0;
        let mut acc = T::one();
        while !exp.is_zero() {
            if !(exp & T::one()).is_zero() {
                acc = acc.mul_mod(base);
            }
            base = base.mul_mod(base);
            exp = exp >> 1;
        }
        Self(acc)
    }

    /// Multiplicative inverse by extended Euclid. Zero has none.
    pub fn inverse(self) -> Self {
        debug_assert!(!self.0.is_zero());
        let (_, inv) = T::extend_gcd(T::PRIME, self.0);
        Self(inv)
    }

    /// Square root of a quadratic residue via `x^((p+1)/4)` (valid since
    /// `p = 3 mod 4`), normalized into `[1, (p-1)/2]`.
    pub fn sqrt(self) -> Self {
        debug_assert!(!self.0.is_zero());
        // (p + 1) / 4 = 2^(EXP - 2)
        let root = self.pow(T::one() << (T::EXP - 2));
        if root.0.is_zero() || root.0 > Self::max_positive() {
            -root
        } else {
            root
        }
    }

    /// Inverse square root; zero maps to zero.
    pub fn rsqrt(self) -> Self {
        if self.0.is_zero() {
            return self;
        }
        self.sqrt().inverse()
    }

    /// Signed right shift by `d` bits: negate, shift, negate back for the
    /// negative half.
    pub fn truncate(self, d: u32) -> Self {
        if self.is_negative() {
            -Self((-self).0 >> d)
        } else {
            Self(self.0 >> d)
        }
    }

    /// Signed left shift by `FIXED_PRECISION` bits, turning an integer
    /// encoding into the fixed-point encoding.
    pub fn magnify(self) -> Self {
        if self.is_negative() {
            -Self(((-self).0 << T::FIXED_PRECISION).fold())
        } else {
            Self((self.0 << T::FIXED_PRECISION).fold())
        }
    }

    /// Encodes a signed integer; `|v|` must fit the positive half.
    pub fn from_int(v: i64) -> Self {
        debug_assert!(v.unsigned_abs() <= Self::max_positive().to_u64());
        if v < 0 {
            Self(T::from_u64((v + T::PRIME.to_u64() as i64) as u64))
        } else {
            Self(T::from_u64(v as u64))
        }
    }

    /// Decodes into a signed integer, mapping the upper half to negatives.
    pub fn to_int(self) -> i64 {
        let v = self.0.to_u64();
        if v > Self::max_positive().to_u64() {
            v as i64 - T::PRIME.to_u64() as i64
        } else {
            v as i64
        }
    }

    /// Fixed-point encoding of a real value, `floor(v * 2^d)`.
    pub fn from_f64(v: f64) -> Self {
        Self::from_int((v * Self::factor().0.to_u64() as f64).floor() as i64)
    }

    /// Real value of a fixed-point encoding.
    pub fn to_f64(self) -> f64 {
        self.to_int() as f64 / Self::factor().0.to_u64() as f64
    }

    pub fn random<R: Rng>(rng: &mut R) -> Self
    where
        Standard: Distribution<T>,
    {
        Self(rng.gen::<T>().fold())
    }
}

/// Batched inversion with a single field inversion: forward prefix
/// products, one inverse, then a backward sweep. Inputs must be non-zero.
pub fn batch_inverse<T: MersennePrime>(values: &[FieldElement<T>]) -> Vec<FieldElement<T>> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut prefix = Vec::with_capacity(values.len());
    let mut acc = FieldElement::<T>::one();
    for v in values {
        acc *= v;
        prefix.push(acc);
    }
    let mut out = vec![FieldElement::<T>::zero(); values.len()];
    let mut q = prefix[values.len() - 1].inverse();
    for i in (1..values.len()).rev() {
        out[i] = q * prefix[i - 1];
        q *= values[i];
    }
    out[0] = q;
    out
}

impl<T: MersennePrime> Display for FieldElement<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<T: MersennePrime> Add for FieldElement<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0.add_mod(rhs.0))
    }
}

impl<T: MersennePrime> Add<&Self> for FieldElement<T> {
    type Output = Self;

    fn add(self, rhs: &Self) -> Self::Output {
        Self(self.0.add_mod(rhs.0))
    }
}

impl<T: MersennePrime> AddAssign for FieldElement<T> {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.add_mod(rhs.0);
    }
}

impl<T: MersennePrime> AddAssign<&Self> for FieldElement<T> {
    fn add_assign(&mut self, rhs: &Self) {
        self.0 = self.0.add_mod(rhs.0);
    }
}

impl<T: MersennePrime> Sub for FieldElement<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.sub_mod(rhs.0))
    }
}

impl<T: MersennePrime> Sub<&Self> for FieldElement<T> {
    type Output = Self;

    fn sub(self, rhs: &Self) -> Self::Output {
        Self(self.0.sub_mod(rhs.0))
    }
}

impl<T: MersennePrime> SubAssign for FieldElement<T> {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self.0.sub_mod(rhs.0);
    }
}

impl<T: MersennePrime> SubAssign<&Self> for FieldElement<T> {
    fn sub_assign(&mut self, rhs: &Self) {
        self.0 = self.0.sub_mod(rhs.0);
    }
}

impl<T: MersennePrime> Mul for FieldElement<T> {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        Self(self.0.mul_mod(rhs.0))
    }
}

impl<T: MersennePrime> Mul<&Self> for FieldElement<T> {
    type Output = Self;

    fn mul(self, rhs: &Self) -> Self::Output {
        Self(self.0.mul_mod(rhs.0))
    }
}

impl<T: MersennePrime> MulAssign for FieldElement<T> {
    fn mul_assign(&mut self, rhs: Self) {
        self.0 = self.0.mul_mod(rhs.0);
    }
}

impl<T: MersennePrime> MulAssign<&Self> for FieldElement<T> {
    fn mul_assign(&mut self, rhs: &Self) {
        self.0 = self.0.mul_mod(rhs.0);
    }
}

impl<T: MersennePrime> Div for FieldElement<T> {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        self * rhs.inverse()
    }
}

impl<T: MersennePrime> DivAssign for FieldElement<T> {
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}

impl<T: MersennePrime> Neg for FieldElement<T> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(self.0.neg_mod())
    }
}

impl<T: MersennePrime> Zero for FieldElement<T> {
    fn zero() -> Self {
        Self(T::zero())
    }

    fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl<T: MersennePrime> One for FieldElement<T> {
    fn one() -> Self {
        Self(T::one())
    }
}

impl<T: MersennePrime> Distribution<FieldElement<T>> for Standard
where
    Standard: Distribution<T>,
{
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> FieldElement<T> {
        FieldElement(rng.gen::<T>().fold())
    }
}
