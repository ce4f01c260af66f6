//! Pseudorandom streams for the per-pixel sample pool.

/// Common draw interface for all generator variants.
pub trait RandomSource {
    /// Uniform double in [0, 1) with at least 52 bits of entropy.
    fn uniform64f(&mut self) -> f64;

    /// Uniform float in [0, 1).
    fn uniform32f(&mut self) -> f32 {
        self.uniform64f() as f32
    }

    fn uniform_int(&mut self) -> u32;

    fn uniform(&mut self) -> f64 {
        self.uniform64f()
    }

    /// Uniform double in [a, b).
    fn uniform_range(&mut self, a: f64, b: f64) -> f64 {
        a + (b - a) * self.uniform64f()
    }
}

impl<T: RandomSource + ?Sized> RandomSource for &mut T {
    fn uniform64f(&mut self) -> f64 {
        (**self).uniform64f()
    }

    fn uniform32f(&mut self) -> f32 {
        (**self).uniform32f()
    }

    fn uniform_int(&mut self) -> u32 {
        (**self).uniform_int()
    }
}

// http://xoshiro.di.unimi.it/splitmix64.c
// used to spread a user seed over the generator state
#[derive(Clone, Copy)]
pub struct SplitMix64 {
    pub x: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { x: seed }
    }

    pub fn next(&mut self) -> u64 {
        self.x = self.x.wrapping_add(0x9e3779b97f4a7c15);
        let mut z = self.x;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58476d1ce4e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d049bb133111eb);
        z ^ (z >> 31)
    }
}

// 1.0-biased exponent with masked mantissa bits, so the result is
// uniform over the representable values in [1, 2) before the subtract.
fn f64_from_bits_53(x: u64) -> f64 {
    let bits = (0x3ff_u64 << 52) | (x >> 12);
    f64::from_bits(bits) - 1.0
}

fn f32_from_bits_24(x: u32) -> f32 {
    let bits = (x >> 9) | 0x3f800000;
    f32::from_bits(bits) - 1.0
}

/// xoroshiro128+ with the 2^64 jump, one instance per pixel.
///
/// http://xoshiro.di.unimi.it/xoroshiro128plus.c
#[derive(Clone)]
pub struct XoroshiroPlus128 {
    s: [u64; 2],
}

impl Default for XoroshiroPlus128 {
    fn default() -> Self {
        Self::new(38927482)
    }
}

impl XoroshiroPlus128 {
    pub fn new(seed: u64) -> Self {
        let mut sp = SplitMix64::new(seed);
        // all-zero state is the one forbidden fixed point
        Self {
            s: [sp.next().max(1), sp.next().max(1)],
        }
    }

    fn next(&mut self) -> u64 {
        let s0 = self.s[0];
        let mut s1 = self.s[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.s[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.s[1] = s1.rotate_left(37);

        result
    }

    /// Equivalent to 2^64 calls to next(); generates 2^64 non-overlapping
    /// subsequences for parallel pixel streams.
    pub fn jump(&mut self) {
        const JUMP: [u64; 2] = [0xdf900294d8f554a5, 0x170865df4b3201fc];

        let mut s0 = 0u64;
        let mut s1 = 0u64;
        for j in JUMP {
            for b in 0..64 {
                if j & (1u64 << b) != 0 {
                    s0 ^= self.s[0];
                    s1 ^= self.s[1];
                }
                self.next();
            }
        }

        self.s = [s0, s1];
    }
}

impl RandomSource for XoroshiroPlus128 {
    fn uniform64f(&mut self) -> f64 {
        f64_from_bits_53(self.next())
    }

    fn uniform32f(&mut self) -> f32 {
        f32_from_bits_24(self.next() as u32)
    }

    fn uniform_int(&mut self) -> u32 {
        self.next() as u32
    }
}

/// PCG XSH-RR 64/32.
///
/// - `initstate` is the starting state, any 64-bit value.
/// - `initseq` selects the output sequence, only the low 63 bits matter.
#[derive(Clone)]
pub struct Pcg32 {
    state: u64,
    inc: u64,
}

impl Default for Pcg32 {
    fn default() -> Self {
        Self::new(2, 3)
    }
}

impl Pcg32 {
    pub fn new(initstate: u64, initseq: u64) -> Self {
        let mut rng = Self {
            state: 0,
            inc: (initseq << 1) | 1,
        };
        rng.next();
        rng.state = rng.state.wrapping_add(initstate);
        rng.next();
        rng
    }

    fn next(&mut self) -> u32 {
        let oldstate = self.state;
        self.state = oldstate
            .wrapping_mul(6364136223846793005)
            .wrapping_add(self.inc | 1);
        let xorshifted = (((oldstate >> 18) ^ oldstate) >> 27) as u32;
        let rot = (oldstate >> 59) as u32;
        xorshifted.rotate_right(rot)
    }
}

impl RandomSource for Pcg32 {
    fn uniform64f(&mut self) -> f64 {
        // two 26-bit draws give 52 mantissa bits
        let a = (self.next() >> 6) as u64;
        let b = (self.next() >> 6) as u64;
        let bits = 0x3ff0000000000000_u64 | a | (b << 26);
        f64::from_bits(bits) - 1.0
    }

    fn uniform32f(&mut self) -> f32 {
        f32_from_bits_24(self.next())
    }

    fn uniform_int(&mut self) -> u32 {
        self.next()
    }
}
