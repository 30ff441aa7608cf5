//! Streaming filters for bandlimiting and tone shaping.
//!
//! The decoder walks each scanline through a three-band [`Equalizer`] and
//! the encoder bandlimits Y/I/Q through one-pole [`LowPass`] sections. Both
//! are integer filters; coefficients derive from the fixed-point sine and
//! exponential in [`crate::math`].

use crate::math::{exp_mul, expx, sincos14, EXP_ONE, EXP_PI, T14_PI};
use serde::{Deserialize, Serialize};

/// Q16 fixed point for equalizer coefficients and gains.
pub const EQ_P: i32 = 16;
const EQ_R: i32 = 1 << (EQ_P - 1); // rounding
const HISTLEN: usize = 3;
const HISTOLD: usize = HISTLEN - 1; // oldest entry

/// Single-sample streaming filter.
pub trait Filter {
    fn process(&mut self, sample: i32) -> i32;
}

/// Three-band equalizer.
///
/// Splits the input into low/mid/high bands with per-band Q16 gains. The
/// low and high bands are four-stage one-pole low-pass cascades; the high
/// band output is the delayed input minus the high-cutoff cascade.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[must_use]
pub struct Equalizer {
    lf: i32,
    hf: i32,
    g: [i32; 3],
    f_lo: [i32; 4],
    f_hi: [i32; 4],
    h: [i32; HISTLEN],
}

impl Equalizer {
    /// `f_lo`/`f_hi` are the band cutoffs and `rate` the sampling rate, all
    /// in the same units (samples per line here). Gains are Q16.
    pub fn new(f_lo: i32, f_hi: i32, rate: i32, g_lo: i32, g_mid: i32, g_hi: i32) -> Self {
        // one-pole coefficient 2*sin(pi * f / rate), widened to Q16
        let (sn, _) = sincos14(T14_PI * f_lo / rate);
        let lf = 2 * (sn << (EQ_P - 15));
        let (sn, _) = sincos14(T14_PI * f_hi / rate);
        let hf = 2 * (sn << (EQ_P - 15));
        Self {
            lf,
            hf,
            g: [g_lo, g_mid, g_hi],
            f_lo: [0; 4],
            f_hi: [0; 4],
            h: [0; HISTLEN],
        }
    }

    /// Zeroes every stage and the history window.
    pub fn reset(&mut self) {
        self.f_lo = [0; 4];
        self.f_hi = [0; 4];
        self.h = [0; HISTLEN];
    }
}

#[inline]
fn pole(h: i32, c: i32, s: i32) -> i32 {
    h + (((i64::from(c) * i64::from(s - h) + i64::from(EQ_R)) >> EQ_P) as i32)
}

impl Filter for Equalizer {
    fn process(&mut self, sample: i32) -> i32 {
        for i in (1..=HISTOLD).rev() {
            self.h[i] = self.h[i - 1];
        }
        self.h[0] = sample;

        self.f_lo[0] = pole(self.f_lo[0], self.lf, sample);
        self.f_hi[0] = pole(self.f_hi[0], self.hf, sample);
        for i in 1..4 {
            self.f_lo[i] = pole(self.f_lo[i], self.lf, self.f_lo[i - 1]);
            self.f_hi[i] = pole(self.f_hi[i], self.hf, self.f_hi[i - 1]);
        }

        let r = [
            self.f_lo[3],
            self.f_hi[3] - self.f_lo[3],
            self.h[HISTOLD] - self.f_hi[3],
        ];
        let mut out = 0;
        for (band, gain) in r.iter().zip(self.g.iter()) {
            out += ((i64::from(*band) * i64::from(*gain)) >> EQ_P) as i32;
        }
        out
    }
}

/// One-pole IIR low-pass.
///
/// `freq` is the full bandwidth and `limit` the cutoff; the pole is
/// `1 - e^(-pi / (freq / limit))` in Q11.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[must_use]
pub struct LowPass {
    c: i32,
    h: i32,
}

impl LowPass {
    pub fn new(freq: i32, limit: i32) -> Self {
        let rate = (freq << 9) / limit; // cycles/sample rate, Q9
        Self {
            c: EXP_ONE - expx(-((EXP_PI << 9) / rate)),
            h: 0,
        }
    }

    pub fn reset(&mut self) {
        self.h = 0;
    }
}

impl Filter for LowPass {
    #[inline]
    fn process(&mut self, sample: i32) -> i32 {
        self.h += exp_mul(sample - self.h, self.c);
        self.h
    }
}
