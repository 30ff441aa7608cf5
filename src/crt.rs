//! The simulated CRT device.
//!
//! A [`Crt`] owns one frame of analog signal, the noisy copy the decoder
//! works from, the sync estimates and burst reference that persist between
//! frames, and the viewer adjustments. Encoders write the analog buffer;
//! [`Crt::decode`] turns it back into RGB.

use crate::{
    filter::{Equalizer, LowPass},
    math::{sincos14, T14_2PI},
    system::{ChromaPattern, Config, SystemKind, Timing, I_FREQ, L_FREQ, Q_FREQ, Y_FREQ},
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Viewer-facing picture adjustments.
///
/// Out-of-range values are tolerated everywhere: hue wraps modulo 360 and
/// the rest are clamped where they are consumed.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[must_use]
pub struct Adjustments {
    /// Degrees, 0-359.
    pub hue: i32,
    pub saturation: i32,
    pub brightness: i32,
    pub contrast: i32,
    pub black_point: i32,
    pub white_point: i32,
}

impl Default for Adjustments {
    fn default() -> Self {
        Self {
            hue: 0,
            saturation: 18,
            brightness: 0,
            contrast: 180,
            black_point: 0,
            white_point: 100,
        }
    }
}

/// Builds the four-sample subcarrier template for the encoders from a
/// caller phase offset (wrapped modulo 4). Returns the samples and the
/// power-of-two scale to shift their products back down by.
#[must_use]
pub fn carrier_template(phase_offset: i32) -> ([i32; 4], u32) {
    let mut cc = [0; 4];
    for (i, s) in cc.iter_mut().enumerate() {
        let (sn, _) = sincos14(((i as i32 + phase_offset) & 3) * (T14_2PI / 4));
        *s = sn >> 11;
    }
    (cc, 4)
}

/// Composite video encoder/decoder state.
#[derive(Debug, Clone)]
#[must_use]
pub struct Crt {
    pub(crate) config: Config,
    pub(crate) timing: Timing,

    /// One frame of composite signal in IRE-like units. Not cleared
    /// between frames; an encoder overwrites what it cares about.
    pub(crate) analog: Vec<i8>,
    /// Noisy copy of `analog`; decoder-private.
    pub(crate) inp: Vec<i8>,

    /// Last locked-in sync offsets, carried across frames for inertia.
    pub hsync: i32,
    pub vsync: i32,

    /// Most recent burst sample quartet, written by the NES encoder so the
    /// decoder can seed its burst reference with the phase the encoder
    /// actually chose.
    pub(crate) ccf: [i32; 4],
    /// Burst phase-lock accumulator, leaky-integrated over every burst
    /// window the decoder sees.
    pub(crate) ccref: [i32; 4],

    /// Noise generator state; advances every decoded sample.
    pub rn: u32,

    pub adjust: Adjustments,
    /// Average each decoded pixel with the previous frame's, simulating
    /// phosphor persistence.
    pub blend: bool,

    pub(crate) out: Vec<u32>,
    pub(crate) outw: usize,
    pub(crate) outh: usize,

    /// Scanline YIQ scratch, sized once so decoding never allocates.
    pub(crate) yiq: Vec<[i32; 3]>,

    pub(crate) eq_y: Equalizer,
    pub(crate) eq_i: Equalizer,
    pub(crate) eq_q: Equalizer,
    pub(crate) iir_y: LowPass,
    pub(crate) iir_i: LowPass,
    pub(crate) iir_q: LowPass,
}

impl Crt {
    /// Creates a device for the configured system with an output raster of
    /// `outw` by `outh` pixels.
    pub fn new(config: Config, outw: usize, outh: usize) -> Self {
        if config.system == SystemKind::Nes && config.chroma != ChromaPattern::Sawtooth {
            warn!("NES output forces the sawtooth chroma pattern");
        }
        let timing = Timing::new(&config);
        let size = timing.input_size();
        debug!(
            "crt init: {}x{} signal, active {}+{} of {}, out {outw}x{outh}",
            timing.hres, timing.vres, timing.av_beg, timing.av_len, timing.hres,
        );
        // band edges and gains for the Y/I/Q equalizers; gains are Q16 and
        // tied to EQ_P, the cutoffs to the line sample rate
        let eq_y = Equalizer::new(
            timing.khz_to_line(1500),
            timing.khz_to_line(3000),
            timing.hres,
            65536,
            8192,
            9175,
        );
        let eq_i = Equalizer::new(
            timing.khz_to_line(80),
            timing.khz_to_line(1150),
            timing.hres,
            65536,
            65536,
            1311,
        );
        let eq_q = Equalizer::new(
            timing.khz_to_line(80),
            timing.khz_to_line(1000),
            timing.hres,
            65536,
            65536,
            0,
        );
        Self {
            config,
            timing,
            analog: vec![0; size],
            inp: vec![0; size],
            hsync: 0,
            vsync: 0,
            ccf: [0; 4],
            ccref: [0; 4],
            rn: 194,
            adjust: Adjustments::default(),
            blend: false,
            out: vec![0; outw * outh],
            outw,
            outh,
            yiq: vec![[0; 3]; timing.av_len as usize + 1],
            eq_y,
            eq_i,
            eq_q,
            iir_y: LowPass::new(L_FREQ, Y_FREQ),
            iir_i: LowPass::new(L_FREQ, I_FREQ),
            iir_q: LowPass::new(L_FREQ, Q_FREQ),
        }
    }

    /// Restores default viewer adjustments and sync estimates without
    /// touching any buffer.
    pub fn reset(&mut self) {
        self.adjust = Adjustments::default();
        self.hsync = 0;
        self.vsync = 0;
    }

    /// Rebinds the output raster. Signal buffers and sync state are kept.
    pub fn resize(&mut self, outw: usize, outh: usize) {
        self.outw = outw;
        self.outh = outh;
        self.out = vec![0; outw * outh];
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    #[must_use]
    pub const fn timing(&self) -> &Timing {
        &self.timing
    }

    /// Decoded frame, one `0x00RRGGBB` word per pixel.
    #[inline]
    #[must_use]
    pub fn output(&self) -> &[u32] {
        &self.out
    }

    #[inline]
    #[must_use]
    pub const fn output_width(&self) -> usize {
        self.outw
    }

    #[inline]
    #[must_use]
    pub const fn output_height(&self) -> usize {
        self.outh
    }

    /// Raw analog frame, mostly useful for tests and signal scopes.
    #[inline]
    #[must_use]
    pub fn analog(&self) -> &[i8] {
        &self.analog
    }
}
