//! System variants and line timing geometry.
//!
//! The composite line is partitioned into front porch, sync tip, breezeway,
//! color burst, back porch and active video. The generic NTSC system
//! measures those in nanoseconds; the NES system in PPU pixels.
//! [https://www.nesdev.org/wiki/NTSC_video]()

use serde::{Deserialize, Serialize};

/// Total line bandwidth and the per-channel bandlimits, in Hz/10
/// (i.e. 1431818 is the 14.31818 MHz sampling rate of a full line).
pub const L_FREQ: i32 = 1_431_818;
pub const Y_FREQ: i32 = 420_000; // Luma   (Y) 4.2  MHz
pub const I_FREQ: i32 = 150_000; // Chroma (I) 1.5  MHz
pub const Q_FREQ: i32 = 55_000; // Chroma (Q) 0.55 MHz

/// Which encoder feeds the shared analog buffer.
#[derive(Default, Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[must_use]
pub enum SystemKind {
    #[default]
    Ntsc,
    Nes,
}

impl SystemKind {
    pub const fn as_slice() -> &'static [Self] {
        &[Self::Ntsc, Self::Nes]
    }
}

impl AsRef<str> for SystemKind {
    fn as_ref(&self) -> &str {
        match self {
            Self::Ntsc => "NTSC",
            Self::Nes => "NES",
        }
    }
}

/// Chroma clocks per line, times ten.
///
/// 227.5 cycles per line (the broadcast value) flips subcarrier phase every
/// other line and renders artifacts as a checkerboard; 228 holds phase and
/// renders them as vertical rainbows; 227.3 is what the NES produces.
#[derive(Default, Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[must_use]
pub enum ChromaPattern {
    Rainbow,
    #[default]
    Checkered,
    Sawtooth,
}

impl ChromaPattern {
    pub const fn as_slice() -> &'static [Self] {
        &[Self::Rainbow, Self::Checkered, Self::Sawtooth]
    }

    pub const fn cc_line(&self) -> i32 {
        match self {
            Self::Rainbow => 2280,
            Self::Checkered => 2275,
            Self::Sawtooth => 2273,
        }
    }

    /// Per-line chroma sign for the modulator and demodulator.
    #[inline]
    #[must_use]
    pub const fn phase(&self, line: i32) -> i32 {
        match self {
            Self::Checkered => {
                if line & 1 == 1 {
                    -1
                } else {
                    1
                }
            }
            _ => 1,
        }
    }
}

impl From<usize> for ChromaPattern {
    fn from(value: usize) -> Self {
        match value {
            0 => Self::Rainbow,
            2 => Self::Sawtooth,
            _ => Self::Checkered,
        }
    }
}

/// Subcarrier samples per chroma cycle. More samples per cycle means a
/// denser line and a sharper picture.
#[derive(Default, Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[must_use]
pub enum CbFreq {
    Three,
    #[default]
    Four,
    Six,
}

impl CbFreq {
    pub const fn as_slice() -> &'static [Self] {
        &[Self::Three, Self::Four, Self::Six]
    }

    pub const fn samples(&self) -> i32 {
        match self {
            Self::Three => 3,
            Self::Four => 4,
            Self::Six => 6,
        }
    }
}

/// Device configuration, fixed at construction.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[must_use]
pub struct Config {
    pub system: SystemKind,
    pub chroma: ChromaPattern,
    pub cb_freq: CbFreq,
    /// Widen bright lines by feeding scanline energy back into beam width.
    pub bloom: bool,
    /// Track vertical sync against the signal instead of assuming lock.
    pub vsync_track: bool,
    /// Track horizontal sync against the signal instead of assuming lock.
    pub hsync_track: bool,
    /// NES high-resolution sampling (six samples per chroma cycle).
    pub nes_hires: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            system: SystemKind::default(),
            chroma: ChromaPattern::default(),
            cb_freq: CbFreq::default(),
            bloom: false,
            vsync_track: true,
            hsync_track: true,
            nes_hires: false,
        }
    }
}

impl Config {
    pub fn nes() -> Self {
        Self {
            system: SystemKind::Nes,
            chroma: ChromaPattern::Sawtooth,
            ..Self::default()
        }
    }
}

/// Sample offsets of each line region plus the signal levels, derived once
/// from the configured system.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[must_use]
pub struct Timing {
    pub chroma: ChromaPattern,
    pub cb_freq: i32,
    pub hres: i32,
    pub vres: i32,
    pub top: i32,
    pub bot: i32,
    pub lines: i32,

    pub sync_beg: i32,
    pub bw_beg: i32,
    pub cb_beg: i32,
    pub bp_beg: i32,
    /// Start of the full active period. For the NES this is the left
    /// border; `av_beg` below is the 256-pixel window.
    pub lav_beg: i32,
    pub av_beg: i32,
    pub av_len: i32,
    pub cb_cycles: i32,

    pub white_level: i32,
    pub burst_level: i32,
    pub black_level: i32,
    pub blank_level: i32,
    pub sync_level: i32,

    /// Vertical sync integration threshold multiplier.
    pub vsync_thresh: i32,
    pub nes: bool,
    /// NES only: how far one sample advances the 12-step subcarrier.
    pub phase_step: i32,
    /// NES only: sample position of the abbreviated vsync pulse end.
    pub nes_vsync_end: i32,
}

// Generic NTSC line partition, nanoseconds.
const FP_NS: i32 = 1500; // front porch
const SYNC_NS: i32 = 4700; // sync tip
const BW_NS: i32 = 600; // breezeway
const CB_NS: i32 = 2500; // color burst
const BP_NS: i32 = 1600; // back porch
const LINE_NS: i32 = 63556;
const HB_NS: i32 = FP_NS + SYNC_NS + BW_NS + CB_NS + BP_NS; // h blank
const AV_NS: i32 = LINE_NS - HB_NS; // active video

// NES line partition, PPU pixels. One line is 341 pixels.
const FP_PX: i32 = 9;
const SYNC_PX: i32 = 25;
const BW_PX: i32 = 4;
const CB_PX: i32 = 15;
const BP_PX: i32 = 5;
const PS_PX: i32 = 1; // pulse
const LB_PX: i32 = 15; // left border
const AV_PX: i32 = 256;
const RB_PX: i32 = 11; // right border
const HB_PX: i32 = FP_PX + SYNC_PX + BW_PX + CB_PX + BP_PX;
const LINE_PX: i32 = HB_PX + PS_PX + LB_PX + AV_PX + RB_PX;
// PPU pixel at which the abbreviated NES vertical sync pulse ends
const NES_VSYNC_END_PX: i32 = 327;

pub const VRES: i32 = 262;
pub const CRT_TOP: i32 = 21;
pub const CRT_BOT: i32 = 261;

/// Ten burst cycles are inserted in the back porch window.
pub const CB_CYCLES: i32 = 10;

impl Timing {
    pub fn new(config: &Config) -> Self {
        match config.system {
            SystemKind::Ntsc => Self::ntsc(config.chroma, config.cb_freq),
            SystemKind::Nes => Self::nes(config.nes_hires),
        }
    }

    fn ntsc(chroma: ChromaPattern, cb_freq: CbFreq) -> Self {
        let cb = cb_freq.samples();
        // integer number of subcarrier samples per line
        let hres = chroma.cc_line() * cb / 10;
        let ns2pos = |ns: i32| ns * hres / LINE_NS;
        Self {
            chroma,
            cb_freq: cb,
            hres,
            vres: VRES,
            top: CRT_TOP,
            bot: CRT_BOT,
            lines: CRT_BOT - CRT_TOP,
            sync_beg: ns2pos(FP_NS),
            bw_beg: ns2pos(FP_NS + SYNC_NS),
            cb_beg: ns2pos(FP_NS + SYNC_NS + BW_NS),
            bp_beg: ns2pos(FP_NS + SYNC_NS + BW_NS + CB_NS),
            lav_beg: ns2pos(HB_NS),
            av_beg: ns2pos(HB_NS),
            av_len: ns2pos(AV_NS),
            cb_cycles: CB_CYCLES,
            white_level: 100,
            burst_level: 20,
            black_level: 7,
            blank_level: 0,
            sync_level: -40,
            vsync_thresh: 100,
            nes: false,
            phase_step: 12 / cb,
            nes_vsync_end: 0,
        }
    }

    fn nes(hires: bool) -> Self {
        let chroma = ChromaPattern::Sawtooth;
        let cb = if hires { 6 } else { 4 };
        let hres = chroma.cc_line() * cb / 10;
        let px2pos = |px: i32| px * hres / LINE_PX;
        Self {
            chroma,
            cb_freq: cb,
            hres,
            vres: VRES,
            top: CRT_TOP,
            bot: CRT_BOT,
            lines: CRT_BOT - CRT_TOP,
            sync_beg: px2pos(FP_PX),
            bw_beg: px2pos(FP_PX + SYNC_PX),
            cb_beg: px2pos(FP_PX + SYNC_PX + BW_PX),
            bp_beg: px2pos(FP_PX + SYNC_PX + BW_PX + CB_PX),
            lav_beg: px2pos(HB_PX),
            av_beg: px2pos(HB_PX + PS_PX + LB_PX),
            av_len: px2pos(AV_PX),
            cb_cycles: CB_CYCLES,
            white_level: 110,
            burst_level: 30,
            black_level: 0,
            blank_level: 0,
            sync_level: -37,
            vsync_thresh: if hires { 150 } else { 100 },
            nes: true,
            phase_step: 12 / cb,
            nes_vsync_end: px2pos(NES_VSYNC_END_PX),
        }
    }

    /// Number of samples in one frame of signal.
    #[inline]
    #[must_use]
    pub const fn input_size(&self) -> usize {
        (self.hres * self.vres) as usize
    }

    /// Converts a kHz bandwidth figure to samples per line.
    #[inline]
    #[must_use]
    pub const fn khz_to_line(&self, khz: i32) -> i32 {
        self.hres * (khz * 100) / L_FREQ
    }
}
