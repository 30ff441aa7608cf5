//! NES PPU to composite encoder.
//!
//! The PPU never produces RGB; it emits a square wave that switches
//! between two voltage levels per color, twelve subcarrier steps per
//! chroma cycle, with three emphasis bits that attenuate two-step spans of
//! the cycle. This encoder models that waveform directly.
//! [https://www.nesdev.org/wiki/NTSC_video]()

use crate::crt::{carrier_template, Crt};
use crate::math::posmod;
use once_cell::sync::Lazy;

// Composite voltage levels in millivolts, terminated: low and high rail
// per two-bit luma.
const LO_MV: [i32; 4] = [228, 312, 552, 880];
const HI_MV: [i32; 4] = [616, 840, 1100, 1100];
const BLANK_MV: i32 = 312;
const WHITE_MV: i32 = 1100;
// emphasis multiplies the signal by 0.746
const ATT_NUM: i32 = 746;
const ATT_DEN: i32 = 1000;

/// Signal level per (rail, emphasis, 6-bit color), as a Q12 fraction of
/// white. Only the luma bits of the color index matter, but indexing by
/// the full six bits keeps the hot path to a single lookup.
static IRE_LEVELS: Lazy<[[[i32; 64]; 2]; 2]> = Lazy::new(|| {
    let mut lut = [[[0; 64]; 2]; 2];
    for (level, rail) in [(0, LO_MV), (1, HI_MV)] {
        for emphasis in 0..2 {
            for p in 0..64 {
                let luma = (p >> 4) & 3;
                let mut mv = rail[luma];
                if emphasis == 1 {
                    mv = mv * ATT_NUM / ATT_DEN;
                }
                lut[level][emphasis][p] = (mv - BLANK_MV) * 4096 / (WHITE_MV - BLANK_MV);
            }
        }
    }
    lut
});

// Which emphasis bits bite at each pair of subcarrier steps: red, green
// and blue each darken a different third of the cycle.
const EMPHASIS_ACTIVE: [i32; 6] = [0x0C0, 0x040, 0x140, 0x100, 0x180, 0x080];

// Field-cycle table: each of the three dot crawl offsets shifts the
// twelve-step pattern by a third of a cycle and rotates the burst template
// to approximately follow (the template only has quarter-cycle
// resolution).
const DOT_CRAWL: [(i32, i32); 3] = [(0, 0), (4, 1), (8, 3)];

/// One sample of the PPU waveform for 9-bit pixel `p` (6-bit color plus
/// 3-bit emphasis) at subcarrier step `phase`.
#[must_use]
pub fn square_sample(p: u16, phase: i32) -> i32 {
    let p = i32::from(p);
    let hue = p & 0x0f;
    // the last two palette columns are black
    if hue >= 0x0e {
        return 0;
    }
    // hue 0 idles high and hue 0x0d idles low; everything between is a
    // half-duty square wave positioned by its hue index
    let level = match hue {
        0 => 1,
        0x0d => 0,
        _ => usize::from((hue + phase) % 12 < 6),
    };
    let emphasis =
        usize::from(((p & 0x1c0) & EMPHASIS_ACTIVE[((phase >> 1) % 6) as usize]) != 0);
    IRE_LEVELS[level][emphasis][(p & 0x3f) as usize]
}

/// Input for [`Crt::encode_nes`].
#[derive(Debug, Copy, Clone)]
#[must_use]
pub struct NesSettings<'a> {
    /// 9-bit PPU pixels (6-bit color index plus 3-bit emphasis), `w * h`.
    pub data: &'a [u16],
    pub w: usize,
    pub h: usize,
    /// Position in the three-field dot crawl cycle, 0-2.
    pub dot_crawl_offset: i32,
    /// The odd-frame short line was skipped, slipping the pattern.
    pub dot_skipped: bool,
    /// Pixel shown outside the 256-pixel active window.
    pub border: u16,
    /// Insert the color burst. Without it the signal decodes as
    /// monochrome.
    pub as_color: bool,
    /// Subcarrier template, one chroma cycle of samples.
    pub cc: [i32; 4],
    /// Power-of-two scale of the `cc` values.
    pub ccs: u32,
}

impl<'a> NesSettings<'a> {
    pub fn new(data: &'a [u16], w: usize, h: usize) -> Self {
        let (cc, ccs) = carrier_template(0);
        Self {
            data,
            w,
            h,
            dot_crawl_offset: 0,
            dot_skipped: false,
            border: 0x0f,
            as_color: true,
            cc,
            ccs,
        }
    }
}

// First scanline of the abbreviated NES vertical sync pulse.
const NES_VSYNC_BEG: i32 = 259;

impl Crt {
    /// Encodes a frame of PPU pixels into the analog buffer and leaves the
    /// burst quartet in `ccf` for the decoder's phase-lock to seed from.
    pub fn encode_nes(&mut self, s: &NesSettings<'_>) {
        let t = self.timing;
        let (w, h) = (s.w as i32, s.h as i32);
        let (mut lo, mut po) = DOT_CRAWL[posmod(s.dot_crawl_offset, 3) as usize];
        if s.dot_skipped {
            // the skipped dot slips pattern and burst together
            lo = (lo + 8) % 12;
            po = (po + 3) & 3;
        }

        let desth = h.min(t.lines);
        let yo = t.top + (t.lines - desth) / 2;

        // blanking, sync and burst for every scanline
        for n in 0..t.vres {
            let base = (n * t.hres) as usize;
            let line = &mut self.analog[base..base + t.hres as usize];
            let mut i = 0usize;
            if n >= NES_VSYNC_BEG {
                // abbreviated vertical sync the console actually emits
                while i < t.sync_beg as usize {
                    line[i] = t.blank_level as i8;
                    i += 1;
                }
                while i < t.nes_vsync_end as usize {
                    line[i] = t.sync_level as i8;
                    i += 1;
                }
                while i < t.hres as usize {
                    line[i] = t.blank_level as i8;
                    i += 1;
                }
                continue;
            }
            while i < t.sync_beg as usize {
                line[i] = t.blank_level as i8; // FP
                i += 1;
            }
            while i < t.bw_beg as usize {
                line[i] = t.sync_level as i8; // SYNC
                i += 1;
            }
            while i < t.lav_beg as usize {
                line[i] = t.blank_level as i8; // BW + CB + BP
                i += 1;
            }
            if n < yo || n >= yo + desth {
                while i < t.hres as usize {
                    line[i] = t.blank_level as i8;
                    i += 1;
                }
            }
            if s.as_color {
                for tb in t.cb_beg..t.cb_beg + t.cb_cycles * t.cb_freq {
                    let cb = s.cc[((tb + po) & 3) as usize];
                    let sample = t.blank_level + ((cb * t.burst_level) >> s.ccs);
                    line[tb as usize] = sample as i8;
                    // hand the burst phase to the decoder
                    self.ccf[(tb & 3) as usize] = sample;
                }
            }
        }

        let wscale = t.white_level * self.adjust.white_point.clamp(0, 200) / 100;
        for y in 0..desth {
            let n = yo + y;
            if n >= NES_VSYNC_BEG {
                // the bottom rows fall into the vertical sync region, as
                // they do into overscan on hardware
                break;
            }
            let sy = ((y * h) / desth).clamp(0, h - 1) as usize;
            let base = (n * t.hres) as usize;
            // subcarrier step at the left edge of the full active period,
            // keyed to the absolute sample column
            let mut phase = posmod(lo + t.phase_step * t.lav_beg, 12);
            for x in t.lav_beg..t.hres {
                let p = if (t.av_beg..t.av_beg + t.av_len).contains(&x) {
                    let sx = (((x - t.av_beg) * 256) / t.av_len).min(w - 1) as usize;
                    s.data[sy * s.w + sx]
                } else {
                    s.border
                };
                // a sample spans a third of a chroma cycle; box-average
                // four consecutive steps of the square wave
                let sq = (square_sample(p, phase)
                    + square_sample(p, phase + 1)
                    + square_sample(p, phase + 2)
                    + square_sample(p, phase + 3))
                    >> 2;
                let ire = t.black_level + ((sq * wscale) >> 12);
                self.analog[base + x as usize] = ire.clamp(-40, 110) as i8;
                phase = (phase + t.phase_step) % 12;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::Config;

    #[test]
    fn black_columns_are_zero() {
        for hue in [0x0e, 0x0f, 0x1e, 0x2f, 0x3e] {
            for phase in 0..12 {
                assert_eq!(square_sample(hue, phase), 0);
            }
        }
    }

    #[test]
    fn hue_zero_idles_high_and_0x0d_low() {
        for phase in 0..12 {
            assert!(square_sample(0x30, phase) > 0, "white high at {phase}");
            assert!(square_sample(0x0d, phase) < 0, "0x0d low at {phase}");
        }
        // bright white sits exactly at full scale
        assert_eq!(square_sample(0x30, 0), 4096);
    }

    #[test]
    fn square_wave_half_duty() {
        // a mid palette hue spends half the cycle high
        let highs = (0..12)
            .filter(|&ph| square_sample(0x16, ph) == square_sample(0x10, 0))
            .count();
        assert_eq!(highs, 6);
    }

    #[test]
    fn emphasis_attenuates() {
        let plain = 0x20u16;
        let emphasized = 0x20u16 | 0x040;
        let attenuated = (0..12)
            .filter(|&ph| square_sample(emphasized, ph) < square_sample(plain, ph));
        assert!(attenuated.count() >= 2);
    }

    #[test]
    fn encode_writes_burst_quartet() {
        let mut crt = Crt::new(Config::nes(), 16, 16);
        let data = vec![0x21u16; 256 * 240];
        crt.encode_nes(&NesSettings::new(&data, 256, 240));
        // quartet mirrors the burst window and carries both polarities
        assert!(crt.ccf.iter().any(|&c| c > 0));
        assert!(crt.ccf.iter().any(|&c| c < 0));
    }

    #[test]
    fn vsync_lines_abbreviated() {
        let mut crt = Crt::new(Config::nes(), 16, 16);
        let data = vec![0x21u16; 256 * 240];
        crt.encode_nes(&NesSettings::new(&data, 256, 240));
        let t = *crt.timing();
        for n in 259..262 {
            let base = (n * t.hres) as usize;
            assert_eq!(crt.analog()[base + t.sync_beg as usize], t.sync_level as i8);
            assert_eq!(
                crt.analog()[base + t.nes_vsync_end as usize],
                t.blank_level as i8
            );
            // much longer than a normal sync tip
            let sync_count = (0..t.hres as usize)
                .filter(|&i| crt.analog()[base + i] == t.sync_level as i8)
                .count();
            assert!(sync_count > (t.bw_beg - t.sync_beg) as usize * 4);
        }
    }

    #[test]
    fn dot_crawl_offsets_shift_the_pattern() {
        let data = vec![0x16u16; 256 * 240];
        let mut frames = Vec::new();
        for offset in 0..3 {
            let mut crt = Crt::new(Config::nes(), 16, 16);
            let mut s = NesSettings::new(&data, 256, 240);
            s.dot_crawl_offset = offset;
            crt.encode_nes(&s);
            let t = *crt.timing();
            let base = (120 * t.hres + t.av_beg) as usize;
            frames.push(crt.analog()[base..base + 64].to_vec());
        }
        assert_ne!(frames[0], frames[1]);
        assert_ne!(frames[1], frames[2]);
    }

    #[test]
    fn border_fills_outside_active_window() {
        let mut crt = Crt::new(Config::nes(), 16, 16);
        let data = vec![0x0fu16; 256 * 240]; // black picture
        let mut s = NesSettings::new(&data, 256, 240);
        s.border = 0x20; // white border
        crt.encode_nes(&s);
        let t = *crt.timing();
        let base = (120 * t.hres) as usize;
        // left border bright, active black
        assert!(crt.analog()[base + t.lav_beg as usize + 2] > 50);
        assert!(crt.analog()[base + (t.av_beg + t.av_len / 2) as usize] <= 1);
    }
}
