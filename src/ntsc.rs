//! Generic RGB to composite encoder.
//!
//! Turns a packed-RGB field into one frame of NTSC signal: sync and
//! equalizing pulses, color burst, and quadrature-modulated YIQ active
//! video. The inverse lives in [`crate::decode`].

use crate::{
    crt::{carrier_template, Crt},
    filter::Filter,
};

/// Input for [`Crt::encode_rgb`].
#[derive(Debug, Copy, Clone)]
#[must_use]
pub struct NtscSettings<'a> {
    /// Packed `0x00RRGGBB` source pixels, `w * h` of them.
    pub rgb: &'a [u32],
    pub w: usize,
    pub h: usize,
    /// Do not rescale; center the image at its natural size, clipped to
    /// the active video window.
    pub raw: bool,
    /// Insert the color burst and modulate chroma. Without it the signal
    /// decodes as monochrome.
    pub as_color: bool,
    /// Field selector for interlaced scan: 0 = even, 1 = odd.
    pub field: i32,
    /// Subcarrier template, one chroma cycle of samples.
    pub cc: [i32; 4],
    /// Power-of-two scale of the `cc` values.
    pub ccs: u32,
}

impl<'a> NtscSettings<'a> {
    /// Color, even-field, rescaling settings with the phase-0 carrier.
    pub fn new(rgb: &'a [u32], w: usize, h: usize) -> Self {
        let (cc, ccs) = carrier_template(0);
        Self {
            rgb,
            w,
            h,
            raw: false,
            as_color: true,
            field: 0,
            cc,
            ccs,
        }
    }
}

// Scanline classes for the vertical blanking interval.
const EQ_PULSE_A_END: i32 = 3; // lines 0-3: equalizing pulses
const VSYNC_BEG: i32 = 4; // lines 4-6: vertical sync pulse
const VSYNC_END: i32 = 6;
const EQ_PULSE_B_BEG: i32 = 7; // lines 7-9: equalizing pulses
const EQ_PULSE_B_END: i32 = 9;

// Pulse edges as percentages of the line. Decodes correctly; not
// broadcast-legal serration.
const EQ_OFFS: [i32; 4] = [4, 50, 54, 100];
const VSYNC_EVEN_OFFS: [i32; 4] = [46, 50, 96, 100];
const VSYNC_ODD_OFFS: [i32; 4] = [4, 50, 96, 100];

impl Crt {
    /// Encodes an RGB field into the analog frame, rescaling to the active
    /// video window.
    pub fn encode_rgb(&mut self, s: &NtscSettings<'_>) {
        self.encode_rgb_inner(s, false);
    }

    /// Full-screen variant for test patterns: stretches to the whole
    /// active area, samples a single source row per line and skips the
    /// interlace offset.
    pub fn encode_rgb_fullscreen(&mut self, s: &NtscSettings<'_>) {
        self.encode_rgb_inner(s, true);
    }

    fn encode_rgb_inner(&mut self, s: &NtscSettings<'_>, fullscreen: bool) {
        let t = self.timing;
        let field = s.field & 1;
        let (w, h) = (s.w as i32, s.h as i32);

        let mut destw = if self.config.bloom {
            (t.av_len * 55500) >> 16
        } else {
            t.av_len
        };
        let mut desth = (t.lines * 64500) >> 16;
        if fullscreen {
            destw = t.av_len;
            desth = t.lines;
        }
        if s.raw {
            destw = w.min(t.av_len);
            desth = h.min(t.lines);
        }

        let mut xo = t.av_beg + 4 + (t.av_len - destw) / 2;
        let yo = if fullscreen || s.raw {
            t.top + (t.lines - desth) / 2
        } else {
            t.top + 4 + (t.lines - desth) / 2
        };
        // align to a subcarrier quadrant and keep the row in bounds
        xo &= !3;
        destw = destw.min(t.hres - xo);

        self.write_blanking(field, s.as_color, &s.cc, s.ccs);

        for y in 0..desth {
            let n = yo + y;
            if n >= t.vres {
                break;
            }
            let (sy_a, sy_b) = if fullscreen {
                let sy = ((y * h / desth).clamp(0, h - 1)) as usize;
                (sy, sy)
            } else {
                // two source rows half a scanline apart, vertically blended
                let field_offset = (field * h + desth) / desth / 2;
                let a = (y * h / desth + field_offset).clamp(0, h - 1) as usize;
                let b = ((y * h + desth / 2) / desth + field_offset).clamp(0, h - 1) as usize;
                (a, b)
            };
            self.iir_y.reset();
            self.iir_i.reset();
            self.iir_q.reset();

            let ph = t.chroma.phase(n);
            let base = (n * t.hres) as usize;
            let wscale = t.white_level * self.adjust.white_point.clamp(0, 200) / 100;
            let pedestal = t.black_level + self.adjust.black_point;

            for x in 0..destw {
                let sx = (x * w / destw) as usize;
                let p_a = s.rgb[sy_a * s.w + sx];
                let p_b = s.rgb[sy_b * s.w + sx];
                let (r_a, g_a, b_a) = split_rgb(p_a);
                let (r_b, g_b, b_b) = split_rgb(p_b);

                // RGB to YIQ, both rows at once
                let fy = (19595 * r_a + 38470 * g_a + 7471 * b_a
                    + 19595 * r_b + 38470 * g_b + 7471 * b_b)
                    >> 15;
                let fi = (39059 * r_a - 18022 * g_a - 21103 * b_a
                    + 39059 * r_b - 18022 * g_b - 21103 * b_b)
                    >> 15;
                let fq = (13894 * r_a - 34275 * g_a + 20382 * b_a
                    + 13894 * r_b - 34275 * g_b + 20382 * b_b)
                    >> 15;

                let fy = self.iir_y.process(fy);
                let (fi, fq) = if s.as_color {
                    (self.iir_i.process(fi) * ph, self.iir_q.process(fq) * ph)
                } else {
                    (0, 0)
                };

                let sx_ph = ((x + xo) & 3) as usize;
                let chroma = (fi * s.cc[sx_ph] + fq * s.cc[(sx_ph + 3) & 3]) >> s.ccs;
                let ire = pedestal + (((fy + chroma) * wscale) >> 10);
                self.analog[base + (xo + x) as usize] = ire.clamp(0, 110) as i8;
            }
        }
    }

    /// Lays down the vertical blanking interval, horizontal blanking on
    /// every video line, and the color burst.
    fn write_blanking(&mut self, field: i32, as_color: bool, cc: &[i32; 4], ccs: u32) {
        let t = self.timing;
        for n in 0..t.vres {
            let base = (n * t.hres) as usize;
            let line = &mut self.analog[base..base + t.hres as usize];
            if n <= EQ_PULSE_A_END || (EQ_PULSE_B_BEG..=EQ_PULSE_B_END).contains(&n) {
                // equalizing pulses: short sync blips, mostly blank
                write_pulses(line, t.hres, &EQ_OFFS, t.sync_level, t.blank_level);
            } else if (VSYNC_BEG..=VSYNC_END).contains(&n) {
                // vertical sync pulse: mostly sync, short blank blips
                let offs = if field == 1 {
                    &VSYNC_ODD_OFFS
                } else {
                    &VSYNC_EVEN_OFFS
                };
                write_pulses(line, t.hres, offs, t.sync_level, t.blank_level);
            } else {
                let mut i = 0usize;
                while i < t.sync_beg as usize {
                    line[i] = t.blank_level as i8; // FP
                    i += 1;
                }
                while i < t.bw_beg as usize {
                    line[i] = t.sync_level as i8; // SYNC
                    i += 1;
                }
                while i < t.av_beg as usize {
                    line[i] = t.blank_level as i8; // BW + CB + BP
                    i += 1;
                }
                if n < t.top || n >= t.bot {
                    while i < t.hres as usize {
                        line[i] = t.blank_level as i8;
                        i += 1;
                    }
                }
                if as_color {
                    for tb in t.cb_beg..t.cb_beg + t.cb_cycles * t.cb_freq {
                        let cb = cc[(tb & 3) as usize];
                        line[tb as usize] = (t.blank_level + ((cb * t.burst_level) >> ccs)) as i8;
                    }
                }
            }
        }
    }
}

#[inline]
fn split_rgb(p: u32) -> (i32, i32, i32) {
    (
        ((p >> 16) & 0xff) as i32,
        ((p >> 8) & 0xff) as i32,
        (p & 0xff) as i32,
    )
}

fn write_pulses(line: &mut [i8], hres: i32, offs: &[i32; 4], sync: i32, blank: i32) {
    let edge = |pct: i32| (pct * hres / 100) as usize;
    let mut i = 0usize;
    while i < edge(offs[0]) {
        line[i] = sync as i8;
        i += 1;
    }
    while i < edge(offs[1]) {
        line[i] = blank as i8;
        i += 1;
    }
    while i < edge(offs[2]) {
        line[i] = sync as i8;
        i += 1;
    }
    while i < edge(offs[3]) {
        line[i] = blank as i8;
        i += 1;
    }
}
