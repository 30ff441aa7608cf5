//! Composite signal decoder.
//!
//! One call turns the analog frame back into RGB: inject noise, find
//! vertical and horizontal sync by integrating the signal, phase-lock the
//! color burst, quadrature-demodulate chroma, equalize the bands, then
//! interpolate the scanline onto the output raster. Sync searches that
//! come up empty keep the previous estimate; losing lock gracefully is the
//! point.

use crate::{
    crt::Crt,
    filter::Filter,
    math::{posmod, sincos14},
};
use log::trace;

/// Lines to search around the previous vertical sync estimate.
const VSYNC_WINDOW: i32 = 8;
/// Samples to search around the previous horizontal sync estimate.
const HSYNC_WINDOW: i32 = 8;

// sampling window nudges, tuned against the encoders
const XNUDGE: i32 = -3;
const YNUDGE: i32 = 3;

impl Crt {
    /// Decodes the current analog frame into the output raster with the
    /// given noise amplitude (0 = clean).
    pub fn decode(&mut self, noise: i32) {
        let t = self.timing;
        let noise = noise.max(0);
        let size = t.input_size() as i32;
        let bright = self.adjust.brightness - (t.black_level + self.adjust.black_point);
        let contrast = self.adjust.contrast.clamp(0, 255);
        let saturation = self.adjust.saturation.clamp(0, 100);

        let (huesn, huecs) = sincos14(posmod(self.adjust.hue, 360) * 8192 / 180);
        let (huesn, huecs) = (huesn >> 11, huecs >> 11);

        // signal plus pseudo-random noise; generator state persists so the
        // grain crawls frame to frame
        let mut rn = self.rn;
        for (inp, analog) in self.inp.iter_mut().zip(self.analog.iter()) {
            rn = rn.wrapping_mul(214_019).wrapping_add(140_327_895);
            let grain = ((((rn >> 16) & 0xff) as i32 - 0x7f) * noise) >> 8;
            *inp = (i32::from(*analog) + grain).clamp(-127, 127) as i8;
        }
        self.rn = rn;

        // Vertical sync: integrate candidate lines around the previous
        // estimate until the running sum crosses the sync threshold. The
        // vsync pulse is long, so its threshold is far below anything a
        // video line can reach.
        let thresh = t.vsync_thresh * t.sync_level;
        let mut line = 0;
        let mut cross = 0;
        let mut found = false;
        'vsync: for i in -VSYNC_WINDOW..VSYNC_WINDOW {
            line = posmod(self.vsync + i, t.vres);
            let base = line * t.hres;
            let mut sum = 0;
            for j in 0..t.hres {
                sum += i32::from(self.inp[(base + j) as usize]);
                if sum <= thresh {
                    cross = j;
                    found = true;
                    break 'vsync;
                }
            }
        }
        if !found {
            trace!("vsync gave up, holding {}", self.vsync);
        }
        self.vsync = if self.config.vsync_track { line } else { -3 };
        // crossing in the second half of the line means an odd field
        let mut field = i32::from(cross > t.hres / 2);

        if t.nes {
            // seed the burst reference with the phase the encoder chose
            for (r, f) in self.ccref.iter_mut().zip(self.ccf.iter()) {
                *r = f << 7;
            }
        }

        // beam energy feedback state
        let max_e = (128 + noise / 2) * t.av_len;
        let mut prev_e = 16384 / 8;

        let outw = self.outw as i32;
        let outh = self.outh as i32;
        let ratio = (((outh << 16) / t.lines) + 32768) >> 16;
        field *= ratio / 2;

        for line in t.top..t.bot {
            let beg = (line - t.top) * outh / t.lines + field;
            let end = (line - t.top + 1) * outh / t.lines + field;
            if beg >= outh {
                continue;
            }
            let end = end.min(outh);

            let ln = posmod(line + self.vsync, t.vres) * t.hres;

            // horizontal sync, same integration trick over a small window
            let mut sum = 0;
            let mut offset = HSYNC_WINDOW - 1;
            for i in -HSYNC_WINDOW..HSYNC_WINDOW {
                sum += i32::from(self.inp[posmod(ln + self.hsync + t.sync_beg + i, size) as usize]);
                if sum <= 4 * t.sync_level {
                    offset = i;
                    break;
                }
            }
            self.hsync = if self.config.hsync_track {
                posmod(offset + self.hsync, t.hres)
            } else {
                0
            };

            let xpos = posmod(t.av_beg + self.hsync + XNUDGE, t.hres);
            let ypos = posmod(line + self.vsync + YNUDGE, t.vres);
            let pos = xpos + ypos * t.hres;

            // Burst phase-lock: leaky-integrate the burst window into the
            // four-sample reference, aligned to the sync phase.
            let bbase = ln + (self.hsync & !3);
            for i in t.cb_beg..t.cb_beg + t.cb_cycles * t.cb_freq {
                let prev = self.ccref[(i & 3) as usize] * 127 / 128;
                let new = i32::from(self.inp[posmod(bbase + i, size) as usize]);
                self.ccref[(i & 3) as usize] = prev + new;
            }

            // quadrature pair from the burst reference: carrier amplitude
            // carries saturation, phase difference carries hue
            let pa = posmod(self.hsync, 4);
            let dci = self.ccref[((pa + 1) & 3) as usize] - self.ccref[((pa + 3) & 3) as usize];
            let dcq = self.ccref[((pa + 2) & 3) as usize] - self.ccref[pa as usize];
            let mut wave = [0i32; 4];
            wave[0] = ((dci * huecs - dcq * huesn) >> 4) * saturation;
            wave[1] = ((dcq * huecs + dci * huesn) >> 4) * saturation;
            wave[2] = -wave[0];
            wave[3] = -wave[1];
            if t.chroma.phase(ypos) < 0 {
                for w in &mut wave {
                    *w = -*w;
                }
            }

            let (scan_l, scan_r, dx, l, r) = if self.config.bloom {
                let mut sum = 0;
                for i in 0..t.av_len {
                    sum += i32::from(self.inp[posmod(pos + i, size) as usize]);
                }
                prev_e = prev_e * 123 / 128 + (((max_e >> 1) - sum) << 10) / max_e;
                let line_w = t.av_len * 112 / 128 + (prev_e >> 9);
                let scan_l = ((t.av_len / 2) - (line_w >> 1) + 8) << 12;
                let scan_r = (t.av_len - 1) << 12;
                (scan_l, scan_r, (line_w << 12) / outw, scan_l >> 12, scan_r >> 12)
            } else {
                let scan_r = (t.av_len - 1) << 12;
                (0, scan_r, scan_r / outw, 0, t.av_len)
            };

            self.eq_y.reset();
            self.eq_i.reset();
            self.eq_q.reset();
            for i in l..r {
                let sig = i32::from(self.inp[posmod(pos + i, size) as usize]);
                let idx = i as usize;
                self.yiq[idx][0] = self.eq_y.process(sig + bright) << 4;
                self.yiq[idx][1] = self.eq_i.process((sig * wave[(i & 3) as usize]) >> 9) >> 3;
                self.yiq[idx][2] = self.eq_q.process((sig * wave[((i + 3) & 3) as usize]) >> 9) >> 3;
            }

            let row = beg as usize * self.outw;
            let mut x = 0usize;
            let mut p = scan_l;
            while p < scan_r && x < self.outw {
                // Q12 interpolation between neighboring signal samples
                let fr = p & 0xfff;
                let fl = 0xfff - fr;
                let s = (p >> 12) as usize;
                let a = self.yiq[s];
                let b = self.yiq[s + 1];
                let y = ((a[0] * fl) >> 2) + ((b[0] * fr) >> 2);
                let i = ((a[1] * fl) >> 14) + ((b[1] * fr) >> 14);
                let q = ((a[2] * fl) >> 14) + ((b[2] * fr) >> 14);

                let r = ((((y + 3879 * i + 2556 * q) >> 12) * contrast) >> 8).clamp(0, 255);
                let g = ((((y - 1126 * i - 2605 * q) >> 12) * contrast) >> 8).clamp(0, 255);
                let b = ((((y - 4530 * i + 7021 * q) >> 12) * contrast) >> 8).clamp(0, 255);

                let mut px = ((r as u32) << 16) | ((g as u32) << 8) | b as u32;
                if self.blend {
                    // average with what the phosphor still shows
                    px = ((px & 0xfefeff) >> 1) + ((self.out[row + x] & 0xfefeff) >> 1);
                }
                self.out[row + x] = px;
                x += 1;
                p += dx;
            }

            // expand vertically by copying the finished row
            for srow in beg + 1..end {
                let dst = srow as usize * self.outw;
                self.out.copy_within(row..row + self.outw, dst);
            }
        }
    }
}
