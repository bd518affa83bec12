//! Two-point linear scales.
//!
//! Mirrors the behaviour renderers expect from a linear display scale: a
//! degenerate domain maps everything to the middle of the range, clamping
//! limits output to the range extent, and rounding snaps half-way values
//! upward.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearScale {
    domain: [f64; 2],
    range: [f64; 2],
    clamp: bool,
    round: bool,
}

impl LinearScale {
    pub const fn new(domain: [f64; 2], range: [f64; 2]) -> Self {
        Self {
            domain,
            range,
            clamp: false,
            round: false,
        }
    }

    #[must_use]
    pub const fn clamped(mut self) -> Self {
        self.clamp = true;
        self
    }

    #[must_use]
    pub const fn rounded(mut self) -> Self {
        self.round = true;
        self
    }

    pub const fn domain(&self) -> [f64; 2] {
        self.domain
    }

    pub const fn range(&self) -> [f64; 2] {
        self.range
    }

    /// Maps a domain value into the range.
    pub fn apply(&self, value: f64) -> f64 {
        let t = self.clamp_unit(normalize(self.domain, value));
        let out = interpolate(self.range, t);
        if self.round { (out + 0.5).floor() } else { out }
    }

    /// Maps a range value back into the domain.
    pub fn invert(&self, value: f64) -> f64 {
        let t = self.clamp_unit(normalize(self.range, value));
        interpolate(self.domain, t)
    }

    fn clamp_unit(&self, t: f64) -> f64 {
        if self.clamp { t.clamp(0.0, 1.0) } else { t }
    }
}

fn normalize([a, b]: [f64; 2], value: f64) -> f64 {
    let span = b - a;
    if span.is_nan() {
        f64::NAN
    } else if span == 0.0 {
        0.5
    } else {
        (value - a) / span
    }
}

fn interpolate([a, b]: [f64; 2], t: f64) -> f64 {
    a * (1.0 - t) + b * t
}
