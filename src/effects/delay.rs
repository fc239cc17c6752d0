/// Circular delay line with linearly interpolated fractional reads.
pub(crate) struct DelayLine {
    buf: Vec<f32>,
    write: usize,
}

impl DelayLine {
    /// A line able to look back at least `max_delay` samples.
    pub fn new(max_delay: usize) -> Self {
        Self {
            buf: vec![0.0; max_delay + 2],
            write: 0,
        }
    }

    pub fn push(&mut self, x: f32) {
        self.buf[self.write] = x;
        self.write = (self.write + 1) % self.buf.len();
    }

    /// Sample written `delay` pushes ago; `0.0` is the most recent one.
    pub fn read(&self, delay: f32) -> f32 {
        let max = (self.buf.len() - 2) as f32;
        let delay = delay.clamp(0.0, max);
        let whole = delay.floor();
        let frac = delay - whole;
        let a = self.at(whole as usize);
        let b = self.at(whole as usize + 1);
        a + (b - a) * frac
    }

    fn at(&self, back: usize) -> f32 {
        let len = self.buf.len();
        self.buf[(self.write + len - 1 - back) % len]
    }
}

#[cfg(test)]
mod tests {
    use super::DelayLine;

    #[test]
    fn reads_back_and_interpolates() {
        let mut line = DelayLine::new(4);
        for x in [1.0, 2.0, 3.0, 4.0] {
            line.push(x);
        }
        assert_eq!(line.read(0.0), 4.0);
        assert_eq!(line.read(3.0), 1.0);
        assert_eq!(line.read(0.5), 3.5);
        // Clamped to the line length.
        assert_eq!(line.read(100.0), line.read(4.0));
    }
}
