use super::Processor;
use crate::error::EffectError;

/// Quantizes samples to a signed integer grid of `bit_depth` bits.
pub struct Bitcrush {
    steps: f32,
}

impl Bitcrush {
    pub fn new(bit_depth: u32) -> Result<Self, EffectError> {
        if !(1..=24).contains(&bit_depth) {
            return Err(EffectError::InvalidParameter {
                effect: "bitcrush",
                reason: format!("bit_depth = {bit_depth} outside 1..=24"),
            });
        }
        Ok(Self {
            steps: 2f32.powi(bit_depth as i32 - 1),
        })
    }
}

impl Processor for Bitcrush {
    fn process(&mut self, input: f32) -> f32 {
        (input * self.steps).round() / self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snaps_to_eight_bit_grid() {
        let mut crush = Bitcrush::new(8).unwrap();
        assert_eq!(crush.process(0.3), 38.0 / 128.0);
        assert_eq!(crush.process(-0.999), -1.0);
        assert_eq!(crush.process(0.001), 0.0);
        for x in [0.11f32, -0.42, 0.77] {
            let y = crush.process(x);
            assert_eq!((y * 128.0).fract(), 0.0);
            assert!((x - y).abs() <= 0.5 / 128.0);
        }
    }

    #[test]
    fn rejects_zero_bits() {
        assert!(Bitcrush::new(0).is_err());
    }
}
