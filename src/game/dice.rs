//! Random source for shot accuracy and steal rolls

use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// The only randomness the simulation consumes.
///
/// Everything else in a tick is deterministic, so swapping in a seeded or
/// scripted implementation makes whole matches reproducible.
pub trait Dice: Send {
    /// Uniform sample in `[0, 1)`
    fn unit(&mut self) -> f64;

    /// Fair coin flip
    fn coin(&mut self) -> bool {
        self.unit() < 0.5
    }
}

impl Dice for ChaCha8Rng {
    fn unit(&mut self) -> f64 {
        self.gen::<f64>()
    }

    fn coin(&mut self) -> bool {
        self.gen_bool(0.5)
    }
}

/// Replays a fixed sequence of samples, cycling when exhausted
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct ScriptedDice {
    rolls: Vec<f64>,
    next: usize,
}

#[cfg(test)]
impl ScriptedDice {
    pub fn new(rolls: Vec<f64>) -> Self {
        assert!(!rolls.is_empty(), "scripted dice need at least one roll");
        Self { rolls, next: 0 }
    }

    /// Every roll is 0.0: every shot goes in, every steal succeeds
    pub fn always_hit() -> Self {
        Self::new(vec![0.0])
    }

    /// Every roll is just below 1.0: every shot misses, every steal fails
    pub fn always_miss() -> Self {
        Self::new(vec![0.999])
    }
}

#[cfg(test)]
impl Dice for ScriptedDice {
    fn unit(&mut self) -> f64 {
        let roll = self.rolls[self.next % self.rolls.len()];
        self.next += 1;
        roll
    }
}
