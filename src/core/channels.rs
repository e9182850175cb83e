use std::fmt;
use std::thread;
use std::time::Duration;

use rand::Rng;
use tracing::trace;

use crate::core::errors::ChannelError;

/// Preparation / measurement basis of a single qubit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Basis {
    /// Computational basis {|0>, |1>}.
    Z,
    /// Hadamard basis {|+>, |->}.
    X,
}

impl Basis {
    /// Draws a basis uniformly from {Z, X}.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.random_bool(0.5) {
            Basis::X
        } else {
            Basis::Z
        }
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Basis::Z => f.write_str("Z"),
            Basis::X => f.write_str("X"),
        }
    }
}

/// Authenticated public channel. Models latency only, never corruption.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClassicalChannel {
    delay: Duration,
}

impl ClassicalChannel {
    pub fn new(delay_secs: f64) -> Result<Self, ChannelError> {
        Ok(Self {
            delay: validate_delay(delay_secs)?,
        })
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Delivers `message` from `sender` to `receiver` unchanged after the
    /// configured delay.
    pub fn send<T>(&self, sender: &str, receiver: &str, message: T) -> T {
        trace!(sender, receiver, delay = ?self.delay, "classical send");
        wait(self.delay);
        message
    }
}

/// Single-qubit link with latency and an intercept-resend eavesdropper.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuantumChannel {
    delay: Duration,
    eavesdrop_rate: f64,
}

impl QuantumChannel {
    pub fn new(delay_secs: f64, eavesdrop_rate: f64) -> Result<Self, ChannelError> {
        validate_prob(eavesdrop_rate)?;
        Ok(Self {
            delay: validate_delay(delay_secs)?,
            eavesdrop_rate,
        })
    }

    /// Lossless, untapped, instantaneous channel.
    pub fn ideal() -> Self {
        Self::default()
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn eavesdrop_rate(&self) -> f64 {
        self.eavesdrop_rate
    }

    /// Blocks for the link latency. Used to charge a hop between nodes.
    pub fn wait(&self) {
        wait(self.delay);
    }

    /// Sends `bit` encoded in `sender_basis` and returns what the receiver reads
    /// in `receiver_basis`.
    ///
    /// With probability `eavesdrop_rate` an eavesdropper measures the qubit in a
    /// uniformly random basis; a basis different from the sender's destroys the
    /// encoding and the bit in flight becomes uniformly random. A receiver
    /// measuring in the sender's basis reads the (possibly disturbed) bit, any
    /// other basis yields a uniformly random outcome.
    ///
    /// Every random draw comes from `rng`, so a seeded generator replays the
    /// same outcome.
    pub fn transmit<R: Rng + ?Sized>(
        &self,
        bit: bool,
        sender_basis: Basis,
        receiver_basis: Basis,
        rng: &mut R,
    ) -> bool {
        wait(self.delay);

        let mut in_flight = bit;
        if self.eavesdrop_rate > 0.0 && rng.random_bool(self.eavesdrop_rate) {
            let eve_basis = Basis::random(rng);
            if eve_basis != sender_basis {
                in_flight = rng.random_bool(0.5);
            }
        }

        if sender_basis == receiver_basis {
            in_flight
        } else {
            rng.random_bool(0.5)
        }
    }
}

fn wait(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}

fn validate_delay(secs: f64) -> Result<Duration, ChannelError> {
    Duration::try_from_secs_f64(secs).map_err(|_| ChannelError::InvalidDelay(secs))
}

/// Validate probability parameter
fn validate_prob(p: f64) -> Result<(), ChannelError> {
    if !(0.0..=1.0).contains(&p) {
        return Err(ChannelError::InvalidProbability(p));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::time::Instant;

    #[test]
    fn rejects_invalid_parameters() {
        assert_eq!(
            QuantumChannel::new(-0.1, 0.0),
            Err(ChannelError::InvalidDelay(-0.1))
        );
        assert_eq!(
            QuantumChannel::new(0.0, 1.5),
            Err(ChannelError::InvalidProbability(1.5))
        );
        assert!(matches!(
            QuantumChannel::new(0.0, f64::NAN),
            Err(ChannelError::InvalidProbability(_))
        ));
        assert!(matches!(
            ClassicalChannel::new(f64::INFINITY),
            Err(ChannelError::InvalidDelay(_))
        ));
        assert!(QuantumChannel::new(0.01, 1.0).is_ok());
    }

    #[test]
    fn classical_send_is_pass_through() {
        let channel = ClassicalChannel::new(0.0).unwrap();
        let bases = vec![Basis::Z, Basis::X];
        assert_eq!(channel.send("Alice", "Bob", bases.clone()), bases);
    }

    #[test]
    fn classical_send_blocks_for_the_delay() {
        let channel = ClassicalChannel::new(0.02).unwrap();
        let started = Instant::now();
        assert_eq!(channel.send("Alice", "Bob", 7u8), 7);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn transmit_blocks_once_per_qubit() {
        let channel = QuantumChannel::new(0.005, 0.0).unwrap();
        let mut rng = StdRng::seed_from_u64(3);

        let started = Instant::now();
        for _ in 0..4 {
            assert!(channel.transmit(true, Basis::Z, Basis::Z, &mut rng));
        }
        assert!(started.elapsed() >= Duration::from_millis(20));

        let started = Instant::now();
        channel.wait();
        assert!(started.elapsed() >= channel.delay());
    }

    #[test]
    fn matching_bases_without_eavesdropper_are_exact() {
        let channel = QuantumChannel::ideal();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let bit = rng.random_bool(0.5);
            let basis = Basis::random(&mut rng);
            assert_eq!(channel.transmit(bit, basis, basis, &mut rng), bit);
        }
    }

    #[test]
    fn mismatched_bases_are_random() {
        let channel = QuantumChannel::ideal();
        let mut rng = StdRng::seed_from_u64(11);
        let ones = (0..2000)
            .filter(|_| channel.transmit(false, Basis::Z, Basis::X, &mut rng))
            .count();
        assert!((800..1200).contains(&ones), "ones = {ones}");
    }

    #[test]
    fn eavesdropper_disturbs_a_quarter_of_matching_bits() {
        let channel = QuantumChannel::new(0.0, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let errors = (0..4000)
            .filter(|_| !channel.transmit(true, Basis::X, Basis::X, &mut rng))
            .count();
        // Wrong eavesdropper basis half the time, wrong random bit half of that.
        assert!((800..1200).contains(&errors), "errors = {errors}");
    }

    #[test]
    fn transmit_replays_with_same_seed() {
        let channel = QuantumChannel::new(0.0, 0.5).unwrap();
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..64)
                .map(|i| channel.transmit(i % 3 == 0, Basis::Z, Basis::random(&mut rng), &mut rng))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(99), run(99));
    }
}
