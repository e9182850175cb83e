//! BB84 Quantum Key Distribution Protocol.
//!
//! Single pass, no retries: generation, transmission, basis reconciliation,
//! error sampling, abort decision and key derivation.
//!
//! The model is deliberately simplified: disclosed test bits are discarded but
//! no error correction or privacy amplification follows. Any mismatch among the
//! test bits aborts the exchange.

use crate::core::errors::AbortReason;
use crate::core::utils::render_bits;
use crate::core::{Basis, ClassicalChannel, QuantumChannel};
use crate::node::Node;
use crate::progress::Progress;
use rand::Rng;
use rand::seq::index;
use tracing::{debug, info, warn};

/// Qubits sent per requested key bit.
///
/// About half of the qubits survive sifting, and a fifth of those are
/// disclosed, so a key of `L` bits needs roughly `1.25 L` of the `3 L` bases
/// to match. Short keys miss that margin often even on an ideal channel.
pub const OVERSAMPLING: usize = 3;

/// Fraction of the sifted bits disclosed for error estimation.
pub const SAMPLE_FRACTION: f64 = 0.2;

/// The result of a BB84 exchange.
#[derive(Clone, Debug, PartialEq)]
pub struct Bb84Result {
    /// The agreed key as binary digits, `None` when the exchange aborted.
    pub key: Option<String>,
    /// Why no key was produced.
    pub abort: Option<AbortReason>,
    /// Number of qubits sent.
    pub raw_length: usize,
    /// Number of positions where both bases agreed.
    pub sifted_length: usize,
    /// Number of sifted bits disclosed for testing.
    pub sample_size: usize,
    /// Disclosed bits that disagreed.
    pub errors: usize,
    /// Quantum bit error rate of the disclosed sample, in percent.
    pub qber: f64,
}

impl Bb84Result {
    pub fn is_established(&self) -> bool {
        self.key.is_some()
    }
}

/// Random choices of one session.
struct Preparation {
    key_length: usize,
    sender_bits: Vec<bool>,
    sender_bases: Vec<Basis>,
    receiver_bases: Vec<Basis>,
}

impl Preparation {
    fn random<R: Rng + ?Sized>(key_length: usize, rng: &mut R) -> Self {
        let raw_length = key_length * OVERSAMPLING;
        let sender_bits = (0..raw_length).map(|_| rng.random_bool(0.5)).collect();
        let sender_bases = (0..raw_length).map(|_| Basis::random(rng)).collect();
        let receiver_bases = (0..raw_length).map(|_| Basis::random(rng)).collect();

        Self {
            key_length,
            sender_bits,
            sender_bases,
            receiver_bases,
        }
    }
}

/// Number of sifted bits disclosed for testing: `max(1, floor(0.2 * sifted))`.
pub fn sample_size(sifted_length: usize) -> usize {
    ((sifted_length as f64 * SAMPLE_FRACTION).floor() as usize).max(1)
}

/// Runs BB84 between `alice` (sender) and `bob` (receiver).
///
/// On success both nodes store the same key of exactly `key_length` bits under
/// each other's name. On abort neither node is modified.
///
/// An ideal channel never produces [`AbortReason::MismatchDetected`], but it
/// can still end in [`AbortReason::InsufficientSiftedBits`] when too few bases
/// match. That happens about half the time for `key_length == 1`, roughly one
/// run in five at 4 bits, 7 % at 16 bits, 3 % at 32 bits and well under 1 %
/// from 128 bits on. Callers wanting a key for short lengths retry, as
/// [`crate::relay::establish_chain`] does.
pub fn run<R: Rng + ?Sized>(
    alice: &mut Node,
    bob: &mut Node,
    key_length: usize,
    qchannel: &QuantumChannel,
    cchannel: &ClassicalChannel,
    rng: &mut R,
) -> Bb84Result {
    run_with_progress(
        alice,
        bob,
        key_length,
        qchannel,
        cchannel,
        rng,
        Progress::silent(),
    )
}

/// [`run`] reporting each completed step to `progress`.
pub fn run_with_progress<R: Rng + ?Sized>(
    alice: &mut Node,
    bob: &mut Node,
    key_length: usize,
    qchannel: &QuantumChannel,
    cchannel: &ClassicalChannel,
    rng: &mut R,
    progress: Progress<'_>,
) -> Bb84Result {
    let preparation = Preparation::random(key_length, rng);
    progress.report(&format!(
        "QKD {} -> {}: prepared {} qubits",
        alice.name(),
        bob.name(),
        preparation.sender_bits.len()
    ));
    exchange(alice, bob, preparation, (qchannel, cchannel), rng, progress)
}

fn exchange<R: Rng + ?Sized>(
    alice: &mut Node,
    bob: &mut Node,
    preparation: Preparation,
    (qchannel, cchannel): (&QuantumChannel, &ClassicalChannel),
    rng: &mut R,
    progress: Progress<'_>,
) -> Bb84Result {
    let Preparation {
        key_length,
        sender_bits,
        sender_bases,
        receiver_bases,
    } = preparation;

    let mut result = Bb84Result {
        key: None,
        abort: None,
        raw_length: sender_bits.len(),
        sifted_length: 0,
        sample_size: 0,
        errors: 0,
        qber: 0.0,
    };

    // Transmission
    let receiver_bits: Vec<bool> = sender_bits
        .iter()
        .zip(&sender_bases)
        .zip(&receiver_bases)
        .map(|((&bit, &s_basis), &r_basis)| qchannel.transmit(bit, s_basis, r_basis, rng))
        .collect();
    progress.report(&format!(
        "QKD {} -> {}: transmitted {} qubits",
        alice.name(),
        bob.name(),
        receiver_bits.len()
    ));

    // Basis reconciliation over the public channel
    let announced = cchannel.send(alice.name(), bob.name(), sender_bases);
    let sifted: Vec<usize> = announced
        .iter()
        .zip(&receiver_bases)
        .enumerate()
        .filter_map(|(i, (a, b))| (a == b).then_some(i))
        .collect();
    let raw_sender: Vec<bool> = sifted.iter().map(|&i| sender_bits[i]).collect();
    let raw_receiver: Vec<bool> = sifted.iter().map(|&i| receiver_bits[i]).collect();
    result.sifted_length = raw_sender.len();
    progress.report(&format!(
        "QKD {} -> {}: sifted {} of {} bits",
        alice.name(),
        bob.name(),
        result.sifted_length,
        result.raw_length
    ));

    let sample = sample_size(result.sifted_length);
    let required = key_length + sample;
    if result.sifted_length < required {
        let reason = AbortReason::InsufficientSiftedBits {
            available: result.sifted_length,
            required,
        };
        warn!(from = alice.name(), to = bob.name(), %reason, "BB84 aborted");
        progress.report(&format!("QKD {} -> {} aborted: {reason}", alice.name(), bob.name()));
        result.abort = Some(reason);
        return result;
    }

    // Error sampling
    let test_indices = index::sample(rng, result.sifted_length, sample).into_vec();
    let disclosed: Vec<(usize, bool)> = test_indices.iter().map(|&i| (i, raw_sender[i])).collect();
    let disclosed = cchannel.send(alice.name(), bob.name(), disclosed);

    let mismatches = disclosed
        .iter()
        .filter(|&&(i, bit)| raw_receiver[i] != bit)
        .count();
    result.sample_size = sample;
    result.errors = mismatches;
    result.qber = mismatches as f64 / sample as f64 * 100.0;
    debug!(
        sample,
        mismatches,
        qber = result.qber,
        "BB84 error sampling complete"
    );

    if mismatches > 0 {
        let reason = AbortReason::MismatchDetected {
            mismatches,
            sampled: sample,
        };
        warn!(from = alice.name(), to = bob.name(), %reason, "BB84 aborted");
        progress.report(&format!("QKD {} -> {} aborted: {reason}", alice.name(), bob.name()));
        result.abort = Some(reason);
        return result;
    }

    // Key derivation: drop the disclosed positions, keep the first `key_length`
    let mut tested = vec![false; result.sifted_length];
    for &i in &test_indices {
        tested[i] = true;
    }
    let key_bits: Vec<bool> = raw_sender
        .iter()
        .zip(&tested)
        .filter_map(|(&bit, &was_tested)| (!was_tested).then_some(bit))
        .take(key_length)
        .collect();
    let key = render_bits(&key_bits);

    alice.store_shared_key(bob.name(), key.clone());
    bob.store_shared_key(alice.name(), key.clone());

    info!(
        from = alice.name(),
        to = bob.name(),
        key_length,
        sifted = result.sifted_length,
        "BB84 key established"
    );
    progress.report(&format!(
        "QKD {} -> {}: {}-bit key established",
        alice.name(),
        bob.name(),
        key_length
    ));
    result.key = Some(key);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn ideal_channels() -> (QuantumChannel, ClassicalChannel) {
        (QuantumChannel::ideal(), ClassicalChannel::default())
    }

    #[test]
    fn sample_size_is_a_fifth_with_floor_of_one() {
        assert_eq!(sample_size(0), 1);
        assert_eq!(sample_size(4), 1);
        assert_eq!(sample_size(10), 2);
        assert_eq!(sample_size(192), 38);
    }

    #[test]
    fn ideal_channel_agrees_on_key() {
        let (q, c) = ideal_channels();
        let mut rng = StdRng::seed_from_u64(42);

        for key_length in [128, 256] {
            let mut alice = Node::new("Alice", 1);
            let mut bob = Node::new("Bob", 1);
            let result = run(&mut alice, &mut bob, key_length, &q, &c, &mut rng);

            let key = result.key.expect("ideal channel must establish a key");
            assert_eq!(key.len(), key_length);
            assert!(key.chars().all(|ch| ch == '0' || ch == '1'));
            assert_eq!(alice.shared_key("Bob"), Some(key.as_str()));
            assert_eq!(bob.shared_key("Alice"), Some(key.as_str()));
            assert_eq!(result.errors, 0);
            assert_eq!(result.raw_length, key_length * OVERSAMPLING);
            assert_eq!(result.sample_size, sample_size(result.sifted_length));
        }
    }

    #[test]
    fn full_eavesdropping_is_detected_for_long_keys() {
        let c = ClassicalChannel::default();
        let q = QuantumChannel::new(0.0, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(2024);

        let mut detected = 0;
        for _ in 0..30 {
            let mut alice = Node::new("Alice", 1);
            let mut bob = Node::new("Bob", 1);
            let result = run(&mut alice, &mut bob, 128, &q, &c, &mut rng);

            assert!(result.key.is_none());
            assert_eq!(alice.shared_key("Bob"), None);
            assert_eq!(bob.shared_key("Alice"), None);
            if matches!(result.abort, Some(AbortReason::MismatchDetected { .. })) {
                detected += 1;
            }
        }
        assert!(detected >= 27, "detected = {detected}");
    }

    #[test]
    fn detection_rate_grows_with_key_length() {
        let c = ClassicalChannel::default();
        let q = QuantumChannel::new(0.0, 1.0).unwrap();
        let mut rng = StdRng::seed_from_u64(77);
        let trials = 200;

        let mut detection_rate = |key_length| {
            let detected = (0..trials)
                .filter(|_| {
                    let mut alice = Node::new("Alice", 1);
                    let mut bob = Node::new("Bob", 1);
                    let result = run(&mut alice, &mut bob, key_length, &q, &c, &mut rng);
                    matches!(result.abort, Some(AbortReason::MismatchDetected { .. }))
                })
                .count();
            detected as f64 / trials as f64
        };

        let short = detection_rate(8);
        let long = detection_rate(128);
        assert!(short < 0.9, "short = {short}");
        assert!(long > 0.95, "long = {long}");
        assert!(long > short);
    }

    #[test]
    fn insufficient_sifted_bits_abort() {
        let (q, c) = ideal_channels();
        let mut rng = StdRng::seed_from_u64(5);
        let mut alice = Node::new("Alice", 1);
        let mut bob = Node::new("Bob", 1);

        // Only two matching bases out of twelve positions
        let mut receiver_bases = vec![Basis::X; 12];
        receiver_bases[0] = Basis::Z;
        receiver_bases[5] = Basis::Z;
        let preparation = Preparation {
            key_length: 4,
            sender_bits: vec![true; 12],
            sender_bases: vec![Basis::Z; 12],
            receiver_bases,
        };

        let result = exchange(
            &mut alice,
            &mut bob,
            preparation,
            (&q, &c),
            &mut rng,
            Progress::silent(),
        );

        assert_eq!(result.key, None);
        assert_eq!(
            result.abort,
            Some(AbortReason::InsufficientSiftedBits {
                available: 2,
                required: 5
            })
        );
        assert_eq!(result.sifted_length, 2);
        assert_eq!(alice.shared_key("Bob"), None);
    }

    #[test]
    fn short_keys_on_ideal_channel_only_abort_for_lack_of_bits() {
        let (q, c) = ideal_channels();
        let mut rng = StdRng::seed_from_u64(31);

        for key_length in [1, 4, 8, 16] {
            let mut aborts = 0;
            for _ in 0..300 {
                let mut alice = Node::new("Alice", 1);
                let mut bob = Node::new("Bob", 1);
                let result = run(&mut alice, &mut bob, key_length, &q, &c, &mut rng);
                match result.abort {
                    None => assert_eq!(result.key.map(|k| k.len()), Some(key_length)),
                    Some(AbortReason::InsufficientSiftedBits { available, required }) => {
                        assert!(available < required);
                        assert_eq!(result.errors, 0);
                        aborts += 1;
                    }
                    Some(reason) => panic!("ideal channel aborted with {reason}"),
                }
            }
            // Short keys do abort at a visible rate
            if key_length <= 4 {
                assert!(aborts > 10, "L = {key_length}: {aborts} aborts");
            }
        }
    }

    #[test]
    fn key_is_sender_bits_minus_tested_positions() {
        let (q, c) = ideal_channels();
        let mut rng = StdRng::seed_from_u64(8);
        let mut alice = Node::new("Alice", 1);
        let mut bob = Node::new("Bob", 1);

        // All bases agree, alternating bits: whatever is tested, the key must be
        // a sub-sequence of the sent bits with the right length.
        let bits: Vec<bool> = (0..30).map(|i| i % 2 == 0).collect();
        let preparation = Preparation {
            key_length: 10,
            sender_bits: bits,
            sender_bases: vec![Basis::X; 30],
            receiver_bases: vec![Basis::X; 30],
        };

        let result = exchange(
            &mut alice,
            &mut bob,
            preparation,
            (&q, &c),
            &mut rng,
            Progress::silent(),
        );

        assert_eq!(result.sifted_length, 30);
        assert_eq!(result.sample_size, 6);
        assert_eq!(result.key.as_deref().map(str::len), Some(10));
        assert_eq!(alice.shared_key("Bob"), bob.shared_key("Alice"));
    }

    #[test]
    fn progress_reports_each_step() {
        let (q, c) = ideal_channels();
        let mut rng = StdRng::seed_from_u64(13);
        let mut alice = Node::new("Alice", 1);
        let mut bob = Node::new("Bob", 1);
        let seen = std::cell::RefCell::new(Vec::new());
        let sink = |msg: &str| seen.borrow_mut().push(msg.to_owned());

        let result = run_with_progress(
            &mut alice,
            &mut bob,
            128,
            &q,
            &c,
            &mut rng,
            Progress::new(&sink),
        );

        assert!(result.is_established());
        let seen = seen.into_inner();
        assert_eq!(seen.len(), 4);
        assert!(seen[3].contains("128-bit key established"));
    }

    #[test]
    fn same_seed_same_key() {
        let (q, c) = ideal_channels();
        let key = |seed| {
            let mut alice = Node::new("Alice", 1);
            let mut bob = Node::new("Bob", 1);
            run(&mut alice, &mut bob, 24, &q, &c, &mut StdRng::seed_from_u64(seed)).key
        };
        assert_eq!(key(1), key(1));
    }
}
