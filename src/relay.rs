//! Linear relay network.
//!
//! Adjacent nodes of a chain agree on pairwise keys with BB84, then a message
//! travels hop by hop: each sender encrypts with the key it shares with the
//! next node, the receiver decrypts and forwards the plaintext.

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{info, warn};

use crate::cipher;
use crate::core::errors::RelayError;
use crate::core::{ClassicalChannel, QuantumChannel};
use crate::node::Node;
use crate::progress::Progress;
use crate::protocols::bb84::{self, Bb84Result};

/// Key agreement outcome for one link of the chain.
#[derive(Clone, Debug, PartialEq)]
pub struct LinkReport {
    pub from: String,
    pub to: String,
    /// Exchanges run until the key was established, including the successful one.
    pub attempts: usize,
    /// Wall-clock time spent on all attempts of this link.
    pub elapsed: Duration,
    /// Statistics of the successful exchange.
    pub result: Bb84Result,
}

/// One encrypted transmission between adjacent nodes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hop {
    pub from: String,
    pub to: String,
    /// Hex-encoded `nonce || ciphertext || tag`.
    pub ciphertext: String,
    /// Plaintext recovered by the receiver.
    pub decrypted: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayTrace {
    pub hops: Vec<Hop>,
    /// Message as read by the last node of the chain.
    pub delivered: String,
}

/// Time spent agreeing keys over the whole chain.
pub fn total_qkd_time(links: &[LinkReport]) -> Duration {
    links.iter().map(|link| link.elapsed).sum()
}

/// Runs BB84 between every pair of adjacent nodes, in chain order.
///
/// A link whose exchange aborts is retried with fresh randomness, up to
/// `max_attempts` exchanges in total (at least one is always made). The first
/// link that never succeeds stops the chain; keys stored by earlier links are
/// kept.
pub fn establish_chain<R: Rng + ?Sized>(
    nodes: &mut [Node],
    key_length: usize,
    max_attempts: usize,
    qchannel: &QuantumChannel,
    cchannel: &ClassicalChannel,
    rng: &mut R,
    progress: Progress<'_>,
) -> Result<Vec<LinkReport>, RelayError> {
    if nodes.len() < 2 {
        return Err(RelayError::TooFewNodes(nodes.len()));
    }
    let max_attempts = max_attempts.max(1);
    let mut links = Vec::with_capacity(nodes.len() - 1);

    for i in 0..nodes.len() - 1 {
        let (left, right) = nodes.split_at_mut(i + 1);
        let (alice, bob) = (&mut left[i], &mut right[0]);
        progress.report(&format!("QKD: {} -> {}", alice.name(), bob.name()));

        let started = Instant::now();
        let mut attempt = 0;
        let result = loop {
            attempt += 1;
            let result =
                bb84::run_with_progress(alice, bob, key_length, qchannel, cchannel, rng, progress);
            match result.abort.clone() {
                None => break result,
                Some(reason) if attempt >= max_attempts => {
                    warn!(
                        from = alice.name(),
                        to = bob.name(),
                        attempts = attempt,
                        "giving up on link"
                    );
                    return Err(RelayError::KeyExchangeAborted {
                        from: alice.name().to_owned(),
                        to: bob.name().to_owned(),
                        attempts: attempt,
                        reason,
                    });
                }
                Some(reason) => {
                    progress.report(&format!(
                        "QKD {} -> {}: retrying ({attempt}/{max_attempts} failed: {reason})",
                        alice.name(),
                        bob.name()
                    ));
                }
            }
        };

        links.push(LinkReport {
            from: alice.name().to_owned(),
            to: bob.name().to_owned(),
            attempts: attempt,
            elapsed: started.elapsed(),
            result,
        });
    }

    info!(
        links = links.len(),
        elapsed = ?total_qkd_time(&links),
        "relay chain established"
    );
    Ok(links)
}

/// Forwards `message` along the chain using the keys from [`establish_chain`].
///
/// # Errors
///
/// - [`RelayError::TooFewNodes`] for chains shorter than two nodes.
/// - [`RelayError::MissingKey`] if either end of a hop has no key for the other.
/// - [`RelayError::Cipher`] if a hop fails to encrypt or authenticate, for
///   instance when the two ends hold different keys.
pub fn relay_message(
    nodes: &[Node],
    message: &str,
    progress: Progress<'_>,
) -> Result<RelayTrace, RelayError> {
    if nodes.len() < 2 {
        return Err(RelayError::TooFewNodes(nodes.len()));
    }

    progress.report(&format!("Original message: {message}"));
    let mut current = message.to_owned();
    let mut hops = Vec::with_capacity(nodes.len() - 1);

    for pair in nodes.windows(2) {
        let (sender, receiver) = (&pair[0], &pair[1]);
        let missing = || RelayError::MissingKey {
            from: sender.name().to_owned(),
            to: receiver.name().to_owned(),
        };
        let cipher_error = |source| RelayError::Cipher {
            from: sender.name().to_owned(),
            to: receiver.name().to_owned(),
            source,
        };
        let sender_key = sender.shared_key(receiver.name()).ok_or_else(missing)?;
        let receiver_key = receiver.shared_key(sender.name()).ok_or_else(missing)?;

        progress.report(&format!("{} encrypts: '{current}'", sender.name()));
        let payload = cipher::encrypt(sender_key, &current).map_err(cipher_error)?;
        let ciphertext = hex::encode(&payload);
        progress.report(&format!(
            "{} sends encrypted to {}: {}",
            sender.name(),
            receiver.name(),
            ciphertext
        ));

        let decrypted = cipher::decrypt(receiver_key, &payload).map_err(cipher_error)?;
        progress.report(&format!("{} decrypts: '{decrypted}'", receiver.name()));

        hops.push(Hop {
            from: sender.name().to_owned(),
            to: receiver.name().to_owned(),
            ciphertext,
            decrypted: decrypted.clone(),
        });
        current = decrypted;
    }

    if let Some(last) = nodes.last() {
        progress.report(&format!("Final message at {}: {current}", last.name()));
    }
    info!(hops = hops.len(), "message relayed");

    Ok(RelayTrace {
        hops,
        delivered: current,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::CipherError;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::cell::RefCell;

    fn chain(names: &[&str]) -> Vec<Node> {
        names.iter().map(|name| Node::new(*name, 3)).collect()
    }

    #[test]
    fn keys_are_pairwise_along_the_chain() {
        let mut nodes = chain(&["Alice", "Bob", "Charlie", "Dave"]);
        let mut rng = StdRng::seed_from_u64(3);
        let links = establish_chain(
            &mut nodes,
            128,
            3,
            &QuantumChannel::ideal(),
            &ClassicalChannel::default(),
            &mut rng,
            Progress::silent(),
        )
        .unwrap();

        assert_eq!(links.len(), 3);
        for (link, pair) in links.iter().zip(nodes.windows(2)) {
            assert_eq!(link.from, pair[0].name());
            assert_eq!(link.to, pair[1].name());
            assert!((1..=3).contains(&link.attempts));
            assert!(link.result.is_established());
            let key = pair[0].shared_key(pair[1].name()).unwrap();
            assert_eq!(key.len(), 128);
            assert_eq!(pair[1].shared_key(pair[0].name()), Some(key));
        }
        // Only adjacent nodes share keys
        assert_eq!(nodes[0].peers(), vec!["Bob"]);
        assert_eq!(nodes[1].peers(), vec!["Alice", "Charlie"]);
        assert_eq!(nodes[3].peers(), vec!["Charlie"]);
    }

    #[test]
    fn eavesdropped_chain_stops_at_first_link() {
        let mut nodes = chain(&["Alice", "Bob", "Charlie"]);
        let mut rng = StdRng::seed_from_u64(11);
        let err = establish_chain(
            &mut nodes,
            128,
            3,
            &QuantumChannel::new(0.0, 1.0).unwrap(),
            &ClassicalChannel::default(),
            &mut rng,
            Progress::silent(),
        )
        .unwrap_err();

        match err {
            RelayError::KeyExchangeAborted {
                from,
                to,
                attempts,
                ..
            } => {
                assert_eq!((from.as_str(), to.as_str()), ("Alice", "Bob"));
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(nodes.iter().all(|node| node.peers().is_empty()));
    }

    #[test]
    fn too_few_nodes() {
        let mut single = chain(&["Alice"]);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            establish_chain(
                &mut single,
                8,
                1,
                &QuantumChannel::ideal(),
                &ClassicalChannel::default(),
                &mut rng,
                Progress::silent(),
            ),
            Err(RelayError::TooFewNodes(1))
        );
        assert_eq!(
            relay_message(&single, "hi", Progress::silent()),
            Err(RelayError::TooFewNodes(1))
        );
    }

    #[test]
    fn message_survives_every_hop() {
        let mut nodes = chain(&["Alice", "Bob", "Charlie"]);
        nodes[0].store_shared_key("Bob", "1100");
        nodes[1].store_shared_key("Alice", "1100");
        nodes[1].store_shared_key("Charlie", "0111");
        nodes[2].store_shared_key("Bob", "0111");

        let seen = RefCell::new(Vec::new());
        let sink = |msg: &str| seen.borrow_mut().push(msg.to_owned());
        let trace = relay_message(&nodes, "Hello Quantum World!", Progress::new(&sink)).unwrap();

        assert_eq!(trace.delivered, "Hello Quantum World!");
        assert_eq!(trace.hops.len(), 2);
        for hop in &trace.hops {
            assert_eq!(hop.decrypted, "Hello Quantum World!");
            let bytes = hex::decode(&hop.ciphertext).unwrap();
            assert_eq!(bytes.len(), cipher::NONCE_SIZE + "Hello Quantum World!".len() + 16);
        }
        let seen = seen.borrow();
        assert_eq!(seen.first().unwrap(), "Original message: Hello Quantum World!");
        assert_eq!(seen.last().unwrap(), "Final message at Charlie: Hello Quantum World!");
    }

    #[test]
    fn missing_key_names_the_hop() {
        let mut nodes = chain(&["Alice", "Bob", "Charlie"]);
        nodes[0].store_shared_key("Bob", "1");
        nodes[1].store_shared_key("Alice", "1");

        assert_eq!(
            relay_message(&nodes, "hi", Progress::silent()),
            Err(RelayError::MissingKey {
                from: "Bob".into(),
                to: "Charlie".into(),
            })
        );
    }

    #[test]
    fn mismatched_keys_fail_authentication() {
        let mut nodes = chain(&["Alice", "Bob"]);
        nodes[0].store_shared_key("Bob", "1010");
        nodes[1].store_shared_key("Alice", "0101");

        assert_eq!(
            relay_message(&nodes, "hi", Progress::silent()),
            Err(RelayError::Cipher {
                from: "Alice".into(),
                to: "Bob".into(),
                source: CipherError::Integrity,
            })
        );
    }
}
