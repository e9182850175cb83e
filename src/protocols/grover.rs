//! Distributed Grover search.
//!
//! Builds the phase oracle and the diffuser for an `n`-bit search space,
//! attributes each amplification round to the participating nodes and samples
//! the composed circuit.
//!
//! Qubit `i` of the data register holds bit `i` counted from the least
//! significant end. Targets given by callers are big-endian strings; they are
//! reversed before reaching [`oracle`], and sampled outcomes are reported
//! big-endian again.

use std::f64::consts::PI;
use std::fmt;

use rand::Rng;
use tracing::{debug, info};

use crate::core::errors::GroverError;
use crate::core::utils::parse_bits;
use crate::core::{Circuit, QuantumChannel};
use crate::node::Node;
use crate::progress::Progress;
use crate::sampler::{Counts, Sampler};

/// Shots taken when the caller has no preference.
pub const DEFAULT_SHOTS: usize = 1024;

/// Largest data register accepted by [`distributed_search`].
pub const MAX_DATA_QUBITS: usize = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepKind {
    Oracle,
    Diffuser,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepKind::Oracle => f.write_str("oracle"),
            StepKind::Diffuser => f.write_str("diffuser"),
        }
    }
}

/// One contribution of a node to the shared circuit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduledStep {
    /// Zero-based amplification round.
    pub round: usize,
    pub node: String,
    pub kind: StepKind,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroverResult {
    /// Most frequent outcome, big-endian.
    pub best: String,
    pub counts: Counts,
    pub iterations: usize,
    pub shots: usize,
    pub schedule: Vec<ScheduledStep>,
}

impl GroverResult {
    /// Observed probability of `outcome`.
    pub fn probability(&self, outcome: &str) -> f64 {
        if self.shots == 0 {
            return 0.0;
        }
        self.counts.get(outcome) as f64 / self.shots as f64
    }
}

/// Optimal number of amplification rounds: `max(1, floor(pi/4 * sqrt(2^n)))`.
pub fn iteration_count(num_qubits: usize) -> usize {
    let amplitude_span = 2f64.powi(num_qubits as i32).sqrt();
    ((PI / 4.0 * amplitude_span).floor() as usize).max(1)
}

/// Ancilla qubits consumed by a phase flip with `controls` control qubits.
pub fn ancilla_required(controls: usize) -> usize {
    controls.saturating_sub(2)
}

/// Flips the phase of the state where every qubit in `controls` and `target`
/// is |1>.
///
/// | controls | construction |
/// |---|---|
/// | 0 | `Z(target)` |
/// | 1 | `CZ(control, target)` |
/// | 2 | `H(target) CCX H(target)` |
/// | k > 2 | `H(target)`, Toffoli V-chain over `k - 2` ancillas, `H(target)` |
///
/// Ancillas must start in |0> and are returned to |0>.
///
/// # Errors
///
/// [`GroverError::InsufficientAncilla`] when fewer than `k - 2` ancillas are
/// supplied. The circuit is left untouched in that case.
pub fn multi_controlled_z(
    circuit: &mut Circuit,
    controls: &[usize],
    target: usize,
    ancilla: &[usize],
) -> Result<(), GroverError> {
    let needed = ancilla_required(controls.len());
    if ancilla.len() < needed {
        return Err(GroverError::InsufficientAncilla {
            controls: controls.len(),
            needed,
            provided: ancilla.len(),
        });
    }

    match controls.len() {
        0 => {
            circuit.z(target);
        }
        1 => {
            circuit.cz(controls[0], target);
        }
        2 => {
            circuit.h(target).ccx(controls[0], controls[1], target).h(target);
        }
        _ => {
            circuit.h(target);
            v_chain_toffoli(circuit, controls, target, &ancilla[..needed]);
            circuit.h(target);
        }
    }
    Ok(())
}

/// Multi-controlled X built from Toffolis. `ancilla.len() == controls.len() - 2`.
fn v_chain_toffoli(circuit: &mut Circuit, controls: &[usize], target: usize, ancilla: &[usize]) {
    let k = controls.len();

    circuit.ccx(controls[0], controls[1], ancilla[0]);
    for i in 2..k - 1 {
        circuit.ccx(controls[i], ancilla[i - 2], ancilla[i - 1]);
    }

    circuit.ccx(controls[k - 1], ancilla[k - 3], target);

    // Uncompute
    for i in (2..k - 1).rev() {
        circuit.ccx(controls[i], ancilla[i - 2], ancilla[i - 1]);
    }
    circuit.ccx(controls[0], controls[1], ancilla[0]);
}

/// Appends the phase oracle marking `target`.
///
/// `target[i]` is the expected value of qubit `i`. Qubits expected at `0` are
/// flipped so the marked state becomes all-ones, the phase flip is applied on
/// the last qubit controlled by all others, and the flips are undone.
pub fn oracle(circuit: &mut Circuit, target: &str, ancilla: &[usize]) -> Result<(), GroverError> {
    let bits = parse_bits(target).ok_or_else(|| GroverError::InvalidTarget(target.to_owned()))?;
    let n = bits.len();
    let controls: Vec<usize> = (0..n - 1).collect();

    // Fail before touching the circuit
    let needed = ancilla_required(controls.len());
    if ancilla.len() < needed {
        return Err(GroverError::InsufficientAncilla {
            controls: controls.len(),
            needed,
            provided: ancilla.len(),
        });
    }

    let zeros: Vec<usize> = (0..n).filter(|&q| !bits[q]).collect();
    for &q in &zeros {
        circuit.x(q);
    }
    multi_controlled_z(circuit, &controls, n - 1, ancilla)?;
    for &q in &zeros {
        circuit.x(q);
    }
    Ok(())
}

/// Appends the inversion-about-the-mean operator over qubits `0..num_qubits`.
pub fn diffuser(
    circuit: &mut Circuit,
    num_qubits: usize,
    ancilla: &[usize],
) -> Result<(), GroverError> {
    if num_qubits == 0 {
        return Err(GroverError::EmptyRegister);
    }
    let controls: Vec<usize> = (0..num_qubits - 1).collect();
    let needed = ancilla_required(controls.len());
    if ancilla.len() < needed {
        return Err(GroverError::InsufficientAncilla {
            controls: controls.len(),
            needed,
            provided: ancilla.len(),
        });
    }

    for q in 0..num_qubits {
        circuit.h(q);
    }
    for q in 0..num_qubits {
        circuit.x(q);
    }
    multi_controlled_z(circuit, &controls, num_qubits - 1, ancilla)?;
    for q in 0..num_qubits {
        circuit.x(q);
    }
    for q in 0..num_qubits {
        circuit.h(q);
    }
    Ok(())
}

/// Searches for `target` (big-endian bit string) with the amplification rounds
/// attributed across `nodes`.
///
/// Every round each node is credited with one oracle step and one diffuser
/// step, and the link delay of `qchannel` (if any) is charged once per
/// contribution. There is a single shared circuit: it receives the round's
/// oracle and diffuser once, since a reflection applied once per node would
/// cancel itself for an even number of nodes.
///
/// The composed circuit is sampled `shots` times; ties in the frequency table
/// go to the outcome observed first.
pub fn distributed_search<R: Rng + ?Sized>(
    nodes: &[Node],
    target: &str,
    qchannel: Option<&QuantumChannel>,
    shots: usize,
    rng: &mut R,
    progress: Progress<'_>,
) -> Result<GroverResult, GroverError> {
    if nodes.is_empty() {
        return Err(GroverError::NoNodes);
    }
    if shots == 0 {
        return Err(GroverError::ZeroShots);
    }
    if parse_bits(target).is_none() {
        return Err(GroverError::InvalidTarget(target.to_owned()));
    }
    let n = target.len();
    if n > MAX_DATA_QUBITS {
        return Err(GroverError::TooManyQubits {
            got: n,
            max: MAX_DATA_QUBITS,
        });
    }

    let num_ancilla = n.saturating_sub(3);
    let ancilla: Vec<usize> = (n..n + num_ancilla).collect();
    let oracle_target: String = target.chars().rev().collect();

    let mut circuit = Circuit::new(n + num_ancilla, n);
    for q in 0..n {
        circuit.h(q);
    }

    let iterations = iteration_count(n);
    let mut schedule = Vec::with_capacity(iterations * nodes.len() * 2);
    debug!(n, num_ancilla, iterations, nodes = nodes.len(), "building Grover circuit");

    let contribute = |kind: StepKind, round: usize, schedule: &mut Vec<ScheduledStep>| {
        for node in nodes {
            progress.report(&format!(
                "Node {}: {kind} step {}/{iterations}",
                node.name(),
                round + 1
            ));
            schedule.push(ScheduledStep {
                round,
                node: node.name().to_owned(),
                kind,
            });
            if let Some(channel) = qchannel {
                channel.wait();
            }
        }
    };

    for round in 0..iterations {
        progress.report(&format!("Round {}/{iterations}", round + 1));

        oracle(&mut circuit, &oracle_target, &ancilla)?;
        contribute(StepKind::Oracle, round, &mut schedule);

        diffuser(&mut circuit, n, &ancilla)?;
        contribute(StepKind::Diffuser, round, &mut schedule);
    }

    for q in 0..n {
        circuit.measure(q, q);
    }

    let counts = Sampler::new().run(&circuit, shots, rng)?;
    let best = counts
        .most_frequent()
        .map(|(outcome, _)| outcome.to_owned())
        .unwrap_or_default();

    info!(
        search_target = target,
        best = best.as_str(),
        iterations,
        gates = circuit.gate_count(),
        "Grover search complete"
    );
    progress.report(&format!("Result: {best}"));

    Ok(GroverResult {
        best,
        counts,
        iterations,
        shots,
        schedule,
    })
}
