use crate::core::Gate;
use crate::core::errors::StateError;
use crate::core::gates::check_wiring;
use crate::core::utils;
use ndarray::Array1;
use num_complex::Complex64;

/// Pure state of a qubit register stored as $2^N$ amplitudes.
///
/// Qubit `q` corresponds to bit `q` of the basis index (least significant
/// qubit first).
#[derive(Clone, Debug)]
pub struct QuantumState {
    pub amplitudes: Array1<Complex64>,
    pub num_qubits: usize,
}

impl QuantumState {
    /// Creates a new quantum state initialized to |0...0>.
    pub fn new(num_qubits: usize) -> Self {
        let dim = 1 << num_qubits;
        let mut amplitudes = Array1::<Complex64>::zeros(dim);
        amplitudes[0] = Complex64::new(1.0, 0.0);

        Self {
            amplitudes,
            num_qubits,
        }
    }

    /// Checks if a given index is within the system QuantumState's range
    fn validate_qubit_index(&self, index: usize) -> Result<(), StateError> {
        if index >= self.num_qubits {
            return Err(StateError::IndexOutOfBounds {
                index,
                num_qubits: self.num_qubits,
            });
        }
        Ok(())
    }

    /// Applies non controlled quantum gate
    pub fn apply(&mut self, gate: &Gate, target_qubits: &[usize]) -> Result<(), StateError> {
        self.apply_controlled(gate, target_qubits, &[])
    }

    /// Applies `gate` to `target_qubits` on the subspace where every control
    /// qubit is |1>.
    pub fn apply_controlled(
        &mut self,
        gate: &Gate,
        target_qubits: &[usize],
        control_qubits: &[usize],
    ) -> Result<(), StateError> {
        if gate.num_qubits != target_qubits.len() {
            return Err(StateError::DimensionMismatch {
                expected: gate.num_qubits,
                got: target_qubits.len(),
            });
        }

        for &q in target_qubits.iter().chain(control_qubits) {
            self.validate_qubit_index(q)?;
        }
        check_wiring(target_qubits, control_qubits)?;

        utils::apply_to_amplitudes(
            &mut self.amplitudes,
            &gate.matrix,
            target_qubits,
            control_qubits,
        );
        Ok(())
    }

    /// Probability of every computational basis state, indexed like the
    /// amplitudes.
    pub fn probabilities(&self) -> Vec<f64> {
        let probs: Vec<f64> = self.amplitudes.iter().map(|a| a.norm_sqr()).collect();
        let total: f64 = probs.iter().sum();

        // Renormalize to absorb floating point drift
        if total > 0.0 {
            probs.into_iter().map(|p| p / total).collect()
        } else {
            probs
        }
    }

    /// Marginal probability of reading `1` on `qubit`.
    pub fn probability_of_one(&self, qubit: usize) -> Result<f64, StateError> {
        self.validate_qubit_index(qubit)?;
        Ok(self
            .probabilities()
            .iter()
            .enumerate()
            .filter(|(idx, _)| (idx >> qubit) & 1 == 1)
            .map(|(_, p)| p)
            .sum())
    }
}
