//! Gate-level circuit description.
//!
//! A [`Circuit`] is an ordered list of instructions over a register of qubits
//! plus a register of classical bits. Building a circuit never touches a state;
//! the [`Sampler`](crate::Sampler) executes it.

use crate::core::Gate;
use crate::core::errors::StateError;
use crate::core::state::QuantumState;

#[derive(Clone, Debug, PartialEq)]
pub enum Instruction {
    /// Apply `gate` to `targets`, conditioned on every qubit in `controls` being |1>.
    Gate {
        gate: Gate,
        targets: Vec<usize>,
        controls: Vec<usize>,
    },
    /// Read `qubit` in the computational basis into classical bit `clbit`.
    Measure { qubit: usize, clbit: usize },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Circuit {
    num_qubits: usize,
    num_clbits: usize,
    instructions: Vec<Instruction>,
}

impl Circuit {
    pub fn new(num_qubits: usize, num_clbits: usize) -> Self {
        Self {
            num_qubits,
            num_clbits,
            instructions: Vec::new(),
        }
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn num_clbits(&self) -> usize {
        self.num_clbits
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of gate instructions (measurements excluded).
    pub fn gate_count(&self) -> usize {
        self.instructions
            .iter()
            .filter(|i| matches!(i, Instruction::Gate { .. }))
            .count()
    }

    pub fn gate(&mut self, gate: Gate, targets: &[usize], controls: &[usize]) -> &mut Self {
        self.instructions.push(Instruction::Gate {
            gate,
            targets: targets.to_vec(),
            controls: controls.to_vec(),
        });
        self
    }

    pub fn h(&mut self, qubit: usize) -> &mut Self {
        self.gate(Gate::h(), &[qubit], &[])
    }

    pub fn x(&mut self, qubit: usize) -> &mut Self {
        self.gate(Gate::x(), &[qubit], &[])
    }

    pub fn z(&mut self, qubit: usize) -> &mut Self {
        self.gate(Gate::z(), &[qubit], &[])
    }

    pub fn cz(&mut self, control: usize, target: usize) -> &mut Self {
        self.gate(Gate::cz(), &[control, target], &[])
    }

    pub fn ccx(&mut self, c0: usize, c1: usize, target: usize) -> &mut Self {
        self.gate(Gate::toffoli(), &[c0, c1, target], &[])
    }

    pub fn measure(&mut self, qubit: usize, clbit: usize) -> &mut Self {
        self.instructions.push(Instruction::Measure { qubit, clbit });
        self
    }

    /// Evolves |0...0> through every gate and returns the final state together
    /// with the `(qubit, clbit)` measurement map.
    ///
    /// Measurements are terminal: a gate touching an already measured qubit is
    /// rejected.
    pub fn simulate(&self) -> Result<(QuantumState, Vec<(usize, usize)>), StateError> {
        let mut state = QuantumState::new(self.num_qubits);
        let mut measured: Vec<(usize, usize)> = Vec::new();

        for instruction in &self.instructions {
            match instruction {
                Instruction::Gate {
                    gate,
                    targets,
                    controls,
                } => {
                    if let Some(&q) = targets
                        .iter()
                        .chain(controls)
                        .find(|q| measured.iter().any(|(m, _)| m == *q))
                    {
                        return Err(StateError::GateAfterMeasurement(q));
                    }
                    state.apply_controlled(gate, targets, controls)?;
                }
                Instruction::Measure { qubit, clbit } => {
                    if *qubit >= self.num_qubits {
                        return Err(StateError::IndexOutOfBounds {
                            index: *qubit,
                            num_qubits: self.num_qubits,
                        });
                    }
                    if *clbit >= self.num_clbits {
                        return Err(StateError::ClbitOutOfBounds {
                            index: *clbit,
                            num_clbits: self.num_clbits,
                        });
                    }
                    measured.push((*qubit, *clbit));
                }
            }
        }

        Ok((state, measured))
    }
}
