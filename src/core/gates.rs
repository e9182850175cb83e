use crate::core::errors::GateError;
use crate::core::utils;
use ndarray::{Array2, arr2};
use num_complex::Complex64;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

/// Represents a quantum gate.
///
/// A gate is defined by its unitary matrix and the number of qubits it acts on.
#[derive(Clone, Debug, PartialEq)]
pub struct Gate {
    /// The unitary matrix of the gate.
    pub matrix: Array2<Complex64>,
    /// The number of qubits the gate acts on.
    pub num_qubits: usize,
}

impl Gate {
    /// Creates a new `Gate` from a unitary matrix.
    ///
    /// # Arguments
    ///
    /// * `matrix` - A square, unitary `Array2<Complex64>`.
    ///
    /// # Errors
    ///
    /// Returns a `GateError` if:
    /// - The matrix is not square.
    /// - The matrix dimensions are not a power of 2.
    /// - The matrix is not unitary.
    ///
    /// # Example
    ///
    /// A custom gate goes into a [`Circuit`](crate::Circuit) like the built-in
    /// ones. Here `Y` maps |0> to i|1>:
    ///
    /// ```
    /// use ndarray::arr2;
    /// use num_complex::Complex64;
    /// use qnet_sim::{Circuit, Gate, Sampler};
    /// use rand::SeedableRng;
    /// use rand::rngs::StdRng;
    ///
    /// let zero = Complex64::new(0.0, 0.0);
    /// let i = Complex64::new(0.0, 1.0);
    /// let y = Gate::new(arr2(&[[zero, -i], [i, zero]])).unwrap();
    ///
    /// let mut circuit = Circuit::new(1, 1);
    /// circuit.gate(y, &[0], &[]).measure(0, 0);
    ///
    /// let counts = Sampler::new()
    ///     .run(&circuit, 16, &mut StdRng::seed_from_u64(1))
    ///     .unwrap();
    /// assert_eq!(counts.get("1"), 16);
    /// ```
    pub fn new(matrix: Array2<Complex64>) -> Result<Self, GateError> {
        let (rows, cols) = matrix.dim();

        if rows != cols {
            return Err(GateError::NotSquareMatrix);
        }

        if !rows.is_power_of_two() {
            return Err(GateError::InvalidDimensions);
        }

        if !utils::is_unitary(&matrix) {
            return Err(GateError::NonUnitary);
        }

        Ok(Self::from_unitary(matrix))
    }

    /// Wraps a matrix that is known to be unitary with a power-of-two size.
    fn from_unitary(matrix: Array2<Complex64>) -> Self {
        let num_qubits = matrix.nrows().trailing_zeros() as usize;
        Self { matrix, num_qubits }
    }

    // --- Standard Gates ---

    /// Creates a Pauli-X gate (NOT gate).
    pub fn x() -> Gate {
        Gate::from_unitary(arr2(&[[ZERO, ONE], [ONE, ZERO]]))
    }

    /// Creates a Pauli-Z gate.
    pub fn z() -> Gate {
        Gate::from_unitary(arr2(&[[ONE, ZERO], [ZERO, -ONE]]))
    }

    /// Creates a Hadamard gate.
    pub fn h() -> Gate {
        let factor = Complex64::new(1.0 / 2.0_f64.sqrt(), 0.0);
        Gate::from_unitary(arr2(&[[factor, factor], [factor, -factor]]))
    }

    /// Creates a controlled-Z gate. Symmetric in its two qubits.
    pub fn cz() -> Gate {
        Gate::from_unitary(utils::expand_operator(2, &Gate::z().matrix, &[1], &[0]))
    }

    /// Creates a Toffoli gate. Qubits 0 and 1 control qubit 2.
    pub fn toffoli() -> Gate {
        Gate::from_unitary(utils::expand_operator(3, &Gate::x().matrix, &[2], &[0, 1]))
    }
}

/// Rejects duplicated qubits and qubits used as both control and target.
pub(crate) fn check_wiring(targets: &[usize], controls: &[usize]) -> Result<(), GateError> {
    if let Some(dup) = utils::find_duplicate(targets) {
        return Err(GateError::DuplicateQubit(dup));
    }

    if let Some(dup) = utils::find_duplicate(controls) {
        return Err(GateError::DuplicateQubit(dup));
    }

    for &c in controls {
        if targets.contains(&c) {
            return Err(GateError::ControlTargetOverlap(c));
        }
    }
    Ok(())
}
