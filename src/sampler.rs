use crate::core::Circuit;
use crate::core::errors::StateError;
use rand::Rng;
use std::collections::HashMap;

/// Frequency table of measurement outcomes.
///
/// Entries keep the order in which each outcome was first observed, which makes
/// tie-breaking in [`Counts::most_frequent`] deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Counts {
    entries: Vec<(String, usize)>,
}

impl Counts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `count` occurrences of `outcome`.
    pub fn record(&mut self, outcome: &str, count: usize) {
        match self.entries.iter_mut().find(|(key, _)| key == outcome) {
            Some((_, n)) => *n += count,
            None => self.entries.push((outcome.to_owned(), count)),
        }
    }

    pub fn get(&self, outcome: &str) -> usize {
        self.entries
            .iter()
            .find(|(key, _)| key == outcome)
            .map_or(0, |(_, n)| *n)
    }

    /// Total number of recorded shots.
    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, n)| n).sum()
    }

    /// Number of distinct outcomes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(key, n)| (key.as_str(), *n))
    }

    /// Outcome with the highest count. Ties go to the outcome observed first.
    pub fn most_frequent(&self) -> Option<(&str, usize)> {
        self.iter()
            .fold(None, |best, (key, n)| match best {
                Some((_, best_n)) if best_n >= n => best,
                _ => Some((key, n)),
            })
    }
}

/// Shot-based executor for circuits.
///
/// The circuit's unitary part is simulated once; each shot then samples the
/// measured classical register from the resulting distribution.
#[derive(Debug, Clone, Default)]
pub struct Sampler;

impl Sampler {
    /// Creates a new `Sampler` instance.
    pub fn new() -> Self {
        Self
    }

    /// Runs `circuit` for `num_shots` shots.
    ///
    /// Outcomes are rendered as bit strings with the highest classical bit
    /// leftmost, so a register `c` reads `c[n-1] ... c[1] c[0]`. Classical bits
    /// never written by a measurement read `0`.
    ///
    /// # Errors
    ///
    /// Returns a `StateError` if the circuit addresses qubits or classical bits
    /// outside its registers, wires a gate incorrectly, or applies a gate after
    /// measuring its qubit.
    pub fn run<R: Rng + ?Sized>(
        &self,
        circuit: &Circuit,
        num_shots: usize,
        rng: &mut R,
    ) -> Result<Counts, StateError> {
        let (state, measured) = circuit.simulate()?;
        let num_clbits = circuit.num_clbits();

        // Marginal distribution over the classical register
        let mut probs = vec![0.0; 1 << num_clbits];
        for (basis_idx, p) in state.probabilities().into_iter().enumerate() {
            let outcome = measured.iter().fold(0usize, |acc, &(qubit, clbit)| {
                if (basis_idx >> qubit) & 1 == 1 {
                    acc | (1 << clbit)
                } else {
                    acc
                }
            });
            probs[outcome] += p;
        }

        // Pre-calculate Cumulative Distribution Function (CDF) once.
        let mut cdf = Vec::with_capacity(probs.len());
        let mut current_sum = 0.0;
        for &p in &probs {
            current_sum += p;
            cdf.push(current_sum);
        }

        let mut raw_counts: HashMap<usize, usize> = HashMap::new();
        let mut first_seen = Vec::new();

        for _ in 0..num_shots {
            let r: f64 = rng.random();

            // Rounding can leave the last CDF entry just below 1.0
            let outcome_idx = cdf
                .iter()
                .position(|&cumulative| r < cumulative)
                .unwrap_or(probs.len() - 1);

            let count = raw_counts.entry(outcome_idx).or_insert(0);
            if *count == 0 {
                first_seen.push(outcome_idx);
            }
            *count += 1;
        }

        let mut counts = Counts::new();
        for idx in first_seen {
            let label = format!("{idx:0width$b}", width = num_clbits);
            counts.record(&label, raw_counts[&idx]);
        }

        Ok(counts)
    }
}
