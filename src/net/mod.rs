/*
  Sable, a UCI-compatible chess engine driven by neural-guided tree search.
  Copyright (C) 2024 The Sable authors (see AUTHORS.md file)

  Sable is free software: you can redistribute it and/or modify
  it under the terms of the GNU General Public License as published by
  the Free Software Foundation, either version 3 of the License, or
  (at your option) any later version.

  Sable is distributed in the hope that it will be useful,
  but WITHOUT ANY WARRANTY; without even the implied warranty of
  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
  GNU General Public License for more details.

  You should have received a copy of the GNU General Public License
  along with this program.  If not, see <http://www.gnu.org/licenses/>.
*/

//! The bridge between the chess core and the guiding neural network.
//!
//! The network runtime itself is an external collaborator hidden behind the
//! [`Network`] trait; this module owns everything around it: discovering
//! which outputs are which, translating moves to policy slots, encoding
//! positions as input tensors, and batching evaluation requests.

pub mod cache;
pub mod encode;
pub mod evaluator;
pub mod policy;

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
/// The failures the network boundary can produce.
pub enum NetError {
    #[error("no policy head of size 1858 among outputs {0:?}")]
    /// The loaded model declares no output with 1,858 elements.
    MissingPolicy(Vec<usize>),
    #[error("no value head (size 1) or WDL head (size 3) among outputs {0:?}")]
    /// The loaded model declares neither a scalar value nor a WDL triplet.
    MissingValue(Vec<usize>),
    #[error("network execution failed: {0}")]
    /// The runtime failed while executing a batch.
    Execution(String),
    #[error("evaluator disabled by an earlier network failure")]
    /// A previous batch failed; the evaluator stays unusable until the
    /// engine is recreated.
    Poisoned,
    #[error("evaluator has shut down")]
    /// The evaluator was dropped while a request was outstanding.
    ShutDown,
}

#[derive(Clone, Debug, PartialEq)]
/// The result of evaluating one position: a scalar value in [-1, 1] from
/// the mover's perspective, and a softmax-normalized policy over all 1,858
/// move slots.
/// Illegal moves are not masked here; the search masks them when it looks
/// up the priors of legal moves.
pub struct Evaluation {
    pub value: f32,
    pub policy: Vec<f32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Which model output feeds which head, discovered from output sizes at
/// load time.
pub struct OutputLayout {
    /// The index of the 1,858-element policy output.
    pub policy: usize,
    /// The index of the 3-element win/draw/loss output, if present.
    pub wdl: Option<usize>,
    /// The index of the 1-element scalar value output, if present.
    pub value: Option<usize>,
}

/// Identify the policy, WDL, and scalar-value outputs of a model from the
/// per-output element counts it declares.
///
/// # Errors
///
/// Returns an `Err` if no output has 1,858 elements, or if neither a
/// 3-element nor a 1-element output exists.
pub fn identify_outputs(sizes: &[usize]) -> Result<OutputLayout, NetError> {
    let position_of = |len| sizes.iter().position(|&s| s == len);
    let policy = position_of(policy::POLICY_SIZE).ok_or_else(|| NetError::MissingPolicy(sizes.to_vec()))?;
    let wdl = position_of(3);
    let value = position_of(1);
    if wdl.is_none() && value.is_none() {
        return Err(NetError::MissingValue(sizes.to_vec()));
    }
    Ok(OutputLayout { policy, wdl, value })
}

#[derive(Clone, Debug, Default, PartialEq)]
/// The raw outputs of one batched network execution.
/// All vectors are row-major over the batch dimension.
pub struct NetworkOutput {
    /// Unnormalized policy logits, 1,858 per batch element.
    pub policy_logits: Vec<f32>,
    /// Win/draw/loss probabilities, 3 per batch element, if the model has a
    /// WDL head.
    pub wdl: Option<Vec<f32>>,
    /// Scalar values, 1 per batch element, if the model has a value head.
    pub value: Option<Vec<f32>>,
}

/// The runtime interface to the guiding network.
///
/// Implementations are owned by the engine for its lifetime; the evaluator
/// worker is joined before an implementation is released.
pub trait Network: Send + Sync {
    /// The number of input planes the model expects (112 or 119).
    fn input_planes(&self) -> usize;

    /// Execute the model over `batch_size` positions packed row-major into
    /// `input`, which holds `batch_size * input_planes() * 64` floats.
    ///
    /// # Errors
    ///
    /// Returns an `Err` if the runtime fails; the evaluator propagates the
    /// error to every pending request and becomes unusable.
    fn run(&self, input: &[f32], batch_size: usize) -> Result<NetworkOutput, NetError>;
}

/// A stand-in network producing a uniform policy and a zero value, used
/// when no model file is supplied and throughout the test suite.
pub struct UniformNetwork {
    planes: usize,
}

impl UniformNetwork {
    #[must_use]
    /// Create a uniform network with the classic 112-plane input.
    pub fn classic() -> UniformNetwork {
        UniformNetwork {
            planes: encode::CLASSIC_PLANES,
        }
    }
}

impl Network for UniformNetwork {
    fn input_planes(&self) -> usize {
        self.planes
    }

    fn run(&self, _input: &[f32], batch_size: usize) -> Result<NetworkOutput, NetError> {
        Ok(NetworkOutput {
            policy_logits: vec![0.0; batch_size * policy::POLICY_SIZE],
            wdl: None,
            value: Some(vec![0.0; batch_size]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_finds_all_heads() {
        let layout = identify_outputs(&[1858, 3, 1]).unwrap();
        assert_eq!(
            layout,
            OutputLayout {
                policy: 0,
                wdl: Some(1),
                value: Some(2),
            }
        );
    }

    #[test]
    fn discovery_accepts_either_value_head() {
        assert_eq!(identify_outputs(&[3, 1858]).unwrap().value, None);
        assert_eq!(identify_outputs(&[1, 1858]).unwrap().wdl, None);
    }

    #[test]
    fn discovery_rejects_incomplete_models() {
        assert_eq!(
            identify_outputs(&[3, 1]),
            Err(NetError::MissingPolicy(vec![3, 1]))
        );
        assert_eq!(
            identify_outputs(&[1858, 64]),
            Err(NetError::MissingValue(vec![1858, 64]))
        );
    }
}
