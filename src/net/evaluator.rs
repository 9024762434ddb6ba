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

//! The batching evaluator.
//!
//! Search threads block on [`Evaluator::evaluate`] while a dedicated
//! worker drains a bounded request queue, coalescing leaves into small
//! tensor batches so the network sees fewer, fatter executions.
//! Results are cached by history-aware hash, so transposed-into states and
//! repeated probes of one leaf cost a single network call.

use super::{cache::EvalCache, encode, policy, Evaluation, NetError, Network, NetworkOutput};
use crate::base::Game;

use std::{
    collections::VecDeque,
    sync::{Arc, Condvar, Mutex},
    thread,
    time::{Duration, Instant},
};

/// The most requests coalesced into one network execution.
const MAX_BATCH: usize = 16;

/// How long the worker waits for stragglers after the first request of a
/// batch arrives.
const MAX_BATCH_DELAY: Duration = Duration::from_millis(2);

/// The capacity of the request queue; producers block when it is full.
const QUEUE_CAPACITY: usize = 256;

/// One queued evaluation request.
struct Request {
    game: Game,
    key: u64,
    slot: Arc<ResponseSlot>,
}

/// The completion handle a caller blocks on.
/// A slot completes exactly once, with either a result or an error.
#[derive(Default)]
struct ResponseSlot {
    result: Mutex<Option<Result<Arc<Evaluation>, NetError>>>,
    ready: Condvar,
}

impl ResponseSlot {
    fn complete(&self, result: Result<Arc<Evaluation>, NetError>) {
        let mut guard = self.result.lock().unwrap();
        if guard.is_none() {
            *guard = Some(result);
        }
        self.ready.notify_all();
    }

    fn wait(&self) -> Result<Arc<Evaluation>, NetError> {
        let mut guard = self.result.lock().unwrap();
        loop {
            if let Some(result) = guard.take() {
                return result;
            }
            guard = self.ready.wait(guard).unwrap();
        }
    }
}

/// The queue state shared between callers and the worker.
struct Queue {
    requests: VecDeque<Request>,
    shutdown: bool,
    poisoned: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    not_empty: Condvar,
    not_full: Condvar,
}

/// The public face of the network: a blocking, cached, batched
/// `evaluate` operation.
pub struct Evaluator {
    shared: Arc<Shared>,
    cache: Arc<EvalCache>,
    worker: Option<thread::JoinHandle<()>>,
}

impl Evaluator {
    #[must_use]
    /// Start an evaluator over the given network, with an evaluation cache
    /// of the given soft capacity.
    ///
    /// # Panics
    ///
    /// Panics if the worker thread cannot be spawned.
    pub fn new(network: Arc<dyn Network>, cache_capacity: usize) -> Evaluator {
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                requests: VecDeque::with_capacity(QUEUE_CAPACITY),
                shutdown: false,
                poisoned: false,
            }),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        });
        let cache = Arc::new(EvalCache::new(cache_capacity));
        let worker = {
            let shared = shared.clone();
            let cache = cache.clone();
            thread::Builder::new()
                .name("sable-net".into())
                .spawn(move || worker_loop(&network, &shared, &cache))
                .expect("failed to spawn network worker")
        };
        Evaluator {
            shared,
            cache,
            worker: Some(worker),
        }
    }

    /// Evaluate a game state, blocking until the result is available.
    ///
    /// The returned value is from the mover's perspective and the policy is
    /// softmax-normalized over all slots; illegal moves are not masked.
    ///
    /// # Errors
    ///
    /// Returns an `Err` if the network failed for this batch, if a previous
    /// failure poisoned the evaluator, or if the evaluator has shut down.
    ///
    /// # Panics
    ///
    /// Panics if a lock is poisoned.
    pub fn evaluate(&self, game: &Game) -> Result<Arc<Evaluation>, NetError> {
        let key = game.history_hash();
        if let Some(hit) = self.cache.get(key) {
            return Ok(hit);
        }

        let slot = Arc::new(ResponseSlot::default());
        {
            let mut queue = self.shared.queue.lock().unwrap();
            loop {
                if queue.poisoned {
                    return Err(NetError::Poisoned);
                }
                if queue.shutdown {
                    return Err(NetError::ShutDown);
                }
                if queue.requests.len() < QUEUE_CAPACITY {
                    break;
                }
                queue = self.shared.not_full.wait(queue).unwrap();
            }
            queue.requests.push_back(Request {
                game: *game,
                key,
                slot: slot.clone(),
            });
            self.shared.not_empty.notify_one();
        }
        slot.wait()
    }

    #[must_use]
    /// Get the evaluation cache, shared with the worker.
    pub fn cache(&self) -> &Arc<EvalCache> {
        &self.cache
    }
}

impl Drop for Evaluator {
    /// Stop and join the worker before the network is released.
    fn drop(&mut self) {
        {
            let mut queue = self.shared.queue.lock().unwrap();
            queue.shutdown = true;
            self.shared.not_empty.notify_all();
            self.shared.not_full.notify_all();
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

/// The worker: block for a request, drain stragglers into a batch, run the
/// network, and complete every handle.
fn worker_loop(network: &Arc<dyn Network>, shared: &Arc<Shared>, cache: &Arc<EvalCache>) {
    loop {
        let mut batch = Vec::with_capacity(MAX_BATCH);
        {
            let mut queue = shared.queue.lock().unwrap();
            // block for the first request; drain the backlog even when
            // shutting down so no caller is left hanging
            loop {
                if let Some(request) = queue.requests.pop_front() {
                    batch.push(request);
                    break;
                }
                if queue.shutdown {
                    return;
                }
                queue = shared.not_empty.wait(queue).unwrap();
            }
            // opportunistically gather more requests for the same batch
            let deadline = Instant::now() + MAX_BATCH_DELAY;
            while batch.len() < MAX_BATCH {
                if let Some(request) = queue.requests.pop_front() {
                    batch.push(request);
                    continue;
                }
                if queue.shutdown {
                    break;
                }
                let now = Instant::now();
                if now >= deadline {
                    break;
                }
                let (guard, _) = shared
                    .not_empty
                    .wait_timeout(queue, deadline - now)
                    .unwrap();
                queue = guard;
            }
            shared.not_full.notify_all();
        }

        if let Err(error) = run_batch(network.as_ref(), cache, &batch) {
            fail(shared, batch, &error);
            return;
        }
    }
}

/// Execute one batch and complete its handles on success.
fn run_batch(
    network: &dyn Network,
    cache: &EvalCache,
    batch: &[Request],
) -> Result<(), NetError> {
    let planes = network.input_planes();
    let mut input = Vec::with_capacity(batch.len() * planes * 64);
    for request in batch {
        input.extend_from_slice(&encode::encode(&request.game, planes));
    }

    let output = network.run(&input, batch.len())?;
    check_output_sizes(&output, batch.len())?;

    for (i, request) in batch.iter().enumerate() {
        let logits = &output.policy_logits[i * policy::POLICY_SIZE..(i + 1) * policy::POLICY_SIZE];
        let value = match (&output.wdl, &output.value) {
            // win probability minus loss probability
            (Some(wdl), _) => wdl[3 * i] - wdl[3 * i + 2],
            (None, Some(values)) => values[i].tanh(),
            (None, None) => return Err(NetError::MissingValue(Vec::new())),
        };
        let evaluation = Arc::new(Evaluation {
            value,
            policy: softmax(logits),
        });
        cache.insert(request.key, evaluation.clone());
        request.slot.complete(Ok(evaluation));
    }
    Ok(())
}

/// Verify that the network produced outputs of the sizes its heads imply.
fn check_output_sizes(output: &NetworkOutput, batch_size: usize) -> Result<(), NetError> {
    if output.policy_logits.len() != batch_size * policy::POLICY_SIZE {
        return Err(NetError::Execution(format!(
            "policy output has {} elements, expected {}",
            output.policy_logits.len(),
            batch_size * policy::POLICY_SIZE
        )));
    }
    if output.wdl.as_ref().is_some_and(|w| w.len() != 3 * batch_size) {
        return Err(NetError::Execution("WDL output size mismatch".into()));
    }
    if output.value.as_ref().is_some_and(|v| v.len() != batch_size) {
        return Err(NetError::Execution("value output size mismatch".into()));
    }
    Ok(())
}

/// Propagate a batch failure: the whole batch and every request still in
/// the queue complete with the error, and the evaluator is poisoned.
/// The poison flag is raised before any handle completes, so a caller that
/// observes the error cannot enqueue again ahead of it.
fn fail(shared: &Shared, batch: Vec<Request>, error: &NetError) {
    let drained: Vec<Request> = {
        let mut queue = shared.queue.lock().unwrap();
        queue.poisoned = true;
        shared.not_full.notify_all();
        queue.requests.drain(..).collect()
    };
    for request in batch.into_iter().chain(drained) {
        request.slot.complete(Err(error.clone()));
    }
}

/// Numerically stable softmax: shift by the maximum before exponentiating.
fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let mut out: Vec<f32> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f32 = out.iter().sum();
    if sum > 0.0 {
        for x in &mut out {
            *x /= sum;
        }
    }
    out
}
