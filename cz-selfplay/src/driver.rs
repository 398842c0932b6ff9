//! The driver: alternates one self-play episode with a training pass, feeding
//! search visit distributions and terminal scores back into the network.

use cz_core::{Action, CraftParams, State, NUM_ACTIONS, STATE_FEATURES};
use cz_logging::{EventLog, IterationEventV1, VersionInfoV1};
use cz_mcts::Uct;
use cz_net::Mlp;
use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;
use std::time::Instant;

/// Outer-loop constants. The defaults are the canonical run configuration.
#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    /// Rollouts per move.
    pub simulate_count: u32,
    /// Inverse temperature for both move selection and policy targets.
    pub inv_temp: f64,
    /// SGD step size.
    pub step_size: f64,
    /// Example buffer capacity (FIFO eviction).
    pub buffer_capacity: usize,
    /// Gradient steps per iteration, sampled uniformly with replacement.
    pub train_steps: u32,
    /// Verbose tracking period: every Nth iteration dumps one rollout tail,
    /// one training example, and one training step.
    pub track_every: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            simulate_count: 10_000,
            inv_temp: 1.5,
            step_size: 1e-5,
            buffer_capacity: 10_000,
            train_steps: 100,
            track_every: 16,
        }
    }
}

/// One training example: a visited state, the search's visit distribution,
/// and the episode's terminal score.
#[derive(Debug, Clone)]
pub struct Example {
    pub state: State,
    pub pi: [f64; NUM_ACTIONS],
    pub score: f64,
}

/// What one outer iteration did.
#[derive(Debug, Clone, Copy)]
pub struct IterationSummary {
    pub iteration: u64,
    pub plies: u32,
    pub resigned: bool,
    pub score: f64,
    pub table_states: usize,
    pub buffer_len: usize,
    pub train_steps: u32,
    pub elapsed_ms: u64,
}

pub struct Driver {
    params: CraftParams,
    cfg: DriverConfig,
    net: Mlp,
    uct: Uct,
    buffer: VecDeque<Example>,
    rng: ChaCha8Rng,
    iteration: u64,
}

impl Driver {
    pub fn new(params: CraftParams, cfg: DriverConfig, seed: u64) -> Driver {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let net = cz_mcts::default_net(&mut rng);
        Driver {
            params,
            cfg,
            net,
            uct: Uct::new(params),
            buffer: VecDeque::new(),
            rng,
            iteration: 0,
        }
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn examples(&self) -> &VecDeque<Example> {
        &self.buffer
    }

    /// One outer iteration: a fresh episode from the canonical root, target
    /// backfill, FIFO eviction, then the training pass.
    pub fn run_iteration(&mut self, events: Option<&mut EventLog>) -> IterationSummary {
        self.iteration += 1;
        let track = self.cfg.track_every > 0 && self.iteration % self.cfg.track_every == 0;
        let started = Instant::now();

        let n0 = self.buffer.len();
        let (plies, resigned, score) = self.play_episode(track);
        self.backfill_targets(n0, score);
        while self.buffer.len() > self.cfg.buffer_capacity {
            self.buffer.pop_front();
        }
        if track {
            self.dump_random_example();
        }
        let train_steps = self.train_pass(track);

        let summary = IterationSummary {
            iteration: self.iteration,
            plies,
            resigned,
            score,
            table_states: self.uct.len(),
            buffer_len: self.buffer.len(),
            train_steps,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };

        if let Some(log) = events {
            let ev = IterationEventV1 {
                event: "iteration",
                ts_ms: cz_logging::now_ms(),
                v: VersionInfoV1::current(NUM_ACTIONS as u32, STATE_FEATURES as u32),
                iteration: summary.iteration,
                plies: summary.plies,
                resigned: summary.resigned,
                score: summary.score,
                table_states: summary.table_states as u64,
                buffer_len: summary.buffer_len as u64,
                train_steps: summary.train_steps,
                elapsed_ms: summary.elapsed_ms,
            };
            if let Err(e) = log.append(&ev) {
                info!("dropping iteration event: {}", e);
            }
        }

        summary
    }

    /// Play one episode to termination or resignation, appending a skeleton
    /// example per visited state. Returns (plies, resigned, score).
    fn play_episode(&mut self, track: bool) -> (u32, bool, f64) {
        let root = State::new(&self.params);
        self.uct.reset(&root, &mut self.net, &mut self.rng);

        let mut s = root;
        let mut plies = 0u32;
        loop {
            if s.done(&self.params) {
                let score = s.score(&self.params);
                if track {
                    info!("episode done, score = {:.3e}", score);
                }
                return (plies, false, score);
            }
            self.buffer.push_back(Example {
                state: s,
                pi: [0.0; NUM_ACTIONS],
                score: 0.0,
            });
            for i in 0..self.cfg.simulate_count {
                let tail = track && i + 1 == self.cfg.simulate_count;
                self.uct.simulate(&s, &mut self.net, &mut self.rng, tail);
            }
            match self.uct.select(&s, self.cfg.inv_temp, &mut self.rng) {
                None => {
                    if track {
                        info!("episode resigned at {}", s);
                    }
                    return (plies, true, 0.0);
                }
                Some(ac) => {
                    if track {
                        info!("play: {} ==> {}", s, ac.name());
                    }
                    s.execute(ac, &self.params, &mut self.rng);
                    plies += 1;
                }
            }
        }
    }

    /// Fill in the policy targets and terminal score for every example the
    /// episode appended from position `n0` on.
    fn backfill_targets(&mut self, n0: usize, score: f64) {
        for i in n0..self.buffer.len() {
            let state = self.buffer[i].state;
            let mut pi = [0.0f64; NUM_ACTIONS];
            self.uct.set_target(&state, self.cfg.inv_temp, &mut pi);
            let ex = &mut self.buffer[i];
            ex.pi = pi;
            ex.score = score;
        }
    }

    /// Sample `train_steps` examples uniformly with replacement and apply one
    /// SGD step each.
    fn train_pass(&mut self, track: bool) -> u32 {
        if self.buffer.is_empty() {
            return 0;
        }
        for k in 0..self.cfg.train_steps {
            let id = self.rng.gen_range(0..self.buffer.len());
            let ex = &self.buffer[id];
            let features = ex.state.features();
            let trace = self
                .net
                .train(&features, &ex.pi, ex.score, self.cfg.step_size, track && k == 0);
            if let Some(step) = trace {
                debug!("train step: {} ==>", ex.state);
                for ac in Action::ALL {
                    debug!(
                        "train step: {:>20} target {:.3e}  out {:.3e}  grad {:.3e}",
                        ac.name(),
                        ex.pi[ac.id()],
                        step.policy[ac.id()],
                        step.policy_grad[ac.id()],
                    );
                }
                debug!(
                    "train step: {:>20} score {:.3e}  out {:.3e}  grad {:.3e}",
                    "<score>", ex.score, step.value, step.value_grad,
                );
            }
        }
        self.cfg.train_steps
    }

    fn dump_random_example(&mut self) {
        if self.buffer.is_empty() {
            return;
        }
        info!("training data: {} examples", self.buffer.len());
        let id = self.rng.gen_range(0..self.buffer.len());
        let ex = &self.buffer[id];
        debug!("training data: {} ==>", ex.state);
        for ac in Action::ALL {
            debug!(
                "training data: {:>20}: {:.3e}",
                ac.name(),
                ex.pi[ac.id()]
            );
        }
        debug!("training data: {:>20}: {:.3e}", "final score", ex.score);
    }
}
