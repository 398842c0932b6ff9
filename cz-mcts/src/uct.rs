//! The search proper: per-state statistics keyed by state identity, PUCT
//! selection, expansion through the network, and scalar-return backup.

use crate::dirichlet::DirichletNoise;
use crate::evaluator::Evaluator;
use cz_core::{Action, CraftParams, State, StateKey, NUM_ACTIONS};
use log::debug;
use rand::Rng;
use rustc_hash::FxHashMap;
use std::fmt::Write as _;

/// Concentration of the per-expansion exploration noise.
pub const DIRICHLET_CONCENTRATION: f64 = 1.03;
/// Fraction of the prior replaced by noise at expansion.
pub const NOISE_FRACTION: f64 = 0.25;

/// Per-state search statistics.
///
/// `valid` is false when the game forbids the action from this state, or when
/// a guaranteed-success execution would already botch the craft; invalid
/// actions are never selected and keep zero visits.
pub struct StateStats {
    total_count: u64,
    prior: [f64; NUM_ACTIONS],
    count: [u64; NUM_ACTIONS],
    value: [f64; NUM_ACTIONS],
    valid: [bool; NUM_ACTIONS],
}

impl StateStats {
    fn new() -> StateStats {
        StateStats {
            total_count: 0,
            prior: [0.0; NUM_ACTIONS],
            count: [0; NUM_ACTIONS],
            value: [0.0; NUM_ACTIONS],
            valid: [true; NUM_ACTIONS],
        }
    }

    /// Total rollouts played out through this state.
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    pub fn valid(&self, ac: Action) -> bool {
        self.valid[ac.id()]
    }

    pub fn prior(&self, ac: Action) -> f64 {
        self.prior[ac.id()]
    }

    pub fn count(&self, ac: Action) -> u64 {
        self.count[ac.id()]
    }

    /// Mean backed-up return of `ac`, zero when unvisited.
    pub fn q(&self, ac: Action) -> f64 {
        let n = self.count[ac.id()];
        if n == 0 {
            0.0
        } else {
            self.value[ac.id()] / n as f64
        }
    }

    /// Multi-line dump of the valid actions, for tracking output and panic
    /// diagnostics.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        for ac in Action::ALL {
            if !self.valid(ac) {
                continue;
            }
            let _ = writeln!(
                out,
                "  {:>20}  prior = {:.4}  visits = {:>8}  value = {:>12.5e}",
                ac.name(),
                self.prior(ac),
                self.count(ac),
                self.q(ac),
            );
        }
        out
    }
}

/// PUCT search with a transposition table. The table lives for one episode;
/// `reset` discards it and re-expands the root.
pub struct Uct {
    params: CraftParams,
    noise: DirichletNoise,
    table: FxHashMap<StateKey, StateStats>,
}

impl Uct {
    pub fn new(params: CraftParams) -> Uct {
        Uct {
            params,
            noise: DirichletNoise::new(DIRICHLET_CONCENTRATION),
            table: FxHashMap::default(),
        }
    }

    pub fn params(&self) -> &CraftParams {
        &self.params
    }

    /// Number of discovered states.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn stats(&self, s: &State) -> Option<&StateStats> {
        self.table.get(&s.key(&self.params))
    }

    /// Drop all statistics and expand `root`.
    pub fn reset(&mut self, root: &State, net: &mut impl Evaluator, rng: &mut impl Rng) {
        self.table.clear();
        self.init_state(root, net, rng);
    }

    /// Expand a newly discovered state: query the network, blend the prior
    /// with Dirichlet noise, and mark per-action validity. Returns the value
    /// estimate.
    fn init_state(&mut self, s: &State, net: &mut impl Evaluator, rng: &mut impl Rng) -> f64 {
        let key = s.key(&self.params);
        assert!(
            !self.table.contains_key(&key),
            "state already expanded: {}",
            s
        );

        let (policy, value) = net.evaluate(&s.features());
        let noise = self.noise.sample(rng);
        let mut stat = StateStats::new();
        for ac in Action::ALL {
            let id = ac.id();
            stat.prior[id] = (1.0 - NOISE_FRACTION) * policy[id] + NOISE_FRACTION * noise[id];
            stat.valid[id] = s.is_action_valid(ac, &self.params);
        }
        self.table.insert(key, stat);
        value
    }

    /// One rollout from `s`. Terminal states return their score; unexpanded
    /// states expand and return the network value; otherwise descend through
    /// the PUCT maximizer and back the return up this edge.
    pub fn simulate(
        &mut self,
        s: &State,
        net: &mut impl Evaluator,
        rng: &mut impl Rng,
        track: bool,
    ) -> f64 {
        if s.done(&self.params) {
            let score = s.score(&self.params);
            if track {
                let tag = if s.successful(&self.params) {
                    "finished"
                } else {
                    "failed"
                };
                debug!("{} ==> done, score {:.3} <{}>", s, score, tag);
            }
            return score;
        }

        let key = s.key(&self.params);
        if !self.table.contains_key(&key) {
            let value = self.init_state(s, net, rng);
            if track {
                debug!("{} ==> expanded, network value {:.3}", s, value);
            }
            return value;
        }

        let chosen = {
            let stat = &self.table[&key];
            if track {
                debug!("{}\n{}", s, stat.summary());
            }
            let nsq = (stat.total_count as f64).sqrt();
            let mut best = f64::NEG_INFINITY;
            let mut chosen: Option<Action> = None;
            for ac in Action::ALL {
                let id = ac.id();
                if !stat.valid[id] {
                    continue;
                }
                let u = stat.q(ac) + stat.prior[id] * nsq / (1 + stat.count[id]) as f64;
                if u > best {
                    best = u;
                    chosen = Some(ac);
                }
            }
            chosen
        };

        let Some(ac) = chosen else {
            if track {
                debug!("{} ==> no valid action, failing out", s);
            }
            let stat = self.table.get_mut(&key).expect("stat vanished");
            stat.total_count += 1;
            return 0.0;
        };
        if track {
            debug!("{} ==> picked {}", s, ac.name());
        }

        let mut next = *s;
        next.execute(ac, &self.params, rng);
        let score = self.simulate(&next, net, rng, track);

        let stat = self.table.get_mut(&key).expect("stat vanished");
        stat.value[ac.id()] += score;
        stat.count[ac.id()] += 1;
        stat.total_count += 1;
        score
    }

    /// Sample the executed move proportionally to `visits^inv_temp` over
    /// valid actions. `None` means resignation: nothing valid was ever
    /// visited.
    pub fn select(&self, s: &State, inv_temp: f64, rng: &mut impl Rng) -> Option<Action> {
        let stat = self
            .stats(s)
            .unwrap_or_else(|| panic!("state not expanded: {}", s));

        let mut w = [0.0f64; NUM_ACTIONS];
        let mut sum = 0.0;
        for ac in Action::ALL {
            let id = ac.id();
            if stat.valid[id] {
                w[id] = (stat.count[id] as f64).powf(inv_temp);
                sum += w[id];
            }
        }
        if sum == 0.0 {
            return None;
        }

        let mut r = rng.gen::<f64>() * sum;
        for ac in Action::ALL {
            if !stat.valid[ac.id()] {
                continue;
            }
            r -= w[ac.id()];
            if r < 0.0 {
                return Some(ac);
            }
        }
        panic!("sampling fell off the distribution: {}\n{}", s, stat.summary());
    }

    /// Fill `out` with the training target: `visits^inv_temp` for visited
    /// valid actions, a 0.1 floor everywhere else, normalized to sum 1.
    ///
    /// The floor keeps probability mass on unexplored actions so the policy
    /// head does not collapse onto the exact visit distribution.
    pub fn set_target(&self, s: &State, inv_temp: f64, out: &mut [f64; NUM_ACTIONS]) {
        assert!(!s.done(&self.params), "target for a finished craft: {}", s);
        let stat = self
            .stats(s)
            .unwrap_or_else(|| panic!("state not expanded: {}", s));
        assert!(
            stat.total_count > 0,
            "no rollouts recorded: {}\n{}",
            s,
            stat.summary()
        );

        let mut sum = 0.0;
        for ac in Action::ALL {
            let id = ac.id();
            out[id] = if stat.valid[id] && stat.count[id] > 0 {
                (stat.count[id] as f64).powf(inv_temp)
            } else {
                0.1
            };
            sum += out[id];
        }
        assert!(sum >= 1.0, "degenerate visit distribution: {}", s);
        let inv = 1.0 / sum;
        for v in out.iter_mut() {
            *v *= inv;
        }
    }
}
