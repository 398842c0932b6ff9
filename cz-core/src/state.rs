//! The crafting simulator: one mutable record plus the full update rule set.
//!
//! This module is the single place that mutates `State`. The deterministic
//! entry point (`execute_with`) takes the success bit and next condition as
//! inputs; the stochastic entry point (`execute`) draws them from a caller
//! supplied RNG.

use crate::action::{Action, Buff, NUM_BUFFS};
use crate::condition::Condition;
use crate::config::CraftParams;
use rand::Rng;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Length of the neural-network feature vector: six scalars plus one slot per
/// status counter.
pub const STATE_FEATURES: usize = 6 + NUM_BUFFS;

/// Full crafting state. Plain data; all rule methods take the craft
/// parameters explicitly.
///
/// `inner_quiet` values: 0 = inactive, 1 = active but empty, 2..=11 = active
/// with 1..=10 stacks. It accumulates on successful quality actions rather
/// than expiring per turn, so it is not part of the buff array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct State {
    pub cp: i16,
    pub progress: i16,
    pub quality: i16,
    /// May transiently become <= 0, which marks the craft as botched.
    pub durability: i16,
    pub inner_quiet: u8,
    pub condition: Condition,
    /// Remaining turns per status effect; 0 = inactive.
    pub buff: [u8; NUM_BUFFS],
}

impl State {
    /// Canonical opening state: resources full, only the first-step
    /// pseudo-status active.
    pub fn new(params: &CraftParams) -> State {
        let mut buff = [0u8; NUM_BUFFS];
        buff[Buff::FirstStep.id()] = 1;
        State {
            cp: params.max_cp,
            progress: 0,
            quality: 0,
            durability: params.max_durability,
            inner_quiet: 0,
            condition: Condition::Normal,
            buff,
        }
    }

    #[inline]
    pub fn buff(&self, b: Buff) -> u8 {
        self.buff[b.id()]
    }

    #[inline]
    fn waste_not_active(&self) -> bool {
        self.buff(Buff::WasteNot) > 0 || self.buff(Buff::WasteNotII) > 0
    }

    /// Whether the craft has finished, by success or by running out of
    /// durability. Most methods here require `!done()`.
    pub fn done(&self, params: &CraftParams) -> bool {
        self.progress >= params.max_progress || self.durability <= 0
    }

    /// Requires `done()`.
    pub fn successful(&self, params: &CraftParams) -> bool {
        assert!(self.done(params), "craft not finished: {}", self);
        self.progress >= params.max_progress
    }

    pub fn botched(&self, params: &CraftParams) -> bool {
        !self.successful(params)
    }

    /// True if the craft is not yet finished, or finished successfully.
    pub fn pending_or_successful(&self, params: &CraftParams) -> bool {
        if self.done(params) {
            self.successful(params)
        } else {
            true
        }
    }

    /// Terminal reward in [0, 1]. Requires `done()`.
    pub fn score(&self, params: &CraftParams) -> f64 {
        assert!(self.done(params), "craft not finished: {}", self);
        if self.progress >= params.max_progress {
            self.quality as f64 / params.max_quality as f64
        } else {
            0.0
        }
    }

    /// Fitted high-quality probability curve (error <= 0.03 against game
    /// data). Diagnostic only; `score()` is the canonical reward.
    pub fn hq_probability(&self, params: &CraftParams) -> f64 {
        let x = self.quality as f64 / params.max_quality as f64;
        3.93248 - 4.5301 * x + 0.0880231 * x * x
            + 0.0780783 * (1.0 + (58.9631 * (x - 0.701304)).exp()).ln()
            - 0.100762 * (1.0 + (-47.4347 * (x - 0.821754)).exp()).ln()
            + 0.102035 * (1.0 + (25.2665 * (x - 0.962651)).exp()).ln()
    }

    /// Success chance for `ac` from this state, as a percentage. Focused
    /// actions are pinned to 100 while observe is active.
    pub fn success_percent(&self, ac: Action) -> i16 {
        match ac {
            Action::FocusedSynthesis | Action::FocusedTouch if self.buff(Buff::Observe) > 0 => 100,
            _ => ac.row().success_percent,
        }
    }

    /// Whether the game allows `ac` from this state. Mirrors the in-game
    /// hotbar check: supported, affordable, and action-specific preconditions
    /// hold. Does not consider whether durability would drop to zero.
    pub fn can_execute(&self, ac: Action) -> bool {
        if !ac.supported() {
            return false;
        }
        if self.cp + ac.row().d_cp < 0 {
            return false;
        }
        match ac {
            Action::TricksOfTheTrade | Action::PreciseTouch | Action::IntensiveSynthesis => {
                matches!(self.condition, Condition::Good | Condition::Excellent)
            }
            Action::ByregotsBlessing => self.inner_quiet > 1,
            Action::FinalAppraisal => self.buff(Buff::FinalAppraisal) == 0,
            Action::InnerQuiet => self.inner_quiet == 0,
            Action::Innovation => self.buff(Buff::Innovation) == 0,
            Action::MuscleMemory | Action::Reflect => self.buff(Buff::FirstStep) > 0,
            Action::PrudentTouch => !self.waste_not_active(),
            _ => true,
        }
    }

    /// Whether `ac` is worth considering in search: allowed in game, and a
    /// guaranteed-success execution does not immediately botch the craft.
    pub fn is_action_valid(&self, ac: Action, params: &CraftParams) -> bool {
        let mut probe = *self;
        // The probe's resulting condition does not matter here.
        if probe.execute_with(ac, true, self.condition.canonical_next(), params) {
            probe.pending_or_successful(params)
        } else {
            false
        }
    }

    /// Execute one turn with predetermined random factors.
    ///
    /// Returns true iff the action is allowed in game. A true return may
    /// still leave the craft botched (durability <= 0): that is a gameplay
    /// outcome, not an error.
    pub fn execute_with(
        &mut self,
        ac: Action,
        success: bool,
        next_condition: Condition,
        params: &CraftParams,
    ) -> bool {
        self.check(params);
        assert!(
            self.success_percent(ac) < 100 || success,
            "action cannot fail: {} at {}",
            ac.name(),
            self
        );
        assert!(
            self.condition.allows_transition(next_condition),
            "impossible condition transition {:?} -> {:?} at {}",
            self.condition,
            next_condition,
            self
        );
        if !self.can_execute(ac) {
            return false;
        }
        self.apply_cp_durability(ac, params);
        if success {
            self.apply_progress(ac, params);
            self.apply_quality(ac, params);
        }
        self.apply_inner_quiet(ac, success);
        self.apply_persistent_buffs(ac, params);
        if success {
            self.apply_buff_grants(ac);
        }
        self.condition = next_condition;
        true
    }

    /// Execute one turn, drawing the success bit and next condition from
    /// `rng`.
    pub fn execute(&mut self, ac: Action, params: &CraftParams, rng: &mut impl Rng) -> bool {
        let pct = self.success_percent(ac);
        let success = pct >= 100 || rng.gen::<f64>() * 100.0 < pct as f64;
        let next_condition = self.condition.sample_next(rng);
        self.execute_with(ac, success, next_condition, params)
    }

    /// Run a scripted action list. Returns false on the first illegal action;
    /// true once the list is exhausted or the craft finishes.
    pub fn execute_all(
        &mut self,
        actions: &[Action],
        params: &CraftParams,
        rng: &mut impl Rng,
    ) -> bool {
        for &ac in actions {
            if !self.execute(ac, params, rng) {
                return false;
            }
            if self.done(params) {
                return true;
            }
        }
        true
    }

    fn apply_cp_durability(&mut self, ac: Action, params: &CraftParams) {
        let row = ac.row();
        self.cp += row.d_cp;
        if self.cp > params.max_cp {
            self.cp = params.max_cp;
        }
        assert!(self.cp >= 0, "cp underflow after {}: {}", row.name, self);

        let mut d = row.d_durability;
        if d == 0 {
            return;
        }
        if d < 0 && self.waste_not_active() {
            assert!(d % 2 == 0, "odd durability cost under waste-not: {} {}", row.name, d);
            d /= 2;
        }
        self.durability += d;
        if self.durability > params.max_durability {
            self.durability = params.max_durability;
        }
    }

    fn apply_progress(&mut self, ac: Action, params: &CraftParams) {
        let row = ac.row();
        if !row.grants_progress {
            return;
        }
        let base = if self.buff(Buff::Ingenuity) > 0 {
            params.ingenuity_progress
        } else {
            params.base_progress
        };
        let gain = (base as i32 * row.efficiency_percent as i32) / 100;
        let total = self.progress as i32 + gain;
        let cap = params.max_progress as i32;
        // Final appraisal holds the craft just short of completion, and is
        // consumed even when the sum lands exactly on the held value.
        if self.buff(Buff::FinalAppraisal) > 0 && total >= cap - 1 {
            self.progress = params.max_progress - 1;
            self.buff[Buff::FinalAppraisal.id()] = 0;
        } else {
            self.progress = total.min(cap) as i16;
        }
    }

    fn apply_quality(&mut self, ac: Action, params: &CraftParams) {
        let row = ac.row();
        if !row.grants_quality {
            return;
        }
        let mut efficiency = if ac == Action::ByregotsBlessing {
            assert!(self.inner_quiet > 1, "byregot's without stacks: {}", self);
            1.0 + 0.2 * (self.inner_quiet - 1) as f64
        } else {
            row.efficiency_percent as f64 / 100.0
        };
        let mut buff_factor = 1.0;
        if self.buff(Buff::GreatStrides) > 0 {
            buff_factor += 1.0;
        }
        if self.buff(Buff::Innovation) > 0 {
            buff_factor += 0.2;
        }
        efficiency *= buff_factor;
        efficiency *= self.condition.quality_factor();

        let stacks = self.inner_quiet.saturating_sub(1) as f64;
        let control =
            (params.base_control as f64 * (1.0 + 0.2 * stacks)).min(params.base_control as f64 + 3000.0);
        let coef = if self.buff(Buff::Ingenuity) > 0 {
            params.ingenuity_quality_coef
        } else {
            params.base_quality_coef
        };
        let gain = efficiency * coef * (1.0 + 0.01 * control * (1.0 + 0.0001 * control));
        let total = (self.quality as f64 + gain) as i32;
        self.quality = total.min(params.max_quality as i32) as i16;
    }

    fn apply_inner_quiet(&mut self, ac: Action, success: bool) {
        if self.inner_quiet > 0 {
            if success {
                match ac {
                    Action::BasicTouch
                    | Action::FocusedTouch
                    | Action::StandardTouch
                    | Action::HastyTouch
                    | Action::PrudentTouch
                    | Action::DelicateSynthesis => self.inner_quiet += 1,
                    Action::PreparatoryTouch | Action::PreciseTouch => self.inner_quiet += 2,
                    Action::PatientTouch => self.inner_quiet *= 2,
                    Action::ByregotsBlessing => self.inner_quiet = 0,
                    Action::InnerQuiet => {
                        panic!("inner quiet while already active: {}", self)
                    }
                    _ => {}
                }
                if self.inner_quiet > 11 {
                    self.inner_quiet = 11;
                }
            } else if ac == Action::PatientTouch {
                self.inner_quiet = (self.inner_quiet + 1) / 2;
            }
        } else if success {
            match ac {
                Action::InnerQuiet => self.inner_quiet = 1,
                Action::Reflect => self.inner_quiet = 3,
                _ => {}
            }
        }
    }

    /// Manipulation restores durability before the per-turn decrement, except
    /// on the turn it is cast.
    fn apply_persistent_buffs(&mut self, ac: Action, params: &CraftParams) {
        if self.buff(Buff::Manipulation) > 0 && ac != Action::Manipulation {
            self.durability = (self.durability + 5).min(params.max_durability);
        }
        for b in self.buff.iter_mut() {
            if *b > 0 {
                *b -= 1;
            }
        }
    }

    /// Clear consumed effects, then set counters granted by the action. The
    /// grant happens after the per-turn decrement, so a fresh counter keeps
    /// its full duration.
    fn apply_buff_grants(&mut self, ac: Action) {
        let row = ac.row();
        if row.grants_progress {
            self.buff[Buff::MuscleMemory.id()] = 0;
        }
        if row.grants_quality {
            self.buff[Buff::GreatStrides.id()] = 0;
        }
        match ac {
            Action::GreatStrides => self.buff[Buff::GreatStrides.id()] = 3,
            Action::Innovation => self.buff[Buff::Innovation.id()] = 4,
            Action::Manipulation => self.buff[Buff::Manipulation.id()] = 8,
            Action::MuscleMemory => self.buff[Buff::MuscleMemory.id()] = 5,
            Action::WasteNot => self.buff[Buff::WasteNot.id()] = 4,
            Action::WasteNotII => self.buff[Buff::WasteNotII.id()] = 8,
            Action::Ingenuity => self.buff[Buff::Ingenuity.id()] = 5,
            Action::Observe => self.buff[Buff::Observe.id()] = 1,
            Action::FinalAppraisal => self.buff[Buff::FinalAppraisal.id()] = 5,
            _ => {}
        }
    }

    /// Invariants that must hold for every non-terminal state.
    fn check(&self, params: &CraftParams) {
        assert!(
            self.cp >= 0 && self.cp <= params.max_cp,
            "cp out of range: {}",
            self
        );
        assert!(
            self.durability > 0 && self.durability <= params.max_durability,
            "stepping a finished or corrupt craft: {}",
            self
        );
        assert!(self.progress < params.max_progress, "craft already complete: {}", self);
        assert!(self.inner_quiet <= 11, "inner quiet out of range: {}", self);
    }

    /// Encode the state for the network: raw scalar values, one slot per
    /// status counter.
    pub fn features(&self) -> [f64; STATE_FEATURES] {
        let mut out = [0.0f64; STATE_FEATURES];
        let mut off = 0usize;
        let mut push = |out: &mut [f64; STATE_FEATURES], v: f64| {
            out[off] = v;
            off += 1;
        };
        push(&mut out, self.cp as f64);
        push(&mut out, self.progress as f64);
        push(&mut out, self.quality as f64);
        push(&mut out, self.durability as f64);
        push(&mut out, self.inner_quiet as f64);
        push(&mut out, self.condition as u8 as f64);
        for &b in &self.buff {
            push(&mut out, b as f64);
        }
        debug_assert_eq!(off, STATE_FEATURES);
        out
    }

    /// Transposition key for this state.
    ///
    /// Finished crafts are compared by quality alone (all paths to the same
    /// reward collapse into one key); live states are compared field by
    /// field. This coarsening keeps the transposition table bounded.
    pub fn key(&self, params: &CraftParams) -> StateKey {
        if self.done(params) {
            StateKey::Terminal {
                quality: self.quality,
            }
        } else {
            StateKey::Live(*self)
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CP:{} DUR:{} P:{} Q:{} IQ:{} C:{:?}",
            self.cp, self.durability, self.progress, self.quality, self.inner_quiet, self.condition
        )?;
        for b in Buff::ALL {
            write!(f, " {}:{}", b.tag(), self.buff(b))?;
        }
        Ok(())
    }
}

/// Identity of a state in the transposition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKey {
    Live(State),
    Terminal { quality: i16 },
}

impl Hash for StateKey {
    fn hash<H: Hasher>(&self, h: &mut H) {
        match self {
            StateKey::Terminal { quality } => {
                h.write_u64((1u64 << 63) | *quality as u16 as u64);
            }
            StateKey::Live(s) => h.write_u64(mix_live(s)),
        }
    }
}

/// Pack a live state into two 64-bit lanes and mix.
///
/// Lane 1: cp (10 bits), progress (13), quality (16), durability/5 (5),
/// inner quiet (4). Lane 2: condition (2) followed by each status counter at
/// its declared bit budget. Lane 1 is spread by two 64-bit multiplier
/// constants (one via the high half of a 128-bit product), then lane 2 is
/// added.
fn mix_live(s: &State) -> u64 {
    assert!(
        s.durability > 0 && s.durability % 5 == 0,
        "unhashable durability: {}",
        s
    );

    let mut lane1: u64 = s.cp as u64;
    lane1 = (lane1 << 13) + s.progress as u64;
    lane1 = (lane1 << 16) + s.quality as u64;
    lane1 = (lane1 << 5) + (s.durability / 5) as u64;
    lane1 = (lane1 << 4) + s.inner_quiet as u64;

    let mut lane2: u64 = s.condition as u8 as u64;
    for b in Buff::ALL {
        let bits = b.bit_budget();
        let v = s.buff(b) as u64;
        assert!(v < (1 << bits), "status counter over budget: {}", s);
        lane2 = (lane2 << bits) + v;
    }

    const P1: u128 = 0xd25807388964a537;
    const P2: u64 = 0x8da1685a49e0891d;
    P2.wrapping_mul(lane1)
        .wrapping_add((P1.wrapping_mul(lane1 as u128) >> 64) as u64)
        .wrapping_add(lane2)
}
