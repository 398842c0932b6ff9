//! Closed action and status-effect catalogues with the static parameter table.
//!
//! Action space size: 29 fixed ids (`Reuse` is present but blacklisted), plus
//! the `NUM_ACTIONS` sentinel used for "no action" / resignation.

/// Number of real actions (excludes the sentinel).
pub const NUM_ACTIONS: usize = 29;

/// Number of status-effect counters carried by a state: nine real effects plus
/// the first-step pseudo-status that gates opening-only actions.
pub const NUM_BUFFS: usize = 10;

/// Crafting actions, in catalogue order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Action {
    BasicSynthesis,
    BasicTouch,
    ByregotsBlessing,
    CarefulSynthesis,
    DelicateSynthesis,
    FinalAppraisal,
    FocusedSynthesis,
    FocusedTouch,
    GreatStrides,
    HastyTouch,
    Ingenuity,
    InnerQuiet,
    Innovation,
    IntensiveSynthesis,
    Manipulation,
    MastersMend,
    MuscleMemory,
    Observe,
    PatientTouch,
    PreciseTouch,
    PreparatoryTouch,
    PrudentTouch,
    RapidSynthesis,
    Reflect,
    Reuse,
    StandardTouch,
    TricksOfTheTrade,
    WasteNot,
    WasteNotII,
}

impl Action {
    pub const ALL: [Action; NUM_ACTIONS] = [
        Action::BasicSynthesis,
        Action::BasicTouch,
        Action::ByregotsBlessing,
        Action::CarefulSynthesis,
        Action::DelicateSynthesis,
        Action::FinalAppraisal,
        Action::FocusedSynthesis,
        Action::FocusedTouch,
        Action::GreatStrides,
        Action::HastyTouch,
        Action::Ingenuity,
        Action::InnerQuiet,
        Action::Innovation,
        Action::IntensiveSynthesis,
        Action::Manipulation,
        Action::MastersMend,
        Action::MuscleMemory,
        Action::Observe,
        Action::PatientTouch,
        Action::PreciseTouch,
        Action::PreparatoryTouch,
        Action::PrudentTouch,
        Action::RapidSynthesis,
        Action::Reflect,
        Action::Reuse,
        Action::StandardTouch,
        Action::TricksOfTheTrade,
        Action::WasteNot,
        Action::WasteNotII,
    ];

    /// Policy index of this action (0..NUM_ACTIONS).
    #[inline]
    pub fn id(self) -> usize {
        self as usize
    }

    /// Convert a policy index back to an `Action`.
    ///
    /// # Panics
    /// Panics if `id >= NUM_ACTIONS`.
    pub fn from_id(id: usize) -> Action {
        assert!(id < NUM_ACTIONS, "action id out of range: {}", id);
        Self::ALL[id]
    }

    /// Parameter row for this action.
    #[inline]
    pub fn row(self) -> &'static ActionRow {
        &ACTION_TABLE[self.id()]
    }

    #[inline]
    pub fn name(self) -> &'static str {
        self.row().name
    }

    /// Blacklist check. `Reuse` is defined in the table but excluded from the
    /// supported set.
    pub fn supported(self) -> bool {
        !matches!(self, Action::Reuse)
    }
}

/// Immutable per-action parameters. `d_cp` is negative for a cost and positive
/// for a refund; `d_durability` is usually negative.
pub struct ActionRow {
    pub name: &'static str,
    pub d_cp: i16,
    pub d_durability: i16,
    /// Success chance as a percentage in [0, 100].
    pub success_percent: i16,
    /// Efficiency as a percentage of the base progress/quality quantum.
    pub efficiency_percent: i16,
    pub grants_progress: bool,
    pub grants_quality: bool,
}

const fn row(
    name: &'static str,
    d_cp: i16,
    d_durability: i16,
    success_percent: i16,
    efficiency_percent: i16,
    grants_progress: bool,
    grants_quality: bool,
) -> ActionRow {
    ActionRow {
        name,
        d_cp,
        d_durability,
        success_percent,
        efficiency_percent,
        grants_progress,
        grants_quality,
    }
}

/// The ordering below must match the `Action` enum.
pub static ACTION_TABLE: [ActionRow; NUM_ACTIONS] = [
    row("BasicSynthesis", 0, -10, 100, 120, true, false),
    row("BasicTouch", -18, -10, 100, 100, false, true),
    // Byregot's effective efficiency is dynamic: 1.0 + 0.2 * (inner_quiet - 1).
    row("ByregotsBlessing", -24, -10, 100, 100, false, true),
    row("CarefulSynthesis", -7, -10, 100, 150, true, false),
    row("DelicateSynthesis", -32, -10, 100, 100, true, true),
    row("FinalAppraisal", -1, 0, 100, 0, false, false),
    row("FocusedSynthesis", -5, -10, 50, 200, true, false),
    row("FocusedTouch", -18, -10, 50, 150, false, true),
    row("GreatStrides", -32, 0, 100, 0, false, false),
    row("HastyTouch", 0, -10, 60, 100, false, true),
    row("Ingenuity", -24, 0, 100, 0, false, false),
    row("InnerQuiet", -18, 0, 100, 0, false, false),
    row("Innovation", -18, 0, 100, 0, false, false),
    row("IntensiveSynthesis", -6, -10, 100, 300, true, false),
    row("Manipulation", -96, 0, 100, 0, false, false),
    row("MastersMend", -88, 30, 100, 0, false, false),
    row("MuscleMemory", -6, -10, 100, 300, true, false),
    row("Observe", -7, 0, 100, 0, false, false),
    row("PatientTouch", -6, -10, 50, 100, false, true),
    row("PreciseTouch", -18, -10, 100, 150, false, true),
    row("PreparatoryTouch", -40, -20, 100, 200, false, true),
    row("PrudentTouch", -25, -5, 100, 100, false, true),
    row("RapidSynthesis", 0, -10, 50, 500, true, false),
    row("Reflect", -24, -10, 100, 100, false, true),
    row("Reuse", -60, 0, 100, 0, false, false),
    row("StandardTouch", -32, -10, 100, 125, false, true),
    row("TricksOfTheTrade", 20, 0, 100, 0, false, false),
    row("WasteNot", -56, 0, 100, 0, false, false),
    row("WasteNotII", -98, 0, 100, 0, false, false),
];

/// Timed status effects. `FirstStep` is not a real effect: it starts at 1 and
/// expires after the first turn, gating opening-only actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Buff {
    FirstStep,
    MuscleMemory,
    GreatStrides,
    Innovation,
    Manipulation,
    WasteNot,
    WasteNotII,
    Ingenuity,
    Observe,
    FinalAppraisal,
}

impl Buff {
    pub const ALL: [Buff; NUM_BUFFS] = [
        Buff::FirstStep,
        Buff::MuscleMemory,
        Buff::GreatStrides,
        Buff::Innovation,
        Buff::Manipulation,
        Buff::WasteNot,
        Buff::WasteNotII,
        Buff::Ingenuity,
        Buff::Observe,
        Buff::FinalAppraisal,
    ];

    #[inline]
    pub fn id(self) -> usize {
        self as usize
    }

    /// Short tag used in the state display string.
    pub fn tag(self) -> &'static str {
        match self {
            Buff::FirstStep => "FS",
            Buff::MuscleMemory => "MM",
            Buff::GreatStrides => "GS",
            Buff::Innovation => "IN",
            Buff::Manipulation => "MN",
            Buff::WasteNot => "WN",
            Buff::WasteNotII => "WN2",
            Buff::Ingenuity => "IG",
            Buff::Observe => "OB",
            Buff::FinalAppraisal => "FA",
        }
    }

    /// Bits reserved for this counter in the packed state key. The maximum
    /// duration granted to each effect must fit.
    pub fn bit_budget(self) -> u32 {
        match self {
            Buff::FirstStep => 1,
            Buff::MuscleMemory => 3,
            Buff::GreatStrides => 2,
            Buff::Innovation => 3,
            Buff::Manipulation => 4,
            Buff::WasteNot => 3,
            Buff::WasteNotII => 4,
            Buff::Ingenuity => 3,
            Buff::Observe => 1,
            Buff::FinalAppraisal => 3,
        }
    }
}
