//! Conversation maturity: how much has been learned, and what to say when
//! nothing learned fits yet.

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::db::Counts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Infant,
    Toddler,
    Child,
    Adolescent,
    Adult,
}

/// Weighted totals at which each later stage begins.
const THRESHOLDS: [(Stage, i64); 4] =
    [(Stage::Toddler, 20), (Stage::Child, 50), (Stage::Adolescent, 100), (Stage::Adult, 200)];

const INFANT: &[&str] = &[
    "Hi!",
    "Hello?",
    "Me listen.",
    "Tell more?",
    "Ooh.",
    "Words... new.",
];

const TODDLER: &[&str] = &[
    "I like talk.",
    "Tell me more!",
    "What that?",
    "You say more?",
    "I learning words.",
    "That good?",
];

const CHILD: &[&str] = &[
    "That sounds fun! What happened next?",
    "I think I get it. Can you tell me more?",
    "Why do you say that?",
    "I'm learning so much from you.",
    "Ooh, and then what?",
];

const ADOLESCENT: &[&str] = &[
    "Huh, I hadn't thought about it that way.",
    "That makes sense, I guess. What do you think about it?",
    "Honestly, I'm still figuring that out.",
    "Okay, but what made you feel that way?",
    "I kind of see where you're coming from.",
];

const ADULT: &[&str] = &[
    "That's a thoughtful point. How did you come to see it that way?",
    "I appreciate you sharing that with me.",
    "I understand. What would you like to do about it?",
    "That's interesting. Tell me more about what's on your mind.",
    "I see what you mean, and it's worth thinking through.",
];

impl Stage {
    pub const ALL: [Stage; 5] = [Stage::Infant, Stage::Toddler, Stage::Child, Stage::Adolescent, Stage::Adult];

    /// 0 for infant through 4 for adult.
    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn from_index(i: u8) -> Option<Stage> {
        Stage::ALL.get(usize::from(i)).copied()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Infant => "infant",
            Stage::Toddler => "toddler",
            Stage::Child => "child",
            Stage::Adolescent => "adolescent",
            Stage::Adult => "adult",
        }
    }

    /// Fixed confidence attached to this stage's fallback phrases.
    pub fn confidence(self) -> f64 {
        match self {
            Stage::Infant => 0.3,
            Stage::Toddler => 0.4,
            Stage::Child => 0.5,
            Stage::Adolescent => 0.6,
            Stage::Adult => 0.7,
        }
    }

    pub fn phrases(self) -> &'static [&'static str] {
        match self {
            Stage::Infant => INFANT,
            Stage::Toddler => TODDLER,
            Stage::Child => CHILD,
            Stage::Adolescent => ADOLESCENT,
            Stage::Adult => ADULT,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Stage::Infant => "Just starting out: single words and simple sounds.",
            Stage::Toddler => "Picking up words and stringing short phrases together.",
            Stage::Child => "Forming full sentences and asking lots of questions.",
            Stage::Adolescent => "Holding real conversations with some personality.",
            Stage::Adult => "Fluent in the partner's voice, with nuanced replies.",
        }
    }

    pub fn next(self) -> Option<Stage> {
        Stage::from_index(self.index() + 1)
    }

    /// Weighted total at which this stage begins.
    pub fn threshold(self) -> i64 {
        THRESHOLDS.iter().find(|(s, _)| *s == self).map_or(0, |(_, t)| *t)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `vocab + 2·patterns + 3·templates`.
pub fn weighted_total(counts: &Counts) -> i64 {
    counts.vocabulary + 2 * counts.patterns + 3 * counts.templates
}

pub fn stage_for(total: i64) -> Stage {
    THRESHOLDS.iter().rev().find(|(_, t)| total >= *t).map_or(Stage::Infant, |(s, _)| *s)
}

/// Percent of the way from the current stage to the next; 100 at adult.
pub fn progress(total: i64) -> f64 {
    let stage = stage_for(total);
    let Some(next) = stage.next() else {
        return 100.0;
    };
    let lo = stage.threshold();
    let hi = next.threshold();
    ((total - lo) as f64 / (hi - lo) as f64 * 100.0).clamp(0.0, 100.0)
}

/// A stage-appropriate line and its fixed confidence.
pub fn fallback(stage: Stage, rng: &mut StdRng) -> (&'static str, f64) {
    let text = stage.phrases().choose(rng).copied().unwrap_or("...");
    (text, stage.confidence())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaturityReport {
    pub stage: Stage,
    pub description: &'static str,
    pub counts: Counts,
    pub total: i64,
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_stage: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_threshold: Option<i64>,
}

/// `stage` is passed in so a stored high-water mark can outrank the counts.
pub fn report(stage: Stage, counts: Counts) -> MaturityReport {
    let total = weighted_total(&counts);
    let next_stage = stage.next();
    MaturityReport {
        stage,
        description: stage.description(),
        counts,
        total,
        progress: if stage_for(total) == stage { progress(total) } else { 100.0 },
        next_stage,
        next_threshold: next_stage.map(Stage::threshold),
    }
}
