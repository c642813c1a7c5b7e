//! Keyword/emoji emotion scoring, reply styling, and reports over stored samples.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::db::EmotionSample;
use crate::thresholds::NEUTRAL_FLOOR;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
    Afraid,
    Surprised,
    Neutral,
}

impl Emotion {
    /// Bucket order; also the tie-break order for arg-max.
    pub const ALL: [Emotion; 6] =
        [Emotion::Happy, Emotion::Sad, Emotion::Angry, Emotion::Afraid, Emotion::Surprised, Emotion::Neutral];

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Afraid => "afraid",
            Emotion::Surprised => "surprised",
            Emotion::Neutral => "neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Emotion> {
        Emotion::ALL.into_iter().find(|e| e.as_str() == s)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-bucket scores, each in [0, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionScores {
    #[serde(default)]
    pub happy: f64,
    #[serde(default)]
    pub sad: f64,
    #[serde(default)]
    pub angry: f64,
    #[serde(default)]
    pub afraid: f64,
    #[serde(default)]
    pub surprised: f64,
    #[serde(default)]
    pub neutral: f64,
}

impl EmotionScores {
    pub fn get(&self, e: Emotion) -> f64 {
        match e {
            Emotion::Happy => self.happy,
            Emotion::Sad => self.sad,
            Emotion::Angry => self.angry,
            Emotion::Afraid => self.afraid,
            Emotion::Surprised => self.surprised,
            Emotion::Neutral => self.neutral,
        }
    }

    pub fn set(&mut self, e: Emotion, v: f64) {
        let slot = match e {
            Emotion::Happy => &mut self.happy,
            Emotion::Sad => &mut self.sad,
            Emotion::Angry => &mut self.angry,
            Emotion::Afraid => &mut self.afraid,
            Emotion::Surprised => &mut self.surprised,
            Emotion::Neutral => &mut self.neutral,
        };
        *slot = v;
    }

    fn from_raw(raw: [f64; 6]) -> Self {
        let mut s = Self::default();
        for e in Emotion::ALL {
            s.set(e, raw[e.index()]);
        }
        s
    }

    /// Highest bucket; earlier buckets win ties.
    pub fn arg_max(&self) -> (Emotion, f64) {
        let mut best = (Emotion::Happy, self.happy);
        for e in Emotion::ALL.into_iter().skip(1) {
            if self.get(e) > best.1 {
                best = (e, self.get(e));
            }
        }
        best
    }

    pub fn mean(&self) -> f64 {
        Emotion::ALL.iter().map(|e| self.get(*e)).sum::<f64>() / Emotion::ALL.len() as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmotionReading {
    pub primary: Emotion,
    pub confidence: f64,
    pub intensity: f64,
    pub scores: EmotionScores,
}

const KEYWORDS: [(Emotion, &[&str]); 5] = [
    (Emotion::Happy, &[
        "happy", "joy", "excited", "delighted", "glad", "pleased", "thrilled", "enjoy", "love",
        "great", "excellent", "amazing", "wonderful", "awesome", "yay", "woohoo", "hurray",
        "smile", "laugh",
    ]),
    (Emotion::Sad, &[
        "sad", "unhappy", "upset", "depressed", "disappointed", "miserable", "sorry", "regret",
        "miss", "lonely", "heartbroken", "grief", "cry", "tears",
    ]),
    (Emotion::Angry, &[
        "angry", "mad", "frustrated", "annoyed", "irritated", "furious", "rage", "hate",
        "dislike", "resent", "offensive", "damn", "terrible", "awful",
    ]),
    (Emotion::Afraid, &[
        "afraid", "scared", "frightened", "terrified", "fear", "anxious", "nervous", "worry",
        "worried", "panic", "dread", "horror",
    ]),
    (Emotion::Surprised, &[
        "surprised", "amazed", "astonished", "shocked", "stunned", "unexpected", "wow", "whoa",
        "unbelievable", "incredible",
    ]),
];

const EMOJI: [(Emotion, &[&str]); 5] = [
    (Emotion::Happy, &["😊", "😁", "😄", "🙂", "😃", "😀", "❤", "👍", "🎉"]),
    (Emotion::Sad, &["😢", "😭", "😔", "😥", "💔", "👎", "😕"]),
    (Emotion::Angry, &["😠", "😡", "🤬", "👿", "😤", "😒"]),
    (Emotion::Afraid, &["😨", "😱", "😰", "😧", "😦", "😟"]),
    (Emotion::Surprised, &["😲", "😮", "😯", "😳"]),
];

const INCREASE: [&str; 8] = ["very", "really", "extremely", "incredibly", "absolutely", "so", "too", "completely"];
const DECREASE: [&str; 7] = ["somewhat", "slightly", "a bit", "a little", "kind of", "sort of", "barely"];

const NEGATIONS: [&str; 21] = [
    "not", "no", "isn't", "aren't", "wasn't", "weren't", "don't", "doesn't", "didn't", "can't",
    "couldn't", "shouldn't", "wouldn't", "hasn't", "haven't", "hadn't", "never", "none",
    "nothing", "nowhere", "nobody",
];

/// How far back a negation word reaches.
const NEGATION_WINDOW: usize = 3;

const KEYWORD_HIT: f64 = 0.3;
const EMOJI_HIT: f64 = 0.5;
const NEGATION_PENALTY: f64 = 0.3;
const NEGATION_TRANSFER: f64 = 0.2;

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+(?:['’][\p{L}]+)*").unwrap());
static SENTENCE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^.!?]+[.!?]*").unwrap());

fn words(sentence: &str) -> Vec<String> {
    WORD_RE
        .find_iter(sentence)
        .map(|m| m.as_str().to_lowercase().replace('’', "'"))
        .collect()
}

fn starts_with_phrase(tokens: &[String], at: usize, phrase: &str) -> Option<usize> {
    let mut n = 0;
    for part in phrase.split(' ') {
        if tokens.get(at + n).map(String::as_str) != Some(part) {
            return None;
        }
        n += 1;
    }
    Some(n)
}

/// Multiplier from the last intensity modifier in the sentence.
fn sentence_modifier(tokens: &[String]) -> f64 {
    let mut modifier = 1.0;
    for i in 0..tokens.len() {
        if INCREASE.iter().any(|m| starts_with_phrase(tokens, i, m).is_some()) {
            modifier = 1.5;
        } else if DECREASE.iter().any(|m| starts_with_phrase(tokens, i, m).is_some()) {
            modifier = 0.5;
        }
    }
    modifier
}

/// Bonus for the trailing run of `!`/`?`, ignoring trailing emoji and spaces.
fn punctuation_bonus(text: &str) -> f64 {
    let body = text.trim_end_matches(|c: char| c.is_whitespace() || (!c.is_alphanumeric() && !c.is_ascii_punctuation()));
    let run: Vec<char> = body.chars().rev().take_while(|c| matches!(c, '!' | '?')).collect();
    let bangs = run.iter().filter(|c| **c == '!').count();
    let marks = run.len() - bangs;
    match (bangs, marks) {
        (0, 0) => 0.0,
        (b, 0) => match b {
            1 => 0.2,
            2 => 0.3,
            _ => 0.5,
        },
        (0, q) => match q {
            1 => 0.1,
            2 => 0.2,
            _ => 0.3,
        },
        _ => 0.4,
    }
}

/// Score `text` over the six buckets.
pub fn classify(text: &str) -> EmotionReading {
    let text = text.trim();
    if text.is_empty() {
        let mut scores = EmotionScores::default();
        scores.set(Emotion::Neutral, 1.0);
        return EmotionReading { primary: Emotion::Neutral, confidence: 1.0, intensity: 0.5, scores };
    }

    let mut raw = [0.0f64; 6];
    raw[Emotion::Neutral.index()] = NEUTRAL_FLOOR;

    for m in SENTENCE_RE.find_iter(text) {
        let tokens = words(m.as_str());
        let modifier = sentence_modifier(&tokens);
        for i in 0..tokens.len() {
            for (emotion, keywords) in KEYWORDS {
                if !keywords.iter().any(|k| starts_with_phrase(&tokens, i, k).is_some()) {
                    continue;
                }
                let window = &tokens[i.saturating_sub(NEGATION_WINDOW)..i];
                let negated = window.iter().any(|w| NEGATIONS.contains(&w.as_str()));
                if negated {
                    raw[emotion.index()] -= NEGATION_PENALTY;
                    match emotion {
                        Emotion::Happy => raw[Emotion::Sad.index()] += NEGATION_TRANSFER,
                        Emotion::Sad => raw[Emotion::Happy.index()] += NEGATION_TRANSFER,
                        _ => {}
                    }
                } else {
                    raw[emotion.index()] += KEYWORD_HIT * modifier;
                }
            }
        }
    }

    for (emotion, emoji) in EMOJI {
        for e in emoji {
            if text.contains(e) {
                raw[emotion.index()] += EMOJI_HIT;
            }
        }
    }

    let bonus = punctuation_bonus(text);
    if bonus > 0.0 {
        let (top, _) = EmotionScores::from_raw(raw).arg_max();
        if top != Emotion::Neutral {
            raw[top.index()] += bonus;
        }
    }

    for v in raw.iter_mut() {
        *v = v.clamp(0.0, 1.0);
    }
    let scores = EmotionScores::from_raw(raw);
    let (mut primary, mut confidence) = scores.arg_max();
    if confidence < NEUTRAL_FLOOR {
        primary = Emotion::Neutral;
        confidence = scores.neutral.max(NEUTRAL_FLOOR);
    }
    EmotionReading { primary, confidence, intensity: scores.mean().min(1.0), scores }
}

fn suffix(emotion: Emotion, strong: bool) -> Option<&'static str> {
    let s = match (emotion, strong) {
        (Emotion::Happy, false) => "! 🙂",
        (Emotion::Happy, true) => "!! 😊",
        (Emotion::Sad, false) => "... 😕",
        (Emotion::Sad, true) => "... 😔",
        (Emotion::Angry, false) => ". 😒",
        (Emotion::Angry, true) => "! 😠",
        (Emotion::Afraid, false) => "... 😟",
        (Emotion::Afraid, true) => "... 😨",
        (Emotion::Surprised, false) => "! 😯",
        (Emotion::Surprised, true) => "?! 😮",
        (Emotion::Neutral, _) => return None,
    };
    Some(s)
}

/// Re-punctuate `text` in the tone of `emotion`.
pub fn style(text: &str, emotion: Emotion, intensity: f64) -> String {
    if intensity <= 0.2 || text.trim().is_empty() {
        return text.to_string();
    }
    let strong = intensity > 0.7;
    let Some(tail) = suffix(emotion, strong) else {
        return text.to_string();
    };
    let base = text.trim_end().trim_end_matches(['.', '!', '?']);
    let base = if strong && emotion == Emotion::Happy { base.replace('.', "!") } else { base.to_string() };
    format!("{base}{tail}")
}

/// Per-bucket `score × intensity` series, oldest sample first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EmotionTimeline {
    pub timestamps: Vec<i64>,
    pub emotions: BTreeMap<Emotion, Vec<f64>>,
}

pub fn timeline(samples: &[EmotionSample]) -> EmotionTimeline {
    let mut emotions: BTreeMap<Emotion, Vec<f64>> =
        Emotion::ALL.into_iter().map(|e| (e, Vec::with_capacity(samples.len()))).collect();
    let mut timestamps = Vec::with_capacity(samples.len());
    for s in samples {
        timestamps.push(s.created_at);
        for (e, series) in emotions.iter_mut() {
            series.push(s.scores.get(*e) * s.intensity);
        }
    }
    EmotionTimeline { timestamps, emotions }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DominantEmotion {
    pub emotion: Emotion,
    pub count: usize,
    pub total_count: usize,
    pub percentage: f64,
    pub avg_confidence: f64,
    pub avg_intensity: f64,
}

/// Most frequent primary emotion among `samples`, `None` when empty.
pub fn dominant(samples: &[EmotionSample]) -> Option<DominantEmotion> {
    if samples.is_empty() {
        return None;
    }
    let mut acc = [(0usize, 0.0f64, 0.0f64); 6];
    for s in samples {
        let slot = &mut acc[s.primary.index()];
        slot.0 += 1;
        slot.1 += s.confidence;
        slot.2 += s.intensity;
    }
    let mut best = Emotion::Happy;
    for e in Emotion::ALL {
        if acc[e.index()].0 > acc[best.index()].0 {
            best = e;
        }
    }
    let (count, conf, intensity) = acc[best.index()];
    Some(DominantEmotion {
        emotion: best,
        count,
        total_count: samples.len(),
        percentage: count as f64 / samples.len() as f64 * 100.0,
        avg_confidence: conf / count as f64,
        avg_intensity: intensity / count as f64,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionalPatterns {
    pub dominant_emotion: Emotion,
    /// 1.0 = never changes, 0.0 = changes every message.
    pub stability: f64,
    /// Share of the six buckets ever expressed.
    pub range: f64,
    pub counts: BTreeMap<Emotion, usize>,
    /// Keyed `"<from>_to_<to>"`.
    pub transitions: BTreeMap<String, usize>,
}

/// Stability and range over samples in chronological order.
pub fn emotional_patterns(samples: &[EmotionSample]) -> EmotionalPatterns {
    let mut counts: BTreeMap<Emotion, usize> = BTreeMap::new();
    let mut transitions: BTreeMap<String, usize> = BTreeMap::new();
    let mut changes = 0usize;
    let mut prev: Option<Emotion> = None;
    for s in samples {
        *counts.entry(s.primary).or_default() += 1;
        if let Some(p) = prev.filter(|p| *p != s.primary) {
            changes += 1;
            *transitions.entry(format!("{p}_to_{}", s.primary)).or_default() += 1;
        }
        prev = Some(s.primary);
    }
    let stability = if samples.len() > 1 { 1.0 - changes as f64 / (samples.len() - 1) as f64 } else { 1.0 };
    let dominant_emotion = dominant(samples).map_or(Emotion::Neutral, |d| d.emotion);
    EmotionalPatterns {
        dominant_emotion,
        stability,
        range: counts.len() as f64 / Emotion::ALL.len() as f64,
        counts,
        transitions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn punctuation_runs() {
        assert_eq!(punctuation_bonus("great!"), 0.2);
        assert_eq!(punctuation_bonus("great!!"), 0.3);
        assert_eq!(punctuation_bonus("great!!!!"), 0.5);
        assert_eq!(punctuation_bonus("really?"), 0.1);
        assert_eq!(punctuation_bonus("really???"), 0.3);
        assert_eq!(punctuation_bonus("what?!"), 0.4);
        assert_eq!(punctuation_bonus("yay! 🎉"), 0.2);
        assert_eq!(punctuation_bonus("fine. ok"), 0.0);
    }

    #[test]
    fn modifier_last_one_wins() {
        let t = words("I am very happy but only a bit");
        assert_eq!(sentence_modifier(&t), 0.5);
        assert_eq!(sentence_modifier(&words("so so")), 1.5);
        assert_eq!(sentence_modifier(&words("plain")), 1.0);
    }

    #[test]
    fn ties_resolve_in_bucket_order() {
        let s = EmotionScores { happy: 0.3, neutral: 0.3, ..Default::default() };
        assert_eq!(s.arg_max().0, Emotion::Happy);
        let s = EmotionScores { sad: 0.4, angry: 0.4, ..Default::default() };
        assert_eq!(s.arg_max().0, Emotion::Sad);
    }
}
