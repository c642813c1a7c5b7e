//! Lexicon + suffix heuristics standing in for a real tagger.
//!
//! Good enough to drive learning on everyday English chat; anything serious
//! should implement [`Analyzer`] over a proper NLP pipeline.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

use super::{Analysis, Analyzer, Entity, EntityLabel, PosTag, Sentence, Token};

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\p{L}\p{N}]+(?:['’][\p{L}]+)*|[^\s\p{L}\p{N}]").unwrap()
});

static LEXICON: LazyLock<HashMap<&'static str, PosTag>> = LazyLock::new(|| {
    let mut m = HashMap::new();
    let groups: [(PosTag, &[&str]); 12] = [
        (PosTag::Pron, &[
            "i", "me", "my", "mine", "myself", "you", "your", "yours", "he", "him", "his",
            "she", "her", "hers", "it", "its", "we", "us", "our", "ours", "they", "them",
            "their", "theirs", "who", "whom", "what", "which", "something", "anything",
            "everything", "nothing", "someone", "anyone", "everyone", "nobody", "i'm",
            "you're", "we're", "they're", "it's", "that's", "i've", "i'll", "i'd",
        ]),
        (PosTag::Det, &[
            "the", "a", "an", "this", "that", "these", "those", "some", "any", "every", "each",
            "no", "all", "both", "another", "such",
        ]),
        (PosTag::Adp, &[
            "in", "on", "at", "to", "from", "with", "of", "for", "by", "about", "into", "over",
            "under", "after", "before", "between", "through", "during", "without", "around",
            "near", "like",
        ]),
        (PosTag::Aux, &[
            "am", "is", "are", "was", "were", "be", "been", "being", "do", "does", "did",
            "have", "has", "had", "will", "would", "can", "could", "should", "may", "might",
            "must", "shall", "isn't", "aren't", "wasn't", "weren't", "don't", "doesn't",
            "didn't", "can't", "couldn't", "won't", "wouldn't", "shouldn't", "haven't",
            "hasn't", "hadn't",
        ]),
        (PosTag::Cconj, &["and", "or", "but", "nor", "yet"]),
        (PosTag::Sconj, &["because", "if", "while", "although", "though", "since", "unless", "whether"]),
        (PosTag::Part, &["not", "n't", "'s"]),
        (PosTag::Intj, &[
            "hello", "hi", "hey", "wow", "oh", "ok", "okay", "yes", "yeah", "yay", "thanks",
            "please", "whoa", "oops", "hmm", "bye", "woohoo", "hurray", "ugh",
        ]),
        (PosTag::Adv, &[
            "very", "really", "so", "too", "there", "here", "now", "then", "always", "never",
            "also", "just", "quite", "how", "when", "where", "why", "again", "often", "still",
            "already", "soon", "today", "tomorrow", "yesterday", "almost", "maybe", "perhaps",
            "somewhat", "slightly", "barely", "extremely", "absolutely", "completely", "well",
        ]),
        (PosTag::Verb, &[
            "like", "love", "hate", "go", "went", "see", "saw", "want", "need", "know", "think",
            "make", "get", "got", "eat", "ate", "play", "work", "live", "enjoy", "feel", "felt",
            "say", "said", "tell", "told", "come", "came", "take", "took", "give", "gave", "find",
            "found", "call", "read", "write", "run", "walk", "watch", "cook", "sing", "dance",
            "travel", "study", "miss", "hope", "wish", "prefer", "dislike", "adore", "cry",
            "laugh", "smile", "help", "fear", "worry", "understand", "believe", "remember",
            "forget", "learn", "teach", "buy", "sell", "drive", "swim", "sleep", "talk", "speak",
        ]),
        (PosTag::Adj, &[
            "good", "bad", "happy", "sad", "great", "big", "small", "new", "old", "nice", "fine",
            "awesome", "amazing", "wonderful", "terrible", "awful", "angry", "mad", "afraid",
            "scared", "nervous", "glad", "excited", "tired", "busy", "favorite", "favourite",
            "best", "worst", "little", "long", "short", "young", "beautiful", "pretty", "hard",
            "easy", "hot", "cold", "funny", "lonely", "upset", "sorry", "cool", "weird",
            "strange", "red", "blue", "green", "black", "white", "delighted", "thrilled",
        ]),
        (PosTag::Noun, &[
            "name", "cat", "dog", "job", "work", "home", "city", "country", "family", "friend",
            "friends", "day", "time", "year", "years", "food", "music", "movie", "book", "color",
            "colour", "school", "college", "university", "hobby", "pet", "weekend", "morning",
            "night", "people", "thing", "things", "life", "world", "weather", "coffee", "tea",
        ]),
    ];
    for (tag, words) in groups {
        for w in words {
            // first group wins for ambiguous words ("like" stays a verb via context below)
            m.entry(*w).or_insert(tag);
        }
    }
    m
});

/// Words that introduce a person's name ("my name is X", "call me X").
const NAME_CUES: [&str; 3] = ["is", "me", "called"];

/// Prepositions that introduce places ("live in X", "from X").
const PLACE_CUES: [&str; 4] = ["in", "from", "at", "near"];

fn is_closed_class(tag: PosTag) -> bool {
    matches!(
        tag,
        PosTag::Pron | PosTag::Det | PosTag::Adp | PosTag::Aux | PosTag::Cconj | PosTag::Sconj | PosTag::Part | PosTag::Intj
    )
}

#[derive(Debug, Default, Clone, Copy)]
pub struct RuleAnalyzer;

impl RuleAnalyzer {
    pub fn new() -> Self {
        Self
    }

    fn split_sentences(text: &str) -> Vec<&str> {
        let mut out = Vec::new();
        let mut start = 0;
        let mut chars = text.char_indices().peekable();
        while let Some((i, c)) = chars.next() {
            if !matches!(c, '.' | '!' | '?') {
                continue;
            }
            // swallow the whole run of terminators ("?!", "...")
            let mut end = i + c.len_utf8();
            while let Some(&(j, n)) = chars.peek() {
                if matches!(n, '.' | '!' | '?') {
                    end = j + n.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let at_boundary = chars.peek().map_or(true, |&(_, n)| n.is_whitespace());
            if at_boundary {
                let s = text[start..end].trim();
                if !s.is_empty() {
                    out.push(s);
                }
                start = end;
            }
        }
        let rest = text[start..].trim();
        if !rest.is_empty() {
            out.push(rest);
        }
        out
    }

    fn tokenize(sentence: &str) -> Vec<(String, String)> {
        let matches: Vec<_> = TOKEN_RE.find_iter(sentence).collect();
        matches
            .iter()
            .enumerate()
            .map(|(i, m)| {
                let gap_end = matches.get(i + 1).map_or(sentence.len(), |n| n.start());
                let ws: String = sentence[m.end()..gap_end].chars().filter(|c| c.is_whitespace()).collect();
                (m.as_str().to_string(), ws)
            })
            .collect()
    }

    fn guess_tag(word: &str, lower: &str, index: usize, prev: Option<PosTag>) -> PosTag {
        if word.chars().all(|c| c.is_ascii_punctuation()) {
            return PosTag::Punct;
        }
        if !word.chars().any(char::is_alphanumeric) {
            return PosTag::Sym;
        }
        if word.chars().all(|c| c.is_ascii_digit()) {
            return PosTag::Num;
        }
        let capitalized = word.chars().next().is_some_and(char::is_uppercase);
        let known = LEXICON.get(lower).copied();
        // mid-sentence capitals are names unless the word is closed-class ("I", "The")
        if capitalized && index > 0 && known.map_or(true, |t| !is_closed_class(t)) {
            return PosTag::Propn;
        }
        if let Some(tag) = known {
            // "like" after a pronoun or auxiliary is a verb, elsewhere a preposition
            if lower == "like" {
                return match prev {
                    Some(PosTag::Pron | PosTag::Aux | PosTag::Adv | PosTag::Part) => PosTag::Verb,
                    _ => PosTag::Adp,
                };
            }
            return tag;
        }
        if matches!(prev, Some(PosTag::Pron)) && index <= 2 {
            return PosTag::Verb;
        }
        if lower.ends_with("ly") {
            PosTag::Adv
        } else if lower.ends_with("ing") || lower.ends_with("ed") {
            PosTag::Verb
        } else if ["ous", "ful", "ive", "able", "ible", "less", "ic", "al"]
            .iter()
            .any(|s| lower.ends_with(s))
        {
            PosTag::Adj
        } else {
            PosTag::Noun
        }
    }

    fn entities(tokens: &[Token]) -> Vec<Entity> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < tokens.len() {
            if tokens[i].pos != PosTag::Propn {
                i += 1;
                continue;
            }
            let start = i;
            while i < tokens.len() && tokens[i].pos == PosTag::Propn {
                i += 1;
            }
            let cue = start.checked_sub(1).map(|p| tokens[p].lower.as_str());
            let label = match cue {
                Some(c) if PLACE_CUES.contains(&c) => EntityLabel::Place,
                Some(c) if NAME_CUES.contains(&c) => EntityLabel::Person,
                _ => EntityLabel::Other,
            };
            let text = tokens[start..i].iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" ");
            out.push(Entity { start, end: i, text, label });
        }
        out
    }
}

impl Analyzer for RuleAnalyzer {
    fn analyze(&self, text: &str) -> Analysis {
        let sentences = Self::split_sentences(text)
            .into_iter()
            .map(|raw| {
                let mut tokens: Vec<Token> = Vec::new();
                for (i, (word, ws)) in Self::tokenize(raw).into_iter().enumerate() {
                    let lower = word.to_lowercase();
                    let prev = tokens.last().map(|t| t.pos);
                    let tag = Self::guess_tag(&word, &lower, i, prev);
                    tokens.push(Token::new(word, tag, ws));
                }
                let entities = Self::entities(&tokens);
                Sentence { text: raw.to_string(), tokens, entities }
            })
            .collect();
        Analysis { text: text.to_string(), sentences }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(text: &str) -> Vec<&'static str> {
        RuleAnalyzer.analyze(text).tag_sequence().into_iter().map(PosTag::as_str).collect()
    }

    #[test]
    fn splits_sentences_on_terminator_runs() {
        let a = RuleAnalyzer.analyze("Wow!! Really? I know... ok");
        let texts: Vec<_> = a.sentences.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["Wow!!", "Really?", "I know...", "ok"]);
    }

    #[test]
    fn decimal_point_is_not_a_boundary() {
        let a = RuleAnalyzer.analyze("It costs 3.50 today.");
        assert_eq!(a.sentences.len(), 1);
    }

    #[test]
    fn keeps_spacing_and_punctuation() {
        let a = RuleAnalyzer.analyze("Hello there, how are you?");
        let s = &a.sentences[0];
        let rebuilt: String = s.tokens.iter().map(|t| format!("{}{}", t.text, t.whitespace)).collect();
        assert_eq!(rebuilt, "Hello there, how are you?");
        assert!(s.tokens[2].is_punct);
    }

    #[test]
    fn tags_simple_clause() {
        assert_eq!(tags("I like the cat"), vec!["PRON", "VERB", "DET", "NOUN"]);
        assert_eq!(tags("My name is Alice"), vec!["PRON", "NOUN", "AUX", "PROPN"]);
    }

    #[test]
    fn person_and_place_entities() {
        let a = RuleAnalyzer.analyze("My name is Alice and I live in New York");
        let ents = &a.sentences[0].entities;
        assert_eq!(ents.len(), 2);
        assert_eq!(ents[0].text, "Alice");
        assert_eq!(ents[0].label, EntityLabel::Person);
        assert_eq!(ents[1].text, "New York");
        assert_eq!(ents[1].label, EntityLabel::Place);
    }

    #[test]
    fn emoji_is_a_symbol() {
        let a = RuleAnalyzer.analyze("great 😊");
        let toks = &a.sentences[0].tokens;
        assert_eq!(toks[1].pos, PosTag::Sym);
        assert!(!toks[1].is_punct);
    }
}
