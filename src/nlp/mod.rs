//! Seam to the NLP front end: tokens, coarse POS tags, sentences, entities.
//!
//! The engine only consumes [`Analysis`] values. Hosts plug in their own
//! tagger through [`Analyzer`]; [`RuleAnalyzer`] is the bundled default.

mod rules;

pub use rules::RuleAnalyzer;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

/// Anything that can split text into tagged sentences.
pub trait Analyzer: Send + Sync {
    fn analyze(&self, text: &str) -> Analysis;
}

/// Universal coarse part-of-speech tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PosTag {
    Noun,
    Verb,
    Adj,
    Adv,
    Propn,
    Pron,
    Det,
    Adp,
    Aux,
    Cconj,
    Sconj,
    Part,
    Intj,
    Num,
    Punct,
    Sym,
    Space,
    X,
}

impl PosTag {
    /// Tags that get replaced by `{TAG}` placeholders in phrase templates.
    pub const CONTENT: [PosTag; 5] = [PosTag::Noun, PosTag::Verb, PosTag::Adj, PosTag::Adv, PosTag::Propn];

    pub fn as_str(self) -> &'static str {
        match self {
            PosTag::Noun => "NOUN",
            PosTag::Verb => "VERB",
            PosTag::Adj => "ADJ",
            PosTag::Adv => "ADV",
            PosTag::Propn => "PROPN",
            PosTag::Pron => "PRON",
            PosTag::Det => "DET",
            PosTag::Adp => "ADP",
            PosTag::Aux => "AUX",
            PosTag::Cconj => "CCONJ",
            PosTag::Sconj => "SCONJ",
            PosTag::Part => "PART",
            PosTag::Intj => "INTJ",
            PosTag::Num => "NUM",
            PosTag::Punct => "PUNCT",
            PosTag::Sym => "SYM",
            PosTag::Space => "SPACE",
            PosTag::X => "X",
        }
    }

    pub fn parse(s: &str) -> Option<PosTag> {
        let tag = match s {
            "NOUN" => PosTag::Noun,
            "VERB" => PosTag::Verb,
            "ADJ" => PosTag::Adj,
            "ADV" => PosTag::Adv,
            "PROPN" => PosTag::Propn,
            "PRON" => PosTag::Pron,
            "DET" => PosTag::Det,
            "ADP" => PosTag::Adp,
            "AUX" => PosTag::Aux,
            "CCONJ" => PosTag::Cconj,
            "SCONJ" => PosTag::Sconj,
            "PART" => PosTag::Part,
            "INTJ" => PosTag::Intj,
            "NUM" => PosTag::Num,
            "PUNCT" => PosTag::Punct,
            "SYM" => PosTag::Sym,
            "SPACE" => PosTag::Space,
            "X" => PosTag::X,
            _ => return None,
        };
        Some(tag)
    }

    pub fn is_content(self) -> bool {
        Self::CONTENT.contains(&self)
    }

    /// `{NOUN}` etc.
    pub fn placeholder(self) -> String {
        format!("{{{}}}", self.as_str())
    }
}

impl fmt::Display for PosTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub text: String,
    pub lower: String,
    /// Whitespace that followed the token in the source text.
    pub whitespace: String,
    pub pos: PosTag,
    pub lemma: String,
    pub is_stop: bool,
    pub is_punct: bool,
    pub is_space: bool,
}

impl Token {
    /// Build a token with flags derived from the text and tag.
    pub fn new(text: impl Into<String>, pos: PosTag, whitespace: impl Into<String>) -> Self {
        let text = text.into();
        let lower = text.to_lowercase();
        Self {
            is_stop: is_stopword(&lower),
            is_punct: pos == PosTag::Punct,
            is_space: pos == PosTag::Space,
            lemma: lower.clone(),
            lower,
            whitespace: whitespace.into(),
            pos,
            text,
        }
    }

    /// Content tokens become template placeholders.
    pub fn is_content(&self) -> bool {
        self.pos.is_content() && !self.is_stop
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityLabel {
    Person,
    Place,
    Other,
}

/// Named entity over the token range `start..end` of its sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub label: EntityLabel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sentence {
    pub text: String,
    pub tokens: Vec<Token>,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl Sentence {
    /// Hand-tagged sentence: tokens joined by single spaces, no space before punctuation.
    pub fn tagged(pairs: &[(&str, PosTag)]) -> Self {
        let mut tokens = Vec::with_capacity(pairs.len());
        for (i, (text, pos)) in pairs.iter().enumerate() {
            let next_is_punct = pairs.get(i + 1).is_some_and(|(_, p)| *p == PosTag::Punct);
            let ws = if i + 1 == pairs.len() || next_is_punct { "" } else { " " };
            tokens.push(Token::new(*text, *pos, ws));
        }
        let text = tokens.iter().map(|t| format!("{}{}", t.text, t.whitespace)).collect();
        Self { text, tokens, entities: Vec::new() }
    }

    /// Tokens that are neither whitespace nor punctuation.
    pub fn words(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| !t.is_punct && !t.is_space)
    }

    /// POS tags of every non-space token.
    pub fn tag_sequence(&self) -> Vec<PosTag> {
        self.tokens.iter().filter(|t| !t.is_space).map(|t| t.pos).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub text: String,
    pub sentences: Vec<Sentence>,
}

impl Analysis {
    pub fn from_sentences(sentences: Vec<Sentence>) -> Self {
        let text = sentences.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join(" ");
        Self { text, sentences }
    }

    pub fn tag_sequence(&self) -> Vec<PosTag> {
        self.sentences.iter().flat_map(|s| s.tag_sequence()).collect()
    }
}

static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "a", "about", "above", "after", "again", "against", "all", "also", "am", "an", "and",
        "any", "are", "as", "at", "be", "because", "been", "before", "being", "below",
        "between", "both", "but", "by", "can", "could", "did", "do", "does", "doing", "done",
        "down", "during", "each", "either", "else", "even", "ever", "every", "few", "for",
        "from", "further", "get", "go", "had", "has", "have", "having", "he", "her", "here",
        "hers", "herself", "him", "himself", "his", "how", "however", "i", "if", "in", "into",
        "is", "it", "its", "itself", "just", "least", "less", "made", "make", "many", "may",
        "me", "might", "more", "most", "much", "must", "my", "myself", "name", "neither",
        "never", "no", "nor", "not", "nothing", "now", "of", "off", "often", "on", "once",
        "one", "only", "or", "other", "our", "ours", "ourselves", "out", "over", "own", "quite",
        "rather", "really", "same", "say", "see", "seem", "she", "should", "so", "some",
        "still", "such", "than", "that", "the", "their", "theirs", "them", "themselves",
        "then", "there", "these", "they", "this", "those", "though", "through", "to", "too",
        "under", "until", "up", "upon", "us", "used", "very", "was", "we", "well", "were",
        "what", "whatever", "when", "where", "whether", "which", "while", "who", "whom",
        "whose", "why", "will", "with", "within", "without", "would", "yet", "you", "your",
        "yours", "yourself", "yourselves", "'s", "n't", "'m", "'re", "'ve", "'ll", "'d",
    ]
    .into_iter()
    .collect()
});

pub fn is_stopword(lower: &str) -> bool {
    STOPWORDS.contains(lower)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_spacing() {
        let s = Sentence::tagged(&[
            ("I", PosTag::Pron),
            ("like", PosTag::Verb),
            ("cats", PosTag::Noun),
            ("!", PosTag::Punct),
        ]);
        assert_eq!(s.text, "I like cats!");
        assert!(s.tokens[0].is_stop);
        assert!(s.tokens[3].is_punct);
        assert_eq!(s.words().count(), 3);
        assert_eq!(s.tag_sequence().len(), 4);
    }

    #[test]
    fn tag_round_trip() {
        for tag in PosTag::CONTENT {
            assert_eq!(PosTag::parse(tag.as_str()), Some(tag));
        }
        assert_eq!(PosTag::parse("nope"), None);
        assert_eq!(PosTag::Verb.placeholder(), "{VERB}");
    }
}
