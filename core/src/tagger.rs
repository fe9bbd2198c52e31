use lazy_static::lazy_static;
use std::collections::HashSet;

/// Coarse grammatical category, only as fine as the keyword filter needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartOfSpeech {
    Determiner,
    Punctuation,
    Preposition,
    /// The infinitive marker "to"
    To,
    Pronoun,
    Adjective,
    Other,
}

impl PartOfSpeech {
    /// Categories that never become keywords.
    pub fn is_irrelevant(self) -> bool {
        !matches!(self, PartOfSpeech::Other)
    }
}

/// Assigns a category to every token; output is aligned with the input.
pub trait Tagger {
    fn tag(&self, tokens: &[String]) -> Vec<PartOfSpeech>;
}

lazy_static! {
    static ref DETERMINERS: HashSet<&'static str> = [
        "a", "an", "the", "this", "that", "these", "those", "each", "every", "either", "neither",
        "some", "any", "no", "all", "both", "another", "such", "what", "which", "whatever",
    ]
    .into_iter()
    .collect();
    static ref PREPOSITIONS: HashSet<&'static str> = [
        "about", "above", "across", "after", "against", "along", "among", "around", "as", "at",
        "before", "behind", "below", "beneath", "beside", "between", "beyond", "by", "despite",
        "down", "during", "except", "for", "from", "in", "inside", "into", "like", "near", "of",
        "off", "on", "onto", "out", "outside", "over", "past", "since", "through", "throughout",
        "toward", "towards", "under", "until", "unlike", "upon", "via", "with", "within",
        "without", "although", "because", "if", "than", "though", "unless", "whether", "while",
    ]
    .into_iter()
    .collect();
    static ref PRONOUNS: HashSet<&'static str> = [
        "i", "me", "you", "he", "him", "she", "her", "it", "we", "us", "they", "them", "myself",
        "yourself", "himself", "herself", "itself", "ourselves", "yourselves", "themselves",
        "one", "mine", "yours", "hers", "ours", "theirs",
    ]
    .into_iter()
    .collect();
    static ref ADJECTIVES: HashSet<&'static str> = [
        "good", "new", "first", "last", "long", "great", "little", "own", "other", "old", "right",
        "big", "high", "different", "small", "large", "next", "early", "young", "important",
        "few", "public", "bad", "same", "able", "best", "better", "sure", "free", "full", "easy",
        "hard", "real", "whole", "simple", "main", "many", "much", "more", "most", "several",
    ]
    .into_iter()
    .collect();
}

const ADJECTIVE_SUFFIXES: [&str; 6] = ["ous", "ful", "less", "ive", "able", "ible"];

/// Word-list tagger for English: closed-class words come from fixed lists,
/// open-class adjectives from a short lexicon plus a few unambiguous suffixes.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconTagger;

impl LexiconTagger {
    fn tag_one(token: &str) -> PartOfSpeech {
        if !token.chars().any(char::is_alphanumeric) {
            PartOfSpeech::Punctuation
        } else if token == "to" {
            PartOfSpeech::To
        } else if DETERMINERS.contains(token) {
            PartOfSpeech::Determiner
        } else if PREPOSITIONS.contains(token) {
            PartOfSpeech::Preposition
        } else if PRONOUNS.contains(token) {
            PartOfSpeech::Pronoun
        } else if ADJECTIVES.contains(token) || Self::has_adjective_suffix(token) {
            PartOfSpeech::Adjective
        } else {
            PartOfSpeech::Other
        }
    }

    fn has_adjective_suffix(token: &str) -> bool {
        token.chars().count() >= 6
            && token.chars().all(char::is_alphabetic)
            && ADJECTIVE_SUFFIXES.iter().any(|s| token.ends_with(s))
    }
}

impl Tagger for LexiconTagger {
    fn tag(&self, tokens: &[String]) -> Vec<PartOfSpeech> {
        tokens.iter().map(|t| Self::tag_one(t)).collect()
    }
}
