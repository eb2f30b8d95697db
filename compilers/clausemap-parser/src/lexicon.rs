use clausemap_protocol::PartOfSpeech;

/// Coarse word class used by the greedy parser before attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordClass {
    Determiner,
    Possessive,
    Pronoun,
    /// who, what, which, where, ...
    WhWord,
    Modal,
    Be,
    Have,
    Do,
    Negation,
    Preposition,
    /// "to" before a verb
    Infinitive,
    CoordConj,
    SubordConj,
    Adverb,
    Adjective,
    Numeral,
    Verb,
    /// Past participle or past tense form (-ed and the irregular list)
    Participle,
    Noun,
    Punct,
}

impl WordClass {
    pub fn pos(self) -> PartOfSpeech {
        match self {
            WordClass::Determiner | WordClass::Possessive => PartOfSpeech::Determiner,
            WordClass::Pronoun | WordClass::WhWord => PartOfSpeech::Pronoun,
            WordClass::Modal | WordClass::Be | WordClass::Have | WordClass::Do => PartOfSpeech::Auxiliary,
            WordClass::Negation | WordClass::Infinitive => PartOfSpeech::Particle,
            WordClass::Preposition => PartOfSpeech::Adposition,
            WordClass::CoordConj => PartOfSpeech::CoordConjunction,
            WordClass::SubordConj => PartOfSpeech::SubordConjunction,
            WordClass::Adverb => PartOfSpeech::Adverb,
            WordClass::Adjective => PartOfSpeech::Adjective,
            WordClass::Numeral => PartOfSpeech::Numeral,
            WordClass::Verb | WordClass::Participle => PartOfSpeech::Verb,
            WordClass::Noun => PartOfSpeech::Noun,
            WordClass::Punct => PartOfSpeech::Punctuation,
        }
    }

    pub fn is_auxiliary(self) -> bool {
        matches!(self, WordClass::Modal | WordClass::Be | WordClass::Have | WordClass::Do)
    }

    pub fn is_verbal(self) -> bool {
        matches!(self, WordClass::Verb | WordClass::Participle) || self.is_auxiliary()
    }

    /// Can appear inside a noun phrase chunk.
    pub fn is_nominal_part(self) -> bool {
        matches!(
            self,
            WordClass::Determiner
                | WordClass::Possessive
                | WordClass::Adjective
                | WordClass::Numeral
                | WordClass::Noun
                | WordClass::Pronoun
        )
    }
}

const DETERMINERS: &[&str] = &[
    "the", "a", "an", "this", "these", "those", "some", "any", "every", "each", "no", "another", "all",
];
const POSSESSIVES: &[&str] = &["my", "your", "his", "her", "its", "our", "their"];
const PRONOUNS: &[&str] = &[
    "i", "you", "he", "she", "it", "we", "they", "me", "him", "us", "them", "someone", "something",
    "everyone", "everything", "nobody", "nothing", "anyone", "anything", "one",
];
const WH_WORDS: &[&str] = &["who", "whom", "what", "which", "where", "when", "why", "how", "whose"];
const MODALS: &[&str] = &["can", "ca", "could", "will", "wo", "would", "shall", "should", "may", "might", "must"];
const BE: &[&str] = &["am", "is", "are", "was", "were", "be", "been", "being", "'s", "'re", "'m"];
const HAVE: &[&str] = &["have", "has", "had", "'ve"];
const DO: &[&str] = &["do", "does", "did"];
const NEGATIONS: &[&str] = &["not", "n't", "never"];
const PREPOSITIONS: &[&str] = &[
    "in", "on", "at", "by", "with", "from", "for", "of", "into", "onto", "about", "under", "over",
    "after", "before", "through", "during", "near", "behind", "across", "around", "without", "to",
];
const COORD: &[&str] = &["and", "or", "but"];
const SUBORD: &[&str] = &["because", "if", "although", "though", "while", "since", "unless", "whether"];
const ADVERBS: &[&str] = &[
    "very", "quite", "too", "also", "often", "always", "sometimes", "here", "there", "now", "then",
    "yesterday", "today", "tomorrow", "soon", "already", "still", "just", "again", "well", "fast",
    "hard", "away", "home", "up", "down", "out", "early", "late",
];
const ADJECTIVES: &[&str] = &[
    "tall", "short", "big", "small", "old", "new", "young", "good", "bad", "happy", "sad", "red",
    "blue", "green", "long", "little", "great", "beautiful", "tired", "hungry", "kind", "busy",
    "angry", "ready", "important", "difficult", "easy", "interesting", "cold", "hot",
];
const VERBS: &[&str] = &[
    "give", "gives", "make", "makes", "see", "sees", "take", "takes", "go", "goes", "come", "comes",
    "get", "gets", "tell", "tells", "know", "knows", "think", "thinks", "read", "reads", "write",
    "writes", "eat", "eats", "send", "sends", "buy", "buys", "find", "finds", "leave", "leaves",
    "show", "shows", "bring", "brings", "keep", "keeps", "call", "calls", "want", "wants", "like",
    "likes", "love", "loves", "live", "lives", "run", "runs", "open", "opens", "close", "closes",
    "say", "says", "become", "becomes", "seem", "seems", "teach", "teaches", "let", "lets", "put",
    "puts", "sing", "sings", "swim", "swims", "play", "plays", "work", "works", "visit", "visits",
    "help", "helps", "ask", "asks", "try", "tries", "need", "needs", "sleep", "sleeps", "drink", "drinks",
];
const PARTICIPLES: &[&str] = &[
    "gave", "given", "made", "saw", "seen", "took", "taken", "went", "gone", "came", "got", "gotten",
    "told", "knew", "known", "thought", "wrote", "written", "ate", "eaten", "sent", "bought", "found",
    "left", "shown", "brought", "kept", "said", "became", "taught", "sang", "sung", "swam", "ran",
    "slept", "drank", "drunk", "built", "broke", "broken", "chose", "chosen", "won", "lost", "met", "sold",
];

/// Closed-class lookup plus suffix rules. Open-class words that are not in
/// any list default to [`WordClass::Noun`]; the parser re-tags by position.
pub fn classify(word: &str) -> WordClass {
    let lower = word.to_lowercase();
    let w = lower.as_str();

    if !w.chars().any(|c| c.is_alphanumeric()) {
        return WordClass::Punct;
    }
    if w.chars().all(|c| c.is_ascii_digit()) {
        return WordClass::Numeral;
    }

    let lists: &[(&[&str], WordClass)] = &[
        (DETERMINERS, WordClass::Determiner),
        (POSSESSIVES, WordClass::Possessive),
        (PRONOUNS, WordClass::Pronoun),
        (WH_WORDS, WordClass::WhWord),
        (MODALS, WordClass::Modal),
        (BE, WordClass::Be),
        (HAVE, WordClass::Have),
        (DO, WordClass::Do),
        (NEGATIONS, WordClass::Negation),
        (PREPOSITIONS, WordClass::Preposition),
        (COORD, WordClass::CoordConj),
        (SUBORD, WordClass::SubordConj),
        (ADVERBS, WordClass::Adverb),
        (ADJECTIVES, WordClass::Adjective),
        (VERBS, WordClass::Verb),
        (PARTICIPLES, WordClass::Participle),
    ];

    if let Some((_, class)) = lists.iter().find(|(list, _)| list.contains(&w)) {
        return *class;
    }

    if w.len() > 3 && w.ends_with("ly") {
        return WordClass::Adverb;
    }
    if w.len() > 3 && w.ends_with("ed") {
        return WordClass::Participle;
    }
    if w.len() > 4 && (w.ends_with("ous") || w.ends_with("ful") || w.ends_with("ive") || w.ends_with("able")) {
        return WordClass::Adjective;
    }

    WordClass::Noun
}

/// "that" is a determiner by default; the parser reads it as a relative
/// pronoun after a noun.
pub fn is_relativizer(word: &str) -> bool {
    matches!(word.to_lowercase().as_str(), "who" | "whom" | "which" | "that")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_classes() {
        assert_eq!(classify("The"), WordClass::Determiner);
        assert_eq!(classify("could"), WordClass::Modal);
        assert_eq!(classify("n't"), WordClass::Negation);
        assert_eq!(classify("What"), WordClass::WhWord);
        assert_eq!(classify("."), WordClass::Punct);
    }

    #[test]
    fn test_suffix_rules() {
        assert_eq!(classify("quickly"), WordClass::Adverb);
        assert_eq!(classify("closed"), WordClass::Participle);
        assert_eq!(classify("famous"), WordClass::Adjective);
        assert_eq!(classify("door"), WordClass::Noun);
        assert_eq!(classify("42"), WordClass::Numeral);
    }
}
