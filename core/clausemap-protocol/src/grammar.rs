use rkyv::{Archive, Deserialize, Serialize};

#[cfg(feature = "serde")]
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use bitflags::bitflags;

/// Universal part-of-speech tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Archive, Serialize, Deserialize)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[archive(check_bytes)]
#[repr(u8)]
pub enum PartOfSpeech {
    Noun = 0,
    ProperNoun = 1,
    Pronoun = 2,
    Verb = 3,
    Auxiliary = 4,
    Adjective = 5,
    Adverb = 6,
    Determiner = 7,
    Adposition = 8,
    CoordConjunction = 9,
    SubordConjunction = 10,
    Particle = 11,
    Numeral = 12,
    Punctuation = 13,
    Interjection = 14,
    Symbol = 15,
    Other = 16,
}

impl PartOfSpeech {
    /// Reads a UPOS tag (`NOUN`, `VERB`, ...). Unknown tags become [`PartOfSpeech::Other`].
    pub fn from_tag(tag: &str) -> Self {
        const TABLE: &[(&str, PartOfSpeech)] = &[
            ("NOUN", PartOfSpeech::Noun),
            ("PROPN", PartOfSpeech::ProperNoun),
            ("PRON", PartOfSpeech::Pronoun),
            ("VERB", PartOfSpeech::Verb),
            ("AUX", PartOfSpeech::Auxiliary),
            ("ADJ", PartOfSpeech::Adjective),
            ("ADV", PartOfSpeech::Adverb),
            ("DET", PartOfSpeech::Determiner),
            ("ADP", PartOfSpeech::Adposition),
            ("CCONJ", PartOfSpeech::CoordConjunction),
            ("CONJ", PartOfSpeech::CoordConjunction),
            ("SCONJ", PartOfSpeech::SubordConjunction),
            ("PART", PartOfSpeech::Particle),
            ("NUM", PartOfSpeech::Numeral),
            ("PUNCT", PartOfSpeech::Punctuation),
            ("INTJ", PartOfSpeech::Interjection),
            ("SYM", PartOfSpeech::Symbol),
        ];

        TABLE
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(tag))
            .map(|(_, pos)| *pos)
            .unwrap_or(PartOfSpeech::Other)
    }

    pub fn tag(self) -> &'static str {
        match self {
            PartOfSpeech::Noun => "NOUN",
            PartOfSpeech::ProperNoun => "PROPN",
            PartOfSpeech::Pronoun => "PRON",
            PartOfSpeech::Verb => "VERB",
            PartOfSpeech::Auxiliary => "AUX",
            PartOfSpeech::Adjective => "ADJ",
            PartOfSpeech::Adverb => "ADV",
            PartOfSpeech::Determiner => "DET",
            PartOfSpeech::Adposition => "ADP",
            PartOfSpeech::CoordConjunction => "CCONJ",
            PartOfSpeech::SubordConjunction => "SCONJ",
            PartOfSpeech::Particle => "PART",
            PartOfSpeech::Numeral => "NUM",
            PartOfSpeech::Punctuation => "PUNCT",
            PartOfSpeech::Interjection => "INTJ",
            PartOfSpeech::Symbol => "SYM",
            PartOfSpeech::Other => "X",
        }
    }

    pub fn is_verbal(self) -> bool {
        matches!(self, PartOfSpeech::Verb | PartOfSpeech::Auxiliary)
    }
}

/// Dependency relation labels (ClearNLP style, with UD aliases accepted on input).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Archive, Serialize, Deserialize)]
#[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
#[archive(check_bytes)]
#[repr(u8)]
pub enum DepRelation {
    Root = 0,
    Nsubj = 1,
    NsubjPass = 2,
    Csubj = 3,
    Dobj = 4,
    Iobj = 5,
    Dative = 6,
    Attr = 7,
    Acomp = 8,
    Oprd = 9,
    Ccomp = 10,
    Xcomp = 11,
    Advcl = 12,
    Advmod = 13,
    Npadvmod = 14,
    Amod = 15,
    Det = 16,
    Predet = 17,
    Poss = 18,
    Case = 19,
    Compound = 20,
    Nummod = 21,
    Nmod = 22,
    Prep = 23,
    Pobj = 24,
    Pcomp = 25,
    Agent = 26,
    Aux = 27,
    AuxPass = 28,
    Neg = 29,
    Prt = 30,
    Mark = 31,
    Relcl = 32,
    Acl = 33,
    Appos = 34,
    Conj = 35,
    Cc = 36,
    Expl = 37,
    Punct = 38,
    Dep = 39,
}

impl DepRelation {
    pub const ALL: [DepRelation; 40] = [
        DepRelation::Root,
        DepRelation::Nsubj,
        DepRelation::NsubjPass,
        DepRelation::Csubj,
        DepRelation::Dobj,
        DepRelation::Iobj,
        DepRelation::Dative,
        DepRelation::Attr,
        DepRelation::Acomp,
        DepRelation::Oprd,
        DepRelation::Ccomp,
        DepRelation::Xcomp,
        DepRelation::Advcl,
        DepRelation::Advmod,
        DepRelation::Npadvmod,
        DepRelation::Amod,
        DepRelation::Det,
        DepRelation::Predet,
        DepRelation::Poss,
        DepRelation::Case,
        DepRelation::Compound,
        DepRelation::Nummod,
        DepRelation::Nmod,
        DepRelation::Prep,
        DepRelation::Pobj,
        DepRelation::Pcomp,
        DepRelation::Agent,
        DepRelation::Aux,
        DepRelation::AuxPass,
        DepRelation::Neg,
        DepRelation::Prt,
        DepRelation::Mark,
        DepRelation::Relcl,
        DepRelation::Acl,
        DepRelation::Appos,
        DepRelation::Conj,
        DepRelation::Cc,
        DepRelation::Expl,
        DepRelation::Punct,
        DepRelation::Dep,
    ];

    pub fn label(self) -> &'static str {
        match self {
            DepRelation::Root => "root",
            DepRelation::Nsubj => "nsubj",
            DepRelation::NsubjPass => "nsubjpass",
            DepRelation::Csubj => "csubj",
            DepRelation::Dobj => "dobj",
            DepRelation::Iobj => "iobj",
            DepRelation::Dative => "dative",
            DepRelation::Attr => "attr",
            DepRelation::Acomp => "acomp",
            DepRelation::Oprd => "oprd",
            DepRelation::Ccomp => "ccomp",
            DepRelation::Xcomp => "xcomp",
            DepRelation::Advcl => "advcl",
            DepRelation::Advmod => "advmod",
            DepRelation::Npadvmod => "npadvmod",
            DepRelation::Amod => "amod",
            DepRelation::Det => "det",
            DepRelation::Predet => "predet",
            DepRelation::Poss => "poss",
            DepRelation::Case => "case",
            DepRelation::Compound => "compound",
            DepRelation::Nummod => "nummod",
            DepRelation::Nmod => "nmod",
            DepRelation::Prep => "prep",
            DepRelation::Pobj => "pobj",
            DepRelation::Pcomp => "pcomp",
            DepRelation::Agent => "agent",
            DepRelation::Aux => "aux",
            DepRelation::AuxPass => "auxpass",
            DepRelation::Neg => "neg",
            DepRelation::Prt => "prt",
            DepRelation::Mark => "mark",
            DepRelation::Relcl => "relcl",
            DepRelation::Acl => "acl",
            DepRelation::Appos => "appos",
            DepRelation::Conj => "conj",
            DepRelation::Cc => "cc",
            DepRelation::Expl => "expl",
            DepRelation::Punct => "punct",
            DepRelation::Dep => "dep",
        }
    }

    /// Reads a relation label. UD spellings are folded onto their ClearNLP
    /// counterparts; anything unknown becomes [`DepRelation::Dep`].
    pub fn from_label(label: &str) -> Self {
        let lowered = label.to_ascii_lowercase();
        let canonical = match lowered.as_str() {
            "obj" => "dobj",
            "obl" | "obl:tmod" | "obl:npmod" => "prep",
            "nsubj:pass" => "nsubjpass",
            "aux:pass" => "auxpass",
            "compound:prt" => "prt",
            "acl:relcl" => "relcl",
            "nmod:poss" => "poss",
            "det:predet" => "predet",
            "cop" => "aux",
            other => other,
        };

        DepRelation::ALL
            .iter()
            .copied()
            .find(|rel| rel.label() == canonical)
            .unwrap_or(DepRelation::Dep)
    }

    pub fn flag(self) -> RelationSet {
        RelationSet::from_bits_retain(1u64 << (self as u8))
    }

    /// Relations that attach a clause rather than a phrase.
    pub fn is_clausal(self) -> bool {
        matches!(
            self,
            DepRelation::Ccomp
                | DepRelation::Xcomp
                | DepRelation::Advcl
                | DepRelation::Relcl
                | DepRelation::Acl
                | DepRelation::Csubj
                | DepRelation::Pcomp
        )
    }
}

bitflags! {
    /// A set of dependency relations, one bit per [`DepRelation`] discriminant.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    #[cfg_attr(feature = "serde", derive(SerdeDeserialize, SerdeSerialize))]
    pub struct RelationSet: u64 {
        const ROOT = 1 << 0;
        const NSUBJ = 1 << 1;
        const NSUBJPASS = 1 << 2;
        const CSUBJ = 1 << 3;
        const DOBJ = 1 << 4;
        const IOBJ = 1 << 5;
        const DATIVE = 1 << 6;
        const ATTR = 1 << 7;
        const ACOMP = 1 << 8;
        const OPRD = 1 << 9;
        const CCOMP = 1 << 10;
        const XCOMP = 1 << 11;
        const ADVCL = 1 << 12;
        const ADVMOD = 1 << 13;
        const NPADVMOD = 1 << 14;
        const AMOD = 1 << 15;
        const DET = 1 << 16;
        const PREDET = 1 << 17;
        const POSS = 1 << 18;
        const CASE = 1 << 19;
        const COMPOUND = 1 << 20;
        const NUMMOD = 1 << 21;
        const NMOD = 1 << 22;
        const PREP = 1 << 23;
        const POBJ = 1 << 24;
        const PCOMP = 1 << 25;
        const AGENT = 1 << 26;
        const AUX = 1 << 27;
        const AUXPASS = 1 << 28;
        const NEG = 1 << 29;
        const PRT = 1 << 30;
        const MARK = 1 << 31;
        const RELCL = 1 << 32;
        const ACL = 1 << 33;
        const APPOS = 1 << 34;
        const CONJ = 1 << 35;
        const CC = 1 << 36;
        const EXPL = 1 << 37;
        const PUNCT = 1 << 38;
        const DEP = 1 << 39;
    }
}

impl RelationSet {
    pub fn has(&self, relation: DepRelation) -> bool {
        self.contains(relation.flag())
    }

    pub fn from_relations<I: IntoIterator<Item = DepRelation>>(relations: I) -> Self {
        relations
            .into_iter()
            .fold(RelationSet::empty(), |set, rel| set | rel.flag())
    }

    pub fn relations(&self) -> impl Iterator<Item = DepRelation> + '_ {
        DepRelation::ALL.iter().copied().filter(move |rel| self.has(*rel))
    }
}
