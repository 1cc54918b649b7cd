pub mod conllu;
pub mod features;
pub mod text_cleanup;

use parse_display::{Display, FromStr};

pub use crate::features::Features;

/// Universal part-of-speech tag (UPOS)
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    FromStr,
    serde::Serialize,
    serde::Deserialize,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
)]
#[display(style = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum PartOfSpeech {
    Adj,   // adjective
    Adp,   // adposition
    Adv,   // adverb
    Aux,   // auxiliary
    Cconj, // coordinating conjunction
    Det,   // determiner
    Intj,  // interjection
    Noun,  // noun
    Num,   // numeral
    Part,  // particle
    Pron,  // pronoun
    Propn, // proper noun
    Punct, // punctuation
    Sconj, // subordinating conjunction
    Sym,   // symbol
    Verb,  // verb
    Space, // space
    X,     // other
}

/// Dependency relation types (Universal Dependencies, with the English subtypes)
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    FromStr,
    serde::Serialize,
    serde::Deserialize,
    Hash,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
)]
#[serde(from = "String")]
pub enum DependencyRelation {
    #[display("acl")]
    #[serde(rename = "acl")]
    Acl,
    #[display("acl:relcl")]
    #[serde(rename = "acl:relcl")]
    AclRelcl,
    #[display("advcl")]
    #[serde(rename = "advcl")]
    Advcl,
    #[display("advmod")]
    #[serde(rename = "advmod")]
    Advmod,
    #[display("amod")]
    #[serde(rename = "amod")]
    Amod,
    #[display("appos")]
    #[serde(rename = "appos")]
    Appos,
    #[display("aux")]
    #[serde(rename = "aux")]
    Aux,
    #[display("aux:pass")]
    #[serde(rename = "aux:pass")]
    AuxPass,
    #[display("case")]
    #[serde(rename = "case")]
    Case,
    #[display("cc")]
    #[serde(rename = "cc")]
    Cc,
    #[display("cc:preconj")]
    #[serde(rename = "cc:preconj")]
    CcPreconj,
    #[display("ccomp")]
    #[serde(rename = "ccomp")]
    Ccomp,
    #[display("compound")]
    #[serde(rename = "compound")]
    Compound,
    #[display("compound:prt")]
    #[serde(rename = "compound:prt")]
    CompoundPrt,
    #[display("conj")]
    #[serde(rename = "conj")]
    Conj,
    #[display("cop")]
    #[serde(rename = "cop")]
    Cop,
    #[display("csubj")]
    #[serde(rename = "csubj")]
    Csubj,
    #[display("csubj:pass")]
    #[serde(rename = "csubj:pass")]
    CsubjPass,
    #[display("dep")]
    #[serde(rename = "dep")]
    Dep,
    #[display("det")]
    #[serde(rename = "det")]
    Det,
    #[display("det:poss")]
    #[serde(rename = "det:poss")]
    DetPoss,
    #[display("det:predet")]
    #[serde(rename = "det:predet")]
    DetPredet,
    #[display("discourse")]
    #[serde(rename = "discourse")]
    Discourse,
    #[display("dislocated")]
    #[serde(rename = "dislocated")]
    Dislocated,
    #[display("expl")]
    #[serde(rename = "expl")]
    Expl,
    #[display("fixed")]
    #[serde(rename = "fixed")]
    Fixed,
    #[display("flat")]
    #[serde(rename = "flat")]
    Flat,
    #[display("goeswith")]
    #[serde(rename = "goeswith")]
    Goeswith,
    #[display("iobj")]
    #[serde(rename = "iobj")]
    Iobj,
    #[display("list")]
    #[serde(rename = "list")]
    List,
    #[display("mark")]
    #[serde(rename = "mark")]
    Mark,
    #[display("nmod")]
    #[serde(rename = "nmod")]
    Nmod,
    #[display("nmod:npmod")]
    #[serde(rename = "nmod:npmod")]
    NmodNpmod,
    #[display("nmod:poss")]
    #[serde(rename = "nmod:poss")]
    NmodPoss,
    #[display("nmod:tmod")]
    #[serde(rename = "nmod:tmod")]
    NmodTmod,
    #[display("nsubj")]
    #[serde(rename = "nsubj")]
    Nsubj,
    #[display("nsubj:pass")]
    #[serde(rename = "nsubj:pass")]
    NsubjPass,
    #[display("nummod")]
    #[serde(rename = "nummod")]
    Nummod,
    #[display("obj")]
    #[serde(rename = "obj")]
    Obj,
    #[display("obl")]
    #[serde(rename = "obl")]
    Obl,
    #[display("obl:npmod")]
    #[serde(rename = "obl:npmod")]
    OblNpmod,
    #[display("obl:tmod")]
    #[serde(rename = "obl:tmod")]
    OblTmod,
    #[display("orphan")]
    #[serde(rename = "orphan")]
    Orphan,
    #[display("parataxis")]
    #[serde(rename = "parataxis")]
    Parataxis,
    #[display("punct")]
    #[serde(rename = "punct")]
    Punct,
    #[display("reparandum")]
    #[serde(rename = "reparandum")]
    Reparandum,
    #[display("root")]
    #[serde(rename = "root")]
    Root,
    #[display("vocative")]
    #[serde(rename = "vocative")]
    Vocative,
    #[display("xcomp")]
    #[serde(rename = "xcomp")]
    Xcomp,
}

impl DependencyRelation {
    /// Parse a relation label, falling back to `dep` for labels outside the known set
    pub fn parse_lenient(label: &str) -> Self {
        match label.parse() {
            Ok(relation) => relation,
            Err(_) => {
                log::warn!("Unknown dependency relation '{label}', treating it as 'dep'");
                DependencyRelation::Dep
            }
        }
    }

    pub fn is_subject(self) -> bool {
        self == DependencyRelation::Nsubj
    }

    pub fn is_passive_marker(self) -> bool {
        matches!(
            self,
            DependencyRelation::NsubjPass | DependencyRelation::AuxPass
        )
    }
}

impl From<String> for DependencyRelation {
    fn from(label: String) -> Self {
        Self::parse_lenient(&label)
    }
}

/// Sentinel head value for the sentence root
pub const ROOT_HEAD: usize = 0;

/// A single word of a dependency-parsed sentence
///
/// Every attribute is mandatory: an annotator that has nothing to say about
/// the fine tag leaves `xpos` empty, and an empty feature set stands in for
/// a missing feature string.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize, Eq, PartialEq)]
pub struct ParsedToken {
    /// 1-based position within the sentence
    pub id: usize,
    pub text: String,
    pub lemma: String,
    #[serde(rename = "upos")]
    pub pos: PartOfSpeech,
    #[serde(default)]
    pub xpos: String,
    #[serde(default)]
    pub feats: Features,
    pub head: usize,
    pub deprel: DependencyRelation,
}

impl ParsedToken {
    pub fn is_root(&self) -> bool {
        self.head == ROOT_HEAD
    }

    pub fn text_lower(&self) -> String {
        self.text.to_lowercase()
    }

    pub fn lemma_lower(&self) -> String {
        self.lemma.to_lowercase()
    }

    pub fn ends_with_ing(&self) -> bool {
        self.text_lower().ends_with("ing")
    }

    /// Fine tag `VBG` or a participle verb form in the features
    pub fn is_present_participle(&self) -> bool {
        self.xpos == "VBG" || self.feats.is_participle()
    }

    pub fn is_verb_or_aux(&self) -> bool {
        matches!(self.pos, PartOfSpeech::Verb | PartOfSpeech::Aux)
    }
}

/// One sentence as returned by an annotator
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize, Eq, PartialEq)]
pub struct ParsedSentence {
    #[serde(default)]
    pub text: String,
    pub tokens: Vec<ParsedToken>,
}

impl ParsedSentence {
    pub fn root(&self) -> Option<&ParsedToken> {
        self.tokens.iter().find(|token| token.is_root())
    }

    pub fn first_with_relation(&self, relation: DependencyRelation) -> Option<&ParsedToken> {
        self.tokens.iter().find(|token| token.deprel == relation)
    }

    pub fn has_relation(&self, relation: DependencyRelation) -> bool {
        self.first_with_relation(relation).is_some()
    }

    pub fn children_of(&self, id: usize) -> impl Iterator<Item = &ParsedToken> {
        self.tokens.iter().filter(move |token| token.head == id)
    }
}
