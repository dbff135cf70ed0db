//! Verdicts and witnesses.
use std::fmt;

/// Three-valued answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Answer {
    True,
    False,
    #[default]
    Unknown,
}

impl Answer {
    pub fn is_true(self) -> bool {
        self == Answer::True
    }

    pub fn is_known(self) -> bool {
        self != Answer::Unknown
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Answer::True => write!(f, "Yes"),
            Answer::False => write!(f, "No"),
            Answer::Unknown => write!(f, "Maybe"),
        }
    }
}

/// What a witness certifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WitnessKind {
    Past,
    Ast,
    NotPast,
    NotAst,
}

impl fmt::Display for WitnessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WitnessKind::Past => write!(f, "PAST"),
            WitnessKind::Ast => write!(f, "AST"),
            WitnessKind::NotPast => write!(f, "Not PAST"),
            WitnessKind::NotAst => write!(f, "Not AST"),
        }
    }
}

/// Evidence for a verdict, meant for human inspection only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness {
    kind: WitnessKind,
    evidence: Vec<(String, String)>,
    explanation: String,
}

impl Witness {
    pub fn new(kind: WitnessKind, explanation: impl Into<String>) -> Self {
        Self {
            kind,
            evidence: Vec::new(),
            explanation: explanation.into(),
        }
    }

    /// Appends a labeled piece of evidence.
    pub fn with(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.evidence.push((key.to_string(), value.to_string()));
        self
    }

    pub fn kind(&self) -> WitnessKind {
        self.kind
    }

    pub fn evidence(&self) -> &[(String, String)] {
        &self.evidence
    }

    /// Looks up a piece of evidence by its label.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.evidence
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn explanation(&self) -> &str {
        &self.explanation
    }
}

impl fmt::Display for Witness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let headline = format!("Witness for {}", self.kind);
        writeln!(f, "{}", headline)?;
        writeln!(f, "{}", "-".repeat(headline.chars().count()))?;
        let width = self
            .evidence
            .iter()
            .map(|(k, _)| k.chars().count())
            .max()
            .unwrap_or(0)
            + 2;
        for (key, value) in &self.evidence {
            writeln!(f, "{:<width$} {}", key, value, width = width)?;
        }
        writeln!(f)?;
        writeln!(f, "Explanation:")?;
        write!(f, "{}", self.explanation)
    }
}

/// Outcome of the termination analysis.
///
/// Answers only ever move from [`Answer::Unknown`] to a known value; later attempts to change
/// a known answer are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminationResult {
    past: Answer,
    ast: Answer,
    witnesses: Vec<Witness>,
}

impl TerminationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn past(&self) -> Answer {
        self.past
    }

    pub fn ast(&self) -> Answer {
        self.ast
    }

    pub fn witnesses(&self) -> &[Witness] {
        &self.witnesses
    }

    pub fn all_known(&self) -> bool {
        self.past.is_known() && self.ast.is_known()
    }

    /// Sets PAST if it is still unknown. Returns `true` if the answer changed.
    pub fn set_past(&mut self, answer: Answer) -> bool {
        if self.past.is_known() {
            return false;
        }
        self.past = answer;
        answer.is_known()
    }

    /// Sets AST if it is still unknown. Returns `true` if the answer changed.
    pub fn set_ast(&mut self, answer: Answer) -> bool {
        if self.ast.is_known() {
            return false;
        }
        self.ast = answer;
        answer.is_known()
    }

    pub fn add_witness(&mut self, witness: Witness) {
        self.witnesses.push(witness);
    }
}

impl fmt::Display for TerminationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PAST: {}", self.past)?;
        writeln!(f, "AST: {}", self.ast)?;
        for witness in &self.witnesses {
            writeln!(f)?;
            writeln!(f)?;
            writeln!(f, "{}", witness)?;
        }
        Ok(())
    }
}
