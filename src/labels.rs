use std::fmt;

/// Index of the largest score, first one winning on ties.
///
/// Returns `None` for an empty slice.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    scores
        .iter()
        .enumerate()
        .reduce(|best, candidate| if candidate.1 > best.1 { candidate } else { best })
        .map(|(index, _)| index)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn from_scores(scores: &[f32]) -> Option<Self> {
        Self::from_index(argmax(scores)?)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Age brackets of the pretrained age net. The eight output neurons map onto
/// these variants in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgeBracket {
    Age0To2,
    Age4To6,
    Age8To12,
    Age15To20,
    Age25To32,
    Age38To43,
    Age48To53,
    Age60To100,
}

impl AgeBracket {
    const ALL: [AgeBracket; 8] = [
        AgeBracket::Age0To2,
        AgeBracket::Age4To6,
        AgeBracket::Age8To12,
        AgeBracket::Age15To20,
        AgeBracket::Age25To32,
        AgeBracket::Age38To43,
        AgeBracket::Age48To53,
        AgeBracket::Age60To100,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn from_scores(scores: &[f32]) -> Option<Self> {
        Self::from_index(argmax(scores)?)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgeBracket::Age0To2 => "(0-2)",
            AgeBracket::Age4To6 => "(4-6)",
            AgeBracket::Age8To12 => "(8-12)",
            AgeBracket::Age15To20 => "(15-20)",
            AgeBracket::Age25To32 => "(25-32)",
            AgeBracket::Age38To43 => "(38-43)",
            AgeBracket::Age48To53 => "(48-53)",
            AgeBracket::Age60To100 => "(60-100)",
        }
    }
}

impl fmt::Display for AgeBracket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
