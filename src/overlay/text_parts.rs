use serde::{Deserialize, Serialize};

/// The four lines of text shown on the name card
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct TextParts {
    /// Name of the person, shown at the top of the card
    pub person_name: String,

    /// First descriptor line
    pub part_one: String,

    /// Second descriptor line, just above the bottom band
    pub part_two: String,

    /// Workplace name, shown in the bottom band after the "C H E Z" label
    pub work_place: String,
}

impl Default for TextParts {
    fn default() -> Self {
        Self {
            person_name: "MATHILDE".to_string(),
            part_one: "UX / UI".to_string(),
            part_two: "DESIGNER".to_string(),
            work_place: "FABERNOVEL".to_string(),
        }
    }
}

impl TextParts {
    pub fn new(
        person_name: impl Into<String>,
        part_one: impl Into<String>,
        part_two: impl Into<String>,
        work_place: impl Into<String>,
    ) -> Self {
        Self {
            person_name: person_name.into(),
            part_one: part_one.into(),
            part_two: part_two.into(),
            work_place: work_place.into(),
        }
    }
}
