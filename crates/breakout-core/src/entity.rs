use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BreakoutError, Result};

/// Recorded in place of an extraction when the search returned no text.
pub const NO_DATA_FOUND: &str = "No data found";

/// Template used when a caller does not supply one.
pub const DEFAULT_PROMPT: &str = "Who is the ceo of {entity}?";

const ENTITY_PLACEHOLDER: &str = "entity";

/// Name of the subject being researched. Never blank.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityName(String);

impl EntityName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(BreakoutError::Entity("entity name must not be blank".into()));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for EntityName {
    type Error = BreakoutError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<EntityName> for String {
    fn from(name: EntityName) -> Self {
        name.0
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Entity,
}

/// User-authored text with an `{entity}` slot.
///
/// Brace handling follows the usual format-string rules: `{{` and `}}` are
/// literal braces, `{entity}` may appear more than once, and any other
/// placeholder or a stray brace is rejected when the template is parsed, so
/// rendering can never fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl PromptTemplate {
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        if c == '}' {
                            closed = true;
                            break;
                        }
                        name.push(c);
                    }
                    if !closed {
                        return Err(BreakoutError::Template(format!(
                            "unclosed '{{' at position {pos}"
                        )));
                    }
                    if name != ENTITY_PLACEHOLDER {
                        return Err(BreakoutError::Template(format!(
                            "unknown placeholder '{{{name}}}', only {{entity}} is supported"
                        )));
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Entity);
                }
                '}' => {
                    return Err(BreakoutError::Template(format!(
                        "single '}}' at position {pos}, use '}}}}' for a literal brace"
                    )));
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        if !segments.contains(&Segment::Entity) {
            return Err(BreakoutError::Template(
                "template must contain an {entity} placeholder".into(),
            ));
        }

        Ok(Self { source, segments })
    }

    /// Substitutes `entity` into every `{entity}` slot.
    pub fn render(&self, entity: &EntityName) -> String {
        let mut out = String::with_capacity(self.source.len() + entity.as_str().len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Entity => out.push_str(entity.as_str()),
            }
        }
        out
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_PROMPT.to_string(),
            segments: vec![
                Segment::Literal("Who is the ceo of ".into()),
                Segment::Entity,
                Segment::Literal("?".into()),
            ],
        }
    }
}

impl TryFrom<String> for PromptTemplate {
    type Error = BreakoutError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<PromptTemplate> for String {
    fn from(template: PromptTemplate) -> Self {
        template.source
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRecord {
    pub entity: EntityName,
    pub extracted: String,
}

impl ExtractionRecord {
    pub fn new(entity: EntityName, extracted: impl Into<String>) -> Self {
        Self {
            entity,
            extracted: extracted.into(),
        }
    }

    pub fn no_data(entity: EntityName) -> Self {
        Self::new(entity, NO_DATA_FOUND)
    }

    pub fn is_no_data(&self) -> bool {
        self.extracted == NO_DATA_FOUND
    }
}

/// Ordered records of one processing run, one per input entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultSet(Vec<ExtractionRecord>);

impl ResultSet {
    pub fn records(&self) -> &[ExtractionRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExtractionRecord> {
        self.0.iter()
    }

    pub fn into_records(self) -> Vec<ExtractionRecord> {
        self.0
    }
}

impl From<Vec<ExtractionRecord>> for ResultSet {
    fn from(records: Vec<ExtractionRecord>) -> Self {
        Self(records)
    }
}

impl FromIterator<ExtractionRecord> for ResultSet {
    fn from_iter<I: IntoIterator<Item = ExtractionRecord>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a ExtractionRecord;
    type IntoIter = std::slice::Iter<'a, ExtractionRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
