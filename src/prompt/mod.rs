//! Chat messages and the two-message prompt templates used by both flows.
//!
//! A [`PromptTemplate`] holds a system template and a human template with
//! `{name}` placeholders. Templates are parsed once at construction and never
//! change afterwards; formatting is a single pass, so variable values are
//! inserted verbatim even if they contain braces.

#[cfg(test)]
mod tests;

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use fancy_regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{RagError, Result};

pub const CHAT_SYSTEM_TEMPLATE: &str = "You are a helpful chatbot. Respond in {language}.";

pub const RAG_SYSTEM_TEMPLATE: &str = "You are a helpful assistant. Answer using the provided context. \
Summarize in at least 250 words.\n\nContext:\n{context}";

pub const HUMAN_TEMPLATE: &str = "{user_text}";

// `{{` and `}}` are escapes, anything else in braces must be an identifier.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[inline]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[inline]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[inline]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[inline]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Variable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct MessageTemplate {
    role: Role,
    segments: Vec<Segment>,
}

impl MessageTemplate {
    fn parse(role: Role, template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut last_end = 0;

        for captures in PLACEHOLDER.captures_iter(template) {
            let captures =
                captures.map_err(|e| RagError::Other(anyhow::anyhow!("Invalid template: {e}")))?;
            let Some(whole) = captures.get(0) else {
                continue;
            };

            literal.push_str(template.get(last_end..whole.start()).unwrap_or_default());
            last_end = whole.end();

            match (whole.as_str(), captures.get(1)) {
                ("{{", _) => literal.push('{'),
                ("}}", _) => literal.push('}'),
                (_, Some(name)) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Variable(name.as_str().to_string()));
                }
                _ => literal.push_str(whole.as_str()),
            }
        }

        literal.push_str(template.get(last_end..).unwrap_or_default());
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { role, segments })
    }

    fn render(&self, variables: &HashMap<&str, &str>) -> Result<Message> {
        let mut content = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => content.push_str(text),
                Segment::Variable(name) => {
                    let value = variables
                        .get(name.as_str())
                        .ok_or_else(|| RagError::MissingVariable(name.clone()))?;
                    content.push_str(value);
                }
            }
        }
        Ok(Message::new(self.role, content))
    }

    fn variables(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Variable(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }
}

/// An immutable (system, human) prompt template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    system: MessageTemplate,
    human: MessageTemplate,
}

impl PromptTemplate {
    #[inline]
    pub fn new(system: &str, human: &str) -> Result<Self> {
        Ok(Self {
            system: MessageTemplate::parse(Role::System, system)?,
            human: MessageTemplate::parse(Role::User, human)?,
        })
    }

    /// Template for the plain chat flow: `language` and `user_text`
    #[inline]
    pub fn chat() -> Self {
        Self::new(CHAT_SYSTEM_TEMPLATE, HUMAN_TEMPLATE).expect("chat template is valid")
    }

    /// Template for the retrieval flow: `context` and `user_text`
    #[inline]
    pub fn rag() -> Self {
        Self::new(RAG_SYSTEM_TEMPLATE, HUMAN_TEMPLATE).expect("rag template is valid")
    }

    /// Names of every placeholder the template needs, sorted
    #[inline]
    pub fn input_variables(&self) -> BTreeSet<&str> {
        self.system.variables().chain(self.human.variables()).collect()
    }

    /// Render both messages; extra variables are ignored
    #[inline]
    pub fn format_messages(&self, variables: &[(&str, &str)]) -> Result<Vec<Message>> {
        let variables: HashMap<&str, &str> = variables.iter().copied().collect();
        Ok(vec![
            self.system.render(&variables)?,
            self.human.render(&variables)?,
        ])
    }
}
