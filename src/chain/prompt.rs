use thiserror::Error;

use super::memory::Turn;

pub const PERSONA_TEMPLATE: &str = " You are embodying the persona of the AUTHOR (the AUTHOR's name is \"Ž\") of the texts provided in the Context. Feel free to engage in a disquisition, but this disquisition should treat, explicitly, the topic and themes in the QUESTION. Your response should be in the style of the AUTHOR, mimic the way that he writes. Context: {context} Question: {question} Answer (as the AUTHOR): ";

pub const CONDENSE_QUESTION_TEMPLATE: &str = "Given the following conversation and a follow up question, rephrase the follow up question to be a standalone question, in its original language.\n\nChat History:\n{chat_history}\nFollow Up Input: {question}\nStandalone question:";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("template is missing input variable {{{0}}}")]
    MissingVariable(String),
}

/// A template with `{name}` placeholders, rendered in a single pass so
/// substituted values are never re-scanned for placeholders.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>, input_variables: &[&str]) -> Result<Self, PromptError> {
        let template = template.into();
        for name in input_variables {
            if !template.contains(&format!("{{{}}}", name)) {
                return Err(PromptError::MissingVariable(name.to_string()));
            }
        }
        Ok(Self { template })
    }

    pub fn persona() -> Result<Self, PromptError> {
        Self::new(PERSONA_TEMPLATE, &["context", "question"])
    }

    pub fn condense_question() -> Result<Self, PromptError> {
        Self::new(CONDENSE_QUESTION_TEMPLATE, &["chat_history", "question"])
    }

    /// Unknown placeholders are left as written.
    pub fn render(&self, vars: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.template.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let replacement = after.find('}').and_then(|end| {
                let name = &after[..end];
                vars.iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| (*value, end))
            });

            match replacement {
                Some((value, end)) => {
                    out.push_str(value);
                    rest = &after[end + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }
}

/// Renders history the way the condense prompt expects it.
pub fn format_history(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|turn| format!("Human: {}\nAssistant: {}", turn.question, turn.answer))
        .collect::<Vec<_>>()
        .join("\n")
}
