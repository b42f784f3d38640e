//! PII detection and redaction (§4.G).
//!
//! The original uses Microsoft Presidio, an ML/NLP entity recognizer — out of scope here since
//! embedding/ML oracles are summarized collaborators, not reimplemented (§1). Regex-based
//! recognizers cover the same entity set (`original_source/.../pipeline/pii/pii.py`)
//! deterministically, which is the idiomatic Rust substitute rather than a partial port of an ML
//! pipeline.

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::AlertSeverity;
use crate::error::GatewayError;
use crate::pipeline::context::PipelineContext;
use crate::pipeline::steps::{InputStep, StepOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PiiEntity {
    EmailAddress,
    PhoneNumber,
    CreditCard,
    IbanCode,
    IpAddress,
    UsSsn,
}

impl PiiEntity {
    pub fn label(&self) -> &'static str {
        match self {
            PiiEntity::EmailAddress => "EMAIL_ADDRESS",
            PiiEntity::PhoneNumber => "PHONE_NUMBER",
            PiiEntity::CreditCard => "CREDIT_CARD",
            PiiEntity::IbanCode => "IBAN_CODE",
            PiiEntity::IpAddress => "IP_ADDRESS",
            PiiEntity::UsSsn => "US_SSN",
        }
    }
}

lazy_static! {
    static ref RECOGNIZERS: Vec<(PiiEntity, Regex)> = vec![
        (PiiEntity::EmailAddress, Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}").unwrap()),
        (PiiEntity::PhoneNumber, Regex::new(r"\+?\d{1,2}[\s.-]?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4}").unwrap()),
        (PiiEntity::CreditCard, Regex::new(r"\b(?:\d[ -]*?){13,16}\b").unwrap()),
        (PiiEntity::IbanCode, Regex::new(r"\b[A-Z]{2}\d{2}[A-Z0-9]{10,30}\b").unwrap()),
        (PiiEntity::IpAddress, Regex::new(r"\b(?:\d{1,3}\.){3}\d{1,3}\b").unwrap()),
        (PiiEntity::UsSsn, Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap()),
    ];
}

/// Detects and redacts the fixed PII entity set above, replacing each match with a stable
/// `#<uuid>#` placeholder.
pub struct PiiStep;

impl PiiStep {
    pub fn new() -> Self {
        Self
    }

    fn find_spans(text: &str) -> Vec<(usize, usize, &'static str)> {
        let mut spans: Vec<(usize, usize, &'static str)> = Vec::new();
        for (entity, regex) in RECOGNIZERS.iter() {
            for m in regex.find_iter(text) {
                spans.push((m.start(), m.end(), entity.label()));
            }
        }
        spans.sort_by_key(|(start, end, _)| (*start, *end));
        // Longer/earlier matches win on overlap (e.g. credit-card digits overlapping a phone
        // number); keep the first span seen at a given start and skip anything it subsumes.
        let mut deduped: Vec<(usize, usize, &'static str)> = Vec::new();
        for span in spans {
            if deduped.last().map(|last| span.0 < last.1).unwrap_or(false) {
                continue;
            }
            deduped.push(span);
        }
        deduped
    }
}

impl Default for PiiStep {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl InputStep for PiiStep {
    fn name(&self) -> &str {
        "pii-redaction"
    }

    async fn process(&self, context: &PipelineContext, text: &str) -> Result<StepOutcome, GatewayError> {
        let spans = Self::find_spans(text);
        if spans.is_empty() {
            return Ok(StepOutcome::Continue(text.to_string()));
        }

        let mut rewritten = text.to_string();
        for (start, end, label) in spans.into_iter().rev() {
            let matched = text[start..end].to_string();
            let placeholder = context.sensitive_data.redact_pii(matched.clone()).await;
            rewritten.replace_range(start..end, &placeholder);
            context.notify("pii", AlertSeverity::Info, Some(label.to_string()), None).await;
        }
        Ok(StepOutcome::Continue(rewritten))
    }
}
