//! The shipped message formats: a plain pipe-delimited line renderer and a
//! canned-message source fed from configuration.
//!
//! A rendered line looks like
//! `ADT^A01|20240301120000|wardflow|MRN0001|John Smith|Bed 1, Ward 1` with
//! step-specific detail appended as further segments. Downstream demo
//! consumers split on `|`; none of the rendered fields may contain one.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use regex::Regex;
use time::OffsetDateTime;
use wardflow_core::ir::Person;
use wardflow_core::{CoreError, Result};
use wardflow_engine::{
    HardcodedMessages, MessageRenderer, RenderExtra, RenderRequest, RenderedMessage,
};

use crate::config::CannedMessageConfig;

const DEFAULT_SENDING_APPLICATION: &str = "wardflow";

/// `YYYYMMDDHHMMSS`, the timestamp form used on the wire.
fn wire_timestamp(t: OffsetDateTime) -> String {
    format!(
        "{:04}{:02}{:02}{:02}{:02}{:02}",
        t.year(),
        u8::from(t.month()),
        t.day(),
        t.hour(),
        t.minute(),
        t.second()
    )
}

/// Renders each message as one pipe-delimited text line.
#[derive(Debug, Default)]
pub struct PlainRenderer;

impl MessageRenderer for PlainRenderer {
    fn render(&self, request: &RenderRequest<'_>) -> Result<String> {
        let sender = request
            .parameters
            .map(|p| p.sending_application.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_SENDING_APPLICATION);
        let patient = request.patient;
        let location = patient
            .location
            .as_ref()
            .map(|loc| loc.name())
            .unwrap_or_default();

        let mut segments = vec![
            format!("{}^{}", request.message_type, request.trigger_event),
            wire_timestamp(request.event_time),
            sender.to_string(),
            patient.person.mrn.clone(),
            patient.person.full_name(),
            location,
        ];
        match request.extra {
            RenderExtra::None => {}
            RenderExtra::Order(order) => {
                let id = if order.placer.is_empty() {
                    &order.filler
                } else {
                    &order.placer
                };
                segments.push(format!("order {} {}", id, order.order_status).trim().into());
            }
            RenderExtra::Document(document) => {
                segments.push(
                    format!(
                        "document {} {}",
                        document.unique_document_number, document.completion_status
                    )
                    .trim()
                    .into(),
                );
            }
            RenderExtra::MergeChildren(children) => {
                segments.push(format!("merged {}", children.join(",")));
            }
            RenderExtra::SwapPartner(partner) => {
                segments.push(format!("swapped-with {}", partner.person.mrn));
            }
        }
        Ok(segments.join("|"))
    }
}

struct NamedMessage {
    name: String,
    message_type: String,
    trigger_event: String,
    body: String,
}

/// Canned messages from configuration, selected by name pattern.
pub struct CannedMessages {
    messages: Vec<NamedMessage>,
}

impl CannedMessages {
    pub fn new(configs: HashMap<String, CannedMessageConfig>) -> Self {
        let mut messages: Vec<NamedMessage> = configs
            .into_iter()
            .map(|(name, config)| NamedMessage {
                name,
                message_type: config.message_type,
                trigger_event: config.trigger_event,
                body: config.body,
            })
            .collect();
        messages.sort_by(|a, b| a.name.cmp(&b.name));
        Self { messages }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl HardcodedMessages for CannedMessages {
    /// Picks one message whose name matches `pattern`, uniformly at random,
    /// and fills in the patient and time placeholders.
    fn message(
        &self,
        pattern: &str,
        person: &Person,
        now: OffsetDateTime,
    ) -> Result<RenderedMessage> {
        let re = Regex::new(pattern).map_err(|e| {
            CoreError::configuration(format!("invalid hardcoded message pattern {pattern:?}: {e}"))
        })?;
        let matching: Vec<&NamedMessage> = self
            .messages
            .iter()
            .filter(|m| re.is_match(&m.name))
            .collect();
        let picked = matching.choose(&mut rand::thread_rng()).ok_or_else(|| {
            CoreError::configuration(format!("no hardcoded message matches pattern {pattern:?}"))
        })?;
        let body = picked
            .body
            .replace("%MRN%", &person.mrn)
            .replace("%FIRST_NAME%", &person.first_name)
            .replace("%SURNAME%", &person.surname)
            .replace("%NOW%", &wire_timestamp(now));
        Ok(RenderedMessage {
            message_type: picked.message_type.clone(),
            trigger_event: picked.trigger_event.clone(),
            body,
        })
    }
}
