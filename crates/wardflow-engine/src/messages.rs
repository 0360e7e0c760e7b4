//! The message side of the simulation loop: consuming due messages and
//! handing them to the transport.

use tracing::{debug, error, info};
use wardflow_core::metrics::names;
use wardflow_core::{CoreError, Result};
use wardflow_state::{Event, OutboundMessage};

use crate::hospital::{Hospital, UNKNOWN};
use crate::processors::MessageProcessor;
use crate::render::RenderedMessage;

impl Hospital {
    /// Whether any messages are queued, due or not.
    pub fn has_messages(&self) -> bool {
        !self.messages.is_empty()
    }

    /// Consumes the next message from the queue and processes it. Unlike
    /// events, message failures propagate: an undeliverable message is a
    /// problem with the outside world, not with the pathway.
    pub(crate) fn process_next_message(&self) -> Result<()> {
        if !self.has_messages() {
            return Err(CoreError::EmptyQueue);
        }
        let message = match self.messages.get() {
            Ok(message) => message,
            Err(err) => {
                self.metrics.increment(
                    names::ERRORS_TOTAL,
                    &[("pathway_name", UNKNOWN), ("reason", "message_queue_get")],
                );
                return Err(err);
            }
        };
        self.process_message(message)
    }

    /// Sends the message through the transport, unless an override
    /// processor claims it. Pre and post processors run around either.
    fn process_message(&self, mut message: OutboundMessage) -> Result<()> {
        let pathway_name = message.pathway_name.clone();
        if let Err(err) =
            self.run_message_processors(&mut message, &self.processors.message_pre)
        {
            self.metrics.increment(
                names::ERRORS_TOTAL,
                &[
                    ("pathway_name", pathway_name.as_str()),
                    ("reason", "message_pre_processor"),
                ],
            );
            return Err(err);
        }

        let processed =
            match self.run_message_processors(&mut message, &self.processors.message_override) {
                Ok(processed) => processed,
                Err(err) => {
                    self.metrics.increment(
                        names::ERRORS_TOTAL,
                        &[
                            ("pathway_name", pathway_name.as_str()),
                            ("reason", "message_override_processor"),
                        ],
                    );
                    return Err(err);
                }
            };

        if !processed {
            info!(
                pathway_name = %pathway_name,
                message_name = %message.name,
                message_type = %message.message_type,
                trigger_event = %message.trigger_event,
                is_historical = message.is_historical,
                "sending message"
            );
            if let Err(err) = self.transport.send(message.body.as_bytes()) {
                error!(
                    pathway_name = %pathway_name,
                    message_name = %message.name,
                    error = %err,
                    "cannot send message"
                );
                self.metrics.increment(
                    names::ERRORS_TOTAL,
                    &[
                        ("pathway_name", pathway_name.as_str()),
                        ("reason", "send_message"),
                    ],
                );
                return Err(err);
            }
            let message_type = message.message_type.to_lowercase();
            self.metrics.increment(
                names::MESSAGES_TOTAL,
                &[
                    ("pathway_name", pathway_name.as_str()),
                    ("message_type", message_type.as_str()),
                    ("trigger_event", message.trigger_event.as_str()),
                ],
            );
            self.metrics.observe(
                names::MESSAGE_DELAY_SECONDS,
                &[],
                (self.clock.now() - message.message_time).as_seconds_f64(),
            );
        }

        if let Err(err) =
            self.run_message_processors(&mut message, &self.processors.message_post)
        {
            self.metrics.increment(
                names::ERRORS_TOTAL,
                &[
                    ("pathway_name", pathway_name.as_str()),
                    ("reason", "message_post_processor"),
                ],
            );
            return Err(err);
        }
        Ok(())
    }

    fn run_message_processors(
        &self,
        message: &mut OutboundMessage,
        processors: &[Box<dyn MessageProcessor>],
    ) -> Result<bool> {
        let mut processed = false;
        for processor in processors {
            if !processor.matches(message) {
                continue;
            }
            debug!(message_name = %message.name, "running custom message processor");
            processed = true;
            processor.process(message)?;
        }
        Ok(processed)
    }

    /// Queues a rendered message for delivery at the event's message time.
    pub(crate) fn queue_message(&self, rendered: RenderedMessage, event: &Event) {
        let name = OutboundMessage::compose_name(
            &rendered.message_type,
            &rendered.trigger_event,
            &event.patient_mrn,
        );
        info!(
            pathway_name = %event.pathway_name,
            message_name = %name,
            is_historical = event.is_historical,
            "queuing message"
        );
        self.messages.put(OutboundMessage {
            name,
            pathway_name: event.pathway_name.clone(),
            message_type: rendered.message_type,
            trigger_event: rendered.trigger_event,
            body: rendered.body,
            message_time: event.message_time,
            is_historical: event.is_historical,
        });
    }
}
