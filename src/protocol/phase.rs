//! Call phase state machine
//!
//! ```text
//!              ┌──> Served    (GET on query, POST/DELETE on update)
//! Received ────┼──> Upgraded  (POST/DELETE on query)
//!              └──> Rejected  (anything else)
//! ```
//!
//! The update channel never produces `Upgraded`, so a resubmitted call
//! cannot loop.

use std::fmt;

use uuid::Uuid;

use crate::observability::{log_event_with_fields, Event};
use crate::router::{Channel, HttpRequest, HttpResponse, Method};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Received,
    Served,
    Upgraded,
    Rejected,
}

impl CallPhase {
    /// The phase a `Received` call moves to on `channel`.
    pub fn classify(channel: Channel, method: &Method) -> CallPhase {
        match (channel, method) {
            (Channel::Query, Method::Get) => CallPhase::Served,
            (Channel::Query, m) if m.is_mutating() => CallPhase::Upgraded,
            (Channel::Update, m) if m.is_mutating() => CallPhase::Served,
            _ => CallPhase::Rejected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallPhase::Received => "received",
            CallPhase::Served => "served",
            CallPhase::Upgraded => "upgraded",
            CallPhase::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, CallPhase::Received)
    }
}

impl fmt::Display for CallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inbound call on one channel
#[derive(Debug, Clone)]
pub struct Call {
    id: Uuid,
    channel: Channel,
    method: Method,
    url: String,
    phase: CallPhase,
    canister: Option<String>,
}

impl Call {
    pub fn receive(channel: Channel, req: &HttpRequest) -> Self {
        Call {
            id: Uuid::new_v4(),
            channel,
            method: req.method(),
            url: req.url.clone(),
            phase: CallPhase::Received,
            canister: None,
        }
    }

    /// Moves out of `Received`. Later calls return the settled phase.
    pub fn classify(&mut self) -> CallPhase {
        if self.phase == CallPhase::Received {
            self.phase = CallPhase::classify(self.channel, &self.method);
        }
        self.phase
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn phase(&self) -> CallPhase {
        self.phase
    }

    pub(crate) fn set_canister(&mut self, canister: Option<String>) {
        self.canister = canister;
    }

    /// Emits one record for the finished call.
    pub(crate) fn log(&self, event: Event, response: &HttpResponse, error: Option<&str>) {
        let call_id = self.id.to_string();
        let status = response.status_code.to_string();
        let mut fields: Vec<(&str, &str)> = vec![
            ("call_id", call_id.as_str()),
            ("channel", self.channel.label()),
            ("method", self.method.as_str()),
            ("phase", self.phase.as_str()),
            ("status", status.as_str()),
            ("url", self.url.as_str()),
        ];
        if let Some(canister) = &self.canister {
            fields.push(("canister", canister.as_str()));
        }
        if let Some(code) = error {
            fields.push(("error", code));
        }
        log_event_with_fields(event, &fields);
    }
}
