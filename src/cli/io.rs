//! JSON I/O handling for CLI
//!
//! - Input: single JSON object via stdin
//! - Output: single JSON object via stdout
//! - UTF-8 only

use std::collections::BTreeMap;
use std::io::{self, Read, Write};

use serde::Deserialize;
use serde_json::{json, Value};

use crate::router::{HttpRequest, HttpResponse};

use super::errors::{CliError, CliResult};

/// One request as accepted by `docregistry call`
#[derive(Debug, Deserialize)]
struct CallInput {
    method: String,
    url: String,
    /// A string is sent verbatim, any other JSON value is serialized
    #[serde(default)]
    body: Option<Value>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
}

/// Read the whole of stdin as one JSON request
pub fn read_request() -> CliResult<HttpRequest> {
    let mut input = String::new();
    io::stdin().lock().read_to_string(&mut input)?;
    parse_call_request(&input)
}

/// Parses `{"method", "url", "body"?, "headers"?}`
pub fn parse_call_request(input: &str) -> CliResult<HttpRequest> {
    if input.trim().is_empty() {
        return Err(CliError::io_error("Empty input"));
    }

    let call: CallInput = serde_json::from_str(input)?;
    let body = match call.body {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(text)) => text.into_bytes(),
        Some(other) => other.to_string().into_bytes(),
    };

    Ok(HttpRequest {
        method: call.method,
        url: call.url,
        headers: call.headers.into_iter().collect(),
        body,
    })
}

/// JSON rendering of an envelope. The body is inlined when it is JSON.
pub fn render_response(response: &HttpResponse) -> Value {
    let body = if response.body.is_empty() {
        Value::Null
    } else {
        response
            .body_json()
            .unwrap_or_else(|| Value::String(String::from_utf8_lossy(&response.body).into_owned()))
    };

    let headers: BTreeMap<&str, &str> = response
        .headers
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    json!({
        "status_code": response.status_code,
        "headers": headers,
        "body": body,
        "upgrade": response.upgrade,
    })
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    write_json(&json!({
        "status": "ok",
        "data": data
    }))
}

/// Write a JSON value to stdout as one line
pub fn write_json(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}
