//! Wire shapes for the orchestrator's login exchange.
//!
//! Field names differ per console, so requests and responses are handled as
//! JSON objects keyed by the console's [`LoginExchange`] fields.

use serde_json::{Map, Value};

use crate::domain::{LoginCredentials, LoginExchange};

/// Request body `{<username_field>: .., "password": ..}`.
pub(super) fn login_body(exchange: &LoginExchange, credentials: &LoginCredentials) -> Value {
    let mut body = Map::with_capacity(2);
    body.insert(
        exchange.username_field.to_owned(),
        Value::String(credentials.username().to_owned()),
    );
    body.insert(
        "password".to_owned(),
        Value::String(credentials.password().to_owned()),
    );
    Value::Object(body)
}

/// Pull the issued token out of a login response.
pub(super) fn issued_token(body: &[u8], token_field: &str) -> Result<String, String> {
    let decoded: Value = serde_json::from_slice(body)
        .map_err(|error| format!("invalid login JSON payload: {error}"))?;
    decoded
        .get(token_field)
        .and_then(Value::as_str)
        .filter(|token| !token.trim().is_empty())
        .map(str::to_owned)
        .ok_or_else(|| format!("login response has no '{token_field}'"))
}
