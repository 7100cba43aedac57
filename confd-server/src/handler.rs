//! Request dispatch.
//!
//! Each decoded frame is handled as a pure function of the request, the
//! caller's credentials, and the store. Every failure below the framing
//! layer becomes a status reply on the request's tag; the handler never
//! tears down the connection itself.

use crate::access::AccessPolicy;
use crate::session::Session;
use confd_protocol::{fields, Endpoint, EncodeOptions, Frame, PayloadMap, ProtocolError, Status, Value};
use confd_store::{PropertyStore, StoreError};
use std::sync::Arc;

/// Dispatches requests against the store under the loaded access policy.
pub struct RequestHandler {
    store: Arc<PropertyStore>,
    policy: AccessPolicy,
}

impl RequestHandler {
    pub fn new(store: Arc<PropertyStore>, policy: AccessPolicy) -> Self {
        Self { store, policy }
    }

    /// Produces the reply frame for a request. The reply carries the
    /// request's endpoint and tag with the reply flag set.
    pub fn handle(&self, session: &mut Session, request: &Frame) -> Frame {
        session.record_request();

        let (payload, opts) = match Endpoint::try_from(request.endpoint) {
            Ok(Endpoint::Query) => self.query(session, &request.payload),
            Ok(Endpoint::Update) => self.update(session, &request.payload),
            Err(raw) => {
                tracing::warn!(conn = session.id(), endpoint = raw, "unknown endpoint");
                (
                    reply(None, None, Status::NotSupported, None),
                    EncodeOptions::default(),
                )
            }
        };

        request.reply_to(payload.encode_with(opts).freeze())
    }

    /// Read a property. The reply carries `found` plus the value when the
    /// property exists and is not null.
    fn query(&self, session: &Session, payload: &[u8]) -> (PayloadMap, EncodeOptions) {
        let opts = EncodeOptions::default();

        let request = match PayloadMap::decode(payload) {
            Ok(map) => map,
            Err(err) => return (malformed(session, fields::FOUND, err), opts),
        };
        let key = match required_key(&request) {
            Ok(key) => key,
            Err(err) => return (malformed(session, fields::FOUND, err), opts),
        };
        let force_float = match request.get_bool(fields::FORCE_FLOAT) {
            Ok(flag) => flag.unwrap_or(false),
            Err(err) => return (malformed(session, fields::FOUND, err), opts),
        };
        let opts = EncodeOptions {
            single_precision_real: force_float,
        };

        let peer = session.peer();
        if !self.policy.allows(peer.uid, peer.gid, key) {
            tracing::debug!(conn = session.id(), uid = peer.uid, key, "query denied");
            return (
                reply(Some(key), Some((fields::FOUND, false)), Status::AccessDenied, None),
                opts,
            );
        }

        let payload = match self.store.get(key) {
            Ok(None) => reply(Some(key), Some((fields::FOUND, false)), Status::Success, None),
            Ok(Some(Value::Null)) => {
                reply(Some(key), Some((fields::FOUND, true)), Status::Success, None)
            }
            Ok(Some(value)) => reply(
                Some(key),
                Some((fields::FOUND, true)),
                Status::Success,
                Some(value),
            ),
            Err(err) => {
                tracing::error!(conn = session.id(), key, error = %err, "query failed");
                reply(Some(key), Some((fields::FOUND, false)), Status::StoreError, None)
            }
        };
        (payload, opts)
    }

    /// Insert or update a property. The reply carries `updated` and no
    /// value.
    fn update(&self, session: &Session, payload: &[u8]) -> (PayloadMap, EncodeOptions) {
        let opts = EncodeOptions::default();

        let request = match PayloadMap::decode(payload) {
            Ok(map) => map,
            Err(err) => return (malformed(session, fields::UPDATED, err), opts),
        };
        let key = match required_key(&request) {
            Ok(key) => key,
            Err(err) => return (malformed(session, fields::UPDATED, err), opts),
        };
        let value = match request.require_value(fields::VALUE) {
            Ok(value) => value,
            Err(err) => return (malformed(session, fields::UPDATED, err), opts),
        };

        let peer = session.peer();
        if !self.policy.allows(peer.uid, peer.gid, key) {
            tracing::debug!(conn = session.id(), uid = peer.uid, key, "update denied");
            return (
                reply(Some(key), Some((fields::UPDATED, false)), Status::AccessDenied, None),
                opts,
            );
        }

        let status = match self.store.set(key, value) {
            Ok(()) => Status::Success,
            Err(err @ StoreError::TypeChange { .. }) => {
                tracing::debug!(conn = session.id(), key, error = %err, "update refused");
                Status::TypeChangeDenied
            }
            Err(StoreError::InvalidKey) => Status::InvalidArguments,
            Err(err) => {
                tracing::error!(conn = session.id(), key, error = %err, "update failed");
                Status::StoreError
            }
        };

        let updated = status == Status::Success;
        (
            reply(Some(key), Some((fields::UPDATED, updated)), status, None),
            opts,
        )
    }
}

/// Extracts the mandatory non-empty `key` field.
fn required_key(request: &PayloadMap) -> Result<&str, ProtocolError> {
    let key = request.require_text(fields::KEY)?;
    if key.is_empty() {
        return Err(ProtocolError::FieldType {
            field: fields::KEY,
            expected: "non-empty string",
        });
    }
    Ok(key)
}

fn malformed(session: &Session, flag: &'static str, err: ProtocolError) -> PayloadMap {
    tracing::debug!(conn = session.id(), error = %err, "malformed request");
    reply(None, Some((flag, false)), Status::MalformedRequest, None)
}

/// Builds a reply payload: optional echoed key, optional status flag, the
/// value (successful non-null queries only), and the status code when the
/// outcome is not success.
fn reply(
    key: Option<&str>,
    flag: Option<(&'static str, bool)>,
    status: Status,
    value: Option<Value>,
) -> PayloadMap {
    let mut map = PayloadMap::new();
    if let Some(key) = key {
        map.insert(fields::KEY, Value::Text(key.to_owned()));
    }
    if let Some(value) = value {
        map.insert(fields::VALUE, value);
    }
    if let Some((name, ok)) = flag {
        map.insert(name, Value::Bool(ok));
    }
    if status != Status::Success {
        map.insert(fields::STATUS, Value::UInt(status.code()));
    }
    map
}
