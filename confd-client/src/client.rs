//! Typed client interface.

use crate::connection::{Connection, ConnectionConfig};
use crate::error::ClientError;
use confd_protocol::{fields, Endpoint, PayloadMap, Status, Value};

/// A typed client for the configuration daemon.
pub struct Client {
    connection: Connection,
}

impl Client {
    /// Connects using the given configuration.
    pub async fn connect(config: ConnectionConfig) -> Result<Self, ClientError> {
        let connection = Connection::new(config);
        connection.connect().await?;
        Ok(Self { connection })
    }

    /// Connects to the default daemon socket.
    pub async fn connect_default() -> Result<Self, ClientError> {
        Self::connect(ConnectionConfig::default()).await
    }

    /// Closes the connection.
    pub async fn close(&self) {
        self.connection.close().await;
    }

    /// Reads a property. `Ok(None)` means the key does not exist;
    /// `Ok(Some(Value::Null))` means it exists with a null value.
    pub async fn query(&self, key: &str) -> Result<Option<Value>, ClientError> {
        self.query_with_flags(key, false).await
    }

    /// Reads a property; with `force_float` the daemon encodes real replies
    /// at 32-bit precision.
    pub async fn query_with_flags(
        &self,
        key: &str,
        force_float: bool,
    ) -> Result<Option<Value>, ClientError> {
        check_key(key)?;

        let mut payload = PayloadMap::new();
        payload.insert(fields::KEY, Value::Text(key.to_owned()));
        if force_float {
            payload.insert(fields::FORCE_FLOAT, Value::Bool(true));
        }

        let reply = self.connection.request(Endpoint::Query, payload).await?;
        check_status(&reply)?;

        let found = reply
            .get(fields::FOUND)
            .and_then(Value::as_bool)
            .ok_or(ClientError::InvalidResponse("missing `found` flag"))?;
        if !found {
            return Ok(None);
        }
        // A found property without a value field is a stored null.
        Ok(Some(reply.get(fields::VALUE).cloned().unwrap_or(Value::Null)))
    }

    /// Writes a property.
    pub async fn update(&self, key: &str, value: Value) -> Result<(), ClientError> {
        check_key(key)?;

        let mut payload = PayloadMap::new();
        payload.insert(fields::KEY, Value::Text(key.to_owned()));
        payload.insert(fields::VALUE, value);

        let reply = self.connection.request(Endpoint::Update, payload).await?;
        check_status(&reply)?;

        let updated = reply
            .get(fields::UPDATED)
            .and_then(Value::as_bool)
            .ok_or(ClientError::InvalidResponse("missing `updated` flag"))?;
        if !updated {
            return Err(ClientError::InvalidResponse("update refused without status"));
        }
        Ok(())
    }

    /// Reads a string property.
    pub async fn get_string(&self, key: &str) -> Result<String, ClientError> {
        match self.query(key).await? {
            None => Err(ClientError::Status(Status::NotFound)),
            Some(Value::Null) => Err(ClientError::Status(Status::NullValue)),
            Some(Value::Text(s)) => Ok(s),
            Some(_) => Err(ClientError::Status(Status::TypeMismatch)),
        }
    }

    /// Reads a blob property.
    pub async fn get_blob(&self, key: &str) -> Result<Vec<u8>, ClientError> {
        match self.query(key).await? {
            None => Err(ClientError::Status(Status::NotFound)),
            Some(Value::Null) => Err(ClientError::Status(Status::NullValue)),
            Some(Value::Bytes(b)) => Ok(b),
            Some(_) => Err(ClientError::Status(Status::TypeMismatch)),
        }
    }

    /// Reads an integer property.
    pub async fn get_uint(&self, key: &str) -> Result<u64, ClientError> {
        match self.query(key).await? {
            None => Err(ClientError::Status(Status::NotFound)),
            Some(Value::Null) => Err(ClientError::Status(Status::NullValue)),
            Some(Value::UInt(v)) => Ok(v),
            Some(_) => Err(ClientError::Status(Status::TypeMismatch)),
        }
    }

    /// Reads a real property. Integers widen to f64.
    pub async fn get_real(&self, key: &str) -> Result<f64, ClientError> {
        match self.query(key).await? {
            None => Err(ClientError::Status(Status::NotFound)),
            Some(Value::Null) => Err(ClientError::Status(Status::NullValue)),
            Some(Value::Real(v)) => Ok(v),
            Some(Value::UInt(v)) => Ok(v as f64),
            Some(_) => Err(ClientError::Status(Status::TypeMismatch)),
        }
    }

    /// Reads a boolean property. The store keeps booleans as integers, so a
    /// non-zero integer reads back as true.
    pub async fn get_bool(&self, key: &str) -> Result<bool, ClientError> {
        match self.query(key).await? {
            None => Err(ClientError::Status(Status::NotFound)),
            Some(Value::Null) => Err(ClientError::Status(Status::NullValue)),
            Some(Value::Bool(b)) => Ok(b),
            Some(Value::UInt(v)) => Ok(v != 0),
            Some(_) => Err(ClientError::Status(Status::TypeMismatch)),
        }
    }

    pub async fn set_string(&self, key: &str, value: impl Into<String>) -> Result<(), ClientError> {
        self.update(key, Value::Text(value.into())).await
    }

    pub async fn set_blob(&self, key: &str, value: impl Into<Vec<u8>>) -> Result<(), ClientError> {
        self.update(key, Value::Bytes(value.into())).await
    }

    pub async fn set_uint(&self, key: &str, value: u64) -> Result<(), ClientError> {
        self.update(key, Value::UInt(value)).await
    }

    pub async fn set_real(&self, key: &str, value: f64) -> Result<(), ClientError> {
        self.update(key, Value::Real(value)).await
    }

    pub async fn set_bool(&self, key: &str, value: bool) -> Result<(), ClientError> {
        self.update(key, Value::Bool(value)).await
    }

    pub async fn set_null(&self, key: &str) -> Result<(), ClientError> {
        self.update(key, Value::Null).await
    }
}

fn check_key(key: &str) -> Result<(), ClientError> {
    if key.is_empty() {
        return Err(ClientError::Status(Status::InvalidArguments));
    }
    Ok(())
}

/// Converts a reply's status field, if any, into an error.
fn check_status(reply: &PayloadMap) -> Result<(), ClientError> {
    let Some(raw) = reply.get(fields::STATUS) else {
        return Ok(());
    };
    let code = raw
        .as_uint()
        .ok_or(ClientError::InvalidResponse("non-integer status field"))?;
    let status =
        Status::from_code(code).ok_or(ClientError::InvalidResponse("unknown status code"))?;
    if status != Status::Success {
        return Err(ClientError::Status(status));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_key_rejected_locally() {
        let client = Client {
            connection: Connection::new(ConnectionConfig::default()),
        };
        let err = client.query("").await.unwrap_err();
        assert_eq!(err.status(), Some(Status::InvalidArguments));

        let err = client.update("", Value::Null).await.unwrap_err();
        assert_eq!(err.status(), Some(Status::InvalidArguments));
    }

    #[test]
    fn test_check_status() {
        let mut reply = PayloadMap::new();
        assert!(check_status(&reply).is_ok());

        reply.insert(fields::STATUS, Value::UInt(Status::AccessDenied.code()));
        let err = check_status(&reply).unwrap_err();
        assert_eq!(err.status(), Some(Status::AccessDenied));

        reply.insert(fields::STATUS, Value::UInt(999));
        assert!(matches!(
            check_status(&reply),
            Err(ClientError::InvalidResponse(_))
        ));

        reply.insert(fields::STATUS, Value::Text("nope".into()));
        assert!(matches!(
            check_status(&reply),
            Err(ClientError::InvalidResponse(_))
        ));
    }
}
