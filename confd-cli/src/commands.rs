//! Command implementations.

use crate::ValueType;
use anyhow::{anyhow, bail, Context};
use confd_client::{Client, Value};

/// Reads a property and prints it to stdout.
pub async fn get(client: &Client, key: &str, value_type: ValueType) -> anyhow::Result<()> {
    match value_type {
        ValueType::Auto => match client.query(key).await? {
            None => bail!("key '{key}' not found"),
            Some(value) => print_value(&value),
        },
        ValueType::String => println!("{}", client.get_string(key).await?),
        ValueType::Blob => hex_dump(&client.get_blob(key).await?),
        ValueType::Int => println!("{}", client.get_uint(key).await?),
        ValueType::Real => println!("{}", client.get_real(key).await?),
        ValueType::Bool => println!("{}", client.get_bool(key).await?),
    }
    Ok(())
}

/// Writes a property.
pub async fn set(
    client: &Client,
    key: &str,
    raw: &str,
    value_type: ValueType,
) -> anyhow::Result<()> {
    let value = parse_value(raw, value_type)?;
    client
        .update(key, value)
        .await
        .with_context(|| format!("failed to update '{key}'"))?;
    Ok(())
}

/// Sets a property to null.
pub async fn set_null(client: &Client, key: &str) -> anyhow::Result<()> {
    client
        .set_null(key)
        .await
        .with_context(|| format!("failed to update '{key}'"))?;
    Ok(())
}

fn print_value(value: &Value) {
    match value {
        Value::Null => println!("(null)"),
        Value::Bool(b) => println!("{b}"),
        Value::UInt(v) => println!("{v}"),
        Value::Real(r) => println!("{r}"),
        Value::Text(s) => println!("{s}"),
        Value::Bytes(b) => hex_dump(b),
    }
}

fn parse_value(raw: &str, value_type: ValueType) -> anyhow::Result<Value> {
    let value = match value_type {
        ValueType::String => Value::Text(raw.to_owned()),
        ValueType::Blob => Value::Bytes(parse_hex(raw)?),
        ValueType::Int => Value::UInt(raw.parse().context("expected an unsigned integer")?),
        ValueType::Real => Value::Real(raw.parse().context("expected a real number")?),
        ValueType::Bool => Value::Bool(raw.parse().context("expected `true` or `false`")?),
        ValueType::Auto => {
            if let Ok(v) = raw.parse::<u64>() {
                Value::UInt(v)
            } else if let Ok(v) = raw.parse::<f64>() {
                Value::Real(v)
            } else if let Ok(v) = raw.parse::<bool>() {
                Value::Bool(v)
            } else {
                Value::Text(raw.to_owned())
            }
        }
    };
    Ok(value)
}

/// Parses a hex string (whitespace allowed) into bytes.
fn parse_hex(raw: &str) -> anyhow::Result<Vec<u8>> {
    let digits: Vec<u8> = raw
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.len() % 2 != 0 {
        bail!("hex input must have an even number of digits");
    }

    digits
        .chunks(2)
        .map(|pair| {
            let hi = hex_digit(pair[0])?;
            let lo = hex_digit(pair[1])?;
            Ok(hi << 4 | lo)
        })
        .collect()
}

fn hex_digit(digit: u8) -> anyhow::Result<u8> {
    (digit as char)
        .to_digit(16)
        .map(|d| d as u8)
        .ok_or_else(|| anyhow!("invalid hex digit '{}'", digit as char))
}

/// Prints bytes in 16-byte rows with an ASCII gutter.
fn hex_dump(bytes: &[u8]) {
    for (row, chunk) in bytes.chunks(16).enumerate() {
        let hex: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '.'
                }
            })
            .collect();
        println!("{:08x}  {:<47}  |{}|", row * 16, hex.join(" "), ascii);
    }
}
