//! A console encoder that appends a record's key/value pairs in logfmt style.
//!
//! The message part is rendered by a regular [`PatternEncoder`]; pairs follow
//! as `key=value`, with values containing whitespace, quotes or `=` wrapped in
//! double quotes.

use log::{
    Record,
    kv::{Error, Key, Value, VisitSource},
};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::encode::{Color, Encode, Style, Write};
use serde::Deserialize;
use std::io;

const DEFAULT_PATTERN: &str = "{d} {l} {t} - {m}";

#[derive(Debug, Deserialize)]
pub struct StructuredConsoleEncoderConfig {
    pub pattern: Option<String>,
    pub key_color: Option<bool>,
}

#[derive(Debug)]
pub struct StructuredConsoleEncoder {
    delegate: PatternEncoder,
    key_color: bool,
}

impl StructuredConsoleEncoder {
    pub fn new(pattern: &str, key_color: bool) -> Self {
        Self {
            delegate: PatternEncoder::new(pattern),
            key_color,
        }
    }
}

impl Encode for StructuredConsoleEncoder {
    fn encode(&self, w: &mut dyn Write, record: &Record) -> anyhow::Result<()> {
        self.delegate.encode(w, record)?;

        let mut visitor = LogfmtVisitor {
            writer: w,
            key_color: self.key_color,
            io_err: None,
        };

        if let Err(kv_err) = record.key_values().visit(&mut visitor) {
            if let Some(io_err) = visitor.io_err {
                return Err(io_err.into());
            }
            write!(w, " [KV Error: {}]", kv_err)?;
        }

        w.write_all(b"\n")?;
        Ok(())
    }
}

/// Quotes `value` if logfmt would otherwise split it.
fn logfmt_value(value: &str) -> String {
    let needs_quotes = value.is_empty() || value.chars().any(|c| c.is_whitespace() || c == '"' || c == '=');
    if needs_quotes {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

struct LogfmtVisitor<'a> {
    writer: &'a mut dyn Write,
    key_color: bool,
    io_err: Option<io::Error>,
}

impl<'kvs> VisitSource<'kvs> for LogfmtVisitor<'_> {
    fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>) -> Result<(), Error> {
        let result = (|| {
            if self.key_color {
                self.writer.set_style(Style::new().text(Color::Cyan))?;
            }
            write!(self.writer, " {}=", key)?;
            if self.key_color {
                self.writer.set_style(&Style::default())?;
            }
            write!(self.writer, "{}", logfmt_value(&value.to_string()))?;
            Ok::<(), io::Error>(())
        })();

        if let Err(e) = result {
            self.io_err = Some(e);
            return Err(Error::msg("io error during visit"));
        }

        Ok(())
    }
}

pub struct StructuredConsoleEncoderDeserializer;

impl log4rs::config::Deserialize for StructuredConsoleEncoderDeserializer {
    type Trait = dyn Encode;
    type Config = StructuredConsoleEncoderConfig;

    fn deserialize(
        &self,
        config: StructuredConsoleEncoderConfig,
        _: &log4rs::config::Deserializers,
    ) -> anyhow::Result<Box<dyn Encode>> {
        let pattern = config.pattern.as_deref().unwrap_or(DEFAULT_PATTERN);
        Ok(Box::new(StructuredConsoleEncoder::new(
            pattern,
            config.key_color.unwrap_or(true),
        )))
    }
}
