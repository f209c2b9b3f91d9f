//! Scenario output.
//!
//! User-facing output uses `writeln!` to the given writer (stdout for the
//! binary); logs go to stderr through tracing.

use std::io::Write;

use serde::Serialize;

use fanmux_core::{MultiplexResult, PollResult};

/// Writes one line per multiplexer result, as text or JSON.
pub struct Reporter<W> {
    out: W,
    json: bool,
}

#[derive(Serialize)]
struct JsonLine<'a, T> {
    scenario: &'a str,
    #[serde(flatten)]
    result: &'a MultiplexResult<T>,
}

#[derive(Serialize)]
struct JsonNotReady<'a> {
    scenario: &'a str,
    result: &'static str,
}

impl<W: Write> Reporter<W> {
    pub const fn new(out: W, json: bool) -> Self {
        Self { out, json }
    }

    /// Scenario banner; omitted in JSON mode.
    pub fn section(&mut self, title: &str) -> std::io::Result<()> {
        if self.json {
            return Ok(());
        }
        writeln!(self.out, "=== {title} ===")
    }

    pub fn result<T>(&mut self, scenario: &str, result: &MultiplexResult<T>) -> anyhow::Result<()>
    where
        T: Serialize + std::fmt::Display,
    {
        if self.json {
            serde_json::to_writer(&mut self.out, &JsonLine { scenario, result })?;
            writeln!(self.out)?;
            return Ok(());
        }
        writeln!(self.out, "{}", describe(result))?;
        Ok(())
    }

    pub fn polled<T>(&mut self, scenario: &str, polled: &PollResult<T>) -> anyhow::Result<()>
    where
        T: Serialize + std::fmt::Display,
    {
        match polled {
            PollResult::Ready(result) => self.result(scenario, result),
            PollResult::NotReady if self.json => {
                serde_json::to_writer(
                    &mut self.out,
                    &JsonNotReady {
                        scenario,
                        result: "not_ready",
                    },
                )?;
                writeln!(self.out)?;
                Ok(())
            }
            PollResult::NotReady => {
                writeln!(self.out, "No message available. Skipping...")?;
                Ok(())
            }
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Human-readable form of a result.
pub fn describe<T: std::fmt::Display>(result: &MultiplexResult<T>) -> String {
    match result {
        MultiplexResult::Delivered(event) => format!(
            "Received from {} (#{}): {}",
            event.producer, event.sequence, event.payload
        ),
        MultiplexResult::ProducerExhausted { id, error: None } => format!("{id} closed"),
        MultiplexResult::ProducerExhausted {
            id,
            error: Some(error),
        } => format!("{id} failed: {error}"),
        MultiplexResult::Cancelled => "Cancelled.".to_string(),
        MultiplexResult::TimedOut => "Timeout! No message received.".to_string(),
        MultiplexResult::AllExhausted => "All sources closed.".to_string(),
    }
}
