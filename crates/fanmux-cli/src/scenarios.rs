//! Demonstration scenarios.
//!
//! Each scenario builds its producers, runs a session, reports every result
//! and returns them so callers (and tests) can inspect the outcome.

use std::io::Write;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;

use fanmux_core::producer::channel;
use fanmux_core::{MultiplexResult, MultiplexerConfig, PollResult, Producer, Session, cancel};

use crate::output::Reporter;

/// Shared settings for every scenario.
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    /// Multiplier applied to every demo delay (`0.1` runs ten times faster).
    pub time_scale: f64,
    /// Session defaults; the scenario-specific timeout overrides its timeout.
    pub config: MultiplexerConfig,
}

impl Default for ScenarioContext {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            config: MultiplexerConfig::default(),
        }
    }
}

impl ScenarioContext {
    /// `millis` multiplied by the time scale, or an error when the product
    /// is not a valid `Duration`.
    fn scaled(&self, millis: u64) -> anyhow::Result<Duration> {
        let secs = Duration::from_millis(millis).as_secs_f64() * self.time_scale;
        Duration::try_from_secs_f64(secs)
            .with_context(|| format!("{millis}ms scaled by {} is out of range", self.time_scale))
    }

    const fn capacity(&self) -> usize {
        self.config.producer_capacity
    }
}

/// Producer that emits `message` every `period`, forever.
fn ticker(id: &str, capacity: usize, period: Duration, message: &'static str) -> Producer<String> {
    Producer::spawn(id, capacity, move |mut tx| async move {
        loop {
            tokio::time::sleep(period).await;
            if tx.emit(message.to_string()).await.is_err() {
                break;
            }
        }
    })
}

/// Producer that emits `count` numbered messages, pausing `pause` after each.
fn source(id: &str, capacity: usize, count: usize, pause: Duration) -> Producer<String> {
    let label = id.to_string();
    Producer::spawn(id, capacity, move |mut tx| async move {
        for i in 0..count {
            if tx.emit(format!("{label} - {i}")).await.is_err() {
                return;
            }
            tokio::time::sleep(pause).await;
        }
    })
}

/// Step until the session reaches a terminal result.
async fn run_to_end<W: Write>(
    scenario: &str,
    session: &mut Session<String>,
    reporter: &mut Reporter<W>,
) -> anyhow::Result<Vec<MultiplexResult<String>>> {
    let mut results = Vec::new();
    loop {
        let result = session.step().await;
        reporter.result(scenario, &result)?;
        let terminal = result.is_terminal();
        results.push(result);
        if terminal {
            return Ok(results);
        }
    }
}

/// A fast (500ms) and a slow (2s) producer raced for `iterations` steps.
pub async fn basic<W: Write>(
    ctx: &ScenarioContext,
    reporter: &mut Reporter<W>,
    iterations: usize,
) -> anyhow::Result<Vec<MultiplexResult<String>>> {
    reporter.section("Basic Multiplexing with Select")?;
    let fast = ticker("fast", ctx.capacity(), ctx.scaled(500)?, "Fast message");
    let slow = ticker("slow", ctx.capacity(), ctx.scaled(2000)?, "Slow message");
    let mut session = Session::from_config([fast, slow], CancellationToken::new(), &ctx.config)?;

    let mut results = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let result = session.step().await;
        reporter.result("basic", &result)?;
        let terminal = result.is_terminal();
        results.push(result);
        if terminal {
            break;
        }
    }
    info!(stats = ?session.stats(), "Basic scenario finished");
    Ok(results)
}

/// One producer that answers after `delay_ms`, raced against `timeout_ms`.
pub async fn timeout<W: Write>(
    ctx: &ScenarioContext,
    reporter: &mut Reporter<W>,
    delay_ms: u64,
    timeout_ms: u64,
) -> anyhow::Result<MultiplexResult<String>> {
    reporter.section("Select with Timeout")?;
    let delay = ctx.scaled(delay_ms)?;
    let deadline = ctx.scaled(timeout_ms)?.max(Duration::from_millis(1));
    let delayed = Producer::spawn("delayed", ctx.capacity(), move |mut tx| async move {
        tokio::time::sleep(delay).await;
        let _ = tx.emit("Delayed response".to_string()).await;
    });
    let mut session = Session::new([delayed], CancellationToken::new(), Some(deadline))?;

    let result = session.step().await;
    reporter.result("timeout", &result)?;
    Ok(result)
}

/// A single poll on a producer that never emits.
pub fn non_blocking<W: Write>(
    ctx: &ScenarioContext,
    reporter: &mut Reporter<W>,
) -> anyhow::Result<PollResult<String>> {
    reporter.section("Non-Blocking Select with Default")?;
    let (idle, producer) = channel::<String>("idle", ctx.capacity());
    let mut session = Session::from_config([producer], CancellationToken::new(), &ctx.config)?;

    let polled = session.poll();
    reporter.polled("non-blocking", &polled)?;
    drop(idle);
    Ok(polled)
}

/// A cooperative worker reporting progress every second until the shared
/// token is cancelled after `after_ms`.
pub async fn cancellation<W: Write>(
    ctx: &ScenarioContext,
    reporter: &mut Reporter<W>,
    after_ms: u64,
) -> anyhow::Result<Vec<MultiplexResult<String>>> {
    reporter.section("Using Select for Cancellation")?;
    let token = CancellationToken::new();

    let worker_token = token.clone();
    let period = ctx.scaled(1000)?;
    let after = ctx.scaled(after_ms)?;
    let worker = Producer::spawn("worker-1", ctx.capacity(), move |mut tx| async move {
        loop {
            if worker_token.is_cancelled() {
                info!(worker = %tx.id(), "Received cancellation signal, stopping");
                return;
            }
            if tx.emit("Working...".to_string()).await.is_err() {
                return;
            }
            tokio::select! {
                () = worker_token.cancelled() => {}
                () = tokio::time::sleep(period) => {}
            }
        }
    });
    let mut session = Session::from_config([worker], token.clone(), &ctx.config)?;

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(after).await;
        info!("Sending cancel signal");
        cancel(&token);
    });

    let results = run_to_end("cancel", &mut session, reporter).await?;
    canceller.await?;
    Ok(results)
}

/// Two finite sources (400ms and 700ms apart) merged until both close.
pub async fn fan_in<W: Write>(
    ctx: &ScenarioContext,
    reporter: &mut Reporter<W>,
    count: usize,
) -> anyhow::Result<Vec<MultiplexResult<String>>> {
    reporter.section("Fan-In Pattern (Multiple Sources to One)")?;
    let first = source("Source 1", ctx.capacity(), count, ctx.scaled(400)?);
    let second = source("Source 2", ctx.capacity(), count, ctx.scaled(700)?);
    let mut session = Session::from_config([first, second], CancellationToken::new(), &ctx.config)?;

    let results = run_to_end("fan-in", &mut session, reporter).await?;
    info!(stats = ?session.stats(), "Fan-in scenario finished");
    Ok(results)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    fn fast_ctx() -> ScenarioContext {
        ScenarioContext {
            time_scale: 0.01,
            ..Default::default()
        }
    }

    #[test]
    fn scaled_delays_follow_the_time_scale() {
        let ctx = ScenarioContext {
            time_scale: 0.5,
            ..Default::default()
        };
        assert_eq!(ctx.scaled(3000).unwrap(), Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn out_of_range_delay_is_an_error() {
        let ctx = ScenarioContext {
            time_scale: 1e30,
            ..Default::default()
        };
        assert!(ctx.scaled(3000).is_err());

        let mut reporter = Reporter::new(Vec::new(), false);
        assert!(basic(&ctx, &mut reporter, 1).await.is_err());
    }

    #[tokio::test]
    async fn basic_runs_requested_iterations() {
        let mut reporter = Reporter::new(Vec::new(), false);
        let results = basic(&fast_ctx(), &mut reporter, 5).await.unwrap();

        assert_eq!(results.len(), 5);
        assert!(
            results
                .iter()
                .all(|r| matches!(r, MultiplexResult::Delivered(_)))
        );
    }

    #[tokio::test]
    async fn timeout_fires_before_slow_answer() {
        let mut reporter = Reporter::new(Vec::new(), false);
        let result = timeout(&fast_ctx(), &mut reporter, 3000, 1000).await.unwrap();
        assert_eq!(result, MultiplexResult::TimedOut);
    }

    #[tokio::test]
    async fn timeout_loses_to_fast_answer() {
        let mut reporter = Reporter::new(Vec::new(), false);
        let result = timeout(&fast_ctx(), &mut reporter, 0, 5000).await.unwrap();
        assert!(matches!(result, MultiplexResult::Delivered(ref e) if e.payload == "Delayed response"));
    }

    #[tokio::test]
    async fn non_blocking_reports_not_ready() {
        let mut reporter = Reporter::new(Vec::new(), false);
        let polled = non_blocking(&fast_ctx(), &mut reporter).unwrap();
        assert_eq!(polled, PollResult::NotReady);
    }

    #[tokio::test]
    async fn cancellation_ends_with_cancelled() {
        let mut reporter = Reporter::new(Vec::new(), false);
        let results = cancellation(&fast_ctx(), &mut reporter, 3000).await.unwrap();

        let (last, body) = results.split_last().unwrap();
        assert_eq!(*last, MultiplexResult::Cancelled);
        assert!(!body.is_empty());
    }

    #[tokio::test]
    async fn fan_in_delivers_every_message_then_closes() {
        let mut reporter = Reporter::new(Vec::new(), false);
        let results = fan_in(&fast_ctx(), &mut reporter, 3).await.unwrap();

        let delivered = results
            .iter()
            .filter(|r| matches!(r, MultiplexResult::Delivered(_)))
            .count();
        let exhausted = results
            .iter()
            .filter(|r| matches!(r, MultiplexResult::ProducerExhausted { .. }))
            .count();
        assert_eq!(delivered, 6);
        assert_eq!(exhausted, 2);
        assert_eq!(results.last(), Some(&MultiplexResult::AllExhausted));
    }
}
