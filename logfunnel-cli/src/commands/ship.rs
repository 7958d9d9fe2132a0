//! `logfunnel ship` command handler

use std::future::Future;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{info, warn};

use logfunnel_core::config::LogfunnelConfig;
use logfunnel_sink::{
    AppendOutcome, BatchSink, BatchSinkBuilder, FileTransport, SinkConfig, SinkStats, Transport,
};

use crate::cli::ShipArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `ship` command.
///
/// Reads newline-delimited records from `--input` (or stdin) until EOF or
/// Ctrl-C, closes the sink so every buffered byte is dispatched, then renders
/// a [`ShipReport`].
pub async fn execute(
    args: ShipArgs,
    config_path: &Path,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut config = LogfunnelConfig::load(config_path).await?;
    if let Some(destination) = args.destination {
        config.sink.destination = destination;
    }

    let (source, input): (String, Box<dyn AsyncRead + Unpin + Send>) = match args.input {
        Some(path) => {
            let file = tokio::fs::File::open(&path).await.map_err(|e| {
                CliError::Command(format!("failed to open input {}: {}", path.display(), e))
            })?;
            (path.display().to_string(), Box::new(file))
        }
        None => ("stdin".to_owned(), Box::new(tokio::io::stdin())),
    };

    let sink_config = SinkConfig::from_core(&config.sink)?;
    let transport = FileTransport::from_config(&config.transport, &sink_config);
    let output = transport.path().display().to_string();
    let sink = BatchSinkBuilder::new(sink_config, transport).build().await?;

    info!(source = %source, output = %output, "shipping records");

    let started = Instant::now();
    let shipped = ship_lines(&sink, BufReader::new(input), tokio::signal::ctrl_c()).await;

    // 읽기 실패여도 이미 받은 레코드는 내보낸다
    sink.close().await;
    let summary = shipped?;

    let report = ShipReport {
        source,
        destination: sink.config().destination.clone(),
        output,
        lines_read: summary.lines_read,
        interrupted: summary.interrupted,
        elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        stats: sink.stats(),
    };

    writer.render(&report)?;

    Ok(())
}

/// Result of draining one input stream into the sink.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ShipSummary {
    pub lines_read: u64,
    pub interrupted: bool,
}

/// Append every line of `reader` to `sink` until EOF or `shutdown` resolves.
///
/// The trailing newline stripped by the reader is restored so each record
/// stays line-delimited inside a blob. The sink is left open.
pub(crate) async fn ship_lines<T, R, F>(
    sink: &BatchSink<T>,
    reader: R,
    shutdown: F,
) -> Result<ShipSummary, CliError>
where
    T: Transport,
    R: AsyncBufRead + Unpin,
    F: Future,
{
    let mut lines = reader.lines();
    let mut summary = ShipSummary::default();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                warn!(lines_read = summary.lines_read, "interrupted, closing sink");
                summary.interrupted = true;
                break;
            }
            line = lines.next_line() => {
                let Some(mut line) = line? else {
                    break;
                };
                line.push('\n');
                summary.lines_read += 1;
                if sink.append_str(&line)? == AppendOutcome::Rejected {
                    warn!(line_number = summary.lines_read, "line rejected by sink");
                }
            }
        }
    }

    Ok(summary)
}

/// Report rendered after a `ship` run.
#[derive(Debug, Serialize)]
pub struct ShipReport {
    /// Input path or `stdin`
    pub source: String,
    pub destination: String,
    /// File the transport appended to
    pub output: String,
    pub lines_read: u64,
    /// True when Ctrl-C stopped reading before EOF
    pub interrupted: bool,
    pub elapsed_ms: u64,
    pub stats: SinkStats,
}

impl Render for ShipReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Ship Summary: {}", self.destination.bold())?;
        writeln!(w, "  Source:       {}", self.source)?;
        writeln!(w, "  Output:       {}", self.output)?;
        writeln!(w, "  Lines read:   {}", self.lines_read)?;
        writeln!(w, "  Appended:     {}", self.stats.records_appended)?;

        let rejected = self.stats.records_rejected.to_string();
        if self.stats.records_rejected > 0 {
            writeln!(w, "  Rejected:     {}", rejected.yellow())?;
        } else {
            writeln!(w, "  Rejected:     {}", rejected)?;
        }

        writeln!(
            w,
            "  Dispatches:   {} ({} flushes, {} bypass)",
            self.stats.dispatches, self.stats.flushes, self.stats.bypass_dispatches
        )?;

        let failures = self.stats.dispatch_failures.to_string();
        if self.stats.dispatch_failures > 0 {
            writeln!(w, "  Failures:     {}", failures.red().bold())?;
        } else {
            writeln!(w, "  Failures:     {}", failures.green())?;
        }

        writeln!(w, "  Bytes:        {}", self.stats.bytes_dispatched)?;
        writeln!(w, "  Elapsed:      {} ms", self.elapsed_ms)?;
        writeln!(w, "  State:        {}", self.stats.state)?;

        if self.interrupted {
            writeln!(w, "  {}", "Interrupted before end of input".yellow())?;
        }

        Ok(())
    }
}
