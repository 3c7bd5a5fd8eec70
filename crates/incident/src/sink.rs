//! Event sinks receiving newly detected incident updates.
use std::{
    fmt::Debug,
    io::{self, Write},
    sync::Mutex,
};

use async_trait::async_trait;
use chrono::Local;
use eyre::{Result, eyre};

use crate::{
    detector::NewUpdate,
    model::{IncidentSummary, IncidentUpdate},
};

const SEPARATOR_WIDTH: usize = 60;

/// A newly observed incident update, tagged with the feed it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedEvent {
    /// Name of the source that reported it
    pub source_name: String,
    /// The incident the update belongs to
    pub incident: IncidentSummary,
    /// The update
    pub update: IncidentUpdate,
}

impl DetectedEvent {
    /// Build an owned event from a detector result.
    pub fn new(source_name: &str, new: &NewUpdate<'_>) -> Self {
        Self {
            source_name: source_name.to_owned(),
            incident: new.incident.summary(),
            update: new.update.clone(),
        }
    }
}

/// Destination for detected events.
///
/// Implementations must not panic; errors are logged by the caller and the
/// polling loop carries on.
#[async_trait]
pub trait EventSink: Debug + Send + Sync {
    /// Deliver one event.
    async fn emit(&self, event: &DetectedEvent) -> Result<()>;
}

/// Render the console block for `event`, without a trailing newline.
pub fn render(event: &DetectedEvent) -> String {
    let ts = event.update.observed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
    format!(
        "[{ts}]\n\
         Provider : {}\n\
         Incident : {}\n\
         Product  : {}\n\
         Status   : {}\n\
         {}",
        event.source_name,
        event.incident.name,
        event.incident.affected_product,
        event.update.description(),
        "-".repeat(SEPARATOR_WIDTH),
    )
}

/// Writes each event as a text block, stdout by default.
#[derive(Debug)]
pub struct ConsoleSink<W = io::Stdout> {
    out: Mutex<W>,
}

impl ConsoleSink<io::Stdout> {
    /// Sink writing to standard output.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    /// Sink writing to `out`.
    pub const fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    /// Consume the sink, returning the writer.
    pub fn into_inner(self) -> Result<W> {
        self.out.into_inner().map_err(|_| eyre!("console sink lock poisoned"))
    }
}

#[async_trait]
impl<W: Write + Send + Debug> EventSink for ConsoleSink<W> {
    async fn emit(&self, event: &DetectedEvent) -> Result<()> {
        let block = render(event);
        let mut out = self.out.lock().map_err(|_| eyre!("console sink lock poisoned"))?;
        // One write per block keeps concurrent feeds from interleaving lines.
        writeln!(out, "\n{block}")?;
        out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UpdateStatus;
    use chrono::{TimeZone, Utc};

    fn event(body: Option<&str>) -> DetectedEvent {
        DetectedEvent {
            source_name: "OpenAI".to_owned(),
            incident: IncidentSummary {
                incident_id: "I1".to_owned(),
                name: "Elevated error rates".to_owned(),
                impact: "minor".to_owned(),
                affected_product: "API, ChatGPT".to_owned(),
            },
            update: IncidentUpdate {
                incident_id: "I1".to_owned(),
                update_id: "U1".to_owned(),
                status: UpdateStatus::Resolved,
                impact: "minor".to_owned(),
                body: body.map(str::to_owned),
                observed_at: Utc.with_ymd_and_hms(2024, 6, 4, 20, 0, 0).unwrap(),
            },
        }
    }

    fn local_ts(event: &DetectedEvent) -> String {
        event.update.observed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
    }

    #[test]
    fn renders_block_with_fallback_status() {
        let ev = event(None);
        let expected = format!(
            "[{}]\nProvider : OpenAI\nIncident : Elevated error rates\nProduct  : API, ChatGPT\nStatus   : Resolved (impact: minor)\n{}",
            local_ts(&ev),
            "-".repeat(60)
        );
        assert_eq!(render(&ev), expected);
    }

    #[test]
    fn renders_body_when_present() {
        let rendered = render(&event(Some("All systems operational.")));
        assert!(rendered.contains("Status   : All systems operational.\n"));
    }

    #[tokio::test]
    async fn console_sink_writes_blocks() {
        let sink = ConsoleSink::new(Vec::new());
        let ev = event(None);
        sink.emit(&ev).await.unwrap();
        sink.emit(&ev).await.unwrap();

        let written = String::from_utf8(sink.into_inner().unwrap()).unwrap();
        assert_eq!(written, format!("\n{0}\n\n{0}\n", render(&ev)));
    }

    #[derive(Debug)]
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn console_sink_reports_write_errors() {
        let sink = ConsoleSink::new(BrokenPipe);
        assert!(sink.emit(&event(None)).await.is_err());
    }
}
