// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Log formatting and the syslog log destination.
//!
//! Every line is rendered as:
//! ```text
//! CBDEFENSE | LEVEL | [span{fields}: ] message fields
//! ```
//! and written either to stdout or, by default, as one datagram per line to the
//! syslog receiver under facility LOCAL6.

use std::fmt;
use std::io;
use std::net::UdpSocket;

use tracing_core::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::fmt::{
    format::{self, FormatEvent, FormatFields},
    FmtContext, FormattedFields, MakeWriter,
};
use tracing_subscriber::registry::LookupSpan;

use crate::sink::{rfc3164_frame, Facility, Severity};

#[derive(Debug, Clone, Copy)]
pub struct Formatter;

impl<S, N> FormatEvent<S, N> for Formatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: format::Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(&mut writer, "CBDEFENSE | {} | ", event.metadata().level())?;

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                write!(writer, "{}", span.name())?;
                let ext = span.extensions();
                if let Some(fields) = ext.get::<FormattedFields<N>>() {
                    if !fields.is_empty() {
                        write!(writer, "{{{fields}}}")?;
                    }
                }
                write!(writer, ": ")?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// `MakeWriter` sending each formatted line to a syslog receiver.
#[derive(Debug)]
pub struct SyslogMakeWriter {
    socket: UdpSocket,
    hostname: String,
    tag: String,
}

impl SyslogMakeWriter {
    pub fn new(addr: &str, hostname: String, tag: &str) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.connect(addr)?;
        Ok(Self {
            socket,
            hostname,
            tag: tag.to_string(),
        })
    }
}

/// One formatted event, flushed as a single datagram when dropped.
pub struct SyslogLine<'a> {
    target: &'a SyslogMakeWriter,
    severity: Severity,
    buf: Vec<u8>,
}

impl io::Write for SyslogLine<'_> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for SyslogLine<'_> {
    fn drop(&mut self) {
        let text = String::from_utf8_lossy(&self.buf);
        let message = text.trim_end();
        if message.is_empty() {
            return;
        }
        let line = rfc3164_frame(
            Facility::Local6,
            self.severity,
            &self.target.hostname,
            &self.target.tag,
            message,
        );
        // Nowhere left to report a failed log write.
        let _ = self.target.socket.send(line.as_bytes());
    }
}

fn severity_for(level: &Level) -> Severity {
    match *level {
        Level::ERROR => Severity::Error,
        Level::WARN => Severity::Warning,
        Level::INFO => Severity::Info,
        _ => Severity::Debug,
    }
}

impl<'a> MakeWriter<'a> for SyslogMakeWriter {
    type Writer = SyslogLine<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        SyslogLine {
            target: self,
            severity: Severity::Info,
            buf: Vec::new(),
        }
    }

    fn make_writer_for(&'a self, meta: &Metadata<'_>) -> Self::Writer {
        SyslogLine {
            target: self,
            severity: severity_for(meta.level()),
            buf: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_severity_mapping() {
        assert_eq!(severity_for(&Level::ERROR), Severity::Error);
        assert_eq!(severity_for(&Level::WARN), Severity::Warning);
        assert_eq!(severity_for(&Level::INFO), Severity::Info);
        assert_eq!(severity_for(&Level::TRACE), Severity::Debug);
    }

    #[test]
    fn test_line_is_sent_as_one_datagram_on_drop() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = receiver.local_addr().unwrap().to_string();
        let make_writer = SyslogMakeWriter::new(&addr, "host-b".to_string(), "cbdataforwarderEventLogs").unwrap();

        {
            let mut line = make_writer.make_writer();
            line.write_all(b"CBDEFENSE | INFO | ").unwrap();
            line.write_all(b"Found 2 artifacts\n").unwrap();
        }

        let mut buf = [0u8; 1024];
        let len = receiver.recv(&mut buf).unwrap();
        let datagram = std::str::from_utf8(&buf[..len]).unwrap();
        assert!(datagram.starts_with("<182>"));
        assert!(datagram.ends_with("host-b cbdataforwarderEventLogs: CBDEFENSE | INFO | Found 2 artifacts"));
    }

    #[test]
    fn test_formatter_output() {
        let output = std::sync::Arc::new(std::sync::Mutex::new(Vec::<u8>::new()));
        let sink = output.clone();
        let subscriber = tracing_subscriber::fmt::Subscriber::builder()
            .with_ansi(false)
            .event_format(Formatter)
            .with_writer(move || SharedBuf(sink.clone()))
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let span = tracing::info_span!("artifact", key = "a.gz");
            let _guard = span.enter();
            tracing::warn!("Forwarding failed");
        });

        let text = String::from_utf8(output.lock().unwrap().clone()).unwrap();
        assert_eq!(text, "CBDEFENSE | WARN | artifact{key=\"a.gz\"}: Forwarding failed\n");
    }

    struct SharedBuf(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl io::Write for SharedBuf {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
