//! TCP listener for the line protocol
//!
//! One task per connection. Requests on a connection are answered in
//! order, one response line per request line. A request line longer than
//! `max_line_bytes` is answered with an error and discarded in
//! `max_line_bytes` chunks, never buffered whole.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;

use super::config::LineProtocolConfig;
use super::protocol::{alive_line, error_line, ok_line, LineRequest};
use crate::dispatch::{DispatchError, Dispatcher};
use crate::observability::{log_event_with_fields, Event};

/// Pause after a failed accept before trying again
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Line protocol front end for a dispatcher
pub struct LineServer {
    config: LineProtocolConfig,
    dispatcher: Arc<Dispatcher>,
}

impl LineServer {
    pub fn new(config: LineProtocolConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self { config, dispatcher }
    }

    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Bind the configured address and serve until shutdown
    pub async fn start(self, shutdown: watch::Receiver<bool>) -> io::Result<()> {
        let listener = TcpListener::bind(self.config.socket_addr()).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` flips to true
    pub async fn serve(self, listener: TcpListener, shutdown: watch::Receiver<bool>) -> io::Result<()> {
        log_event_with_fields(
            Event::ServerStart,
            &[("listener", "line"), ("addr", &listener.local_addr()?.to_string())],
        );

        let mut stop = shutdown.clone();
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _peer)) => {
                        let dispatcher = self.dispatcher.clone();
                        let max_line_bytes = self.config.max_line_bytes;
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) =
                                serve_connection(dispatcher, stream, max_line_bytes, shutdown).await
                            {
                                log_event_with_fields(
                                    Event::RequestFailed,
                                    &[("listener", "line"), ("error", &e.to_string())],
                                );
                            }
                        });
                    }
                    Err(e) => {
                        // Persistent failures (e.g. fd exhaustion) must not spin the loop
                        log_event_with_fields(
                            Event::RequestFailed,
                            &[("listener", "line"), ("error", &e.to_string())],
                        );
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
                _ = shutdown_requested(&mut stop) => break,
            }
        }

        Ok(())
    }
}

/// Resolves once the shutdown flag is set or its sender is dropped.
///
/// Returns `()` so no `watch::Ref` guard is held by the caller.
async fn shutdown_requested(stop: &mut watch::Receiver<bool>) {
    let _ = stop.wait_for(|stop| *stop).await;
}

/// Answer one request line
pub async fn respond(dispatcher: &Arc<Dispatcher>, line: &str) -> String {
    match LineRequest::parse(line) {
        Ok(LineRequest::IsAlive) => alive_line(),
        Ok(LineRequest::Dispatch(request)) => match dispatcher.execute_with_deadline(request).await {
            Ok(outcome) => ok_line(&outcome),
            Err(e) => error_line(&e),
        },
        Err(e) => reject(dispatcher, &e),
    }
}

fn reject(dispatcher: &Arc<Dispatcher>, e: &DispatchError) -> String {
    dispatcher.metrics().increment_operations_rejected();
    log_event_with_fields(
        Event::RequestRejected,
        &[("listener", "line"), ("code", e.code()), ("error", &e.to_string())],
    );
    error_line(e)
}

/// One framed read from a connection
#[derive(Debug, PartialEq)]
enum LineRead {
    Line(String),
    TooLong,
    Eof,
}

/// Read one request line of at most `max_bytes` bytes, terminator included.
///
/// An over-long line is consumed through its terminator before `TooLong` is
/// returned. A final line without a terminator is still returned. Invalid UTF-8 is
/// replaced rather than rejected, so the request parser reports the error.
async fn read_request_line<R>(reader: &mut R, max_bytes: usize) -> io::Result<LineRead>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    let read = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;

    if read == 0 {
        return Ok(LineRead::Eof);
    }
    if buf.last() != Some(&b'\n') && read == max_bytes {
        loop {
            buf.clear();
            let skipped = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;
            if skipped == 0 || buf.last() == Some(&b'\n') {
                return Ok(LineRead::TooLong);
            }
        }
    }

    let line = String::from_utf8_lossy(&buf);
    Ok(LineRead::Line(line.trim_end_matches(['\r', '\n']).to_string()))
}

async fn serve_connection(
    dispatcher: Arc<Dispatcher>,
    stream: TcpStream,
    max_line_bytes: usize,
    mut shutdown: watch::Receiver<bool>,
) -> io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    loop {
        let read = tokio::select! {
            read = read_request_line(&mut reader, max_line_bytes) => read?,
            _ = shutdown_requested(&mut shutdown) => break,
        };

        let mut response = match read {
            LineRead::Eof => break,
            LineRead::Line(line) if line.trim().is_empty() => continue,
            LineRead::Line(line) => respond(&dispatcher, &line).await,
            LineRead::TooLong => {
                let e = DispatchError::InvalidArgument(format!(
                    "request line exceeds {} bytes",
                    max_line_bytes
                ));
                reject(&dispatcher, &e)
            }
        };
        response.push('\n');
        writer.write_all(response.as_bytes()).await?;
    }

    writer.shutdown().await
}
