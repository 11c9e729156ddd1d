use std::sync::Arc;

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::{debug, warn};

use crate::http::headers::names;
use crate::http::parser::{ParseError, find_headers_end, parse_http_request};
use crate::http::request::{Method, Request};
use crate::http::response::Response;
use crate::http::status::{ClientError, ServerError, Status};
use crate::http::writer::ResponseWriter;
use crate::router::{ConnectionContext, ConnectionService, Reply};
use crate::server::HttpService;

/// Largest header block accepted before the request is rejected.
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

pub struct Connection<S> {
    stream: S,
    buffer: BytesMut,
    state: ConnectionState,
    service: Arc<HttpService>,
    context: ConnectionContext,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter, bool), // bool = keep_alive?
    Upgrading(Box<dyn ConnectionService>, Bytes),
    Closed,
}

enum Incoming {
    Request(Request),
    Malformed(ParseError),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(stream: S, service: Arc<HttpService>, context: ConnectionContext) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(4096),
            state: ConnectionState::Reading,
            service,
            context,
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    self.state = match self.read_request().await? {
                        Incoming::Request(req) => ConnectionState::Processing(req),
                        Incoming::Malformed(e) => {
                            warn!(peer = ?self.context.peer, error = %e, "malformed request");
                            ConnectionState::Writing(ResponseWriter::new(&rejection(&e)), false)
                        }
                        Incoming::Closed => ConnectionState::Closed,
                    };
                }

                ConnectionState::Processing(req) => {
                    self.state = self.process(req).await;
                }

                ConnectionState::Writing(mut writer, keep_alive) => {
                    writer.write_to_stream(&mut self.stream).await?;

                    if keep_alive {
                        self.state = ConnectionState::Reading; // go back for next request
                    }
                }

                ConnectionState::Upgrading(service, replay) => {
                    debug!(peer = ?self.context.peer, "connection upgraded");
                    return service.serve(Box::new(self.stream), replay).await;
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    async fn read_request(&mut self) -> anyhow::Result<Incoming> {
        loop {
            // Try parsing whatever we already have
            match parse_http_request(&self.buffer) {
                Ok((request, consumed)) => {
                    self.buffer.advance(consumed);
                    return Ok(Incoming::Request(request));
                }

                Err(ParseError::Incomplete) => {
                    if find_headers_end(&self.buffer).is_none() && self.buffer.len() > MAX_HEAD_SIZE {
                        return Ok(Incoming::Malformed(ParseError::Incomplete));
                    }
                }

                Err(e) => return Ok(Incoming::Malformed(e)),
            }

            let n = self.stream.read_buf(&mut self.buffer).await?;

            if n == 0 {
                // Client closed connection
                return Ok(Incoming::Closed);
            }
        }
    }

    async fn process(&mut self, req: Request) -> ConnectionState {
        let include_body = req.method != Method::HEAD;

        match self.service.handle(&req, &self.context).await {
            Reply::Respond(response) => {
                let keep_alive =
                    req.keep_alive() && !response.headers.contains(names::CONNECTION, "close");

                let writer = match ResponseWriter::prepare(response, Some(self.service.cache()), include_body).await {
                    Ok(writer) => writer,
                    Err(e) => {
                        warn!(path = %req.uri, error = %e, "failed to prepare response");
                        ResponseWriter::new(&Response::internal_error())
                    }
                };

                ConnectionState::Writing(writer, keep_alive)
            }

            Reply::Upgrade { service, replay } => {
                let mut bytes = BytesMut::new();
                if let Some(replay) = replay {
                    bytes.extend_from_slice(&replay);
                }
                bytes.extend_from_slice(&self.buffer.split());

                ConnectionState::Upgrading(service, bytes.freeze())
            }
        }
    }
}

/// The response sent before closing a connection whose request could not
/// be read.
fn rejection(error: &ParseError) -> Response {
    let status: Status = match error {
        ParseError::BodyTooLarge(_) => ClientError::PayloadTooLarge.into(),
        ParseError::UnsupportedTransferEncoding(_) => ServerError::NotImplemented.into(),
        _ => Status::BAD_REQUEST,
    };

    Response::new(status)
        .header(names::CONNECTION, "close")
        .body(format!("{} {}", status.code(), status.reason_phrase()))
        .build()
}
