//! Transport over the operating system's TCP stack.
//!
//! # Design
//! A request walks through three handles: a `Session` (resolved addresses
//! and the overall deadline), a `Connection` (the connected socket) and a
//! `Request` (the exchange on that socket, holding bytes read past the
//! response head). They are acquired in that order and, being plain values,
//! released in reverse order on every return path.
//!
//! The request is sent as HTTP/1.0 with `Connection: close`, so the body is
//! delimited either by `Content-Length` or by the server closing the socket.
//! Chunked responses are rejected as malformed.

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use super::{Transport, CHUNK_SIZE, USER_AGENT};
use crate::buffer::ResponseBuffer;
use crate::config::Endpoint;
use crate::error::TransportError;
use crate::http::HttpResponse;

const MAX_HEAD_BYTES: usize = 64 * 1024;
const MAX_HEADERS: usize = 64;

/// Blocking HTTP client built directly on `std::net::TcpStream`.
#[derive(Debug, Clone)]
pub struct NativeTransport {
    endpoint: Endpoint,
}

impl NativeTransport {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

impl Transport for NativeTransport {
    fn post(&self, body: &[u8]) -> Result<HttpResponse, TransportError> {
        let started = Instant::now();

        let session = Session::open(&self.endpoint, started)?;
        let mut connection = session.connect()?;
        let mut request = connection.send(&self.endpoint, body)?;
        let head = request.receive_head()?;
        debug!("native: status {} from {}", head.status, self.endpoint.authority());

        let mut buffer = ResponseBuffer::new()?;
        request.read_body(&head, &mut buffer)?;

        let elapsed = started.elapsed();
        info!(
            "native: POST {} -> {} ({} bytes in {:.3}s)",
            self.endpoint.url(),
            head.status,
            buffer.len(),
            elapsed.as_secs_f64()
        );
        Ok(HttpResponse::from_buffer(buffer, head.status, elapsed))
    }
}

struct Session {
    authority: String,
    addrs: Vec<SocketAddr>,
    deadline: Instant,
    timeout: Duration,
}

impl Session {
    fn open(endpoint: &Endpoint, started: Instant) -> Result<Self, TransportError> {
        let authority = endpoint.authority();
        let addrs: Vec<SocketAddr> = authority
            .to_socket_addrs()
            .map_err(|source| TransportError::Connect {
                endpoint: authority.clone(),
                source,
            })?
            .collect();
        debug!("native: {authority} resolved to {addrs:?}");
        Ok(Self {
            authority,
            addrs,
            deadline: started + endpoint.timeout(),
            timeout: endpoint.timeout(),
        })
    }

    fn remaining(&self) -> Result<Duration, TransportError> {
        remaining(self.deadline, self.timeout)
    }

    fn connect(&self) -> Result<Connection, TransportError> {
        let mut last_err = io::Error::new(io::ErrorKind::NotFound, "no addresses resolved");
        for addr in &self.addrs {
            match TcpStream::connect_timeout(addr, self.remaining()?) {
                Ok(stream) => {
                    debug!("native: connected to {addr}");
                    return Ok(Connection {
                        stream,
                        deadline: self.deadline,
                        timeout: self.timeout,
                    });
                }
                Err(e) => last_err = e,
            }
        }
        Err(TransportError::Connect {
            endpoint: self.authority.clone(),
            source: last_err,
        })
    }
}

struct Connection {
    stream: TcpStream,
    deadline: Instant,
    timeout: Duration,
}

impl Connection {
    fn send(&mut self, endpoint: &Endpoint, body: &[u8]) -> Result<Request<'_>, TransportError> {
        let head = format!(
            "POST {} HTTP/1.0\r\n\
             Host: {}\r\n\
             User-Agent: {USER_AGENT}\r\n\
             Content-Type: application/json\r\n\
             Content-Length: {}\r\n\
             Connection: close\r\n\r\n",
            endpoint.path,
            endpoint.authority(),
            body.len()
        );

        let remaining = remaining(self.deadline, self.timeout)?;
        self.stream
            .set_write_timeout(Some(remaining))
            .map_err(TransportError::Send)?;
        self.stream
            .write_all(head.as_bytes())
            .and_then(|()| self.stream.write_all(body))
            .and_then(|()| self.stream.flush())
            .map_err(|e| map_io(e, self.timeout, TransportError::Send))?;
        debug!("native: sent {} byte body", body.len());

        Ok(Request {
            conn: self,
            pending: Vec::new(),
        })
    }

    fn read_chunk(&mut self, chunk: &mut [u8]) -> Result<usize, TransportError> {
        let remaining = remaining(self.deadline, self.timeout)?;
        self.stream
            .set_read_timeout(Some(remaining))
            .map_err(TransportError::Receive)?;
        self.stream
            .read(chunk)
            .map_err(|e| map_io(e, self.timeout, TransportError::Receive))
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

struct ResponseHead {
    status: u16,
    content_length: Option<usize>,
}

struct Request<'c> {
    conn: &'c mut Connection,
    // Bytes read past the end of the response head.
    pending: Vec<u8>,
}

impl Request<'_> {
    fn receive_head(&mut self) -> Result<ResponseHead, TransportError> {
        let mut chunk = [0u8; CHUNK_SIZE];
        loop {
            let n = self.conn.read_chunk(&mut chunk)?;
            if n == 0 {
                return Err(TransportError::Receive(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed before response head",
                )));
            }
            self.pending.extend_from_slice(&chunk[..n]);

            if let Some((head, head_len)) = parse_head(&self.pending)? {
                self.pending.drain(..head_len);
                return Ok(head);
            }
            if self.pending.len() > MAX_HEAD_BYTES {
                return Err(TransportError::Malformed(format!(
                    "response head exceeds {MAX_HEAD_BYTES} bytes"
                )));
            }
        }
    }

    /// Read the body into `buffer`. A read failure after the head stops the
    /// loop and keeps what arrived so far.
    fn read_body(
        &mut self,
        head: &ResponseHead,
        buffer: &mut ResponseBuffer,
    ) -> Result<(), TransportError> {
        let limit = head.content_length.unwrap_or(usize::MAX);

        let first = self.pending.len().min(limit);
        buffer.append(&self.pending[..first])?;
        self.pending.clear();

        let mut chunk = [0u8; CHUNK_SIZE];
        while buffer.len() < limit {
            let n = match self.conn.read_chunk(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    warn!("native: body read stopped after {} bytes: {e}", buffer.len());
                    break;
                }
            };
            let take = n.min(limit - buffer.len());
            buffer.append(&chunk[..take])?;
        }

        if let Some(expected) = head.content_length {
            if buffer.len() < expected {
                warn!("native: body truncated at {} of {expected} bytes", buffer.len());
            }
        }
        Ok(())
    }
}

/// Parse a response head; `Ok(None)` means more bytes are needed.
fn parse_head(bytes: &[u8]) -> Result<Option<(ResponseHead, usize)>, TransportError> {
    let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
    let mut response = httparse::Response::new(&mut headers);
    let head_len = match response.parse(bytes) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => return Ok(None),
        Err(e) => return Err(TransportError::Malformed(e.to_string())),
    };

    let status = response
        .code
        .ok_or_else(|| TransportError::Malformed("missing status code".to_string()))?;

    let mut content_length = None;
    for header in response.headers.iter() {
        if header.name.eq_ignore_ascii_case("content-length") {
            let value = std::str::from_utf8(header.value)
                .ok()
                .and_then(|v| v.trim().parse::<usize>().ok())
                .ok_or_else(|| TransportError::Malformed("invalid Content-Length".to_string()))?;
            content_length = Some(value);
        } else if header.name.eq_ignore_ascii_case("transfer-encoding")
            && header.value.eq_ignore_ascii_case(b"chunked")
        {
            return Err(TransportError::Malformed(
                "chunked transfer encoding is not supported".to_string(),
            ));
        }
    }

    Ok(Some((
        ResponseHead {
            status,
            content_length,
        },
        head_len,
    )))
}

fn remaining(deadline: Instant, timeout: Duration) -> Result<Duration, TransportError> {
    deadline
        .checked_duration_since(Instant::now())
        .filter(|d| !d.is_zero())
        .ok_or(TransportError::Timeout(timeout))
}

fn map_io(
    err: io::Error,
    timeout: Duration,
    otherwise: fn(io::Error) -> TransportError,
) -> TransportError {
    match err.kind() {
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportError::Timeout(timeout),
        _ => otherwise(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread::{self, JoinHandle};

    /// Read one request (head plus `Content-Length` body) from `stream`.
    fn read_request(stream: &mut TcpStream) -> Vec<u8> {
        let mut data = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            if let Some(pos) = data.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&data[..pos]).to_ascii_lowercase();
                let len: usize = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .map(|v| v.trim().parse().unwrap())
                    .unwrap_or(0);
                if data.len() >= pos + 4 + len {
                    return data;
                }
            }
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                return data;
            }
            data.extend_from_slice(&chunk[..n]);
        }
    }

    /// Accept one connection, read its request, then run `script`.
    fn serve_once<F>(script: F) -> (Endpoint, JoinHandle<Vec<u8>>)
    where
        F: FnOnce(&mut TcpStream) + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            script(&mut stream);
            request
        });
        let endpoint = Endpoint {
            host: "127.0.0.1".to_string(),
            port,
            ..Endpoint::default()
        };
        (endpoint, handle)
    }

    #[test]
    fn body_delivered_in_two_chunks_is_concatenated() {
        let (endpoint, server) = serve_once(|stream| {
            stream.write_all(b"HTTP/1.0 200 OK\r\n\r\n{\"resp").unwrap();
            stream.flush().unwrap();
            thread::sleep(Duration::from_millis(50));
            stream.write_all(b"onse\":\"hi\"}").unwrap();
        });

        let body = br#"{"message":"hi","model":"llama3.2:3b","parameters":{}}"#;
        let resp = NativeTransport::new(endpoint).post(body).unwrap();
        assert_eq!(resp.status_code(), 200);
        assert_eq!(resp.content(), br#"{"response":"hi"}"#);
        assert_eq!(resp.response_size(), 17);

        let request = String::from_utf8(server.join().unwrap()).unwrap();
        assert!(request.starts_with("POST /api/chat HTTP/1.0\r\n"));
        assert!(request.contains("Content-Type: application/json\r\n"));
        assert!(request.contains(&format!("Content-Length: {}\r\n", body.len())));
        assert!(request.ends_with(std::str::from_utf8(body).unwrap()));
    }

    #[test]
    fn content_length_ends_the_body_without_waiting_for_close() {
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let (endpoint, server) = serve_once(move |stream| {
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhello")
                .unwrap();
            stream.flush().unwrap();
            let _ = done_rx.recv();
        });

        let resp = NativeTransport::new(endpoint).post(b"{}").unwrap();
        done_tx.send(()).unwrap();
        assert_eq!(resp.content(), b"hello");
        server.join().unwrap();
    }

    #[test]
    fn empty_body_yields_empty_content() {
        let (endpoint, server) = serve_once(|stream| {
            stream
                .write_all(b"HTTP/1.0 200 OK\r\nContent-Length: 0\r\n\r\n")
                .unwrap();
        });
        let resp = NativeTransport::new(endpoint).post(b"{}").unwrap();
        assert_eq!(resp.status_code(), 200);
        assert_eq!(resp.response_size(), 0);
        assert_eq!(resp.text(), "");
        server.join().unwrap();
    }

    #[test]
    fn large_body_spans_many_chunks() {
        let payload = vec![b'x'; 3 * CHUNK_SIZE + 17];
        let sent = payload.clone();
        let (endpoint, server) = serve_once(move |stream| {
            stream.write_all(b"HTTP/1.0 200 OK\r\n\r\n").unwrap();
            stream.write_all(&sent).unwrap();
        });
        let resp = NativeTransport::new(endpoint).post(b"{}").unwrap();
        assert_eq!(resp.content(), &payload[..]);
        server.join().unwrap();
    }

    #[test]
    fn non_success_status_is_returned_as_data() {
        let (endpoint, server) = serve_once(|stream| {
            stream
                .write_all(b"HTTP/1.0 500 Internal Server Error\r\n\r\nboom")
                .unwrap();
        });
        let resp = NativeTransport::new(endpoint).post(b"{}").unwrap();
        assert_eq!(resp.status_code(), 500);
        assert_eq!(resp.content(), b"boom");
        server.join().unwrap();
    }

    #[test]
    fn connection_refused_is_a_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let endpoint = Endpoint {
            host: "127.0.0.1".to_string(),
            port,
            ..Endpoint::default()
        };
        let err = NativeTransport::new(endpoint).post(b"{}").unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }), "{err:?}");
    }

    #[test]
    fn close_before_head_is_a_receive_error() {
        let (endpoint, server) = serve_once(|_stream| {});
        let err = NativeTransport::new(endpoint).post(b"{}").unwrap_err();
        assert!(matches!(err, TransportError::Receive(_)), "{err:?}");
        server.join().unwrap();
    }

    #[test]
    fn garbage_head_is_malformed() {
        let (endpoint, server) = serve_once(|stream| {
            stream.write_all(b"NOT HTTP AT ALL\r\n\r\n").unwrap();
        });
        let err = NativeTransport::new(endpoint).post(b"{}").unwrap_err();
        assert!(matches!(err, TransportError::Malformed(_)), "{err:?}");
        server.join().unwrap();
    }

    #[test]
    fn chunked_encoding_is_malformed() {
        let (endpoint, server) = serve_once(|stream| {
            stream
                .write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nhello\r\n0\r\n\r\n")
                .unwrap();
        });
        let err = NativeTransport::new(endpoint).post(b"{}").unwrap_err();
        assert!(matches!(err, TransportError::Malformed(_)), "{err:?}");
        server.join().unwrap();
    }

    #[test]
    fn silent_server_times_out() {
        let (done_tx, done_rx) = mpsc::channel::<()>();
        let (mut endpoint, server) = serve_once(move |_stream| {
            let _ = done_rx.recv();
        });
        endpoint.timeout_secs = 1;

        let err = NativeTransport::new(endpoint).post(b"{}").unwrap_err();
        done_tx.send(()).unwrap();
        assert!(matches!(err, TransportError::Timeout(_)), "{err:?}");
        server.join().unwrap();
    }
}
