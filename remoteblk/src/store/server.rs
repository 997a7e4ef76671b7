/// Threaded TCP front end for the block service.
///
/// One thread per connection, one request per connection — the adapter
/// opens a fresh connection for every round trip, so keep-alive buys
/// nothing here. Bounded by a per-connection socket timeout and a request
/// size cap; malformed input becomes a 400 response, never a crash.
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::vec::Vec;

use crate::proto::http::{ParseError, Request, Response};
use super::BlockService;

/// Per-connection socket timeout.
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(10);

/// Upper bound on one buffered request (headers + base64 body).
const MAX_REQUEST_BYTES: usize = 8 * 1024 * 1024;

/// Serve the block protocol on `listener` until the process exits.
///
/// `fallback` sees the requests the protocol does not route (the
/// daemon's administrative panel); anything it declines is a 404.
pub fn serve<F>(listener: TcpListener, service: BlockService, fallback: Arc<F>) -> std::io::Result<()>
where
    F: Fn(&Request) -> Option<Response> + Send + Sync + 'static,
{
    for stream in listener.incoming() {
        match stream {
            Ok(stream) => {
                let service = service.clone();
                let fallback = Arc::clone(&fallback);
                thread::spawn(move || handle_connection(stream, &service, fallback.as_ref()));
            }
            Err(e) => log::warn!("accept failed: {}", e),
        }
    }
    Ok(())
}

fn handle_connection<F>(mut stream: TcpStream, service: &BlockService, fallback: &F)
where
    F: Fn(&Request) -> Option<Response>,
{
    if stream.set_read_timeout(Some(CONNECTION_TIMEOUT)).is_err()
        || stream.set_write_timeout(Some(CONNECTION_TIMEOUT)).is_err()
    {
        return;
    }

    let request = match read_request(&mut stream) {
        Ok(Some(request)) => request,
        // Peer went away (or stalled past the timeout) without a full
        // request — nothing to answer.
        Ok(None) => return,
        Err(response) => {
            finish(stream, &response);
            return;
        }
    };

    let response = service
        .handle(&request)
        .or_else(|| fallback(&request))
        .unwrap_or_else(Response::not_found);
    finish(stream, &response);
}

/// Buffer the socket until a full request parses.
fn read_request(stream: &mut TcpStream) -> Result<Option<Request>, Response> {
    let mut raw = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) => return Ok(None),
            Ok(n) => n,
            Err(_) => return Ok(None),
        };
        raw.extend_from_slice(&chunk[..n]);

        match Request::parse(&raw) {
            Ok(request) => return Ok(Some(request)),
            Err(ParseError::Incomplete) if raw.len() <= MAX_REQUEST_BYTES => {}
            Err(ParseError::Incomplete) => {
                return Err(Response::plain(413, "request too large"));
            }
            Err(ParseError::Malformed) => {
                return Err(Response::bad_request("malformed request"));
            }
        }
    }
}

fn finish(mut stream: TcpStream, response: &Response) {
    if let Err(e) = stream
        .write_all(&response.encode())
        .and_then(|_| stream.flush())
    {
        log::warn!("failed to write response: {}", e);
    }
    let _ = stream.shutdown(Shutdown::Both);
}
