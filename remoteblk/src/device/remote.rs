/// Remote block adapter — implements the block-device contract by
/// translating each call into exactly one HTTP round trip.
///
/// No caching, no retries, no pipelining. A write has fully landed in the
/// server's buffer before the call returns, so a subsequent read through
/// the same adapter always observes it; `sync` therefore has nothing to
/// flush.
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use embedded_io::{Read, Write};

use crate::geometry::Geometry;
use crate::proto::base64;
use crate::proto::http::ResponseHead;
use super::{BlockDevice, DeviceError};

/// Upper bound on one buffered response (headers + base64 body).
const MAX_RESPONSE_BYTES: usize = 8 * 1024 * 1024;

/// Connection factory used by the adapter — one fresh stream per round
/// trip. Implementations pick the platform socket and own its timeout.
pub trait Transport {
    type Stream: Read + Write;
    type Error: core::fmt::Debug;

    fn connect(&mut self) -> Result<Self::Stream, Self::Error>;
}

/// A block device served by a remote block store.
pub struct RemoteBlockDevice<T: Transport> {
    transport: T,
    host: String,
    geometry: Geometry,
}

impl<T: Transport> RemoteBlockDevice<T> {
    /// Negotiate geometry with the server and build the adapter. `host`
    /// fills the HTTP `Host` header on every request.
    pub fn connect(mut transport: T, host: &str) -> Result<Self, DeviceError> {
        let request = format!(
            "GET /info/ HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            host
        );
        let (status, body) = round_trip(&mut transport, request.as_bytes()).map_err(|e| {
            log::warn!("geometry round trip failed: {:?}", e);
            DeviceError::InfoUnavailable
        })?;
        if status != 200 {
            return Err(DeviceError::InfoUnavailable);
        }

        let doc = core::str::from_utf8(&body).map_err(|_| DeviceError::InfoUnavailable)?;
        let geometry = Geometry::from_info_json(doc).ok_or(DeviceError::InfoUnavailable)?;
        log::info!(
            "remote device: {} sector(s) of {} byte(s)",
            geometry.sector_count,
            geometry.sector_size
        );

        Ok(Self {
            transport,
            host: String::from(host),
            geometry,
        })
    }

    /// The geometry negotiated at construction.
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Sectors covered by a transfer buffer. The length must divide
    /// evenly — checked here, before any network traffic.
    fn sectors_for(&self, len: usize) -> Result<u64, DeviceError> {
        let sector_size = self.geometry.sector_size as usize;
        if len % sector_size != 0 {
            return Err(DeviceError::UnalignedBuffer { len });
        }
        Ok((len / sector_size) as u64)
    }
}

impl<T: Transport> BlockDevice for RemoteBlockDevice<T> {
    fn sector_size(&self) -> u32 {
        self.geometry.sector_size
    }

    fn capacity(&self) -> u64 {
        self.geometry.sector_count
    }

    fn read_blocks(&mut self, start_sector: u64, buf: &mut [u8]) -> Result<(), DeviceError> {
        let sector_count = self.sectors_for(buf.len())?;
        let failed = DeviceError::TransferFailed {
            start_sector,
            sector_count,
        };

        let request = format!(
            "GET /data/?ssi={}&sc={} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            start_sector, sector_count, self.host
        );
        let (status, body) = round_trip(&mut self.transport, request.as_bytes()).map_err(|e| {
            log::warn!("read round trip failed: {:?}", e);
            failed
        })?;
        if status != 200 {
            return Err(failed);
        }

        let data = base64::decode(&body).map_err(|_| failed)?;
        if data.len() != buf.len() {
            return Err(DeviceError::LengthMismatch {
                expected: buf.len(),
                actual: data.len(),
            });
        }
        buf.copy_from_slice(&data);
        Ok(())
    }

    fn write_blocks(&mut self, start_sector: u64, buf: &[u8]) -> Result<(), DeviceError> {
        let sector_count = self.sectors_for(buf.len())?;
        let failed = DeviceError::TransferFailed {
            start_sector,
            sector_count,
        };

        let payload = base64::encode(buf);
        let request = format!(
            "POST /data/?ssi={}&sc={} HTTP/1.1\r\nHost: {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            start_sector,
            sector_count,
            self.host,
            payload.len(),
            payload
        );
        let (status, _) = round_trip(&mut self.transport, request.as_bytes()).map_err(|e| {
            log::warn!("write round trip failed: {:?}", e);
            failed
        })?;
        if status != 200 {
            return Err(failed);
        }
        Ok(())
    }

    fn sync(&mut self) -> Result<(), DeviceError> {
        // Every write is already a completed round trip.
        Ok(())
    }
}

/// Why a round trip failed. Collapsed into the public error kinds at the
/// call sites; the detail only reaches the log.
#[derive(Debug)]
enum WireFault {
    Connect,
    Io,
    MalformedResponse,
    ResponseTooLarge,
}

/// One request/response exchange over a fresh stream.
fn round_trip<T: Transport>(
    transport: &mut T,
    request: &[u8],
) -> Result<(u16, Vec<u8>), WireFault> {
    let mut stream = transport.connect().map_err(|_| WireFault::Connect)?;
    stream.write_all(request).map_err(|_| WireFault::Io)?;
    stream.flush().map_err(|_| WireFault::Io)?;

    let mut raw = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).map_err(|_| WireFault::Io)?;
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&chunk[..n]);

        if let Ok(head) = ResponseHead::parse(&raw) {
            if let Some(len) = head.content_length() {
                if raw.len() >= head.body_start + len {
                    let body = raw[head.body_start..head.body_start + len].to_vec();
                    return Ok((head.status, body));
                }
            }
        }
        if raw.len() > MAX_RESPONSE_BYTES {
            return Err(WireFault::ResponseTooLarge);
        }
    }

    // Peer closed. Without a Content-Length the body runs to EOF; with
    // one, a short body means the connection died mid-transfer.
    let head = ResponseHead::parse(&raw).map_err(|_| WireFault::MalformedResponse)?;
    let mut body = raw[head.body_start..].to_vec();
    if let Some(len) = head.content_length() {
        if body.len() < len {
            return Err(WireFault::MalformedResponse);
        }
        body.truncate(len);
    }
    Ok((head.status, body))
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec;
    use core::cell::RefCell;

    use super::*;

    /// Scripted transport: hands out one canned response per connect and
    /// records everything the adapter sends.
    struct ScriptedTransport {
        responses: Vec<Vec<u8>>,
        connects: Rc<RefCell<usize>>,
        sent: Rc<RefCell<Vec<u8>>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<Vec<u8>>) -> Self {
            Self {
                responses,
                connects: Rc::new(RefCell::new(0)),
                sent: Rc::new(RefCell::new(Vec::new())),
            }
        }

        fn counters(&self) -> (Rc<RefCell<usize>>, Rc<RefCell<Vec<u8>>>) {
            (Rc::clone(&self.connects), Rc::clone(&self.sent))
        }
    }

    #[derive(Debug)]
    struct ScriptError;

    impl embedded_io::Error for ScriptError {
        fn kind(&self) -> embedded_io::ErrorKind {
            embedded_io::ErrorKind::Other
        }
    }

    struct ScriptedStream {
        response: Vec<u8>,
        cursor: usize,
        sent: Rc<RefCell<Vec<u8>>>,
    }

    impl embedded_io::ErrorType for ScriptedStream {
        type Error = ScriptError;
    }

    impl embedded_io::Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, ScriptError> {
            let n = (self.response.len() - self.cursor).min(buf.len());
            buf[..n].copy_from_slice(&self.response[self.cursor..self.cursor + n]);
            self.cursor += n;
            Ok(n)
        }
    }

    impl embedded_io::Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> Result<usize, ScriptError> {
            self.sent.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<(), ScriptError> {
            Ok(())
        }
    }

    impl Transport for ScriptedTransport {
        type Stream = ScriptedStream;
        type Error = ScriptError;

        fn connect(&mut self) -> Result<ScriptedStream, ScriptError> {
            *self.connects.borrow_mut() += 1;
            if self.responses.is_empty() {
                return Err(ScriptError);
            }
            Ok(ScriptedStream {
                response: self.responses.remove(0),
                cursor: 0,
                sent: Rc::clone(&self.sent),
            })
        }
    }

    fn http_ok(content_type: &str, body: &str) -> Vec<u8> {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            content_type,
            body.len(),
            body
        )
        .into_bytes()
    }

    fn http_status(status: u16, reason: &str) -> Vec<u8> {
        format!(
            "HTTP/1.1 {} {}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
            status, reason
        )
        .into_bytes()
    }

    const INFO: &str = r#"{"sectorSize":512,"sectorCount":4}"#;

    fn connected(mut responses: Vec<Vec<u8>>) -> RemoteBlockDevice<ScriptedTransport> {
        responses.insert(0, http_ok("application/json", INFO));
        RemoteBlockDevice::connect(ScriptedTransport::new(responses), "dev").unwrap()
    }

    #[test]
    fn connect_negotiates_geometry() {
        let transport = ScriptedTransport::new(vec![http_ok("application/json", INFO)]);
        let (connects, sent) = transport.counters();

        let device = RemoteBlockDevice::connect(transport, "dev").unwrap();
        assert_eq!(device.capacity(), 4);
        assert_eq!(device.sector_size(), 512);
        assert_eq!(*connects.borrow(), 1);

        let sent = sent.borrow();
        let text = core::str::from_utf8(&sent).unwrap();
        assert!(text.starts_with("GET /info/ HTTP/1.1\r\n"));
        assert!(text.contains("Host: dev\r\n"));
    }

    #[test]
    fn connect_fails_on_bad_info() {
        let transport = ScriptedTransport::new(vec![http_ok("application/json", "{}")]);
        let err = RemoteBlockDevice::connect(transport, "dev").unwrap_err();
        assert_eq!(err, DeviceError::InfoUnavailable);

        let transport = ScriptedTransport::new(vec![http_status(500, "Internal Server Error")]);
        let err = RemoteBlockDevice::connect(transport, "dev").unwrap_err();
        assert_eq!(err, DeviceError::InfoUnavailable);
    }

    #[test]
    fn read_blocks_fills_buffer_in_place() {
        let payload: Vec<u8> = (0..512).map(|i| (i % 256) as u8).collect();
        let mut device = connected(vec![http_ok("text/plain", &base64::encode(&payload))]);

        let mut buf = vec![0u8; 512];
        device.read_blocks(2, &mut buf).unwrap();
        assert_eq!(buf, payload);
    }

    #[test]
    fn read_blocks_requests_the_right_range() {
        let payload = vec![0u8; 1024];
        let device_responses = vec![http_ok("text/plain", &base64::encode(&payload))];
        let transport = ScriptedTransport::new(
            [vec![http_ok("application/json", INFO)], device_responses].concat(),
        );
        let (_, sent) = transport.counters();

        let mut device = RemoteBlockDevice::connect(transport, "dev").unwrap();
        let mut buf = vec![0u8; 1024];
        device.read_blocks(1, &mut buf).unwrap();

        let sent = sent.borrow();
        let text = core::str::from_utf8(&sent).unwrap();
        assert!(text.contains("GET /data/?ssi=1&sc=2 HTTP/1.1\r\n"));
    }

    #[test]
    fn unaligned_buffer_rejected_before_any_connect() {
        let mut device = connected(vec![]);
        let (connects, _) = device.transport.counters();
        let after_info = *connects.borrow();

        let mut buf = vec![0u8; 1000];
        assert_eq!(
            device.read_blocks(0, &mut buf),
            Err(DeviceError::UnalignedBuffer { len: 1000 })
        );
        assert_eq!(
            device.write_blocks(0, &buf),
            Err(DeviceError::UnalignedBuffer { len: 1000 })
        );
        assert_eq!(*connects.borrow(), after_info);
    }

    #[test]
    fn non_success_status_is_transfer_failed() {
        let mut device = connected(vec![http_status(400, "Bad Request")]);
        let mut buf = vec![0u8; 512];
        assert_eq!(
            device.read_blocks(9, &mut buf),
            Err(DeviceError::TransferFailed {
                start_sector: 9,
                sector_count: 1
            })
        );
    }

    #[test]
    fn short_read_payload_is_length_mismatch() {
        let mut device = connected(vec![http_ok("text/plain", &base64::encode(&[0u8; 256]))]);
        let mut buf = vec![0u8; 512];
        assert_eq!(
            device.read_blocks(0, &mut buf),
            Err(DeviceError::LengthMismatch {
                expected: 512,
                actual: 256
            })
        );
    }

    #[test]
    fn write_blocks_posts_encoded_payload() {
        let payload = vec![0xCDu8; 512];
        let transport = ScriptedTransport::new(vec![
            http_ok("application/json", INFO),
            http_ok("text/plain", ""),
        ]);
        let (_, sent) = transport.counters();

        let mut device = RemoteBlockDevice::connect(transport, "dev").unwrap();
        device.write_blocks(3, &payload).unwrap();

        let sent = sent.borrow();
        let text = core::str::from_utf8(&sent).unwrap();
        assert!(text.contains("POST /data/?ssi=3&sc=1 HTTP/1.1\r\n"));
        assert!(text.ends_with(&base64::encode(&payload)));
    }

    #[test]
    fn failed_write_is_transfer_failed() {
        let mut device = connected(vec![http_status(400, "Bad Request")]);
        assert_eq!(
            device.write_blocks(3, &[0u8; 1024]),
            Err(DeviceError::TransferFailed {
                start_sector: 3,
                sector_count: 2
            })
        );
    }

    #[test]
    fn sync_is_a_no_op() {
        let mut device = connected(vec![]);
        let (connects, _) = device.transport.counters();
        let before = *connects.borrow();
        device.sync().unwrap();
        assert_eq!(*connects.borrow(), before);
    }
}
