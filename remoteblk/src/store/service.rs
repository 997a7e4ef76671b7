/// Protocol request handling — maps one parsed HTTP request to one
/// response against the shared store.
///
/// The store is injected as `Arc<RwLock<_>>`, never held as ambient
/// global state. Encoding and decoding happen outside the lock; only the
/// sector copy runs under it. Reads share the lock, writes take it
/// exclusively, so a reader can never observe a half-written range.
use alloc::string::ToString;
use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::RwLock;

use crate::proto::base64;
use crate::proto::http::{trim_route, Method, Request, Response};
use super::BlockStore;

/// The block store service: answers `/info/` and `/data/`.
#[derive(Clone)]
pub struct BlockService {
    store: Arc<RwLock<BlockStore>>,
}

impl BlockService {
    pub fn new(store: Arc<RwLock<BlockStore>>) -> Self {
        Self { store }
    }

    /// Handle one protocol request. `None` for routes outside the block
    /// protocol, so a front end can layer administrative routes on top.
    pub fn handle(&self, request: &Request) -> Option<Response> {
        match (request.method, trim_route(&request.path)) {
            (Method::Get, "/info") => Some(self.info()),
            (Method::Get, "/data") => Some(self.read(request)),
            (Method::Post, "/data") => Some(self.write(request)),
            _ => None,
        }
    }

    /// `GET /info/` — report the geometry. Always succeeds.
    fn info(&self) -> Response {
        let geometry = self.store.read().geometry();
        Response::ok("application/json", geometry.to_info_json().into_bytes())
    }

    /// `GET /data/?ssi=&sc=` — serve a sector range, base64-encoded.
    fn read(&self, request: &Request) -> Response {
        let (start_sector, sector_count) = match sector_range_params(request) {
            Some(range) => range,
            None => return Response::bad_request("missing or invalid ssi/sc query parameter"),
        };

        let copy = match self.store.read().read_sectors(start_sector, sector_count) {
            Ok(copy) => copy,
            Err(e) => {
                log::warn!(
                    "rejected read of {} sector(s) at #{}: {}",
                    sector_count,
                    start_sector,
                    e
                );
                return Response::bad_request(&e.to_string());
            }
        };

        log::debug!("read {} sector(s) at #{}", sector_count, start_sector);
        Response::ok("text/plain", base64::encode(&copy).into_bytes())
    }

    /// `POST /data/?ssi=&sc=` — accept a sector range. The payload is
    /// decoded and validated before the write lock is taken, so a
    /// rejected request provably never touches the buffer.
    fn write(&self, request: &Request) -> Response {
        let (start_sector, sector_count) = match sector_range_params(request) {
            Some(range) => range,
            None => return Response::bad_request("missing or invalid ssi/sc query parameter"),
        };

        let payload = match base64::decode(&request.body) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!(
                    "rejected write of {} sector(s) at #{}: {}",
                    sector_count,
                    start_sector,
                    e
                );
                return Response::bad_request("payload is not valid base64");
            }
        };

        match self
            .store
            .write()
            .write_sectors(start_sector, sector_count, &payload)
        {
            Ok(()) => {
                log::debug!("wrote {} sector(s) at #{}", sector_count, start_sector);
                Response::ok("text/plain", Vec::new())
            }
            Err(e) => {
                log::warn!(
                    "rejected write of {} sector(s) at #{}: {}",
                    sector_count,
                    start_sector,
                    e
                );
                Response::bad_request(&e.to_string())
            }
        }
    }
}

fn sector_range_params(request: &Request) -> Option<(u64, u64)> {
    let start_sector = request.query_param("ssi")?.parse().ok()?;
    let sector_count = request.query_param("sc")?.parse().ok()?;
    Some((start_sector, sector_count))
}
