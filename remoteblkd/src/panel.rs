/// Administrative control panel — everything outside the block protocol.
///
/// These routes are operator conveniences and are never invoked by the
/// remote adapter: an HTML index, an explicit save-to-disk action, a raw
/// image download, and a hex dump of the whole buffer. Saving is the only
/// path from the buffer to disk.
use std::path::Path;
use std::sync::Arc;

use log::{info, warn};
use spin::RwLock;

use remoteblk::proto::http::{trim_route, Method, Request, Response};
use remoteblk::store::BlockStore;

/// Bytes rendered per hex dump row.
const HEX_DUMP_WIDTH: usize = 32;

pub fn handle(
    request: &Request,
    store: &Arc<RwLock<BlockStore>>,
    image: &Path,
) -> Option<Response> {
    if request.method != Method::Get {
        return None;
    }
    match trim_route(&request.path) {
        "/" => Some(index(store)),
        "/save" => Some(save(store, image)),
        "/download" => Some(download(store)),
        "/hexdump" => Some(hexdump(store)),
        _ => None,
    }
}

fn index(store: &Arc<RwLock<BlockStore>>) -> Response {
    let geometry = store.read().geometry();
    let body = format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en-US\">\n\
         <head><meta charset=\"utf-8\"><title>remoteblkd control panel</title></head>\n\
         <body>\n\
         <h1>remoteblkd control panel</h1>\n\
         <p>{} sector(s) of {} byte(s) — {} bytes total.</p>\n\
         <h2>Actions</h2>\n\
         <ul>\n\
         <li><a href=\"/save/\">Save the device image to disk.</a></li>\n\
         <li><a href=\"/download/\">Download the device image.</a></li>\n\
         <li><a href=\"/hexdump/\">Hex dump of the device.</a></li>\n\
         <li><a href=\"/info/\">Geometry as JSON.</a></li>\n\
         </ul>\n\
         </body>\n\
         </html>\n",
        geometry.sector_count,
        geometry.sector_size,
        geometry.total_bytes(),
    );
    Response::ok("text/html", body.into_bytes())
}

/// Write the current buffer back to the image file. Explicit and
/// administrative — the protocol never persists on its own.
fn save(store: &Arc<RwLock<BlockStore>>, image: &Path) -> Response {
    let snapshot = store.read().as_bytes().to_vec();
    match std::fs::write(image, &snapshot) {
        Ok(()) => {
            info!("[panel] saved {} byte(s) to {}", snapshot.len(), image.display());
            let body = format!(
                "<!DOCTYPE html>\n\
                 <html lang=\"en-US\">\n\
                 <head><meta charset=\"utf-8\"><title>remoteblkd control panel</title></head>\n\
                 <body>\n\
                 <h1>remoteblkd control panel</h1>\n\
                 <p>Saved {} byte(s) to the image file.</p>\n\
                 <ul><li><a href=\"/\">Return to the panel.</a></li></ul>\n\
                 </body>\n\
                 </html>\n",
                snapshot.len(),
            );
            Response::ok("text/html", body.into_bytes())
        }
        Err(e) => {
            warn!("[panel] unable to save {}: {}", image.display(), e);
            Response::plain(500, "unable to save the image file")
        }
    }
}

fn download(store: &Arc<RwLock<BlockStore>>) -> Response {
    let snapshot = store.read().as_bytes().to_vec();
    info!("[panel] sending {} byte(s) image download", snapshot.len());
    Response::ok("application/octet-stream", snapshot)
        .with_header("Content-Disposition", "attachment; filename=\"bld.bin\"")
}

fn hexdump(store: &Arc<RwLock<BlockStore>>) -> Response {
    let snapshot = store.read().as_bytes().to_vec();
    Response::ok("text/html", hexdump_html(&snapshot).into_bytes())
}

fn hexdump_html(data: &[u8]) -> String {
    let mut header = String::from("<tr><th>Offset</th>");
    for i in 0..HEX_DUMP_WIDTH {
        header.push_str(&format!("<th>{:x}</th>", i));
    }
    header.push_str("<th>Ascii</th></tr>\n");

    let mut rows = String::new();
    for (row, bytes) in data.chunks(HEX_DUMP_WIDTH).enumerate() {
        let mut cells = String::new();
        let mut ascii = String::new();
        for &byte in bytes {
            cells.push_str(&format!("<td>{:02X}</td>", byte));
            ascii.push(if (0x20..0x7F).contains(&byte) {
                byte as char
            } else {
                '.'
            });
        }
        rows.push_str(&format!(
            "<tr><td>{:#07x}</td>{}<td>{}</td></tr>\n",
            row * HEX_DUMP_WIDTH,
            cells,
            ascii,
        ));
    }

    format!(
        "<!DOCTYPE html>\n\
         <html lang=\"en-US\">\n\
         <head>\n\
         <meta charset=\"utf-8\"><title>remoteblkd hex dump</title>\n\
         <style>table{{font-family:monospace;}}</style>\n\
         </head>\n\
         <body>\n\
         <h1>remoteblkd hex dump</h1>\n\
         <ul><li><a href=\"/\">Return to the panel.</a></li></ul>\n\
         <table>\n<thead>{}</thead>\n<tbody>\n{}</tbody>\n</table>\n\
         </body>\n\
         </html>\n",
        header, rows,
    )
}
