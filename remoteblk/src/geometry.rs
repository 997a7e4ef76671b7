/// Device geometry — the (sector size, sector count) pair both ends must
/// agree on.
///
/// The server fixes the sector size and reports the geometry on
/// `GET /info/`; the client adopts the reported values at construction
/// and never infers its own.
use alloc::format;
use alloc::string::String;

/// Bytes per sector. Every transfer length is a multiple of this.
pub const SECTOR_SIZE: u32 = 512;

static_assertions::const_assert!(SECTOR_SIZE.is_power_of_two());

/// Negotiated device geometry. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Bytes per sector.
    pub sector_size: u32,
    /// Total sectors on the device.
    pub sector_count: u64,
}

impl Geometry {
    /// Geometry with the standard sector size.
    pub fn new(sector_count: u64) -> Self {
        Self {
            sector_size: SECTOR_SIZE,
            sector_count,
        }
    }

    /// Total addressable bytes.
    pub fn total_bytes(&self) -> u64 {
        self.sector_size as u64 * self.sector_count
    }

    /// Check a sector range: `start < sector_count` and
    /// `start + requested <= sector_count`, overflow-safe.
    pub fn contains(&self, start_sector: u64, sector_count: u64) -> bool {
        if start_sector >= self.sector_count {
            return false;
        }
        match start_sector.checked_add(sector_count) {
            Some(end) => end <= self.sector_count,
            None => false,
        }
    }

    /// Render the `/info/` document.
    pub fn to_info_json(&self) -> String {
        format!(
            r#"{{"sectorSize":{},"sectorCount":{}}}"#,
            self.sector_size, self.sector_count
        )
    }

    /// Parse the `/info/` document. `None` if either field is missing,
    /// malformed, or the sector size is unusable.
    pub fn from_info_json(doc: &str) -> Option<Self> {
        let sector_size = json_u64_field(doc, "sectorSize")?;
        let sector_count = json_u64_field(doc, "sectorCount")?;
        if sector_size == 0 || sector_size > u32::MAX as u64 {
            return None;
        }
        Some(Self {
            sector_size: sector_size as u32,
            sector_count,
        })
    }
}

/// Extract an unsigned integer field from a flat JSON object by scanning
/// for `"key"` and reading the digits after the colon.
fn json_u64_field(doc: &str, key: &str) -> Option<u64> {
    let marker = format!("\"{}\"", key);
    let at = doc.find(&marker)? + marker.len();
    let rest = doc[at..].trim_start().strip_prefix(':')?.trim_start();
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    rest[..end].parse().ok()
}
