/// Wire protocol — the text-safe payload codec and the small HTTP/1.1
/// subset both ends of the block protocol share.
pub mod base64;
pub mod http;
