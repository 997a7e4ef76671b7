//! remoteblkd — the block store service daemon.
//!
//! Owns the device image in memory and serves it over HTTP: the block
//! protocol (`/info/`, `/data/`) plus an administrative control panel
//! (`/`, `/save/`, `/download/`, `/hexdump/`). Writes mutate only the
//! in-memory buffer; the image file on disk changes when `/save/` is
//! requested, never as a side effect of the protocol.
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use log::{error, info};
use spin::RwLock;

use remoteblk::geometry::Geometry;
use remoteblk::proto::http::Request;
use remoteblk::store::{serve, BlockService, BlockStore};

mod logger;
mod panel;

/// Daemon configuration, from CLI flags.
struct Config {
    addr: String,
    port: u16,
    image: PathBuf,
    sector_count: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: String::from("0.0.0.0"),
            port: 8080,
            image: PathBuf::from("./bld.bin"),
            sector_count: 512, // 512 * 512 B = 256 KiB
        }
    }
}

const USAGE: &str = "usage: remoteblkd [--addr HOST] [--port PORT] [--image PATH] [--sectors N]";

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Config, String> {
    let mut config = Config::default();
    while let Some(flag) = args.next() {
        match flag.as_str() {
            "--addr" => config.addr = take_value(&mut args, "--addr")?,
            "--port" => {
                config.port = take_value(&mut args, "--port")?
                    .parse()
                    .map_err(|_| String::from("--port expects a port number"))?
            }
            "--image" => config.image = PathBuf::from(take_value(&mut args, "--image")?),
            "--sectors" => {
                config.sector_count = take_value(&mut args, "--sectors")?
                    .parse()
                    .map_err(|_| String::from("--sectors expects a sector count"))?
            }
            "--help" | "-h" => return Err(String::from(USAGE)),
            other => return Err(format!("unknown flag: {}\n{}", other, USAGE)),
        }
    }
    if config.sector_count == 0 {
        return Err(String::from("--sectors must be at least 1"));
    }
    Ok(config)
}

fn take_value(args: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
    args.next().ok_or_else(|| format!("{} expects a value", flag))
}

fn main() -> ExitCode {
    logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("{}", message);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), String> {
    let config = parse_args(std::env::args().skip(1))?;
    let geometry = Geometry::new(config.sector_count);

    let image = load_image(&config, geometry)?;
    let store = Arc::new(RwLock::new(
        BlockStore::from_image(geometry, image)
            .map_err(|e| format!("{}: {}", config.image.display(), e))?,
    ));
    let service = BlockService::new(Arc::clone(&store));

    let listener = TcpListener::bind((config.addr.as_str(), config.port))
        .map_err(|e| format!("unable to bind {}:{}: {}", config.addr, config.port, e))?;
    info!(
        "[serve] {} sector(s) of {} byte(s) on http://{}:{}",
        geometry.sector_count, geometry.sector_size, config.addr, config.port
    );

    let image_path = config.image.clone();
    let fallback = Arc::new(move |request: &Request| panel::handle(request, &store, &image_path));
    serve(listener, service, fallback).map_err(|e| e.to_string())
}

/// Load the device image, creating a zero-filled one when missing.
fn load_image(config: &Config, geometry: Geometry) -> Result<Vec<u8>, String> {
    let path = &config.image;
    if !path.exists() {
        info!(
            "[image] {} not found, creating {} sector(s) of {} byte(s)",
            path.display(),
            geometry.sector_count,
            geometry.sector_size
        );
        let blank = vec![0u8; geometry.total_bytes() as usize];
        std::fs::write(path, &blank)
            .map_err(|e| format!("unable to create {}: {}", path.display(), e))?;
        return Ok(blank);
    }

    info!("[image] loading {}", path.display());
    std::fs::read(path).map_err(|e| format!("unable to read {}: {}", path.display(), e))
}
