// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use args::{Args, DisplayKind};
use clap::Parser;
use r7_video::{extract_metadata, Api, Config, DeviceId, ErrorKind, TOTAL_SLOTS};
use serde_json::json;
use std::{error::Error, time::Instant};
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, Layer, Registry};

mod args;

fn init_logging(verbose: bool) -> Result<(), Box<dyn Error>> {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let stdout_log = tracing_subscriber::fmt::layer().with_filter(level);
    let journald = match tracing_journald::layer() {
        Ok(journald) => Some(journald.with_filter(level)),
        Err(_) => None,
    };

    let subscriber = Registry::default().with(stdout_log).with(journald);
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    let api = Api::new(Config::from(&args));
    api.init()?;

    let result = run(&api, &args);
    if let Err(e) = api.deinit() {
        warn!("deinit failed: {}", e);
    }
    result
}

fn run(api: &Api, args: &Args) -> Result<(), Box<dyn Error>> {
    if args.info {
        print_info(api)?;
    }

    if args.version_r7 {
        println!("{}", api.coprocessor_version()?);
    }

    if let (Some(kind), Some(id)) = (args.display, args.display_id) {
        let device = match kind {
            DisplayKind::Camera => DeviceId::Camera(id),
            DisplayKind::Streamer => DeviceId::Streamer(id),
        };
        api.display(device)?;
        info!("{} routed to display", device);
    }

    if let Some(camera) = args.camera {
        read_frames(api, DeviceId::Camera(camera), args)?;
    }

    if args.reboot {
        api.reboot_coprocessor()?;
    }

    Ok(())
}

fn print_info(api: &Api) -> Result<(), Box<dyn Error>> {
    let registry = api.registry()?;
    let devices: Vec<_> = (0..TOTAL_SLOTS)
        .filter_map(|id| registry.resolve(id))
        .map(|entry| {
            let attr = entry.attributes();
            json!({
                "id": entry.id(),
                "kind": entry.kind().name(),
                "width": attr.width,
                "height": attr.height,
                "data_type": attr.data_type,
                "buffer_size": attr.buffer_size,
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&json!({ "devices": devices }))?);
    Ok(())
}

fn read_frames(api: &Api, cam: DeviceId, args: &Args) -> Result<(), Box<dyn Error>> {
    let attr = api.attributes(cam)?;
    let mut frame = vec![0u8; attr.buffer_size as usize];
    api.open(cam)?;

    for index in 0..args.frames {
        let now = Instant::now();
        let ready = match api.poll(&[cam], Some(args.timeout())) {
            Ok(ready) => ready,
            Err(e) => {
                error!("poll failed: {}", e);
                break;
            }
        };
        if ready & 1 == 0 {
            warn!("{} frame {} timed out", cam, index);
            continue;
        }

        let len = match api.read(cam, &mut frame) {
            Ok(len) => len,
            Err(e) if e.kind() == ErrorKind::Fail => {
                warn!("{} frame {} read failed: {}", cam, index, e);
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if len == 0 {
            warn!("{} reached end of stream", cam);
            break;
        }
        let read_time = now.elapsed();

        match extract_metadata(&frame[..len]) {
            Ok(meta) => info!(
                "{} frame {}: {}x{}x{} ts: {} size: {} read: {:?}",
                cam, index, meta.width, meta.height, meta.bpp, meta.timestamp, len, read_time
            ),
            Err(_) => info!(
                "{} frame {}: size: {} read: {:?} (no trailer)",
                cam, index, len, read_time
            ),
        }
    }

    api.close(cam)?;
    Ok(())
}
