// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

mod common;

use common::{default_reply, MockCoprocessor, VERSION};
use r7_video::{
    api::BUFFERS_PER_CAMERA,
    control::{DeviceType, DigitalGains, Exposure, ExposureLimits, VideoState},
    rpc::{Function, Message, Status},
    Api, ErrorKind, N_CAMERA,
};
use std::{error::Error, sync::Arc};

type Fixture = (tempfile::TempDir, Arc<MockCoprocessor>, Api);

fn api(mock: MockCoprocessor) -> Result<Fixture, Box<dyn Error>> {
    let (dir, config) = common::scratch();
    let mock = Arc::new(mock);
    let api = Api::with_channel(config, mock.clone());
    api.init()?;
    Ok((dir, mock, api))
}

fn last_words(mock: &MockCoprocessor) -> [u32; 8] {
    *mock.last_request().unwrap().words()
}

#[test]
fn test_version() -> Result<(), Box<dyn Error>> {
    let (_dir, _mock, api) = api(MockCoprocessor::standard())?;
    assert_eq!(api.coprocessor_version()?, VERSION);
    Ok(())
}

#[test]
fn test_registers() -> Result<(), Box<dyn Error>> {
    let mock = MockCoprocessor::standard().with_responder(|req| {
        if req.function() == Function::SetRegister.id() && req.args()[1] == 0x3000 {
            Message::reply(req.function(), Status::Blocked, &[])
        } else if req.function() == Function::GetRegister.id() && req.args()[1] == 0x0F00 {
            Message::reply(req.function(), Status::Ok, &[0x1_0042])
        } else {
            default_reply(req)
        }
    });
    let (_dir, mock, api) = api(mock)?;

    assert_eq!(api.camera_get_register(1, 0x0100)?, 0x42);
    assert_eq!(last_words(&mock), [2, 1, 0x0100, 0, 0, 0, 0, 0]);

    api.camera_set_register(3, 0x0202, 0x1234)?;
    assert_eq!(last_words(&mock), [3, 3, 0x0202, 0x1234, 0, 0, 0, 0]);

    let err = api.camera_set_register(0, 0x3000, 1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Blocked);

    // A value wider than a register is not truncated.
    let err = api.camera_get_register(0, 0x0F00).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fail);

    let before = mock.exchanges();
    let err = api.camera_get_register(N_CAMERA, 0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParam);
    assert_eq!(mock.exchanges(), before);
    Ok(())
}

#[test]
fn test_display_commands() -> Result<(), Box<dyn Error>> {
    let (_dir, mock, api) = api(MockCoprocessor::standard())?;

    api.set_cropping(10, 20, 300, 200)?;
    assert_eq!(last_words(&mock), [11, 10, 20, 300, 200, 0, 0, 0]);

    let before = mock.exchanges();
    for (x1, y1, x2, y2) in [(10, 20, 10, 200), (10, 200, 300, 20)] {
        let err = api.set_cropping(x1, y1, x2, y2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidParam);
    }
    assert_eq!(mock.exchanges(), before);

    api.blending_on(1)?;
    assert_eq!(last_words(&mock)[..2], [9, 17]);
    assert_eq!(
        api.blending_on(2).unwrap_err().kind(),
        ErrorKind::InvalidParam
    );
    api.blending_off()?;
    assert_eq!(last_words(&mock)[0], 10);
    Ok(())
}

#[test]
fn test_system_commands() -> Result<(), Box<dyn Error>> {
    let (_dir, mock, api) = api(MockCoprocessor::standard())?;

    api.camera_set_fps(2, 30)?;
    assert_eq!(last_words(&mock)[..3], [4, 2, 30]);
    assert_eq!(api.camera_set_fps(2, 0).unwrap_err().kind(), ErrorKind::InvalidParam);

    api.set_heartbeat(true)?;
    assert_eq!(last_words(&mock)[..2], [6, 1]);
    api.set_boot_mode(2)?;
    assert_eq!(last_words(&mock)[..2], [7, 2]);
    api.reboot_coprocessor()?;
    assert_eq!(last_words(&mock)[0], 5);

    assert_eq!(api.monitoring_info()?, [0; 6]);
    Ok(())
}

#[test]
fn test_control_requests() -> Result<(), Box<dyn Error>> {
    let (_dir, mock, api) = api(MockCoprocessor::standard())?;

    let exposure = Exposure {
        exposure: 1200,
        gain: 16,
    };
    api.camera_set_exposure(1, exposure)?;
    assert_eq!(last_words(&mock), [15, 0, 1, 1, 1200, 16, 0, 0]);

    // The model echoes the parameters, so a get reads back what was sent.
    let payload = api.control(DeviceType::Camera, 0, 0, &[7, 8])?;
    assert_eq!(payload[..2], [7, 8]);

    let gains = DigitalGains {
        red: 1,
        green_red: 2,
        green_blue: 3,
        blue: 4,
    };
    api.camera_set_digital_gains(0, gains)?;
    assert_eq!(last_words(&mock)[4..], [1, 2, 3, 4]);

    let limits = ExposureLimits {
        min_exposure: 100,
        max_exposure: 10,
        min_gain: 0,
        max_gain: 1,
    };
    let err = api.camera_set_exposure_limits(0, limits).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParam);

    api.pipeline_configure(3, 640, 480)?;
    assert_eq!(last_words(&mock), [15, 1, 3, 0, 640, 480, 0, 0]);
    let err = api.pipeline_start(8).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParam);

    api.video_set_state(VideoState::Running)?;
    assert_eq!(last_words(&mock), [15, 2, 0, 0, 1, 0, 0, 0]);

    let err = api.control(DeviceType::Video, 0, 0, &[0; 5]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParam);
    Ok(())
}

#[test]
fn test_commands_require_init() {
    let (_dir, config) = common::scratch();
    let mock = Arc::new(MockCoprocessor::standard());
    let api = Api::with_channel(config, mock.clone());

    assert_eq!(api.set_heartbeat(false).unwrap_err().kind(), ErrorKind::NotInitialized);
    assert_eq!(
        api.camera_get_exposure(0).unwrap_err().kind(),
        ErrorKind::NotInitialized
    );
    assert_eq!(mock.exchanges(), 0);
}

#[test]
fn test_buffer_addresses() -> Result<(), Box<dyn Error>> {
    let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) } as u64;
    let address = 2 * page + 100;

    let (_dir, config) = common::scratch();
    let mut mem = vec![0u8; 3 * page as usize];
    for camera in 0..N_CAMERA {
        for buffer in 0..BUFFERS_PER_CAMERA {
            let value = 0x8000_0000u32 + (camera as u32) * 0x10_0000 + buffer as u32;
            let at = address as usize + (camera * BUFFERS_PER_CAMERA + buffer) * 4;
            mem[at..at + 4].copy_from_slice(&value.to_le_bytes());
        }
    }
    std::fs::write(&config.mem_path, &mem)?;

    let mock = Arc::new(MockCoprocessor::standard().with_responder(move |req| {
        if req.function() == Function::GetBufferPointers.id() {
            Message::reply(req.function(), Status::Ok, &[address as u32, 0])
        } else {
            default_reply(req)
        }
    }));
    let api = Api::with_channel(config, mock.clone());
    api.init()?;

    assert_eq!(
        api.camera_buffer_addresses(2)?,
        [0x8020_0000, 0x8020_0001, 0x8020_0002]
    );
    assert_eq!(api.camera_buffer_addresses(7)?[2], 0x8070_0002);

    // The table is fetched once.
    let fetches = mock
        .requests()
        .iter()
        .filter(|r| r.function() == Function::GetBufferPointers.id())
        .count();
    assert_eq!(fetches, 1);

    let err = api.camera_buffer_addresses(N_CAMERA).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParam);
    Ok(())
}
