// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

mod common;

use common::MockCoprocessor;
use r7_video::{
    rpc::{Function, Message, Status},
    Error, ErrorKind, IoctlChannel, Transport,
};
use std::{error::Error as StdError, sync::Arc, thread, time::Duration};

const FUNCTIONS: [Function; 8] = [
    Function::GetRegister,
    Function::SetRegister,
    Function::SetFps,
    Function::HeartbeatMode,
    Function::BootMode,
    Function::SelectDisplay,
    Function::SetCropping,
    Function::GetMonitoringInfo,
];

#[test]
fn test_concurrent_requests() -> Result<(), Box<dyn StdError>> {
    // Every reply carries the sender's tag, so an interleaved exchange would
    // hand one thread another thread's payload.
    let mock = Arc::new(
        MockCoprocessor::standard()
            .with_delay(Duration::from_millis(1))
            .with_responder(|req| Message::reply(req.function(), Status::Ok, &[req.args()[0]])),
    );
    let transport = Arc::new(Transport::new(mock.clone()));

    let handles: Vec<_> = FUNCTIONS
        .iter()
        .enumerate()
        .map(|(tag, &function)| {
            let transport = transport.clone();
            thread::spawn(move || -> Result<(), Error> {
                for round in 0..20u32 {
                    let tag = tag as u32 * 100 + round;
                    let reply = transport.call(function, &[tag])?;
                    assert_eq!(reply.function(), function.id());
                    assert_eq!(reply.payload()[0], tag);
                }
                Ok(())
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("request thread panicked")?;
    }
    assert_eq!(mock.exchanges(), FUNCTIONS.len() * 20);
    Ok(())
}

#[test]
fn test_status_mapping() {
    let mock = Arc::new(MockCoprocessor::standard().with_responder(|req| {
        let status = match req.args()[0] {
            0 => Status::Ok,
            1 => Status::Blocked,
            2 => Status::InvalidParam,
            _ => Status::Error,
        };
        Message::reply(req.function(), status, &[])
    }));
    let transport = Transport::new(mock);

    assert!(transport.call(Function::SetRegister, &[0]).is_ok());

    let err = transport.call(Function::SetRegister, &[1]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Blocked);
    assert_eq!(err.code(), -5);

    let err = transport.call(Function::SetRegister, &[2]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParam);

    let err = transport.call(Function::SetRegister, &[3]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Fail);

    // send_request hands back the raw status without judging it.
    let request = Message::request(Function::SetRegister, &[1]).unwrap();
    let reply = transport.send_request(&request).unwrap();
    assert_eq!(reply.status(), Some(Status::Blocked));
}

#[test]
fn test_reply_mismatch() {
    let mock = MockCoprocessor::standard()
        .with_responder(|_| Message::reply(Function::GetVersion.id(), Status::Ok, &[]));
    let transport = Transport::new(mock);

    let err = transport.call(Function::SetFps, &[0, 30]).unwrap_err();
    assert!(matches!(
        err,
        Error::ReplyMismatch {
            sent: 4,
            received: 12
        }
    ));
    assert_eq!(err.kind(), ErrorKind::Fail);
}

#[test]
fn test_too_many_args() {
    let mock = Arc::new(MockCoprocessor::standard());
    let transport = Transport::new(mock.clone());

    let err = transport.call(Function::SetCropping, &[0; 8]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidParam);
    assert_eq!(mock.exchanges(), 0);
}

#[test]
fn test_attribute_tables() -> Result<(), Box<dyn StdError>> {
    let mock = Arc::new(MockCoprocessor::standard());
    let transport = Transport::new(mock.clone());

    let cameras = transport.fetch_camera_attributes()?;
    assert_eq!(cameras, common::standard_cameras());
    let blenders = transport.fetch_blender_attributes()?;
    assert_eq!(blenders, common::standard_blenders());

    mock.fail_attributes(true);
    assert!(transport.fetch_camera_attributes().is_err());
    Ok(())
}

#[test]
fn test_missing_control_channel() {
    let dir = tempfile::tempdir().unwrap();
    let transport = Transport::new(IoctlChannel::new(dir.path().join("mfis_ioctl")));

    let err = transport.call(Function::Init, &[]).unwrap_err();
    assert!(matches!(err, Error::Io { .. }));
    assert_eq!(err.kind(), ErrorKind::Fail);
    assert!(transport.fetch_blender_attributes().is_err());
}
