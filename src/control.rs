// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Per-device control requests.
//!
//! Control requests travel on the regular RPC channel as a
//! [`Function::DeviceControl`] message addressed by
//! `(device type, device id, command)`, with up to four parameter words.
//! The reply payload carries up to six result words.

use crate::{
    api::{camera_index, Api},
    error::{Error, Result},
    rpc::{Function, MAX_REQUEST_ARGS, REPLY_PAYLOAD_WORDS},
};
use tracing::{debug, warn};

/// Parameter words of a control request.
pub const MAX_CONTROL_PARAMS: usize = MAX_REQUEST_ARGS - 3;

/// Processing pipelines addressable by pipeline commands.
pub const N_PIPELINE: usize = 8;

/// Target of a control request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum DeviceType {
    Camera = 0,
    Pipeline = 1,
    Video = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CameraCommand {
    GetExposure = 0,
    SetExposure = 1,
    GetExposureLimits = 2,
    SetExposureLimits = 3,
    GetFrameRate = 4,
    SetFrameRate = 5,
    GetTestPattern = 6,
    SetTestPattern = 7,
    GetFrameOffset = 8,
    SetFrameOffset = 9,
    GetDigitalGains = 10,
    SetDigitalGains = 11,
    Reboot = 12,
    GetTemperature = 13,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum PipelineCommand {
    Configure = 0,
    Start = 1,
    Stop = 2,
    Reboot = 3,
    SetLed = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum VideoCommand {
    SetState = 0,
}

/// State of the video display output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum VideoState {
    Suspended = 0,
    Running = 1,
}

/// Exposure time and analog gain, in sensor units.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Exposure {
    pub exposure: u32,
    pub gain: u32,
}

/// Bounds applied by the co-processor's auto-exposure.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExposureLimits {
    pub min_exposure: u32,
    pub max_exposure: u32,
    pub min_gain: u32,
    pub max_gain: u32,
}

/// Per-channel digital gains of a Bayer sensor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DigitalGains {
    pub red: u32,
    pub green_red: u32,
    pub green_blue: u32,
    pub blue: u32,
}

/// Readout window offset on the sensor.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FrameOffset {
    pub x: u32,
    pub y: u32,
}

impl Api {
    /// Sends one control request and returns the reply payload.
    pub fn control(
        &self,
        device: DeviceType,
        id: u32,
        command: u32,
        params: &[u32],
    ) -> Result<[u32; REPLY_PAYLOAD_WORDS]> {
        if params.len() > MAX_CONTROL_PARAMS {
            return Err(Error::invalid(format!(
                "control request takes at most {} parameters, got {}",
                MAX_CONTROL_PARAMS,
                params.len()
            )));
        }
        let mut args = vec![device as u32, id, command];
        args.extend_from_slice(params);
        debug!(?device, id, command, "control request");
        self.command(Function::DeviceControl, &args)
    }

    fn camera_control(
        &self,
        camera: usize,
        command: CameraCommand,
        params: &[u32],
    ) -> Result<[u32; REPLY_PAYLOAD_WORDS]> {
        let camera = camera_index(camera)?;
        self.control(DeviceType::Camera, camera, command as u32, params)
    }

    fn pipeline_control(
        &self,
        pipeline: usize,
        command: PipelineCommand,
        params: &[u32],
    ) -> Result<()> {
        if pipeline >= N_PIPELINE {
            return Err(Error::invalid(format!("pipeline {pipeline} out of range")));
        }
        self.control(DeviceType::Pipeline, pipeline as u32, command as u32, params)?;
        Ok(())
    }

    pub fn camera_get_exposure(&self, camera: usize) -> Result<Exposure> {
        let r = self.camera_control(camera, CameraCommand::GetExposure, &[])?;
        Ok(Exposure {
            exposure: r[0],
            gain: r[1],
        })
    }

    pub fn camera_set_exposure(&self, camera: usize, exposure: Exposure) -> Result<()> {
        self.camera_control(
            camera,
            CameraCommand::SetExposure,
            &[exposure.exposure, exposure.gain],
        )?;
        Ok(())
    }

    pub fn camera_get_exposure_limits(&self, camera: usize) -> Result<ExposureLimits> {
        let r = self.camera_control(camera, CameraCommand::GetExposureLimits, &[])?;
        Ok(ExposureLimits {
            min_exposure: r[0],
            max_exposure: r[1],
            min_gain: r[2],
            max_gain: r[3],
        })
    }

    pub fn camera_set_exposure_limits(&self, camera: usize, limits: ExposureLimits) -> Result<()> {
        if limits.min_exposure > limits.max_exposure || limits.min_gain > limits.max_gain {
            return Err(Error::invalid(format!("inverted limits {limits:?}")));
        }
        self.camera_control(
            camera,
            CameraCommand::SetExposureLimits,
            &[
                limits.min_exposure,
                limits.max_exposure,
                limits.min_gain,
                limits.max_gain,
            ],
        )?;
        Ok(())
    }

    pub fn camera_get_frame_rate(&self, camera: usize) -> Result<u32> {
        Ok(self.camera_control(camera, CameraCommand::GetFrameRate, &[])?[0])
    }

    pub fn camera_set_frame_rate(&self, camera: usize, fps: u32) -> Result<()> {
        if fps == 0 {
            return Err(Error::invalid("frame rate of 0"));
        }
        self.camera_control(camera, CameraCommand::SetFrameRate, &[fps])?;
        Ok(())
    }

    pub fn camera_get_test_pattern(&self, camera: usize) -> Result<u32> {
        Ok(self.camera_control(camera, CameraCommand::GetTestPattern, &[])?[0])
    }

    /// Selects a sensor test pattern; 0 disables it.
    pub fn camera_set_test_pattern(&self, camera: usize, pattern: u32) -> Result<()> {
        self.camera_control(camera, CameraCommand::SetTestPattern, &[pattern])?;
        Ok(())
    }

    pub fn camera_get_frame_offset(&self, camera: usize) -> Result<FrameOffset> {
        let r = self.camera_control(camera, CameraCommand::GetFrameOffset, &[])?;
        Ok(FrameOffset { x: r[0], y: r[1] })
    }

    pub fn camera_set_frame_offset(&self, camera: usize, offset: FrameOffset) -> Result<()> {
        self.camera_control(camera, CameraCommand::SetFrameOffset, &[offset.x, offset.y])?;
        Ok(())
    }

    pub fn camera_get_digital_gains(&self, camera: usize) -> Result<DigitalGains> {
        let r = self.camera_control(camera, CameraCommand::GetDigitalGains, &[])?;
        Ok(DigitalGains {
            red: r[0],
            green_red: r[1],
            green_blue: r[2],
            blue: r[3],
        })
    }

    pub fn camera_set_digital_gains(&self, camera: usize, gains: DigitalGains) -> Result<()> {
        self.camera_control(
            camera,
            CameraCommand::SetDigitalGains,
            &[gains.red, gains.green_red, gains.green_blue, gains.blue],
        )?;
        Ok(())
    }

    pub fn camera_reboot(&self, camera: usize) -> Result<()> {
        warn!("rebooting camera {}", camera);
        self.camera_control(camera, CameraCommand::Reboot, &[])?;
        Ok(())
    }

    /// Sensor temperature in degrees Celsius.
    pub fn camera_get_temperature(&self, camera: usize) -> Result<i32> {
        Ok(self.camera_control(camera, CameraCommand::GetTemperature, &[])?[0] as i32)
    }

    pub fn pipeline_configure(&self, pipeline: usize, width: u32, height: u32) -> Result<()> {
        if width == 0 || height == 0 {
            return Err(Error::invalid(format!("pipeline size {width}x{height}")));
        }
        self.pipeline_control(pipeline, PipelineCommand::Configure, &[width, height])
    }

    pub fn pipeline_start(&self, pipeline: usize) -> Result<()> {
        self.pipeline_control(pipeline, PipelineCommand::Start, &[])
    }

    pub fn pipeline_stop(&self, pipeline: usize) -> Result<()> {
        self.pipeline_control(pipeline, PipelineCommand::Stop, &[])
    }

    pub fn pipeline_reboot(&self, pipeline: usize) -> Result<()> {
        self.pipeline_control(pipeline, PipelineCommand::Reboot, &[])
    }

    pub fn pipeline_set_led(&self, pipeline: usize, on: bool) -> Result<()> {
        self.pipeline_control(pipeline, PipelineCommand::SetLed, &[on.into()])
    }

    /// Suspends or resumes the video display output.
    pub fn video_set_state(&self, state: VideoState) -> Result<()> {
        self.control(
            DeviceType::Video,
            0,
            VideoCommand::SetState as u32,
            &[state as u32],
        )?;
        Ok(())
    }
}
