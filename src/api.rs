// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

//! Process-scoped entry point of the library.
//!
//! [`Api`] owns the [`Transport`] and, once [`Api::init`] has completed, the
//! [`Registry`]. Device operations go through the registry; co-processor
//! commands go straight through the transport.

use crate::{
    attributes::{Attributes, DeviceKind},
    config::Config,
    error::{Error, Result},
    physmem::PhysicalView,
    registry::{DeviceId, Registry, N_CAMERA},
    rpc::{unpack_ascii, Function, REPLY_PAYLOAD_WORDS},
    transport::{ControlChannel, IoctlChannel, Transport},
};
use parking_lot::{Mutex, RwLock};
use std::{sync::Arc, time::Duration};
use tracing::{debug, info, warn};

/// Buffers per camera in the co-processor's buffer table.
pub const BUFFERS_PER_CAMERA: usize = 3;

const BUFFER_TABLE_SIZE: usize = N_CAMERA * BUFFERS_PER_CAMERA * 4;

/// Handle on the co-processor and its devices.
///
/// # Example
///
/// ```no_run
/// use r7_video::{Api, Config, DeviceId};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let api = Api::new(Config::default());
/// api.init()?;
///
/// let cam = DeviceId::Camera(0);
/// let attr = api.attributes(cam)?;
/// let mut frame = vec![0u8; attr.buffer_size as usize];
/// api.open(cam)?;
/// api.read(cam, &mut frame)?;
/// api.close(cam)?;
/// api.deinit()?;
/// # Ok(())
/// # }
/// ```
pub struct Api {
    config: Config,
    transport: Transport,
    registry: RwLock<Option<Arc<Registry>>>,
    buffers: Mutex<Option<Arc<PhysicalView>>>,
}

impl Api {
    /// Creates an uninitialized API talking to the MFIS driver.
    pub fn new(config: Config) -> Self {
        let channel = IoctlChannel::new(&config.ctl_path);
        Self::with_channel(config, channel)
    }

    /// Creates an uninitialized API over a custom control channel.
    pub fn with_channel(config: Config, channel: impl ControlChannel + 'static) -> Self {
        Self {
            config,
            transport: Transport::new(channel),
            registry: RwLock::new(None),
            buffers: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Initializes the co-processor link and builds the device registry.
    ///
    /// The registry only becomes visible once both attribute tables have
    /// been fetched and every slot is bound.
    pub fn init(&self) -> Result<()> {
        let mut registry = self.registry.write();
        if registry.is_some() {
            return Err(Error::fail("api already initialized"));
        }

        self.transport.call(Function::Init, &[])?;
        let built = match self.build_registry() {
            Ok(built) => built,
            Err(e) => {
                // Leave the co-processor as it was before Init.
                if let Err(deinit) = self.transport.call(Function::Deinit, &[]) {
                    warn!("deinit after failed init: {}", deinit);
                }
                return Err(e);
            }
        };

        info!(
            "initialized {} devices ({} seek handlers bound)",
            built.entries().filter(|e| e.kind() != DeviceKind::None).count(),
            built.seek_pool().used()
        );
        *registry = Some(Arc::new(built));
        Ok(())
    }

    fn build_registry(&self) -> Result<Registry> {
        let cameras = self.transport.fetch_camera_attributes()?;
        let blenders = self.transport.fetch_blender_attributes()?;
        Registry::build(&self.config, &cameras, &blenders)
    }

    /// Closes every open device, notifies the co-processor and drops the
    /// registry.
    pub fn deinit(&self) -> Result<()> {
        let registry = self.registry.write().take().ok_or(Error::NotInitialized)?;
        registry.close_all();
        self.transport.call(Function::Deinit, &[])?;
        info!("deinitialized");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.registry.read().is_some()
    }

    /// The registry, or `NotInitialized`.
    pub fn registry(&self) -> Result<Arc<Registry>> {
        self.registry.read().clone().ok_or(Error::NotInitialized)
    }

    pub fn open(&self, id: DeviceId) -> Result<()> {
        let registry = self.registry()?;
        registry.open(id.global()?)
    }

    pub fn close(&self, id: DeviceId) -> Result<()> {
        let registry = self.registry()?;
        registry.close(id.global()?)
    }

    /// Reads a frame from the start of the device buffer.
    pub fn read(&self, id: DeviceId, buf: &mut [u8]) -> Result<usize> {
        self.read_segment(id, buf, 0)
    }

    /// Reads part of a frame starting at `offset`.
    pub fn read_segment(&self, id: DeviceId, buf: &mut [u8], offset: u64) -> Result<usize> {
        let registry = self.registry()?;
        registry.read(id.global()?, buf, offset)
    }

    /// Writes a frame at the start of the device buffer.
    pub fn write(&self, id: DeviceId, buf: &[u8]) -> Result<usize> {
        self.write_segment(id, buf, 0)
    }

    pub fn write_segment(&self, id: DeviceId, buf: &[u8], offset: u64) -> Result<usize> {
        let registry = self.registry()?;
        registry.write(id.global()?, buf, offset)
    }

    /// Waits for readiness on every device in `ids`, see [`Registry::poll`].
    pub fn poll(&self, ids: &[DeviceId], timeout: Option<Duration>) -> Result<u32> {
        let registry = self.registry()?;
        let ids = ids
            .iter()
            .map(|id| id.global())
            .collect::<Result<Vec<_>>>()?;
        registry.poll(&ids, timeout)
    }

    pub fn attributes(&self, id: DeviceId) -> Result<Attributes> {
        let registry = self.registry()?;
        registry.attributes(id.global()?)
    }

    /// Shows the device on the display pipeline.
    pub fn display(&self, id: DeviceId) -> Result<()> {
        let registry = self.registry()?;
        registry.display(id.global()?, &self.transport)
    }

    /// Sends `function(args)` once the API is initialized.
    pub(crate) fn command(
        &self,
        function: Function,
        args: &[u32],
    ) -> Result<[u32; REPLY_PAYLOAD_WORDS]> {
        self.registry()?;
        let reply = self.transport.call(function, args)?;
        let mut payload = [0; REPLY_PAYLOAD_WORDS];
        payload.copy_from_slice(reply.payload());
        Ok(payload)
    }

    pub fn camera_get_register(&self, camera: usize, address: u16) -> Result<u16> {
        let camera = camera_index(camera)?;
        let payload = self.command(Function::GetRegister, &[camera, address.into()])?;
        u16::try_from(payload[0]).map_err(|_| {
            Error::fail(format!(
                "register {:#x} of camera {} read back {:#x}",
                address, camera, payload[0]
            ))
        })
    }

    pub fn camera_set_register(&self, camera: usize, address: u16, value: u16) -> Result<()> {
        let camera = camera_index(camera)?;
        self.command(Function::SetRegister, &[camera, address.into(), value.into()])?;
        Ok(())
    }

    pub fn camera_set_fps(&self, camera: usize, fps: u32) -> Result<()> {
        let camera = camera_index(camera)?;
        if fps == 0 {
            return Err(Error::invalid("frame rate of 0"));
        }
        self.command(Function::SetFps, &[camera, fps])?;
        Ok(())
    }

    /// Reboots the co-processor.
    pub fn reboot_coprocessor(&self) -> Result<()> {
        warn!("rebooting co-processor");
        self.command(Function::Reset, &[])?;
        Ok(())
    }

    pub fn set_heartbeat(&self, enabled: bool) -> Result<()> {
        self.command(Function::HeartbeatMode, &[enabled.into()])?;
        Ok(())
    }

    pub fn set_boot_mode(&self, mode: u32) -> Result<()> {
        self.command(Function::BootMode, &[mode])?;
        Ok(())
    }

    /// Enables compositing of `blender` over the displayed source.
    pub fn blending_on(&self, blender: usize) -> Result<()> {
        let id = DeviceId::Blender(blender).global()? as u32;
        self.command(Function::BlendingOn, &[id])?;
        Ok(())
    }

    pub fn blending_off(&self) -> Result<()> {
        self.command(Function::BlendingOff, &[])?;
        Ok(())
    }

    /// Crops the displayed image to the rectangle `(x1, y1)`-`(x2, y2)`.
    pub fn set_cropping(&self, x1: u32, y1: u32, x2: u32, y2: u32) -> Result<()> {
        if x1 >= x2 || y1 >= y2 {
            return Err(Error::invalid(format!(
                "empty cropping rectangle ({x1},{y1})-({x2},{y2})"
            )));
        }
        self.command(Function::SetCropping, &[x1, y1, x2, y2])?;
        Ok(())
    }

    /// Firmware version string of the co-processor.
    pub fn coprocessor_version(&self) -> Result<String> {
        let payload = self.command(Function::GetVersion, &[])?;
        Ok(unpack_ascii(&payload))
    }

    /// Raw monitoring words reported by the co-processor.
    pub fn monitoring_info(&self) -> Result<[u32; REPLY_PAYLOAD_WORDS]> {
        self.command(Function::GetMonitoringInfo, &[])
    }

    /// Physical addresses of the frame buffers of `camera`.
    ///
    /// The co-processor's buffer table is mapped on first use and stays
    /// mapped for the life of the process.
    pub fn camera_buffer_addresses(&self, camera: usize) -> Result<[u32; BUFFERS_PER_CAMERA]> {
        let camera = camera_index(camera)? as usize;
        let table = self.buffer_table()?;
        let mut addresses = [0; BUFFERS_PER_CAMERA];
        for (i, address) in addresses.iter_mut().enumerate() {
            *address = table
                .read_u32(camera * BUFFERS_PER_CAMERA + i)
                .ok_or_else(|| Error::fail("buffer table truncated"))?;
        }
        Ok(addresses)
    }

    fn buffer_table(&self) -> Result<Arc<PhysicalView>> {
        let mut buffers = self.buffers.lock();
        if let Some(view) = buffers.as_ref() {
            return Ok(view.clone());
        }
        let payload = self.command(Function::GetBufferPointers, &[])?;
        let address = u64::from(payload[1]) << 32 | u64::from(payload[0]);
        debug!("buffer table at physical {:#x}", address);
        let view = Arc::new(PhysicalView::map(
            &self.config.mem_path,
            address,
            BUFFER_TABLE_SIZE,
        )?);
        *buffers = Some(view.clone());
        Ok(view)
    }
}

impl Drop for Api {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.get_mut().take() {
            registry.close_all();
        }
    }
}

/// Validates a per-kind camera id for a wire argument.
pub(crate) fn camera_index(camera: usize) -> Result<u32> {
    if camera >= N_CAMERA {
        return Err(Error::invalid(format!("camera {camera} out of range")));
    }
    Ok(camera as u32)
}
