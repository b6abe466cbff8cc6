//! Output device lookup
//!
//! `--list-devices` prints what [`get_output_devices`] finds; the `id` of an
//! entry goes into `audio.device` in the config file.

use cpal::traits::{DeviceTrait, HostTrait};

use super::config::DeviceId;
use super::error::{AudioError, AudioResult};

/// An output device from one of the cpal hosts
#[derive(Debug, Clone, PartialEq)]
pub struct AudioDevice {
    pub id: DeviceId,
    /// Default device of its host
    pub is_default: bool,
    pub max_channels: u16,
}

impl std::fmt::Display for AudioDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} ch)", self.id.display_label(), self.max_channels)?;
        if self.is_default {
            write!(f, " *")?;
        }
        Ok(())
    }
}

fn host_label(id: cpal::HostId) -> String {
    id.name().to_string()
}

/// Output devices that offer at least one config, defaults first
pub fn get_output_devices() -> AudioResult<Vec<AudioDevice>> {
    let mut found = Vec::new();

    for host_id in cpal::available_hosts() {
        let host = match cpal::host_from_id(host_id) {
            Ok(host) => host,
            Err(e) => {
                log::debug!("Skipping host {:?}: {}", host_id, e);
                continue;
            }
        };
        let label = host_label(host_id);
        let default_name = host.default_output_device().and_then(|d| d.name().ok());

        let Ok(devices) = host.output_devices() else { continue };
        for device in devices {
            let Ok(name) = device.name() else { continue };
            let max_channels = device
                .supported_output_configs()
                .map(|configs| configs.map(|c| c.channels()).max().unwrap_or(0))
                .unwrap_or(0);
            if max_channels == 0 {
                continue;
            }
            found.push(AudioDevice {
                is_default: default_name.as_deref() == Some(name.as_str()),
                id: DeviceId::with_host(&name, &label),
                max_channels,
            });
        }
    }

    if found.is_empty() {
        return Err(AudioError::NoDevices);
    }
    sort_devices(&mut found);
    log::info!("Found {} audio output devices", found.len());
    Ok(found)
}

fn sort_devices(devices: &mut [AudioDevice]) {
    devices.sort_by(|a, b| {
        b.is_default
            .cmp(&a.is_default)
            .then_with(|| a.id.host.cmp(&b.id.host))
            .then_with(|| a.id.name.cmp(&b.id.name))
    });
}

fn matches_id(id: &DeviceId, host: cpal::HostId, device: &cpal::Device) -> bool {
    let host_ok = id.host.as_deref().map_or(true, |h| h == host_label(host));
    host_ok && device.name().is_ok_and(|name| name == id.name)
}

/// Find a configured device; without a host in the id every host is searched
pub fn find_device_by_id(id: &DeviceId) -> AudioResult<cpal::Device> {
    for host_id in cpal::available_hosts() {
        let Ok(host) = cpal::host_from_id(host_id) else { continue };
        let Ok(mut devices) = host.output_devices() else { continue };
        if let Some(device) = devices.find(|d| matches_id(id, host_id, d)) {
            return Ok(device);
        }
    }
    Err(AudioError::DeviceNotFound(id.display_label()))
}

pub fn get_cpal_default_device() -> AudioResult<cpal::Device> {
    cpal::default_host()
        .default_output_device()
        .ok_or(AudioError::NoDefaultDevice)
}
