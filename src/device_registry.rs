use std::fmt;
use std::marker::PhantomData;
use std::net::IpAddr;
use std::sync::Arc;

use crate::device_family::DeviceFamily;
use crate::error::{ArgumentError, OpenError, Result};
use crate::handle_session::HandleSession;
use crate::native_driver::{decode_identity, NativeDriver, IDENTITY_LEN};

/// How to address the device to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Position in the driver's enumeration order.
    Index(i32),
    ComPort { port: String, baud_rate: u32 },
    Network { address: IpAddr, port: u16 },
    UsbSerial(String),
    /// Link-layer device path.
    Path(String),
}

impl DeviceSelector {
    pub fn validate(&self) -> std::result::Result<(), ArgumentError> {
        match self {
            Self::Index(index) if *index < 0 => Err(ArgumentError::NegativeIndex(*index)),
            Self::ComPort { port, .. } if port.trim().is_empty() => {
                Err(ArgumentError::Empty("serial port name"))
            }
            Self::ComPort { baud_rate: 0, .. } => Err(ArgumentError::ZeroBaudRate),
            Self::UsbSerial(serial) if serial.trim().is_empty() => {
                Err(ArgumentError::Empty("USB serial number"))
            }
            Self::Path(path) if path.trim().is_empty() => Err(ArgumentError::Empty("device path")),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "index {}", index),
            Self::ComPort { port, baud_rate } => write!(f, "{} @ {} baud", port, baud_rate),
            Self::Network { address, port } => write!(f, "{}:{}", address, port),
            Self::UsbSerial(serial) => write!(f, "USB serial {}", serial),
            Self::Path(path) => write!(f, "{}", path),
        }
    }
}

/// Identity strings reported by the driver for one enumerated device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub index: i32,
    pub board_serial: String,
    pub spectrometer_serial: String,
    pub device_serial: String,
}

/// Discovery and open-by-selector for one driver family.
pub struct DeviceRegistry<F: DeviceFamily> {
    driver: Arc<dyn NativeDriver>,
    _family: PhantomData<fn() -> F>,
}

impl<F: DeviceFamily> Clone for DeviceRegistry<F> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.driver))
    }
}

impl<F: DeviceFamily> DeviceRegistry<F> {
    pub fn new(driver: Arc<dyn NativeDriver>) -> Self {
        Self {
            driver,
            _family: PhantomData,
        }
    }

    pub fn family_name(&self) -> &'static str {
        F::NAME
    }

    pub fn device_count(&self) -> Result<usize> {
        let mut count = 0i32;
        self.driver.device_count(&mut count).check("device_count")?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Enumerate every device the driver can see, with its identity strings.
    pub fn enumerate(&self) -> Result<Vec<DeviceInfo>> {
        let count = self.device_count()?;
        log::debug!("{} driver reports {} device(s)", F::NAME, count);

        let mut board = [0u8; IDENTITY_LEN];
        let mut spectrometer = [0u8; IDENTITY_LEN];
        let mut device = [0u8; IDENTITY_LEN];
        let mut devices = Vec::with_capacity(count);

        for index in 0..i32::try_from(count).unwrap_or(i32::MAX) {
            board.fill(0);
            spectrometer.fill(0);
            device.fill(0);
            self.driver
                .device_identity(index, &mut board, &mut spectrometer, &mut device)
                .check("device_identity")?;

            devices.push(DeviceInfo {
                index,
                board_serial: decode_identity(&board),
                spectrometer_serial: decode_identity(&spectrometer),
                device_serial: decode_identity(&device),
            });
        }

        Ok(devices)
    }

    /// Serial ports present on this host, candidates for [`DeviceSelector::ComPort`].
    pub fn serial_ports() -> Result<Vec<String>> {
        let ports = serialport::available_ports()?;
        Ok(ports.into_iter().map(|port| port.port_name).collect())
    }

    /// Validate that a given serial port exists before handing it to the driver
    fn validate_port(port: &str) -> Result<()> {
        if !Self::serial_ports()?.iter().any(|p| p == port) {
            return Err(OpenError::PortNotFound {
                port: port.to_string(),
            }
            .into());
        }
        Ok(())
    }

    pub fn open(&self, selector: &DeviceSelector) -> Result<HandleSession<F>> {
        selector.validate()?;
        if let DeviceSelector::ComPort { port, .. } = selector {
            Self::validate_port(port)?;
        }

        log::debug!("Opening {} device at {}", F::NAME, selector);
        HandleSession::open(Arc::clone(&self.driver), selector)
    }

    /// Open the first enumerated device.
    pub fn open_first(&self) -> Result<HandleSession<F>> {
        if self.device_count()? == 0 {
            return Err(OpenError::NoDevices { family: F::NAME }.into());
        }
        self.open(&DeviceSelector::Index(0))
    }

    /// Find a device by any of its identity strings and open it by index.
    pub fn open_serial(&self, serial: &str) -> Result<HandleSession<F>> {
        if serial.trim().is_empty() {
            return Err(ArgumentError::Empty("serial number").into());
        }
        let device = self
            .enumerate()?
            .into_iter()
            .find(|d| {
                d.device_serial == serial
                    || d.spectrometer_serial == serial
                    || d.board_serial == serial
            })
            .ok_or_else(|| OpenError::DeviceNotFound {
                serial: serial.to_string(),
            })?;
        self.open(&DeviceSelector::Index(device.index))
    }
}
