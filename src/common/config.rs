// src/common/config.rs

/// Startup configuration for a modem deployment.
///
/// Values are read once by the integrator (file, environment, build-time
/// constants) and handed in; nothing is reloaded while the modem is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModemConfig<'a> {
    /// Serial device node, e.g. `ttyAMA0`.
    pub serial_device: &'a str,
    pub baud_rate: u32,
    pub apn: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub server_host: &'a str,
    pub server_port: u16,
    pub server_path: &'a str,
    /// Empty when the SIM has no PIN lock.
    pub sim_pin: &'a str,
    /// Sent as the HTTP `User-Agent`.
    pub user_agent: &'a str,
    pub transparent: bool,
}

impl Default for ModemConfig<'_> {
    fn default() -> Self {
        ModemConfig {
            serial_device: "ttyAMA0",
            baud_rate: 9600,
            apn: "",
            username: "",
            password: "",
            server_host: "google.com",
            server_port: 80,
            server_path: "/",
            sim_pin: "",
            user_agent: crate::modem::DEFAULT_USER_AGENT,
            transparent: false,
        }
    }
}

/// Reason a [`ModemConfig`] was rejected.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("serial device path is empty")]
    EmptyDevice,
    #[error("baud rate must be non-zero")]
    ZeroBaudRate,
    #[error("server host is empty")]
    EmptyServer,
    #[error("server port must be non-zero")]
    ZeroPort,
    #[error("server path must start with '/'")]
    RelativePath,
    #[error("SIM PIN must be digits only")]
    InvalidPin,
}

impl ModemConfig<'_> {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial_device.is_empty() {
            return Err(ConfigError::EmptyDevice);
        }
        if self.baud_rate == 0 {
            return Err(ConfigError::ZeroBaudRate);
        }
        if self.server_host.is_empty() {
            return Err(ConfigError::EmptyServer);
        }
        if self.server_port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if !self.server_path.starts_with('/') {
            return Err(ConfigError::RelativePath);
        }
        if !self.sim_pin.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ConfigError::InvalidPin);
        }
        Ok(())
    }
}
