//! Serial port discovery for connected luxmeters.
//!
//! The CL-200A usually shows up behind a Prolific USB-serial bridge, so the
//! only discovery concern here is matching the USB manufacturer string. The
//! returned port name is an opaque handle; deciding which candidate actually
//! speaks the protocol is up to the caller (typically by attempting the
//! PC-connection handshake on each).

use crate::error::PortError;
use log::debug;

/// Lists the names of serial ports whose USB manufacturer string contains
/// `keyword`.
pub fn find_ports_by_manufacturer(keyword: &str) -> Result<Vec<String>, PortError> {
    let ports = tokio_serial::available_ports()
        .map_err(|e| PortError::Unavailable(e.to_string()))?;

    let mut matches = Vec::new();
    for port in ports {
        if let tokio_serial::SerialPortType::UsbPort(info) = port.port_type {
            let manufacturer = info.manufacturer.unwrap_or_default();
            if manufacturer.contains(keyword) {
                debug!("Found candidate luxmeter port {} ({manufacturer})", port.port_name);
                matches.push(port.port_name);
            }
        }
    }
    Ok(matches)
}

/// Returns the first port matching `keyword`, if any.
pub fn find_port_by_manufacturer(keyword: &str) -> Result<Option<String>, PortError> {
    Ok(find_ports_by_manufacturer(keyword)?.into_iter().next())
}
