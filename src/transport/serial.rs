//! Serial Port Transport

use super::line::LineBuffer;
use super::{EndpointInfo, EndpointKind, LineRead, Transport, TransportError, TransportFactory};
use serialport::{FlowControl, SerialPort, SerialPortType};
use std::io::BufReader;
use std::time::Duration;
use tracing::{debug, info};

/// Read timeout used until the first `read_line` call sets its own
const INITIAL_TIMEOUT: Duration = Duration::from_secs(2);

/// Opens serial ports through the `serialport` crate
#[derive(Debug, Default)]
pub struct SerialTransportFactory;

impl SerialTransportFactory {
    pub fn new() -> Self {
        Self
    }
}

impl TransportFactory for SerialTransportFactory {
    fn is_available(&self) -> bool {
        true
    }

    fn open(&self, endpoint: &str, baud_rate: u32) -> Result<Box<dyn Transport>, TransportError> {
        debug!(endpoint = %endpoint, baud_rate, "Opening serial port");

        let port = serialport::new(endpoint, baud_rate)
            .timeout(INITIAL_TIMEOUT)
            .flow_control(FlowControl::None)
            .open()
            .map_err(|e| TransportError::Open {
                endpoint: endpoint.to_string(),
                message: e.to_string(),
            })?;

        info!(endpoint = %endpoint, baud_rate, "Serial port opened");

        Ok(Box::new(SerialTransport {
            endpoint: endpoint.to_string(),
            reader: BufReader::new(port),
            timeout: INITIAL_TIMEOUT,
            lines: LineBuffer::default(),
        }))
    }

    fn available_endpoints(&self) -> Result<Vec<EndpointInfo>, TransportError> {
        let ports = serialport::available_ports()?;

        Ok(ports
            .into_iter()
            .map(|port| match port.port_type {
                SerialPortType::UsbPort(usb) => EndpointInfo {
                    name: port.port_name,
                    kind: EndpointKind::Usb,
                    vid: Some(usb.vid),
                    pid: Some(usb.pid),
                    manufacturer: usb.manufacturer,
                    product: usb.product,
                    serial_number: usb.serial_number,
                },
                SerialPortType::BluetoothPort => {
                    EndpointInfo::named(port.port_name, EndpointKind::Bluetooth)
                }
                SerialPortType::PciPort => EndpointInfo::named(port.port_name, EndpointKind::Pci),
                SerialPortType::Unknown => {
                    EndpointInfo::named(port.port_name, EndpointKind::Unknown)
                }
            })
            .collect())
    }
}

/// An open serial port read one line at a time
pub struct SerialTransport {
    endpoint: String,
    reader: BufReader<Box<dyn SerialPort>>,
    timeout: Duration,
    /// Holds a line cut short by a read timeout
    lines: LineBuffer,
}

impl Transport for SerialTransport {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn read_line(&mut self, timeout: Duration) -> Result<LineRead, TransportError> {
        if timeout != self.timeout {
            self.reader.get_mut().set_timeout(timeout)?;
            self.timeout = timeout;
        }

        self.lines.read_line(&mut self.reader)
    }

    fn close(self: Box<Self>) -> Result<(), TransportError> {
        let SerialTransport {
            endpoint,
            reader,
            mut lines,
            ..
        } = *self;
        lines.clear();
        debug!(endpoint = %endpoint, "Closing serial port");
        let port = reader.into_inner();
        port.clear(serialport::ClearBuffer::All)?;
        drop(port);
        Ok(())
    }
}
