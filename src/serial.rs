// Serial byte source: reads from the vision module link and feeds RxHandle
use std::io::{ErrorKind, Read};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serialport::SerialPort;
use tracing::{debug, info};

use crate::error::SerialError;
use crate::runtime::{RxHandle, ShutdownListener};

const READ_CHUNK: usize = 64;

/// Open the serial link (8N1)
pub fn open_port(
    port_name: &str,
    baudrate: u32,
    timeout: Duration,
) -> Result<Box<dyn SerialPort>, SerialError> {
    info!("Opening serial port {} at {} baud", port_name, baudrate);
    let port = serialport::new(port_name, baudrate)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .timeout(timeout)
        .open()?;
    Ok(port)
}

/// Read on a dedicated thread until shutdown or end of stream.
/// Read timeouts just mean no data arrived.
pub fn spawn_reader<R>(
    mut reader: R,
    rx: RxHandle,
    shutdown: ShutdownListener,
) -> JoinHandle<Result<(), SerialError>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buf = [0u8; READ_CHUNK];
        while !shutdown.is_triggered() {
            match reader.read(&mut buf) {
                Ok(0) => {
                    info!("Serial stream closed");
                    return Ok(());
                }
                Ok(n) => {
                    let stored = rx.on_bytes(&buf[..n]);
                    if stored < n {
                        debug!("Dropped {} bytes, receive buffer full", n - stored);
                    }
                }
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::Interrupted) => {}
                Err(e) => return Err(SerialError::Io(e)),
            }
        }
        debug!("Serial reader stopping");
        Ok(())
    })
}
