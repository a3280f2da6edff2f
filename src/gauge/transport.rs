// This file is part of ts_teststand_tools.
//
// Developed for the Vera Rubin Observatory Systems.
// This product includes software developed by the LSST Project
// (https://www.lsst.org).
// See the COPYRIGHT file at the top-level directory of this distribution
// for details of code ownership.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use serialport::{ClearBuffer, SerialPort};
use std::io::{self, ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use crate::constants::FRAME_TERMINATOR;

/// Byte-level access to the gauge. The protocol layer talks through this
/// trait so it can be driven by a scripted responder in the tests.
pub trait GaugeTransport {
    /// Send a frame.
    ///
    /// # Arguments
    /// * `frame` - Frame bytes.
    /// * `flush` - Flush the output after the write or not.
    fn send(&mut self, frame: &[u8], flush: bool) -> io::Result<()>;

    /// Read one response: everything up to and including the `;FF` terminator,
    /// or whatever arrived before the read timeout elapsed. A timed-out read
    /// is not an error; it returns the (possibly empty) partial response.
    fn read_response(&mut self) -> io::Result<Vec<u8>>;

    /// Discard the input and output buffers.
    fn reset_buffers(&mut self) -> io::Result<()>;

    /// Set the read timeout.
    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    /// Get the current read timeout.
    fn read_timeout(&self) -> Duration;
}

pub struct SerialTransport {
    _port: Box<dyn SerialPort>,
    _timeout: Duration,
}

impl SerialTransport {
    /// Open the serial port.
    ///
    /// # Arguments
    /// * `path` - Serial port path (e.g. "/dev/ttyS0").
    /// * `baud_rate` - Baud rate.
    /// * `timeout` - Read timeout.
    ///
    /// # Returns
    /// A new serial transport, or the error of the failed open.
    pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> serialport::Result<Self> {
        let port = serialport::new(path, baud_rate).timeout(timeout).open()?;

        Ok(Self {
            _port: port,
            _timeout: timeout,
        })
    }
}

impl GaugeTransport for SerialTransport {
    fn send(&mut self, frame: &[u8], flush: bool) -> io::Result<()> {
        self._port.write_all(frame)?;
        if flush {
            self._port.flush()?;
        }

        Ok(())
    }

    fn read_response(&mut self) -> io::Result<Vec<u8>> {
        let deadline = Instant::now() + self._timeout;
        let mut buffer = Vec::new();
        let mut byte = [0_u8; 1];

        loop {
            match self._port.read(&mut byte) {
                Ok(0) => break,
                Ok(_) => {
                    buffer.push(byte[0]);
                    if buffer.ends_with(FRAME_TERMINATOR) {
                        break;
                    }
                }
                Err(error)
                    if (error.kind() == ErrorKind::TimedOut)
                        || (error.kind() == ErrorKind::WouldBlock) =>
                {
                    break;
                }
                Err(error) => return Err(error),
            }

            // The port timeout is per read call. The deadline bounds the
            // whole response so a trickling sender cannot stall the loop.
            if Instant::now() >= deadline {
                break;
            }
        }

        Ok(buffer)
    }

    fn reset_buffers(&mut self) -> io::Result<()> {
        self._port
            .clear(ClearBuffer::All)
            .map_err(io::Error::from)
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self._port.set_timeout(timeout).map_err(io::Error::from)?;
        self._timeout = timeout;

        Ok(())
    }

    fn read_timeout(&self) -> Duration {
        self._timeout
    }
}
