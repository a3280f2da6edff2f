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

use std::collections::VecDeque;
use std::io;
use std::thread::sleep;
use std::time::Duration;

use crate::gauge::transport::GaugeTransport;

/// One scripted reaction of the mock gauge to a read.
#[derive(Debug, Clone)]
pub enum ScriptedResponse {
    // Acknowledge with the payload.
    Ack(String),
    // Echo the frame that was just written, as a half-duplex line does.
    Echo,
    // Arbitrary bytes.
    Raw(Vec<u8>),
    // Nothing arrives; the read runs into its timeout.
    Timeout,
}

/// Scripted serial responder standing in for an MKS gauge.
pub struct MockGauge {
    _address: u8,
    _timeout: Duration,
    _script: VecDeque<ScriptedResponse>,
    // When the script is exhausted, every query is acknowledged with this
    // payload.
    _auto_ack: Option<String>,
    // Simulated duration of one successful read.
    _read_delay: Duration,
    _sent_frames: Vec<String>,
    _read_count: u32,
    _reset_count: u32,
}

impl MockGauge {
    /// Create a new mock gauge.
    ///
    /// # Arguments
    /// * `address` - RS-485 device address used in the acknowledgement frames.
    /// * `timeout` - Initial read timeout.
    ///
    /// # Returns
    /// A new mock gauge.
    pub fn new(address: u8, timeout: Duration) -> Self {
        Self {
            _address: address,
            _timeout: timeout,
            _script: VecDeque::new(),
            _auto_ack: None,
            _read_delay: Duration::ZERO,
            _sent_frames: Vec::new(),
            _read_count: 0,
            _reset_count: 0,
        }
    }

    /// Append a scripted response.
    ///
    /// # Arguments
    /// * `response` - Response to append.
    pub fn push(&mut self, response: ScriptedResponse) {
        self._script.push_back(response);
    }

    /// Acknowledge every query with the payload once the script is exhausted.
    ///
    /// # Arguments
    /// * `payload` - Payload of the acknowledgements.
    pub fn set_auto_ack(&mut self, payload: String) {
        self._auto_ack = Some(payload);
    }

    /// Set the simulated duration of one successful read.
    ///
    /// # Arguments
    /// * `delay` - Read duration.
    pub fn set_read_delay(&mut self, delay: Duration) {
        self._read_delay = delay;
    }

    /// Get the frames that were written, in order.
    ///
    /// # Returns
    /// The frames.
    pub fn sent_frames(&self) -> Vec<String> {
        self._sent_frames.clone()
    }

    /// Get the frames that would change the gauge (set commands).
    ///
    /// # Returns
    /// The set frames.
    pub fn mutating_frames(&self) -> Vec<String> {
        self._sent_frames
            .iter()
            .filter(|frame| frame.contains('!'))
            .cloned()
            .collect()
    }

    /// Get the number of reads that were issued.
    ///
    /// # Returns
    /// Read count.
    pub fn read_count(&self) -> u32 {
        self._read_count
    }

    /// Get the number of buffer resets that were issued.
    ///
    /// # Returns
    /// Reset count.
    pub fn reset_count(&self) -> u32 {
        self._reset_count
    }

    fn ack_frame(&self, payload: &str) -> Vec<u8> {
        format!("@{:03}ACK{};FF", self._address, payload).into_bytes()
    }
}

impl GaugeTransport for MockGauge {
    fn send(&mut self, frame: &[u8], _flush: bool) -> io::Result<()> {
        self._sent_frames
            .push(String::from_utf8_lossy(frame).to_string());

        Ok(())
    }

    fn read_response(&mut self) -> io::Result<Vec<u8>> {
        self._read_count += 1;

        let response = match self._script.pop_front() {
            Some(ScriptedResponse::Ack(payload)) => {
                sleep(self._read_delay);
                self.ack_frame(&payload)
            }
            Some(ScriptedResponse::Echo) => {
                sleep(self._read_delay);
                self._sent_frames
                    .last()
                    .map(|frame| frame.clone().into_bytes())
                    .unwrap_or_default()
            }
            Some(ScriptedResponse::Raw(bytes)) => {
                sleep(self._read_delay);
                bytes
            }
            Some(ScriptedResponse::Timeout) => {
                sleep(self._timeout);
                Vec::new()
            }
            None => match &self._auto_ack {
                Some(payload) => {
                    let payload = payload.clone();
                    sleep(self._read_delay);
                    self.ack_frame(&payload)
                }
                None => {
                    sleep(self._timeout);
                    Vec::new()
                }
            },
        };

        Ok(response)
    }

    fn reset_buffers(&mut self) -> io::Result<()> {
        self._reset_count += 1;

        Ok(())
    }

    fn set_read_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self._timeout = timeout;

        Ok(())
    }

    fn read_timeout(&self) -> Duration {
        self._timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_mock() -> MockGauge {
        MockGauge::new(1, Duration::from_millis(10))
    }

    #[test]
    fn test_scripted_responses() {
        let mut mock = create_mock();
        mock.push(ScriptedResponse::Ack(String::from("1.0E-6")));
        mock.push(ScriptedResponse::Raw(b"noise".to_vec()));
        mock.push(ScriptedResponse::Timeout);

        mock.send(b"@001PR4?;FF", true).unwrap();

        assert_eq!(mock.read_response().unwrap(), b"@001ACK1.0E-6;FF");
        assert_eq!(mock.read_response().unwrap(), b"noise");
        assert_eq!(mock.read_response().unwrap(), Vec::<u8>::new());

        assert_eq!(mock.read_count(), 3);
    }

    #[test]
    fn test_echo() {
        let mut mock = create_mock();
        mock.push(ScriptedResponse::Echo);

        mock.send(b"@001PR4?;FF", true).unwrap();

        assert_eq!(mock.read_response().unwrap(), b"@001PR4?;FF");
    }

    #[test]
    fn test_auto_ack() {
        let mut mock = create_mock();
        mock.set_auto_ack(String::from("42"));

        assert_eq!(mock.read_response().unwrap(), b"@001ACK42;FF");
        assert_eq!(mock.read_response().unwrap(), b"@001ACK42;FF");
    }

    #[test]
    fn test_mutating_frames() {
        let mut mock = create_mock();
        mock.send(b"@001PR4?;FF", true).unwrap();
        mock.send(b"@001ENC!ON;FF", true).unwrap();

        assert_eq!(mock.mutating_frames(), vec![String::from("@001ENC!ON;FF")]);
    }
}
