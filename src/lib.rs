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

//! # Camera Test Stand Tools
//!
//! Operator tools for the camera test stand: MKS vacuum gauge queries and
//! setup over RS-485, EEPR valve and HV bias feedback loops, and gated
//! exposure and power sequences against the lab control system.
pub mod ccs;
pub mod constants;
pub mod control;
pub mod enums;
pub mod gauge;
pub mod mock;
pub mod sequence;
pub mod utility;
