//! Typed request, response, and event payload records.
//!
//! Layouts follow the conventions in [`super::codec`]. Field order is the
//! wire order.

use std::net::Ipv4Addr;

use crate::error::CodecError;

use super::codec::{Reader, WireRecord, Writer, var_len};

pub type Ssid = heapless::String<32>;
pub type Passphrase = heapless::String<64>;
pub type MacAddress = [u8; 6];

const IPV4_LEN: usize = 4;
const MAC_LEN: usize = 6;

fn put_ipv4(w: &mut Writer, ip: Ipv4Addr) -> Result<(), CodecError> {
    w.put_fixed(&ip.octets())
}

fn read_ipv4(r: &mut Reader<'_>) -> Result<Ipv4Addr, CodecError> {
    Ok(Ipv4Addr::from(r.fixed::<IPV4_LEN>()?))
}

// ───────────────────────────────────────────────────────────────
// Antenna
// ───────────────────────────────────────────────────────────────

/// Which WiFi antenna the coprocessor drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Antenna {
    #[default]
    OnBoard = 0,
    External = 1,
}

impl Antenna {
    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        match r.u8()? {
            0 => Ok(Self::OnBoard),
            1 => Ok(Self::External),
            _ => Err(CodecError::MalformedRecord("unknown antenna")),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Requests
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    pub ssid: Ssid,
    pub password: Passphrase,
    /// Let the coprocessor reassociate on its own after a drop.
    pub reconnect: bool,
}

impl WireRecord for ConnectRequest {
    fn encoded_len(&self) -> usize {
        var_len(self.ssid.len()) + var_len(self.password.len()) + 1
    }

    fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.put_str(&self.ssid)?;
        w.put_str(&self.password)?;
        w.put_bool(self.reconnect)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            ssid: r.string()?,
            password: r.string()?,
            reconnect: r.bool()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisconnectRequest {
    pub reconnect: bool,
}

impl WireRecord for DisconnectRequest {
    fn encoded_len(&self) -> usize {
        1
    }

    fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.put_bool(self.reconnect)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self { reconnect: r.bool()? })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartAccessPointRequest {
    pub ssid: Ssid,
    pub password: Passphrase,
    pub channel: u8,
    pub max_connections: u8,
    pub hidden: bool,
}

impl WireRecord for StartAccessPointRequest {
    fn encoded_len(&self) -> usize {
        var_len(self.ssid.len()) + var_len(self.password.len()) + 3
    }

    fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.put_str(&self.ssid)?;
        w.put_str(&self.password)?;
        w.put_u8(self.channel)?;
        w.put_u8(self.max_connections)?;
        w.put_bool(self.hidden)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            ssid: r.string()?,
            password: r.string()?,
            channel: r.u8()?,
            max_connections: r.u8()?,
            hidden: r.bool()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetAntennaRequest {
    pub antenna: Antenna,
    /// Store the selection in coprocessor flash.
    pub persist: bool,
}

impl WireRecord for SetAntennaRequest {
    fn encoded_len(&self) -> usize {
        2
    }

    fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.put_u8(self.antenna as u8)?;
        w.put_bool(self.persist)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            antenna: Antenna::decode(r)?,
            persist: r.bool()?,
        })
    }
}

/// Empty `ssid` scans for every network; channel 0 scans all channels.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScanRequest {
    pub ssid: Ssid,
    pub channel: u8,
    pub show_hidden: bool,
}

impl WireRecord for ScanRequest {
    fn encoded_len(&self) -> usize {
        var_len(self.ssid.len()) + 2
    }

    fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.put_str(&self.ssid)?;
        w.put_u8(self.channel)?;
        w.put_bool(self.show_hidden)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            ssid: r.string()?,
            channel: r.u8()?,
            show_hidden: r.bool()?,
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Responses
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AntennaResponse {
    pub antenna: Antenna,
}

impl WireRecord for AntennaResponse {
    fn encoded_len(&self) -> usize {
        1
    }

    fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.put_u8(self.antenna as u8)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            antenna: Antenna::decode(r)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacAddressResponse {
    pub mac: MacAddress,
}

impl WireRecord for MacAddressResponse {
    fn encoded_len(&self) -> usize {
        MAC_LEN
    }

    fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.put_fixed(&self.mac)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self { mac: r.fixed()? })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPoint {
    pub ssid: Ssid,
    pub bssid: MacAddress,
    pub channel: u8,
    pub rssi: i8,
    pub auth_mode: u8,
}

/// Smallest possible encoded [`AccessPoint`] (empty SSID).
const ACCESS_POINT_MIN_LEN: usize = 4 + MAC_LEN + 3;

impl WireRecord for AccessPoint {
    fn encoded_len(&self) -> usize {
        var_len(self.ssid.len()) + MAC_LEN + 3
    }

    fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.put_str(&self.ssid)?;
        w.put_fixed(&self.bssid)?;
        w.put_u8(self.channel)?;
        w.put_i8(self.rssi)?;
        w.put_u8(self.auth_mode)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            ssid: r.string()?,
            bssid: r.fixed()?,
            channel: r.u8()?,
            rssi: r.i8()?,
            auth_mode: r.u8()?,
        })
    }
}

/// Scan results: `count: u32` followed by `count` access points.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessPointList {
    pub access_points: Vec<AccessPoint>,
}

impl WireRecord for AccessPointList {
    fn encoded_len(&self) -> usize {
        4 + self
            .access_points
            .iter()
            .map(AccessPoint::encoded_len)
            .sum::<usize>()
    }

    fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.put_u32(self.access_points.len() as u32)?;
        for ap in &self.access_points {
            ap.encode(w)?;
        }
        Ok(())
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let count = r.u32()? as usize;
        // Bound the allocation by what the buffer could possibly hold.
        if count > r.remaining() / ACCESS_POINT_MIN_LEN {
            return Err(CodecError::MalformedRecord("access point count exceeds buffer"));
        }
        let mut access_points = Vec::with_capacity(count);
        for _ in 0..count {
            access_points.push(AccessPoint::decode(r)?);
        }
        Ok(Self { access_points })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInformation {
    pub firmware_version: String,
    pub idf_version: String,
    pub board: String,
    pub wifi_mac: MacAddress,
    pub ethernet_mac: MacAddress,
}

impl WireRecord for DeviceInformation {
    fn encoded_len(&self) -> usize {
        var_len(self.firmware_version.len())
            + var_len(self.idf_version.len())
            + var_len(self.board.len())
            + 2 * MAC_LEN
    }

    fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.put_str(&self.firmware_version)?;
        w.put_str(&self.idf_version)?;
        w.put_str(&self.board)?;
        w.put_fixed(&self.wifi_mac)?;
        w.put_fixed(&self.ethernet_mac)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            firmware_version: r.string_owned()?,
            idf_version: r.string_owned()?,
            board: r.string_owned()?,
            wifi_mac: r.fixed()?,
            ethernet_mac: r.fixed()?,
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Event payloads
// ───────────────────────────────────────────────────────────────

/// Payload of `WifiFunction::ConnectedToAccessPoint`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectEventData {
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub ssid: Ssid,
    pub bssid: MacAddress,
    pub channel: u8,
    pub auth_mode: u8,
}

impl WireRecord for ConnectEventData {
    fn encoded_len(&self) -> usize {
        3 * IPV4_LEN + var_len(self.ssid.len()) + MAC_LEN + 2
    }

    fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        put_ipv4(w, self.ip)?;
        put_ipv4(w, self.netmask)?;
        put_ipv4(w, self.gateway)?;
        w.put_str(&self.ssid)?;
        w.put_fixed(&self.bssid)?;
        w.put_u8(self.channel)?;
        w.put_u8(self.auth_mode)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            ip: read_ipv4(r)?,
            netmask: read_ipv4(r)?,
            gateway: read_ipv4(r)?,
            ssid: r.string()?,
            bssid: r.fixed()?,
            channel: r.u8()?,
            auth_mode: r.u8()?,
        })
    }
}

/// Payload of `WifiFunction::DisconnectedFromAccessPoint`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectEventData {
    pub ssid: Ssid,
    pub bssid: MacAddress,
    /// 802.11 reason code as reported by the coprocessor.
    pub reason: u8,
}

impl WireRecord for DisconnectEventData {
    fn encoded_len(&self) -> usize {
        var_len(self.ssid.len()) + MAC_LEN + 1
    }

    fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.put_str(&self.ssid)?;
        w.put_fixed(&self.bssid)?;
        w.put_u8(self.reason)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            ssid: r.string()?,
            bssid: r.fixed()?,
            reason: r.u8()?,
        })
    }
}

/// A station joined or left the coprocessor's soft access point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StationEventData {
    pub mac: MacAddress,
    pub aid: u8,
}

impl WireRecord for StationEventData {
    fn encoded_len(&self) -> usize {
        MAC_LEN + 1
    }

    fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.put_fixed(&self.mac)?;
        w.put_u8(self.aid)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            mac: r.fixed()?,
            aid: r.u8()?,
        })
    }
}

/// Payload of `EthernetFunction::Connected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetEventData {
    pub ip: Ipv4Addr,
    pub netmask: Ipv4Addr,
    pub gateway: Ipv4Addr,
    pub mac: MacAddress,
}

impl WireRecord for EthernetEventData {
    fn encoded_len(&self) -> usize {
        3 * IPV4_LEN + MAC_LEN
    }

    fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        put_ipv4(w, self.ip)?;
        put_ipv4(w, self.netmask)?;
        put_ipv4(w, self.gateway)?;
        w.put_fixed(&self.mac)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            ip: read_ipv4(r)?,
            netmask: read_ipv4(r)?,
            gateway: read_ipv4(r)?,
            mac: r.fixed()?,
        })
    }
}

/// Payload of `SystemFunction::ErrorReported`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEventData {
    pub code: u32,
    pub message: String,
}

impl WireRecord for ErrorEventData {
    fn encoded_len(&self) -> usize {
        4 + var_len(self.message.len())
    }

    fn encode(&self, w: &mut Writer) -> Result<(), CodecError> {
        w.put_u32(self.code)?;
        w.put_str(&self.message)
    }

    fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            code: r.u32()?,
            message: r.string_owned()?,
        })
    }
}
