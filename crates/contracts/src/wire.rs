//! Wire messages - the external serialization of samples
//!
//! Field-by-field mirrors of the sample structs as a remote consumer sees
//! them. Conversion lives in the streaming codec.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// One point of a point cloud message
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PointMessage {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
}

/// Range scan on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointCloudMessage {
    pub timestamp: u64,
    pub points: Vec<PointMessage>,
}

/// IMU sample on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImuMessage {
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
    pub gx: f32,
    pub gy: f32,
    pub gz: f32,
    pub timestamp: u64,
}

/// ADC reading on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AdcMessage {
    /// Voltage (V)
    pub sample: f32,
    pub timestamp: u64,
}

/// Pixel layout of the frame the JPEG was encoded from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraEncoding {
    #[default]
    Unknown,
    Bgr8,
    Gray8,
}

/// Camera frame on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CameraMessage {
    pub width: u32,
    pub height: u32,
    pub encoding: CameraEncoding,
    pub timestamp: u64,
    /// JPEG-encoded image
    pub jpeg: Bytes,
}

/// Any wire message, tagged by channel
///
/// Used by transports that carry several channels over one framing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireMessage {
    Scan(PointCloudMessage),
    Imu(ImuMessage),
    Adc(AdcMessage),
    Camera(CameraMessage),
}

impl WireMessage {
    /// Capture timestamp carried by the message
    pub fn timestamp(&self) -> u64 {
        match self {
            WireMessage::Scan(m) => m.timestamp,
            WireMessage::Imu(m) => m.timestamp,
            WireMessage::Adc(m) => m.timestamp,
            WireMessage::Camera(m) => m.timestamp,
        }
    }
}

/// One-line summary; payloads are not printed
impl fmt::Display for WireMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireMessage::Scan(m) => write!(f, "scan t={} points={}", m.timestamp, m.points.len()),
            WireMessage::Imu(m) => write!(
                f,
                "imu t={} accel=[{:.3}, {:.3}, {:.3}] gyro=[{:.3}, {:.3}, {:.3}]",
                m.timestamp, m.ax, m.ay, m.az, m.gx, m.gy, m.gz
            ),
            WireMessage::Adc(m) => write!(f, "adc t={} voltage={:.3}V", m.timestamp, m.sample),
            WireMessage::Camera(m) => write!(
                f,
                "camera t={} {}x{} {:?} jpeg={}B",
                m.timestamp,
                m.width,
                m.height,
                m.encoding,
                m.jpeg.len()
            ),
        }
    }
}

impl From<PointCloudMessage> for WireMessage {
    fn from(m: PointCloudMessage) -> Self {
        WireMessage::Scan(m)
    }
}

impl From<ImuMessage> for WireMessage {
    fn from(m: ImuMessage) -> Self {
        WireMessage::Imu(m)
    }
}

impl From<AdcMessage> for WireMessage {
    fn from(m: AdcMessage) -> Self {
        WireMessage::Adc(m)
    }
}

impl From<CameraMessage> for WireMessage {
    fn from(m: CameraMessage) -> Self {
        WireMessage::Camera(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_summaries() {
        let scan = WireMessage::from(PointCloudMessage {
            timestamp: 7,
            points: vec![PointMessage::default(); 3],
        });
        assert_eq!(scan.to_string(), "scan t=7 points=3");

        let adc = WireMessage::from(AdcMessage {
            sample: 1.5,
            timestamp: 9,
        });
        assert_eq!(adc.to_string(), "adc t=9 voltage=1.500V");
        assert_eq!(adc.timestamp(), 9);

        let camera = WireMessage::from(CameraMessage {
            width: 2,
            height: 1,
            encoding: CameraEncoding::Gray8,
            timestamp: 1,
            jpeg: Bytes::from_static(&[1, 2, 3]),
        });
        assert_eq!(camera.to_string(), "camera t=1 2x1 Gray8 jpeg=3B");
    }

    #[test]
    fn test_wire_message_json_tagging() {
        let imu = WireMessage::from(ImuMessage::default());
        let json = serde_json::to_string(&imu).unwrap();
        assert!(json.starts_with("{\"imu\":"));
        let back: WireMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, imu);
    }
}
