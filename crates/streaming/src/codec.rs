//! Wire codec - sample ⇄ wire message
//!
//! 纯函数转换。相机帧在此处编码为 JPEG。

use bytes::Bytes;
use contracts::{
    AdcMessage, AnalogSample, CameraEncoding, CameraMessage, ChannelKind, ContractError,
    ImageFrame, ImuMessage, InertialSample, PixelFormat, Point3, PointCloudMessage, PointMessage,
    RangeScan, Sample, WireMessage,
};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat};

/// Sample → wire message conversion for one channel
pub trait WireCodec<S: Sample>: Send + Sync + 'static {
    /// Wire message produced for `S`
    type Message: Into<WireMessage> + Send + 'static;

    /// Encode one sample
    ///
    /// # Errors
    /// `ContractError::Encode` when the sample cannot be represented
    fn encode(&self, sample: &S) -> Result<Self::Message, ContractError>;
}

/// RangeScan → PointCloudMessage
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanCodec;

impl WireCodec<RangeScan> for ScanCodec {
    type Message = PointCloudMessage;

    fn encode(&self, sample: &RangeScan) -> Result<PointCloudMessage, ContractError> {
        Ok(PointCloudMessage {
            timestamp: sample.timestamp_us,
            points: sample
                .points
                .iter()
                .map(|p| PointMessage {
                    x: p.x,
                    y: p.y,
                    z: p.z,
                    intensity: p.intensity,
                })
                .collect(),
        })
    }
}

/// InertialSample → ImuMessage
#[derive(Debug, Clone, Copy, Default)]
pub struct ImuCodec;

impl WireCodec<InertialSample> for ImuCodec {
    type Message = ImuMessage;

    fn encode(&self, sample: &InertialSample) -> Result<ImuMessage, ContractError> {
        let [ax, ay, az] = sample.accel;
        let [gx, gy, gz] = sample.gyro;
        Ok(ImuMessage {
            ax,
            ay,
            az,
            gx,
            gy,
            gz,
            timestamp: sample.timestamp_us,
        })
    }
}

/// AnalogSample → AdcMessage
#[derive(Debug, Clone, Copy, Default)]
pub struct AdcCodec;

impl WireCodec<AnalogSample> for AdcCodec {
    type Message = AdcMessage;

    fn encode(&self, sample: &AnalogSample) -> Result<AdcMessage, ContractError> {
        Ok(AdcMessage {
            sample: sample.voltage,
            timestamp: sample.timestamp_us,
        })
    }
}

/// ImageFrame → JPEG CameraMessage
#[derive(Debug, Clone, Copy)]
pub struct CameraCodec {
    quality: u8,
}

impl CameraCodec {
    /// `quality` is clamped to [1, 100]
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl Default for CameraCodec {
    fn default() -> Self {
        Self::new(85)
    }
}

impl WireCodec<ImageFrame> for CameraCodec {
    type Message = CameraMessage;

    fn encode(&self, frame: &ImageFrame) -> Result<CameraMessage, ContractError> {
        if frame.width == 0 || frame.height == 0 {
            return Err(ContractError::encode(ChannelKind::Camera, "empty frame"));
        }
        if frame.data.len() != frame.expected_len() {
            return Err(ContractError::encode(
                ChannelKind::Camera,
                format!(
                    "pixel buffer is {} bytes, expected {} for {}x{} {:?}",
                    frame.data.len(),
                    frame.expected_len(),
                    frame.width,
                    frame.height,
                    frame.format
                ),
            ));
        }

        // JPEG 编码器只接受 RGB 顺序
        let (pixels, color, encoding) = match frame.format {
            PixelFormat::Bgr8 => (
                swap_red_blue(&frame.data),
                ExtendedColorType::Rgb8,
                CameraEncoding::Bgr8,
            ),
            PixelFormat::Gray8 => (
                frame.data.to_vec(),
                ExtendedColorType::L8,
                CameraEncoding::Gray8,
            ),
        };

        let mut jpeg = Vec::new();
        JpegEncoder::new_with_quality(&mut jpeg, self.quality)
            .write_image(&pixels, frame.width, frame.height, color)
            .map_err(|e| ContractError::encode(ChannelKind::Camera, e.to_string()))?;

        Ok(CameraMessage {
            width: frame.width,
            height: frame.height,
            encoding,
            timestamp: frame.timestamp_us,
            jpeg: Bytes::from(jpeg),
        })
    }
}

/// BGR ⇄ RGB (3 bytes per pixel)
fn swap_red_blue(data: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    for px in out.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    out
}

/// PointCloudMessage → RangeScan
pub fn decode_scan(message: &PointCloudMessage) -> RangeScan {
    RangeScan {
        timestamp_us: message.timestamp,
        points: message
            .points
            .iter()
            .map(|p| Point3 {
                x: p.x,
                y: p.y,
                z: p.z,
                intensity: p.intensity,
            })
            .collect(),
    }
}

/// ImuMessage → InertialSample
pub fn decode_imu(message: &ImuMessage) -> InertialSample {
    InertialSample {
        timestamp_us: message.timestamp,
        accel: [message.ax, message.ay, message.az],
        gyro: [message.gx, message.gy, message.gz],
    }
}

/// AdcMessage → AnalogSample
pub fn decode_adc(message: &AdcMessage) -> AnalogSample {
    AnalogSample {
        timestamp_us: message.timestamp,
        voltage: message.sample,
    }
}

/// CameraMessage → ImageFrame (JPEG decoded back to raw pixels)
///
/// # Errors
/// Malformed JPEG, unknown encoding, or dimensions that disagree with the header
pub fn decode_camera(message: &CameraMessage) -> Result<ImageFrame, ContractError> {
    let image = image::load_from_memory_with_format(&message.jpeg, ImageFormat::Jpeg)
        .map_err(|e| ContractError::decode(format!("jpeg: {e}")))?;

    if (image.width(), image.height()) != (message.width, message.height) {
        return Err(ContractError::decode(format!(
            "jpeg is {}x{}, header says {}x{}",
            image.width(),
            image.height(),
            message.width,
            message.height
        )));
    }

    let (format, data) = match message.encoding {
        CameraEncoding::Bgr8 => (PixelFormat::Bgr8, swap_red_blue(image.to_rgb8().as_raw())),
        CameraEncoding::Gray8 => (PixelFormat::Gray8, image.to_luma8().into_raw()),
        CameraEncoding::Unknown => {
            return Err(ContractError::decode("unknown camera encoding"));
        }
    };

    Ok(ImageFrame {
        timestamp_us: message.timestamp,
        width: message.width,
        height: message.height,
        format,
        data: Bytes::from(data),
    })
}
