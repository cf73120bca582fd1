//! Sensor samples - adapter output
//!
//! 传感器样本结构。样本一经产生即不可变，在 producer -> queue -> consumer
//! 之间按值移动所有权。

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// 传感器通道类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// 3D 激光扫描
    Scan,
    /// 惯性测量单元
    Imu,
    /// 模拟量 (ADC)
    Adc,
    /// 相机帧
    Camera,
}

impl ChannelKind {
    /// All channel kinds, in a stable order
    pub const ALL: [ChannelKind; 4] = [
        ChannelKind::Scan,
        ChannelKind::Imu,
        ChannelKind::Adc,
        ChannelKind::Camera,
    ];

    /// How consumers read this channel
    pub fn mode(self) -> ChannelMode {
        match self {
            ChannelKind::Adc => ChannelMode::Unary,
            ChannelKind::Scan | ChannelKind::Imu | ChannelKind::Camera => ChannelMode::Streaming,
        }
    }

    /// Lowercase name used in logs, metrics labels and the CLI
    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Scan => "scan",
            ChannelKind::Imu => "imu",
            ChannelKind::Adc => "adc",
            ChannelKind::Camera => "camera",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChannelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "scan" | "lidar" => Ok(ChannelKind::Scan),
            "imu" => Ok(ChannelKind::Imu),
            "adc" => Ok(ChannelKind::Adc),
            "camera" => Ok(ChannelKind::Camera),
            other => Err(format!("unknown channel kind '{other}'")),
        }
    }
}

/// 通道读取方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelMode {
    /// Server-streaming: one session drains a bounded queue
    Streaming,
    /// Request/response: read the most recent retained sample
    Unary,
}

/// A timestamped unit of sensor data of one channel kind.
///
/// The broker and stream pump are generic over this trait, so the
/// scan / imu / camera streams share a single implementation.
pub trait Sample: Clone + fmt::Debug + Send + Sync + 'static {
    /// Channel this sample kind travels on
    const KIND: ChannelKind;

    /// Capture timestamp (monotonic microseconds)
    fn timestamp_us(&self) -> u64;
}

/// 3D 点 (米) + 反射强度
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub intensity: f32,
}

/// 一圈激光扫描
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeScan {
    /// 采集时间戳 (µs)
    pub timestamp_us: u64,

    /// 点列表
    pub points: Vec<Point3>,
}

/// 六轴 IMU 样本
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InertialSample {
    /// 采集时间戳 (µs)
    pub timestamp_us: u64,

    /// 加速度计 ax, ay, az (m/s²)
    pub accel: [f32; 3],

    /// 陀螺仪 gx, gy, gz (rad/s)
    pub gyro: [f32; 3],
}

/// 单端 ADC 读数
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalogSample {
    /// 采集时间戳 (µs)
    pub timestamp_us: u64,

    /// 电压 (V)
    pub voltage: f32,
}

/// 像素格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// 3 channels, blue-green-red, 8 bit each
    Bgr8,
    /// 1 channel, 8 bit
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Bgr8 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// 相机帧
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFrame {
    /// 采集时间戳 (µs)
    pub timestamp_us: u64,

    /// 图像宽度
    pub width: u32,

    /// 图像高度
    pub height: u32,

    /// 像素格式
    pub format: PixelFormat,

    /// 原始像素数据 (行优先, 无填充)
    pub data: Bytes,
}

impl ImageFrame {
    /// Expected length of `data` for the frame's dimensions and format
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.channels()
    }
}

impl Sample for RangeScan {
    const KIND: ChannelKind = ChannelKind::Scan;

    fn timestamp_us(&self) -> u64 {
        self.timestamp_us
    }
}

impl Sample for InertialSample {
    const KIND: ChannelKind = ChannelKind::Imu;

    fn timestamp_us(&self) -> u64 {
        self.timestamp_us
    }
}

impl Sample for AnalogSample {
    const KIND: ChannelKind = ChannelKind::Adc;

    fn timestamp_us(&self) -> u64 {
        self.timestamp_us
    }
}

impl Sample for ImageFrame {
    const KIND: ChannelKind = ChannelKind::Camera;

    fn timestamp_us(&self) -> u64 {
        self.timestamp_us
    }
}

/// Any sample, tagged by kind
///
/// What a [`crate::SampleSource`] yields; the channel registry routes it to
/// the broker of the matching kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SensorSample {
    Scan(RangeScan),
    Imu(InertialSample),
    Adc(AnalogSample),
    Camera(ImageFrame),
}

impl SensorSample {
    /// Channel kind of the wrapped sample
    pub fn kind(&self) -> ChannelKind {
        match self {
            SensorSample::Scan(_) => ChannelKind::Scan,
            SensorSample::Imu(_) => ChannelKind::Imu,
            SensorSample::Adc(_) => ChannelKind::Adc,
            SensorSample::Camera(_) => ChannelKind::Camera,
        }
    }

    /// Capture timestamp of the wrapped sample
    pub fn timestamp_us(&self) -> u64 {
        match self {
            SensorSample::Scan(s) => s.timestamp_us,
            SensorSample::Imu(s) => s.timestamp_us,
            SensorSample::Adc(s) => s.timestamp_us,
            SensorSample::Camera(s) => s.timestamp_us,
        }
    }
}

impl From<RangeScan> for SensorSample {
    fn from(s: RangeScan) -> Self {
        SensorSample::Scan(s)
    }
}

impl From<InertialSample> for SensorSample {
    fn from(s: InertialSample) -> Self {
        SensorSample::Imu(s)
    }
}

impl From<AnalogSample> for SensorSample {
    fn from(s: AnalogSample) -> Self {
        SensorSample::Adc(s)
    }
}

impl From<ImageFrame> for SensorSample {
    fn from(s: ImageFrame) -> Self {
        SensorSample::Camera(s)
    }
}
