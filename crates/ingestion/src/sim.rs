//! 仿真传感器
//!
//! 无硬件环境下的 `SampleSource` 实现。每个 source 按 `frequency_hz`
//! 限速，两次 tick 之间 `poll_sample` 返回 `None`。

use std::f32::consts::TAU;
use std::time::{Duration, Instant};

use bytes::Bytes;
use contracts::{
    clock, AdapterConfig, AnalogSample, ChannelKind, ImageFrame, InertialSample, PixelFormat,
    Point3, RangeScan, SampleSource, SensorSample,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 标准重力 (m/s²)
const GRAVITY: f32 = 9.81;

/// 固定周期节拍器
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: Duration,
    next_due: Instant,
}

impl RateLimiter {
    /// `frequency_hz` 被钳制到 [`AdapterConfig::MIN_FREQUENCY_HZ`, `AdapterConfig::MAX_FREQUENCY_HZ`]，
    /// NaN 按最低频率处理
    pub fn new(frequency_hz: f64) -> Self {
        let hz = if frequency_hz.is_nan() {
            AdapterConfig::MIN_FREQUENCY_HZ
        } else {
            frequency_hz.clamp(AdapterConfig::MIN_FREQUENCY_HZ, AdapterConfig::MAX_FREQUENCY_HZ)
        };
        Self {
            interval: Duration::from_secs_f64(1.0 / hz),
            next_due: Instant::now(),
        }
    }

    /// 到期则返回 true 并推进到下一个周期
    ///
    /// 落后超过一个周期时不补发，直接对齐到当前时间。
    pub fn ready(&mut self) -> bool {
        let now = Instant::now();
        if now < self.next_due {
            return false;
        }
        self.next_due += self.interval;
        if self.next_due < now {
            self.next_due = now + self.interval;
        }
        true
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// 仿真 2D 激光雷达：每圈 `points` 个点，半径约 `range_m` 的环
pub struct SimLidar {
    name: String,
    limiter: RateLimiter,
    points: usize,
    range_m: f32,
    rng: StdRng,
}

impl SimLidar {
    pub fn new(name: impl Into<String>, frequency_hz: f64) -> Self {
        Self::with_params(name, frequency_hz, 360, 5.0, None)
    }

    pub fn with_params(
        name: impl Into<String>,
        frequency_hz: f64,
        points: usize,
        range_m: f32,
        seed: Option<u64>,
    ) -> Self {
        Self {
            name: name.into(),
            limiter: RateLimiter::new(frequency_hz),
            points,
            range_m,
            rng: make_rng(seed),
        }
    }

    fn scan(&mut self) -> RangeScan {
        let points = (0..self.points)
            .map(|i| {
                let angle = TAU * i as f32 / self.points as f32;
                let range = self.range_m + self.rng.random_range(-0.05..0.05);
                Point3 {
                    x: range * angle.cos(),
                    y: range * angle.sin(),
                    z: 0.0,
                    intensity: self.rng.random_range(0.0..1.0),
                }
            })
            .collect();
        RangeScan {
            timestamp_us: clock::now_us(),
            points,
        }
    }
}

impl SampleSource for SimLidar {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Scan
    }

    fn poll_sample(&mut self) -> Option<SensorSample> {
        self.limiter.ready().then(|| self.scan().into())
    }
}

/// 仿真 IMU：静止状态，重力 + 白噪声
pub struct SimImu {
    name: String,
    limiter: RateLimiter,
    noise: f32,
    rng: StdRng,
}

impl SimImu {
    pub fn new(name: impl Into<String>, frequency_hz: f64) -> Self {
        Self::with_params(name, frequency_hz, 0.02, None)
    }

    pub fn with_params(
        name: impl Into<String>,
        frequency_hz: f64,
        noise: f32,
        seed: Option<u64>,
    ) -> Self {
        Self {
            name: name.into(),
            limiter: RateLimiter::new(frequency_hz),
            noise: noise.abs(),
            rng: make_rng(seed),
        }
    }

    fn jitter(&mut self) -> f32 {
        if self.noise == 0.0 {
            0.0
        } else {
            self.rng.random_range(-self.noise..self.noise)
        }
    }
}

impl SampleSource for SimImu {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Imu
    }

    fn poll_sample(&mut self) -> Option<SensorSample> {
        if !self.limiter.ready() {
            return None;
        }
        let accel = [self.jitter(), self.jitter(), GRAVITY + self.jitter()];
        let gyro = [self.jitter(), self.jitter(), self.jitter()];
        Some(
            InertialSample {
                timestamp_us: clock::now_us(),
                accel,
                gyro,
            }
            .into(),
        )
    }
}

/// 仿真 ADC：[0, max_voltage) 均匀随机电压
pub struct SimAdc {
    name: String,
    limiter: RateLimiter,
    max_voltage: f32,
    rng: StdRng,
}

impl SimAdc {
    pub fn new(name: impl Into<String>, frequency_hz: f64) -> Self {
        Self::with_params(name, frequency_hz, 3.3, None)
    }

    pub fn with_params(
        name: impl Into<String>,
        frequency_hz: f64,
        max_voltage: f32,
        seed: Option<u64>,
    ) -> Self {
        Self {
            name: name.into(),
            limiter: RateLimiter::new(frequency_hz),
            max_voltage,
            rng: make_rng(seed),
        }
    }
}

impl SampleSource for SimAdc {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Adc
    }

    fn poll_sample(&mut self) -> Option<SensorSample> {
        if !self.limiter.ready() {
            return None;
        }
        let voltage = self.rng.random::<f32>() * self.max_voltage;
        Some(
            AnalogSample {
                timestamp_us: clock::now_us(),
                voltage,
            }
            .into(),
        )
    }
}

/// 仿真相机：固定渐变图
///
/// BGR8 像素 (x % 256, y % 256, (x + y) % 256)；GRAY8 取 (x + y) % 256。
/// 像素缓冲只生成一次，之后每帧共享同一个不可变 `Bytes`。
pub struct SimCamera {
    name: String,
    limiter: RateLimiter,
    width: u32,
    height: u32,
    format: PixelFormat,
    pixels: Bytes,
}

impl SimCamera {
    pub fn new(name: impl Into<String>, frequency_hz: f64) -> Self {
        Self::with_params(name, frequency_hz, 640, 480, PixelFormat::Bgr8)
    }

    pub fn with_params(
        name: impl Into<String>,
        frequency_hz: f64,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> Self {
        Self {
            name: name.into(),
            limiter: RateLimiter::new(frequency_hz),
            width,
            height,
            format,
            pixels: gradient(width, height, format),
        }
    }
}

fn gradient(width: u32, height: u32, format: PixelFormat) -> Bytes {
    let mut data = Vec::with_capacity(width as usize * height as usize * format.channels());
    for y in 0..height {
        for x in 0..width {
            match format {
                PixelFormat::Bgr8 => {
                    data.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
                }
                PixelFormat::Gray8 => data.push(((x + y) % 256) as u8),
            }
        }
    }
    Bytes::from(data)
}

impl SampleSource for SimCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ChannelKind {
        ChannelKind::Camera
    }

    fn poll_sample(&mut self) -> Option<SensorSample> {
        if !self.limiter.ready() {
            return None;
        }
        Some(
            ImageFrame {
                timestamp_us: clock::now_us(),
                width: self.width,
                height: self.height,
                format: self.format,
                data: self.pixels.clone(),
            }
            .into(),
        )
    }
}
