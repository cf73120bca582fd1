//! Adapter 工厂
//!
//! 根据 `AdapterConfig` 创建 `SampleSource`。

use contracts::{AdapterConfig, ChannelKind, DriverKind, PixelFormat, SampleSource};
use tracing::debug;

use crate::error::{IngestionError, Result};
use crate::sim::{SimAdc, SimCamera, SimImu, SimLidar};

/// 创建 source
///
/// 支持的 sim 参数:
/// - 全部: `seed`
/// - scan: `points` (360), `range_m` (5.0)
/// - imu: `noise` (0.02)
/// - adc: `max_voltage` (3.3)
/// - camera: `width` (640), `height` (480), `format` (`bgr8` | `gray8`)
pub fn create_source(config: &AdapterConfig) -> Result<Box<dyn SampleSource>> {
    let name = config.name();
    let seed = parse_optional::<u64>(config, "seed")?;

    let source: Box<dyn SampleSource> = match (config.driver, config.kind) {
        (DriverKind::Sim, ChannelKind::Scan) => {
            let points = parse_or(config, "points", 360usize)?;
            if points == 0 {
                return Err(invalid(config, "points", "must be > 0"));
            }
            let range_m = parse_or(config, "range_m", 5.0f32)?;
            if !(range_m.is_finite() && range_m > 0.0) {
                return Err(invalid(config, "range_m", "must be finite and > 0"));
            }
            Box::new(SimLidar::with_params(
                name,
                config.frequency_hz,
                points,
                range_m,
                seed,
            ))
        }
        (DriverKind::Sim, ChannelKind::Imu) => {
            let noise = parse_or(config, "noise", 0.02f32)?;
            if !(noise.is_finite() && noise >= 0.0) {
                return Err(invalid(config, "noise", "must be finite and >= 0"));
            }
            Box::new(SimImu::with_params(name, config.frequency_hz, noise, seed))
        }
        (DriverKind::Sim, ChannelKind::Adc) => {
            let max_voltage = parse_or(config, "max_voltage", 3.3f32)?;
            if !(max_voltage.is_finite() && max_voltage > 0.0) {
                return Err(invalid(config, "max_voltage", "must be finite and > 0"));
            }
            Box::new(SimAdc::with_params(
                name,
                config.frequency_hz,
                max_voltage,
                seed,
            ))
        }
        (DriverKind::Sim, ChannelKind::Camera) => {
            let width = parse_or(config, "width", 640u32)?;
            let height = parse_or(config, "height", 480u32)?;
            if width == 0 || height == 0 {
                return Err(invalid(config, "width/height", "must be > 0"));
            }
            let format = match config.params.get("format").map(String::as_str) {
                None | Some("bgr8") => PixelFormat::Bgr8,
                Some("gray8") => PixelFormat::Gray8,
                Some(other) => {
                    return Err(invalid(
                        config,
                        "format",
                        format!("unknown pixel format '{other}'"),
                    ))
                }
            };
            Box::new(SimCamera::with_params(
                name,
                config.frequency_hz,
                width,
                height,
                format,
            ))
        }
    };

    debug!(
        source = %source.name(),
        kind = %config.kind,
        frequency_hz = config.frequency_hz,
        "source created"
    );
    Ok(source)
}

fn parse_optional<T: std::str::FromStr>(config: &AdapterConfig, key: &str) -> Result<Option<T>> {
    match config.params.get(key) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| invalid(config, key, format!("cannot parse '{raw}'"))),
    }
}

fn parse_or<T: std::str::FromStr>(config: &AdapterConfig, key: &str, default: T) -> Result<T> {
    Ok(parse_optional(config, key)?.unwrap_or(default))
}

fn invalid(config: &AdapterConfig, key: &str, message: impl Into<String>) -> IngestionError {
    IngestionError::InvalidParam {
        name: config.name(),
        key: key.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SensorSample;
    use std::collections::HashMap;

    fn config(kind: ChannelKind, params: &[(&str, &str)]) -> AdapterConfig {
        AdapterConfig {
            kind,
            driver: DriverKind::Sim,
            frequency_hz: 50.0,
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn test_create_all_kinds() {
        for kind in ChannelKind::ALL {
            let source = create_source(&config(kind, &[])).unwrap();
            assert_eq!(source.kind(), kind);
            assert_eq!(source.name(), format!("sim_{kind}"));
        }
    }

    #[test]
    fn test_camera_params() {
        let mut source = create_source(&config(
            ChannelKind::Camera,
            &[("width", "8"), ("height", "2"), ("format", "gray8")],
        ))
        .unwrap();
        let Some(SensorSample::Camera(frame)) = source.poll_sample() else {
            panic!("expected camera frame");
        };
        assert_eq!((frame.width, frame.height), (8, 2));
        assert_eq!(frame.format, PixelFormat::Gray8);
        assert_eq!(frame.data.len(), 16);
    }

    #[test]
    fn test_scan_points_param() {
        let mut source =
            create_source(&config(ChannelKind::Scan, &[("points", "12"), ("seed", "3")])).unwrap();
        let Some(SensorSample::Scan(scan)) = source.poll_sample() else {
            panic!("expected scan");
        };
        assert_eq!(scan.points.len(), 12);
    }

    #[test]
    fn test_invalid_params() {
        let err = create_source(&config(ChannelKind::Scan, &[("points", "many")])).err();
        assert!(matches!(err, Some(IngestionError::InvalidParam { .. })));

        let err = create_source(&config(ChannelKind::Camera, &[("format", "rgba")])).err();
        assert!(matches!(
            err,
            Some(IngestionError::InvalidParam { ref key, .. }) if key == "format"
        ));

        let err = create_source(&config(ChannelKind::Adc, &[("max_voltage", "0")])).err();
        assert!(err.is_some());
    }

    #[test]
    fn test_non_finite_params_rejected() {
        for raw in ["NaN", "inf", "-inf"] {
            let err = create_source(&config(ChannelKind::Imu, &[("noise", raw)])).err();
            assert!(matches!(
                err,
                Some(IngestionError::InvalidParam { ref key, .. }) if key == "noise"
            ));
            let err = create_source(&config(ChannelKind::Adc, &[("max_voltage", raw)])).err();
            assert!(err.is_some());
            let err = create_source(&config(ChannelKind::Scan, &[("range_m", raw)])).err();
            assert!(err.is_some());
        }
        assert!(create_source(&config(ChannelKind::Imu, &[("noise", "0")])).is_ok());
    }
}
