//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 配置 → registry → producer 装配
//! - 仿真 e2e 测试：producer 线程 → broker → stream pump → writer
//! - TCP binding 端到端

#[cfg(test)]
mod contract_tests {
    use contracts::ChannelKind;

    const CONFIG: &str = r#"
[server]
listen_addr = "127.0.0.1:0"
wire_format = "json"

[[adapters]]
kind = "scan"
frequency_hz = 10.0
params = { points = "90" }

[[adapters]]
kind = "adc"
frequency_hz = 50.0
"#;

    #[test]
    fn test_blueprint_drives_registry_and_producers() {
        let blueprint =
            config_loader::ConfigLoader::load_from_str(CONFIG, config_loader::ConfigFormat::Toml)
                .unwrap();
        let registry = std::sync::Arc::new(broker::ChannelRegistry::new(
            &blueprint.available_channels(),
        ));
        assert!(registry.is_available(ChannelKind::Scan));
        assert!(registry.is_available(ChannelKind::Adc));
        assert!(!registry.is_available(ChannelKind::Imu));

        let pipeline = ingestion::IngestionPipeline::from_blueprint(registry, &blueprint).unwrap();
        assert_eq!(pipeline.source_count(), 2);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use broker::ChannelRegistry;
    use contracts::{
        ChannelKind, PixelFormat, SampleSource, StatusCode, WireFormat, WireMessage,
    };
    use ingestion::{IngestionPipeline, SimAdc, SimCamera, SimImu, SimLidar};
    use streaming::transport::{TcpClient, TcpTransport};
    use streaming::{
        decode_camera, decode_scan, ChannelWriter, SensorService, ServiceConfig, SessionEnd,
        StreamRequest,
    };
    use tokio::net::TcpListener;
    use tokio_util::sync::CancellationToken;

    fn boxed<S: SampleSource + 'static>(source: S) -> Box<dyn SampleSource> {
        Box::new(source)
    }

    /// Registry + running producers + service for the given sources
    fn start(sources: Vec<Box<dyn SampleSource>>) -> (Arc<SensorService>, IngestionPipeline) {
        let kinds: Vec<ChannelKind> = sources.iter().map(|s| s.kind()).collect();
        let registry = Arc::new(ChannelRegistry::new(&kinds));
        let mut pipeline = IngestionPipeline::new(registry.clone());
        for source in sources {
            pipeline.register_source(source, None).unwrap();
        }
        pipeline.start_all().unwrap();
        let service = Arc::new(SensorService::new(registry, ServiceConfig::default()));
        (service, pipeline)
    }

    /// End-to-end test: SimImu -> producer thread -> broker -> pump -> ChannelWriter
    ///
    /// 验证完整的数据流：
    /// 1. producer 线程按频率推送样本
    /// 2. pump 按产生顺序投递，无重复
    /// 3. 取消后通道被释放
    #[tokio::test]
    async fn test_e2e_sim_imu_stream() {
        let (service, mut pipeline) = start(vec![boxed(SimImu::new("sim_imu", 500.0))]);
        let (mut writer, mut rx) = ChannelWriter::pair(16);
        let cancel = CancellationToken::new();
        let target = 20;

        let pump_service = service.clone();
        let pump_cancel = cancel.clone();
        let pump = tokio::spawn(async move {
            pump_service
                .stream_imu(&StreamRequest::default(), &mut writer, &pump_cancel)
                .await
        });

        let mut timestamps = Vec::new();
        let collected = tokio::time::timeout(Duration::from_secs(5), async {
            while timestamps.len() < target {
                let message = rx.recv().await.unwrap();
                timestamps.push(message.timestamp);
            }
        })
        .await;
        cancel.cancel();

        let summary = tokio::time::timeout(Duration::from_secs(2), pump)
            .await
            .expect("pump did not observe cancellation")
            .unwrap()
            .unwrap();
        pipeline.stop_all();

        assert!(collected.is_ok(), "stream timed out");
        assert!(
            timestamps.windows(2).all(|w| w[0] < w[1]),
            "timestamps must increase strictly: {timestamps:?}"
        );
        assert_eq!(summary.end, SessionEnd::Cancelled);
        assert!(summary.sent >= target as u64);
        assert!(!service.registry().is_streaming(ChannelKind::Imu));
        assert!(service.open_imu(&StreamRequest::default()).is_ok());
    }

    /// Slow consumer: the producer keeps running, old samples are shed
    #[tokio::test]
    async fn test_slow_consumer_sheds_oldest() {
        let (service, mut pipeline) = start(vec![boxed(SimImu::new("sim_imu", 1000.0))]);
        let (mut writer, mut rx) = ChannelWriter::pair(1);
        let cancel = CancellationToken::new();

        let pump_service = service.clone();
        let pump_cancel = cancel.clone();
        let pump = tokio::spawn(async move {
            pump_service
                .stream_imu(&StreamRequest::with_queue_size(4), &mut writer, &pump_cancel)
                .await
        });

        let mut timestamps = Vec::new();
        for _ in 0..5 {
            tokio::time::sleep(Duration::from_millis(30)).await;
            timestamps.push(rx.recv().await.unwrap().timestamp);
        }
        cancel.cancel();
        let summary = pump.await.unwrap().unwrap();
        pipeline.stop_all();

        assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
        assert!(summary.dropped > 0, "a 4-slot queue at 1 kHz must overflow");
        assert!(service.registry().channel_status(ChannelKind::Imu).metrics.evicted > 0);
    }

    /// Concurrent attach attempts: exactly one wins
    #[tokio::test]
    async fn test_single_session_under_contention() {
        let (service, mut pipeline) = start(vec![boxed(SimLidar::new("sim_scan", 10.0))]);

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            tasks.push(tokio::spawn(async move {
                let (mut writer, _rx) = ChannelWriter::pair(1);
                let cancel = CancellationToken::new();
                cancel.cancel();
                match service.open_scan(&StreamRequest::default()) {
                    Ok(stream) => {
                        // hold the session long enough for every other task to try
                        tokio::time::sleep(Duration::from_millis(100)).await;
                        stream.run(&mut writer, &cancel).await;
                        Ok(())
                    }
                    Err(e) => Err(e.code()),
                }
            }));
        }

        let mut winners = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(()) => winners += 1,
                Err(code) => assert_eq!(code, StatusCode::ResourceExhausted),
            }
        }
        pipeline.stop_all();

        assert_eq!(winners, 1);
        assert!(!service.registry().is_streaming(ChannelKind::Scan));
    }

    #[tokio::test]
    async fn test_unavailable_channels() {
        let (service, mut pipeline) = start(vec![boxed(SimImu::new("sim_imu", 100.0))]);
        let err = service.open_scan(&StreamRequest::default()).err().unwrap();
        assert_eq!(err.code(), StatusCode::Unavailable);
        let err = service.open_camera(&StreamRequest::default()).err().unwrap();
        assert_eq!(err.code(), StatusCode::Unavailable);
        let err = service.read_adc(&Default::default()).unwrap_err();
        assert_eq!(err.code(), StatusCode::Unavailable);
        pipeline.stop_all();
    }

    /// Full stack over TCP: producers, transport, client decode
    #[tokio::test]
    async fn test_tcp_scan_camera_and_adc() {
        let (service, mut pipeline) = start(vec![
            boxed(SimLidar::with_params("sim_scan", 50.0, 90, 5.0, Some(1))),
            boxed(SimCamera::with_params("sim_camera", 30.0, 64, 48, PixelFormat::Bgr8)),
            boxed(SimAdc::new("sim_adc", 100.0)),
        ]);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let shutdown = CancellationToken::new();
        let transport = TcpTransport::new(service.clone(), WireFormat::Bincode);
        let server = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move { transport.serve(listener, shutdown).await })
        };

        let client = TcpClient::new(addr, WireFormat::Bincode);

        let mut scans = client.open_stream(ChannelKind::Scan, Some(5)).await.unwrap();
        let mut cameras = client.open_stream(ChannelKind::Camera, None).await.unwrap();

        let received = tokio::time::timeout(Duration::from_secs(5), async {
            let scan = match scans.next().await.unwrap() {
                Some(WireMessage::Scan(message)) => decode_scan(&message),
                other => panic!("unexpected {other:?}"),
            };
            let frame = match cameras.next().await.unwrap() {
                Some(WireMessage::Camera(message)) => decode_camera(&message).unwrap(),
                other => panic!("unexpected {other:?}"),
            };
            (scan, frame)
        })
        .await
        .expect("no data over tcp");
        let (scan, frame) = received;
        assert_eq!(scan.points.len(), 90);
        assert_eq!((frame.width, frame.height), (64, 48));
        assert_eq!(frame.format, PixelFormat::Bgr8);

        // ADC: retry until the producer has written the slot
        let reading = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match client.read_adc().await {
                    Ok(reading) => break reading,
                    Err(e) => {
                        assert_eq!(e.code(), StatusCode::Unknown);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        })
        .await
        .unwrap();
        assert!((0.0..=3.3).contains(&reading.sample));

        // a second scan client is turned away while the first is connected
        let err = client.open_stream(ChannelKind::Scan, None).await.unwrap_err();
        assert_eq!(err.code(), StatusCode::ResourceExhausted);

        drop(scans);
        drop(cameras);
        shutdown.cancel();
        server.await.unwrap().unwrap();
        pipeline.stop_all();

        assert!(!service.registry().is_streaming(ChannelKind::Scan));
        assert!(!service.registry().is_streaming(ChannelKind::Camera));
        assert_eq!(service.session_stats().total_sessions, 2);
    }
}
