use core::time::Duration;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wavecache::{
    DataSegmentData, Dispatcher, Error, FetchChannelSegmentsParams, GetWaveformParams,
    HttpMethod, HttpWaveformService, MemoryBackend, Request, RequestConfig, Response, TimeRange,
    WaveformService, WaveformStore,
};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path},
};

fn segments_payload() -> serde_json::Value {
    json!([{
        "id": {
            "channel": { "name": "ASAR.AS01.SHZ" },
            "creationTime": 1000,
            "startTime": "1970-01-01T00:00:10Z"
        },
        "timeseriesType": "WAVEFORM",
        "timeseries": [{
            "type": "WAVEFORM",
            "startTime": 10,
            "endTime": 12,
            "sampleRate": 1,
            "sampleCount": 3,
            "samples": [1.5, -2.0, 0.5]
        }]
    }])
}

fn config(server: &MockServer, url: &str) -> RequestConfig {
    RequestConfig {
        method: HttpMethod::Post,
        url: url.into(),
        base_url: Some(format!("{}/api", server.uri())),
        headers: [("accept".to_string(), "application/json".to_string())].into(),
        data: Some(json!({ "channels": ["ASAR.AS01.SHZ"] })),
    }
}

fn service() -> HttpWaveformService {
    HttpWaveformService::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn posts_the_request_config_and_decodes_segments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/waveform/channel-segment/query/channel-timerange"))
        .and(header("accept", "application/json"))
        .and(body_json(json!({ "channels": ["ASAR.AS01.SHZ"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(segments_payload()))
        .expect(1)
        .mount(&server)
        .await;

    let segments = service()
        .fetch_channel_segments(
            &config(&server, "/waveform/channel-segment/query/channel-timerange"),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].id.channel.name, "ASAR.AS01.SHZ");
    assert_eq!(segments[0].id.start_time, 10.0);
    assert_eq!(segments[0].timeseries[0].samples, vec![1.5, -2.0, 0.5]);
}

#[tokio::test]
async fn error_status_is_a_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = service()
        .fetch_channel_segments(&config(&server, "segments"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Network { .. }), "{err:?}");
}

#[tokio::test]
async fn undecodable_body_is_a_serialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = service()
        .fetch_events_with_segments(&config(&server, "events"), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Serialization { .. }), "{err:?}");
}

#[tokio::test]
async fn cancellation_abandons_a_slow_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(segments_payload())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let token = CancellationToken::new();
    let canceller = {
        let token = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            token.cancel();
        })
    };

    let err = service()
        .fetch_channel_segments(&config(&server, "segments"), &token)
        .await
        .unwrap_err();
    canceller.await.unwrap();
    assert!(err.is_cancellation());
}

#[tokio::test]
async fn dispatcher_serves_waveforms_fetched_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(segments_payload()))
        .mount(&server)
        .await;

    let store: WaveformStore = WaveformStore::new(Arc::new(MemoryBackend::default()));
    let dispatcher = Dispatcher::new(service(), store);
    let domain = TimeRange::new(0.0, 100.0);

    let Response::ChannelSegments(segments) = dispatcher
        .dispatch(Request::FetchChannelSegmentsByChannel(
            FetchChannelSegmentsParams {
                request_config: config(&server, "segments"),
                domain,
            },
        ))
        .await
        .unwrap()
    else {
        panic!("expected channel segments");
    };
    let DataSegmentData::ClaimCheck(claim_check) =
        &segments[0].channel_segment.data_segments[0].data
    else {
        panic!("expected claim check");
    };

    let Response::Waveform(buffer) = dispatcher
        .dispatch(Request::GetWaveform(GetWaveformParams {
            id: claim_check.id.clone(),
            start_time: 0.0,
            end_time: 100.0,
            domain,
        }))
        .await
        .unwrap()
    else {
        panic!("expected waveform");
    };
    let values: Vec<f32> = buffer.iter().skip(1).step_by(2).copied().collect();
    assert_eq!(values, vec![1.5, -2.0, 0.5]);
}
