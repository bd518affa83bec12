//! Conversion of wire channel segments into stored position buffers and
//! claim check descriptors.
//!
//! Each waveform span is identified by a claim check derived from its channel
//! segment, series type, span type, start, end, sample count, sample rate and
//! the display domain. The span's samples are converted into an interleaved
//! position buffer and stored under that claim check unless something is
//! already stored (or being computed) there. Only the claim check travels
//! back to the caller.

use crate::{
    AmplitudeBounds, ChannelSegment, ChannelSegmentBoundaries, ChannelSegmentDescriptor,
    DataClaimCheck, DataSegment, Error, GL_MAX, GL_MIN, PositionBuffer, Result, TimeRange,
    TimeseriesType, UNFILTERED, UiChannelSegment, Waveform, WeavessChannelSegment,
    boundary::{build_channel_segment_bounds, merge_bounds},
    scale::LinearScale,
    sleep::SleepProvider,
    worker_store::{Storable, WaveformStore},
};

/// Content-derived identity of one converted span.
pub fn claim_check_id(
    channel_segment: &ChannelSegment,
    span: &Waveform,
    domain: TimeRange,
) -> String {
    format!(
        "{}.{}.{}.{}.{}.{}.{}.{}.{}",
        channel_segment.id.to_key(),
        channel_segment.timeseries_type.as_str(),
        span.kind.as_str(),
        span.start_time,
        span.end_time,
        span.sample_count,
        span.sample_rate,
        domain.start_time_secs,
        domain.end_time_secs,
    )
}

fn check_sample_rate(span: &Waveform) -> Result<()> {
    if span.sample_rate.is_finite() && span.sample_rate > 0.0 {
        Ok(())
    } else {
        Err(Error::MalformedChannelSegment {
            reason: format!("sample rate {} is not positive", span.sample_rate),
        })
    }
}

/// Interleaves sample times, mapped from `domain` onto the display range,
/// with sample values.
pub fn convert_to_position_buffer(span: &Waveform, domain: TimeRange) -> Result<PositionBuffer> {
    check_sample_rate(span)?;
    let scale = LinearScale::new(domain.as_domain(), [GL_MIN, GL_MAX]);
    Ok(span
        .samples
        .iter()
        .enumerate()
        .flat_map(|(i, &value)| {
            let time = span.start_time + i as f64 / span.sample_rate;
            [scale.apply(time) as f32, value as f32]
        })
        .collect())
}

/// Signed extremes of a span's raw samples.
fn span_bounds(span: &Waveform) -> AmplitudeBounds {
    let mut bounds = AmplitudeBounds {
        amplitude_max: f64::NEG_INFINITY,
        amplitude_min: f64::INFINITY,
        amplitude_max_secs: None,
        amplitude_min_secs: None,
    };
    for (i, &value) in span.samples.iter().enumerate() {
        let time = span.start_time + i as f64 / span.sample_rate;
        if value > bounds.amplitude_max {
            bounds.amplitude_max = value;
            bounds.amplitude_max_secs = Some(time);
        }
        if value < bounds.amplitude_min {
            bounds.amplitude_min = value;
            bounds.amplitude_min_secs = Some(time);
        }
    }
    bounds
}

/// Converts one channel segment, storing each waveform span's buffer.
///
/// Returns `None` when the segment carries no waveform spans.
pub async fn convert_channel_segment<S: SleepProvider>(
    store: &WaveformStore<S>,
    channel_segment: ChannelSegment,
    domain: TimeRange,
) -> Result<Option<UiChannelSegment>> {
    let Some((_, end_time)) = channel_segment.span() else {
        return Ok(None);
    };
    if channel_segment.timeseries_type == TimeseriesType::FkSpectra {
        return Ok(None);
    }

    let mut data_segments = Vec::with_capacity(channel_segment.timeseries.len());
    let mut boundaries: Option<ChannelSegmentBoundaries> = None;

    for span in &channel_segment.timeseries {
        if span.kind != TimeseriesType::Waveform {
            continue;
        }
        check_sample_rate(span)?;

        let id = claim_check_id(&channel_segment, span, domain);
        boundaries = merge_bounds(boundaries, build_channel_segment_bounds(&span_bounds(span)));

        if !store.has(&id).await? {
            let owned = span.clone();
            store
                .store(
                    &id,
                    Storable::deferred(async move { convert_to_position_buffer(&owned, domain) }),
                )
                .await?;
        }

        data_segments.push(DataSegment::claim_check(DataClaimCheck {
            id,
            start_time_secs: span.start_time,
            end_time_secs: span.end_time,
            sample_rate: span.sample_rate,
            domain_time_range: domain,
        }));
    }

    if data_segments.is_empty() {
        return Ok(None);
    }

    Ok(Some(UiChannelSegment {
        channel_segment: WeavessChannelSegment {
            channel_name: channel_segment.id.channel.name.clone(),
            wf_filter_id: UNFILTERED.to_owned(),
            is_selected: false,
            data_segments,
            description: None,
            channel_segment_boundaries: boundaries,
        },
        channel_segment_descriptor: ChannelSegmentDescriptor {
            id: channel_segment.id,
            end_time,
        },
    }))
}

/// Converts every channel segment independently. Segments without waveform
/// data are dropped, so an empty input (or one with no time series) yields an
/// empty list.
pub async fn convert_channel_segments<S: SleepProvider>(
    store: &WaveformStore<S>,
    channel_segments: Vec<ChannelSegment>,
    domain: TimeRange,
) -> Result<Vec<UiChannelSegment>> {
    let mut converted = Vec::with_capacity(channel_segments.len());
    for channel_segment in channel_segments {
        if let Some(ui) = convert_channel_segment(store, channel_segment, domain).await? {
            converted.push(ui);
        }
    }
    Ok(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ChannelRef, ChannelSegmentId, DataSegmentData, MemoryBackend, TokioYield, WorkerStore};
    use std::sync::Arc;

    const DOMAIN: TimeRange = TimeRange::new(100.0, 200.0);

    fn span(start: f64, samples: Vec<f64>) -> Waveform {
        let sample_rate = 2.0;
        Waveform {
            kind: TimeseriesType::Waveform,
            start_time: start,
            end_time: start + (samples.len() as f64 - 1.0) / sample_rate,
            sample_rate,
            sample_count: samples.len(),
            samples,
        }
    }

    fn segment(name: &str, timeseries: Vec<Waveform>) -> ChannelSegment {
        ChannelSegment {
            id: ChannelSegmentId {
                channel: ChannelRef { name: name.into() },
                creation_time: 100.0,
                start_time: 100.0,
            },
            timeseries_type: TimeseriesType::Waveform,
            timeseries,
        }
    }

    fn store() -> WaveformStore<TokioYield> {
        WorkerStore::new(Arc::new(MemoryBackend::default()))
    }

    #[test]
    fn buffers_interleave_display_position_and_value() {
        let buffer = convert_to_position_buffer(&span(150.0, vec![1.0, -2.0, 3.0]), DOMAIN).unwrap();
        assert_eq!(&*buffer, &[50.0, 1.0, 50.5, -2.0, 51.0, 3.0]);
    }

    #[test]
    fn zero_sample_rate_is_malformed() {
        let mut bad = span(150.0, vec![1.0]);
        bad.sample_rate = 0.0;
        assert!(matches!(
            convert_to_position_buffer(&bad, DOMAIN),
            Err(Error::MalformedChannelSegment { .. })
        ));
    }

    #[test]
    fn identity_depends_on_display_domain() {
        let cs = segment("STA.CHAN", vec![span(150.0, vec![1.0])]);
        let a = claim_check_id(&cs, &cs.timeseries[0], DOMAIN);
        let b = claim_check_id(&cs, &cs.timeseries[0], TimeRange::new(0.0, 200.0));
        assert_ne!(a, b);
        assert!(a.starts_with("STA.CHAN.100.100.WAVEFORM.WAVEFORM.150."));
    }

    #[tokio::test]
    async fn converts_spans_into_claim_checks_and_stores_buffers() {
        let store = store();
        let cs = segment(
            "STA.CHAN",
            vec![span(150.0, vec![1.0, -2.0, 3.0]), span(160.0, vec![-8.0, 0.0])],
        );

        let ui = convert_channel_segment(&store, cs, DOMAIN).await.unwrap().unwrap();

        assert_eq!(ui.channel_segment.channel_name, "STA.CHAN");
        assert_eq!(ui.channel_segment.wf_filter_id, UNFILTERED);
        assert_eq!(ui.channel_segment_descriptor.end_time, 160.5);
        assert_eq!(ui.channel_segment.data_segments.len(), 2);

        let bounds = ui.channel_segment.channel_segment_boundaries.clone().unwrap();
        assert_eq!(bounds.top_max, 3.0);
        assert_eq!(bounds.top_max_secs, Some(151.0));
        assert_eq!(bounds.bottom_max, -8.0);
        assert_eq!(bounds.offset, 8.0);

        let DataSegmentData::ClaimCheck(first) = &ui.channel_segment.data_segments[0].data else {
            panic!("expected claim check data");
        };
        assert_eq!(first.domain_time_range, DOMAIN);
        let stored = store.retrieve(&first.id).await.unwrap().unwrap();
        assert_eq!(&*stored, &[50.0, 1.0, 50.5, -2.0, 51.0, 3.0]);
    }

    #[tokio::test]
    async fn repeated_conversion_reuses_the_stored_buffer() {
        let store = store();
        let cs = segment("STA.CHAN", vec![span(150.0, vec![1.0, 2.0])]);

        let first = convert_channel_segment(&store, cs.clone(), DOMAIN).await.unwrap();
        let second = convert_channel_segment(&store, cs, DOMAIN).await.unwrap();

        assert_eq!(first, second);
        assert!(store.pending_len() <= 1);
    }

    #[tokio::test]
    async fn segments_without_waveforms_are_dropped() {
        let store = store();
        let mut fk = segment("FK", vec![span(150.0, vec![1.0])]);
        fk.timeseries_type = TimeseriesType::FkSpectra;

        let converted = convert_channel_segments(
            &store,
            vec![segment("EMPTY", vec![]), fk, segment("OK", vec![span(150.0, vec![1.0])])],
            DOMAIN,
        )
        .await
        .unwrap();

        assert_eq!(converted.len(), 1);
        assert_eq!(converted[0].channel_segment.channel_name, "OK");

        let none = convert_channel_segments(&store, vec![], DOMAIN).await.unwrap();
        assert!(none.is_empty());
    }
}
