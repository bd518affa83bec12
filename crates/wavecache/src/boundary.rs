//! Amplitude bounds over stored position buffers.
//!
//! Bounds are computed per data segment from the buffer stored under its
//! claim check, then folded across a channel segment with [`merge_bounds`].
//! `merge_bounds` is commutative and associative with `None` as identity, so
//! the fold order does not matter.

use crate::{
    AmplitudeBounds, ChannelSegmentBoundaries, DataClaimCheck, Error, Result, UNFILTERED,
    WeavessChannelSegment, scale::LinearScale, sleep::SleepProvider, worker_store::WaveformStore,
};
use futures::future::try_join_all;

fn ensure_ordered(start: Option<f64>, end: Option<f64>) -> Result<()> {
    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(Error::InvalidTimeRange { start, end }),
        _ => Ok(()),
    }
}

/// Maps an optional time window onto value indices of an interleaved
/// `[x, y, x, y, ...]` buffer of `length` entries spanning `domain`.
///
/// The returned indices are inclusive and point at `y` slots (`index * 2 + 1`).
/// Window edges are clamped to the buffer; a missing edge defaults to the
/// corresponding buffer extreme.
///
/// # Errors
///
/// [`Error::InvalidTimeRange`] if `start > end`.
pub fn scale_to_position_buffer_index(
    length: usize,
    domain: [f64; 2],
    start: Option<f64>,
    end: Option<f64>,
) -> Result<(usize, usize)> {
    ensure_ordered(start, end)?;

    let last_idx = (length / 2).saturating_sub(1);
    let scale = LinearScale::new(domain, [0.0, last_idx as f64])
        .clamped()
        .rounded();

    let start_idx = start.map_or(0, |t| scale.apply(t) as usize);
    let end_idx = end.map_or(last_idx, |t| scale.apply(t) as usize);

    Ok((start_idx * 2 + 1, end_idx * 2 + 1))
}

/// Extremes of the `y` slots between two inclusive value indices.
#[derive(Clone, Copy, Debug, PartialEq)]
struct BufferExtremes {
    max: f64,
    max_idx: Option<usize>,
    min: f64,
    min_idx: Option<usize>,
}

fn extremes_in(buffer: &[f32], start_idx: usize, end_idx: usize) -> BufferExtremes {
    let mut extremes = BufferExtremes {
        max: f64::NEG_INFINITY,
        max_idx: None,
        min: f64::INFINITY,
        min_idx: None,
    };
    for idx in (start_idx..=end_idx).step_by(2) {
        let Some(&value) = buffer.get(idx) else {
            break;
        };
        let value = f64::from(value);
        if value > extremes.max {
            extremes.max = value;
            extremes.max_idx = Some(idx);
        }
        if value < extremes.min {
            extremes.min = value;
            extremes.min_idx = Some(idx);
        }
    }
    extremes
}

/// Signed amplitude extremes of the buffer stored under `claim_check`,
/// restricted to the optional window.
///
/// # Errors
///
/// - [`Error::MissingBuffer`] if no buffer is stored for the claim check.
/// - [`Error::InvalidTimeRange`] if `start > end`.
pub async fn calculate_data_segment_bounds<S: SleepProvider>(
    store: &WaveformStore<S>,
    claim_check: &DataClaimCheck,
    start: Option<f64>,
    end: Option<f64>,
) -> Result<AmplitudeBounds> {
    let buffer = store
        .retrieve(&claim_check.id)
        .await?
        .ok_or_else(|| Error::MissingBuffer {
            id: claim_check.id.clone(),
        })?;

    let domain = claim_check.time_range().as_domain();
    let (start_idx, end_idx) = scale_to_position_buffer_index(buffer.len(), domain, start, end)?;
    let extremes = extremes_in(&buffer, start_idx, end_idx);

    // Value index back to sample time over the data span.
    let last_idx = (buffer.len() / 2).saturating_sub(1);
    let time = LinearScale::new(domain, [0.0, last_idx as f64]);
    let secs_at = |idx: usize| time.invert(((idx - 1) / 2) as f64);

    Ok(AmplitudeBounds {
        amplitude_max: extremes.max,
        amplitude_min: extremes.min,
        amplitude_max_secs: extremes.max_idx.map(secs_at),
        amplitude_min_secs: extremes.min_idx.map(secs_at),
    })
}

/// Display boundaries for a set of amplitude bounds, or `None` when the
/// bounds are not finite (an empty window).
pub fn build_channel_segment_bounds(bounds: &AmplitudeBounds) -> Option<ChannelSegmentBoundaries> {
    if !bounds.amplitude_max.is_finite() || !bounds.amplitude_min.is_finite() {
        return None;
    }
    Some(ChannelSegmentBoundaries::from_extremes(
        UNFILTERED,
        bounds.amplitude_max,
        bounds.amplitude_min,
        bounds.amplitude_max_secs,
        bounds.amplitude_min_secs,
    ))
}

fn earlier(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Bounds enclosing both inputs.
///
/// Each extreme carries the timestamp of the side that produced it. On a tie
/// the earlier timestamp and the lesser channel segment id are kept.
pub fn merge_bounds(
    existing: Option<ChannelSegmentBoundaries>,
    incoming: Option<ChannelSegmentBoundaries>,
) -> Option<ChannelSegmentBoundaries> {
    let (a, b) = match (existing, incoming) {
        (Some(a), Some(b)) => (a, b),
        (a, None) => return a,
        (None, b) => return b,
    };

    let (top_max, top_max_secs) = if a.top_max > b.top_max {
        (a.top_max, a.top_max_secs)
    } else if b.top_max > a.top_max {
        (b.top_max, b.top_max_secs)
    } else {
        (a.top_max, earlier(a.top_max_secs, b.top_max_secs))
    };

    let (bottom_max, bottom_max_secs) = if a.bottom_max < b.bottom_max {
        (a.bottom_max, a.bottom_max_secs)
    } else if b.bottom_max < a.bottom_max {
        (b.bottom_max, b.bottom_max_secs)
    } else {
        (a.bottom_max, earlier(a.bottom_max_secs, b.bottom_max_secs))
    };

    let channel_segment_id = a.channel_segment_id.min(b.channel_segment_id);

    Some(ChannelSegmentBoundaries::from_extremes(
        channel_segment_id,
        top_max,
        bottom_max,
        top_max_secs,
        bottom_max_secs,
    ))
}

/// Boundaries of every claim check data segment overlapping the window
/// (inclusive), merged. `None` when nothing overlaps.
///
/// # Errors
///
/// - [`Error::MalformedChannelSegment`] if any data segment is not a claim
///   check, whether or not it overlaps the window.
/// - [`Error::InvalidTimeRange`] if `start > end`.
/// - [`Error::MissingBuffer`] if an overlapping claim check has no buffer.
pub async fn calculate_channel_seg_bounds<S: SleepProvider>(
    store: &WaveformStore<S>,
    channel_segment: &WeavessChannelSegment,
    start: Option<f64>,
    end: Option<f64>,
) -> Result<Option<ChannelSegmentBoundaries>> {
    ensure_ordered(start, end)?;

    let claim_checks = channel_segment
        .data_segments
        .iter()
        .map(|segment| segment.data.as_claim_check())
        .collect::<Result<Vec<_>>>()?;

    let per_segment = claim_checks
        .into_iter()
        .filter(|claim_check| claim_check.time_range().overlaps(start, end))
        .map(|claim_check| async move {
            let bounds = calculate_data_segment_bounds(
                store,
                claim_check,
                start.or(Some(claim_check.start_time_secs)),
                end.or(Some(claim_check.end_time_secs)),
            )
            .await?;
            Ok::<_, Error>(build_channel_segment_bounds(&bounds))
        });

    let all = try_join_all(per_segment).await?;
    Ok(all.into_iter().fold(None, merge_bounds))
}

/// Boundaries for a windowed view of a channel segment. Missing window edges
/// fall back to the extent of each data segment.
pub async fn calculate_windowed_bounds<S: SleepProvider>(
    store: &WaveformStore<S>,
    channel_segment: &WeavessChannelSegment,
    start: Option<f64>,
    end: Option<f64>,
) -> Result<Option<ChannelSegmentBoundaries>> {
    calculate_channel_seg_bounds(store, channel_segment, start, end).await
}
