//! Slicing stored position buffers to a time window.

use crate::{
    Error, GL_MAX, GL_MIN, PositionBuffer, Result, TimeRange, scale::LinearScale,
    sleep::SleepProvider, worker_store::WaveformStore,
};
use std::sync::Arc;

/// Slices `buffer` to the samples covering `[start_time, end_time]`.
///
/// Times are mapped through `domain` onto the normalised `[GL_MIN, GL_MAX]`
/// range, then onto buffer indices using the buffer's own first and last x
/// positions. The start index is floored and the end index ceiled, both
/// snapped outward to x slots, so the slice always covers the window.
///
/// Returns an empty buffer when the window misses the buffer entirely and
/// the original buffer (not a copy) when the window covers all of it.
///
/// # Errors
///
/// [`Error::InvariantViolation`] if the computed start is not before the
/// computed end after clamping.
pub fn slice_position_buffer(
    buffer: &PositionBuffer,
    start_time: f64,
    end_time: f64,
    domain: TimeRange,
) -> Result<PositionBuffer> {
    let len = buffer.len();
    if len < 2 {
        return Ok(Arc::clone(buffer));
    }
    let last_x_idx = len - 2;

    let first_x = f64::from(buffer[0]);
    let last_x = f64::from(buffer[last_x_idx]);

    let to_gl = LinearScale::new(domain.as_domain(), [GL_MIN, GL_MAX]);
    let gl_start = to_gl.apply(start_time);
    let gl_end = to_gl.apply(end_time);

    // Decided on positions, not indices: a single-sample buffer has a
    // degenerate index scale.
    if gl_end < first_x.min(last_x) || gl_start > first_x.max(last_x) {
        return Ok(Arc::from(Vec::<f32>::new()));
    }

    let to_index = LinearScale::new([first_x, last_x], [0.0, last_x_idx as f64]);
    let mut start = to_index.apply(gl_start).floor() as i64;
    let mut end = to_index.apply(gl_end).ceil() as i64;
    start -= start.rem_euclid(2);
    end += end.rem_euclid(2);

    if end < 0 || start > last_x_idx as i64 {
        return Ok(Arc::from(Vec::<f32>::new()));
    }

    let start = start.max(0) as usize;
    // Include the value slot of the last x.
    let end = (end as usize).saturating_add(2).min(len);

    if start == 0 && end == len {
        return Ok(Arc::clone(buffer));
    }
    if start >= end {
        return Err(Error::InvariantViolation {
            context: format!(
                "windowed slice start {start} is not before end {end} for window [{start_time}, {end_time}]"
            ),
        });
    }

    Ok(Arc::from(&buffer[start..end]))
}

/// Retrieves the buffer stored under `id` and slices it to the window.
///
/// # Errors
///
/// - [`Error::InvalidTimeRange`] if `start_time > end_time`.
/// - [`Error::MissingBuffer`] if nothing is stored or pending under `id`.
pub async fn get_waveform<S: SleepProvider>(
    store: &WaveformStore<S>,
    id: &str,
    start_time: f64,
    end_time: f64,
    domain: TimeRange,
) -> Result<PositionBuffer> {
    if start_time > end_time {
        return Err(Error::InvalidTimeRange {
            start: start_time,
            end: end_time,
        });
    }
    // Unknown ids fail here instead of waiting out the retrieval backoff.
    if !store.has(id).await? {
        return Err(Error::MissingBuffer { id: id.to_owned() });
    }
    let buffer = store
        .retrieve(id)
        .await?
        .ok_or_else(|| Error::MissingBuffer { id: id.to_owned() })?;
    slice_position_buffer(&buffer, start_time, end_time, domain)
}
