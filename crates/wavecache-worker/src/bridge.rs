//! Newline-delimited JSON bridge between stdio and the worker thread.
//!
//! Every input line is forwarded as soon as it is read; replies are written
//! in completion order and matched to requests by `seq`.

use serde::Serialize;
use serde_json::Value;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
    task::JoinSet,
};
use wavecache::{Error, Request, Response, WorkerHandle};

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Reply {
    Ok {
        seq: Option<u64>,
        ok: Response,
    },
    Rejected {
        seq: Option<u64>,
        rejected: String,
        cancelled: bool,
    },
}

impl Reply {
    fn new(seq: Option<u64>, response: Response) -> Self {
        match response {
            Response::Rejected { reason, cancelled } => Self::Rejected {
                seq,
                rejected: reason,
                cancelled,
            },
            ok => Self::Ok { seq, ok },
        }
    }
}

/// Splits one input line into its sequence number and request.
///
/// The sequence number is recovered even when the request itself is
/// malformed so the rejection can still be matched.
fn parse_line(line: &str) -> (Option<u64>, Result<Request, Error>) {
    let mut value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(err) => return (None, Err(err.into())),
    };
    let seq = value
        .as_object_mut()
        .and_then(|fields| fields.remove("seq"))
        .and_then(|seq| seq.as_u64());
    let request = serde_json::from_value(value).map_err(Error::from);
    (seq, request)
}

/// Pumps requests from `input` to the worker and replies to `output` until
/// `input` ends and every forwarded request has been answered.
pub async fn run_bridge<R, W>(handle: WorkerHandle, input: R, output: W) -> anyhow::Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Reply>();

    let writer = tokio::spawn(async move {
        let mut output = output;
        while let Some(reply) = rx.recv().await {
            let mut line = serde_json::to_vec(&reply)?;
            line.push(b'\n');
            output.write_all(&line).await?;
            output.flush().await?;
        }
        anyhow::Ok(output)
    });

    let mut inflight = JoinSet::new();
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let (seq, request) = parse_line(&line);
        let tx = tx.clone();
        match request {
            Ok(request) => {
                tracing::debug!("Forwarding {} (seq {seq:?})", request.name());
                let handle = handle.clone();
                inflight.spawn(async move {
                    let response = Response::from_result(handle.call(request).await);
                    let _ = tx.send(Reply::new(seq, response));
                });
            }
            Err(err) => {
                tracing::warn!("Rejecting malformed request line: {err}");
                let _ = tx.send(Reply::new(seq, Response::from_result(Err(err))));
            }
        }
    }

    while let Some(joined) = inflight.join_next().await {
        if let Err(err) = joined {
            tracing::error!("Bridge task failed: {err}");
        }
    }
    drop(tx);

    writer.await?
}
