//! Centralized batched inference: every bot-controlled snake in the process
//! shares one model instance behind a bounded FIFO queue drained by a single
//! worker thread. Concurrent callers serialize on the worker; the queue
//! provides backpressure when the server is saturated.

use anyhow::Context;
use std::path::Path;
use tokio::sync::{mpsc, oneshot};
use tract_onnx::prelude::*;

pub const INPUT_CHANNELS: usize = 6;
pub const GRID_SIZE: usize = 25;
pub const OUTPUT_SIZE: usize = 4;
const QUEUE_CAPACITY: usize = 200;

type PolicyModel = TypedRunnableModel<TypedModel>;

struct PredictRequest {
    input: Vec<f32>,
    reply: oneshot::Sender<Vec<f32>>,
}

/// Cheap cloneable handle onto the shared inference queue.
#[derive(Debug, Clone)]
pub struct InferenceHandle {
    queue: mpsc::Sender<PredictRequest>,
}

/// Loads the policy network and starts the lone worker thread. Returns an
/// error when the model cannot be loaded, in which case no session ever
/// installs a neural brain and selection degrades to the heuristic planner.
pub fn start(model_path: &Path) -> anyhow::Result<InferenceHandle> {
    let model = load_model(model_path)
        .with_context(|| format!("failed to load policy model from {}", model_path.display()))?;

    let (queue, mut requests) = mpsc::channel::<PredictRequest>(QUEUE_CAPACITY);
    std::thread::Builder::new()
        .name("inference-worker".to_string())
        .spawn(move || {
            tracing::info!("inference worker online");
            while let Some(request) = requests.blocking_recv() {
                match run_forward(&model, &request.input) {
                    Ok(logits) => {
                        // Receiver may have given up; that request simply dies.
                        let _ = request.reply.send(logits);
                    }
                    Err(error) => {
                        tracing::warn!(?error, "inference failed, dropping request");
                    }
                }
            }
            tracing::info!("inference worker shutting down");
        })
        .context("failed to spawn inference worker")?;

    Ok(InferenceHandle { queue })
}

impl InferenceHandle {
    /// Submits one feature grid and waits for its logits. FIFO with respect
    /// to all other callers; blocks while the queue is full. Returns None if
    /// the worker is gone or rejected the input.
    pub async fn predict(&self, input: Vec<f32>) -> Option<Vec<f32>> {
        if input.len() != INPUT_CHANNELS * GRID_SIZE * GRID_SIZE {
            tracing::warn!(len = input.len(), "malformed inference input");
            return None;
        }
        let (reply, response) = oneshot::channel();
        self.queue.send(PredictRequest { input, reply }).await.ok()?;
        response.await.ok()
    }
}

fn load_model(path: &Path) -> TractResult<PolicyModel> {
    tract_onnx::onnx()
        .model_for_path(path)?
        .with_input_fact(
            0,
            InferenceFact::dt_shape(
                f32::datum_type(),
                tvec![1, INPUT_CHANNELS, GRID_SIZE, GRID_SIZE],
            ),
        )?
        .into_optimized()?
        .into_runnable()
}

/// Test seam: a handle whose worker runs an arbitrary forward function
/// instead of the real model, preserving the queue semantics.
#[cfg(test)]
fn start_with_forward<F>(forward: F) -> InferenceHandle
where
    F: Fn(&[f32]) -> Vec<f32> + Send + 'static,
{
    let (queue, mut requests) = mpsc::channel::<PredictRequest>(QUEUE_CAPACITY);
    std::thread::spawn(move || {
        while let Some(request) = requests.blocking_recv() {
            let _ = request.reply.send(forward(&request.input));
        }
    });
    InferenceHandle { queue }
}

fn run_forward(model: &PolicyModel, input: &[f32]) -> anyhow::Result<Vec<f32>> {
    let tensor = tract_ndarray::Array4::from_shape_vec(
        (1, INPUT_CHANNELS, GRID_SIZE, GRID_SIZE),
        input.to_vec(),
    )
    .context("inference input has the wrong shape")?;
    let outputs = model.run(tvec!(Tensor::from(tensor).into()))?;
    let view = outputs[0]
        .to_array_view::<f32>()
        .context("inference output has the wrong type")?;
    // Copy out so the reply can never alias the worker's buffers.
    let logits: Vec<f32> = view.iter().copied().collect();
    if logits.len() != OUTPUT_SIZE {
        anyhow::bail!("expected {OUTPUT_SIZE} logits, got {}", logits.len());
    }
    Ok(logits)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with_marker(marker: f32) -> Vec<f32> {
        let mut input = vec![0f32; INPUT_CHANNELS * GRID_SIZE * GRID_SIZE];
        input[0] = marker;
        input
    }

    #[tokio::test]
    async fn malformed_input_is_rejected_before_the_queue() {
        let handle = start_with_forward(|_| vec![0.0; OUTPUT_SIZE]);
        assert!(handle.predict(vec![1.0, 2.0]).await.is_none());
        assert!(handle
            .predict(grid_with_marker(1.0))
            .await
            .is_some());
    }

    #[tokio::test]
    async fn concurrent_predictions_never_cross_talk() {
        // The worker derives all four logits from the caller's marker, so a
        // swapped or aliased reply is immediately visible.
        let handle = start_with_forward(|input| {
            let marker = input[0];
            (0..OUTPUT_SIZE).map(|i| marker * 10.0 + i as f32).collect()
        });

        let mut tasks = Vec::new();
        for caller in 0..3 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move {
                for round in 0..100 {
                    let marker = (caller * 1000 + round) as f32;
                    let logits = handle
                        .predict(grid_with_marker(marker))
                        .await
                        .expect("prediction");
                    assert_eq!(logits.len(), OUTPUT_SIZE);
                    for (i, value) in logits.iter().enumerate() {
                        assert_eq!(*value, marker * 10.0 + i as f32);
                    }
                }
            }));
        }
        for task in tasks {
            task.await.expect("prediction task");
        }
    }

    #[tokio::test]
    async fn predictions_are_served_in_fifo_order() {
        use std::sync::atomic::{AtomicU32, Ordering};
        use std::sync::Arc as StdArc;

        let served = StdArc::new(AtomicU32::new(0));
        let worker_served = StdArc::clone(&served);
        let handle = start_with_forward(move |_| {
            let n = worker_served.fetch_add(1, Ordering::SeqCst);
            vec![n as f32; OUTPUT_SIZE]
        });

        // A single caller issuing sequential requests must observe strictly
        // increasing service order.
        let mut last = -1f32;
        for _ in 0..20 {
            let logits = handle
                .predict(grid_with_marker(0.0))
                .await
                .expect("prediction");
            assert!(logits[0] > last);
            last = logits[0];
        }
    }
}

