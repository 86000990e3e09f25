// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Counting panics raised by wrapped functions before letting them continue to unwind.

use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};
use std::pin::pin;

/// Runs `function`, calling `on_panic` before resuming any panic it raises.
pub(crate) fn guard<R>(function: impl FnOnce() -> R, on_panic: impl FnOnce()) -> R {
    // The panic is always resumed, so nothing observes state left behind by the unwind.
    match catch_unwind(AssertUnwindSafe(function)) {
        Ok(output) => output,
        Err(payload) => {
            on_panic();
            resume_unwind(payload)
        }
    }
}

/// Awaits `future`, calling `on_panic` before resuming any panic raised while polling it.
///
/// Dropping the returned future before it completes calls nothing.
pub(crate) async fn guard_async<Fut: Future>(future: Fut, on_panic: impl FnOnce()) -> Fut::Output {
    let mut future = pin!(future);
    let mut on_panic = Some(on_panic);

    std::future::poll_fn(move |cx| match catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(cx))) {
        Ok(poll) => poll,
        Err(payload) => {
            if let Some(on_panic) = on_panic.take() {
                on_panic();
            }
            resume_unwind(payload)
        }
    })
    .await
}
