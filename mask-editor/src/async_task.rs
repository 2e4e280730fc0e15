use std::{pin::Pin, task::Context};

use futures::FutureExt;

use crate::{BoxFuture, RasterError};

/// Result of a single-shot operation, polled once per frame from the UI thread.
pub struct AsyncTask<T>(BoxFuture<'static, T>);

impl<T> AsyncTask<T> {
    pub fn new(b: BoxFuture<'static, T>) -> Self {
        Self(b)
    }

    pub fn data(&mut self) -> Option<T> {
        let waker = std::task::Waker::noop();
        let mut cx = Context::from_waker(waker);
        match Pin::new(&mut self.0).poll(&mut cx) {
            std::task::Poll::Ready(r) => {
                #[cfg(debug_assertions)]
                {
                    self.0 = Box::pin(std::future::poll_fn(|_| {
                        panic!("The result of AsyncTask mustn't be used after it returned")
                    }));
                }
                Some(r)
            }
            std::task::Poll::Pending => None,
        }
    }
}

/// Runs `job` on its own thread and resolves once it reports back.
pub fn spawn_blocking<T, F>(job: F) -> BoxFuture<'static, Result<T, RasterError>>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, RasterError> + Send + 'static,
{
    let (tx, rx) = futures::channel::oneshot::channel();
    std::thread::spawn(move || tx.send(job()));
    async move { rx.await.map_err(|_| RasterError::WorkerGone).and_then(|r| r) }.boxed()
}
