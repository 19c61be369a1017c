use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// The sentinel yield: hands control back to the scheduler for one round.
///
/// Returns a future that is `Pending` the first time it is polled and
/// `Ready` the next. It carries no payload and schedules nothing; the
/// round-robin sweep resumes every pending task each step, so yielding is
/// purely a suspension point.
pub async fn yield_now() {
    struct YieldOnce(bool);

    impl Future for YieldOnce {
        type Output = ();

        fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
            if !self.0 {
                self.0 = true;

                return Poll::Pending;
            }

            Poll::Ready(())
        }
    }

    YieldOnce(false).await
}
