use std::task::{Context, Poll};

use futures::future::BoxFuture;
use http::{Method, Request, Response};
use tokio_util::sync::CancellationToken;
use tower::Service;

use super::body::PermitBody;
use super::response::{aborted_response, busy_response};
use crate::{Gate, TryAdmit};

/// Admission-controlled HTTP service.
///
/// Admission is decided synchronously in [`call`](Service::call); the returned
/// future then waits for a queued slot if needed. The permit travels with the
/// response body (see [`PermitBody`]).
#[derive(Clone, Debug)]
pub struct ConcurrencyLimit<S> {
    inner: S,
    gate: Gate,
}

impl<S> ConcurrencyLimit<S> {
    /// Wraps `inner` behind `gate`.
    pub fn new(inner: S, gate: Gate) -> Self {
        Self { inner, gate }
    }

    /// The gate in front of the inner service.
    pub fn gate(&self) -> &Gate {
        &self.gate
    }

    /// Gets a reference to the inner service.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Consumes `self`, returning the inner service.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for ConcurrencyLimit<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ReqBody: Send + 'static,
    ResBody: From<String> + Send + 'static,
{
    type Response = Response<PermitBody<ResBody>>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        if req.method() == Method::OPTIONS {
            let fut = self.inner.call(req);
            return Box::pin(async move {
                let res = fut.await?;
                Ok::<_, S::Error>(res.map(PermitBody::unguarded))
            });
        }

        let admission = self.gate.try_admit();
        let cancel = req
            .extensions()
            .get::<CancellationToken>()
            .cloned()
            .unwrap_or_default();
        let gate = self.gate.clone();

        // The ready service is the one moved into the future.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let permit = match admission {
                TryAdmit::Admitted(permit) => permit,
                TryAdmit::Rejected(rejection) => return Ok(busy_response(&gate, &rejection)),
                TryAdmit::Queued(ticket) => match ticket.wait(&cancel).await {
                    Ok(permit) => permit,
                    Err(rejection) => return Ok(busy_response(&gate, &rejection)),
                },
            };
            if cancel.is_cancelled() {
                permit.release();
                return Ok(aborted_response());
            }

            let res = inner.call(req).await?;
            Ok::<_, S::Error>(res.map(|body| PermitBody::new(body, permit)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::time::Duration;

    use bytes::Bytes;
    use http::{StatusCode, header};
    use http_body_util::{BodyExt, Full};
    use tower::{Layer, ServiceExt, service_fn};

    use crate::{GateConfig, http::ConcurrencyLimitLayer};

    type Svc = ConcurrencyLimit<
        tower::util::ServiceFn<
            fn(Request<()>) -> std::future::Ready<Result<Response<Full<Bytes>>, Infallible>>,
        >,
    >;

    fn ok(_req: Request<()>) -> std::future::Ready<Result<Response<Full<Bytes>>, Infallible>> {
        std::future::ready(Ok(Response::new(Full::from("ok"))))
    }

    fn gate(max_concurrent: usize, max_queue_depth: usize, wait_timeout_ms: u64) -> Gate {
        Gate::new(GateConfig {
            name: "http".into(),
            max_concurrent,
            max_queue_depth,
            wait_timeout: Duration::from_millis(wait_timeout_ms),
            ..GateConfig::default()
        })
    }

    fn service(gate: &Gate) -> Svc {
        let f: fn(Request<()>) -> _ = ok;
        ConcurrencyLimitLayer::new(gate.clone()).layer(service_fn(f))
    }

    fn get() -> Request<()> {
        Request::get("/events").body(()).unwrap()
    }

    async fn body_json(res: Response<PermitBody<Full<Bytes>>>) -> serde_json::Value {
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_queue_full_gets_503_with_retry_after() {
        let gate = gate(1, 0, 0);
        let _held = gate.admit(&CancellationToken::new()).await.unwrap();

        let res = service(&gate).oneshot(get()).await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(res.headers()[header::RETRY_AFTER], "5");
        assert_eq!(res.headers()[header::CONTENT_TYPE], "application/json");

        let json = body_json(res).await;
        assert_eq!(json["message"], GateConfig::default().busy_message.as_str());
        assert_eq!(gate.snapshot().queue_full, 1);
    }

    #[tokio::test]
    async fn test_options_bypasses_gate() {
        let gate = gate(1, 0, 0);
        let _held = gate.admit(&CancellationToken::new()).await.unwrap();

        let req = Request::options("/events").body(()).unwrap();
        let res = service(&gate).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(!res.body().holds_slot());

        let snap = gate.snapshot();
        assert_eq!((snap.active, snap.admitted, snap.queue_full), (1, 1, 0));
    }

    #[tokio::test]
    async fn test_slot_held_until_body_ends() {
        let gate = gate(1, 0, 0);

        let res = service(&gate).oneshot(get()).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(gate.snapshot().active, 1);

        let mut body = res.into_body();
        let first = body.frame().await.unwrap().unwrap();
        assert_eq!(first.into_data().unwrap(), Bytes::from_static(b"ok"));
        assert!(body.frame().await.is_none());
        assert!(!body.holds_slot());
        assert_eq!(gate.snapshot().active, 0);
    }

    #[tokio::test]
    async fn test_dropped_body_releases_slot() {
        let gate = gate(1, 0, 0);
        let res = service(&gate).oneshot(get()).await.unwrap();
        drop(res);
        assert_eq!(gate.snapshot().active, 0);
    }

    #[tokio::test]
    async fn test_queued_request_runs_after_release() {
        let gate = gate(1, 1, 0);
        let held = gate.admit(&CancellationToken::new()).await.unwrap();

        let svc = service(&gate);
        let pending = tokio::spawn(async move { svc.oneshot(get()).await });
        while gate.snapshot().queued == 0 {
            tokio::task::yield_now().await;
        }

        held.release();
        let res = pending.await.unwrap().unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.body().holds_slot());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timeout_gets_503() {
        let gate = gate(1, 1, 1500);
        let _held = gate.admit(&CancellationToken::new()).await.unwrap();

        let res = service(&gate).oneshot(get()).await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(res.headers()[header::RETRY_AFTER], "2");
        assert_eq!(gate.snapshot().timed_out, 1);
    }

    #[tokio::test]
    async fn test_cancelled_request_is_dropped_silently() {
        let gate = gate(1, 1, 0);
        let _held = gate.admit(&CancellationToken::new()).await.unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let mut req = get();
        req.extensions_mut().insert(token);

        let res = service(&gate).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(res.headers().is_empty());
        assert!(res.into_body().collect().await.unwrap().to_bytes().is_empty());

        let snap = gate.snapshot();
        assert_eq!((snap.active, snap.queued, snap.aborted), (1, 0, 1));
    }

    #[tokio::test]
    async fn test_cancelled_before_admission_skips_handler() {
        let gate = gate(1, 0, 0);
        let token = CancellationToken::new();
        token.cancel();
        let mut req = get();
        req.extensions_mut().insert(token);

        let res = service(&gate).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(gate.snapshot().active, 0);
    }

    #[tokio::test]
    async fn test_inner_error_releases_slot() {
        let gate = gate(1, 0, 0);
        let svc = ConcurrencyLimit::new(
            service_fn(|_req: Request<()>| async {
                Err::<Response<Full<Bytes>>, &'static str>("handler failed")
            }),
            gate.clone(),
        );

        assert_eq!(svc.oneshot(get()).await.unwrap_err(), "handler failed");
        assert_eq!(gate.snapshot().active, 0);
    }
}
