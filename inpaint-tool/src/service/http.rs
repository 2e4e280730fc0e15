use std::{io::Read, time::Duration};

use futures::{FutureExt, future::BoxFuture};
use log::{debug, info, warn};

use super::{InpaintRequest, InpaintService, ServiceError};

/// Posts requests as JSON to an HTTP endpoint.
pub struct HttpService {
    agent: ureq::Agent,
    endpoint: String,
}

impl HttpService {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn post_blocking(
        agent: &ureq::Agent,
        endpoint: &str,
        request: &InpaintRequest,
    ) -> Result<Vec<u8>, ServiceError> {
        info!(
            "POST {endpoint} (image: {} chars, mask: {} chars)",
            request.image.len(),
            request.mask.len()
        );
        match agent.post(endpoint).send_json(request) {
            Ok(response) => {
                debug!("Response {} from {endpoint}", response.status());
                let mut body = Vec::new();
                response
                    .into_reader()
                    .read_to_end(&mut body)
                    .map_err(|e| ServiceError::Transport(e.to_string()))?;
                Ok(body)
            }
            Err(ureq::Error::Status(status, response)) => {
                let body = response.into_string().unwrap_or_default();
                warn!("Response {status} from {endpoint}: {body}");
                Err(ServiceError::Status { status, body })
            }
            Err(ureq::Error::Transport(e)) => {
                warn!("Request to {endpoint} failed: {e}");
                Err(ServiceError::Transport(e.to_string()))
            }
        }
    }
}

impl InpaintService for HttpService {
    fn inpaint(&self, request: InpaintRequest) -> BoxFuture<'static, Result<Vec<u8>, ServiceError>> {
        let (tx, rx) = futures::channel::oneshot::channel();
        let agent = self.agent.clone();
        let endpoint = self.endpoint.clone();

        std::thread::spawn(move || tx.send(Self::post_blocking(&agent, &endpoint, &request)));
        async move {
            rx.await
                .map_err(|_| ServiceError::Transport("Request worker stopped".into()))
                .and_then(|r| r)
        }
        .boxed()
    }
}
