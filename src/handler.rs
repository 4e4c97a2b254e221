//! One invocation end to end: decode, authenticate, reconcile, report.

use anyhow::Result;
use tracing::{error, info, warn};

use crate::api::SearchApi;
use crate::callback::{log_pointer, CallbackEnvelope, CallbackReporter, Status};
use crate::config::Config;
use crate::domain::DomainClient;
use crate::error::AuthError;
use crate::execution::ExecutionLog;
use crate::reconcile::Reconciler;
use crate::request::{CustomResourceEvent, ReconciliationRequest, RequestType};

/// What the invocation produced for its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Invocation {
    /// Orchestrated run: the envelope and whether the PUT went through.
    Reported {
        envelope: CallbackEnvelope,
        delivered: bool,
    },
    /// Direct run: the verdict for Create/Update, nothing otherwise.
    Direct(Option<bool>),
}

pub struct Handler {
    cfg: Config,
    reporter: CallbackReporter,
}

impl Handler {
    pub fn new(cfg: Config) -> Result<Self> {
        let reporter = CallbackReporter::new(cfg.http_timeout())?;
        Ok(Self { cfg, reporter })
    }

    pub async fn handle(&self, event: &CustomResourceEvent) -> Invocation {
        let request_type = RequestType::parse(event.request_type.as_deref());
        let (log, fatal) = match self.prepare(event) {
            Ok((req, client)) => self.reconcile(&req, &client).await,
            Err(cause) => {
                error!("handler: {}", cause);
                (ExecutionLog::new(), Some(cause))
            }
        };
        self.report(event, &request_type, &log, fatal).await
    }

    fn prepare(&self, event: &CustomResourceEvent) -> Result<(ReconciliationRequest, DomainClient), String> {
        let req = ReconciliationRequest::from_event(event, &self.cfg.region)
            .map_err(|e| format!("invalid request: {e}"))?;
        let client = self
            .connect(&req)
            .map_err(|e| format!("authentication failed: {e}"))?;
        info!("handler: domain {} user {}", client.base_url(), self.cfg.opensearch_user);
        Ok((req, client))
    }

    fn connect(&self, req: &ReconciliationRequest) -> Result<DomainClient, AuthError> {
        let credentials = self.cfg.credentials()?;
        DomainClient::new(&req.endpoint, credentials, &self.cfg)
            .map_err(|e| AuthError::Client(format!("{e:#}")))
    }

    /// Run the state machine; an invalid request type is reported as fatal.
    pub async fn reconcile<A: SearchApi + ?Sized>(
        &self,
        req: &ReconciliationRequest,
        api: &A,
    ) -> (ExecutionLog, Option<String>) {
        info!(
            "handler: {} request index={} region={}",
            req.request_type, req.index, req.region
        );
        let log = Reconciler::new(api, (&self.cfg).into()).run(req).await;
        let fatal = match &req.request_type {
            RequestType::Invalid(_) => Some(format!("request type {} is not valid", req.request_type)),
            _ => None,
        };
        (log, fatal)
    }

    async fn report(
        &self,
        event: &CustomResourceEvent,
        request_type: &RequestType,
        log: &ExecutionLog,
        fatal: Option<String>,
    ) -> Invocation {
        let succeeded = fatal.is_none() && log.succeeded();
        if !log.succeeded() {
            let failed: Vec<&str> = log.failed_steps().into_iter().map(|s| s.name()).collect();
            warn!("handler: failed steps [{}]", failed.join(", "));
        }

        if !event.expects_callback() {
            info!("handler: overall execution {} succeeded={}", log, succeeded);
            return Invocation::Direct(request_type.is_create_or_update().then_some(succeeded));
        }

        let pointer = log_pointer(&self.cfg.log_stream_name);
        let reason = match &fatal {
            Some(cause) => format!("{cause}. {pointer}"),
            None => pointer,
        };
        let physical_id = event
            .physical_resource_id
            .clone()
            .unwrap_or_else(|| self.cfg.log_stream_name.to_string());
        let envelope = CallbackEnvelope::new(
            event,
            Status::from_verdict(succeeded),
            reason,
            physical_id,
            log,
        );

        let Some(url) = event.response_url.as_deref() else {
            error!("handler: event carries a stack id but no response url");
            return Invocation::Reported {
                envelope,
                delivered: false,
            };
        };

        let delivered = match self.reporter.send(url, &envelope).await {
            Ok(status) => status.is_success(),
            Err(err) => {
                warn!("handler: callback delivery failed: {err:#}");
                false
            }
        };
        Invocation::Reported {
            envelope,
            delivered,
        }
    }
}
