//! Forward workflows

use rp_core::error::{Conflict, PanelError, RemoteStep, Resource};
use rp_core::model::{Forward, NewForward, Node, RuleFilter, RuleSpec, StatusCounts};
use rp_core::naming;
use rp_core::traits::{AuditAction, RemoteRefs, ResourceKind};
use rp_core::types::{ForwardId, RuleStatus};

use super::{build_service, Orchestrator};

impl Orchestrator {
    /// Create a stopped forward
    pub async fn create_forward(&self, new: NewForward) -> Result<Forward, PanelError> {
        new.spec.validate()?;
        self.find_node(new.node_id, Resource::Node).await?;

        let forward = self.store.forward_insert(new).await?;
        tracing::info!(
            "Created forward {} ({}) on node {} port {}",
            forward.id,
            forward.spec.name,
            forward.node_id,
            forward.spec.listen_port
        );
        self.record_audit(
            AuditAction::Create,
            ResourceKind::Forward,
            forward.id.get(),
            forward.spec.name.clone(),
            true,
        )
        .await;
        Ok(forward)
    }

    /// Replace a stopped forward's settings
    pub async fn update_forward(
        &self,
        id: ForwardId,
        spec: RuleSpec,
    ) -> Result<Forward, PanelError> {
        let current = self.store.forward_get(id).await?;
        if current.status == RuleStatus::Running {
            return Err(Conflict::RuleRunning.into());
        }
        spec.validate()?;

        let forward = self.store.forward_replace_spec(id, spec).await?;
        self.record_audit(
            AuditAction::Update,
            ResourceKind::Forward,
            id.get(),
            forward.spec.name.clone(),
            true,
        )
        .await;
        Ok(forward)
    }

    /// Delete a forward, stopping it first if it runs.
    ///
    /// A failed stop is logged and does not block the delete.
    pub async fn delete_forward(&self, id: ForwardId) -> Result<(), PanelError> {
        let forward = self.store.forward_get(id).await?;
        if forward.status == RuleStatus::Running {
            if let Err(err) = self.stop_forward(id).await {
                tracing::warn!("Failed to stop forward {} before delete: {}", id, err);
            }
        }

        self.store.forward_delete(id).await?;
        tracing::info!("Deleted forward {} ({})", id, forward.spec.name);
        self.record_audit(
            AuditAction::Delete,
            ResourceKind::Forward,
            id.get(),
            forward.spec.name,
            true,
        )
        .await;
        Ok(())
    }

    pub async fn get_forward(&self, id: ForwardId) -> Result<Forward, PanelError> {
        Ok(self.store.forward_get(id).await?)
    }

    pub async fn list_forwards(&self, filter: &RuleFilter) -> Result<Vec<Forward>, PanelError> {
        Ok(self.store.forward_list(filter).await?)
    }

    /// Forward counts by status
    pub async fn forward_stats(&self) -> Result<StatusCounts, PanelError> {
        let forwards = self.store.forward_list(&RuleFilter::default()).await?;
        Ok(StatusCounts::tally(forwards.iter().map(|f| f.status)))
    }

    /// Bring a forward to `running` on its node.
    ///
    /// Already running is success with no remote calls. The node must be
    /// online. Any remote failure pins the forward to `error`.
    pub async fn start_forward(&self, id: ForwardId) -> Result<Forward, PanelError> {
        let forward = self.store.forward_get(id).await?;
        if forward.status == RuleStatus::Running {
            tracing::debug!("Forward {} already running", id);
            return Ok(forward);
        }
        let node = self.online_node(forward.node_id, Resource::Node).await?;

        let result = self.launch_forward(&forward, &node).await;
        self.record_audit(
            AuditAction::Start,
            ResourceKind::Forward,
            id.get(),
            forward.spec.name.clone(),
            result.is_ok(),
        )
        .await;
        result?;

        Ok(self.store.forward_get(id).await?)
    }

    async fn launch_forward(&self, forward: &Forward, node: &Node) -> Result<(), PanelError> {
        let id = forward.id;
        let client = match self.connect(node) {
            Ok(client) => client,
            Err(err) => {
                self.store.forward_set_status(id, RuleStatus::Error).await?;
                return Err(err);
            }
        };

        let observer = match self.ensure_observer(client.as_ref(), node, id.get()).await {
            Ok(observer) => observer,
            Err(err) => {
                tracing::error!("Forward {}: observer creation on {} failed: {}", id, node.name, err);
                self.store.forward_set_status(id, RuleStatus::Error).await?;
                return Err(PanelError::RemoteFailed(RemoteStep::CreateObserver));
            }
        };
        if let Some(observer) = &observer {
            self.store
                .forward_set_remote(
                    id,
                    RemoteRefs {
                        observer_id: Some(observer.clone()),
                        ..Default::default()
                    },
                )
                .await?;
        }

        let service_name = naming::forward_service(id);
        let service = build_service(&service_name, &forward.spec, observer.as_deref());
        if let Err(err) = client.create_service(&service).await {
            tracing::error!(
                "Forward {}: service {} creation on {} failed: {}",
                id,
                service_name,
                node.name,
                err
            );
            self.store.forward_set_status(id, RuleStatus::Error).await?;
            return Err(PanelError::RemoteFailed(RemoteStep::CreateService));
        }

        self.store
            .forward_set_remote(
                id,
                RemoteRefs {
                    service_id: Some(service_name.clone()),
                    ..Default::default()
                },
            )
            .await?;
        self.store.forward_set_status(id, RuleStatus::Running).await?;
        tracing::info!(
            "Started forward {} as {} on {} (:{})",
            id,
            service_name,
            node.name,
            forward.spec.listen_port
        );

        self.persist_node_config(client.as_ref(), node).await;
        Ok(())
    }

    /// Bring a forward to `stopped`.
    ///
    /// Not running is success with no remote calls. Remote deletion is best
    /// effort; the forward is marked stopped either way.
    pub async fn stop_forward(&self, id: ForwardId) -> Result<Forward, PanelError> {
        let forward = self.store.forward_get(id).await?;
        if forward.status != RuleStatus::Running {
            tracing::debug!("Forward {} not running", id);
            return Ok(forward);
        }
        let node = self.online_node(forward.node_id, Resource::Node).await?;

        match self.connect(&node) {
            Ok(client) => {
                if let Some(service) = &forward.service_id {
                    if let Err(err) = client.delete_service(service).await {
                        tracing::warn!(
                            "Forward {}: failed to delete service {} on {}: {}",
                            id,
                            service,
                            node.name,
                            err
                        );
                    }
                }
                self.persist_node_config(client.as_ref(), &node).await;
            }
            Err(err) => tracing::warn!("Forward {}: skipping remote cleanup: {}", id, err),
        }

        self.store.forward_set_status(id, RuleStatus::Stopped).await?;
        tracing::info!("Stopped forward {} on {}", id, node.name);
        self.record_audit(
            AuditAction::Stop,
            ResourceKind::Forward,
            id.get(),
            forward.spec.name.clone(),
            true,
        )
        .await;

        Ok(self.store.forward_get(id).await?)
    }
}
