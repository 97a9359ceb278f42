//! Tunnel workflows
//!
//! Only the entry node is ever called. The exit node is consulted for its
//! relay port and API host, which together form the chain's single hop.

use rp_core::error::{Conflict, PanelError, RemoteError, RemoteStep, Resource};
use rp_core::model::{NewTunnel, Node, RuleFilter, StatusCounts, Tunnel};
use rp_core::naming;
use rp_core::traits::{AuditAction, RemoteControl, RemoteRefs, ResourceKind};
use rp_core::types::{RuleStatus, TunnelId};
use rp_protocol::ChainConfig;

use super::{build_service, Orchestrator};

impl Orchestrator {
    /// Check endpoints for a tunnel; returns the relay port to store.
    ///
    /// The listen port is claimed by the store on insert or replace.
    async fn admit_tunnel(&self, new: &NewTunnel) -> Result<u16, PanelError> {
        new.spec.validate()?;
        if new.entry_node_id == new.exit_node_id {
            return Err(Conflict::SameEntryExit.into());
        }

        self.find_node(new.entry_node_id, Resource::EntryNode).await?;
        let exit = self.find_node(new.exit_node_id, Resource::ExitNode).await?;
        if exit.relay_port == 0 {
            return Err(PanelError::Misconfigured {
                node: exit.id,
                reason: "no relay port configured".to_string(),
            });
        }

        Ok(exit.relay_port)
    }

    /// Create a stopped tunnel
    pub async fn create_tunnel(&self, new: NewTunnel) -> Result<Tunnel, PanelError> {
        let relay_port = self.admit_tunnel(&new).await?;
        let tunnel = self.store.tunnel_insert(new, relay_port).await?;

        tracing::info!(
            "Created tunnel {} ({}): node {} :{} -> node {} relay :{}",
            tunnel.id,
            tunnel.spec.name,
            tunnel.entry_node_id,
            tunnel.spec.listen_port,
            tunnel.exit_node_id,
            tunnel.relay_port
        );
        self.record_audit(
            AuditAction::Create,
            ResourceKind::Tunnel,
            tunnel.id.get(),
            tunnel.spec.name.clone(),
            true,
        )
        .await;
        Ok(tunnel)
    }

    /// Replace a stopped tunnel's endpoints and settings.
    ///
    /// The relay port is copied again from the (possibly new) exit node.
    pub async fn update_tunnel(&self, id: TunnelId, update: NewTunnel) -> Result<Tunnel, PanelError> {
        let current = self.store.tunnel_get(id).await?;
        if current.status == RuleStatus::Running {
            return Err(Conflict::RuleRunning.into());
        }

        let relay_port = self.admit_tunnel(&update).await?;
        let tunnel = self.store.tunnel_replace(id, update, relay_port).await?;
        self.record_audit(
            AuditAction::Update,
            ResourceKind::Tunnel,
            id.get(),
            tunnel.spec.name.clone(),
            true,
        )
        .await;
        Ok(tunnel)
    }

    /// Delete a tunnel, stopping it first if it runs.
    ///
    /// A failed stop is logged and does not block the delete.
    pub async fn delete_tunnel(&self, id: TunnelId) -> Result<(), PanelError> {
        let tunnel = self.store.tunnel_get(id).await?;
        if tunnel.status == RuleStatus::Running {
            if let Err(err) = self.stop_tunnel(id).await {
                tracing::warn!("Failed to stop tunnel {} before delete: {}", id, err);
            }
        }

        self.store.tunnel_delete(id).await?;
        tracing::info!("Deleted tunnel {} ({})", id, tunnel.spec.name);
        self.record_audit(
            AuditAction::Delete,
            ResourceKind::Tunnel,
            id.get(),
            tunnel.spec.name,
            true,
        )
        .await;
        Ok(())
    }

    pub async fn get_tunnel(&self, id: TunnelId) -> Result<Tunnel, PanelError> {
        Ok(self.store.tunnel_get(id).await?)
    }

    pub async fn list_tunnels(&self, filter: &RuleFilter) -> Result<Vec<Tunnel>, PanelError> {
        Ok(self.store.tunnel_list(filter).await?)
    }

    /// Tunnel counts by status
    pub async fn tunnel_stats(&self) -> Result<StatusCounts, PanelError> {
        let tunnels = self.store.tunnel_list(&RuleFilter::default()).await?;
        Ok(StatusCounts::tally(tunnels.iter().map(|t| t.status)))
    }

    /// Bring a tunnel to `running` on its entry node.
    ///
    /// Both ends must be online. A service failure after the chain was
    /// created removes the chain again before reporting.
    pub async fn start_tunnel(&self, id: TunnelId) -> Result<Tunnel, PanelError> {
        let tunnel = self.store.tunnel_get(id).await?;
        if tunnel.status == RuleStatus::Running {
            tracing::debug!("Tunnel {} already running", id);
            return Ok(tunnel);
        }
        let entry = self.online_node(tunnel.entry_node_id, Resource::EntryNode).await?;
        let exit = self.online_node(tunnel.exit_node_id, Resource::ExitNode).await?;

        let result = self.launch_tunnel(&tunnel, &entry, &exit).await;
        self.record_audit(
            AuditAction::Start,
            ResourceKind::Tunnel,
            id.get(),
            tunnel.spec.name.clone(),
            result.is_ok(),
        )
        .await;
        result?;

        Ok(self.store.tunnel_get(id).await?)
    }

    async fn launch_tunnel(
        &self,
        tunnel: &Tunnel,
        entry: &Node,
        exit: &Node,
    ) -> Result<(), PanelError> {
        let id = tunnel.id;

        let relay_host = match exit.api_host() {
            Some(host) if tunnel.relay_port != 0 => host,
            Some(_) => {
                self.store.tunnel_set_status(id, RuleStatus::Error).await?;
                return Err(PanelError::Misconfigured {
                    node: exit.id,
                    reason: "no relay port configured".to_string(),
                });
            }
            None => {
                self.store.tunnel_set_status(id, RuleStatus::Error).await?;
                return Err(PanelError::Misconfigured {
                    node: exit.id,
                    reason: format!("cannot resolve host from {:?}", exit.api_url),
                });
            }
        };
        let relay_addr = format!("{}:{}", relay_host, tunnel.relay_port);

        let client = match self.connect(entry) {
            Ok(client) => client,
            Err(err) => {
                self.store.tunnel_set_status(id, RuleStatus::Error).await?;
                return Err(err);
            }
        };

        let chain_name = naming::tunnel_chain(id);
        match client
            .create_chain(&ChainConfig::relay(&chain_name, &relay_addr))
            .await
        {
            Ok(()) => {}
            Err(RemoteError::Duplicate(_)) => {
                tracing::debug!("Chain {} already exists on {}, reusing", chain_name, entry.name);
            }
            Err(err) => {
                tracing::error!(
                    "Tunnel {}: chain {} creation on {} failed: {}",
                    id,
                    chain_name,
                    entry.name,
                    err
                );
                self.store.tunnel_set_status(id, RuleStatus::Error).await?;
                return Err(PanelError::RemoteFailed(RemoteStep::CreateChain));
            }
        }

        let observer = match self.ensure_observer(client.as_ref(), entry, id.get()).await {
            Ok(observer) => observer,
            Err(err) => {
                tracing::error!("Tunnel {}: observer creation on {} failed: {}", id, entry.name, err);
                self.rollback_chain(client.as_ref(), entry, &chain_name).await;
                self.store.tunnel_set_status(id, RuleStatus::Error).await?;
                return Err(PanelError::RemoteFailed(RemoteStep::CreateObserver));
            }
        };
        if let Some(observer) = &observer {
            self.store
                .tunnel_set_remote(
                    id,
                    RemoteRefs {
                        observer_id: Some(observer.clone()),
                        ..Default::default()
                    },
                )
                .await?;
        }

        let service_name = naming::tunnel_service(id);
        let service = build_service(&service_name, &tunnel.spec, observer.as_deref())
            .via_chain(&chain_name);
        if let Err(err) = client.create_service(&service).await {
            tracing::error!(
                "Tunnel {}: service {} creation on {} failed: {}",
                id,
                service_name,
                entry.name,
                err
            );
            self.rollback_chain(client.as_ref(), entry, &chain_name).await;
            self.store.tunnel_set_status(id, RuleStatus::Error).await?;
            return Err(PanelError::RemoteFailed(RemoteStep::CreateService));
        }

        self.store
            .tunnel_set_remote(
                id,
                RemoteRefs {
                    service_id: Some(service_name.clone()),
                    chain_id: Some(chain_name),
                    observer_id: None,
                },
            )
            .await?;
        self.store.tunnel_set_status(id, RuleStatus::Running).await?;
        tracing::info!(
            "Started tunnel {} as {} on {} (:{}) via {}",
            id,
            service_name,
            entry.name,
            tunnel.spec.listen_port,
            relay_addr
        );

        self.persist_node_config(client.as_ref(), entry).await;
        Ok(())
    }

    async fn rollback_chain(&self, client: &dyn RemoteControl, node: &Node, chain: &str) {
        if let Err(err) = client.delete_chain(chain).await {
            tracing::warn!("Failed to roll back chain {} on {}: {}", chain, node.name, err);
        }
    }

    /// Bring a tunnel to `stopped`, removing its service then its chain.
    ///
    /// Remote deletion is best effort; the tunnel is marked stopped either way.
    pub async fn stop_tunnel(&self, id: TunnelId) -> Result<Tunnel, PanelError> {
        let tunnel = self.store.tunnel_get(id).await?;
        if tunnel.status != RuleStatus::Running {
            tracing::debug!("Tunnel {} not running", id);
            return Ok(tunnel);
        }
        let entry = self.online_node(tunnel.entry_node_id, Resource::EntryNode).await?;

        match self.connect(&entry) {
            Ok(client) => {
                if let Some(service) = &tunnel.service_id {
                    if let Err(err) = client.delete_service(service).await {
                        tracing::warn!(
                            "Tunnel {}: failed to delete service {} on {}: {}",
                            id,
                            service,
                            entry.name,
                            err
                        );
                    }
                }
                if let Some(chain) = &tunnel.chain_id {
                    if let Err(err) = client.delete_chain(chain).await {
                        tracing::warn!(
                            "Tunnel {}: failed to delete chain {} on {}: {}",
                            id,
                            chain,
                            entry.name,
                            err
                        );
                    }
                }
                self.persist_node_config(client.as_ref(), &entry).await;
            }
            Err(err) => tracing::warn!("Tunnel {}: skipping remote cleanup: {}", id, err),
        }

        self.store.tunnel_set_status(id, RuleStatus::Stopped).await?;
        tracing::info!("Stopped tunnel {} on {}", id, entry.name);
        self.record_audit(
            AuditAction::Stop,
            ResourceKind::Tunnel,
            id.get(),
            tunnel.spec.name.clone(),
            true,
        )
        .await;

        Ok(self.store.tunnel_get(id).await?)
    }
}
