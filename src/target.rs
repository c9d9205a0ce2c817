//! Target discovery and lifecycle, using a per-target-owns-its-own-
//! `Connection` model rather than a single shared handler task.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use cdp_session_protocol::target::{
    CloseTargetParams, CreateTargetParams, GetTargetsParams, SetDiscoverTargetsParams, TargetId,
    TargetInfo,
};

use crate::connection::Connection;
use crate::error::Result;

/// Tracks every target the browser-level connection has seen via
/// `Target.targetCreated`/`targetInfoChanged`/`targetDestroyed`, and owns
/// the per-target `Connection`s once a target is attached to.
#[derive(Default)]
pub struct TargetRegistry {
    infos: Mutex<HashMap<TargetId, TargetInfo>>,
    attached: Mutex<HashMap<TargetId, Arc<Connection>>>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns on target discovery and seeds the registry with whatever
    /// targets already exist.
    pub async fn discover(&self, browser_conn: &Connection) -> Result<()> {
        browser_conn
            .send(SetDiscoverTargetsParams::new(true))
            .await?;
        let existing = browser_conn.send(GetTargetsParams {}).await?;
        let mut infos = self.infos.lock().unwrap();
        for info in existing.target_infos {
            infos.insert(info.target_id.clone(), info);
        }
        Ok(())
    }

    pub fn note_created(&self, info: TargetInfo) {
        self.infos.lock().unwrap().insert(info.target_id.clone(), info);
    }

    pub fn note_info_changed(&self, info: TargetInfo) {
        self.infos.lock().unwrap().insert(info.target_id.clone(), info);
    }

    pub fn note_destroyed(&self, id: &TargetId) {
        self.infos.lock().unwrap().remove(id);
        self.attached.lock().unwrap().remove(id);
    }

    pub fn info(&self, id: &TargetId) -> Option<TargetInfo> {
        self.infos.lock().unwrap().get(id).cloned()
    }

    pub fn connection(&self, id: &TargetId) -> Option<Arc<Connection>> {
        self.attached.lock().unwrap().get(id).cloned()
    }

    pub fn attach(&self, id: TargetId, conn: Arc<Connection>) {
        self.attached.lock().unwrap().insert(id, conn);
    }

    pub fn len(&self) -> usize {
        self.infos.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Requests a new target (tab), the lifecycle command issued directly
/// against the browser-level connection.
pub async fn create_target(
    browser_conn: &Connection,
    params: impl Into<CreateTargetParams>,
) -> Result<TargetId> {
    let resp = browser_conn.send(params.into()).await?;
    Ok(resp.target_id)
}

pub async fn close_target(browser_conn: &Connection, target_id: TargetId) -> Result<bool> {
    let resp = browser_conn.send(CloseTargetParams::new(target_id)).await?;
    Ok(resp.success)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_tracks_info_lifecycle() {
        let registry = TargetRegistry::new();
        let info = TargetInfo {
            target_id: TargetId::from("T1"),
            kind: "page".to_string(),
            title: "".to_string(),
            url: "about:blank".to_string(),
            attached: false,
            opener_id: None,
            browser_context_id: None,
        };
        registry.note_created(info.clone());
        assert_eq!(registry.len(), 1);
        registry.note_destroyed(&info.target_id);
        assert!(registry.is_empty());
    }
}
