//! Read side: filtered listings and lookups, hydrated with related entities.
//!
//! Hydration follows relations a fixed number of hops: a backup set pulls
//! in its hosts, and each host pulls in its paths and jobs, but nothing
//! reached from there is expanded further.

use std::sync::Arc;

use moduleab_core::pagination::Page;
use moduleab_core::types::EntityId;
use serde::Serialize;

use crate::error::DataError;
use crate::models::{
    AppSet, AppSetFilter, BackupPath, BackupSet, BackupSetFilter, ClientJob, ClientJobFilter,
    Entity, Host, HostFilter, Membership, Oas, Oss, PathFilter, Policy, PolicyFilter,
};
use crate::store::{Store, Table};

/// A host with its app set, paths and reported jobs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostView {
    #[serde(flatten)]
    pub host: Host,
    pub app_set: Option<AppSet>,
    pub paths: Vec<BackupPath>,
    pub jobs: Vec<ClientJob>,
}

/// An app set with its hosts and backup sets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppSetView {
    #[serde(flatten)]
    pub app_set: AppSet,
    pub hosts: Vec<Host>,
    pub backup_sets: Vec<BackupSet>,
}

/// A backup set with its targets, policies and fully hydrated hosts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackupSetView {
    #[serde(flatten)]
    pub backup_set: BackupSet,
    pub oss: Option<Oss>,
    pub oas: Option<Oas>,
    pub app_set: Option<AppSet>,
    pub policies: Vec<Policy>,
    pub hosts: Vec<HostView>,
}

/// A path with the hosts it applies to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathView {
    #[serde(flatten)]
    pub path: BackupPath,
    pub hosts: Vec<Host>,
}

/// Resolve a lookup key to the single entity it names.
pub(crate) async fn lookup<S, E>(store: &S, key: &str) -> Result<E, DataError>
where
    S: Table<E> + ?Sized,
    E: Entity,
{
    let not_found = || DataError::NotFound {
        entity: E::KIND.label(),
        key: key.to_string(),
    };
    let Some(filter) = E::lookup(key) else {
        return Err(not_found());
    };
    let found = store.find(&filter, Page::new(1, 0)).await?;
    found.into_iter().next().ok_or_else(not_found)
}

pub struct Catalog<S: ?Sized> {
    store: Arc<S>,
}

impl<S: Store + ?Sized> Catalog<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Plain records matching `filter`.
    pub async fn find<E>(&self, filter: &E::Filter, page: Page) -> Result<Vec<E>, DataError>
    where
        E: Entity,
        S: Table<E>,
    {
        Ok(Table::<E>::find(&*self.store, filter, page).await?)
    }

    /// The plain record named by `key`.
    pub async fn get<E>(&self, key: &str) -> Result<E, DataError>
    where
        E: Entity,
        S: Table<E>,
    {
        lookup::<S, E>(&self.store, key).await
    }

    pub async fn hosts(&self, filter: &HostFilter, page: Page) -> Result<Vec<HostView>, DataError> {
        let hosts = self.find::<Host>(filter, page).await?;
        let mut views = Vec::with_capacity(hosts.len());
        for host in hosts {
            views.push(self.host_view(host).await?);
        }
        Ok(views)
    }

    pub async fn host(&self, key: &str) -> Result<HostView, DataError> {
        let host = self.get::<Host>(key).await?;
        self.host_view(host).await
    }

    pub async fn app_sets(
        &self,
        filter: &AppSetFilter,
        page: Page,
    ) -> Result<Vec<AppSetView>, DataError> {
        let app_sets = self.find::<AppSet>(filter, page).await?;
        let mut views = Vec::with_capacity(app_sets.len());
        for app_set in app_sets {
            views.push(self.app_set_view(app_set).await?);
        }
        Ok(views)
    }

    pub async fn app_set(&self, key: &str) -> Result<AppSetView, DataError> {
        let app_set = self.get::<AppSet>(key).await?;
        self.app_set_view(app_set).await
    }

    pub async fn backup_sets(
        &self,
        filter: &BackupSetFilter,
        page: Page,
    ) -> Result<Vec<BackupSetView>, DataError> {
        let sets = self.find::<BackupSet>(filter, page).await?;
        let mut views = Vec::with_capacity(sets.len());
        for set in sets {
            views.push(self.backup_set_view(set).await?);
        }
        Ok(views)
    }

    pub async fn backup_set(&self, key: &str) -> Result<BackupSetView, DataError> {
        let set = self.get::<BackupSet>(key).await?;
        self.backup_set_view(set).await
    }

    pub async fn paths(&self, filter: &PathFilter, page: Page) -> Result<Vec<PathView>, DataError> {
        let paths = self.find::<BackupPath>(filter, page).await?;
        let mut views = Vec::with_capacity(paths.len());
        for path in paths {
            views.push(self.path_view(path).await?);
        }
        Ok(views)
    }

    pub async fn path(&self, key: &str) -> Result<PathView, DataError> {
        let path = self.get::<BackupPath>(key).await?;
        self.path_view(path).await
    }

    async fn host_view(&self, host: Host) -> Result<HostView, DataError> {
        let app_set = self.one::<AppSet>(host.app_set_id).await?;
        let paths = self.related::<BackupPath>(Membership::PathsOfHost, host.id).await?;
        let jobs = self
            .find::<ClientJob>(
                &ClientJobFilter {
                    host_id: Some(host.id),
                    ..Default::default()
                },
                Page::ALL,
            )
            .await?;
        Ok(HostView {
            host,
            app_set,
            paths,
            jobs,
        })
    }

    async fn app_set_view(&self, app_set: AppSet) -> Result<AppSetView, DataError> {
        let hosts = self
            .find::<Host>(
                &HostFilter {
                    app_set_id: Some(app_set.id),
                    ..Default::default()
                },
                Page::ALL,
            )
            .await?;
        let backup_sets = self
            .find::<BackupSet>(
                &BackupSetFilter {
                    app_set_id: Some(app_set.id),
                    ..Default::default()
                },
                Page::ALL,
            )
            .await?;
        Ok(AppSetView {
            app_set,
            hosts,
            backup_sets,
        })
    }

    async fn backup_set_view(&self, backup_set: BackupSet) -> Result<BackupSetView, DataError> {
        let oss = self.one::<Oss>(backup_set.oss_id).await?;
        let oas = self.one::<Oas>(backup_set.oas_id).await?;
        let app_set = self.one::<AppSet>(backup_set.app_set_id).await?;
        let policies = self
            .find::<Policy>(
                &PolicyFilter {
                    backup_set_id: Some(backup_set.id),
                    ..Default::default()
                },
                Page::ALL,
            )
            .await?;

        let members = self
            .related::<Host>(Membership::HostsOfBackupSet, backup_set.id)
            .await?;
        let mut hosts = Vec::with_capacity(members.len());
        for host in members {
            hosts.push(self.host_view(host).await?);
        }

        Ok(BackupSetView {
            backup_set,
            oss,
            oas,
            app_set,
            policies,
            hosts,
        })
    }

    async fn path_view(&self, path: BackupPath) -> Result<PathView, DataError> {
        let hosts = self.related::<Host>(Membership::HostsOfPath, path.id).await?;
        Ok(PathView { path, hosts })
    }

    /// Follow an optional foreign key.
    async fn one<E>(&self, id: Option<EntityId>) -> Result<Option<E>, DataError>
    where
        E: Entity,
        S: Table<E>,
    {
        let Some(id) = id else {
            return Ok(None);
        };
        let found = Table::<E>::get_many(&*self.store, &[id]).await?;
        Ok(found.into_iter().next())
    }

    /// Member entities of `owner`'s side of a join table.
    async fn related<E>(&self, membership: Membership, owner: EntityId) -> Result<Vec<E>, DataError>
    where
        E: Entity,
        S: Table<E>,
    {
        let ids = self.store.members(membership, owner).await?;
        Ok(Table::<E>::get_many(&*self.store, &ids).await?)
    }
}
