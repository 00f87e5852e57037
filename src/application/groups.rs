use std::sync::Arc;

use metrics::counter;
use thiserror::Error;
use tracing::info;

use crate::application::repos::{CreateGroupParams, GroupsRepo, GroupsWriteRepo, RepoError};
use crate::domain::{entities::GroupRecord, error::DomainError, groups::NewGroup};

#[derive(Debug, Error)]
pub enum GroupServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("group `{slug}` not found")]
    NotFound { slug: String },
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone)]
pub struct CreateGroupCommand {
    pub title: String,
    pub slug: Option<String>,
    pub description: String,
}

#[derive(Clone)]
pub struct GroupService {
    reader: Arc<dyn GroupsRepo>,
    writer: Arc<dyn GroupsWriteRepo>,
}

impl GroupService {
    pub fn new(reader: Arc<dyn GroupsRepo>, writer: Arc<dyn GroupsWriteRepo>) -> Self {
        Self { reader, writer }
    }

    /// Insert a group. A slug collision is reported as-is; no alternative
    /// slug is tried.
    pub async fn create(
        &self,
        command: CreateGroupCommand,
    ) -> Result<GroupRecord, GroupServiceError> {
        let group = NewGroup::new(&command.title, command.slug.as_deref(), &command.description)?;

        let record = self
            .writer
            .create_group(CreateGroupParams {
                title: group.title,
                slug: group.slug,
                description: group.description,
            })
            .await?;

        counter!("yatube_groups_created_total").increment(1);
        info!(
            target = "yatube::groups",
            group_id = record.id,
            slug = %record.slug,
            "group created"
        );
        Ok(record)
    }

    pub async fn list(&self) -> Result<Vec<GroupRecord>, GroupServiceError> {
        self.reader.list_all().await.map_err(GroupServiceError::from)
    }

    /// Posts in the group survive with their group cleared.
    pub async fn delete(&self, slug: &str) -> Result<(), GroupServiceError> {
        if !self.writer.delete_group(slug).await? {
            return Err(GroupServiceError::NotFound {
                slug: slug.to_string(),
            });
        }
        info!(target = "yatube::groups", slug, "group deleted");
        Ok(())
    }
}
