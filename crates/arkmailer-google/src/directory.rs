//! Admin SDK Directory API adapter for group membership.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

use arkmailer_core::{
    AddOutcome, GroupDirectory, GroupId, GroupKeyDeriver, MemberAddress, MemberSet,
    MembershipMap, ObservedStateSource, RemoveOutcome, SyncError, SyncResult,
};

use crate::{GoogleClient, GoogleResult};

/// Customer alias for the account owning the credentials.
pub const MY_CUSTOMER: &str = "my_customer";

const DIRECTORY_PATH: &str = "admin/directory/v1";

/// One page of a Directory list call.
trait Page: DeserializeOwned {
    type Item;

    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupsPage {
    #[serde(default)]
    groups: Vec<GroupResource>,
    next_page_token: Option<String>,
}

impl Page for GroupsPage {
    type Item = GroupResource;

    fn into_parts(self) -> (Vec<GroupResource>, Option<String>) {
        (self.groups, self.next_page_token)
    }
}

#[derive(Debug, Deserialize)]
struct GroupResource {
    #[serde(default)]
    email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MembersPage {
    #[serde(default)]
    members: Vec<MemberResource>,
    next_page_token: Option<String>,
}

impl Page for MembersPage {
    type Item = MemberResource;

    fn into_parts(self) -> (Vec<MemberResource>, Option<String>) {
        (self.members, self.next_page_token)
    }
}

#[derive(Debug, Deserialize)]
struct MemberResource {
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewGroup<'a> {
    email: &'a str,
    name: &'a str,
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct NewMember<'a> {
    email: &'a str,
    role: &'static str,
}

/// Group directory backed by the Google Admin SDK.
///
/// Only groups following the managed naming convention are reported as
/// observed state.
#[derive(Debug)]
pub struct DirectoryClient {
    client: Arc<GoogleClient>,
    deriver: GroupKeyDeriver,
    customer: String,
}

impl DirectoryClient {
    /// Creates a directory client filtering groups with `deriver`.
    pub fn new(client: Arc<GoogleClient>, deriver: GroupKeyDeriver) -> Self {
        Self {
            client,
            deriver,
            customer: MY_CUSTOMER.to_string(),
        }
    }

    fn url(&self, segments: &[&str]) -> GoogleResult<Url> {
        let mut raw = format!("{}/{DIRECTORY_PATH}", self.client.base_url());
        for segment in segments {
            raw.push('/');
            raw.push_str(&urlencoding::encode(segment));
        }
        Ok(Url::parse(&raw)?)
    }

    /// Drains every page of a list call.
    async fn list_all<P: Page>(&self, base: Url) -> GoogleResult<Vec<P::Item>> {
        let mut items = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = base.clone();
            if let Some(token) = &page_token {
                url.query_pairs_mut().append_pair("pageToken", token);
            }

            debug!(url = %url, "Fetching page");
            let page: P = self.client.get(url.as_str()).await?;
            let (page_items, next) = page.into_parts();
            items.extend(page_items);

            match next.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => return Ok(items),
            }
        }
    }

    /// Lists the addresses of every group of the customer.
    #[instrument(skip(self))]
    pub async fn list_groups(&self) -> GoogleResult<Vec<String>> {
        let mut url = self.url(&["groups"])?;
        url.query_pairs_mut().append_pair("customer", &self.customer);

        let groups = self.list_all::<GroupsPage>(url).await?;
        Ok(groups
            .into_iter()
            .map(|g| g.email.trim().to_lowercase())
            .filter(|email| !email.is_empty())
            .collect())
    }

    /// Lists the member addresses of a group.
    #[instrument(skip(self))]
    pub async fn list_members(&self, group: &str) -> GoogleResult<MemberSet> {
        let url = self.url(&["groups", group, "members"])?;

        let members = self.list_all::<MembersPage>(url).await?;
        Ok(members
            .into_iter()
            .filter_map(|m| m.email)
            .filter_map(|email| MemberAddress::new(&email))
            .collect())
    }
}

#[async_trait]
impl ObservedStateSource for DirectoryClient {
    async fn fetch_observed(&self) -> SyncResult<MembershipMap> {
        let fetch_err = |e: crate::GoogleError| SyncError::fetch("directory", e.to_string());

        let mut builder = MembershipMap::builder();
        for email in self.list_groups().await.map_err(fetch_err)? {
            if !self.deriver.matches_convention(&email) {
                continue;
            }
            let group = match GroupId::parse(&email) {
                Ok(group) => group,
                Err(e) => {
                    warn!(group = %email, error = %e, "Ignoring malformed group address");
                    continue;
                }
            };
            let members = self.list_members(group.as_str()).await.map_err(fetch_err)?;
            builder.extend(group, members);
        }

        let observed = builder.build();
        info!(
            groups = observed.len(),
            memberships = observed.total_members(),
            "Observed membership fetched"
        );
        Ok(observed)
    }
}

#[async_trait]
impl GroupDirectory for DirectoryClient {
    #[instrument(skip(self, display_name, description), fields(group = %group))]
    async fn ensure_group_exists(
        &self,
        group: &GroupId,
        display_name: &str,
        description: &str,
    ) -> SyncResult<()> {
        let group_err = |e: crate::GoogleError| SyncError::group(group.as_str(), e.to_string());
        let url = self.url(&["groups", group.as_str()]).map_err(group_err)?;

        match self.client.get::<serde_json::Value>(url.as_str()).await {
            Ok(_) => {
                debug!("Group exists");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                info!("Group not found, creating");
                let url = self.url(&["groups"]).map_err(group_err)?;
                let body = NewGroup {
                    email: group.as_str(),
                    name: display_name,
                    description,
                };
                self.client
                    .post::<serde_json::Value, _>(url.as_str(), &body)
                    .await
                    .map_err(group_err)?;
                info!("Group created");
                Ok(())
            }
            Err(e) => Err(group_err(e)),
        }
    }

    #[instrument(skip(self), fields(group = %group, address = %address))]
    async fn add_member(&self, group: &GroupId, address: &MemberAddress) -> SyncResult<AddOutcome> {
        let op_err = |e: crate::GoogleError| {
            SyncError::operation(group.as_str(), address.as_str(), e.to_string())
        };
        let url = self
            .url(&["groups", group.as_str(), "members"])
            .map_err(op_err)?;
        let body = NewMember {
            email: address.as_str(),
            role: "MEMBER",
        };

        match self
            .client
            .post::<serde_json::Value, _>(url.as_str(), &body)
            .await
        {
            Ok(_) => Ok(AddOutcome::Added),
            Err(e) if e.is_conflict() => Ok(AddOutcome::AlreadyMember),
            Err(e) if e.is_not_found() => Ok(AddOutcome::InvalidAddress),
            Err(e) => Err(op_err(e)),
        }
    }

    #[instrument(skip(self), fields(group = %group, address = %address))]
    async fn remove_member(
        &self,
        group: &GroupId,
        address: &MemberAddress,
    ) -> SyncResult<RemoveOutcome> {
        let op_err = |e: crate::GoogleError| {
            SyncError::operation(group.as_str(), address.as_str(), e.to_string())
        };
        let url = self
            .url(&["groups", group.as_str(), "members", address.as_str()])
            .map_err(op_err)?;

        match self.client.delete(url.as_str()).await {
            Ok(()) => Ok(RemoveOutcome::Removed),
            Err(e) if e.is_not_found() => Ok(RemoveOutcome::NotAMember),
            Err(e) => Err(op_err(e)),
        }
    }
}
